use bitvec::prelude::*;
use rayon::prelude::*;
use tracing::debug;

use crate::column::Column;
use crate::data_type::DataType;
use crate::error::{Result, TableError};
use crate::group::GroupMap;
use crate::index_map::IndexMap;
use crate::key::{KeyBuilder, NullOrder};
use crate::table::Table;
use crate::value::Value;

/// Built-in per-group reducers for [Query::aggregate].
///
/// Every reducer except `Count` skips missing values; `Count` counts rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Count,
    Sum,
    Mean,
    Min,
    Max,
    First,
    Last,
}

impl Reducer {
    fn name(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
            Self::First => "first",
            Self::Last => "last",
        }
    }
}

/// One row as seen by a filter predicate or a `set` formula: the current
/// pipeline's view of the source table plus any derived columns.
#[derive(Clone, Copy)]
pub struct RowRef<'q, 't> {
    query: &'q Query<'t>,
    /// Source position of the row.
    pub row: usize,
}

impl RowRef<'_, '_> {
    /// The value of `name` at this row.
    pub fn cell(&self, name: &str) -> Result<Value> {
        let col = self.query.resolved(name)?;
        col.get(self.row).ok_or(TableError::RowOutOfBounds {
            row: self.row,
            rows: col.len(),
        })
    }

    /// Whether `name` is missing at this row.
    pub fn is_null(&self, name: &str) -> Result<bool> {
        Ok(self.cell(name)?.is_null())
    }
}

/// A lazy query over one table: `filter → sort → {terminal}` composed on an
/// [IndexMap] plan, with optional grouping for the aggregating terminals.
///
/// Non-terminal steps apply eagerly to the plan but never touch the source
/// table; a new table exists only once a terminal step materializes one.
/// Ordering rules are enforced: every `filter` must precede `sort`, and a
/// terminal consumes the query.
pub struct Query<'t> {
    source: &'t Table,
    map: IndexMap,
    /// Columns computed by `set`, aligned to source positions (missing where
    /// the row was not retained at computation time). Later entries shadow
    /// earlier ones and source columns of the same name.
    derived: Vec<Column>,
    /// Sort column names, when a sort was requested.
    sorted_by: Option<Vec<String>>,
    /// Grouping column names, when grouping was requested.
    grouped_by: Vec<String>,
}

impl<'t> Query<'t> {
    /// Starts a query over every row of `table`.
    pub fn new(table: &'t Table) -> Self {
        Self {
            source: table,
            map: IndexMap::over(table.row_count()),
            derived: Vec::new(),
            sorted_by: None,
            grouped_by: Vec::new(),
        }
    }

    fn resolved(&self, name: &str) -> Result<&Column> {
        if let Some(col) = self.derived.iter().rev().find(|col| col.name == name) {
            return Ok(col);
        }
        self.source.column(name)
    }

    /// Every visible column name: source columns first, then derived columns
    /// that do not shadow a source column.
    fn visible_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .source
            .column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        for col in &self.derived {
            if !names.contains(&col.name) {
                names.push(col.name.clone());
            }
        }
        names
    }

    /// Keeps only rows for which `pred` returns true.
    ///
    /// Predicate evaluation is embarrassingly parallel: each row's result is
    /// independent and lands at a unique pre-known mask slot, so rows are
    /// evaluated across worker threads with deterministic output. Repeated
    /// filters fold by logical AND.
    ///
    /// # Errors
    /// [TableError::PipelineOrder] if a sort was already applied.
    pub fn filter<F>(mut self, pred: F) -> Result<Self>
    where
        F: Fn(RowRef<'_, 't>) -> bool + Sync,
    {
        let positions = self.map.source_positions();
        let bits: Vec<bool> = positions
            .par_iter()
            .map(|&row| pred(RowRef { query: &self, row }))
            .collect();
        let mask: BitVec = bits.iter().copied().collect();
        self.map.apply_filter(&mask)?;
        debug!(retained = self.map.len(), "filter applied");
        Ok(self)
    }

    /// Keeps only rows whose mask bit is set. The mask addresses the
    /// currently retained rows, in plan order.
    pub fn filter_mask(mut self, mask: &BitSlice) -> Result<Self> {
        self.map.apply_filter(mask)?;
        Ok(self)
    }

    /// Stable sort of the retained rows by the listed columns, missing
    /// values placed per `null_order` for the whole sort. May reference more
    /// columns than a later grouping key; without a sort, source order (or
    /// first-encounter order for hashed grouping) is preserved.
    pub fn sort(mut self, columns: &[&str], null_order: NullOrder) -> Result<Self> {
        let cols: Vec<&Column> = columns
            .iter()
            .map(|name| self.resolved(name))
            .collect::<Result<_>>()?;
        let kb = KeyBuilder::new(cols, null_order)?;
        let keys = kb.keys_at(&self.map.source_positions());
        self.map.apply_sort(&keys)?;
        self.sorted_by = Some(columns.iter().map(|n| n.to_string()).collect());
        debug!(columns = ?columns, "sort applied");
        Ok(self)
    }

    /// Computes a column over the current (possibly filtered) row set and
    /// keeps it for the remainder of the pipeline; later steps and terminals
    /// see it like a source column. Rows not retained at this point hold a
    /// missing value.
    pub fn set<F>(mut self, name: &str, data_type: DataType, f: F) -> Result<Self>
    where
        F: Fn(RowRef<'_, 't>) -> Value,
    {
        let rows = self.source.row_count();
        let mut values: Vec<Value> = vec![Value::Null; rows];
        for &row in &self.map.source_positions() {
            values[row] = f(RowRef { query: &self, row });
        }
        let col = Column::from_values(name, data_type, values)?;
        self.derived.push(col);
        Ok(self)
    }

    /// Records the grouping key for the aggregating terminals.
    pub fn group_by(mut self, columns: &[&str]) -> Result<Self> {
        for name in columns {
            self.resolved(name)?;
        }
        self.grouped_by = columns.iter().map(|n| n.to_string()).collect();
        Ok(self)
    }

    /// Materializes the listed columns, in the plan's current row order.
    /// Terminal.
    pub fn select(self, columns: &[&str]) -> Result<Table> {
        let positions = self.map.source_positions();
        let mut out = Table::new();
        for name in columns {
            out.add_column(self.resolved(name)?.take(&positions))?;
        }
        Ok(out)
    }

    /// Materializes every visible column except the listed ones. Terminal.
    ///
    /// # Errors
    /// [TableError::ColumnNotFound] if a listed name does not exist.
    pub fn drop_columns(self, columns: &[&str]) -> Result<Table> {
        for name in columns {
            self.resolved(name)?;
        }
        let kept: Vec<String> = self
            .visible_names()
            .into_iter()
            .filter(|name| !columns.contains(&name.as_str()))
            .collect();
        let kept: Vec<&str> = kept.iter().map(|n| n.as_str()).collect();
        self.select(&kept)
    }

    /// Whether the requested sort orders the plan by the grouping key (the
    /// grouping columns are a prefix of the sort columns), which lets
    /// grouping reuse the sorted runs instead of hashing.
    fn sort_covers_grouping(&self) -> bool {
        match &self.sorted_by {
            Some(sorted) => {
                sorted.len() >= self.grouped_by.len()
                    && sorted[..self.grouped_by.len()] == self.grouped_by[..]
            }
            None => false,
        }
    }

    /// Builds the group map for the recorded grouping key. With no grouping
    /// columns, every retained row lands in one group.
    fn build_groups(&mut self) -> Result<GroupMap> {
        if self.grouped_by.is_empty() {
            return Ok(GroupMap::single(self.map.len()));
        }

        let names: Vec<String> = self.grouped_by.clone();
        let cols: Vec<&Column> = names
            .iter()
            .map(|name| self.resolved(name))
            .collect::<Result<_>>()?;
        let kb = KeyBuilder::new(cols, NullOrder::First)?;
        let keys = kb.keys_at(&self.map.source_positions());
        let groups = if self.sort_covers_grouping() {
            GroupMap::build_sorted(&self.map, &keys)?
        } else {
            GroupMap::build_hashed(&mut self.map, &keys)?
        };
        debug!(
            groups = groups.len(),
            sorted = self.sort_covers_grouping(),
            "group map built"
        );
        Ok(groups)
    }

    /// Source positions of one group's rows, in plan order.
    fn group_positions(&self, range: &std::ops::Range<usize>) -> Vec<usize> {
        self.map.entries()[range.clone()]
            .iter()
            .map(|e| e.source)
            .collect()
    }

    /// Applies one reducer per listed column, one output row per group, the
    /// grouping key columns leading. Output columns are named `count` for
    /// `Count` and `{op}_{column}` otherwise. Terminal.
    pub fn aggregate(mut self, reducers: &[(&str, Reducer)]) -> Result<Table> {
        for (name, _) in reducers {
            self.resolved(name)?;
        }
        let groups = self.build_groups()?;

        let mut out = Table::new();
        // Grouping key columns first, one value per group (the group's first
        // row holds it; all rows in a group agree on the key).
        for name in self.grouped_by.clone() {
            let col = self.resolved(&name)?;
            let firsts: Vec<usize> = groups
                .groups()
                .iter()
                .map(|r| self.group_positions(r)[0])
                .collect();
            out.add_column(col.take(&firsts))?;
        }

        for (name, op) in reducers {
            let col = self.resolved(name)?;
            let mut out_name = match op {
                Reducer::Count => op.name().to_string(),
                _ => format!("{}_{}", op.name(), name),
            };
            // A second Count falls back to the qualified name instead of
            // colliding with the first.
            if out.column(&out_name).is_ok() {
                out_name = format!("{}_{}", op.name(), name);
            }
            let mut reduced = reduce_column(col, op, &groups, &self.map)?;
            reduced.name = out_name;
            out.add_column(reduced)?;
        }
        Ok(out)
    }

    /// Custom per-group reduction: each group's rows are materialized into a
    /// table (all visible columns), handed to `f`, and the per-group results
    /// are concatenated row-wise. Terminal.
    ///
    /// # Errors
    /// [TableError::SchemaMismatch] if `f` returns differently shaped tables
    /// for different groups, besides anything `f` itself reports.
    pub fn reduce<F>(mut self, f: F) -> Result<Table>
    where
        F: Fn(&Table) -> Result<Table>,
    {
        let groups = self.build_groups()?;
        let names = self.visible_names();
        let names: Vec<&str> = names.iter().map(|n| n.as_str()).collect();

        let mut parts = Vec::with_capacity(groups.len());
        for range in groups.groups() {
            let positions = self.group_positions(range);
            let mut part = Table::new();
            for name in &names {
                part.add_column(self.resolved(name)?.take(&positions))?;
            }
            parts.push(f(&part)?);
        }
        if parts.is_empty() {
            return Ok(Table::new());
        }
        crate::combine::rbind(parts)
    }

    /// Custom per-group reduction flattened into one value sequence, in
    /// group order. Terminal.
    pub fn reduce_flatten<F>(mut self, f: F) -> Result<Vec<Value>>
    where
        F: Fn(&Table) -> Vec<Value>,
    {
        let groups = self.build_groups()?;
        let names = self.visible_names();
        let names: Vec<&str> = names.iter().map(|n| n.as_str()).collect();

        let mut flat = Vec::new();
        for range in groups.groups() {
            let positions = self.group_positions(range);
            let mut part = Table::new();
            for name in &names {
                part.add_column(self.resolved(name)?.take(&positions))?;
            }
            flat.extend(f(&part));
        }
        Ok(flat)
    }

    /// Reshapes long-format rows into wide columns: one output row per
    /// group, one column per distinct (stringified) value of `key_col`,
    /// holding the group's `value_col` value for that category (the first
    /// one, if several). `select` restricts the output to a subset of the
    /// produced categories. Terminal.
    ///
    /// # Errors
    /// [TableError::PivotCollision] if `select` names a column pivot did not
    /// produce.
    pub fn pivot(
        mut self,
        key_col: &str,
        value_col: &str,
        select: Option<&[&str]>,
    ) -> Result<Table> {
        let value_type = self.resolved(value_col)?.data_type;
        self.resolved(key_col)?;
        let groups = self.build_groups()?;

        // Categories in first-encounter order over the whole retained set.
        let key = self.resolved(key_col)?;
        let mut categories: Vec<String> = Vec::new();
        for &row in &self.map.source_positions() {
            if let Some(text) = key.value_as_string(row)
                && !key.get(row).is_some_and(|v| v.is_null())
                && !categories.contains(&text)
            {
                categories.push(text);
            }
        }
        if let Some(wanted) = select {
            if let Some(missing) = wanted
                .iter()
                .find(|name| !categories.contains(&name.to_string()))
            {
                return Err(TableError::PivotCollision(format!(
                    "{missing:?} is not a pivot category (have {categories:?})"
                )));
            }
            categories.retain(|c| wanted.contains(&c.as_str()));
        }

        let mut out = Table::new();
        for name in self.grouped_by.clone() {
            let col = self.resolved(&name)?;
            let firsts: Vec<usize> = groups
                .groups()
                .iter()
                .map(|r| self.group_positions(r)[0])
                .collect();
            out.add_column(col.take(&firsts))?;
        }

        let key = self.resolved(key_col)?;
        let values = self.resolved(value_col)?;
        for category in &categories {
            let mut col = Column::new(category.clone(), value_type);
            for range in groups.groups() {
                // Missing keys render empty, so the null check keeps them
                // from matching a legitimate "" category.
                let hit = self.group_positions(range).into_iter().find(|&row| {
                    !key.null_bitmap[row]
                        && key.value_as_string(row).as_deref() == Some(category.as_str())
                });
                match hit {
                    Some(row) => col.push(values.get(row).unwrap_or(Value::Null))?,
                    None => col.push_null(),
                }
            }
            out.add_column(col)?;
        }
        Ok(out)
    }
}

/// Reduces one column over every group.
fn reduce_column(
    col: &Column,
    op: &Reducer,
    groups: &GroupMap,
    map: &IndexMap,
) -> Result<Column> {
    let positions_of = |range: &std::ops::Range<usize>| -> Vec<usize> {
        map.entries()[range.clone()].iter().map(|e| e.source).collect()
    };

    let mut out = match op {
        Reducer::Min | Reducer::Max | Reducer::First | Reducer::Last => col.empty_like(),
        _ => Column::new(op.name(), reduced_type(col, op)?),
    };
    for range in groups.groups() {
        let positions = positions_of(range);
        let value = reduce_group(col, op, &positions)?;
        out.push(value)?;
    }
    Ok(out)
}

/// The output type of a reducer over a column.
fn reduced_type(col: &Column, op: &Reducer) -> Result<DataType> {
    let numeric = |dt: DataType| match dt {
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            Ok(DataType::Int64)
        }
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            Ok(DataType::UInt64)
        }
        DataType::Float32 | DataType::Float64 => Ok(DataType::Float64),
        found => Err(TableError::TypeMismatch {
            expected: DataType::Float64,
            found: Some(found),
        }),
    };
    match op {
        Reducer::Count => Ok(DataType::UInt64),
        Reducer::Sum => numeric(col.data_type),
        Reducer::Mean => {
            numeric(col.data_type)?;
            Ok(DataType::Float64)
        }
        // Order-and-pick reducers inherit the column's own type.
        Reducer::Min | Reducer::Max | Reducer::First | Reducer::Last => Ok(col.data_type),
    }
}

/// Reduces the values of `col` at `positions` to a single value.
fn reduce_group(col: &Column, op: &Reducer, positions: &[usize]) -> Result<Value> {
    let non_null = || positions.iter().filter(|&&p| !col.null_bitmap[p]);
    match op {
        Reducer::Count => Ok(Value::UInt64(positions.len() as u64)),
        Reducer::First => Ok(positions
            .first()
            .and_then(|&p| col.get(p))
            .unwrap_or(Value::Null)),
        Reducer::Last => Ok(positions
            .last()
            .and_then(|&p| col.get(p))
            .unwrap_or(Value::Null)),
        Reducer::Sum => sum_values(col, non_null()),
        Reducer::Mean => {
            let count = non_null().count();
            if count == 0 {
                return Ok(Value::Null);
            }
            let total = match sum_values(col, non_null())? {
                Value::Int64(v) => v as f64,
                Value::UInt64(v) => v as f64,
                Value::Float64(v) => v,
                Value::Null => return Ok(Value::Null),
                _ => unreachable!("sum output is numeric"),
            };
            Ok(Value::Float64(total / count as f64))
        }
        Reducer::Min | Reducer::Max => {
            let taken = col.take(positions);
            let kb = KeyBuilder::new(vec![&taken], NullOrder::Last)?;
            let mut best: Option<(crate::key::RowKey, usize)> = None;
            for (i, &p) in positions.iter().enumerate() {
                if col.null_bitmap[p] {
                    continue;
                }
                let key = kb.key(i);
                let better = match &best {
                    None => true,
                    Some((found, _)) => {
                        if *op == Reducer::Min {
                            key < *found
                        } else {
                            key > *found
                        }
                    }
                };
                if better {
                    best = Some((key, p));
                }
            }
            Ok(best
                .and_then(|(_, p)| col.get(p))
                .unwrap_or(Value::Null))
        }
    }
}

/// Sums the non-null values of `col` at the given positions. Signed widths
/// widen to `Int64`, unsigned to `UInt64`, floats to `Float64`; an empty
/// input sums to null. Integer accumulation is checked: a total past 64
/// bits is [TableError::NumericOverflow], not a wrap.
fn sum_values<'a>(
    col: &Column,
    positions: impl Iterator<Item = &'a usize>,
) -> Result<Value> {
    let overflow = || TableError::NumericOverflow(format!("sum of column {:?}", col.name));
    let mut any = false;
    let mut int_total = 0i64;
    let mut uint_total = 0u64;
    let mut float_total = 0f64;
    let mut kind = None;
    for &p in positions {
        let Some(value) = col.get(p) else { continue };
        if value.is_null() {
            continue;
        }
        any = true;
        if let Some(v) = value.as_i64() {
            int_total = int_total.checked_add(v).ok_or_else(overflow)?;
            kind = Some(0);
        } else if let Some(v) = value.as_u64() {
            uint_total = uint_total.checked_add(v).ok_or_else(overflow)?;
            kind = Some(1);
        } else if let Some(v) = value.as_f64() {
            float_total += v;
            kind = Some(2);
        } else {
            return Err(TableError::TypeMismatch {
                expected: DataType::Float64,
                found: value.data_type(),
            });
        }
    }
    if !any {
        return Ok(Value::Null);
    }
    Ok(match kind {
        Some(0) => Value::Int64(int_total),
        Some(1) => Value::UInt64(uint_total),
        _ => Value::Float64(float_total),
    })
}
