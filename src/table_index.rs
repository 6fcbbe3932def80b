use rustc_hash::FxHashMap;

use crate::column::Column;
use crate::error::Result;
use crate::key::{KeyBuilder, NullOrder, RowKey};
use crate::table::Table;
use crate::value::Value;

/// Equality index over one or more key columns of a table.
///
/// Buckets every row by its encoded key so that repeated point lookups run
/// in O(1) per probe instead of scanning. Rows whose key holds a missing
/// value are not indexed, and a probe containing a missing value matches
/// nothing.
pub struct TableIndex<'t> {
    table: &'t Table,
    columns: Vec<String>,
    buckets: FxHashMap<RowKey, Vec<usize>>,
}

impl<'t> TableIndex<'t> {
    /// Builds the index over the named key columns.
    ///
    /// # Errors
    /// Propagates [crate::TableError::ColumnNotFound] and the key-codec
    /// shape errors (string columns, more than eight columns).
    pub fn build(table: &'t Table, columns: &[&str]) -> Result<Self> {
        let cols: Vec<&Column> = columns
            .iter()
            .map(|name| table.column(name))
            .collect::<Result<_>>()?;
        let null_masks: Vec<&bitvec::slice::BitSlice> =
            cols.iter().map(|c| c.null_bitmap.as_bitslice()).collect();
        let kb = KeyBuilder::new(cols, NullOrder::First)?;

        let mut buckets: FxHashMap<RowKey, Vec<usize>> = FxHashMap::default();
        for row in 0..table.row_count() {
            if null_masks.iter().any(|mask| mask[row]) {
                continue;
            }
            buckets.entry(kb.key(row)).or_default().push(row);
        }
        Ok(Self {
            table,
            columns: columns.iter().map(|n| n.to_string()).collect(),
            buckets,
        })
    }

    /// Number of distinct indexed keys.
    pub fn distinct_keys(&self) -> usize {
        self.buckets.len()
    }

    /// All rows whose key equals `values`, in source order.
    ///
    /// A probe with a missing value yields an empty view.
    ///
    /// # Errors
    /// [crate::TableError::UnsupportedKeyColumns] if `values` does not have
    /// one value per indexed column, or a type error if a probe value does
    /// not fit its column.
    pub fn lookup(&self, values: &[Value]) -> Result<TableView<'t>> {
        if values.len() != self.columns.len() {
            return Err(crate::error::TableError::UnsupportedKeyColumns(format!(
                "probe has {} values for {} key columns",
                values.len(),
                self.columns.len()
            )));
        }
        if values.iter().any(Value::is_null) {
            return Ok(TableView {
                table: self.table,
                rows: Vec::new(),
            });
        }

        // Encode the probe through a one-row clone of each key column so it
        // hashes identically to the indexed rows.
        let mut probes: Vec<Column> = Vec::with_capacity(values.len());
        for (name, value) in self.columns.iter().zip(values) {
            let mut probe = self.table.column(name)?.empty_like();
            probe.push(value.clone())?;
            probes.push(probe);
        }
        let kb = KeyBuilder::new(probes.iter().collect(), NullOrder::First)?;
        let rows = self.buckets.get(&kb.key(0)).cloned().unwrap_or_default();
        Ok(TableView {
            table: self.table,
            rows,
        })
    }
}

/// A borrowed subset of a table's rows, as produced by [TableIndex::lookup].
pub struct TableView<'t> {
    table: &'t Table,
    rows: Vec<usize>,
}

impl<'t> TableView<'t> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Source row positions in the view, in source order.
    pub fn iter_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.rows.iter().copied()
    }

    /// The value of `name` at the `i`-th row of the view.
    pub fn cell(&self, name: &str, i: usize) -> Result<Value> {
        let row = *self
            .rows
            .get(i)
            .ok_or(crate::error::TableError::RowOutOfBounds {
                row: i,
                rows: self.rows.len(),
            })?;
        self.table.cell(name, row)
    }

    /// Copies the viewed rows into an owned table.
    pub fn to_table(&self) -> Result<Table> {
        let mut out = Table::new();
        for name in self.table.column_names() {
            out.add_column(self.table.column(name)?.take(&self.rows))?;
        }
        Ok(out)
    }
}
