use rustc_hash::FxHashMap;
use tracing::debug;

use crate::column::{Column, ColumnData};
use crate::error::{Result, TableError};
use crate::key::{KeyBuilder, NullOrder, RowKey};
use crate::table::Table;
use crate::value::Value;

/// Which rows survive a join.
///
/// `Right` is intentionally absent: the asymmetry is resolved by swapping
/// operand order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Only rows whose keys match on both sides.
    Inner,
    /// Every left row; unmatched right columns become missing.
    Left,
    /// Every row from both sides; unmatched columns on either side become
    /// missing.
    Outer,
}

/// Builds a join of two or more tables on a shared key, left-associatively.
///
/// Two row-pairing strategies share the key codec: a hash join (the default;
/// output row order follows the probe side) and a sort-merge join (when
/// sorted output is requested; both sides' plans are sorted by key and
/// merged in one forward pass).
pub struct Join<'t> {
    tables: Vec<&'t Table>,
    /// Leftmost operand after an optional pre-join filter.
    filtered_left: Option<Table>,
    keys: Vec<String>,
    kind: JoinKind,
    sorted: Option<NullOrder>,
}

impl<'t> Join<'t> {
    /// Starts a join with the leftmost operand.
    pub fn new(left: &'t Table) -> Self {
        Self {
            tables: vec![left],
            filtered_left: None,
            keys: Vec::new(),
            kind: JoinKind::Inner,
            sorted: None,
        }
    }

    /// Filters the leftmost operand's rows before any pairing happens.
    pub fn filter<F>(mut self, pred: F) -> Result<Self>
    where
        F: Fn(&Table, usize) -> bool,
    {
        let left = self.tables[0];
        let mask: bitvec::vec::BitVec = (0..left.row_count()).map(|row| pred(left, row)).collect();
        let mut map = crate::index_map::IndexMap::over(left.row_count());
        map.apply_filter(&mask)?;
        self.filtered_left = Some(map.materialize(left, &left.column_names())?);
        Ok(self)
    }

    /// Adds the next operand to the right.
    pub fn with(mut self, table: &'t Table) -> Self {
        self.tables.push(table);
        self
    }

    /// Names the join key columns, present on every operand.
    pub fn on(mut self, keys: &[&str]) -> Self {
        self.keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    /// Chooses which rows survive. Defaults to [JoinKind::Inner].
    pub fn kind(mut self, kind: JoinKind) -> Self {
        self.kind = kind;
        self
    }

    /// Requests output sorted by the join key, switching the strategy to
    /// sort-merge. `null_order` decides where null-keyed rows land.
    pub fn sorted(mut self, null_order: NullOrder) -> Self {
        self.sorted = Some(null_order);
        self
    }

    /// Executes the join.
    ///
    /// # Errors
    /// [TableError::JoinKeyMismatch] if fewer than two operands were given
    /// or the key columns' types differ between sides;
    /// [TableError::UnsupportedKeyColumns] for string/oversized keys;
    /// [TableError::ColumnNotFound] if a key column is absent somewhere.
    pub fn run(self) -> Result<Table> {
        if self.tables.len() < 2 {
            return Err(TableError::JoinKeyMismatch(format!(
                "a join takes at least two tables, got {}",
                self.tables.len()
            )));
        }
        let keys: Vec<&str> = self.keys.iter().map(|k| k.as_str()).collect();
        let first = self.filtered_left.as_ref().unwrap_or(self.tables[0]);
        let mut acc = pair(first, self.tables[1], &keys, self.kind, self.sorted)?;
        for right in &self.tables[2..] {
            acc = pair(&acc, right, &keys, self.kind, self.sorted)?;
        }
        Ok(acc)
    }
}

/// Row pairing produced by either strategy: left and/or right source
/// position, `None` on the unmatched side.
type Pairing = Vec<(Option<usize>, Option<usize>)>;

fn pair(
    left: &Table,
    right: &Table,
    keys: &[&str],
    kind: JoinKind,
    sorted: Option<NullOrder>,
) -> Result<Table> {
    let left_cols: Vec<&Column> = keys
        .iter()
        .map(|k| left.column(k))
        .collect::<Result<_>>()?;
    let right_cols: Vec<&Column> = keys
        .iter()
        .map(|k| right.column(k))
        .collect::<Result<_>>()?;
    for (l, r) in left_cols.iter().zip(&right_cols) {
        if l.data_type != r.data_type {
            return Err(TableError::JoinKeyMismatch(format!(
                "key column {:?} is {:?} on the left, {:?} on the right",
                l.name, l.data_type, r.data_type
            )));
        }
        if let (
            ColumnData::Categorical { labels: a, .. },
            ColumnData::Categorical { labels: b, .. },
        ) = (&l.data, &r.data)
            && a != b
        {
            return Err(TableError::JoinKeyMismatch(format!(
                "key column {:?} has different label sets",
                l.name
            )));
        }
    }

    let null_order = sorted.unwrap_or_default();
    let left_keys = KeyBuilder::new(left_cols.clone(), null_order)?;
    let right_keys = KeyBuilder::new(right_cols.clone(), null_order)?;
    let left_null = null_mask(&left_cols);
    let right_null = null_mask(&right_cols);

    let pairing = match sorted {
        None => hash_pairing(&left_keys, &right_keys, &left_null, &right_null, kind),
        Some(_) => merge_pairing(&left_keys, &right_keys, &left_null, &right_null, kind),
    };
    debug!(
        strategy = if sorted.is_some() { "sort-merge" } else { "hash" },
        rows = pairing.len(),
        "join paired"
    );
    materialize_pairs(left, right, keys, &pairing)
}

/// Per-row flag: any key column missing makes the row's key null, and a
/// null key never matches anything (not even another null).
fn null_mask(cols: &[&Column]) -> Vec<bool> {
    let rows = cols.first().map_or(0, |c| c.len());
    (0..rows)
        .map(|row| cols.iter().any(|c| c.null_bitmap[row]))
        .collect()
}

/// Build a hash index of the right side's keys, probe with the left.
/// Output order: probe order, then (for outer) unmatched right rows in
/// right order.
fn hash_pairing(
    left: &KeyBuilder<'_>,
    right: &KeyBuilder<'_>,
    left_null: &[bool],
    right_null: &[bool],
    kind: JoinKind,
) -> Pairing {
    let mut index: FxHashMap<RowKey, Vec<usize>> = FxHashMap::default();
    for row in 0..right.rows() {
        if !right_null[row] {
            index.entry(right.key(row)).or_default().push(row);
        }
    }

    let mut pairs = Vec::new();
    let mut right_matched = vec![false; right.rows()];
    for row in 0..left.rows() {
        let hits = if left_null[row] {
            None
        } else {
            index.get(&left.key(row))
        };
        match hits {
            Some(hits) => {
                for &r in hits {
                    right_matched[r] = true;
                    pairs.push((Some(row), Some(r)));
                }
            }
            None => {
                if kind != JoinKind::Inner {
                    pairs.push((Some(row), None));
                }
            }
        }
    }
    if kind == JoinKind::Outer {
        for (row, matched) in right_matched.iter().enumerate() {
            if !matched {
                pairs.push((None, Some(row)));
            }
        }
    }
    pairs
}

/// Sort both sides by key, then walk them in one forward pass, emitting the
/// cross product of each pair of equal-key runs. Null-keyed runs never
/// match; they surface (or not) according to the join kind, in the order
/// the null flag sorts them.
fn merge_pairing(
    left: &KeyBuilder<'_>,
    right: &KeyBuilder<'_>,
    left_null: &[bool],
    right_null: &[bool],
    kind: JoinKind,
) -> Pairing {
    let sort_side = |kb: &KeyBuilder<'_>| -> (Vec<usize>, Vec<RowKey>) {
        let mut order: Vec<usize> = (0..kb.rows()).collect();
        let keys = kb.keys();
        order.sort_by_key(|&i| keys[i]);
        let sorted_keys = order.iter().map(|&i| keys[i]).collect();
        (order, sorted_keys)
    };
    let (lorder, lkeys) = sort_side(left);
    let (rorder, rkeys) = sort_side(right);

    let run_end = |keys: &[RowKey], start: usize| -> usize {
        let mut end = start + 1;
        while end < keys.len() && keys[end] == keys[start] {
            end += 1;
        }
        end
    };

    let mut pairs = Vec::new();
    let (mut li, mut ri) = (0usize, 0usize);
    while li < lkeys.len() && ri < rkeys.len() {
        let lend = run_end(&lkeys, li);
        let rend = run_end(&rkeys, ri);
        let null_run = left_null[lorder[li]] || right_null[rorder[ri]];
        match lkeys[li].cmp(&rkeys[ri]) {
            std::cmp::Ordering::Less => {
                if kind != JoinKind::Inner {
                    pairs.extend(lorder[li..lend].iter().map(|&l| (Some(l), None)));
                }
                li = lend;
            }
            std::cmp::Ordering::Greater => {
                if kind == JoinKind::Outer {
                    pairs.extend(rorder[ri..rend].iter().map(|&r| (None, Some(r))));
                }
                ri = rend;
            }
            std::cmp::Ordering::Equal if null_run => {
                // Equal bytes but both runs hold null keys: no match.
                if kind != JoinKind::Inner {
                    pairs.extend(lorder[li..lend].iter().map(|&l| (Some(l), None)));
                }
                if kind == JoinKind::Outer {
                    pairs.extend(rorder[ri..rend].iter().map(|&r| (None, Some(r))));
                }
                li = lend;
                ri = rend;
            }
            std::cmp::Ordering::Equal => {
                for &l in &lorder[li..lend] {
                    for &r in &rorder[ri..rend] {
                        pairs.push((Some(l), Some(r)));
                    }
                }
                li = lend;
                ri = rend;
            }
        }
    }
    if kind != JoinKind::Inner {
        while li < lkeys.len() {
            pairs.push((Some(lorder[li]), None));
            li += 1;
        }
    }
    if kind == JoinKind::Outer {
        while ri < rkeys.len() {
            pairs.push((None, Some(rorder[ri])));
            ri += 1;
        }
    }
    pairs
}

/// Materializes the paired rows: every left column (key values coalesced
/// from whichever side is present), then the right side's non-key columns,
/// `_right`-suffixed on a name collision. Unmatched cells come out missing,
/// never defaulted.
fn materialize_pairs(
    left: &Table,
    right: &Table,
    keys: &[&str],
    pairing: &Pairing,
) -> Result<Table> {
    let lpos: Vec<Option<usize>> = pairing.iter().map(|&(l, _)| l).collect();
    let rpos: Vec<Option<usize>> = pairing.iter().map(|&(_, r)| r).collect();

    let mut out = Table::new();
    for col in left.columns() {
        if keys.contains(&col.name.as_str()) {
            out.add_column(coalesce_key(col, right.column(&col.name)?, pairing)?)?;
        } else {
            out.add_column(col.take_opt(&lpos))?;
        }
    }
    for col in right.columns() {
        if keys.contains(&col.name.as_str()) {
            continue;
        }
        let mut taken = col.take_opt(&rpos);
        if out.column(&taken.name).is_ok() {
            taken.name = format!("{}_right", taken.name);
        }
        out.add_column(taken)?;
    }
    Ok(out)
}

/// A key column's output values: the left row's where present, otherwise
/// the right row's (outer joins surface right-only keys this way).
fn coalesce_key(left: &Column, right: &Column, pairing: &Pairing) -> Result<Column> {
    let mut out = left.empty_like();
    out.reserve(pairing.len());
    for &(l, r) in pairing {
        match (l, r) {
            (Some(l), _) => out.push(left.get(l).unwrap_or(Value::Null))?,
            (None, Some(r)) => out.push(right.get(r).unwrap_or(Value::Null))?,
            (None, None) => out.push_null(),
        }
    }
    Ok(out)
}
