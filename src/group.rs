use std::ops::Range;

use rustc_hash::FxHashMap;

use crate::error::{Result, TableError};
use crate::index_map::IndexMap;
use crate::key::RowKey;

/// A partition of an [IndexMap] into contiguous per-key runs.
///
/// Each group is a `Range` into the map's current entry order; the map's
/// entries are never copied, only delimited. Group order reflects either the
/// sort order (when the map was sorted by the grouping key) or first
/// encounter (hashed grouping).
#[derive(Debug, Clone)]
pub struct GroupMap {
    groups: Vec<Range<usize>>,
}

impl GroupMap {
    /// The per-group ranges, in group order.
    pub fn groups(&self) -> &[Range<usize>] {
        &self.groups
    }

    /// Number of distinct keys encountered.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// One group spanning every retained row (no rows means no groups).
    /// Used when an aggregating terminal runs without a grouping key.
    pub(crate) fn single(rows: usize) -> Self {
        let groups = if rows == 0 { vec![] } else { vec![0..rows] };
        Self { groups }
    }

    /// Builds a group map from an index map already ordered by `keys`: one
    /// contiguous slice per run of equal adjacent keys, in that order.
    ///
    /// # Errors
    /// [TableError::RowCountMismatch] if `keys` is not one key per retained
    /// row.
    pub fn build_sorted(map: &IndexMap, keys: &[RowKey]) -> Result<Self> {
        if keys.len() != map.len() {
            return Err(TableError::RowCountMismatch {
                expected: map.len(),
                found: keys.len(),
            });
        }
        let mut groups = Vec::new();
        let mut start = 0usize;
        for i in 1..keys.len() {
            if keys[i] != keys[start] {
                groups.push(start..i);
                start = i;
            }
        }
        if !keys.is_empty() {
            groups.push(start..keys.len());
        }
        Ok(Self { groups })
    }

    /// Builds a group map without requiring a prior sort: rows are assigned
    /// to groups by key equality, the map is permuted so each group's rows
    /// become contiguous (keeping their prior relative order within a
    /// group), and slices come out in first-encounter order.
    ///
    /// For the same retained rows and keys, membership is identical to
    /// [GroupMap::build_sorted]; only group order and row order differ.
    pub fn build_hashed(map: &mut IndexMap, keys: &[RowKey]) -> Result<Self> {
        if keys.len() != map.len() {
            return Err(TableError::RowCountMismatch {
                expected: map.len(),
                found: keys.len(),
            });
        }
        let mut ids: FxHashMap<RowKey, usize> = FxHashMap::default();
        let mut group_of = Vec::with_capacity(keys.len());
        let mut sizes: Vec<usize> = Vec::new();
        for key in keys {
            let next = ids.len();
            let id = *ids.entry(*key).or_insert(next);
            if id == sizes.len() {
                sizes.push(0);
            }
            sizes[id] += 1;
            group_of.push(id);
        }

        // Prefix sums give each group its contiguous destination range.
        let mut starts = Vec::with_capacity(sizes.len());
        let mut at = 0usize;
        for &size in &sizes {
            starts.push(at);
            at += size;
        }
        let groups: Vec<Range<usize>> = starts
            .iter()
            .zip(&sizes)
            .map(|(&start, &size)| start..start + size)
            .collect();

        // Scatter: old position i lands at the next free slot of its group.
        let mut cursors = starts;
        let mut order = vec![0usize; keys.len()];
        for (i, &id) in group_of.iter().enumerate() {
            order[cursors[id]] = i;
            cursors[id] += 1;
        }
        map.permute(&order);

        Ok(Self { groups })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::data_type::DataType;
    use crate::key::{KeyBuilder, NullOrder};
    use crate::table::Table;
    use crate::value::Value;
    use std::collections::BTreeSet;

    fn keyed_map(values: &[i64]) -> (Table, IndexMap) {
        let mut t = Table::new();
        t.add_column(
            Column::from_values("g", DataType::Int64, values.iter().map(|&v| Value::Int64(v)))
                .unwrap(),
        )
        .unwrap();
        let map = IndexMap::over(values.len());
        (t, map)
    }

    fn keys_for(table: &Table, map: &IndexMap) -> Vec<RowKey> {
        let kb = KeyBuilder::new(vec![table.column("g").unwrap()], NullOrder::First).unwrap();
        kb.keys_at(&map.source_positions())
    }

    #[test]
    fn test_sorted_runs() {
        let (table, mut map) = keyed_map(&[2, 1, 2, 1, 1]);
        let keys = keys_for(&table, &map);
        map.apply_sort(&keys).unwrap();
        let sorted_keys = keys_for(&table, &map);

        let gm = GroupMap::build_sorted(&map, &sorted_keys).unwrap();
        assert_eq!(gm.len(), 2);
        assert_eq!(gm.groups()[0], 0..3); // three 1s
        assert_eq!(gm.groups()[1], 3..5); // two 2s
    }

    #[test]
    fn test_hashed_first_encounter_order() {
        let (table, mut map) = keyed_map(&[2, 1, 2, 1, 1]);
        let keys = keys_for(&table, &map);
        let gm = GroupMap::build_hashed(&mut map, &keys).unwrap();

        // First-encounter order: the 2s group first, then the 1s
        assert_eq!(gm.len(), 2);
        assert_eq!(gm.groups()[0], 0..2);
        assert_eq!(gm.groups()[1], 2..5);

        // Rows stay in prior relative order within each group
        let sources = map.source_positions();
        assert_eq!(sources, vec![0, 2, 1, 3, 4]);
    }

    #[test]
    fn test_sorted_and_hashed_agree_on_membership() {
        let values = [5, 3, 5, 9, 3, 3, 9, 5];
        let (table, map) = keyed_map(&values);

        let mut sorted_map = map.clone();
        let keys = keys_for(&table, &sorted_map);
        sorted_map.apply_sort(&keys).unwrap();
        let sorted_keys = keys_for(&table, &sorted_map);
        let sorted = GroupMap::build_sorted(&sorted_map, &sorted_keys).unwrap();

        let mut hashed_map = map.clone();
        let keys = keys_for(&table, &hashed_map);
        let hashed = GroupMap::build_hashed(&mut hashed_map, &keys).unwrap();

        let collect = |gm: &GroupMap, m: &IndexMap| -> BTreeSet<BTreeSet<usize>> {
            gm.groups()
                .iter()
                .map(|r| m.entries()[r.clone()].iter().map(|e| e.source).collect())
                .collect()
        };
        assert_eq!(collect(&sorted, &sorted_map), collect(&hashed, &hashed_map));
    }

    #[test]
    fn test_empty_input() {
        let (_, mut map) = keyed_map(&[]);
        let gm = GroupMap::build_sorted(&map, &[]).unwrap();
        assert!(gm.is_empty());
        let gm = GroupMap::build_hashed(&mut map, &[]).unwrap();
        assert!(gm.is_empty());
    }

    #[test]
    fn test_key_count_is_checked() {
        let (table, mut map) = keyed_map(&[1, 2]);
        let keys = keys_for(&table, &map);
        assert!(GroupMap::build_sorted(&map, &keys[..1]).is_err());
        assert!(GroupMap::build_hashed(&mut map, &keys[..1]).is_err());
    }
}
