use bitvec::prelude::*;

use crate::error::{Result, TableError};
use crate::key::RowKey;
use crate::table::Table;

/// Pipeline stage a plan currently sits in. Strictly forward: a plan enters
/// at `Source`, may pass through `Filtered`, may pass through
/// `SortedSelected`, and terminates by materialization or grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Source,
    Filtered,
    SortedSelected,
}

/// One row's position across the pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Position in the source table. Never renumbered.
    pub source: usize,
    /// Position among the rows that survived filtering.
    pub filtered: usize,
    /// Position after the (optional) sort.
    pub ordered: usize,
}

/// A plan tracking, for every row still under consideration, its position
/// across the source/filtered/sorted stages, without moving any data.
///
/// Entries are removed when a row fails a filter (renumbering the latter two
/// coordinates, never the source coordinate) and reordered by a sort
/// (renumbering only the last coordinate). The source table is only ever
/// read; nothing here mutates it. One map lives for the duration of one
/// query/join call.
#[derive(Debug, Clone)]
pub struct IndexMap {
    entries: Vec<IndexEntry>,
    stage: Stage,
}

impl IndexMap {
    /// A fresh plan over `rows` source rows, every coordinate the identity.
    pub fn over(rows: usize) -> Self {
        let entries = (0..rows)
            .map(|i| IndexEntry {
                source: i,
                filtered: i,
                ordered: i,
            })
            .collect();
        Self {
            entries,
            stage: Stage::Source,
        }
    }

    /// The rows currently retained, in plan order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Number of retained rows.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Source positions of the retained rows, in plan order. The gather list
    /// for materialization and key building.
    pub fn source_positions(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.source).collect()
    }

    /// ANDs a mask over the *currently retained* rows with the retained set:
    /// `mask[i]` decides the fate of the i-th retained row. Repeated calls
    /// fold into one pruned map, so predicates may be applied in any order.
    ///
    /// The mask domain is the retained set, not the source table: a
    /// source-length mask is only valid on a fresh plan, and after a filter
    /// the next mask must match the shrunken length.
    ///
    /// # Errors
    /// [TableError::RowCountMismatch] if the mask length is not the retained
    /// row count; [TableError::PipelineOrder] if a sort already happened
    /// (the pipeline is strictly forward).
    pub fn apply_filter(&mut self, mask: &BitSlice) -> Result<()> {
        if self.stage == Stage::SortedSelected {
            return Err(TableError::PipelineOrder("filter must precede sort"));
        }
        if mask.len() != self.entries.len() {
            return Err(TableError::RowCountMismatch {
                expected: self.entries.len(),
                found: mask.len(),
            });
        }
        let mut kept = 0usize;
        self.entries = self
            .entries
            .iter()
            .enumerate()
            .filter(|(i, _)| mask[*i])
            .map(|(_, e)| {
                let renumbered = IndexEntry {
                    source: e.source,
                    filtered: kept,
                    ordered: kept,
                };
                kept += 1;
                renumbered
            })
            .collect();
        self.stage = Stage::Filtered;
        Ok(())
    }

    /// Stable sort of the retained rows by key; ties keep their prior
    /// relative order. Only the `ordered` coordinate is renumbered.
    ///
    /// # Errors
    /// [TableError::RowCountMismatch] if `keys` is not one key per retained
    /// row.
    pub fn apply_sort(&mut self, keys: &[RowKey]) -> Result<()> {
        if keys.len() != self.entries.len() {
            return Err(TableError::RowCountMismatch {
                expected: self.entries.len(),
                found: keys.len(),
            });
        }
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by_key(|&i| keys[i]);
        self.reorder(&order);
        Ok(())
    }

    /// Reorders the retained rows by an explicit permutation of current plan
    /// positions (hashed grouping uses this to make groups contiguous).
    /// `order` must be a permutation of `0..len`.
    pub fn permute(&mut self, order: &[usize]) {
        self.reorder(order);
    }

    fn reorder(&mut self, order: &[usize]) {
        self.entries = order
            .iter()
            .enumerate()
            .map(|(new_pos, &old_pos)| IndexEntry {
                ordered: new_pos,
                ..self.entries[old_pos]
            })
            .collect();
        self.stage = Stage::SortedSelected;
    }

    /// Copies the selected columns' values from `source` at each retained
    /// row's source position, in plan order, into a new table. The terminal
    /// step of the pipeline.
    ///
    /// # Errors
    /// [TableError::ColumnNotFound] for an unknown column name.
    pub fn materialize(&self, source: &Table, columns: &[&str]) -> Result<Table> {
        let positions = self.source_positions();
        let mut out = Table::new();
        for name in columns {
            let col = source.column(name)?;
            out.add_column(col.take(&positions))?;
        }
        Ok(out)
    }
}
