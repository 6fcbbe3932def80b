use crate::error::{Result, TableError};
use crate::table::Table;

/// Column-wise union of two or more tables, taking ownership of every input
/// column (no column data is copied).
///
/// Recycling rule: a zero- or one-row operand's columns are broadcast to the
/// common row count (empty columns become all-null, single values repeat).
/// Any other row-count disagreement is a [TableError::RowCountMismatch];
/// a column name appearing twice is a [TableError::DuplicateColumn].
pub fn cbind(tables: Vec<Table>) -> Result<Table> {
    // The common row count is the largest operand's; everything else must
    // match it or be recyclable.
    let rows = tables.iter().map(Table::row_count).max().unwrap_or(0);
    let mut out = Table::new();
    for table in tables {
        let table_rows = table.row_count();
        for col in table.into_columns() {
            if table_rows == rows {
                out.add_column(col)?;
            } else {
                out.add_column(col.broadcast(rows)?)?;
            }
        }
    }
    Ok(out)
}

/// Column-wise union by reference: borrows every input immutably and copies
/// its columns. Same recycling and uniqueness rules as [cbind].
pub fn cbind_ref(tables: &[&Table]) -> Result<Table> {
    cbind(tables.iter().map(|t| (*t).clone()).collect())
}

/// Row-wise concatenation of two or more tables.
///
/// Requires an identical schema on every operand: the same column name set
/// (order is irrelevant; the first operand's order wins) with the same type
/// and categorical dictionary per name, else [TableError::SchemaMismatch].
/// Unlike [cbind], the consuming variant still copies cell data: a
/// column-major layout cannot splice two columns' backing storage by
/// reference, so rbind always builds fresh arrays.
pub fn rbind(tables: Vec<Table>) -> Result<Table> {
    let refs: Vec<&Table> = tables.iter().collect();
    rbind_ref(&refs)
}

/// Row-wise concatenation by reference. See [rbind].
pub fn rbind_ref(tables: &[&Table]) -> Result<Table> {
    let Some((first, rest)) = tables.split_first() else {
        return Ok(Table::new());
    };
    for other in rest {
        let mut names = first.column_names();
        let mut other_names = other.column_names();
        names.sort_unstable();
        other_names.sort_unstable();
        if names != other_names {
            return Err(TableError::SchemaMismatch(format!(
                "column sets differ: {:?} vs {:?}",
                first.column_names(),
                other.column_names()
            )));
        }
    }

    let mut out = Table::from_schema(first);
    let total: usize = tables.iter().map(|t| t.row_count()).sum();
    out.reserve(total);
    for table in tables {
        for col in table.columns() {
            // from_schema preserved the names, so resolution cannot miss
            out.column_mut(&col.name)?.append(col)?;
        }
    }
    out.sync_row_count();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::data_type::DataType;
    use crate::error::TableError;
    use crate::value::Value;

    fn int_table(name: &str, values: &[i64]) -> Table {
        let mut t = Table::new();
        t.add_column(
            Column::from_values(name, DataType::Int64, values.iter().map(|&v| Value::Int64(v)))
                .unwrap(),
        )
        .unwrap();
        t
    }

    #[test]
    fn test_cbind_moves_columns() {
        let a = int_table("x", &[1, 2, 3]);
        let b = int_table("y", &[4, 5, 6]);
        let joined = cbind(vec![a, b]).unwrap();
        assert_eq!(joined.column_names(), vec!["x", "y"]);
        assert_eq!(joined.row_count(), 3);
        assert_eq!(joined.cell("y", 2).unwrap(), Value::Int64(6));
    }

    #[test]
    fn test_cbind_ref_leaves_inputs_alive() {
        let a = int_table("x", &[1, 2]);
        let b = int_table("y", &[3, 4]);
        let joined = cbind_ref(&[&a, &b]).unwrap();
        assert_eq!(joined.column_count(), 2);
        assert_eq!(a.row_count(), 2);
        assert_eq!(b.row_count(), 2);
    }

    #[test]
    fn test_cbind_recycles_short_operands() {
        let a = int_table("x", &[1, 2, 3]);
        let single = int_table("k", &[9]);
        let empty = {
            let mut t = Table::new();
            t.add_column(Column::new("e", DataType::Float64)).unwrap();
            t
        };
        let joined = cbind(vec![a, single, empty]).unwrap();
        assert_eq!(joined.row_count(), 3);
        assert_eq!(joined.cell("k", 2).unwrap(), Value::Int64(9));
        assert_eq!(joined.cell("e", 0).unwrap(), Value::Null);
    }

    #[test]
    fn test_cbind_rejects_bad_row_counts_and_duplicates() {
        let a = int_table("x", &[1, 2, 3]);
        let b = int_table("y", &[1, 2]);
        assert!(matches!(
            cbind(vec![a, b]),
            Err(TableError::RowCountMismatch { .. })
        ));

        let a = int_table("x", &[1, 2]);
        let b = int_table("x", &[3, 4]);
        assert!(matches!(
            cbind(vec![a, b]),
            Err(TableError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_cbind_then_drop_is_identity() {
        let a = int_table("x", &[1, 2]);
        let b = int_table("y", &[3, 4]);
        let mut joined = cbind_ref(&[&a, &b]).unwrap();
        joined.drop_column("y").unwrap();
        assert_eq!(joined.column_names(), a.column_names());
        assert_eq!(joined.row(0), a.row(0));
        assert_eq!(joined.row(1), a.row(1));
    }

    #[test]
    fn test_rbind_concatenates_rows() {
        let a = int_table("x", &[1, 2]);
        let b = int_table("x", &[3]);
        let stacked = rbind(vec![a, b]).unwrap();
        assert_eq!(stacked.row_count(), 3);
        assert_eq!(stacked.cell("x", 2).unwrap(), Value::Int64(3));
    }

    #[test]
    fn test_rbind_requires_identical_schema() {
        let a = int_table("x", &[1]);
        let b = int_table("y", &[2]);
        assert!(matches!(
            rbind(vec![a, b]),
            Err(TableError::SchemaMismatch(_))
        ));

        let a = int_table("x", &[1]);
        let mut b = Table::new();
        b.add_column(
            Column::from_values("x", DataType::Float64, [Value::Float64(1.0)]).unwrap(),
        )
        .unwrap();
        assert!(matches!(
            rbind(vec![a, b]),
            Err(TableError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_rbind_accepts_reordered_columns() {
        let mut a = int_table("x", &[1, 2]);
        a.add_column(
            Column::from_values("y", DataType::Int64, [Value::Int64(10), Value::Int64(20)])
                .unwrap(),
        )
        .unwrap();
        let mut b = int_table("y", &[30]);
        b.add_column(Column::from_values("x", DataType::Int64, [Value::Int64(3)]).unwrap())
            .unwrap();

        // Same name set in a different order appends by name; the first
        // operand's column order wins.
        let stacked = rbind_ref(&[&a, &b]).unwrap();
        assert_eq!(stacked.column_names(), vec!["x", "y"]);
        assert_eq!(stacked.row_count(), 3);
        assert_eq!(stacked.cell("x", 2).unwrap(), Value::Int64(3));
        assert_eq!(stacked.cell("y", 2).unwrap(), Value::Int64(30));
    }

    #[test]
    fn test_rbind_of_partition_reconstructs_table() {
        let whole = int_table("x", &[1, 2, 3, 4, 5]);
        let head = int_table("x", &[1, 2]);
        let tail = int_table("x", &[3, 4, 5]);
        let rebuilt = rbind_ref(&[&head, &tail]).unwrap();
        assert_eq!(rebuilt.row_count(), whole.row_count());
        for i in 0..5 {
            assert_eq!(rebuilt.row(i), whole.row(i));
        }
    }

    #[test]
    fn test_rbind_empty_input() {
        assert_eq!(rbind(vec![]).unwrap().row_count(), 0);
    }
}
