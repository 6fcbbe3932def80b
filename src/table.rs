use crate::column::Column;
use crate::data_type::DataType;
use crate::error::{Result, TableError};
use crate::value::Value;

/// The top-level columnar container: an ordered set of uniquely named
/// columns, all of identical length.
///
/// The row count is the structural invariant partner to column-name
/// uniqueness: every mutator checks both. A table is exclusively owned by
/// its creator until passed by reference or consumed by a combine/query
/// call; the engine never mutates a table it only borrowed.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Creates a new table with no columns and no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table copying another table's column names, types
    /// and categorical dictionaries, with zero rows.
    pub fn from_schema(other: &Table) -> Self {
        let columns = other.columns.iter().map(Column::empty_like).collect();
        Self {
            columns,
            row_count: 0,
        }
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the column names in table order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|col| col.name.as_str()).collect()
    }

    /// Returns all columns in table order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Retrieves a reference to a column by name.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|col| col.name == name)
            .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))
    }

    /// Retrieves a mutable reference to a column by name.
    pub fn column_mut(&mut self, name: &str) -> Result<&mut Column> {
        self.columns
            .iter_mut()
            .find(|col| col.name == name)
            .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))
    }

    /// Retrieves an owned copy of a column by name.
    pub fn column_cloned(&self, name: &str) -> Result<Column> {
        self.column(name).cloned()
    }

    /// Retrieves the value of one cell.
    pub fn cell(&self, name: &str, row_idx: usize) -> Result<Value> {
        let col = self.column(name)?;
        col.get(row_idx).ok_or(TableError::RowOutOfBounds {
            row: row_idx,
            rows: self.row_count,
        })
    }

    /// Renders one cell as text (missing values render empty, categorical
    /// codes render as their label).
    pub fn cell_as_string(&self, name: &str, row_idx: usize) -> Result<String> {
        let col = self.column(name)?;
        col.value_as_string(row_idx)
            .ok_or(TableError::RowOutOfBounds {
                row: row_idx,
                rows: self.row_count,
            })
    }

    /// Writes one cell.
    ///
    /// # Errors
    /// [TableError::ColumnNotFound], [TableError::RowOutOfBounds] or
    /// [TableError::TypeMismatch].
    pub fn set_cell(&mut self, name: &str, row_idx: usize, value: &Value) -> Result<()> {
        self.column_mut(name)?.set(row_idx, value)
    }

    /// Adds a column to the table.
    ///
    /// # Errors
    /// [TableError::DuplicateColumn] if the name is taken, or
    /// [TableError::RowCountMismatch] if the column's length differs from the
    /// table's current row count. A column added to a table with no columns
    /// yet establishes the row count.
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.columns.iter().any(|col| col.name == column.name) {
            return Err(TableError::DuplicateColumn(column.name));
        }
        if !self.columns.is_empty() && column.len() != self.row_count {
            return Err(TableError::RowCountMismatch {
                expected: self.row_count,
                found: column.len(),
            });
        }
        self.row_count = column.len();
        self.columns.push(column);
        Ok(())
    }

    /// Replaces a column of the same name, or adds it if absent. The length
    /// check of [Table::add_column] applies either way.
    pub fn replace_or_add_column(&mut self, column: Column) -> Result<()> {
        if let Some(slot) = self.columns.iter_mut().find(|col| col.name == column.name) {
            if column.len() != self.row_count {
                return Err(TableError::RowCountMismatch {
                    expected: self.row_count,
                    found: column.len(),
                });
            }
            *slot = column;
            return Ok(());
        }
        self.add_column(column)
    }

    /// Keeps only the listed columns, in the listed order.
    ///
    /// # Errors
    /// [TableError::ColumnNotFound] if any name is unknown; the table is
    /// untouched in that case.
    pub fn retain_columns(&mut self, names: &[&str]) -> Result<()> {
        let mut kept = Vec::with_capacity(names.len());
        for name in names {
            let idx = self
                .columns
                .iter()
                .position(|col| col.name == *name)
                .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))?;
            kept.push(idx);
        }
        let mut columns = Vec::with_capacity(kept.len());
        for idx in kept {
            columns.push(self.columns[idx].clone());
        }
        self.columns = columns;
        if self.columns.is_empty() {
            self.row_count = 0;
        }
        Ok(())
    }

    /// Removes one column by name.
    pub fn drop_column(&mut self, name: &str) -> Result<Column> {
        let idx = self
            .columns
            .iter()
            .position(|col| col.name == name)
            .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))?;
        let col = self.columns.remove(idx);
        if self.columns.is_empty() {
            self.row_count = 0;
        }
        Ok(col)
    }

    /// Reserves capacity for at least `extra_rows` additional rows in every
    /// column.
    pub fn reserve(&mut self, extra_rows: usize) {
        for col in &mut self.columns {
            col.reserve(extra_rows);
        }
    }

    /// Appends a row, one value per column in table order.
    ///
    /// # Errors
    /// [TableError::RowCountMismatch] if the number of values differs from
    /// the number of columns, [TableError::TypeMismatch] if any value has the
    /// wrong type. No value is written unless all values check out.
    pub fn push_row(&mut self, values: Vec<Value>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(TableError::RowCountMismatch {
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        for (col, value) in self.columns.iter().zip(&values) {
            if !value.is_null()
                && value.data_type() != Some(col.data_type)
                && !(col.data_type == DataType::Categorical
                    && value.data_type() == Some(DataType::Str))
            {
                return Err(TableError::TypeMismatch {
                    expected: col.data_type,
                    found: value.data_type(),
                });
            }
        }
        for (col, value) in self.columns.iter_mut().zip(values) {
            col.push(value)?;
        }
        self.row_count += 1;
        Ok(())
    }

    /// Retrieves a whole row, one value per column in table order.
    pub fn row(&self, row_idx: usize) -> Option<Vec<Value>> {
        if self.row_count <= row_idx {
            return None;
        }
        self.columns.iter().map(|col| col.get(row_idx)).collect()
    }

    /// Consumes the table into its columns (used by the combine engine to
    /// transfer column ownership without copying).
    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    /// Re-derives the row count from the first column after direct column
    /// appends (the combine engine extends columns in place).
    pub(crate) fn sync_row_count(&mut self) {
        self.row_count = self.columns.first().map_or(0, Column::len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;

    fn two_col_table() -> Table {
        let mut t = Table::new();
        t.add_column(
            Column::from_values(
                "id",
                DataType::Int64,
                [Value::Int64(1), Value::Int64(2)],
            )
            .unwrap(),
        )
        .unwrap();
        t.add_column(
            Column::from_values(
                "name",
                DataType::Str,
                [Value::Str("Alice".into()), Value::Str("Bob".into())],
            )
            .unwrap(),
        )
        .unwrap();
        t
    }

    #[test]
    fn test_table_creation() {
        let table = two_col_table();
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_names(), vec!["id", "name"]);
    }

    #[test]
    fn test_from_schema_copies_types_not_rows() {
        let table = two_col_table();
        let empty = Table::from_schema(&table);
        assert_eq!(empty.row_count(), 0);
        assert_eq!(empty.column_names(), vec!["id", "name"]);
        assert_eq!(empty.column("id").unwrap().data_type, DataType::Int64);
    }

    #[test]
    fn test_push_row_and_get_row() {
        let mut table = two_col_table();
        table
            .push_row(vec![Value::Int64(3), Value::Null])
            .unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(
            table.row(2),
            Some(vec![Value::Int64(3), Value::Null])
        );
        assert_eq!(table.row(9), None);
    }

    #[test]
    fn test_push_row_rejects_bad_shape_atomically() {
        let mut table = two_col_table();
        assert!(matches!(
            table.push_row(vec![Value::Int64(3)]),
            Err(TableError::RowCountMismatch { .. })
        ));
        // Wrong type in the second slot: the first must not be written either
        assert!(matches!(
            table.push_row(vec![Value::Int64(3), Value::Int64(4)]),
            Err(TableError::TypeMismatch { .. })
        ));
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("id").unwrap().len(), 2);
    }

    #[test]
    fn test_cell_access() {
        let mut table = two_col_table();
        assert_eq!(table.cell("id", 1).unwrap(), Value::Int64(2));
        assert_eq!(table.cell_as_string("name", 0).unwrap(), "Alice");
        assert!(matches!(
            table.cell("missing", 0),
            Err(TableError::ColumnNotFound(_))
        ));
        assert!(matches!(
            table.cell("id", 99),
            Err(TableError::RowOutOfBounds { .. })
        ));

        table.set_cell("id", 0, &Value::Int64(10)).unwrap();
        assert_eq!(table.cell("id", 0).unwrap(), Value::Int64(10));
        table.set_cell("id", 0, &Value::Null).unwrap();
        assert_eq!(table.cell("id", 0).unwrap(), Value::Null);
    }

    #[test]
    fn test_add_column_checks_length_and_name() {
        let mut table = two_col_table();
        let short = Column::from_values("v", DataType::Int64, [Value::Int64(1)]).unwrap();
        assert!(matches!(
            table.add_column(short),
            Err(TableError::RowCountMismatch { .. })
        ));

        let dup = Column::from_values(
            "id",
            DataType::Int64,
            [Value::Int64(1), Value::Int64(2)],
        )
        .unwrap();
        assert!(matches!(
            table.add_column(dup),
            Err(TableError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_replace_or_add_column() {
        let mut table = two_col_table();
        let replacement = Column::from_values(
            "id",
            DataType::Float64,
            [Value::Float64(0.5), Value::Float64(1.5)],
        )
        .unwrap();
        table.replace_or_add_column(replacement).unwrap();
        assert_eq!(table.cell("id", 0).unwrap(), Value::Float64(0.5));

        let added = Column::from_values(
            "score",
            DataType::Int64,
            [Value::Int64(9), Value::Int64(8)],
        )
        .unwrap();
        table.replace_or_add_column(added).unwrap();
        assert_eq!(table.column_count(), 3);
    }

    #[test]
    fn test_retain_and_drop_columns() {
        let mut table = two_col_table();
        assert!(table.retain_columns(&["name", "nope"]).is_err());
        // Failed retain leaves the table untouched
        assert_eq!(table.column_count(), 2);

        table.retain_columns(&["name"]).unwrap();
        assert_eq!(table.column_names(), vec!["name"]);
        assert_eq!(table.row_count(), 2);

        table.drop_column("name").unwrap();
        assert_eq!(table.column_count(), 0);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_first_column_establishes_row_count() {
        let mut table = Table::new();
        let col =
            Column::from_values("v", DataType::Int64, [Value::Int64(1), Value::Int64(2)])
                .unwrap();
        table.add_column(col).unwrap();
        assert_eq!(table.row_count(), 2);
    }
}
