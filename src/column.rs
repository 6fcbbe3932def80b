use std::sync::Arc;

use crate::data_type::DataType;
use crate::error::{Result, TableError};
use crate::value::Value;
use bitvec::prelude::*;

/// Physical storage for column data.
/// Each variant wraps a collection of a specific type to ensure contiguous
/// memory allocation (columnar storage).
#[derive(Debug, Clone)]
pub enum ColumnData {
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    /// Compact bit-vector for boolean values.
    Bool(BitVec),
    /// Dictionary-encoded labels: one code per row plus the bounded label set.
    Categorical {
        codes: Vec<u32>,
        labels: Vec<Arc<str>>,
    },
    /// Thread-safe reference-counted strings.
    Str(Vec<Arc<str>>),
    /// User-defined fixed-size scalars, packed to 64 bits.
    Fixed(Vec<u64>),
}

impl ColumnData {
    fn empty(data_type: DataType) -> Self {
        match data_type {
            DataType::Int8 => Self::Int8(vec![]),
            DataType::Int16 => Self::Int16(vec![]),
            DataType::Int32 => Self::Int32(vec![]),
            DataType::Int64 => Self::Int64(vec![]),
            DataType::UInt8 => Self::UInt8(vec![]),
            DataType::UInt16 => Self::UInt16(vec![]),
            DataType::UInt32 => Self::UInt32(vec![]),
            DataType::UInt64 => Self::UInt64(vec![]),
            DataType::Float32 => Self::Float32(vec![]),
            DataType::Float64 => Self::Float64(vec![]),
            DataType::Bool => Self::Bool(bitvec!()),
            DataType::Categorical => Self::Categorical {
                codes: vec![],
                labels: vec![],
            },
            DataType::Str => Self::Str(vec![]),
            DataType::Fixed => Self::Fixed(vec![]),
        }
    }
}

/// Represents a column within a table.
/// It combines metadata (name, type) with actual data and a nullability
/// tracker.
#[derive(Debug, Clone)]
pub struct Column {
    /// The name of the column.
    pub name: String,
    /// The logical data type of the column.
    pub data_type: DataType,
    /// The actual values stored in the column.
    pub data: ColumnData,
    /// A bitmap where a `true` bit indicates that the value at that index is
    /// missing.
    pub null_bitmap: BitVec,
}

impl Column {
    /// Creates a new, empty column with the specified name and data type.
    /// The underlying data storage is initialized according to the data type.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            data: ColumnData::empty(data_type),
            null_bitmap: bitvec!(),
        }
    }

    /// Creates an empty categorical column over the given bounded label set.
    pub fn new_categorical(name: impl Into<String>, labels: Vec<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            data_type: DataType::Categorical,
            data: ColumnData::Categorical {
                codes: vec![],
                labels,
            },
            null_bitmap: bitvec!(),
        }
    }

    /// Builds a full column from an iterator of values.
    ///
    /// # Errors
    /// Returns an error if any value's type does not match `data_type`.
    pub fn from_values(
        name: impl Into<String>,
        data_type: DataType,
        values: impl IntoIterator<Item = Value>,
    ) -> Result<Self> {
        let mut col = Self::new(name, data_type);
        for value in values {
            col.push(value)?;
        }
        Ok(col)
    }

    /// Appends a new value to the end of the column.
    ///
    /// # Errors
    /// Returns [TableError::TypeMismatch] if the value's type does not match
    /// the column's data type.
    ///
    /// # Behavior
    /// - If the value is `Null`, a default "dummy" value is pushed to the data
    ///   vector to maintain index alignment with the null bitmap.
    /// - Pushing a [Value::Str] into a categorical column resolves the label
    ///   against the dictionary; an unknown label is a type mismatch.
    pub fn push(&mut self, value: Value) -> Result<()> {
        if value.is_null() {
            self.push_null();
            return Ok(());
        }

        // Label-to-code convenience for categorical columns.
        let value = match (&self.data, value) {
            (ColumnData::Categorical { labels, .. }, Value::Str(s)) => {
                let code = labels.iter().position(|l| **l == *s).ok_or_else(|| {
                    TableError::TypeMismatch {
                        expected: DataType::Categorical,
                        found: Some(DataType::Str),
                    }
                })?;
                Value::Cat(code as u32)
            }
            (_, value) => value,
        };

        if value.data_type() != Some(self.data_type) {
            return Err(TableError::TypeMismatch {
                expected: self.data_type,
                found: value.data_type(),
            });
        }

        self.null_bitmap.push(false);
        match (&mut self.data, value) {
            (ColumnData::Int8(col), Value::Int8(v)) => col.push(v),
            (ColumnData::Int16(col), Value::Int16(v)) => col.push(v),
            (ColumnData::Int32(col), Value::Int32(v)) => col.push(v),
            (ColumnData::Int64(col), Value::Int64(v)) => col.push(v),
            (ColumnData::UInt8(col), Value::UInt8(v)) => col.push(v),
            (ColumnData::UInt16(col), Value::UInt16(v)) => col.push(v),
            (ColumnData::UInt32(col), Value::UInt32(v)) => col.push(v),
            (ColumnData::UInt64(col), Value::UInt64(v)) => col.push(v),
            (ColumnData::Float32(col), Value::Float32(v)) => col.push(v),
            (ColumnData::Float64(col), Value::Float64(v)) => col.push(v),
            (ColumnData::Bool(col), Value::Bool(v)) => col.push(v),
            (ColumnData::Categorical { codes, .. }, Value::Cat(v)) => codes.push(v),
            (ColumnData::Str(col), Value::Str(v)) => col.push(v),
            (ColumnData::Fixed(col), Value::Fixed(v)) => col.push(v),
            _ => unreachable!("type checked above"),
        }
        Ok(())
    }

    /// Returns a zero-row column with the same name, type and categorical
    /// dictionary as this one.
    pub fn empty_like(&self) -> Column {
        match &self.data {
            ColumnData::Categorical { labels, .. } => {
                Self::new_categorical(self.name.clone(), labels.clone())
            }
            _ => Self::new(self.name.clone(), self.data_type),
        }
    }

    /// Appends a missing value. Always succeeds.
    ///
    /// A default "dummy" value is pushed to the data vector to maintain index
    /// alignment with the null bitmap.
    pub fn push_null(&mut self) {
        self.null_bitmap.push(true);
        match &mut self.data {
            ColumnData::Int8(v) => v.push(0),
            ColumnData::Int16(v) => v.push(0),
            ColumnData::Int32(v) => v.push(0),
            ColumnData::Int64(v) => v.push(0),
            ColumnData::UInt8(v) => v.push(0),
            ColumnData::UInt16(v) => v.push(0),
            ColumnData::UInt32(v) => v.push(0),
            ColumnData::UInt64(v) => v.push(0),
            ColumnData::Float32(v) => v.push(0.0),
            ColumnData::Float64(v) => v.push(0.0),
            ColumnData::Bool(v) => v.push(false),
            ColumnData::Categorical { codes, .. } => codes.push(0),
            ColumnData::Str(v) => v.push("".into()),
            ColumnData::Fixed(v) => v.push(0),
        }
    }

    /// Returns the number of rows currently stored in the column.
    pub fn len(&self) -> usize {
        self.null_bitmap.len()
    }

    /// Returns true if there is no row in the column, else false.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reserves capacity for at least `extra_rows` additional rows.
    pub fn reserve(&mut self, extra_rows: usize) {
        self.null_bitmap.reserve(extra_rows);
        match &mut self.data {
            ColumnData::Int8(v) => v.reserve(extra_rows),
            ColumnData::Int16(v) => v.reserve(extra_rows),
            ColumnData::Int32(v) => v.reserve(extra_rows),
            ColumnData::Int64(v) => v.reserve(extra_rows),
            ColumnData::UInt8(v) => v.reserve(extra_rows),
            ColumnData::UInt16(v) => v.reserve(extra_rows),
            ColumnData::UInt32(v) => v.reserve(extra_rows),
            ColumnData::UInt64(v) => v.reserve(extra_rows),
            ColumnData::Float32(v) => v.reserve(extra_rows),
            ColumnData::Float64(v) => v.reserve(extra_rows),
            ColumnData::Bool(v) => v.reserve(extra_rows),
            ColumnData::Categorical { codes, .. } => codes.reserve(extra_rows),
            ColumnData::Str(v) => v.reserve(extra_rows),
            ColumnData::Fixed(v) => v.reserve(extra_rows),
        }
    }

    /// Retrieves the value at the specified row index.
    ///
    /// Returns `Some(Value)` if the index is valid, or `None` if it is out of
    /// bounds. If the null bitmap indicates a missing value at the index,
    /// `Some(Value::Null)` is returned.
    pub fn get(&self, row_idx: usize) -> Option<Value> {
        if row_idx >= self.len() {
            return None;
        }
        if self.null_bitmap[row_idx] {
            return Some(Value::Null);
        }
        let value = match &self.data {
            ColumnData::Int8(col) => Value::Int8(col[row_idx]),
            ColumnData::Int16(col) => Value::Int16(col[row_idx]),
            ColumnData::Int32(col) => Value::Int32(col[row_idx]),
            ColumnData::Int64(col) => Value::Int64(col[row_idx]),
            ColumnData::UInt8(col) => Value::UInt8(col[row_idx]),
            ColumnData::UInt16(col) => Value::UInt16(col[row_idx]),
            ColumnData::UInt32(col) => Value::UInt32(col[row_idx]),
            ColumnData::UInt64(col) => Value::UInt64(col[row_idx]),
            ColumnData::Float32(col) => Value::Float32(col[row_idx]),
            ColumnData::Float64(col) => Value::Float64(col[row_idx]),
            ColumnData::Bool(col) => Value::Bool(col[row_idx]),
            ColumnData::Categorical { codes, .. } => Value::Cat(codes[row_idx]),
            ColumnData::Str(col) => Value::Str(col[row_idx].clone()),
            ColumnData::Fixed(col) => Value::Fixed(col[row_idx]),
        };
        Some(value)
    }

    /// Replace a value in the column by a new value.
    ///
    /// # Errors
    /// Returns an error if the row index is out of bounds or if the value's
    /// type does not match the column's data type.
    ///
    /// # Behavior
    /// - If the new value is `Null`, only the null bitmap is touched: the
    ///   bitmap is the first thing checked on read.
    pub fn set(&mut self, row_idx: usize, value: &Value) -> Result<()> {
        if self.len() <= row_idx {
            return Err(TableError::RowOutOfBounds {
                row: row_idx,
                rows: self.len(),
            });
        }

        if value.is_null() {
            self.null_bitmap.set(row_idx, true);
            return Ok(());
        }

        let resolved;
        let value = match (&self.data, value) {
            (ColumnData::Categorical { labels, .. }, Value::Str(s)) => {
                let code = labels.iter().position(|l| **l == **s).ok_or_else(|| {
                    TableError::TypeMismatch {
                        expected: DataType::Categorical,
                        found: Some(DataType::Str),
                    }
                })?;
                resolved = Value::Cat(code as u32);
                &resolved
            }
            (_, value) => value,
        };

        if value.data_type() != Some(self.data_type) {
            return Err(TableError::TypeMismatch {
                expected: self.data_type,
                found: value.data_type(),
            });
        }

        self.null_bitmap.set(row_idx, false);
        match (&mut self.data, value) {
            (ColumnData::Int8(col), Value::Int8(v)) => col[row_idx] = *v,
            (ColumnData::Int16(col), Value::Int16(v)) => col[row_idx] = *v,
            (ColumnData::Int32(col), Value::Int32(v)) => col[row_idx] = *v,
            (ColumnData::Int64(col), Value::Int64(v)) => col[row_idx] = *v,
            (ColumnData::UInt8(col), Value::UInt8(v)) => col[row_idx] = *v,
            (ColumnData::UInt16(col), Value::UInt16(v)) => col[row_idx] = *v,
            (ColumnData::UInt32(col), Value::UInt32(v)) => col[row_idx] = *v,
            (ColumnData::UInt64(col), Value::UInt64(v)) => col[row_idx] = *v,
            (ColumnData::Float32(col), Value::Float32(v)) => col[row_idx] = *v,
            (ColumnData::Float64(col), Value::Float64(v)) => col[row_idx] = *v,
            (ColumnData::Bool(col), Value::Bool(v)) => {
                col.set(row_idx, *v);
            }
            (ColumnData::Categorical { codes, .. }, Value::Cat(v)) => codes[row_idx] = *v,
            (ColumnData::Str(col), Value::Str(v)) => col[row_idx] = Arc::clone(v),
            (ColumnData::Fixed(col), Value::Fixed(v)) => col[row_idx] = *v,
            _ => unreachable!("type checked above"),
        }
        Ok(())
    }

    /// Gathers the listed row positions into a fresh column, in the given
    /// order. Positions must be in bounds; this is the materialization
    /// primitive used by the planner, which only ever produces valid ones.
    pub fn take(&self, positions: &[usize]) -> Column {
        let mut null_bitmap = BitVec::with_capacity(positions.len());
        for &p in positions {
            null_bitmap.push(self.null_bitmap[p]);
        }
        let data = match &self.data {
            ColumnData::Int8(v) => ColumnData::Int8(positions.iter().map(|&p| v[p]).collect()),
            ColumnData::Int16(v) => ColumnData::Int16(positions.iter().map(|&p| v[p]).collect()),
            ColumnData::Int32(v) => ColumnData::Int32(positions.iter().map(|&p| v[p]).collect()),
            ColumnData::Int64(v) => ColumnData::Int64(positions.iter().map(|&p| v[p]).collect()),
            ColumnData::UInt8(v) => ColumnData::UInt8(positions.iter().map(|&p| v[p]).collect()),
            ColumnData::UInt16(v) => ColumnData::UInt16(positions.iter().map(|&p| v[p]).collect()),
            ColumnData::UInt32(v) => ColumnData::UInt32(positions.iter().map(|&p| v[p]).collect()),
            ColumnData::UInt64(v) => ColumnData::UInt64(positions.iter().map(|&p| v[p]).collect()),
            ColumnData::Float32(v) => {
                ColumnData::Float32(positions.iter().map(|&p| v[p]).collect())
            }
            ColumnData::Float64(v) => {
                ColumnData::Float64(positions.iter().map(|&p| v[p]).collect())
            }
            ColumnData::Bool(v) => ColumnData::Bool(positions.iter().map(|&p| v[p]).collect()),
            ColumnData::Categorical { codes, labels } => ColumnData::Categorical {
                codes: positions.iter().map(|&p| codes[p]).collect(),
                labels: labels.clone(),
            },
            ColumnData::Str(v) => {
                ColumnData::Str(positions.iter().map(|&p| v[p].clone()).collect())
            }
            ColumnData::Fixed(v) => ColumnData::Fixed(positions.iter().map(|&p| v[p]).collect()),
        };
        Column {
            name: self.name.clone(),
            data_type: self.data_type,
            data,
            null_bitmap,
        }
    }

    /// Gathers like [Column::take], but a `None` position produces a missing
    /// value (how join output surfaces unmatched rows).
    pub fn take_opt(&self, positions: &[Option<usize>]) -> Column {
        if self.is_empty() {
            let mut out = self.empty_like();
            for _ in positions {
                out.push_null();
            }
            return out;
        }
        // Gather a dummy slot for the misses, then mark them missing.
        let gathered: Vec<usize> = positions.iter().map(|p| p.unwrap_or(0)).collect();
        let mut out = self.take(&gathered);
        for (i, p) in positions.iter().enumerate() {
            if p.is_none() {
                out.null_bitmap.set(i, true);
            }
        }
        out
    }

    /// Appends every row of `other` to this column (used by rbind).
    ///
    /// # Errors
    /// Returns [TableError::SchemaMismatch] if the types differ, or if two
    /// categorical columns carry different dictionaries.
    pub fn append(&mut self, other: &Column) -> Result<()> {
        if self.data_type != other.data_type {
            return Err(TableError::SchemaMismatch(format!(
                "column {:?} is {:?}, column {:?} is {:?}",
                self.name, self.data_type, other.name, other.data_type
            )));
        }
        if let (
            ColumnData::Categorical { labels: a, .. },
            ColumnData::Categorical { labels: b, .. },
        ) = (&self.data, &other.data)
            && a != b
        {
            return Err(TableError::SchemaMismatch(format!(
                "categorical column {:?} has a different label set",
                other.name
            )));
        }
        self.null_bitmap.extend_from_bitslice(&other.null_bitmap);
        match (&mut self.data, &other.data) {
            (ColumnData::Int8(a), ColumnData::Int8(b)) => a.extend_from_slice(b),
            (ColumnData::Int16(a), ColumnData::Int16(b)) => a.extend_from_slice(b),
            (ColumnData::Int32(a), ColumnData::Int32(b)) => a.extend_from_slice(b),
            (ColumnData::Int64(a), ColumnData::Int64(b)) => a.extend_from_slice(b),
            (ColumnData::UInt8(a), ColumnData::UInt8(b)) => a.extend_from_slice(b),
            (ColumnData::UInt16(a), ColumnData::UInt16(b)) => a.extend_from_slice(b),
            (ColumnData::UInt32(a), ColumnData::UInt32(b)) => a.extend_from_slice(b),
            (ColumnData::UInt64(a), ColumnData::UInt64(b)) => a.extend_from_slice(b),
            (ColumnData::Float32(a), ColumnData::Float32(b)) => a.extend_from_slice(b),
            (ColumnData::Float64(a), ColumnData::Float64(b)) => a.extend_from_slice(b),
            (ColumnData::Bool(a), ColumnData::Bool(b)) => a.extend_from_bitslice(b),
            (ColumnData::Categorical { codes: a, .. }, ColumnData::Categorical { codes: b, .. }) => {
                a.extend_from_slice(b)
            }
            (ColumnData::Str(a), ColumnData::Str(b)) => a.extend_from_slice(b),
            (ColumnData::Fixed(a), ColumnData::Fixed(b)) => a.extend_from_slice(b),
            _ => unreachable!("type checked above"),
        }
        Ok(())
    }

    /// Recycles a zero- or one-row column to `rows` rows: a single value is
    /// repeated, an empty column broadcasts to all-null.
    ///
    /// # Errors
    /// Returns [TableError::RowCountMismatch] for any other length.
    pub fn broadcast(&self, rows: usize) -> Result<Column> {
        match self.len() {
            0 => {
                let mut col = Column {
                    name: self.name.clone(),
                    data_type: self.data_type,
                    data: self.data.clone(),
                    null_bitmap: bitvec!(),
                };
                for _ in 0..rows {
                    col.push_null();
                }
                Ok(col)
            }
            1 => Ok(self.take(&vec![0; rows])),
            found => Err(TableError::RowCountMismatch {
                expected: rows,
                found,
            }),
        }
    }

    /// Resolves a categorical code to its label, if this column is
    /// categorical and the code is in range.
    pub fn label(&self, code: u32) -> Option<&str> {
        match &self.data {
            ColumnData::Categorical { labels, .. } => {
                labels.get(code as usize).map(|l| l.as_ref())
            }
            _ => None,
        }
    }

    /// Renders the value at `row_idx` as text. Missing values render empty,
    /// categorical codes render as their label.
    pub fn value_as_string(&self, row_idx: usize) -> Option<String> {
        let value = self.get(row_idx)?;
        if let Value::Cat(code) = value
            && let Some(label) = self.label(code)
        {
            return Some(label.to_string());
        }
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;
    use crate::value::Value;

    #[test]
    fn test_column_new() {
        let col = Column::new("age", DataType::Int32);
        assert_eq!(col.name, "age");
        assert_eq!(col.data_type, DataType::Int32);
        assert_eq!(col.len(), 0);
        assert!(col.is_empty());
    }

    #[test]
    fn test_push_and_get() {
        let mut col = Column::new("test", DataType::Int64);
        col.push(Value::Int64(42)).unwrap();
        assert_eq!(col.len(), 1);
        assert_eq!(col.get(0), Some(Value::Int64(42)));
        assert!(!col.null_bitmap[0]);
    }

    #[test]
    fn test_null_handling() {
        let mut col = Column::new("nullable", DataType::Int64);
        col.push(Value::Int64(10)).unwrap();
        col.push(Value::Null).unwrap();
        col.push(Value::Int64(20)).unwrap();

        assert_eq!(col.len(), 3);
        assert_eq!(col.get(0), Some(Value::Int64(10)));
        assert_eq!(col.get(1), Some(Value::Null));
        assert_eq!(col.get(2), Some(Value::Int64(20)));
        assert!(col.null_bitmap[1]);
    }

    #[test]
    fn test_type_mismatch() {
        let mut col = Column::new("int_col", DataType::Int64);
        let result = col.push(Value::Str("hello".into()));
        assert!(matches!(result, Err(TableError::TypeMismatch { .. })));
        assert_eq!(col.len(), 0);

        // Narrow widths are distinct semantic types
        let result = col.push(Value::Int8(1));
        assert!(result.is_err());
    }

    #[test]
    fn test_out_of_bounds() {
        let col = Column::new("test", DataType::Int64);
        assert_eq!(col.get(0), None);
        assert_eq!(col.get(100), None);
    }

    #[test]
    fn test_column_set() {
        let mut col = Column::new("age", DataType::Int32);
        col.push(Value::Int32(30)).unwrap();
        col.push(Value::Null).unwrap();

        col.set(0, &Value::Int32(31)).unwrap();
        assert_eq!(col.get(0), Some(Value::Int32(31)));

        col.set(1, &Value::Int32(25)).unwrap();
        assert_eq!(col.get(1), Some(Value::Int32(25)));

        col.set(0, &Value::Null).unwrap();
        assert_eq!(col.get(0), Some(Value::Null));

        assert!(col.set(0, &Value::Str("hello".into())).is_err());
        assert!(matches!(
            col.set(10, &Value::Int32(42)),
            Err(TableError::RowOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_bool_storage() {
        let mut col = Column::new("flag", DataType::Bool);
        col.push(Value::Bool(true)).unwrap();
        col.push(Value::Null).unwrap();
        col.push(Value::Bool(false)).unwrap();
        assert_eq!(col.get(0), Some(Value::Bool(true)));
        assert_eq!(col.get(1), Some(Value::Null));
        assert_eq!(col.get(2), Some(Value::Bool(false)));
        col.set(2, &Value::Bool(true)).unwrap();
        assert_eq!(col.get(2), Some(Value::Bool(true)));
    }

    #[test]
    fn test_categorical_labels() {
        let mut col = Column::new_categorical("color", vec!["red".into(), "blue".into()]);
        col.push(Value::Cat(1)).unwrap();
        col.push(Value::Str("red".into())).unwrap();
        assert_eq!(col.get(0), Some(Value::Cat(1)));
        assert_eq!(col.get(1), Some(Value::Cat(0)));
        assert_eq!(col.label(1), Some("blue"));
        assert_eq!(col.value_as_string(0), Some("blue".to_string()));

        // Unknown label is rejected
        assert!(col.push(Value::Str("green".into())).is_err());
    }

    #[test]
    fn test_take_gathers_in_order() {
        let mut col = Column::new("v", DataType::Int64);
        for i in 0..5 {
            col.push(Value::Int64(i)).unwrap();
        }
        col.set(3, &Value::Null).unwrap();

        let taken = col.take(&[4, 3, 0]);
        assert_eq!(taken.len(), 3);
        assert_eq!(taken.get(0), Some(Value::Int64(4)));
        assert_eq!(taken.get(1), Some(Value::Null));
        assert_eq!(taken.get(2), Some(Value::Int64(0)));
    }

    #[test]
    fn test_append_type_checked() {
        let mut a = Column::from_values("v", DataType::Int64, [Value::Int64(1)]).unwrap();
        let b = Column::from_values("v", DataType::Int64, [Value::Null, Value::Int64(3)]).unwrap();
        a.append(&b).unwrap();
        assert_eq!(a.len(), 3);
        assert_eq!(a.get(1), Some(Value::Null));
        assert_eq!(a.get(2), Some(Value::Int64(3)));

        let c = Column::new("v", DataType::Float64);
        assert!(matches!(
            a.append(&c),
            Err(TableError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_broadcast_recycling() {
        let single = Column::from_values("k", DataType::Int64, [Value::Int64(7)]).unwrap();
        let wide = single.broadcast(4).unwrap();
        assert_eq!(wide.len(), 4);
        assert_eq!(wide.get(3), Some(Value::Int64(7)));

        let empty = Column::new("k", DataType::Int64);
        let nulls = empty.broadcast(3).unwrap();
        assert_eq!(nulls.len(), 3);
        assert_eq!(nulls.get(1), Some(Value::Null));

        let two =
            Column::from_values("k", DataType::Int64, [Value::Int64(1), Value::Int64(2)]).unwrap();
        assert!(matches!(
            two.broadcast(4),
            Err(TableError::RowCountMismatch { .. })
        ));
    }

    #[test]
    fn test_value_as_string() {
        let mut col = Column::new("v", DataType::Float64);
        col.push(Value::Float64(1.5)).unwrap();
        col.push(Value::Null).unwrap();
        assert_eq!(col.value_as_string(0), Some("1.5".to_string()));
        assert_eq!(col.value_as_string(1), Some(String::new()));
        assert_eq!(col.value_as_string(9), None);
    }
}
