use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use crate::column::{Column, ColumnData};
use crate::error::{Result, TableError};

/// Where missing values sort relative to every non-missing value.
/// The choice is made once per sort/grouping and applies to all key columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullOrder {
    #[default]
    First,
    Last,
}

/// Per-column slot size: 1 null-flag byte + 8 value bytes.
const SLOT: usize = 9;
/// Widest supported key: 8 columns.
const MAX_COLS: usize = 8;

/// A fixed-width byte encoding of one row's value(s) in one to eight
/// columns, used wherever rows must be compared, hashed or ordered.
///
/// Each column occupies 9 bytes (flag + big-endian order-preserving value
/// bits). The column count is rounded up to the next power of two, so a
/// 3-column key and a 4-column key both occupy 36 bytes; padding slots stay
/// zero and compare equal everywhere. One byte-wise comparison therefore
/// serves every column count, instead of one specialization per count.
#[derive(Debug, Clone, Copy)]
pub struct RowKey {
    bytes: [u8; SLOT * MAX_COLS],
    width: usize,
}

impl RowKey {
    /// The number of significant bytes (9 × padded column count).
    pub fn width(&self) -> usize {
        self.width
    }

    /// The significant bytes of the key.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.width]
    }
}

impl PartialEq for RowKey {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for RowKey {}

impl PartialOrd for RowKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RowKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl Hash for RowKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

/// Rounds a column count of 1..=8 up to 1, 2, 4 or 8.
fn padded_cols(cols: usize) -> usize {
    cols.next_power_of_two()
}

/// Maps a signed integer to bits that order unsigned the way the integer
/// orders signed (sign-bit bias).
fn order_i64(v: i64) -> u64 {
    (v ^ i64::MIN) as u64
}

/// Maps a float to bits with a total order matching `<` on non-NaN values
/// (negatives complement every bit, non-negatives set the sign bit). NaN
/// lands above every number, and -0.0 sorts just below 0.0, which is
/// acceptable for grouping since the two compare equal only when their bits
/// do.
fn order_f64(v: f64) -> u64 {
    let bits = v.to_bits();
    if bits & (1 << 63) != 0 {
        !bits
    } else {
        bits | (1 << 63)
    }
}

/// Builds fixed-width comparison keys over a set of columns.
///
/// Construction validates everything once so that [KeyBuilder::key] is a
/// pure, infallible function of the row index.
pub struct KeyBuilder<'c> {
    columns: Vec<&'c Column>,
    null_flag: u8,
    width: usize,
    rows: usize,
}

impl<'c> KeyBuilder<'c> {
    /// Validates the key columns: 1..=8 of them, none a string column, all
    /// of the same length.
    ///
    /// # Errors
    /// [TableError::UnsupportedKeyColumns] otherwise.
    pub fn new(columns: Vec<&'c Column>, null_order: NullOrder) -> Result<Self> {
        if columns.is_empty() || columns.len() > MAX_COLS {
            return Err(TableError::UnsupportedKeyColumns(format!(
                "a key takes 1 to {MAX_COLS} columns, got {}",
                columns.len()
            )));
        }
        for col in &columns {
            if !col.data_type.is_key_eligible() {
                return Err(TableError::UnsupportedKeyColumns(format!(
                    "column {:?} has type {:?}",
                    col.name, col.data_type
                )));
            }
        }
        let rows = columns[0].len();
        if let Some(col) = columns.iter().find(|col| col.len() != rows) {
            return Err(TableError::UnsupportedKeyColumns(format!(
                "column {:?} has {} rows, expected {rows}",
                col.name,
                col.len()
            )));
        }
        let null_flag = match null_order {
            NullOrder::First => 0x00,
            NullOrder::Last => 0xFF,
        };
        let width = SLOT * padded_cols(columns.len());
        Ok(Self {
            columns,
            null_flag,
            width,
            rows,
        })
    }

    /// The number of rows every key column holds.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Encodes one row. Pure; `row` must be below [KeyBuilder::rows].
    pub fn key(&self, row: usize) -> RowKey {
        let mut bytes = [0u8; SLOT * MAX_COLS];
        for (slot, col) in self.columns.iter().enumerate() {
            let at = slot * SLOT;
            if col.null_bitmap[row] {
                bytes[at] = self.null_flag;
                continue;
            }
            // Non-null flag sits strictly between the two null flags.
            bytes[at] = 0x01;
            let ordered: u64 = match &col.data {
                ColumnData::Int8(v) => order_i64(i64::from(v[row])),
                ColumnData::Int16(v) => order_i64(i64::from(v[row])),
                ColumnData::Int32(v) => order_i64(i64::from(v[row])),
                ColumnData::Int64(v) => order_i64(v[row]),
                ColumnData::UInt8(v) => u64::from(v[row]),
                ColumnData::UInt16(v) => u64::from(v[row]),
                ColumnData::UInt32(v) => u64::from(v[row]),
                ColumnData::UInt64(v) => v[row],
                ColumnData::Float32(v) => order_f64(f64::from(v[row])),
                ColumnData::Float64(v) => order_f64(v[row]),
                ColumnData::Bool(v) => u64::from(v[row]),
                ColumnData::Categorical { codes, .. } => u64::from(codes[row]),
                ColumnData::Str(_) => unreachable!("rejected at construction"),
                ColumnData::Fixed(v) => v[row],
            };
            bytes[at + 1..at + SLOT].copy_from_slice(&ordered.to_be_bytes());
        }
        RowKey {
            bytes,
            width: self.width,
        }
    }

    /// Encodes every row, in row order.
    pub fn keys(&self) -> Vec<RowKey> {
        (0..self.rows).map(|row| self.key(row)).collect()
    }

    /// Encodes only the listed rows, in the listed order.
    pub fn keys_at(&self, rows: &[usize]) -> Vec<RowKey> {
        rows.iter().map(|&row| self.key(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;
    use crate::value::Value;

    fn int_col(name: &str, values: &[Option<i64>]) -> Column {
        Column::from_values(
            name,
            DataType::Int64,
            values
                .iter()
                .map(|v| v.map(Value::Int64).unwrap_or(Value::Null)),
        )
        .unwrap()
    }

    #[test]
    fn test_single_column_key_orders_like_integers() {
        let col = int_col("v", &[Some(-5), Some(3), Some(0), Some(i64::MIN), Some(i64::MAX)]);
        let kb = KeyBuilder::new(vec![&col], NullOrder::First).unwrap();
        let keys = kb.keys();
        assert!(keys[3] < keys[0]); // MIN < -5
        assert!(keys[0] < keys[2]); // -5 < 0
        assert!(keys[2] < keys[1]); // 0 < 3
        assert!(keys[1] < keys[4]); // 3 < MAX
        assert_eq!(keys[0].width(), 9);
    }

    #[test]
    fn test_float_keys_total_order() {
        let col = Column::from_values(
            "f",
            DataType::Float64,
            [
                Value::Float64(-1.5),
                Value::Float64(0.0),
                Value::Float64(2.25),
                Value::Float64(f64::NEG_INFINITY),
                Value::Float64(f64::INFINITY),
            ],
        )
        .unwrap();
        let kb = KeyBuilder::new(vec![&col], NullOrder::First).unwrap();
        let keys = kb.keys();
        assert!(keys[3] < keys[0]);
        assert!(keys[0] < keys[1]);
        assert!(keys[1] < keys[2]);
        assert!(keys[2] < keys[4]);
    }

    #[test]
    fn test_null_order_is_caller_selectable() {
        let col = int_col("v", &[None, Some(i64::MIN), Some(i64::MAX)]);

        let first = KeyBuilder::new(vec![&col], NullOrder::First).unwrap();
        let keys = first.keys();
        assert!(keys[0] < keys[1]);
        assert!(keys[0] < keys[2]);

        let last = KeyBuilder::new(vec![&col], NullOrder::Last).unwrap();
        let keys = last.keys();
        assert!(keys[0] > keys[1]);
        assert!(keys[0] > keys[2]);
    }

    #[test]
    fn test_power_of_two_rounding() {
        // A 3-column key over int8 columns occupies the same 36 bytes as a
        // 4-column key.
        let cols: Vec<Column> = (0..4)
            .map(|i| {
                Column::from_values(
                    format!("c{i}"),
                    DataType::Int8,
                    [Value::Int8(1), Value::Int8(2)],
                )
                .unwrap()
            })
            .collect();

        let three = KeyBuilder::new(cols.iter().take(3).collect(), NullOrder::First).unwrap();
        let four = KeyBuilder::new(cols.iter().collect(), NullOrder::First).unwrap();
        assert_eq!(three.key(0).width(), 36);
        assert_eq!(four.key(0).width(), 36);

        let mut widths = vec![];
        for n in [1, 2, 3, 4, 5, 8] {
            let kb = KeyBuilder::new(cols.iter().cycle().take(n).collect(), NullOrder::First);
            widths.push(kb.unwrap().key(0).width());
        }
        assert_eq!(widths, vec![9, 18, 36, 36, 72, 72]);
    }

    #[test]
    fn test_multi_column_ties_break_on_later_columns() {
        let a = int_col("a", &[Some(1), Some(1), Some(2)]);
        let b = int_col("b", &[Some(9), Some(3), Some(0)]);
        let kb = KeyBuilder::new(vec![&a, &b], NullOrder::First).unwrap();
        let keys = kb.keys();
        assert!(keys[1] < keys[0]); // (1,3) < (1,9)
        assert!(keys[0] < keys[2]); // (1,9) < (2,0)
    }

    #[test]
    fn test_equal_values_equal_keys_across_hash_and_eq() {
        let a = int_col("a", &[Some(7), Some(7)]);
        let kb = KeyBuilder::new(vec![&a], NullOrder::First).unwrap();
        assert_eq!(kb.key(0), kb.key(1));

        use std::collections::hash_map::DefaultHasher;
        let mut h0 = DefaultHasher::new();
        let mut h1 = DefaultHasher::new();
        kb.key(0).hash(&mut h0);
        kb.key(1).hash(&mut h1);
        assert_eq!(h0.finish(), h1.finish());
    }

    #[test]
    fn test_rejects_strings_and_bad_shapes() {
        let s = Column::from_values("s", DataType::Str, [Value::Str("x".into())]).unwrap();
        assert!(matches!(
            KeyBuilder::new(vec![&s], NullOrder::First),
            Err(TableError::UnsupportedKeyColumns(_))
        ));

        assert!(KeyBuilder::new(vec![], NullOrder::First).is_err());

        let a = int_col("a", &[Some(1)]);
        let nine: Vec<&Column> = std::iter::repeat(&a).take(9).collect();
        assert!(KeyBuilder::new(nine, NullOrder::First).is_err());

        let b = int_col("b", &[Some(1), Some(2)]);
        assert!(KeyBuilder::new(vec![&a, &b], NullOrder::First).is_err());
    }

    #[test]
    fn test_categorical_and_bool_and_fixed_are_key_eligible() {
        let mut c = Column::new_categorical("c", vec!["x".into(), "y".into()]);
        c.push(Value::Cat(1)).unwrap();
        let mut b = Column::new("b", DataType::Bool);
        b.push(Value::Bool(true)).unwrap();
        let mut f = Column::new("f", DataType::Fixed);
        f.push(Value::Fixed(0xdead)).unwrap();
        assert!(KeyBuilder::new(vec![&c, &b, &f], NullOrder::First).is_ok());
    }
}
