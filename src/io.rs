use std::io::{BufRead, Read, Write};
use std::sync::Arc;

use bitvec::slice::BitSlice;

use crate::column::{Column, ColumnData};
use crate::data_type::DataType;
use crate::error::{Result, TableError};
use crate::table::Table;
use crate::value::Value;

const MAGIC: [u8; 4] = *b"TBLA";
const VERSION: u32 = 1;

/// Appends delimited rows to a table whose schema is already established.
///
/// The first line must be a header matching the table's column names in
/// order. Empty fields parse as missing values; every other field parses
/// by the destination column's type.
///
/// # Errors
/// [TableError::Corrupt] on a header or field that does not parse,
/// [TableError::Io] on read failure.
pub fn read_delimited(table: &mut Table, reader: impl BufRead, delim: char) -> Result<()> {
    let names = table.column_names();
    let types: Vec<DataType> = table.columns().iter().map(|c| c.data_type).collect();
    let mut lines = reader.lines();

    let header = lines
        .next()
        .transpose()?
        .ok_or_else(|| TableError::Corrupt("missing header line".to_string()))?;
    let header: Vec<&str> = header.split(delim).collect();
    if header != names {
        return Err(TableError::Corrupt(format!(
            "header {header:?} does not match schema {names:?}"
        )));
    }

    for line in lines {
        let line = line?;
        let fields: Vec<&str> = line.split(delim).collect();
        if fields.len() != types.len() {
            return Err(TableError::Corrupt(format!(
                "row has {} fields, schema has {} columns",
                fields.len(),
                types.len()
            )));
        }
        let values: Vec<Value> = fields
            .iter()
            .zip(&types)
            .map(|(field, &data_type)| parse_field(field, data_type))
            .collect::<Result<_>>()?;
        table.push_row(values)?;
    }
    Ok(())
}

/// Writes a header line plus one delimited line per row. Missing values
/// render as empty fields, categorical codes as their label.
pub fn write_delimited(table: &Table, mut writer: impl Write, delim: char) -> Result<()> {
    writeln!(writer, "{}", table.column_names().join(&delim.to_string()))?;
    for row in 0..table.row_count() {
        let fields: Vec<String> = table
            .columns()
            .iter()
            .map(|col| col.value_as_string(row).unwrap_or_default())
            .collect();
        writeln!(writer, "{}", fields.join(&delim.to_string()))?;
    }
    Ok(())
}

fn parse_field(text: &str, data_type: DataType) -> Result<Value> {
    if text.is_empty() {
        return Ok(Value::Null);
    }
    let bad = || TableError::Corrupt(format!("cannot parse {text:?} as {data_type:?}"));
    Ok(match data_type {
        DataType::Int8 => Value::Int8(text.parse().map_err(|_| bad())?),
        DataType::Int16 => Value::Int16(text.parse().map_err(|_| bad())?),
        DataType::Int32 => Value::Int32(text.parse().map_err(|_| bad())?),
        DataType::Int64 => Value::Int64(text.parse().map_err(|_| bad())?),
        DataType::UInt8 => Value::UInt8(text.parse().map_err(|_| bad())?),
        DataType::UInt16 => Value::UInt16(text.parse().map_err(|_| bad())?),
        DataType::UInt32 => Value::UInt32(text.parse().map_err(|_| bad())?),
        DataType::UInt64 => Value::UInt64(text.parse().map_err(|_| bad())?),
        DataType::Float32 => Value::Float32(text.parse().map_err(|_| bad())?),
        DataType::Float64 => Value::Float64(text.parse().map_err(|_| bad())?),
        DataType::Bool => Value::Bool(text.parse().map_err(|_| bad())?),
        // Labels resolve to codes at push time.
        DataType::Categorical | DataType::Str => Value::Str(text.into()),
        DataType::Fixed => {
            let digits = text.strip_prefix("0x").unwrap_or(text);
            Value::Fixed(u64::from_str_radix(digits, 16).map_err(|_| bad())?)
        }
    })
}

/// Writes the whole table in the columnar binary layout: magic, version,
/// column and row counts, then per column its name, type tag, packed null
/// bitmap and raw little-endian values.
pub fn write_binary(table: &Table, mut writer: impl Write) -> Result<()> {
    writer.write_all(&MAGIC)?;
    writer.write_all(&VERSION.to_le_bytes())?;
    writer.write_all(&(table.column_count() as u32).to_le_bytes())?;
    writer.write_all(&(table.row_count() as u64).to_le_bytes())?;
    for col in table.columns() {
        write_str(&mut writer, &col.name)?;
        writer.write_all(&[type_tag(col.data_type)])?;
        writer.write_all(&pack_bits(&col.null_bitmap))?;
        match &col.data {
            ColumnData::Int8(v) => write_array(&mut writer, v, |x| x.to_le_bytes())?,
            ColumnData::Int16(v) => write_array(&mut writer, v, |x| x.to_le_bytes())?,
            ColumnData::Int32(v) => write_array(&mut writer, v, |x| x.to_le_bytes())?,
            ColumnData::Int64(v) => write_array(&mut writer, v, |x| x.to_le_bytes())?,
            ColumnData::UInt8(v) => write_array(&mut writer, v, |x| x.to_le_bytes())?,
            ColumnData::UInt16(v) => write_array(&mut writer, v, |x| x.to_le_bytes())?,
            ColumnData::UInt32(v) => write_array(&mut writer, v, |x| x.to_le_bytes())?,
            ColumnData::UInt64(v) => write_array(&mut writer, v, |x| x.to_le_bytes())?,
            ColumnData::Float32(v) => write_array(&mut writer, v, |x| x.to_le_bytes())?,
            ColumnData::Float64(v) => write_array(&mut writer, v, |x| x.to_le_bytes())?,
            ColumnData::Fixed(v) => write_array(&mut writer, v, |x| x.to_le_bytes())?,
            ColumnData::Bool(bits) => writer.write_all(&pack_bits(bits))?,
            ColumnData::Categorical { codes, labels } => {
                writer.write_all(&(labels.len() as u32).to_le_bytes())?;
                for label in labels {
                    write_str(&mut writer, label)?;
                }
                write_array(&mut writer, codes, |x| x.to_le_bytes())?;
            }
            ColumnData::Str(v) => {
                for s in v {
                    write_str(&mut writer, s)?;
                }
            }
        }
    }
    Ok(())
}

/// Reads a table written by [write_binary].
///
/// # Errors
/// [TableError::Corrupt] on bad magic, version, type tag or categorical
/// code; truncation surfaces as [TableError::Io].
pub fn read_binary(mut reader: impl Read) -> Result<Table> {
    let magic = read_n::<4>(&mut reader)?;
    if magic != MAGIC {
        return Err(TableError::Corrupt(format!("bad magic {magic:?}")));
    }
    let version = u32::from_le_bytes(read_n(&mut reader)?);
    if version != VERSION {
        return Err(TableError::Corrupt(format!(
            "unsupported format version {version}"
        )));
    }
    let col_count = u32::from_le_bytes(read_n(&mut reader)?) as usize;
    let row_count = u64::from_le_bytes(read_n(&mut reader)?) as usize;

    let mut table = Table::new();
    for _ in 0..col_count {
        let name = read_str(&mut reader)?;
        let tag = read_n::<1>(&mut reader)?[0];
        let data_type = type_from_tag(tag)?;
        let nulls = read_packed(&mut reader, row_count)?;

        let (values, labels) = read_values(&mut reader, data_type, row_count)?;
        let mut col = match labels {
            Some(labels) => Column::new_categorical(name, labels),
            None => Column::new(name, data_type),
        };
        for (value, null) in values.into_iter().zip(nulls) {
            if null {
                col.push_null();
            } else {
                col.push(value)?;
            }
        }
        table.add_column(col)?;
    }
    Ok(table)
}

fn type_tag(data_type: DataType) -> u8 {
    match data_type {
        DataType::Int8 => 0,
        DataType::Int16 => 1,
        DataType::Int32 => 2,
        DataType::Int64 => 3,
        DataType::UInt8 => 4,
        DataType::UInt16 => 5,
        DataType::UInt32 => 6,
        DataType::UInt64 => 7,
        DataType::Float32 => 8,
        DataType::Float64 => 9,
        DataType::Bool => 10,
        DataType::Categorical => 11,
        DataType::Str => 12,
        DataType::Fixed => 13,
    }
}

fn type_from_tag(tag: u8) -> Result<DataType> {
    Ok(match tag {
        0 => DataType::Int8,
        1 => DataType::Int16,
        2 => DataType::Int32,
        3 => DataType::Int64,
        4 => DataType::UInt8,
        5 => DataType::UInt16,
        6 => DataType::UInt32,
        7 => DataType::UInt64,
        8 => DataType::Float32,
        9 => DataType::Float64,
        10 => DataType::Bool,
        11 => DataType::Categorical,
        12 => DataType::Str,
        13 => DataType::Fixed,
        other => return Err(TableError::Corrupt(format!("unknown type tag {other}"))),
    })
}

fn pack_bits(bits: &BitSlice) -> Vec<u8> {
    let mut out = vec![0u8; bits.len().div_ceil(8)];
    for (i, bit) in bits.iter().by_vals().enumerate() {
        if bit {
            out[i / 8] |= 1 << (i % 8);
        }
    }
    out
}

fn read_packed(reader: &mut impl Read, len: usize) -> Result<Vec<bool>> {
    let mut bytes = vec![0u8; len.div_ceil(8)];
    reader.read_exact(&mut bytes)?;
    Ok((0..len).map(|i| bytes[i / 8] & (1 << (i % 8)) != 0).collect())
}

fn read_n<const N: usize>(reader: &mut impl Read) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn write_str(writer: &mut impl Write, s: &str) -> Result<()> {
    writer.write_all(&(s.len() as u32).to_le_bytes())?;
    writer.write_all(s.as_bytes())?;
    Ok(())
}

fn read_str(reader: &mut impl Read) -> Result<String> {
    let len = u32::from_le_bytes(read_n(reader)?) as usize;
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| TableError::Corrupt(format!("bad utf-8 string: {e}")))
}

fn write_array<T: Copy, const N: usize>(
    writer: &mut impl Write,
    values: &[T],
    to_bytes: impl Fn(T) -> [u8; N],
) -> Result<()> {
    for &value in values {
        writer.write_all(&to_bytes(value))?;
    }
    Ok(())
}

/// Decodes one column's raw values; categorical columns also yield their
/// label dictionary.
fn read_values(
    reader: &mut impl Read,
    data_type: DataType,
    rows: usize,
) -> Result<(Vec<Value>, Option<Vec<Arc<str>>>)> {
    let mut values = Vec::with_capacity(rows);
    match data_type {
        DataType::Int8 => {
            for _ in 0..rows {
                values.push(Value::Int8(i8::from_le_bytes(read_n(reader)?)));
            }
        }
        DataType::Int16 => {
            for _ in 0..rows {
                values.push(Value::Int16(i16::from_le_bytes(read_n(reader)?)));
            }
        }
        DataType::Int32 => {
            for _ in 0..rows {
                values.push(Value::Int32(i32::from_le_bytes(read_n(reader)?)));
            }
        }
        DataType::Int64 => {
            for _ in 0..rows {
                values.push(Value::Int64(i64::from_le_bytes(read_n(reader)?)));
            }
        }
        DataType::UInt8 => {
            for _ in 0..rows {
                values.push(Value::UInt8(u8::from_le_bytes(read_n(reader)?)));
            }
        }
        DataType::UInt16 => {
            for _ in 0..rows {
                values.push(Value::UInt16(u16::from_le_bytes(read_n(reader)?)));
            }
        }
        DataType::UInt32 => {
            for _ in 0..rows {
                values.push(Value::UInt32(u32::from_le_bytes(read_n(reader)?)));
            }
        }
        DataType::UInt64 => {
            for _ in 0..rows {
                values.push(Value::UInt64(u64::from_le_bytes(read_n(reader)?)));
            }
        }
        DataType::Float32 => {
            for _ in 0..rows {
                values.push(Value::Float32(f32::from_le_bytes(read_n(reader)?)));
            }
        }
        DataType::Float64 => {
            for _ in 0..rows {
                values.push(Value::Float64(f64::from_le_bytes(read_n(reader)?)));
            }
        }
        DataType::Fixed => {
            for _ in 0..rows {
                values.push(Value::Fixed(u64::from_le_bytes(read_n(reader)?)));
            }
        }
        DataType::Bool => {
            for bit in read_packed(reader, rows)? {
                values.push(Value::Bool(bit));
            }
        }
        DataType::Str => {
            for _ in 0..rows {
                values.push(Value::Str(read_str(reader)?.into()));
            }
        }
        DataType::Categorical => {
            let label_count = u32::from_le_bytes(read_n(reader)?) as usize;
            let mut labels: Vec<Arc<str>> = Vec::with_capacity(label_count);
            for _ in 0..label_count {
                labels.push(read_str(reader)?.into());
            }
            for _ in 0..rows {
                let code = u32::from_le_bytes(read_n(reader)?);
                if code as usize >= label_count {
                    return Err(TableError::Corrupt(format!(
                        "categorical code {code} out of range ({label_count} labels)"
                    )));
                }
                values.push(Value::Cat(code));
            }
            return Ok((values, Some(labels)));
        }
    }
    Ok((values, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut t = Table::new();
        t.add_column(
            Column::from_values(
                "id",
                DataType::Int64,
                [Value::Int64(1), Value::Int64(2), Value::Int64(3)],
            )
            .unwrap(),
        )
        .unwrap();
        t.add_column(
            Column::from_values(
                "score",
                DataType::Float64,
                [Value::Float64(0.5), Value::Null, Value::Float64(-2.0)],
            )
            .unwrap(),
        )
        .unwrap();
        t.add_column(
            Column::from_values(
                "tag",
                DataType::Str,
                ["x", "", "z"].map(|s| Value::Str(s.into())),
            )
            .unwrap(),
        )
        .unwrap();
        t
    }

    #[test]
    fn test_binary_round_trip() {
        let t = sample();
        let mut buf = Vec::new();
        write_binary(&t, &mut buf).unwrap();
        let back = read_binary(buf.as_slice()).unwrap();
        assert_eq!(back.column_names(), t.column_names());
        assert_eq!(back.row_count(), t.row_count());
        for name in t.column_names() {
            for row in 0..t.row_count() {
                assert_eq!(back.cell(name, row).unwrap(), t.cell(name, row).unwrap());
            }
        }
    }

    #[test]
    fn test_binary_round_trip_categorical_and_bool() {
        let mut t = Table::new();
        let mut cat = Column::new_categorical("color", vec!["red".into(), "blue".into()]);
        cat.push(Value::Str("blue".into())).unwrap();
        cat.push(Value::Null).unwrap();
        cat.push(Value::Str("red".into())).unwrap();
        t.add_column(cat).unwrap();
        t.add_column(
            Column::from_values(
                "flag",
                DataType::Bool,
                [Value::Bool(true), Value::Bool(false), Value::Null],
            )
            .unwrap(),
        )
        .unwrap();

        let mut buf = Vec::new();
        write_binary(&t, &mut buf).unwrap();
        let back = read_binary(buf.as_slice()).unwrap();
        assert_eq!(back.cell("color", 0).unwrap(), Value::Cat(1));
        assert_eq!(back.cell("color", 1).unwrap(), Value::Null);
        assert_eq!(back.column("color").unwrap().label(0), Some("red"));
        assert_eq!(back.cell("flag", 2).unwrap(), Value::Null);
    }

    #[test]
    fn test_binary_bad_magic_and_truncation() {
        let t = sample();
        let mut buf = Vec::new();
        write_binary(&t, &mut buf).unwrap();

        let mut bad = buf.clone();
        bad[0] = b'X';
        assert!(matches!(
            read_binary(bad.as_slice()),
            Err(TableError::Corrupt(_))
        ));

        let cut = &buf[..buf.len() / 2];
        assert!(matches!(read_binary(cut), Err(TableError::Io(_))));
    }

    #[test]
    fn test_delimited_round_trip() {
        let t = sample();
        let mut buf = Vec::new();
        write_delimited(&t, &mut buf, ',').unwrap();

        let mut back = Table::from_schema(&t);
        read_delimited(&mut back, buf.as_slice(), ',').unwrap();
        assert_eq!(back.row_count(), 3);
        assert_eq!(back.cell("id", 2).unwrap(), Value::Int64(3));
        assert_eq!(back.cell("score", 2).unwrap(), Value::Float64(-2.0));
        // The missing score wrote an empty field, which reads back as null.
        assert_eq!(back.cell("score", 1).unwrap(), Value::Null);
    }

    #[test]
    fn test_delimited_rejects_bad_input() {
        let t = sample();
        let mut back = Table::from_schema(&t);
        assert!(matches!(
            read_delimited(&mut back, "wrong,header,line\n".as_bytes(), ','),
            Err(TableError::Corrupt(_))
        ));

        let mut back = Table::from_schema(&t);
        assert!(matches!(
            read_delimited(&mut back, "id,score,tag\nnot-a-number,1.0,x\n".as_bytes(), ','),
            Err(TableError::Corrupt(_))
        ));

        let mut back = Table::from_schema(&t);
        assert!(matches!(
            read_delimited(&mut back, "id,score,tag\n1,2.0\n".as_bytes(), ','),
            Err(TableError::Corrupt(_))
        ));
    }
}
