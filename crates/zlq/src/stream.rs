//! Result re-encoding and streaming.
//!
//! Consumes the engine's Arrow result batches and converts every value
//! back into source-format text: NULL as the sentinel, booleans as
//! `T`/`F`, addresses in canonical dotted-decimal or colon-hex form,
//! containers re-bracketed with comma-joined elements. Rows stream in
//! cursor order, one tab-separated line each, flushed batch by batch.

use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use diagnostics::log_debug;
use duckdb::Connection;
use duckdb::arrow::array::{
    Array, ArrayRef, BooleanArray, Decimal128Array, Float32Array, Float64Array, Int8Array,
    Int16Array, Int32Array, Int64Array, LargeListArray, LargeStringArray, ListArray, StringArray,
    StructArray, UInt8Array, UInt16Array, UInt32Array, UInt64Array,
};
use duckdb::arrow::datatypes::DataType;
use duckdb::arrow::util::display::{ArrayFormatter, FormatOptions};

use crate::{Error, NULL_SENTINEL, Result};

/// Engine result value at the re-encoder boundary. A closed set so the
/// encoder is one exhaustive match.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Addr(IpAddr),
    List(Vec<Value>),
}

/// A value whose engine representation this encoder does not model.
/// Callers degrade to the engine's own textual rendering.
#[derive(Debug)]
pub struct UnsupportedValue(String);

/// Execute the caller's query and stream encoded results.
///
/// Emits one tab-separated header line of the cursor's column names, then
/// one line per row in cursor order, flushing after every batch. Returns
/// the row count. A query that fails to prepare or execute emits nothing.
pub fn stream_query<W: Write>(conn: &Connection, query: &str, out: &mut W) -> Result<u64> {
    let mut stmt = conn.prepare(query).map_err(query_error)?;
    let cursor = stmt.query_arrow([]).map_err(query_error)?;

    let schema = cursor.get_schema();
    let header: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    writeln!(out, "{}", header.join("\t"))?;
    out.flush()?;

    let mut rows: u64 = 0;
    for batch in cursor {
        for row in 0..batch.num_rows() {
            let encoded: Vec<String> = batch
                .columns()
                .iter()
                .map(|col| encode_value(&value_or_fallback(col.as_ref(), row)))
                .collect();
            writeln!(out, "{}", encoded.join("\t"))?;
        }
        rows += batch.num_rows() as u64;
        out.flush()?;
    }
    Ok(rows)
}

fn query_error(e: duckdb::Error) -> Error {
    Error::Query {
        message: e.to_string(),
    }
}

/// Render one value in source-format text.
pub fn encode_value(value: &Value) -> String {
    match value {
        Value::Null => NULL_SENTINEL.to_string(),
        Value::Bool(true) => "T".to_string(),
        Value::Bool(false) => "F".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format_float(*f),
        Value::Text(s) => s.clone(),
        Value::Addr(ip) => ip.to_string(),
        Value::List(items) => {
            let inner: Vec<String> = items.iter().map(encode_value).collect();
            format!("[{}]", inner.join(","))
        }
    }
}

/// Zeek timestamps and intervals keep a fractional part even when whole,
/// so 1 second renders as `1.0`, not `1`.
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

/// Convert one array slot, degrading to the engine's textual rendering
/// when the representation is not modeled. The fallback is per value;
/// neither the row nor the stream is aborted.
pub fn value_or_fallback(array: &dyn Array, row: usize) -> Value {
    match value_at(array, row) {
        Ok(value) => value,
        Err(UnsupportedValue(repr)) => {
            log_debug!("Falling back to engine text for {repr}", repr: repr);
            Value::Text(fallback_text(array, row))
        }
    }
}

/// Convert one array slot into a [`Value`].
pub fn value_at(array: &dyn Array, row: usize) -> std::result::Result<Value, UnsupportedValue> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }
    match array.data_type() {
        DataType::Boolean => Ok(Value::Bool(downcast::<BooleanArray>(array)?.value(row))),
        DataType::Int8 => Ok(Value::Int(downcast::<Int8Array>(array)?.value(row) as i64)),
        DataType::Int16 => Ok(Value::Int(downcast::<Int16Array>(array)?.value(row) as i64)),
        DataType::Int32 => Ok(Value::Int(downcast::<Int32Array>(array)?.value(row) as i64)),
        DataType::Int64 => Ok(Value::Int(downcast::<Int64Array>(array)?.value(row))),
        DataType::UInt8 => Ok(Value::Int(downcast::<UInt8Array>(array)?.value(row) as i64)),
        DataType::UInt16 => Ok(Value::Int(downcast::<UInt16Array>(array)?.value(row) as i64)),
        DataType::UInt32 => Ok(Value::Int(downcast::<UInt32Array>(array)?.value(row) as i64)),
        DataType::UInt64 => {
            let v = downcast::<UInt64Array>(array)?.value(row);
            Ok(i64::try_from(v)
                .map(Value::Int)
                .unwrap_or_else(|_| Value::Text(v.to_string())))
        }
        DataType::Float32 => Ok(Value::Float(downcast::<Float32Array>(array)?.value(row) as f64)),
        DataType::Float64 => Ok(Value::Float(downcast::<Float64Array>(array)?.value(row))),
        DataType::Utf8 => Ok(Value::Text(downcast::<StringArray>(array)?.value(row).to_string())),
        DataType::LargeUtf8 => Ok(Value::Text(
            downcast::<LargeStringArray>(array)?.value(row).to_string(),
        )),
        // HUGEINT arrives as a zero-scale decimal
        DataType::Decimal128(_, 0) => {
            let v = downcast::<Decimal128Array>(array)?.value(row);
            Ok(i64::try_from(v)
                .map(Value::Int)
                .unwrap_or_else(|_| Value::Text(v.to_string())))
        }
        DataType::List(_) => {
            let items = downcast::<ListArray>(array)?.value(row);
            Ok(list_value(&items))
        }
        DataType::LargeList(_) => {
            let items = downcast::<LargeListArray>(array)?.value(row);
            Ok(list_value(&items))
        }
        DataType::Struct(_) => inet_value(downcast::<StructArray>(array)?, row),
        other => Err(UnsupportedValue(other.to_string())),
    }
}

fn list_value(items: &ArrayRef) -> Value {
    let elems = (0..items.len())
        .map(|i| value_or_fallback(items.as_ref(), i))
        .collect();
    Value::List(elems)
}

/// Decode the inet extension's Arrow representation: a struct carrying an
/// `ip_type` discriminant (1 = v4, 2 = v6) and the numeric `address`.
/// Any other struct is unsupported.
fn inet_value(array: &StructArray, row: usize) -> std::result::Result<Value, UnsupportedValue> {
    let ip_type = array
        .column_by_name("ip_type")
        .and_then(|col| int_at(col, row))
        .ok_or_else(|| UnsupportedValue("struct without ip_type".to_string()))?;
    let address = array
        .column_by_name("address")
        .and_then(|col| int128_at(col, row))
        .ok_or_else(|| UnsupportedValue("struct without address".to_string()))?;

    match ip_type {
        1 => Ok(Value::Addr(IpAddr::V4(Ipv4Addr::from(address as u32)))),
        2 => Ok(Value::Addr(IpAddr::V6(Ipv6Addr::from(address as u128)))),
        other => Err(UnsupportedValue(format!("ip_type {other}"))),
    }
}

fn int_at(col: &ArrayRef, row: usize) -> Option<i64> {
    match col.data_type() {
        DataType::UInt8 => Some(col.as_any().downcast_ref::<UInt8Array>()?.value(row) as i64),
        DataType::Int8 => Some(col.as_any().downcast_ref::<Int8Array>()?.value(row) as i64),
        DataType::Int16 => Some(col.as_any().downcast_ref::<Int16Array>()?.value(row) as i64),
        DataType::Int32 => Some(col.as_any().downcast_ref::<Int32Array>()?.value(row) as i64),
        DataType::Int64 => Some(col.as_any().downcast_ref::<Int64Array>()?.value(row)),
        _ => None,
    }
}

fn int128_at(col: &ArrayRef, row: usize) -> Option<i128> {
    match col.data_type() {
        DataType::Decimal128(_, 0) => {
            Some(col.as_any().downcast_ref::<Decimal128Array>()?.value(row))
        }
        DataType::Int64 => Some(col.as_any().downcast_ref::<Int64Array>()?.value(row) as i128),
        _ => None,
    }
}

fn downcast<T: 'static>(array: &dyn Array) -> std::result::Result<&T, UnsupportedValue> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| UnsupportedValue(array.data_type().to_string()))
}

/// Best-effort textual form via the engine's own formatter.
fn fallback_text(array: &dyn Array, row: usize) -> String {
    let options = FormatOptions::default().with_null(NULL_SENTINEL);
    match ArrayFormatter::try_new(array, &options) {
        Ok(formatter) => formatter.value(row).to_string(),
        Err(_) => "?".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duckdb::arrow::array::{ListBuilder, StringBuilder, TimestampMicrosecondArray};
    use duckdb::arrow::datatypes::Field;
    use std::sync::Arc;

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode_value(&Value::Null), "-");
        assert_eq!(encode_value(&Value::Bool(true)), "T");
        assert_eq!(encode_value(&Value::Bool(false)), "F");
        assert_eq!(encode_value(&Value::Int(443)), "443");
        assert_eq!(encode_value(&Value::Text("http".to_string())), "http");
    }

    #[test]
    fn test_encode_floats_keep_fraction() {
        assert_eq!(encode_value(&Value::Float(1.0)), "1.0");
        assert_eq!(encode_value(&Value::Float(1.5)), "1.5");
        assert_eq!(encode_value(&Value::Float(1704067200.25)), "1704067200.25");
    }

    #[test]
    fn test_encode_addresses() {
        let v4 = Value::Addr("10.0.0.1".parse().unwrap());
        assert_eq!(encode_value(&v4), "10.0.0.1");
        let v6 = Value::Addr("2001:db8::1".parse().unwrap());
        assert_eq!(encode_value(&v6), "2001:db8::1");
    }

    #[test]
    fn test_encode_containers() {
        let list = Value::List(vec![
            Value::Addr("10.0.0.1".parse().unwrap()),
            Value::Addr("10.0.0.2".parse().unwrap()),
        ]);
        assert_eq!(encode_value(&list), "[10.0.0.1,10.0.0.2]");

        let mixed = Value::List(vec![Value::Text("a".to_string()), Value::Null]);
        assert_eq!(encode_value(&mixed), "[a,-]");
    }

    #[test]
    fn test_value_at_scalars() {
        let bools = BooleanArray::from(vec![Some(true), None]);
        assert_eq!(value_at(&bools, 0).unwrap(), Value::Bool(true));
        assert_eq!(value_at(&bools, 1).unwrap(), Value::Null);

        let ints = Int64Array::from(vec![42]);
        assert_eq!(value_at(&ints, 0).unwrap(), Value::Int(42));

        let floats = Float64Array::from(vec![2.5]);
        assert_eq!(value_at(&floats, 0).unwrap(), Value::Float(2.5));

        let texts = StringArray::from(vec!["dns"]);
        assert_eq!(value_at(&texts, 0).unwrap(), Value::Text("dns".to_string()));
    }

    #[test]
    fn test_value_at_list() {
        let mut builder = ListBuilder::new(StringBuilder::new());
        builder.values().append_value("a");
        builder.values().append_value("b");
        builder.append(true);
        builder.append(false);
        let lists = builder.finish();

        assert_eq!(
            value_at(&lists, 0).unwrap(),
            Value::List(vec![
                Value::Text("a".to_string()),
                Value::Text("b".to_string())
            ])
        );
        assert_eq!(value_at(&lists, 1).unwrap(), Value::Null);
    }

    fn inet_struct(ip_types: Vec<u8>, addresses: Vec<i128>) -> StructArray {
        let ip_type = UInt8Array::from(ip_types);
        let address = Decimal128Array::from(addresses)
            .with_precision_and_scale(38, 0)
            .unwrap();
        StructArray::from(vec![
            (
                Arc::new(Field::new("ip_type", DataType::UInt8, false)),
                Arc::new(ip_type) as ArrayRef,
            ),
            (
                Arc::new(Field::new("address", DataType::Decimal128(38, 0), false)),
                Arc::new(address) as ArrayRef,
            ),
        ])
    }

    #[test]
    fn test_value_at_inet_struct() {
        let array = inet_struct(vec![1, 2], vec![0x0A00_0001, 1]);
        assert_eq!(
            value_at(&array, 0).unwrap(),
            Value::Addr("10.0.0.1".parse().unwrap())
        );
        assert_eq!(
            value_at(&array, 1).unwrap(),
            Value::Addr("::1".parse().unwrap())
        );
    }

    #[test]
    fn test_unmodeled_struct_is_unsupported() {
        let inner = Int64Array::from(vec![7]);
        let array = StructArray::from(vec![(
            Arc::new(Field::new("whatever", DataType::Int64, false)),
            Arc::new(inner) as ArrayRef,
        )]);
        assert!(value_at(&array, 0).is_err());
    }

    #[test]
    fn test_fallback_renders_unmodeled_types() {
        let timestamps = TimestampMicrosecondArray::from(vec![0i64]);
        let value = value_or_fallback(&timestamps, 0);
        match value {
            Value::Text(text) => assert!(text.starts_with("1970-01-01")),
            other => panic!("expected text fallback, got {other:?}"),
        }
    }

    #[test]
    fn test_stream_query_emits_header_and_rows() -> Result<()> {
        let conn = Connection::open_in_memory()?;
        let mut out = Vec::new();
        let rows = stream_query(
            &conn,
            "SELECT * FROM (VALUES (1.0::DOUBLE, 'u1', NULL::VARCHAR), (2.0::DOUBLE, 'u2', 'http')) t(ts, uid, service) ORDER BY ts",
            &mut out,
        )?;
        assert_eq!(rows, 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ts\tuid\tservice");
        assert_eq!(lines[1], "1.0\tu1\t-");
        assert_eq!(lines[2], "2.0\tu2\thttp");
        Ok(())
    }

    #[test]
    fn test_stream_query_bool_and_list_encoding() -> Result<()> {
        let conn = Connection::open_in_memory()?;
        let mut out = Vec::new();
        stream_query(
            &conn,
            "SELECT true AS a, false AS b, ['x','y'] AS c, []::VARCHAR[] AS d",
            &mut out,
        )?;
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().nth(1).unwrap(), "T\tF\t[x,y]\t[]");
        Ok(())
    }

    #[test]
    fn test_failed_query_emits_nothing() {
        let conn = Connection::open_in_memory().unwrap();
        let mut out = Vec::new();
        let result = stream_query(&conn, "SELECT * FROM missing_table", &mut out);
        assert!(matches!(result, Err(Error::Query { .. })));
        assert!(out.is_empty());
    }
}
