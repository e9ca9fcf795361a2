use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use model::{core::value::Value, records::record::SourceRecord};
use mysql_async::{Row, Value as MySqlValue};

/// Converts one driver value into a record value.
///
/// Text columns arrive as bytes and are decoded lossily; legacy shops are not
/// always consistent about their connection charset.
pub fn to_value(value: &MySqlValue) -> Value {
    match value {
        MySqlValue::NULL => Value::Null,
        MySqlValue::Bytes(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        MySqlValue::Int(i) => Value::Int(*i),
        MySqlValue::UInt(u) => Value::Uint(*u),
        MySqlValue::Float(f) => Value::Float(f64::from(*f)),
        MySqlValue::Double(d) => Value::Float(*d),
        MySqlValue::Date(y, m, d, h, i, s, us) => {
            let Some(date) = NaiveDate::from_ymd_opt(i32::from(*y), u32::from(*m), u32::from(*d))
            else {
                // zero dates
                return Value::Null;
            };
            if (*h, *i, *s, *us) == (0, 0, 0, 0) {
                return Value::Date(date);
            }
            NaiveTime::from_hms_micro_opt(u32::from(*h), u32::from(*i), u32::from(*s), *us)
                .map(|time| Value::Timestamp(NaiveDateTime::new(date, time)))
                .unwrap_or(Value::Date(date))
        }
        MySqlValue::Time(neg, days, h, i, s, _) => {
            let hours = u32::from(*h) + *days * 24;
            let sign = if *neg { "-" } else { "" };
            Value::String(format!("{sign}{hours:02}:{i:02}:{s:02}"))
        }
    }
}

/// Converts a result row into a record keyed by column alias.
pub fn to_record(row: &Row) -> SourceRecord {
    row.columns_ref()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let value = row.as_ref(idx).map(to_value).unwrap_or(Value::Null);
            (column.name_str().into_owned(), value)
        })
        .collect()
}
