use chrono::{Datelike, Timelike};
use model::core::value::Value;
use mysql_async::{Params, Value as MySqlValue};

/// Positional MySQL parameter built from a record value.
pub struct MySqlParam(MySqlValue);

impl MySqlParam {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Int(i) => MySqlParam(MySqlValue::Int(*i)),
            Value::Uint(u) => MySqlParam(MySqlValue::UInt(*u)),
            Value::Float(f) => MySqlParam(MySqlValue::Double(*f)),
            Value::String(s) => MySqlParam(MySqlValue::Bytes(s.clone().into_bytes())),
            Value::Boolean(b) => MySqlParam(MySqlValue::Int(i64::from(*b))),
            Value::Date(d) => MySqlParam(MySqlValue::Date(
                d.year() as u16,
                d.month() as u8,
                d.day() as u8,
                0,
                0,
                0,
                0,
            )),
            Value::Timestamp(ts) => MySqlParam(MySqlValue::Date(
                ts.year() as u16,
                ts.month() as u8,
                ts.day() as u8,
                ts.hour() as u8,
                ts.minute() as u8,
                ts.second() as u8,
                ts.and_utc().timestamp_subsec_micros(),
            )),
            Value::Null => MySqlParam(MySqlValue::NULL),
        }
    }

    pub fn into_inner(self) -> MySqlValue {
        self.0
    }
}

/// Ordered parameter list of one statement.
#[derive(Default)]
pub struct MySqlParamStore {
    params: Vec<MySqlParam>,
}

impl MySqlParamStore {
    pub fn from_values(values: &[Value]) -> Self {
        MySqlParamStore {
            params: values.iter().map(MySqlParam::from_value).collect(),
        }
    }

    pub fn push(mut self, value: impl Into<Value>) -> Self {
        self.params.push(MySqlParam::from_value(&value.into()));
        self
    }

    pub fn params(self) -> Params {
        if self.params.is_empty() {
            return Params::Empty;
        }
        Params::Positional(self.params.into_iter().map(MySqlParam::into_inner).collect())
    }
}
