//! Read-side coercion from [`Value`] into member types.
//!
//! The table is closed: every `(source variant, target type)` pair is either
//! handled below or rejected with a [`ConvertError`]. There is no fallback cast.
//!
//! | target                  | accepted sources                                         |
//! |-------------------------|----------------------------------------------------------|
//! | integers                | integers (range-checked), floats (rounded half to even), |
//! |                         | numeric, bool, text (parsed)                             |
//! | `f32` / `f64`           | integers, floats, numeric, bool, text                    |
//! | `Decimal`               | integers, floats, numeric, text                          |
//! | `bool`                  | bool, integers, text                                     |
//! | `String`                | anything except bytea                                    |
//! | chrono date/time types  | the matching variant, widening date/tz forms, text       |
//! | `Uuid`                  | uuid, text                                               |
//! | `serde_json::Value`     | json, text                                               |
//! | `Vec<u8>`               | bytea                                                    |
//! | `Option<T>`             | null (as `None`) or anything `T` accepts                 |

use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A value could not be coerced into the requested type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertError {
    pub from: &'static str,
    pub to: &'static str,
    pub detail: Option<String>,
}

impl ConvertError {
    pub fn new(from: &'static str, to: &'static str) -> Self {
        Self {
            from,
            to,
            detail: None,
        }
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot convert {} to {}", self.from, self.to)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConvertError {}

/// Conversion from a loosely-typed [`Value`] into a concrete Rust type.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ConvertError>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

fn parse<T: FromStr>(s: &str, to: &'static str) -> Result<T, ConvertError>
where
    T::Err: fmt::Display,
{
    s.trim()
        .parse::<T>()
        .map_err(|e| ConvertError::new("text", to).detail(format!("'{s}': {e}")))
}

fn float_to_i128(v: f64, from: &'static str, to: &'static str) -> Result<i128, ConvertError> {
    if !v.is_finite() {
        return Err(ConvertError::new(from, to).detail(format!("{v} is not finite")));
    }
    let rounded = v.round_ties_even();
    if rounded < i128::MIN as f64 || rounded > i128::MAX as f64 {
        return Err(ConvertError::new(from, to).detail(format!("{v} out of range")));
    }
    Ok(rounded as i128)
}

fn decimal_to_i128(v: Decimal, to: &'static str) -> Result<i128, ConvertError> {
    v.round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointNearestEven)
        .to_i128()
        .ok_or_else(|| ConvertError::new("numeric", to).detail(format!("{v} out of range")))
}

/// Widen any integer-compatible source to `i128`, then narrow with a range check.
fn integer_source(value: Value, to: &'static str) -> Result<i128, ConvertError> {
    match value {
        Value::I16(v) => Ok(i128::from(v)),
        Value::I32(v) => Ok(i128::from(v)),
        Value::I64(v) => Ok(i128::from(v)),
        Value::F32(v) => float_to_i128(f64::from(v), "float4", to),
        Value::F64(v) => float_to_i128(v, "float8", to),
        Value::Numeric(v) => decimal_to_i128(v, to),
        Value::Bool(v) => Ok(i128::from(v)),
        Value::Text(s) => parse::<i128>(&s, to),
        other => Err(ConvertError::new(other.kind(), to)),
    }
}

macro_rules! impl_from_value_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, ConvertError> {
                    let to = stringify!($ty);
                    let from = value.kind();
                    let wide = integer_source(value, to)?;
                    <$ty>::try_from(wide).map_err(|_| {
                        ConvertError::new(from, to).detail(format!("{wide} out of range"))
                    })
                }
            }
        )*
    };
}

impl_from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::I16(v) => Ok(f64::from(v)),
            Value::I32(v) => Ok(f64::from(v)),
            Value::I64(v) => Ok(v as f64),
            Value::F32(v) => Ok(f64::from(v)),
            Value::F64(v) => Ok(v),
            Value::Numeric(v) => v
                .to_f64()
                .ok_or_else(|| ConvertError::new("numeric", "f64").detail(v.to_string())),
            Value::Bool(v) => Ok(if v { 1.0 } else { 0.0 }),
            Value::Text(s) => parse::<f64>(&s, "f64"),
            other => Err(ConvertError::new(other.kind(), "f64")),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::F32(v) => Ok(v),
            Value::Text(s) => parse::<f32>(&s, "f32"),
            // Narrowing a double keeps the nearest representable float.
            other => f64::from_value(other)
                .map(|v| v as f32)
                .map_err(|e| ConvertError { to: "f32", ..e }),
        }
    }
}

impl FromValue for Decimal {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Numeric(v) => Ok(v),
            Value::I16(v) => Ok(Decimal::from(v)),
            Value::I32(v) => Ok(Decimal::from(v)),
            Value::I64(v) => Ok(Decimal::from(v)),
            Value::F32(v) => Decimal::from_f32(v)
                .ok_or_else(|| ConvertError::new("float4", "Decimal").detail(v.to_string())),
            Value::F64(v) => Decimal::from_f64(v)
                .ok_or_else(|| ConvertError::new("float8", "Decimal").detail(v.to_string())),
            Value::Text(s) => parse::<Decimal>(&s, "Decimal"),
            other => Err(ConvertError::new(other.kind(), "Decimal")),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Bool(v) => Ok(v),
            Value::I16(v) => Ok(v != 0),
            Value::I32(v) => Ok(v != 0),
            Value::I64(v) => Ok(v != 0),
            Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" => Ok(true),
                "false" | "f" => Ok(false),
                _ => Err(ConvertError::new("text", "bool").detail(format!("'{s}'"))),
            },
            other => Err(ConvertError::new(other.kind(), "bool")),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Bool(v) => Ok(v.to_string()),
            Value::I16(v) => Ok(v.to_string()),
            Value::I32(v) => Ok(v.to_string()),
            Value::I64(v) => Ok(v.to_string()),
            Value::F32(v) => Ok(v.to_string()),
            Value::F64(v) => Ok(v.to_string()),
            Value::Numeric(v) => Ok(v.to_string()),
            Value::Date(v) => Ok(v.to_string()),
            Value::Time(v) => Ok(v.to_string()),
            Value::Timestamp(v) => Ok(v.to_string()),
            Value::TimestampTz(v) => Ok(v.to_rfc3339()),
            Value::Uuid(v) => Ok(v.to_string()),
            Value::Json(v) => Ok(v.to_string()),
            other => Err(ConvertError::new(other.kind(), "String")),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Bytes(v) => Ok(v),
            other => Err(ConvertError::new(other.kind(), "Vec<u8>")),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Date(v) => Ok(v),
            Value::Text(s) => parse::<NaiveDate>(&s, "NaiveDate"),
            other => Err(ConvertError::new(other.kind(), "NaiveDate")),
        }
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Time(v) => Ok(v),
            Value::Text(s) => parse::<NaiveTime>(&s, "NaiveTime"),
            other => Err(ConvertError::new(other.kind(), "NaiveTime")),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Timestamp(v) => Ok(v),
            Value::Date(v) => Ok(v.and_time(NaiveTime::MIN)),
            Value::TimestampTz(v) => Ok(v.naive_utc()),
            Value::Text(s) => parse::<NaiveDateTime>(&s, "NaiveDateTime"),
            other => Err(ConvertError::new(other.kind(), "NaiveDateTime")),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::TimestampTz(v) => Ok(v),
            Value::Timestamp(v) => Ok(v.and_utc()),
            Value::Date(v) => Ok(v.and_time(NaiveTime::MIN).and_utc()),
            Value::Text(s) => parse::<DateTime<Utc>>(&s, "DateTime<Utc>"),
            other => Err(ConvertError::new(other.kind(), "DateTime<Utc>")),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Uuid(v) => Ok(v),
            Value::Text(s) => parse::<Uuid>(&s, "Uuid"),
            other => Err(ConvertError::new(other.kind(), "Uuid")),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Json(v) => Ok(v),
            Value::Text(s) => serde_json::from_str(&s)
                .map_err(|e| ConvertError::new("text", "serde_json::Value").detail(e.to_string())),
            other => Err(ConvertError::new(other.kind(), "serde_json::Value")),
        }
    }
}
