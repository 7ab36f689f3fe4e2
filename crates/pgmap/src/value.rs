//! Loosely-typed wire values.
//!
//! [`Value`] is what crosses the parameter boundary on writes and what a row
//! column decodes into on reads. [`Value::Null`] is the database-null sentinel:
//! it is distinct from an absent Rust value (`None`), which is turned into it at
//! bind time.
//!
//! Enum and `citext` columns decode as [`Value::Text`]. Other types without a
//! variant here (`interval`, arrays, ranges, geometric types) are reported as
//! [`OrmError::UnsupportedType`]; cast them to text in the query to read them.

use crate::error::{OrmError, OrmResult};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use std::error::Error;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, IsNull, Kind, ToSql, Type, to_sql_checked};
use uuid::Uuid;

/// A single database value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Numeric(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
}

impl Value {
    /// Whether this is the database-null sentinel.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the variant, used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::I16(_) => "int2",
            Self::I32(_) => "int4",
            Self::I64(_) => "int8",
            Self::F32(_) => "float4",
            Self::F64(_) => "float8",
            Self::Numeric(_) => "numeric",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytea",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Timestamp(_) => "timestamp",
            Self::TimestampTz(_) => "timestamptz",
            Self::Uuid(_) => "uuid",
            Self::Json(_) => "jsonb",
        }
    }

    /// Parameter type declared when a statement carrying this value is prepared.
    ///
    /// `Null` declares `unknown`, which lets the server infer the type from context.
    pub fn pg_type(&self) -> Type {
        match self {
            Self::Null => Type::UNKNOWN,
            Self::Bool(_) => Type::BOOL,
            Self::I16(_) => Type::INT2,
            Self::I32(_) => Type::INT4,
            Self::I64(_) => Type::INT8,
            Self::F32(_) => Type::FLOAT4,
            Self::F64(_) => Type::FLOAT8,
            Self::Numeric(_) => Type::NUMERIC,
            Self::Text(_) => Type::TEXT,
            Self::Bytes(_) => Type::BYTEA,
            Self::Date(_) => Type::DATE,
            Self::Time(_) => Type::TIME,
            Self::Timestamp(_) => Type::TIMESTAMP,
            Self::TimestampTz(_) => Type::TIMESTAMPTZ,
            Self::Uuid(_) => Type::UUID,
            Self::Json(_) => Type::JSONB,
        }
    }

    /// Decode column `index` of `row` according to its PostgreSQL type.
    pub fn from_row(row: &Row, index: usize) -> OrmResult<Self> {
        let column = &row.columns()[index];
        let ty = column.type_();

        macro_rules! get {
            ($rust:ty, $variant:expr) => {
                row.try_get::<_, Option<$rust>>(index)
                    .map(|v| v.map($variant).unwrap_or(Value::Null))
            };
        }

        let decoded = match *ty {
            Type::BOOL => get!(bool, Value::Bool),
            Type::CHAR => get!(i8, |v| Value::I16(i16::from(v))),
            Type::INT2 => get!(i16, Value::I16),
            Type::INT4 => get!(i32, Value::I32),
            Type::INT8 => get!(i64, Value::I64),
            Type::OID => get!(u32, |v| Value::I64(i64::from(v))),
            Type::FLOAT4 => get!(f32, Value::F32),
            Type::FLOAT8 => get!(f64, Value::F64),
            Type::NUMERIC => get!(Decimal, Value::Numeric),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
                get!(String, Value::Text)
            }
            Type::BYTEA => get!(Vec<u8>, Value::Bytes),
            Type::DATE => get!(NaiveDate, Value::Date),
            Type::TIME => get!(NaiveTime, Value::Time),
            Type::TIMESTAMP => get!(NaiveDateTime, Value::Timestamp),
            Type::TIMESTAMPTZ => get!(DateTime<Utc>, Value::TimestampTz),
            Type::UUID => get!(Uuid, Value::Uuid),
            Type::JSON | Type::JSONB => get!(serde_json::Value, Value::Json),
            _ if <RawText as FromSql>::accepts(ty) => get!(RawText, |t: RawText| Value::Text(t.0)),
            _ => {
                return Err(OrmError::UnsupportedType {
                    column: column.name().to_string(),
                    type_name: ty.name().to_string(),
                });
            }
        };

        decoded.map_err(|e| OrmError::Other(format!("decode column '{}': {e}", column.name())))
    }
}

/// Text-encoded types whose binary form is their UTF-8 text.
struct RawText(String);

impl<'a> FromSql<'a> for RawText {
    fn from_sql(_: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(RawText(std::str::from_utf8(raw)?.to_owned()))
    }

    fn accepts(ty: &Type) -> bool {
        match ty.kind() {
            Kind::Enum(_) => true,
            Kind::Simple => ty.name() == "citext",
            _ => false,
        }
    }
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Self::Null => Ok(IsNull::Yes),
            Self::Bool(v) => v.to_sql_checked(ty, out),
            Self::I16(v) => v.to_sql_checked(ty, out),
            Self::I32(v) => v.to_sql_checked(ty, out),
            Self::I64(v) => v.to_sql_checked(ty, out),
            Self::F32(v) => v.to_sql_checked(ty, out),
            Self::F64(v) => v.to_sql_checked(ty, out),
            Self::Numeric(v) => v.to_sql_checked(ty, out),
            Self::Text(v) => v.to_sql_checked(ty, out),
            Self::Bytes(v) => v.to_sql_checked(ty, out),
            Self::Date(v) => v.to_sql_checked(ty, out),
            Self::Time(v) => v.to_sql_checked(ty, out),
            Self::Timestamp(v) => v.to_sql_checked(ty, out),
            Self::TimestampTz(v) => v.to_sql_checked(ty, out),
            Self::Uuid(v) => v.to_sql_checked(ty, out),
            Self::Json(v) => v.to_sql_checked(ty, out),
        }
    }

    // Each variant checks its own codec in `to_sql`.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Write-side conversion of a Rust value into a [`Value`].
///
/// No coercion happens here: the value is carried in the variant matching its
/// own type. `None` becomes [`Value::Null`].
pub trait ToValue {
    fn to_value(&self) -> Value;
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl ToValue for [u8] {
    fn to_value(&self) -> Value {
        Value::Bytes(self.to_vec())
    }
}

macro_rules! impl_to_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::$variant(self.clone())
                }
            }
        )*
    };
}

macro_rules! impl_to_value_widened {
    ($($ty:ty => $variant:ident($wide:ty)),* $(,)?) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::$variant(<$wide>::from(*self))
                }
            }
        )*
    };
}

impl_to_value! {
    bool => Bool,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    Decimal => Numeric,
    String => Text,
    Vec<u8> => Bytes,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
    Uuid => Uuid,
    serde_json::Value => Json,
}

impl_to_value_widened! {
    i8 => I16(i16),
    u8 => I16(i16),
    u16 => I32(i32),
    u32 => I64(i64),
    u64 => Numeric(Decimal),
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: ToValue> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.to_value()
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    v.to_value()
                }
            }
        )*
    };
}

impl_from_for_value!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    Decimal,
    String,
    Vec<u8>,
    NaiveDate,
    NaiveTime,
    NaiveDateTime,
    DateTime<Utc>,
    Uuid,
    serde_json::Value,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_becomes_null_sentinel() {
        let v: Option<i32> = None;
        assert_eq!(v.to_value(), Value::Null);
        assert_eq!(Some(7_i32).to_value(), Value::I32(7));
    }

    #[test]
    fn unsigned_integers_use_wider_signed_variants() {
        assert_eq!(200_u8.to_value(), Value::I16(200));
        assert_eq!(u16::MAX.to_value(), Value::I32(65_535));
        assert_eq!(u32::MAX.to_value(), Value::I64(4_294_967_295));
        assert_eq!(u64::MAX.to_value(), Value::Numeric(Decimal::from(u64::MAX)));
    }

    #[test]
    fn strings_and_references() {
        let s = String::from("alice");
        assert_eq!((&s).to_value(), Value::Text("alice".into()));
        assert_eq!("bob".to_value(), Value::Text("bob".into()));
        assert_eq!(Value::from("carol"), Value::Text("carol".into()));
    }

    #[test]
    fn pg_type_follows_variant() {
        assert_eq!(Value::I32(1).pg_type(), Type::INT4);
        assert_eq!(Value::Text("x".into()).pg_type(), Type::TEXT);
        assert_eq!(Value::Null.pg_type(), Type::UNKNOWN);
        assert_eq!(Value::Json(serde_json::json!({})).pg_type(), Type::JSONB);
    }

    #[test]
    fn null_encodes_as_sql_null_for_any_type() {
        let mut buf = BytesMut::new();
        let res = Value::Null.to_sql_checked(&Type::INT8, &mut buf).unwrap();
        assert!(matches!(res, IsNull::Yes));
        assert!(buf.is_empty());
    }

    #[test]
    fn variant_encoding_rejects_mismatched_type() {
        let mut buf = BytesMut::new();
        assert!(Value::I32(1).to_sql_checked(&Type::TEXT, &mut buf).is_err());
        assert!(Value::I32(1).to_sql_checked(&Type::INT4, &mut buf).is_ok());
    }

    #[test]
    fn enum_and_citext_columns_decode_as_text() {
        let mood = Type::new(
            "mood".into(),
            90_001,
            Kind::Enum(vec!["happy".into(), "sad".into()]),
            "public".into(),
        );
        let citext = Type::new("citext".into(), 90_002, Kind::Simple, "public".into());
        assert!(<RawText as FromSql>::accepts(&mood));
        assert!(<RawText as FromSql>::accepts(&citext));
        assert!(!<RawText as FromSql>::accepts(&Type::INTERVAL));

        let decoded = RawText::from_sql(&mood, b"happy").unwrap();
        assert_eq!(decoded.0, "happy");
        assert!(RawText::from_sql(&citext, &[0xff, 0xfe]).is_err());
    }
}
