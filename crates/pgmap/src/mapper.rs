//! Row → instance hydration.
//!
//! Each target type decides once how rows map into it ([`Mapping`]):
//!
//! - [`Mapping::Scalar`]: the first column is converted straight into the type
//!   (`SELECT count(*) ...` into `i64`), no instance is constructed.
//! - [`Mapping::Structured`]: a default instance is constructed and every
//!   column whose (case-insensitive) name matches a member is coerced and
//!   assigned. Unmatched columns are skipped; NULL columns leave the member at
//!   its default.

use crate::convert::{ConvertError, FromValue};
use crate::error::{OrmError, OrmResult};
use crate::member::Member;
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Read access to one result row.
pub trait Record {
    fn field_count(&self) -> usize;

    /// Name of column `index`.
    fn name(&self, index: usize) -> &str;

    /// Loosely-typed value of column `index` ([`Value::Null`] for SQL NULL).
    fn value(&self, index: usize) -> OrmResult<Value>;
}

impl Record for tokio_postgres::Row {
    fn field_count(&self) -> usize {
        self.len()
    }

    fn name(&self, index: usize) -> &str {
        self.columns()[index].name()
    }

    fn value(&self, index: usize) -> OrmResult<Value> {
        Value::from_row(self, index)
    }
}

/// Cached read-side metadata of a structured type.
pub struct TypeMetadata<T: 'static> {
    members: &'static [Member<T>],
    property_map: HashMap<String, usize>,
    construct: fn() -> T,
}

impl<T: 'static> TypeMetadata<T> {
    /// Index `members` by lowercased name.
    ///
    /// Member names are unique case-insensitively (the derive rejects
    /// collisions); should a hand-written table collide, the first member wins.
    pub fn new(members: &'static [Member<T>], construct: fn() -> T) -> Self {
        let mut property_map = HashMap::with_capacity(members.len());
        for (index, member) in members.iter().enumerate() {
            property_map
                .entry(member.name().to_lowercase())
                .or_insert(index);
        }
        Self {
            members,
            property_map,
            construct,
        }
    }

    /// Member matching `column`, compared case-insensitively.
    pub fn member(&self, column: &str) -> Option<&'static Member<T>> {
        self.index_of(column).map(|i| &self.members[i])
    }

    fn index_of(&self, column: &str) -> Option<usize> {
        self.property_map.get(&column.to_lowercase()).copied()
    }

    pub fn construct(&self) -> T {
        (self.construct)()
    }

    pub fn members(&self) -> &'static [Member<T>] {
        self.members
    }
}

impl<T: 'static> fmt::Debug for TypeMetadata<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMetadata")
            .field("members", &self.members)
            .finish()
    }
}

/// How rows are turned into a `T`.
pub enum Mapping<T: 'static> {
    Scalar(fn(Value) -> Result<T, ConvertError>),
    Structured(&'static TypeMetadata<T>),
}

impl<T: 'static> Clone for Mapping<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> Copy for Mapping<T> {}

impl<T: 'static> fmt::Debug for Mapping<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(_) => f.write_str("Scalar"),
            Self::Structured(meta) => f.debug_tuple("Structured").field(meta).finish(),
        }
    }
}

/// A type that query results can be hydrated into.
///
/// Scalars are implemented here; structured types get it from `#[derive(Entity)]`.
/// `Default` supplies the value returned when a single-row query finds nothing.
pub trait FromRow: Default + Sized + 'static {
    fn mapping() -> Mapping<Self>;
}

macro_rules! impl_scalar_from_row {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromRow for $ty {
                fn mapping() -> Mapping<Self> {
                    Mapping::Scalar(<$ty as FromValue>::from_value)
                }
            }

            impl FromRow for Option<$ty> {
                fn mapping() -> Mapping<Self> {
                    Mapping::Scalar(<Option<$ty> as FromValue>::from_value)
                }
            }
        )*
    };
}

impl_scalar_from_row!(
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
    bool,
    String,
    Decimal,
    NaiveDate,
    NaiveTime,
    NaiveDateTime,
    DateTime<Utc>,
    Uuid,
    serde_json::Value,
    Vec<u8>,
);

/// Maps the rows of one reader into `T`.
///
/// Column → member bindings are resolved on the first row of each result set
/// and reused for the rest of it; call [`RowMapper::reset`] when the reader
/// advances to another result set.
pub struct RowMapper<T: 'static> {
    mapping: Mapping<T>,
    bindings: Option<Vec<Option<&'static Member<T>>>>,
}

impl<T: FromRow> RowMapper<T> {
    pub fn new() -> Self {
        Self::with_mapping(T::mapping())
    }
}

impl<T: FromRow> Default for RowMapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> RowMapper<T> {
    pub fn with_mapping(mapping: Mapping<T>) -> Self {
        Self {
            mapping,
            bindings: None,
        }
    }

    /// Forget the column bindings of the previous result set.
    pub fn reset(&mut self) {
        self.bindings = None;
    }

    pub fn map<R: Record + ?Sized>(&mut self, row: &R) -> OrmResult<T> {
        match self.mapping {
            Mapping::Scalar(convert) => map_scalar(row, convert),
            Mapping::Structured(meta) => {
                let bindings = self.bindings.get_or_insert_with(|| {
                    (0..row.field_count())
                        .map(|i| meta.member(row.name(i)))
                        .collect()
                });
                fill(row, meta, bindings)
            }
        }
    }
}

/// Map a single row with the given mapping.
pub fn map_row<T: 'static, R: Record + ?Sized>(row: &R, mapping: &Mapping<T>) -> OrmResult<T> {
    match *mapping {
        Mapping::Scalar(convert) => map_scalar(row, convert),
        Mapping::Structured(meta) => {
            let bindings: Vec<_> = (0..row.field_count())
                .map(|i| meta.member(row.name(i)))
                .collect();
            fill(row, meta, &bindings)
        }
    }
}

fn map_scalar<T, R: Record + ?Sized>(
    row: &R,
    convert: fn(Value) -> Result<T, ConvertError>,
) -> OrmResult<T> {
    if row.field_count() == 0 {
        return Err(OrmError::EmptyRow);
    }
    convert(row.value(0)?).map_err(|e| OrmError::conversion(row.name(0), e))
}

fn fill<T: 'static, R: Record + ?Sized>(
    row: &R,
    meta: &TypeMetadata<T>,
    bindings: &[Option<&'static Member<T>>],
) -> OrmResult<T> {
    let mut item = meta.construct();
    for (index, binding) in bindings.iter().enumerate() {
        let Some(member) = binding else {
            continue;
        };
        let value = row.value(index)?;
        if value.is_null() {
            continue;
        }
        member
            .set(&mut item, value)
            .map_err(|e| OrmError::conversion(row.name(index), e))?;
    }
    Ok(item)
}
