//! Member descriptors and column plans.
//!
//! A [`Member`] is one public data member of an entity: its name plus a read
//! and a write accessor. The ordered member table of a type is produced at
//! compile time by `#[derive(Entity)]`, so no runtime type inspection is needed.
//!
//! A [`ColumnPlan`] is the write-side view over that table: exclusion filtering
//! and the naming convention applied, in declaration order.

use crate::convert::ConvertError;
use crate::mapper::TypeMetadata;
use crate::naming::Naming;
use crate::value::Value;
use std::fmt;

/// Descriptor of a single entity member.
pub struct Member<T> {
    name: &'static str,
    get: fn(&T) -> Value,
    set: fn(&mut T, Value) -> Result<(), ConvertError>,
}

impl<T> Member<T> {
    pub const fn new(
        name: &'static str,
        get: fn(&T) -> Value,
        set: fn(&mut T, Value) -> Result<(), ConvertError>,
    ) -> Self {
        Self { name, get, set }
    }

    /// Declared member name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Read this member from `instance`.
    pub fn get(&self, instance: &T) -> Value {
        (self.get)(instance)
    }

    /// Coerce `value` to the member's type and store it on `instance`.
    pub fn set(&self, instance: &mut T, value: Value) -> Result<(), ConvertError> {
        (self.set)(instance, value)
    }
}

impl<T> fmt::Debug for Member<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member").field("name", &self.name).finish()
    }
}

/// A type whose public data members map onto table columns.
///
/// Derive it with `#[derive(Entity)]`; the type must also implement `Default`,
/// which serves as the zero-argument constructor during hydration.
///
/// ```ignore
/// #[derive(Debug, Default, Entity)]
/// #[orm(table = "users")]
/// struct User {
///     id: i32,
///     name: String,
///     email: Option<String>,
/// }
/// ```
pub trait Entity: Sized + 'static {
    /// Default table name.
    const TABLE: &'static str;

    /// Members in declaration order.
    const MEMBERS: &'static [Member<Self>];

    /// Read-side metadata, built once per type and shared afterwards.
    fn metadata() -> &'static TypeMetadata<Self>;
}

/// One planned column: the exposed name and the member it reads from.
pub struct PlannedColumn<T: 'static> {
    pub name: String,
    pub member: &'static Member<T>,
}

impl<T> fmt::Debug for PlannedColumn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlannedColumn")
            .field("name", &self.name)
            .field("member", &self.member.name)
            .finish()
    }
}

/// Ordered `(exposed name, accessor)` pairs for write operations.
pub struct ColumnPlan<T: 'static> {
    columns: Vec<PlannedColumn<T>>,
    naming: Naming,
}

impl<T: 'static> fmt::Debug for ColumnPlan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnPlan")
            .field("columns", &self.columns)
            .field("naming", &self.naming)
            .finish()
    }
}

impl<T: 'static> ColumnPlan<T> {
    /// Plan the columns of `members`.
    ///
    /// `exclude` is matched case-insensitively whatever the naming convention;
    /// the convention only shapes the exposed names. Excluding every member is
    /// allowed and yields an empty plan.
    pub fn from_members<S: AsRef<str>>(
        members: &'static [Member<T>],
        exclude: &[S],
        naming: Naming,
    ) -> Self {
        let lowered: Vec<String> = exclude.iter().map(|e| e.as_ref().to_lowercase()).collect();

        let columns = members
            .iter()
            .filter(|m| exclude.is_empty() || !lowered.contains(&m.name.to_lowercase()))
            .map(|member| PlannedColumn {
                name: naming.apply(member.name).into_owned(),
                member,
            })
            .collect();

        Self { columns, naming }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Naming convention the exposed names were produced with.
    pub fn naming(&self) -> Naming {
        self.naming
    }

    /// Exposed names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Whether a planned column matches `name`, ignoring case under either convention.
    pub fn contains(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.columns.iter().any(|c| c.name.to_lowercase() == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlannedColumn<T>> {
        self.columns.iter()
    }
}

impl<T: Entity> ColumnPlan<T> {
    /// Plan the columns of an entity type.
    pub fn new<S: AsRef<str>>(exclude: &[S], naming: Naming) -> Self {
        Self::from_members(T::MEMBERS, exclude, naming)
    }
}

impl<'a, T: 'static> IntoIterator for &'a ColumnPlan<T> {
    type Item = &'a PlannedColumn<T>;
    type IntoIter = std::slice::Iter<'a, PlannedColumn<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

/// Enumerate the members of `T` into a column plan.
pub fn enumerate<T: Entity, S: AsRef<str>>(exclude: &[S], naming: Naming) -> ColumnPlan<T> {
    ColumnPlan::new(exclude, naming)
}
