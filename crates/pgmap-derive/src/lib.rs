//! Derive macros for pgmap
//!
//! Provides `#[derive(Entity)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod common;
mod entity;

/// Derive `Entity` and `FromRow` for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use pgmap::Entity;
///
/// #[derive(Debug, Default, Entity)]
/// #[orm(table = "users")]
/// struct User {
///     id: i64,
///     #[orm(column = "UserName")]
///     name: String,
///     email: Option<String>,
///     #[orm(skip)]
///     cached_score: u32,
/// }
/// ```
///
/// # Generated
///
/// - `TABLE: &'static str` - default table name
/// - `MEMBERS` - one accessor pair per field, in declaration order
/// - `metadata()` - read-side column lookup, built on first use
/// - `impl FromRow` - rows hydrate by case-insensitive column name
/// - `COL_*: &'static str` - member name constants
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - table name (default: snake_case of the type name)
/// - `#[orm(column = "name")]` - member name used for columns and parameters
/// - `#[orm(skip)]` - not a member; left at its `Default` value on reads
///
/// The struct must implement `Default`.
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
