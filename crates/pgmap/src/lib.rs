//! # pgmap
//!
//! Metadata-driven mapping between Rust structs and PostgreSQL rows.
//!
//! - **Inserts from structure**: column lists, `@name` placeholders and
//!   existence-checked inserts are generated from a type's members
//! - **Binding**: member values become named command parameters, absent
//!   values become NULL
//! - **Hydration**: rows are mapped back onto structs by case-insensitive
//!   column name, or straight into scalars for single-column projections
//! - **Plain SQL**: queries are hand-written; `@name` placeholders are rewritten
//!   to `$n` before they reach the server
//!
//! ```ignore
//! use pgmap::prelude::*;
//!
//! #[derive(Debug, Default, Entity)]
//! #[orm(table = "users")]
//! struct User {
//!     id: i32,
//!     name: String,
//!     email: Option<String>,
//! }
//!
//! let users = vec![User { id: 1, name: "ada".into(), email: None }];
//! batch_insert(&client, "users", &users, &InsertOptions::new().exists_check(["id"]))?
//!     .execute()
//!     .await?;
//!
//! let user: User = client
//!     .query_single("SELECT * FROM users WHERE id = @id", &[("id", 1)])
//!     .await?;
//! ```

pub mod bind;
pub mod command;
pub mod connection;
pub mod convert;
pub mod error;
pub mod insert;
pub mod mapper;
pub mod member;
pub mod naming;
pub mod pg;
pub mod prelude;
pub mod query;
pub mod reader;
pub mod statement;
pub mod value;

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(test)]
mod mock;

pub use bind::{bind, build_parameters};
pub use command::{Batch, Command, Parameter, ToParams};
pub use connection::Connection;
pub use convert::{ConvertError, FromValue};
pub use error::{OrmError, OrmResult};
pub use insert::{InsertOptions, batch_insert, insert_one};
pub use mapper::{FromRow, Mapping, Record, RowMapper, TypeMetadata, map_row};
pub use member::{ColumnPlan, Entity, Member, PlannedColumn, enumerate};
pub use naming::Naming;
pub use pg::{ConnectionConfig, PgConnection, PgExecutor, PgReader};
pub use query::QueryExt;
pub use reader::{BufferedReader, BufferedRow, Reader};
pub use statement::build_insert;
pub use value::{ToValue, Value};

#[cfg(feature = "pool")]
pub use pool::{PoolConfig, create_pool, create_pool_with_config, create_pool_with_tls};

#[cfg(feature = "derive")]
pub use pgmap_derive::Entity;

// Lets callers name client types without a direct dependency.
pub use tokio_postgres;
