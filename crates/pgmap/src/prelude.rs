//! Convenient imports for typical `pgmap` usage.
//!
//! ```ignore
//! use pgmap::prelude::*;
//! ```

pub use crate::{
    Batch, Command, Connection, Entity, FromRow, InsertOptions, Naming, OrmError, OrmResult,
    QueryExt, Value, batch_insert, insert_one,
};

pub use crate::{ConnectionConfig, PgConnection};

#[cfg(feature = "pool")]
pub use crate::{create_pool, create_pool_with_config};
