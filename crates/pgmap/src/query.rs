//! Query entry points: execute, read, hydrate.
//!
//! ```ignore
//! use pgmap::prelude::*;
//!
//! let users: Vec<User> = client
//!     .query_many("SELECT * FROM users WHERE age > @age", &[("age", 30)])
//!     .await?;
//!
//! let count: i64 = client.query_single("SELECT count(*) FROM users", &()).await?;
//! ```
//!
//! Commands and readers are dropped on every exit path, `?` included.

use crate::command::{Batch, Command, ToParams};
use crate::connection::Connection;
use crate::error::{OrmError, OrmResult};
use crate::mapper::{FromRow, RowMapper};
use crate::reader::Reader;
use std::future::Future;

fn prepare<P: ToParams + ?Sized>(sql: &str, params: &P) -> Command {
    let mut command = Command::new(sql);
    command.bind_params(params);

    #[cfg(feature = "tracing")]
    tracing::debug!(
        target: "pgmap.sql",
        sql = %sql,
        param_count = command.parameters().len(),
        "prepared command"
    );

    command
}

/// Query methods available on every [`Connection`].
pub trait QueryExt: Connection {
    /// Execute `sql` and map every row into `T`.
    fn query_many<T, P>(
        &self,
        sql: &str,
        params: &P,
    ) -> impl Future<Output = OrmResult<Vec<T>>> + Send
    where
        T: FromRow + Send,
        P: ToParams + Sync + ?Sized,
    {
        async move {
            let command = prepare(sql, params);
            let mut reader = self.execute_reader(&command).await?;
            let mut mapper = RowMapper::<T>::new();
            let mut items = Vec::new();
            while let Some(row) = reader.read().await? {
                items.push(mapper.map(&row)?);
            }

            #[cfg(feature = "tracing")]
            tracing::trace!(target: "pgmap.map", rows = items.len(), "mapped rows");

            Ok(items)
        }
    }

    /// Execute `sql` and map its only row into `T`.
    ///
    /// No row gives `T::default()`. A second row is an
    /// [`OrmError::TooManyRows`]; reading stops there.
    fn query_single<T, P>(&self, sql: &str, params: &P) -> impl Future<Output = OrmResult<T>> + Send
    where
        T: FromRow + Send,
        P: ToParams + Sync + ?Sized,
    {
        async move {
            let command = prepare(sql, params);
            let mut reader = self.execute_reader(&command).await?;
            let Some(row) = reader.read().await? else {
                return Ok(T::default());
            };
            let item = RowMapper::<T>::new().map(&row)?;
            if reader.read().await?.is_some() {
                return Err(OrmError::too_many_rows(1, 2));
            }
            Ok(item)
        }
    }

    /// Execute `sql` and map its first row into `T`, or `T::default()` when
    /// there is none. Remaining rows are not read.
    fn query_first_or_default<T, P>(
        &self,
        sql: &str,
        params: &P,
    ) -> impl Future<Output = OrmResult<T>> + Send
    where
        T: FromRow + Send,
        P: ToParams + Sync + ?Sized,
    {
        async move {
            let command = prepare(sql, params);
            let mut reader = self.execute_reader(&command).await?;
            match reader.read().await? {
                Some(row) => RowMapper::<T>::new().map(&row),
                None => Ok(T::default()),
            }
        }
    }

    /// Execute `sql` without reading rows. Returns the affected row count.
    fn execute_non_query<P>(&self, sql: &str, params: &P) -> impl Future<Output = OrmResult<u64>> + Send
    where
        P: ToParams + Sync + ?Sized,
    {
        async move {
            let command = prepare(sql, params);
            self.execute(&command).await
        }
    }
}

impl<C: Connection> QueryExt for C {}

impl<C: Connection> Batch<'_, C> {
    /// Execute the batch and map the rows of every result set, in order.
    pub async fn query_many<T: FromRow + Send>(&self) -> OrmResult<Vec<T>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let mut reader = self.connection().execute_batch_reader(self.commands()).await?;
        let mut mapper = RowMapper::<T>::new();
        let mut items = Vec::new();
        loop {
            while let Some(row) = reader.read().await? {
                items.push(mapper.map(&row)?);
            }
            if !reader.next_result().await? {
                break;
            }
            mapper.reset();
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(
            target: "pgmap.map",
            commands = self.len(),
            rows = items.len(),
            "mapped batch rows"
        );

        Ok(items)
    }
}

#[cfg(test)]
mod tests;
