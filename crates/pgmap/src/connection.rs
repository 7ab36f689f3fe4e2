//! The capability set the mapping layer needs from a database client.

use crate::command::Command;
use crate::error::OrmResult;
use crate::reader::Reader;
use std::future::Future;

/// A database connection able to execute commands and batches.
///
/// Implemented for `tokio_postgres::Client`, `tokio_postgres::Transaction`,
/// pooled `deadpool_postgres::Client`s and [`PgConnection`](crate::pg::PgConnection).
/// Transactions and connection lifecycle stay with the implementor.
pub trait Connection: Send + Sync {
    type Reader: Reader + Send;

    /// Execute one command and open a reader over its rows.
    fn execute_reader(
        &self,
        command: &Command,
    ) -> impl Future<Output = OrmResult<Self::Reader>> + Send;

    /// Execute the commands in order; the reader yields one result set per command.
    fn execute_batch_reader(
        &self,
        commands: &[Command],
    ) -> impl Future<Output = OrmResult<Self::Reader>> + Send;

    /// Execute one command without reading rows. Returns the affected row count.
    fn execute(&self, command: &Command) -> impl Future<Output = OrmResult<u64>> + Send;

    /// Execute the commands in order. Returns the total affected row count.
    fn execute_batch(&self, commands: &[Command]) -> impl Future<Output = OrmResult<u64>> + Send;
}
