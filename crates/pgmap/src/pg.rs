//! PostgreSQL connections via tokio-postgres.
//!
//! `@name` placeholders are rewritten to `$n` and each statement is prepared
//! with parameter types taken from the bound values (NULL leaves the type to
//! the server). Single commands stream their rows. A batch prepares each
//! distinct statement once, pipelines its commands in order and buffers one
//! result set per command.
//!
//! ```ignore
//! use pgmap::prelude::*;
//! use std::time::Duration;
//!
//! let conn = PgConnection::new(client).with_config(
//!     ConnectionConfig::new()
//!         .query_timeout(Duration::from_secs(5))
//!         .slow_query_threshold(Duration::from_millis(200)),
//! );
//! let users: Vec<User> = conn.query_many("SELECT * FROM users", &()).await?;
//! ```

use crate::command::Command;
use crate::connection::Connection;
use crate::error::{OrmError, OrmResult};
use crate::reader::{BufferedReader, Reader};
use crate::value::Value;
use futures_util::TryStreamExt;
use futures_util::future::try_join_all;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{CancelToken, Error, Row, RowStream, Statement};

/// The subset of the tokio-postgres client API the connections are built on.
pub trait PgExecutor: Send + Sync {
    fn prepare_typed(
        &self,
        sql: &str,
        types: &[Type],
    ) -> impl Future<Output = Result<Statement, Error>> + Send;

    fn query_raw(
        &self,
        statement: &Statement,
        params: &[&Value],
    ) -> impl Future<Output = Result<RowStream, Error>> + Send;

    fn execute_raw(
        &self,
        statement: &Statement,
        params: &[&Value],
    ) -> impl Future<Output = Result<u64, Error>> + Send;

    fn cancel_token(&self) -> CancelToken;
}

fn sql_params<'a>(params: &'a [&'a Value]) -> impl ExactSizeIterator<Item = &'a (dyn ToSql + Sync)> {
    params.iter().map(|v| *v as &(dyn ToSql + Sync))
}

impl PgExecutor for tokio_postgres::Client {
    async fn prepare_typed(&self, sql: &str, types: &[Type]) -> Result<Statement, Error> {
        tokio_postgres::Client::prepare_typed(self, sql, types).await
    }

    async fn query_raw(&self, statement: &Statement, params: &[&Value]) -> Result<RowStream, Error> {
        tokio_postgres::Client::query_raw(self, statement, sql_params(params)).await
    }

    async fn execute_raw(&self, statement: &Statement, params: &[&Value]) -> Result<u64, Error> {
        tokio_postgres::Client::execute_raw(self, statement, sql_params(params)).await
    }

    fn cancel_token(&self) -> CancelToken {
        tokio_postgres::Client::cancel_token(self)
    }
}

impl PgExecutor for tokio_postgres::Transaction<'_> {
    async fn prepare_typed(&self, sql: &str, types: &[Type]) -> Result<Statement, Error> {
        tokio_postgres::Transaction::prepare_typed(self, sql, types).await
    }

    async fn query_raw(&self, statement: &Statement, params: &[&Value]) -> Result<RowStream, Error> {
        tokio_postgres::Transaction::query_raw(self, statement, sql_params(params)).await
    }

    async fn execute_raw(&self, statement: &Statement, params: &[&Value]) -> Result<u64, Error> {
        tokio_postgres::Transaction::execute_raw(self, statement, sql_params(params)).await
    }

    fn cancel_token(&self) -> CancelToken {
        tokio_postgres::Transaction::cancel_token(self)
    }
}

#[cfg(feature = "pool")]
impl PgExecutor for deadpool_postgres::Client {
    async fn prepare_typed(&self, sql: &str, types: &[Type]) -> Result<Statement, Error> {
        let client: &tokio_postgres::Client = self;
        PgExecutor::prepare_typed(client, sql, types).await
    }

    async fn query_raw(&self, statement: &Statement, params: &[&Value]) -> Result<RowStream, Error> {
        let client: &tokio_postgres::Client = self;
        PgExecutor::query_raw(client, statement, params).await
    }

    async fn execute_raw(&self, statement: &Statement, params: &[&Value]) -> Result<u64, Error> {
        let client: &tokio_postgres::Client = self;
        PgExecutor::execute_raw(client, statement, params).await
    }

    fn cancel_token(&self) -> CancelToken {
        let client: &tokio_postgres::Client = self;
        client.cancel_token()
    }
}

enum Source {
    Stream(Pin<Box<RowStream>>),
    Buffered(BufferedReader<Row>),
    Done,
}

/// Reader over the rows of a PostgreSQL command or batch.
pub struct PgReader {
    source: Source,
}

impl PgReader {
    fn streaming(stream: RowStream) -> Self {
        Self {
            source: Source::Stream(Box::pin(stream)),
        }
    }

    fn buffered(result_sets: Vec<Vec<Row>>) -> Self {
        Self {
            source: Source::Buffered(BufferedReader::new(result_sets)),
        }
    }
}

impl std::fmt::Debug for PgReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = match self.source {
            Source::Stream(_) => "stream",
            Source::Buffered(_) => "buffered",
            Source::Done => "done",
        };
        f.debug_struct("PgReader").field("source", &source).finish()
    }
}

impl Reader for PgReader {
    type Row = Row;

    async fn read(&mut self) -> OrmResult<Option<Row>> {
        match &mut self.source {
            Source::Stream(stream) => stream.try_next().await.map_err(OrmError::from_db_error),
            Source::Buffered(reader) => reader.read().await,
            Source::Done => Ok(None),
        }
    }

    async fn next_result(&mut self) -> OrmResult<bool> {
        if let Source::Buffered(reader) = &mut self.source {
            return reader.next_result().await;
        }
        // A single command has exactly one result set.
        self.source = Source::Done;
        Ok(false)
    }
}

async fn prepare<'c, E: PgExecutor + ?Sized>(
    executor: &E,
    command: &'c Command,
) -> OrmResult<(Statement, Vec<&'c Value>)> {
    let (sql, values) = command.to_positional();
    let types: Vec<Type> = values.iter().map(|v| v.pg_type()).collect();
    let statement = executor
        .prepare_typed(&sql, &types)
        .await
        .map_err(OrmError::from_db_error)?;
    Ok((statement, values))
}

async fn open_reader<E: PgExecutor + ?Sized>(executor: &E, command: &Command) -> OrmResult<PgReader> {
    let (statement, values) = prepare(executor, command).await?;
    let stream = executor
        .query_raw(&statement, &values)
        .await
        .map_err(OrmError::from_db_error)?;
    Ok(PgReader::streaming(stream))
}

/// The commands of a batch in positional form, grouped by statement shape.
///
/// Commands sharing SQL text and parameter types share one prepared
/// statement, so a batch insert prepares once per distinct shape, not per row.
struct BatchPlan<'c> {
    shapes: Vec<(String, Vec<Type>)>,
    commands: Vec<(usize, Vec<&'c Value>)>,
}

impl<'c> BatchPlan<'c> {
    fn new(commands: &'c [Command]) -> Self {
        let mut shapes: Vec<(String, Vec<Type>)> = Vec::new();
        let mut planned = Vec::with_capacity(commands.len());
        for command in commands {
            let (sql, values) = command.to_positional();
            let types: Vec<Type> = values.iter().map(|v| v.pg_type()).collect();
            let shape = match shapes.iter().position(|(s, t)| *s == sql && *t == types) {
                Some(shape) => shape,
                None => {
                    shapes.push((sql, types));
                    shapes.len() - 1
                }
            };
            planned.push((shape, values));
        }
        Self {
            shapes,
            commands: planned,
        }
    }

    async fn prepare<E: PgExecutor + ?Sized>(&self, executor: &E) -> OrmResult<Vec<Statement>> {
        try_join_all(
            self.shapes
                .iter()
                .map(|(sql, types)| executor.prepare_typed(sql, types)),
        )
        .await
        .map_err(OrmError::from_db_error)
    }
}

// Requests issued together are pipelined on the connection and run in order.

async fn open_batch_reader<E: PgExecutor + ?Sized>(
    executor: &E,
    commands: &[Command],
) -> OrmResult<PgReader> {
    let plan = BatchPlan::new(commands);
    let statements = plan.prepare(executor).await?;
    let statements = &statements;
    let result_sets = try_join_all(plan.commands.iter().map(|(shape, values)| async move {
        executor
            .query_raw(&statements[*shape], values)
            .await?
            .try_collect::<Vec<Row>>()
            .await
    }))
    .await
    .map_err(OrmError::from_db_error)?;
    Ok(PgReader::buffered(result_sets))
}

async fn execute<E: PgExecutor + ?Sized>(executor: &E, command: &Command) -> OrmResult<u64> {
    let (statement, values) = prepare(executor, command).await?;
    executor
        .execute_raw(&statement, &values)
        .await
        .map_err(OrmError::from_db_error)
}

async fn execute_batch<E: PgExecutor + ?Sized>(executor: &E, commands: &[Command]) -> OrmResult<u64> {
    let plan = BatchPlan::new(commands);
    let statements = plan.prepare(executor).await?;
    let affected = try_join_all(
        plan.commands
            .iter()
            .map(|(shape, values)| executor.execute_raw(&statements[*shape], values)),
    )
    .await
    .map_err(OrmError::from_db_error)?;
    Ok(affected.into_iter().sum())
}

macro_rules! impl_connection_for_executor {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Connection for $ty {
                type Reader = PgReader;

                async fn execute_reader(&self, command: &Command) -> OrmResult<PgReader> {
                    open_reader(self, command).await
                }

                async fn execute_batch_reader(&self, commands: &[Command]) -> OrmResult<PgReader> {
                    open_batch_reader(self, commands).await
                }

                async fn execute(&self, command: &Command) -> OrmResult<u64> {
                    execute(self, command).await
                }

                async fn execute_batch(&self, commands: &[Command]) -> OrmResult<u64> {
                    execute_batch(self, commands).await
                }
            }
        )*
    };
}

impl_connection_for_executor!(tokio_postgres::Client, tokio_postgres::Transaction<'_>);

#[cfg(feature = "pool")]
impl_connection_for_executor!(deadpool_postgres::Client);

/// Settings of a [`PgConnection`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Abort statements running longer than this; the server is asked to
    /// cancel them.
    pub query_timeout: Option<Duration>,
    /// Log statements slower than this at WARN.
    pub slow_query_threshold: Option<Duration>,
    /// Log the rewritten SQL of every statement at DEBUG.
    pub log_sql: bool,
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    pub fn log_sql(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }
}

/// A PostgreSQL executor with timeouts and statement logging.
///
/// A timeout covers a statement until its reader is open; rows of a
/// streamed command are read without a deadline.
pub struct PgConnection<E> {
    executor: E,
    config: ConnectionConfig,
}

impl<E: PgExecutor> PgConnection<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            config: ConnectionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn inner(&self) -> &E {
        &self.executor
    }

    pub fn into_inner(self) -> E {
        self.executor
    }

    async fn run<T, F>(&self, sql: &str, statements: usize, future: F) -> OrmResult<T>
    where
        F: Future<Output = OrmResult<T>> + Send,
    {
        #[cfg(feature = "tracing")]
        if self.config.log_sql {
            tracing::debug!(target: "pgmap.sql", statements, sql = %sql, "executing");
        }

        let start = Instant::now();
        let result = match self.config.query_timeout {
            Some(timeout) => {
                tokio::pin!(future);
                tokio::select! {
                    result = &mut future => result,
                    _ = tokio::time::sleep(timeout) => {
                        let cancel_token = self.executor.cancel_token();
                        tokio::spawn(async move {
                            let _ = cancel_token.cancel_query(tokio_postgres::NoTls).await;
                        });
                        Err(OrmError::Timeout(timeout))
                    }
                }
            }
            None => future.await,
        };
        let elapsed = start.elapsed();

        if let Some(threshold) = self.config.slow_query_threshold {
            if elapsed > threshold {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    target: "pgmap.sql",
                    statements,
                    elapsed_ms = elapsed.as_millis() as u64,
                    sql = %sql,
                    "slow query"
                );
            }
        }
        #[cfg(not(feature = "tracing"))]
        let _ = (sql, statements, elapsed);

        result
    }
}

fn first_sql(commands: &[Command]) -> &str {
    commands.first().map_or("", Command::sql)
}

impl<E: PgExecutor> Connection for PgConnection<E> {
    type Reader = PgReader;

    async fn execute_reader(&self, command: &Command) -> OrmResult<PgReader> {
        self.run(command.sql(), 1, open_reader(&self.executor, command))
            .await
    }

    async fn execute_batch_reader(&self, commands: &[Command]) -> OrmResult<PgReader> {
        self.run(
            first_sql(commands),
            commands.len(),
            open_batch_reader(&self.executor, commands),
        )
        .await
    }

    async fn execute(&self, command: &Command) -> OrmResult<u64> {
        self.run(command.sql(), 1, execute(&self.executor, command))
            .await
    }

    async fn execute_batch(&self, commands: &[Command]) -> OrmResult<u64> {
        self.run(
            first_sql(commands),
            commands.len(),
            execute_batch(&self.executor, commands),
        )
        .await
    }
}
