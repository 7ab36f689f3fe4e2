//! Connection pools (deadpool-postgres).
//!
//! Pooled clients implement [`Connection`](crate::Connection) directly:
//!
//! ```ignore
//! let pool = pgmap::create_pool(&std::env::var("DATABASE_URL")?)?;
//! let client = pool.get().await?;
//! let users: Vec<User> = client.query_many("SELECT * FROM users", &()).await?;
//! ```

use crate::error::{OrmError, OrmResult};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};
use tokio_postgres::{NoTls, Socket};

/// Pool settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_size: usize,
    /// Run a test query before handing out a recycled client.
    pub verify_on_recycle: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 16,
            verify_on_recycle: false,
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn verify_on_recycle(mut self, enabled: bool) -> Self {
        self.verify_on_recycle = enabled;
        self
    }

    fn manager_config(&self) -> ManagerConfig {
        let recycling_method = if self.verify_on_recycle {
            RecyclingMethod::Verified
        } else {
            RecyclingMethod::Fast
        };
        ManagerConfig { recycling_method }
    }
}

/// Create a pool from a database URL without TLS and default settings.
pub fn create_pool(database_url: &str) -> OrmResult<Pool> {
    create_pool_with_config(database_url, &PoolConfig::default())
}

/// Create a pool from a database URL without TLS.
pub fn create_pool_with_config(database_url: &str, config: &PoolConfig) -> OrmResult<Pool> {
    create_pool_with_tls(database_url, NoTls, config)
}

/// Create a pool from a database URL with a TLS connector.
pub fn create_pool_with_tls<T>(database_url: &str, tls: T, config: &PoolConfig) -> OrmResult<Pool>
where
    T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
    T::Stream: Sync + Send,
    T::TlsConnect: Sync + Send,
    <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    let pg_config: tokio_postgres::Config = database_url
        .parse()
        .map_err(|e: tokio_postgres::Error| OrmError::Connection(e.to_string()))?;

    let manager = Manager::from_config(pg_config, tls, config.manager_config());
    Pool::builder(manager)
        .max_size(config.max_size)
        .build()
        .map_err(|e| OrmError::Pool(e.to_string()))
}
