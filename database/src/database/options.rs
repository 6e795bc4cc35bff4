use std::time::Duration;

use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;

use crate::persistence::storage::{StorageEngine, StorageError, StorageResult};

#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub storage_engine: StorageEngine,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub pool_size: usize,
    pub timeout: Duration,
}

// Implements: https://rust-unofficial.github.io/patterns/patterns/creational/builder.html
impl DatabaseOptions {
    pub fn set_storage_engine(mut self, storage_engine: StorageEngine) -> Self {
        self.storage_engine = storage_engine;
        self
    }

    pub fn set_host(mut self, host: String) -> Self {
        self.host = host;
        self
    }

    pub fn set_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn set_name(mut self, name: String) -> Self {
        self.name = name;
        self
    }

    pub fn set_credentials(mut self, user: String, password: String) -> Self {
        self.user = user;
        self.password = password;
        self
    }

    /// Upper bound on connections shared by all in-flight requests
    pub fn set_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Bounds both waiting for a free connection and opening a new one
    pub fn set_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the connection pool. Connections are opened lazily, so this
    /// succeeds even when the store is down.
    pub fn create_pool(&self) -> StorageResult<Pool> {
        let mut config = Config::new();
        config.host = Some(self.host.clone());
        config.port = Some(self.port);
        config.dbname = Some(self.name.clone());
        config.user = Some(self.user.clone());
        config.password = Some(self.password.clone());

        config.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_config = PoolConfig::new(self.pool_size);
        pool_config.timeouts.wait = Some(self.timeout);
        pool_config.timeouts.create = Some(self.timeout);
        pool_config.timeouts.recycle = Some(self.timeout);
        config.pool = Some(pool_config);

        config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StorageError::Pool(anyhow::Error::new(e)))
    }
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            storage_engine: StorageEngine::Postgres,
            host: "localhost".to_string(),
            port: 5432,
            name: "persons".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            pool_size: 16,
            timeout: Duration::from_secs(5),
        }
    }
}
