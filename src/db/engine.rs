//! Pooled connection handle shared by every chat history.

use deadpool_postgres::{Object, Pool};

use crate::config::{DatabaseConfig, InstanceAddress};
use crate::db::tls;
use crate::error::{DatabaseError, HistoryError};
use crate::history::schema::TableRef;

/// Connection provider backed by a `deadpool-postgres` pool.
///
/// Cloning is cheap and shares the same pool.
#[derive(Clone)]
pub struct PostgresEngine {
    pool: Pool,
    instance: Option<InstanceAddress>,
}

impl std::fmt::Debug for PostgresEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("PostgresEngine")
            .field("instance", &self.instance)
            .field("max_size", &status.max_size)
            .field("size", &status.size)
            .finish()
    }
}

impl PostgresEngine {
    /// Build the pool from configuration and check out one connection to
    /// prove the database is reachable.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = tls::create_pool(&config.to_pool_config(), config.ssl_mode)?;

        // Test connection
        let _ = pool.get().await?;

        tracing::info!(
            target = %config.describe(),
            ssl_mode = %config.ssl_mode,
            pool_size = config.pool_size,
            "Connected to PostgreSQL"
        );

        Ok(Self {
            pool,
            instance: config.instance.clone(),
        })
    }

    /// Wrap a pool managed by the caller.
    pub fn from_pool(pool: Pool) -> Self {
        Self {
            pool,
            instance: None,
        }
    }

    /// Get a connection from the pool.
    pub async fn conn(&self) -> Result<Object, DatabaseError> {
        Ok(self.pool.get().await?)
    }

    /// Get a clone of the database pool.
    pub fn pool(&self) -> Pool {
        self.pool.clone()
    }

    /// Managed instance this engine was configured for, if any.
    pub fn instance(&self) -> Option<&InstanceAddress> {
        self.instance.as_ref()
    }

    /// Run a trivial query and return the current database name.
    pub async fn ping(&self) -> Result<String, DatabaseError> {
        let conn = self.conn().await?;
        let row = conn.query_one("SELECT current_database()", &[]).await?;
        Ok(row.get(0))
    }

    /// Close the pool. Outstanding connections are dropped as they are
    /// returned and later checkouts fail.
    pub fn close(&self) {
        self.pool.close();
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Create the schema and the chat history table if they do not exist,
    /// using the default column names.
    pub async fn init_chat_history_table(
        &self,
        schema_name: &str,
        table_name: &str,
    ) -> Result<(), HistoryError> {
        let table = TableRef::new(schema_name, table_name, Default::default())?;
        table.initialize(self).await
    }
}
