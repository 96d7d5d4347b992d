//! PostgreSQL connection plumbing: the pooled engine and its TLS setup.

mod engine;
pub mod tls;

pub use engine::PostgresEngine;

#[cfg(test)]
pub(crate) mod testing {
    use super::{PostgresEngine, tls};
    use crate::config::{DatabaseConfig, SslMode};

    /// Engine over a pool that never connects unless a query is issued.
    pub(crate) fn lazy_engine() -> PostgresEngine {
        let config = DatabaseConfig::from_url("postgres://localhost/chatvault_test");
        let pool = tls::create_pool(&config.to_pool_config(), SslMode::Disable)
            .expect("pool creation is lazy");
        PostgresEngine::from_pool(pool)
    }
}
