//! TLS connector factory for PostgreSQL connections.
//!
//! Builds a [`deadpool_postgres::Pool`] with the appropriate TLS connector
//! based on the configured [`SslMode`]. Uses `rustls` with the platform's
//! root certificates, falling back to the bundled Mozilla roots.

use deadpool_postgres::{Pool, Runtime};
use tokio_postgres::NoTls;
use tokio_postgres_rustls::MakeRustlsConnect;

use crate::config::SslMode;

/// Load the platform root store, or the bundled roots if it is empty.
fn load_root_store() -> rustls::RootCertStore {
    let mut root_store = rustls::RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for e in &native.errors {
        tracing::warn!("error loading system root certs: {e}");
    }
    for cert in native.certs {
        if let Err(e) = root_store.add(cert) {
            tracing::warn!("skipping invalid system root cert: {e}");
        }
    }
    if root_store.is_empty() {
        tracing::warn!("no system root certificates found, using bundled webpki roots");
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }
    root_store
}

fn make_rustls_connector() -> MakeRustlsConnect {
    // Err means a provider is already installed for the process.
    let _ = rustls::crypto::ring::default_provider().install_default();
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(load_root_store())
        .with_no_client_auth();
    MakeRustlsConnect::new(config)
}

/// Create a [`deadpool_postgres::Pool`] with the appropriate TLS connector.
///
/// - `Disable` → plain TCP (no TLS)
/// - `Prefer` / `Require` → rustls; the difference is enforced by the
///   `sslmode` carried in the pool configuration
///
/// The pool connects lazily, so this never touches the network.
pub fn create_pool(
    config: &deadpool_postgres::Config,
    ssl_mode: SslMode,
) -> Result<Pool, deadpool_postgres::CreatePoolError> {
    match ssl_mode {
        SslMode::Disable => config.create_pool(Some(Runtime::Tokio1), NoTls),
        SslMode::Prefer | SslMode::Require => {
            let tls = make_rustls_connector();
            config.create_pool(Some(Runtime::Tokio1), tls)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> deadpool_postgres::Config {
        let mut config = deadpool_postgres::Config::new();
        config.url = Some("postgres://localhost/chatvault_test".to_string());
        config
    }

    #[test]
    fn create_pool_disable_mode() {
        assert!(create_pool(&local_config(), SslMode::Disable).is_ok());
    }

    #[test]
    fn create_pool_tls_modes() {
        for mode in [SslMode::Prefer, SslMode::Require] {
            assert!(create_pool(&local_config(), mode).is_ok(), "{mode}");
        }
    }

    #[test]
    fn root_store_is_never_empty() {
        assert!(!load_root_store().is_empty());
    }
}
