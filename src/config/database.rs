use secrecy::{ExposeSecret, SecretString};

use crate::config::{InstanceAddress, optional_env, parse_optional_env};
use crate::error::ConfigError;

/// Default host when no URL is configured (a local Auth Proxy).
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default PostgreSQL port.
pub const DEFAULT_PORT: u16 = 5432;

const APPLICATION_NAME: &str = "chatvault";

/// PostgreSQL SSL/TLS mode, matching libpq semantics for the common cases.
///
/// Default is `Prefer`: attempt TLS, fall back to plaintext when the
/// server does not offer it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    /// Never use TLS (equivalent to libpq `sslmode=disable`).
    Disable,
    /// Use TLS when the server supports it (default).
    #[default]
    Prefer,
    /// Require TLS; fail if the server does not support it.
    Require,
}

impl std::fmt::Display for SslMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disable => write!(f, "disable"),
            Self::Prefer => write!(f, "prefer"),
            Self::Require => write!(f, "require"),
        }
    }
}

impl std::str::FromStr for SslMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disable" => Ok(Self::Disable),
            "prefer" => Ok(Self::Prefer),
            "require" => Ok(Self::Require),
            _ => Err(format!(
                "invalid DATABASE_SSLMODE '{}', expected 'disable', 'prefer', or 'require'",
                s
            )),
        }
    }
}

impl From<SslMode> for deadpool_postgres::SslMode {
    fn from(mode: SslMode) -> Self {
        match mode {
            SslMode::Disable => Self::Disable,
            SslMode::Prefer => Self::Prefer,
            SslMode::Require => Self::Require,
        }
    }
}

/// Database configuration.
///
/// Either a full `url` or discrete connection components. When both are
/// present, components that are set override the matching URL parts.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<SecretString>,
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<SecretString>,
    pub database: Option<String>,
    pub pool_size: usize,
    /// TLS mode for PostgreSQL connections (default: Prefer).
    pub ssl_mode: SslMode,
    /// Managed instance this connection targets, if any.
    pub instance: Option<InstanceAddress>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            user: None,
            password: None,
            database: None,
            pool_size: 10,
            ssl_mode: SslMode::default(),
            instance: None,
        }
    }
}

impl DatabaseConfig {
    /// Config pointing at a connection URL, everything else defaulted.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(SecretString::from(url.into())),
            ..Self::default()
        }
    }

    pub fn resolve() -> Result<Self, ConfigError> {
        let url = optional_env("DATABASE_URL")?;
        let database = optional_env("DATABASE_NAME")?;

        if url.is_none() && database.is_none() {
            return Err(ConfigError::MissingRequired {
                key: "DATABASE_URL".to_string(),
                hint: "Set DATABASE_URL, or DATABASE_NAME with DATABASE_USER/DATABASE_PASSWORD"
                    .to_string(),
            });
        }

        let ssl_mode: SslMode = if let Some(s) = optional_env("DATABASE_SSLMODE")? {
            s.parse().map_err(|e| ConfigError::InvalidValue {
                key: "DATABASE_SSLMODE".to_string(),
                message: e,
            })?
        } else {
            SslMode::default()
        };

        let alloydb = optional_env("ALLOYDB_INSTANCE")?;
        let cloudsql = optional_env("CLOUDSQL_INSTANCE")?;
        let instance = match (alloydb, cloudsql) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::InvalidValue {
                    key: "CLOUDSQL_INSTANCE".to_string(),
                    message: "cannot be combined with ALLOYDB_INSTANCE".to_string(),
                });
            }
            (Some(name), None) => Some(InstanceAddress::parse_alloydb(&name).map_err(|e| {
                ConfigError::InvalidValue {
                    key: "ALLOYDB_INSTANCE".to_string(),
                    message: e,
                }
            })?),
            (None, Some(name)) => Some(InstanceAddress::parse_cloudsql(&name).map_err(|e| {
                ConfigError::InvalidValue {
                    key: "CLOUDSQL_INSTANCE".to_string(),
                    message: e,
                }
            })?),
            (None, None) => None,
        };

        Ok(Self {
            url: url.map(SecretString::from),
            host: optional_env("DATABASE_HOST")?.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_optional_env("DATABASE_PORT", DEFAULT_PORT)?,
            user: optional_env("DATABASE_USER")?,
            password: optional_env("DATABASE_PASSWORD")?.map(SecretString::from),
            database,
            pool_size: parse_optional_env("DATABASE_POOL_SIZE", 10)?,
            ssl_mode,
            instance,
        })
    }

    /// Get the database URL (exposes the secret).
    pub fn url(&self) -> Option<&str> {
        self.url.as_ref().map(|u| u.expose_secret())
    }

    /// Human-readable target for logs. Never includes credentials.
    pub fn describe(&self) -> String {
        if let Some(instance) = &self.instance {
            return instance.connection_name();
        }
        if self.url.is_some() {
            return "DATABASE_URL".to_string();
        }
        format!(
            "{}:{}/{}",
            self.host,
            self.port,
            self.database.as_deref().unwrap_or_default()
        )
    }

    /// Build the deadpool configuration for this database.
    pub fn to_pool_config(&self) -> deadpool_postgres::Config {
        let mut cfg = deadpool_postgres::Config::new();
        match self.url() {
            Some(url) => cfg.url = Some(url.to_string()),
            None => {
                cfg.host = Some(self.host.clone());
                cfg.port = Some(self.port);
            }
        }
        cfg.user = self.user.clone();
        cfg.password = self
            .password
            .as_ref()
            .map(|p| p.expose_secret().to_string());
        cfg.dbname = self.database.clone();
        cfg.ssl_mode = Some(self.ssl_mode.into());
        cfg.application_name = Some(match &self.instance {
            Some(instance) => format!("{APPLICATION_NAME}:{}", instance.instance_id()),
            None => APPLICATION_NAME.to_string(),
        });
        cfg.manager = Some(deadpool_postgres::ManagerConfig {
            recycling_method: deadpool_postgres::RecyclingMethod::Fast,
        });
        cfg.pool = Some(deadpool_postgres::PoolConfig {
            max_size: self.pool_size,
            ..Default::default()
        });
        cfg
    }
}
