use crate::config::{optional_env, parse_bool_env};
use crate::error::ConfigError;

/// Which chat history table and session to operate on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    pub table: String,
    pub schema: String,
    pub session_id: String,
    /// Allow `clear` and `set_messages` to modify stored rows.
    pub overwrite: bool,
    /// Create the schema and table when they are missing.
    pub create_table: bool,
}

/// Explicitly supplied values, such as command-line flags, that take
/// precedence over the environment.
///
/// `true` flags win; `false` leaves the environment in charge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryOverrides {
    pub table: Option<String>,
    pub schema: Option<String>,
    pub session_id: Option<String>,
    pub overwrite: bool,
    pub create_table: bool,
}

impl HistoryConfig {
    pub fn resolve() -> Result<Self, ConfigError> {
        Self::resolve_with(&HistoryOverrides::default())
    }

    /// Resolve from the environment, letting `overrides` win.
    pub fn resolve_with(overrides: &HistoryOverrides) -> Result<Self, ConfigError> {
        let (schema, table) = Self::resolve_table(overrides)?;
        let session_id = explicit_or_env(overrides.session_id.as_deref(), "CHAT_SESSION_ID")?
            .ok_or_else(|| ConfigError::MissingRequired {
                key: "CHAT_SESSION_ID".to_string(),
                hint: "Set CHAT_SESSION_ID or pass --session".to_string(),
            })?;

        Ok(Self {
            table,
            schema,
            session_id,
            overwrite: overrides.overwrite || parse_bool_env("CHAT_HISTORY_OVERWRITE", false)?,
            create_table: overrides.create_table
                || parse_bool_env("CHAT_HISTORY_CREATE_TABLE", false)?,
        })
    }

    /// Resolve only `(schema, table)`, for operations without a session.
    pub fn resolve_table(overrides: &HistoryOverrides) -> Result<(String, String), ConfigError> {
        let table = explicit_or_env(overrides.table.as_deref(), "CHAT_HISTORY_TABLE")?
            .ok_or_else(|| ConfigError::MissingRequired {
                key: "CHAT_HISTORY_TABLE".to_string(),
                hint: "Set CHAT_HISTORY_TABLE or pass --table".to_string(),
            })?;
        let schema = explicit_or_env(overrides.schema.as_deref(), "CHAT_HISTORY_SCHEMA")?
            .unwrap_or_else(|| crate::history::DEFAULT_SCHEMA.to_string());
        Ok((schema, table))
    }
}

fn explicit_or_env(explicit: Option<&str>, key: &str) -> Result<Option<String>, ConfigError> {
    match explicit.filter(|v| !v.is_empty()) {
        Some(v) => Ok(Some(v.to_string())),
        None => optional_env(key),
    }
}
