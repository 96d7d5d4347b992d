use crate::config::HistoryConfig;
use crate::db::PostgresEngine;
use crate::error::HistoryError;
use crate::history::schema::{HistoryColumns, TableRef};
use crate::history::{ChatMessageHistory, DEFAULT_SCHEMA};

/// What to do about the table when a history is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableMode {
    /// The table must already exist with the required columns.
    #[default]
    Validate,
    /// Create the schema and table if they are missing.
    CreateIfMissing,
}

/// Builder for [`ChatMessageHistory`].
///
/// Engine, table name and session id are required; everything else has a
/// default (`public` schema, overwrite off, validate mode, default columns).
#[derive(Debug, Clone)]
pub struct ChatMessageHistoryBuilder {
    engine: Option<PostgresEngine>,
    table_name: String,
    schema_name: String,
    session_id: String,
    overwrite: bool,
    mode: TableMode,
    columns: HistoryColumns,
}

impl Default for ChatMessageHistoryBuilder {
    fn default() -> Self {
        Self {
            engine: None,
            table_name: String::new(),
            schema_name: DEFAULT_SCHEMA.to_string(),
            session_id: String::new(),
            overwrite: false,
            mode: TableMode::default(),
            columns: HistoryColumns::default(),
        }
    }
}

impl ChatMessageHistoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pre-filled from resolved configuration.
    pub fn from_config(engine: PostgresEngine, config: &HistoryConfig) -> Self {
        let mode = if config.create_table {
            TableMode::CreateIfMissing
        } else {
            TableMode::Validate
        };
        Self::new()
            .engine(engine)
            .table_name(&config.table)
            .schema_name(&config.schema)
            .session_id(&config.session_id)
            .overwrite(config.overwrite)
            .table_mode(mode)
    }

    pub fn engine(mut self, engine: PostgresEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn schema_name(mut self, schema_name: impl Into<String>) -> Self {
        self.schema_name = schema_name.into();
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Allow `clear` and `set_messages` to delete stored rows.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn table_mode(mut self, mode: TableMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn create_table_if_missing(self) -> Self {
        self.table_mode(TableMode::CreateIfMissing)
    }

    /// Override the column names of the table.
    pub fn columns(mut self, columns: HistoryColumns) -> Self {
        self.columns = columns;
        self
    }

    /// Check required values and assemble the history without touching
    /// the database.
    pub(crate) fn prepare(self) -> Result<(ChatMessageHistory, TableMode), HistoryError> {
        let engine = self.engine.ok_or(HistoryError::MissingEngine)?;
        if self.table_name.is_empty() {
            return Err(HistoryError::MissingTable);
        }
        if self.session_id.is_empty() {
            return Err(HistoryError::MissingSessionId);
        }
        let table = TableRef::new(&self.schema_name, &self.table_name, self.columns)?;

        Ok((
            ChatMessageHistory::from_parts(engine, table, self.session_id, self.overwrite),
            self.mode,
        ))
    }

    /// Validate or create the table, then return the history.
    pub async fn build(self) -> Result<ChatMessageHistory, HistoryError> {
        let (history, mode) = self.prepare()?;
        match mode {
            TableMode::Validate => history.table().validate(history.engine()).await?,
            TableMode::CreateIfMissing => history.table().initialize(history.engine()).await?,
        }
        Ok(history)
    }
}
