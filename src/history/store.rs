//! PostgreSQL-backed chat message history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Transaction;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

use crate::db::PostgresEngine;
use crate::error::{DatabaseError, HistoryError};
use crate::history::message::{self, ChatMessage, StoredMessage};
use crate::history::options::ChatMessageHistoryBuilder;
use crate::history::schema::TableRef;
use crate::history::{MessageHistory, refuse_without_overwrite};

/// Message log for one session in one PostgreSQL table.
///
/// Cheap to clone; clones share the engine's pool.
#[derive(Debug, Clone)]
pub struct ChatMessageHistory {
    engine: PostgresEngine,
    table: TableRef,
    session_id: String,
    overwrite: bool,
}

impl ChatMessageHistory {
    /// Start building a history.
    pub fn builder() -> ChatMessageHistoryBuilder {
        ChatMessageHistoryBuilder::new()
    }

    /// Build with defaults and validate that the table exists.
    pub async fn new(
        engine: PostgresEngine,
        table_name: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Result<Self, HistoryError> {
        Self::builder()
            .engine(engine)
            .table_name(table_name)
            .session_id(session_id)
            .build()
            .await
    }

    pub(crate) fn from_parts(
        engine: PostgresEngine,
        table: TableRef,
        session_id: String,
        overwrite: bool,
    ) -> Self {
        Self {
            engine,
            table,
            session_id,
            overwrite,
        }
    }

    pub(crate) fn engine(&self) -> &PostgresEngine {
        &self.engine
    }

    pub(crate) fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn table_name(&self) -> &str {
        self.table.table()
    }

    pub fn schema_name(&self) -> &str {
        self.table.schema()
    }

    pub fn overwrite_enabled(&self) -> bool {
        self.overwrite
    }

    /// All stored messages of the session with their ids and timestamps.
    ///
    /// Requires the timestamp column, which table validation does not.
    pub async fn records(&self) -> Result<Vec<StoredMessage>, HistoryError> {
        self.fetch(true).await
    }

    async fn fetch(&self, with_timestamp: bool) -> Result<Vec<StoredMessage>, HistoryError> {
        let conn = self.engine.conn().await.map_err(|e| self.get_error(e))?;
        let rows = conn
            .query(
                self.table.select_sql(with_timestamp).as_str(),
                &[&self.session_id],
            )
            .await
            .map_err(|e| self.get_error(e))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(record) =
                decode_row(row, with_timestamp).map_err(|e| self.get_error(e))?
            {
                records.push(record);
            }
        }

        tracing::debug!(
            session_id = %self.session_id,
            rows = rows.len(),
            messages = records.len(),
            "Loaded chat history"
        );
        Ok(records)
    }

    /// Queue one insert per message on `tx` and await them together, so
    /// the whole batch goes out in a single pipelined roundtrip.
    async fn insert_batch(
        &self,
        tx: &Transaction<'_>,
        messages: &[ChatMessage],
    ) -> Result<(), DatabaseError> {
        let stmt = tx.prepare_cached(self.table.insert_sql().as_str()).await?;
        let inserts = messages.iter().map(|m| {
            let params: [&(dyn ToSql + Sync); 3] = [&self.session_id, &m.content, &m.role];
            tx.execute_raw(&stmt, params)
        });
        futures::future::try_join_all(inserts).await?;
        Ok(())
    }

    fn add_error(&self, source: impl Into<DatabaseError>) -> HistoryError {
        HistoryError::Add {
            session_id: self.session_id.clone(),
            source: source.into(),
        }
    }

    fn get_error(&self, source: impl Into<DatabaseError>) -> HistoryError {
        HistoryError::Get {
            session_id: self.session_id.clone(),
            source: source.into(),
        }
    }

    fn clear_error(&self, source: impl Into<DatabaseError>) -> HistoryError {
        HistoryError::Clear {
            session_id: self.session_id.clone(),
            source: source.into(),
        }
    }
}

/// Decode one row; `Ok(None)` for rows whose type is not a known role.
fn decode_row(
    row: &Row,
    with_timestamp: bool,
) -> Result<Option<StoredMessage>, tokio_postgres::Error> {
    // SERIAL is int4; accept BIGSERIAL tables too.
    let id = match row.try_get::<_, i32>(0) {
        Ok(id) => i64::from(id),
        Err(_) => row.try_get::<_, i64>(0)?,
    };
    let data: String = row.try_get(1)?;
    let message_type: &str = row.try_get(2)?;
    let timestamp: Option<DateTime<Utc>> = if with_timestamp {
        row.try_get(3)?
    } else {
        None
    };

    Ok(message::decode(message_type, data).map(|message| StoredMessage {
        id,
        message,
        timestamp,
    }))
}

#[async_trait]
impl MessageHistory for ChatMessageHistory {
    async fn add_message(&self, message: &ChatMessage) -> Result<(), HistoryError> {
        let conn = self.engine.conn().await.map_err(|e| self.add_error(e))?;
        conn.execute(
            self.table.insert_sql().as_str(),
            &[&self.session_id, &message.content, &message.role],
        )
        .await
        .map_err(|e| self.add_error(e))?;

        tracing::debug!(
            session_id = %self.session_id,
            role = %message.role,
            "Added chat message"
        );
        Ok(())
    }

    async fn add_messages(&self, messages: &[ChatMessage]) -> Result<(), HistoryError> {
        if messages.is_empty() {
            return Ok(());
        }

        let mut conn = self.engine.conn().await.map_err(|e| self.add_error(e))?;
        let tx = conn.transaction().await.map_err(|e| self.add_error(e))?;
        self.insert_batch(&tx, messages)
            .await
            .map_err(|e| self.add_error(e))?;
        tx.commit().await.map_err(|e| self.add_error(e))?;

        tracing::debug!(
            session_id = %self.session_id,
            count = messages.len(),
            "Added chat messages"
        );
        Ok(())
    }

    async fn messages(&self) -> Result<Vec<ChatMessage>, HistoryError> {
        Ok(self
            .fetch(false)
            .await?
            .into_iter()
            .map(|record| record.message)
            .collect())
    }

    async fn clear(&self) -> Result<(), HistoryError> {
        if !self.overwrite {
            refuse_without_overwrite("clear", &self.session_id);
            return Ok(());
        }

        let conn = self.engine.conn().await.map_err(|e| self.clear_error(e))?;
        let deleted = conn
            .execute(self.table.delete_sql().as_str(), &[&self.session_id])
            .await
            .map_err(|e| self.clear_error(e))?;

        tracing::debug!(session_id = %self.session_id, deleted, "Cleared chat history");
        Ok(())
    }

    async fn set_messages(&self, messages: &[ChatMessage]) -> Result<(), HistoryError> {
        if !self.overwrite {
            refuse_without_overwrite("set_messages", &self.session_id);
            return Ok(());
        }

        let mut conn = self.engine.conn().await.map_err(|e| self.clear_error(e))?;
        let tx = conn.transaction().await.map_err(|e| self.clear_error(e))?;
        let deleted = tx
            .execute(self.table.delete_sql().as_str(), &[&self.session_id])
            .await
            .map_err(|e| self.clear_error(e))?;
        if !messages.is_empty() {
            self.insert_batch(&tx, messages)
                .await
                .map_err(|e| self.add_error(e))?;
        }
        tx.commit().await.map_err(|e| self.add_error(e))?;

        tracing::debug!(
            session_id = %self.session_id,
            deleted,
            inserted = messages.len(),
            "Replaced chat history"
        );
        Ok(())
    }
}
