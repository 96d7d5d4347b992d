//! Chat message history stored in AlloyDB / Cloud SQL flavored PostgreSQL.
//!
//! ```no_run
//! use chatvault::{ChatMessageHistory, DatabaseConfig, MessageHistory, PostgresEngine};
//!
//! # async fn demo() -> Result<(), chatvault::Error> {
//! let engine = PostgresEngine::connect(&DatabaseConfig::from_url("postgres://localhost/chat")).await?;
//! let history = ChatMessageHistory::builder()
//!     .engine(engine)
//!     .schema_name("cmh")
//!     .table_name("message_store")
//!     .session_id("session-1")
//!     .create_table_if_missing()
//!     .build()
//!     .await?;
//!
//! history.add_user_message("hello").await?;
//! history.add_ai_message("hi there").await?;
//! for message in history.messages().await? {
//!     println!("{}: {}", message.role, message.content);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod history;

pub use config::{DatabaseConfig, HistoryConfig, HistoryOverrides, InstanceAddress, SslMode};
pub use db::PostgresEngine;
pub use error::{ConfigError, DatabaseError, Error, HistoryError, Result};
pub use history::{
    ChatMessage, ChatMessageHistory, ChatMessageHistoryBuilder, HistoryColumns, InMemoryHistory,
    MessageHistory, Role, StoredMessage, TableMode,
};
