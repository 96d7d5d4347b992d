use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chatvault::{
    ChatMessage, ChatMessageHistory, ChatMessageHistoryBuilder, DatabaseConfig, HistoryConfig,
    HistoryOverrides, MessageHistory, PostgresEngine, Role,
};

#[derive(Parser)]
#[command(
    name = "chatvault",
    version,
    about = "Inspect and edit chat histories stored in PostgreSQL"
)]
struct Cli {
    #[command(flatten)]
    target: TargetArgs,

    #[command(subcommand)]
    command: Command,
}

/// Table and session selection. Each flag falls back to its environment
/// variable.
#[derive(Args)]
struct TargetArgs {
    /// Chat history table [env: CHAT_HISTORY_TABLE]
    #[arg(long, global = true)]
    table: Option<String>,

    /// Schema holding the table [env: CHAT_HISTORY_SCHEMA, default: public]
    #[arg(long, global = true)]
    schema: Option<String>,

    /// Conversation session id [env: CHAT_SESSION_ID]
    #[arg(long, global = true)]
    session: Option<String>,

    /// Allow `clear` and `set` to modify stored messages [env: CHAT_HISTORY_OVERWRITE]
    #[arg(long, global = true)]
    overwrite: bool,

    /// Create the schema and table if they are missing [env: CHAT_HISTORY_CREATE_TABLE]
    #[arg(long, global = true)]
    create_table: bool,
}

impl TargetArgs {
    fn overrides(&self) -> HistoryOverrides {
        HistoryOverrides {
            table: self.table.clone(),
            schema: self.schema.clone(),
            session_id: self.session.clone(),
            overwrite: self.overwrite,
            create_table: self.create_table,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Connect and print the current database name.
    Ping,

    /// Create the schema and chat history table.
    Init,

    /// Append one message to the session.
    Add {
        /// Message role: human, ai, or system.
        #[arg(long, default_value = "human")]
        role: Role,

        content: String,
    },

    /// Print the session's messages, oldest first.
    Show {
        /// Emit JSON records including row ids and timestamps.
        #[arg(long)]
        json: bool,
    },

    /// Delete the session's messages (requires --overwrite).
    Clear,

    /// Replace the session's messages with a JSON array of
    /// `{"role": ..., "content": ...}` objects (requires --overwrite).
    Set {
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chatvault=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let db_config = DatabaseConfig::resolve()?;
    let engine = PostgresEngine::connect(&db_config)
        .await
        .with_context(|| format!("connecting to {}", db_config.describe()))?;

    let result = run(cli, &engine).await;
    engine.close();
    result
}

async fn run(cli: Cli, engine: &PostgresEngine) -> anyhow::Result<()> {
    let target = cli.target;
    match cli.command {
        Command::Ping => {
            let database = engine.ping().await?;
            println!("connected to database '{database}'");
        }
        Command::Init => {
            let (schema, table) = HistoryConfig::resolve_table(&target.overrides())?;
            engine.init_chat_history_table(&schema, &table).await?;
            println!("table \"{schema}\".\"{table}\" is ready");
        }
        Command::Add { role, content } => {
            let history = open_history(engine, &target).await?;
            history.add_message(&ChatMessage::new(role, content)).await?;
        }
        Command::Show { json } => {
            let history = open_history(engine, &target).await?;
            if json {
                let records = history.records().await?;
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for message in history.messages().await? {
                    println!("[{}] {}", message.role, message.content);
                }
            }
        }
        Command::Clear => {
            let history = open_history(engine, &target).await?;
            warn_if_gated(&history);
            history.clear().await?;
        }
        Command::Set { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let messages: Vec<ChatMessage> = serde_json::from_str(&raw)
                .with_context(|| format!("parsing messages from {}", file.display()))?;
            let history = open_history(engine, &target).await?;
            warn_if_gated(&history);
            history.set_messages(&messages).await?;
        }
    }
    Ok(())
}

async fn open_history(
    engine: &PostgresEngine,
    target: &TargetArgs,
) -> anyhow::Result<ChatMessageHistory> {
    let config = HistoryConfig::resolve_with(&target.overrides())?;
    let history = ChatMessageHistoryBuilder::from_config(engine.clone(), &config)
        .build()
        .await?;
    Ok(history)
}

fn warn_if_gated(history: &ChatMessageHistory) {
    if !history.overwrite_enabled() {
        eprintln!("overwrite is not enabled; nothing was changed (pass --overwrite)");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use clap::CommandFactory;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_history_env() {
        for key in [
            "CHAT_HISTORY_TABLE",
            "CHAT_HISTORY_SCHEMA",
            "CHAT_SESSION_ID",
            "CHAT_HISTORY_OVERWRITE",
            "CHAT_HISTORY_CREATE_TABLE",
        ] {
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_add_with_role() {
        let cli = Cli::try_parse_from([
            "chatvault",
            "--table",
            "message_store",
            "--session",
            "s1",
            "add",
            "--role",
            "ai",
            "hello",
        ])
        .unwrap();
        match cli.command {
            Command::Add { role, content } => {
                assert_eq!(role, Role::Ai);
                assert_eq!(content, "hello");
            }
            _ => panic!("expected add"),
        }
        assert_eq!(cli.target.table.as_deref(), Some("message_store"));
    }

    #[test]
    fn rejects_unknown_role() {
        assert!(Cli::try_parse_from(["chatvault", "add", "--role", "tool", "x"]).is_err());
    }

    #[test]
    fn overwrite_env_accepts_boolean_spellings() {
        let _lock = ENV_LOCK.lock();
        clear_history_env();
        for raw in ["1", "yes", "on", "true"] {
            unsafe { std::env::set_var("CHAT_HISTORY_OVERWRITE", raw) };
            let cli = Cli::try_parse_from(["chatvault", "--table", "cli_t", "--session", "s", "clear"])
                .unwrap();
            let config = HistoryConfig::resolve_with(&cli.target.overrides()).unwrap();
            assert!(config.overwrite, "CHAT_HISTORY_OVERWRITE={raw} should enable overwrite");
        }

        unsafe { std::env::set_var("CHAT_HISTORY_OVERWRITE", "0") };
        let cli = Cli::try_parse_from(["chatvault", "--table", "cli_t", "--session", "s", "clear"])
            .unwrap();
        assert!(!HistoryConfig::resolve_with(&cli.target.overrides()).unwrap().overwrite);

        let cli = Cli::try_parse_from([
            "chatvault", "--table", "cli_t", "--session", "s", "--overwrite", "clear",
        ])
        .unwrap();
        assert!(HistoryConfig::resolve_with(&cli.target.overrides()).unwrap().overwrite);
        clear_history_env();
    }

    #[test]
    fn flags_take_precedence_over_env() {
        let _lock = ENV_LOCK.lock();
        clear_history_env();
        unsafe {
            std::env::set_var("CHAT_HISTORY_TABLE", "env_t");
            std::env::set_var("CHAT_SESSION_ID", "env-session");
        }

        let cli = Cli::try_parse_from(["chatvault", "--table", "cli_t", "show"]).unwrap();
        let config = HistoryConfig::resolve_with(&cli.target.overrides()).unwrap();
        assert_eq!(config.table, "cli_t");
        assert_eq!(config.session_id, "env-session");
        assert_eq!(config.schema, "public");

        let cli = Cli::try_parse_from(["chatvault", "init"]).unwrap();
        let target = HistoryConfig::resolve_table(&cli.target.overrides()).unwrap();
        assert_eq!(target, ("public".to_string(), "env_t".to_string()));
        clear_history_env();
    }
}
