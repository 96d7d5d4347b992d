//! Table validation, creation, and the SQL issued against the table.
//!
//! Identifiers are always double-quoted, so names are matched exactly as
//! given (no case folding).

use crate::db::PostgresEngine;
use crate::error::{DatabaseError, HistoryError};

/// PostgreSQL truncates identifiers longer than this (NAMEDATALEN - 1).
const MAX_IDENTIFIER_LEN: usize = 63;

/// Column names of a chat history table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryColumns {
    pub id: String,
    pub session_id: String,
    pub data: String,
    pub message_type: String,
    pub timestamp: String,
}

impl Default for HistoryColumns {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            session_id: "session_id".to_string(),
            data: "data".to_string(),
            message_type: "type".to_string(),
            timestamp: "timestamp".to_string(),
        }
    }
}

impl HistoryColumns {
    /// Columns that must exist for the table to be usable.
    pub fn required(&self) -> [&str; 4] {
        [
            self.id.as_str(),
            self.session_id.as_str(),
            self.data.as_str(),
            self.message_type.as_str(),
        ]
    }
}

/// Quote an identifier for interpolation into SQL.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn check_ident(kind: &'static str, name: &str) -> Result<(), HistoryError> {
    let reason = if name.is_empty() {
        "must not be empty"
    } else if name.contains('\0') {
        "must not contain NUL"
    } else if name.len() > MAX_IDENTIFIER_LEN {
        "exceeds 63 bytes"
    } else {
        return Ok(());
    };
    Err(HistoryError::InvalidIdentifier {
        kind,
        name: name.to_string(),
        reason,
    })
}

/// A fully qualified chat history table with its column layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TableRef {
    schema: String,
    table: String,
    columns: HistoryColumns,
    qualified: String,
}

impl TableRef {
    pub(crate) fn new(
        schema: &str,
        table: &str,
        columns: HistoryColumns,
    ) -> Result<Self, HistoryError> {
        check_ident("schema", schema)?;
        check_ident("table", table)?;
        for column in [
            &columns.id,
            &columns.session_id,
            &columns.data,
            &columns.message_type,
            &columns.timestamp,
        ] {
            check_ident("column", column)?;
        }

        Ok(Self {
            qualified: format!("{}.{}", quote_ident(schema), quote_ident(table)),
            schema: schema.to_string(),
            table: table.to_string(),
            columns,
        })
    }

    pub(crate) fn schema(&self) -> &str {
        &self.schema
    }

    pub(crate) fn table(&self) -> &str {
        &self.table
    }

    pub(crate) fn create_schema_sql(&self) -> String {
        format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(&self.schema))
    }

    pub(crate) fn create_table_sql(&self) -> String {
        let c = &self.columns;
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             {} SERIAL PRIMARY KEY, \
             {} TEXT NOT NULL, \
             {} TEXT NOT NULL, \
             {} TEXT NOT NULL, \
             {} TIMESTAMPTZ DEFAULT now())",
            self.qualified,
            quote_ident(&c.id),
            quote_ident(&c.session_id),
            quote_ident(&c.data),
            quote_ident(&c.message_type),
            quote_ident(&c.timestamp),
        )
    }

    pub(crate) fn insert_sql(&self) -> String {
        let c = &self.columns;
        format!(
            "INSERT INTO {} ({}, {}, {}) VALUES ($1, $2, $3)",
            self.qualified,
            quote_ident(&c.session_id),
            quote_ident(&c.data),
            quote_ident(&c.message_type),
        )
    }

    /// Select `id, data, type` (and `timestamp` when asked) for one session.
    ///
    /// The timestamp is read as `timestamptz` so `TIMESTAMP` columns decode
    /// too.
    pub(crate) fn select_sql(&self, with_timestamp: bool) -> String {
        let c = &self.columns;
        let mut projection = format!(
            "{}, {}, {}",
            quote_ident(&c.id),
            quote_ident(&c.data),
            quote_ident(&c.message_type)
        );
        if with_timestamp {
            projection.push_str(", ");
            projection.push_str(&quote_ident(&c.timestamp));
            projection.push_str("::timestamptz");
        }
        format!(
            "SELECT {projection} FROM {} WHERE {} = $1 ORDER BY {}",
            self.qualified,
            quote_ident(&c.session_id),
            quote_ident(&c.id),
        )
    }

    pub(crate) fn delete_sql(&self) -> String {
        format!(
            "DELETE FROM {} WHERE {} = $1",
            self.qualified,
            quote_ident(&self.columns.session_id)
        )
    }

    /// Confirm the table exists and carries every required column.
    pub(crate) async fn validate(&self, engine: &PostgresEngine) -> Result<(), HistoryError> {
        let wrap = |source: DatabaseError| HistoryError::Validate {
            table: self.table.clone(),
            source,
        };

        let conn = engine.conn().await.map_err(wrap)?;
        let exists: bool = conn
            .query_one(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM information_schema.tables
                    WHERE table_schema = $1::text AND table_name = $2::text
                )
                "#,
                &[&self.schema, &self.table],
            )
            .await
            .map_err(|e| wrap(e.into()))?
            .get(0);
        if !exists {
            return Err(HistoryError::TableNotFound {
                schema: self.schema.clone(),
                table: self.table.clone(),
            });
        }

        let rows = conn
            .query(
                r#"
                SELECT column_name::text FROM information_schema.columns
                WHERE table_schema = $1::text AND table_name = $2::text
                "#,
                &[&self.schema, &self.table],
            )
            .await
            .map_err(|e| wrap(e.into()))?;
        let present: Vec<String> = rows.iter().map(|r| r.get(0)).collect();

        self.check_columns(&present)
    }

    /// Report the first required column missing from `present`.
    pub(crate) fn check_columns(&self, present: &[String]) -> Result<(), HistoryError> {
        let required = self.columns.required();
        match required
            .iter()
            .find(|col| !present.iter().any(|p| p == *col))
        {
            Some(missing) => Err(HistoryError::MissingColumn {
                column: missing.to_string(),
                table: self.table.clone(),
                expected: required.iter().map(|c| c.to_string()).collect(),
            }),
            None => Ok(()),
        }
    }

    /// Create the schema and table if they do not exist.
    pub(crate) async fn initialize(&self, engine: &PostgresEngine) -> Result<(), HistoryError> {
        let wrap = |source: DatabaseError| HistoryError::Initialize {
            table: self.table.clone(),
            source,
        };

        let conn = engine.conn().await.map_err(wrap)?;
        conn.execute(self.create_schema_sql().as_str(), &[])
            .await
            .map_err(|e| wrap(e.into()))?;
        conn.execute(self.create_table_sql().as_str(), &[])
            .await
            .map_err(|e| wrap(e.into()))?;

        tracing::info!(
            schema = %self.schema,
            table = %self.table,
            "Chat history table ready"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn default_table() -> TableRef {
        TableRef::new("cmh", "message_store", HistoryColumns::default()).unwrap()
    }

    #[test]
    fn quote_ident_doubles_embedded_quotes() {
        assert_eq!(quote_ident("plain"), r#""plain""#);
        assert_eq!(quote_ident(r#"we"ird"#), r#""we""ird""#);
        assert_eq!(quote_ident("MixedCase"), r#""MixedCase""#);
    }

    #[test]
    fn rejects_bad_identifiers() {
        assert!(matches!(
            TableRef::new("", "t", HistoryColumns::default()),
            Err(HistoryError::InvalidIdentifier { kind: "schema", .. })
        ));
        assert!(matches!(
            TableRef::new("public", "a\0b", HistoryColumns::default()),
            Err(HistoryError::InvalidIdentifier { kind: "table", .. })
        ));
        let long = "x".repeat(64);
        assert!(TableRef::new("public", &long, HistoryColumns::default()).is_err());
        let columns = HistoryColumns {
            data: String::new(),
            ..HistoryColumns::default()
        };
        assert!(matches!(
            TableRef::new("public", "t", columns),
            Err(HistoryError::InvalidIdentifier { kind: "column", .. })
        ));
    }

    #[test]
    fn renders_ddl() {
        let table = default_table();
        assert_eq!(table.create_schema_sql(), r#"CREATE SCHEMA IF NOT EXISTS "cmh""#);
        assert_eq!(
            table.create_table_sql(),
            r#"CREATE TABLE IF NOT EXISTS "cmh"."message_store" ("id" SERIAL PRIMARY KEY, "session_id" TEXT NOT NULL, "data" TEXT NOT NULL, "type" TEXT NOT NULL, "timestamp" TIMESTAMPTZ DEFAULT now())"#
        );
    }

    #[test]
    fn renders_dml() {
        let table = default_table();
        assert_eq!(
            table.insert_sql(),
            r#"INSERT INTO "cmh"."message_store" ("session_id", "data", "type") VALUES ($1, $2, $3)"#
        );
        assert_eq!(
            table.select_sql(false),
            r#"SELECT "id", "data", "type" FROM "cmh"."message_store" WHERE "session_id" = $1 ORDER BY "id""#
        );
        assert_eq!(
            table.select_sql(true),
            r#"SELECT "id", "data", "type", "timestamp"::timestamptz FROM "cmh"."message_store" WHERE "session_id" = $1 ORDER BY "id""#
        );
        assert_eq!(
            table.delete_sql(),
            r#"DELETE FROM "cmh"."message_store" WHERE "session_id" = $1"#
        );
    }

    #[test]
    fn renders_overridden_columns() {
        let columns = HistoryColumns {
            id: "seq".to_string(),
            session_id: "conversation".to_string(),
            data: "content".to_string(),
            message_type: "role".to_string(),
            timestamp: "created_at".to_string(),
        };
        let table = TableRef::new("public", "turns", columns).unwrap();
        assert_eq!(
            table.select_sql(false),
            r#"SELECT "seq", "content", "role" FROM "public"."turns" WHERE "conversation" = $1 ORDER BY "seq""#
        );
        assert_eq!(
            table.select_sql(true),
            r#"SELECT "seq", "content", "role", "created_at"::timestamptz FROM "public"."turns" WHERE "conversation" = $1 ORDER BY "seq""#
        );
    }

    #[test]
    fn check_columns_names_first_missing_column() {
        let table = default_table();
        let present = vec!["id".to_string(), "session_id".to_string(), "data".to_string()];
        match table.check_columns(&present) {
            Err(HistoryError::MissingColumn {
                column,
                table,
                expected,
            }) => {
                assert_eq!(column, "type");
                assert_eq!(table, "message_store");
                assert_eq!(expected, vec!["id", "session_id", "data", "type"]);
            }
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn check_columns_ignores_extra_and_optional_columns() {
        let table = default_table();
        let present: Vec<String> = ["type", "data", "extra", "session_id", "id"]
            .into_iter()
            .map(String::from)
            .collect();
        assert!(table.check_columns(&present).is_ok());
    }

    #[test]
    fn missing_column_error_message() {
        let table = default_table();
        let err = table.check_columns(&[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"column 'id' is missing in table 'message_store'. Expected columns: ["id", "session_id", "data", "type"]"#
        );
    }
}
