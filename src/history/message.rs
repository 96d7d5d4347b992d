//! Typed chat messages and their role tags.

use bytes::BytesMut;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

/// Who produced a message. Stored as the `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Ai,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Ai => "ai",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Role {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        self.as_str().to_sql(ty, out)
    }

    fn accepts(ty: &Type) -> bool {
        <&str as ToSql>::accepts(ty)
    }

    to_sql_checked!();
}

impl std::str::FromStr for Role {
    type Err = String;

    /// Exact match on the stored tag; the column is case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human" => Ok(Self::Human),
            "ai" => Ok(Self::Ai),
            "system" => Ok(Self::System),
            _ => Err(format!(
                "unknown message type '{s}', expected 'human', 'ai', or 'system'"
            )),
        }
    }
}

/// A single chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::new(Role::Human, content)
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(Role::Ai, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// A message as stored, with its row id and insertion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredMessage {
    pub id: i64,
    #[serde(flatten)]
    pub message: ChatMessage,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Map a stored `(type, data)` pair to a message.
///
/// Unknown types yield `None`; callers drop those rows.
pub(crate) fn decode(message_type: &str, data: String) -> Option<ChatMessage> {
    match message_type.parse::<Role>() {
        Ok(role) => Some(ChatMessage::new(role, data)),
        Err(_) => {
            tracing::debug!(message_type, "Skipping row with unrecognized message type");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn role_tags_match_stored_values() {
        for role in [Role::Human, Role::Ai, Role::System] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!(Role::Ai.to_string(), "ai");
    }

    #[test]
    fn role_parse_is_exact() {
        assert!("Human".parse::<Role>().is_err());
        assert!("generic".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn decode_drops_unknown_types() {
        let rows = [
            ("human", "hi"),
            ("function", "call()"),
            ("ai", "hello"),
            ("tool", "{}"),
            ("system", "be brief"),
        ];
        let messages: Vec<ChatMessage> = rows
            .into_iter()
            .filter_map(|(t, d)| decode(t, d.to_string()))
            .collect();
        assert_eq!(
            messages,
            vec![
                ChatMessage::human("hi"),
                ChatMessage::ai("hello"),
                ChatMessage::system("be brief"),
            ]
        );
    }

    #[test]
    fn message_json_shape() {
        let json = serde_json::to_value(ChatMessage::ai("ok")).unwrap();
        assert_eq!(json, serde_json::json!({ "role": "ai", "content": "ok" }));

        let parsed: Vec<ChatMessage> =
            serde_json::from_str(r#"[{"role":"system","content":"x"}]"#).unwrap();
        assert_eq!(parsed, vec![ChatMessage::system("x")]);
    }

    #[test]
    fn stored_message_flattens_message() {
        let stored = StoredMessage {
            id: 4,
            message: ChatMessage::human("hey"),
            timestamp: None,
        };
        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "id": 4, "role": "human", "content": "hey", "timestamp": null })
        );
    }
}
