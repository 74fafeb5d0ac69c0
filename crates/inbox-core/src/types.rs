//! Domain types shared by the chunker, the rankers and the search pipeline.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One or many addresses. The corpus stores `to` either as a bare string or
/// as a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    pub fn addresses(&self) -> Vec<&str> {
        match self {
            Recipients::One(a) => vec![a.as_str()],
            Recipients::Many(list) => list.iter().map(String::as_str).collect(),
        }
    }
}

impl Default for Recipients {
    fn default() -> Self {
        Recipients::Many(Vec::new())
    }
}

/// A stored email, as found in the flat JSON corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    pub id: String,
    pub thread_id: String,
    pub from: String,
    #[serde(default)]
    pub to: Recipients,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc: Option<Vec<String>>,
    pub subject: String,
    pub body: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_id: Option<i64>,
}

/// Identity of a chunk for ranking and fusion: parent email id plus position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    pub id: String,
    pub index: usize,
}

/// A bounded slice of an email body, the unit of retrieval.
///
/// - `id`: parent email id
/// - `index`/`total_chunks`: position within the parent email
/// - `chunk`: the text payload
/// - `subject`/`from`/`to`/`timestamp`: copied from the parent unchanged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailChunk {
    pub id: String,
    pub index: usize,
    pub total_chunks: usize,
    pub chunk: String,
    pub subject: String,
    pub from: String,
    pub to: Recipients,
    pub timestamp: String,
}

impl EmailChunk {
    pub fn key(&self) -> ChunkKey {
        ChunkKey { id: self.id.clone(), index: self.index }
    }
}

/// Text projection used by both rankers for email chunks.
pub fn email_chunk_to_text(chunk: &EmailChunk) -> String {
    format!("{} {}", chunk.subject, chunk.chunk)
}

/// Fusion identity for email chunks.
pub fn email_chunk_to_key(chunk: &EmailChunk) -> ChunkKey {
    chunk.key()
}

/// An item with the score a ranker assigned to it. Higher is always better;
/// the scale depends on the producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scored<T> {
    pub item: T,
    pub score: f64,
}

/// Ordered `{item, score}` sequence, best first.
pub type Ranking<T> = Vec<Scored<T>>;

/// Stable descending sort by score. Equal scores keep their relative order.
pub fn sort_descending<T>(ranking: &mut Ranking<T>) {
    ranking.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A message part. Tool parts arrive either as `tool-call` with a `toolName`
/// or as `tool-<name>`; both decode to [`MessagePart::ToolCall`]. Anything
/// else that is not text is kept as [`MessagePart::Data`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawMessagePart", into = "RawMessagePart")]
pub enum MessagePart {
    Text { text: String },
    ToolCall { tool_name: String },
    Data,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessagePart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

impl From<RawMessagePart> for MessagePart {
    fn from(raw: RawMessagePart) -> Self {
        match raw.kind.as_str() {
            "text" => MessagePart::Text { text: raw.text.unwrap_or_default() },
            "tool-call" | "dynamic-tool" => MessagePart::ToolCall { tool_name: raw.tool_name.unwrap_or_default() },
            kind => match kind.strip_prefix("tool-") {
                Some(name) => MessagePart::ToolCall { tool_name: raw.tool_name.unwrap_or_else(|| name.to_string()) },
                None => MessagePart::Data,
            },
        }
    }
}

impl From<MessagePart> for RawMessagePart {
    fn from(part: MessagePart) -> Self {
        match part {
            MessagePart::Text { text } => Self { kind: "text".into(), text: Some(text), tool_name: None },
            MessagePart::ToolCall { tool_name } => Self { kind: "tool-call".into(), text: None, tool_name: Some(tool_name) },
            MessagePart::Data => Self { kind: "data".into(), text: None, tool_name: None },
        }
    }
}

/// A chat message as handed over by the agent loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

impl ChatMessage {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self { id: String::new(), role, parts: vec![MessagePart::Text { text: text.into() }] }
    }

    pub fn has_tool_call(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, MessagePart::ToolCall { .. }))
    }
}

/// A prior conversation turn reduced to plain text, as given to the reranker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub summary: String,
    pub what_worked_well: String,
    pub what_to_avoid: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default, rename = "llmSummary", skip_serializing_if = "Option::is_none")]
    pub summary: Option<ChatSummary>,
}
