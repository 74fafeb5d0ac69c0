//! Text projections for chat messages, memories and past chats.

use crate::types::{Chat, ChatMessage, ConversationTurn, Memory, MessagePart, Role};

/// Joins the text parts of a message with newlines; other parts are skipped.
pub fn message_parts_to_text(parts: &[MessagePart]) -> String {
    parts
        .iter()
        .filter_map(|p| match p {
            MessagePart::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn message_to_text(message: &ChatMessage) -> String {
    format!("{}: {}", message.role.as_str(), message_parts_to_text(&message.parts))
}

/// Builds a semantic query from a conversation. The most recent message is
/// repeated at the end so it weighs more than older turns.
pub fn message_history_to_query(messages: &[ChatMessage]) -> String {
    let Some(last) = messages.last() else {
        return String::new();
    };
    messages
        .iter()
        .chain(std::iter::once(last))
        .map(message_to_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turns handed to the reranker: user messages, plus assistant messages
/// that did not call a tool.
pub fn rerank_context(messages: &[ChatMessage]) -> Vec<ConversationTurn> {
    messages
        .iter()
        .filter(|m| match m.role {
            Role::User => true,
            Role::Assistant => !m.has_tool_call(),
            Role::System => false,
        })
        .map(|m| ConversationTurn { role: m.role, text: message_parts_to_text(&m.parts) })
        .collect()
}

pub fn memory_to_text(memory: &Memory) -> String {
    format!("{}: {}", memory.title, memory.content)
}

pub fn chat_to_text(chat: &Chat) -> String {
    let mut lines = vec![format!("Title: {}", chat.title)];
    if let Some(s) = &chat.summary {
        lines.push(format!("Summary: {}", s.summary));
        lines.push(format!("What Worked Well: {}", s.what_worked_well));
        lines.push(format!("What To Avoid: {}", s.what_to_avoid));
        lines.push(format!("Tags: {}", s.tags.join(", ")));
    }
    lines.push(chat.messages.iter().map(message_to_text).collect::<Vec<_>>().join("\n"));
    lines.join("\n")
}
