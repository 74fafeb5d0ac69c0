//! Semantic lookups over conversation state: saved memories, older messages
//! of the current chat, and other chats.

use inbox_core::conversation::{chat_to_text, memory_to_text, message_history_to_query, message_to_text};
use inbox_core::error::Result;
use inbox_core::types::{Chat, ChatMessage, Memory, Ranking};
use inbox_vector::EmbeddingRanker;

pub const RELATED_CHATS_LIMIT: usize = 3;
/// Only this many trailing messages shape the related-chats query.
pub const RELATED_CHATS_HISTORY: usize = 12;

pub async fn search_memories(ranker: &EmbeddingRanker, messages: &[ChatMessage], memories: &[Memory]) -> Result<Ranking<Memory>> {
    let query = message_history_to_query(messages);
    ranker.rank(&query, memories, memory_to_text).await
}

/// Ranks `older` messages against the recent ones. Nothing older, nothing to rank.
pub async fn search_messages(ranker: &EmbeddingRanker, recent: &[ChatMessage], older: &[ChatMessage]) -> Result<Ranking<ChatMessage>> {
    if older.is_empty() {
        return Ok(Vec::new());
    }
    let query = message_history_to_query(recent);
    ranker.rank(&query, older, message_to_text).await
}

pub async fn search_related_chats(
    ranker: &EmbeddingRanker,
    current_chat_id: &str,
    chats: &[Chat],
    messages: &[ChatMessage],
) -> Result<Ranking<Chat>> {
    let others: Vec<Chat> = chats.iter().filter(|c| c.id != current_chat_id).cloned().collect();
    let recent = &messages[messages.len().saturating_sub(RELATED_CHATS_HISTORY)..];
    let query = message_history_to_query(recent);
    let mut ranking = ranker.rank(&query, &others, chat_to_text).await?;
    ranking.truncate(RELATED_CHATS_LIMIT);
    Ok(ranking)
}
