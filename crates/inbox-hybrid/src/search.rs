//! Email search: chunk, rank lexically and semantically, fuse, rerank.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use inbox_core::chunker::TextSplitter;
use inbox_core::config::Settings;
use inbox_core::conversation::rerank_context;
use inbox_core::error::Result;
use inbox_core::traits::{Embedder, Reranker};
use inbox_core::types::{email_chunk_to_key, email_chunk_to_text, ChatMessage, Email, EmailChunk, Ranking, Recipients};
use inbox_text::{keywords_from_query, rank_bm25};
use inbox_vector::EmbeddingRanker;

use crate::fusion::{fuse_with_k, RRF_K};
use crate::rerank::rerank;

pub const NO_SEARCH_PARAMETERS: &str = "No search parameters provided";

/// What the caller wants searched. Keywords drive BM25; the query drives
/// embeddings. Either may be absent, not both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub search_query: Option<String>,
}

/// One result row: chunk metadata plus a short snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailHit {
    pub id: String,
    pub thread_id: String,
    pub subject: String,
    pub from: String,
    pub to: Recipients,
    pub timestamp: String,
    pub score: f64,
    pub snippet: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub emails: Vec<EmailHit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub struct EmailSearch {
    splitter: TextSplitter,
    ranker: EmbeddingRanker,
    reranker: Arc<dyn Reranker>,
    rrf_k: f64,
    rerank_top_n: usize,
    snippet_chars: usize,
}

impl EmailSearch {
    pub fn new(splitter: TextSplitter, ranker: EmbeddingRanker, reranker: Arc<dyn Reranker>) -> Self {
        Self { splitter, ranker, reranker, rrf_k: RRF_K, rerank_top_n: 30, snippet_chars: 150 }
    }

    pub fn from_settings(
        settings: &Settings,
        embedder: Arc<dyn Embedder>,
        reranker: Arc<dyn Reranker>,
    ) -> Result<Self> {
        let splitter = TextSplitter::from_settings(&settings.chunking)?;
        let ranker = EmbeddingRanker::from_settings(embedder, settings)?;
        Ok(Self {
            splitter,
            ranker,
            reranker,
            rrf_k: settings.search.rrf_k,
            rerank_top_n: settings.search.rerank_top_n,
            snippet_chars: settings.search.snippet_chars,
        })
    }

    pub fn splitter(&self) -> &TextSplitter {
        &self.splitter
    }

    pub fn ranker(&self) -> &EmbeddingRanker {
        &self.ranker
    }

    /// Runs the full pipeline over `emails`. `history` is the conversation so
    /// far; it only informs the reranker.
    pub async fn search(&self, emails: &[Email], request: &SearchRequest, history: &[ChatMessage]) -> Result<SearchOutcome> {
        let keywords: Vec<String> = request.keywords.clone().unwrap_or_default();
        let query = request.search_query.as_deref().filter(|q| !q.is_empty());
        if keywords.is_empty() && query.is_none() {
            info!("{NO_SEARCH_PARAMETERS}");
            return Ok(SearchOutcome { emails: Vec::new(), message: Some(NO_SEARCH_PARAMETERS.to_string()) });
        }
        info!(?keywords, query = query.unwrap_or(""), emails = emails.len(), "email search");

        let chunks = self.splitter.chunk_emails(emails);
        let mut bm25 = if keywords.is_empty() { Vec::new() } else { rank_bm25(&keywords, &chunks, email_chunk_to_text)? };
        let mut semantic = match query {
            Some(q) => self.ranker.rank(q, &chunks, email_chunk_to_text).await?,
            None => Vec::new(),
        };
        bm25.truncate(self.rerank_top_n);
        semantic.truncate(self.rerank_top_n);

        let mut fused = fuse_with_k(&[bm25, semantic], self.rrf_k, email_chunk_to_key);
        fused.truncate(self.rerank_top_n);

        let rerank_query = [keywords.join(" "), query.unwrap_or("").to_string()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let context = rerank_context(history);
        let reranked = rerank(Arc::clone(&self.reranker), &rerank_query, fused, email_chunk_to_text, &context).await?;

        let mut thread_of: HashMap<&str, &str> = HashMap::new();
        for e in emails {
            thread_of.entry(e.id.as_str()).or_insert(e.thread_id.as_str());
        }
        let hits: Vec<EmailHit> = reranked
            .into_iter()
            .map(|r| {
                let chunk = r.item;
                EmailHit {
                    thread_id: thread_of.get(chunk.id.as_str()).map(|t| t.to_string()).unwrap_or_default(),
                    snippet: snippet(&chunk.chunk, self.snippet_chars),
                    id: chunk.id,
                    subject: chunk.subject,
                    from: chunk.from,
                    to: chunk.to,
                    timestamp: chunk.timestamp,
                    score: r.score,
                }
            })
            .collect();
        info!(results = hits.len(), "email search done");
        Ok(SearchOutcome { emails: hits, message: None })
    }

    /// Keyword and semantic search on the same free-text query, fused without
    /// reranking or truncation.
    pub async fn search_with_rrf(&self, query: &str, emails: &[Email]) -> Result<Ranking<EmailChunk>> {
        let chunks = self.splitter.chunk_emails(emails);
        let bm25 = rank_bm25(&keywords_from_query(query), &chunks, email_chunk_to_text)?;
        let semantic = self.ranker.rank(query, &chunks, email_chunk_to_text).await?;
        Ok(fuse_with_k(&[bm25, semantic], self.rrf_k, email_chunk_to_key))
    }
}

/// First `max` chars, trimmed, with `...` when the chunk was longer.
pub fn snippet(chunk: &str, max: usize) -> String {
    let head: String = chunk.chars().take(max).collect();
    let mut out = head.trim().to_string();
    if chunk.chars().count() > max {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_marks_truncation() {
        assert_eq!(snippet("short", 150), "short");
        assert_eq!(snippet("abcdef", 3), "abc...");
        assert_eq!(snippet("ab   cdef", 4), "ab...");
    }

    #[test]
    fn request_uses_camel_case() {
        let r: SearchRequest = serde_json::from_str(r#"{"keywords":["lease"],"searchQuery":"rent"}"#).unwrap();
        assert_eq!(r.keywords, Some(vec!["lease".to_string()]));
        assert_eq!(r.search_query.as_deref(), Some("rent"));
    }
}
