//! Reranking stage: glue around the [`Reranker`] collaborator plus the two
//! built-in rerankers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use inbox_core::config::{RerankProviderKind, RerankSettings};
use inbox_core::error::{Error, Result};
use inbox_core::traits::{RerankCandidate, RerankedItem, Reranker};
use inbox_core::types::{ConversationTurn, Ranking, Scored};
use inbox_embed::http::{api_key_from_env, block_on, post_json, trim_base_url};

/// Hands `candidates` to `reranker` and maps its answer back to items.
///
/// The answer must reference each candidate at most once and never by an
/// out-of-range index; anything else, like a collaborator failure, is an
/// [`Error::Rerank`].
pub async fn rerank<T, F>(
    reranker: Arc<dyn Reranker>,
    query: &str,
    candidates: Ranking<T>,
    to_text: F,
    context: &[ConversationTurn],
) -> Result<Ranking<T>>
where
    T: Clone,
    F: Fn(&T) -> String,
{
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    let inputs: Vec<RerankCandidate> = candidates
        .iter()
        .enumerate()
        .map(|(index, c)| RerankCandidate { index, text: to_text(&c.item), score: c.score })
        .collect();
    let n = inputs.len();
    let query = query.to_string();
    let context = context.to_vec();

    let results = tokio::task::spawn_blocking(move || reranker.rerank(&query, &inputs, &context))
        .await
        .map_err(|e| Error::Rerank(format!("rerank task failed: {e}")))?
        .map_err(Error::rerank)?;

    if results.len() > n {
        return Err(Error::Rerank(format!("reranker returned {} results for {n} candidates", results.len())));
    }
    let mut seen = vec![false; n];
    let mut out = Vec::with_capacity(results.len());
    for r in results {
        if r.index >= n {
            return Err(Error::Rerank(format!("reranker returned index {} (of {n})", r.index)));
        }
        if std::mem::replace(&mut seen[r.index], true) {
            return Err(Error::Rerank(format!("reranker returned index {} twice", r.index)));
        }
        out.push(Scored { item: candidates[r.index].item.clone(), score: r.score });
    }
    debug!(candidates = n, kept = out.len(), "reranked");
    Ok(out)
}

/// Keeps the fused order and scores.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughReranker;

impl Reranker for PassthroughReranker {
    fn rerank(
        &self,
        _query: &str,
        candidates: &[RerankCandidate],
        _context: &[ConversationTurn],
    ) -> anyhow::Result<Vec<RerankedItem>> {
        Ok(candidates.iter().map(|c| RerankedItem { index: c.index, score: c.score }).collect())
    }
}

const RERANK_INSTRUCTIONS: &str = "You rank email excerpts by how useful they are for answering the user's \
search. Use the conversation to understand what the user is looking for. Score each excerpt from 0 to 1. \
Leave out excerpts that are irrelevant. Reply with JSON only: {\"results\":[{\"index\":<number>,\"score\":<number>}]}, \
most relevant first.";

/// Candidate text beyond this many chars is cut from the prompt.
const MAX_CANDIDATE_CHARS: usize = 1200;

/// LLM reranker over an OpenAI-compatible `/chat/completions` endpoint.
pub struct LlmReranker {
    base_url: String,
    model: String,
    api_key: String,
    min_score: f64,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatTurn>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatTurn {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct RerankReply {
    results: Vec<RerankReplyItem>,
}

#[derive(Deserialize)]
struct RerankReplyItem {
    index: usize,
    score: f64,
}

impl LlmReranker {
    pub fn new(base_url: &str, model: &str, api_key: String, min_score: f64) -> Self {
        Self {
            base_url: trim_base_url(base_url),
            model: model.to_string(),
            api_key,
            min_score,
            http: reqwest::Client::new(),
        }
    }

    pub fn from_settings(settings: &RerankSettings) -> anyhow::Result<Self> {
        Ok(Self::new(&settings.api_base, &settings.model, api_key_from_env()?, settings.min_score))
    }

    fn prompt(query: &str, candidates: &[RerankCandidate], context: &[ConversationTurn]) -> String {
        let mut out = String::new();
        if !context.is_empty() {
            out.push_str("Conversation:\n");
            for turn in context {
                out.push_str(&format!("{}: {}\n", turn.role.as_str(), turn.text));
            }
            out.push('\n');
        }
        out.push_str(&format!("Search: {query}\n\nExcerpts:\n"));
        for c in candidates {
            let text: String = c.text.chars().take(MAX_CANDIDATE_CHARS).collect();
            out.push_str(&format!("[{}] {}\n\n", c.index, text));
        }
        out
    }

    /// Drops unknown or repeated indices and scores under `min_score`, then
    /// orders by score.
    fn select(&self, reply: RerankReply, candidates: &[RerankCandidate]) -> Vec<RerankedItem> {
        let mut seen = vec![false; candidates.len()];
        let mut items: Vec<RerankedItem> = Vec::new();
        for r in reply.results {
            if r.index >= candidates.len() || seen[r.index] {
                warn!(index = r.index, "ignoring invalid rerank index");
                continue;
            }
            seen[r.index] = true;
            if r.score.is_finite() && r.score >= self.min_score {
                items.push(RerankedItem { index: r.index, score: r.score });
            }
        }
        items.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        items
    }
}

impl Reranker for LlmReranker {
    fn rerank(
        &self,
        query: &str,
        candidates: &[RerankCandidate],
        context: &[ConversationTurn],
    ) -> anyhow::Result<Vec<RerankedItem>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatTurn { role: "system", content: RERANK_INSTRUCTIONS.to_string() },
                ChatTurn { role: "user", content: Self::prompt(query, candidates, context) },
            ],
            response_format: ResponseFormat { kind: "json_object" },
            temperature: 0.0,
        };
        let url = format!("{}/chat/completions", self.base_url);
        let response: ChatResponse = block_on(post_json(&self.http, &url, &self.api_key, &request))??;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("reranker reply had no content"))?;
        let reply: RerankReply = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("reranker reply is not valid JSON: {e}"))?;
        let items = self.select(reply, candidates);
        debug!(model = %self.model, candidates = candidates.len(), kept = items.len(), "llm rerank");
        Ok(items)
    }
}

pub fn build_reranker(settings: &RerankSettings) -> anyhow::Result<Arc<dyn Reranker>> {
    let reranker: Arc<dyn Reranker> = match settings.provider {
        RerankProviderKind::Llm => Arc::new(LlmReranker::from_settings(settings)?),
        RerankProviderKind::Passthrough => Arc::new(PassthroughReranker),
    };
    info!(provider = ?settings.provider, "reranker ready");
    Ok(reranker)
}
