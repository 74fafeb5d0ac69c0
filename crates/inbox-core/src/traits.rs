use crate::types::ConversationTurn;

/// Embedding-model collaborator.
///
/// `model_key` names the model for cache addressing; two embedders with the
/// same key must produce the same vector for the same text.
pub trait Embedder: Send + Sync {
    fn model_key(&self) -> &str;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// One candidate handed to a reranker. `index` is the position in the
/// candidate list and is how results refer back to it.
#[derive(Debug, Clone, PartialEq)]
pub struct RerankCandidate {
    pub index: usize,
    pub text: String,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerankedItem {
    pub index: usize,
    pub score: f64,
}

/// Reranking collaborator. Returns a subset of `candidates` in final
/// relevance order.
pub trait Reranker: Send + Sync {
    fn rerank(
        &self,
        query: &str,
        candidates: &[RerankCandidate],
        context: &[ConversationTurn],
    ) -> anyhow::Result<Vec<RerankedItem>>;
}
