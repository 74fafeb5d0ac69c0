//! File-backed embedding cache and the cosine-similarity ranker built on it.
//!
//! The ranker consults the cache before calling the embedding collaborator
//! and writes through on misses, so repeated searches over the same corpus
//! only embed the query.
pub mod cache;
pub mod ranker;

pub use cache::EmbeddingCache;
pub use ranker::{cosine_similarity, EmbeddingRanker};
