//! Hybrid retrieval: rank fusion, reranking, and the searches built on them.
pub mod context;
pub mod fusion;
pub mod rerank;
pub mod search;

pub use fusion::{fuse, fuse_with_k, RRF_K};
pub use rerank::{build_reranker, rerank, LlmReranker, PassthroughReranker};
pub use search::{EmailHit, EmailSearch, SearchOutcome, SearchRequest};
