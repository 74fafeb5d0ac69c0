//! inbox-text
//!
//! Lexical ranking over an in-memory tantivy index. The corpus is rebuilt per
//! call; callers pass items plus a text projection and get every item back
//! with its BM25 score.
pub mod tantivy_utils;
pub mod bm25;

pub use bm25::{keywords_from_query, rank_bm25};
