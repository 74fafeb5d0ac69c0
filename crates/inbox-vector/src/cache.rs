//! Content-addressed, file-backed embedding cache.
//!
//! One JSON file per `(model_key, text)`: `<dir>/<model_key>-<hash10>.json`
//! holding the vector as a plain array. Entries are only ever created or
//! read. A missing, unreadable or corrupt entry is a miss.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use inbox_core::error::{Error, Result};

const HASH_HEX_CHARS: usize = 10;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

pub struct EmbeddingCache {
    dir: PathBuf,
    model_key: String,
    ready: OnceCell<()>,
}

impl EmbeddingCache {
    pub fn new(dir: impl Into<PathBuf>, model_key: impl Into<String>) -> Self {
        Self { dir: dir.into(), model_key: model_key.into(), ready: OnceCell::new() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_key(&self) -> &str {
        &self.model_key
    }

    /// First 10 hex chars of the SHA-256 of `text`.
    pub fn content_hash(text: &str) -> String {
        let digest = format!("{:x}", Sha256::digest(text.as_bytes()));
        digest[..HASH_HEX_CHARS].to_string()
    }

    pub fn cache_key(&self, text: &str) -> String {
        format!("{}-{}", self.model_key.replace(['/', '\\'], "_"), Self::content_hash(text))
    }

    pub fn entry_path(&self, text: &str) -> PathBuf {
        self.dir.join(format!("{}.json", self.cache_key(text)))
    }

    /// Creates the cache directory once; concurrent callers share the result.
    pub async fn ensure_storage_ready(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| async {
                tokio::fs::create_dir_all(&self.dir).await?;
                debug!(dir = %self.dir.display(), "embedding cache ready");
                Ok::<(), Error>(())
            })
            .await?;
        Ok(())
    }

    pub async fn get(&self, text: &str) -> Option<Vec<f32>> {
        let path = self.entry_path(text);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(key = %self.cache_key(text), "cache miss");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable cache entry, treating as miss");
                return None;
            }
        };
        match serde_json::from_slice::<Vec<f32>>(&bytes) {
            Ok(v) if !v.is_empty() => {
                debug!(key = %self.cache_key(text), "cache hit");
                Some(v)
            }
            Ok(_) => {
                warn!(path = %path.display(), "empty cache entry, treating as miss");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt cache entry, treating as miss");
                None
            }
        }
    }

    /// Writes the entry through a temp file and a rename; the last writer wins.
    pub async fn put(&self, text: &str, vector: &[f32]) -> Result<()> {
        self.ensure_storage_ready().await?;
        let path = self.entry_path(text);
        let tmp = self.dir.join(format!(
            ".{}.{}.{}.tmp",
            self.cache_key(text),
            std::process::id(),
            TMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let body = serde_json::to_vec(vector)?;
        tokio::fs::write(&tmp, body).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_sha256_prefix() {
        // sha256("hello") = 2cf24dba5fb0a30e26e83b2ac5b9e29e...
        assert_eq!(EmbeddingCache::content_hash("hello"), "2cf24dba5f");
    }

    #[test]
    fn entry_path_follows_layout() {
        let cache = EmbeddingCache::new("/tmp/emb", "text-embedding-ada-002");
        assert_eq!(
            cache.entry_path("hello"),
            PathBuf::from("/tmp/emb/text-embedding-ada-002-2cf24dba5f.json")
        );
    }
}
