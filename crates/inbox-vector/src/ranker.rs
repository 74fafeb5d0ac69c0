//! Embedding ranker: cosine similarity between a query and cached item vectors.

use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use inbox_core::config::{expand_path, Settings};
use inbox_core::error::{Error, Result};
use inbox_core::traits::Embedder;
use inbox_core::types::{sort_descending, Ranking, Scored};

use crate::cache::EmbeddingCache;

pub struct EmbeddingRanker {
    embedder: Arc<dyn Embedder>,
    cache: EmbeddingCache,
    batch_size: usize,
}

impl EmbeddingRanker {
    pub fn new(embedder: Arc<dyn Embedder>, cache: EmbeddingCache, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidConfig("embedding batch size must be >= 1".into()));
        }
        Ok(Self { embedder, cache, batch_size })
    }

    /// Cache under `cache.dir`, keyed by the embedder's model key.
    pub fn from_settings(embedder: Arc<dyn Embedder>, settings: &Settings) -> Result<Self> {
        let cache = EmbeddingCache::new(expand_path(&settings.cache.dir), embedder.model_key());
        Self::new(embedder, cache, settings.embedding.batch_size)
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Ranks `items` by cosine similarity to `query`, best first.
    ///
    /// A blank query yields an empty ranking and never reaches the embedder.
    pub async fn rank<T, F>(&self, query: &str, items: &[T], to_text: F) -> Result<Ranking<T>>
    where
        T: Clone,
        F: Fn(&T) -> String,
    {
        if query.trim().is_empty() {
            warn!("embedding search skipped: query must be a non-empty string");
            return Ok(Vec::new());
        }
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = items.iter().map(to_text).collect();
        let vectors = self.embed_items(&texts).await?;
        let query_vec = self.embed_query(query).await?;

        let mut ranking = Vec::with_capacity(items.len());
        for (item, vector) in items.iter().zip(&vectors) {
            let score = cosine_similarity(&query_vec, vector)?;
            ranking.push(Scored { item: item.clone(), score });
        }
        sort_descending(&mut ranking);
        Ok(ranking)
    }

    /// Vectors for `texts`, in input order. Cached texts are read back; the
    /// rest go to the embedder in batches and are written to the cache.
    pub async fn embed_items(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let (vectors, _) = self.embed_through_cache(texts).await?;
        Ok(vectors)
    }

    /// Like [`Self::embed_items`], also returning how many distinct texts
    /// went to the embedder.
    async fn embed_through_cache(&self, texts: &[String]) -> Result<(Vec<Vec<f32>>, usize)> {
        if let Err(e) = self.cache.ensure_storage_ready().await {
            warn!(error = %e, "embedding cache directory unavailable");
        }

        let mut slots: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        // Distinct uncached texts in first-seen order, each with every slot it fills.
        let mut misses: Vec<(String, Vec<usize>)> = Vec::new();
        let mut miss_pos: HashMap<&str, usize> = HashMap::new();
        for (i, text) in texts.iter().enumerate() {
            let cached = self.cache.get(text).await;
            if cached.is_none() {
                match miss_pos.get(text.as_str()) {
                    Some(&m) => misses[m].1.push(i),
                    None => {
                        miss_pos.insert(text.as_str(), misses.len());
                        misses.push((text.clone(), vec![i]));
                    }
                }
            }
            slots.push(cached);
        }

        if !misses.is_empty() {
            let batches = misses.len().div_ceil(self.batch_size);
            info!(uncached = misses.len(), batches, "generating embeddings");
            for (b, batch) in misses.chunks(self.batch_size).enumerate() {
                debug!(batch = b + 1, of = batches, size = batch.len(), "embedding batch");
                let inputs: Vec<String> = batch.iter().map(|(t, _)| t.clone()).collect();
                let vectors = self.embed_batch(inputs).await?;
                for ((text, positions), vector) in batch.iter().zip(vectors) {
                    if let Err(e) = self.cache.put(text, &vector).await {
                        warn!(key = %self.cache.cache_key(text), error = %e, "failed to write cache entry");
                    }
                    for &p in positions {
                        slots[p] = Some(vector.clone());
                    }
                }
            }
        }

        let vectors = slots
            .into_iter()
            .map(|s| s.ok_or_else(|| Error::Embedding("missing vector after embedding".into())))
            .collect::<Result<Vec<_>>>()?;
        Ok((vectors, misses.len()))
    }

    /// Embeds the query through the same model. Queries are not cached.
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(vec![query.to_string()]).await?;
        vectors.pop().ok_or_else(|| Error::Embedding("no vector returned for query".into()))
    }

    /// Embeds every text into the cache, with a progress bar.
    /// Returns how many distinct texts were newly embedded.
    pub async fn warm_cache(&self, texts: &[String]) -> Result<usize> {
        self.cache.ensure_storage_ready().await?;
        let pb = ProgressBar::new(texts.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} texts ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut embedded = 0usize;
        for window in texts.chunks(self.batch_size) {
            let (_, fresh) = self.embed_through_cache(window).await?;
            embedded += fresh;
            pb.inc(window.len() as u64);
            pb.set_message(format!("{embedded} embedded"));
        }
        pb.finish_with_message(format!("{embedded} embedded"));
        Ok(embedded)
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = texts.len();
        let embedder = Arc::clone(&self.embedder);
        let vectors = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
            .await
            .map_err(|e| Error::Embedding(format!("embedding task failed: {e}")))?
            .map_err(Error::embedding)?;
        if vectors.len() != expected {
            return Err(Error::Embedding(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                expected
            )));
        }
        Ok(vectors)
    }
}

/// Cosine similarity in `[-1, 1]`, computed in f64. A zero-norm side scores 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::Embedding(format!("dimension mismatch: {} vs {}", a.len(), b.len())));
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}
