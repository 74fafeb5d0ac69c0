use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use inbox_core::error::Error;
use inbox_core::traits::Embedder;
use inbox_vector::{EmbeddingCache, EmbeddingRanker};

/// Letter-frequency vectors; records every batch it is asked for.
#[derive(Default)]
struct CountingEmbedder {
    calls: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
    fail: bool,
}

impl CountingEmbedder {
    fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn letters(text: &str) -> Vec<f32> {
    let mut v = vec![0f32; 26];
    for c in text.to_lowercase().chars().filter(|c| c.is_ascii_lowercase()) {
        v[(c as u8 - b'a') as usize] += 1.0;
    }
    v
}

impl Embedder for CountingEmbedder {
    fn model_key(&self) -> &str {
        "letters"
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batch_sizes.lock().unwrap().push(texts.len());
        if self.fail {
            anyhow::bail!("model offline");
        }
        Ok(texts.iter().map(|t| letters(t)).collect())
    }
}

fn ranker(dir: &std::path::Path, embedder: Arc<CountingEmbedder>, batch: usize) -> EmbeddingRanker {
    let cache = EmbeddingCache::new(dir, "letters");
    EmbeddingRanker::new(embedder, cache, batch).expect("ranker")
}

fn texts(ts: &[&str]) -> Vec<String> {
    ts.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn miss_then_hit_returns_identical_vector_with_one_call() {
    let tmp = tempfile::tempdir().unwrap();
    let embedder = Arc::new(CountingEmbedder::default());
    let r = ranker(tmp.path(), embedder.clone(), 99);

    let first = r.embed_items(&texts(&["quarterly budget"])).await.expect("miss");
    let second = r.embed_items(&texts(&["quarterly budget"])).await.expect("hit");

    assert_eq!(first, second);
    assert_eq!(embedder.calls(), 1, "second lookup is served from cache");
    assert!(r.cache().entry_path("quarterly budget").exists());
}

#[tokio::test]
async fn cache_survives_a_new_ranker() {
    let tmp = tempfile::tempdir().unwrap();
    let e1 = Arc::new(CountingEmbedder::default());
    ranker(tmp.path(), e1.clone(), 99).embed_items(&texts(&["alpha", "beta"])).await.expect("embed");

    let e2 = Arc::new(CountingEmbedder::default());
    let v = ranker(tmp.path(), e2.clone(), 99).embed_items(&texts(&["beta", "alpha"])).await.expect("embed");
    assert_eq!(e2.calls(), 0);
    assert_eq!(v[0], letters("beta"));
    assert_eq!(v[1], letters("alpha"));
}

#[tokio::test]
async fn blank_query_never_calls_embedder() {
    let tmp = tempfile::tempdir().unwrap();
    let embedder = Arc::new(CountingEmbedder::default());
    let r = ranker(tmp.path(), embedder.clone(), 99);

    for q in ["", "   ", "\n\t"] {
        let ranking = r.rank(q, &["a", "b"], |s| s.to_string()).await.expect("rank");
        assert!(ranking.is_empty());
    }
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn misses_are_split_into_configured_batches() {
    let tmp = tempfile::tempdir().unwrap();
    let embedder = Arc::new(CountingEmbedder::default());
    let r = ranker(tmp.path(), embedder.clone(), 2);

    let v = r.embed_items(&texts(&["one", "two", "three", "four", "five"])).await.expect("embed");
    assert_eq!(v.len(), 5);
    assert_eq!(*embedder.batch_sizes.lock().unwrap(), vec![2, 2, 1]);
    assert_eq!(v[2], letters("three"));
}

#[tokio::test]
async fn duplicate_texts_are_embedded_once() {
    let tmp = tempfile::tempdir().unwrap();
    let embedder = Arc::new(CountingEmbedder::default());
    let r = ranker(tmp.path(), embedder.clone(), 99);

    let v = r.embed_items(&texts(&["same", "other", "same"])).await.expect("embed");
    assert_eq!(*embedder.batch_sizes.lock().unwrap(), vec![2]);
    assert_eq!(v[0], v[2]);
}

#[tokio::test]
async fn ranking_is_deterministic_and_sorted() {
    let tmp = tempfile::tempdir().unwrap();
    let embedder = Arc::new(CountingEmbedder::default());
    let r = ranker(tmp.path(), embedder, 99);
    let items = vec!["zzz", "abc", "abd", "xyz"];

    let a = r.rank("abc", &items, |s| s.to_string()).await.expect("rank");
    let b = r.rank("abc", &items, |s| s.to_string()).await.expect("rank");
    assert_eq!(a, b);
    assert_eq!(a[0].item, "abc");
    assert!((a[0].score - 1.0).abs() < 1e-9);
    for pair in a.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert!(a.iter().all(|s| (-1.0..=1.0 + 1e-9).contains(&s.score)));
}

#[tokio::test]
async fn embedder_failure_is_a_hard_error() {
    let tmp = tempfile::tempdir().unwrap();
    let r = ranker(tmp.path(), Arc::new(CountingEmbedder::failing()), 99);
    let err = r.rank("abc", &["a"], |s| s.to_string()).await.unwrap_err();
    assert!(matches!(err, Error::Embedding(ref m) if m.contains("model offline")), "{err}");
}

#[tokio::test]
async fn corrupt_entry_is_treated_as_miss() {
    let tmp = tempfile::tempdir().unwrap();
    let embedder = Arc::new(CountingEmbedder::default());
    let r = ranker(tmp.path(), embedder.clone(), 99);
    r.cache().ensure_storage_ready().await.expect("dir");
    std::fs::write(r.cache().entry_path("broken"), b"{not json").unwrap();

    assert!(r.cache().get("broken").await.is_none());
    let v = r.embed_items(&texts(&["broken"])).await.expect("embed");
    assert_eq!(v[0], letters("broken"));
    assert_eq!(embedder.calls(), 1);
    assert_eq!(r.cache().get("broken").await, Some(letters("broken")));
}

#[tokio::test]
async fn zero_batch_size_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = EmbeddingCache::new(tmp.path(), "letters");
    let res = EmbeddingRanker::new(Arc::new(CountingEmbedder::default()), cache, 0);
    assert!(matches!(res, Err(Error::InvalidConfig(_))));
}

#[tokio::test]
async fn concurrent_ensure_storage_ready_is_safe() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = Arc::new(EmbeddingCache::new(tmp.path().join("nested/dir"), "letters"));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let c = cache.clone();
        handles.push(tokio::spawn(async move { c.ensure_storage_ready().await }));
    }
    for h in handles {
        h.await.unwrap().expect("ready");
    }
    assert!(cache.dir().is_dir());
}

#[tokio::test]
async fn unwritable_cache_still_returns_vectors() {
    let tmp = tempfile::tempdir().unwrap();
    let not_a_dir = tmp.path().join("cache-file");
    std::fs::write(&not_a_dir, b"occupied").unwrap();
    let embedder = Arc::new(CountingEmbedder::default());
    let r = ranker(&not_a_dir, embedder.clone(), 99);

    let v = r.embed_items(&texts(&["alpha", "beta"])).await.expect("embed without cache");
    assert_eq!(v, vec![letters("alpha"), letters("beta")]);
    assert_eq!(embedder.calls(), 1);

    let ranking = r.rank("alpha", &["beta", "alpha"], |s| s.to_string()).await.expect("rank without cache");
    assert_eq!(ranking[0].item, "alpha");
    // Nothing was persisted: items are embedded again, plus the query.
    assert_eq!(embedder.calls(), 3);
    assert!(r.cache().get("alpha").await.is_none());
}

#[tokio::test]
async fn warm_cache_counts_distinct_new_texts() {
    let tmp = tempfile::tempdir().unwrap();
    let embedder = Arc::new(CountingEmbedder::default());
    let r = ranker(tmp.path(), embedder.clone(), 2);

    let all = texts(&["one", "two", "one", "three"]);
    assert_eq!(r.warm_cache(&all).await.expect("warm"), 3);
    assert_eq!(*embedder.batch_sizes.lock().unwrap(), vec![2, 1]);
    assert_eq!(r.cache().get("three").await, Some(letters("three")));

    assert_eq!(r.warm_cache(&all).await.expect("rewarm"), 0);
    assert_eq!(embedder.calls(), 2);
}
