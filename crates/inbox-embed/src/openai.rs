use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use inbox_core::traits::Embedder;

use crate::http::{api_key_from_env, block_on, post_json, trim_base_url};

/// Client for an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    base_url: String,
    model: String,
    api_key: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(base_url: &str, model: &str, api_key: String) -> Self {
        Self {
            base_url: trim_base_url(base_url),
            model: model.to_string(),
            api_key,
            http: reqwest::Client::new(),
        }
    }

    pub fn from_env(base_url: &str, model: &str) -> Result<Self> {
        Ok(Self::new(base_url, model, api_key_from_env()?))
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }
}

impl Embedder for OpenAiEmbedder {
    fn model_key(&self) -> &str {
        &self.model
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let url = self.embeddings_url();
        let payload = EmbeddingRequest { model: &self.model, input: texts };
        let parsed: EmbeddingResponse =
            block_on(post_json(&self.http, &url, &self.api_key, &payload))??;

        if parsed.data.len() != texts.len() {
            bail!("embedding API returned {} vectors for {} inputs", parsed.data.len(), texts.len());
        }
        let mut data = parsed.data;
        // The API tags each vector with its input position; honour it when present.
        if data.iter().all(|d| d.index.is_some()) {
            data.sort_by_key(|d| d.index);
        }
        debug!(model = %self.model, count = data.len(), "embedding batch received");
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}
