//! Shared plumbing for the OpenAI-compatible HTTP collaborators.

use anyhow::{anyhow, Context, Result};
use std::future::Future;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

pub fn api_key_from_env() -> Result<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| anyhow!("No OpenAI API key found. Set {API_KEY_ENV}."))
}

pub fn trim_base_url(base: &str) -> String {
    base.trim_end_matches('/').to_string()
}

/// Drives an async request from a blocking collaborator call.
///
/// Must run off the async workers (e.g. inside `spawn_blocking`); outside of
/// any runtime a temporary current-thread runtime is used.
pub fn block_on<F: Future>(fut: F) -> Result<F::Output> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => Ok(handle.block_on(fut)),
        Err(_) => {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("build request runtime")?;
            Ok(rt.block_on(fut))
        }
    }
}

/// POSTs `payload` as JSON with bearer auth and decodes a JSON reply.
pub async fn post_json<P, R>(client: &reqwest::Client, url: &str, api_key: &str, payload: &P) -> Result<R>
where
    P: serde::Serialize + ?Sized,
    R: serde::de::DeserializeOwned,
{
    let resp = client
        .post(url)
        .bearer_auth(api_key)
        .json(payload)
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?;
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(anyhow!("HTTP {status} from {url}: {body}"));
    }
    resp.json::<R>().await.with_context(|| format!("decode response from {url}"))
}
