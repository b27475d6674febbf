use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::backend::BlobBackend;
use crate::error::{BlobError, Result};

/// An HTTP(S)-backed blob store: `put`/`get`/`delete` map to idempotent
/// `PUT`/`GET`/`DELETE` against `{base_url}/{key}`. Requests retry with
/// exponential backoff and jitter on transient (5xx / connection) failures;
/// a repeated PUT of the same key is safe because contents are
/// byte-identical by construction.
pub struct Remote {
    client: reqwest::Client,
    base_url: String,
    max_attempts: u32,
}

impl Remote {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            max_attempts: 5,
        }
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn with_retry<F, Fut, T>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = reqwest::Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts || !is_retryable(&e) => {
                    return Err(BlobError::Remote(e.to_string()));
                }
                Err(_) => {
                    let base_ms = 50u64 * (1 << (attempt - 1).min(10));
                    let jitter_ms = rand::rng().random_range(0..base_ms.max(1));
                    tokio::time::sleep(Duration::from_millis(base_ms + jitter_ms)).await;
                }
            }
        }
    }
}

fn is_retryable(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.status().map(|s| s.is_server_error()).unwrap_or(false)
}

#[async_trait]
impl BlobBackend for Remote {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let url = self.url_for(key);
        let bytes = bytes.to_vec();
        self.with_retry(|| {
            let bytes = bytes.clone();
            let url = url.clone();
            async move {
                self.client.put(&url).body(bytes).send().await?.error_for_status()?;
                Ok(())
            }
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let url = self.url_for(key);
        let resp = self
            .with_retry(|| {
                let url = url.clone();
                async move {
                    let resp = self.client.get(&url).send().await?;
                    resp.error_for_status()
                }
            })
            .await;
        match resp {
            Ok(resp) => Ok(resp.bytes().await.map_err(|e| BlobError::Remote(e.to_string()))?.to_vec()),
            Err(BlobError::Remote(msg)) if msg.contains("404") => Err(BlobError::NotFound(key.to_owned())),
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let url = self.url_for(key);
        self.with_retry(|| {
            let url = url.clone();
            async move {
                self.client.delete(&url).send().await?.error_for_status()?;
                Ok(())
            }
        })
        .await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let url = self.url_for(key);
        let resp = self
            .client
            .head(&url)
            .send()
            .await
            .map_err(|e| BlobError::Remote(e.to_string()))?;
        Ok(resp.status().is_success())
    }

    async fn stat(&self, key: &str) -> Result<u64> {
        let url = self.url_for(key);
        let resp = self
            .client
            .head(&url)
            .send()
            .await
            .map_err(|e| BlobError::Remote(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(BlobError::NotFound(key.to_owned()));
        }
        resp.content_length().ok_or_else(|| BlobError::Remote("missing content-length".into()))
    }
}
