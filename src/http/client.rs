//! HTTP client for index and archive fetches.
//!
//! Every request is a single attempt: a failed fetch surfaces as a hard error
//! carrying the URL, and retry policy (if any) belongs to the caller.

use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;

/// Thin wrapper around a reqwest [`Client`].
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Performs a GET request and deserializes the JSON response.
    #[tracing::instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET JSON from {}...", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        let response = response
            .error_for_status()
            .with_context(|| format!("Request to {} failed", url))?;

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    /// Performs a GET request and returns the full response body.
    #[tracing::instrument(skip(self))]
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!("GET bytes from {}...", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to download {}", url))?;

        let response = response
            .error_for_status()
            .with_context(|| format!("Failed to download {}", url))?;

        let body = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read response body from {}", url))?;

        debug!("Downloaded {:.2} MB", body.len() as f64 / (1024.0 * 1024.0));

        Ok(body.to_vec())
    }
}
