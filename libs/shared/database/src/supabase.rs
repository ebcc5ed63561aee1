use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("request failed: {0}")]
    Transport(reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error ({status}): {body}")]
    Api { status: StatusCode, body: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SupabaseError {
    /// PostgREST reports unique-index violations as 409 Conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, SupabaseError::Api { status, .. } if *status == StatusCode::CONFLICT)
    }

    /// Transient failures worth a single retry on idempotent reads.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SupabaseError::Timeout(_) | SupabaseError::Transport(_))
    }
}

#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
    timeout: Duration,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            service_key: config.supabase_service_key.clone(),
            timeout: Duration::from_millis(config.store_timeout_ms),
        }
    }

    fn get_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(key) = HeaderValue::from_str(&self.service_key) {
            headers.insert("apikey", key);
        }
        if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", self.service_key)) {
            headers.insert(AUTHORIZATION, bearer);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        headers
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, SupabaseError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, SupabaseError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut headers = self.get_headers();
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);
        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = tokio::time::timeout(self.timeout, req.send())
            .await
            .map_err(|_| SupabaseError::Timeout(self.timeout))?
            .map_err(SupabaseError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, body);
            return Err(SupabaseError::Api { status, body });
        }

        let text = tokio::time::timeout(self.timeout, response.text())
            .await
            .map_err(|_| SupabaseError::Timeout(self.timeout))?
            .map_err(SupabaseError::Transport)?;

        // DELETE with no representation returns an empty body.
        if text.is_empty() {
            return Ok(serde_json::from_value(Value::Array(vec![]))?);
        }

        Ok(serde_json::from_str(&text)?)
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
