//! HTTP client shared by the connectors.
//!
//! Thin wrapper over `reqwest` adding authentication, retry with
//! exponential backoff, and uniform error mapping.

use crate::traits::{AuthConfig, ConnectorConfig, ConnectorError, ConnectorResult};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// HTTP client with retry support.
pub struct HttpClient {
    client: Client,
    config: ConnectorConfig,
}

impl HttpClient {
    /// Creates a new HTTP client from connector configuration.
    pub fn new(config: ConnectorConfig) -> ConnectorResult<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        for (key, value) in &config.headers {
            if let (Ok(name), Ok(val)) = (
                reqwest::header::HeaderName::try_from(key.as_str()),
                reqwest::header::HeaderValue::try_from(value.as_str()),
            ) {
                headers.insert(name, val);
            }
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| ConnectorError::ConfigError(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Builds a URL from a path.
    pub fn build_url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    /// Executes a GET request with retry logic.
    pub async fn get(&self, path: &str) -> ConnectorResult<Response> {
        let url = self.build_url(path);
        let request = self.client.get(&url);
        self.execute_with_retry(request).await
    }

    /// Executes a GET request and deserializes the JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ConnectorResult<T> {
        let response = self.get(path).await?;
        parse_json_response(response).await
    }

    /// Executes a POST request with retry logic.
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> ConnectorResult<Response> {
        let url = self.build_url(path);
        let request = self.client.post(&url).json(body);
        self.execute_with_retry(request).await
    }

    /// Executes a POST request and deserializes the JSON response.
    pub async fn post_json<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> ConnectorResult<R> {
        let response = self.post(path, body).await?;
        parse_json_response(response).await
    }

    async fn execute_with_retry(
        &self,
        mut request: reqwest::RequestBuilder,
    ) -> ConnectorResult<Response> {
        request = self.add_auth(request);

        let mut last_error = None;
        let mut delay = Duration::from_millis(200);

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                debug!(attempt, ?delay, "retrying request");
                sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_secs(20));
            }

            let request_clone = request
                .try_clone()
                .ok_or_else(|| ConnectorError::Internal("failed to clone request".to_string()))?;

            match request_clone.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = response
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(30);
                        if attempt < self.config.max_retries {
                            warn!(retry_after, "rate limited, backing off");
                            sleep(Duration::from_secs(retry_after)).await;
                            continue;
                        }
                        return Err(ConnectorError::RateLimited(retry_after));
                    }

                    if status.is_server_error() && attempt < self.config.max_retries {
                        warn!(%status, "server error, retrying");
                        last_error = Some(ConnectorError::RequestFailed(format!(
                            "Server error: {}",
                            status
                        )));
                        continue;
                    }

                    if status.is_client_error() {
                        return Err(map_client_error(status, response).await);
                    }

                    return Ok(response);
                }
                Err(e) => {
                    last_error = Some(if e.is_timeout() {
                        ConnectorError::Timeout(e.to_string())
                    } else if e.is_connect() {
                        ConnectorError::ConnectionFailed(e.to_string())
                    } else {
                        ConnectorError::RequestFailed(e.to_string())
                    });
                    if attempt >= self.config.max_retries {
                        break;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ConnectorError::Internal("unknown error".to_string())))
    }

    fn add_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth {
            AuthConfig::None => request,
            AuthConfig::ApiKey { key, header_name } => {
                request.header(header_name, key.expose_secret())
            }
            AuthConfig::BearerToken { token } => request.header(
                "Authorization",
                format!("Bearer {}", token.expose_secret()),
            ),
        }
    }
}

async fn map_client_error(status: StatusCode, response: Response) -> ConnectorError {
    match status {
        StatusCode::UNAUTHORIZED => ConnectorError::AuthenticationFailed("Unauthorized".into()),
        StatusCode::FORBIDDEN => ConnectorError::AuthorizationDenied("Forbidden".into()),
        StatusCode::NOT_FOUND => ConnectorError::NotFound("Resource not found".into()),
        _ => {
            let body = response.text().await.unwrap_or_default();
            ConnectorError::RequestFailed(format!("Client error {}: {}", status, body))
        }
    }
}

async fn parse_json_response<T: DeserializeOwned>(response: Response) -> ConnectorResult<T> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ConnectorError::InvalidResponse(e.to_string()))?;

    serde_json::from_str(&text).map_err(|e| {
        ConnectorError::InvalidResponse(format!(
            "Failed to parse response (status {}): {} - Body: {}",
            status,
            e,
            text.chars().take(500).collect::<String>()
        ))
    })
}
