//! Shared HTTP client for upstream drug reference APIs.
//!
//! Every upstream call is a single GET returning JSON. Transport errors,
//! HTTP 429 and 5xx are retried with a fixed delay multiplied by the
//! attempt number. Other 4xx responses fail immediately; 404 is surfaced
//! as `Ok(None)` because OpenFDA and RxNorm use it for "no match".

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::UpstreamError;
use crate::config;

/// Retrying JSON GET client bound to one upstream base URL.
pub struct ApiClient {
    service: &'static str,
    base_url: String,
    client: reqwest::Client,
    max_attempts: u32,
    retry_delay: Duration,
}

impl ApiClient {
    pub fn new(
        service: &'static str,
        base_url: &str,
        timeout: Duration,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(config::user_agent())
            .build()
            .map_err(|source| UpstreamError::Http { service, source })?;

        Ok(Self {
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            max_attempts: max_attempts.max(1),
            retry_delay,
        })
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` and decode the body. A 404 is an error here.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, UpstreamError> {
        self.get_json_optional(path, query)
            .await?
            .ok_or_else(|| UpstreamError::Status {
                service: self.service,
                status: StatusCode::NOT_FOUND.as_u16(),
                body: format!("{path} not found"),
            })
    }

    /// GET `path` and decode the body, mapping 404 to `None`.
    pub async fn get_json_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);
        let service = self.service;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let failure = match self.client.get(&url).query(query).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::NOT_FOUND {
                        tracing::debug!(service, %url, "Upstream returned 404");
                        return Ok(None);
                    }
                    if status.is_success() {
                        return response.json::<T>().await.map(Some).map_err(|e| {
                            tracing::error!(service, %url, error = %e, "Upstream response decode failed");
                            UpstreamError::Decode {
                                service,
                                detail: e.to_string(),
                            }
                        });
                    }

                    let body = response.text().await.unwrap_or_default();
                    let err = UpstreamError::Status {
                        service,
                        status: status.as_u16(),
                        body,
                    };
                    if !is_retryable(status) {
                        tracing::error!(service, %url, error = %err, "Upstream rejected request");
                        return Err(err);
                    }
                    err
                }
                Err(source) => UpstreamError::Http { service, source },
            };

            if attempt >= self.max_attempts {
                tracing::error!(service, %url, attempts = attempt, error = %failure, "Upstream request failed");
                return Err(UpstreamError::RetriesExhausted {
                    service,
                    attempts: attempt,
                    last: failure.to_string(),
                });
            }

            tracing::warn!(service, %url, attempt, error = %failure, "Upstream request failed, retrying");
            tokio::time::sleep(self.retry_delay * attempt).await;
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
