// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP client for the PrintBridge REST endpoints.
//
// Every call is a single request with no retry. Only the liveness check sets
// a timeout; the others wait as long as the service takes.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use printbridge_core::error::{BridgeError, Result};
use printbridge_core::types::{JobRecord, PrintRequest, PrintResult};

/// Thin typed wrapper over the PrintBridge HTTP API.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    http: Client,
    base_url: String,
}

impl BridgeClient {
    /// Create a client for the service at `base_url` (e.g. `http://localhost:8080`).
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| BridgeError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /` with a timeout. Returns the status on success.
    #[instrument(skip(self), fields(base = %self.base_url))]
    pub async fn check_liveness(&self, timeout: Duration) -> Result<u16> {
        let response = self
            .http
            .get(self.url("/"))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_error(&e, Some(timeout)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "liveness check rejected");
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::Status {
                status: status.as_u16(),
                body,
            });
        }
        info!(status = status.as_u16(), "service is up");
        Ok(status.as_u16())
    }

    /// `GET /printers`.
    #[instrument(skip(self))]
    pub async fn list_printers(&self) -> Result<Vec<String>> {
        let printers: Vec<String> = self.get_json("/printers").await?;
        debug!(count = printers.len(), "printers listed");
        Ok(printers)
    }

    /// `POST /print`.
    #[instrument(
        skip(self, request),
        fields(printer = ?request.printer_name, payload = request.base64_image.len())
    )]
    pub async fn submit_print(&self, request: &PrintRequest) -> Result<PrintResult> {
        let response = self
            .http
            .post(self.url("/print"))
            .json(request)
            .send()
            .await
            .map_err(|e| request_error(&e, None))?;
        let result: PrintResult = read_json(response).await?;
        debug!(printer = result.printer(), success = result.succeeded(), "print submitted");
        Ok(result)
    }

    /// `GET /jobs`, in the order the server returns them (oldest first).
    #[instrument(skip(self))]
    pub async fn list_jobs(&self) -> Result<Vec<JobRecord>> {
        let jobs: Vec<JobRecord> = self.get_json("/jobs").await?;
        debug!(count = jobs.len(), "jobs listed");
        Ok(jobs)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| request_error(&e, None))?;
        read_json(response).await
    }
}

/// Decode a success body as JSON; anything else becomes `BridgeError::Status`
/// carrying the raw body text.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| request_error(&e, None))?;

    if !status.is_success() {
        warn!(status = status.as_u16(), body_len = body.len(), "non-success response");
        return Err(BridgeError::Status {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| BridgeError::Decode(e.to_string()))
}

/// Map a reqwest failure, keeping the underlying cause (refused, DNS, ...)
/// that reqwest's own message hides.
fn request_error(err: &reqwest::Error, timeout: Option<Duration>) -> BridgeError {
    if err.is_timeout() {
        if let Some(limit) = timeout {
            return BridgeError::Timeout(limit.as_secs());
        }
    }
    if err.is_decode() {
        return BridgeError::Decode(err.to_string());
    }

    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    BridgeError::Transport(message)
}
