// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Diagram backend client
//!
//! The backend exposes three JSON endpoints: `generate_diagram`,
//! `processing_status` and `ask_question`. [`DiagramBackend`] is the seam the
//! views and the poller are generic over; [`HttpBackend`] is the real
//! transport.

use crate::error::ClientError;
use crate::types::{DiagramDescription, ProcessingStatus, Question, RepositoryReference};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Endpoint names, also used in error messages
pub mod endpoint {
    /// Diagram generation for a repository
    pub const GENERATE: &str = "generate_diagram";
    /// Processing status for a repository
    pub const STATUS: &str = "processing_status";
    /// Follow-up question
    pub const ASK: &str = "ask_question";
}

// =============================================================================
// Wire types
// =============================================================================

/// Body of `generate_diagram`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Repository reference
    pub url: String,
}

/// Response of `generate_diagram` and `ask_question`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramResponse {
    /// Diagram text
    pub diagram_code: String,
    /// Diagram dialect, e.g. "mermaid"
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub diagram_type: Option<String>,
    /// Backend version that produced the diagram
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Generation time as reported by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl DiagramResponse {
    /// The diagram text as a description
    #[must_use]
    pub fn description(&self) -> DiagramDescription {
        DiagramDescription::new(self.diagram_code.clone())
    }
}

/// Response of `processing_status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Wire status string
    pub status: String,
}

/// Body of `ask_question`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// Question text
    pub question: String,
}

// =============================================================================
// Backend seam
// =============================================================================

/// Operations the client needs from the diagram service
pub trait DiagramBackend: Send + Sync {
    /// Request a diagram for a repository
    fn generate_diagram(
        &self,
        repo: &RepositoryReference,
    ) -> impl Future<Output = Result<DiagramResponse, ClientError>> + Send;

    /// Query the analysis status for a repository
    fn processing_status(
        &self,
        repo: &RepositoryReference,
    ) -> impl Future<Output = Result<ProcessingStatus, ClientError>> + Send;

    /// Ask a follow-up question and receive an updated diagram
    fn ask_question(
        &self,
        question: &Question,
    ) -> impl Future<Output = Result<DiagramDescription, ClientError>> + Send;
}

// =============================================================================
// HTTP transport
// =============================================================================

/// JSON-over-HTTP backend client
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
}

impl HttpBackend {
    /// Create a client for the backend at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("Invalid backend URL {}: {}", base_url, e))?;
        // Url::join drops the last path segment unless the path ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("repoviz/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base })
    }

    /// Base address requests are resolved against
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, endpoint: &'static str) -> Result<Url, ClientError> {
        self.base.join(endpoint).map_err(|e| ClientError::Network {
            endpoint,
            message: e.to_string(),
        })
    }

    async fn send<T: DeserializeOwned>(
        endpoint: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await.map_err(|e| ClientError::Network {
            endpoint,
            message: e.to_string(),
        })?;

        let status = response.status();
        debug!(endpoint, %status, "backend responded");
        if !status.is_success() {
            return Err(ClientError::Backend {
                endpoint,
                status: status.as_u16(),
            });
        }

        response.json::<T>().await.map_err(|e| ClientError::InvalidResponse {
            endpoint,
            reason: e.to_string(),
        })
    }
}

impl DiagramBackend for HttpBackend {
    async fn generate_diagram(
        &self,
        repo: &RepositoryReference,
    ) -> Result<DiagramResponse, ClientError> {
        let url = self.url(endpoint::GENERATE)?;
        debug!(%url, repo = %repo, "requesting diagram");
        let body = GenerateRequest {
            url: repo.as_str().to_string(),
        };
        Self::send(endpoint::GENERATE, self.client.post(url).json(&body)).await
    }

    async fn processing_status(
        &self,
        repo: &RepositoryReference,
    ) -> Result<ProcessingStatus, ClientError> {
        let url = self.url(endpoint::STATUS)?;
        let request = self.client.get(url).query(&[("url", repo.as_str())]);
        let response: StatusResponse = Self::send(endpoint::STATUS, request).await?;
        Ok(ProcessingStatus::from_wire(&response.status))
    }

    async fn ask_question(&self, question: &Question) -> Result<DiagramDescription, ClientError> {
        let url = self.url(endpoint::ASK)?;
        debug!(%url, "asking question");
        let body = AskRequest {
            question: question.as_str().to_string(),
        };
        let response: DiagramResponse =
            Self::send(endpoint::ASK, self.client.post(url).json(&body)).await?;
        Ok(response.description())
    }
}
