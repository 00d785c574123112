// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Submission view: repository input and diagram generation

use super::{alert_text, GENERATE_FAILED};
use crate::backend::{DiagramBackend, DiagramResponse};
use crate::error::ClientError;
use crate::session::SessionStore;
use crate::types::{Handoff, RepositoryReference};
use tracing::{info, warn};

/// Label of the submit control when idle
pub const SUBMIT_LABEL: &str = "Submit";
/// Label of the submit control while a request is in flight
pub const LOADING_LABEL: &str = "Loading...";

/// State of the submission screen
#[derive(Debug, Default)]
pub struct SubmissionView {
    input: String,
    loading: bool,
    alert: Option<String>,
}

impl SubmissionView {
    /// Empty view
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current input text
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Editable input text
    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    /// Replace the input text
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// True while a generation request is in flight
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Whether the submit control accepts input
    #[must_use]
    pub fn submit_enabled(&self) -> bool {
        !self.loading
    }

    /// Text of the submit control
    #[must_use]
    pub fn submit_label(&self) -> &'static str {
        if self.loading {
            LOADING_LABEL
        } else {
            SUBMIT_LABEL
        }
    }

    /// Pending alert, if any
    #[must_use]
    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    /// Dismiss the pending alert
    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    /// Validate the input and enter the loading state.
    ///
    /// Blank input and a submit during loading are rejected without an alert.
    pub fn begin_submit(&mut self) -> Result<RepositoryReference, ClientError> {
        if self.loading {
            return Err(ClientError::Validation(
                "a submission is already in progress".into(),
            ));
        }
        let repo = RepositoryReference::parse(&self.input)?;
        self.loading = true;
        Ok(repo)
    }

    /// Leave the loading state and apply the generation outcome.
    ///
    /// On success the handoff is stored and returned. On failure an alert is
    /// raised and the input is kept for a retry.
    pub fn finish_submit(
        &mut self,
        repo: RepositoryReference,
        outcome: Result<DiagramResponse, ClientError>,
        store: &mut SessionStore,
    ) -> Option<Handoff> {
        self.loading = false;
        match outcome {
            Ok(response) => {
                info!(repo = %repo, "diagram generated");
                let handoff = Handoff {
                    diagram: response.description(),
                    repo: Some(repo),
                };
                if let Err(err) = store.save_handoff(&handoff) {
                    warn!("could not store session: {err:#}");
                }
                Some(handoff)
            }
            Err(err) => {
                warn!(repo = %repo, %err, "diagram generation failed");
                self.alert = Some(alert_text(GENERATE_FAILED, &err));
                None
            }
        }
    }

    /// Submit the current input: at most one generation request
    pub async fn submit<B: DiagramBackend>(
        &mut self,
        backend: &B,
        store: &mut SessionStore,
    ) -> Option<Handoff> {
        let repo = self.begin_submit().ok()?;
        let outcome = backend.generate_diagram(&repo).await;
        self.finish_submit(repo, outcome, store)
    }
}
