// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Result view: diagram display, status tracking and follow-up questions
//!
//! Status moves `Unknown` → `InProgress`* → `Completed | Failed`. A terminal
//! status is final: the poller is stopped and later statuses are ignored.
//! Questions are only sent once the status is `Completed`.

use super::{alert_text, ASK_FAILED};
use crate::backend::DiagramBackend;
use crate::error::ClientError;
use crate::poller::StatusPoller;
use crate::render::{DiagramRenderer, RenderedDiagram};
use crate::session::SessionStore;
use crate::types::{DiagramDescription, Handoff, ProcessingStatus, Question, RepositoryReference};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Shown instead of an empty diagram
pub const PLACEHOLDER: &str = "Diagram will appear here";

/// State of the result screen
#[derive(Debug)]
pub struct ResultView {
    diagram: DiagramDescription,
    repo: Option<RepositoryReference>,
    status: ProcessingStatus,
    poller: Option<StatusPoller>,
    renderer: DiagramRenderer,
    question: String,
    asking: bool,
    alert: Option<String>,
}

impl ResultView {
    /// Show the handed-over diagram and, when a repository is known, start
    /// polling its status every `interval`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn load<B>(backend: Arc<B>, handoff: Handoff, interval: Duration) -> Self
    where
        B: DiagramBackend + 'static,
    {
        let poller = handoff
            .repo
            .clone()
            .map(|repo| StatusPoller::start(backend, repo, interval));
        if poller.is_none() {
            info!("no repository for this diagram, status will not be polled");
        }

        let mut view = Self {
            diagram: handoff.diagram,
            repo: handoff.repo,
            status: ProcessingStatus::Unknown,
            poller,
            renderer: DiagramRenderer::default(),
            question: String::new(),
            asking: false,
            alert: None,
        };
        view.rerender();
        view
    }

    /// Current diagram description
    #[must_use]
    pub fn diagram(&self) -> &DiagramDescription {
        &self.diagram
    }

    /// Repository this diagram belongs to
    #[must_use]
    pub fn repo(&self) -> Option<&RepositoryReference> {
        self.repo.as_ref()
    }

    /// Last adopted status
    #[must_use]
    pub fn status(&self) -> &ProcessingStatus {
        &self.status
    }

    /// True while the status poll is alive
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(StatusPoller::is_running)
    }

    /// Questions are accepted only after processing completed
    #[must_use]
    pub fn questions_enabled(&self) -> bool {
        self.status == ProcessingStatus::Completed
    }

    /// True while a question is in flight
    #[must_use]
    pub fn is_asking(&self) -> bool {
        self.asking
    }

    /// Whether the question input and its submit control accept input
    #[must_use]
    pub fn input_enabled(&self) -> bool {
        !self.asking
    }

    /// Current question text
    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Editable question text
    pub fn question_mut(&mut self) -> &mut String {
        &mut self.question
    }

    /// Replace the question text
    pub fn set_question(&mut self, text: impl Into<String>) {
        self.question = text.into();
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

    /// Output of the last render; `None` while the diagram is empty
    #[must_use]
    pub fn rendered(&self) -> Option<&RenderedDiagram> {
        if self.diagram.is_empty() {
            None
        } else {
            self.renderer.output()
        }
    }

    /// Text for the diagram panel
    #[must_use]
    pub fn display_text(&self) -> &str {
        self.rendered().map_or(PLACEHOLDER, |out| out.text.as_str())
    }

    fn rerender(&mut self) {
        if !self.diagram.is_empty() {
            self.renderer.render(&self.diagram);
        }
    }

    /// Adopt the latest status seen by the poller. Returns true on a change.
    pub fn sync_status(&mut self) -> bool {
        let Some(status) = self.poller.as_ref().map(StatusPoller::status) else {
            return false;
        };
        self.apply_status(status)
    }

    /// Transition on a new status. Returns true if the view changed.
    pub fn apply_status(&mut self, status: ProcessingStatus) -> bool {
        if self.status.is_terminal() || status == self.status {
            return false;
        }
        if status == ProcessingStatus::Unknown {
            return false;
        }

        match &status {
            ProcessingStatus::Completed => {
                info!("processing completed, questions enabled");
                self.stop_polling();
            }
            ProcessingStatus::Failed => {
                error!(repo = ?self.repo, "repository processing failed");
                self.stop_polling();
            }
            _ => debug!(%status, "processing"),
        }
        self.status = status;
        true
    }

    fn stop_polling(&mut self) {
        if let Some(poller) = self.poller.as_mut() {
            poller.stop();
        }
    }

    /// Stop polling and release the poll task
    pub fn teardown(&mut self) {
        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
    }

    /// Validate the question and enter the asking state.
    ///
    /// A blank question is rejected silently. A question before `Completed`
    /// raises a `NotReady` alert. Neither makes a request.
    pub fn begin_ask(&mut self) -> Result<Question, ClientError> {
        if self.asking {
            return Err(ClientError::Validation(
                "a question is already in progress".into(),
            ));
        }
        let question = Question::parse(&self.question)?;
        if !self.questions_enabled() {
            let err = ClientError::NotReady {
                status: self.status.clone(),
            };
            self.alert = Some(err.to_string());
            return Err(err);
        }
        self.asking = true;
        Ok(question)
    }

    /// Leave the asking state and apply the answer.
    ///
    /// On success the diagram is replaced, re-rendered and stored. Returns
    /// true when the diagram changed.
    pub fn finish_ask(
        &mut self,
        outcome: Result<DiagramDescription, ClientError>,
        store: &mut SessionStore,
    ) -> bool {
        self.asking = false;
        match outcome {
            Ok(diagram) => {
                info!("question answered, diagram updated");
                self.diagram = diagram;
                self.rerender();
                if let Err(err) = store.save_diagram(&self.diagram) {
                    warn!("could not store session: {err:#}");
                }
                true
            }
            Err(err) => {
                warn!(%err, "question failed");
                self.alert = Some(alert_text(ASK_FAILED, &err));
                false
            }
        }
    }

    /// Ask the current question: at most one request, and only when ready
    pub async fn ask<B: DiagramBackend>(&mut self, backend: &B, store: &mut SessionStore) -> bool {
        let Ok(question) = self.begin_ask() else {
            return false;
        };
        let outcome = backend.ask_question(&question).await;
        self.finish_ask(outcome, store)
    }
}

impl Drop for ResultView {
    fn drop(&mut self) {
        self.teardown();
    }
}
