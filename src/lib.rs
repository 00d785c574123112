// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Repoviz library - terminal client for a repository diagram service
//!
//! This crate submits repositories to a diagram backend, follows the
//! backend's processing status, renders the returned diagrams in the
//! terminal and forwards follow-up questions.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod commands;
pub mod config;
pub mod error;
pub mod poller;
pub mod render;
pub mod session;
pub mod tui;
pub mod views;

/// Core data types shared by the views, the backend client and the store
pub mod types {
    use crate::error::ClientError;
    use serde::{Deserialize, Serialize};
    use std::fmt;

    // =========================================================================
    // Repository reference
    // =========================================================================

    /// Identifier of the repository being analyzed, usually a URL
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct RepositoryReference(String);

    impl RepositoryReference {
        /// Parse user input, trimming whitespace and rejecting empty input
        pub fn parse(input: &str) -> Result<Self, ClientError> {
            let trimmed = input.trim();
            if trimmed.is_empty() {
                return Err(ClientError::Validation("repository URL is empty".into()));
            }
            Ok(Self(trimmed.to_string()))
        }

        /// The reference as sent on the wire
        #[must_use]
        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl fmt::Display for RepositoryReference {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    // =========================================================================
    // Diagram description
    // =========================================================================

    /// Opaque diagram text produced by the backend and consumed by the renderer
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct DiagramDescription(String);

    impl DiagramDescription {
        /// Wrap diagram text verbatim
        #[must_use]
        pub fn new(code: impl Into<String>) -> Self {
            Self(code.into())
        }

        /// The raw text
        #[must_use]
        pub fn as_str(&self) -> &str {
            &self.0
        }

        /// True when there is nothing to render
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.0.trim().is_empty()
        }
    }

    impl From<String> for DiagramDescription {
        fn from(code: String) -> Self {
            Self(code)
        }
    }

    // =========================================================================
    // Processing status
    // =========================================================================

    /// Backend-reported state of the analysis job for a repository
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(from = "String", into = "String")]
    pub enum ProcessingStatus {
        /// No poll data yet
        #[default]
        Unknown,
        /// Any non-terminal backend state, e.g. "cloning" or "analyzing"
        InProgress(String),
        /// Analysis finished, questions may be asked
        Completed,
        /// Analysis failed
        Failed,
    }

    impl ProcessingStatus {
        /// Parse a status string as returned by the backend
        #[must_use]
        pub fn from_wire(value: &str) -> Self {
            let value = value.trim();
            match value.to_ascii_lowercase().as_str() {
                "" | "unknown" => Self::Unknown,
                "completed" => Self::Completed,
                "failed" => Self::Failed,
                _ => Self::InProgress(value.to_string()),
            }
        }

        /// Terminal states stop polling
        #[must_use]
        pub fn is_terminal(&self) -> bool {
            matches!(self, Self::Completed | Self::Failed)
        }

        /// Display label
        #[must_use]
        pub fn as_str(&self) -> &str {
            match self {
                Self::Unknown => "unknown",
                Self::InProgress(label) => label,
                Self::Completed => "completed",
                Self::Failed => "failed",
            }
        }
    }

    impl From<String> for ProcessingStatus {
        fn from(value: String) -> Self {
            Self::from_wire(&value)
        }
    }

    impl From<ProcessingStatus> for String {
        fn from(status: ProcessingStatus) -> Self {
            status.as_str().to_string()
        }
    }

    impl fmt::Display for ProcessingStatus {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    // =========================================================================
    // Question
    // =========================================================================

    /// A follow-up question asked about the current diagram
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Question(String);

    impl Question {
        /// Parse user input, rejecting blank questions
        pub fn parse(input: &str) -> Result<Self, ClientError> {
            let trimmed = input.trim();
            if trimmed.is_empty() {
                return Err(ClientError::Validation("question is empty".into()));
            }
            Ok(Self(trimmed.to_string()))
        }

        /// The question text
        #[must_use]
        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    // =========================================================================
    // Navigation payload
    // =========================================================================

    /// What the submission view hands to the result view
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Handoff {
        /// Diagram returned by the generation request
        pub diagram: DiagramDescription,
        /// Repository to poll; absent when a diagram was pasted directly
        pub repo: Option<RepositoryReference>,
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_repository_reference_trims() {
            let repo = RepositoryReference::parse("  github.com/acme/repo \n").unwrap();
            assert_eq!(repo.as_str(), "github.com/acme/repo");
        }

        #[test]
        fn test_repository_reference_rejects_blank() {
            assert!(matches!(
                RepositoryReference::parse("   "),
                Err(ClientError::Validation(_))
            ));
        }

        #[test]
        fn test_status_from_wire() {
            assert_eq!(ProcessingStatus::from_wire("completed"), ProcessingStatus::Completed);
            assert_eq!(ProcessingStatus::from_wire(" FAILED "), ProcessingStatus::Failed);
            assert_eq!(ProcessingStatus::from_wire(""), ProcessingStatus::Unknown);
            assert_eq!(
                ProcessingStatus::from_wire("cloning"),
                ProcessingStatus::InProgress("cloning".into())
            );
        }

        #[test]
        fn test_status_terminal() {
            assert!(ProcessingStatus::Completed.is_terminal());
            assert!(ProcessingStatus::Failed.is_terminal());
            assert!(!ProcessingStatus::Unknown.is_terminal());
            assert!(!ProcessingStatus::InProgress("analyzing".into()).is_terminal());
        }

        #[test]
        fn test_status_serde_uses_wire_strings() {
            let status: ProcessingStatus = serde_json::from_str("\"analyzing\"").unwrap();
            assert_eq!(status, ProcessingStatus::InProgress("analyzing".into()));
            assert_eq!(
                serde_json::to_string(&ProcessingStatus::Completed).unwrap(),
                "\"completed\""
            );
        }

        #[test]
        fn test_blank_diagram_is_empty() {
            assert!(DiagramDescription::new(" \n").is_empty());
            assert!(!DiagramDescription::new("graph TD; A-->B;").is_empty());
        }
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::backend::{DiagramBackend, HttpBackend};
    pub use crate::error::ClientError;
    pub use crate::render::{DiagramRenderer, RenderedDiagram};
    pub use crate::session::SessionStore;
    pub use crate::types::*;
    pub use crate::views::{ResultView, SubmissionView};
    pub use anyhow::{Context, Result};
}
