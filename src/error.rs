// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Error types for backend calls and local validation

use crate::types::ProcessingStatus;
use thiserror::Error;

/// Failures surfaced by the views and the backend client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The request could not be sent or no response arrived
    #[error("request to {endpoint} failed: {message}")]
    Network {
        /// Backend endpoint name
        endpoint: &'static str,
        /// Transport error text
        message: String,
    },

    /// The backend answered with a non-success HTTP status
    #[error("{endpoint} returned HTTP {status}")]
    Backend {
        /// Backend endpoint name
        endpoint: &'static str,
        /// HTTP status code
        status: u16,
    },

    /// The backend answered 2xx but the body could not be decoded
    #[error("{endpoint} returned an unreadable response: {reason}")]
    InvalidResponse {
        /// Backend endpoint name
        endpoint: &'static str,
        /// Decoder error text
        reason: String,
    },

    /// Local input was rejected before any request was made
    #[error("{0}")]
    Validation(String),

    /// A question was asked before processing completed
    #[error("Please wait until processing has completed (current status: {status})")]
    NotReady {
        /// Status at the time of the question
        status: ProcessingStatus,
    },
}

impl ClientError {
    /// Errors that reached (or tried to reach) the backend
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Backend { .. } | Self::InvalidResponse { .. }
        )
    }
}
