// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! View models for the submission and result screens
//!
//! The views hold state and enforce the request rules; they draw nothing.
//! The TUI and the CLI commands both drive them.

pub mod result;
pub mod submission;

pub use result::ResultView;
pub use submission::SubmissionView;

use crate::error::ClientError;

/// Alert text shown when diagram generation fails
pub const GENERATE_FAILED: &str = "Failed to generate diagram. Please try again.";
/// Alert text shown when a question fails
pub const ASK_FAILED: &str = "Failed to process your question. Please try again.";

/// User-facing alert: the fixed headline followed by the cause
fn alert_text(headline: &str, err: &ClientError) -> String {
    format!("{headline}\n{err}")
}
