// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod ask;
pub mod completions;
pub mod config;
pub mod generate;
pub mod render;
pub mod show;
pub mod status;
pub mod view;

use crate::backend::HttpBackend;
use crate::config::Settings;
use crate::render::{DiagramRenderer, RenderedDiagram};
use crate::session::SessionStore;
use crate::types::{DiagramDescription, ProcessingStatus};
use crate::views::result::PLACEHOLDER;
use anyhow::{Context as _, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a command needs from the global flags and the config
#[derive(Debug, Clone)]
pub struct Context {
    /// Effective settings
    pub settings: Settings,
    /// Config file that `config` reads and writes
    pub config_path: PathBuf,
    /// Whether to colour terminal output
    pub color: bool,
}

impl Context {
    /// HTTP client for the configured backend
    pub fn backend(&self) -> Result<Arc<HttpBackend>> {
        let backend = HttpBackend::new(&self.settings.backend_url, self.settings.request_timeout())?;
        Ok(Arc::new(backend))
    }

    /// Session store in the configured session directory
    pub fn open_store(&self) -> Result<SessionStore> {
        SessionStore::open(&self.settings.session_dir).with_context(|| {
            format!(
                "Failed to open session in {}",
                self.settings.session_dir.display()
            )
        })
    }

    /// Status label, coloured by state
    #[must_use]
    pub fn paint_status(&self, status: &ProcessingStatus) -> String {
        let label = status.to_string();
        if !self.color {
            return label;
        }
        match status {
            ProcessingStatus::Completed => label.green().to_string(),
            ProcessingStatus::Failed => label.red().to_string(),
            ProcessingStatus::InProgress(_) => label.yellow().to_string(),
            ProcessingStatus::Unknown => label.dimmed().to_string(),
        }
    }

    /// Warning line for stderr
    #[must_use]
    pub fn paint_warning(&self, text: &str) -> String {
        if self.color {
            text.yellow().to_string()
        } else {
            text.to_string()
        }
    }
}

/// Print a description, drawn when possible. Notes on stderr when the raw
/// text is shown instead. Returns `None` for an empty description.
pub(crate) fn print_diagram(ctx: &Context, diagram: &DiagramDescription) -> Option<RenderedDiagram> {
    if diagram.is_empty() {
        println!("{PLACEHOLDER}");
        return None;
    }
    let mut renderer = DiagramRenderer::default();
    let rendered = renderer.render(diagram).clone();
    if let Some(err) = &rendered.fallback {
        eprintln!(
            "{}",
            ctx.paint_warning(&format!("Could not draw diagram ({err}), showing raw text"))
        );
    }
    println!("{}", rendered.text);
    Some(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(color: bool) -> Context {
        Context {
            settings: Settings::default(),
            config_path: PathBuf::from("config.toml"),
            color,
        }
    }

    #[test]
    fn test_plain_status_without_color() {
        let ctx = context(false);
        assert_eq!(ctx.paint_status(&ProcessingStatus::Completed), "completed");
        assert_eq!(
            ctx.paint_status(&ProcessingStatus::InProgress("cloning".into())),
            "cloning"
        );
    }

    #[test]
    fn test_colored_status_keeps_label() {
        let ctx = context(true);
        let painted = ctx.paint_status(&ProcessingStatus::Failed);
        assert!(painted.contains("failed"));
        assert_ne!(painted, "failed");
    }
}
