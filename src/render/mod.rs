// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Diagram renderer
//!
//! Turns a diagram description into terminal text. Rendering never fails
//! from the caller's point of view: anything the engine rejects is shown as
//! the raw description, escaped so it cannot drive the terminal.

pub mod ast;
pub mod canvas;
pub mod layout;
pub mod parser;

use crate::types::DiagramDescription;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, warn};
use unicode_width::UnicodeWidthChar;

/// Why a description could not be drawn
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// Nothing but whitespace and comments
    #[error("diagram is empty")]
    Empty,
    /// Not a flowchart
    #[error("unsupported diagram type: {kind}")]
    Unsupported {
        /// First word of the description
        kind: String,
    },
    /// A statement did not parse
    #[error("syntax error on line {line}: `{statement}`")]
    Syntax {
        /// 1-based line number
        line: usize,
        /// Offending statement
        statement: String,
    },
    /// The parsed chart could not be laid out
    #[error("layout failed: {0}")]
    Layout(String),
}

/// Engine settings, applied afresh on every render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Longest node label, in columns, before it is cut with an ellipsis
    pub max_label_width: usize,
    /// Largest canvas, in cells, the engine will draw. Bigger charts are
    /// rejected with [`RenderError::Layout`].
    pub max_cells: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_label_width: 40,
            max_cells: 500_000,
        }
    }
}

/// Parses, lays out and draws one description
#[derive(Debug, Clone)]
pub struct Engine {
    options: RenderOptions,
}

impl Engine {
    /// Engine configured with `options`
    #[must_use]
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Render `text`, reporting why it could not be drawn
    pub fn render(&self, text: &str) -> Result<String, RenderError> {
        let mut chart = parser::parse_flowchart(text)?;
        for node in &mut chart.nodes {
            node.label = truncate(&node.label, self.options.max_label_width);
        }
        let layout = layout::compute(&chart)?;
        let cells = layout.width.saturating_mul(layout.height);
        if cells > self.options.max_cells {
            return Err(RenderError::Layout(format!(
                "{}x{} canvas exceeds the {} cell limit",
                layout.width, layout.height, self.options.max_cells
            )));
        }
        Ok(canvas::draw(&chart, &layout))
    }
}

/// Render with default options, without the raw-text fallback
pub fn render_text(text: &str) -> Result<String, RenderError> {
    Engine::new(RenderOptions::default()).render(text)
}

/// Output of one render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDiagram {
    /// Unique id of this render
    pub id: String,
    /// Text to display
    pub text: String,
    /// Set when `text` is the escaped raw description
    pub fallback: Option<RenderError>,
}

impl RenderedDiagram {
    /// True when the engine rejected the description
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Stateful renderer owning the currently displayed output
#[derive(Debug, Default)]
pub struct DiagramRenderer {
    options: RenderOptions,
    output: Option<RenderedDiagram>,
}

impl DiagramRenderer {
    /// Renderer with custom engine options
    #[must_use]
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            output: None,
        }
    }

    /// Replace the current output with a render of `description`
    pub fn render(&mut self, description: &DiagramDescription) -> &RenderedDiagram {
        let engine = Engine::new(self.options.clone());
        self.output = None;

        let id = next_render_id(description.as_str());
        let rendered = match engine.render(description.as_str()) {
            Ok(text) => {
                debug!(%id, "diagram rendered");
                RenderedDiagram {
                    id,
                    text,
                    fallback: None,
                }
            }
            Err(err) => {
                warn!(%id, %err, "diagram could not be rendered, showing raw text");
                RenderedDiagram {
                    id,
                    text: escape_raw(description.as_str()),
                    fallback: Some(err),
                }
            }
        };

        self.output.insert(rendered)
    }

    /// Current output, if anything was rendered
    #[must_use]
    pub fn output(&self) -> Option<&RenderedDiagram> {
        self.output.as_ref()
    }
}

static RENDER_SEQ: AtomicU64 = AtomicU64::new(0);

/// `diagram-<12 hex chars>`, derived from a process-wide sequence number
fn next_render_id(text: &str) -> String {
    let seq = RENDER_SEQ.fetch_add(1, Ordering::Relaxed);
    let mut hasher = Sha256::new();
    hasher.update(seq.to_le_bytes());
    hasher.update(text.as_bytes());
    let hash = hex::encode(hasher.finalize());
    format!("diagram-{}", &hash[..12])
}

/// Escape text for display in a terminal.
///
/// Newlines and tabs pass through; other control characters and bidi
/// overrides are replaced by their Rust escape form.
#[must_use]
pub fn escape_raw(text: &str) -> String {
    escape(text, true)
}

/// Escape text that must stay on one grid row: like [`escape_raw`], but
/// newlines and tabs are escaped too
#[must_use]
pub fn escape_inline(text: &str) -> String {
    escape(text, false)
}

fn escape(text: &str, keep_layout: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' | '\t' if keep_layout => out.push(c),
            '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}' => out.extend(c.escape_unicode()),
            c if c.is_control() => out.extend(c.escape_default()),
            c => out.push(c),
        }
    }
    out
}

fn truncate(label: &str, max_width: usize) -> String {
    let width = unicode_width::UnicodeWidthStr::width(label);
    if width <= max_width || max_width == 0 {
        return label.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in label.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_renders_simple_flow() {
        let out = render_text("graph TD; A-->B;").unwrap();
        let expected = "┌───┐\n│ A │\n└───┘\n  │\n  │\n  │\n  ▼\n┌───┐\n│ B │\n└───┘";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_renders_left_right_flow() {
        let out = render_text("graph LR\n  A --> B\n").unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("│ A │"));
        assert!(lines[1].contains("►│ B │"));
    }

    #[test]
    fn test_renders_link_labels() {
        let out = render_text("graph TD\n  A -->|calls| B\n").unwrap();
        assert!(out.contains("calls"));
    }

    #[test]
    fn test_renders_back_edges_upward() {
        let out = render_text("graph TD\n  A --> B\n  B --> A\n").unwrap();
        assert!(out.contains('▼'));
        assert!(out.contains('▲'));
    }

    #[test]
    fn test_renderer_falls_back_to_escaped_raw_text() {
        let mut renderer = DiagramRenderer::default();
        let raw = "sequenceDiagram\n  Alice->>Bob: \u{1b}[31mhi";
        let out = renderer.render(&DiagramDescription::new(raw));

        assert!(out.is_fallback());
        assert_eq!(out.text, "sequenceDiagram\n  Alice->>Bob: \\u{1b}[31mhi");
        assert_eq!(out.text, escape_raw(raw));
    }

    #[test]
    fn test_each_render_replaces_output_with_new_id() {
        let mut renderer = DiagramRenderer::default();
        let first = renderer
            .render(&DiagramDescription::new("graph TD; A-->B;"))
            .clone();
        let second = renderer
            .render(&DiagramDescription::new("graph TD; A-->B;"))
            .clone();

        assert_ne!(first.id, second.id);
        assert!(first.id.starts_with("diagram-"));
        assert_eq!(first.id.len(), "diagram-".len() + 12);
        assert_eq!(first.text, second.text);
        assert_eq!(renderer.output(), Some(&second));
    }

    #[test]
    fn test_escape_keeps_plain_text() {
        assert_eq!(escape_raw("graph TD\n\tA --> B"), "graph TD\n\tA --> B");
        assert_eq!(escape_raw("a\rb"), "a\\rb");
        assert_eq!(escape_raw("x\u{202E}y"), "x\\u{202e}y");
    }

    #[test]
    fn test_long_labels_are_truncated() {
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("abc", 4), "abc");
        let out = Engine::new(RenderOptions {
            max_label_width: 5,
            ..RenderOptions::default()
        })
            .render("graph TD\n  A[A very long label]\n")
            .unwrap();
        assert!(out.contains("A ve…"));
    }

    #[test]
    fn test_drawn_labels_are_escaped() {
        let mut renderer = DiagramRenderer::default();
        let out = renderer.render(&DiagramDescription::new("graph TD; A[\"x\u{1b}[2Jy\"]-->B;"));

        assert!(!out.is_fallback());
        assert!(!out.text.contains('\u{1b}'));
        assert!(out.text.contains("x\\u{1b}[2Jy"));
    }

    #[test]
    fn test_escape_inline_flattens_layout_chars() {
        assert_eq!(escape_inline("a\nb\tc"), "a\\nb\\tc");
        assert_eq!(escape_inline("plain"), "plain");
    }

    #[test]
    fn test_oversized_canvas_is_rejected() {
        let engine = Engine::new(RenderOptions {
            max_cells: 79,
            ..RenderOptions::default()
        });
        let err = engine.render("graph TD; A-->B;").unwrap_err();
        assert!(matches!(err, RenderError::Layout(_)));

        // Exactly at the limit still draws: 8 columns by 10 rows
        let engine = Engine::new(RenderOptions {
            max_cells: 80,
            ..RenderOptions::default()
        });
        assert!(engine.render("graph TD; A-->B;").is_ok());
    }

    #[test]
    fn test_huge_fan_out_falls_back_to_raw_text() {
        let mut text = String::from("graph TD\n");
        for i in 0..1000 {
            text.push_str(&format!("  root --> f{i}\n"));
        }
        for i in 0..30 {
            text.push_str(&format!("  c{i} --> c{}\n", i + 1));
        }

        let mut renderer = DiagramRenderer::default();
        let out = renderer.render(&DiagramDescription::new(text.clone()));
        assert!(matches!(out.fallback, Some(RenderError::Layout(_))));
        assert_eq!(out.text, escape_raw(&text));
    }
}
