// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Render command - draws a local diagram description

use super::{print_diagram, Context};
use crate::types::DiagramDescription;
use anyhow::{bail, Context as _, Result};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

/// Render `file`, or stdin when it is absent or `-`
pub fn run(ctx: &Context, file: Option<PathBuf>, check: bool) -> Result<()> {
    let text = match file {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        _ => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            text
        }
    };

    let rendered = print_diagram(ctx, &DiagramDescription::new(text));
    if check {
        match rendered {
            None => bail!("Diagram is empty"),
            Some(out) => {
                if let Some(err) = out.fallback {
                    bail!("Diagram could not be rendered: {err}");
                }
            }
        }
    }
    Ok(())
}
