// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! View command - launches the interactive UI

use super::Context;
use crate::tui;
use anyhow::Result;

/// Run the TUI, optionally reopening the stored session
pub async fn run(ctx: &Context, resume: bool) -> Result<()> {
    let backend = ctx.backend()?;
    let store = ctx.open_store()?;
    tui::run(backend, store, ctx.settings.poll_interval(), resume).await
}
