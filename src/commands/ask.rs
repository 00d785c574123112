// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Ask command - follow-up question about the stored diagram

use super::{print_diagram, Context};
use crate::backend::DiagramBackend;
use crate::error::ClientError;
use crate::views::{ResultView, ASK_FAILED};
use anyhow::{bail, Context as _, Result};

/// Ask `question` about the stored session, printing and storing the answer
pub async fn run(ctx: &Context, question: &str) -> Result<()> {
    let mut store = ctx.open_store()?;
    let handoff = store
        .load_handoff()
        .context("No stored diagram. Run `repoviz generate <url>` first")?;
    let repo = handoff
        .repo
        .clone()
        .context("The stored diagram has no repository to ask about")?;
    let backend = ctx.backend()?;

    let status = backend
        .processing_status(&repo)
        .await
        .with_context(|| format!("Failed to query status of {repo}"))?;

    let mut view = ResultView::load(backend.clone(), handoff, ctx.settings.poll_interval());
    view.apply_status(status);
    view.set_question(question);

    let question = match view.begin_ask() {
        Ok(question) => question,
        Err(ClientError::Validation(_)) => bail!("Question is empty"),
        Err(err) => return Err(err.into()),
    };
    let outcome = backend.ask_question(&question).await;
    if !view.finish_ask(outcome, &mut store) {
        bail!("{}", view.alert().unwrap_or(ASK_FAILED));
    }

    print_diagram(ctx, view.diagram());
    Ok(())
}
