// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Generate command - submits a repository and prints its diagram

use super::{print_diagram, status, Context};
use crate::backend::DiagramBackend;
use crate::session::SessionStore;
use crate::types::ProcessingStatus;
use crate::views::{SubmissionView, GENERATE_FAILED};
use anyhow::{bail, Result};
use tracing::info;

/// Request a diagram for `url`, store it and print it
pub async fn run(ctx: &Context, url: &str, wait: bool, ephemeral: bool) -> Result<()> {
    let mut store = if ephemeral {
        SessionStore::in_memory()
    } else {
        ctx.open_store()?
    };
    let backend = ctx.backend()?;

    let mut view = SubmissionView::new();
    view.set_input(url);
    let repo = view.begin_submit()?;
    info!("Requesting diagram for {} from {}", repo, backend.base_url());

    let outcome = backend.generate_diagram(&repo).await;
    if let Ok(response) = &outcome {
        info!(
            kind = response.diagram_type.as_deref().unwrap_or("unknown"),
            version = response.version.as_deref().unwrap_or("unknown"),
            timestamp = response.timestamp.as_deref().unwrap_or("unknown"),
            "diagram received"
        );
    }

    let Some(handoff) = view.finish_submit(repo, outcome, &mut store) else {
        bail!("{}", view.alert().unwrap_or(GENERATE_FAILED));
    };
    print_diagram(ctx, &handoff.diagram);
    if let Some(path) = store.path() {
        info!("Session saved to {}", path.display());
    }

    if wait {
        if let Some(repo) = handoff.repo {
            if status::follow(ctx, backend, repo).await? == ProcessingStatus::Failed {
                bail!("Repository processing failed");
            }
        }
    }
    Ok(())
}
