// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Status command - queries or follows repository processing

use super::Context;
use crate::backend::DiagramBackend;
use crate::poller::StatusPoller;
use crate::types::{ProcessingStatus, RepositoryReference};
use anyhow::{bail, Context as _, Result};
use chrono::Local;
use std::sync::Arc;
use tracing::debug;

/// Query the status of `url`, or of the stored repository
pub async fn run(ctx: &Context, url: Option<String>, watch: bool) -> Result<()> {
    let repo = match url {
        Some(url) => RepositoryReference::parse(&url)?,
        None => ctx.open_store()?.repo().context(
            "No repository given and none stored. Pass a URL or run `repoviz generate` first",
        )?,
    };
    let backend = ctx.backend()?;

    if watch {
        let status = follow(ctx, backend, repo).await?;
        if status == ProcessingStatus::Failed {
            bail!("Repository processing failed");
        }
        return Ok(());
    }

    let status = backend
        .processing_status(&repo)
        .await
        .with_context(|| format!("Failed to query status of {repo}"))?;
    println!("{}: {}", repo, ctx.paint_status(&status));
    Ok(())
}

/// Poll until a terminal status, printing each change with a timestamp
pub(crate) async fn follow<B>(
    ctx: &Context,
    backend: Arc<B>,
    repo: RepositoryReference,
) -> Result<ProcessingStatus>
where
    B: DiagramBackend + 'static,
{
    let interval = ctx.settings.poll_interval();
    eprintln!("Waiting for {repo} (checking every {}s)", interval.as_secs());

    let poller = StatusPoller::start(backend, repo, interval);
    let mut updates = poller.subscribe();
    let mut last = ProcessingStatus::Unknown;

    while updates.changed().await.is_ok() {
        let status = updates.borrow_and_update().clone();
        if status != last {
            println!(
                "[{}] {}",
                Local::now().format("%H:%M:%S"),
                ctx.paint_status(&status)
            );
            last = status;
        }
        if last.is_terminal() {
            break;
        }
    }

    debug!(status = %last, "stopped following");
    Ok(last)
}
