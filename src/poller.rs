// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Processing status poller
//!
//! One tokio task per handle. Each tick awaits its status request before the
//! next tick is taken, so there is never more than one request in flight.
//! The task ends on its own after a terminal status and is aborted when the
//! handle is stopped or dropped.

use crate::backend::DiagramBackend;
use crate::types::{ProcessingStatus, RepositoryReference};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Handle to a running status poll
#[derive(Debug)]
pub struct StatusPoller {
    repo: RepositoryReference,
    task: Option<JoinHandle<()>>,
    updates: watch::Receiver<ProcessingStatus>,
}

impl StatusPoller {
    /// Spawn a poll for `repo`, first querying one `interval` from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<B>(backend: Arc<B>, repo: RepositoryReference, interval: Duration) -> Self
    where
        B: DiagramBackend + 'static,
    {
        let (tx, updates) = watch::channel(ProcessingStatus::Unknown);
        info!(repo = %repo, ?interval, "starting status poll");
        let task = tokio::spawn(poll_loop(backend, repo.clone(), interval, tx));

        Self {
            repo,
            task: Some(task),
            updates,
        }
    }

    /// Repository being polled
    #[must_use]
    pub fn repo(&self) -> &RepositoryReference {
        &self.repo
    }

    /// Latest observed status
    #[must_use]
    pub fn status(&self) -> ProcessingStatus {
        self.updates.borrow().clone()
    }

    /// Receiver that is notified on every adopted status
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ProcessingStatus> {
        self.updates.clone()
    }

    /// True while the poll task is alive
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Cancel the poll, including any request in flight. Idempotent.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                debug!(repo = %self.repo, "stopping status poll");
            }
            task.abort();
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop<B>(
    backend: Arc<B>,
    repo: RepositoryReference,
    period: Duration,
    tx: watch::Sender<ProcessingStatus>,
) where
    B: DiagramBackend + 'static,
{
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let status = match backend.processing_status(&repo).await {
            Ok(status) => status,
            Err(err) => {
                warn!(repo = %repo, %err, "status poll failed, retrying on next tick");
                continue;
            }
        };

        debug!(repo = %repo, %status, "status poll");
        tx.send_replace(status.clone());

        match status {
            ProcessingStatus::Completed => {
                info!(repo = %repo, "processing completed");
                break;
            }
            ProcessingStatus::Failed => {
                error!(repo = %repo, "processing failed");
                break;
            }
            _ => {}
        }
    }
}
