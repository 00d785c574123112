// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Invariant tests for the views, the poller and the renderer
//!
//! These tests verify critical invariants:
//! 1. Request discipline - one generation per valid submit, none otherwise
//! 2. Status gating - questions only after processing completed
//! 3. Poll lifetime - polling ends on a terminal status or teardown
//! 4. Display safety - unrenderable text is shown escaped, never dropped

use proptest::prelude::*;
use repoviz::backend::{DiagramBackend, DiagramResponse};
use repoviz::error::ClientError;
use repoviz::render::{escape_raw, render_text, DiagramRenderer};
use repoviz::session::{SessionStore, DIAGRAM_KEY, REPO_KEY};
use repoviz::types::{
    DiagramDescription, Handoff, ProcessingStatus, Question, RepositoryReference,
};
use repoviz::views::{ResultView, SubmissionView};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time;

// =============================================================================
// Test Helpers
// =============================================================================

const INTERVAL: Duration = Duration::from_secs(3);

/// Backend answering from fixed scripts and counting every call
#[derive(Default)]
struct Scripted {
    diagram: String,
    statuses: Mutex<VecDeque<&'static str>>,
    generate_calls: AtomicUsize,
    status_calls: AtomicUsize,
    ask_calls: AtomicUsize,
}

impl Scripted {
    fn new(diagram: &str, statuses: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            diagram: diagram.to_string(),
            statuses: Mutex::new(statuses.iter().copied().collect()),
            ..Self::default()
        })
    }
}

impl DiagramBackend for Scripted {
    async fn generate_diagram(
        &self,
        _repo: &RepositoryReference,
    ) -> Result<DiagramResponse, ClientError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(DiagramResponse {
            diagram_code: self.diagram.clone(),
            diagram_type: None,
            version: None,
            timestamp: None,
        })
    }

    async fn processing_status(
        &self,
        _repo: &RepositoryReference,
    ) -> Result<ProcessingStatus, ClientError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut statuses = self.statuses.lock().unwrap();
        let wire = if statuses.len() > 1 {
            statuses.pop_front().unwrap_or_default()
        } else {
            statuses.front().copied().unwrap_or_default()
        };
        Ok(ProcessingStatus::from_wire(wire))
    }

    async fn ask_question(&self, _q: &Question) -> Result<DiagramDescription, ClientError> {
        self.ask_calls.fetch_add(1, Ordering::SeqCst);
        Ok(DiagramDescription::new("graph TD; Q-->R;"))
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap()
}

async fn submit(backend: &Arc<Scripted>, input: &str, store: &mut SessionStore) -> Option<Handoff> {
    let mut view = SubmissionView::new();
    view.set_input(input);
    view.submit(backend.as_ref(), store).await
}

/// Sleep to just past the next poll tick
async fn next_tick(first: bool) {
    let offset = if first { Duration::from_millis(100) } else { Duration::ZERO };
    time::sleep(INTERVAL + offset).await;
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_generated_diagram_reaches_view_and_store() {
    let backend = Scripted::new("graph TD; A-->B;", &["cloning"]);
    let mut store = SessionStore::in_memory();

    let handoff = submit(&backend, "github.com/acme/repo", &mut store).await.unwrap();
    let view = ResultView::load(backend.clone(), handoff, INTERVAL);

    assert_eq!(backend.generate_calls.load(Ordering::SeqCst), 1);
    assert_eq!(view.diagram().as_str(), "graph TD; A-->B;");
    assert_eq!(store.get(DIAGRAM_KEY), Some("graph TD; A-->B;"));
    assert_eq!(store.get(REPO_KEY), Some("github.com/acme/repo"));

    let text = view.display_text();
    let a = text.find("│ A │").unwrap();
    let b = text.find("│ B │").unwrap();
    assert!(a < b, "A is drawn above B");
}

#[tokio::test(start_paused = true)]
async fn test_questions_open_on_third_tick() {
    let backend = Scripted::new("graph TD; A-->B;", &["cloning", "analyzing", "completed"]);
    let mut store = SessionStore::in_memory();
    let handoff = submit(&backend, "github.com/acme/repo", &mut store).await.unwrap();
    let mut view = ResultView::load(backend.clone(), handoff, INTERVAL);
    view.set_question("What depends on B?");

    for tick in 1..=2 {
        next_tick(tick == 1).await;
        view.sync_status();
        assert!(!view.questions_enabled(), "closed after tick {tick}");
        assert!(!view.ask(backend.as_ref(), &mut store).await);
        view.dismiss_alert();
    }
    assert_eq!(backend.ask_calls.load(Ordering::SeqCst), 0);

    next_tick(false).await;
    view.sync_status();
    assert!(view.questions_enabled());
    assert!(view.ask(backend.as_ref(), &mut store).await);
    assert_eq!(backend.ask_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.get(DIAGRAM_KEY), Some("graph TD; Q-->R;"));

    // Polling never restarts once completed
    time::sleep(INTERVAL * 10).await;
    view.sync_status();
    assert_eq!(backend.status_calls.load(Ordering::SeqCst), 3);
    assert!(!view.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_failed_processing_stops_polling() {
    let backend = Scripted::new("graph TD; A-->B;", &["failed", "completed"]);
    let mut store = SessionStore::in_memory();
    let handoff = submit(&backend, "github.com/acme/repo", &mut store).await.unwrap();
    let mut view = ResultView::load(backend.clone(), handoff, INTERVAL);

    next_tick(true).await;
    view.sync_status();
    time::sleep(INTERVAL * 10).await;
    view.sync_status();

    assert_eq!(view.status(), &ProcessingStatus::Failed);
    assert_eq!(backend.status_calls.load(Ordering::SeqCst), 1);
    assert!(!view.questions_enabled());
}

#[tokio::test(start_paused = true)]
async fn test_dropping_view_stops_polling() {
    let backend = Scripted::new("graph TD; A-->B;", &["cloning"]);
    let mut store = SessionStore::in_memory();
    let handoff = submit(&backend, "github.com/acme/repo", &mut store).await.unwrap();
    let view = ResultView::load(backend.clone(), handoff, INTERVAL);

    next_tick(true).await;
    next_tick(false).await;
    drop(view);
    time::sleep(INTERVAL * 10).await;

    assert_eq!(backend.status_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_render_ids_are_unique() {
    let mut renderer = DiagramRenderer::default();
    let diagram = DiagramDescription::new("graph TD; A-->B;");
    let ids: HashSet<String> = (0..200).map(|_| renderer.render(&diagram).id.clone()).collect();
    assert_eq!(ids.len(), 200);
}

#[test]
fn test_scenario_render() {
    let text = render_text("graph TD; A-->B;").unwrap();
    let rows: Vec<&str> = text.lines().collect();
    let row_a = rows.iter().position(|r| r.contains("│ A │")).unwrap();
    let row_b = rows.iter().position(|r| r.contains("│ B │")).unwrap();
    assert!(row_a < row_b);
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_blank_input_makes_no_request(input in "[ \t\n\r]{0,12}") {
        let backend = Scripted::new("graph TD; A;", &["cloning"]);
        let mut store = SessionStore::in_memory();
        let handoff = runtime().block_on(submit(&backend, &input, &mut store));

        prop_assert!(handoff.is_none());
        prop_assert_eq!(backend.generate_calls.load(Ordering::SeqCst), 0);
        prop_assert!(store.get(DIAGRAM_KEY).is_none());
    }

    #[test]
    fn prop_valid_input_makes_one_request(
        pad in "[ \t]{0,3}",
        url in "[a-z]{1,10}\\.[a-z]{2,3}/[a-z0-9_-]{1,12}",
    ) {
        let backend = Scripted::new("graph TD; A;", &["cloning"]);
        let mut store = SessionStore::in_memory();
        let input = format!("{pad}{url}{pad}");
        let handoff = runtime().block_on(submit(&backend, &input, &mut store)).unwrap();

        prop_assert_eq!(backend.generate_calls.load(Ordering::SeqCst), 1);
        let repo = handoff.repo.unwrap();
        prop_assert_eq!(repo.as_str(), url.as_str());
    }

    #[test]
    fn prop_questions_gated_on_completed(
        wire in prop::sample::select(vec!["", "unknown", "cloning", "analyzing", "failed", "completed"]),
    ) {
        let status = ProcessingStatus::from_wire(wire);
        let backend = Scripted::new("graph TD; A;", &["cloning"]);
        let asked = runtime().block_on(async {
            let mut store = SessionStore::in_memory();
            let mut view = ResultView::load(
                backend.clone(),
                Handoff { diagram: DiagramDescription::new("graph TD; A;"), repo: None },
                INTERVAL,
            );
            view.apply_status(status.clone());
            view.set_question("why?");
            view.ask(backend.as_ref(), &mut store).await
        });

        let completed = status == ProcessingStatus::Completed;
        prop_assert_eq!(asked, completed);
        prop_assert_eq!(backend.ask_calls.load(Ordering::SeqCst), usize::from(completed));
    }

    #[test]
    fn prop_unrenderable_text_is_shown_escaped(body in "\\PC{0,40}", noise in "[\\x00-\\x1f]{0,4}") {
        let raw = format!("pie {body}{noise}");
        let mut renderer = DiagramRenderer::default();
        let out = renderer.render(&DiagramDescription::new(raw.clone()));

        prop_assert!(out.is_fallback());
        prop_assert!(!out.text.is_empty());
        prop_assert_eq!(&out.text, &escape_raw(&raw));
    }

    #[test]
    fn prop_escape_leaves_no_control_chars(raw in any::<String>()) {
        let escaped = escape_raw(&raw);
        prop_assert!(!escaped.chars().any(|c| c.is_control() && c != '\n' && c != '\t'));
    }

    #[test]
    fn prop_store_round_trip(key in "[a-zA-Z]{1,12}", value in any::<String>()) {
        let dir = TempDir::new().unwrap();
        let mut store = SessionStore::open(dir.path()).unwrap();
        store.set(&key, &value).unwrap();
        prop_assert_eq!(store.get(&key), Some(value.as_str()));

        let reopened = SessionStore::open(dir.path()).unwrap();
        prop_assert_eq!(reopened.get(&key), Some(value.as_str()));
    }
}
