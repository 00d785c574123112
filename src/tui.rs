// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Terminal user interface
//!
//! Two screens, submission and result, backed by the view models in
//! [`crate::views`]. Backend requests run as spawned tasks and are collected
//! on each frame, so the screen keeps redrawing while they are in flight.

use crate::backend::{DiagramBackend, DiagramResponse};
use crate::error::ClientError;
use crate::session::SessionStore;
use crate::types::{DiagramDescription, ProcessingStatus, RepositoryReference};
use crate::views::{ResultView, SubmissionView};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Wrap};
use ratatui::{DefaultTerminal, Frame};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

const TICK: Duration = Duration::from_millis(50);
const ACCENT: Color = Color::Cyan;
const MUTED: Color = Color::DarkGray;

/// Request in flight, owned by the screen that issued it
enum Pending {
    Generate(
        RepositoryReference,
        JoinHandle<Result<DiagramResponse, ClientError>>,
    ),
    Ask(JoinHandle<Result<DiagramDescription, ClientError>>),
}

impl Pending {
    fn is_finished(&self) -> bool {
        match self {
            Self::Generate(_, handle) => handle.is_finished(),
            Self::Ask(handle) => handle.is_finished(),
        }
    }

    fn abort(&self) {
        match self {
            Self::Generate(_, handle) => handle.abort(),
            Self::Ask(handle) => handle.abort(),
        }
    }
}

async fn join<T>(
    endpoint: &'static str,
    handle: JoinHandle<Result<T, ClientError>>,
) -> Result<T, ClientError> {
    handle.await.unwrap_or_else(|err| {
        Err(ClientError::Network {
            endpoint,
            message: err.to_string(),
        })
    })
}

/// Application state
pub struct App<B> {
    backend: Arc<B>,
    store: SessionStore,
    poll_interval: Duration,
    submission: SubmissionView,
    result: Option<ResultView>,
    pending: Option<Pending>,
    scroll: (u16, u16),
    should_quit: bool,
}

impl<B: DiagramBackend + 'static> App<B> {
    /// Start at the submission screen
    pub fn new(backend: Arc<B>, store: SessionStore, poll_interval: Duration) -> Self {
        Self {
            backend,
            store,
            poll_interval,
            submission: SubmissionView::new(),
            result: None,
            pending: None,
            scroll: (0, 0),
            should_quit: false,
        }
    }

    /// Open the result screen for the stored session, if there is one.
    /// Returns false when nothing was stored.
    pub fn resume(&mut self) -> bool {
        let Some(handoff) = self.store.load_handoff() else {
            return false;
        };
        if let Some(repo) = &handoff.repo {
            self.submission.set_input(repo.as_str());
        }
        info!("resuming stored session");
        self.result = Some(ResultView::load(
            self.backend.clone(),
            handoff,
            self.poll_interval,
        ));
        true
    }

    /// True once the user asked to leave
    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Collect finished requests and adopt new statuses
    pub async fn update(&mut self) {
        if self.pending.as_ref().is_some_and(Pending::is_finished) {
            match self.pending.take() {
                Some(Pending::Generate(repo, handle)) => {
                    let outcome = join("generate_diagram", handle).await;
                    if let Some(handoff) =
                        self.submission.finish_submit(repo, outcome, &mut self.store)
                    {
                        self.scroll = (0, 0);
                        self.result = Some(ResultView::load(
                            self.backend.clone(),
                            handoff,
                            self.poll_interval,
                        ));
                    }
                }
                Some(Pending::Ask(handle)) => {
                    let outcome = join("ask_question", handle).await;
                    if let Some(view) = self.result.as_mut() {
                        if view.finish_ask(outcome, &mut self.store) {
                            self.scroll = (0, 0);
                        }
                    }
                }
                None => {}
            }
        }

        if let Some(view) = self.result.as_mut() {
            view.sync_status();
        }
    }

    fn alert_active(&self) -> bool {
        match &self.result {
            Some(view) => view.alert().is_some(),
            None => self.submission.alert().is_some(),
        }
    }

    fn dismiss_alert(&mut self) {
        match self.result.as_mut() {
            Some(view) => view.dismiss_alert(),
            None => self.submission.dismiss_alert(),
        }
    }

    /// Apply one key press
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.alert_active() {
            self.dismiss_alert();
            return;
        }
        if self.result.is_some() {
            self.handle_result_key(key.code);
        } else {
            self.handle_submission_key(key.code);
        }
    }

    fn handle_submission_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter => {
                let Ok(repo) = self.submission.begin_submit() else {
                    return;
                };
                debug!(repo = %repo, "submitting");
                let backend = self.backend.clone();
                let request = repo.clone();
                let handle = tokio::spawn(async move { backend.generate_diagram(&request).await });
                self.pending = Some(Pending::Generate(repo, handle));
            }
            KeyCode::Backspace if self.submission.submit_enabled() => {
                self.submission.input_mut().pop();
            }
            KeyCode::Char(c) if self.submission.submit_enabled() => {
                self.submission.input_mut().push(c);
            }
            _ => {}
        }
    }

    fn handle_result_key(&mut self, code: KeyCode) {
        if code == KeyCode::Esc {
            self.back_to_submission();
            return;
        }
        let Some(view) = self.result.as_mut() else {
            return;
        };
        match code {
            KeyCode::Enter => {
                let Ok(question) = view.begin_ask() else {
                    return;
                };
                let backend = self.backend.clone();
                let handle = tokio::spawn(async move { backend.ask_question(&question).await });
                self.pending = Some(Pending::Ask(handle));
            }
            KeyCode::Backspace if view.input_enabled() => {
                view.question_mut().pop();
            }
            KeyCode::Char(c) if view.input_enabled() => view.question_mut().push(c),
            KeyCode::Up => self.scroll.0 = self.scroll.0.saturating_sub(1),
            KeyCode::Down => self.scroll.0 = self.scroll.0.saturating_add(1),
            KeyCode::Left => self.scroll.1 = self.scroll.1.saturating_sub(2),
            KeyCode::Right => self.scroll.1 = self.scroll.1.saturating_add(2),
            KeyCode::PageUp => self.scroll.0 = self.scroll.0.saturating_sub(10),
            KeyCode::PageDown => self.scroll.0 = self.scroll.0.saturating_add(10),
            KeyCode::Home => self.scroll = (0, 0),
            _ => {}
        }
    }

    fn back_to_submission(&mut self) {
        if let Some(Pending::Ask(handle)) = &self.pending {
            handle.abort();
            self.pending = None;
        }
        if let Some(mut view) = self.result.take() {
            view.teardown();
        }
        self.scroll = (0, 0);
    }

    /// Draw the current screen
    pub fn draw(&self, frame: &mut Frame<'_>) {
        let area = frame.area();
        let alert = match &self.result {
            Some(view) => {
                draw_result(frame, area, view, self.scroll);
                view.alert()
            }
            None => {
                draw_submission(frame, area, &self.submission);
                self.submission.alert()
            }
        };
        if let Some(text) = alert {
            draw_alert(frame, area, text);
        }
    }
}

impl<B> Drop for App<B> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

fn footer(keys: &[(&str, &str)]) -> Line<'static> {
    let mut spans = Vec::new();
    for (key, label) in keys {
        spans.push(Span::styled(format!(" {key} "), Style::default().fg(ACCENT)));
        spans.push(Span::styled(format!("{label}  "), Style::default().fg(MUTED)));
    }
    Line::from(spans)
}

fn draw_submission(frame: &mut Frame<'_>, area: Rect, view: &SubmissionView) {
    let [title, input, hint, _, keys] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    frame.render_widget(
        Paragraph::new("Visualize a repository".bold().fg(ACCENT)),
        title,
    );

    let input_style = if view.submit_enabled() {
        Style::default()
    } else {
        Style::default().fg(MUTED)
    };
    frame.render_widget(
        Paragraph::new(view.input())
            .style(input_style)
            .block(Block::bordered().title(" Repository URL ")),
        input,
    );

    let label = view.submit_label();
    let hint_line = if view.is_loading() {
        Line::from(label.yellow())
    } else {
        Line::from(vec![" Enter ".fg(ACCENT), label.into()])
    };
    frame.render_widget(Paragraph::new(hint_line), hint);
    frame.render_widget(
        Paragraph::new(footer(&[("Enter", "submit"), ("Esc", "quit")])),
        keys,
    );
}

fn status_span(status: &ProcessingStatus) -> Span<'static> {
    let text = status.to_string();
    match status {
        ProcessingStatus::Completed => text.green(),
        ProcessingStatus::Failed => text.red(),
        ProcessingStatus::InProgress(_) => text.yellow(),
        ProcessingStatus::Unknown => text.fg(MUTED),
    }
}

fn draw_result(frame: &mut Frame<'_>, area: Rect, view: &ResultView, scroll: (u16, u16)) {
    let [diagram, status, question, keys] = Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    let mut title = String::from(" Diagram ");
    if let Some(rendered) = view.rendered() {
        if rendered.is_fallback() {
            title = String::from(" Diagram (raw) ");
        }
    }
    frame.render_widget(
        Paragraph::new(view.display_text())
            .scroll(scroll)
            .block(Block::bordered().title(title)),
        diagram,
    );

    let mut spans = vec![Span::raw(" Status: "), status_span(view.status())];
    if let Some(repo) = view.repo() {
        spans.push(Span::styled(format!("  {repo}"), Style::default().fg(MUTED)));
    }
    if !view.questions_enabled() {
        spans.push(Span::styled(
            "  questions open once processing completes",
            Style::default().fg(MUTED),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), status);

    let (label, style) = if view.is_asking() {
        (" Ask a question - Loading... ", Style::default().fg(MUTED))
    } else {
        (" Ask a question ", Style::default())
    };
    frame.render_widget(
        Paragraph::new(view.question())
            .style(style)
            .block(Block::bordered().title(label)),
        question,
    );

    frame.render_widget(
        Paragraph::new(footer(&[
            ("Enter", "ask"),
            ("↑↓←→", "scroll"),
            ("Esc", "back"),
            ("Ctrl-C", "quit"),
        ])),
        keys,
    );
}

fn draw_alert(frame: &mut Frame<'_>, area: Rect, text: &str) {
    let [row] = Layout::vertical([Constraint::Length(7)])
        .flex(Flex::Center)
        .areas(area);
    let [popup] = Layout::horizontal([Constraint::Percentage(60)])
        .flex(Flex::Center)
        .areas(row);

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(text)
            .wrap(Wrap { trim: true })
            .block(
                Block::bordered()
                    .title(" Alert ")
                    .title_bottom(" press any key ")
                    .border_style(Style::default().fg(Color::Red)),
            ),
        popup,
    );
}

/// Run the interactive UI until the user quits
pub async fn run<B: DiagramBackend + 'static>(
    backend: Arc<B>,
    store: SessionStore,
    poll_interval: Duration,
    resume: bool,
) -> Result<()> {
    let mut app = App::new(backend, store, poll_interval);
    if resume && !app.resume() {
        info!("no stored session to resume");
    }

    let mut terminal = ratatui::init();
    let outcome = event_loop(&mut terminal, &mut app).await;
    ratatui::restore();
    outcome
}

async fn event_loop<B: DiagramBackend + 'static>(
    terminal: &mut DefaultTerminal,
    app: &mut App<B>,
) -> Result<()> {
    while !app.should_quit() {
        app.update().await;
        terminal.draw(|frame| app.draw(frame))?;

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }
    }
    Ok(())
}
