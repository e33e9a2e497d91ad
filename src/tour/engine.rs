//! Tour engine: the state machine that runs one guided tour at a time.
//!
//! ```text
//! Idle ──Start(g)──▶ Running(g) ──Finish(g)──▶ Idle
//!                     │  ▲
//!                Next │  │ Back
//!                     ▼  │
//!                  step cursor
//! ```
//!
//! Signals arrive on the injected [`TourEventBus`] and are handled strictly
//! one at a time. Every failure is logged and dropped; nothing a signal
//! does can take the host down.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::Receiver;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{ClosePolicy, ConcurrentStartPolicy, TourConfig};
use crate::error::TourError;
use crate::host::{TourHost, UiHandle};

use super::anchor::AnchorResolver;
use super::bus::{TourEventBus, TourSignal};
use super::factory::{MaterializedGuide, StepFactory};
use super::model::StepType;
use super::notifier::CompletionNotifier;
use super::registry::TourRegistry;
use super::step::PresentableStep;

/// One step shown during a run.
#[derive(Debug, Clone, Serialize)]
pub struct StepVisit {
    pub step: String,
    pub index: usize,
    pub presented_at: DateTime<Utc>,
}

/// Per-run state of an active tour. Created fresh on every start.
#[derive(Debug, Clone, Serialize)]
pub struct TourRun {
    pub id: Uuid,
    pub guide: String,
    /// Index of the current step in the materialized guide.
    pub cursor: usize,
    /// Whether the step at `cursor` is on screen.
    pub presented: bool,
    pub started_at: DateTime<Utc>,
    pub visited: Vec<StepVisit>,
}

impl TourRun {
    fn new(guide: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            guide: guide.to_string(),
            cursor: 0,
            presented: false,
            started_at: Utc::now(),
            visited: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TourState {
    #[default]
    Idle,
    Running(TourRun),
}

impl TourState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running(_))
    }
}

/// Snapshot of the engine for status displays.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TourStatus {
    pub active_guide: Option<String>,
    pub run_id: Option<Uuid>,
    pub current_step: Option<String>,
    /// 1-based position of the current step.
    pub position: Option<usize>,
    pub total_steps: Option<usize>,
    pub background_visible: bool,
    pub available: Vec<String>,
}

/// Receives a fresh [`TourStatus`] after every handled signal.
pub type StatusWatcher = watch::Receiver<TourStatus>;

/// Runs guided tours in response to [`TourSignal`]s.
///
/// Owns the materialized guides and one receiver on the bus. At most one
/// tour runs at a time.
pub struct TourEngine {
    config: TourConfig,
    registry: Arc<TourRegistry>,
    guides: HashMap<String, MaterializedGuide>,
    host: TourHost,
    bus: TourEventBus,
    inbox: Receiver<TourSignal>,
    notifier: CompletionNotifier,
    state: TourState,
    background_visible: bool,
    last_run: Option<TourRun>,
    status_tx: watch::Sender<TourStatus>,
}

impl TourEngine {
    /// Build an engine and materialize every registered guide.
    pub fn new(
        config: TourConfig,
        registry: Arc<TourRegistry>,
        host: TourHost,
        bus: TourEventBus,
    ) -> Self {
        let guides = materialize_all(&config, &registry, &host);
        let inbox = bus.subscribe();
        let notifier = CompletionNotifier::new(&config, bus.clone(), host.clone());

        info!(
            guides = guides.len(),
            close_policy = ?config.close_policy,
            "Tour engine ready"
        );

        let (status_tx, _) = watch::channel(TourStatus::default());
        let engine = Self {
            config,
            registry,
            guides,
            host,
            bus,
            inbox,
            notifier,
            state: TourState::Idle,
            background_visible: false,
            last_run: None,
            status_tx,
        };
        engine.publish_status();
        engine
    }

    /// Ask for `guide` to start. Takes effect when the signal is handled.
    pub fn launch_tour(&self, guide: &str) {
        self.bus.start_tour(guide);
    }

    pub fn bus(&self) -> &TourEventBus {
        &self.bus
    }

    pub fn state(&self) -> &TourState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_running()
    }

    pub fn active_guide(&self) -> Option<&str> {
        match &self.state {
            TourState::Running(run) => Some(&run.guide),
            TourState::Idle => None,
        }
    }

    pub fn background_visible(&self) -> bool {
        self.background_visible
    }

    /// The step on screen, if any.
    pub fn current_step(&self) -> Option<&PresentableStep> {
        let TourState::Running(run) = &self.state else {
            return None;
        };
        if !run.presented {
            return None;
        }
        self.guides.get(&run.guide)?.steps.get(run.cursor)
    }

    pub fn guide(&self, name: &str) -> Option<&MaterializedGuide> {
        self.guides.get(name)
    }

    /// The most recently finished run.
    pub fn last_run(&self) -> Option<&TourRun> {
        self.last_run.as_ref()
    }

    pub fn status(&self) -> TourStatus {
        let run = match &self.state {
            TourState::Running(run) => Some(run),
            TourState::Idle => None,
        };
        TourStatus {
            active_guide: run.map(|r| r.guide.clone()),
            run_id: run.map(|r| r.id),
            current_step: self.current_step().map(|s| s.name.clone()),
            position: self.current_step().and(run).map(|r| r.cursor + 1),
            total_steps: run.and_then(|r| self.guides.get(&r.guide)).map(|g| g.len()),
            background_visible: self.background_visible,
            available: self
                .registry
                .names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    /// Follow the engine's status from another task.
    pub fn watch_status(&self) -> StatusWatcher {
        self.status_tx.subscribe()
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(self.status());
    }

    // ── Dispatch ────────────────────────────────────────────────────

    /// Handle one signal. Errors are logged, never returned.
    pub fn handle(&mut self, signal: TourSignal) {
        let result = match &signal {
            TourSignal::Start { guide } => self.start(guide),
            TourSignal::Finish { guide } => self.finish(guide),
            TourSignal::Next { guide } => self.next(guide),
            TourSignal::Back { guide } => self.back(guide),
            TourSignal::StepClosed { step, step_type } => self.step_closed(step, step_type),
        };

        if let Err(e) = result {
            match e {
                TourError::AlreadyRunning { .. } => warn!(error = %e, "Tour start rejected"),
                _ => debug!(?signal, error = %e, "Tour signal ignored"),
            }
        }
        self.publish_status();
    }

    /// Handle every signal already queued, including the ones handling them
    /// publishes. Returns how many were handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.inbox.try_recv() {
                Ok(signal) => {
                    self.handle(signal);
                    handled += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Tour engine lagged behind the bus");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        handled
    }

    /// Handle signals until `shutdown` resolves. Returns the engine so its
    /// final state can be inspected.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Self {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!("Tour engine shutting down");
                    break;
                }
                received = self.inbox.recv() => match received {
                    Ok(signal) => self.handle(signal),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Tour engine lagged behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        self
    }

    /// Run the engine on its own task.
    pub fn spawn(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> tokio::task::JoinHandle<Self> {
        tokio::spawn(self.run(shutdown))
    }

    // ── Transitions ─────────────────────────────────────────────────

    /// Idle → Running(guide), presenting the first step.
    pub fn start(&mut self, guide: &str) -> Result<(), TourError> {
        let Some(steps) = self.guides.get(guide).map(|g| g.len()) else {
            return Err(TourError::GuideNotFound {
                name: guide.to_string(),
            });
        };

        if let TourState::Running(run) = &self.state {
            let active = run.guide.clone();
            if active == guide || self.config.concurrent_start == ConcurrentStartPolicy::Reject {
                return Err(TourError::AlreadyRunning {
                    active,
                    requested: guide.to_string(),
                });
            }
            info!(active = %active, requested = guide, "Replacing running tour");
            self.teardown();
            // Arrives after the new run has started, so the engine ignores it.
            self.bus.finish_tour(&active);
        }

        self.set_background(true);
        let run = TourRun::new(guide);
        info!(guide, run_id = %run.id, steps, "Tour started");
        self.state = TourState::Running(run);

        if !self.present_current() {
            warn!(guide, "Guide has no steps to present");
            self.bus.finish_tour(guide);
        }
        Ok(())
    }

    /// Running(guide) → Idle. A no-op for any other guide or when idle.
    pub fn finish(&mut self, guide: &str) -> Result<(), TourError> {
        self.run_mut(guide)?;
        self.teardown();
        Ok(())
    }

    /// Move to the next step; past the last one the tour finishes.
    pub fn next(&mut self, guide: &str) -> Result<(), TourError> {
        self.run_mut(guide)?;
        let steps = self.step_count(guide);
        self.dismiss_current();

        let run = self.run_mut(guide)?;
        if run.cursor + 1 < steps {
            run.cursor += 1;
            self.present_current();
        } else {
            info!(guide, "Last step passed");
            self.bus.finish_tour(guide);
        }
        Ok(())
    }

    /// Move back one step. Nothing happens on the first step.
    pub fn back(&mut self, guide: &str) -> Result<(), TourError> {
        if self.run_mut(guide)?.cursor == 0 {
            debug!(guide, "Already on the first step");
            return Ok(());
        }
        self.dismiss_current();
        self.run_mut(guide)?.cursor -= 1;
        self.present_current();
        Ok(())
    }

    /// The user closed the popup of the current step.
    pub fn step_closed(&mut self, step: &str, step_type: &StepType) -> Result<(), TourError> {
        let TourState::Running(run) = &mut self.state else {
            return Err(TourError::NotRunning);
        };
        let steps = self.guides.get(&run.guide).map(|g| g.steps.as_slice()).unwrap_or_default();
        let current = steps.get(run.cursor).filter(|_| run.presented);
        if current.is_none_or(|s| s.name != step || &s.step_type() != step_type) {
            return Err(TourError::StepMismatch {
                step: step.to_string(),
                current: current.map(|s| s.name.clone()).unwrap_or_default(),
            });
        }

        // The host already took the popup down.
        run.presented = false;
        let guide = run.guide.clone();
        let has_next = run.cursor + 1 < steps.len();

        match self.config.close_policy {
            ClosePolicy::Advance if has_next => {
                run.cursor += 1;
                self.present_current();
            }
            ClosePolicy::Advance | ClosePolicy::EndTour => {
                self.notifier.step_closed(&guide, step, step_type);
            }
        }
        Ok(())
    }

    // ── Helpers ─────────────────────────────────────────────────────

    /// The run for `guide`, if `guide` is the one running.
    fn run_mut(&mut self, guide: &str) -> Result<&mut TourRun, TourError> {
        match &mut self.state {
            TourState::Running(run) if run.guide == guide => Ok(run),
            _ if self.guides.contains_key(guide) => Err(TourError::NotRunning),
            _ => Err(TourError::GuideNotFound {
                name: guide.to_string(),
            }),
        }
    }

    fn step_count(&self, guide: &str) -> usize {
        self.guides.get(guide).map_or(0, |g| g.len())
    }

    /// Show the step under the cursor. `false` if there is none.
    fn present_current(&mut self) -> bool {
        let TourState::Running(run) = &mut self.state else {
            return false;
        };
        let Some(step) = self
            .guides
            .get(&run.guide)
            .and_then(|g| g.steps.get(run.cursor))
        else {
            return false;
        };

        debug!(guide = %run.guide, step = %step.name, index = run.cursor, "Presenting step");
        self.host.overlay.present_step(step);
        run.presented = true;
        run.visited.push(StepVisit {
            step: step.name.clone(),
            index: run.cursor,
            presented_at: Utc::now(),
        });
        true
    }

    fn dismiss_current(&mut self) {
        let TourState::Running(run) = &mut self.state else {
            return;
        };
        if !run.presented {
            return;
        }
        run.presented = false;
        if let Some(step) = self
            .guides
            .get(&run.guide)
            .and_then(|g| g.steps.get(run.cursor))
        {
            self.host.overlay.dismiss_step(step);
        }
    }

    fn set_background(&mut self, visible: bool) {
        self.background_visible = visible;
        self.host.overlay.set_background_visible(visible);
    }

    /// Running → Idle, whatever the guide.
    fn teardown(&mut self) {
        self.dismiss_current();
        self.set_background(false);
        if let TourState::Running(run) = std::mem::take(&mut self.state) {
            let elapsed = Utc::now() - run.started_at;
            info!(
                guide = %run.guide,
                run_id = %run.id,
                steps_seen = run.visited.len(),
                elapsed_ms = elapsed.num_milliseconds(),
                "Tour finished"
            );
            self.last_run = Some(run);
        }
    }
}

/// Materialize the first guide registered under each name.
fn materialize_all(
    config: &TourConfig,
    registry: &TourRegistry,
    host: &TourHost,
) -> HashMap<String, MaterializedGuide> {
    let anchors = AnchorResolver::new(
        host.locator.as_ref(),
        UiHandle::new(config.root_element.as_str()),
    );
    let factory = StepFactory::new(
        host.texts.as_ref(),
        host.preferences.as_ref(),
        config.survey_content_width,
    );

    registry
        .names()
        .into_iter()
        .filter_map(|name| registry.get(name))
        .map(|guide| {
            let materialized = factory.materialize_guide(guide, &anchors);
            if materialized.len() < guide.steps.len() {
                warn!(
                    guide = %guide.name,
                    dropped = guide.steps.len() - materialized.len(),
                    "Guide lost unsupported steps"
                );
            }
            (guide.name.clone(), materialized)
        })
        .collect()
}
