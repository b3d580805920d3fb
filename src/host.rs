//! Async host loop.
//!
//! Owns the orchestrator and the menu board and drives both on a fixed tick.
//! UI events arrive on an unbounded channel; a cancellation token stops the
//! run from outside (operator console, Ctrl-C).

use std::time::Duration;

use diner_common::Phase;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::autopilot::Autopilot;
use crate::errors::OrchestratorError;
use crate::gate::{MenuBoard, UiEvent};
use crate::orchestrator::{Orchestrator, RunStatus};

/// Upper bound on the host's time scale.
pub const MAX_TIME_SCALE: f64 = 1_000.0;

/// Handles for talking to a running [`Host`].
#[derive(Debug, Clone)]
pub struct HostHandle {
    pub events: mpsc::UnboundedSender<UiEvent>,
    pub cancel: CancellationToken,
}

pub struct Host {
    orchestrator: Orchestrator,
    board: MenuBoard,
    events: mpsc::UnboundedReceiver<UiEvent>,
    cancel: CancellationToken,
    tick_period: Duration,
    time_scale: f64,
    autopilot: Option<Autopilot>,
}

impl Host {
    pub fn new(
        orchestrator: Orchestrator,
        board: MenuBoard,
        tick_period: Duration,
    ) -> (Self, HostHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let host = Self {
            orchestrator,
            board,
            events: rx,
            cancel: cancel.clone(),
            tick_period: tick_period.max(Duration::from_millis(1)),
            time_scale: 1.0,
            autopilot: None,
        };
        (host, HostHandle { events: tx, cancel })
    }

    /// Advance simulated time `scale` times faster than wall time.
    ///
    /// Non-positive or non-finite scales fall back to 1; large ones are
    /// capped at [`MAX_TIME_SCALE`].
    pub fn with_time_scale(mut self, scale: f64) -> Self {
        self.time_scale = if scale.is_finite() && scale > 0.0 {
            scale.min(MAX_TIME_SCALE)
        } else {
            1.0
        };
        self
    }

    pub fn with_autopilot(mut self, autopilot: Autopilot) -> Self {
        self.autopilot = Some(autopilot);
        self
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn board(&self) -> &MenuBoard {
        &self.board
    }

    /// Run one participant session to completion, failure or cancellation.
    pub async fn run(&mut self) -> Result<RunStatus, OrchestratorError> {
        self.orchestrator.start()?;
        self.board.sync();

        let mut interval = time::interval(self.tick_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = Instant::now();
        let mut phase: Option<Phase> = self.orchestrator.phase();

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    info!(stage = %self.orchestrator.stage(), "Run cancelled");
                    self.orchestrator.stop();
                    self.board.sync();
                    return Ok(RunStatus::Idle);
                }

                Some(event) = self.events.recv() => {
                    self.dispatch(event);
                }

                now = interval.tick() => {
                    let elapsed = now.saturating_duration_since(last);
                    last = now;

                    self.board.frame();
                    let scripted = match self.autopilot.as_mut() {
                        Some(pilot) => pilot.observe(&self.board),
                        None => Vec::new(),
                    };
                    for event in scripted {
                        self.dispatch(event);
                    }
                    self.orchestrator.tick(scaled(elapsed, self.time_scale))?;
                    self.board.sync();

                    let current = self.orchestrator.phase();
                    if current != phase && current.is_some() {
                        debug!(from = ?phase, to = ?current, "Host observed phase change");
                        phase = current;
                    }

                    match self.orchestrator.status() {
                        RunStatus::Running => {}
                        status => return Ok(status),
                    }
                }
            }
        }
    }

    fn dispatch(&mut self, event: UiEvent) {
        match event {
            UiEvent::Menu(menu) => {
                if !self.board.handle(menu.clone()) {
                    debug!(event = ?menu, "Menu event had no effect");
                }
            }
            UiEvent::SurveyOption(option) => {
                if let Err(e) = self.orchestrator.choose_option(option) {
                    warn!(option, error = %e, "Survey option not accepted");
                }
                self.board.sync();
            }
        }
    }
}

/// Wall-clock `elapsed` stretched by `scale`, saturating instead of overflowing.
fn scaled(elapsed: Duration, scale: f64) -> Duration {
    Duration::try_from_secs_f64(elapsed.as_secs_f64() * scale).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use diner_common::{Condition, Point, Session};
    use tempfile::TempDir;

    use super::*;
    use crate::config::DinerToml;
    use crate::cue::{CatalogCuePlayer, CueCatalog};
    use crate::gate::{self, MenuEvent};
    use crate::mover::SimulatedMover;
    use crate::record::CsvRecordWriter;
    use crate::session::SessionStore;

    fn host(dir: &TempDir) -> (Host, HostHandle) {
        let mut config = DinerToml::starter();
        config.session.record_file = dir.path().join("data.csv");
        let session = SessionStore::new(Session::new("4", Condition::new(2).unwrap(), 5));
        let mut orch = Orchestrator::new(&config, session);
        orch.attach_mover(SimulatedMover::new(Point::new(0.0, 0.0), 1.2, 0.3));
        orch.attach_cue_player(CatalogCuePlayer::new(
            CueCatalog::from_config(&config).unwrap(),
        ));
        let (board, gate) = gate::channel();
        orch.attach_gate(gate);
        orch.attach_record_sink(CsvRecordWriter::new());
        Host::new(orch, board, Duration::from_millis(20))
    }

    #[tokio::test(start_paused = true)]
    async fn test_autopilot_run_completes() {
        let dir = TempDir::new().unwrap();
        let (host, _handle) = host(&dir);
        let mut host = host
            .with_time_scale(4.0)
            .with_autopilot(Autopilot::new("Set2", vec![4, 3, 2, 1, 0]));

        let status = host.run().await.unwrap();
        assert_eq!(status, RunStatus::Completed);

        let content = std::fs::read_to_string(dir.path().join("data.csv")).unwrap();
        let row = content.lines().nth(1).unwrap();
        assert!(row.starts_with("4,2,Set2,4,3,2,1,0,"), "row: {}", row);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_the_run() {
        let dir = TempDir::new().unwrap();
        let (mut host, handle) = host(&dir);

        handle.cancel.cancel();
        let status = host.run().await.unwrap();
        assert_eq!(status, RunStatus::Idle);
        assert!(host.orchestrator().presentation().is_clear());
        assert!(!dir.path().join("data.csv").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_events_reach_the_board() {
        let dir = TempDir::new().unwrap();
        let (host, handle) = host(&dir);
        let mut host = host.with_time_scale(8.0);

        let cancel = handle.cancel.clone();
        let events = handle.events.clone();
        let driver = tokio::spawn(async move {
            // Long enough for the greeting to put the menu up.
            time::sleep(Duration::from_secs(3)).await;
            events.send(UiEvent::Menu(MenuEvent::OrderNow)).unwrap();
            time::sleep(Duration::from_secs(10)).await;
            cancel.cancel();
        });

        let status = host.run().await.unwrap();
        driver.await.unwrap();
        assert_eq!(status, RunStatus::Idle);
        assert!(host.board().flags().order_now_clicked);
        assert_eq!(host.orchestrator().stage(), crate::orchestrator::Stage::Idle);
    }

    #[test]
    fn test_time_scale_is_clamped() {
        let dir = TempDir::new().unwrap();
        let (host, _handle) = host(&dir);
        let host = host.with_time_scale(1e300);
        assert_eq!(host.time_scale, MAX_TIME_SCALE);
        let host = host.with_time_scale(f64::NAN);
        assert_eq!(host.time_scale, 1.0);
    }

    #[test]
    fn test_scaled_saturates_on_overflow() {
        assert_eq!(
            scaled(Duration::from_millis(100), 4.0),
            Duration::from_millis(400)
        );
        assert_eq!(scaled(Duration::from_millis(16), 1e300), Duration::MAX);
        assert_eq!(scaled(Duration::ZERO, 1e300), Duration::ZERO);
    }
}
