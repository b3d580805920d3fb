use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use diner_common::{ConditionProfile, Phase, Point};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{DinerToml, SceneSection, TimingSection};
use crate::cue::CuePlayer;
use crate::errors::{GateError, OrchestratorError, SurveyError};
use crate::gate::{GateFlag, PanelId, UiGate};
use crate::mover::Mover;
use crate::record::{self, RecordSink};
use crate::session::SessionStore;
use crate::survey::{SurveyContext, SurveyProgress, SurveySequencer};

use super::Presentation;
use super::movement::{LegEnv, PoseTarget, TurnDirection, WalkLeg};
use super::speech::SpeechStep;
use super::stage::{Countdown, Route, Stage, Step};

/// Lifecycle of the main sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Idle => "idle",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A step that spans more than one tick.
#[derive(Debug)]
enum ActiveStep {
    Delay(Countdown),
    Walk(WalkLeg),
    Speak(SpeechStep),
    AwaitFlag(GateFlag),
    AwaitSurvey,
}

fn gate_unavailable(stage: Stage) -> OrchestratorError {
    OrchestratorError::GateUnavailable {
        stage: stage.to_string(),
    }
}

/// Drives the four-phase sequence.
///
/// Collaborators are attached after construction. The mover, cue player and
/// UI gate must all be present for [`start`](Self::start); the record sink is
/// optional (a run without one is logged and not persisted).
pub struct Orchestrator {
    timing: TimingSection,
    scene: SceneSection,
    record_path: PathBuf,
    mover: Option<Box<dyn Mover>>,
    cues: Option<Box<dyn CuePlayer>>,
    gate: Option<Box<dyn UiGate>>,
    records: Option<Box<dyn RecordSink>>,
    session: SessionStore,
    survey: SurveySequencer,
    status: RunStatus,
    stage: Stage,
    steps: VecDeque<Step>,
    active: Option<ActiveStep>,
    presentation: Presentation,
    origin: Option<Point>,
    profile: Option<ConditionProfile>,
    manual: Option<WalkLeg>,
}

impl Orchestrator {
    pub fn new(config: &DinerToml, session: SessionStore) -> Self {
        Self {
            timing: config.timing.clone(),
            scene: config.scene.clone(),
            record_path: config.record_file(),
            mover: None,
            cues: None,
            gate: None,
            records: None,
            session,
            survey: SurveySequencer::new(
                config.survey.questions,
                config.survey.options_per_question,
            ),
            status: RunStatus::Idle,
            stage: Stage::Idle,
            steps: VecDeque::new(),
            active: None,
            presentation: Presentation::default(),
            origin: None,
            profile: None,
            manual: None,
        }
    }

    pub fn attach_mover(&mut self, mover: impl Mover + 'static) {
        self.mover = Some(Box::new(mover));
    }

    pub fn attach_cue_player(&mut self, player: impl CuePlayer + 'static) {
        self.cues = Some(Box::new(player));
    }

    /// Remove the cue player. A running sequence continues with zero-length cues.
    pub fn detach_cue_player(&mut self) -> Option<Box<dyn CuePlayer>> {
        self.cues.take()
    }

    pub fn attach_gate(&mut self, gate: impl UiGate + 'static) {
        self.gate = Some(Box::new(gate));
    }

    /// Remove the UI gate. A running sequence fails at its next gate access.
    pub fn detach_gate(&mut self) -> Option<Box<dyn UiGate>> {
        self.gate.take()
    }

    pub fn attach_record_sink(&mut self, sink: impl RecordSink + 'static) {
        self.records = Some(Box::new(sink));
    }

    /// Begin the sequence at phase 1.
    ///
    /// A sequence already in flight is stopped first, and the restart begins
    /// with a cleared order and answers.
    pub fn start(&mut self) -> Result<(), OrchestratorError> {
        let Some(mover) = self.mover.as_deref() else {
            return Err(OrchestratorError::MissingCollaborator { role: "mover" });
        };
        let mover_position = mover.position();
        if self.cues.is_none() {
            return Err(OrchestratorError::MissingCollaborator {
                role: "cue player",
            });
        }
        if self.gate.is_none() {
            return Err(OrchestratorError::MissingCollaborator { role: "UI gate" });
        }
        if self.session.is_sealed() {
            return Err(OrchestratorError::SessionSealed);
        }

        if self.status == RunStatus::Running {
            info!(stage = %self.stage, "Restarting; cancelling the sequence in flight");
        }
        self.stop();
        self.session
            .reset_for_restart()
            .map_err(|_| OrchestratorError::SessionSealed)?;
        self.gate_mut()?
            .reset()
            .map_err(|_| gate_unavailable(Stage::Idle))?;

        let origin = *self
            .origin
            .get_or_insert(self.scene.origin.unwrap_or(mover_position));
        let session = self.session.current();
        let profile = session.condition.profile();
        if let Some(player) = self.cues.as_deref_mut() {
            player.play(profile.ambience);
        }
        info!(
            participant = %session.participant_id,
            condition = profile.condition.get(),
            ambience = %profile.ambience,
            white_balance = profile.white_balance,
            %origin,
            "Sequence started"
        );
        self.profile = Some(profile);
        self.status = RunStatus::Running;
        self.enter_stage(Stage::Phase1Outbound);
        Ok(())
    }

    /// Cancel whatever is in progress and return to idle. Safe in any state.
    pub fn stop(&mut self) {
        let was_running = self.status == RunStatus::Running;

        self.steps.clear();
        self.active = None;
        if self.manual.take().is_some() {
            debug!("Manual walk cancelled");
        }
        if let Some(mover) = self.mover.as_deref_mut() {
            mover.halt();
            mover.clear_path();
        }
        self.presentation.clear();
        if self.survey.is_active() {
            if let Some(gate) = self.gate.as_deref_mut() {
                if let Err(e) = gate.hide_panel(PanelId::SurveyRoot) {
                    debug!(error = %e, "Could not hide survey panels");
                }
            }
        }
        self.survey.reset();
        self.stage = Stage::Idle;

        if was_running {
            self.status = RunStatus::Idle;
            info!("Sequence stopped");
        }
    }

    /// Walk somewhere outside the main sequence. Only accepted while it is not running.
    pub fn request_walk(
        &mut self,
        target: PoseTarget,
        turn: TurnDirection,
    ) -> Result<(), OrchestratorError> {
        if self.status == RunStatus::Running {
            return Err(OrchestratorError::SequenceRunning);
        }
        if self.mover.is_none() {
            return Err(OrchestratorError::MissingCollaborator { role: "mover" });
        }
        info!(target = %target.point, ?turn, "Manual walk requested");
        self.manual = Some(WalkLeg::new(target, turn));
        Ok(())
    }

    /// Route a survey option picked on the visible question panel.
    pub fn choose_option(&mut self, option: u32) -> Result<SurveyProgress, SurveyError> {
        let Some(gate) = self.gate.as_deref_mut() else {
            return Err(SurveyError::Gate(GateError::Disconnected));
        };
        let result = self.survey.choose_option(
            option,
            SurveyContext {
                gate,
                cues: self.cues.as_deref_mut(),
                session: &mut self.session,
            },
        );
        match &result {
            Ok(progress) => debug!(option, ?progress, "Survey choice accepted"),
            Err(e) => warn!(option, error = %e, "Survey choice rejected"),
        }
        result
    }

    /// Advance by one frame.
    ///
    /// Returns an error only when the run fails; the orchestrator has then
    /// already stopped and reports [`RunStatus::Failed`].
    pub fn tick(&mut self, dt: Duration) -> Result<(), OrchestratorError> {
        if let Some(mover) = self.mover.as_deref_mut() {
            mover.update(dt);
        }
        if self.status != RunStatus::Running {
            self.advance_manual(dt);
            return Ok(());
        }

        self.survey.tick();
        if let Err(err) = self.advance_sequence(dt) {
            error!(stage = %self.stage, error = %err, "Run failed");
            self.stop();
            self.status = RunStatus::Failed;
            return Err(err);
        }
        Ok(())
    }

    fn advance_sequence(&mut self, dt: Duration) -> Result<(), OrchestratorError> {
        let mut dt = dt;
        loop {
            if let Some(mut active) = self.active.take() {
                if !self.advance_step(&mut active, dt)? {
                    self.active = Some(active);
                    return Ok(());
                }
            }
            dt = Duration::ZERO;

            if let Some(step) = self.steps.pop_front() {
                self.active = self.begin_step(step)?;
                continue;
            }

            match self.stage.next() {
                Some(next) => self.enter_stage(next),
                None => return Ok(()),
            }
            if self.stage.is_terminal() {
                self.status = RunStatus::Completed;
                info!("Sequence complete");
                return Ok(());
            }
        }
    }

    fn enter_stage(&mut self, next: Stage) {
        let previous = self.stage.phase();
        self.stage = next;
        if let Some(phase) = next.phase().filter(|p| previous != Some(*p)) {
            info!(phase = phase.number(), name = %phase, "Phase started");
        }
        debug!(stage = %next, "Entering stage");
        let route = self.route();
        self.steps = next.script(&route, &self.timing).into();
    }

    fn route(&self) -> Route {
        Route {
            origin: self
                .origin
                .or(self.scene.origin)
                .unwrap_or(Point::new(0.0, 0.0)),
            destination: self.scene.destination,
            participant: self.scene.participant,
        }
    }

    fn begin_step(&mut self, step: Step) -> Result<Option<ActiveStep>, OrchestratorError> {
        let stage = self.stage;
        let active = match step {
            Step::Delay(duration) => Some(ActiveStep::Delay(Countdown::new(duration))),
            Step::Walk(target, direction) => Some(ActiveStep::Walk(WalkLeg::new(target, direction))),
            Step::Speak(cue) => Some(ActiveStep::Speak(SpeechStep::new(cue))),
            Step::AwaitFlag(flag) => {
                debug!(%flag, "Waiting for UI flag");
                Some(ActiveStep::AwaitFlag(flag))
            }
            Step::AwaitSurvey => Some(ActiveStep::AwaitSurvey),
            Step::ShowPanels(phase) => {
                self.gate_mut()?
                    .show_panel(phase)
                    .map_err(|_| gate_unavailable(stage))?;
                None
            }
            Step::CaptureOrder => {
                let choice = self
                    .gate_ref()?
                    .order_choice()
                    .map_err(|_| gate_unavailable(stage))?;
                info!(order = choice.as_deref().unwrap_or("<none>"), "Order captured");
                match self.session.current_mut() {
                    Ok(session) => session.order_choice = choice,
                    Err(e) => warn!(error = %e, "Could not store order choice"),
                }
                None
            }
            Step::HideOrderPanels => {
                let gate = self.gate_mut()?;
                for panel in [PanelId::MenuRead, PanelId::OrderMenu, PanelId::OrderConfirm] {
                    gate.hide_panel(panel).map_err(|_| gate_unavailable(stage))?;
                }
                None
            }
            Step::StartSurvey => {
                let gate = self
                    .gate
                    .as_deref_mut()
                    .ok_or_else(|| gate_unavailable(stage))?;
                self.survey.start(gate).map_err(|e| {
                    warn!(error = %e, "Survey could not start");
                    gate_unavailable(stage)
                })?;
                None
            }
            Step::FlushRecord => {
                self.flush_record();
                None
            }
        };
        Ok(active)
    }

    fn advance_step(
        &mut self,
        active: &mut ActiveStep,
        dt: Duration,
    ) -> Result<bool, OrchestratorError> {
        match active {
            ActiveStep::Delay(timer) => Ok(timer.advance(dt)),
            ActiveStep::Walk(leg) => {
                let Some(mover) = self.mover.as_deref_mut() else {
                    warn!(target = %leg.target().point, "No mover attached; skipping walk");
                    return Ok(true);
                };
                Ok(leg.advance(
                    dt,
                    LegEnv {
                        mover,
                        cues: self.cues.as_deref_mut(),
                        presentation: &mut self.presentation,
                        timing: &self.timing,
                    },
                ))
            }
            ActiveStep::Speak(speech) => Ok(speech.advance(
                dt,
                self.cues.as_deref_mut(),
                &mut self.presentation,
                &self.timing,
            )),
            ActiveStep::AwaitFlag(flag) => self
                .gate_ref()?
                .read_flag(*flag)
                .map_err(|_| gate_unavailable(self.stage)),
            ActiveStep::AwaitSurvey => {
                self.gate_ref()?
                    .connected()
                    .map_err(|_| gate_unavailable(self.stage))?;
                Ok(self.survey.take_completion())
            }
        }
    }

    fn advance_manual(&mut self, dt: Duration) {
        let Some(mut leg) = self.manual.take() else {
            return;
        };
        let Some(mover) = self.mover.as_deref_mut() else {
            warn!("No mover attached; dropping manual walk");
            return;
        };
        let arrived = leg.advance(
            dt,
            LegEnv {
                mover,
                cues: self.cues.as_deref_mut(),
                presentation: &mut self.presentation,
                timing: &self.timing,
            },
        );
        if arrived {
            info!(target = %leg.target().point, "Manual walk arrived");
        } else {
            self.manual = Some(leg);
        }
    }

    /// Seal the session and write it out. Runs once, at phase-4 entry.
    fn flush_record(&mut self) {
        let session = match self.session.seal(Utc::now()) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Session already flushed");
                return;
            }
        };
        match self.records.as_deref_mut() {
            Some(sink) => {
                if let Err(e) = record::write_session(sink, &self.record_path, session) {
                    error!(error = %e, "Failed to write session record; continuing");
                }
            }
            None => warn!(
                participant = %session.participant_id,
                "No record sink attached; session not persisted"
            ),
        }
    }

    fn gate_ref(&self) -> Result<&(dyn UiGate + 'static), OrchestratorError> {
        self.gate
            .as_deref()
            .ok_or_else(|| gate_unavailable(self.stage))
    }

    fn gate_mut(&mut self) -> Result<&mut (dyn UiGate + 'static), OrchestratorError> {
        let stage = self.stage;
        self.gate
            .as_deref_mut()
            .ok_or_else(|| gate_unavailable(stage))
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Current phase; `None` while idle.
    pub fn phase(&self) -> Option<Phase> {
        self.stage.phase()
    }

    pub fn presentation(&self) -> Presentation {
        self.presentation
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// True once the survey has recorded every answer.
    pub fn survey_completed(&self) -> bool {
        self.survey.is_complete()
    }

    pub fn survey(&self) -> &SurveySequencer {
        &self.survey
    }

    /// Ambience and white balance for the participant's condition, once started.
    pub fn profile(&self) -> Option<ConditionProfile> {
        self.profile
    }

    pub fn origin(&self) -> Option<Point> {
        self.origin
    }

    pub fn mover(&self) -> Option<&dyn Mover> {
        self.mover.as_deref()
    }

    pub fn is_walking_manually(&self) -> bool {
        self.manual.is_some()
    }

    pub fn record_path(&self) -> &Path {
        &self.record_path
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::{Arc, Mutex};

    use diner_common::{Condition, Cue, Session};
    use tempfile::TempDir;

    use super::*;
    use crate::gate::{self, ConfirmChoice, MenuBoard, MenuEvent};
    use crate::mover::SimulatedMover;
    use crate::orchestrator::Facing;
    use crate::record::CsvRecordWriter;

    const FRAME: Duration = Duration::from_millis(50);
    const MAX_FRAMES: usize = 4000;

    #[derive(Clone, Default)]
    struct LogPlayer(Arc<Mutex<Vec<Cue>>>);

    impl CuePlayer for LogPlayer {
        fn play(&mut self, cue: Cue) -> Duration {
            self.0.lock().unwrap().push(cue);
            Duration::from_secs(1)
        }
    }

    struct Harness {
        orch: Orchestrator,
        board: MenuBoard,
        cues: LogPlayer,
        record: PathBuf,
        _dir: TempDir,
    }

    impl Harness {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let record = dir.path().join("experiment_data.csv");
            Self::with_record(dir, record, true)
        }

        fn with_record(dir: TempDir, record: PathBuf, with_sink: bool) -> Self {
            let mut config = DinerToml::starter();
            config.session.record_file = record.clone();

            let session = SessionStore::new(Session::new("7", Condition::new(3).unwrap(), 5));
            let mut orch = Orchestrator::new(&config, session);
            orch.attach_mover(SimulatedMover::new(Point::new(0.0, 0.0), 1.2, 0.3));
            let cues = LogPlayer::default();
            orch.attach_cue_player(cues.clone());
            let (board, gate) = gate::channel();
            orch.attach_gate(gate);
            if with_sink {
                orch.attach_record_sink(CsvRecordWriter::new());
            }

            Self {
                orch,
                board,
                cues,
                record,
                _dir: dir,
            }
        }

        fn started() -> Self {
            let mut h = Self::new();
            h.start();
            h
        }

        fn start(&mut self) {
            self.orch.start().unwrap();
            self.board.sync();
        }

        fn step(&mut self) -> Result<(), OrchestratorError> {
            self.board.frame();
            let result = self.orch.tick(FRAME);
            self.board.sync();
            result
        }

        fn run_until(&mut self, mut done: impl FnMut(&Orchestrator, &MenuBoard) -> bool) {
            for _ in 0..MAX_FRAMES {
                if done(&self.orch, &self.board) {
                    return;
                }
                self.step().unwrap();
            }
            panic!("condition not reached; stuck in {}", self.orch.stage());
        }

        fn played(&self) -> Vec<Cue> {
            self.cues.0.lock().unwrap().clone()
        }

        fn answer(&mut self, option: u32) -> Result<SurveyProgress, SurveyError> {
            let result = self.orch.choose_option(option);
            self.board.sync();
            result
        }

        /// Participant behaviour up to a confirmed order.
        fn order(&mut self, food: &str) {
            self.run_until(|o, _| o.stage() == Stage::WaitOrderNow);
            assert!(self.board.handle(MenuEvent::OrderNow));
            self.run_until(|_, b| b.is_visible(PanelId::OrderMenu) && !b.is_initializing());
            assert!(self.board.handle(MenuEvent::SelectFood(food.to_string())));
            assert!(self.board.handle(MenuEvent::Confirm {
                choice: ConfirmChoice::Yes,
                on: true,
            }));
        }

        /// Wait for the first question to accept answers.
        fn await_survey(&mut self) {
            self.run_until(|_, b| b.visible_question() == Some(0));
            self.step().unwrap();
        }
    }

    #[test]
    fn test_start_requires_collaborators() {
        let config = DinerToml::default();
        let session = || SessionStore::new(Session::new("1", Condition::default(), 5));

        let mut orch = Orchestrator::new(&config, session());
        assert!(matches!(
            orch.start(),
            Err(OrchestratorError::MissingCollaborator { role: "mover" })
        ));

        orch.attach_mover(SimulatedMover::new(Point::new(0.0, 0.0), 1.0, 0.2));
        assert!(matches!(
            orch.start(),
            Err(OrchestratorError::MissingCollaborator { role: "cue player" })
        ));

        orch.attach_cue_player(LogPlayer::default());
        assert!(matches!(
            orch.start(),
            Err(OrchestratorError::MissingCollaborator { role: "UI gate" })
        ));
        assert_eq!(orch.status(), RunStatus::Idle);
    }

    #[test]
    fn test_full_session_writes_one_record() {
        let mut h = Harness::started();
        let mut phases: Vec<u8> = Vec::new();
        let mut observe = |o: &Orchestrator| {
            if let Some(phase) = o.phase() {
                if phases.last() != Some(&phase.number()) {
                    phases.push(phase.number());
                }
            }
        };

        h.run_until(|o, _| o.stage() == Stage::WaitOrderNow);
        observe(&h.orch);
        assert!(h.board.handle(MenuEvent::OrderNow));

        // Decline once, then confirm a different dish.
        h.run_until(|_, b| b.is_visible(PanelId::OrderMenu) && !b.is_initializing());
        observe(&h.orch);
        h.board.handle(MenuEvent::SelectFood("Set1".into()));
        h.board.handle(MenuEvent::Confirm {
            choice: ConfirmChoice::No,
            on: true,
        });
        h.run_until(|o, _| o.stage() == Stage::WaitOrderConfirm);
        for _ in 0..5 {
            h.step().unwrap();
        }
        assert_eq!(h.orch.stage(), Stage::WaitOrderConfirm);
        assert!(h.board.is_visible(PanelId::OrderMenu));
        h.board.handle(MenuEvent::SelectFood("Set2".into()));
        h.board.handle(MenuEvent::Confirm {
            choice: ConfirmChoice::Yes,
            on: true,
        });

        h.await_survey();
        observe(&h.orch);
        assert_eq!(h.orch.session().current().order_choice.as_deref(), Some("Set2"));
        for (i, option) in [1, 0, 2, 1].into_iter().enumerate() {
            assert_eq!(h.answer(option), Ok(SurveyProgress::Next(i + 1)));
        }
        assert!(!h.orch.survey_completed());
        assert_eq!(h.answer(3), Ok(SurveyProgress::Complete));
        assert!(h.orch.survey_completed());

        h.run_until(|o, _| o.status() == RunStatus::Completed);
        observe(&h.orch);
        assert_eq!(phases, vec![1, 2, 3, 4]);
        assert!(h.orch.session().is_sealed());
        assert!(h.orch.presentation().is_clear());

        let content = fs::read_to_string(&h.record).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "participantId,condition,order,q1,q2,q3,q4,q5,timestamp");
        assert!(lines[1].starts_with("7,3,Set2,1,0,2,1,3,"), "row: {}", lines[1]);
        assert!(lines[1].ends_with('Z'));

        let played = h.played();
        assert_eq!(played.first(), Some(&Cue::AmbienceB));
        for cue in [
            Cue::Greeting,
            Cue::OrderPrompt,
            Cue::SurveyPrompt,
            Cue::SurveyClosing,
            Cue::Farewell,
            Cue::TurnLeft,
            Cue::TurnRight,
        ] {
            assert!(played.contains(&cue), "{} never played", cue);
        }
    }

    #[test]
    fn test_waits_indefinitely_without_order_now() {
        let mut h = Harness::started();
        h.run_until(|o, _| o.stage() == Stage::WaitOrderNow);
        for _ in 0..1000 {
            h.step().unwrap();
        }
        assert_eq!(h.orch.stage(), Stage::WaitOrderNow);
        assert_eq!(h.orch.status(), RunStatus::Running);
    }

    #[test]
    fn test_turning_and_talking_never_overlap() {
        let mut h = Harness::started();
        for _ in 0..MAX_FRAMES {
            let p = h.orch.presentation();
            assert!(!(p.talking && p.turning()));
            assert!(!(p.turning_left && p.turning_right));
            if h.orch.stage() == Stage::WaitOrderNow {
                return;
            }
            h.step().unwrap();
        }
        panic!("never reached the first wait");
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut h = Harness::started();
        h.run_until(|o, _| o.presentation().turning());

        h.orch.stop();
        let first = (
            h.orch.status(),
            h.orch.stage(),
            h.orch.presentation(),
            h.orch.mover().map(|m| (m.is_halted(), m.has_path())),
        );
        h.orch.stop();
        let second = (
            h.orch.status(),
            h.orch.stage(),
            h.orch.presentation(),
            h.orch.mover().map(|m| (m.is_halted(), m.has_path())),
        );

        assert_eq!(first, second);
        assert_eq!(first.0, RunStatus::Idle);
        assert_eq!(first.1, Stage::Idle);
        assert!(first.2.is_clear());
        assert_eq!(first.3, Some((true, false)));
    }

    #[test]
    fn test_stop_from_idle_is_a_noop() {
        let mut h = Harness::new();
        h.orch.stop();
        assert_eq!(h.orch.status(), RunStatus::Idle);
        assert_eq!(h.orch.phase(), None);
    }

    #[test]
    fn test_restart_mid_sequence_resets_to_phase_one() {
        let mut h = Harness::started();
        h.order("Set1");
        h.run_until(|o, _| o.stage() == Stage::Phase3Survey);
        assert_eq!(h.orch.session().current().order_choice.as_deref(), Some("Set1"));

        h.orch.start().unwrap();
        h.board.sync();
        assert_eq!(h.orch.stage(), Stage::Phase1Outbound);
        assert_eq!(h.orch.phase(), Some(Phase::Greeting));
        assert!(h.orch.presentation().is_clear());
        assert_eq!(h.orch.session().current().order_choice, None);
        assert!(!h.board.flags().order_now_clicked);
        assert!(!h.board.flags().ordering_confirmed);
        assert_eq!(h.board.visible_question(), None);

        // The restarted run waits for a fresh "order now".
        h.run_until(|o, _| o.stage() == Stage::WaitOrderNow);
        for _ in 0..20 {
            h.step().unwrap();
        }
        assert_eq!(h.orch.stage(), Stage::WaitOrderNow);
    }

    #[test]
    fn test_restart_while_turning_clears_turn_flag() {
        let mut h = Harness::started();
        h.run_until(|o, _| o.presentation().turning());
        h.orch.start().unwrap();
        assert!(!h.orch.presentation().turning());
        assert_eq!(h.orch.stage(), Stage::Phase1Outbound);
    }

    #[test]
    fn test_out_of_range_answer_is_rejected() {
        let mut h = Harness::started();
        h.order("Set1");
        h.await_survey();
        assert_eq!(h.answer(1), Ok(SurveyProgress::Next(1)));
        assert_eq!(
            h.answer(7),
            Err(SurveyError::OptionOutOfRange {
                option: 7,
                options: 5
            })
        );
        assert_eq!(h.orch.survey().current_index(), Some(1));
        assert!(!h.orch.survey_completed());
    }

    #[test]
    fn test_lost_gate_fails_the_run() {
        let Harness {
            mut orch,
            board,
            _dir,
            ..
        } = Harness::started();
        drop(board);

        let mut result = Ok(());
        for _ in 0..MAX_FRAMES {
            result = orch.tick(FRAME);
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(
            result,
            Err(OrchestratorError::GateUnavailable { .. })
        ));
        assert_eq!(orch.status(), RunStatus::Failed);
        assert!(orch.presentation().is_clear());
        assert_eq!(orch.stage(), Stage::Idle);
    }

    #[test]
    fn test_detached_cue_player_degrades_to_floor() {
        let mut h = Harness::started();
        assert!(h.orch.detach_cue_player().is_some());
        h.run_until(|o, _| o.stage() == Stage::WaitOrderNow);
        assert_eq!(h.played(), vec![Cue::AmbienceB]);
        assert_eq!(h.orch.status(), RunStatus::Running);
    }

    #[test]
    fn test_missing_record_sink_still_completes() {
        let dir = TempDir::new().unwrap();
        let record = dir.path().join("never_written.csv");
        let mut h = Harness::with_record(dir, record, false);
        h.start();
        h.order("Set3");
        h.await_survey();
        for option in [0, 1, 2, 3, 4] {
            h.answer(option).unwrap();
        }
        h.run_until(|o, _| o.status() == RunStatus::Completed);
        assert!(h.orch.session().is_sealed());
        assert!(!h.record.exists());
    }

    #[test]
    fn test_record_failure_does_not_stop_the_run() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("blocker"), "x").unwrap();
        let record = dir.path().join("blocker").join("data.csv");
        let mut h = Harness::with_record(dir, record, true);
        h.start();
        h.order("Set1");
        h.await_survey();
        for option in [1, 1, 1, 1, 1] {
            h.answer(option).unwrap();
        }
        h.run_until(|o, _| o.status() == RunStatus::Completed);
        assert!(h.orch.session().is_sealed());
        assert!(!h.record.exists());
    }

    #[test]
    fn test_start_after_completion_is_refused() {
        let mut h = Harness::started();
        h.order("Set1");
        h.await_survey();
        for option in [1, 0, 2, 1, 3] {
            h.answer(option).unwrap();
        }
        h.run_until(|o, _| o.status() == RunStatus::Completed);
        assert!(matches!(
            h.orch.start(),
            Err(OrchestratorError::SessionSealed)
        ));
        assert_eq!(h.orch.status(), RunStatus::Completed);
    }

    #[test]
    fn test_manual_walk_only_while_idle() {
        let mut h = Harness::new();
        let target = PoseTarget {
            point: Point::new(2.0, 0.0),
            facing: Facing::Free,
        };
        h.orch.request_walk(target, TurnDirection::Right).unwrap();
        assert!(h.orch.is_walking_manually());
        for _ in 0..MAX_FRAMES {
            if !h.orch.is_walking_manually() {
                break;
            }
            h.step().unwrap();
        }
        assert!(!h.orch.is_walking_manually());
        let position = h.orch.mover().unwrap().position();
        assert!(position.distance_to(Point::new(2.0, 0.0)) <= 0.5);
        assert!(h.played().contains(&Cue::TurnRight));

        h.orch.start().unwrap();
        assert!(matches!(
            h.orch.request_walk(target, TurnDirection::Left),
            Err(OrchestratorError::SequenceRunning)
        ));
    }

    #[test]
    fn test_start_cancels_manual_walk_and_sets_origin() {
        let mut h = Harness::new();
        let target = PoseTarget {
            point: Point::new(0.0, 3.0),
            facing: Facing::Free,
        };
        h.orch.request_walk(target, TurnDirection::Right).unwrap();
        h.step().unwrap();
        h.orch.start().unwrap();
        assert!(!h.orch.is_walking_manually());
        // The starter config pins the origin.
        assert_eq!(h.orch.origin(), Some(Point::new(0.0, 0.0)));
        assert_eq!(h.orch.profile().map(|p| p.condition.get()), Some(3));
    }
}
