//! End-to-end session scenarios through the library API.
//!
//! Time is advanced with fixed frames; the participant is played by hand
//! against the menu board.

use std::fs;
use std::time::Duration;

use diner::config::DinerToml;
use diner::cue::{CatalogCuePlayer, CueCatalog};
use diner::errors::{OrchestratorError, SurveyError};
use diner::gate::{self, ConfirmChoice, MenuBoard, MenuEvent, PanelId};
use diner::identity::ParticipantPrefs;
use diner::mover::SimulatedMover;
use diner::orchestrator::{Orchestrator, RunStatus, Stage};
use diner::record::CsvRecordWriter;
use diner::session::SessionStore;
use diner::survey::SurveyProgress;
use diner_common::{Point, Session};
use tempfile::TempDir;

const FRAME: Duration = Duration::from_millis(50);
const MAX_FRAMES: usize = 5000;

struct Rig {
    orch: Orchestrator,
    board: MenuBoard,
    dir: TempDir,
    phases: Vec<u8>,
}

impl Rig {
    fn new(participant: &str, condition: u8) -> Self {
        Self::in_dir(TempDir::new().unwrap(), participant, condition)
    }

    /// A fresh process state writing to the record file under `dir`.
    fn in_dir(dir: TempDir, participant: &str, condition: u8) -> Self {
        let prefs_path = dir.path().join("prefs.toml");
        let mut prefs = ParticipantPrefs::default();
        prefs.assign(participant, Some(condition)).unwrap();
        prefs.save(&prefs_path).unwrap();
        let identity = ParticipantPrefs::load_or_init(&prefs_path).unwrap();

        let mut config = DinerToml::starter();
        config.session.record_file = dir.path().join("out").join("experiment_data.csv");

        let session = SessionStore::new(Session::new(
            identity.participant_id,
            identity.condition,
            config.survey.questions,
        ));
        let mut orch = Orchestrator::new(&config, session);
        orch.attach_mover(SimulatedMover::new(
            Point::new(0.0, 0.0),
            config.scene.walk_speed,
            config.scene.stopping_distance,
        ));
        orch.attach_cue_player(CatalogCuePlayer::new(
            CueCatalog::from_config(&config).unwrap(),
        ));
        let (board, gate) = gate::channel();
        orch.attach_gate(gate);
        orch.attach_record_sink(CsvRecordWriter::new());

        Self {
            orch,
            board,
            dir,
            phases: Vec::new(),
        }
    }

    fn start(&mut self) {
        self.orch.start().unwrap();
        self.board.sync();
    }

    fn frame(&mut self) {
        self.board.frame();
        self.orch.tick(FRAME).unwrap();
        self.board.sync();
        if let Some(phase) = self.orch.phase() {
            if self.phases.last() != Some(&phase.number()) {
                self.phases.push(phase.number());
            }
        }
    }

    fn until(&mut self, mut done: impl FnMut(&Orchestrator, &MenuBoard) -> bool) {
        for _ in 0..MAX_FRAMES {
            if done(&self.orch, &self.board) {
                return;
            }
            self.frame();
        }
        panic!("stuck in {}", self.orch.stage());
    }

    fn place_order(&mut self, food: &str) {
        self.until(|_, b| b.is_visible(PanelId::MenuRead));
        assert!(self.board.handle(MenuEvent::OrderNow));
        self.until(|_, b| b.is_visible(PanelId::OrderMenu) && !b.is_initializing());
        assert!(self.board.handle(MenuEvent::SelectFood(food.to_string())));
        assert!(self.board.handle(MenuEvent::Confirm {
            choice: ConfirmChoice::Yes,
            on: true,
        }));
    }

    fn answer_survey(&mut self, answers: &[u32]) {
        self.until(|_, b| b.visible_question() == Some(0));
        self.frame();
        for &option in answers {
            self.orch.choose_option(option).unwrap();
            self.board.sync();
        }
    }

    fn record(&self) -> String {
        fs::read_to_string(self.dir.path().join("out").join("experiment_data.csv")).unwrap()
    }
}

#[test]
fn test_participant_session_is_recorded_once() {
    let mut rig = Rig::new("7", 3);
    rig.start();
    rig.place_order("Set1");
    rig.answer_survey(&[1, 0, 2, 1, 3]);
    rig.until(|o, _| o.status() == RunStatus::Completed);

    assert_eq!(rig.phases, vec![1, 2, 3, 4]);
    let record = rig.record();
    let lines: Vec<&str> = record.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("participantId,condition,order,"));
    assert!(lines[1].starts_with("7,3,Set1,1,0,2,1,3,"));

    // The agent ends back where it started.
    let home = rig.orch.mover().unwrap().position();
    assert!(home.distance_to(Point::new(0.0, 0.0)) <= 0.5);
}

#[test]
fn test_second_participant_appends_without_header() {
    let mut first = Rig::new("1", 1);
    first.start();
    first.place_order("Set3");
    first.answer_survey(&[0, 0, 0, 0, 0]);
    first.until(|o, _| o.status() == RunStatus::Completed);

    let Rig { dir, .. } = first;
    let mut second = Rig::in_dir(dir, "2", 4);
    second.start();
    second.place_order("Set2");
    second.answer_survey(&[4, 4, 4, 4, 4]);
    second.until(|o, _| o.status() == RunStatus::Completed);

    let record = second.record();
    let lines: Vec<&str> = record.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("1,1,Set3,0,0,0,0,0,"));
    assert!(lines[2].starts_with("2,4,Set2,4,4,4,4,4,"));
}

#[test]
fn test_restart_discards_partial_progress() {
    let mut rig = Rig::new("5", 2);
    rig.start();
    rig.place_order("Set1");
    rig.answer_survey(&[2, 2]);
    assert_eq!(rig.orch.survey().current_index(), Some(2));

    rig.start();
    assert_eq!(rig.orch.stage(), Stage::Phase1Outbound);
    assert_eq!(rig.orch.session().current().order_choice, None);
    assert_eq!(rig.orch.session().current().answers.answered(), 0);
    assert_eq!(rig.board.visible_panels().count(), 0);

    rig.place_order("Set2");
    rig.answer_survey(&[3, 3, 3, 3, 3]);
    rig.until(|o, _| o.status() == RunStatus::Completed);
    let record = rig.record();
    assert_eq!(record.lines().count(), 2);
    assert!(record.lines().nth(1).unwrap().starts_with("5,2,Set2,3,3,3,3,3,"));
}

#[test]
fn test_stop_twice_matches_stop_once() {
    let mut rig = Rig::new("3", 1);
    rig.start();
    rig.until(|o, _| o.presentation().walking);

    rig.orch.stop();
    let once = (rig.orch.status(), rig.orch.stage(), rig.orch.presentation());
    rig.orch.stop();
    let twice = (rig.orch.status(), rig.orch.stage(), rig.orch.presentation());
    assert_eq!(once, twice);
    assert_eq!(once.0, RunStatus::Idle);
    assert!(once.2.is_clear());

    // Ticks after a stop do nothing.
    for _ in 0..50 {
        rig.frame();
    }
    assert_eq!(rig.orch.stage(), Stage::Idle);
}

#[test]
fn test_invalid_answers_never_advance_the_survey() {
    let mut rig = Rig::new("8", 4);
    rig.start();
    rig.place_order("Set1");
    rig.until(|_, b| b.visible_question() == Some(0));

    // Same tick as the panel appeared: still initializing.
    assert_eq!(rig.orch.choose_option(1), Err(SurveyError::Initializing));
    rig.frame();
    assert_eq!(
        rig.orch.choose_option(5),
        Err(SurveyError::OptionOutOfRange {
            option: 5,
            options: 5
        })
    );
    assert_eq!(rig.orch.choose_option(4), Ok(SurveyProgress::Next(1)));
    rig.board.sync();
    assert_eq!(rig.board.visible_question(), Some(1));
}

#[test]
fn test_start_without_gate_is_refused() {
    let mut rig = Rig::new("9", 1);
    assert!(rig.orch.detach_gate().is_some());
    assert!(matches!(
        rig.orch.start(),
        Err(OrchestratorError::MissingCollaborator { role: "UI gate" })
    ));
    assert_eq!(rig.orch.status(), RunStatus::Idle);
}
