//! Survey sub-sequencer.
//!
//! Walks the participant through N question panels, one visible at a time,
//! collecting one answer per panel. On the last answer it flushes the answers
//! into the session, plays the closing cue and reports completion once.

use diner_common::{Cue, SurveyAnswers};
use tracing::{debug, info, warn};

use crate::cue::CuePlayer;
use crate::errors::SurveyError;
use crate::gate::{PanelId, UiGate};
use crate::session::SessionStore;

/// Collaborators a survey step needs, borrowed from the orchestrator.
pub struct SurveyContext<'a> {
    pub gate: &'a mut dyn UiGate,
    pub cues: Option<&'a mut (dyn CuePlayer + 'static)>,
    pub session: &'a mut SessionStore,
}

/// Outcome of an accepted choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurveyProgress {
    /// Answer recorded; this question is now shown.
    Next(usize),
    /// Last answer recorded; the survey is finished.
    Complete,
}

#[derive(Debug)]
pub struct SurveySequencer {
    questions: usize,
    options: u32,
    /// Question on screen. `None` before start and after completion.
    index: Option<usize>,
    armed: bool,
    answers: SurveyAnswers,
    complete: bool,
    completion_taken: bool,
}

impl SurveySequencer {
    pub fn new(questions: usize, options: u32) -> Self {
        Self {
            questions,
            options,
            index: None,
            armed: false,
            answers: SurveyAnswers::with_questions(questions),
            complete: false,
            completion_taken: false,
        }
    }

    /// Show the first question. Choices are accepted from the next tick on.
    pub fn start(&mut self, gate: &mut dyn UiGate) -> Result<(), SurveyError> {
        self.reset();
        if self.questions == 0 {
            warn!("Survey has no questions; completing immediately");
            self.complete = true;
            return Ok(());
        }
        gate.show(PanelId::Survey(0))?;
        self.index = Some(0);
        info!(questions = self.questions, "Survey started");
        Ok(())
    }

    /// Per-tick housekeeping: arms the survey one tick after start.
    pub fn tick(&mut self) {
        if self.index.is_some() && !self.armed {
            self.armed = true;
            debug!("Survey accepting answers");
        }
    }

    pub fn choose_option(
        &mut self,
        option: u32,
        ctx: SurveyContext<'_>,
    ) -> Result<SurveyProgress, SurveyError> {
        if self.complete {
            return Err(SurveyError::AlreadyComplete);
        }
        let Some(index) = self.index else {
            return Err(SurveyError::NotStarted);
        };
        if !self.armed {
            return Err(SurveyError::Initializing);
        }
        if option >= self.options {
            return Err(SurveyError::OptionOutOfRange {
                option,
                options: self.options,
            });
        }

        ctx.gate.connected()?;
        ctx.gate.hide_panel(PanelId::Survey(index))?;
        let next = index + 1;
        if next < self.questions {
            ctx.gate.show(PanelId::Survey(next))?;
        }

        self.answers.push(option);
        debug!(question = index + 1, option, "Survey answer recorded");
        if next < self.questions {
            self.index = Some(next);
            return Ok(SurveyProgress::Next(next));
        }

        self.finish(ctx);
        Ok(SurveyProgress::Complete)
    }

    fn finish(&mut self, ctx: SurveyContext<'_>) {
        self.index = None;
        self.complete = true;

        match ctx.session.current_mut() {
            Ok(session) => session.answers = self.answers.clone(),
            Err(e) => warn!(error = %e, "Could not store survey answers"),
        }
        match ctx.cues {
            Some(player) => {
                player.play(Cue::SurveyClosing);
            }
            None => warn!(cue = %Cue::SurveyClosing, "No cue player attached; skipping cue"),
        }
        info!(answered = self.answers.answered(), "Survey complete");
    }

    /// Returns true exactly once after the survey completes.
    pub fn take_completion(&mut self) -> bool {
        if self.complete && !self.completion_taken {
            self.completion_taken = true;
            return true;
        }
        false
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Question currently on screen.
    pub fn current_index(&self) -> Option<usize> {
        self.index
    }

    pub fn answers(&self) -> &SurveyAnswers {
        &self.answers
    }

    pub fn is_active(&self) -> bool {
        self.index.is_some()
    }

    pub fn reset(&mut self) {
        self.index = None;
        self.armed = false;
        self.answers = SurveyAnswers::with_questions(self.questions);
        self.complete = false;
        self.completion_taken = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GateError;
    use crate::gate::{self, MenuBoard};
    use diner_common::{Condition, Session};
    use std::time::Duration;

    struct CountingPlayer(Vec<Cue>);

    impl CuePlayer for CountingPlayer {
        fn play(&mut self, cue: Cue) -> Duration {
            self.0.push(cue);
            Duration::from_secs(1)
        }
    }

    struct Fixture {
        board: MenuBoard,
        gate: gate::GateHandle,
        player: CountingPlayer,
        session: SessionStore,
        survey: SurveySequencer,
    }

    impl Fixture {
        fn new() -> Self {
            let (board, gate) = gate::channel();
            Self {
                board,
                gate,
                player: CountingPlayer(Vec::new()),
                session: SessionStore::new(Session::new("7", Condition::new(3).unwrap(), 5)),
                survey: SurveySequencer::new(5, 5),
            }
        }

        fn started() -> Self {
            let mut fx = Self::new();
            fx.survey.start(&mut fx.gate).unwrap();
            fx.survey.tick();
            fx.board.sync();
            fx
        }

        fn choose(&mut self, option: u32) -> Result<SurveyProgress, SurveyError> {
            let result = self.survey.choose_option(
                option,
                SurveyContext {
                    gate: &mut self.gate,
                    cues: Some(&mut self.player),
                    session: &mut self.session,
                },
            );
            self.board.sync();
            result
        }
    }

    #[test]
    fn test_choice_before_start_is_rejected() {
        let mut fx = Fixture::new();
        assert_eq!(fx.choose(1), Err(SurveyError::NotStarted));
    }

    #[test]
    fn test_choice_in_init_tick_is_rejected() {
        let mut fx = Fixture::new();
        fx.survey.start(&mut fx.gate).unwrap();
        assert_eq!(fx.choose(1), Err(SurveyError::Initializing));
        fx.survey.tick();
        assert_eq!(fx.choose(1), Ok(SurveyProgress::Next(1)));
    }

    #[test]
    fn test_one_panel_visible_at_a_time() {
        let mut fx = Fixture::started();
        assert_eq!(fx.board.visible_question(), Some(0));
        fx.choose(2).unwrap();
        assert_eq!(fx.board.visible_question(), Some(1));
        assert!(!fx.board.is_visible(PanelId::Survey(0)));
    }

    #[test]
    fn test_five_answers_complete_once() {
        let mut fx = Fixture::started();
        for (i, option) in [1, 0, 2, 1].into_iter().enumerate() {
            assert_eq!(fx.choose(option), Ok(SurveyProgress::Next(i + 1)));
            assert!(!fx.survey.take_completion());
        }
        assert_eq!(fx.choose(3), Ok(SurveyProgress::Complete));

        assert!(fx.survey.take_completion());
        assert!(!fx.survey.take_completion());
        assert_eq!(fx.player.0, vec![Cue::SurveyClosing]);
        assert_eq!(fx.board.visible_question(), None);

        let stored: Vec<_> = fx.session.current().answers.iter().collect();
        assert_eq!(stored, vec![Some(1), Some(0), Some(2), Some(1), Some(3)]);

        assert_eq!(fx.choose(0), Err(SurveyError::AlreadyComplete));
    }

    #[test]
    fn test_out_of_range_option_changes_nothing() {
        let mut fx = Fixture::started();
        fx.choose(4).unwrap();
        assert_eq!(
            fx.choose(5),
            Err(SurveyError::OptionOutOfRange {
                option: 5,
                options: 5
            })
        );
        assert_eq!(fx.survey.current_index(), Some(1));
        assert_eq!(fx.survey.answers().answered(), 1);
        assert!(!fx.survey.is_complete());
        assert!(!fx.survey.take_completion());
        assert_eq!(fx.board.visible_question(), Some(1));
    }

    #[test]
    fn test_missing_cue_player_still_completes() {
        let mut fx = Fixture::new();
        fx.survey = SurveySequencer::new(1, 3);
        fx.survey.start(&mut fx.gate).unwrap();
        fx.survey.tick();
        let result = fx.survey.choose_option(
            2,
            SurveyContext {
                gate: &mut fx.gate,
                cues: None,
                session: &mut fx.session,
            },
        );
        assert_eq!(result, Ok(SurveyProgress::Complete));
        assert!(fx.survey.take_completion());
    }

    #[test]
    fn test_disconnected_gate_is_reported() {
        let fx = Fixture::started();
        let Fixture {
            board,
            mut gate,
            mut player,
            mut session,
            mut survey,
        } = fx;
        drop(board);
        let result = survey.choose_option(
            1,
            SurveyContext {
                gate: &mut gate,
                cues: Some(&mut player),
                session: &mut session,
            },
        );
        assert!(matches!(result, Err(SurveyError::Gate(_))));
    }

    #[test]
    fn test_rejected_choice_on_lost_gate_leaves_answers_untouched() {
        let Fixture {
            board,
            mut gate,
            mut player,
            mut session,
            mut survey,
        } = Fixture::started();
        drop(board);

        let result = survey.choose_option(
            2,
            SurveyContext {
                gate: &mut gate,
                cues: Some(&mut player),
                session: &mut session,
            },
        );
        assert!(matches!(
            result,
            Err(SurveyError::Gate(GateError::Disconnected))
        ));
        assert_eq!(survey.current_index(), Some(0));
        assert_eq!(survey.answers().answered(), 0);
        assert!(!survey.is_complete());
    }

    #[test]
    fn test_reset_returns_to_not_started() {
        let mut fx = Fixture::started();
        fx.choose(1).unwrap();
        fx.survey.reset();
        assert!(!fx.survey.is_active());
        assert_eq!(fx.survey.answers().answered(), 0);
        assert_eq!(fx.choose(1), Err(SurveyError::NotStarted));
    }
}
