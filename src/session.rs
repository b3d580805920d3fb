//! Run-lifetime owner of the participant [`Session`].
//!
//! Created once when the process starts and handed to the orchestrator.
//! Writable until it is sealed by the phase-4 flush; read-only afterwards.

use chrono::{DateTime, Utc};
use diner_common::{Session, SurveyAnswers};
use tracing::debug;

use crate::errors::SessionError;

#[derive(Debug)]
pub struct SessionStore {
    session: Session,
    sealed: bool,
}

impl SessionStore {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            sealed: false,
        }
    }

    pub fn current(&self) -> &Session {
        &self.session
    }

    pub fn current_mut(&mut self) -> Result<&mut Session, SessionError> {
        if self.sealed {
            return Err(self.sealed_error());
        }
        Ok(&mut self.session)
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Stamp the finish time and freeze the session.
    pub fn seal(&mut self, at: DateTime<Utc>) -> Result<&Session, SessionError> {
        if self.sealed {
            return Err(self.sealed_error());
        }
        self.session.finished_at = Some(at);
        self.sealed = true;
        debug!(participant = %self.session.participant_id, "Session sealed");
        Ok(&self.session)
    }

    /// Drop run progress (order and answers) so a restarted sequence begins clean.
    pub fn reset_for_restart(&mut self) -> Result<(), SessionError> {
        let session = self.current_mut()?;
        let questions = session.answers.questions();
        session.order_choice = None;
        session.answers = SurveyAnswers::with_questions(questions);
        Ok(())
    }

    fn sealed_error(&self) -> SessionError {
        SessionError::Sealed {
            participant_id: self.session.participant_id.clone(),
        }
    }
}
