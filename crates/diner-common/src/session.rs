//! The per-participant session record.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::phase::Condition;

/// Column schema of the persisted record, in order.
pub const RECORD_COLUMNS: [&str; 9] = [
    "participantId",
    "condition",
    "order",
    "q1",
    "q2",
    "q3",
    "q4",
    "q5",
    "timestamp",
];

/// Number of answer columns in [`RECORD_COLUMNS`].
const ANSWER_COLUMNS: usize = 5;

/// Ordered survey answers, one slot per question.
///
/// Slots are filled strictly in order: slot `i` can only be written once
/// slots `0..i` hold a value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SurveyAnswers {
    slots: Vec<Option<u32>>,
}

impl SurveyAnswers {
    pub fn with_questions(questions: usize) -> Self {
        Self {
            slots: vec![None; questions],
        }
    }

    pub fn questions(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots filled so far.
    pub fn answered(&self) -> usize {
        self.slots.iter().take_while(|s| s.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.answered() == self.slots.len()
    }

    /// Fill the next open slot. Returns the slot index, or `None` when full.
    pub fn push(&mut self, option: u32) -> Option<usize> {
        let index = self.answered();
        let slot = self.slots.get_mut(index)?;
        *slot = Some(option);
        Some(index)
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        self.slots.get(index).copied().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<u32>> + '_ {
        self.slots.iter().copied()
    }
}

/// One participant's run: identity, condition, order and answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub participant_id: String,
    pub condition: Condition,
    pub order_choice: Option<String>,
    pub answers: SurveyAnswers,
    /// Set when the session is flushed to durable storage.
    pub finished_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(participant_id: impl Into<String>, condition: Condition, questions: usize) -> Self {
        Self {
            participant_id: participant_id.into(),
            condition,
            order_choice: None,
            answers: SurveyAnswers::with_questions(questions),
            finished_at: None,
        }
    }

    /// Values for one record row, aligned with [`RECORD_COLUMNS`].
    ///
    /// Unanswered questions and a missing order render as empty fields.
    pub fn record_fields(&self) -> Vec<String> {
        let mut fields = Vec::with_capacity(RECORD_COLUMNS.len());
        fields.push(self.participant_id.clone());
        fields.push(self.condition.to_string());
        fields.push(self.order_choice.clone().unwrap_or_default());
        for i in 0..ANSWER_COLUMNS {
            fields.push(
                self.answers
                    .get(i)
                    .map(|a| a.to_string())
                    .unwrap_or_default(),
            );
        }
        fields.push(
            self.finished_at
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_default(),
        );
        fields
    }
}
