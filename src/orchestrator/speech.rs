use std::time::Duration;

use diner_common::Cue;
use tracing::{debug, warn};

use crate::config::TimingSection;
use crate::cue::CuePlayer;

use super::Presentation;
use super::stage::Countdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpeechState {
    Begin,
    Talking(Countdown),
    Buffer(Countdown),
    Done,
}

/// Play a voice cue with the talking flag raised, then pause briefly.
///
/// The flag stays up for the cue's duration but never less than the
/// configured floor, so a missing or near-silent clip still reads as speech.
#[derive(Debug, Clone)]
pub struct SpeechStep {
    cue: Cue,
    state: SpeechState,
}

impl SpeechStep {
    pub fn new(cue: Cue) -> Self {
        Self {
            cue,
            state: SpeechState::Begin,
        }
    }

    pub fn advance(
        &mut self,
        dt: Duration,
        cues: Option<&mut (dyn CuePlayer + 'static)>,
        presentation: &mut Presentation,
        timing: &TimingSection,
    ) -> bool {
        let mut dt = dt;
        let mut cues = cues;
        loop {
            match self.state {
                SpeechState::Begin => {
                    let reported = match cues.take() {
                        Some(player) => player.play(self.cue),
                        None => {
                            warn!(cue = %self.cue, "No cue player attached; using the minimum duration");
                            Duration::ZERO
                        }
                    };
                    let hold = reported.max(timing.cue_floor());
                    presentation.talking = true;
                    debug!(cue = %self.cue, ?reported, ?hold, "Speaking");
                    self.state = SpeechState::Talking(Countdown::new(hold));
                    dt = Duration::ZERO;
                }
                SpeechState::Talking(mut timer) => {
                    if timer.advance(dt) {
                        presentation.talking = false;
                        self.state = SpeechState::Buffer(Countdown::new(timing.cue_buffer()));
                        dt = Duration::ZERO;
                        continue;
                    }
                    self.state = SpeechState::Talking(timer);
                    return false;
                }
                SpeechState::Buffer(mut timer) => {
                    if timer.advance(dt) {
                        self.state = SpeechState::Done;
                        return true;
                    }
                    self.state = SpeechState::Buffer(timer);
                    return false;
                }
                SpeechState::Done => return true,
            }
        }
    }
}
