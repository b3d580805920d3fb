//! Configuration for a diner run, read from `diner.toml`.
//!
//! Layered the usual way: defaults, then the file, then environment
//! (`DINER_RECORD_FILE`, `DINER_PREFS_FILE`), then CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [session]
//! record_file = "experiment_data.csv"
//! prefs_file = "prefs.toml"
//!
//! [timing]
//! tick_hz = 60
//! walk_delay_secs = 2.0
//! return_delay_secs = 2.0
//! turn_speed_deg = 180.0
//!
//! [scene]
//! destination = { x = 0.0, z = 4.0 }
//! participant = { x = 0.0, z = 5.2 }
//! walk_speed = 1.2
//!
//! [survey]
//! questions = 5
//! options_per_question = 5
//!
//! [cues.greeting]
//! duration_secs = 4.5
//! resource = "voice/greeting.ogg"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use diner_common::{Cue, Point, RECORD_COLUMNS};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "diner.toml";

/// Output locations for the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSection {
    /// CSV file that receives one row per participant
    #[serde(default = "default_record_file")]
    pub record_file: PathBuf,
    /// Key-value file holding participant id and condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefs_file: Option<PathBuf>,
}

fn default_record_file() -> PathBuf {
    PathBuf::from("experiment_data.csv")
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            record_file: default_record_file(),
            prefs_file: None,
        }
    }
}

/// Every delay, speed and threshold the orchestrator uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingSection {
    /// Host tick rate
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
    /// Pause before each outbound walk
    #[serde(default = "default_walk_delay")]
    pub walk_delay_secs: f32,
    /// Pause before each return walk
    #[serde(default = "default_return_delay")]
    pub return_delay_secs: f32,
    /// Rotation rate while turning in place (degrees per second)
    #[serde(default = "default_turn_speed")]
    pub turn_speed_deg: f32,
    /// Rotation rate while yawing toward the participant on approach
    #[serde(default = "default_approach_turn_speed")]
    pub approach_turn_speed_deg: f32,
    /// Facing error below which a turn is skipped or considered finished
    #[serde(default = "default_turn_tolerance")]
    pub turn_tolerance_deg: f32,
    /// Pause between the end of a turn and the move command
    #[serde(default = "default_post_turn_pause")]
    pub post_turn_pause_secs: f32,
    /// Lower bound of the arrival distance
    #[serde(default = "default_arrival_floor")]
    pub arrival_floor: f32,
    /// Settle delay after numeric arrival
    #[serde(default = "default_settle")]
    pub settle_secs: f32,
    /// Minimum talking time for a voice cue
    #[serde(default = "default_cue_floor")]
    pub cue_floor_secs: f32,
    /// Pause after the talking flag drops
    #[serde(default = "default_cue_buffer")]
    pub cue_buffer_secs: f32,
    /// Distance from the destination at which the agent yaws toward the participant
    #[serde(default = "default_arrival_rotation_distance")]
    pub arrival_rotation_distance: f32,
}

fn default_tick_hz() -> u32 {
    60
}

fn default_walk_delay() -> f32 {
    2.0
}

fn default_return_delay() -> f32 {
    2.0
}

fn default_turn_speed() -> f32 {
    180.0
}

fn default_approach_turn_speed() -> f32 {
    120.0
}

fn default_turn_tolerance() -> f32 {
    1.0
}

fn default_post_turn_pause() -> f32 {
    0.1
}

fn default_arrival_floor() -> f32 {
    0.5
}

fn default_settle() -> f32 {
    0.2
}

fn default_cue_floor() -> f32 {
    2.0
}

fn default_cue_buffer() -> f32 {
    0.2
}

fn default_arrival_rotation_distance() -> f32 {
    2.0
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            walk_delay_secs: default_walk_delay(),
            return_delay_secs: default_return_delay(),
            turn_speed_deg: default_turn_speed(),
            approach_turn_speed_deg: default_approach_turn_speed(),
            turn_tolerance_deg: default_turn_tolerance(),
            post_turn_pause_secs: default_post_turn_pause(),
            arrival_floor: default_arrival_floor(),
            settle_secs: default_settle(),
            cue_floor_secs: default_cue_floor(),
            cue_buffer_secs: default_cue_buffer(),
            arrival_rotation_distance: default_arrival_rotation_distance(),
        }
    }
}

impl TimingSection {
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz.max(1)))
    }

    pub fn walk_delay(&self) -> Duration {
        secs(self.walk_delay_secs)
    }

    pub fn return_delay(&self) -> Duration {
        secs(self.return_delay_secs)
    }

    pub fn post_turn_pause(&self) -> Duration {
        secs(self.post_turn_pause_secs)
    }

    pub fn settle(&self) -> Duration {
        secs(self.settle_secs)
    }

    pub fn cue_floor(&self) -> Duration {
        secs(self.cue_floor_secs)
    }

    pub fn cue_buffer(&self) -> Duration {
        secs(self.cue_buffer_secs)
    }
}

/// Seconds to a `Duration` at microsecond resolution; invalid input clamps to zero.
pub(crate) fn secs(value: f32) -> Duration {
    if !value.is_finite() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_micros((f64::from(value) * 1e6).round() as u64)
}

/// Scene geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneSection {
    /// Where the agent returns to; captured from the agent at first start when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Point>,
    /// The participant's table
    #[serde(default = "default_destination")]
    pub destination: Point,
    /// Where the participant's head is, for facing on approach
    #[serde(default = "default_participant")]
    pub participant: Point,
    /// Simulated walking speed (units per second)
    #[serde(default = "default_walk_speed")]
    pub walk_speed: f32,
    /// Simulated stopping distance
    #[serde(default = "default_stopping_distance")]
    pub stopping_distance: f32,
}

fn default_destination() -> Point {
    Point::new(0.0, 4.0)
}

fn default_participant() -> Point {
    Point::new(0.0, 5.2)
}

fn default_walk_speed() -> f32 {
    1.2
}

fn default_stopping_distance() -> f32 {
    0.3
}

impl Default for SceneSection {
    fn default() -> Self {
        Self {
            origin: None,
            destination: default_destination(),
            participant: default_participant(),
            walk_speed: default_walk_speed(),
            stopping_distance: default_stopping_distance(),
        }
    }
}

/// Questionnaire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveySection {
    #[serde(default = "default_questions")]
    pub questions: usize,
    #[serde(default = "default_options_per_question")]
    pub options_per_question: u32,
}

fn default_questions() -> usize {
    5
}

fn default_options_per_question() -> u32 {
    5
}

impl Default for SurveySection {
    fn default() -> Self {
        Self {
            questions: default_questions(),
            options_per_question: default_options_per_question(),
        }
    }
}

/// One entry under `[cues.<name>]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CueEntry {
    pub duration_secs: f32,
    #[serde(default)]
    pub resource: String,
}

/// The complete diner.toml structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DinerToml {
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub timing: TimingSection,
    #[serde(default)]
    pub scene: SceneSection,
    #[serde(default)]
    pub survey: SurveySection,
    /// Cue descriptors keyed by cue name
    #[serde(default)]
    pub cues: BTreeMap<String, CueEntry>,
}

impl DinerToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from `path`, or defaults when the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        use anyhow::Context;
        let content = toml::to_string_pretty(self).context("Failed to serialize diner.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// A starter configuration with every cue filled in.
    pub fn starter() -> Self {
        let durations = [
            (Cue::Greeting, 4.5),
            (Cue::OrderPrompt, 3.5),
            (Cue::SurveyPrompt, 3.0),
            (Cue::SurveyClosing, 2.5),
            (Cue::Farewell, 3.0),
            (Cue::TurnLeft, 1.2),
            (Cue::TurnRight, 1.2),
            (Cue::AmbienceA, 0.0),
            (Cue::AmbienceB, 0.0),
        ];
        let cues = durations
            .into_iter()
            .map(|(cue, duration_secs)| {
                let folder = if cue.is_voice() { "voice" } else { "anim" };
                (
                    cue.name().to_string(),
                    CueEntry {
                        duration_secs,
                        resource: format!("{}/{}", folder, cue.name()),
                    },
                )
            })
            .collect();
        Self {
            scene: SceneSection {
                origin: Some(Point::new(0.0, 0.0)),
                ..SceneSection::default()
            },
            cues,
            ..Self::default()
        }
    }

    /// Record file, with `DINER_RECORD_FILE` taking precedence.
    pub fn record_file(&self) -> PathBuf {
        std::env::var_os("DINER_RECORD_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| self.session.record_file.clone())
    }

    /// Preferences file: `DINER_PREFS_FILE`, then the config value, then the
    /// per-user data directory.
    pub fn prefs_file(&self) -> PathBuf {
        if let Some(path) = std::env::var_os("DINER_PREFS_FILE") {
            return PathBuf::from(path);
        }
        if let Some(path) = &self.session.prefs_file {
            return path.clone();
        }
        dirs::data_dir()
            .map(|d| d.join("diner").join("prefs.toml"))
            .unwrap_or_else(|| PathBuf::from("prefs.toml"))
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let answer_columns = RECORD_COLUMNS.iter().filter(|c| c.starts_with('q')).count();
        if self.survey.questions != answer_columns {
            warnings.push(format!(
                "survey.questions = {} but the record has {} answer columns; extra answers are not persisted",
                self.survey.questions, answer_columns
            ));
        }
        if self.survey.options_per_question == 0 {
            warnings.push("survey.options_per_question = 0 rejects every answer".to_string());
        }
        if self.timing.tick_hz == 0 {
            warnings.push("timing.tick_hz = 0 is treated as 1".to_string());
        }
        if self.scene.walk_speed <= 0.0 {
            warnings.push(format!(
                "scene.walk_speed = {} never reaches a destination",
                self.scene.walk_speed
            ));
        }
        if self.timing.turn_speed_deg <= 0.0 {
            warnings.push(format!(
                "timing.turn_speed_deg = {} never finishes a turn",
                self.timing.turn_speed_deg
            ));
        }

        for name in self.cues.keys() {
            if name.parse::<Cue>().is_err() {
                warnings.push(format!("Unknown cue '{}' is ignored", name));
            }
        }
        for cue in Cue::ALL {
            if !self.cues.contains_key(cue.name()) {
                warnings.push(format!(
                    "Cue '{}' has no descriptor; it will play with zero duration",
                    cue
                ));
            }
        }

        warnings
    }
}
