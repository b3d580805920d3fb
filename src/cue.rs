//! Cue catalog and the cue player seam.
//!
//! Descriptors are resolved from configuration once, at load time. Lookups
//! afterwards are by [`Cue`] enum, never by string.

use std::collections::HashMap;
use std::time::Duration;

use diner_common::Cue;
use tracing::{debug, warn};

use crate::config::{DinerToml, secs};
use crate::errors::ConfigError;

/// A validated playable unit.
#[derive(Debug, Clone, PartialEq)]
pub struct CueDescriptor {
    pub duration: Duration,
    pub resource: String,
}

/// Mapping from cue to descriptor, validated at construction.
#[derive(Debug, Clone, Default)]
pub struct CueCatalog {
    entries: HashMap<Cue, CueDescriptor>,
}

impl CueCatalog {
    /// Build the catalog from `[cues.*]`, rejecting negative or non-finite
    /// durations. Unknown cue names are skipped (`validate` reports them).
    pub fn from_config(config: &DinerToml) -> Result<Self, ConfigError> {
        let mut entries = HashMap::new();
        for (name, entry) in &config.cues {
            let Ok(cue) = name.parse::<Cue>() else {
                continue;
            };
            if !entry.duration_secs.is_finite() || entry.duration_secs < 0.0 {
                return Err(ConfigError::InvalidCueDuration {
                    cue: name.clone(),
                    duration_secs: entry.duration_secs,
                });
            }
            entries.insert(
                cue,
                CueDescriptor {
                    duration: secs(entry.duration_secs),
                    resource: entry.resource.clone(),
                },
            );
        }
        Ok(Self { entries })
    }

    pub fn get(&self, cue: Cue) -> Option<&CueDescriptor> {
        self.entries.get(&cue)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Plays a named voice line or animation.
pub trait CuePlayer: Send {
    /// Start playback and return the cue's nominal duration.
    /// A missing cue plays nothing and returns zero.
    fn play(&mut self, cue: Cue) -> Duration;
}

/// Cue player backed by a [`CueCatalog`].
///
/// Playback itself belongs to the rendering host; this resolves durations,
/// logs the resource being played and keeps a history of what was played.
#[derive(Debug, Default)]
pub struct CatalogCuePlayer {
    catalog: CueCatalog,
    history: Vec<Cue>,
}

impl CatalogCuePlayer {
    pub fn new(catalog: CueCatalog) -> Self {
        Self {
            catalog,
            history: Vec::new(),
        }
    }

    /// Cues played so far, oldest first.
    pub fn history(&self) -> &[Cue] {
        &self.history
    }
}

impl CuePlayer for CatalogCuePlayer {
    fn play(&mut self, cue: Cue) -> Duration {
        match self.catalog.get(cue) {
            Some(desc) => {
                debug!(%cue, resource = %desc.resource, duration = ?desc.duration, "Playing cue");
                self.history.push(cue);
                desc.duration
            }
            None => {
                warn!(%cue, "Cue has no descriptor; playing nothing");
                Duration::ZERO
            }
        }
    }
}
