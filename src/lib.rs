pub mod autopilot;
pub mod config;
pub mod cue;
pub mod errors;
pub mod gate;
pub mod host;
pub mod identity;
pub mod logging;
pub mod mover;
pub mod orchestrator;
pub mod record;
pub mod session;
pub mod survey;
