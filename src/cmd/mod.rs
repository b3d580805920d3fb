//! CLI command implementations.
//!
//! Each submodule owns one `Commands` variant:
//!
//! | Module        | Commands handled |
//! |---------------|------------------|
//! | `run`         | `Run`            |
//! | `participant` | `Participant`    |
//! | `config`      | `Config`         |

pub mod config;
pub mod participant;
pub mod run;

pub use config::cmd_config;
pub use participant::cmd_participant;
pub use run::{RunOptions, cmd_run};
