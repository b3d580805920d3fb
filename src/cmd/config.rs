//! Configuration view and validation commands: `diner config`.

use std::path::Path;

use anyhow::{Context, Result};

use super::super::ConfigCommands;

pub fn cmd_config(config_path: &Path, command: Option<ConfigCommands>) -> Result<()> {
    use diner::config::DinerToml;
    use diner::cue::CueCatalog;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Diner Configuration");
            println!("===================");
            println!();

            let toml = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                DinerToml::load(config_path)
                    .with_context(|| format!("Failed to load {}", config_path.display()))?
            } else {
                println!("No diner.toml found at {}; using defaults", config_path.display());
                DinerToml::default()
            };
            println!();

            let t = &toml.timing;
            println!("[timing]");
            println!("  tick_hz = {}", t.tick_hz);
            println!("  walk_delay_secs = {}", t.walk_delay_secs);
            println!("  return_delay_secs = {}", t.return_delay_secs);
            println!("  turn_speed_deg = {}", t.turn_speed_deg);
            println!("  approach_turn_speed_deg = {}", t.approach_turn_speed_deg);
            println!("  cue_floor_secs = {}", t.cue_floor_secs);
            println!();

            let s = &toml.scene;
            println!("[scene]");
            match s.origin {
                Some(origin) => println!("  origin = {}", origin),
                None => println!("  origin = <agent start position>"),
            }
            println!("  destination = {}", s.destination);
            println!("  participant = {}", s.participant);
            println!("  walk_speed = {}", s.walk_speed);
            println!();

            println!("[survey]");
            println!("  questions = {}", toml.survey.questions);
            println!("  options_per_question = {}", toml.survey.options_per_question);
            println!();

            if toml.cues.is_empty() {
                println!("[cues] none configured; every cue falls back to the minimum duration");
            } else {
                println!("[cues]");
                for (name, entry) in &toml.cues {
                    println!("  {} = {}s ({})", name, entry.duration_secs, entry.resource);
                }
            }
            println!();

            println!("Effective values (with env overrides):");
            println!("  record_file = {}", toml.record_file().display());
            println!("  prefs_file = {}", toml.prefs_file().display());
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No diner.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = DinerToml::load(config_path)
                .with_context(|| format!("Failed to load {}", config_path.display()))?;
            CueCatalog::from_config(&toml).context("Invalid cue table")?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("diner.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            DinerToml::starter().save(config_path)?;

            println!("Created diner.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [timing] delays, turn speeds and thresholds");
            println!("  - [scene] origin, destination and participant position");
            println!("  - [cues.<name>] clip durations and resources");
            println!();
        }
    }

    Ok(())
}
