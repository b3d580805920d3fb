//! Participant assignment: `diner participant`.

use std::path::Path;

use anyhow::{Context, Result};

use super::super::ParticipantCommands;

pub fn cmd_participant(config_path: &Path, command: ParticipantCommands) -> Result<()> {
    use diner::config::DinerToml;
    use diner::identity::ParticipantPrefs;

    let config = DinerToml::load_or_default(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let prefs_path = config.prefs_file();

    match command {
        ParticipantCommands::Set { id, condition } => {
            if id.trim().is_empty() {
                anyhow::bail!("Participant id must not be empty");
            }
            let mut prefs = ParticipantPrefs::load(&prefs_path)?;
            prefs
                .assign(id.trim(), condition)
                .context("Invalid participant assignment")?;
            prefs
                .save(&prefs_path)
                .with_context(|| format!("Failed to save {}", prefs_path.display()))?;

            println!(
                "{} participant {}{}",
                console::style("Assigned").green().bold(),
                id.trim(),
                condition
                    .map(|c| format!(", condition {}", c))
                    .unwrap_or_default()
            );
            println!("Saved to {}", prefs_path.display());
        }
        ParticipantCommands::Show => {
            let identity = ParticipantPrefs::load_or_init(&prefs_path)?;
            let profile = identity.condition.profile();
            println!("Participant: {}", identity.participant_id);
            println!("Condition:   {}", identity.condition);
            println!("  ambience      = {}", profile.ambience);
            println!("  white_balance = {}", profile.white_balance);
            println!("Prefs file:  {}", prefs_path.display());
        }
    }

    Ok(())
}
