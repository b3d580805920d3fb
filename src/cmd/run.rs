//! Participant session: `diner run`.
//!
//! Without `--autopilot` the operator drives the UI from stdin, one command
//! per line (see [`parse_console_line`]).

use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{Instrument, info, warn};

use diner::gate::{ConfirmChoice, MenuEvent, UiEvent};

pub struct RunOptions {
    pub autopilot: bool,
    pub order: String,
    pub answers: Vec<u32>,
    pub time_scale: f64,
}

/// One line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Event(UiEvent),
    Stop,
}

/// Parse an operator line: `order`, `food <id>`, `yes`, `no`, `answer <n>`, `stop`.
pub fn parse_console_line(line: &str) -> Result<Option<ConsoleCommand>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let command = match (verb.to_ascii_lowercase().as_str(), arg) {
        ("order", None) => ConsoleCommand::Event(UiEvent::Menu(MenuEvent::OrderNow)),
        ("food", Some(id)) => {
            ConsoleCommand::Event(UiEvent::Menu(MenuEvent::SelectFood(id.to_string())))
        }
        ("yes", None) => confirm(ConfirmChoice::Yes),
        ("no", None) => confirm(ConfirmChoice::No),
        ("answer", Some(n)) => {
            let option = n
                .parse::<u32>()
                .with_context(|| format!("'{}' is not an option number", n))?;
            ConsoleCommand::Event(UiEvent::SurveyOption(option))
        }
        ("stop" | "quit", None) => ConsoleCommand::Stop,
        _ => anyhow::bail!(
            "Unrecognized command '{}'. Expected: order, food <id>, yes, no, answer <n>, stop",
            line.trim()
        ),
    };
    Ok(Some(command))
}

fn confirm(choice: ConfirmChoice) -> ConsoleCommand {
    ConsoleCommand::Event(UiEvent::Menu(MenuEvent::Confirm { choice, on: true }))
}

pub async fn cmd_run(config_path: &Path, options: RunOptions) -> Result<()> {
    use diner::autopilot::Autopilot;
    use diner::config::DinerToml;
    use diner::cue::{CatalogCuePlayer, CueCatalog};
    use diner_common::{Point, Session};
    use diner::gate;
    use diner::host::Host;
    use diner::identity::ParticipantPrefs;
    use diner::logging::run_span;
    use diner::mover::SimulatedMover;
    use diner::orchestrator::{Orchestrator, RunStatus};
    use diner::record::CsvRecordWriter;
    use diner::session::SessionStore;

    let config = DinerToml::load_or_default(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    for warning in config.validate() {
        warn!("{}", warning);
    }
    let catalog = CueCatalog::from_config(&config).context("Invalid cue table")?;
    if catalog.is_empty() {
        warn!("No cues configured; every cue uses the minimum duration");
    }

    let identity = ParticipantPrefs::load_or_init(&config.prefs_file())
        .context("Failed to load participant preferences")?;
    let session = SessionStore::new(Session::new(
        identity.participant_id.clone(),
        identity.condition,
        config.survey.questions,
    ));

    let start = config.scene.origin.unwrap_or(Point::new(0.0, 0.0));
    let mut orchestrator = Orchestrator::new(&config, session);
    orchestrator.attach_mover(SimulatedMover::new(
        start,
        config.scene.walk_speed,
        config.scene.stopping_distance,
    ));
    orchestrator.attach_cue_player(CatalogCuePlayer::new(catalog));
    let (board, gate) = gate::channel();
    orchestrator.attach_gate(gate);
    orchestrator.attach_record_sink(CsvRecordWriter::new());
    let record_path = orchestrator.record_path().to_path_buf();

    let (host, handle) = Host::new(orchestrator, board, config.timing.tick_period());
    let mut host = host.with_time_scale(options.time_scale);

    if options.autopilot {
        host = host.with_autopilot(Autopilot::new(options.order.clone(), options.answers.clone()));
    } else {
        println!(
            "{} order | food <id> | yes | no | answer <n> | stop",
            console::style("Commands:").bold()
        );
        let events = handle.events.clone();
        let cancel = handle.cancel.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match parse_console_line(&line) {
                    Ok(Some(ConsoleCommand::Event(event))) => {
                        if events.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(Some(ConsoleCommand::Stop)) => {
                        cancel.cancel();
                        break;
                    }
                    Ok(None) => {}
                    Err(e) => eprintln!("{}", console::style(e).yellow()),
                }
            }
        });
    }

    let cancel = handle.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let run_id = uuid::Uuid::new_v4().to_string();
    let span = run_span(&run_id, &identity.participant_id, identity.condition.get());
    info!(parent: &span, time_scale = options.time_scale, autopilot = options.autopilot, "Launching run");

    let status = host
        .run()
        .instrument(span)
        .await
        .context("Run could not be completed")?;

    match status {
        RunStatus::Completed => {
            println!(
                "{} participant {} recorded in {}",
                console::style("Session complete:").green().bold(),
                identity.participant_id,
                record_path.display()
            );
        }
        RunStatus::Idle => {
            println!("{}", console::style("Run stopped before completion.").yellow());
        }
        RunStatus::Failed | RunStatus::Running => {
            anyhow::bail!("Run ended with status {}", status);
        }
    }

    Ok(())
}
