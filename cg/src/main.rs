//! Curricula - CLI entry point
//!
//! Drives the generation engine from the command line: run a demo session,
//! score a request, or inspect configuration.

use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, eyre};
use tracing::{debug, info};

use curricula::backends::{NullIndex, NullSearch, OpenAIGenerator};
use curricula::cli::{Cli, Command, RequestArgs};
use curricula::config::Config;
use curricula::domain::{ContentRequest, SessionStatus, ValidationFeedback};
use curricula::events::{EventBus, spawn_event_logger};
use curricula::generation::GenerationCoordinator;
use curricula::refine::KeywordClassifier;
use curricula::scoring::{ScoringEngine, StrategySelector};
use curricula::session::SessionStateMachine;
use curricula::strategy::StrategySet;

fn resolve_log_level(cli_log_level: Option<&str>) -> tracing::Level {
    match cli_log_level.map(str::to_uppercase).as_deref() {
        None | Some("INFO") => tracing::Level::INFO,
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(cli_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("curricula")
        .join("logs");
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let level = resolve_log_level(cli_log_level);

    let log_file = fs::File::create(log_dir.join("cg.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!("main: dispatching command");
    match cli.command {
        Command::Demo { request, auto_approve } => {
            debug!(auto_approve, "main: matched Demo command");
            cmd_demo(&config, request.into_request(), auto_approve).await
        }
        Command::Score { request } => {
            debug!("main: matched Score command");
            cmd_score(&config, &request.into_request())
        }
        Command::Config => {
            debug!("main: matched Config command");
            cmd_config(&config)
        }
    }
}

/// Run one session end to end against the configured generator
async fn cmd_demo(config: &Config, request: ContentRequest, auto_approve: bool) -> Result<()> {
    debug!("cmd_demo: called");
    let bus: Arc<EventBus> = EventBus::with_default_capacity().into();
    spawn_event_logger(bus.clone()).context("Failed to start event logger")?;

    let generator = Arc::new(OpenAIGenerator::from_config(&config.generator)?);
    let index = Arc::new(NullIndex);
    let strategies = StrategySet::full(generator, index.clone(), Arc::new(NullSearch), &config.generator);
    let coordinator = Arc::new(GenerationCoordinator::new(Arc::new(strategies)));
    let machine = SessionStateMachine::new(
        bus,
        index,
        coordinator,
        Arc::new(KeywordClassifier::default()),
        config,
    );

    let session = machine.create_session().await?;
    println!("Session {}", session.id.cyan());
    machine.submit_request(&session.id, request).await?;
    machine.start_processing(&session.id).await?;

    let mut last_step = String::new();
    loop {
        let status = machine.get_status(&session.id).await?;
        if status.current_step != last_step {
            println!("  [{:>3}%] {}", status.progress_percentage, status.current_step.dimmed());
            last_step = status.current_step.clone();
        }
        match status.status {
            SessionStatus::UserValidation => {
                let current = machine.get_session(&session.id).await?.result;
                if let Some(result) = current {
                    println!("\n{}", "=== Capaian Pembelajaran (CP) ===".bold());
                    println!("{}\n", result.primary);
                    println!("{}", "=== Alur Tujuan Pembelajaran (ATP) ===".bold());
                    println!("{}\n", result.secondary);
                    println!(
                        "Strategy {} with confidence {:.2}",
                        result.strategy.to_string().yellow(),
                        result.confidence
                    );
                }

                let feedback = if auto_approve {
                    ValidationFeedback {
                        approved: true,
                        feedback: None,
                        requested_changes: vec![],
                    }
                } else {
                    read_verdict()?
                };
                let updated = machine.submit_validation(&session.id, feedback).await?;
                if updated.status == SessionStatus::Completed {
                    break;
                }
                last_step.clear();
            }
            SessionStatus::Completed => break,
            SessionStatus::Error => {
                return Err(eyre!(
                    "session failed: {}",
                    machine
                        .get_status(&session.id)
                        .await?
                        .last_error
                        .unwrap_or_else(|| "unknown error".to_string())
                ));
            }
            _ => tokio::time::sleep(Duration::from_millis(200)).await,
        }
    }

    let result = machine.get_final_result(&session.id).await?;
    println!(
        "{} Completed via {} after {} refinement round(s)",
        "✓".green(),
        result.processing_metadata.strategy.to_string().yellow(),
        result.processing_metadata.refinement_iterations
    );
    Ok(())
}

/// Ask the user for a verdict; any text other than yes becomes feedback
fn read_verdict() -> Result<ValidationFeedback> {
    print!("Approve? [y = accept, or type feedback]: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let line = line.trim().to_string();
    if line.eq_ignore_ascii_case("y") || line.eq_ignore_ascii_case("yes") {
        Ok(ValidationFeedback {
            approved: true,
            feedback: None,
            requested_changes: vec![],
        })
    } else {
        Ok(ValidationFeedback {
            approved: false,
            feedback: Some(line),
            requested_changes: vec![],
        })
    }
}

/// Score a request offline and print the strategy decision
fn cmd_score(config: &Config, request: &ContentRequest) -> Result<()> {
    debug!("cmd_score: called");
    let engine = ScoringEngine::new(config.weights.clone());
    let selector = StrategySelector::new(config.thresholds.clone());

    let scores = engine.score(request, &[]);
    let decision = selector.select(&scores);
    let analysis = engine.analyze(request, scores, &decision);

    println!("Query: {}", request.query().cyan());
    println!(
        "Complexity: {} ({:.2})",
        analysis.complexity_level.as_str().yellow(),
        analysis.complexity_score
    );
    println!(
        "Scores: template {:.2} | advanced {:.2} | graph {:.2}",
        scores.template_matching, scores.advanced, scores.graph
    );
    println!(
        "{} {} (confidence {:.2})",
        "Selected:".bold(),
        decision.strategy.to_string().green(),
        decision.confidence
    );
    println!("Reason: {}", decision.justification);
    let fallbacks: Vec<String> = decision.fallbacks.iter().map(ToString::to_string).collect();
    println!("Fallbacks: {}", fallbacks.join(", "));
    println!("Estimated processing: {}s", analysis.estimated_seconds);
    Ok(())
}

/// Print the effective configuration as YAML
fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    println!("{}", yaml);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::resolve_log_level;

    #[test]
    fn test_info_is_a_known_level() {
        assert_eq!(resolve_log_level(Some("INFO")), tracing::Level::INFO);
        assert_eq!(resolve_log_level(Some("info")), tracing::Level::INFO);
        assert_eq!(resolve_log_level(None), tracing::Level::INFO);
    }

    #[test]
    fn test_level_aliases_and_fallback() {
        assert_eq!(resolve_log_level(Some("debug")), tracing::Level::DEBUG);
        assert_eq!(resolve_log_level(Some("warning")), tracing::Level::WARN);
        assert_eq!(resolve_log_level(Some("bogus")), tracing::Level::INFO);
    }
}
