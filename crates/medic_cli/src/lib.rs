//! medic_cli - CLI commands for the medic agent
//!
//! This crate provides:
//! - clap-based command definitions
//! - the 24/7 monitor loop (`medic run`)
//! - knowledge-base inspection commands (problems, solutions, report)
//! - manual teaching and collaboration sync

use clap::{Parser, Subcommand, ValueEnum};
use medic_collab::{CollabBus, SharingGate};
use medic_config::MedicConfig;
use medic_learn::{Learner, LearningReport};
use medic_monitor::{Monitor, Scheduler};
use medic_remedy::{RemedyContext, RemedyRunner, Step};
use medic_store::{KnowledgeStore, SolutionRow};
use medic_triage::{Analyzer, ProblemContext};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// CLI errors
#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Config error: {0}")]
    ConfigError(#[from] medic_config::ConfigError),

    #[error("Store error: {0}")]
    StoreError(#[from] medic_store::StoreError),

    #[error("Triage error: {0}")]
    TriageError(#[from] medic_triage::TriageError),

    #[error("Learning error: {0}")]
    LearnError(#[from] medic_learn::LearnError),

    #[error("Collaboration error: {0}")]
    CollabError(#[from] medic_collab::CollabError),

    #[error("Monitor error: {0}")]
    MonitorError(#[from] medic_monitor::MonitorError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output for agent consumption
    Json,
}

/// Main CLI application
#[derive(Parser, Debug)]
#[command(name = "medic")]
#[command(
    author,
    version,
    about = "Medic - self-healing monitor with a learned remediation knowledge base"
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format for commands
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the 24/7 monitor loop until ctrl-c
    Run,

    /// Run one health check cycle and print the snapshot
    Status,

    /// Teach the agent a working solution for a problem
    Teach {
        /// Problem kind (e.g. BACKEND_DOWN, HIGH_MEMORY)
        #[arg(long)]
        kind: String,

        /// The raw error message the problem presents with
        #[arg(long)]
        message: String,

        /// Human description of the solution
        #[arg(long)]
        describe: String,

        /// Solution steps, comma-separated (e.g. restart_service:backend,wait:5)
        #[arg(long, value_delimiter = ',')]
        steps: Vec<String>,
    },

    /// Generate the learning report
    Report,

    /// Pull shared solutions published by other agents
    Sync,

    /// List the most frequent known problems
    Problems {
        /// Maximum rows to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// List learned solutions for one problem fingerprint
    Solutions {
        /// Problem fingerprint
        #[arg(short, long)]
        fingerprint: String,
    },
}

impl Cli {
    /// Run the CLI
    pub async fn run(self) -> Result<(), CliError> {
        let config = MedicConfig::load(self.config.as_deref())?;
        let store = open_store(&config)?;

        match self.command {
            Commands::Run => {
                let monitor = Monitor::new(config, store);
                Scheduler::new(monitor).run().await?;
            }
            Commands::Status => {
                let monitor = Monitor::new(config, store);
                let snapshot = monitor.run_cycle().await?;
                match self.format {
                    OutputFormat::Json => print_json(&snapshot)?,
                    OutputFormat::Text => print_snapshot(&snapshot),
                }
            }
            Commands::Teach {
                kind,
                message,
                describe,
                steps,
            } => {
                let steps: Vec<Step> = steps
                    .iter()
                    .map(|s| Step::parse(s.trim()))
                    .collect();
                if steps.is_empty() {
                    return Err(CliError::CommandFailed(
                        "at least one step is required".to_string(),
                    ));
                }
                let row = teach(&store, &config, &kind, &message, &describe, &steps)?;
                match self.format {
                    OutputFormat::Json => print_json(&row)?,
                    OutputFormat::Text => {
                        println!("Learned solution #{} for {}", row.id, row.fingerprint);
                        println!(
                            "  confidence {:.2} ({} successes, {} failures)",
                            row.confidence, row.success_count, row.failure_count
                        );
                    }
                }
            }
            Commands::Report => {
                let report =
                    LearningReport::generate(&store, &config.agent.id, &config.learning)?;
                let path = report.write_to(&config.housekeeping.report_dir)?;
                match self.format {
                    OutputFormat::Json => print_json(&report)?,
                    OutputFormat::Text => {
                        println!("Learning report written to {}", path.display());
                        println!(
                            "  {} problems, {} solutions ({} high-confidence), immunity: {:?}",
                            report.stats.total_problems,
                            report.stats.total_solutions,
                            report.stats.high_confidence_solutions,
                            report.immunity
                        );
                        for rec in &report.recommendations {
                            println!("  - {rec}");
                        }
                    }
                }
            }
            Commands::Sync => {
                let bus = CollabBus::new(
                    store,
                    config.agent.id.clone(),
                    SharingGate::from_config(&config.learning),
                );
                let summary = bus.sync()?;
                match self.format {
                    OutputFormat::Json => print_json(&summary)?,
                    OutputFormat::Text => println!(
                        "Sync done: {} imported, {} already known, {} failed",
                        summary.imported, summary.skipped, summary.failed
                    ),
                }
            }
            Commands::Problems { limit } => {
                let problems = store.top_problems(limit)?;
                match self.format {
                    OutputFormat::Json => print_json(&problems)?,
                    OutputFormat::Text => {
                        if problems.is_empty() {
                            println!("No problems recorded yet");
                        }
                        for p in &problems {
                            let confidence = p
                                .best_confidence
                                .map_or_else(|| "none".to_string(), |c| format!("{c:.2}"));
                            println!(
                                "{}  {}  x{}  best solution: {}",
                                &p.fingerprint[..p.fingerprint.len().min(12)],
                                p.kind,
                                p.occurrence_count,
                                confidence
                            );
                        }
                    }
                }
            }
            Commands::Solutions { fingerprint } => {
                let solutions = store.solutions_for(&fingerprint)?;
                match self.format {
                    OutputFormat::Json => print_json(&solutions)?,
                    OutputFormat::Text => {
                        if solutions.is_empty() {
                            println!("No solutions for {fingerprint}");
                        }
                        for s in &solutions {
                            println!(
                                "#{}  {:.2}  {}/{}  [{}]  {}",
                                s.id,
                                s.confidence,
                                s.success_count,
                                s.total_attempts(),
                                s.provenance.as_str(),
                                s.description
                            );
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

fn open_store(config: &MedicConfig) -> Result<KnowledgeStore, CliError> {
    if let Some(parent) = config.store.path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(KnowledgeStore::open(&config.store.path)?)
}

/// Record a manually vetted solution: analyze the symptom so the problem
/// exists in the store, then log one successful application of `steps`.
fn teach(
    store: &KnowledgeStore,
    config: &MedicConfig,
    kind: &str,
    message: &str,
    description: &str,
    steps: &[Step],
) -> Result<SolutionRow, CliError> {
    let analyzer = Analyzer::new(store.clone(), config.agent.id.clone());
    let context = ProblemContext::for_kind(kind, "manual_teach");
    let problem = analyzer.analyze(kind, message, &context)?;

    let runner = RemedyRunner::new(RemedyContext {
        services: config.monitor.services.clone(),
        housekeeping: config.housekeeping.clone(),
        probe_timeout: Duration::from_secs(config.monitor.probe_timeout_secs),
    });
    let learner = Learner::new(
        store.clone(),
        &config.learning,
        config.agent.id.clone(),
        runner,
    );
    let row = learner.record_outcome(&problem.fingerprint, description, steps, true)?;
    Ok(row)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_snapshot(snapshot: &medic_monitor::HealthSnapshot) {
    println!("Overall: {}  ({})", snapshot.overall, snapshot.checked_at);
    for svc in &snapshot.services {
        let detail = svc.detail.as_deref().unwrap_or("");
        println!("  service {:<20} {}  {}", svc.name, svc.state, detail);
    }
    println!(
        "  {:<28} {}  {}",
        "databases",
        snapshot.database.state,
        snapshot.database.detail.as_deref().unwrap_or("")
    );
    println!(
        "  {:<28} {}  {}",
        "apis",
        snapshot.apis.state,
        snapshot.apis.detail.as_deref().unwrap_or("")
    );
    println!(
        "  {:<28} {}  {}",
        "security",
        snapshot.security.state,
        snapshot.security.detail.as_deref().unwrap_or("")
    );
    if let Some(v) = &snapshot.vitals {
        println!(
            "  cpu {:.1}%  memory {:.1}%  disk free {:.1}%  load {:.2}",
            v.cpu_pct, v.memory_pct, v.disk_free_pct, v.load_one
        );
    }
}
