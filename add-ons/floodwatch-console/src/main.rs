//! Floodwatch console
//!
//! Generates the threat scene for a location, then reads proposed solutions from stdin
//! and runs them through the session loop until the crisis chain resolves.
//!
//! Usage: `floodwatch <location> [--resources <file.csv|file.tsv|file.txt>] [--json]`

use floodwatch_core::{
    providers_from_config, CoreConfig, ResourceIngestor, ResourceLedger, SessionController,
    SessionError, SessionPhase, SolveOutcome, StartOutcome,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const SUPPORTED_RESOURCE_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];

struct Args {
    location: String,
    resources: Option<PathBuf>,
    json: bool,
}

fn parse_args() -> Result<Args, BoxError> {
    let mut location = Vec::new();
    let mut resources = None;
    let mut json = false;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--resources" => {
                let path = args.next().ok_or("--resources needs a file path")?;
                resources = Some(PathBuf::from(path));
            }
            "--json" => json = true,
            _ => location.push(arg),
        }
    }
    let location = location.join(" ");
    if location.trim().is_empty() {
        return Err("usage: floodwatch <location> [--resources <file>] [--json]".into());
    }
    Ok(Args {
        location,
        resources,
        json,
    })
}

async fn read_resources(path: &Path, ingestor: &ResourceIngestor) -> Result<ResourceLedger, BoxError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !SUPPORTED_RESOURCE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(format!(
            "unsupported resource file '{}': export the sheet as CSV or TSV",
            path.display()
        )
        .into());
    }
    let text = tokio::fs::read_to_string(path).await?;
    Ok(ingestor.ingest(&text).await?)
}

fn print_start(outcome: &StartOutcome, json: bool) -> Result<(), BoxError> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }
    let forecast = &outcome.forecast;
    println!("Session {}", outcome.session_id);
    println!("Outlook ({}):", forecast.time_horizon);
    for day in &forecast.daily_threats {
        println!("  Day {}:", day.day);
        for line in day
            .critical_infrastructure_problems
            .iter()
            .chain(&day.public_health_risks)
            .chain(&day.economic_disruptions)
            .chain(&day.environmental_concerns)
        {
            println!("    - {line}");
        }
    }
    let threat = &forecast.most_potential_threat;
    println!("\nMost potential threat: {} (score {})", threat.name, threat.score);
    println!("{}\n", threat.description);
    Ok(())
}

fn print_solve(outcome: &SolveOutcome, json: bool) -> Result<(), BoxError> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }
    let analysis = &outcome.analysis;
    println!("\nRound {}: {}", outcome.round, analysis.short_response);
    println!("Feedback: {}", analysis.feedback);
    println!(
        "Severity: {} ({})",
        outcome.severity_score, analysis.updated_severity.description
    );
    println!("Resources:\n{}", outcome.updated_resources.summary());
    if !analysis.alternative_solution.solution.is_empty() {
        println!("Alternative: {}", analysis.alternative_solution.solution);
    }
    if let Some(threat) = &outcome.follow_up_threat {
        println!("\nFollow-up threat: {} (score {})", threat.name, threat.score);
        println!("{}", threat.description);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[floodwatch] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = parse_args()?;
    let config = CoreConfig::load()?;
    let (oracle, search) = providers_from_config(&config)?;
    tracing::info!(
        llm_mode = ?config.llm_mode,
        oracle = oracle.name(),
        search = search.name(),
        storage = ?config.storage,
        "floodwatch console starting"
    );

    let resources = match &args.resources {
        Some(path) => {
            let ingestor = ResourceIngestor::new(Arc::clone(&oracle), config.reasoning_model.clone());
            Some(read_resources(path, &ingestor).await?)
        }
        None => None,
    };

    let controller = SessionController::from_config(&config, oracle, search)?;
    let started = tokio::select! {
        result = controller.start(&args.location, resources) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("CTRL-C received during scene generation; exiting");
            return Ok(());
        }
    };
    print_start(&started, args.json)?;
    let session_id = started.session_id;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        println!("Propose a solution (empty line to quit):");
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; shutting down console");
                break;
            }
        };
        let Some(solution) = line.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()) else {
            break;
        };

        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };
        let result = controller
            .solve_with_cancel(&session_id, &solution, cancel)
            .await;
        watcher.abort();

        match result {
            Ok(outcome) => {
                print_solve(&outcome, args.json)?;
                if outcome.phase == SessionPhase::Terminal {
                    println!("\nSeverity is under control and no follow-up threat remains. Session resolved.");
                    break;
                }
            }
            Err(SessionError::Cancelled(_)) => {
                println!("Cancelled; the session is unchanged.");
            }
            Err(e @ SessionError::Analysis(_)) | Err(e @ SessionError::Store(_)) => {
                tracing::error!(error = %e, "solve failed; session unchanged");
                println!("Analysis failed ({e}). Try again.");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
