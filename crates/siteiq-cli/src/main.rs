//! SiteIQ command-line driver
//!
//! # Usage
//! ```bash
//! siteiq query "predict delays for foundation" --project P1 --user u-1
//! siteiq batch queries.jsonl
//! siteiq classify "show me open RFIs"
//! siteiq health --json
//! ```

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use siteiq_core::{
    classify_text, Collaborators, HealthRecord, Intent, IntelligenceOrchestrator,
    OrchestratorConfig, Priority, ProjectSnapshot, Query, Response, SnapshotBackend,
};

/// SiteIQ - intelligence orchestration for construction project queries
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Orchestrator configuration (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Project snapshot backing the collaborators (TOML or JSON, default: built-in demo)
    #[arg(short, long, value_name = "FILE")]
    snapshot: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single query and print the response
    Query {
        text: String,

        #[arg(long, default_value = "P1")]
        project: String,

        #[arg(long, default_value = "u-1")]
        user: String,

        /// Skip classification and use this intent
        #[arg(long)]
        intent: Option<Intent>,

        /// Per-query deadline in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Collaborator that must contribute (repeatable)
        #[arg(long = "require", value_name = "LAYER")]
        required: Vec<String>,

        /// Output the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run every query of a JSON-lines file concurrently
    Batch {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Show which intent a text classifies to
    Classify {
        text: String,

        #[arg(long)]
        intent: Option<Intent>,
    },

    /// Print the collaborator health table
    Health {
        #[arg(long)]
        json: bool,
    },
}

/// One line of a batch file
#[derive(Debug, Deserialize)]
struct BatchEntry {
    text: String,
    #[serde(default = "default_project")]
    project: String,
    #[serde(default = "default_user")]
    user: String,
    #[serde(default)]
    intent: Option<Intent>,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    timeout_ms: Option<u64>,
    #[serde(default)]
    required: Vec<String>,
}

fn default_project() -> String {
    "P1".to_string()
}

fn default_user() -> String {
    "u-1".to_string()
}

impl BatchEntry {
    fn into_query(self) -> Query {
        let mut builder = Query::builder()
            .user(self.user)
            .project(self.project)
            .text(self.text)
            .priority(self.priority);
        if let Some(intent) = self.intent {
            builder = builder.intent(intent);
        }
        if let Some(ms) = self.timeout_ms {
            builder = builder.max_response_time(Duration::from_millis(ms));
        }
        for layer in self.required {
            builder = builder.require_layer(layer);
        }
        builder.build()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    match cli.command {
        Commands::Classify { text, intent } => {
            let classified = intent.unwrap_or_else(|| classify_text(&text));
            let source = if intent.is_some() { "explicit" } else { "keywords" };
            println!("{} ({})", classified, source);
            return Ok(());
        }
        Commands::Query {
            text,
            project,
            user,
            intent,
            timeout_ms,
            required,
            json,
        } => {
            let orchestrator = build_orchestrator(cli.config.as_deref(), cli.snapshot.as_deref())?;
            let entry = BatchEntry {
                text,
                project,
                user,
                intent,
                priority: Priority::Normal,
                timeout_ms,
                required,
            };
            let response = orchestrator.process_query(entry.into_query()).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_response(&response);
            }
            if !response.success {
                std::process::exit(1);
            }
        }
        Commands::Batch { file } => {
            let orchestrator =
                Arc::new(build_orchestrator(cli.config.as_deref(), cli.snapshot.as_deref())?);
            let queries = read_batch(&file)?;
            tracing::info!(count = queries.len(), file = %file.display(), "Running batch");

            let handles: Vec<_> = queries
                .into_iter()
                .map(|query| {
                    let orchestrator = Arc::clone(&orchestrator);
                    tokio::spawn(async move { orchestrator.process_query(query).await })
                })
                .collect();

            let mut failed = 0usize;
            for handle in handles {
                let response = handle.await.context("batch query task panicked")?;
                if !response.success {
                    failed += 1;
                }
                println!("{}", summary_line(&response));
            }

            println!();
            print_health(&orchestrator.health_status());
            if failed > 0 {
                println!();
                println!("{} query(s) failed", failed);
            }
        }
        Commands::Health { json } => {
            let orchestrator = build_orchestrator(cli.config.as_deref(), cli.snapshot.as_deref())?;
            let records = orchestrator.health_status();
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                print_health(&records);
                println!();
                println!(
                    "Admission: {}/{} permits free",
                    orchestrator.available_permits(),
                    orchestrator.capacity()
                );
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    if verbose {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_target(false)
            .init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<OrchestratorConfig> {
    let mut config = match path {
        Some(path) => OrchestratorConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => OrchestratorConfig::default(),
    };

    if let Ok(raw) = std::env::var("SITEIQ_MAX_CONCURRENT") {
        let max: usize = raw
            .parse()
            .with_context(|| format!("SITEIQ_MAX_CONCURRENT='{}'", raw))?;
        config = config.with_max_concurrent_queries(max);
    }
    if let Ok(raw) = std::env::var("SITEIQ_LAYER_TIMEOUT_MS") {
        let ms: u64 = raw
            .parse()
            .with_context(|| format!("SITEIQ_LAYER_TIMEOUT_MS='{}'", raw))?;
        config = config.with_layer_timeout(Duration::from_millis(ms));
    }

    Ok(config)
}

fn build_orchestrator(
    config: Option<&Path>,
    snapshot: Option<&Path>,
) -> anyhow::Result<IntelligenceOrchestrator> {
    let config = load_config(config)?;
    let snapshot = match snapshot {
        Some(path) => ProjectSnapshot::from_file(path)
            .with_context(|| format!("loading snapshot {}", path.display()))?,
        None => ProjectSnapshot::demo(),
    };

    let backend = Arc::new(SnapshotBackend::new(snapshot));
    let orchestrator = IntelligenceOrchestrator::new(Collaborators::from_backend(backend), config)?;
    Ok(orchestrator)
}

fn read_batch(path: &Path) -> anyhow::Result<Vec<Query>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading batch file {}", path.display()))?;

    let mut queries = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let entry: BatchEntry = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid batch entry", path.display(), index + 1))?;
        queries.push(entry.into_query());
    }

    if queries.is_empty() {
        bail!("{} contains no queries", path.display());
    }
    Ok(queries)
}

fn summary_line(response: &Response) -> String {
    let intent = response
        .intent
        .map(|intent| intent.to_string())
        .unwrap_or_else(|| "-".to_string());
    let outcome = match &response.error {
        Some(error) => format!("ERROR {}", error),
        None => response.summary.clone(),
    };
    format!(
        "{} [{:?}] {:<14} {:>6}ms  {}",
        response.query_id,
        response.status,
        intent,
        response.processing_time.as_millis(),
        outcome
    )
}

fn print_response(response: &Response) {
    println!("QUERY:      {}", response.query_id);
    println!("STATUS:     {:?}", response.status);
    if let Some(intent) = response.intent {
        println!("INTENT:     {}", intent);
    }
    println!("CONFIDENCE: {:.0}%", response.confidence * 100.0);
    println!("TIME:       {}ms", response.processing_time.as_millis());
    let layers: Vec<_> = response.layers_used.iter().map(|l| l.to_string()).collect();
    println!("LAYERS:     {}", layers.join(", "));
    println!();
    println!("{}", response.summary);

    if let Some(error) = &response.error {
        println!();
        println!("Error: {}", error);
    }

    if !response.alerts.is_empty() {
        println!();
        println!("Alerts");
        for alert in &response.alerts {
            println!("   [{:?}] {} - {}", alert.severity, alert.title, alert.message);
        }
    }
    if !response.insights.is_empty() {
        println!();
        println!("Insights");
        for insight in &response.insights {
            println!(
                "   {} ({:.0}%): {}",
                insight.title,
                insight.confidence * 100.0,
                insight.description
            );
        }
    }
    if !response.recommendations.is_empty() {
        println!();
        println!("Recommendations");
        for rec in &response.recommendations {
            println!("   [{:?}] {}: {}", rec.priority, rec.title, rec.description);
        }
    }
    if !response.predictions.is_empty() {
        println!();
        println!("Predictions");
        for prediction in &response.predictions {
            println!(
                "   {} p={:.2} {:?}: {}",
                prediction.subject, prediction.probability, prediction.trend, prediction.description
            );
        }
    }
    if !response.layer_failures.is_empty() {
        println!();
        println!("Failed calls");
        for failure in &response.layer_failures {
            println!(
                "   {}::{}: {}",
                failure.collaborator, failure.operation, failure.error
            );
        }
    }
    if let Some(follow_up) = &response.follow_up {
        println!();
        println!("-> {}", follow_up);
    }
}

fn print_health(records: &[HealthRecord]) {
    println!(
        "{:<16} {:<8} {:>8} {:>7} {:>9}  LAST ACTIVITY",
        "LAYER", "HEALTHY", "REQUESTS", "ERRORS", "LATENCY"
    );
    for record in records {
        let last = record
            .last_activity
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{:<16} {:<8} {:>8} {:>7} {:>7}ms  {}",
            record.layer_name.to_string(),
            if record.healthy { "yes" } else { "NO" },
            record.request_count,
            record.error_count,
            record.last_latency.as_millis(),
            last
        );
    }
}
