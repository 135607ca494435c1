use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use valuation_desk::config::AppConfig;
use valuation_desk::error::AppError;
use valuation_desk::telemetry;
use valuation_desk::workflows::reportgen::memory::{
    InMemoryBilling, InMemoryPacks, InMemoryProfiles, InMemoryReleases, InMemoryWorkOrders,
    RecordingAuditSink, SnapshotSpineExporter,
};
use valuation_desk::workflows::reportgen::{
    reportgen_router, ContractDocument, ContractRulesEngine, PipelineError, ReportgenPipeline,
    RulesConfig,
};

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
}

#[derive(Parser, Debug)]
#[command(
    name = "Valuation Desk",
    about = "Administer valuation-report work orders from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Contract document utilities
    Contract {
        #[command(subcommand)]
        command: ContractCommand,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum ContractCommand {
    /// Run the rules engine over a contract document read from a JSON file
    Recompute(RecomputeArgs),
}

#[derive(Args, Debug)]
struct RecomputeArgs {
    /// Path to a JSON contract document
    #[arg(long)]
    input: PathBuf,
    /// Ruleset version to apply (defaults to the configured version)
    #[arg(long)]
    ruleset: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Contract {
            command: ContractCommand::Recompute(args),
        } => run_contract_recompute(args),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(config.environment, &config.telemetry)?;

    let work_orders = Arc::new(InMemoryWorkOrders::default());
    let pipeline = Arc::new(ReportgenPipeline::new(
        work_orders.clone(),
        Arc::new(InMemoryProfiles::default()),
        Arc::new(InMemoryPacks::default()),
        Arc::new(InMemoryReleases::default()),
        Arc::new(SnapshotSpineExporter::new(work_orders)),
        Arc::new(InMemoryBilling::default()),
        Arc::new(RecordingAuditSink::default()),
        RulesConfig::with_version(config.pipeline.ruleset_version.clone()),
    ));

    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .with_state(state)
        .merge(reportgen_router(pipeline));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "valuation desk ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_contract_recompute(args: RecomputeArgs) -> Result<(), AppError> {
    let raw = std::fs::read_to_string(&args.input)?;
    let contract = parse_contract(&raw)?;

    let engine = match args.ruleset {
        Some(version) => ContractRulesEngine::with_version(version),
        None => {
            let config = AppConfig::load()?;
            ContractRulesEngine::with_version(config.pipeline.ruleset_version)
        }
    };

    let outcome = engine.recompute(&contract);

    println!("Ruleset: {}", outcome.ruleset_version);
    if outcome.warnings.is_empty() {
        println!("Warnings: none");
    } else {
        println!("Warnings:");
        for warning in &outcome.warnings {
            println!("- [{:?}] {}: {}", warning.level, warning.code, warning.message);
        }
    }

    let computed = serde_json::to_string_pretty(&outcome.contract.computed_values)
        .map_err(|err| PipelineError::validation(format!("cannot render computed values: {err}")))?;
    println!("\nComputed values\n{computed}");

    let meta = &outcome.contract.meta;
    println!(
        "\nClassification: bank_type={:?} value_slab={:?} template={:?}",
        meta.bank_type, meta.value_slab, meta.template_selector
    );

    Ok(())
}

fn parse_contract(raw: &str) -> Result<ContractDocument, PipelineError> {
    serde_json::from_str(raw)
        .map_err(|err| PipelineError::validation(format!("input is not a contract document: {err}")))
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_contract_accepts_partial_documents() {
        let contract = parse_contract(r#"{"party": {"bank_name": "SBI Pune"}}"#)
            .expect("partial document parses");
        assert_eq!(contract.party.bank_name.as_deref(), Some("SBI Pune"));
    }

    #[test]
    fn parse_contract_rejects_malformed_json() {
        let err = parse_contract("not json").expect_err("malformed input fails");
        assert!(err.to_string().contains("not a contract document"));
    }
}
