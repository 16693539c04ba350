use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use studio_payroll::config::AppConfig;
use studio_payroll::error::AppError;
use studio_payroll::payroll::memory::{
    MemoryClassStore, MemoryFormulaStore, MemoryInstructorStore, MemoryPaymentStore,
};
use studio_payroll::payroll::{
    payroll_router, ImportOptions, ImportReport, PayPeriod, PayrollApi, PayrollRunReport,
    PayrollSettings, PeriodId,
};
use studio_payroll::telemetry;
use tracing::info;

type MemoryPayrollApi =
    PayrollApi<MemoryFormulaStore, MemoryClassStore, MemoryInstructorStore, MemoryPaymentStore>;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Studio Payroll Engine",
    about = "Compute and serve periodic instructor pay from class-attendance data",
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
    /// Batch payroll operations from the command line
    Payroll {
        #[command(subcommand)]
        command: PayrollCommand,
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
enum PayrollCommand {
    /// Import a schedule export and compute the period's payments
    Run(PayrollRunArgs),
}

#[derive(Args, Debug)]
struct PayrollRunArgs {
    /// Schedule CSV export to ingest
    #[arg(long)]
    schedule_csv: PathBuf,
    /// Period identifier, e.g. 2026-07
    #[arg(long)]
    period_id: String,
    /// First day of the period (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    starts_on: NaiveDate,
    /// Last day of the period (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    ends_on: NaiveDate,
    /// Replace previously ingested classes for the weeks the export touches
    #[arg(long)]
    replace_weeks: bool,
    /// Print the per-class pay breakdown for every payment
    #[arg(long)]
    list_classes: bool,
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
        Command::Payroll {
            command: PayrollCommand::Run(args),
        } => run_payroll(args),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn memory_api(settings: PayrollSettings) -> Arc<MemoryPayrollApi> {
    Arc::new(PayrollApi::new(
        Arc::new(MemoryFormulaStore::default()),
        Arc::new(MemoryClassStore::default()),
        Arc::new(MemoryInstructorStore::default()),
        Arc::new(MemoryPaymentStore::default()),
        settings,
    ))
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let api = memory_api(config.payroll.clone());

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(payroll_router(api))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "studio payroll engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_payroll(args: PayrollRunArgs) -> Result<(), AppError> {
    let PayrollRunArgs {
        schedule_csv,
        period_id,
        starts_on,
        ends_on,
        replace_weeks,
        list_classes,
    } = args;

    let config = AppConfig::load()?;
    let api = memory_api(config.payroll);

    let period = PayPeriod {
        id: PeriodId(period_id),
        starts_on,
        ends_on,
    };

    let csv = std::fs::read_to_string(schedule_csv)?;
    let options = ImportOptions {
        replace_weeks,
        ..ImportOptions::default()
    };
    let import = api.import(&csv, &period, &options)?;
    let report = api.run(&period)?;

    render_reports(&period, &import, &report, list_classes, &api);
    Ok(())
}

fn render_reports(
    period: &PayPeriod,
    import: &ImportReport,
    report: &PayrollRunReport,
    list_classes: bool,
    api: &MemoryPayrollApi,
) {
    println!(
        "Payroll run for period {} ({} -> {})",
        period.id.0, period.starts_on, period.ends_on
    );

    println!(
        "\nImport: {} rows, {} classes created, {} new instructors, {} rows skipped",
        import.rows, import.classes_created, import.instructors_created, import.skipped_rows
    );
    if !import.errors.is_empty() {
        println!("Import problems");
        for error in &import.errors {
            println!("- row {}: {}", error.row, error.message);
        }
    }

    println!(
        "\nPayments: {} computed, {} left untouched (approved), {} errors",
        report.processed, report.skipped, report.error_count
    );
    for payment in &report.payments {
        let note = if payment.no_op {
            " [approved, untouched]"
        } else {
            ""
        };
        println!(
            "- {}: final {:.2} (base {:.2}, covers {:.2}, bonus {:.2}, penalty -{:.2}, retention -{:.2}){}",
            payment.instructor.0,
            payment.final_pay,
            payment.base_amount,
            payment.cover_pay,
            payment.bonus,
            payment.penalty_amount,
            payment.retention,
            note
        );
    }

    if !report.errors.is_empty() {
        println!("\nRun problems");
        for error in &report.errors {
            println!("- {:?}: {}", error.scope, error.message);
        }
    }

    if list_classes {
        match api.list_payments(&period.id, Default::default()) {
            Ok(records) => {
                println!("\nPer-class breakdown");
                for record in records {
                    println!("{}", record.instructor.0);
                    for detail in &record.per_class {
                        let note = detail
                            .note
                            .as_deref()
                            .map(|note| format!(" ({note})"))
                            .unwrap_or_default();
                        println!(
                            "  - {} [{}]: {:.2}{}",
                            detail.class_id.0, detail.discipline.0, detail.amount, note
                        );
                    }
                }
            }
            Err(err) => println!("\nPer-class breakdown unavailable: {err}"),
        }
    }
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

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
