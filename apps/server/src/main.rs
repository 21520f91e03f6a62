//! Partner Balance - Headless Server
//!
//! Polls partner balances on a schedule, keeps their history and reports
//! partners whose balance is running low.

mod config;
mod rpc_server;
mod scheduler;
mod state;

use anyhow::Context;
use clap::Parser;
use config::AppConfig;
use rpc_server::RpcState;
use scheduler::{run_daily, DailySchedule};
use state::{create_state, SharedState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use balance_alerts::{Database, Notifier, TelegramBot, ThreadsConfig};
use balance_core::NetworksSource;
use balance_engine::{BalanceService, BalanceStore, Collector, Router};

/// Partner Balance CLI
#[derive(Parser, Debug)]
#[command(name = "partner-balance")]
#[command(about = "Partner balance collection and low-balance alerts", long_about = None)]
struct Args {
    /// Application config file path
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Partner networks file path, re-read on every run
    #[arg(short, long, default_value = "networks.json")]
    networks: String,

    /// Telegram chat threads file path
    #[arg(short, long, default_value = "threads.json")]
    threads: String,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Port for the HTTP report endpoint
    #[arg(long, default_value_t = 50051)]
    http_port: u16,
}

fn init_logging(level: &str) {
    let level = match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

fn build_router(config: &AppConfig) -> Router {
    let mut router = Router::new();
    for (partner, settings) in &config.adapters {
        router.register(partner.clone(), settings.build());
    }
    router
}

fn spawn_collect_job(
    schedule: DailySchedule,
    state: SharedState,
    service: Arc<BalanceService>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let job_state = state.clone();
        run_daily("collect", schedule, state, move || {
            let service = service.clone();
            let state = job_state.clone();
            async move {
                match service.collect_all().await {
                    Ok(summaries) => {
                        for summary in &summaries {
                            state.stats.record_batch(summary);
                        }
                    }
                    Err(e) => error!(error = %e, "Balance collection failed"),
                }
            }
        })
        .await;
    })
}

fn spawn_purge_job(
    schedule: DailySchedule,
    state: SharedState,
    service: Arc<BalanceService>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run_daily("purge", schedule, state, move || {
            let service = service.clone();
            async move {
                if let Err(e) = service.purge().await {
                    error!(error = %e, "Balance purge failed");
                }
            }
        })
        .await;
    })
}

fn spawn_report_job(
    schedule: DailySchedule,
    state: SharedState,
    notifier: Arc<Notifier>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let job_state = state.clone();
        run_daily("report", schedule, state, move || {
            let notifier = notifier.clone();
            let state = job_state.clone();
            async move {
                let delivery = notifier.dispatch_reports().await;
                state.stats.record_delivery(&delivery);
            }
        })
        .await;
    })
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = AppConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config))?;
    let collect_schedule = DailySchedule::parse(&config.schedule.collect_at)?;
    let report_schedule = DailySchedule::parse(&config.schedule.report_at)?;
    let purge_schedule = DailySchedule::parse(&config.schedule.purge_at)?;

    let networks = NetworksSource::file(&args.networks);
    let network_names = networks
        .snapshot()
        .with_context(|| format!("loading {}", args.networks))?
        .network_names();
    info!("  Networks: {}", network_names.join(", "));

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://balances.db".to_string());
    let db = Database::connect(&database_url)
        .await
        .with_context(|| format!("connecting to {}", database_url))?;
    let store: Arc<dyn BalanceStore> = Arc::new(db);

    let router = build_router(&config);
    info!("  Adapters: {}", router.partners().join(", "));

    let collector = Arc::new(Collector::new(
        Arc::new(router),
        store.clone(),
        (&config.collector).into(),
    ));
    let service = Arc::new(BalanceService::new(
        networks,
        collector,
        store,
        config.service_config(),
    ));

    service
        .sync_partners()
        .await
        .context("registering partners")?;

    let state = create_state();
    state.start();

    let rpc_state = Arc::new(RpcState {
        service: service.clone(),
        app_state: state.clone(),
    });
    rpc_server::start_rpc_server(rpc_state, args.http_port)
        .await
        .map_err(|e| anyhow::anyhow!("starting report endpoint: {}", e))?;

    let mut handles = vec![
        spawn_collect_job(collect_schedule, state.clone(), service.clone()),
        spawn_purge_job(purge_schedule, state.clone(), service.clone()),
    ];

    match std::env::var("TELEGRAM_BOT_TOKEN") {
        Ok(token) => {
            let threads = ThreadsConfig::load(&args.threads)
                .with_context(|| format!("loading {}", args.threads))?;
            info!("  Chat threads: {}", threads.threads.len());

            let bot = Arc::new(TelegramBot::new(&token, threads.clone(), service.clone()));
            let notifier = Arc::new(Notifier::new(service.clone(), bot.clone(), threads));
            handles.push(spawn_report_job(report_schedule, state.clone(), notifier));
            handles.push(tokio::spawn(bot.run()));
        }
        Err(_) => warn!("TELEGRAM_BOT_TOKEN not set, chat delivery disabled"),
    }

    info!("Press Ctrl+C to stop...");
    tokio::signal::ctrl_c()
        .await
        .context("listening for Ctrl+C")?;

    warn!("Shutdown signal received");
    state.stop();

    // Jobs sleep until their next fire time, abort instead of waiting.
    for handle in handles {
        handle.abort();
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
    }

    let summary = state.stats.summary();
    info!("📈 Final Stats:");
    info!("  Total uptime: {} seconds", summary.uptime_secs);
    info!("  Batches: {}", summary.batches_run);
    info!("  Samples persisted: {}", summary.samples_persisted);
    info!("  Unit failures: {}", summary.unit_failures);
    info!("  Reports sent: {}", summary.reports_sent);
    info!("  Report requests: {}", summary.rpc_requests);
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    init_logging(&args.log_level);

    info!("🚀 Partner Balance starting...");
    info!("  Config: {}", args.config);
    info!("  HTTP Port: {}", args.http_port);

    if let Err(e) = run(args).await {
        error!("Fatal: {:#}", e);
        std::process::exit(1);
    }

    info!("👋 Partner Balance stopped");
}
