use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;

use kiosk_composer::clock::{Clock, SystemClock};
use kiosk_composer::generate::{HttpImageGenerator, Orchestrator, PngOverlayWatermark};
use kiosk_composer::limiter::RateLimiter;
use kiosk_composer::models::{BackgroundCatalog, ServiceConfig};
use kiosk_composer::queue::JobQueue;
use kiosk_composer::reaper::{ArtifactReaper, SessionReaper};
use kiosk_composer::registry::{KioskStatsBoard, SessionRegistry};
use kiosk_composer::server::{create_router, AppState};

const API_KEY_ENV: &str = "KIOSK_GEN_API_KEY";

#[derive(Parser, Debug)]
#[command(
    name = "kioskd",
    version,
    about = "Selfie kiosk image-composition backend"
)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the host to bind
    #[arg(long)]
    host: Option<String>,

    /// Override the port to bind
    #[arg(long)]
    port: Option<u16>,

    /// Override the artifact output directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Override the watermark overlay PNG
    #[arg(long)]
    watermark: Option<PathBuf>,

    /// Also write logs to kioskd.log in the output directory's parent
    #[arg(long)]
    log_file: bool,
}

fn load_config(args: &Args) -> anyhow::Result<ServiceConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .context(format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&raw)
                .context(format!("Failed to parse config file {}", path.display()))?
        }
        None => ServiceConfig::default(),
    };
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = Some(dir.clone());
    }
    if let Some(watermark) = &args.watermark {
        config.watermark_path = Some(watermark.clone());
    }
    Ok(config)
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kiosk-composer")
}

fn init_tracing(log_file: bool, data_dir: &std::path::Path) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if log_file {
        let appender = tracing_appender::rolling::never(data_dir, "kioskd.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
        // Hold the guard alive for the process lifetime.
        std::mem::forget(guard);
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Arc::new(load_config(&args)?);

    let data_dir = data_dir();
    let output_dir = config
        .output_dir
        .clone()
        .unwrap_or_else(|| data_dir.join("outputs"));
    std::fs::create_dir_all(&output_dir).context(format!(
        "Failed to create output directory {}",
        output_dir.display()
    ))?;
    std::fs::create_dir_all(&data_dir)
        .context(format!("Failed to create data directory {}", data_dir.display()))?;

    init_tracing(args.log_file, &data_dir);

    let api_key = std::env::var(API_KEY_ENV).context(format!(
        "{} must be set to the generation API key",
        API_KEY_ENV
    ))?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let catalog = Arc::new(BackgroundCatalog::builtin());
    let registry = Arc::new(SessionRegistry::new());
    let stats = Arc::new(KioskStatsBoard::new(config.kiosks.keys().cloned()));
    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit_max,
        chrono::Duration::seconds(config.rate_limit_window_secs as i64),
        Arc::clone(&clock),
    ));

    let queue = JobQueue::new(
        config.max_concurrency,
        config.starts_per_bucket,
        Duration::from_millis(config.bucket_millis),
    );
    tokio::spawn(Arc::clone(&queue).run());

    let generator = Arc::new(HttpImageGenerator::new(
        config.generation_url.clone(),
        api_key,
    ));
    let watermark_path = config
        .watermark_path
        .clone()
        .unwrap_or_else(|| data_dir.join("watermark.png"));
    let watermark = Arc::new(PngOverlayWatermark::new(watermark_path));
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&catalog),
        generator,
        watermark,
        Arc::clone(&registry),
        Arc::clone(&stats),
        Arc::clone(&clock),
        output_dir.clone(),
    ));

    let session_reaper = SessionReaper::new(
        Arc::clone(&registry),
        Arc::clone(&clock),
        Duration::from_secs(config.session_sweep_secs),
        chrono::Duration::seconds(config.session_retention_secs as i64),
    );
    tokio::spawn(session_reaper.run());

    let artifact_reaper = ArtifactReaper::new(
        output_dir.clone(),
        Duration::from_secs(config.artifact_max_age_secs),
    );
    tokio::spawn(artifact_reaper.run());

    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        limiter,
        queue,
        registry,
        stats,
        orchestrator,
        catalog,
        clock,
        output_dir,
        start_time: Instant::now(),
    });

    let router = create_router(state);
    let bind_addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .context(format!("Failed to bind to {}", bind_addr))?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl+C, shutting down");
            }
        })
        .await
        .context("HTTP server error")?;

    Ok(())
}
