//! Image classifier HTTP service entry point.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use image_classifier_api::api::build_app;
use image_classifier_api::classifier::{LabelSet, ModelService};
use image_classifier_api::config::Config;
use image_classifier_api::metrics;
use image_classifier_api::utils::shutdown_signal;

/// Image classifier HTTP service.
#[derive(Parser, Debug)]
#[command(name = "image-classifier-api")]
#[command(about = "Serve a pretrained 10-class image classifier over HTTP")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Model file path (overrides MODEL_PATH).
    #[arg(long, global = true)]
    model_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the model and serve HTTP requests (default).
    Serve {
        /// HTTP server port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Load the model and report whether it is usable.
    CheckModel,

    /// Classify a local image file and print the prediction as JSON.
    Predict {
        /// Image file to classify.
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load()?;
    if let Some(path) = &args.model_path {
        config.model_path = path.display().to_string();
    }

    init_logging(&config, args.verbose);

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(&config),
        Some(Command::CheckModel) => cmd_check_model(&config),
        Some(Command::Predict { file }) => cmd_predict(&config, &file),
        Some(Command::Serve { port }) => cmd_serve(config, port.or(args.port)).await,
        None => cmd_serve(config, args.port).await,
    }
}

/// Initialize the tracing subscriber from config and the verbose flag.
fn init_logging(config: &Config, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("image_classifier_api=debug,tower_http=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.rust_log))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn model_service(config: &Config) -> ModelService {
    ModelService::new(&config.model_path, LabelSet::cifar10())
}

/// Check configuration validity.
fn cmd_check_config(config: &Config) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("IMAGE CLASSIFIER API - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Model Path: {}", config.model_path);
    println!("  Bind Address: {}", config.bind_addr());
    println!("  Max Upload: {} bytes", config.max_upload_bytes);
    println!("  Metrics: {}", if config.metrics_enabled { "Enabled" } else { "Disabled" });
    println!("  Log Format: {}", if config.log_json { "JSON" } else { "Text" });
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Load the model once and report the outcome.
fn cmd_check_model(config: &Config) -> anyhow::Result<()> {
    let service = model_service(config);

    print!("Loading model from {}... ", config.model_path);
    match service.load() {
        Ok(_) => {
            println!("OK");
            println!("  Labels: {}", service.labels().iter().collect::<Vec<_>>().join(", "));
            Ok(())
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            Err(anyhow::anyhow!("Model check failed"))
        }
    }
}

/// Classify a single file without starting the server.
fn cmd_predict(config: &Config, file: &Path) -> anyhow::Result<()> {
    let service = model_service(config);
    service.load()?;

    let bytes = std::fs::read(file)?;
    let prediction = service.classify(&bytes)?;

    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(())
}

/// Load the model, then serve until a shutdown signal arrives.
async fn cmd_serve(mut config: Config, port_override: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port_override {
        config.port = port;
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    let metrics_handle = if config.metrics_enabled {
        Some(metrics::install_recorder()?)
    } else {
        None
    };

    // A model that cannot be loaded is fatal: never start serving without it.
    let router = build_app(&config, metrics_handle)?;

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
