//! Drawsy - solves handwritten math sketches with a multimodal model

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use drawsy::api::{self, AppState};
use drawsy::config::Config;
use drawsy::model::GeminiClient;
use drawsy::repair::RepairPipeline;
use drawsy::{Calculator, VariableMapping};

#[derive(Parser)]
#[command(name = "drawsy")]
#[command(about = "Solves handwritten math sketches with a multimodal model")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Solve the sketch in an image file and print the answers
    Solve {
        /// Image file (any format the image decoder understands)
        path: PathBuf,

        /// Known variables as a JSON object, e.g. '{"x": 4}'
        #[arg(long, default_value = "{}")]
        vars: String,
    },

    /// Repair and parse a raw model reply from a file or stdin
    Repair {
        /// File holding the reply; stdin when omitted
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("drawsy={},tower_http=debug", log_level).into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    let _ = dotenvy::dotenv();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.port);
            let calculator = build_calculator(&config)?;
            let router = api::create_router(AppState::new(calculator), &config)?;

            tracing::info!("Starting HTTP server on port {}", port);
            tracing::info!("Allowed origins: {}", config.allowed_origins.join(", "));

            let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

            println!("Drawsy server running at http://localhost:{}", port);
            println!("  Calculate: POST http://localhost:{}/calculate", port);
            println!("  API Docs:  http://localhost:{}/api/docs", port);
            println!("  Health:    http://localhost:{}/health", port);

            axum::serve(listener, router).await?;
        }

        Commands::Solve { path, vars } => {
            let vars: VariableMapping = serde_json::from_str(&vars)
                .map_err(|e| anyhow::anyhow!("--vars must be a JSON object: {}", e))?;
            let calculator = build_calculator(&config)?;

            let bytes = std::fs::read(&path)?;
            let records = calculator.analyze_bytes(bytes, &vars).await?;

            println!("{}", serde_json::to_string_pretty(&records)?);
        }

        Commands::Repair { file } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };

            let records = RepairPipeline::standard().normalize(&text);
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }

    Ok(())
}

/// The model credential is required; without it the process stops here
fn build_calculator(config: &Config) -> anyhow::Result<Calculator> {
    let client = GeminiClient::from_config(&config.model)?;
    tracing::info!("Using model {}", config.model.name);
    Ok(Calculator::new(Arc::new(client)))
}
