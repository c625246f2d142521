use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use baking_converter::capture::FrameSource;
use baking_converter::config::{AppConfig, Backend};
use baking_converter::{CaptureSession, Frame, UnitConverter, identify, shell};
use clap::{Parser, Subcommand};
use frame_scale::presets::PayloadPreset;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Identify baking ingredients on camera and convert volumes to grams.
#[derive(Parser, Debug)]
#[command(name = "bake")]
#[command(about = "🧁 Identify baking ingredients on camera and convert cups and spoons to grams")]
#[command(long_about = "Capture a baking ingredient from a local or IP camera, identify it with a
cloud vision model or a local detector, and convert volume measurements to grams.")]
struct Args {
    /// JSON configuration file
    #[arg(short, long, global = true, help = "Path to a JSON config file")]
    config: Option<PathBuf>,

    /// Identification backend
    #[arg(short, long, global = true, value_enum,
          help = "Identification backend: cloud (Gemini) or local (ONNX detector)")]
    backend: Option<Backend>,

    /// API key for the cloud backend
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Cloud model name
    #[arg(long, global = true, help = "Cloud model, e.g. gemini-1.5-flash")]
    model: Option<String>,

    /// Cloud payload size
    #[arg(long, global = true, value_enum,
          help = "Uploaded frame size: small (384px), medium (768px), large (1024px), original")]
    payload: Option<PayloadPreset>,

    /// Local detector model
    #[arg(long, global = true, help = "ONNX export of the trained detector")]
    model_path: Option<PathBuf>,

    /// IP camera host
    #[arg(long, global = true, env = "BAKE_CAMERA_HOST", help = "IP camera host, e.g. 192.168.1.20")]
    host: Option<String>,

    /// IP camera port
    #[arg(long, global = true, env = "BAKE_CAMERA_PORT", help = "IP camera port, e.g. 8080")]
    port: Option<String>,

    /// Local camera index
    #[arg(long, global = true, help = "Local camera index when no IP camera is set")]
    device: Option<u32>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a volume of an ingredient to grams
    Convert {
        /// Amount, e.g. 1.5
        amount: String,
        /// Unit: cups, tbsp or tsp (anything else is read as mL)
        unit: String,
        /// Ingredient name, e.g. "Powdered Sugar"
        ingredient: Vec<String>,
    },
    /// Identify the ingredient in an image file
    Identify {
        /// Image to analyze
        image: PathBuf,
    },
    /// Interactive capture session (default)
    Session,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let table = Arc::new(config.density_table()?);

    match args.command.unwrap_or(Command::Session) {
        Command::Convert {
            amount,
            unit,
            ingredient,
        } => {
            let converter = UnitConverter::new(table);
            let ingredient = ingredient.join(" ");
            match converter.convert_text(&amount, &unit, &ingredient) {
                Ok(conversion) => println!("{conversion}"),
                Err(e) => println!("{}", e.status_message()),
            }
        }
        Command::Identify { image } => {
            let frame = Frame::open(&image)
                .with_context(|| format!("failed to open {}", image.display()))?;
            let identifier = identify::from_config(&config, table)?;
            match identifier.identify(Arc::new(frame)).await {
                Ok(Some(identification)) => println!("{identification}"),
                Ok(None) => println!("No ingredient detected."),
                Err(e) => println!("{}", e.status_message()),
            }
        }
        Command::Session => {
            let source = config.feed.source();
            info!(feed = %source, backend = ?config.backend, "starting capture session");
            let identifier = identify::from_config(&config, Arc::clone(&table))?;
            let mut session = CaptureSession::builder()
                .with_frame_source(FrameSource::threaded(source))
                .with_identifier(identifier)
                .with_settings(&config.session)
                .build()?;
            let converter = UnitConverter::new(table);

            let stdin = BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            shell::run(
                &mut session,
                &converter,
                stdin,
                &mut stdout,
                Duration::from_millis(config.session.poll_interval_ms),
            )
            .await?;
        }
    }
    Ok(())
}

/// Defaults → config file → flags and environment.
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = AppConfig::load(args.config.as_deref())?;

    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(key) = &args.api_key {
        config.cloud.api_key = Some(key.clone());
    }
    if let Some(model) = &args.model {
        config.cloud.model = model.clone();
    }
    if let Some(preset) = args.payload {
        config.cloud.payload_max_side = preset.max_side();
    }
    if let Some(path) = &args.model_path {
        config.local.model_path = path.clone();
    }
    if args.host.is_some() {
        config.feed.host = args.host.clone();
    }
    if args.port.is_some() {
        config.feed.port = args.port.clone();
    }
    if let Some(device) = args.device {
        config.feed.device_index = device;
    }

    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}
