use anyhow::Result;
use cardcam::{CardcamConfig, CardcamEvent, CardcamOrchestrator, ClassifierRegistry};
use clap::Parser;
use std::time::SystemTime;
use tracing::{debug, error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "cardcam")]
#[command(about = "Live playing-card recognition from a camera feed")]
#[command(version)]
#[command(long_about = "Captures frames from a camera and runs a two-stage suit/rank \
classification on each one, reporting a card only when both stages are confident.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "cardcam.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the system")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - set up but don't start capture
    #[arg(long, help = "Perform dry run - set up components but don't start capture")]
    dry_run: bool,

    /// Use generated frames instead of the capture backend
    #[arg(long, help = "Use synthetic frames even when a camera backend is available")]
    synthetic: bool,

    /// Print recognised cards to stdout as JSON lines
    #[arg(long, help = "Write each recognised card to stdout as a JSON line")]
    json: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting Cardcam v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match CardcamConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    // Model backends register themselves here; none ship with this binary
    let registry = ClassifierRegistry::new();
    if registry.is_empty() {
        warn!("No classifier backends registered; every frame will yield no result");
    }

    let mut orchestrator = CardcamOrchestrator::new(config, registry)
        .await
        .map_err(|e| {
            error!("Failed to create orchestrator: {}", e);
            e
        })?;
    orchestrator.set_synthetic_frames(args.synthetic);

    let event_bus = orchestrator.event_bus();
    let json_output = args.json;
    orchestrator.set_result_handler(move |outcome| match outcome {
        Some(card) => {
            if json_output {
                let line = serde_json::json!({
                    "card": card.card_string(),
                    "suit": card.suit(),
                    "rank": card.rank(),
                    "recognized_at": chrono::Utc::now().to_rfc3339(),
                });
                println!("{}", line);
            }
            if let Err(e) = event_bus.publish(CardcamEvent::CardRecognized {
                card,
                timestamp: SystemTime::now(),
            }) {
                debug!("Card event not delivered: {}", e);
            }
        }
        None => debug!("No card in frame"),
    });

    orchestrator.setup().await.map_err(|e| {
        error!("Failed to set up system: {}", e);
        e
    })?;

    if args.dry_run {
        info!("Dry run mode - components set up but capture not started");
        println!("✓ Dry run completed successfully - all components set up");
        orchestrator.shutdown().await?;
        return Ok(());
    }

    orchestrator.start().await.map_err(|e| {
        error!("Failed to start capture: {}", e);
        e
    })?;

    let exit_code = orchestrator.run().await.map_err(|e| {
        error!("System error during execution: {}", e);
        e
    })?;

    info!("Cardcam exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cardcam={}", log_level)));

    // Logs go to stderr so --json output stays clean
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Cardcam Configuration File");
    println!("# Every key is optional; environment variables such as");
    println!("# CARDCAM_CLASSIFIER__SUIT_THRESHOLD override file values.");
    println!();
    println!("{}", toml::to_string_pretty(&CardcamConfig::default())?);
    Ok(())
}
