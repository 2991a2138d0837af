use anyhow::Result;
use camsync::{CamsyncClient, CamsyncConfig};
use clap::Parser;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "camsync")]
#[command(about = "Real-time topic state mirror for camera monitoring servers")]
#[command(version)]
#[command(long_about = "A headless agent that connects to a camera server's WebSocket \
endpoint, mirrors server-pushed topic state (detection, recordings, snapshots, audio, \
PTZ, motion tuning, events) into an in-memory store, and logs every update. Reconnects \
automatically whenever the connection drops.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "camsync.toml", help = "Path to TOML configuration file")]
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
    #[arg(long, help = "Validate configuration file and exit without connecting")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - initialize but don't connect
    #[arg(long, help = "Perform dry run - build the client but don't open a connection")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle special modes that don't require full initialization
    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    // Initialize logging
    init_logging(&args)?;

    info!("Starting camsync agent v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    // Load and validate configuration
    let config = match CamsyncConfig::load_from_file(&args.config) {
        Ok(config) => {
            info!("Configuration loaded successfully from: {}", args.config);
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    config.validate()?;

    let client = CamsyncClient::new(config).map_err(|e| {
        error!("Failed to create client: {}", e);
        e
    })?;

    if args.dry_run {
        info!("Dry run mode - client initialized, no connection opened");
        println!("✓ Dry run completed successfully");
        return Ok(());
    }

    let mut changes = client.store().changes();
    client.start();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            change = changes.recv() => {
                match change {
                    Ok(update) => {
                        info!("Topic '{}' updated: {}", update.topic, update.payload);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Update log lagged by {} changes", n);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        error!("Store change feed closed unexpectedly");
                        break;
                    }
                }
            }
        }
    }

    client.shutdown().await;

    let stats = client.stats();
    info!(
        "Session totals: {} updates applied, {} malformed dropped, {} local publishes",
        stats.updates_applied, stats.malformed_dropped, stats.local_publishes
    );

    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, fmt, Layer};

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "info"
    };

    // Create environment filter
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("camsync={}", log_level)));

    // Configure format based on options
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => {
            fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .boxed()
        }
        Some("compact") => {
            fmt::layer()
                .compact()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .boxed()
        }
        Some("pretty") => {
            fmt::layer()
                .pretty()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
        None => {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
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
    println!("# Camsync Configuration File");
    println!("# Default configuration with all available options");
    println!();
    println!("{}", toml::to_string_pretty(&CamsyncConfig::default())?);
    Ok(())
}
