use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use swutrack::{Service, Supervisor, SwutrackConfig};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "swutrack")]
#[command(about = "Minimal process supervisor with bounded graceful shutdown")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "swutrack.toml", help = "Path to TOML configuration file")]
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
    #[arg(long, help = "Validate configuration and exit without starting services")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        println!("{}", SwutrackConfig::default().to_toml_string()?);
        return Ok(());
    }

    init_logging(&args)?;

    info!("starting up...");

    let config = match SwutrackConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        error!("failed to validate config: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let mut supervisor = Supervisor::builder()
        .with_config(&config)
        .with_services(services(&config))
        .build()?;

    let outcome = supervisor.run().await.map_err(|e| {
        error!("supervisor error: {}", e);
        e
    })?;

    info!("exited after: {}", outcome.reason);
    Ok(())
}

fn services(config: &SwutrackConfig) -> Vec<Arc<dyn Service>> {
    #[cfg(feature = "http_api")]
    {
        let api: Arc<dyn Service> = Arc::new(swutrack::HttpApiService::new(config.port.clone()));
        vec![api]
    }

    #[cfg(not(feature = "http_api"))]
    {
        let _ = config;
        Vec::new()
    }
}

/// `--debug` wins over `--verbose`, which wins over `--quiet`
fn log_level(args: &Args) -> &'static str {
    if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        // Lifecycle messages are logged at info
        "info"
    }
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("swutrack={}", log_level(args))));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .boxed(),
        Some("pretty") => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some("compact") | None => fmt::layer().compact().with_target(false).boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer().compact().with_target(false).boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_precedence() {
        let level = |argv: &[&str]| log_level(&Args::parse_from(argv));

        assert_eq!(level(&["swutrack"]), "info");
        assert_eq!(level(&["swutrack", "--quiet"]), "error");
        assert_eq!(level(&["swutrack", "--verbose", "--quiet"]), "info");
        assert_eq!(level(&["swutrack", "-d", "-v", "-q"]), "debug");
    }

    #[test]
    fn test_default_args() {
        let args = Args::parse_from(["swutrack"]);
        assert_eq!(args.config, "swutrack.toml");
        assert!(!args.verbose);
        assert!(args.log_format.is_none());
    }
}
