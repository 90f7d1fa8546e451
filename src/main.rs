mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use fc_core::config::Config;

async fn start_server(host: Option<String>, port: Option<u16>, config_path: Option<&Path>) -> Result<()> {
    let mut config = Config::load_or_default(config_path);

    // CLI flags win over the config file.
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting framecast {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Ingest {}:{}, HTTP on {}:{}",
        config.ingest.group,
        config.ingest.port,
        config.server.host,
        config.server.port
    );

    fc_server::start(config).await.context("server failed")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "framecast=trace,fc_core=trace,fc_ingest=trace,fc_server=trace,tower_http=debug"
                .to_string()
        } else {
            "framecast=debug,fc_core=debug,fc_ingest=debug,fc_server=debug,tower_http=info"
                .to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("framecast {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            Config::load(p).with_context(|| format!("invalid config {}", p.display()))?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ Configuration is valid");
    } else {
        println!("Configuration loaded with {} warning(s):", warnings.len());
        for warning in &warnings {
            println!("  - {warning}");
        }
    }

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!(
        "  Ingest: {}:{} (interface {})",
        config.ingest.group, config.ingest.port, config.ingest.interface
    );
    if config.keepalive.enabled {
        println!(
            "  Keepalive: port {} ({:?} blob)",
            config.keepalive.port, config.keepalive.blob
        );
    } else {
        println!("  Keepalive: disabled");
    }
    println!("  Max reader lag: {} frames", config.stream.max_reader_lag);

    Ok(())
}
