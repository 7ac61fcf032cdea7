//! CanControl - CAN order console
//!
//! Define named, fixed-width binary message formats and exchange them over a
//! CAN bus from a line-oriented console.

mod bus;
mod config;
mod control;
mod protocol;
mod registry;

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

use bus::{ChannelListener, Transport, TransportState};
use config::Config;
use control::{Console, ControlFacade, FilterHandle, Flow, LogLevel, LogSink, TracingSink};
use registry::{JsonFileStore, Listing, MessageRegistry};

/// CanControl - CAN order console
#[derive(Parser)]
#[command(name = "cancontrol")]
#[command(author = "CanControl Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Define CAN message formats and exchange them from a console", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive console
    Run {
        /// CAN interface to use ("dummy" for loopback mode)
        channel: Option<String>,

        /// Path of the order file
        #[arg(short, long)]
        schema: Option<PathBuf>,
    },

    /// List known orders without connecting to a bus
    List {
        /// Orders to show in full
        names: Vec<String>,

        /// Path of the order file
        #[arg(short, long)]
        schema: Option<PathBuf>,
    },

    /// Show current configuration
    Config {
        /// Generate sample configuration
        #[arg(long)]
        generate: bool,

        /// Output path for generated config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default().unwrap_or_default()
    };

    // Initialize logging
    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        config.general.log_level.parse().unwrap_or(LogLevel::Info)
    };
    let (filter, filter_handle) = reload::Layer::new(EnvFilter::new(level.directive()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Run { channel, schema } => {
            let channel = channel.unwrap_or_else(|| config.bus.channel.clone());
            let schema = schema.unwrap_or_else(|| config.schema.path.clone());
            run_console(config, channel, schema, filter_handle).await?;
        }
        Commands::List { names, schema } => {
            let schema = schema.unwrap_or_else(|| config.schema.path.clone());
            list_orders(schema, &names)?;
        }
        Commands::Config { generate, output } => {
            if generate {
                let sample = config::generate_sample_config()?;
                if let Some(path) = output {
                    std::fs::write(&path, &sample)?;
                    println!("Configuration written to: {}", path.display());
                } else {
                    println!("{}", sample);
                }
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

/// Run the interactive console
async fn run_console(
    config: Config,
    channel: String,
    schema: PathBuf,
    filter: FilterHandle,
) -> anyhow::Result<()> {
    let registry = Arc::new(MessageRegistry::open(Box::new(JsonFileStore::new(&schema))));

    let (listener, events) = ChannelListener::new(config.bus.event_queue);
    let transport = Arc::new(Transport::new(
        config.bus.transport_config(),
        Arc::new(listener),
    ));
    let state = transport.connect(&channel);

    let sink: Arc<dyn LogSink> = Arc::new(TracingSink::new(filter));
    let facade = Arc::new(ControlFacade::new(registry, transport.clone(), sink));

    // Inbound frames are decoded on their own task
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    let frame_loop = tokio::spawn({
        let facade = facade.clone();
        async move { facade.run(events, shutdown_rx).await }
    });

    println!("\n========================================");
    println!("  CanControl Console");
    println!("========================================");
    println!("  Bus: {}", channel);
    println!(
        "  Mode: {}",
        match state {
            TransportState::ConnectedHardware => "hardware",
            TransportState::ConnectedLoopback => "loopback (frames are not transmitted)",
            TransportState::Disconnected => "disconnected",
        }
    );
    println!("  Orders: {} ({})", facade.registry().len(), schema.display());
    println!("========================================");
    println!("\nType 'help' for help, 'quit' or Ctrl+C to exit.\n");

    let mut lines = spawn_line_reader()?;
    let console = Console::new(&facade);

    loop {
        tokio::select! {
            line = lines.recv() => match line {
                Some(line) => {
                    if console.handle_line(&line) == Flow::Quit {
                        break;
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                break;
            }
        }
    }

    // Stop the receive thread before the frame loop goes away
    transport.shutdown().await;
    let _ = shutdown_tx.send(()).await;
    frame_loop.await?;

    tracing::info!("Console stopped");
    Ok(())
}

/// Read stdin on a dedicated thread and forward each line
fn spawn_line_reader() -> std::io::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(16);

    std::thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Console input error: {}", e);
                        break;
                    }
                }
            }
        })?;

    Ok(rx)
}

/// Print known orders
fn list_orders(schema: PathBuf, names: &[String]) -> anyhow::Result<()> {
    let registry = MessageRegistry::open(Box::new(JsonFileStore::new(schema)));

    match registry.list(names)? {
        Listing::Names(names) => {
            println!("CAN-Messages");
            for name in names {
                println!("  order {}", name);
            }
        }
        Listing::Schemas(schemas) => {
            for schema in schemas {
                println!("{}", schema);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["cancontrol", "run", "can0", "--schema", "orders.json"]);
        assert!(cli.is_ok());

        match cli.unwrap().command {
            Commands::Run { channel, schema } => {
                assert_eq!(channel.as_deref(), Some("can0"));
                assert_eq!(schema, Some(PathBuf::from("orders.json")));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_cli_list_names() {
        let cli = Cli::try_parse_from(["cancontrol", "list", "move", "stop"]).unwrap();
        match cli.command {
            Commands::List { names, .. } => assert_eq!(names, ["move", "stop"]),
            _ => panic!("expected list"),
        }
    }
}
