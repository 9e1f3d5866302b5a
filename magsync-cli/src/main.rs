use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use magsync_cli::commands::{self, SessionOptions};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "magsync")]
#[command(about = "magsync - MagElement magnetometer data link client", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SessionArgs {
    /// Capture received records to this file (must not exist)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Print a summary line per record
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    verbose: bool,

    /// Synchronizer configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read deadline in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

impl From<SessionArgs> for SessionOptions {
    fn from(args: SessionArgs) -> Self {
        Self {
            capture: args.file,
            verbose: args.verbose,
            config: args.config,
            timeout_ms: args.timeout_ms,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to an instrument over TCP
    Tcp {
        /// Instrument IPv4 address
        #[arg(long)]
        addr: Ipv4Addr,

        /// Instrument TCP port
        #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
        port: u16,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Listen for instrument datagrams over UDP
    Udp {
        /// Local UDP port
        #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
        port: u16,

        /// Local address to bind
        #[arg(long, default_value = "0.0.0.0")]
        bind: Ipv4Addr,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Check the records in a capture file
    Check {
        /// Capture file to check
        #[arg(short, long)]
        file: PathBuf,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,

        /// Synchronizer configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; stdout is reserved for record summaries
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Execute command
    match cli.command {
        Commands::Tcp {
            addr,
            port,
            session,
        } => commands::tcp::execute(addr, port, &session.into()),

        Commands::Udp {
            port,
            bind,
            session,
        } => commands::udp::execute(bind, port, &session.into()),

        Commands::Check { file, json, config } => {
            commands::check::execute(&file, json, config.as_deref())
        }
    }
}
