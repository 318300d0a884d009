use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod formatters;
mod worker;

use commands::SessionArgs;
use formatters::FormatMode;

#[derive(Parser)]
#[command(name = "emv-reader")]
#[command(about = "Contactless EMV Reader - Read PAN, expiry and brand from payment cards")]
#[command(version)]
struct Cli {
    /// Output format mode
    #[arg(short, long, value_enum, default_value_t = FormatMode::Human, global = true)]
    format: FormatMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait for one card and print its data
    Read {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Keep reading cards as they are presented
    Watch {
        #[command(flatten)]
        session: SessionArgs,

        /// Stop after this many cards
        #[arg(long)]
        count: Option<usize>,
    },

    /// Print the terminal default values used to fill a PDOL
    DolTable {
        /// Also decode this PDOL (hex)
        #[arg(long)]
        pdol: Option<String>,
    },

    /// Read one card and print every TLV tag the card returned
    Dump {
        #[command(flatten)]
        session: SessionArgs,
    },
}

fn main() -> ExitCode {
    // Initialize tracing subscriber with environment-based filtering
    // Set RUST_LOG=debug for protocol steps, RUST_LOG=trace for every APDU
    // Default: info level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format_mode = cli.format;

    if format_mode == FormatMode::Human {
        println!("Contactless EMV Reader - {} Mode\n", format_mode.description());
    }

    match cli.command {
        Commands::Read { session } => commands::read::cmd_read(&session, format_mode),
        Commands::Watch { session, count } => {
            commands::watch::cmd_watch(&session, count, format_mode)
        }
        Commands::DolTable { pdol } => commands::dol_table::cmd_dol_table(pdol.as_deref()),
        Commands::Dump { session } => commands::dump::cmd_dump(&session, format_mode),
    }
}
