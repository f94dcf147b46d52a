//! CAN Tools CLI Application
//!
//! Command-line front-end for the cantools-codec library:
//! - Create DBC files with vehicle information
//! - Add, edit, list and delete signal definitions
//! - Decode CAN frames against a DBC file
//! - Encode physical values into a payload
//! - Import signals from third-party DBC files

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;
mod config;

use config::{CliConfig, OutputFormat};

/// CAN Tools - Build DBC files and decode CAN frames
#[derive(Parser, Debug)]
#[command(name = "cantools-cli")]
#[command(about = "Build DBC signal definitions and decode CAN frames", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Directory for new DBC files (overrides the config file)
    #[arg(long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Signal ordering (overrides the config file)
    #[arg(long, value_enum, global = true)]
    sort: Option<SortArg>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new DBC file in the data directory
    Create {
        /// File name (sanitized to [A-Za-z0-9_])
        name: String,
        /// Vehicle make/model/year
        #[arg(long, default_value = "")]
        vehicle: String,
    },

    /// List the signals of a DBC file
    List {
        /// DBC file
        file: PathBuf,
    },

    /// Show one signal in detail
    Show {
        file: PathBuf,
        /// Index as printed by `list`
        index: usize,
    },

    /// Add a signal
    Add {
        file: PathBuf,
        /// Start from the example vehicle speed signal
        #[arg(long)]
        defaults: bool,
        /// Owning message name (defaults to the signal name)
        #[arg(long)]
        message: Option<String>,
        /// Field assignment such as `can-id=0x257` or `scale=0_08` (repeatable)
        #[arg(short, long = "set", value_name = "FIELD=VALUE", value_parser = commands::parse_field_assignment)]
        set: Vec<(cantools_codec::SignalField, String)>,
        /// Print the generated DBC entry without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Edit a signal
    Edit {
        file: PathBuf,
        /// Index as printed by `list`
        index: usize,
        #[arg(long)]
        message: Option<String>,
        #[arg(short, long = "set", value_name = "FIELD=VALUE", value_parser = commands::parse_field_assignment)]
        set: Vec<(cantools_codec::SignalField, String)>,
    },

    /// Delete a signal
    Delete {
        file: PathBuf,
        /// Index as printed by `list`
        index: usize,
    },

    /// Decode a CAN frame
    Decode {
        file: PathBuf,
        /// CAN ID (decimal or 0x hex)
        #[arg(long, value_parser = commands::parse_can_id_arg)]
        can_id: u32,
        /// Payload bytes in hex, e.g. `00 30 12` or `003012`
        #[arg(long, default_value = "")]
        data: String,
        /// Data length code (defaults to the number of bytes given)
        #[arg(long)]
        dlc: Option<u8>,
    },

    /// Encode physical values into a payload
    Encode {
        file: PathBuf,
        #[arg(long, value_parser = commands::parse_can_id_arg)]
        can_id: u32,
        /// Signal value such as `DI_vehicleSpeed=-16.72` (repeatable)
        #[arg(long = "value", value_name = "SIGNAL=VALUE", value_parser = commands::parse_value_assignment)]
        values: Vec<(String, f64)>,
        /// Starting payload in hex (defaults to zeros)
        #[arg(long)]
        data: Option<String>,
        /// Payload length in bytes
        #[arg(long, default_value_t = 8)]
        dlc: u8,
    },

    /// Import every signal of a third-party DBC file into a DBC file
    Import {
        /// DBC file to read with the full DBC grammar
        source: PathBuf,
        /// Target DBC file
        file: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortArg {
    Name,
    CanId,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::debug!("CAN Tools CLI v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using codec library v{}", cantools_codec::VERSION);

    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => CliConfig::default(),
    };
    if let Some(dir) = &args.data_dir {
        config.codec.data_dir = dir.clone();
    }
    if let Some(sort) = args.sort {
        config.codec.sort_mode = match sort {
            SortArg::Name => cantools_codec::SortMode::ByName,
            SortArg::CanId => cantools_codec::SortMode::ByCanId,
        };
    }
    if args.json {
        config.output.format = OutputFormat::Json;
    }

    commands::run(args.command, &config)
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
