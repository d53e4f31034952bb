use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod dump;
pub mod listen;
pub mod sim;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a recorded wire stream and print its records.
    Dump(DumpArgs),
    /// Open a decoder's serial port and print records as they arrive.
    Listen(ListenArgs),
    /// Simulate decoder traffic on stdout.
    Sim(SimArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// `format` is `None` when `--format` was not given; each command picks its own default.
pub fn run(command: Command, format: Option<OutputFormat>) -> CliResult<i32> {
    match command {
        Command::Dump(args) => dump::run(args, format.unwrap_or(OutputFormat::Json)),
        Command::Listen(args) => {
            listen::run(args, format.unwrap_or_else(OutputFormat::default_for_stdout))
        }
        Command::Sim(args) => sim::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Read from this file instead of stdin.
    #[arg(long, short = 'f', value_name = "FILE")]
    pub input: Option<PathBuf>,
    /// Longest line accepted in one piece.
    #[arg(long, default_value_t = tranx2_codec::DEFAULT_MAX_LINE_LENGTH)]
    pub max_line_length: usize,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Serial device, e.g. /dev/ttyUSB0.
    pub port: PathBuf,
    /// Line speed in baud.
    #[arg(long, default_value_t = tranx2_transport::DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Minimum bytes a read waits for (VMIN).
    #[arg(long, default_value_t = tranx2_transport::DEFAULT_MINIMUM_READ_SIZE)]
    pub min_read: u8,
}

#[derive(Args, Debug)]
pub struct SimArgs {
    /// Number of transponders.
    #[arg(long, short = 't')]
    pub transponders: u32,
    /// Average interval between passings per transponder, in ms.
    #[arg(long, short = 'i')]
    pub interval: u32,
    /// Maximum jitter between passings per transponder, in ms.
    #[arg(long, short = 'j', default_value_t = 0)]
    pub jitter: u32,
    /// Start value for the decoder tick counter.
    #[arg(long, short = 'c', default_value_t = 0)]
    pub clock: u32,
    /// Seed for transponder IDs and passing data.
    #[arg(long, short = 's', default_value_t = 0)]
    pub seed: u64,
    /// Stop after this many seconds. Runs until interrupted when omitted.
    #[arg(long, value_name = "SECS")]
    pub duration: Option<u64>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
