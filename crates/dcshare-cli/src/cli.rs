//! Command-line interface definitions and parsing

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a result from the local share as a legacy `$SR` line
    Sr {
        #[command(flatten)]
        result: ResultArgs,
        /// Nick to announce (defaults to the configured identity)
        #[arg(short, long)]
        nick: Option<String>,
        /// Hub address for the trailing `(ip:port)` field
        #[arg(long)]
        ip_port: Option<String>,
        /// Hub character set label, e.g. cp1251
        #[arg(long)]
        charset: Option<String>,
    },
    /// Render a result from the local share as a structured `RES` command
    Res {
        #[command(flatten)]
        result: ResultArgs,
        /// Command type (B, C, D, E, F, H, I or U)
        #[arg(short, long, default_value_t = 'C')]
        kind: char,
        /// Source session id, for B, D, E and F commands
        #[arg(long)]
        from: Option<String>,
        /// Target session id, for D and E commands
        #[arg(long)]
        to: Option<String>,
        /// Search token to echo back
        #[arg(long)]
        token: Option<String>,
    },
    /// Parse a received `$SR` line or `RES` command and print it as JSON
    ///
    /// In `$SR` lines, the text `\x05` stands for the field separator byte.
    Parse {
        /// The line to parse
        line: String,
        /// Hub character set label for `$SR` lines
        #[arg(long)]
        charset: Option<String>,
    },
    /// Run the timer service and log its events
    Ticks {
        /// How long to run, in seconds
        #[arg(short, long, default_value_t = 3)]
        seconds: u64,
        /// Use the fast test clock
        #[arg(long)]
        fast: bool,
    },
}

/// Fields describing one item of the local share
#[derive(Args, Debug, Clone)]
pub struct ResultArgs {
    /// Share path, `\`-separated
    #[arg(short, long)]
    pub file: String,
    /// The path names a directory
    #[arg(short, long)]
    pub directory: bool,
    /// File size in bytes
    #[arg(short, long, default_value_t = 0)]
    pub size: u64,
    /// Content hash in base-32 (defaults to all zeroes)
    #[arg(long)]
    pub tth: Option<String>,
}
