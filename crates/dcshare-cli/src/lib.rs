//! dcshare CLI library
//!
//! This library provides the components of the dcshare command-line tool:
//! argument parsing, configuration loading and the command handlers.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::{Cli, Commands, ResultArgs};
pub use commands::CommandDispatcher;
pub use config::{AppConfig, IdentityConfig};
pub use error::{CliError, Result};

// Re-export commonly used types
pub use dcshare_core::{DcConfig, SearchResult, TimerConfig};
pub use dcshare_runtime::TimerService;
