//! CLI module for Teksting.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Teksting - media transcription and subtitle service
///
/// Transcribes audio and video, renders SRT subtitles, extracts speech audio
/// and burns subtitles into video over HTTP.
#[derive(Parser, Debug)]
#[command(name = "teksting")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP service
    Serve {
        /// Host to bind to
        #[arg(long, env = "TEKSTING_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to bind to
        #[arg(short, long, env = "TEKSTING_PORT", default_value = "8000")]
        port: u16,
    },

    /// Check external tools, model files and directories
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show effective configuration (file plus environment overrides)
    Show,

    /// Write the effective configuration to the config file
    Init,

    /// Show configuration file path
    Path,
}
