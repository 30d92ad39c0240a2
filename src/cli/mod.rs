//! CLI module for storyreel.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// storyreel - Story to vertical video
///
/// Turns a short story into a narrated 9:16 video with word-highlighted
/// subtitles over a background clip.
#[derive(Parser, Debug)]
#[command(name = "storyreel")]
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
    /// Create default configuration and directories
    Init,

    /// Check system requirements and configuration
    Doctor,

    /// Create a video from a story
    Create(CreateArgs),

    /// Detect the theme of a story and the voice it maps to
    Classify {
        /// Story text (reads --input-file when omitted)
        text: Option<String>,

        /// Read the story from a file
        #[arg(short, long, conflicts_with = "text")]
        input_file: Option<PathBuf>,
    },

    /// Show the theme to voice mapping
    Voices,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Default)]
pub struct CreateArgs {
    /// Generate the story with the language model
    #[arg(short, long, conflicts_with_all = ["story", "input_file"])]
    pub auto: bool,

    /// Story text to narrate
    #[arg(short, long)]
    pub story: Option<String>,

    /// Read the story from a file
    #[arg(short, long, conflicts_with = "story")]
    pub input_file: Option<PathBuf>,

    /// Replace the story generation prompt
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Background clip (path, or file name inside the videos directory)
    #[arg(long)]
    pub video: Option<PathBuf>,

    /// Voice name or ElevenLabs voice id
    #[arg(long)]
    pub voice: Option<String>,

    /// Output file name
    #[arg(short, long)]
    pub output: Option<String>,

    /// Output width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Output frame rate
    #[arg(long)]
    pub fps: Option<u32>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
