//! storyreel - Story to vertical video
//!
//! A CLI tool that turns a short story into a narrated 9:16 video with
//! word-by-word highlighted subtitles over a background clip.
//!
//! # Overview
//!
//! A run goes through these stages:
//! - Acquire a story (typed, read from a file, or generated by a language model)
//! - Classify its tone and pick a narrator voice
//! - Synthesize speech with per-word timing
//! - Compose highlight subtitles from the timing
//! - Burn subtitles onto a cropped, looped background clip with ffmpeg
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `story` - Story acquisition and generation
//! - `theme` - Tone classification
//! - `voice` - Theme to voice mapping
//! - `speech` - Speech synthesis and word timing
//! - `subtitle` - Highlight subtitle composition and ASS output
//! - `media` - Background selection, probing and rendering
//! - `retry` - Retry policy for provider calls
//! - `workspace` - Per-run scratch space and output placement
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use storyreel::config::Settings;
//! use storyreel::orchestrator::{CreateRequest, Orchestrator};
//! use storyreel::story::StoryRequest;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let request = CreateRequest {
//!         story: StoryRequest::manual("The lighthouse keeper heard a knock at midnight."),
//!         ..Default::default()
//!     };
//!     let output = orchestrator.run(&request).await?;
//!     println!("Wrote {}", output.output_path.display());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod openai;
pub mod orchestrator;
pub mod retry;
pub mod speech;
pub mod story;
pub mod subtitle;
pub mod theme;
pub mod voice;
pub mod workspace;

pub use error::{ReelError, Result};
