//! Configuration module for storyreel.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, StoryPrompts};
pub use settings::{
    CliOverrides, GeneralSettings, PromptSettings, RetrySettings, Settings, SpeechSettings,
    StorySettings, SubtitleSettings, VideoSettings,
};
