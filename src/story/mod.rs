//! Story acquisition.
//!
//! A story is either supplied by the user or generated by a language model.
//! Once constructed it is immutable and carries its detected theme.

mod openai;
mod provider;

pub use openai::OpenAIStoryGenerator;
pub use provider::{read_story_lines, StoryMode, StoryProvider, StoryRequest};

use crate::error::{ReelError, Result};
use crate::retry::ProviderFailure;
use crate::theme::{self, Theme};
use async_trait::async_trait;
use serde::Serialize;

/// Where the story text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorySource {
    Manual,
    Generated,
}

impl std::fmt::Display for StorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorySource::Manual => write!(f, "manual"),
            StorySource::Generated => write!(f, "generated"),
        }
    }
}

/// Narration text driving both speech and subtitles.
#[derive(Debug, Clone, Serialize)]
pub struct Story {
    text: String,
    source: StorySource,
    theme: Theme,
}

impl Story {
    /// Build a story, classifying its theme.
    ///
    /// Fails when the text has nothing speakable in it.
    pub fn new(text: impl Into<String>, source: StorySource) -> Result<Self> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(ReelError::Input("story text is empty".into()));
        }
        if !text.chars().any(char::is_alphanumeric) {
            return Err(ReelError::Input(
                "story text contains no words to narrate".into(),
            ));
        }
        let theme = theme::classify(&text);
        Ok(Self { text, source, theme })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> StorySource {
        self.source
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Number of whitespace-separated words.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Language-model collaborator that turns prompts into narrative text.
#[async_trait]
pub trait StoryGenerator: Send + Sync {
    /// Generate a story. A single attempt; retries are the caller's concern.
    async fn generate(&self, system: &str, user: &str) -> std::result::Result<String, ProviderFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_story_trims_and_classifies() {
        let story = Story::new("  The battle began at dawn.  \n", StorySource::Manual).unwrap();
        assert_eq!(story.text(), "The battle began at dawn.");
        assert_eq!(story.theme(), Theme::Dramatic);
        assert_eq!(story.source(), StorySource::Manual);
        assert_eq!(story.word_count(), 5);
    }

    #[test]
    fn test_empty_story_is_input_error() {
        assert!(matches!(
            Story::new("   \n\t", StorySource::Manual),
            Err(ReelError::Input(_))
        ));
    }

    #[test]
    fn test_punctuation_only_story_is_input_error() {
        assert!(matches!(
            Story::new("... !!", StorySource::Generated),
            Err(ReelError::Input(_))
        ));
    }
}
