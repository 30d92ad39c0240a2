//! Story provider: manual text or LLM generation behind the retry policy.

use super::{Story, StoryGenerator, StorySource};
use crate::config::{Prompts, StorySettings};
use crate::error::{ReelError, Result};
use crate::retry::{retry, ProviderFailure, RetryPolicy};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

/// How the story is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoryMode {
    #[default]
    Manual,
    Auto,
}

/// User-facing description of where the story should come from.
#[derive(Debug, Clone, Default)]
pub struct StoryRequest {
    pub mode: StoryMode,
    /// Literal text (manual mode). Takes precedence over `input_file`.
    pub text: Option<String>,
    /// File to read the story from (manual mode).
    pub input_file: Option<PathBuf>,
    /// Replaces the user prompt template (auto mode).
    pub prompt: Option<String>,
}

impl StoryRequest {
    pub fn manual(text: impl Into<String>) -> Self {
        Self {
            mode: StoryMode::Manual,
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn auto() -> Self {
        Self {
            mode: StoryMode::Auto,
            ..Default::default()
        }
    }
}

/// Resolves a [`StoryRequest`] into a [`Story`].
pub struct StoryProvider {
    generator: Option<Arc<dyn StoryGenerator>>,
    prompts: Prompts,
    settings: StorySettings,
    policy: RetryPolicy,
}

impl StoryProvider {
    pub fn new(
        generator: Option<Arc<dyn StoryGenerator>>,
        prompts: Prompts,
        settings: StorySettings,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            generator,
            prompts,
            settings,
            policy,
        }
    }

    /// Produce the story for this run.
    #[instrument(skip(self, request), fields(mode = ?request.mode))]
    pub async fn provide(&self, request: &StoryRequest) -> Result<Story> {
        match request.mode {
            StoryMode::Manual => self.manual(request),
            StoryMode::Auto => self.generate(request).await,
        }
    }

    fn manual(&self, request: &StoryRequest) -> Result<Story> {
        let text = match (&request.text, &request.input_file) {
            (Some(text), _) => text.clone(),
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                ReelError::Input(format!("cannot read story file {}: {}", path.display(), e))
            })?,
            (None, None) => {
                return Err(ReelError::Input(
                    "manual mode requires story text or an input file".into(),
                ))
            }
        };

        let story = Story::new(text, StorySource::Manual)?;
        info!("Story received ({} words)", story.word_count());
        Ok(story)
    }

    /// Render the system and user prompts for generation.
    pub fn render_prompts(&self, prompt_override: Option<&str>) -> (String, String) {
        let mut vars = HashMap::new();
        vars.insert("duration".to_string(), self.settings.duration_seconds.to_string());
        vars.insert("min_words".to_string(), self.settings.min_words.to_string());
        vars.insert("max_words".to_string(), self.settings.max_words.to_string());

        let template = prompt_override
            .or(self.settings.prompt.as_deref())
            .unwrap_or(&self.prompts.story.user);

        let system = self.prompts.render_with_custom(&self.prompts.story.system, &vars);
        let user = self.prompts.render_with_custom(template, &vars);
        (system, user)
    }

    async fn generate(&self, request: &StoryRequest) -> Result<Story> {
        let generator = self.generator.as_ref().ok_or_else(|| {
            ReelError::Config("no story generator is configured for auto mode".into())
        })?;

        let (system, user) = self.render_prompts(request.prompt.as_deref());
        info!("Generating story with {}", self.settings.model);

        let text = retry(&self.policy, "story generation", |_| {
            let generator = Arc::clone(generator);
            let system = system.clone();
            let user = user.clone();
            async move {
                let text = generator.generate(&system, &user).await?;
                if text.trim().is_empty() {
                    return Err(ProviderFailure::fatal("language model returned an empty story"));
                }
                Ok(text)
            }
        })
        .await?;

        let story = Story::new(text, StorySource::Generated)
            .map_err(|e| ReelError::Provider(format!("generated story is unusable: {}", e)))?;
        info!("Story generated ({} words)", story.word_count());
        Ok(story)
    }
}

/// Read story lines until two consecutive blank lines or end of input.
///
/// A single blank line is kept as a paragraph break.
pub fn read_story_lines<R: BufRead>(reader: R) -> std::io::Result<String> {
    let mut lines: Vec<String> = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() && lines.last().is_some_and(|l| l.trim().is_empty()) {
            break;
        }
        lines.push(line);
    }
    Ok(lines.join("\n").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Theme;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Fails transiently a fixed number of times, then returns the text.
    struct FlakyGenerator {
        failures: u32,
        calls: AtomicU32,
        text: String,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl FlakyGenerator {
        fn new(failures: u32, text: &str) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                text: text.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl StoryGenerator for FlakyGenerator {
        async fn generate(&self, system: &str, user: &str) -> std::result::Result<String, ProviderFailure> {
            self.seen.lock().unwrap().push((system.to_string(), user.to_string()));
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(ProviderFailure::transient("HTTP 503"))
            } else {
                Ok(self.text.clone())
            }
        }
    }

    fn provider(generator: Option<Arc<dyn StoryGenerator>>, attempts: u32) -> StoryProvider {
        StoryProvider::new(
            generator,
            Prompts::default(),
            StorySettings::default(),
            RetryPolicy::immediate(attempts),
        )
    }

    #[tokio::test]
    async fn test_manual_text() {
        let story = provider(None, 1)
            .provide(&StoryRequest::manual("Hello world, this is a test."))
            .await
            .unwrap();
        assert_eq!(story.source(), StorySource::Manual);
        assert_eq!(story.theme(), Theme::Neutral);
    }

    #[tokio::test]
    async fn test_manual_empty_text_is_input_error() {
        let result = provider(None, 1).provide(&StoryRequest::manual("   ")).await;
        assert!(matches!(result, Err(ReelError::Input(_))));
    }

    #[tokio::test]
    async fn test_manual_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story.txt");
        std::fs::write(&path, "A secret hidden in the dark.\n").unwrap();

        let request = StoryRequest {
            input_file: Some(path),
            ..Default::default()
        };
        let story = provider(None, 1).provide(&request).await.unwrap();
        assert_eq!(story.text(), "A secret hidden in the dark.");
        assert_eq!(story.theme(), Theme::Mysterious);
    }

    #[tokio::test]
    async fn test_manual_missing_file_is_input_error() {
        let request = StoryRequest {
            input_file: Some(PathBuf::from("/no/such/story.txt")),
            ..Default::default()
        };
        assert!(matches!(
            provider(None, 1).provide(&request).await,
            Err(ReelError::Input(_))
        ));
    }

    #[tokio::test]
    async fn test_auto_retries_then_succeeds() {
        let generator = Arc::new(FlakyGenerator::new(2, "They laughed at the silly joke."));
        let story = provider(Some(generator.clone()), 3)
            .provide(&StoryRequest::auto())
            .await
            .unwrap();
        assert_eq!(story.source(), StorySource::Generated);
        assert_eq!(story.theme(), Theme::Comedic);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_auto_exhausted_is_provider_error() {
        let generator = Arc::new(FlakyGenerator::new(3, "never returned"));
        let result = provider(Some(generator), 3).provide(&StoryRequest::auto()).await;
        assert!(matches!(result, Err(ReelError::Provider(_))));
    }

    #[tokio::test]
    async fn test_auto_empty_response_is_provider_error() {
        let generator = Arc::new(FlakyGenerator::new(0, "   "));
        let result = provider(Some(generator.clone()), 3).provide(&StoryRequest::auto()).await;
        assert!(matches!(result, Err(ReelError::Provider(_))));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prompt_override_replaces_user_prompt() {
        let generator = Arc::new(FlakyGenerator::new(0, "A quick race."));
        let request = StoryRequest {
            mode: StoryMode::Auto,
            prompt: Some("Tell a {{duration}}-second story about a fox.".into()),
            ..Default::default()
        };
        provider(Some(generator.clone()), 1).provide(&request).await.unwrap();

        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen[0].1, "Tell a 60-second story about a fox.");
    }

    #[test]
    fn test_default_prompt_renders_word_bounds() {
        let (_, user) = provider(None, 1).render_prompts(None);
        assert!(user.contains("150-200 words"));
        assert!(user.contains("60-second"));
    }

    #[test]
    fn test_read_story_lines_stops_at_double_blank() {
        let input = "First line.\n\nSecond paragraph.\n\n\nignored\n";
        let story = read_story_lines(input.as_bytes()).unwrap();
        assert_eq!(story, "First line.\n\nSecond paragraph.");
    }
}
