//! Configuration settings for storyreel.

use crate::error::{ReelError, Result};
use crate::retry::{Backoff, RetryPolicy};
use crate::subtitle::to_ass_color;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub video: VideoSettings,
    pub subtitles: SubtitleSettings,
    pub story: StorySettings,
    pub speech: SpeechSettings,
    pub retry: RetrySettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory finished videos are written to.
    pub output_dir: String,
    /// Directory holding candidate background clips.
    pub videos_dir: String,
    /// Root for per-run working directories.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            output_dir: "output".to_string(),
            videos_dir: "videos".to_string(),
            temp_dir: std::env::temp_dir()
                .join("storyreel")
                .to_string_lossy()
                .into_owned(),
            log_level: "warn".to_string(),
        }
    }
}

/// Output video encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Video codec passed to ffmpeg (`-c:v`).
    pub codec: String,
    /// Audio codec passed to ffmpeg (`-c:a`).
    pub audio_codec: String,
    /// Target video bitrate (e.g. "8M"). None lets the encoder decide.
    pub bitrate: Option<String>,
    /// Encoder preset (ultrafast..veryslow).
    pub preset: String,
    /// Encoder thread count.
    pub threads: u32,
    /// Assumed speech length when neither the provider nor ffprobe reports one.
    pub default_duration_seconds: u32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30,
            codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            bitrate: None,
            preset: "medium".to_string(),
            threads: 4,
            default_duration_seconds: 60,
        }
    }
}

/// Subtitle appearance and line grouping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleSettings {
    pub font: String,
    pub font_size: u32,
    /// Colour name or #RRGGBB.
    pub text_color: String,
    pub highlight_color: String,
    pub outline_color: String,
    pub outline_width: u32,
    /// Opacity of the box behind the text, 0.0-1.0.
    pub background_opacity: f64,
    /// Vertical position of the text baseline as a fraction of frame height.
    pub position: f64,
    pub min_words_per_line: usize,
    pub max_words_per_line: usize,
}

impl Default for SubtitleSettings {
    fn default() -> Self {
        Self {
            font: "Arial".to_string(),
            font_size: 40,
            text_color: "white".to_string(),
            highlight_color: "yellow".to_string(),
            outline_color: "black".to_string(),
            outline_width: 1,
            background_opacity: 0.5,
            position: 0.8,
            min_words_per_line: 5,
            max_words_per_line: 7,
        }
    }
}

/// Story generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorySettings {
    /// Chat model used for auto-generated stories.
    pub model: String,
    pub temperature: f32,
    /// Target narration length, exposed to prompts as {{duration}}.
    pub duration_seconds: u32,
    pub min_words: u32,
    pub max_words: u32,
    /// Replaces the user prompt template when set.
    pub prompt: Option<String>,
}

impl Default for StorySettings {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.8,
            duration_seconds: 60,
            min_words: 150,
            max_words: 200,
            prompt: None,
        }
    }
}

/// Speech synthesis (ElevenLabs) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub base_url: String,
    pub model_id: String,
    pub stability: f32,
    pub similarity_boost: f32,
    pub output_format: String,
    /// Request character-level timestamps alongside the audio.
    pub timestamps: bool,
    pub timeout_seconds: u64,
    /// Per-theme voice remapping (voice name or raw voice id).
    pub voices: BTreeMap<Theme, String>,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io".to_string(),
            model_id: "eleven_monolingual_v1".to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
            output_format: "mp3_44100_128".to_string(),
            timestamps: true,
            timeout_seconds: 120,
            voices: BTreeMap::new(),
        }
    }
}

/// Retry policy for provider calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub delay_ms: u64,
    pub backoff: Backoff,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
            backoff: Backoff::Exponential,
            max_delay_ms: 10_000,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: HashMap<String, String>,
}

/// Overrides coming from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub prompt: Option<String>,
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ReelError::Config(format!("{} has an invalid value: '{}'", key, value)))
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else if path.is_some() {
            Err(ReelError::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )))
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ReelError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("storyreel")
            .join("config.toml")
    }

    /// Apply `STORYREEL_*` environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup (the environment in production).
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            let key = format!("STORYREEL_{}", name);
            lookup(&key).map(|value| (key, value))
        };

        if let Some((_, v)) = get("OUTPUT_DIR") {
            self.general.output_dir = v;
        }
        if let Some((_, v)) = get("VIDEOS_DIR") {
            self.general.videos_dir = v;
        }
        if let Some((_, v)) = get("TEMP_DIR") {
            self.general.temp_dir = v;
        }
        if let Some((k, v)) = get("VIDEO_WIDTH") {
            self.video.width = parse_env(&k, &v)?;
        }
        if let Some((k, v)) = get("VIDEO_HEIGHT") {
            self.video.height = parse_env(&k, &v)?;
        }
        if let Some((k, v)) = get("VIDEO_FPS") {
            self.video.fps = parse_env(&k, &v)?;
        }
        if let Some((_, v)) = get("VIDEO_CODEC") {
            self.video.codec = v;
        }
        if let Some((_, v)) = get("AUDIO_CODEC") {
            self.video.audio_codec = v;
        }
        if let Some((_, v)) = get("VIDEO_BITRATE") {
            self.video.bitrate = Some(v).filter(|b| !b.trim().is_empty());
        }
        if let Some((_, v)) = get("VIDEO_PRESET") {
            self.video.preset = v;
        }
        if let Some((k, v)) = get("VIDEO_THREADS") {
            self.video.threads = parse_env(&k, &v)?;
        }
        if let Some((_, v)) = get("SUBTITLE_FONT") {
            self.subtitles.font = v;
        }
        if let Some((k, v)) = get("SUBTITLE_FONT_SIZE") {
            self.subtitles.font_size = parse_env(&k, &v)?;
        }
        if let Some((_, v)) = get("SUBTITLE_TEXT_COLOR") {
            self.subtitles.text_color = v;
        }
        if let Some((_, v)) = get("SUBTITLE_HIGHLIGHT_COLOR") {
            self.subtitles.highlight_color = v;
        }
        if let Some((_, v)) = get("STORY_MODEL") {
            self.story.model = v;
        }
        if let Some((_, v)) = get("STORY_PROMPT") {
            self.story.prompt = Some(v);
        }
        if let Some((_, v)) = get("SPEECH_MODEL") {
            self.speech.model_id = v;
        }
        if let Some((k, v)) = get("RETRY_MAX_ATTEMPTS") {
            self.retry.max_attempts = parse_env(&k, &v)?;
        }
        if let Some((k, v)) = get("RETRY_DELAY_MS") {
            self.retry.delay_ms = parse_env(&k, &v)?;
        }

        Ok(())
    }

    /// Apply command-line overrides (highest precedence).
    pub fn apply_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(w) = overrides.width {
            self.video.width = w;
        }
        if let Some(h) = overrides.height {
            self.video.height = h;
        }
        if let Some(fps) = overrides.fps {
            self.video.fps = fps;
        }
        if let Some(prompt) = &overrides.prompt {
            self.story.prompt = Some(prompt.clone());
        }
    }

    /// Check value ranges that would otherwise fail deep inside the pipeline.
    pub fn validate(&self) -> Result<()> {
        let v = &self.video;
        if v.width == 0 || v.height == 0 {
            return Err(ReelError::Config("video width and height must be positive".into()));
        }
        if v.width % 2 != 0 || v.height % 2 != 0 {
            return Err(ReelError::Config(format!(
                "video dimensions must be even for yuv420p output, got {}x{}",
                v.width, v.height
            )));
        }
        if v.fps == 0 {
            return Err(ReelError::Config("video fps must be positive".into()));
        }
        if v.default_duration_seconds == 0 {
            return Err(ReelError::Config("video.default_duration_seconds must be positive".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ReelError::Config("retry.max_attempts must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.speech.stability) {
            return Err(ReelError::Config("speech.stability must be within 0.0-1.0".into()));
        }
        if !(0.0..=1.0).contains(&self.speech.similarity_boost) {
            return Err(ReelError::Config(
                "speech.similarity_boost must be within 0.0-1.0".into(),
            ));
        }
        let s = &self.subtitles;
        if !(s.position > 0.0 && s.position <= 1.0) {
            return Err(ReelError::Config("subtitles.position must be within (0.0, 1.0]".into()));
        }
        if !(0.0..=1.0).contains(&s.background_opacity) {
            return Err(ReelError::Config(
                "subtitles.background_opacity must be within 0.0-1.0".into(),
            ));
        }
        if s.min_words_per_line == 0 || s.min_words_per_line > s.max_words_per_line {
            return Err(ReelError::Config(format!(
                "subtitle line bounds are inconsistent (min {}, max {})",
                s.min_words_per_line, s.max_words_per_line
            )));
        }
        if s.font_size == 0 {
            return Err(ReelError::Config("subtitles.font_size must be positive".into()));
        }
        for (key, color) in [
            ("text_color", &s.text_color),
            ("highlight_color", &s.highlight_color),
            ("outline_color", &s.outline_color),
        ] {
            to_ass_color(color, 0)
                .map_err(|e| ReelError::Config(format!("subtitles.{}: {}", key, e)))?;
        }
        Ok(())
    }

    /// Retry policy derived from `[retry]`.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            backoff: self.retry.backoff,
        }
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded output directory path.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.output_dir)
    }

    /// Get the expanded background clip directory path.
    pub fn videos_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.videos_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.video.width, 1080);
        assert_eq!(settings.video.height, 1920);
        assert_eq!(settings.video.fps, 30);
        assert_eq!(settings.video.preset, "medium");
        assert_eq!(settings.retry.max_attempts, 3);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [video]
            fps = 60

            [speech.voices]
            comedic = "Josh"
            "#,
        )
        .unwrap();
        assert_eq!(settings.video.fps, 60);
        assert_eq!(settings.video.width, 1080);
        assert_eq!(settings.speech.voices.get(&Theme::Comedic).map(String::as_str), Some("Josh"));
    }

    #[test]
    fn test_unknown_theme_in_voice_table_is_rejected() {
        let parsed: std::result::Result<Settings, _> = toml::from_str(
            r#"
            [speech.voices]
            spooky = "Adam"
            "#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_env_with(env(&[
                ("STORYREEL_VIDEO_WIDTH", "720"),
                ("STORYREEL_VIDEO_HEIGHT", "1280"),
                ("STORYREEL_RETRY_MAX_ATTEMPTS", "5"),
                ("STORYREEL_STORY_MODEL", "gpt-4o-mini"),
                ("STORYREEL_VIDEO_BITRATE", ""),
            ]))
            .unwrap();
        assert_eq!(settings.video.width, 720);
        assert_eq!(settings.video.height, 1280);
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.story.model, "gpt-4o-mini");
        assert!(settings.video.bitrate.is_none());
    }

    #[test]
    fn test_env_parse_failure_is_config_error() {
        let mut settings = Settings::default();
        let err = settings
            .apply_env_with(env(&[("STORYREEL_VIDEO_FPS", "fast")]))
            .unwrap_err();
        assert!(matches!(err, ReelError::Config(msg) if msg.contains("STORYREEL_VIDEO_FPS")));
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut settings = Settings::default();
        settings
            .apply_env_with(env(&[("STORYREEL_VIDEO_WIDTH", "720")]))
            .unwrap();
        settings.apply_overrides(&CliOverrides {
            width: Some(540),
            prompt: Some("Tell a ghost story".into()),
            ..Default::default()
        });
        assert_eq!(settings.video.width, 540);
        assert_eq!(settings.story.prompt.as_deref(), Some("Tell a ghost story"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.video.width = 1081;
        assert!(matches!(settings.validate(), Err(ReelError::Config(_))));

        let mut settings = Settings::default();
        settings.retry.max_attempts = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.subtitles.min_words_per_line = 9;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.video.default_duration_seconds = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_subtitle_colors() {
        let mut settings = Settings::default();
        settings.subtitles.highlight_color = "not-a-colour".into();
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, ReelError::Config(ref m) if m.contains("highlight_color")));

        let mut settings = Settings::default();
        settings.subtitles.outline_color = "#12345".into();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.subtitles.text_color = "#FFCC00".into();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut settings = Settings::default();
        settings.video.fps = 24;
        settings.speech.voices.insert(Theme::Neutral, "Rachel".into());
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.video.fps, 24);
        assert_eq!(loaded.speech.voices.get(&Theme::Neutral).map(String::as_str), Some("Rachel"));
    }

    #[test]
    fn test_explicit_missing_config_is_error() {
        let path = PathBuf::from("/definitely/not/here/storyreel.toml");
        assert!(matches!(Settings::load_from(Some(&path)), Err(ReelError::Config(_))));
    }
}
