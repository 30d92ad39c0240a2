//! Speech synthesis and word timing.
//!
//! The synthesizer collaborator returns audio bytes and, when the provider
//! supports it, character-level alignment. [`Narrator`] wraps it with the
//! retry policy, writes the audio into the run workspace and derives
//! per-word timing.

mod elevenlabs;
mod timing;

pub use elevenlabs::{is_api_key_configured, ElevenLabsSynthesizer};
pub use timing::{estimate_word_timings, words_from_alignment};

use crate::error::{ReelError, Result};
use crate::media::MediaComposer;
use crate::retry::{retry, ProviderFailure, RetryPolicy};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// A single spoken word and when it is heard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
}

impl WordTiming {
    pub fn new(word: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            word: word.into(),
            start,
            end,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Character-level alignment as returned by the speech provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterAlignment {
    pub characters: Vec<String>,
    pub character_start_times_seconds: Vec<f64>,
    pub character_end_times_seconds: Vec<f64>,
}

impl CharacterAlignment {
    /// End time of the last aligned character.
    pub fn duration(&self) -> Option<f64> {
        self.character_end_times_seconds
            .iter()
            .copied()
            .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |a| a.max(t))))
    }
}

/// Parameters for one synthesis call.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_id: String,
    pub stability: f32,
    pub similarity_boost: f32,
}

/// Raw provider output.
#[derive(Debug, Clone, Default)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    pub alignment: Option<CharacterAlignment>,
    /// Audio length when the provider reports it.
    pub duration: Option<f64>,
}

/// Whether word timings came from the provider or were estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingSource {
    Provider,
    Estimated,
}

impl std::fmt::Display for TimingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimingSource::Provider => write!(f, "provider"),
            TimingSource::Estimated => write!(f, "estimated"),
        }
    }
}

/// Synthesized narration ready for subtitling and rendering.
#[derive(Debug, Clone)]
pub struct SpeechResult {
    pub audio_path: PathBuf,
    pub words: Vec<WordTiming>,
    /// Total audio duration in seconds.
    pub duration: f64,
    pub timing_source: TimingSource,
}

/// Voice-synthesis collaborator.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize speech. A single attempt; retries are the caller's concern.
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> std::result::Result<SynthesizedAudio, ProviderFailure>;

    /// File extension of the produced audio.
    fn audio_extension(&self) -> &str {
        "mp3"
    }
}

/// Turns story text into a [`SpeechResult`].
pub struct Narrator {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    composer: Arc<dyn MediaComposer>,
    policy: RetryPolicy,
    fallback_duration: f64,
}

const DEFAULT_FALLBACK_DURATION: f64 = 60.0;

impl Narrator {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        composer: Arc<dyn MediaComposer>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            synthesizer,
            composer,
            policy,
            fallback_duration: DEFAULT_FALLBACK_DURATION,
        }
    }

    /// Length assumed when neither the provider nor probing yields one.
    pub fn with_fallback_duration(mut self, seconds: f64) -> Self {
        self.fallback_duration = seconds;
        self
    }

    /// Synthesize `request` and write the audio into `work_dir`.
    #[instrument(skip(self, request, work_dir), fields(voice_id = %request.voice_id))]
    pub async fn narrate(&self, request: &SynthesisRequest, work_dir: &Path) -> Result<SpeechResult> {
        let audio = retry(&self.policy, "speech synthesis", |_| {
            let synthesizer = Arc::clone(&self.synthesizer);
            async move {
                let audio = synthesizer.synthesize(request).await?;
                if audio.bytes.is_empty() {
                    return Err(ProviderFailure::fatal("speech provider returned no audio"));
                }
                Ok(audio)
            }
        })
        .await?;

        let audio_path = work_dir.join(format!("speech.{}", self.synthesizer.audio_extension()));
        tokio::fs::write(&audio_path, &audio.bytes).await?;
        info!("Speech written to {} ({} bytes)", audio_path.display(), audio.bytes.len());

        let provider_words = audio
            .alignment
            .as_ref()
            .map(words_from_alignment)
            .filter(|w| !w.is_empty());

        let reported = audio
            .duration
            .or_else(|| audio.alignment.as_ref().and_then(CharacterAlignment::duration))
            .filter(|d| *d > 0.0);
        let duration = self.resolve_duration(reported, &audio_path).await?;

        let (words, timing_source) = match provider_words {
            Some(words) => (words, TimingSource::Provider),
            None => {
                warn!("No word timing from provider; estimating from character counts (approximate)");
                (estimate_word_timings(&request.text, duration), TimingSource::Estimated)
            }
        };

        Ok(SpeechResult {
            audio_path,
            words,
            duration,
            timing_source,
        })
    }

    /// The written file can run past the last aligned character, so the
    /// probed length wins when it is longer.
    async fn resolve_duration(&self, reported: Option<f64>, audio_path: &Path) -> Result<f64> {
        let probed = match self.composer.probe_duration(audio_path).await {
            Ok(d) if d > 0.0 => Some(d),
            Ok(_) => None,
            Err(e) => {
                warn!("Could not probe {}: {}", audio_path.display(), e);
                None
            }
        };

        let duration = match (reported, probed) {
            (Some(r), Some(p)) => r.max(p),
            (Some(d), None) | (None, Some(d)) => d,
            (None, None) => {
                warn!(
                    "Speech duration unknown; assuming {:.0}s from video.default_duration_seconds",
                    self.fallback_duration
                );
                self.fallback_duration
            }
        };
        if duration <= 0.0 {
            return Err(ReelError::Provider("synthesized audio has no duration".into()));
        }
        Ok(duration)
    }
}
