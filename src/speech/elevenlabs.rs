//! ElevenLabs text-to-speech client.

use super::{CharacterAlignment, SpeechSynthesizer, SynthesisRequest, SynthesizedAudio};
use crate::config::SpeechSettings;
use crate::error::{ReelError, Result};
use crate::retry::ProviderFailure;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "ELEVENLABS_API_KEY";

/// Check if the ElevenLabs API key is configured.
pub fn is_api_key_configured() -> bool {
    std::env::var(API_KEY_ENV).is_ok_and(|k| !k.trim().is_empty())
}

#[derive(Debug, Serialize)]
struct VoiceSettingsBody {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Debug, Serialize)]
struct TtsBody<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettingsBody,
}

#[derive(Debug, Deserialize)]
struct TimestampedResponse {
    audio_base64: String,
    #[serde(default)]
    alignment: Option<CharacterAlignment>,
}

/// Speech synthesizer calling the ElevenLabs REST API.
pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    api_key: String,
    base_url: Url,
    model_id: String,
    output_format: String,
    timestamps: bool,
}

impl ElevenLabsSynthesizer {
    /// Create a synthesizer from settings, reading the key from the environment.
    pub fn from_settings(settings: &SpeechSettings) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ReelError::Config(format!("{} is not set", API_KEY_ENV)))?;
        Self::new(api_key, settings)
    }

    pub fn new(api_key: impl Into<String>, settings: &SpeechSettings) -> Result<Self> {
        let base_url = Url::parse(&settings.base_url).map_err(|e| {
            ReelError::Config(format!("invalid speech base_url '{}': {}", settings.base_url, e))
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| ReelError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url,
            model_id: settings.model_id.clone(),
            output_format: settings.output_format.clone(),
            timestamps: settings.timestamps,
        })
    }

    /// Endpoint for a voice, with or without the timestamps suffix.
    fn endpoint(&self, voice_id: &str) -> std::result::Result<Url, ProviderFailure> {
        let mut path = format!("v1/text-to-speech/{}", voice_id);
        if self.timestamps {
            path.push_str("/with-timestamps");
        }
        let mut url = self
            .base_url
            .join(&path)
            .map_err(|e| ProviderFailure::fatal(format!("invalid voice id '{}': {}", voice_id, e)))?;
        url.query_pairs_mut().append_pair("output_format", &self.output_format);
        Ok(url)
    }
}

/// Decode a timestamped response into audio bytes and alignment.
fn decode_timestamped(body: &[u8]) -> std::result::Result<SynthesizedAudio, ProviderFailure> {
    let parsed: TimestampedResponse = serde_json::from_slice(body)
        .map_err(|e| ProviderFailure::fatal(format!("malformed speech response: {}", e)))?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(parsed.audio_base64.as_bytes())
        .map_err(|e| ProviderFailure::fatal(format!("malformed audio payload: {}", e)))?;
    Ok(SynthesizedAudio {
        bytes,
        alignment: parsed.alignment,
        duration: None,
    })
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    #[instrument(skip(self, request), fields(voice_id = %request.voice_id, chars = request.text.len()))]
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> std::result::Result<SynthesizedAudio, ProviderFailure> {
        let url = self.endpoint(&request.voice_id)?;
        let body = TtsBody {
            text: &request.text,
            model_id: &self.model_id,
            voice_settings: VoiceSettingsBody {
                stability: request.stability,
                similarity_boost: request.similarity_boost,
            },
        };

        let response = self
            .client
            .post(url)
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderFailure::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderFailure::from_status(status, &text));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderFailure::from_reqwest(&e))?;
        debug!("Received {} bytes from speech provider", bytes.len());

        if self.timestamps {
            decode_timestamped(&bytes)
        } else {
            Ok(SynthesizedAudio {
                bytes: bytes.to_vec(),
                alignment: None,
                duration: None,
            })
        }
    }

    fn audio_extension(&self) -> &str {
        if self.output_format.starts_with("pcm") {
            "pcm"
        } else if self.output_format.starts_with("ulaw") {
            "ulaw"
        } else {
            "mp3"
        }
    }
}
