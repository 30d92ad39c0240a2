//! Pipeline orchestrator for storyreel.
//!
//! Coordinates one run from story acquisition to the final encoded file.
//! Every intermediate artifact lives in a [`Workspace`] that is removed when
//! the run ends, whether it succeeds, fails or is cancelled.

use crate::config::{Prompts, Settings};
use crate::error::{ReelError, Result};
use crate::media::{select_background, EncodeSettings, FfmpegComposer, MediaComposer, RenderJob};
use crate::openai;
use crate::speech::{ElevenLabsSynthesizer, Narrator, SpeechSynthesizer, SynthesisRequest, TimingSource};
use crate::story::{OpenAIStoryGenerator, Story, StoryGenerator, StoryProvider, StoryRequest};
use crate::subtitle::{write_ass, SubtitleTrack};
use crate::voice::{select_voice, VoiceSelection};
use crate::workspace::{persist, unique_output_path, Workspace};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

/// Everything a `create` run needs besides configuration.
#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    pub story: StoryRequest,
    /// Explicit background clip.
    pub video: Option<PathBuf>,
    /// Voice name or id overriding the theme mapping.
    pub voice: Option<String>,
    /// Requested output file name.
    pub output: Option<String>,
}

/// Result of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub output_path: PathBuf,
    pub story: Story,
    pub voice: VoiceSelection,
    pub background: PathBuf,
    /// Video duration in seconds.
    pub duration: f64,
    pub clip_count: usize,
    pub timing_source: TimingSource,
}

/// The main orchestrator for the storyreel pipeline.
pub struct Orchestrator {
    settings: Settings,
    stories: StoryProvider,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    composer: Arc<dyn MediaComposer>,
}

impl Orchestrator {
    /// Create an orchestrator with the production collaborators.
    ///
    /// The story generator is only wired up when `OPENAI_API_KEY` is set;
    /// auto mode without it fails with a configuration error.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let generator: Option<Arc<dyn StoryGenerator>> = if openai::is_api_key_configured() {
            Some(Arc::new(OpenAIStoryGenerator::with_config(
                &settings.story.model,
                settings.story.temperature,
            )?))
        } else {
            None
        };

        let synthesizer = Arc::new(ElevenLabsSynthesizer::from_settings(&settings.speech)?);
        let composer = Arc::new(FfmpegComposer::new());

        Ok(Self::with_components(settings, prompts, generator, synthesizer, composer))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        generator: Option<Arc<dyn StoryGenerator>>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        composer: Arc<dyn MediaComposer>,
    ) -> Self {
        let stories = StoryProvider::new(
            generator,
            prompts,
            settings.story.clone(),
            settings.retry_policy(),
        );
        Self {
            settings,
            stories,
            synthesizer,
            composer,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the whole pipeline and place the video in the output directory.
    #[instrument(skip(self, request), fields(mode = ?request.story.mode))]
    pub async fn run(&self, request: &CreateRequest) -> Result<RunOutput> {
        let story = self.stories.provide(&request.story).await?;
        info!("Detected theme: {}", story.theme());

        let voice = select_voice(story.theme(), request.voice.as_deref(), &self.settings.speech.voices)?;
        info!("Selected voice: {} ({})", voice.name, voice.id);

        let background = select_background(
            &self.settings.videos_dir(),
            request.video.as_deref(),
            &mut rand::rng(),
        )?;
        let background_info = self.composer.probe_video(&background).await?;

        let workspace = Workspace::create(&self.settings.temp_dir())?;

        let narrator = Narrator::new(
            Arc::clone(&self.synthesizer),
            Arc::clone(&self.composer),
            self.settings.retry_policy(),
        )
        .with_fallback_duration(f64::from(self.settings.video.default_duration_seconds));
        let speech = narrator
            .narrate(
                &SynthesisRequest {
                    text: story.text().to_string(),
                    voice_id: voice.id.clone(),
                    stability: self.settings.speech.stability,
                    similarity_boost: self.settings.speech.similarity_boost,
                },
                workspace.path(),
            )
            .await?;
        info!(
            "Speech is {:.2}s with {} words ({} timing)",
            speech.duration,
            speech.words.len(),
            speech.timing_source
        );

        let track = SubtitleTrack::compose(&speech, &self.settings.subtitles);
        if track.is_empty() {
            return Err(ReelError::Render("narration produced no subtitle words".into()));
        }
        let subtitles = workspace.file("subtitles.ass");
        write_ass(&track, self.settings.video.width, self.settings.video.height, &subtitles)?;

        let output_dir = self.settings.output_dir();
        std::fs::create_dir_all(&output_dir).map_err(|e| {
            ReelError::Resource(format!("cannot create output dir {}: {}", output_dir.display(), e))
        })?;
        let output_path = unique_output_path(&output_dir, request.output.as_deref());
        let extension = output_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4");
        let rendered = workspace.file(&format!("render.{}", extension));

        let job = RenderJob {
            background: background.clone(),
            background_info,
            audio: speech.audio_path.clone(),
            subtitles,
            duration: speech.duration,
            encode: EncodeSettings::from_settings(&self.settings.video),
        };
        self.composer.render(&job, &rendered).await?;
        persist(&rendered, &output_path)?;
        workspace.close()?;

        info!("Video written to {}", output_path.display());
        Ok(RunOutput {
            output_path,
            story,
            voice,
            background,
            duration: job.duration,
            clip_count: track.len(),
            timing_source: speech.timing_source,
        })
    }
}
