//! Media probing, background selection and the final encode.

mod background;
mod ffmpeg;

pub use background::{list_backgrounds, select_background, VIDEO_EXTENSIONS};
pub use ffmpeg::{build_render_args, crop_to_aspect, escape_filter_path, Crop, FfmpegComposer};

use crate::config::VideoSettings;
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Dimensions and length of a video file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Duration in seconds.
    pub duration: f64,
}

/// Output encoding parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodeSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_codec: String,
    pub audio_codec: String,
    pub bitrate: Option<String>,
    pub preset: String,
    pub threads: u32,
}

impl EncodeSettings {
    pub fn from_settings(video: &VideoSettings) -> Self {
        Self {
            width: video.width,
            height: video.height,
            fps: video.fps,
            video_codec: video.codec.clone(),
            audio_codec: video.audio_codec.clone(),
            bitrate: video.bitrate.clone(),
            preset: video.preset.clone(),
            threads: video.threads,
        }
    }
}

/// Everything needed for one encode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderJob {
    pub background: PathBuf,
    pub background_info: VideoInfo,
    pub audio: PathBuf,
    pub subtitles: PathBuf,
    /// Output duration in seconds; the speech length.
    pub duration: f64,
    pub encode: EncodeSettings,
}

impl RenderJob {
    /// Whether the background must be looped to cover the speech.
    pub fn needs_loop(&self) -> bool {
        self.background_info.duration < self.duration
    }
}

/// Media-composition collaborator.
#[async_trait]
pub trait MediaComposer: Send + Sync {
    /// Duration of any media file, in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64>;

    /// Dimensions and duration of a video file.
    async fn probe_video(&self, path: &Path) -> Result<VideoInfo>;

    /// Encode `job` into `output`.
    async fn render(&self, job: &RenderJob, output: &Path) -> Result<()>;
}
