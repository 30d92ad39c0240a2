//! ffmpeg/ffprobe backed media composition.

use super::{MediaComposer, RenderJob, VideoInfo};
use crate::error::{ReelError, Result};
use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// A crop rectangle in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crop {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Centre-crop a `src_width` x `src_height` frame to the target aspect ratio.
///
/// Wider sources lose their sides, taller sources lose top and bottom.
pub fn crop_to_aspect(src_width: u32, src_height: u32, target_width: u32, target_height: u32) -> Crop {
    let (sw, sh) = (src_width as u64, src_height as u64);
    let (tw, th) = (target_width.max(1) as u64, target_height.max(1) as u64);

    if sw * th > tw * sh {
        let new_width = sh * tw / th;
        let center = sw / 2;
        let x1 = center.saturating_sub(new_width / 2);
        let x2 = (center + new_width / 2).min(sw);
        Crop { x: x1 as u32, y: 0, width: (x2 - x1) as u32, height: src_height }
    } else {
        let new_height = sw * th / tw;
        let center = sh / 2;
        let y1 = center.saturating_sub(new_height / 2);
        let y2 = (center + new_height / 2).min(sh);
        Crop { x: 0, y: y1 as u32, width: src_width, height: (y2 - y1) as u32 }
    }
}

/// Escape a path for a single-quoted ffmpeg filter option value.
pub fn escape_filter_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\\' => out.push('/'),
            ':' => out.push_str("\\:"),
            '\'' => out.push_str("'\\''"),
            _ => out.push(ch),
        }
    }
    out
}

fn os(value: impl AsRef<OsStr>) -> OsString {
    value.as_ref().to_owned()
}

/// Build the full ffmpeg argument list for a render.
pub fn build_render_args(job: &RenderJob, output: &Path) -> Vec<OsString> {
    let enc = &job.encode;
    let info = &job.background_info;
    let crop = crop_to_aspect(info.width, info.height, enc.width, enc.height);
    let duration = format!("{:.3}", job.duration);

    let filter = format!(
        "[0:v]crop={}:{}:{}:{},scale={}:{},setsar=1,fps={},subtitles=filename='{}'[v]",
        crop.width,
        crop.height,
        crop.x,
        crop.y,
        enc.width,
        enc.height,
        enc.fps,
        escape_filter_path(&job.subtitles),
    );

    let mut args: Vec<OsString> = ["-y", "-hide_banner", "-loglevel", "error"].map(os).to_vec();
    if job.needs_loop() {
        args.extend(["-stream_loop", "-1"].map(os));
    }
    args.extend([
        os("-i"),
        os(&job.background),
        os("-i"),
        os(&job.audio),
        os("-filter_complex"),
        os(&filter),
        os("-map"),
        os("[v]"),
        os("-map"),
        os("1:a:0"),
        os("-c:v"),
        os(&enc.video_codec),
        os("-preset"),
        os(&enc.preset),
    ]);
    if let Some(bitrate) = &enc.bitrate {
        args.extend([os("-b:v"), os(bitrate)]);
    }
    args.extend([
        os("-pix_fmt"),
        os("yuv420p"),
        os("-c:a"),
        os(&enc.audio_codec),
        os("-threads"),
        os(enc.threads.to_string()),
        os("-r"),
        os(enc.fps.to_string()),
        os("-t"),
        os(&duration),
        os("-movflags"),
        os("+faststart"),
        os(output),
    ]);
    args
}

/// Media composer shelling out to ffmpeg and ffprobe.
#[derive(Debug, Clone)]
pub struct FfmpegComposer {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for FfmpegComposer {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

impl FfmpegComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use specific binaries instead of the ones on `PATH`.
    pub fn with_binaries(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    async fn ffprobe_json(&self, path: &Path, extra: &[&str]) -> Result<serde_json::Value> {
        let result = Command::new(&self.ffprobe)
            .arg("-v").arg("quiet")
            .arg("-print_format").arg("json")
            .arg("-show_format")
            .args(extra)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReelError::ToolNotFound(self.ffprobe.clone()));
            }
            Err(e) => return Err(ReelError::Render(format!("ffprobe failed: {e}"))),
        };

        if !output.status.success() {
            return Err(ReelError::Resource(format!(
                "ffprobe could not read {}",
                path.display()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|_| ReelError::Render("Invalid ffprobe output".into()))
    }
}

fn parse_duration(parsed: &serde_json::Value) -> Option<f64> {
    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| *d > 0.0)
}

fn parse_video_info(parsed: &serde_json::Value) -> Option<VideoInfo> {
    let stream = parsed["streams"]
        .as_array()?
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("video"))?;
    let width = stream["width"].as_u64()? as u32;
    let height = stream["height"].as_u64()? as u32;
    let duration = parse_duration(parsed).or_else(|| {
        stream["duration"]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
    })?;
    if width == 0 || height == 0 {
        return None;
    }
    Some(VideoInfo { width, height, duration })
}

#[async_trait]
impl MediaComposer for FfmpegComposer {
    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let parsed = self.ffprobe_json(path, &[]).await?;
        parse_duration(&parsed).ok_or_else(|| {
            ReelError::Render(format!("Could not determine duration of {}", path.display()))
        })
    }

    async fn probe_video(&self, path: &Path) -> Result<VideoInfo> {
        let parsed = self.ffprobe_json(path, &["-show_streams"]).await?;
        parse_video_info(&parsed).ok_or_else(|| {
            ReelError::Resource(format!("{} has no readable video stream", path.display()))
        })
    }

    #[instrument(skip(self, job), fields(duration = job.duration, looped = job.needs_loop()))]
    async fn render(&self, job: &RenderJob, output: &Path) -> Result<()> {
        let args = build_render_args(job, output);
        debug!("{} {:?}", self.ffmpeg, args);
        info!("Encoding {}x{} video", job.encode.width, job.encode.height);

        let result = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        match result {
            Ok(out) if out.status.success() && output.exists() => Ok(()),
            Ok(out) => {
                let err = String::from_utf8_lossy(&out.stderr);
                Err(ReelError::Render(format!("ffmpeg encode failed: {}", err.trim())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ReelError::ToolNotFound(self.ffmpeg.clone()))
            }
            Err(e) => Err(ReelError::Render(format!("ffmpeg error: {e}"))),
        }
    }
}
