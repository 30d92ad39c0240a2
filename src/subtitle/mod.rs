//! Word-highlight subtitle composition.
//!
//! Each spoken word gets its own clip showing the surrounding display line
//! with that word highlighted. Clip spans tile the whole narration with no
//! gaps, so the overlay never flickers between words.

mod ass;

pub use ass::{to_ass_color, write_ass, AssScript};

use crate::config::SubtitleSettings;
use crate::speech::{SpeechResult, WordTiming};
use serde::Serialize;

/// Characters that may close a display line.
const LINE_BREAK_PUNCTUATION: [char; 6] = ['.', ',', '!', '?', ';', ':'];

/// Visual style shared by every clip of a track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtitleStyle {
    pub font: String,
    pub font_size: u32,
    pub text_color: String,
    pub highlight_color: String,
    pub outline_color: String,
    pub outline_width: u32,
    /// Opacity of the box behind the text, 0 disables it.
    pub background_opacity: f64,
    /// Vertical position of the text baseline as a fraction of height.
    pub position: f64,
    /// Left and right margin as a fraction of width.
    pub side_margin: f64,
}

impl SubtitleStyle {
    pub fn from_settings(settings: &SubtitleSettings) -> Self {
        Self {
            font: settings.font.clone(),
            font_size: settings.font_size,
            text_color: settings.text_color.clone(),
            highlight_color: settings.highlight_color.clone(),
            outline_color: settings.outline_color.clone(),
            outline_width: settings.outline_width,
            background_opacity: settings.background_opacity,
            position: settings.position,
            side_margin: 0.05,
        }
    }
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self::from_settings(&SubtitleSettings::default())
    }
}

/// One display line shown while a single word is highlighted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtitleClip {
    pub words: Vec<String>,
    /// Index into `words` of the highlighted word.
    pub highlighted: usize,
    pub start: f64,
    pub end: f64,
}

impl SubtitleClip {
    pub fn highlighted_word(&self) -> &str {
        &self.words[self.highlighted]
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// An ordered, contiguous clip sequence plus its style.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtitleTrack {
    pub clips: Vec<SubtitleClip>,
    pub style: SubtitleStyle,
}

impl SubtitleTrack {
    /// Build the track for a synthesized narration.
    pub fn compose(speech: &SpeechResult, settings: &SubtitleSettings) -> Self {
        Self {
            clips: compose_clips(
                &speech.words,
                speech.duration,
                settings.min_words_per_line,
                settings.max_words_per_line,
            ),
            style: SubtitleStyle::from_settings(settings),
        }
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

fn is_punctuation(token: &str) -> bool {
    !token.chars().any(char::is_alphanumeric)
}

/// Fold punctuation-only tokens into a neighbouring word.
///
/// A token attaches to the preceding word; leading punctuation attaches to
/// the first word that follows it.
pub fn merge_punctuation(timings: &[WordTiming]) -> Vec<WordTiming> {
    let mut merged: Vec<WordTiming> = Vec::with_capacity(timings.len());
    let mut pending: Option<WordTiming> = None;

    for timing in timings {
        let token = timing.word.trim();
        if token.is_empty() {
            continue;
        }
        if is_punctuation(token) {
            if let Some(last) = merged.last_mut() {
                last.word.push_str(token);
                last.end = last.end.max(timing.end);
            } else {
                let prefix = pending.get_or_insert_with(|| WordTiming::new("", timing.start, timing.end));
                prefix.word.push_str(token);
                prefix.end = prefix.end.max(timing.end);
            }
            continue;
        }

        let mut word = WordTiming::new(token, timing.start, timing.end);
        if let Some(prefix) = pending.take() {
            word.word.insert_str(0, &prefix.word);
            word.start = prefix.start.min(word.start);
        }
        merged.push(word);
    }
    merged
}

/// Split word indices into display lines.
fn group_lines(words: &[WordTiming], min_words: usize, max_words: usize) -> Vec<std::ops::Range<usize>> {
    let max_words = max_words.max(1);
    let mut lines = Vec::new();
    let mut line_start = 0;

    for (i, word) in words.iter().enumerate() {
        let len = i + 1 - line_start;
        let ends_clause = word.word.ends_with(LINE_BREAK_PUNCTUATION);
        if (len >= min_words && ends_clause) || len >= max_words {
            lines.push(line_start..i + 1);
            line_start = i + 1;
        }
    }
    if line_start < words.len() {
        lines.push(line_start..words.len());
    }
    lines
}

/// Produce one highlight clip per spoken word.
///
/// Clips are contiguous and cover `[0, D]` where `D` is the larger of
/// `duration` and the last word's end. Each clip runs from its word's start
/// (clamped to be non-decreasing) to the next word's start.
pub fn compose_clips(
    timings: &[WordTiming],
    duration: f64,
    min_words_per_line: usize,
    max_words_per_line: usize,
) -> Vec<SubtitleClip> {
    let words = merge_punctuation(timings);
    if words.is_empty() {
        return Vec::new();
    }

    let mut starts = Vec::with_capacity(words.len());
    let mut floor = 0.0f64;
    for word in &words {
        floor = floor.max(word.start);
        starts.push(floor);
    }
    starts[0] = 0.0;

    let total = words
        .iter()
        .fold(duration.max(0.0), |acc, w| acc.max(w.end))
        .max(floor);

    let mut clips = Vec::with_capacity(words.len());
    for line in group_lines(&words, min_words_per_line, max_words_per_line) {
        let line_words: Vec<String> = words[line.clone()].iter().map(|w| w.word.clone()).collect();
        for (offset, index) in line.enumerate() {
            let end = starts.get(index + 1).copied().unwrap_or(total);
            clips.push(SubtitleClip {
                words: line_words.clone(),
                highlighted: offset,
                start: starts[index],
                end,
            });
        }
    }
    clips
}
