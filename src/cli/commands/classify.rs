//! Classify command - show the detected theme of a story.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::ReelError;
use crate::theme::{self, Theme};
use crate::voice::select_voice;
use std::path::PathBuf;

/// Run the classify command.
pub fn run_classify(
    text: Option<&str>,
    input_file: Option<&PathBuf>,
    settings: &Settings,
) -> anyhow::Result<()> {
    let text = match (text, input_file) {
        (Some(t), _) => t.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
            ReelError::Input(format!("cannot read story file {}: {}", path.display(), e))
        })?,
        (None, None) => {
            return Err(ReelError::Input("provide story text or --input-file".into()).into())
        }
    };
    if text.trim().is_empty() {
        return Err(ReelError::Input("story text is empty".into()).into());
    }

    let scores = theme::score(&text);
    let detected = scores.winner();
    let voice = select_voice(detected, None, &settings.speech.voices)?;

    Output::header("Theme");
    Output::kv("Detected", detected.as_str());
    Output::kv("Voice", &format!("{} ({})", voice.name, voice.id));

    Output::header("Scores");
    for t in Theme::ALL.iter().filter(|t| **t != Theme::Neutral) {
        Output::kv(t.as_str(), &scores.get(*t).to_string());
    }

    Ok(())
}
