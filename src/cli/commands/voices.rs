//! Voices command - show the theme to voice table.

use crate::cli::Output;
use crate::config::Settings;
use crate::theme::Theme;
use crate::voice::{select_voice, VOICES};
use console::style;

/// Run the voices command.
pub fn run_voices(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Theme voices");
    for theme in Theme::ALL {
        let selection = select_voice(theme, None, &settings.speech.voices)?;
        let remapped = if settings.speech.voices.contains_key(&theme) {
            format!(" {}", style("(config)").dim())
        } else {
            String::new()
        };
        Output::kv(
            theme.as_str(),
            &format!("{} ({}){}", selection.name, selection.id, remapped),
        );
    }

    Output::header("Built-in voices");
    for voice in VOICES {
        Output::list_item(&format!("{} {}", voice.name, style(voice.id).dim()));
    }

    Ok(())
}
