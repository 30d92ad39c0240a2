//! Theme → narrator voice mapping.

use crate::error::{ReelError, Result};
use crate::theme::Theme;
use serde::Serialize;
use std::collections::BTreeMap;

/// A built-in ElevenLabs voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Voice {
    pub name: &'static str,
    pub id: &'static str,
}

const RACHEL: Voice = Voice { name: "Rachel", id: "21m00Tcm4TlvDq8ikWAM" };
const BELLA: Voice = Voice { name: "Bella", id: "EXAVITQu4vr4xnSDxMaL" };
const ELLI: Voice = Voice { name: "Elli", id: "MF3mGyEYCl7XYWbV9V6O" };
const ADAM: Voice = Voice { name: "Adam", id: "pNInz6obpgDQGcFmaJgB" };
const ANTONI: Voice = Voice { name: "Antoni", id: "ErXwobaYiN019PkySvjV" };
const JOSH: Voice = Voice { name: "Josh", id: "TxGEqnHWrfWFTfGW9XjX" };

/// All built-in voices.
pub const VOICES: [Voice; 6] = [RACHEL, BELLA, ELLI, ADAM, ANTONI, JOSH];

/// Built-in voice for a theme.
pub fn default_voice(theme: Theme) -> Voice {
    match theme {
        Theme::Emotional => RACHEL,
        Theme::Dramatic => BELLA,
        Theme::Comedic => ELLI,
        Theme::Neutral => ADAM,
        Theme::Mysterious => ANTONI,
        Theme::Energetic => JOSH,
    }
}

/// Look up a built-in voice by name, case-insensitively.
pub fn find_voice(name: &str) -> Option<Voice> {
    VOICES.iter().copied().find(|v| v.name.eq_ignore_ascii_case(name.trim()))
}

/// The voice chosen for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceSelection {
    /// Display name; the raw id when it matches no built-in voice.
    pub name: String,
    pub id: String,
    /// Whether the CLI override picked it.
    pub overridden: bool,
}

impl VoiceSelection {
    fn resolve(value: &str, overridden: bool) -> Self {
        let value = value.trim();
        match find_voice(value) {
            Some(voice) => Self {
                name: voice.name.to_string(),
                id: voice.id.to_string(),
                overridden,
            },
            None => Self {
                name: value.to_string(),
                id: value.to_string(),
                overridden,
            },
        }
    }
}

/// Choose the voice for `theme`.
///
/// Precedence: `override_voice`, then the configured remapping, then the
/// built-in table.
pub fn select_voice(
    theme: Theme,
    override_voice: Option<&str>,
    remapping: &BTreeMap<Theme, String>,
) -> Result<VoiceSelection> {
    if let Some(value) = override_voice {
        if value.trim().is_empty() {
            return Err(ReelError::Input("voice override is empty".into()));
        }
        return Ok(VoiceSelection::resolve(value, true));
    }

    if let Some(value) = remapping.get(&theme) {
        if value.trim().is_empty() {
            return Err(ReelError::Config(format!(
                "speech.voices.{} is empty",
                theme
            )));
        }
        return Ok(VoiceSelection::resolve(value, false));
    }

    let voice = default_voice(theme);
    Ok(VoiceSelection {
        name: voice.name.to_string(),
        id: voice.id.to_string(),
        overridden: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_theme_maps_to_a_voice() {
        for theme in Theme::ALL {
            let selection = select_voice(theme, None, &BTreeMap::new()).unwrap();
            assert!(!selection.id.is_empty());
            assert!(!selection.overridden);
        }
    }

    #[test]
    fn test_default_table() {
        let pick = |t| select_voice(t, None, &BTreeMap::new()).unwrap().name;
        assert_eq!(pick(Theme::Emotional), "Rachel");
        assert_eq!(pick(Theme::Dramatic), "Bella");
        assert_eq!(pick(Theme::Comedic), "Elli");
        assert_eq!(pick(Theme::Neutral), "Adam");
        assert_eq!(pick(Theme::Mysterious), "Antoni");
        assert_eq!(pick(Theme::Energetic), "Josh");
    }

    #[test]
    fn test_override_by_name_is_case_insensitive() {
        let selection = select_voice(Theme::Neutral, Some("josh"), &BTreeMap::new()).unwrap();
        assert_eq!(selection.name, "Josh");
        assert_eq!(selection.id, "TxGEqnHWrfWFTfGW9XjX");
        assert!(selection.overridden);
    }

    #[test]
    fn test_override_raw_id_used_verbatim() {
        let selection = select_voice(Theme::Neutral, Some("customVoice123"), &BTreeMap::new()).unwrap();
        assert_eq!(selection.id, "customVoice123");
        assert!(selection.overridden);
    }

    #[test]
    fn test_override_beats_remapping() {
        let mut remap = BTreeMap::new();
        remap.insert(Theme::Comedic, "Bella".to_string());
        let selection = select_voice(Theme::Comedic, Some("Adam"), &remap).unwrap();
        assert_eq!(selection.name, "Adam");
    }

    #[test]
    fn test_remapping_beats_table() {
        let mut remap = BTreeMap::new();
        remap.insert(Theme::Comedic, "Bella".to_string());
        let selection = select_voice(Theme::Comedic, None, &remap).unwrap();
        assert_eq!(selection.id, "EXAVITQu4vr4xnSDxMaL");
        assert!(!selection.overridden);
    }

    #[test]
    fn test_empty_override_is_input_error() {
        assert!(matches!(
            select_voice(Theme::Neutral, Some("  "), &BTreeMap::new()),
            Err(ReelError::Input(_))
        ));
    }

    #[test]
    fn test_empty_remapping_is_config_error() {
        let mut remap = BTreeMap::new();
        remap.insert(Theme::Neutral, String::new());
        assert!(matches!(
            select_voice(Theme::Neutral, None, &remap),
            Err(ReelError::Config(_))
        ));
    }
}
