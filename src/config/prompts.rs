//! Story prompt templates.
//!
//! A `story.toml` in `prompts.custom_dir` replaces the built-in pair.
//! Templates use `{{name}}` placeholders.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("valid placeholder regex"))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub story: StoryPrompts,
    /// `[prompts.variables]` from the settings file.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// System and user message for story generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryPrompts {
    pub system: String,
    pub user: String,
}

impl Default for StoryPrompts {
    fn default() -> Self {
        Self {
            system: "You are a creative storyteller who writes short narrations for vertical videos."
                .to_string(),

            user: r#"Write a dramatic, emotional story for a {{duration}}-second video narration.
Keep it concise ({{min_words}}-{{max_words}} words) and engaging.

Rules:
1. Plain prose only: no title, no headings, no stage directions
2. Do not use emoji, hashtags, or markdown
3. Open with a hook in the first sentence"#
                .to_string(),
        }
    }
}

impl Prompts {
    pub fn load(
        custom_dir: Option<&str>,
        variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Self {
            variables: variables.cloned().unwrap_or_default(),
            ..Self::default()
        };

        let Some(dir) = custom_dir else {
            return Ok(prompts);
        };
        let story_file = PathBuf::from(shellexpand::tilde(dir).as_ref()).join("story.toml");
        if story_file.is_file() {
            prompts.story = toml::from_str(&std::fs::read_to_string(&story_file)?)?;
        }
        Ok(prompts)
    }

    /// Substitute `{{name}}` placeholders in one pass. Unknown names stay as
    /// written.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        placeholder_regex()
            .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Like [`Prompts::render`], with the configured variables as a fallback
    /// for names missing from `vars`.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        merged.extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self::render(template, &merged)
    }
}
