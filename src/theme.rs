//! Story tone classification.
//!
//! A deterministic keyword and lexicon heuristic that maps story text to one
//! of a closed set of tone labels. The label only drives voice selection.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Coarse tone of a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Emotional,
    Dramatic,
    Comedic,
    Mysterious,
    Energetic,
    Neutral,
}

impl Theme {
    /// Every label, in tie-break priority order (neutral last).
    pub const ALL: [Theme; 6] = [
        Theme::Emotional,
        Theme::Dramatic,
        Theme::Comedic,
        Theme::Mysterious,
        Theme::Energetic,
        Theme::Neutral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Emotional => "emotional",
            Theme::Dramatic => "dramatic",
            Theme::Comedic => "comedic",
            Theme::Mysterious => "mysterious",
            Theme::Energetic => "energetic",
            Theme::Neutral => "neutral",
        }
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Theme::Emotional => &[
                "love", "heart", "tears", "cry", "emotion", "feel", "loss", "grief", "sad", "sorrow",
            ],
            Theme::Dramatic => &[
                "death", "betrayal", "revenge", "fight", "battle", "war", "conflict", "tension",
                "dramatic",
            ],
            Theme::Comedic => &[
                "funny", "laugh", "joke", "humor", "silly", "ridiculous", "comedy", "amusing",
                "hilarious",
            ],
            Theme::Mysterious => &[
                "mystery", "secret", "unknown", "shadow", "dark", "hidden", "reveal", "discover",
            ],
            Theme::Energetic => &[
                "run", "jump", "race", "fast", "quick", "speed", "action", "energy", "exciting",
            ],
            Theme::Neutral => &[],
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("Unknown theme: {}", s))
    }
}

const POSITIVE_WORDS: &[&str] = &[
    "happy", "joy", "love", "great", "wonderful", "amazing", "good", "best", "beautiful", "fun",
    "funny", "hilarious", "smile", "laugh", "delight", "excited", "awesome", "perfect", "lucky",
    "glad",
];

const NEGATIVE_WORDS: &[&str] = &[
    "sad", "terrible", "awful", "hate", "lonely", "cry", "pain", "broken", "lost", "alone",
    "miserable", "dead", "die", "died", "fear", "afraid", "horrible", "bad", "worst", "hurt",
];

const OPINION_MARKERS: &[&str] = &[
    "i", "me", "my", "feel", "felt", "think", "believe", "wish", "hope",
];

const POLARITY_THRESHOLD: f64 = 0.3;
const SUBJECTIVITY_THRESHOLD: f64 = 0.25;

/// Rough sentiment measures over a token stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sentiment {
    /// In [-1, 1]; zero when no sentiment words occur.
    pub polarity: f64,
    /// In [0, 1]; share of tokens carrying sentiment or opinion.
    pub subjectivity: f64,
}

/// Per-theme scores before the winner is picked.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeScores {
    scores: [u32; 5],
}

impl ThemeScores {
    pub fn get(&self, theme: Theme) -> u32 {
        match theme {
            Theme::Neutral => 0,
            other => self.scores[other as usize],
        }
    }

    fn add(&mut self, theme: Theme, points: u32) {
        if theme != Theme::Neutral {
            self.scores[theme as usize] += points;
        }
    }

    /// Highest score wins; earlier labels in [`Theme::ALL`] win ties.
    pub fn winner(&self) -> Theme {
        let mut best = Theme::Neutral;
        let mut best_score = 0;
        for theme in Theme::ALL {
            let score = self.get(theme);
            if score > best_score {
                best = theme;
                best_score = score;
            }
        }
        best
    }
}

fn word_regex() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\w+").expect("valid word regex"))
}

fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    word_regex()
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Compute lexicon sentiment for a token list.
pub fn sentiment(tokens: &[String]) -> Sentiment {
    if tokens.is_empty() {
        return Sentiment { polarity: 0.0, subjectivity: 0.0 };
    }

    let mut positive = 0usize;
    let mut negative = 0usize;
    let mut opinion = 0usize;
    for token in tokens {
        let t = token.as_str();
        if POSITIVE_WORDS.contains(&t) {
            positive += 1;
        } else if NEGATIVE_WORDS.contains(&t) {
            negative += 1;
        } else if OPINION_MARKERS.contains(&t) {
            opinion += 1;
        }
    }

    let polar = positive + negative;
    let polarity = if polar == 0 {
        0.0
    } else {
        (positive as f64 - negative as f64) / polar as f64
    };
    let subjectivity = ((polar + opinion) as f64 / tokens.len() as f64).min(1.0);

    Sentiment { polarity, subjectivity }
}

/// Score every theme for the given text.
pub fn score(text: &str) -> ThemeScores {
    let tokens = tokenize(text);
    let present: HashSet<&str> = tokens.iter().map(String::as_str).collect();

    let mut scores = ThemeScores { scores: [0; 5] };
    for theme in Theme::ALL {
        let hits = theme
            .keywords()
            .iter()
            .filter(|k| present.contains(*k))
            .count() as u32;
        scores.add(theme, hits);
    }

    let mood = sentiment(&tokens);
    if mood.polarity < -POLARITY_THRESHOLD {
        scores.add(Theme::Emotional, 2);
        scores.add(Theme::Dramatic, 1);
    } else if mood.polarity > POLARITY_THRESHOLD {
        scores.add(Theme::Comedic, 1);
        scores.add(Theme::Energetic, 1);
    }
    if mood.subjectivity > SUBJECTIVITY_THRESHOLD {
        scores.add(Theme::Emotional, 1);
    }

    scores
}

/// Classify story text into exactly one theme.
pub fn classify(text: &str) -> Theme {
    score(text).winner()
}
