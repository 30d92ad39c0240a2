//! Word timing: provider alignment grouping and the estimation fallback.

use super::{CharacterAlignment, WordTiming};

/// Group character-level alignment into whitespace-delimited words.
///
/// Each word starts at its first character's start time and ends at its
/// last character's end time. Mismatched array lengths are truncated to the
/// shortest.
pub fn words_from_alignment(alignment: &CharacterAlignment) -> Vec<WordTiming> {
    let len = alignment
        .characters
        .len()
        .min(alignment.character_start_times_seconds.len())
        .min(alignment.character_end_times_seconds.len());

    let mut words = Vec::new();
    let mut current = String::new();
    let mut start = 0.0;
    let mut end = 0.0;

    for i in 0..len {
        let ch = &alignment.characters[i];
        if ch.chars().all(char::is_whitespace) {
            if !current.is_empty() {
                words.push(WordTiming::new(std::mem::take(&mut current), start, end));
            }
            continue;
        }
        if current.is_empty() {
            start = alignment.character_start_times_seconds[i];
        }
        current.push_str(ch);
        end = alignment.character_end_times_seconds[i].max(start);
    }
    if !current.is_empty() {
        words.push(WordTiming::new(current, start, end));
    }

    words
}

/// Estimate word timings by spreading `total_duration` over the text.
///
/// Each whitespace token gets a share proportional to its alphanumeric
/// character count (at least one). This is an approximation with no acoustic
/// basis; it only keeps subtitles roughly in step with the narration.
pub fn estimate_word_timings(text: &str, total_duration: f64) -> Vec<WordTiming> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() || total_duration <= 0.0 {
        return Vec::new();
    }

    let weights: Vec<f64> = tokens
        .iter()
        .map(|t| t.chars().filter(|c| c.is_alphanumeric()).count().max(1) as f64)
        .collect();
    let total_weight: f64 = weights.iter().sum();

    let mut timings = Vec::with_capacity(tokens.len());
    let mut elapsed = 0.0;
    for (i, (token, weight)) in tokens.iter().zip(&weights).enumerate() {
        let end = if i + 1 == tokens.len() {
            total_duration
        } else {
            elapsed + total_duration * weight / total_weight
        };
        timings.push(WordTiming::new(token.to_string(), elapsed, end));
        elapsed = end;
    }
    timings
}
