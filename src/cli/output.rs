//! CLI output formatting utilities.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Terminal printer shared by the commands. Status lines go to stdout,
/// problems to stderr.
pub struct Output;

impl Output {
    pub fn info(msg: &str) {
        println!("{} {}", style("•").cyan().bold(), msg);
    }

    pub fn success(msg: &str) {
        println!("{} {}", style("✓").green().bold(), msg);
    }

    pub fn warning(msg: &str) {
        eprintln!("{} {}", style("!").yellow().bold(), msg);
    }

    pub fn error(msg: &str) {
        eprintln!("{} {}", style("✗").red().bold(), msg);
    }

    /// Section title, preceded by a blank line.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Indented `key: value` row with a dimmed key.
    pub fn kv(key: &str, value: &str) {
        println!("  {:<16} {}", style(format!("{}:", key)).dim(), value);
    }

    pub fn list_item(msg: &str) {
        println!("  {} {}", style("-").cyan(), msg);
    }

    /// Print a story excerpt.
    pub fn story_preview(text: &str) {
        println!("  {}", style(content_preview(text, 240)).italic());
    }

    /// Ticking spinner for the long render step; finish it with
    /// `finish_and_clear`.
    pub fn spinner(msg: &str) -> ProgressBar {
        let bar = ProgressBar::new_spinner().with_message(msg.to_string());
        if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]") {
            bar.set_style(template);
        }
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    }
}

/// `42.0s` under a minute, `1m 15s` from there on.
pub fn format_duration(seconds: f64) -> String {
    let whole = seconds.round() as u32;
    match (whole / 60, whole % 60) {
        (0, _) => format!("{:.1}s", seconds),
        (m, s) => format!("{}m {}s", m, s),
    }
}

/// Truncate content with ellipsis on a character boundary.
fn content_preview(content: &str, max_chars: usize) -> String {
    let flat = content.replace('\n', " ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(2.0), "2.0s");
        assert_eq!(format_duration(75.4), "1m 15s");
    }

    #[test]
    fn test_content_preview_respects_char_boundaries() {
        assert_eq!(content_preview("héllo wörld", 4), "héll...");
        assert_eq!(content_preview("line\nbreak", 50), "line break");
    }
}
