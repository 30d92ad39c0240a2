//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use crate::media::list_backgrounds;
use console::style;
use std::path::Path;
use std::process::Command;

/// Outcome of one diagnostic, carrying the remedy when it did not pass.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    Pass,
    Warn(String),
    Fail(String),
}

/// A labelled diagnostic line.
#[derive(Debug)]
pub struct Check {
    pub label: String,
    pub detail: String,
    pub outcome: Outcome,
}

impl Check {
    fn pass(label: &str, detail: impl Into<String>) -> Self {
        Self { label: label.into(), detail: detail.into(), outcome: Outcome::Pass }
    }

    fn warn(label: &str, detail: impl Into<String>, fix: &str) -> Self {
        Self { label: label.into(), detail: detail.into(), outcome: Outcome::Warn(fix.into()) }
    }

    fn fail(label: &str, detail: impl Into<String>, fix: &str) -> Self {
        Self { label: label.into(), detail: detail.into(), outcome: Outcome::Fail(fix.into()) }
    }

    fn is_fail(&self) -> bool {
        matches!(self.outcome, Outcome::Fail(_))
    }

    fn is_warn(&self) -> bool {
        matches!(self.outcome, Outcome::Warn(_))
    }

    fn print(&self) {
        let (icon, fix) = match &self.outcome {
            Outcome::Pass => (style("✓").green(), None),
            Outcome::Warn(fix) => (style("!").yellow(), Some(fix)),
            Outcome::Fail(fix) => (style("✗").red(), Some(fix)),
        };
        println!("  {} {} - {}", icon, style(&self.label).bold(), self.detail);
        if let Some(fix) = fix {
            println!("    {} {}", style("→").dim(), style(fix).dim());
        }
    }
}

fn print_section(title: &str, checks: &[Check]) {
    println!("{}", style(title).bold());
    for check in checks {
        check.print();
    }
    println!();
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("storyreel doctor");
    println!();
    println!("Looking for tools, keys, clips and config...\n");

    let tools = vec![
        check_tool("ffmpeg", install_hint_ffmpeg()),
        check_tool("ffprobe", install_hint_ffmpeg()),
    ];
    print_section("External Tools", &tools);

    let keys = vec![
        check_api_key(
            "ELEVENLABS_API_KEY",
            true,
            "Required for narration. Set with: export ELEVENLABS_API_KEY='...'",
        ),
        check_api_key(
            "OPENAI_API_KEY",
            false,
            "Needed only for --auto. Set with: export OPENAI_API_KEY='sk-...'",
        ),
    ];
    print_section("API Configuration", &keys);

    let dirs = check_directories(settings);
    print_section("Directories", &dirs);

    let mut config = vec![check_config_file(config_path)];
    if let Err(e) = settings.validate() {
        config.push(Check::fail("Settings", e.to_string(), "Fix the value in the config file"));
    } else {
        config.push(Check::pass("Settings", "valid"));
    }
    print_section("Configuration", &config);

    let all = || tools.iter().chain(&keys).chain(&dirs).chain(&config);
    let errors = all().filter(|c| c.is_fail()).count();
    let warnings = all().filter(|c| c.is_warn()).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before creating videos.",
            errors
        ));
        anyhow::bail!("doctor found {} error(s)", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! storyreel is ready to use.");
    }

    Ok(())
}

/// Run `<tool> -version` and report the first line of its banner.
fn check_tool(name: &str, hint: &str) -> Check {
    let output = match Command::new(name).arg("-version").output() {
        Ok(output) => output,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Check::fail(name, "not on PATH", hint)
        }
        Err(e) => return Check::fail(name, format!("could not run: {}", e), hint),
    };
    if !output.status.success() {
        return Check::fail(name, format!("exited with {}", output.status), hint);
    }
    let banner = String::from_utf8_lossy(&output.stdout);
    let first: String = banner.lines().next().unwrap_or_default().chars().take(50).collect();
    Check::pass(name, first.trim().to_string())
}

/// Mask a secret, keeping a short prefix and suffix.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Check an API key environment variable.
fn check_api_key(var: &str, required: bool, hint: &str) -> Check {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => {
            Check::pass(var, format!("configured ({})", mask_key(key.trim())))
        }
        _ if required => Check::fail(var, "not set", hint),
        _ => Check::warn(var, "not set", hint),
    }
}

fn check_dir(name: &str, path: &Path, hint: &str) -> Check {
    if path.is_dir() {
        Check::pass(name, path.display().to_string())
    } else {
        Check::warn(name, format!("{} (missing)", path.display()), hint)
    }
}

/// Check configured directories and the background clip count.
fn check_directories(settings: &Settings) -> Vec<Check> {
    let videos = settings.videos_dir();
    let clips = match list_backgrounds(&videos) {
        Ok(clips) if !clips.is_empty() => {
            Check::pass("Background clips", format!("{} found", clips.len()))
        }
        Ok(_) => Check::fail(
            "Background clips",
            format!("none in {}", videos.display()),
            "Add .mp4, .mov, .avi, .mkv or .webm files, or pass --video",
        ),
        Err(_) => Check::fail(
            "Background clips",
            format!("{} does not exist", videos.display()),
            "Create it with: storyreel init",
        ),
    };

    vec![
        check_dir("Output directory", &settings.output_dir(), "Created on first run"),
        check_dir("Videos directory", &videos, "Create it with: storyreel init"),
        check_dir("Temp directory", &settings.temp_dir(), "Created on first run"),
        clips,
    ]
}

/// Check if config file exists.
fn check_config_file(config_path: &Path) -> Check {
    if config_path.exists() {
        Check::pass("Config file", config_path.display().to_string())
    } else {
        Check::warn(
            "Config file",
            "using defaults",
            "Create with: storyreel init (or storyreel config edit)",
        )
    }
}

fn install_hint_ffmpeg() -> &'static str {
    match std::env::consts::OS {
        "macos" => "brew install ffmpeg",
        "linux" => "Use your package manager, e.g. apt install ffmpeg",
        _ => "Download a build from https://ffmpeg.org/download.html",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcomes_carry_fix() {
        assert_eq!(Check::pass("ffmpeg", "6.1").outcome, Outcome::Pass);

        let failed = Check::fail("ffmpeg", "not on PATH", "install it");
        assert!(failed.is_fail());
        assert_eq!(failed.outcome, Outcome::Fail("install it".into()));
        assert!(Check::warn("cfg", "defaults", "run init").is_warn());
    }

    #[test]
    fn test_missing_tool_fails() {
        let check = check_tool("storyreel-no-such-tool", "hint");
        assert!(check.is_fail());
        assert_eq!(check.detail, "not on PATH");
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("short"), "***");
        assert_eq!(mask_key("sk-abcdefghijklmnop"), "sk-a...mnop");
    }

    #[test]
    fn test_background_clip_count() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"x").unwrap();
        let mut settings = Settings::default();
        settings.general.videos_dir = dir.path().to_string_lossy().into_owned();

        let checks = check_directories(&settings);
        let clips = checks.iter().find(|c| c.label == "Background clips").unwrap();
        assert_eq!(clips.outcome, Outcome::Pass);
        assert_eq!(clips.detail, "1 found");
    }
}
