//! Init command - interactive first-run setup.

use crate::cli::preflight::check_tool;
use crate::cli::Output;
use crate::config::Settings;
use crate::media::list_backgrounds;
use crate::{openai, speech};
use console::style;
use std::io::{self, Write};
use std::path::Path;

/// Run the init command for first-time setup.
pub fn run_init(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("storyreel setup");
    println!();

    println!("{}", style("Step 1: Checking prerequisites").bold().cyan());
    println!();
    let missing: Vec<&str> = ["ffmpeg", "ffprobe"]
        .into_iter()
        .filter(|tool| check_tool(tool).is_err())
        .collect();
    if missing.is_empty() {
        Output::success("ffmpeg and ffprobe are installed!");
    } else {
        for tool in &missing {
            println!("  {} {} - not found", style("✗").red(), style(tool).bold());
        }
        println!("    {} {}", style("→").dim(), style(install_hint()).dim());
        println!();
        if !prompt_continue("Continue anyway?")? {
            Output::info("Setup cancelled. Install the missing tools and run 'storyreel init' again.");
            return Ok(());
        }
    }
    println!();

    println!("{}", style("Step 2: Checking API configuration").bold().cyan());
    println!();
    if speech::is_api_key_configured() {
        Output::success("ElevenLabs API key is configured!");
    } else {
        Output::warning("ELEVENLABS_API_KEY is not set; narration will fail without it.");
        println!("  {}", style("export ELEVENLABS_API_KEY='...'").green());
    }
    if openai::is_api_key_configured() {
        Output::success("OpenAI API key is configured!");
    } else {
        Output::info("OPENAI_API_KEY is not set; only needed for --auto story generation.");
    }
    println!();

    println!("{}", style("Step 3: Setting up directories").bold().cyan());
    println!();
    for (label, dir) in [
        ("Output", settings.output_dir()),
        ("Videos", settings.videos_dir()),
        ("Temp", settings.temp_dir()),
    ] {
        if dir.exists() {
            Output::info(&format!("{} directory exists: {}", label, dir.display()));
        } else {
            std::fs::create_dir_all(&dir)?;
            Output::success(&format!("Created {} directory: {}", label.to_lowercase(), dir.display()));
        }
    }
    let clips = list_backgrounds(&settings.videos_dir()).map(|c| c.len()).unwrap_or(0);
    if clips == 0 {
        Output::warning(&format!(
            "No background clips yet. Copy some videos into {}",
            settings.videos_dir().display()
        ));
    }
    println!();

    println!("{}", style("Step 4: Configuration file").bold().cyan());
    println!();
    if config_path.exists() {
        Output::info(&format!("Config file exists: {}", config_path.display()));
    } else {
        settings.save_to(&config_path.to_path_buf())?;
        Output::success(&format!("Created config file: {}", config_path.display()));
    }
    println!();

    println!("{}", style("Setup Complete!").bold().green());
    println!();
    println!("Next steps:");
    println!("  {} Check system status", style("storyreel doctor").cyan());
    println!("  {} Narrate your own story", style("storyreel create --story \"...\"").cyan());
    println!("  {} Let the model write one", style("storyreel create --auto").cyan());

    Ok(())
}

/// Platform-specific install hint for ffmpeg.
fn install_hint() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}

/// Prompt user for yes/no confirmation.
fn prompt_continue(message: &str) -> io::Result<bool> {
    print!("{} {} ", style("?").cyan(), message);
    print!("{} ", style("[y/N]").dim());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let answer = input.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}
