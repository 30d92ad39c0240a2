//! Create command - story to finished video.

use crate::cli::output::format_duration;
use crate::cli::preflight::{self, Operation};
use crate::cli::{CreateArgs, Output};
use crate::config::{CliOverrides, Settings};
use crate::error::ReelError;
use crate::orchestrator::{CreateRequest, Orchestrator};
use crate::story::{read_story_lines, StoryMode, StoryRequest, StorySource};
use console::style;
use std::io::{self, BufRead, IsTerminal, Read, Write};
use tracing::warn;

/// Run the create command.
pub async fn run_create(args: &CreateArgs, mut settings: Settings) -> anyhow::Result<()> {
    settings.apply_overrides(&CliOverrides {
        width: args.width,
        height: args.height,
        fps: args.fps,
        prompt: args.prompt.clone(),
    });
    settings.validate()?;

    let story = story_request(args)?;
    let operation = match story.mode {
        StoryMode::Auto => Operation::Generate,
        StoryMode::Manual => Operation::Create,
    };
    preflight::check(operation)?;

    let request = CreateRequest {
        story,
        video: args.video.clone(),
        voice: args.voice.clone(),
        output: args.output.clone(),
    };

    let orchestrator = Orchestrator::new(settings)?;
    let spinner = Output::spinner("Creating video...");

    let result = tokio::select! {
        result = orchestrator.run(&request) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, discarding partial work");
            Err(ReelError::Interrupted)
        }
    };
    spinner.finish_and_clear();
    let output = result?;

    Output::header("Video ready");
    Output::kv("File", &output.output_path.display().to_string());
    Output::kv("Theme", output.story.theme().as_str());
    Output::kv("Voice", &format!("{} ({})", output.voice.name, output.voice.id));
    Output::kv("Background", &output.background.display().to_string());
    Output::kv("Duration", &format_duration(output.duration));
    Output::kv("Subtitle clips", &output.clip_count.to_string());
    if output.story.source() == StorySource::Generated {
        Output::story_preview(output.story.text());
    }
    if output.timing_source == crate::speech::TimingSource::Estimated {
        Output::warning("Word timing was estimated; subtitles may drift from the narration.");
    }
    println!();
    Output::success(&format!("Saved to {}", output.output_path.display()));

    Ok(())
}

/// Work out where the story comes from, prompting when nothing was given.
fn story_request(args: &CreateArgs) -> anyhow::Result<StoryRequest> {
    if args.auto {
        return Ok(StoryRequest {
            mode: StoryMode::Auto,
            prompt: args.prompt.clone(),
            ..Default::default()
        });
    }
    if args.story.is_some() || args.input_file.is_some() {
        return Ok(StoryRequest {
            mode: StoryMode::Manual,
            text: args.story.clone(),
            input_file: args.input_file.clone(),
            prompt: None,
        });
    }

    let stdin = io::stdin();
    if !stdin.is_terminal() {
        let mut text = String::new();
        stdin.lock().read_to_string(&mut text)?;
        return Ok(StoryRequest::manual(text));
    }

    Output::header("Story source");
    Output::list_item("[1] Write the story yourself");
    Output::list_item("[2] Generate it automatically");
    print!("{} ", style("Choose 1 or 2:").cyan());
    io::stdout().flush()?;

    let mut choice = String::new();
    stdin.lock().read_line(&mut choice)?;
    match choice.trim() {
        "2" => Ok(StoryRequest {
            mode: StoryMode::Auto,
            prompt: args.prompt.clone(),
            ..Default::default()
        }),
        "1" => {
            println!(
                "{}",
                style("Enter your story. Finish with two empty lines:").dim()
            );
            let text = read_story_lines(stdin.lock())?;
            Ok(StoryRequest::manual(text))
        }
        other => Err(ReelError::Input(format!("'{}' is not a valid choice", other)).into()),
    }
}
