//! storyreel CLI entry point.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use storyreel::cli::{commands, Cli, Commands, Output};
use storyreel::config::Settings;
use storyreel::error::{ErrorKind, ReelError};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(Settings::default_config_path);

    // Load configuration: file, then STORYREEL_* environment
    let settings = load_settings(cli.config.is_some(), &config_path);

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings
            .as_ref()
            .map(|s| s.general.log_level.clone())
            .unwrap_or_else(|_| "warn".to_string()),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("storyreel={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let result = match settings {
        Ok(settings) => run(&cli.command, settings, &config_path).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let kind = err
                .downcast_ref::<ReelError>()
                .map(ReelError::kind)
                .unwrap_or(ErrorKind::Internal);
            error!(kind = %kind, "{:#}", err);
            Output::error(&format!("{}: {:#}", kind, err));
            ExitCode::from(kind.exit_code())
        }
    }
}

fn load_settings(explicit: bool, config_path: &PathBuf) -> storyreel::Result<Settings> {
    let mut settings = if explicit {
        Settings::load_from(Some(config_path))?
    } else {
        Settings::load()?
    };
    settings.apply_env()?;
    Ok(settings)
}

async fn run(command: &Commands, settings: Settings, config_path: &Path) -> anyhow::Result<()> {
    match command {
        Commands::Init => {
            commands::run_init(&settings, config_path)?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings, config_path)?;
        }

        Commands::Create(args) => {
            commands::run_create(args, settings).await?;
        }

        Commands::Classify { text, input_file } => {
            commands::run_classify(text.as_deref(), input_file.as_ref(), &settings)?;
        }

        Commands::Voices => {
            commands::run_voices(&settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, config_path)?;
        }
    }

    Ok(())
}
