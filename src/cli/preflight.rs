//! Cheap checks run before a command spends money on provider calls.

use crate::error::{ReelError, Result};
use std::process::{Command, Stdio};

#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Creating a video from supplied text needs the encoder and speech key.
    Create,
    /// Creating from a generated story also needs the language model key.
    Generate,
}

/// Fail fast on the first missing key or tool that `operation` needs.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Create => {
            check_api_key("ELEVENLABS_API_KEY", "...")?;
            ["ffmpeg", "ffprobe"].into_iter().try_for_each(check_tool)?;
        }
        Operation::Generate => {
            check_api_key("OPENAI_API_KEY", "sk-...")?;
            check(Operation::Create)?;
        }
    }
    Ok(())
}

/// Check that an API key environment variable is set and non-empty.
fn check_api_key(var: &str, example: &str) -> Result<()> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(()),
        Ok(_) => Err(ReelError::Config(format!(
            "{var} is empty. Set it with: export {var}='{example}'"
        ))),
        Err(_) => Err(ReelError::Config(format!(
            "{var} not set. Set it with: export {var}='{example}'"
        ))),
    }
}

/// `<name> -version` must start and exit cleanly.
pub fn check_tool(name: &str) -> Result<()> {
    let status = Command::new(name)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ReelError::ToolNotFound(name.to_string()),
            _ => ReelError::ToolNotFound(format!("{}: {}", name, e)),
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(ReelError::ToolNotFound(format!("{} -version exited with {}", name, status)))
    }
}
