//! CLI command implementations.

mod classify;
mod config;
mod create;
mod doctor;
mod init;
mod voices;

pub use classify::run_classify;
pub use config::run_config;
pub use create::run_create;
pub use doctor::run_doctor;
pub use init::run_init;
pub use voices::run_voices;
