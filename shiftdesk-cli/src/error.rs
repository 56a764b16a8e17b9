//! Error types for the CLI.

use crate::config::ConfigError;
use shiftdesk_core::ShiftdeskError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Shiftdesk(#[from] ShiftdeskError),
    #[error("Environment variable {var} is not set")]
    MissingApiKey { var: String },
    #[error("Usage: shiftdesk [--config <path>] [--plan <text>] [--ui-context <text>] <instruction>")]
    MissingInstruction,
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
    #[error("Tool calling gave up after {attempts} attempts")]
    Exhausted { attempts: u32 },
    #[error("Cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}
