//! Command-line arguments.

use crate::error::CliError;

/// Parsed command line. `--config` is consumed by config loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub instruction: String,
    pub plan: Option<String>,
    pub ui_context: Option<String>,
}

impl CliArgs {
    /// Parse arguments, excluding the program name.
    ///
    /// Every argument that is not a flag or a flag value is part of the
    /// instruction.
    pub fn parse(args: &[String]) -> Result<Self, CliError> {
        let mut plan = None;
        let mut ui_context = None;
        let mut words = Vec::new();

        let mut args = args.iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    args.next();
                }
                "--plan" => plan = args.next().cloned(),
                "--ui-context" => ui_context = args.next().cloned(),
                _ => words.push(arg.as_str()),
            }
        }

        let instruction = words.join(" ");
        if instruction.trim().is_empty() {
            return Err(CliError::MissingInstruction);
        }
        Ok(Self {
            instruction,
            plan,
            ui_context,
        })
    }
}
