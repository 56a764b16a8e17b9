//! Shiftdesk CLI entry point.
//!
//! Prints one serialized client envelope per line on stdout.

use shiftdesk_cli::args::CliArgs;
use shiftdesk_cli::config::CliConfig;
use shiftdesk_cli::error::CliError;
use shiftdesk_cli::{logging, run};
use shiftdesk_llm::retry::GENERIC_FAILURE_MESSAGE;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    match run_main().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Exhausted { .. }) => {
            println!("{}", GENERIC_FAILURE_MESSAGE);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("shiftdesk: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_main() -> Result<(), CliError> {
    let raw_args: Vec<String> = std::env::args().skip(1).collect();
    let config = CliConfig::load(&raw_args)?;
    logging::init(&config.logging)?;
    let args = CliArgs::parse(&raw_args)?;

    let registry = run::registry_from_config(&config)?;
    let ctx = run::tool_context(&config, &args);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling");
            on_signal.cancel();
        }
    });

    let outputs = run::run(&config, &args, &registry, &ctx, &cancel).await?;
    for output in outputs {
        println!("{}", output.serialized);
    }
    Ok(())
}
