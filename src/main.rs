// Entrypoint for the CLI application.
// - Resolve the configuration once, then run the whole batch with it.
// - Individual upload failures never stop the batch; they only change the
//   exit code.

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::tty::IsTty;
use tracing_subscriber::EnvFilter;

use cloudinary_uploader::{
    api::CloudinaryClient,
    cli::Args,
    config::{self, EffectiveConfig},
    error::ConfigError,
    report, ui,
    upload::Executor,
};

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter())),
        )
        .with_writer(io::stderr)
        .init();

    let config = resolve_config(&args)?;
    tracing::debug!(?config, "resolved configuration");

    let requests = args.requests();
    if requests.is_empty() {
        println!("Found 0 files to upload");
        return Ok(ExitCode::SUCCESS);
    }
    println!("Found {} files to upload", requests.len());

    let client = CloudinaryClient::new(&config)?;
    let progress = ui::ProgressReporter::new(
        requests.len(),
        args.progress.enabled(io::stderr().is_tty()),
    );
    let outcomes = Executor::new(&client, &config)
        .with_progress(&progress)
        .run(requests, args.folder.as_deref());
    progress.finish();

    match &args.output {
        Some(path) => {
            report::write_report(path, args.format, &outcomes)?;
            println!("URLs saved to: {}", path.display());
        }
        None => {
            let colored = io::stdout().is_tty();
            ui::print_summary(&mut io::stdout().lock(), &outcomes, colored)
                .context("Failed to print summary")?;
        }
    }

    if outcomes.iter().all(|o| o.is_success()) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn resolve_config(args: &Args) -> Result<EffectiveConfig> {
    let mut explicit = args.explicit_config();
    let path = args.config_path();
    match config::resolve(&explicit, path.as_deref()) {
        Err(ConfigError::MissingCredentials { missing })
            if args.interactive && io::stdin().is_tty() =>
        {
            ui::prompt_credentials(&mut explicit, &missing)?;
            Ok(config::resolve(&explicit, path.as_deref())?)
        }
        other => Ok(other?),
    }
}
