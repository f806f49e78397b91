// UI layer: everything that talks to the terminal. Progress bar and inline
// error lines go to stderr, the console summary goes to stdout, and missing
// credentials can be asked for interactively with `dialoguer`.

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use crossterm::style::Stylize;
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::config::{Credential, ExplicitConfig};
use crate::report::format_size;
use crate::upload::{Progress, UploadOutcome};

/// Progress bar advanced once per finished file, success or not.
pub struct ProgressReporter {
    bar: ProgressBar,
    visible: bool,
}

impl ProgressReporter {
    pub fn new(total: usize, visible: bool) -> Self {
        let target = if visible {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        let bar = ProgressBar::with_draw_target(Some(total as u64), target);
        // The template is a constant, fall back to the default style if it
        // ever stops parsing.
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner} {msg} [{elapsed_precise}] [{wide_bar}] {pos}/{len}",
        ) {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message("Uploading files");
        if visible {
            bar.enable_steady_tick(Duration::from_millis(100));
        }
        Self { bar, visible }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// The line printed as soon as a file fails, `None` for a success.
pub fn diagnostic(path: &Path, outcome: &UploadOutcome) -> Option<String> {
    if outcome.is_success() {
        return None;
    }
    let message = outcome.error_message.as_deref().unwrap_or("unknown error");
    Some(format!("Error uploading {}: {}", path.display(), message))
}

impl Progress for ProgressReporter {
    fn advance(&self, path: &Path, outcome: &UploadOutcome) {
        if let Some(line) = diagnostic(path, outcome) {
            if self.visible {
                self.bar.println(line);
            } else {
                eprintln!("{line}");
            }
        }
        self.bar.inc(1);
    }
}

/// Print every outcome in order. Failed entries show their error instead of
/// the URL.
pub fn print_summary<W: Write>(
    out: &mut W,
    outcomes: &[UploadOutcome],
    colored: bool,
) -> io::Result<()> {
    writeln!(out, "\nUpload Results:")?;
    for outcome in outcomes {
        let name = if colored {
            outcome.file_name.clone().bold().to_string()
        } else {
            outcome.file_name.clone()
        };
        writeln!(out, "\n{name}:")?;
        match (&outcome.url, &outcome.error_message) {
            (Some(url), _) => {
                writeln!(out, "URL: {url}")?;
                writeln!(
                    out,
                    "Type: {}",
                    outcome.resource_type.as_deref().unwrap_or("unknown")
                )?;
                writeln!(out, "Size: {}", format_size(outcome.size_bytes.unwrap_or(0)))?;
            }
            (None, message) => {
                let message = message.as_deref().unwrap_or("unknown error");
                if colored {
                    writeln!(out, "Error: {}", message.to_string().red())?;
                } else {
                    writeln!(out, "Error: {message}")?;
                }
            }
        }
    }
    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    writeln!(
        out,
        "\n{} uploaded, {} failed",
        outcomes.len() - failed,
        failed
    )?;
    Ok(())
}

/// Ask for each credential in `missing` and store the answers as explicit
/// values.
pub fn prompt_credentials(explicit: &mut ExplicitConfig, missing: &[Credential]) -> Result<()> {
    for &credential in missing {
        let value = match credential {
            Credential::CloudName => Input::<String>::new()
                .with_prompt("Cloudinary cloud name")
                .interact_text()?,
            Credential::ApiKey => Input::<String>::new()
                .with_prompt("Cloudinary API key")
                .interact_text()?,
            // `Password` hides input in terminal.
            Credential::ApiSecret => Password::new()
                .with_prompt("Cloudinary API secret")
                .interact()?,
        };
        explicit.set_credential(credential, value.trim().to_string());
    }
    Ok(())
}
