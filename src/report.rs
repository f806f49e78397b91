// Batch reports: the grouped view (one section per resource type) and the
// plain view (one URL per line), rendered to a string and written to disk.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::ReportError;
use crate::upload::UploadOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    /// Markdown-like report grouped by resource type
    #[default]
    Grouped,
    /// One `name: url` line per uploaded file
    Plain,
}

/// Size in MiB with two decimals, e.g. `1.00MB`.
pub fn format_size(bytes: u64) -> String {
    format!("{:.2}MB", bytes as f64 / (1024.0 * 1024.0))
}

/// First letter upper case, the rest lower case.
pub fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Grouped report. Outcomes without a URL are left out; groups keep the
/// order in which their resource type first shows up.
pub fn render_grouped(outcomes: &[UploadOutcome]) -> String {
    let mut groups: Vec<(String, Vec<&UploadOutcome>)> = Vec::new();
    for outcome in outcomes.iter().filter(|o| o.url.is_some()) {
        let key = title_case(outcome.resource_type.as_deref().unwrap_or("file"));
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(outcome),
            None => groups.push((key, vec![outcome])),
        }
    }

    let mut out = String::from("# Cloudinary Upload Results\n\n");
    for (resource_type, members) in groups {
        let _ = write!(out, "\n## {resource_type} Files\n");
        for outcome in members {
            let _ = write!(
                out,
                "\n{} ({}):\n{}\n",
                outcome.file_name,
                format_size(outcome.size_bytes.unwrap_or(0)),
                outcome.url.as_deref().unwrap_or_default()
            );
        }
    }
    out
}

/// Plain report: `name: url` for every outcome that has a URL.
pub fn render_plain(outcomes: &[UploadOutcome]) -> String {
    outcomes
        .iter()
        .filter_map(|o| o.url.as_deref().map(|url| format!("{}: {}\n", o.file_name, url)))
        .collect()
}

pub fn render(format: ReportFormat, outcomes: &[UploadOutcome]) -> String {
    match format {
        ReportFormat::Grouped => render_grouped(outcomes),
        ReportFormat::Plain => render_plain(outcomes),
    }
}

pub fn write_report(
    path: &Path,
    format: ReportFormat,
    outcomes: &[UploadOutcome],
) -> Result<(), ReportError> {
    fs::write(path, render(format, outcomes)).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), ?format, "report written");
    Ok(())
}
