// Command-line surface: clap arguments, directory expansion and turning
// the parsed flags into upload requests plus the explicit config layer.

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::config::{default_config_path, ExplicitConfig};
use crate::enumerate::{FileEnumerator, DEFAULT_MEDIA_EXTENSIONS};
use crate::report::ReportFormat;
use crate::upload::{ResourceTypeHint, UploadRequest};

/// Upload files to Cloudinary and record their URLs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Files or directories to upload. Directories are walked recursively
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    /// JSON config file [default: ~/.config/cloudinary-uploader/config.json]
    #[arg(short = 'c', long, env = "CLOUDINARY_UPLOADER_CONFIG")]
    pub config: Option<PathBuf>,
    /// Cloudinary cloud name
    #[arg(long)]
    pub cloud_name: Option<String>,
    /// Cloudinary API key
    #[arg(long)]
    pub api_key: Option<String>,
    /// Cloudinary API secret
    #[arg(long)]
    pub api_secret: Option<String>,
    /// Destination folder in Cloudinary, overrides the configured default
    #[arg(short = 'f', long)]
    pub folder: Option<String>,
    /// Save the report to this file instead of printing a summary
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
    /// Report layout used with --output
    #[arg(long, value_enum, default_value_t)]
    pub format: ReportFormat,
    /// Resource type sent with every upload
    #[arg(short = 't', long, value_enum, default_value_t)]
    pub resource_type: ResourceTypeHint,
    /// Extensions kept when walking directories (comma separated or repeated)
    #[arg(short = 'e', long = "ext", value_delimiter = ',', conflicts_with = "all_files")]
    pub extensions: Vec<String>,
    /// Upload every file found in directories, whatever its extension
    #[arg(long)]
    pub all_files: bool,
    /// Number of uploads running at the same time
    #[arg(short = 'j', long)]
    pub concurrent_uploads: Option<usize>,
    /// Largest accepted file, in bytes
    #[arg(long)]
    pub max_file_size: Option<u64>,
    /// Per-request timeout, in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
    /// Replace existing assets with the same public id
    #[arg(long)]
    pub overwrite: bool,
    /// Use the file name without extension as the public id
    #[arg(long)]
    pub use_filename: bool,
    /// Show a progress bar: auto, on or off
    #[arg(short = 'P', long, default_value_t)]
    pub progress: DetectOption,
    /// Prompt for credentials that couldn't be found anywhere else
    #[arg(short = 'i', long)]
    pub interactive: bool,
    /// More logging (-v info, -vv debug)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,
    #[arg(long, hide = true)]
    pub api_base: Option<String>,
}

impl Args {
    pub fn explicit_config(&self) -> ExplicitConfig {
        ExplicitConfig {
            cloud_name: self.cloud_name.clone(),
            api_key: self.api_key.clone(),
            api_secret: self.api_secret.clone(),
            default_folder: None,
            max_file_size: self.max_file_size,
            concurrent_uploads: self.concurrent_uploads,
            allowed_types: None,
            timeout: self.timeout.map(Duration::from_secs),
            api_base_url: self.api_base.clone(),
        }
    }

    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(default_config_path)
    }

    /// Expand directories and build one request per file, in argument order.
    pub fn requests(&self) -> Vec<UploadRequest> {
        self.files()
            .into_iter()
            .map(|path| {
                let public_id = if self.use_filename {
                    path.file_stem().map(|s| s.to_string_lossy().into_owned())
                } else {
                    None
                };
                UploadRequest {
                    file_path: path,
                    target_folder: None,
                    resource_type: self.resource_type,
                    public_id,
                    overwrite: self.overwrite,
                }
            })
            .collect()
    }

    fn files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for path in &self.paths {
            if path.is_dir() {
                let found: Vec<PathBuf> = self.enumerator(path).files().collect();
                tracing::info!(dir = %path.display(), files = found.len(), "expanded directory");
                files.extend(found);
            } else {
                files.push(path.clone());
            }
        }
        files
    }

    fn enumerator(&self, dir: &Path) -> FileEnumerator {
        let enumerator = FileEnumerator::new(dir);
        if self.all_files {
            enumerator
        } else if self.extensions.is_empty() {
            enumerator.with_extensions(DEFAULT_MEDIA_EXTENSIONS)
        } else {
            enumerator.with_extensions(&self.extensions)
        }
    }

    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub enum DetectOption {
    #[default]
    Auto,
    On,
    Off,
}

impl DetectOption {
    pub fn enabled(self, is_terminal: bool) -> bool {
        match self {
            DetectOption::Auto => is_terminal,
            DetectOption::On => true,
            DetectOption::Off => false,
        }
    }
}

impl FromStr for DetectOption {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "false" | "off" | "no" | "n" | "0" => Ok(Self::Off),
            "true" | "on" | "yes" | "y" | "1" => Ok(Self::On),
            _ => Err("Invalid option variant"),
        }
    }
}

impl Display for DetectOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectOption::Auto => f.write_str("auto"),
            DetectOption::On => f.write_str("on"),
            DetectOption::Off => f.write_str("off"),
        }
    }
}
