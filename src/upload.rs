// Upload executor: turns an ordered list of `UploadRequest` into the same
// number of `UploadOutcome`s, in the same order. A failing file is recorded
// and the batch moves on.
//
// With a concurrency limit above one, requests are handed to a fixed pool of
// scoped worker threads over a rendezvous channel. Each result comes back
// tagged with its request index and lands in a pre-sized slot, so the final
// order never depends on completion order.

use std::path::{Path, PathBuf};
use std::thread;

use serde::Deserialize;

use crate::config::EffectiveConfig;
use crate::error::{UploadError, UploadErrorKind};

/// Resource type sent to the remote service. `Auto` lets it decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ResourceTypeHint {
    #[default]
    Auto,
    Image,
    Video,
    Raw,
}

impl ResourceTypeHint {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceTypeHint::Auto => "auto",
            ResourceTypeHint::Image => "image",
            ResourceTypeHint::Video => "video",
            ResourceTypeHint::Raw => "raw",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_path: PathBuf,
    pub target_folder: Option<String>,
    pub resource_type: ResourceTypeHint,
    pub public_id: Option<String>,
    pub overwrite: bool,
}

impl UploadRequest {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            target_folder: None,
            resource_type: ResourceTypeHint::Auto,
            public_id: None,
            overwrite: false,
        }
    }

    pub fn file_name(&self) -> String {
        file_name(&self.file_path)
    }
}

/// Per-call parameters handed to an [`Uploader`].
#[derive(Debug, Clone, Copy)]
pub struct UploadParams<'a> {
    pub file: &'a Path,
    pub resource_type: ResourceTypeHint,
    pub folder: Option<&'a str>,
    pub public_id: Option<&'a str>,
    pub overwrite: bool,
}

/// Fields the remote service must return for a stored asset.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    pub secure_url: String,
    pub resource_type: String,
    #[serde(default)]
    pub format: Option<String>,
    pub bytes: u64,
}

/// The remote upload operation.
pub trait Uploader: Sync {
    fn upload(&self, params: &UploadParams<'_>) -> Result<UploadResponse, UploadError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Success,
    Failed,
}

/// Result of one request. Build through [`UploadOutcome::success`] or
/// [`UploadOutcome::failed`]; only the former ever carries a URL.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub file_name: String,
    pub status: UploadStatus,
    pub url: Option<String>,
    pub resource_type: Option<String>,
    pub format: Option<String>,
    pub size_bytes: Option<u64>,
    pub error_message: Option<String>,
    pub error_kind: Option<UploadErrorKind>,
}

impl UploadOutcome {
    pub fn success(file_name: String, response: UploadResponse) -> Self {
        Self {
            file_name,
            status: UploadStatus::Success,
            url: Some(response.secure_url),
            resource_type: Some(response.resource_type),
            format: response.format,
            size_bytes: Some(response.bytes),
            error_message: None,
            error_kind: None,
        }
    }

    pub fn failed(file_name: String, error: &UploadError) -> Self {
        Self {
            file_name,
            status: UploadStatus::Failed,
            url: None,
            resource_type: None,
            format: None,
            size_bytes: None,
            error_message: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == UploadStatus::Success
    }
}

/// Observer called once per finished request, on the calling thread.
pub trait Progress {
    fn advance(&self, path: &Path, outcome: &UploadOutcome);
}

impl Progress for () {
    fn advance(&self, _path: &Path, _outcome: &UploadOutcome) {}
}

pub struct Executor<'a, U: Uploader> {
    worker: Worker<'a, U>,
    progress: &'a dyn Progress,
}

impl<'a, U: Uploader> Executor<'a, U> {
    pub fn new(uploader: &'a U, config: &'a EffectiveConfig) -> Self {
        Self {
            worker: Worker { uploader, config },
            progress: &(),
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Upload every request and return one outcome per request, in input order.
    ///
    /// `folder` overrides both the request's own folder and the configured
    /// default folder.
    pub fn run(&self, requests: Vec<UploadRequest>, folder: Option<&str>) -> Vec<UploadOutcome> {
        let workers = self
            .worker
            .config
            .concurrency_limit
            .clamp(1, requests.len().max(1));
        tracing::info!(files = requests.len(), workers, "starting upload batch");
        if workers == 1 {
            self.run_sequential(requests, folder)
        } else {
            self.run_pooled(requests, folder, workers)
        }
    }

    fn run_sequential(
        &self,
        requests: Vec<UploadRequest>,
        folder: Option<&str>,
    ) -> Vec<UploadOutcome> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in &requests {
            let outcome = self.worker.process(request, folder);
            self.progress.advance(&request.file_path, &outcome);
            outcomes.push(outcome);
        }
        outcomes
    }

    fn run_pooled(
        &self,
        requests: Vec<UploadRequest>,
        folder: Option<&str>,
        workers: usize,
    ) -> Vec<UploadOutcome> {
        let paths: Vec<PathBuf> = requests.iter().map(|r| r.file_path.clone()).collect();
        let mut slots: Vec<Option<UploadOutcome>> = vec![None; requests.len()];

        let (jobs_tx, jobs_rx) = flume::bounded::<(usize, UploadRequest)>(0);
        let (results_tx, results_rx) = flume::unbounded::<(usize, UploadOutcome)>();
        let worker = &self.worker;

        thread::scope(|scope| {
            for _ in 0..workers {
                let jobs_rx = jobs_rx.clone();
                let results_tx = results_tx.clone();
                scope.spawn(move || {
                    while let Ok((index, request)) = jobs_rx.recv() {
                        let outcome = worker.process(&request, folder);
                        if results_tx.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(results_tx);

            scope.spawn(move || {
                for job in requests.into_iter().enumerate() {
                    if jobs_tx.send(job).is_err() {
                        break;
                    }
                }
            });

            for (index, outcome) in results_rx.iter() {
                self.progress.advance(&paths[index], &outcome);
                slots[index] = Some(outcome);
            }
        });

        let outcomes: Vec<UploadOutcome> = slots.into_iter().flatten().collect();
        debug_assert_eq!(outcomes.len(), paths.len());
        outcomes
    }
}

/// The part of the executor shared with pool threads.
struct Worker<'a, U: Uploader> {
    uploader: &'a U,
    config: &'a EffectiveConfig,
}

impl<U: Uploader> Worker<'_, U> {
    fn process(&self, request: &UploadRequest, folder: Option<&str>) -> UploadOutcome {
        let name = request.file_name();
        match self.upload_one(request, folder) {
            Ok(response) => {
                tracing::debug!(file = %name, url = %response.secure_url, "uploaded");
                UploadOutcome::success(name, response)
            }
            Err(err) => {
                tracing::warn!(file = %request.file_path.display(), "upload failed: {err}");
                UploadOutcome::failed(name, &err)
            }
        }
    }

    fn upload_one(
        &self,
        request: &UploadRequest,
        folder: Option<&str>,
    ) -> Result<UploadResponse, UploadError> {
        let metadata = std::fs::metadata(&request.file_path)?;
        if !metadata.is_file() {
            return Err(UploadError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }
        if metadata.len() > self.config.max_file_size {
            return Err(UploadError::TooLarge {
                size: metadata.len(),
                limit: self.config.max_file_size,
            });
        }
        let mime = mime_guess::from_path(&request.file_path).first_or_octet_stream();
        if !self.config.allows(mime.essence_str()) {
            return Err(UploadError::UnsupportedType {
                mime: mime.essence_str().to_string(),
            });
        }

        let folder = folder
            .or(request.target_folder.as_deref())
            .or(self.config.default_folder.as_deref())
            .filter(|f| !f.is_empty());
        let params = UploadParams {
            file: &request.file_path,
            resource_type: request.resource_type,
            folder,
            public_id: request.public_id.as_deref(),
            overwrite: request.overwrite,
        };
        tracing::debug!(file = %request.file_path.display(), ?folder, "dispatching upload");
        self.uploader.upload(&params)
    }
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
