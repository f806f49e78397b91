// File enumeration: a sorted, recursive walk of a root directory that keeps
// regular files whose extension matches the filter. Links are never followed.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Extensions picked up by default when a directory is given on the command line.
pub const DEFAULT_MEDIA_EXTENSIONS: &[&str] = &[
    ".webp", ".jpg", ".jpeg", ".png", ".gif", ".mp4", ".webm", ".mp3", ".pdf",
];

/// Recursive, sorted walk over a directory tree.
///
/// Every call to [`FileEnumerator::files`] starts a fresh walk, so the
/// sequence can be consumed more than once. Entries are sorted by file name
/// at each level. Symbolic links are not followed. A root that doesn't exist
/// yields nothing.
#[derive(Debug, Clone)]
pub struct FileEnumerator {
    root: PathBuf,
    extensions: Option<Vec<String>>,
}

impl FileEnumerator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: None,
        }
    }

    /// Keep only files ending with one of `extensions`, compared without case.
    /// A leading dot is optional.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| {
                let e = e.as_ref().trim().to_lowercase();
                if e.starts_with('.') {
                    e
                } else {
                    format!(".{e}")
                }
            })
            .collect();
        self.extensions = Some(extensions);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::debug!(root = %self.root.display(), "skipping entry: {err}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(move |entry| self.accepts(entry.path()))
            .map(|entry| entry.into_path())
    }

    fn accepts(&self, path: &Path) -> bool {
        let Some(extensions) = &self.extensions else {
            return true;
        };
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let name = name.to_lowercase();
        extensions.iter().any(|e| name.ends_with(e.as_str()))
    }
}
