// Configuration resolver: merges explicit arguments, an optional JSON config
// file and environment variables into one `EffectiveConfig`. Precedence is
// applied per field: explicit > config file > environment.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 100_000_000;
pub const DEFAULT_CONCURRENT_UPLOADS: usize = 3;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_API_BASE_URL: &str = "https://api.cloudinary.com";

pub const ENV_CLOUD_NAME: &str = "CLOUDINARY_CLOUD_NAME";
pub const ENV_API_KEY: &str = "CLOUDINARY_API_KEY";
pub const ENV_API_SECRET: &str = "CLOUDINARY_API_SECRET";

/// Values given directly by the caller (CLI flags or prompts).
#[derive(Debug, Default, Clone)]
pub struct ExplicitConfig {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub default_folder: Option<String>,
    pub max_file_size: Option<u64>,
    pub concurrent_uploads: Option<usize>,
    pub allowed_types: Option<Vec<String>>,
    pub timeout: Option<Duration>,
    pub api_base_url: Option<String>,
}

impl ExplicitConfig {
    pub fn set_credential(&mut self, credential: Credential, value: String) {
        let slot = match credential {
            Credential::CloudName => &mut self.cloud_name,
            Credential::ApiKey => &mut self.api_key,
            Credential::ApiSecret => &mut self.api_secret,
        };
        *slot = Some(value);
    }
}

/// The three values an upload can't be signed without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    CloudName,
    ApiKey,
    ApiSecret,
}

impl Credential {
    pub fn as_str(self) -> &'static str {
        match self {
            Credential::CloudName => "cloud_name",
            Credential::ApiKey => "api_key",
            Credential::ApiSecret => "api_secret",
        }
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk shape of the config file. Every key is optional.
#[derive(Deserialize, Default, Debug)]
struct ConfigFile {
    #[serde(alias = "cloudIdentifier", alias = "cloudName")]
    cloud_name: Option<String>,
    #[serde(alias = "apiKey")]
    api_key: Option<String>,
    #[serde(alias = "apiSecret")]
    api_secret: Option<String>,
    #[serde(alias = "defaultFolder")]
    default_folder: Option<String>,
    #[serde(alias = "maxFileSizeBytes", alias = "maxFileSize")]
    max_file_size: Option<u64>,
    #[serde(alias = "concurrentUploads")]
    concurrent_uploads: Option<usize>,
    #[serde(alias = "allowedTypes")]
    allowed_types: Option<Vec<String>>,
    #[serde(alias = "timeoutSecs")]
    timeout_secs: Option<u64>,
    #[serde(alias = "apiBaseUrl")]
    api_base_url: Option<String>,
}

impl ConfigFile {
    /// A missing file reads as an empty document.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "config file not found, skipping");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        tracing::debug!(path = %path.display(), "loaded config file");
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Pattern over MIME types: `*/*`, `image/*` or an exact `video/mp4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimePattern(String);

impl MimePattern {
    pub fn new(pattern: &str) -> Self {
        Self(pattern.trim().to_ascii_lowercase())
    }

    pub fn any() -> Self {
        Self("*/*".into())
    }

    pub fn matches(&self, mime: &str) -> bool {
        let mime = mime.to_ascii_lowercase();
        match self.0.split_once('/') {
            Some(("*", "*")) => true,
            Some((kind, "*")) => mime.split('/').next() == Some(kind),
            _ => self.0 == mime,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Fully resolved options for one run. Built once, then only read.
#[derive(Clone)]
pub struct EffectiveConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub default_folder: Option<String>,
    pub max_file_size: u64,
    pub concurrency_limit: usize,
    pub allowed_types: Vec<MimePattern>,
    pub request_timeout: Duration,
    pub api_base_url: String,
}

impl fmt::Debug for EffectiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectiveConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("default_folder", &self.default_folder)
            .field("max_file_size", &self.max_file_size)
            .field("concurrency_limit", &self.concurrency_limit)
            .field("allowed_types", &self.allowed_types)
            .field("request_timeout", &self.request_timeout)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl EffectiveConfig {
    pub fn allows(&self, mime: &str) -> bool {
        self.allowed_types.iter().any(|p| p.matches(mime))
    }
}

/// Default config file location, `~/.config/cloudinary-uploader/config.json`
/// on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cloudinary-uploader").join("config.json"))
}

/// Resolve against the real process environment.
pub fn resolve(
    explicit: &ExplicitConfig,
    config_file: Option<&Path>,
) -> Result<EffectiveConfig, ConfigError> {
    resolve_with(explicit, config_file, |name| std::env::var(name).ok())
}

/// Resolve with an injected environment lookup.
pub fn resolve_with<F>(
    explicit: &ExplicitConfig,
    config_file: Option<&Path>,
    env: F,
) -> Result<EffectiveConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let file = match config_file {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };

    let pick = |explicit: &Option<String>, file: Option<String>, var: &str| {
        non_empty(explicit.clone())
            .or_else(|| non_empty(file))
            .or_else(|| non_empty(env(var)))
    };
    let cloud_name = pick(&explicit.cloud_name, file.cloud_name, ENV_CLOUD_NAME);
    let api_key = pick(&explicit.api_key, file.api_key, ENV_API_KEY);
    let api_secret = pick(&explicit.api_secret, file.api_secret, ENV_API_SECRET);

    let (cloud_name, api_key, api_secret) = match (cloud_name, api_key, api_secret) {
        (Some(c), Some(k), Some(s)) => (c, k, s),
        (c, k, s) => {
            let missing = [
                (Credential::CloudName, c),
                (Credential::ApiKey, k),
                (Credential::ApiSecret, s),
            ]
                .into_iter()
                .filter(|(_, value)| value.is_none())
                .map(|(credential, _)| credential)
                .collect();
            return Err(ConfigError::MissingCredentials { missing });
        }
    };

    let concurrency_limit = explicit
        .concurrent_uploads
        .or(file.concurrent_uploads)
        .unwrap_or(DEFAULT_CONCURRENT_UPLOADS);
    if concurrency_limit == 0 {
        return Err(ConfigError::Invalid(
            "concurrent_uploads must be at least 1".into(),
        ));
    }

    let request_timeout = explicit
        .timeout
        .or(file.timeout_secs.map(Duration::from_secs))
        .unwrap_or(DEFAULT_TIMEOUT);
    if request_timeout.is_zero() {
        return Err(ConfigError::Invalid("timeout must be greater than zero".into()));
    }

    let allowed_types = explicit
        .allowed_types
        .clone()
        .or(file.allowed_types)
        .filter(|types| !types.is_empty())
        .map(|types| types.iter().map(|t| MimePattern::new(t)).collect())
        .unwrap_or_else(|| vec![MimePattern::any()]);

    Ok(EffectiveConfig {
        cloud_name,
        api_key,
        api_secret,
        default_folder: non_empty(explicit.default_folder.clone())
            .or_else(|| non_empty(file.default_folder)),
        max_file_size: explicit
            .max_file_size
            .or(file.max_file_size)
            .unwrap_or(DEFAULT_MAX_FILE_SIZE),
        concurrency_limit,
        allowed_types,
        request_timeout,
        api_base_url: explicit
            .api_base_url
            .clone()
            .or(file.api_base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.into())
            .trim_end_matches('/')
            .to_string(),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn config_file(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    const FULL_ENV: &[(&str, &str)] = &[
        (ENV_CLOUD_NAME, "env-cloud"),
        (ENV_API_KEY, "env-key"),
        (ENV_API_SECRET, "env-secret"),
    ];

    #[test]
    fn environment_only() {
        let config = resolve_with(&ExplicitConfig::default(), None, env_of(FULL_ENV)).unwrap();
        assert_eq!(config.cloud_name, "env-cloud");
        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.api_secret, "env-secret");
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(config.concurrency_limit, DEFAULT_CONCURRENT_UPLOADS);
        assert_eq!(config.allowed_types, vec![MimePattern::any()]);
        assert_eq!(config.request_timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.default_folder, None);
    }

    #[test]
    fn explicit_beats_file_beats_env() {
        let file = config_file(r#"{"cloud_name": "file-cloud", "api_key": "file-key"}"#);
        let explicit = ExplicitConfig {
            cloud_name: Some("arg-cloud".into()),
            ..Default::default()
        };

        let config = resolve_with(&explicit, Some(file.path()), env_of(FULL_ENV)).unwrap();
        assert_eq!(config.cloud_name, "arg-cloud");
        assert_eq!(config.api_key, "file-key");
        assert_eq!(config.api_secret, "env-secret");

        let config =
            resolve_with(&ExplicitConfig::default(), Some(file.path()), env_of(FULL_ENV))
                .unwrap();
        assert_eq!(config.cloud_name, "file-cloud");
    }

    #[test]
    fn camel_case_keys_and_options() {
        let file = config_file(
            r#"{
                "cloudIdentifier": "c",
                "apiKey": "k",
                "apiSecret": "s",
                "defaultFolder": "assets",
                "maxFileSizeBytes": 1024,
                "concurrentUploads": 5,
                "allowedTypes": ["image/*", "video/mp4"],
                "timeout_secs": 5
            }"#,
        );
        let config =
            resolve_with(&ExplicitConfig::default(), Some(file.path()), env_of(&[])).unwrap();
        assert_eq!(config.cloud_name, "c");
        assert_eq!(config.default_folder.as_deref(), Some("assets"));
        assert_eq!(config.max_file_size, 1024);
        assert_eq!(config.concurrency_limit, 5);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!(config.allows("image/png"));
        assert!(config.allows("video/mp4"));
        assert!(!config.allows("video/webm"));
        assert!(!config.allows("application/pdf"));
    }

    #[test]
    fn missing_credentials() {
        let err = resolve_with(
            &ExplicitConfig::default(),
            None,
            env_of(&[(ENV_API_KEY, "only-key")]),
        )
        .unwrap_err();
        match err {
            ConfigError::MissingCredentials { missing } => {
                assert_eq!(missing, vec![Credential::CloudName, Credential::ApiSecret])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_values_fall_through() {
        let explicit = ExplicitConfig {
            cloud_name: Some("".into()),
            ..Default::default()
        };
        let config = resolve_with(&explicit, None, env_of(FULL_ENV)).unwrap();
        assert_eq!(config.cloud_name, "env-cloud");
    }

    #[test]
    fn missing_file_is_empty_but_malformed_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(resolve_with(&ExplicitConfig::default(), Some(&missing), env_of(FULL_ENV)).is_ok());

        let file = config_file("{ not json");
        assert!(matches!(
            resolve_with(&ExplicitConfig::default(), Some(file.path()), env_of(FULL_ENV)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let explicit = ExplicitConfig {
            concurrent_uploads: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            resolve_with(&explicit, None, env_of(FULL_ENV)),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn set_credential_fills_the_matching_field() {
        let mut explicit = ExplicitConfig::default();
        explicit.set_credential(Credential::CloudName, "c".into());
        explicit.set_credential(Credential::ApiKey, "k".into());
        explicit.set_credential(Credential::ApiSecret, "s".into());
        let config = resolve_with(&explicit, None, env_of(&[])).unwrap();
        assert_eq!(
            (config.cloud_name.as_str(), config.api_key.as_str(), config.api_secret.as_str()),
            ("c", "k", "s")
        );
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let explicit = ExplicitConfig {
            timeout: Some(Duration::ZERO),
            ..Default::default()
        };
        assert!(matches!(
            resolve_with(&explicit, None, env_of(FULL_ENV)),
            Err(ConfigError::Invalid(_))
        ));

        let file = config_file(r#"{"timeout_secs": 0}"#);
        assert!(matches!(
            resolve_with(&ExplicitConfig::default(), Some(file.path()), env_of(FULL_ENV)),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn debug_redacts_secret() {
        let config = resolve_with(&ExplicitConfig::default(), None, env_of(FULL_ENV)).unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("env-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn mime_patterns() {
        assert!(MimePattern::any().matches("application/octet-stream"));
        assert!(MimePattern::new("Image/*").matches("image/webp"));
        assert!(!MimePattern::new("image/*").matches("video/mp4"));
        assert!(MimePattern::new("video/mp4").matches("VIDEO/MP4"));
    }
}
