use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use once_cell::sync::Lazy;

static SESSION_FILE_NAME: &str = "session.json";
static LOG_FILE_NAME: &str = "taskdesk.log";

static ENV_DATA_DIR: &str = "TASKDESK_DATA_DIR";
static ENV_API_URL: &str = "TASKDESK_API_URL";
static ENV_DIRECTORY_URL: &str = "TASKDESK_DIRECTORY_URL";
static ENV_TIMEOUT_SECS: &str = "TASKDESK_TIMEOUT_SECS";

pub static DEFAULT_API_URL: &str = "http://localhost:5002/api";
pub static DEFAULT_DIRECTORY_URL: &str = "https://reqres.in/api";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("dev", "taskdesk", "taskdesk"));

/// Values supplied on the command line; each one wins over the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub api_url: Option<String>,
    pub directory_url: Option<String>,
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    data_dir: PathBuf,
    session_path: PathBuf,
    api_url: String,
    directory_url: String,
    request_timeout: Duration,
}

impl AppConfig {
    /// Construct [`AppConfig`] by resolving every setting from the provided overrides,
    /// environment variables, and platform defaults.
    pub fn discover(overrides: ConfigOverrides) -> Result<Self> {
        let data_dir = resolve_data_dir(overrides.data_dir)?;
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).with_context(|| {
                format!("Failed to create data directory at {}", data_dir.display())
            })?;
        }

        let api_url = overrides
            .api_url
            .or_else(|| env::var(ENV_API_URL).ok())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let directory_url = overrides
            .directory_url
            .or_else(|| env::var(ENV_DIRECTORY_URL).ok())
            .unwrap_or_else(|| DEFAULT_DIRECTORY_URL.to_string());
        let request_timeout = match overrides.request_timeout {
            Some(timeout) => timeout,
            None => resolve_timeout()?,
        };

        Ok(Self::from_data_dir(data_dir)?
            .with_api_url(api_url)
            .with_directory_url(directory_url)
            .with_request_timeout(request_timeout))
    }

    /// Construct [`AppConfig`] directly from a resolved data directory with default endpoints.
    pub fn from_data_dir(data_dir: PathBuf) -> Result<Self> {
        let session_path = data_dir.join(SESSION_FILE_NAME);
        Ok(Self {
            data_dir,
            session_path,
            api_url: DEFAULT_API_URL.to_string(),
            directory_url: DEFAULT_DIRECTORY_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = trim_base_url(url.into());
        self
    }

    pub fn with_directory_url(mut self, url: impl Into<String>) -> Self {
        self.directory_url = trim_base_url(url.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn session_path(&self) -> &Path {
        &self.session_path
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(LOG_FILE_NAME)
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn directory_url(&self) -> &str {
        &self.directory_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

fn trim_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn resolve_timeout() -> Result<Duration> {
    match env::var(ENV_TIMEOUT_SECS) {
        Ok(raw) => {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a whole number of seconds", ENV_TIMEOUT_SECS))?;
            Ok(Duration::from_secs(secs.max(1)))
        }
        Err(_) => Ok(DEFAULT_REQUEST_TIMEOUT),
    }
}

fn resolve_data_dir(data_dir_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = data_dir_override {
        return Ok(dir);
    }

    if let Ok(env_dir) = env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(env_dir));
    }

    if let Some(project) = &*PROJECT_DIRS {
        return Ok(project.data_dir().to_path_buf());
    }

    if let Some(base) = BaseDirs::new() {
        return Ok(base.home_dir().join(".taskdesk"));
    }

    Ok(env::current_dir()?.join(".taskdesk"))
}
