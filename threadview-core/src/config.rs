use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::client::{ApiConfig, DEFAULT_PAGE_SIZE};
use crate::error::{Result, ThreadviewError};

const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub organization: Option<String>,
    pub project: Option<String>,
    pub timeout_secs: Option<u64>,
    pub page_size: Option<u32>,
}

impl FileConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ThreadviewError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ThreadviewError::InvalidConfig {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub config_path: Option<PathBuf>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiConfig,
    pub page_size: u32,
    pub config_path: Option<PathBuf>,
}

impl Settings {
    pub fn load(overrides: Overrides) -> Result<Self> {
        Self::load_with_env(overrides, |key| env::var(key).ok())
    }

    pub fn load_with_env<F>(overrides: Overrides, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_value = |keys: &[&str]| keys.iter().find_map(|key| non_empty(lookup(*key)));

        let (config_path, file) = load_file_config(overrides.config_path, &lookup)?;

        // Precedence:
        // 1) --api-key
        // 2) THREADVIEWER_API_KEY, OPENAI_API_KEY, API_KEY
        // 3) api_key in config.toml
        let api_key = non_empty(overrides.api_key)
            .or_else(|| env_value(&["THREADVIEWER_API_KEY", "OPENAI_API_KEY", "API_KEY"]))
            .or_else(|| non_empty(file.api_key))
            .ok_or(ThreadviewError::MissingApiKey)?;

        let mut api = ApiConfig::new(api_key);

        // Precedence:
        // 1) --base-url
        // 2) THREADVIEWER_BASE_URL, OPENAI_BASE_URL
        // 3) base_url in config.toml
        if let Some(base_url) = non_empty(overrides.base_url)
            .or_else(|| env_value(&["THREADVIEWER_BASE_URL", "OPENAI_BASE_URL"]))
            .or_else(|| non_empty(file.base_url))
        {
            api = api.with_base_url(base_url);
        }
        if let Some(organization) =
            env_value(&["OPENAI_ORG_ID"]).or_else(|| non_empty(file.organization))
        {
            api = api.with_organization(organization);
        }
        if let Some(project) =
            env_value(&["OPENAI_PROJECT_ID"]).or_else(|| non_empty(file.project))
        {
            api = api.with_project(project);
        }
        if let Some(secs) = file.timeout_secs.filter(|secs| *secs > 0) {
            api = api.with_timeout(Duration::from_secs(secs));
        }

        let requested = overrides
            .page_size
            .or(file.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let page_size = requested.clamp(1, MAX_PAGE_SIZE);
        if page_size != requested {
            warn!(requested, page_size, "page size out of range, clamped");
        }

        Ok(Self {
            api,
            page_size,
            config_path,
        })
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("threadviewer").join("config.toml"))
}

fn load_file_config<F>(explicit: Option<PathBuf>, lookup: &F) -> Result<(Option<PathBuf>, FileConfig)>
where
    F: Fn(&str) -> Option<String>,
{
    // Precedence:
    // 1) --config (must exist)
    // 2) THREADVIEWER_CONFIG (must exist)
    // 3) <config_dir>/threadviewer/config.toml (optional)
    let explicit = explicit.or_else(|| non_empty(lookup("THREADVIEWER_CONFIG")).map(PathBuf::from));
    if let Some(path) = explicit {
        let file = FileConfig::from_path(&path)?;
        return Ok((Some(path), file));
    }

    let Some(path) = default_config_path() else {
        return Ok((None, FileConfig::default()));
    };
    match FileConfig::from_path(&path) {
        Ok(file) => Ok((Some(path), file)),
        Err(ThreadviewError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file");
            Ok((None, FileConfig::default()))
        }
        Err(err) => Err(err),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
