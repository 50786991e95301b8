use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::Deserialize;
use tracing::debug;

use crate::datetime::{DEFAULT_TIME_ZONE, parse_zone};
use crate::table::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8008";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_PREVIEW_LIMIT: u32 = 8;
pub const DEFAULT_PROTECTED_PATHS: [&str; 2] = ["/dashboard", "/tasks"];

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, message: String },
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            ConfigError::Parse { path, message } => {
                write!(f, "invalid config {}: {message}", path.display())
            }
            ConfigError::Invalid(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// TOML file layer; every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    api_base_url: Option<String>,
    bind_addr: Option<String>,
    page_size: Option<u32>,
    preview_limit: Option<u32>,
    time_zone: Option<String>,
    session_file: Option<PathBuf>,
    protected_paths: Option<Vec<String>>,
}

/// Values from the command line. clap fills these from flags or their
/// `TTT_*` environment variables, so this layer covers both.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_base_url: Option<String>,
    pub bind_addr: Option<String>,
    pub page_size: Option<u32>,
    pub time_zone: Option<String>,
    pub session_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub bind_addr: String,
    pub page_size: u32,
    pub preview_limit: u32,
    pub time_zone: Tz,
    pub session_file: PathBuf,
    pub protected_paths: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            time_zone: parse_zone(DEFAULT_TIME_ZONE).unwrap_or(Tz::Asia__Jakarta),
            session_file: config_dir().join("session.json"),
            protected_paths: DEFAULT_PROTECTED_PATHS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("tasktrack"))
        .unwrap_or_else(|| PathBuf::from(".tasktrack"))
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

fn set_opt<T>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}

impl AppConfig {
    /// Defaults, then the TOML file, then command-line/environment values.
    ///
    /// An explicit `path` must exist; the default location may be absent.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (default_config_path(), false),
        };
        let text = match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                None
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        let file = match text {
            Some(text) => toml::from_str::<FileConfig>(&text).map_err(|e| ConfigError::Parse {
                path: path.clone(),
                message: e.to_string(),
            })?,
            None => FileConfig::default(),
        };

        let mut cfg = AppConfig::default();
        cfg.apply_file(file)?;
        cfg.apply_overrides(overrides)?;
        Ok(cfg)
    }

    fn apply_file(&mut self, file: FileConfig) -> Result<(), ConfigError> {
        self.set_api_base_url(file.api_base_url)?;
        set_opt(&mut self.bind_addr, file.bind_addr);
        set_opt(&mut self.page_size, file.page_size.map(clamp_size));
        set_opt(&mut self.preview_limit, file.preview_limit.map(clamp_size));
        self.set_time_zone(file.time_zone)?;
        set_opt(&mut self.session_file, file.session_file);
        if let Some(paths) = file.protected_paths {
            self.protected_paths = normalize_paths(paths);
        }
        Ok(())
    }

    fn apply_overrides(&mut self, o: &Overrides) -> Result<(), ConfigError> {
        self.set_api_base_url(o.api_base_url.clone())?;
        set_opt(&mut self.bind_addr, o.bind_addr.clone());
        set_opt(&mut self.page_size, o.page_size.map(clamp_size));
        self.set_time_zone(o.time_zone.clone())?;
        set_opt(&mut self.session_file, o.session_file.clone());
        Ok(())
    }

    fn set_api_base_url(&mut self, value: Option<String>) -> Result<(), ConfigError> {
        if let Some(raw) = value {
            let trimmed = raw.trim().trim_end_matches('/');
            url::Url::parse(trimmed)
                .map_err(|e| ConfigError::Invalid(format!("api_base_url {raw:?}: {e}")))?;
            self.api_base_url = trimmed.to_string();
        }
        Ok(())
    }

    fn set_time_zone(&mut self, value: Option<String>) -> Result<(), ConfigError> {
        if let Some(name) = value {
            self.time_zone = parse_zone(&name).map_err(ConfigError::Invalid)?;
        }
        Ok(())
    }

    /// Whether a dashboard path requires a session cookie.
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_paths
            .iter()
            .any(|p| path == p || path.starts_with(&format!("{p}/")))
    }
}

fn clamp_size(n: u32) -> u32 {
    n.clamp(1, MAX_PAGE_SIZE)
}

fn normalize_paths(paths: Vec<String>) -> Vec<String> {
    paths
        .into_iter()
        .map(|p| p.trim().trim_end_matches('/').to_string())
        .filter(|p| !p.is_empty())
        .map(|p| if p.starts_with('/') { p } else { format!("/{p}") })
        .collect()
}
