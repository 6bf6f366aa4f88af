use std::fs;
use std::path::Path;

use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::CampusError;

pub static CONFIG: OnceCell<Config> = OnceCell::new();

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub campusdesk: String,
    pub reqwest: String,
}

impl LoggingConfig {
    const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
    const CAMPUSDESK_LEVEL: &str = "info";
    const REQWEST_LEVEL: &str = "warn";

    fn default() -> Self {
        LoggingConfig {
            campusdesk: Self::CAMPUSDESK_LEVEL.to_string(),
            reqwest: Self::REQWEST_LEVEL.to_string(),
        }
    }

    fn ensure_valid(&mut self) {
        Self::ensure_level(&mut self.campusdesk, "campusdesk", Self::CAMPUSDESK_LEVEL);
        Self::ensure_level(&mut self.reqwest, "reqwest", Self::REQWEST_LEVEL);
    }

    fn ensure_level(level: &mut String, name: &str, default: &str) {
        let str_original = level.clone();
        *level = level.trim().to_ascii_lowercase();
        if !Self::LOG_LEVELS.contains(&level.as_str()) {
            eprintln!(
                "Config error: {} log level of '{}' is invalid - using default of '{}'",
                name, str_original, default
            );
            *level = default.to_owned();
        }
    }

    /// The flexi_logger spec string for these levels
    pub fn log_spec(&self) -> String {
        format!(
            "warn, campusdesk={}, reqwest={}",
            self.campusdesk, self.reqwest
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub token: String,
}

impl BackendConfig {
    const BASE_URL: &str = "http://127.0.0.1:8000/api";
    const TIMEOUT_SECS: u64 = 30;

    fn default() -> Self {
        BackendConfig {
            base_url: Self::BASE_URL.to_owned(),
            timeout_secs: Self::TIMEOUT_SECS,
            token: String::new(),
        }
    }

    fn ensure_valid(&mut self) {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            eprintln!(
                "Config error: backend base_url is empty - using default of '{}'",
                Self::BASE_URL
            );
            self.base_url = Self::BASE_URL.to_owned();
        } else {
            self.base_url = trimmed.to_owned();
        }

        if self.timeout_secs == 0 {
            eprintln!(
                "Config error: backend timeout_secs must be positive - using default of {}",
                Self::TIMEOUT_SECS
            );
            self.timeout_secs = Self::TIMEOUT_SECS;
        }

        self.token = self.token.trim().to_owned();
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ListsConfig {
    pub page_size: u32,
}

impl ListsConfig {
    const PAGE_SIZE: u32 = 10;
    const MAX_PAGE_SIZE: u32 = 100;

    fn default() -> Self {
        ListsConfig {
            page_size: Self::PAGE_SIZE,
        }
    }

    fn ensure_valid(&mut self) {
        if self.page_size == 0 || self.page_size > Self::MAX_PAGE_SIZE {
            eprintln!(
                "Config error: page_size of {} is outside 1..={} - using default of {}",
                self.page_size,
                Self::MAX_PAGE_SIZE,
                Self::PAGE_SIZE
            );
            self.page_size = Self::PAGE_SIZE;
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub backend: BackendConfig,
    pub lists: ListsConfig,
    pub logging: LoggingConfig,
}

impl Config {
    const ENV_PREFIX: &str = "CAMPUSDESK_";

    pub fn default() -> Self {
        Config {
            backend: BackendConfig::default(),
            lists: ListsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Loads the configuration from a TOML file located in the app's data directory.
    /// If the file is missing it is written with defaults. Environment variables
    /// prefixed with CAMPUSDESK_ override both.
    pub fn load_config(project_dirs: &ProjectDirs) -> Self {
        let config_path = project_dirs.data_local_dir().join("config.toml");

        if !config_path.exists() {
            Self::write_default(&config_path);
        }

        Self::load_from(&config_path).unwrap_or_else(|err| {
            eprintln!(
                "Could not load config file {}: {}. Using default configuration.",
                config_path.display(),
                err
            );
            let mut config = Self::default();
            config.ensure_valid();
            config
        })
    }

    /// Merges defaults, the given TOML file (if present) and the environment
    pub fn load_from(config_path: &Path) -> Result<Self, CampusError> {
        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed(Self::ENV_PREFIX).split("__"));

        let mut config: Config = figment.extract().map_err(Box::new)?;
        config.ensure_valid();

        Ok(config)
    }

    /// Returns the process-wide config, or defaults if none was installed
    pub fn get() -> Config {
        CONFIG.get().cloned().unwrap_or_else(Self::default)
    }

    fn write_default(config_path: &Path) {
        if let Some(parent) = config_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!(
                    "Failed to create configuration directory {}: {}",
                    parent.display(),
                    e
                );
            }
        }
        if let Ok(toml_string) = toml::to_string_pretty(&Self::default()) {
            if let Err(e) = fs::write(config_path, toml_string) {
                eprintln!(
                    "Failed to write default config to {}: {}",
                    config_path.display(),
                    e
                );
            }
        } else {
            eprintln!("Failed to serialize default config.");
        }
    }

    fn ensure_valid(&mut self) {
        self.backend.ensure_valid();
        self.lists.ensure_valid();
        self.logging.ensure_valid();
    }
}
