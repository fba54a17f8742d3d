//! Runtime configuration from the environment (and an optional `.env`).
//!
//! | Variable               | Default              |
//! |------------------------|----------------------|
//! | `PASSBOARD_PORT`       | `3000`               |
//! | `PASSBOARD_LAYOUT_DIR` | `.passboard/layouts` |
//! | `PASSBOARD_DATA_DIR`   | unset (built-ins)    |

use std::path::PathBuf;

use crate::api::logs::log_warning;
use crate::cache::DEFAULT_LAYOUT_DIR;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub layout_dir: PathBuf,
    /// Directory whose CSV files override the built-in datasets.
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            layout_dir: PathBuf::from(DEFAULT_LAYOUT_DIR),
            data_dir: None,
        }
    }
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unusable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("PASSBOARD_PORT") {
            match raw.trim().parse::<u16>() {
                Ok(port) => config.port = port,
                Err(_) => log_warning(format!(
                    "Ignoring PASSBOARD_PORT='{}', using {}",
                    raw, DEFAULT_PORT
                )),
            }
        }

        if let Some(dir) = non_empty(lookup("PASSBOARD_LAYOUT_DIR")) {
            config.layout_dir = PathBuf::from(dir);
        }

        if let Some(dir) = non_empty(lookup("PASSBOARD_DATA_DIR")) {
            let path = PathBuf::from(dir);
            if path.is_dir() {
                config.data_dir = Some(path);
            } else {
                log_warning(format!(
                    "PASSBOARD_DATA_DIR '{}' is not a directory, using built-in datasets",
                    path.display()
                ));
            }
        }

        config
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
