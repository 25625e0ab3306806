//! Runtime configuration: defaults, an optional JSON file, then CLI flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bulk::{CollisionPolicy, FailurePolicy};
use crate::error::{CardError, Result};
use crate::template::CANONICAL_WIDTH;

const HOME_ENV: &str = "GREETCARD_HOME";
const DEFAULT_HOME: &str = ".greetcard";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub font_dirs: Vec<PathBuf>,
    pub default_font: Option<String>,
    pub image_timeout_secs: Option<u64>,
    pub on_error: FailurePolicy,
    pub collisions: CollisionPolicy,
    pub canonical_width: u32,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = std::env::var_os(HOME_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HOME));
        Self {
            data_dir,
            font_dirs: Vec::new(),
            default_font: None,
            image_timeout_secs: None,
            on_error: FailurePolicy::default(),
            collisions: CollisionPolicy::default(),
            canonical_width: CANONICAL_WIDTH,
        }
    }
}

impl Config {
    /// Read `explicit` if given, else `<data_dir>/config.json` when it exists,
    /// else the defaults.
    pub fn load(explicit: Option<&Path>, data_dir: Option<&Path>) -> Result<Self> {
        let mut base = Self::default();
        if let Some(dir) = data_dir {
            base.data_dir = dir.to_path_buf();
        }
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => base.data_dir.join(CONFIG_FILE),
        };
        if !path.exists() {
            if explicit.is_some() {
                return Err(CardError::Validation(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            return Ok(base);
        }
        let raw = fs::read_to_string(&path)?;
        let mut config: Config = serde_json::from_str(&raw).map_err(|e| {
            CardError::Validation(format!("invalid config {}: {e}", path.display()))
        })?;
        // A data dir given on the command line wins over the file.
        if let Some(dir) = data_dir {
            config.data_dir = dir.to_path_buf();
        }
        Ok(config)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.data_dir.join("templates")
    }

    pub fn fonts_dir(&self) -> PathBuf {
        self.data_dir.join("fonts")
    }

    pub fn image_timeout(&self) -> Option<Duration> {
        self.image_timeout_secs.map(Duration::from_secs)
    }
}
