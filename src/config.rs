use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf};

pub const CONFIG_ENV: &str = "VEHICLE_IMPORT_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the vehicle store.
    pub store_dir: PathBuf,
    pub log_level: String,
    /// Uploads loaded and normalized at once by `import`.
    pub max_concurrent_imports: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("data"),
            log_level: "info".to_string(),
            max_concurrent_imports: 3,
        }
    }
}

impl Config {
    /// YAML file named by `VEHICLE_IMPORT_CONFIG` (if set), then
    /// `VEHICLE_STORE_DIR`, `LOG_LEVEL` and `MAX_CONCURRENT_IMPORTS`.
    pub fn load() -> Result<Self> {
        let mut cfg = match env::var(CONFIG_ENV) {
            Ok(path) => Self::from_yaml_file(&path)?,
            Err(_) => Self::default(),
        };
        cfg.apply_overrides(|key| env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config {}", path))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("VEHICLE_STORE_DIR") {
            self.store_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(n) = lookup("MAX_CONCURRENT_IMPORTS") {
            self.max_concurrent_imports = n
                .trim()
                .parse()
                .with_context(|| format!("MAX_CONCURRENT_IMPORTS must be a number, got {:?}", n))?;
        }
        self.max_concurrent_imports = self.max_concurrent_imports.max(1);
        Ok(())
    }
}
