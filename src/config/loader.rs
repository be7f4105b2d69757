use crate::config::schema::ScrapeConfig;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use validator::Validate;

/// Values given on the command line; each replaces the file's value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub workers: Option<usize>,
    pub origin: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ScrapeConfig> {
        let config = Self::load_file(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, falls back to defaults, applies `overrides` and
    /// validates the result.
    pub fn resolve(path: Option<&Path>, overrides: Overrides) -> Result<ScrapeConfig> {
        let mut config = match path {
            Some(path) => Self::load_file(path)?,
            None => ScrapeConfig::default(),
        };

        if let Some(workers) = overrides.workers {
            config.workers = workers;
        }
        if overrides.origin.is_some() {
            config.origin = overrides.origin;
        }
        if let Some(secs) = overrides.request_timeout_secs {
            config.request_timeout_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<ScrapeConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            Some("toml") => Ok(toml::from_str(&content)?),
            _ => Err(Error::Config(format!(
                "Unsupported file extension: {}",
                path.display()
            ))),
        }
    }
}
