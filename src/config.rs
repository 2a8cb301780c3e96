use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use log::{error, info, warn};
use serde_json::Value;

use crate::prelude::*;

/// Flat key/value configuration, populated from a JSON file or the environment.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    values: BTreeMap<String, String>,
}

/// Outcome of checking one key against the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStatus {
    pub key: String,
    pub ok: bool,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a flat JSON object. Scalars are stored as strings; `null` becomes "".
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => NNError::NotFound(path.display().to_string()),
            _ => NNError::IoError(err),
        })?;
        let config = Self::from_json(&text)?;
        info!("loaded {} config keys from {}", config.len(), path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let doc: Value = serde_json::from_str(text)?;
        let Value::Object(map) = doc else {
            return Err(NNError::Parse("config document must be a JSON object".to_string()));
        };
        let values = map
            .into_iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (k, v)
            })
            .collect();
        Ok(Self { values })
    }

    /// Collects whichever of `keys` are set in the process environment.
    pub fn from_env<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let values = keys
            .into_iter()
            .filter_map(|k| {
                let k = k.as_ref();
                env::var(k).ok().map(|v| (k.to_string(), v))
            })
            .collect();
        Self { values }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| NNError::Parse(format!("value of {} cannot be parsed: {}", key, raw))),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Exports every entry into the process environment.
    pub fn apply_to_env(&self) {
        for (k, v) in &self.values {
            env::set_var(k, v);
        }
    }

    /// Checks that every entry is present in the environment with the same value.
    pub fn verify_env(&self) -> Vec<KeyStatus> {
        self.values
            .iter()
            .map(|(k, v)| {
                let ok = env::var(k).map(|cur| &cur == v).unwrap_or(false);
                if !ok {
                    warn!("environment variable {} is not set to its configured value", k);
                }
                KeyStatus { key: k.clone(), ok }
            })
            .collect()
    }
}

/// Loads a config file, logging a diagnostic and returning `None` on any failure.
pub fn load_config<P: AsRef<Path>>(path: P) -> Option<AppConfig> {
    let path = path.as_ref();
    match AppConfig::from_file(path) {
        Ok(config) => Some(config),
        Err(NNError::NotFound(p)) => {
            error!("Could not find file at {}; make sure the path is correct", p);
            None
        }
        Err(NNError::Parse(msg)) => {
            error!("The file {} is not valid JSON: {}", path.display(), msg);
            None
        }
        Err(err) => {
            error!("An unexpected error occurred reading {}: {}", path.display(), err);
            None
        }
    }
}
