//! `config.toml` loading.
//!
//! Every key is optional; missing keys keep the engine defaults and command
//! line flags win over the file.
//!
//! ```toml
//! target_dir = "~/Downloads"
//! chunk_size = 65536
//!
//! [timeouts]
//! connect_secs = 30
//! read_secs = 5
//!
//! [proxy]
//! https = "http://127.0.0.1:3128"
//!
//! [naps]
//! checkpoint_bytes = 3221225472
//! passive_nap_chance = 0.25
//!
//! [headers]
//! User-Agent = "persist"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use persist_fetch::{FetchOptions, NapOptions, ProxyOptions};
use serde::Deserialize;
use thiserror::Error;

use crate::cli::App;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}", path.display())]
    Read {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}", path.display())]
    Parse {
        path:   PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub target_dir:      Option<PathBuf>,
    pub staging_dir:     Option<PathBuf>,
    pub chunk_size:      Option<usize>,
    pub sync_on_publish: Option<bool>,
    pub check_space:     Option<bool>,
    pub timeouts:        TimeoutConfig,
    pub proxy:           ProxyConfig,
    pub naps:            NapConfig,
    pub headers:         BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutConfig {
    pub connect_secs: Option<u64>,
    pub read_secs:    Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyConfig {
    pub http:  Option<String>,
    pub https: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NapConfig {
    pub checkpoint_bytes:   Option<u64>,
    pub passive_nap_chance: Option<f64>,
    pub passive_nap_secs:   Option<u64>,
    pub reconnect_nap_secs: Option<u64>,
    pub random_nap_chance:  Option<f64>,
    pub random_nap_secs:    Option<u64>,
    pub random_nap_after:   Option<u32>,
    pub connect_nap_every:  Option<u32>,
}

impl Config {
    pub fn from_toml(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(path, &text)
    }

    /// Load `explicit`, or the default file if it exists, or nothing.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_path() {
            Some(path) if path.is_file() => {
                tracing::debug!(path = %path.display(), "using default config");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Engine options from the file, with command line flags applied on top.
    pub fn fetch_options(&self, app: &App) -> FetchOptions {
        let mut options = FetchOptions::default();

        if let Some(secs) = app.connect_timeout.or(self.timeouts.connect_secs) {
            options = options.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = app.read_timeout.or(self.timeouts.read_secs) {
            options = options.read_timeout(Duration::from_secs(secs));
        }
        if let Some(size) = app.chunk_size.or(self.chunk_size) {
            options = options.chunk_size(size);
        }

        let proxy = match &app.proxy {
            Some(proxy) => ProxyOptions::all(proxy.clone()),
            None => ProxyOptions {
                http:  self.proxy.http.clone(),
                https: self.proxy.https.clone(),
            },
        };
        options = options.proxy(proxy).naps(self.naps.apply(NapOptions::default()));

        if !self.headers.is_empty() {
            options = options.headers(
                self.headers
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            );
        }
        if let Some(dir) = &self.staging_dir {
            options = options.staging_dir(dir.clone());
        }
        if let Some(sync) = self.sync_on_publish {
            options = options.sync_on_publish(sync);
        }
        if let Some(check) = self.check_space {
            options = options.check_space(check);
        }
        options
    }
}

impl NapConfig {
    fn apply(&self, mut naps: NapOptions) -> NapOptions {
        let secs = Duration::from_secs;
        if let Some(v) = self.checkpoint_bytes {
            naps.checkpoint_bytes = v;
        }
        if let Some(v) = self.passive_nap_chance {
            naps.passive_nap_chance = v;
        }
        if let Some(v) = self.passive_nap_secs {
            naps.passive_nap_time = secs(v);
        }
        if let Some(v) = self.reconnect_nap_secs {
            naps.reconnect_nap_time = secs(v);
        }
        if let Some(v) = self.random_nap_chance {
            naps.random_nap_chance = v;
        }
        if let Some(v) = self.random_nap_secs {
            naps.random_nap_time = secs(v);
        }
        if let Some(v) = self.random_nap_after {
            naps.random_nap_after = v;
        }
        if let Some(v) = self.connect_nap_every {
            naps.connect_nap_every = v;
        }
        naps
    }
}

fn default_path() -> Option<PathBuf> {
    home::home_dir().map(|home| home.join(".config").join("persist").join("config.toml"))
}
