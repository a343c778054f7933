//! Service configuration from environment variables.

use crate::layout::FloorPolicy;
use crate::renderer::RenderOptions;
use crate::report::ReportType;
use crate::store::{InMemoryStore, JsonFileStore, RecordStore};
use crate::template::DirTemplateSource;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub server: ServerConfig,
    pub templates: TemplateConfig,
    pub store: StoreConfig,
    pub render: RenderOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateConfig {
    pub dir: PathBuf,
    pub sha256_reception: Option<String>,
    pub sha256_decommission: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// `None` keeps the memory document in process ("local" mode).
    pub path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            templates: TemplateConfig {
                dir: PathBuf::from("templates"),
                sha256_reception: None,
                sha256_decommission: None,
            },
            store: StoreConfig { path: None },
            render: RenderOptions::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source; unset or blank variables
    /// take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let port = match var("ACTA_PORT") {
            Some(raw) => raw.trim().parse().map_err(|err| ConfigError::Invalid {
                var: "ACTA_PORT",
                message: format!("{raw:?}: {err}"),
            })?,
            None => defaults.server.port,
        };
        let floor_policy = match var("ACTA_FLOOR_POLICY") {
            Some(raw) => raw.parse::<FloorPolicy>().map_err(|message| ConfigError::Invalid {
                var: "ACTA_FLOOR_POLICY",
                message,
            })?,
            None => defaults.render.floor_policy,
        };

        Ok(Config {
            server: ServerConfig {
                host: var("ACTA_HOST").unwrap_or(defaults.server.host),
                port,
            },
            templates: TemplateConfig {
                dir: var("ACTA_TEMPLATE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.templates.dir),
                sha256_reception: var("ACTA_TEMPLATE_SHA256_RECEPTION"),
                sha256_decommission: var("ACTA_TEMPLATE_SHA256_DECOMMISSION"),
            },
            store: StoreConfig {
                path: var("ACTA_STORE_PATH").map(PathBuf::from),
            },
            render: RenderOptions { floor_policy },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn template_source(&self) -> DirTemplateSource {
        let mut source = DirTemplateSource::new(&self.templates.dir);
        if let Some(pin) = &self.templates.sha256_reception {
            source = source.with_pin(ReportType::Reception, pin);
        }
        if let Some(pin) = &self.templates.sha256_decommission {
            source = source.with_pin(ReportType::Decommission, pin);
        }
        source
    }

    pub fn record_store(&self) -> Arc<dyn RecordStore> {
        match &self.store.path {
            Some(path) => Arc::new(JsonFileStore::new(path)),
            None => Arc::new(InMemoryStore::new()),
        }
    }
}
