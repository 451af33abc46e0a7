//! Model and client configuration.
//!
//! The client file lives at `~/.openerp/pager.toml` by default:
//!
//! ```toml
//! server = "http://localhost:8069"
//! database = "prod"
//! login = "admin"
//! password = "secret"
//! page-size = 80
//!
//! [context]
//! lang = "en_US"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PagerError;

/// Backend identity of a collection.
///
/// A collection cannot exist without the name of the Odoo model it mirrors
/// (`res.partner`, `sale.order`, ...). The name is checked here, once, so
/// every later request is known to target a model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    model_name: String,
    context: Map<String, Value>,
}

impl ModelConfig {
    pub fn new(model_name: impl Into<String>) -> Result<Self, PagerError> {
        let model_name = model_name.into();
        let trimmed = model_name.trim();
        if trimmed.is_empty() {
            return Err(PagerError::Configuration(
                "model name is not defined on the collection".into(),
            ));
        }
        if trimmed.contains(char::is_whitespace) || trimmed.contains('/') {
            return Err(PagerError::Configuration(format!(
                "invalid model name '{}'",
                model_name
            )));
        }
        Ok(Self {
            model_name: trimmed.to_string(),
            context: Map::new(),
        })
    }

    /// Context merged under every call's own context.
    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }
}

fn default_page_size() -> usize {
    80
}

/// Connection settings for an Odoo server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClientConfig {
    /// Server URL (e.g. "http://localhost:8069").
    #[serde(default)]
    pub server: String,

    /// Database to authenticate against.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub database: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub login: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    /// Pre-established session cookie; takes precedence over login/password.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub session_id: String,

    /// Default page size for paginated collections.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// User context sent with every call (lang, tz, ...).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            database: String::new(),
            login: String::new(),
            password: String::new(),
            session_id: String::new(),
            page_size: default_page_size(),
            context: Map::new(),
        }
    }
}

impl ClientConfig {
    /// Default config file path: ~/.openerp/pager.toml.
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        PathBuf::from(home).join(".openerp").join("pager.toml")
    }

    /// Load config from disk, or return default if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, PagerError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| PagerError::Configuration(format!("read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, PagerError> {
        let config: ClientConfig = toml::from_str(content)
            .map_err(|e| PagerError::Configuration(format!("parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), PagerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PagerError::Configuration(format!("create {}: {}", parent.display(), e)))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| PagerError::Configuration(format!("encode config: {}", e)))?;
        std::fs::write(path, content)
            .map_err(|e| PagerError::Configuration(format!("write {}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> Result<(), PagerError> {
        if self.page_size == 0 {
            return Err(PagerError::Configuration("page-size must be positive".into()));
        }
        if !self.login.is_empty() && self.database.is_empty() {
            return Err(PagerError::Configuration("login requires a database".into()));
        }
        Ok(())
    }
}
