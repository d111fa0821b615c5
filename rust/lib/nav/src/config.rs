//! Shell configuration, read from a TOML file.
//!
//! ```toml
//! auth_entry = "/login"
//! max_redirects = 4
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::NavError;

/// Tunables of the navigation shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShellConfig {
    /// Where unauthenticated visitors are sent.
    pub auth_entry: String,

    /// Redirect hops allowed for one navigation before the error boundary
    /// trips.
    pub max_redirects: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            auth_entry: "/login".to_string(),
            max_redirects: 4,
        }
    }
}

impl ShellConfig {
    /// Load config from disk, or return the default if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, NavError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, NavError> {
        let config: ShellConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), NavError> {
        if !self.auth_entry.starts_with('/') || self.auth_entry.contains(['?', '#']) {
            return Err(NavError::Config(format!(
                "auth_entry must be an absolute path, got '{}'",
                self.auth_entry
            )));
        }
        if self.max_redirects == 0 {
            return Err(NavError::Config("max_redirects must be at least 1".into()));
        }
        Ok(())
    }
}
