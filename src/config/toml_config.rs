use crate::utils::error::{LoaderError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range, validate_url, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_TRIGGER_CLASS: &str = "collapse-icon";
pub const DEFAULT_TARGET_ATTRIBUTE: &str = "href";
pub const DEFAULT_SOURCE_ATTRIBUTE: &str = "data-src";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Class that marks an element as a trigger.
    pub trigger_class: String,
    /// Trigger attribute holding the target selector.
    pub target_attribute: String,
    /// Target attribute holding the fragment URL.
    pub source_attribute: String,
    /// Overrides the document's base URL for relative sources.
    pub base_url: Option<String>,
    pub request_timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            trigger_class: DEFAULT_TRIGGER_CLASS.to_string(),
            target_attribute: DEFAULT_TARGET_ATTRIBUTE.to_string(),
            source_attribute: DEFAULT_SOURCE_ATTRIBUTE.to_string(),
            base_url: None,
            request_timeout_seconds: None,
            user_agent: None,
        }
    }
}

impl LoaderConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content)
            .map_err(|e| LoaderError::config("toml_parsing", format!("TOML parsing error: {}", e)))
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| LoaderError::config("toml_parsing", e.to_string()))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }
}

impl Validate for LoaderConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("trigger_class", &self.trigger_class)?;
        validate_non_empty_string("target_attribute", &self.target_attribute)?;
        validate_non_empty_string("source_attribute", &self.source_attribute)?;

        if let Some(base_url) = &self.base_url {
            validate_url("base_url", base_url)?;
        }

        if let Some(timeout) = self.request_timeout_seconds {
            validate_range("request_timeout_seconds", timeout, 1, 3600)?;
        }

        if let Some(user_agent) = &self.user_agent {
            validate_non_empty_string("user_agent", user_agent)?;
        }

        Ok(())
    }
}
