//! Per-resource rate limit rules.
//!
//! A rule set maps resources (routes, endpoint groups) to the algorithm
//! configuration guarding them, with an optional catch-all default. Rule
//! files are YAML:
//!
//! ```yaml
//! default:
//!   algorithm: token_bucket
//!   capacity: 100
//!   refill_rate_per_second: 10.0
//! resources:
//!   /api/search:
//!     algorithm: sliding_window
//!     limit: 30
//!     window_secs: 60
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AlgorithmConfig;
use crate::error::{ConfigError, Result};

/// A set of rate limit rules keyed by resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateLimitRules {
    /// Fallback applied when no resource-specific rule matches.
    #[serde(default)]
    pub default: Option<AlgorithmConfig>,

    /// Exact-match rules keyed by resource.
    #[serde(default)]
    pub resources: HashMap<String, AlgorithmConfig>,
}

impl RateLimitRules {
    /// Create an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rules from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading rate limit rules");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load rules from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let rules: RateLimitRules =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        rules.validate()?;
        Ok(rules)
    }

    /// Validate every embedded configuration.
    ///
    /// A bad rule fails at load time, never mid-request.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if let Some(default) = &self.default {
            default.validate()?;
        }
        for config in self.resources.values() {
            config.validate()?;
        }
        Ok(())
    }

    /// The configuration guarding `resource`, falling back to the default rule.
    pub fn resolve(&self, resource: &str) -> Option<&AlgorithmConfig> {
        self.resources.get(resource).or(self.default.as_ref())
    }
}
