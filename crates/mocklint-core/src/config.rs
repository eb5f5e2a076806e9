//! Configuration handling for mocklint
//!
//! ```toml
//! [rules]
//! disabled = ["ML1010"]
//!
//! [rules.severity]
//! ML1000 = "error"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::diagnostics::{RuleCode, Severity};
use crate::error::MockLintError;

/// Name of the configuration file looked up next to the analyzed project.
pub const FILE_NAME: &str = "mocklint.toml";

/// mocklint configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Rule selection and severity overrides
    #[serde(default)]
    pub rules: RulesConfig,
}

/// Rule settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RulesConfig {
    /// Rule ids that never run
    #[serde(default)]
    pub disabled: Vec<String>,

    /// Per-rule severity overrides, keyed by rule id
    #[serde(default)]
    pub severity: BTreeMap<String, Severity>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, MockLintError> {
        let content = fs::read_to_string(path)
            .map_err(|e| MockLintError::config(format!("failed to read config file: {}", e)))?;
        Self::parse(&content)
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str) -> Result<Self, MockLintError> {
        let config: Config = toml::from_str(content)
            .map_err(|e| MockLintError::config(format!("failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load mocklint.toml from the given directory, or defaults when absent
    pub fn load_from_dir(dir: &Path) -> Result<Self, MockLintError> {
        let config_path = dir.join(FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    /// Reject rule ids that do not name a rule
    pub fn validate(&self) -> Result<(), MockLintError> {
        let ids = self
            .rules
            .disabled
            .iter()
            .chain(self.rules.severity.keys());
        for id in ids {
            if RuleCode::from_id(id).is_none() {
                return Err(MockLintError::config(format!("unknown rule id: {}", id)));
            }
        }
        Ok(())
    }

    pub fn is_enabled(&self, code: RuleCode) -> bool {
        !self.rules.disabled.iter().any(|id| id == code.id())
    }

    /// Effective severity of a rule
    pub fn severity_for(&self, code: RuleCode) -> Severity {
        self.rules
            .severity
            .get(code.id())
            .copied()
            .unwrap_or_else(|| code.severity())
    }
}

/// Find mocklint.toml by searching upward from `start`
pub fn find_config_from(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = dir.parent();
    }
    None
}
