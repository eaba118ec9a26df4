//! Rule-set configuration loaded from TOML.

use std::path::Path;

use anyhow::{Context as _, Result};
use regex::Regex;
use serde::Deserialize;

use crate::rules::{Enforce, Rule};

/// Top-level configuration for the demo driver.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Configured rules, in declaration order
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// One rule as declared in the config file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Regex matched against the resource path
    pub test: String,
    /// Bucket the rule's loaders land in; defaults to `normal`
    #[serde(default)]
    pub enforce: Enforce,
    /// Loader identities contributed when the rule matches
    pub loaders: Vec<String>,
}

impl Config {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Compile the configured rules into matchers.
    pub fn compile(&self) -> Result<Vec<Rule>> {
        self.rules
            .iter()
            .map(|rule| {
                let test = Regex::new(&rule.test)
                    .with_context(|| format!("invalid rule pattern `{}`", rule.test))?;
                Ok(Rule {
                    test,
                    enforce: rule.enforce,
                    loaders: rule.loaders.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rules() {
        let config: Config = toml::from_str(
            r#"
            [[rules]]
            test = "\\.txt$"
            loaders = ["trim", "uppercase"]

            [[rules]]
            test = "\\.txt$"
            enforce = "pre"
            loaders = ["banner"]
            "#,
        )
        .unwrap();

        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[0].enforce, Enforce::Normal);
        assert_eq!(config.rules[0].loaders, vec!["trim", "uppercase"]);
        assert_eq!(config.rules[1].enforce, Enforce::Pre);

        let rules = config.compile().unwrap();
        assert!(rules[0].test.is_match("notes.txt"));
        assert!(!rules[0].test.is_match("notes.md"));
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.rules.is_empty());
        assert!(config.compile().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let config: Config = toml::from_str(
            r#"
            [[rules]]
            test = "("
            loaders = ["x"]
            "#,
        )
        .unwrap();
        let err = config.compile().unwrap_err();
        assert!(err.to_string().contains("invalid rule pattern"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let parsed: Result<Config, _> = toml::from_str(
            r#"
            [[rules]]
            test = "x"
            loaders = []
            enfroce = "pre"
            "#,
        );
        assert!(parsed.is_err());
    }
}
