//! Runtime configuration, read from the environment (after `.env` loading).

use anyhow::{Context, Result};

const DEFAULT_TRAIN_BASE_URL: &str = "http://lapi.transitchicago.com/api/1.0";
const DEFAULT_BUS_BASE_URL: &str = "http://www.ctabustracker.com/bustime/api/v1";

/// API keys and endpoints for the two CTA trackers.
#[derive(Debug, Clone, PartialEq)]
pub struct CtaConfig {
    pub train_key: Option<String>,
    pub bus_key: Option<String>,
    pub train_base_url: String,
    pub bus_base_url: String,
}

impl Default for CtaConfig {
    fn default() -> Self {
        Self {
            train_key: None,
            bus_key: None,
            train_base_url: DEFAULT_TRAIN_BASE_URL.to_string(),
            bus_base_url: DEFAULT_BUS_BASE_URL.to_string(),
        }
    }
}

impl CtaConfig {
    /// Reads `CTA_TRAIN_API_KEY`, `CTA_BUS_API_KEY`, `CTA_TRAIN_BASE_URL` and
    /// `CTA_BUS_BASE_URL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            train_key: non_empty("CTA_TRAIN_API_KEY"),
            bus_key: non_empty("CTA_BUS_API_KEY"),
            train_base_url: non_empty("CTA_TRAIN_BASE_URL").unwrap_or(defaults.train_base_url),
            bus_base_url: non_empty("CTA_BUS_BASE_URL").unwrap_or(defaults.bus_base_url),
        }
    }

    pub fn require_train_key(&self) -> Result<&str> {
        self.train_key
            .as_deref()
            .context("CTA_TRAIN_API_KEY must be set")
    }

    pub fn require_bus_key(&self) -> Result<&str> {
        self.bus_key.as_deref().context("CTA_BUS_API_KEY must be set")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = CtaConfig::from_lookup(lookup(&[]));
        assert_eq!(config, CtaConfig::default());
        assert!(config.require_train_key().is_err());
        assert!(config.require_bus_key().is_err());
    }

    #[test]
    fn test_reads_keys_and_urls() {
        let config = CtaConfig::from_lookup(lookup(&[
            ("CTA_TRAIN_API_KEY", "train-key"),
            ("CTA_BUS_API_KEY", "bus-key"),
            ("CTA_BUS_BASE_URL", "http://localhost:8080/bustime"),
        ]));
        assert_eq!(config.require_train_key().unwrap(), "train-key");
        assert_eq!(config.require_bus_key().unwrap(), "bus-key");
        assert_eq!(config.bus_base_url, "http://localhost:8080/bustime");
        assert_eq!(config.train_base_url, DEFAULT_TRAIN_BASE_URL);
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = CtaConfig::from_lookup(lookup(&[("CTA_TRAIN_API_KEY", "  ")]));
        assert!(config.train_key.is_none());
    }
}
