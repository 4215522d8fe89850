use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::migrator::RetryPolicy;

const DEFAULT_CATALOG_PATH: &str = "catalog.json";
const DEFAULT_RETRIES: u32 = 50;
const DEFAULT_BACKOFF_STEP_MS: u64 = 50;
const DEFAULT_BACKOFF_MAX_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct Config {
    pub catalog_path: PathBuf,
    pub retries: u32,
    pub backoff_step: Duration,
    pub backoff_max: Duration,
    pub clock_resync_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            retries: DEFAULT_RETRIES,
            backoff_step: Duration::from_millis(DEFAULT_BACKOFF_STEP_MS),
            backoff_max: Duration::from_millis(DEFAULT_BACKOFF_MAX_MS),
            clock_resync_command: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let catalog_path = std::env::var("CATALOG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CATALOG_PATH));

        let retries = parse_var("MIGRATE_RETRIES", DEFAULT_RETRIES)?;
        let backoff_step_ms = parse_var("RETRY_BACKOFF_STEP_MS", DEFAULT_BACKOFF_STEP_MS)?;
        let backoff_max_ms = parse_var("RETRY_BACKOFF_MAX_MS", DEFAULT_BACKOFF_MAX_MS)?;

        let clock_resync_command = std::env::var("CLOCK_RESYNC_COMMAND")
            .ok()
            .filter(|cmd| !cmd.trim().is_empty());

        Ok(Self {
            catalog_path,
            retries,
            backoff_step: Duration::from_millis(backoff_step_ms),
            backoff_max: Duration::from_millis(backoff_max_ms),
            clock_resync_command,
        })
    }

    pub fn get_invalid_config(&self) -> Vec<String> {
        let mut invalid = Vec::new();

        if self.catalog_path.as_os_str().is_empty() {
            invalid.push("CATALOG_PATH is empty".to_string());
        }
        if self.backoff_step > self.backoff_max {
            invalid.push(format!(
                "RETRY_BACKOFF_STEP_MS ({}) exceeds RETRY_BACKOFF_MAX_MS ({})",
                self.backoff_step.as_millis(),
                self.backoff_max.as_millis()
            ));
        }

        invalid
    }

    pub fn retry_policy(&self, max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, self.backoff_step, self.backoff_max)
    }
}

fn parse_var<V: std::str::FromStr>(name: &str, default: V) -> Result<V> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} is not a valid number: {}", name, raw))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.get_invalid_config().is_empty());
        assert_eq!(config.retries, 50);
    }

    #[test]
    fn test_backoff_step_larger_than_max_is_reported() {
        let config = Config {
            backoff_step: Duration::from_millis(800),
            backoff_max: Duration::from_millis(100),
            ..Config::default()
        };

        let invalid = config.get_invalid_config();
        assert_eq!(invalid.len(), 1);
        assert!(invalid[0].contains("RETRY_BACKOFF_STEP_MS"));
    }

    #[test]
    fn test_retry_policy_uses_configured_backoff() {
        let config = Config::default();
        let policy = config.retry_policy(3);
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.backoff_step, Duration::from_millis(50));
        assert_eq!(policy.backoff_max, Duration::from_millis(500));
    }
}
