use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::artifact::DEFAULT_API_URL;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[derive(Clone)]
pub struct Config {
    // Identity and endpoints
    pub keypair: String,
    pub rpc_url: String,
    pub artifact_api_url: String,

    // Dispatch
    pub skip_whitespace: bool,
    pub confirm_paints: bool,

    // Pool sizing
    pub worker_count: usize,
    pub queue_capacity: usize,

    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keypair: String::new(),
            rpc_url: String::new(),
            artifact_api_url: DEFAULT_API_URL.to_string(),

            skip_whitespace: false,
            confirm_paints: false,

            worker_count: 30,
            queue_capacity: 100,

            http_timeout_secs: 60,
        }
    }
}

/// Same spellings Go's `strconv.ParseBool` accepts.
fn parse_bool(val: &str) -> Option<bool> {
    match val {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut config = Config::default();

        // Required configuration
        config.keypair = get("KEYPAIR")
            .ok_or_else(|| ConfigError::MissingEnvVar("KEYPAIR".to_string()))?;
        config.rpc_url = get("RPC_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("RPC_URL".to_string()))?;

        if let Some(val) = get("ARTIFACT_API_URL") {
            config.artifact_api_url = val;
        }

        if let Some(val) = get("SKIP_WHITESPACE") {
            config.skip_whitespace = parse_bool(&val)
                .ok_or_else(|| ConfigError::InvalidEnvVar("SKIP_WHITESPACE".to_string(), val))?;
        }

        if let Some(val) = get("CONFIRM_PAINTS") {
            config.confirm_paints = parse_bool(&val)
                .ok_or_else(|| ConfigError::InvalidEnvVar("CONFIRM_PAINTS".to_string(), val))?;
        }

        if let Some(val) = get("WORKER_COUNT") {
            config.worker_count = val.parse()
                .map_err(|_| ConfigError::InvalidEnvVar("WORKER_COUNT".to_string(), val))?;
        }

        if let Some(val) = get("QUEUE_CAPACITY") {
            config.queue_capacity = val.parse()
                .map_err(|_| ConfigError::InvalidEnvVar("QUEUE_CAPACITY".to_string(), val))?;
        }

        if let Some(val) = get("HTTP_TIMEOUT_SECS") {
            config.http_timeout_secs = val.parse()
                .map_err(|_| ConfigError::InvalidEnvVar("HTTP_TIMEOUT_SECS".to_string(), val))?;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keypair.is_empty() {
            return Err(ConfigError::ValidationError("KEYPAIR is required".to_string()));
        }

        if !self.rpc_url.starts_with("http") {
            return Err(ConfigError::ValidationError("RPC_URL must be a valid HTTP URL".to_string()));
        }

        if !self.artifact_api_url.starts_with("http") {
            return Err(ConfigError::ValidationError("ARTIFACT_API_URL must be a valid HTTP URL".to_string()));
        }

        if self.worker_count == 0 {
            return Err(ConfigError::ValidationError("WORKER_COUNT must be greater than 0".to_string()));
        }

        if self.queue_capacity == 0 {
            return Err(ConfigError::ValidationError("QUEUE_CAPACITY must be greater than 0".to_string()));
        }

        if self.http_timeout_secs == 0 {
            return Err(ConfigError::ValidationError("HTTP_TIMEOUT_SECS must be greater than 0".to_string()));
        }

        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("keypair", &"<redacted>")
            .field("rpc_url", &self.rpc_url)
            .field("artifact_api_url", &self.artifact_api_url)
            .field("skip_whitespace", &self.skip_whitespace)
            .field("confirm_paints", &self.confirm_paints)
            .field("worker_count", &self.worker_count)
            .field("queue_capacity", &self.queue_capacity)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|k| vars.get(k).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [("KEYPAIR", "kp"), ("RPC_URL", "http://rpc.test")];

    #[test]
    fn defaults_match_the_fixed_pool() {
        let c = load(&REQUIRED).unwrap();
        assert_eq!(c.worker_count, 30);
        assert_eq!(c.queue_capacity, 100);
        assert_eq!(c.http_timeout(), Duration::from_secs(60));
        assert!(!c.skip_whitespace);
        assert!(!c.confirm_paints);
        assert_eq!(c.artifact_api_url, DEFAULT_API_URL);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn required_variables_are_enforced() {
        assert_eq!(load(&[("RPC_URL", "http://x")]).err(), Some(ConfigError::MissingEnvVar("KEYPAIR".into())));
        assert_eq!(load(&[("KEYPAIR", "kp"), ("RPC_URL", "")]).err(), Some(ConfigError::MissingEnvVar("RPC_URL".into())));
    }

    #[test]
    fn booleans_follow_parse_bool_spellings() {
        for (raw, expected) in [("1", true), ("True", true), ("t", true), ("FALSE", false), ("0", false)] {
            let mut vars = REQUIRED.to_vec();
            vars.push(("SKIP_WHITESPACE", raw));
            assert_eq!(load(&vars).unwrap().skip_whitespace, expected, "{raw}");
        }
        let mut vars = REQUIRED.to_vec();
        vars.push(("SKIP_WHITESPACE", "yes"));
        assert_eq!(
            load(&vars).err(),
            Some(ConfigError::InvalidEnvVar("SKIP_WHITESPACE".into(), "yes".into()))
        );
    }

    #[test]
    fn overrides_and_validation() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([("WORKER_COUNT", "0"), ("CONFIRM_PAINTS", "true"), ("QUEUE_CAPACITY", "8")]);
        let c = load(&vars).unwrap();
        assert!(c.confirm_paints);
        assert_eq!(c.queue_capacity, 8);
        assert!(matches!(c.validate(), Err(ConfigError::ValidationError(_))));

        let mut vars = REQUIRED.to_vec();
        vars.push(("WORKER_COUNT", "many"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn debug_output_hides_keypair() {
        let c = load(&[("KEYPAIR", "super-secret"), ("RPC_URL", "http://rpc.test")]).unwrap();
        assert!(!format!("{c:?}").contains("super-secret"));
    }
}
