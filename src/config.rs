//! Connection settings for the Content Safety resource.
//!
//! Values come from the environment (a `.env` file is honoured) so that no
//! credential is ever compiled in.

use std::{collections::BTreeMap, time::Duration};

use thiserror::Error;

pub const ENDPOINT_VAR: &str = "CONTENT_SAFETY_ENDPOINT";
pub const SUBSCRIPTION_KEY_VAR: &str = "CONTENT_SAFETY_KEY";
pub const AAD_TOKEN_VAR: &str = "CONTENT_SAFETY_AAD_TOKEN";
pub const TIMEOUT_VAR: &str = "CONTENT_SAFETY_TIMEOUT_SECS";

pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
pub const AUTHORIZATION_HEADER: &str = "Authorization";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("no credentials: set CONTENT_SAFETY_KEY or CONTENT_SAFETY_AAD_TOKEN")]
    NoCredentials,
}

/// Auth material. Either credential may be sent alone; when both are set,
/// both headers go out and the service picks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
    pub subscription_key: Option<String>,
    pub aad_token: Option<String>,
}

impl Credentials {
    pub fn subscription_key(key: impl Into<String>) -> Self {
        Self {
            subscription_key: Some(key.into()),
            aad_token: None,
        }
    }

    /// The token is sent verbatim as the `Authorization` value.
    pub fn aad_token(token: impl Into<String>) -> Self {
        Self {
            subscription_key: None,
            aad_token: Some(token.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.subscription_key.is_none() && self.aad_token.is_none()
    }

    pub fn headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        if let Some(key) = &self.subscription_key {
            headers.insert(SUBSCRIPTION_KEY_HEADER.to_string(), key.clone());
        }
        if let Some(token) = &self.aad_token {
            headers.insert(AUTHORIZATION_HEADER.to_string(), token.clone());
        }
        headers
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentSafetyConfig {
    pub endpoint: String,
    pub credentials: Credentials,
    pub timeout: Duration,
}

impl ContentSafetyConfig {
    pub fn new(endpoint: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            endpoint: endpoint.into(),
            credentials,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let endpoint = non_empty(ENDPOINT_VAR).ok_or(ConfigError::Missing(ENDPOINT_VAR))?;
        let credentials = Credentials {
            subscription_key: non_empty(SUBSCRIPTION_KEY_VAR),
            aad_token: non_empty(AAD_TOKEN_VAR),
        };
        let timeout_secs = match non_empty(TIMEOUT_VAR) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|err| ConfigError::Invalid {
                var: TIMEOUT_VAR,
                reason: err.to_string(),
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let config = Self {
            endpoint: endpoint.trim().to_string(),
            credentials,
            timeout: Duration::from_secs(timeout_secs),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.endpoint.starts_with("http") {
            return Err(ConfigError::Invalid {
                var: ENDPOINT_VAR,
                reason: "should start with 'http'".to_string(),
            });
        }
        if self.credentials.is_empty() {
            return Err(ConfigError::NoCredentials);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: TIMEOUT_VAR,
                reason: "timeout cannot be 0".to_string(),
            });
        }
        Ok(())
    }
}
