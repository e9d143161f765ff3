//! UAA credential loading for the OAuth2 wrapper
//!
//! Supports loading credentials from (in order of priority):
//! 1. JSON file (~/.config/logcache/oauth2-credentials.json)
//! 2. Runtime environment variables (fallback)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::client::Oauth2HttpClient;

/// Credentials filename in the config directory
const CREDENTIALS_FILE: &str = "oauth2-credentials.json";

const ADDR_VAR: &str = "UAA_ADDR";
const CLIENT_VAR: &str = "UAA_CLIENT";
const CLIENT_SECRET_VAR: &str = "UAA_CLIENT_SECRET";
const USERNAME_VAR: &str = "USERNAME";
const PASSWORD_VAR: &str = "PASSWORD";

/// Client (and optionally user) credentials for a UAA token endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Oauth2Credentials {
    pub addr: String,
    pub client_id: String,
    pub client_secret: String,
    /// Username and password for the password grant
    pub user: Option<(String, String)>,
}

/// On-disk credential format
#[derive(Deserialize)]
struct CredentialFile {
    addr: String,
    client_id: String,
    #[serde(default)]
    client_secret: String,
    username: Option<String>,
    password: Option<String>,
}

impl Oauth2Credentials {
    /// Load credentials from the config file if present, else the environment
    pub fn load() -> Result<Self> {
        if config::config_exists(CREDENTIALS_FILE) {
            let creds: CredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Ok(Self::from_credential_file(creds));
        }

        Self::from_env()
    }

    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let creds: CredentialFile = config::load_json_file(path)?;
        Ok(Self::from_credential_file(creds))
    }

    /// Parse credentials from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: CredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Ok(Self::from_credential_file(creds))
    }

    fn from_credential_file(creds: CredentialFile) -> Self {
        let user = match (creds.username, creds.password) {
            (Some(username), Some(password)) if !username.is_empty() => Some((username, password)),
            _ => None,
        };

        Self {
            addr: creds.addr,
            client_id: creds.client_id,
            client_secret: creds.client_secret,
            user,
        }
    }

    /// Load credentials from `UAA_ADDR`, `UAA_CLIENT` and `UAA_CLIENT_SECRET`,
    /// plus `USERNAME` and `PASSWORD` for the password grant
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let addr = var(ADDR_VAR).with_context(|| format!("{ADDR_VAR} environment variable not set"))?;
        let client_id =
            var(CLIENT_VAR).with_context(|| format!("{CLIENT_VAR} environment variable not set"))?;
        let client_secret = var(CLIENT_SECRET_VAR).unwrap_or_default();

        let user = match (var(USERNAME_VAR), var(PASSWORD_VAR)) {
            (Some(username), Some(password)) if !username.is_empty() => Some((username, password)),
            _ => None,
        };

        Ok(Self {
            addr,
            client_id,
            client_secret,
            user,
        })
    }

    /// Get the default credentials file path (~/.config/logcache/oauth2-credentials.json)
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }

    /// Check if credentials are available (file or env vars)
    pub fn is_available() -> bool {
        if config::config_exists(CREDENTIALS_FILE) {
            return true;
        }
        std::env::var(ADDR_VAR).is_ok() && std::env::var(CLIENT_VAR).is_ok()
    }

    /// Build a token-injecting HTTP client from these credentials
    pub fn client(&self) -> Oauth2HttpClient {
        let client = Oauth2HttpClient::new(&self.addr, &self.client_id, &self.client_secret);
        match &self.user {
            Some((username, password)) => client.with_user(username, password),
            None => client,
        }
    }
}
