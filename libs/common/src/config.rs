//! Process-wide application settings
//!
//! Settings are read once at startup from environment variables through the
//! `config` crate and never reloaded.

use anyhow::Result;
use config::{Config, Environment};
use serde::Deserialize;
use std::collections::HashSet;

/// Settings shared by the sign-in and API services
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    /// Secret used to sign session tokens (`JWT_SECRET`)
    pub jwt_secret: String,
    /// Application id registered with the OAuth portal (`APP_ID`)
    #[serde(default)]
    pub app_id: String,
    /// Base URL of the OAuth portal (`OAUTH_SERVER_URL`)
    #[serde(default = "default_oauth_server_url")]
    pub oauth_server_url: String,
    /// OAuth client id, falls back to the app id when unset
    #[serde(default)]
    pub oauth_client_id: Option<String>,
    #[serde(default)]
    pub oauth_client_secret: Option<String>,
    /// Callback URL registered with the portal (`OAUTH_REDIRECT_URL`)
    #[serde(default = "default_oauth_redirect_url")]
    pub oauth_redirect_url: String,
    /// Comma-separated open ids promoted to admin on sign-in (`OWNER_OPEN_IDS`)
    #[serde(default)]
    pub owner_open_ids: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_auth_bind_addr")]
    pub auth_bind_addr: String,
}

fn default_oauth_server_url() -> String {
    "http://localhost:4000".to_string()
}

fn default_oauth_redirect_url() -> String {
    "http://localhost:3000/api/oauth/callback".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_auth_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

impl AppSettings {
    /// Load settings from the process environment
    pub fn load() -> Result<Self> {
        Self::from_environment(Environment::default())
    }

    /// Load settings from an explicit environment source
    pub fn from_environment(environment: Environment) -> Result<Self> {
        let settings: AppSettings = Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Invalid application settings: {}", e))?;

        if settings.jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        Ok(settings)
    }

    /// Parsed owner allow-list
    pub fn owner_ids(&self) -> HashSet<String> {
        self.owner_open_ids
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Whether the given external id is on the owner allow-list
    pub fn is_owner(&self, open_id: &str) -> bool {
        self.owner_ids().contains(open_id)
    }

    /// OAuth client id, defaulting to the application id
    pub fn client_id(&self) -> &str {
        self.oauth_client_id.as_deref().unwrap_or(&self.app_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::default().source(Some(map))
    }

    #[test]
    fn test_settings_defaults() {
        let settings = AppSettings::from_environment(env_of(&[("JWT_SECRET", "s3cret")])).unwrap();

        assert_eq!(settings.jwt_secret, "s3cret");
        assert_eq!(settings.api_bind_addr, "0.0.0.0:3001");
        assert_eq!(settings.auth_bind_addr, "0.0.0.0:3000");
        assert!(settings.owner_ids().is_empty());
        assert!(!settings.is_owner(""));
    }

    #[test]
    fn test_owner_allow_list_is_trimmed() {
        let settings = AppSettings::from_environment(env_of(&[
            ("JWT_SECRET", "s3cret"),
            ("OWNER_OPEN_IDS", " alice , bob,,"),
            ("APP_ID", "app-1"),
        ]))
        .unwrap();

        assert_eq!(settings.owner_ids().len(), 2);
        assert!(settings.is_owner("alice"));
        assert!(settings.is_owner("bob"));
        assert!(!settings.is_owner("carol"));
        assert_eq!(settings.client_id(), "app-1");
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        assert!(AppSettings::from_environment(env_of(&[("APP_ID", "x")])).is_err());
        assert!(AppSettings::from_environment(env_of(&[("JWT_SECRET", "  ")])).is_err());
    }
}
