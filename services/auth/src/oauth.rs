//! OAuth2 integration with the sign-in portal

use anyhow::Result;
use common::config::AppSettings;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl, basic::BasicClient,
};
use serde::Deserialize;
use tracing::info;

const SCOPES: [&str; 3] = ["openid", "profile", "email"];

/// Portal endpoints, all relative to `OAUTH_SERVER_URL`
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl PortalConfig {
    pub fn from_settings(settings: &AppSettings) -> Self {
        let base = settings.oauth_server_url.trim_end_matches('/');

        Self {
            client_id: settings.client_id().to_string(),
            client_secret: settings.oauth_client_secret.clone(),
            redirect_url: settings.oauth_redirect_url.clone(),
            auth_url: format!("{}/oauth/authorize", base),
            token_url: format!("{}/oauth/token", base),
            userinfo_url: format!("{}/oauth/userinfo", base),
        }
    }
}

/// Identity returned by the portal's user info endpoint
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortalProfile {
    #[serde(alias = "sub")]
    pub open_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "picture")]
    pub avatar_url: Option<String>,
    #[serde(default, alias = "platform")]
    pub login_method: Option<String>,
}

/// OAuth2 client for the portal
#[derive(Clone)]
pub struct PortalClient {
    client: BasicClient,
    http: reqwest::Client,
    userinfo_url: String,
}

impl PortalClient {
    pub fn new(config: PortalConfig) -> Result<Self> {
        let client = BasicClient::new(
            ClientId::new(config.client_id),
            config.client_secret.map(ClientSecret::new),
            AuthUrl::new(config.auth_url)?,
            Some(TokenUrl::new(config.token_url)?),
        )
        .set_redirect_uri(RedirectUrl::new(config.redirect_url)?);

        Ok(Self {
            client,
            http: reqwest::Client::new(),
            userinfo_url: config.userinfo_url,
        })
    }

    /// Generate the authorization URL with a fresh CSRF state and PKCE challenge
    pub fn authorize_url(&self) -> (String, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = self
            .client
            .authorize_url(CsrfToken::new_random)
            .set_pkce_challenge(pkce_challenge);

        for scope in SCOPES {
            request = request.add_scope(Scope::new(scope.to_string()));
        }

        let (auth_url, csrf_token) = request.url();

        (auth_url.to_string(), csrf_token, pkce_verifier)
    }

    /// Exchange an authorization code for an access token
    pub async fn exchange_code(
        &self,
        code: String,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<String> {
        info!("Exchanging authorization code with the portal");

        let token_response = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(oauth2::reqwest::async_http_client)
            .await
            .map_err(|e| anyhow::anyhow!("Token exchange failed: {}", e))?;

        Ok(token_response.access_token().secret().clone())
    }

    /// Fetch the signed-in identity from the portal
    pub async fn user_profile(&self, access_token: &str) -> Result<PortalProfile> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to get portal user profile: {}", response.status());
        }

        let profile: PortalProfile = response.json().await?;
        if profile.open_id.trim().is_empty() {
            anyhow::bail!("Portal returned a profile without an open id");
        }

        Ok(profile)
    }
}
