// src/services/google.rs
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::auth::models::{ExternalIdentity, Provider};
use crate::common::config::GoogleConfig;
use crate::common::safe_email_log;

const SCOPES: &str = "openid email profile";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("authorization code exchange failed: {0}")]
    ProviderExchange(String),

    #[error("profile fetch failed: {0}")]
    ProviderProfile(String),

    #[error("HTTP request failed: {0}")]
    Network(String),

    #[error("identity provider did not answer before the deadline")]
    Timeout,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl IdentityError {
    fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            IdentityError::Timeout
        } else {
            IdentityError::Network(e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
    pub scope: Option<String>,
}

/// OIDC userinfo body
#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    name: String,
    #[serde(default)]
    picture: String,
}

/// Google OAuth2 client: authorization URL construction and code exchange
#[derive(Debug, Clone)]
pub struct GoogleService {
    client: Client,
    config: GoogleConfig,
    auth_url: Url,
}

impl GoogleService {
    pub fn new(client: Client, config: GoogleConfig) -> Result<Self, IdentityError> {
        let auth_url = Url::parse(&config.auth_url)
            .map_err(|e| IdentityError::InvalidConfig(format!("auth url: {}", e)))?;
        Url::parse(&config.token_url)
            .map_err(|e| IdentityError::InvalidConfig(format!("token url: {}", e)))?;
        Url::parse(&config.userinfo_url)
            .map_err(|e| IdentityError::InvalidConfig(format!("userinfo url: {}", e)))?;

        Ok(Self {
            client,
            config,
            auth_url,
        })
    }

    /// Authorization endpoint URL for one login attempt. Pure; no network call.
    pub fn authorization_url(&self, state: &str, code_challenge: &str) -> String {
        let mut url = self.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", SCOPES)
            .append_pair("state", state)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256");
        url.into()
    }

    /// Exchanges the code (bound to `code_verifier`) and fetches the caller's profile.
    ///
    /// Both legs share `deadline`. Nothing is retried; dropping the future aborts
    /// whichever request is in flight.
    pub async fn exchange_code_for_identity(
        &self,
        code: &str,
        code_verifier: &str,
        deadline: Duration,
    ) -> Result<ExternalIdentity, IdentityError> {
        let exchange = async {
            let tokens = self.exchange_code(code, code_verifier).await?;
            self.fetch_identity(&tokens.access_token).await
        };

        match tokio::time::timeout(deadline, exchange).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    deadline_ms = deadline.as_millis() as u64,
                    "Google OAuth exchange timed out"
                );
                Err(IdentityError::Timeout)
            }
        }
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, IdentityError> {
        debug!("Exchanging authorization code with Google token endpoint");

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", code_verifier),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    endpoint = %self.config.token_url,
                    "HTTP error contacting Google token endpoint"
                );
                IdentityError::from_transport(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(http_status = %status, body = %body, "Google token endpoint rejected the code");
            return Err(IdentityError::ProviderExchange(format!("status {}", status)));
        }

        let tokens = response.json::<TokenResponse>().await.map_err(|e| {
            error!(error = %e, "Failed to parse Google token response");
            IdentityError::ProviderExchange("malformed token response".to_string())
        })?;

        debug!(
            token_type = ?tokens.token_type,
            expires_in = ?tokens.expires_in,
            scope = ?tokens.scope,
            "Received tokens from Google"
        );
        Ok(tokens)
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<ExternalIdentity, IdentityError> {
        let response = self
            .client
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    endpoint = %self.config.userinfo_url,
                    "HTTP error contacting Google userinfo endpoint"
                );
                IdentityError::from_transport(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(http_status = %status, "Google userinfo returned error status");
            return Err(IdentityError::ProviderProfile(format!("status {}", status)));
        }

        let info = response.json::<UserInfo>().await.map_err(|e| {
            if e.is_timeout() {
                return IdentityError::Timeout;
            }
            error!(error = %e, "Failed to parse Google userinfo response");
            IdentityError::ProviderProfile("malformed userinfo response".to_string())
        })?;

        let email = info
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                warn!(provider_id = %info.sub, "Google userinfo has no email");
                IdentityError::ProviderProfile("userinfo missing email".to_string())
            })?;

        info!(
            email = %safe_email_log(&email),
            provider = Provider::Google.as_str(),
            provider_id = %info.sub,
            email_verified = info.email_verified,
            "Fetched Google identity"
        );

        Ok(ExternalIdentity {
            provider: Provider::Google,
            provider_subject: info.sub,
            email,
            email_verified: info.email_verified,
            display_name: info.name,
            avatar_url: info.picture,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn config_for(base: &str) -> GoogleConfig {
        GoogleConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            redirect_url: "http://localhost:8080/api/v1/auth/google/callback".to_string(),
            auth_url: format!("{}/o/oauth2/v2/auth", base),
            token_url: format!("{}/token", base),
            userinfo_url: format!("{}/v1/userinfo", base),
        }
    }
}
