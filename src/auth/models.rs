//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Session token claims. The claim set is fixed; unknown fields are rejected on decode.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Claims {
    /// Local account id, as a string per JWT convention
    pub sub: String,
    pub account_id: i64,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    pub jti: String,
}

/// Local account, the `users` table row
#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub email: String,
    #[sqlx(rename = "name")]
    #[serde(rename = "name")]
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// Fields supplied when an account is first created from an external login
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
        }
    }
}

/// Identity asserted by the external provider after a successful code exchange.
/// Never persisted directly; the account resolver maps it onto an [`Account`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub provider: Provider,
    pub provider_subject: String,
    pub email: String,
    pub email_verified: bool,
    pub display_name: String,
    pub avatar_url: String,
}

/// Query parameters on the provider's redirect back to us
#[derive(Deserialize, Debug, Default)]
pub struct CallbackParams {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub code: String,
    pub error: Option<String>,
}

/// Successful callback response
#[derive(Serialize, Debug)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: Account,
}
