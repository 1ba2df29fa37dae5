//! Session token issuance and verification (HS256 JWT with a fixed claim set)

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

use super::models::Claims;

pub const TOKEN_ISSUER: &str = "pets_api";
pub const TOKEN_AUDIENCE: &str = "pets_api";

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Error)]
pub enum TokenError {
    /// Any verification failure. Deliberately carries no detail.
    #[error("invalid token")]
    InvalidToken,

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Holds the process-wide signing key. Built once at startup, never mutated.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: std::time::Duration,
    validation: Validation,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("keys", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: std::time::Duration) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_audience(&[TOKEN_AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "aud", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
            validation,
        }
    }

    pub fn issue(&self, account_id: i64) -> Result<String, TokenError> {
        self.issue_at(account_id, Utc::now())
    }

    pub(crate) fn issue_at(
        &self,
        account_id: i64,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let expires_at = Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .ok_or_else(|| {
                error!(ttl_secs = self.ttl.as_secs(), "Token lifetime out of range");
                TokenError::Signing("token lifetime out of range".to_string())
            })?;

        let claims = Claims {
            sub: account_id.to_string(),
            account_id,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, account_id = account_id, "JWT encoding error");
            TokenError::Signing(e.to_string())
        })
    }

    /// Returns the account id the token was issued for.
    pub fn verify(&self, token: &str) -> Result<i64, TokenError> {
        // Checked against our own constant, never against what the header claims.
        let header = decode_header(token).map_err(|e| {
            debug!(error = %e, "Rejecting token with undecodable header");
            TokenError::InvalidToken
        })?;
        if header.alg != SIGNING_ALGORITHM {
            debug!(alg = ?header.alg, "Rejecting token with unexpected algorithm");
            return Err(TokenError::InvalidToken);
        }

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            debug!(error = %e, "Token validation failed");
            TokenError::InvalidToken
        })?;
        let claims = data.claims;

        // exp is validated above with zero leeway; this keeps `now > exp` exact
        if Utc::now().timestamp() > claims.exp {
            return Err(TokenError::InvalidToken);
        }
        if claims.sub != claims.account_id.to_string() {
            debug!("Token subject does not match account id");
            return Err(TokenError::InvalidToken);
        }

        Ok(claims.account_id)
    }
}
