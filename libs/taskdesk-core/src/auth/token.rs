//! HS256 tokens for sessions and password resets

use crate::database::mappers::to_micros;
use crate::error::{Result, TaskdeskError};
use crate::models::User;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What a token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Session,
    PasswordReset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub purpose: TokenPurpose,
    /// Account version a reset token was issued against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamp: Option<i64>,
}

/// A signed token and its lifetime in seconds
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: u64,
}

/// Issues and verifies tokens with a shared secret
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    session_ttl_secs: u64,
    reset_ttl_secs: u64,
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("reset_ttl_secs", &self.reset_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    #[must_use]
    pub fn new(secret: &[u8], session_ttl_secs: u64, reset_ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            session_ttl_secs,
            reset_ttl_secs,
        }
    }

    fn sign(&self, user_id: Uuid, purpose: TokenPurpose, ttl: u64, stamp: Option<i64>) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now.saturating_add(i64::try_from(ttl).unwrap_or(i64::MAX)),
            purpose,
            stamp,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TaskdeskError::unknown(format!("Failed to sign token: {e}")))
    }

    fn verify(&self, token: &str, purpose: TokenPurpose) -> Result<(Uuid, Claims)> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| TaskdeskError::invalid_token(e.to_string()))?
            .claims;

        if claims.purpose != purpose {
            return Err(TaskdeskError::invalid_token("wrong token purpose"));
        }
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| TaskdeskError::invalid_token("malformed subject"))?;
        Ok((user_id, claims))
    }

    /// Issue a session token for a signed-in user
    ///
    /// # Errors
    /// Returns an error if signing fails
    pub fn issue_session(&self, user_id: Uuid) -> Result<IssuedToken> {
        Ok(IssuedToken {
            token: self.sign(user_id, TokenPurpose::Session, self.session_ttl_secs, None)?,
            expires_in: self.session_ttl_secs,
        })
    }

    /// The user id a valid session token was issued to
    ///
    /// # Errors
    /// Returns `InvalidToken` for a bad signature, an expired token or a reset token
    pub fn verify_session(&self, token: &str) -> Result<Uuid> {
        self.verify(token, TokenPurpose::Session).map(|(id, _)| id)
    }

    /// Issue a password reset token bound to the user's current account version
    ///
    /// Any later change to the account (including the reset itself) invalidates it.
    ///
    /// # Errors
    /// Returns an error if signing fails
    pub fn issue_password_reset(&self, user: &User) -> Result<String> {
        self.sign(
            user.id,
            TokenPurpose::PasswordReset,
            self.reset_ttl_secs,
            Some(to_micros(&user.updated_at)),
        )
    }

    /// The user id and account version of a valid reset token
    ///
    /// # Errors
    /// Returns `InvalidToken` for a bad signature, an expired token or a session token
    pub fn verify_password_reset(&self, token: &str) -> Result<(Uuid, i64)> {
        let (user_id, claims) = self.verify(token, TokenPurpose::PasswordReset)?;
        let stamp = claims
            .stamp
            .ok_or_else(|| TaskdeskError::invalid_token("missing account stamp"))?;
        Ok((user_id, stamp))
    }

    #[must_use]
    pub fn session_ttl_secs(&self) -> u64 {
        self.session_ttl_secs
    }
}
