//! JWT token utilities for member sessions.
//!
//! Access and refresh tokens are signed with separate secrets and carry
//! their kind inside the claims, so a token can never be accepted for the
//! other purpose even when its signature checks out.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::JwtConfig;

const BEARER_PREFIX: &str = "Bearer ";

/// Purpose of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn other(self) -> Self {
        match self {
            TokenKind::Access => TokenKind::Refresh,
            TokenKind::Refresh => TokenKind::Access,
        }
    }
}

/// JWT claims shared by access and refresh tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Member ID
    pub member_id: i64,
    /// Token kind
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Token issued at timestamp
    pub iat: i64,
    /// Token expiration timestamp
    pub exp: i64,
}

/// Verification failures, in priority order.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Malformed token or signature mismatch.
    #[error("TOKEN_INVALID")]
    Invalid,
    /// Signature is fine but the token is past its expiry.
    #[error("TOKEN_EXPIRED")]
    Expired,
    /// Genuine token of the other kind.
    #[error("TOKEN_TYPE_WRONG")]
    TypeWrong,
    /// Token could not be signed.
    #[error("Token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Coarse access token state used by the request gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Valid,
    Expired,
    Invalid,
}

impl From<&TokenError> for TokenStatus {
    fn from(error: &TokenError) -> Self {
        match error {
            TokenError::Expired => TokenStatus::Expired,
            _ => TokenStatus::Invalid,
        }
    }
}

/// Access and refresh token issued together at login.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct KindKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl KindKeys {
    fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }
}

/// Issues and verifies access and refresh tokens.
pub struct JwtService {
    access: KindKeys,
    refresh: KindKeys,
    validation: Validation,
}

impl JwtService {
    /// Creates a JwtService with explicit secrets and lifetimes.
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            access: KindKeys::new(access_secret, access_ttl),
            refresh: KindKeys::new(refresh_secret, refresh_ttl),
            validation,
        }
    }

    /// Creates a JwtService from loaded configuration.
    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(
            config.access_secret.as_bytes(),
            config.refresh_secret.as_bytes(),
            Duration::minutes(config.access_expire_minutes),
            Duration::days(config.refresh_expire_days),
        )
    }

    fn keys(&self, kind: TokenKind) -> &KindKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn issue_access(&self, member_id: i64) -> Result<String, TokenError> {
        self.issue(member_id, TokenKind::Access)
    }

    pub fn issue_refresh(&self, member_id: i64) -> Result<String, TokenError> {
        self.issue(member_id, TokenKind::Refresh)
    }

    /// Issues an access and refresh token for a freshly authenticated member.
    ///
    /// Either both tokens are returned or neither.
    pub fn login(&self, member_id: i64) -> Result<TokenPair, TokenError> {
        let access_token = self.issue_access(member_id)?;
        let refresh_token = self.issue_refresh(member_id)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(token, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(token, TokenKind::Refresh)
    }

    /// Classifies an access token as valid, expired or invalid.
    ///
    /// A wrong-kind token counts as invalid here.
    pub fn classify_access(&self, token: &str) -> TokenStatus {
        match self.verify_access(token) {
            Ok(_) => TokenStatus::Valid,
            Err(error) => TokenStatus::from(&error),
        }
    }

    fn issue(&self, member_id: i64, kind: TokenKind) -> Result<String, TokenError> {
        let keys = self.keys(kind);
        let now = Utc::now();

        let claims = Claims {
            member_id,
            kind,
            iat: now.timestamp(),
            exp: (now + keys.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).map_err(TokenError::Signing)
    }

    fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        match self.decode_with(token, expected) {
            Ok(claims) if claims.kind == expected => Ok(claims),
            Ok(_) => Err(TokenError::TypeWrong),
            Err(DecodeFailure::BadSignature) => {
                // Signed with the other kind's secret: genuine, but the wrong purpose.
                match self.decode_with(token, expected.other()) {
                    Ok(claims) if claims.kind != expected => Err(TokenError::TypeWrong),
                    Err(DecodeFailure::Expired) => Err(TokenError::Expired),
                    _ => Err(TokenError::Invalid),
                }
            }
            Err(DecodeFailure::Expired) => Err(TokenError::Expired),
            Err(DecodeFailure::Malformed) => Err(TokenError::Invalid),
        }
    }

    fn decode_with(&self, token: &str, kind: TokenKind) -> Result<Claims, DecodeFailure> {
        decode::<Claims>(token, &self.keys(kind).decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => DecodeFailure::BadSignature,
                ErrorKind::ExpiredSignature => DecodeFailure::Expired,
                _ => DecodeFailure::Malformed,
            })
    }
}

enum DecodeFailure {
    BadSignature,
    Expired,
    Malformed,
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
///
/// Returns `None` for a missing prefix or an empty token.
pub fn extract_bearer(header: &str) -> Option<&str> {
    header
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.is_empty())
}
