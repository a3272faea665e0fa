//! Session tokens.
//!
//! Tokens are HS256 JSON Web Tokens: base64url (no padding) header, payload
//! and signature joined by dots. The payload carries exactly `sub`, `iat`
//! and `exp`. Nothing is stored server-side; a token is valid while its
//! signature checks out under the current secret and `exp` lies in the future.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;


type HmacSha256 = Hmac<Sha256>;

/// Default session lifetime
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 14;

/// Longest session lifetime accepted from configuration
pub const MAX_TOKEN_TTL_DAYS: i64 = 3650;

/// Token payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity record id
    pub sub: Uuid,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

impl Header {
    fn hs256() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Issues and verifies signed session tokens.
///
/// The signing secret is supplied at construction; replacing the service with
/// one built from a new secret invalidates every outstanding token.
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenService {
    /// Service signing with `secret`; tokens live for `ttl`.
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    /// Service with the default 14-day lifetime
    pub fn with_default_ttl(secret: impl Into<Vec<u8>>) -> Self {
        Self::new(secret, Duration::days(DEFAULT_TOKEN_TTL_DAYS))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `subject`, valid from now for the configured lifetime.
    pub fn issue(&self, subject: Uuid) -> Result<String, TokenError> {
        self.issue_at(subject, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, subject: Uuid, now: DateTime<Utc>) -> Result<String, TokenError> {
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Malformed("token lifetime out of range".to_string()))?;
        let claims = Claims {
            sub: subject,
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };

        let header_b64 = encode_segment(&Header::hs256())?;
        let claims_b64 = encode_segment(&claims)?;
        let signing_input = format!("{}.{}", header_b64, claims_b64);

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", signing_input, signature))
    }

    /// Verify signature and expiry, returning the payload.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify against `now` instead of the clock.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed("expected three segments".to_string()));
        };

        let header: Header = decode_segment(header_b64)?;
        if header.alg != "HS256" || !header.typ.eq_ignore_ascii_case("JWT") {
            return Err(TokenError::Malformed("unsupported token header".to_string()));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed("invalid signature encoding".to_string()))?;
        let mut mac = self.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::Malformed("signature verification failed".to_string()))?;

        let claims: Claims = decode_segment(claims_b64)?;
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| TokenError::Malformed(format!("invalid signing key: {}", e)))
    }
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)
        .map_err(|e| TokenError::Malformed(format!("failed to serialize segment: {}", e)))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, TokenError> {
    let raw = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed("invalid base64url segment".to_string()))?;
    serde_json::from_slice(&raw)
        .map_err(|e| TokenError::Malformed(format!("invalid segment JSON: {}", e)))
}

/// Token verification errors
#[derive(Debug, Clone, PartialEq)]
pub enum TokenError {
    /// Bad encoding, bad header or bad signature
    Malformed(String),
    /// `exp` is not in the future
    Expired,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Malformed(msg) => write!(f, "Malformed token: {}", msg),
            TokenError::Expired => write!(f, "Token has expired"),
        }
    }
}

impl std::error::Error for TokenError {}
