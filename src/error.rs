use crate::auth::HeaderError;
use crate::credentials::HashError;
use crate::identity::StoreError;
use crate::token::TokenError;

/// Errors surfaced by the identity service operations
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    /// No Authorization header on a request that requires one
    AuthHeaderMissing,
    /// Header not "Bearer <token>", or the token fails signature/encoding checks
    TokenMalformed(String),
    TokenExpired,
    /// Wrong email or wrong password; the two are not distinguished
    InvalidCredentials,
    /// The subject no longer resolves to a record
    UserNotFound,
    /// The provider identity already belongs to another account
    ConflictAlreadyLinked,
    /// Provider name outside the supported set
    UnsupportedProvider(String),
    HashingFailure(String),
    /// Code exchange or profile fetch against the OAuth provider failed
    ProviderUnavailable(String),
    /// The identity store worker is gone
    StoreUnavailable,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::AuthHeaderMissing => {
                write!(f, "Please make sure your request has an Authorization header")
            }
            AuthError::TokenMalformed(msg) => write!(f, "Invalid token: {}", msg),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::InvalidCredentials => write!(f, "Invalid email and/or password"),
            AuthError::UserNotFound => write!(f, "User not found"),
            AuthError::ConflictAlreadyLinked => {
                write!(f, "There is already an account linked to this provider identity")
            }
            AuthError::UnsupportedProvider(name) => {
                write!(f, "Unknown OAuth provider: {}", name)
            }
            AuthError::HashingFailure(msg) => write!(f, "Password hashing failed: {}", msg),
            AuthError::ProviderUnavailable(msg) => {
                write!(f, "OAuth provider request failed: {}", msg)
            }
            AuthError::StoreUnavailable => write!(f, "Identity store unavailable"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<HeaderError> for AuthError {
    fn from(e: HeaderError) -> Self {
        match e {
            HeaderError::Missing => AuthError::AuthHeaderMissing,
            other => AuthError::TokenMalformed(other.to_string()),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Malformed(msg) => AuthError::TokenMalformed(msg),
            TokenError::Expired => AuthError::TokenExpired,
        }
    }
}

impl From<HashError> for AuthError {
    fn from(e: HashError) -> Self {
        AuthError::HashingFailure(e.0)
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Closed => AuthError::StoreUnavailable,
            StoreError::ProviderAlreadyLinked => AuthError::ConflictAlreadyLinked,
        }
    }
}
