//! Password hashing for identity records.
//!
//! Passwords are stored as PBKDF2-HMAC-SHA256 digests with a per-password
//! random salt. The encoded hash carries the iteration count and salt, so
//! verification needs nothing but the stored string:
//!
//! ```text
//! pbkdf2-sha256$<iterations>$<salt, base64>$<digest, base64>
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use idgate::credentials::PasswordHasher;
//!
//! # async fn demo() -> Result<(), idgate::credentials::HashError> {
//! let hasher = PasswordHasher::new(100_000);
//! let hash = hasher.hash("password_bob").await?;
//! assert!(hasher.verify("password_bob", &hash).await);
//! # Ok(())
//! # }
//! ```
//!
//! Hashing is deliberately slow, so both operations run on tokio's blocking
//! pool instead of a runtime worker thread.

mod hasher;

pub use hasher::{HashError, PasswordHasher, DEFAULT_ITERATIONS};
