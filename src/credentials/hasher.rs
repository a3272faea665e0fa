use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const OUTPUT_LEN: usize = 32;
const DECOY_SALT: [u8; SALT_LEN] = [0x5a; SALT_LEN];

/// Iteration count used when none is configured (tens of milliseconds per hash).
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Salted, slow, one-way password hasher.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: u32,
}

impl PasswordHasher {
    /// Create a hasher producing hashes with `iterations` PBKDF2 rounds.
    ///
    /// A zero count is raised to one; PBKDF2 is undefined for zero rounds.
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    /// Rounds used for new hashes
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash a password with a fresh random salt.
    pub async fn hash(&self, password: &str) -> Result<String, HashError> {
        let password = password.to_string();
        let iterations = self.iterations;
        tokio::task::spawn_blocking(move || hash_with_salt(&password, &random_salt(), iterations))
            .await
            .map_err(|e| HashError(format!("hashing task failed: {}", e)))
    }

    /// Check a password against an encoded hash.
    ///
    /// Any failure (malformed hash, task failure) is a non-match.
    pub async fn verify(&self, password: &str, encoded: &str) -> bool {
        let password = password.to_string();
        let encoded = encoded.to_string();
        tokio::task::spawn_blocking(move || verify_encoded(&password, &encoded))
            .await
            .unwrap_or(false)
    }

    /// Run one derivation at the configured cost and report a non-match.
    ///
    /// Used when there is no stored hash to check against, so a missing
    /// account costs as much as a wrong password.
    pub async fn verify_decoy(&self, password: &str) -> bool {
        let password = password.to_string();
        let iterations = self.iterations;
        let _ = tokio::task::spawn_blocking(move || derive(&password, &DECOY_SALT, iterations)).await;
        false
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

fn random_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; OUTPUT_LEN] {
    let mut out = [0u8; OUTPUT_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

fn hash_with_salt(password: &str, salt: &[u8], iterations: u32) -> String {
    let digest = derive(password, salt, iterations);
    format!(
        "{}${}${}${}",
        SCHEME,
        iterations,
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(digest)
    )
}

fn verify_encoded(password: &str, encoded: &str) -> bool {
    let Some((iterations, salt, expected)) = parse_encoded(encoded) else {
        return false;
    };
    if expected.len() != OUTPUT_LEN {
        return false;
    }

    let actual = derive(password, &salt, iterations);
    actual[..].ct_eq(&expected[..]).into()
}

/// Split an encoded hash into (iterations, salt, digest).
fn parse_encoded(encoded: &str) -> Option<(u32, Vec<u8>, Vec<u8>)> {
    let mut parts = encoded.split('$');
    if parts.next()? != SCHEME {
        return None;
    }
    let iterations: u32 = parts.next()?.parse().ok().filter(|n| *n > 0)?;
    let salt = STANDARD_NO_PAD.decode(parts.next()?).ok()?;
    let digest = STANDARD_NO_PAD.decode(parts.next()?).ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((iterations, salt, digest))
}

/// Password hashing failed before producing a hash.
#[derive(Debug, Clone, PartialEq)]
pub struct HashError(pub String);

impl std::fmt::Display for HashError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Password hashing failed: {}", self.0)
    }
}

impl std::error::Error for HashError {}
