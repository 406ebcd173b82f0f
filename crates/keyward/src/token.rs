use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Length of a rendered session token: a lowercase hex SHA-256 digest.
pub const TOKEN_LEN: usize = 64;

/// Generate a fresh opaque session token.
///
/// Draws 256 bits from the operating system's CSPRNG and renders their
/// SHA-256 digest as 64 lowercase hex characters.
pub fn generate_token() -> String {
    let mut seed = [0u8; 32];
    OsRng.fill_bytes(&mut seed);

    let mut hasher = Sha256::new();
    hasher.update(seed);
    hex::encode(hasher.finalize())
}
