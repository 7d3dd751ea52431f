use std::fs;
use std::path::Path;

use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};

const TOKEN_PREFIX: &str = "canvas";
const SECRET_BYTES: usize = 24;

/// Generates a new admin token with the format: canvas_<48 hex chars>
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill(&mut bytes);
    format!("{TOKEN_PREFIX}_{}", hex::encode(bytes))
}

/// SHA-256 of the raw token, hex encoded. Only this is kept in memory.
#[must_use]
pub fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.trim().as_bytes()))
}

/// Compares the digest of `token` with `expected` in constant time.
#[must_use]
pub fn token_matches(token: &str, expected: &str) -> bool {
    digest(token).as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Reads the admin token file and returns its digest.
pub fn load_token_digest(path: &Path) -> Result<String> {
    let raw = fs::read_to_string(path)?;
    let token = raw.trim();
    if !token.starts_with(&format!("{TOKEN_PREFIX}_")) {
        return Err(Error::Config(format!(
            "{} does not contain an admin token",
            path.display()
        )));
    }
    Ok(digest(token))
}

/// Writes a fresh token to `path`. Refuses to replace an existing one.
pub fn write_new_token(path: &Path) -> Result<String> {
    if path.exists() {
        return Err(Error::AlreadyExists);
    }
    let token = generate_token();
    fs::write(path, &token)?;

    #[cfg(unix)]
    set_restrictive_permissions(path);

    Ok(token)
}

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}
