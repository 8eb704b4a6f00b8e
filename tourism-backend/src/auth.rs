//! Password hashing, session tokens and the bootstrap admin account

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::config::Config;
use crate::db::Database;
use crate::errors::{ApiError, ApiResult};
use crate::models::Role;

type HmacSha256 = Hmac<Sha256>;

const HASH_VERSION: &str = "v1";
const PASSWORD_ITERATIONS: u32 = 10_000;
const SALT_BYTES: usize = 16;
const TOKEN_BYTES: usize = 32;

/// Hash a password as `v1$<iterations>$<salt hex>$<hash hex>`
pub fn hash_password(password: &str) -> ApiResult<String> {
    let mut salt = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt);
    let hash = derive(password.as_bytes(), &salt, PASSWORD_ITERATIONS)?;
    Ok(format!(
        "{}${}${}${}",
        HASH_VERSION,
        PASSWORD_ITERATIONS,
        hex::encode(salt),
        hex::encode(hash)
    ))
}

/// Check a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    let [version, iterations, salt, hash] = parts.as_slice() else {
        return false;
    };
    if *version != HASH_VERSION {
        return false;
    }
    let (Ok(iterations), Ok(salt), Ok(expected)) =
        (iterations.parse::<u32>(), hex::decode(salt), hex::decode(hash))
    else {
        return false;
    };
    if iterations == 0 {
        return false;
    }

    match derive(password.as_bytes(), &salt, iterations) {
        Ok(actual) => constant_time_eq(&actual, &expected),
        Err(_) => false,
    }
}

/// Iterated HMAC-SHA256 keyed by the password (single-block PBKDF2)
fn derive(password: &[u8], salt: &[u8], iterations: u32) -> ApiResult<[u8; 32]> {
    let mac = HmacSha256::new_from_slice(password)
        .map_err(|e| ApiError::Internal(format!("HMAC key error: {}", e)))?;

    let mut round = mac.clone();
    round.update(salt);
    round.update(&1u32.to_be_bytes());
    let mut block = [0u8; 32];
    block.copy_from_slice(&round.finalize().into_bytes());
    let mut output = block;

    for _ in 1..iterations {
        let mut round = mac.clone();
        round.update(&block);
        block.copy_from_slice(&round.finalize().into_bytes());
        for (out, b) in output.iter_mut().zip(block.iter()) {
            *out ^= b;
        }
    }
    Ok(output)
}

/// Compare two byte strings without short-circuiting on the first difference
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Random URL-safe session token
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Create the configured admin account if it does not exist yet
pub fn bootstrap_admin(db: &Database, config: &Config) -> ApiResult<()> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        log::debug!("ADMIN_EMAIL/ADMIN_PASSWORD not set, skipping admin bootstrap");
        return Ok(());
    };

    if db.get_user_by_email(email)?.is_some() {
        log::info!("Admin account {} already exists", email);
        return Ok(());
    }

    let hash = hash_password(password)?;
    let user = db.create_user(email, "Administrator", &hash, Role::Admin)?;
    log::info!("Created admin account {} (id {})", user.email, user.id);
    Ok(())
}
