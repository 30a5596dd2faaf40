use anyhow::anyhow;

use crate::errors::AppError;

pub const BCRYPT_COST: u32 = 12;

/// Hashes on the blocking pool; bcrypt at cost 12 takes a few hundred ms.
pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| anyhow!("password hashing task failed: {e}"))?
        .map_err(|e| AppError::Internal(anyhow!("failed to hash password: {e}")))
}

/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| anyhow!("password verification task failed: {e}"))?;
    Ok(verified.unwrap_or_else(|e| {
        tracing::warn!("Stored password hash could not be parsed: {e}");
        false
    }))
}
