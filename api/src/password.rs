use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use tokio::sync::OnceCell;

use crate::error::AppError;

// Argon2 is CPU bound; keep it off the async workers.

// Hash checked when a login names no account, so both failures cost one verify.
static UNKNOWN_ACCOUNT_HASH: OnceCell<String> = OnceCell::const_new();

pub async fn hash_password(password: String) -> Result<String, AppError> {
    let hash = tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
    })
    .await??;
    Ok(hash)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    let matches = tokio::task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&hash)?;
        Ok::<_, argon2::password_hash::Error>(
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok(),
        )
    })
    .await??;
    Ok(matches)
}

/// Burns one argon2 verification for a login whose email matched nothing.
pub async fn verify_unknown_account(password: String) -> Result<(), AppError> {
    let hash = UNKNOWN_ACCOUNT_HASH
        .get_or_try_init(|| hash_password("unknown-account".to_string()))
        .await?
        .clone();
    verify_password(password, hash).await?;
    Ok(())
}

#[cfg(test)]
pub fn unknown_account_hash_ready() -> bool {
    UNKNOWN_ACCOUNT_HASH.initialized()
}
