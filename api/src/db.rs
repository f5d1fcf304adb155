use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::{
    error::AppError,
    models::user::{normalize_email, NewUser, Profile, Role},
    password, repo,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('doctor', 'patient', 'admin')),
        phone TEXT,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        is_verified BOOLEAN NOT NULL DEFAULT 0,
        profile_image TEXT,

        specialty TEXT,
        country TEXT,
        verification_status TEXT CHECK (verification_status IN ('pending', 'verified', 'rejected')),
        license_number TEXT,
        years_of_experience INTEGER,
        about TEXT,

        date_of_birth TEXT,
        gender TEXT CHECK (gender IN ('male', 'female', 'other')),
        emergency_contact TEXT,

        permissions TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_users_role ON users (role)",
    "CREATE INDEX IF NOT EXISTS idx_users_verification_status ON users (verification_status)",
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        media_type TEXT NOT NULL,
        file_path TEXT NOT NULL,
        uploaded_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_documents_user_id ON documents (user_id)",
];

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

/// Creates tables and indexes if they are missing. Safe to run on every start.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Inserts the default administrator unless the email is already taken.
pub async fn seed_admin(pool: &SqlitePool, email: &str, password: &str) -> Result<(), AppError> {
    let email = normalize_email(email);
    let email = email.as_str();
    match repo::users::find_by_email(pool, email).await? {
        Some(user) if user.role() == Role::Admin => return Ok(()),
        Some(user) => {
            tracing::warn!("{} is registered as a {}; default admin not created", email, user.role());
            return Ok(());
        }
        None => {}
    }

    let admin = NewUser {
        email: email.to_string(),
        password_hash: password::hash_password(password.to_string()).await?,
        first_name: "Admin".to_string(),
        last_name: "User".to_string(),
        phone: None,
        profile_image: None,
        is_verified: true,
        profile: Profile::new_admin(),
    };
    let mut conn = pool.acquire().await?;
    let id = repo::users::insert(&mut conn, &admin).await?;
    tracing::info!("Default admin user created (id {}, {})", id, email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_pool;

    #[tokio::test]
    async fn schema_is_idempotent() {
        let pool = memory_pool().await;
        init_schema(&pool).await.unwrap();
        init_schema(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn admin_is_seeded_once() {
        let pool = memory_pool().await;
        seed_admin(&pool, "admin@medicalvance.com", "admin123").await.unwrap();
        seed_admin(&pool, "admin@medicalvance.com", "admin123").await.unwrap();

        let admins = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(admins, 1);

        let admin = repo::users::find_by_email(&pool, "admin@medicalvance.com")
            .await
            .unwrap()
            .unwrap();
        assert!(admin.is_verified);
        assert_eq!(admin.profile, Profile::new_admin());
    }

    #[tokio::test]
    async fn admin_email_held_by_another_role_is_left_alone() {
        let pool = memory_pool().await;
        let patient = crate::test_support::insert_user(
            &pool,
            "admin@medicalvance.com",
            crate::test_support::patient(),
        )
        .await;

        seed_admin(&pool, "admin@medicalvance.com", "admin123").await.unwrap();

        let user = repo::users::find_by_email(&pool, "admin@medicalvance.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, patient.id);
        assert_eq!(user.role(), Role::Patient);
    }

    #[tokio::test]
    async fn seeded_admin_email_is_normalized() {
        let pool = memory_pool().await;
        seed_admin(&pool, "  Admin@MedicalVance.com ", "admin123").await.unwrap();

        let admin = repo::users::find_by_email(&pool, "admin@medicalvance.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role(), Role::Admin);

        seed_admin(&pool, "ADMIN@medicalvance.com", "admin123").await.unwrap();
        let admins = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(admins, 1);
    }
}
