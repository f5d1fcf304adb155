use serde::Serialize;
use sqlx::{types::Json, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::{
    error::AppError,
    models::{
        profile_update::ProfileChange,
        user::{Credentials, DoctorCard, NewUser, Profile, Role, User, UserRow},
        verification::VerificationStatus,
    },
    repo::documents,
};

// Column list shared by every query that builds a `UserRow`. Never includes
// the password hash.
macro_rules! user_columns {
    () => {
        "u.id AS id, u.email AS email, u.first_name AS first_name, \
         u.last_name AS last_name, u.role AS role, u.phone AS phone, \
         u.created_at AS created_at, u.updated_at AS updated_at, \
         u.is_verified AS is_verified, u.profile_image AS profile_image, \
         u.specialty AS specialty, u.country AS country, \
         u.verification_status AS verification_status, \
         u.license_number AS license_number, \
         u.years_of_experience AS years_of_experience, u.about AS about, \
         u.date_of_birth AS date_of_birth, u.gender AS gender, \
         u.emergency_contact AS emergency_contact, u.permissions AS permissions"
    };
}

#[derive(Debug, Default, Clone)]
pub struct UserFilter {
    pub search: Option<String>,
    pub role: Option<Role>,
    /// Only applied when `role` is `Doctor`.
    pub status: Option<VerificationStatus>,
}

#[derive(Debug, Default, Clone)]
pub struct DirectoryFilter {
    pub search: Option<String>,
    pub specialty: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_users: i64,
    pub total_doctors: i64,
    pub total_patients: i64,
    pub pending_verifications: i64,
}

pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

pub async fn insert(conn: &mut SqliteConnection, user: &NewUser) -> Result<i64, sqlx::Error> {
    let (doctor, patient, admin) = match &user.profile {
        Profile::Doctor(d) => (Some(d), None, None),
        Profile::Patient(p) => (None, Some(p), None),
        Profile::Admin(a) => (None, None, Some(a)),
    };

    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO users (
            email, password_hash, first_name, last_name, role, phone,
            is_verified, profile_image,
            specialty, country, verification_status, license_number,
            years_of_experience, about,
            date_of_birth, gender, emergency_contact,
            permissions
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(user.profile.role())
    .bind(&user.phone)
    .bind(user.is_verified)
    .bind(&user.profile_image)
    .bind(doctor.and_then(|d| d.specialty.clone()))
    .bind(doctor.and_then(|d| d.country.clone()))
    .bind(doctor.map(|d| d.verification_status))
    .bind(doctor.and_then(|d| d.license_number.clone()))
    .bind(doctor.and_then(|d| d.years_of_experience))
    .bind(doctor.and_then(|d| d.about.clone()))
    .bind(patient.and_then(|p| p.date_of_birth))
    .bind(patient.and_then(|p| p.gender))
    .bind(patient.and_then(|p| p.emergency_contact.clone()))
    .bind(admin.map(|a| Json(a.permissions.clone())))
    .fetch_one(&mut *conn)
    .await
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, AppError> {
    let row = sqlx::query_as::<_, UserRow>(concat!(
        "SELECT ",
        user_columns!(),
        " FROM users u WHERE u.id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(User::try_from).transpose()
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, AppError> {
    let row = sqlx::query_as::<_, UserRow>(concat!(
        "SELECT ",
        user_columns!(),
        " FROM users u WHERE u.email = ?"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    row.map(User::try_from).transpose()
}

/// Like [`find_by_id`], with the document list attached for doctors.
pub async fn find_with_documents(pool: &SqlitePool, id: i64) -> Result<Option<User>, AppError> {
    let Some(user) = find_by_id(pool, id).await? else {
        return Ok(None);
    };
    if user.role() != Role::Doctor {
        return Ok(Some(user));
    }
    let documents = documents::for_user(pool, id).await?;
    Ok(Some(user.with_documents(documents)))
}

pub async fn find_credentials(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<Credentials>, sqlx::Error> {
    sqlx::query_as::<_, Credentials>("SELECT id, password_hash FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Admin listing. Every user carries its `document_count`; newest first.
pub async fn list(pool: &SqlitePool, filter: &UserFilter) -> Result<Vec<User>, AppError> {
    let mut query = QueryBuilder::<Sqlite>::new(concat!(
        "SELECT ",
        user_columns!(),
        ", COUNT(d.id) AS document_count \
         FROM users u LEFT JOIN documents d ON d.user_id = u.id \
         WHERE 1 = 1"
    ));

    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        query
            .push(" AND (u.first_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.last_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.email LIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(role) = filter.role {
        query.push(" AND u.role = ").push_bind(role);
    }

    if let (Some(Role::Doctor), Some(status)) = (filter.role, filter.status) {
        query.push(" AND u.verification_status = ").push_bind(status);
    }

    query.push(" GROUP BY u.id ORDER BY u.created_at DESC, u.id DESC");

    let rows = query.build_query_as::<UserRow>().fetch_all(pool).await?;
    rows.into_iter().map(User::try_from).collect()
}

pub async fn update_profile(
    pool: &SqlitePool,
    id: i64,
    changes: &[ProfileChange],
) -> Result<(), sqlx::Error> {
    let mut query = QueryBuilder::<Sqlite>::new("UPDATE users SET ");

    let mut assignments = query.separated(", ");
    for change in changes {
        assignments.push(change.column());
        assignments.push_unseparated(" = ");
        match change {
            ProfileChange::FirstName(v) | ProfileChange::LastName(v) => {
                assignments.push_bind_unseparated(v.clone());
            }
            ProfileChange::Phone(v)
            | ProfileChange::Specialty(v)
            | ProfileChange::Country(v)
            | ProfileChange::LicenseNumber(v)
            | ProfileChange::About(v)
            | ProfileChange::EmergencyContact(v) => {
                assignments.push_bind_unseparated(v.clone());
            }
            ProfileChange::YearsOfExperience(v) => {
                assignments.push_bind_unseparated(*v);
            }
            ProfileChange::DateOfBirth(v) => {
                assignments.push_bind_unseparated(*v);
            }
            ProfileChange::Gender(v) => {
                assignments.push_bind_unseparated(*v);
            }
        }
    }

    query
        .push(", updated_at = CURRENT_TIMESTAMP WHERE id = ")
        .push_bind(id);
    query.build().execute(pool).await?;
    Ok(())
}

/// Moves a doctor to `status`. Returns `false` when `id` is not a doctor.
pub async fn set_verification_status(
    pool: &SqlitePool,
    id: i64,
    status: VerificationStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users \
         SET verification_status = ?, is_verified = ?, updated_at = CURRENT_TIMESTAMP \
         WHERE id = ? AND role = ?",
    )
    .bind(status)
    .bind(status.is_verified())
    .bind(id)
    .bind(Role::Doctor)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn stats(pool: &SqlitePool) -> Result<Stats, sqlx::Error> {
    sqlx::query_as::<_, Stats>(
        "SELECT \
            COUNT(*) AS total_users, \
            COALESCE(SUM(role = 'doctor'), 0) AS total_doctors, \
            COALESCE(SUM(role = 'patient'), 0) AS total_patients, \
            COALESCE(SUM(role = 'doctor' AND verification_status = 'pending'), 0) \
                AS pending_verifications \
         FROM users",
    )
    .fetch_one(pool)
    .await
}

/// Deletes a user; their document rows go with them.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_verified_doctors(
    pool: &SqlitePool,
    filter: &DirectoryFilter,
) -> Result<Vec<DoctorCard>, sqlx::Error> {
    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT id, first_name, last_name, specialty, country, \
                years_of_experience, about, profile_image \
         FROM users WHERE role = ",
    );
    query
        .push_bind(Role::Doctor)
        .push(" AND verification_status = ")
        .push_bind(VerificationStatus::Verified);

    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        query
            .push(" AND (first_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR last_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR specialty LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(specialty) = &filter.specialty {
        query.push(" AND specialty = ").push_bind(specialty.clone());
    }
    if let Some(country) = &filter.country {
        query.push(" AND country = ").push_bind(country.clone());
    }

    query.push(" ORDER BY last_name, first_name, id");
    query.build_query_as::<DoctorCard>().fetch_all(pool).await
}
