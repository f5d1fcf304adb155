use std::{fmt, str::FromStr};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::{
    error::AppError,
    models::{document::Document, verification::VerificationStatus},
};

pub const DEFAULT_ADMIN_PERMISSIONS: [&str; 3] =
    ["manage_users", "verify_doctors", "view_analytics"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Doctor,
    Patient,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::Patient => "patient",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "doctor" => Ok(Role::Doctor),
            "patient" => Ok(Role::Patient),
            "admin" => Ok(Role::Admin),
            _ => Err(AppError::bad_request(format!("Invalid role: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl FromStr for Gender {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(AppError::bad_request(format!("Invalid gender: {s}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoctorProfile {
    pub specialty: Option<String>,
    pub country: Option<String>,
    pub verification_status: VerificationStatus,
    pub license_number: Option<String>,
    pub years_of_experience: Option<i64>,
    pub about: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientProfile {
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub emergency_contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminProfile {
    pub permissions: Vec<String>,
}

/// Role tag plus the fields that only exist for that role. Flattened into
/// [`User`] so the wire shape is one object with a `role` key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Profile {
    Doctor(DoctorProfile),
    Patient(PatientProfile),
    Admin(AdminProfile),
}

impl Profile {
    pub fn role(&self) -> Role {
        match self {
            Profile::Doctor(_) => Role::Doctor,
            Profile::Patient(_) => Role::Patient,
            Profile::Admin(_) => Role::Admin,
        }
    }

    pub fn new_patient() -> Self {
        Profile::Patient(PatientProfile {
            date_of_birth: None,
            gender: None,
            emergency_contact: None,
        })
    }

    pub fn new_admin() -> Self {
        Profile::Admin(AdminProfile {
            permissions: DEFAULT_ADMIN_PERMISSIONS.map(String::from).to_vec(),
        })
    }
}

/// Emails are stored and looked up trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A user as returned by the API. It has no password field:
/// the hash is only ever read through [`Credentials`].
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub is_verified: bool,
    pub profile_image: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    #[serde(flatten)]
    pub profile: Profile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<Document>>,
}

impl User {
    pub fn role(&self) -> Role {
        self.profile.role()
    }

    pub fn with_documents(mut self, documents: Vec<Document>) -> Self {
        self.documents = Some(documents);
        self
    }
}

/// Flat `users` row, minus the password hash.
#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub is_verified: bool,
    pub profile_image: Option<String>,
    pub specialty: Option<String>,
    pub country: Option<String>,
    pub verification_status: Option<VerificationStatus>,
    pub license_number: Option<String>,
    pub years_of_experience: Option<i64>,
    pub about: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub emergency_contact: Option<String>,
    pub permissions: Option<Json<Vec<String>>>,
    #[sqlx(default)]
    pub document_count: Option<i64>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let profile = match row.role {
            Role::Doctor => Profile::Doctor(DoctorProfile {
                specialty: row.specialty,
                country: row.country,
                verification_status: row.verification_status.ok_or_else(|| {
                    AppError::Internal(format!("doctor {id} has no verification status"))
                })?,
                license_number: row.license_number,
                years_of_experience: row.years_of_experience,
                about: row.about,
            }),
            Role::Patient => Profile::Patient(PatientProfile {
                date_of_birth: row.date_of_birth,
                gender: row.gender,
                emergency_contact: row.emergency_contact,
            }),
            Role::Admin => Profile::Admin(AdminProfile {
                permissions: row.permissions.map(|Json(p)| p).unwrap_or_default(),
            }),
        };

        Ok(User {
            id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            is_verified: row.is_verified,
            profile_image: row.profile_image,
            created_at: row.created_at,
            updated_at: row.updated_at,
            profile,
            document_count: row.document_count,
            documents: None,
        })
    }
}

/// The only row type that carries the password hash. Used by login.
#[derive(Debug, sqlx::FromRow)]
pub struct Credentials {
    pub id: i64,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub profile_image: Option<String>,
    pub is_verified: bool,
    pub profile: Profile,
}

/// Reduced doctor view for the public directory.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DoctorCard {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub specialty: Option<String>,
    pub country: Option<String>,
    pub years_of_experience: Option<i64>,
    pub about: Option<String>,
    pub profile_image: Option<String>,
}
