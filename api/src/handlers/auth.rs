use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    error::AppError,
    extract::{AuthUser, JsonBody},
    models::{
        profile_update::{parse_date, parse_years},
        user::{
            normalize_email, DoctorProfile, Gender, NewUser, PatientProfile, Profile, Role, User,
        },
        verification::VerificationStatus,
    },
    password, repo,
    uploads::{IncomingFile, StoredFile, UploadError, MAX_DOCUMENTS, MAX_PROFILE_IMAGES},
    AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct LoginPayload {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: User,
}

/// Text part of the registration form. Field names follow the browser
/// client (`firstName`, `dateOfBirth`, ...).
#[derive(Debug, Default, Validate)]
pub struct RegisterForm {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Email is invalid"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub role: String,
    pub phone: Option<String>,
    pub specialty: Option<String>,
    pub country: Option<String>,
    pub license_number: Option<String>,
    pub years_of_experience: Option<String>,
    pub about: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub emergency_contact: Option<String>,
}

impl RegisterForm {
    fn set(&mut self, name: &str, value: String) {
        match name {
            "firstName" => self.first_name = value.trim().to_string(),
            "lastName" => self.last_name = value.trim().to_string(),
            "email" => self.email = normalize_email(&value),
            "password" => self.password = value,
            "role" => self.role = value.trim().to_string(),
            "phone" => self.phone = optional(&value),
            "specialty" => self.specialty = optional(&value),
            "country" => self.country = optional(&value),
            "licenseNumber" => self.license_number = optional(&value),
            "yearsOfExperience" => self.years_of_experience = optional(&value),
            "about" => self.about = optional(&value),
            "dateOfBirth" => self.date_of_birth = optional(&value),
            "gender" => self.gender = optional(&value),
            "emergencyContact" => self.emergency_contact = optional(&value),
            _ => tracing::debug!("Ignoring unknown registration field {}", name),
        }
    }

    /// Keeps only the fields that belong to the chosen role.
    fn profile(&self, role: Role) -> Result<Profile, AppError> {
        match role {
            Role::Doctor => Ok(Profile::Doctor(DoctorProfile {
                specialty: self.specialty.clone(),
                country: self.country.clone(),
                verification_status: VerificationStatus::Pending,
                license_number: self.license_number.clone(),
                years_of_experience: self
                    .years_of_experience
                    .as_deref()
                    .map(|v| parse_years("yearsOfExperience", v))
                    .transpose()?,
                about: self.about.clone(),
            })),
            Role::Patient => Ok(Profile::Patient(PatientProfile {
                date_of_birth: self
                    .date_of_birth
                    .as_deref()
                    .map(|v| parse_date("dateOfBirth", v))
                    .transpose()?,
                gender: self.gender.as_deref().map(str::parse::<Gender>).transpose()?,
                emergency_contact: self.emergency_contact.clone(),
            })),
            Role::Admin => Err(AppError::bad_request("Role must be doctor or patient")),
        }
    }
}

#[derive(Debug, Default)]
struct RegisterUploads {
    documents: Vec<IncomingFile>,
    profile_image: Option<IncomingFile>,
}

async fn read_register_form(
    mut multipart: Multipart,
) -> Result<(RegisterForm, RegisterUploads), AppError> {
    let mut form = RegisterForm::default();
    let mut uploads = RegisterUploads::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "documents" | "profileImage" => {
                let original_name = field.file_name().unwrap_or_default().to_string();
                let media_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                // Browsers send an empty part for an untouched file input
                if original_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                let file = IncomingFile {
                    original_name,
                    media_type,
                    bytes,
                };
                if name == "documents" {
                    if uploads.documents.len() == MAX_DOCUMENTS {
                        return Err(UploadError::TooMany("documents").into());
                    }
                    uploads.documents.push(file);
                } else {
                    if uploads.profile_image.is_some() {
                        return Err(UploadError::TooMany("profileImage").into());
                    }
                    uploads.profile_image = Some(file);
                }
            }
            _ => {
                let value = field.text().await?;
                form.set(&name, value);
            }
        }
    }

    Ok((form, uploads))
}

// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let (form, uploads) = read_register_form(multipart).await?;
    form.validate()?;

    let role: Role = form.role.parse()?;
    let profile = form.profile(role)?;

    // Check if user exists
    if repo::users::email_exists(&state.db, &form.email).await? {
        return Err(AppError::UserExists);
    }

    // Reject bad files before anything touches the disk
    let documents = match role {
        Role::Doctor => uploads.documents,
        _ => Vec::new(),
    };
    let mut accepted = Vec::with_capacity(documents.len() + MAX_PROFILE_IMAGES);
    for file in documents {
        let extension = state.uploads.check(&file)?;
        accepted.push(("documents", extension, file));
    }
    if let Some(file) = uploads.profile_image {
        let extension = state.uploads.check(&file)?;
        accepted.push(("profileImage", extension, file));
    }

    let password_hash = password::hash_password(form.password.clone()).await?;

    let mut stored_documents: Vec<StoredFile> = Vec::new();
    let mut profile_image: Option<StoredFile> = None;
    for (field, extension, file) in accepted {
        let stored = match state.uploads.save(field, extension, file).await {
            Ok(stored) => stored,
            Err(e) => {
                discard(&state, &stored_documents, profile_image.as_ref()).await;
                return Err(e.into());
            }
        };
        if field == "documents" {
            stored_documents.push(stored);
        } else {
            profile_image = Some(stored);
        }
    }

    let new_user = NewUser {
        email: form.email,
        password_hash,
        first_name: form.first_name,
        last_name: form.last_name,
        phone: form.phone,
        profile_image: profile_image.as_ref().map(|f| f.stored_name.clone()),
        is_verified: false,
        profile,
    };

    let user_id = match insert_with_documents(&state, &new_user, &stored_documents).await {
        Ok(id) => id,
        Err(e) => {
            discard(&state, &stored_documents, profile_image.as_ref()).await;
            return Err(e);
        }
    };
    tracing::info!("Registered {} {} with {} document(s)", role, user_id, stored_documents.len());

    let user = repo::users::find_with_documents(&state.db, user_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    let token = state.tokens.issue(&user)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            token,
            user,
        }),
    ))
}

async fn insert_with_documents(
    state: &AppState,
    new_user: &NewUser,
    documents: &[StoredFile],
) -> Result<i64, AppError> {
    let mut tx = state.db.begin().await?;
    let user_id = repo::users::insert(&mut tx, new_user).await?;
    for document in documents {
        repo::documents::insert(&mut tx, user_id, document).await?;
    }
    tx.commit().await?;
    Ok(user_id)
}

async fn discard(state: &AppState, documents: &[StoredFile], profile_image: Option<&StoredFile>) {
    let names: Vec<&str> = documents
        .iter()
        .chain(profile_image)
        .map(|f| f.stored_name.as_str())
        .collect();
    state.uploads.remove_all(&names).await;
}

// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate()?;
    let email = normalize_email(&payload.email);

    // Unknown email and wrong password must look the same to the caller,
    // in body and in time spent
    let Some(credentials) = repo::users::find_credentials(&state.db, &email).await? else {
        password::verify_unknown_account(payload.password).await?;
        return Err(AppError::InvalidCredentials);
    };

    if !password::verify_password(payload.password, credentials.password_hash).await? {
        return Err(AppError::InvalidCredentials);
    }

    let user = repo::users::find_with_documents(&state.db, credentials.id)
        .await?
        .ok_or(AppError::InvalidCredentials)?;
    let token = state.tokens.issue(&user)?;

    Ok(Json(AuthResponse {
        message: "Login successful",
        token,
        user,
    }))
}

// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<UserEnvelope>, AppError> {
    let user = match user.role() {
        Role::Doctor => {
            let documents = repo::documents::for_user(&state.db, user.id).await?;
            user.with_documents(documents)
        }
        _ => user,
    };
    Ok(Json(UserEnvelope { user }))
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
