use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::AppError,
    extract::{AdminUser, JsonBody},
    handlers::auth::UserEnvelope,
    models::{
        user::{Role, User},
        verification::VerificationStatus,
    },
    repo::{
        self,
        users::{Stats, UserFilter},
    },
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    pub search: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
}

impl TryFrom<UserListParams> for UserFilter {
    type Error = AppError;

    fn try_from(params: UserListParams) -> Result<Self, Self::Error> {
        // Browsers send `role=` for an untouched select; treat it as absent
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        Ok(UserFilter {
            search: present(params.search).map(|s| s.trim().to_string()),
            role: present(params.role).map(|r| r.parse::<Role>()).transpose()?,
            status: present(params.status)
                .map(|s| s.parse::<VerificationStatus>())
                .transpose()?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<User>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(params): Query<UserListParams>,
) -> Result<Json<UserList>, AppError> {
    let filter = UserFilter::try_from(params)?;
    let users = repo::users::list(&state.db, &filter).await?;
    Ok(Json(UserList { users }))
}

// GET /api/admin/users/:id
pub async fn user_details(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<UserEnvelope>, AppError> {
    let user = repo::users::find_with_documents(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    Ok(Json(UserEnvelope { user }))
}

// PUT /api/admin/users/:id/verification
pub async fn update_verification(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<MessageResponse>, AppError> {
    let status: VerificationStatus = body
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .parse()?;

    if !repo::users::set_verification_status(&state.db, id, status).await? {
        return Err(AppError::NotFound("Doctor"));
    }
    tracing::info!("Admin {} set doctor {} to {}", admin.id, id, status);

    Ok(Json(MessageResponse {
        message: "Verification status updated successfully",
    }))
}

// GET /api/admin/stats
pub async fn stats(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<Stats>, AppError> {
    Ok(Json(repo::users::stats(&state.db).await?))
}

// DELETE /api/admin/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    if id == admin.id {
        return Err(AppError::bad_request("Cannot delete your own account"));
    }

    let user = repo::users::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    let documents = repo::documents::for_user(&state.db, id).await?;

    if !repo::users::delete(&state.db, id).await? {
        return Err(AppError::NotFound("User"));
    }
    tracing::info!("Admin {} deleted {} {}", admin.id, user.role(), id);

    let stored: Vec<&str> = documents
        .iter()
        .map(|d| d.file_path.as_str())
        .chain(user.profile_image.as_deref())
        .collect();
    state.uploads.remove_all(&stored).await;

    Ok(Json(MessageResponse {
        message: "User deleted successfully",
    }))
}

// GET /api/admin/documents/:id/file
pub async fn document_file(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let document = repo::documents::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("Document"))?;
    let path = state
        .uploads
        .path_of(&document.file_path)
        .ok_or(AppError::NotFound("Document"))?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("Document {} is missing at {}", id, path.display());
            return Err(AppError::NotFound("Document"));
        }
        Err(e) => return Err(e.into()),
    };

    Ok((
        [
            (header::CONTENT_TYPE, document.media_type),
            (header::CONTENT_DISPOSITION, "inline".to_string()),
        ],
        bytes,
    )
        .into_response())
}
