use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::{header, request::Parts},
};

use crate::{
    error::AppError,
    models::user::{Role, User},
    repo, AppState,
};

/// [`axum::Json`] whose rejection is an [`AppError`], so malformed bodies get
/// the usual `{ "error": ... }` 400.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// The caller behind a valid bearer token, loaded fresh from the database.
pub struct AuthUser(pub User);

/// An [`AuthUser`] whose role is admin.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AppError::Unauthorized("Access token required"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized("Invalid authorization format"))?;

        let claims = state
            .tokens
            .verify(token)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token"))?;
        let user_id = claims
            .user_id()
            .ok_or(AppError::Unauthorized("Invalid or expired token"))?;

        // Tokens outlive deleted accounts
        let user = repo::users::find_by_id(&state.db, user_id)
            .await?
            .ok_or(AppError::Unauthorized("Invalid or expired token"))?;

        Ok(AuthUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.role() != Role::Admin {
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}
