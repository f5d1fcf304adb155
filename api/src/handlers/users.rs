use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::Value;

use crate::{
    error::AppError,
    extract::{AuthUser, JsonBody},
    models::{profile_update::ProfileChange, user::User},
    repo, AppState,
};

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub message: &'static str,
    pub user: User,
}

// PUT /api/users/profile
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<ProfileResponse>, AppError> {
    let changes = ProfileChange::collect(user.role(), &body)?;
    repo::users::update_profile(&state.db, user.id, &changes).await?;
    tracing::debug!("User {} updated {} profile field(s)", user.id, changes.len());

    let user = repo::users::find_by_id(&state.db, user.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(Json(ProfileResponse {
        message: "Profile updated successfully",
        user,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use super::*;
    use crate::test_support::{bearer, doctor, insert_user, json, patient, send, test_state};

    #[tokio::test]
    async fn updates_allowed_fields_and_drops_the_rest() {
        let state = test_state().await;
        let user = insert_user(&state.db, "doc@x.com", doctor("cardiology")).await;

        let (status, body) = send(
            &state,
            json(
                Method::PUT,
                "/api/users/profile",
                Some(&bearer(&state, &user)),
                json!({
                    "first_name": "Meredith",
                    "specialty": "surgery",
                    "email": "hijack@x.com",
                    "verification_status": "verified",
                    "gender": "female",
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["message"], "Profile updated successfully");
        assert_eq!(body["user"]["first_name"], "Meredith");
        assert_eq!(body["user"]["specialty"], "surgery");
        assert_eq!(body["user"]["email"], "doc@x.com");
        assert_eq!(body["user"]["verification_status"], "pending");
        assert!(body["user"].get("gender").is_none());
        assert!(body["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn nothing_allowed_is_a_bad_request_and_changes_nothing() {
        let state = test_state().await;
        let user = insert_user(&state.db, "pat@x.com", patient()).await;
        let auth = bearer(&state, &user);

        for body in [json!({}), json!({ "email": "x@y.z", "specialty": "surgery" })] {
            let (status, response) =
                send(&state, json(Method::PUT, "/api/users/profile", Some(&auth), body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(response["error"], "No valid fields to update");
        }

        let stored = repo::users::find_by_id(&state.db, user.id).await.unwrap().unwrap();
        assert_eq!(stored.email, user.email);
        assert_eq!(stored.profile, user.profile);
        assert_eq!(stored.updated_at, user.updated_at);
    }

    #[tokio::test]
    async fn malformed_value_changes_nothing() {
        let state = test_state().await;
        let user = insert_user(&state.db, "pat@x.com", patient()).await;

        let (status, _) = send(
            &state,
            json(
                Method::PUT,
                "/api/users/profile",
                Some(&bearer(&state, &user)),
                json!({ "first_name": "Changed", "date_of_birth": "yesterday" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let stored = repo::users::find_by_id(&state.db, user.id).await.unwrap().unwrap();
        assert_eq!(stored.first_name, user.first_name);
    }

    #[tokio::test]
    async fn requires_authentication() {
        let state = test_state().await;
        let (status, _) = send(
            &state,
            json(Method::PUT, "/api/users/profile", None, json!({ "first_name": "X" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_json_body_is_a_json_bad_request() {
        let state = test_state().await;
        let user = insert_user(&state.db, "pat@x.com", patient()).await;

        let request = axum::http::Request::builder()
            .method(Method::PUT)
            .uri("/api/users/profile")
            .header(axum::http::header::AUTHORIZATION, bearer(&state, &user))
            .header(axum::http::header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from("{\"first_name\": "))
            .unwrap();
        let (status, body) = send(&state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string(), "{body}");

        let (status, body) = send(
            &state,
            json(Method::PUT, "/api/users/profile", Some(&bearer(&state, &user)), json!([1, 2])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Request body must be a JSON object");
    }
}
