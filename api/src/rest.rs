use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{admin, auth, doctors, health, users},
    AppState,
};

fn auth_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/register",
            post(auth::register).layer(DefaultBodyLimit::max(state.uploads.request_limit())),
        )
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::list_users))
        .route(
            "/users/:id",
            get(admin::user_details).delete(admin::delete_user),
        )
        .route("/users/:id/verification", put(admin::update_verification))
        .route("/stats", get(admin::stats))
        .route("/documents/:id/file", get(admin::document_file))
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health::health))
        .nest("/auth", auth_routes(&state))
        .route("/users/profile", put(users::update_profile))
        .nest("/admin", admin_routes())
        .route("/doctors", get(doctors::list));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
