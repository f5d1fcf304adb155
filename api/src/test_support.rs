//! Fixtures shared by the unit tests: an in-memory database with the real
//! schema, user factories and helpers for driving the router.

use std::str::FromStr;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use fake::{
    faker::name::en::{FirstName, LastName},
    Fake,
};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::sync::OnceCell;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    db,
    models::user::{DoctorProfile, NewUser, Profile, User},
    models::verification::VerificationStatus,
    password, repo, rest,
    token::TokenKeys,
    uploads::UploadStore,
    AppState,
};

pub const TEST_PASSWORD: &str = "password123";

static TEST_PASSWORD_HASH: OnceCell<String> = OnceCell::const_new();

/// One connection only: every connection to `sqlite::memory:` is its own
/// database. Callers must not hold a connection across another query.
pub async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    db::init_schema(&pool).await.unwrap();
    pool
}

pub async fn test_state() -> AppState {
    let uploads = UploadStore::new(
        std::env::temp_dir().join(format!("medicalvance-test-{}", Uuid::new_v4())),
        1024 * 1024,
    );
    uploads.ensure_dir().await.unwrap();
    AppState {
        db: memory_pool().await,
        tokens: TokenKeys::new("test-secret", 7),
        uploads,
    }
}

pub fn doctor(specialty: &str) -> Profile {
    Profile::Doctor(DoctorProfile {
        specialty: Some(specialty.to_string()),
        country: Some("us".to_string()),
        verification_status: VerificationStatus::Pending,
        license_number: None,
        years_of_experience: None,
        about: None,
    })
}

pub fn patient() -> Profile {
    Profile::new_patient()
}

pub fn admin() -> Profile {
    Profile::new_admin()
}

/// Inserts a user whose password is [`TEST_PASSWORD`].
pub async fn insert_user(pool: &SqlitePool, email: &str, profile: Profile) -> User {
    let password_hash = TEST_PASSWORD_HASH
        .get_or_init(|| async {
            password::hash_password(TEST_PASSWORD.to_string())
                .await
                .unwrap()
        })
        .await
        .clone();

    let new_user = NewUser {
        email: email.to_string(),
        password_hash,
        first_name: FirstName().fake(),
        last_name: LastName().fake(),
        phone: None,
        profile_image: None,
        is_verified: matches!(profile, Profile::Admin(_)),
        profile,
    };
    let mut conn = pool.acquire().await.unwrap();
    let id = repo::users::insert(&mut conn, &new_user).await.unwrap();
    drop(conn);

    repo::users::find_by_id(pool, id).await.unwrap().unwrap()
}

pub fn bearer(state: &AppState, user: &User) -> String {
    format!("Bearer {}", state.tokens.issue(user).unwrap())
}

pub fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json(method: Method, uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Sends one request through a fresh router and decodes the JSON body
/// (`Value::Null` when the body is empty or not JSON).
pub async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send_raw(state, request).await;
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub async fn send_raw(state: &AppState, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = rest::router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

/// Hand-rolled `multipart/form-data` body.
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: format!("----medicalvance{}", Uuid::new_v4().simple()),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, media_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {media_type}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}
