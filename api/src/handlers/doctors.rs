use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::user::DoctorCard,
    repo::{self, users::DirectoryFilter},
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct DirectoryParams {
    pub search: Option<String>,
    pub specialty: Option<String>,
    pub country: Option<String>,
}

impl From<DirectoryParams> for DirectoryFilter {
    fn from(params: DirectoryParams) -> Self {
        let present = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        DirectoryFilter {
            search: present(params.search),
            specialty: present(params.specialty),
            country: present(params.country),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorList {
    pub doctors: Vec<DoctorCard>,
}

// GET /api/doctors
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<DirectoryParams>,
) -> Result<Json<DoctorList>, AppError> {
    let doctors = repo::users::list_verified_doctors(&state.db, &params.into()).await?;
    Ok(Json(DoctorList { doctors }))
}
