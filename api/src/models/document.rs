use serde::Serialize;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Document {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub file_path: String,
    pub uploaded_at: chrono::NaiveDateTime,
}
