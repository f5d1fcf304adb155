use sqlx::{SqliteConnection, SqlitePool};

use crate::{models::document::Document, uploads::StoredFile};

pub async fn insert(
    conn: &mut SqliteConnection,
    user_id: i64,
    file: &StoredFile,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO documents (user_id, name, media_type, file_path) \
         VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(user_id)
    .bind(&file.original_name)
    .bind(&file.media_type)
    .bind(&file.stored_name)
    .fetch_one(&mut *conn)
    .await
}

pub async fn for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Document>, sqlx::Error> {
    sqlx::query_as::<_, Document>(
        "SELECT id, user_id, name, media_type, file_path, uploaded_at \
         FROM documents WHERE user_id = ? ORDER BY id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Document>, sqlx::Error> {
    sqlx::query_as::<_, Document>(
        "SELECT id, user_id, name, media_type, file_path, uploaded_at \
         FROM documents WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}
