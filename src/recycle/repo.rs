use anyhow::Context;
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::AppResult;
use crate::recycle::repo_types::{Category, RecycleEntry, RecycleEntryRow};

pub async fn insert_entry_tx(
    conn: &mut SqliteConnection,
    user_id: i64,
    category: Category,
    weight_kg: f64,
    photo_path: Option<&str>,
    created_at: i64,
) -> anyhow::Result<RecycleEntry> {
    let id = sqlx::query(
        r#"
        INSERT INTO recycle_entries (user_id, category, weight_kg, photo_path, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(category.as_str())
    .bind(weight_kg)
    .bind(photo_path)
    .bind(created_at)
    .execute(&mut *conn)
    .await
    .context("insert recycle entry")?
    .last_insert_rowid();

    Ok(RecycleEntry {
        id,
        user_id,
        category,
        weight_kg,
        photo_path: photo_path.map(str::to_string),
        created_at,
    })
}

/// Entries of one user, newest first.
pub async fn list_by_user(db: &SqlitePool, user_id: i64) -> AppResult<Vec<RecycleEntry>> {
    let rows = sqlx::query_as::<_, RecycleEntryRow>(
        r#"
        SELECT id, user_id, category, weight_kg, photo_path, created_at
          FROM recycle_entries
         WHERE user_id = ?
         ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list recycle entries")?;
    rows.into_iter().map(RecycleEntry::try_from).collect()
}

pub async fn find_owned(
    db: &SqlitePool,
    user_id: i64,
    entry_id: i64,
) -> AppResult<Option<RecycleEntry>> {
    let row = sqlx::query_as::<_, RecycleEntryRow>(
        r#"
        SELECT id, user_id, category, weight_kg, photo_path, created_at
          FROM recycle_entries
         WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(entry_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("find recycle entry")?;
    row.map(RecycleEntry::try_from).transpose()
}

/// Rewrites the mutable fields; `false` when the entry is missing or not owned.
pub async fn update_owned(db: &SqlitePool, entry: &RecycleEntry) -> anyhow::Result<bool> {
    let updated = sqlx::query(
        r#"
        UPDATE recycle_entries
           SET category = ?, weight_kg = ?, photo_path = ?
         WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(entry.category.as_str())
    .bind(entry.weight_kg)
    .bind(entry.photo_path.as_deref())
    .bind(entry.id)
    .bind(entry.user_id)
    .execute(db)
    .await
    .context("update recycle entry")?
    .rows_affected();
    Ok(updated == 1)
}
