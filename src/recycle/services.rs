use anyhow::Context;
use sqlx::SqlitePool;
use tracing::{error, info, instrument, warn};

use crate::auth::repo::add_points_tx;
use crate::clock;
use crate::error::{AppError, AppResult};
use crate::recycle::dto::{SubmitEntryRequest, SubmitEntryResponse, UpdateEntryRequest, WeightInput};
use crate::recycle::repo;
use crate::recycle::repo_types::{Category, RecycleEntry};
use crate::rewards::{points, scanner, services::next_rewards, tiers};

fn weight_from(input: &WeightInput) -> AppResult<f64> {
    match input {
        WeightInput::Number(w) => points::validate_weight(*w),
        WeightInput::Text(raw) => points::parse_weight(raw),
    }
}

fn photo_from(raw: Option<String>) -> Option<String> {
    raw.map(|p| p.trim().to_string()).filter(|p| !p.is_empty())
}

/// Records an entry, grants its points and runs the eligibility scan.
///
/// The entry and the point grant commit together. The scan runs afterwards on
/// the new total; a resubmission is a new entry and earns points again, so
/// once the grant is committed the call succeeds. A failed scan is logged and
/// its tiers are picked up by the next scan.
#[instrument(skip(db, req))]
pub async fn submit_entry(
    db: &SqlitePool,
    user_id: i64,
    req: SubmitEntryRequest,
) -> AppResult<SubmitEntryResponse> {
    let category: Category = req.category.parse()?;
    let weight_kg = weight_from(&req.weight_kg)?;
    let photo_path = photo_from(req.photo_path);
    let points_granted = points::award(weight_kg);

    let mut tx = db.begin().await.context("begin tx")?;
    let entry = repo::insert_entry_tx(
        &mut tx,
        user_id,
        category,
        weight_kg,
        photo_path.as_deref(),
        clock::now_millis(),
    )
    .await?;
    let total_points = add_points_tx(&mut tx, user_id, points_granted).await?;
    tx.commit().await.context("commit tx")?;

    info!(user_id, %category, weight_kg, points_granted, total_points, "recycle entry saved");

    let awarded = match scanner::scan_and_award(db, user_id, total_points).await {
        Ok(awarded) => awarded,
        Err(e) => {
            error!(user_id, total_points, error = %e, "eligibility scan failed");
            Vec::new()
        }
    };
    let (next_unlockable, next_tier) = match next_rewards(db, total_points).await {
        Ok(next) => (next.next_unlockable, next.next_tier),
        Err(e) => {
            warn!(user_id, error = %e, "next reward lookup failed");
            (None, tiers::next_tier(total_points).copied())
        }
    };

    Ok(SubmitEntryResponse {
        entry,
        points_granted,
        total_points,
        awarded,
        next_unlockable,
        next_tier,
    })
}

/// Corrects an owned entry. Points already granted are left as they are.
#[instrument(skip(db, req))]
pub async fn update_entry(
    db: &SqlitePool,
    user_id: i64,
    entry_id: i64,
    req: UpdateEntryRequest,
) -> AppResult<RecycleEntry> {
    let Some(mut entry) = repo::find_owned(db, user_id, entry_id).await? else {
        warn!(user_id, entry_id, "entry not found or not owned");
        return Err(AppError::NotFound("Recycle entry not found".into()));
    };

    if let Some(category) = req.category {
        entry.category = category.parse()?;
    }
    if let Some(weight) = req.weight_kg.as_ref() {
        entry.weight_kg = weight_from(weight)?;
    }
    if req.photo_path.is_some() {
        entry.photo_path = photo_from(req.photo_path);
    }

    if !repo::update_owned(db, &entry).await? {
        return Err(AppError::NotFound("Recycle entry not found".into()));
    }
    Ok(entry)
}

pub async fn list_entries(db: &SqlitePool, user_id: i64) -> AppResult<Vec<RecycleEntry>> {
    repo::list_by_user(db, user_id).await
}
