//! Redemption ledger: user ↔ coupon records, written atomically with the
//! coupon's claim and, for tier awards, the `tier_awards` row.

use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::{error, info, instrument};

use crate::clock;
use crate::error::{AppError, AppResult};
use crate::rewards::catalog::{self, Coupon, CouponRow, CouponSource};
use crate::rewards::tiers::Tier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Redemption {
    pub id: i64,
    pub user_id: i64,
    pub coupon_id: i64,
    pub redeemed_at: i64,
}

/// Result of a redemption: the coupon as persisted plus its ledger row.
#[derive(Debug, Clone, Serialize)]
pub struct Redeemed {
    pub coupon: Coupon,
    pub redemption: Redemption,
}

/// Redeems `coupon` for `user_id`, recording `tier` as awarded when given.
///
/// Virtual coupons are inserted already claimed; catalog coupons are flipped
/// to claimed and refused with a conflict if someone got there first. The
/// claim, the redemption row and the tier award commit together or not at
/// all. A tier the user already holds fails on the `tier_awards` unique key
/// (see [`AppError::is_unique_violation`]).
#[instrument(skip(db, coupon, tier), fields(code = ?coupon.coupon_code, source = ?coupon.source))]
pub async fn redeem(
    db: &SqlitePool,
    user_id: i64,
    coupon: &Coupon,
    tier: Option<&Tier>,
) -> AppResult<Redeemed> {
    let tier_points = tier.map(|t| t.points);
    let mut tx = db.begin().await.context("begin tx")?;

    let coupon_id = match coupon.source {
        CouponSource::Virtual => catalog::insert_claimed_tx(&mut tx, coupon).await?,
        CouponSource::Catalog(id) => {
            if !catalog::mark_claimed_tx(&mut tx, id).await? {
                return Err(AppError::Conflict(format!(
                    "Coupon {id} is unavailable or already claimed"
                )));
            }
            id
        }
    };

    let redeemed_at = clock::now_millis();
    let redemption_id = sqlx::query(
        "INSERT INTO user_coupons (user_id, coupon_id, redeemed_at) VALUES (?, ?, ?)",
    )
    .bind(user_id)
    .bind(coupon_id)
    .bind(redeemed_at)
    .execute(&mut *tx)
    .await
    .context("insert redemption")?
    .last_insert_rowid();

    if let Some(points) = tier_points {
        sqlx::query(
            "INSERT INTO tier_awards (user_id, tier_points, coupon_id, awarded_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(points)
        .bind(coupon_id)
        .bind(redeemed_at)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await.context("commit tx")?;
    info!(user_id, coupon_id, tier = ?tier_points, "coupon redeemed");

    let mut persisted = coupon.clone();
    persisted.source = CouponSource::Catalog(coupon_id);
    persisted.claimed = true;
    Ok(Redeemed {
        coupon: persisted,
        redemption: Redemption {
            id: redemption_id,
            user_id,
            coupon_id,
            redeemed_at,
        },
    })
}

/// Whether `user_id` already redeemed a coupon carrying `coupon_code`.
///
/// Store errors are returned, not read as "no": a failed check must not let a
/// duplicate redemption through.
pub async fn has_redeemed(db: &SqlitePool, user_id: i64, coupon_code: &str) -> anyhow::Result<bool> {
    let found: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM user_coupons uc
              JOIN coupons c ON uc.coupon_id = c.id
             WHERE uc.user_id = ? AND c.coupon_code = ?
        )
        "#,
    )
    .bind(user_id)
    .bind(coupon_code)
    .fetch_one(db)
    .await
    .map_err(|e| {
        error!(error = %e, user_id, coupon_code, "redemption check failed");
        e
    })
    .context("check redemption")?;
    Ok(found)
}

/// Whether the user already holds `tier`: an explicit tier award, or a
/// redemption recorded before tier awards existed whose description contains
/// the tier's description (case-sensitive).
pub async fn holds_tier(db: &SqlitePool, user_id: i64, tier: &Tier) -> anyhow::Result<bool> {
    let held: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(SELECT 1 FROM tier_awards WHERE user_id = ? AND tier_points = ?)
            OR EXISTS(
                SELECT 1 FROM user_coupons uc
                  JOIN coupons c ON uc.coupon_id = c.id
                 WHERE uc.user_id = ? AND instr(c.description, ?) > 0
            )
        "#,
    )
    .bind(user_id)
    .bind(tier.points)
    .bind(user_id)
    .bind(tier.description)
    .fetch_one(db)
    .await
    .context("check tier award")?;
    Ok(held)
}

/// Coupons redeemed by the user, most recent first.
pub async fn list_redeemed(db: &SqlitePool, user_id: i64) -> anyhow::Result<Vec<Coupon>> {
    let rows = sqlx::query_as::<_, CouponRow>(
        r#"
        SELECT c.id, c.level_required, c.company_name, c.description, c.discount,
               c.coupon_code, c.expiry_date, c.is_claimed, c.logo_url
          FROM coupons c
          JOIN user_coupons uc ON c.id = uc.coupon_id
         WHERE uc.user_id = ?
         ORDER BY uc.redeemed_at DESC, uc.id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list redeemed coupons")?;
    Ok(rows.into_iter().map(Coupon::from).collect())
}
