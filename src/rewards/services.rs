use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{instrument, warn};

use crate::auth::repo_types::User;
use crate::error::{AppError, AppResult};
use crate::rewards::catalog::{self, Coupon};
use crate::rewards::ledger::{self, Redeemed};
use crate::rewards::tiers::{self, Tier, FIRST_TIER_POINTS, TIERS};

/// One row of the tier table as seen by a given user.
#[derive(Debug, Serialize)]
pub struct TierProgress {
    #[serde(flatten)]
    pub tier: Tier,
    pub reached: bool,
    pub held: bool,
    pub points_missing: i64,
}

/// Hints shown after a point change: the next catalog coupon and the next tier.
#[derive(Debug, Serialize)]
pub struct NextRewards {
    pub points: i64,
    pub next_unlockable: Option<Coupon>,
    pub next_tier: Option<Tier>,
}

pub(crate) async fn load_points(db: &SqlitePool, user_id: i64) -> AppResult<i64> {
    User::find_by_id(db, user_id)
        .await?
        .map(|u| u.points)
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// Manual redemption of the coupon for the user's current tier.
#[instrument(skip(db))]
pub async fn redeem_current_tier(db: &SqlitePool, user_id: i64) -> AppResult<Redeemed> {
    let points = load_points(db, user_id).await?;
    if points < FIRST_TIER_POINTS {
        return Err(AppError::Validation(format!(
            "You need at least {FIRST_TIER_POINTS} points to redeem a coupon"
        )));
    }
    let tier = tiers::tier_for_points(points)
        .ok_or_else(|| AppError::Validation("No tier reached".into()))?;
    let coupon = catalog::by_points_description(db, points)
        .await
        .ok_or_else(|| AppError::NotFound("Could not find a coupon for your points".into()))?;

    if let Some(code) = coupon.coupon_code.as_deref() {
        if ledger::has_redeemed(db, user_id, code).await? {
            warn!(user_id, code, "coupon already redeemed");
            return Err(AppError::Conflict(format!(
                "You have already redeemed this coupon. Code: {code}"
            )));
        }
    }
    if ledger::holds_tier(db, user_id, tier).await? {
        return Err(AppError::Conflict(format!(
            "You already hold the {} point reward",
            tier.points
        )));
    }

    ledger::redeem(db, user_id, &coupon, Some(tier)).await
}

pub async fn tier_progress(db: &SqlitePool, user_id: i64) -> AppResult<Vec<TierProgress>> {
    let points = load_points(db, user_id).await?;
    let mut out = Vec::with_capacity(TIERS.len());
    for tier in TIERS {
        out.push(TierProgress {
            reached: points >= tier.points,
            held: ledger::holds_tier(db, user_id, &tier).await?,
            points_missing: (tier.points - points).max(0),
            tier,
        });
    }
    Ok(out)
}

pub async fn next_rewards(db: &SqlitePool, points: i64) -> AppResult<NextRewards> {
    Ok(NextRewards {
        points,
        next_unlockable: catalog::next_unlockable(db, points).await?,
        next_tier: tiers::next_tier(points).copied(),
    })
}
