//! Eligibility scan: award every tier a point total has reached and the user
//! does not hold yet.

use sqlx::SqlitePool;
use tracing::{debug, info, instrument};

use crate::error::{AppError, AppResult};
use crate::rewards::catalog::{self, Coupon};
use crate::rewards::ledger;
use crate::rewards::tiers::{Tier, TIERS};

/// Walks the tier table in ascending order and redeems each reached tier the
/// user does not hold. Returns the coupons awarded by this call; a repeat call
/// with the same total returns nothing.
#[instrument(skip(db))]
pub async fn scan_and_award(
    db: &SqlitePool,
    user_id: i64,
    total_points: i64,
) -> AppResult<Vec<Coupon>> {
    let mut awarded = Vec::new();

    for tier in TIERS.iter().take_while(|t| t.points <= total_points) {
        if ledger::holds_tier(db, user_id, tier).await? {
            debug!(tier = tier.points, "tier already held");
            continue;
        }
        let Some(coupon) = catalog::by_points_description(db, tier.points).await else {
            continue;
        };
        if let Some(coupon) = award_tier(db, user_id, tier, coupon).await? {
            info!(tier = tier.points, coupon_code = ?coupon.coupon_code, "tier awarded");
            awarded.push(coupon);
        }
    }

    Ok(awarded)
}

/// Redeems `coupon` as the award for `tier`.
///
/// A catalog row claimed by another user since the lookup is replaced by a
/// virtual coupon. A tier recorded for this user by a concurrent scan counts
/// as held and yields `None`.
async fn award_tier(
    db: &SqlitePool,
    user_id: i64,
    tier: &Tier,
    coupon: Coupon,
) -> AppResult<Option<Coupon>> {
    let redeemed = match ledger::redeem(db, user_id, &coupon, Some(tier)).await {
        Err(AppError::Conflict(reason)) => {
            debug!(tier = tier.points, %reason, "catalog coupon taken, using a virtual one");
            let Some(fallback) = catalog::synthesize_virtual(tier.points) else {
                return Ok(None);
            };
            ledger::redeem(db, user_id, &fallback, Some(tier)).await
        }
        other => other,
    };

    match redeemed {
        Ok(r) => Ok(Some(r.coupon)),
        Err(e) if e.is_unique_violation() => {
            debug!(tier = tier.points, "tier awarded by a concurrent scan");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
