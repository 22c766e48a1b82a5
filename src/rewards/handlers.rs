use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::services::AuthUser,
    error::{AppError, AppResult},
    rewards::{
        catalog::{self, Coupon},
        ledger::{self, Redeemed},
        services::{self, NextRewards, TierProgress},
    },
    state::AppState,
};

pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/coupons", get(list_available))
        .route("/coupons/tiers", get(list_tiers))
        .route("/coupons/next", get(next))
        .route("/coupons/level/:label", get(by_level))
        .route("/coupons/redeem", post(redeem))
        .route("/me/coupons", get(my_coupons))
}

#[instrument(skip(state))]
pub async fn list_available(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
) -> AppResult<Json<Vec<Coupon>>> {
    Ok(Json(catalog::list_available(&state.db).await?))
}

/// First unclaimed catalog coupon for an exact tier label ("Gold", "150").
#[instrument(skip(state))]
pub async fn by_level(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(label): Path<String>,
) -> AppResult<Json<Coupon>> {
    catalog::by_exact_tier(&state.db, &label)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No available coupon for tier {label}")))
}

#[instrument(skip(state))]
pub async fn list_tiers(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<TierProgress>>> {
    Ok(Json(services::tier_progress(&state.db, user_id).await?))
}

#[instrument(skip(state))]
pub async fn next(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<NextRewards>> {
    let points = services::load_points(&state.db, user_id).await?;
    Ok(Json(services::next_rewards(&state.db, points).await?))
}

#[instrument(skip(state))]
pub async fn redeem(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Redeemed>> {
    Ok(Json(services::redeem_current_tier(&state.db, user_id).await?))
}

#[instrument(skip(state))]
pub async fn my_coupons(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<Coupon>>> {
    Ok(Json(ledger::list_redeemed(&state.db, user_id).await?))
}
