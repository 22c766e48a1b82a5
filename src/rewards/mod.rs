//! Reward engine: points, coupon catalog, redemption ledger and the
//! eligibility scan that ties them together.

use crate::state::AppState;
use axum::Router;

pub mod catalog;
pub mod handlers;
pub mod ledger;
pub mod points;
pub mod scanner;
pub mod services;
pub mod tiers;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::coupon_routes())
}
