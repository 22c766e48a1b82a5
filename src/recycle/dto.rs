use serde::{Deserialize, Serialize};

use crate::recycle::repo_types::RecycleEntry;
use crate::rewards::catalog::Coupon;
use crate::rewards::tiers::Tier;

/// Weight arrives as JSON number or as typed text ("0.3").
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WeightInput {
    Number(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub struct SubmitEntryRequest {
    pub category: String,
    pub weight_kg: WeightInput,
    #[serde(default)]
    pub photo_path: Option<String>,
}

/// Omitted fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateEntryRequest {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub weight_kg: Option<WeightInput>,
    #[serde(default)]
    pub photo_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitEntryResponse {
    pub entry: RecycleEntry,
    pub points_granted: i64,
    pub total_points: i64,
    pub awarded: Vec<Coupon>,
    pub next_unlockable: Option<Coupon>,
    pub next_tier: Option<Tier>,
}
