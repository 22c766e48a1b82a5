//! Coupon catalog: persisted rows plus on-demand virtual coupons.

use anyhow::Context;
use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use time::Date;
use tracing::{debug, info, instrument, warn};

use crate::clock;
use crate::rewards::tiers::{tier_for_points, Tier};

pub const DEFAULT_ISSUER: &str = "Eco Rewards";
const VIRTUAL_VALIDITY_MONTHS: u8 = 6;
const CODE_SUFFIX_LEN: usize = 8;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Where a coupon lives. Virtual coupons are materialized on redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum CouponSource {
    Catalog(i64),
    Virtual,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coupon {
    pub source: CouponSource,
    /// Text in the store; numeric for tier coupons, legacy names for seeds.
    pub level_required: String,
    pub company_name: String,
    pub description: Option<String>,
    pub discount: Option<String>,
    pub coupon_code: Option<String>,
    #[serde(with = "iso_date::option")]
    pub expiry_date: Option<Date>,
    pub claimed: bool,
    pub logo_url: Option<String>,
}

impl Coupon {
    pub fn catalog_id(&self) -> Option<i64> {
        match self.source {
            CouponSource::Catalog(id) => Some(id),
            CouponSource::Virtual => None,
        }
    }

    #[cfg(test)]
    pub fn is_virtual(&self) -> bool {
        self.source == CouponSource::Virtual
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct CouponRow {
    pub id: i64,
    pub level_required: String,
    pub company_name: String,
    pub description: Option<String>,
    pub discount: Option<String>,
    pub coupon_code: Option<String>,
    pub expiry_date: Option<Date>,
    pub is_claimed: bool,
    pub logo_url: Option<String>,
}

impl From<CouponRow> for Coupon {
    fn from(r: CouponRow) -> Self {
        Self {
            source: CouponSource::Catalog(r.id),
            level_required: r.level_required,
            company_name: r.company_name,
            description: r.description,
            discount: r.discount,
            coupon_code: r.coupon_code,
            expiry_date: r.expiry_date,
            claimed: r.is_claimed,
            logo_url: r.logo_url,
        }
    }
}

const COUPON_COLUMNS: &str = "id, level_required, company_name, description, discount, \
     coupon_code, expiry_date, is_claimed, logo_url";

/// Inserts the four legacy catalog coupons when the table is empty.
pub async fn seed_if_empty(db: &SqlitePool) -> anyhow::Result<()> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(1) FROM coupons")
        .fetch_one(db)
        .await
        .context("count coupons")?;
    if count > 0 {
        return Ok(());
    }

    let seeds = [
        ("Bronze", "Eco Cafe", "10% off on any drink", "10% OFF", "BRONZE10", "https://example.com/cafe.png"),
        ("Silver", "Green Threads", "15% off on apparel", "15% OFF", "SILVER15", "https://example.com/threads.png"),
        ("Gold", "Eco Mart", "₹500 voucher on orders over ₹2000", "₹500 Voucher", "GOLD500", "https://example.com/ecomart.png"),
        ("Green Hero", "Earth NGO", "VIP pass to annual eco event", "Event Pass", "HERO-EVENT", "https://example.com/ngo.png"),
    ];
    let mut tx = db.begin().await.context("begin tx")?;
    for (level, company, description, discount, code, logo) in seeds {
        sqlx::query(
            r#"
            INSERT INTO coupons (level_required, company_name, description, discount,
                                 coupon_code, expiry_date, is_claimed, logo_url)
            VALUES (?, ?, ?, ?, ?, '2030-12-31', 0, ?)
            "#,
        )
        .bind(level)
        .bind(company)
        .bind(description)
        .bind(discount)
        .bind(code)
        .bind(logo)
        .execute(&mut *tx)
        .await
        .context("insert seed coupon")?;
    }
    tx.commit().await.context("commit tx")?;
    info!(count = seeds.len(), "seeded coupon catalog");
    Ok(())
}

/// Unclaimed catalog coupon whose `level_required` equals `label`.
pub async fn by_exact_tier(db: &SqlitePool, label: &str) -> anyhow::Result<Option<Coupon>> {
    let row = sqlx::query_as::<_, CouponRow>(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons WHERE level_required = ? AND is_claimed = 0 LIMIT 1"
    ))
    .bind(label)
    .fetch_optional(db)
    .await
    .context("coupon by tier")?;
    Ok(row.map(Coupon::from))
}

async fn unclaimed_by_description(
    db: &SqlitePool,
    description: &str,
) -> anyhow::Result<Option<Coupon>> {
    let row = sqlx::query_as::<_, CouponRow>(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons \
         WHERE description LIKE '%' || ? || '%' AND is_claimed = 0 \
         ORDER BY id LIMIT 1"
    ))
    .bind(description)
    .fetch_optional(db)
    .await
    .context("coupon by description")?;
    Ok(row.map(Coupon::from))
}

/// Coupon for the highest tier reachable with `points`.
///
/// Prefers an unclaimed catalog row whose description contains the tier's
/// description. A miss, or a failed lookup, falls back to a virtual coupon, so
/// any total of 20 or more always yields one. `None` below the first tier.
#[instrument(skip(db))]
pub async fn by_points_description(db: &SqlitePool, points: i64) -> Option<Coupon> {
    let tier = tier_for_points(points)?;
    match unclaimed_by_description(db, tier.description).await {
        Ok(Some(coupon)) => {
            debug!(tier = tier.points, id = ?coupon.catalog_id(), "catalog coupon matched");
            return Some(coupon);
        }
        Ok(None) => debug!(tier = tier.points, "no catalog coupon, synthesizing"),
        Err(e) => warn!(error = %e, tier = tier.points, "catalog lookup failed, synthesizing"),
    }
    synthesize_virtual(points)
}

/// Unclaimed catalog coupon with the smallest numeric tier above `points`.
pub async fn next_unlockable(db: &SqlitePool, points: i64) -> anyhow::Result<Option<Coupon>> {
    let row = sqlx::query_as::<_, CouponRow>(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons \
         WHERE CAST(level_required AS INTEGER) > ? AND is_claimed = 0 \
         ORDER BY CAST(level_required AS INTEGER) ASC, id ASC LIMIT 1"
    ))
    .bind(points)
    .fetch_optional(db)
    .await
    .context("next unlockable coupon")?;
    Ok(row.map(Coupon::from))
}

/// In-memory coupon for the highest tier reachable with `points`.
pub fn synthesize_virtual(points: i64) -> Option<Coupon> {
    tier_for_points(points).map(virtual_for_tier)
}

fn virtual_for_tier(tier: &Tier) -> Coupon {
    Coupon {
        source: CouponSource::Virtual,
        level_required: tier.points.to_string(),
        company_name: DEFAULT_ISSUER.to_string(),
        description: Some(tier.description.to_string()),
        discount: Some(tier.discount.to_string()),
        coupon_code: Some(format!("{}-{}", tier.code_prefix, code_suffix())),
        expiry_date: Some(clock::add_months(clock::today(), VIRTUAL_VALIDITY_MONTHS)),
        claimed: false,
        logo_url: None,
    }
}

fn code_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect()
}

pub async fn list_available(db: &SqlitePool) -> anyhow::Result<Vec<Coupon>> {
    let rows = sqlx::query_as::<_, CouponRow>(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons WHERE is_claimed = 0 ORDER BY id"
    ))
    .fetch_all(db)
    .await
    .context("list available coupons")?;
    Ok(rows.into_iter().map(Coupon::from).collect())
}

/// Persists a virtual coupon as already claimed and returns its new id.
pub(crate) async fn insert_claimed_tx(
    conn: &mut SqliteConnection,
    coupon: &Coupon,
) -> anyhow::Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO coupons (level_required, company_name, description, discount,
                             coupon_code, expiry_date, is_claimed, logo_url)
        VALUES (?, ?, ?, ?, ?, ?, 1, ?)
        "#,
    )
    .bind(&coupon.level_required)
    .bind(&coupon.company_name)
    .bind(&coupon.description)
    .bind(&coupon.discount)
    .bind(&coupon.coupon_code)
    .bind(coupon.expiry_date)
    .bind(&coupon.logo_url)
    .execute(&mut *conn)
    .await
    .context("insert coupon")?
    .last_insert_rowid();
    Ok(id)
}

/// Flips `is_claimed`; `false` when the row is missing or already claimed.
pub(crate) async fn mark_claimed_tx(conn: &mut SqliteConnection, id: i64) -> anyhow::Result<bool> {
    let updated = sqlx::query("UPDATE coupons SET is_claimed = 1 WHERE id = ? AND is_claimed = 0")
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("mark coupon claimed")?
        .rows_affected();
    Ok(updated == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    async fn insert_catalog(db: &SqlitePool, level: &str, description: &str, code: &str) -> i64 {
        sqlx::query(
            "INSERT INTO coupons (level_required, company_name, description, discount, coupon_code, expiry_date) \
             VALUES (?, 'Partner', ?, 'X', ?, '2031-01-01')",
        )
        .bind(level)
        .bind(description)
        .bind(code)
        .execute(db)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    #[test]
    fn virtual_synthesis_follows_tier_table() {
        assert!(synthesize_virtual(0).is_none());
        assert!(synthesize_virtual(19).is_none());

        let c = synthesize_virtual(20).unwrap();
        assert!(c.is_virtual());
        assert_eq!(c.description.as_deref(), Some("5% off Recycled Stationery"));
        assert_eq!(c.discount.as_deref(), Some("5% OFF"));
        assert_eq!(c.company_name, DEFAULT_ISSUER);
        assert_eq!(c.level_required, "20");
        assert!(c.coupon_code.as_deref().unwrap().starts_with("STAT5-"));

        let c = synthesize_virtual(39).unwrap();
        assert_eq!(c.description.as_deref(), Some("5% off Recycled Stationery"));
        let c = synthesize_virtual(40).unwrap();
        assert_eq!(c.description.as_deref(), Some("10% off Eco Toiletries"));
        let c = synthesize_virtual(999).unwrap();
        assert_eq!(c.discount.as_deref(), Some("30% OFF"));
    }

    #[test]
    fn virtual_coupon_expires_in_six_months() {
        let c = synthesize_virtual(250).unwrap();
        let expected = clock::add_months(clock::today(), 6);
        assert_eq!(c.expiry_date, Some(expected));
    }

    #[test]
    fn virtual_codes_do_not_repeat() {
        let a = synthesize_virtual(100).unwrap().coupon_code.unwrap();
        let b = synthesize_virtual(100).unwrap().coupon_code.unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), "TOTE-".len() + CODE_SUFFIX_LEN);
    }

    #[test]
    fn coupon_serializes_source_and_date() {
        let mut c = synthesize_virtual(20).unwrap();
        c.expiry_date = Some(time::macros::date!(2030 - 12 - 31));
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["source"]["kind"], "virtual");
        assert_eq!(json["expiry_date"], "2030-12-31");
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let state = AppState::for_tests().await;
        seed_if_empty(&state.db).await.unwrap();
        let all = list_available(&state.db).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].coupon_code.as_deref(), Some("BRONZE10"));
        assert_eq!(all[0].expiry_date, Some(time::macros::date!(2030 - 12 - 31)));
    }

    #[tokio::test]
    async fn exact_tier_lookup_skips_claimed_rows() {
        let state = AppState::for_tests().await;
        let gold = by_exact_tier(&state.db, "Gold").await.unwrap().unwrap();
        assert_eq!(gold.coupon_code.as_deref(), Some("GOLD500"));

        let mut conn = state.db.acquire().await.unwrap();
        assert!(mark_claimed_tx(&mut conn, gold.catalog_id().unwrap()).await.unwrap());
        assert!(!mark_claimed_tx(&mut conn, gold.catalog_id().unwrap()).await.unwrap());
        drop(conn);

        assert!(by_exact_tier(&state.db, "Gold").await.unwrap().is_none());
        assert!(by_exact_tier(&state.db, "Platinum").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn description_lookup_prefers_catalog_row() {
        let state = AppState::for_tests().await;
        assert!(by_points_description(&state.db, 10).await.is_none());

        let virt = by_points_description(&state.db, 45).await.unwrap();
        assert!(virt.is_virtual());

        let id = insert_catalog(&state.db, "40", "Partner deal: 10% off Eco Toiletries", "PARTNER40").await;
        let real = by_points_description(&state.db, 45).await.unwrap();
        assert_eq!(real.source, CouponSource::Catalog(id));
        assert_eq!(real.coupon_code.as_deref(), Some("PARTNER40"));
    }

    #[tokio::test]
    async fn description_lookup_falls_back_when_catalog_is_unreadable() {
        let state = AppState::for_tests().await;
        sqlx::query("DROP TABLE coupons")
            .execute(&state.db)
            .await
            .unwrap();

        let c = by_points_description(&state.db, 45).await.unwrap();
        assert!(c.is_virtual());
        assert_eq!(c.level_required, "40");
        assert_eq!(c.description.as_deref(), Some("10% off Eco Toiletries"));
    }

    #[tokio::test]
    async fn next_unlockable_uses_numeric_tiers() {
        let state = AppState::for_tests().await;
        // Seeded rows carry legacy names, which never compare above a real total.
        assert!(next_unlockable(&state.db, 0).await.unwrap().is_none());

        insert_catalog(&state.db, "150", "LED", "LED-A").await;
        insert_catalog(&state.db, "70", "Shirt", "SHIRT-A").await;
        let next = next_unlockable(&state.db, 30).await.unwrap().unwrap();
        assert_eq!(next.coupon_code.as_deref(), Some("SHIRT-A"));
        let next = next_unlockable(&state.db, 70).await.unwrap().unwrap();
        assert_eq!(next.coupon_code.as_deref(), Some("LED-A"));
        assert!(next_unlockable(&state.db, 150).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn materialized_coupon_is_claimed() {
        let state = AppState::for_tests().await;
        let coupon = synthesize_virtual(70).unwrap();
        let mut conn = state.db.acquire().await.unwrap();
        let id = insert_claimed_tx(&mut conn, &coupon).await.unwrap();
        drop(conn);

        let (claimed, code): (bool, String) =
            sqlx::query_as("SELECT is_claimed, coupon_code FROM coupons WHERE id = ?")
                .bind(id)
                .fetch_one(&state.db)
                .await
                .unwrap();
        assert!(claimed);
        assert_eq!(Some(code), coupon.coupon_code);
    }
}
