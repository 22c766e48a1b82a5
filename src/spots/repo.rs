use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::info;

/// A recycling drop-off location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Spot {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub city: String,
}

const SEED_SPOTS: [(&str, &str, &str); 3] = [
    ("Green Cycle Center", "123 Park St", "Metro City"),
    ("Eco DropPoint", "45 River Ave", "Metro City"),
    ("Reclaim Hub", "9 Sunset Blvd", "Metro City"),
];

pub async fn seed_if_empty(db: &SqlitePool) -> anyhow::Result<()> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM spots")
        .fetch_one(db)
        .await
        .context("count spots")?;
    if count > 0 {
        return Ok(());
    }

    let mut tx = db.begin().await.context("begin tx")?;
    for (name, address, city) in SEED_SPOTS {
        sqlx::query("INSERT INTO spots (name, address, city) VALUES (?, ?, ?)")
            .bind(name)
            .bind(address)
            .bind(city)
            .execute(&mut *tx)
            .await
            .context("insert spot")?;
    }
    tx.commit().await.context("commit tx")?;
    info!(count = SEED_SPOTS.len(), "seeded drop-off spots");
    Ok(())
}

pub async fn list_all(db: &SqlitePool) -> anyhow::Result<Vec<Spot>> {
    let spots = sqlx::query_as::<_, Spot>(
        "SELECT id, name, address, city FROM spots ORDER BY city, name",
    )
    .fetch_all(db)
    .await
    .context("list spots")?;
    Ok(spots)
}
