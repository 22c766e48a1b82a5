//! Barter/trade log. Independent of the reward engine.

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::{info, instrument};

use crate::{
    auth::services::AuthUser,
    clock,
    error::{AppError, AppResult},
    state::AppState,
};

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct TradeEntry {
    pub id: i64,
    pub user_id: i64,
    pub item: String,
    pub amount: f64,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct NewTradeRequest {
    pub item: String,
    pub amount: f64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/trades", get(list_trades).post(create_trade))
}

pub async fn insert(db: &SqlitePool, user_id: i64, req: NewTradeRequest) -> AppResult<TradeEntry> {
    let item = req.item.trim().to_string();
    if item.is_empty() {
        return Err(AppError::Validation("Item is required".into()));
    }
    if !req.amount.is_finite() || req.amount <= 0.0 {
        return Err(AppError::Validation("Amount must be positive".into()));
    }

    let created_at = clock::now_millis();
    let id = sqlx::query(
        "INSERT INTO trade_entries (user_id, item, amount, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(&item)
    .bind(req.amount)
    .bind(created_at)
    .execute(db)
    .await
    .context("insert trade")?
    .last_insert_rowid();

    Ok(TradeEntry {
        id,
        user_id,
        item,
        amount: req.amount,
        created_at,
    })
}

pub async fn list_by_user(db: &SqlitePool, user_id: i64) -> anyhow::Result<Vec<TradeEntry>> {
    let rows = sqlx::query_as::<_, TradeEntry>(
        r#"
        SELECT id, user_id, item, amount, created_at
          FROM trade_entries
         WHERE user_id = ?
         ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list trades")?;
    Ok(rows)
}

#[instrument(skip(state, payload))]
pub async fn create_trade(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<NewTradeRequest>,
) -> AppResult<(StatusCode, Json<TradeEntry>)> {
    let trade = insert(&state.db, user_id, payload).await?;
    info!(user_id, trade_id = trade.id, "trade logged");
    Ok((StatusCode::CREATED, Json(trade)))
}

#[instrument(skip(state))]
pub async fn list_trades(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<TradeEntry>>> {
    Ok(Json(list_by_user(&state.db, user_id).await?))
}
