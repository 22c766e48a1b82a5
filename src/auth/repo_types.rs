use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,                  // unique user ID
    pub nickname: String,         // display name, unique
    pub avatar: Option<String>,   // avatar reference
    pub city: Option<String>,
    pub points: i64,              // cumulative eco points
    pub email: String,            // stored lowercase
    #[serde(skip_serializing)]
    pub password: String,         // Argon2 hash, not exposed in JSON
}

/// Fields needed to create an account. `password` is already hashed.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub nickname: &'a str,
    pub avatar: Option<&'a str>,
    pub city: Option<&'a str>,
    pub email: &'a str,
    pub password: &'a str,
}
