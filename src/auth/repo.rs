use crate::auth::repo_types::{NewUser, User};
use anyhow::Context;
use sqlx::{SqliteConnection, SqlitePool};

const USER_COLUMNS: &str = "id, nickname, avatar, city, points, email, password";

impl User {
    /// Find a user by email, case-insensitively.
    pub async fn find_by_email(db: &SqlitePool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER(?)"
        ))
        .bind(email.trim())
        .fetch_optional(db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    pub async fn find_by_nickname(db: &SqlitePool, nickname: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE nickname = ?"
        ))
        .bind(nickname)
        .fetch_optional(db)
        .await
        .context("find user by nickname")?;
        Ok(user)
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    /// Create a new user with zero points. The email is stored lowercase.
    pub async fn create(db: &SqlitePool, new: NewUser<'_>) -> anyhow::Result<User> {
        let email = new.email.trim().to_lowercase();
        let id = sqlx::query(
            r#"
            INSERT INTO users (nickname, avatar, city, points, email, password)
            VALUES (?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(new.nickname)
        .bind(new.avatar)
        .bind(new.city)
        .bind(&email)
        .bind(new.password)
        .execute(db)
        .await
        .context("insert user")?
        .last_insert_rowid();

        Ok(User {
            id,
            nickname: new.nickname.to_string(),
            avatar: new.avatar.map(str::to_string),
            city: new.city.map(str::to_string),
            points: 0,
            email,
            password: new.password.to_string(),
        })
    }
}

/// Add `delta` points to a user's balance inside the caller's transaction and
/// return the new total.
pub async fn add_points_tx(
    conn: &mut SqliteConnection,
    user_id: i64,
    delta: i64,
) -> anyhow::Result<i64> {
    let updated = sqlx::query("UPDATE users SET points = points + ? WHERE id = ?")
        .bind(delta)
        .bind(user_id)
        .execute(&mut *conn)
        .await
        .context("add points")?
        .rows_affected();
    anyhow::ensure!(updated == 1, "user {user_id} not found");

    let (total,): (i64,) = sqlx::query_as("SELECT points FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await
        .context("read points")?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    fn sample<'a>(nickname: &'a str, email: &'a str) -> NewUser<'a> {
        NewUser {
            nickname,
            avatar: None,
            city: Some("Metro City"),
            email,
            password: "hash",
        }
    }

    #[tokio::test]
    async fn create_and_find_user() {
        let state = AppState::for_tests().await;
        let user = User::create(&state.db, sample("leaf", "Leaf@Example.com"))
            .await
            .unwrap();
        assert_eq!(user.points, 0);
        assert_eq!(user.email, "leaf@example.com");

        let by_email = User::find_by_email(&state.db, "LEAF@example.COM ")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, user.id);

        let by_nick = User::find_by_nickname(&state.db, "leaf").await.unwrap();
        assert!(by_nick.is_some());
        assert!(User::find_by_id(&state.db, user.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn email_is_unique_ignoring_case() {
        let state = AppState::for_tests().await;
        User::create(&state.db, sample("a", "same@example.com"))
            .await
            .unwrap();
        let dup = User::create(&state.db, sample("b", "SAME@example.com")).await;
        assert!(dup.is_err());
    }

    #[tokio::test]
    async fn add_points_accumulates() {
        let state = AppState::for_tests().await;
        let user = User::create(&state.db, sample("p", "p@example.com"))
            .await
            .unwrap();
        let mut conn = state.db.acquire().await.unwrap();
        assert_eq!(add_points_tx(&mut conn, user.id, 3).await.unwrap(), 3);
        assert_eq!(add_points_tx(&mut conn, user.id, 22).await.unwrap(), 25);
        assert!(add_points_tx(&mut conn, user.id + 1, 1).await.is_err());
    }
}
