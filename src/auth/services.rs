pub(crate) use crate::auth::dto::{Claims, JwtKeys, TokenKind};
use crate::auth::dto::RegisterRequest;
use crate::auth::password::{hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::auth::repo_types::{NewUser, User};
use crate::config::JwtConfig;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use regex::Regex;
use sqlx::SqlitePool;
use std::time::Duration;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, info, warn};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validates and normalizes a registration request in place.
pub(crate) fn validate_registration(req: &mut RegisterRequest) -> AppResult<()> {
    req.nickname = req.nickname.trim().to_string();
    req.email = req.email.trim().to_lowercase();
    req.city = non_blank(req.city.take());
    req.avatar = non_blank(req.avatar.take());

    if req.nickname.is_empty() || req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Nickname, email and password are required".into(),
        ));
    }
    if !is_valid_email(&req.email) {
        return Err(AppError::Validation("Invalid email".into()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub async fn register_user(db: &SqlitePool, mut req: RegisterRequest) -> AppResult<User> {
    validate_registration(&mut req)?;

    if User::find_by_email(db, &req.email).await?.is_some() {
        warn!(email = %req.email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }
    if User::find_by_nickname(db, &req.nickname).await?.is_some() {
        warn!(nickname = %req.nickname, "nickname taken");
        return Err(AppError::Conflict("Nickname already taken".into()));
    }

    let hash = hash_password(&req.password)?;
    let user = User::create(
        db,
        NewUser {
            nickname: &req.nickname,
            avatar: req.avatar.as_deref(),
            city: req.city.as_deref(),
            email: &req.email,
            password: &hash,
        },
    )
    .await?;
    info!(user_id = user.id, nickname = %user.nickname, "user registered");
    Ok(user)
}

/// Looks the account up by email first and falls back to nickname.
pub async fn authenticate(db: &SqlitePool, login: &str, password: &str) -> AppResult<User> {
    let login = login.trim();
    if login.is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Email/Nickname and password required".into(),
        ));
    }

    let user = match User::find_by_email(db, login).await? {
        Some(u) => Some(u),
        None => {
            debug!(login, "no user with that email, trying nickname");
            User::find_by_nickname(db, login).await?
        }
    };
    let Some(user) = user else {
        warn!(login, "login unknown account");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };

    if !verify_password(password, &user.password)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }
    info!(user_id = user.id, "user logged in");
    Ok(user)
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
            refresh_ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            access_ttl: Duration::from_secs((ttl_minutes as u64) * 60),
            refresh_ttl: Duration::from_secs((refresh_ttl_minutes as u64) * 60),
        }
    }
}

impl JwtKeys {
    fn sign_with_kind(&self, user_id: i64, kind: TokenKind) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: i64) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Access)
    }
    pub fn sign_refresh(&self, user_id: i64) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Refresh)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<Claims> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Refresh {
            anyhow::bail!("not a refresh token");
        }
        Ok(claims)
    }
}

/// Authenticated caller, extracted from a `Bearer` access token.
pub struct AuthUser(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Missing Authorization header".to_string(),
            ))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Invalid Authorization header".to_string(),
            ))?;

        let claims = match keys.verify(token) {
            Ok(c) => c,
            Err(_) => {
                warn!("invalid or expired token");
                return Err((
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired token".to_string(),
                ));
            }
        };

        if claims.kind != TokenKind::Access {
            return Err((
                StatusCode::UNAUTHORIZED,
                "Access token required".to_string(),
            ));
        }

        Ok(AuthUser(claims.sub))
    }
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    fn request(nickname: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            nickname: nickname.into(),
            email: email.into(),
            password: password.into(),
            city: Some("  ".into()),
            avatar: None,
        }
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.de"));
    }

    #[test]
    fn registration_normalizes_fields() {
        let mut req = request("  leaf ", " Leaf@Example.COM ", "abcd");
        validate_registration(&mut req).unwrap();
        assert_eq!(req.nickname, "leaf");
        assert_eq!(req.email, "leaf@example.com");
        assert_eq!(req.city, None);
    }

    #[test]
    fn registration_requires_fields() {
        let mut req = request("", "a@b.co", "abcd");
        assert!(matches!(
            validate_registration(&mut req),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn registration_rejects_short_password() {
        let mut req = request("leaf", "a@b.co", "abc");
        let err = validate_registration(&mut req).unwrap_err();
        assert!(err.to_string().contains("at least 4"));
    }
}

#[cfg(test)]
mod account_tests {
    use super::*;

    fn request(nickname: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            nickname: nickname.into(),
            email: email.into(),
            password: "sprout".into(),
            city: Some("Metro City".into()),
            avatar: None,
        }
    }

    #[tokio::test]
    async fn register_hashes_password_and_rejects_duplicates() {
        let state = AppState::for_tests().await;
        let user = register_user(&state.db, request("leaf", "leaf@example.com"))
            .await
            .unwrap();
        assert_ne!(user.password, "sprout");

        let dup_email = register_user(&state.db, request("other", "LEAF@example.com")).await;
        assert!(matches!(dup_email, Err(AppError::Conflict(_))));

        let dup_nick = register_user(&state.db, request("leaf", "new@example.com")).await;
        assert!(matches!(dup_nick, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn login_by_email_or_nickname() {
        let state = AppState::for_tests().await;
        let user = register_user(&state.db, request("leaf", "leaf@example.com"))
            .await
            .unwrap();

        let by_email = authenticate(&state.db, "Leaf@Example.com", "sprout").await.unwrap();
        assert_eq!(by_email.id, user.id);
        let by_nick = authenticate(&state.db, "leaf", "sprout").await.unwrap();
        assert_eq!(by_nick.id, user.id);

        let wrong = authenticate(&state.db, "leaf", "weeds").await;
        assert!(matches!(wrong, Err(AppError::Unauthorized(_))));
        let unknown = authenticate(&state.db, "nobody", "sprout").await;
        assert!(matches!(unknown, Err(AppError::Unauthorized(_))));
    }
}
