use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use crate::constants::*;
use crate::database::{Db, optional_integer, optional_text, text_or_null};
use crate::models::{
    ChangePasswordPayload, LoginPayload, PublicUser, RegisterPayload, TokenResponse,
    UpdateProfilePayload, User,
};
use crate::state::AppState;
use crate::utils::{ApiError, bad_request, now_timestamp, validate_string_length};

/// The caller behind a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub token: String,
}

fn unauthorized() -> ApiError {
    (StatusCode::UNAUTHORIZED, ERR_UNAUTHORIZED.to_string())
}

fn internal(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

pub fn bearer_token(headers: &axum::http::HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(unauthorized)?;
        lookup_session(&state.main_db, &token)
            .await
            .map_err(internal)?
            .ok_or_else(unauthorized)
    }
}

async fn lookup_session(db: &Db, token: &str) -> anyhow::Result<Option<AuthUser>> {
    let conn = db.read().await;
    let mut rows = conn
        .query(
            "SELECT s.user_id, s.expires_at, u.email FROM sessions s \
             JOIN users u ON u.id = s.user_id WHERE s.token = ?",
            [token],
        )
        .await?;

    let Some(row) = rows.next().await? else {
        return Ok(None);
    };
    let user_id: String = row.get(0)?;
    let expires_at: i64 = row.get(1)?;
    let email: String = row.get(2)?;
    drop(rows);
    drop(conn);

    if expires_at <= now_timestamp() {
        tracing::debug!(user_id = %user_id, "rejecting expired token");
        let conn = db.write().await;
        conn.execute("DELETE FROM sessions WHERE token = ?", [token])
            .await?;
        return Ok(None);
    }

    Ok(Some(AuthUser {
        id: user_id,
        email,
        token: token.to_string(),
    }))
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    validate_string_length(email, "Email", MAX_EMAIL_LENGTH)?;
    let Some((local, domain)) = email.split_once('@') else {
        return Err(bad_request("Email must be a valid address"));
    };
    if local.is_empty() || domain.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(bad_request("Email must be a valid address"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(bad_request(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

fn clean_name(name: Option<String>) -> Result<Option<String>, ApiError> {
    match name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
        Some(n) => {
            validate_string_length(&n, "Name", MAX_NAME_LENGTH)?;
            Ok(Some(n))
        }
        None => Ok(None),
    }
}

async fn create_user(
    db: &Db,
    email: &str,
    password: &str,
    name: Option<&str>,
) -> anyhow::Result<PublicUser> {
    let hash = hash_password(password)?;
    let id = Uuid::new_v4().to_string();
    let created_at = now_timestamp();
    let conn = db.write().await;

    conn.execute(
        "INSERT INTO users (id, email, name, password_hash, created_at) VALUES (?, ?, ?, ?, ?)",
        (id.as_str(), email, text_or_null(name), hash.as_str(), created_at),
    )
    .await?;

    Ok(PublicUser {
        id,
        email: email.to_string(),
        name: name.map(str::to_string),
        created_at,
    })
}

pub async fn register(
    State(db): State<Db>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let email = normalize_email(&payload.email);
    validate_email(&email)?;
    validate_password(&payload.password)?;
    let name = clean_name(payload.name)?;

    let user = create_user(&db, &email, &payload.password, name.as_deref())
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                (StatusCode::CONFLICT, "Email already registered".to_string())
            } else {
                internal(e)
            }
        })?;

    tracing::info!(user_id = %user.id, "registered user");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn find_user(db: &Db, column: &str, value: &str) -> anyhow::Result<Option<User>> {
    let conn = db.read().await;
    let sql = format!(
        "SELECT id, email, name, password_hash, created_at FROM users WHERE {} = ?",
        column
    );
    let mut rows = conn.query(&sql, [value]).await?;

    if let Some(row) = rows.next().await? {
        Ok(Some(User {
            id: row.get(0)?,
            email: row.get(1)?,
            name: optional_text(&row, 2)?,
            password_hash: row.get(3)?,
            created_at: optional_integer(&row, 4)?.unwrap_or_default(),
        }))
    } else {
        Ok(None)
    }
}

pub async fn get_user_by_email(db: &Db, email: &str) -> anyhow::Result<Option<User>> {
    find_user(db, "email", email).await
}

pub async fn get_user_by_id(db: &Db, id: &str) -> anyhow::Result<Option<User>> {
    find_user(db, "id", id).await
}

async fn issue_token(db: &Db, user_id: &str, expiry_minutes: i64) -> anyhow::Result<String> {
    let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    let expires_at = now_timestamp() + expiry_minutes * 60;
    let conn = db.write().await;
    conn.execute(
        "DELETE FROM sessions WHERE user_id = ? AND expires_at <= ?",
        (user_id, now_timestamp()),
    )
    .await?;
    conn.execute(
        "INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)",
        (token.as_str(), user_id, expires_at),
    )
    .await?;
    Ok(token)
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let email = normalize_email(&payload.email);
    if email.is_empty() {
        return Err(bad_request("Email cannot be empty"));
    }
    if payload.password.is_empty() {
        return Err(bad_request("Password cannot be empty"));
    }

    let user = get_user_by_email(&state.main_db, &email)
        .await
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, ERR_INVALID_CREDENTIALS.to_string()))?;

    let is_valid = verify_password(&payload.password, &user.password_hash).map_err(internal)?;
    if !is_valid {
        tracing::warn!(user_id = %user.id, "failed login attempt");
        return Err((StatusCode::UNAUTHORIZED, ERR_INVALID_CREDENTIALS.to_string()));
    }

    let access_token = issue_token(&state.main_db, &user.id, state.config.token_expiry_minutes)
        .await
        .map_err(internal)?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok((
        StatusCode::OK,
        Json(TokenResponse {
            access_token,
            token_type: TOKEN_TYPE.to_string(),
        }),
    ))
}

pub async fn me(
    user: AuthUser,
    State(db): State<Db>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let stored = get_user_by_id(&db, &user.id)
        .await
        .map_err(internal)?
        .ok_or_else(unauthorized)?;
    Ok((StatusCode::OK, Json(stored.into())))
}

pub async fn update_me(
    user: AuthUser,
    State(db): State<Db>,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let mut stored = get_user_by_id(&db, &user.id)
        .await
        .map_err(internal)?
        .ok_or_else(unauthorized)?;

    if let Some(email) = payload.email {
        let email = normalize_email(&email);
        validate_email(&email)?;
        stored.email = email;
    }
    if payload.name.is_some() {
        stored.name = clean_name(payload.name)?;
    }

    let conn = db.write().await;
    conn.execute(
        "UPDATE users SET email = ?, name = ?, updated_at = ? WHERE id = ?",
        (
            stored.email.as_str(),
            text_or_null(stored.name.as_deref()),
            now_timestamp(),
            stored.id.as_str(),
        ),
    )
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            (StatusCode::CONFLICT, "Email already registered".to_string())
        } else {
            internal(e)
        }
    })?;

    Ok((StatusCode::OK, Json(stored.into())))
}

pub async fn change_password(
    user: AuthUser,
    State(db): State<Db>,
    Json(payload): Json<ChangePasswordPayload>,
) -> Result<StatusCode, ApiError> {
    validate_password(&payload.new_password)?;

    let stored = get_user_by_id(&db, &user.id)
        .await
        .map_err(internal)?
        .ok_or_else(unauthorized)?;

    if !verify_password(&payload.current_password, &stored.password_hash).map_err(internal)? {
        return Err(bad_request("Current password is incorrect"));
    }

    let hash = hash_password(&payload.new_password).map_err(internal)?;
    let conn = db.write().await;
    conn.execute(
        "UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?",
        (hash.as_str(), now_timestamp(), user.id.as_str()),
    )
    .await
    .map_err(internal)?;

    tracing::info!(user_id = %user.id, "password changed");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn logout(user: AuthUser, State(db): State<Db>) -> Result<StatusCode, ApiError> {
    let conn = db.write().await;
    conn.execute("DELETE FROM sessions WHERE token = ?", [user.token.as_str()])
        .await
        .map_err(internal)?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer   xyz"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn email_validation() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("ana.example.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ana @example.com").is_err());
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }

    #[test]
    fn password_roundtrip() {
        let hash = hash_password("secret123").unwrap();
        assert!(verify_password("secret123", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
        assert!(validate_password("12345").is_err());
    }
}
