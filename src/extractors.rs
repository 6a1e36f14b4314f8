use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::auth::tokens;
use crate::db::models::Account;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Represents the currently authenticated account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl From<Account> for CurrentUser {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            name: account.name,
            is_staff: account.is_staff,
            is_superuser: account.is_superuser,
        }
    }
}

/// Extractor that requires authentication.
/// Returns 401 if no valid token is presented.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)?.ok_or(AppError::Unauthorized)
    }
}

/// Optional user extractor. Anonymous requests yield `None`, but a bad
/// token is still rejected with 401.
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(authenticate(parts, state)?))
    }
}

/// The raw token from the Authorization header, for logout.
pub struct BearerToken(pub String);

impl FromRequestParts<AppState> for BearerToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        extract_token(parts)?
            .map(|key| BearerToken(key.to_string()))
            .ok_or(AppError::Unauthorized)
    }
}

fn authenticate(parts: &Parts, state: &AppState) -> AppResult<Option<CurrentUser>> {
    let Some(key) = extract_token(parts)? else {
        return Ok(None);
    };

    let conn = state.db.get()?;
    match tokens::lookup_token(&conn, key)? {
        Some(account) if account.is_active => Ok(Some(account.into())),
        Some(_) => Err(AppError::AuthenticationFailed(
            "User inactive or deleted.".into(),
        )),
        None => Err(AppError::AuthenticationFailed("Invalid token.".into())),
    }
}

/// `Authorization: Token <key>` or `Authorization: Bearer <key>`.
/// Other schemes are treated as anonymous.
fn extract_token(parts: &Parts) -> AppResult<Option<&str>> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::AuthenticationFailed("Invalid token header.".into()))?;

    let mut split = value.trim().splitn(2, ' ');
    let scheme = split.next().unwrap_or_default();
    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        return Ok(None);
    }

    match split.next().map(str::trim) {
        Some(key) if !key.is_empty() && !key.contains(' ') => Ok(Some(key)),
        _ => Err(AppError::AuthenticationFailed(
            "Invalid token header. No credentials provided.".into(),
        )),
    }
}
