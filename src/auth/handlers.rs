use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::parse_body;
use crate::api::profiles::Profile;
use crate::auth::{tokens, AccountManager};
use crate::db::models::Account;
use crate::error::{AppError, AppResult};
use crate::extractors::{BearerToken, CurrentUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default, alias = "username")]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/login/", post(login))
        .route("/logout", post(logout))
        .route("/logout/", post(logout))
        .route("/me", get(me))
        .route("/me/", get(me))
}

/// POST /login/ - exchange email + password for a token
pub async fn login(
    State(state): State<AppState>,
    body: axum::body::Bytes,
) -> AppResult<Json<LoginResponse>> {
    let req: LoginRequest = parse_body(&body)?;
    if req.email.trim().is_empty() {
        return Err(AppError::validation("email: This field is required."));
    }
    if req.password.is_empty() {
        return Err(AppError::validation("password: This field is required."));
    }

    let conn = state.db.get()?;
    let account = AccountManager::new(&conn, state.config.auth.hash_cost)
        .authenticate(&req.email, &req.password)?;
    let token = tokens::issue_token(&conn, &account.id, state.config.auth.token_hours)?;

    Ok(Json(LoginResponse { token }))
}

/// POST /logout/ - revoke the presented token
pub async fn logout(
    State(state): State<AppState>,
    _user: CurrentUser,
    BearerToken(key): BearerToken,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    tokens::revoke_token(&conn, &key)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /me/ - the caller's own profile
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<Profile>> {
    let conn = state.db.get()?;
    let account = Account::get(&conn, &user.id)?;
    Ok(Json(account.into()))
}
