//! JSON CRUD endpoints.
//!
//! Each entity implements [`Resource`]; [`resource_router`] turns it into
//! `GET/POST /<path>/` and `GET/PUT/PATCH/DELETE /<path>/{id}/`. The acting
//! account is always handed to the resource explicitly.

pub mod feeds;
pub mod ingredients;
pub mod profiles;
pub mod query;
pub mod recipes;

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::routing::{get, MethodRouter};
use axum::{Json, Router};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::permissions;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::state::AppState;

pub use query::{ListQuery, QueryFields};

pub trait Resource: Send + Sync + 'static {
    /// Serialized representation returned to clients.
    type Record: Serialize + Send + 'static;
    type Create: DeserializeOwned + Send + 'static;
    /// Used for both PUT and PATCH; `partial` tells them apart.
    type Update: DeserializeOwned + Send + 'static;

    /// Collection path segment, e.g. `feeds`.
    const PATH: &'static str;
    const FIELDS: QueryFields;

    fn list(conn: &Connection, query: &ListQuery) -> AppResult<Vec<Self::Record>>;

    fn retrieve(conn: &Connection, id: &str) -> AppResult<Self::Record>;

    fn create(
        conn: &Connection,
        config: &Config,
        actor: Option<&CurrentUser>,
        input: Self::Create,
    ) -> AppResult<Self::Record>;

    fn update(
        conn: &Connection,
        config: &Config,
        actor: &CurrentUser,
        record: Self::Record,
        input: Self::Update,
        partial: bool,
    ) -> AppResult<Self::Record>;

    fn destroy(conn: &Connection, record: Self::Record) -> AppResult<()>;

    /// Collection-level check for POST. Defaults to "authenticated only".
    fn check_create(actor: Option<&CurrentUser>) -> AppResult<()> {
        actor.map(|_| ()).ok_or(AppError::Unauthorized)
    }

    /// Object-level check, run after the record is loaded.
    fn can_modify(method: &Method, actor: &CurrentUser, record: &Self::Record) -> bool;
}

pub fn resource_router<R: Resource>() -> Router<AppState> {
    let collection: MethodRouter<AppState> = get(list::<R>).post(create::<R>);
    let member: MethodRouter<AppState> = get(retrieve::<R>)
        .put(update::<R>)
        .patch(update::<R>)
        .delete(destroy::<R>);

    Router::new()
        .route(&format!("/{}", R::PATH), collection.clone())
        .route(&format!("/{}/", R::PATH), collection)
        .route(&format!("/{}/{{id}}", R::PATH), member.clone())
        .route(&format!("/{}/{{id}}/", R::PATH), member)
}

/// Deserialize a JSON body, reporting problems as a 400.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> AppResult<T> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|e| AppError::validation(format!("JSON parse error - {}", e)))
}

/// Required on PUT, optional on PATCH.
pub fn required<T>(value: Option<T>, partial: bool, field: &str) -> AppResult<Option<T>> {
    match value {
        None if !partial => Err(AppError::validation(format!(
            "{}: This field is required.",
            field
        ))),
        other => Ok(other),
    }
}

/// Trimmed, non-blank text of at most `max` characters.
pub fn clean_text(value: &str, field: &str, max: usize) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!(
            "{}: This field may not be blank.",
            field
        )));
    }
    if value.chars().count() > max {
        return Err(AppError::validation(format!(
            "{}: Ensure this field has no more than {} characters.",
            field, max
        )));
    }
    Ok(value.to_string())
}

async fn list<R: Resource>(
    State(state): State<AppState>,
    _user: MaybeUser,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<R::Record>>> {
    let query = ListQuery::from_params(&params)?;
    let conn = state.db.get()?;
    Ok(Json(R::list(&conn, &query)?))
}

async fn create<R: Resource>(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    body: Bytes,
) -> AppResult<(StatusCode, Json<R::Record>)> {
    R::check_create(user.as_ref())?;
    let input: R::Create = parse_body(&body)?;

    let conn = state.db.get()?;
    let record = R::create(&conn, &state.config, user.as_ref(), input)?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn retrieve<R: Resource>(
    State(state): State<AppState>,
    _user: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<R::Record>> {
    let conn = state.db.get()?;
    Ok(Json(R::retrieve(&conn, &id)?))
}

async fn update<R: Resource>(
    State(state): State<AppState>,
    method: Method,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<R::Record>> {
    let actor = user.as_ref().ok_or(AppError::Unauthorized)?;
    let conn = state.db.get()?;
    let record = R::retrieve(&conn, &id)?;
    permissions::enforce(&method, Some(actor), |a| R::can_modify(&method, a, &record))?;

    let input: R::Update = parse_body(&body)?;
    let partial = method == Method::PATCH;
    Ok(Json(R::update(
        &conn,
        &state.config,
        actor,
        record,
        input,
        partial,
    )?))
}

async fn destroy<R: Resource>(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let actor = user.as_ref().ok_or(AppError::Unauthorized)?;
    let conn = state.db.get()?;
    let record = R::retrieve(&conn, &id)?;
    permissions::enforce(&Method::DELETE, Some(actor), |a| {
        R::can_modify(&Method::DELETE, a, &record)
    })?;

    R::destroy(&conn, record)?;
    Ok(StatusCode::NO_CONTENT)
}
