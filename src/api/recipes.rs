use std::collections::BTreeSet;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{Method, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use rusqlite::{params, params_from_iter, Connection};
use serde::{Deserialize, Serialize};

use crate::api::{clean_text, required, ListQuery, QueryFields, Resource};
use crate::auth::permissions;
use crate::config::Config;
use crate::db::{self, models::Diet, models::Recipe};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

/// URL prefix under which uploaded files are served.
pub const MEDIA_PREFIX: &str = "/media/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeRecord {
    pub id: String,
    pub author: String,
    pub title: String,
    pub image: Option<String>,
    pub time_mins: u32,
    pub ingredients: Vec<String>,
    pub diet: Diet,
    pub created: String,
    pub updated: String,
    pub total_calories: u64,
    pub upvotes: u64,
}

impl permissions::Owned for RecipeRecord {
    fn owner_id(&self) -> &str {
        &self.author
    }
}

#[derive(Debug, Deserialize)]
pub struct RecipeCreate {
    #[serde(default)]
    pub title: String,
    pub time_mins: Option<u32>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub diet: Diet,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipeUpdate {
    pub title: Option<String>,
    pub time_mins: Option<u32>,
    pub ingredients: Option<Vec<String>>,
    pub diet: Option<Diet>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpvoteSummary {
    pub recipe: String,
    pub upvotes: u64,
    pub upvoted: bool,
}

pub struct Recipes;

/// Sum of calories over the recipe's ingredient set. Zero when it has none.
pub fn total_calories(conn: &Connection, recipe_id: &str) -> AppResult<u64> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(i.calories), 0)
         FROM recipe_ingredients ri
         JOIN ingredients i ON i.id = ri.ingredient_id
         WHERE ri.recipe_id = ?1",
        params![recipe_id],
        |row| row.get(0),
    )?;
    Ok(total.max(0) as u64)
}

pub fn upvote_count(conn: &Connection, recipe_id: &str) -> AppResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM upvotes WHERE recipe_id = ?1",
        params![recipe_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

fn ingredient_ids(conn: &Connection, recipe_id: &str) -> AppResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT ingredient_id FROM recipe_ingredients WHERE recipe_id = ?1 ORDER BY ingredient_id",
    )?;
    let ids = stmt
        .query_map(params![recipe_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn to_record(conn: &Connection, recipe: Recipe) -> AppResult<RecipeRecord> {
    Ok(RecipeRecord {
        ingredients: ingredient_ids(conn, &recipe.id)?,
        total_calories: total_calories(conn, &recipe.id)?,
        upvotes: upvote_count(conn, &recipe.id)?,
        image: recipe.image.map(|path| format!("{}{}", MEDIA_PREFIX, path)),
        id: recipe.id,
        author: recipe.author,
        title: recipe.title,
        time_mins: recipe.time_mins,
        diet: recipe.diet,
        created: recipe.created,
        updated: recipe.updated,
    })
}

/// Deduplicate and check that every ingredient exists.
fn validate_ingredients(conn: &Connection, ids: Vec<String>) -> AppResult<BTreeSet<String>> {
    let ids: BTreeSet<String> = ids.into_iter().collect();
    for id in &ids {
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM ingredients WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(AppError::validation(format!(
                "ingredients: Invalid pk \"{}\" - object does not exist.",
                id
            )));
        }
    }
    Ok(ids)
}

fn replace_ingredients(
    conn: &Connection,
    recipe_id: &str,
    ids: &BTreeSet<String>,
) -> AppResult<()> {
    conn.execute(
        "DELETE FROM recipe_ingredients WHERE recipe_id = ?1",
        params![recipe_id],
    )?;
    for id in ids {
        conn.execute(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id) VALUES (?1, ?2)",
            params![recipe_id, id],
        )?;
    }
    Ok(())
}

impl Resource for Recipes {
    type Record = RecipeRecord;
    type Create = RecipeCreate;
    type Update = RecipeUpdate;

    const PATH: &'static str = "recipes";
    const FIELDS: QueryFields = QueryFields {
        search: &["title"],
        filters: &[("author", "author_id"), ("diet", "diet")],
        ordering: &[
            ("title", "title"),
            ("time_mins", "time_mins"),
            ("created", "created"),
            ("updated", "updated"),
        ],
        default_ordering: "created DESC, id DESC",
    };

    fn list(conn: &Connection, query: &ListQuery) -> AppResult<Vec<RecipeRecord>> {
        let select = format!("SELECT {} FROM recipes", Recipe::COLUMNS);
        let built = Self::FIELDS.build(&select, query);
        let mut stmt = conn.prepare(&built.sql)?;
        let recipes = stmt
            .query_map(params_from_iter(built.params.iter()), Recipe::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        recipes
            .into_iter()
            .map(|recipe| to_record(conn, recipe))
            .collect()
    }

    fn retrieve(conn: &Connection, id: &str) -> AppResult<RecipeRecord> {
        to_record(conn, Recipe::get(conn, id)?)
    }

    fn create(
        conn: &Connection,
        _config: &Config,
        actor: Option<&CurrentUser>,
        input: RecipeCreate,
    ) -> AppResult<RecipeRecord> {
        let actor = actor.ok_or(AppError::Unauthorized)?;
        let title = clean_text(&input.title, "title", 255)?;
        let time_mins = input
            .time_mins
            .ok_or_else(|| AppError::validation("time_mins: This field is required."))?;
        let ingredients = validate_ingredients(conn, input.ingredients)?;

        let id = db::new_id();
        let now = db::now();
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO recipes (id, author_id, title, time_mins, diet, created, updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![id, actor.id, title, time_mins, input.diet, now],
        )?;
        replace_ingredients(&tx, &id, &ingredients)?;
        tx.commit()?;

        Self::retrieve(conn, &id)
    }

    fn update(
        conn: &Connection,
        _config: &Config,
        _actor: &CurrentUser,
        record: RecipeRecord,
        input: RecipeUpdate,
        partial: bool,
    ) -> AppResult<RecipeRecord> {
        let title = match required(input.title, partial, "title")? {
            Some(title) => clean_text(&title, "title", 255)?,
            None => record.title,
        };
        let time_mins = required(input.time_mins, partial, "time_mins")?.unwrap_or(record.time_mins);
        // An omitted diet keeps its stored value on PUT as well as PATCH
        let diet = input.diet.unwrap_or(record.diet);
        let ingredients = match required(input.ingredients, partial, "ingredients")? {
            Some(ids) => Some(validate_ingredients(conn, ids)?),
            None => None,
        };

        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE recipes SET title = ?1, time_mins = ?2, diet = ?3, updated = ?4 WHERE id = ?5",
            params![title, time_mins, diet, db::now(), record.id],
        )?;
        if let Some(ids) = ingredients {
            replace_ingredients(&tx, &record.id, &ids)?;
        }
        tx.commit()?;

        Self::retrieve(conn, &record.id)
    }

    fn destroy(conn: &Connection, record: RecipeRecord) -> AppResult<()> {
        conn.execute("DELETE FROM recipes WHERE id = ?1", params![record.id])?;
        Ok(())
    }

    fn can_modify(method: &Method, actor: &CurrentUser, record: &RecipeRecord) -> bool {
        permissions::can_modify_recipe(method, actor, record)
    }
}

/// Routes for recipe actions beyond plain CRUD.
pub fn actions_router(max_upload_bytes: usize) -> Router<AppState> {
    let upload = post(upload_image).layer(DefaultBodyLimit::max(max_upload_bytes + 64 * 1024));
    let upvote = post(add_upvote).delete(remove_upvote);

    Router::new()
        .route("/recipes/{id}/image", upload.clone())
        .route("/recipes/{id}/image/", upload)
        .route("/recipes/{id}/upvote", upvote.clone())
        .route("/recipes/{id}/upvote/", upvote)
}

/// POST /recipes/{id}/upvote/ - idempotent; 201 on first vote, 200 after
async fn add_upvote(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<UpvoteSummary>)> {
    let conn = state.db.get()?;
    Recipe::get(&conn, &id)?;

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO upvotes (id, user_id, recipe_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![db::new_id(), user.id, id, db::now()],
    )?;

    let status = if inserted > 0 {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let upvotes = upvote_count(&conn, &id)?;
    Ok((
        status,
        Json(UpvoteSummary {
            recipe: id,
            upvotes,
            upvoted: true,
        }),
    ))
}

/// DELETE /recipes/{id}/upvote/
async fn remove_upvote(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    Recipe::get(&conn, &id)?;
    conn.execute(
        "DELETE FROM upvotes WHERE user_id = ?1 AND recipe_id = ?2",
        params![user.id, id],
    )?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /recipes/{id}/image/ - multipart upload of the `image` field
async fn upload_image(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> AppResult<Json<RecipeRecord>> {
    let recipe = {
        let conn = state.db.get()?;
        Recipe::get(&conn, &id)?
    };
    permissions::enforce(&Method::POST, Some(&user), |a| {
        permissions::can_modify_recipe(&Method::POST, a, &recipe)
    })?;

    let max = state.config.storage.max_upload_bytes;
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(e.body_text()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;
        if data.is_empty() {
            return Err(AppError::validation("image: The submitted file is empty."));
        }
        if data.len() > max {
            return Err(AppError::validation(format!(
                "image: File exceeds the {} byte limit.",
                max
            )));
        }
        let kind = ImageKind::detect(&content_type, &data).ok_or_else(|| {
            AppError::validation(
                "image: Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
            )
        })?;
        upload = Some((kind, data));
        break;
    }
    let (kind, data) =
        upload.ok_or_else(|| AppError::validation("image: No file was submitted."))?;

    let relative = format!("images/{}.{}", db::new_id(), kind.extension());
    let uploads = state.config.uploads_path();
    let target = uploads.join(&relative);
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, &data).await?;

    // The row must point at the new file before the old one goes away
    let stored = state.db.get().map_err(AppError::from).and_then(|conn| {
        conn.execute(
            "UPDATE recipes SET image = ?1, updated = ?2 WHERE id = ?3",
            params![relative, db::now(), recipe.id],
        )?;
        Ok(conn)
    });
    let conn = match stored {
        Ok(conn) => conn,
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(&target).await {
                tracing::warn!("Could not remove unused image {}: {}", relative, cleanup);
            }
            return Err(e);
        }
    };
    tracing::info!("Stored image for recipe {} at {}", recipe.id, relative);

    if let Some(old) = &recipe.image {
        if let Err(e) = tokio::fs::remove_file(uploads.join(old)).await {
            tracing::warn!("Could not remove old image {}: {}", old, e);
        }
    }

    Ok(Json(Recipes::retrieve(&conn, &recipe.id)?))
}

/// Raster formats accepted for recipe images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageKind {
    const ALL: [ImageKind; 4] = [ImageKind::Png, ImageKind::Jpeg, ImageKind::Gif, ImageKind::Webp];

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Gif => "image/gif",
            ImageKind::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Gif => "gif",
            ImageKind::Webp => "webp",
        }
    }

    fn matches_magic(&self, data: &[u8]) -> bool {
        match self {
            ImageKind::Png => data.starts_with(b"\x89PNG\r\n\x1a\n"),
            ImageKind::Jpeg => data.starts_with(&[0xFF, 0xD8, 0xFF]),
            ImageKind::Gif => data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a"),
            ImageKind::Webp => data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP",
        }
    }

    /// The declared content type and the leading bytes must agree on one
    /// allowed format. The client's file name is never consulted.
    pub fn detect(content_type: &str, data: &[u8]) -> Option<Self> {
        let declared = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let declared = if declared == "image/jpg" || declared == "image/pjpeg" {
            "image/jpeg".to_string()
        } else {
            declared
        };

        Self::ALL
            .into_iter()
            .find(|kind| kind.mime_type() == declared)
            .filter(|kind| kind.matches_magic(data))
    }
}
