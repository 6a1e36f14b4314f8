use axum::http::Method;
use rusqlite::{params, params_from_iter, Connection};
use serde::Deserialize;

use crate::api::{clean_text, required, ListQuery, QueryFields, Resource};
use crate::auth::permissions;
use crate::config::Config;
use crate::db::{self, models::FeedPost};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;

pub const MAX_TEXT_LEN: usize = 255;

/// Only `text` is writable. A submitted `user` is ignored: the owner is
/// always the caller.
#[derive(Debug, Deserialize)]
pub struct FeedPostCreate {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedPostUpdate {
    pub text: Option<String>,
}

pub struct Feeds;

/// Insert a post owned by `user_id`.
pub fn insert_post(conn: &Connection, user_id: &str, text: &str) -> AppResult<FeedPost> {
    let post = FeedPost {
        id: db::new_id(),
        user: user_id.to_string(),
        text: clean_text(text, "text", MAX_TEXT_LEN)?,
        created_on: db::now(),
    };
    conn.execute(
        "INSERT INTO feed_posts (id, user_id, text, created_on) VALUES (?1, ?2, ?3, ?4)",
        params![post.id, post.user, post.text, post.created_on],
    )?;
    Ok(post)
}

impl Resource for Feeds {
    type Record = FeedPost;
    type Create = FeedPostCreate;
    type Update = FeedPostUpdate;

    const PATH: &'static str = "feeds";
    const FIELDS: QueryFields = QueryFields {
        search: &["text"],
        filters: &[("user", "user_id"), ("text", "text"), ("created_on", "created_on")],
        ordering: &[("user", "user_id"), ("text", "text"), ("created_on", "created_on")],
        default_ordering: "created_on DESC, id DESC",
    };

    fn list(conn: &Connection, query: &ListQuery) -> AppResult<Vec<FeedPost>> {
        let select = format!("SELECT {} FROM feed_posts", FeedPost::COLUMNS);
        let built = Self::FIELDS.build(&select, query);
        let mut stmt = conn.prepare(&built.sql)?;
        let posts = stmt
            .query_map(params_from_iter(built.params.iter()), FeedPost::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    fn retrieve(conn: &Connection, id: &str) -> AppResult<FeedPost> {
        conn.query_row(
            &format!("SELECT {} FROM feed_posts WHERE id = ?1", FeedPost::COLUMNS),
            params![id],
            FeedPost::from_row,
        )
        .map_err(db::not_found)
    }

    fn create(
        conn: &Connection,
        _config: &Config,
        actor: Option<&CurrentUser>,
        input: FeedPostCreate,
    ) -> AppResult<FeedPost> {
        let actor = actor.ok_or(AppError::Unauthorized)?;
        insert_post(conn, &actor.id, &input.text)
    }

    fn update(
        conn: &Connection,
        _config: &Config,
        _actor: &CurrentUser,
        record: FeedPost,
        input: FeedPostUpdate,
        partial: bool,
    ) -> AppResult<FeedPost> {
        let Some(text) = required(input.text, partial, "text")? else {
            return Ok(record);
        };
        let text = clean_text(&text, "text", MAX_TEXT_LEN)?;
        conn.execute(
            "UPDATE feed_posts SET text = ?1 WHERE id = ?2",
            params![text, record.id],
        )?;
        Ok(FeedPost { text, ..record })
    }

    fn destroy(conn: &Connection, record: FeedPost) -> AppResult<()> {
        conn.execute("DELETE FROM feed_posts WHERE id = ?1", params![record.id])?;
        Ok(())
    }

    fn can_modify(method: &Method, actor: &CurrentUser, record: &FeedPost) -> bool {
        permissions::can_modify_feed_post(method, actor, record)
    }
}
