use axum::http::Method;

use crate::api::profiles::Profile;
use crate::db::models::{FeedPost, Recipe};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;

/// Records with a single owning account.
pub trait Owned {
    fn owner_id(&self) -> &str;
}

impl Owned for Profile {
    fn owner_id(&self) -> &str {
        &self.id
    }
}

impl Owned for FeedPost {
    fn owner_id(&self) -> &str {
        &self.user
    }
}

impl Owned for Recipe {
    fn owner_id(&self) -> &str {
        &self.author
    }
}

fn safe_or_owner(method: &Method, actor: &CurrentUser, record: &impl Owned) -> bool {
    method.is_safe() || actor.id == record.owner_id()
}

/// Reads are open; writes only to your own profile.
pub fn can_modify_profile(method: &Method, actor: &CurrentUser, profile: &Profile) -> bool {
    safe_or_owner(method, actor, profile)
}

/// Reads are open; writes only to posts you own.
pub fn can_modify_feed_post(method: &Method, actor: &CurrentUser, post: &FeedPost) -> bool {
    safe_or_owner(method, actor, post)
}

pub fn can_modify_recipe(method: &Method, actor: &CurrentUser, recipe: &impl Owned) -> bool {
    safe_or_owner(method, actor, recipe)
}

/// Ingredients are shared between recipes, so only staff may change them.
pub fn can_manage_ingredient(method: &Method, actor: &CurrentUser) -> bool {
    method.is_safe() || actor.is_staff
}

/// Turn a predicate result into the response the caller sees: anonymous
/// writers get 401, authenticated ones that fail the check get 403.
pub fn enforce(
    method: &Method,
    actor: Option<&CurrentUser>,
    check: impl FnOnce(&CurrentUser) -> bool,
) -> AppResult<()> {
    if method.is_safe() {
        return Ok(());
    }
    let actor = actor.ok_or(AppError::Unauthorized)?;
    if check(actor) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}
