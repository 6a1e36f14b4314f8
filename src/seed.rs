use std::path::Path;

use rusqlite::{params, Connection};
use serde::Deserialize;

use crate::api::feeds::insert_post;
use crate::auth::AccountManager;
use crate::db::{self, models::Account};
use crate::error::{AppError, AppResult};

/// Demo data compiled into the binary.
pub const DEMO_FIXTURE: &str = include_str!("../fixtures/demo.json");

#[derive(Debug, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub users: Vec<FixtureUser>,
    #[serde(default)]
    pub feeds: Vec<FixtureFeed>,
    #[serde(default)]
    pub ingredients: Vec<FixtureIngredient>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureUser {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// A feed post; `user` is the author's email.
#[derive(Debug, Deserialize)]
pub struct FixtureFeed {
    pub user: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct FixtureIngredient {
    pub name: String,
    pub calories: u32,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users_created: usize,
    pub users_skipped: usize,
    pub feeds_created: usize,
    pub ingredients_created: usize,
}

impl Fixture {
    pub fn demo() -> AppResult<Self> {
        Ok(serde_json::from_str(DEMO_FIXTURE)?)
    }
}

/// Read a fixture file, or the embedded demo data when no path is given.
pub fn load_fixture(path: Option<&Path>) -> AppResult<Fixture> {
    match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        }
        None => Fixture::demo(),
    }
}

/// Insert the fixture's users, posts and ingredients in one transaction.
/// Users whose email already exists are left untouched.
pub fn seed(conn: &Connection, hash_cost: u32, fixture: &Fixture) -> AppResult<SeedSummary> {
    let tx = conn.unchecked_transaction()?;
    let manager = AccountManager::new(&tx, hash_cost);
    let mut summary = SeedSummary::default();

    for user in &fixture.users {
        let email = crate::auth::password::normalize_email(&user.email);
        if Account::find_by_email(&tx, &email)?.is_some() {
            tracing::debug!("Skipping existing account {}", email);
            summary.users_skipped += 1;
            continue;
        }
        manager.create_account(&user.email, &user.name, Some(&user.password))?;
        summary.users_created += 1;
    }

    for feed in &fixture.feeds {
        let email = crate::auth::password::normalize_email(&feed.user);
        let author = Account::find_by_email(&tx, &email)?.ok_or_else(|| {
            AppError::validation(format!("Feed post references unknown user {}", feed.user))
        })?;
        insert_post(&tx, &author.id, &feed.text)?;
        summary.feeds_created += 1;
    }

    for ingredient in &fixture.ingredients {
        tx.execute(
            "INSERT INTO ingredients (id, name, calories) VALUES (?1, ?2, ?3)",
            params![db::new_id(), ingredient.name, ingredient.calories],
        )?;
        summary.ingredients_created += 1;
    }

    tx.commit()?;
    tracing::info!(
        "Seeded {} users ({} skipped), {} feed posts, {} ingredients",
        summary.users_created,
        summary.users_skipped,
        summary.feeds_created,
        summary.ingredients_created
    );
    Ok(summary)
}
