//! Library-level tests for accounts, the resource layer and seeding.
//!
//! These go straight through the public modules without HTTP:
//! - Credential storage and login
//! - Ownership forced on feed posts and recipes
//! - Recipe calorie aggregate and upvote uniqueness
//! - Cascading deletes
//! - Demo fixture seeding

use rusqlite::params;
use tempfile::TempDir;

use potluck::api::feeds::{FeedPostCreate, Feeds};
use potluck::api::ingredients::{IngredientCreate, Ingredients};
use potluck::api::recipes::{self, RecipeCreate, Recipes};
use potluck::api::Resource;
use potluck::auth::{tokens, AccountManager};
use potluck::config::Config;
use potluck::db::{self, models::Diet};
use potluck::error::AppError;
use potluck::extractors::CurrentUser;
use potluck::seed;
use potluck::state::DbPool;

// Helper to create a migrated test database
fn create_test_db() -> (TempDir, DbPool) {
    let temp_dir = TempDir::new().unwrap();
    let pool = db::create_pool(&temp_dir.path().join("test.db")).unwrap();
    db::run_migrations(&pool).unwrap();
    (temp_dir, pool)
}

fn actor(conn: &rusqlite::Connection, email: &str) -> CurrentUser {
    AccountManager::new(conn, 4)
        .create_account(email, email, Some("testing321"))
        .unwrap()
        .into()
}

fn count(conn: &rusqlite::Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .unwrap()
}

// ============================================================================
// CREDENTIALS
// ============================================================================

#[test]
fn test_raw_password_is_never_stored() {
    let (_tmp, pool) = create_test_db();
    let conn = pool.get().unwrap();

    AccountManager::new(&conn, 4)
        .create_account("manas@example.com", "Manas", Some("testing321"))
        .unwrap();

    let stored: String = conn
        .query_row("SELECT password_hash FROM accounts", [], |r| r.get(0))
        .unwrap();
    assert_ne!(stored, "testing321");
    assert!(!stored.contains("testing321"));
    assert!(stored.starts_with("$2"));
}

#[test]
fn test_login_issues_token_that_resolves_to_account() {
    let (_tmp, pool) = create_test_db();
    let conn = pool.get().unwrap();
    let manager = AccountManager::new(&conn, 4);

    let created = manager
        .create_account("divya@example.com", "Divya", Some("testing321"))
        .unwrap();
    let account = manager.authenticate("divya@example.com", "testing321").unwrap();
    let token = tokens::issue_token(&conn, &account.id, 1).unwrap();
    assert!(!token.is_empty());

    let resolved = tokens::lookup_token(&conn, &token).unwrap().unwrap();
    assert_eq!(resolved.id, created.id);

    assert!(matches!(
        manager.authenticate("divya@example.com", "wrong"),
        Err(AppError::AuthenticationFailed(_))
    ));
}

// ============================================================================
// RESOURCES
// ============================================================================

#[test]
fn test_feed_create_sets_owner_from_actor() {
    let (_tmp, pool) = create_test_db();
    let conn = pool.get().unwrap();
    let config = Config::default();
    let alice = actor(&conn, "alice@example.com");

    let post = Feeds::create(
        &conn,
        &config,
        Some(&alice),
        FeedPostCreate {
            text: "hello".into(),
        },
    )
    .unwrap();
    assert_eq!(post.user, alice.id);

    assert!(matches!(
        Feeds::create(&conn, &config, None, FeedPostCreate { text: "x".into() }),
        Err(AppError::Unauthorized)
    ));
}

#[test]
fn test_total_calories_sums_linked_ingredients() {
    let (_tmp, pool) = create_test_db();
    let conn = pool.get().unwrap();
    let config = Config::default();
    let chef = actor(&conn, "chef@example.com");

    let mut ids = Vec::new();
    for (name, calories) in [("Rice", 130), ("Lentils", 116), ("Ghee", 112)] {
        let ingredient = Ingredients::create(
            &conn,
            &config,
            Some(&chef),
            IngredientCreate {
                name: name.into(),
                calories: Some(calories),
            },
        )
        .unwrap();
        ids.push(ingredient.id);
    }

    let recipe = Recipes::create(
        &conn,
        &config,
        Some(&chef),
        RecipeCreate {
            title: "Khichdi".into(),
            time_mins: Some(35),
            ingredients: ids.clone(),
            diet: Diet::Balanced,
        },
    )
    .unwrap();
    assert_eq!(recipe.author, chef.id);
    assert_eq!(recipe.total_calories, 358);
    assert_eq!(recipes::total_calories(&conn, &recipe.id).unwrap(), 358);

    let empty = Recipes::create(
        &conn,
        &config,
        Some(&chef),
        RecipeCreate {
            title: "Water".into(),
            time_mins: Some(0),
            ingredients: Vec::new(),
            diet: Diet::Balanced,
        },
    )
    .unwrap();
    assert_eq!(empty.total_calories, 0);

    // Deleting an ingredient drops it from the aggregate
    conn.execute("DELETE FROM ingredients WHERE id = ?1", params![ids[2]])
        .unwrap();
    assert_eq!(recipes::total_calories(&conn, &recipe.id).unwrap(), 246);
}

#[test]
fn test_upvote_is_unique_per_user_and_recipe() {
    let (_tmp, pool) = create_test_db();
    let conn = pool.get().unwrap();
    let chef = actor(&conn, "chef@example.com");
    let recipe = Recipes::create(
        &conn,
        &Config::default(),
        Some(&chef),
        RecipeCreate {
            title: "Toast".into(),
            time_mins: Some(3),
            ingredients: Vec::new(),
            diet: Diet::LowFat,
        },
    )
    .unwrap();

    let insert = "INSERT INTO upvotes (id, user_id, recipe_id, created_at) VALUES (?1, ?2, ?3, ?4)";
    conn.execute(insert, params![db::new_id(), chef.id, recipe.id, db::now()])
        .unwrap();
    assert!(conn
        .execute(insert, params![db::new_id(), chef.id, recipe.id, db::now()])
        .is_err());
    assert_eq!(recipes::upvote_count(&conn, &recipe.id).unwrap(), 1);
}

#[test]
fn test_account_delete_cascades() {
    let (_tmp, pool) = create_test_db();
    let conn = pool.get().unwrap();
    let config = Config::default();
    let gone = actor(&conn, "gone@example.com");
    let stays = actor(&conn, "stays@example.com");

    Feeds::create(&conn, &config, Some(&gone), FeedPostCreate { text: "bye".into() }).unwrap();
    Feeds::create(&conn, &config, Some(&stays), FeedPostCreate { text: "hi".into() }).unwrap();
    let recipe = Recipes::create(
        &conn,
        &config,
        Some(&gone),
        RecipeCreate {
            title: "Leftovers".into(),
            time_mins: Some(5),
            ingredients: Vec::new(),
            diet: Diet::Balanced,
        },
    )
    .unwrap();
    conn.execute(
        "INSERT INTO upvotes (id, user_id, recipe_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![db::new_id(), stays.id, recipe.id, db::now()],
    )
    .unwrap();
    tokens::issue_token(&conn, &gone.id, 1).unwrap();

    conn.execute("DELETE FROM accounts WHERE id = ?1", params![gone.id])
        .unwrap();

    assert_eq!(count(&conn, "feed_posts"), 1);
    assert_eq!(count(&conn, "recipes"), 0);
    assert_eq!(count(&conn, "upvotes"), 0);
    assert_eq!(count(&conn, "auth_tokens"), 0);
}

// ============================================================================
// SEEDING
// ============================================================================

#[test]
fn test_demo_fixture_seeds_users_and_posts() {
    let (_tmp, pool) = create_test_db();
    let conn = pool.get().unwrap();

    let fixture = seed::load_fixture(None).unwrap();
    let summary = seed::seed(&conn, 4, &fixture).unwrap();
    assert_eq!(summary.users_created, fixture.users.len());
    assert_eq!(summary.feeds_created, fixture.feeds.len());
    assert_eq!(count(&conn, "accounts") as usize, fixture.users.len());

    // Seeded users can log in with their fixture password
    let first = &fixture.users[0];
    assert!(AccountManager::new(&conn, 4)
        .authenticate(&first.email, &first.password)
        .is_ok());
}

#[test]
fn test_fixture_file_is_loaded_from_disk() {
    let (tmp, pool) = create_test_db();
    let conn = pool.get().unwrap();
    let path = tmp.path().join("fixture.json");
    std::fs::write(
        &path,
        r#"{"users": [{"email": "x@example.com", "name": "X", "password": "pw"}]}"#,
    )
    .unwrap();

    let fixture = seed::load_fixture(Some(&path)).unwrap();
    let summary = seed::seed(&conn, 4, &fixture).unwrap();
    assert_eq!(summary.users_created, 1);
    assert_eq!(summary.feeds_created, 0);
}
