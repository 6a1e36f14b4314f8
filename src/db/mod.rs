pub mod models;

use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

use crate::state::DbPool;

pub const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_accounts",
        include_str!("../../migrations/001_accounts.sql"),
    ),
    ("002_feed", include_str!("../../migrations/002_feed.sql")),
    (
        "003_recipes",
        include_str!("../../migrations/003_recipes.sql"),
    ),
];

pub fn create_pool(db_path: &Path) -> anyhow::Result<DbPool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Per-connection pragmas; foreign keys are off by default in SQLite
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            PRAGMA synchronous = NORMAL;
            ",
        )
    });
    let pool = Pool::builder().max_size(8).build(manager)?;

    let conn = pool.get()?;
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;

    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let conn = pool.get()?;

    // Create migrations tracking table
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM schema_version WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;

        if !already_applied {
            tracing::info!("Applying migration: {}", name);
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO schema_version (name) VALUES (?1)",
                params![name],
            )?;
        }
    }

    tracing::info!("Database migrations complete");
    Ok(())
}

/// New primary key. UUIDv7 sorts by creation time.
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Stored timestamp format: fixed-width RFC 3339, so text order is time order.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn now() -> String {
    timestamp(Utc::now())
}

/// Map "no rows" to a 404, leaving other SQLite errors alone.
pub fn not_found(err: rusqlite::Error) -> crate::error::AppError {
    match err {
        rusqlite::Error::QueryReturnedNoRows => crate::error::AppError::NotFound,
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pool() -> (DbPool, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let pool = create_pool(&tmp.path().join("test.db")).unwrap();
        (pool, tmp)
    }

    #[test]
    fn create_pool_creates_db_file() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("sub/dir/test.db");
        let pool = create_pool(&db_path).unwrap();
        assert!(db_path.exists());
        let conn = pool.get().unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
    }

    #[test]
    fn every_connection_enforces_foreign_keys() {
        let (pool, _tmp) = test_pool();
        let a = pool.get().unwrap();
        let b = pool.get().unwrap();
        for conn in [&a, &b] {
            let on: bool = conn
                .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
                .unwrap();
            assert!(on);
        }
    }

    #[test]
    fn migrations_run_successfully() {
        let (pool, _tmp) = test_pool();
        run_migrations(&pool).unwrap();

        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);

        let tables: Vec<String> = {
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .unwrap();
            stmt.query_map([], |row| row.get(0))
                .unwrap()
                .filter_map(|r| r.ok())
                .collect()
        };
        for table in [
            "accounts",
            "auth_tokens",
            "feed_posts",
            "recipes",
            "ingredients",
            "recipe_ingredients",
            "upvotes",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn migrations_are_idempotent() {
        let (pool, _tmp) = test_pool();
        run_migrations(&pool).unwrap();
        run_migrations(&pool).unwrap();

        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);
    }

    #[test]
    fn feed_post_requires_existing_account() {
        let (pool, _tmp) = test_pool();
        run_migrations(&pool).unwrap();

        let conn = pool.get().unwrap();
        let result = conn.execute(
            "INSERT INTO feed_posts (id, user_id, text, created_on) VALUES (?1, ?2, ?3, ?4)",
            params!["post-1", "nonexistent-user", "hello", now()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn diet_is_constrained() {
        let (pool, _tmp) = test_pool();
        run_migrations(&pool).unwrap();

        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO accounts (id, email, name, password_hash, created_at)
             VALUES ('a1', 'a@example.com', 'A', '!', ?1)",
            params![now()],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO recipes (id, author_id, title, time_mins, diet, created, updated)
             VALUES ('r1', 'a1', 'Soup', 10, 'keto', ?1, ?1)",
            params![now()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn timestamps_sort_lexically() {
        let earlier = timestamp(Utc::now() - chrono::Duration::seconds(1));
        let later = now();
        assert_eq!(earlier.len(), later.len());
        assert!(earlier < later);
        assert!(later.ends_with('Z'));
    }
}
