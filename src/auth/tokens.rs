use chrono::{Duration, Utc};
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{self, models::Account};
use crate::error::{AppError, AppResult};

/// Return the account's live token, or issue a fresh one valid for `hours`.
pub fn issue_token(conn: &Connection, account_id: &str, hours: u64) -> AppResult<String> {
    let now = db::now();

    if let Some(key) = live_token(conn, account_id, &now)? {
        return Ok(key);
    }

    let expires_at = expiry_after(hours)?;

    // At most one token per account. A concurrent login may insert first,
    // in which case its key wins and is returned to both callers.
    conn.execute(
        "DELETE FROM auth_tokens WHERE account_id = ?1 AND expires_at <= ?2",
        params![account_id, now],
    )?;
    conn.execute(
        "INSERT INTO auth_tokens (key, account_id, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(account_id) DO NOTHING",
        params![generate_token(), account_id, now, expires_at],
    )?;

    live_token(conn, account_id, &now)?
        .ok_or_else(|| AppError::Internal(format!("No token stored for account {}", account_id)))
}

fn live_token(conn: &Connection, account_id: &str, now: &str) -> AppResult<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT key FROM auth_tokens WHERE account_id = ?1 AND expires_at > ?2",
            params![account_id, now],
            |row| row.get(0),
        )
        .optional()?)
}

fn expiry_after(hours: u64) -> AppResult<String> {
    i64::try_from(hours)
        .ok()
        .and_then(Duration::try_hours)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .map(db::timestamp)
        .ok_or_else(|| AppError::Internal(format!("Token lifetime of {} hours is out of range", hours)))
}

/// Delete a token by key.
pub fn revoke_token(conn: &Connection, key: &str) -> AppResult<()> {
    conn.execute("DELETE FROM auth_tokens WHERE key = ?1", params![key])?;
    Ok(())
}

/// Resolve an unexpired token to its account.
pub fn lookup_token(conn: &Connection, key: &str) -> AppResult<Option<Account>> {
    let columns = Account::COLUMNS
        .split(", ")
        .map(|c| format!("a.{}", c))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(conn
        .query_row(
            &format!(
                "SELECT {} FROM auth_tokens t \
                 JOIN accounts a ON a.id = t.account_id \
                 WHERE t.key = ?1 AND t.expires_at > ?2",
                columns
            ),
            params![key, db::now()],
            Account::from_row,
        )
        .optional()?)
}

/// Generate a cryptographically random 32-byte hex token.
pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
