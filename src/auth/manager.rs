use rusqlite::{params, Connection};

use crate::auth::password::{
    hash_password, is_valid_email, normalize_email, unusable_password, verify_password,
};
use crate::db::{self, models::Account};
use crate::error::{AppError, AppResult};

pub const DUPLICATE_EMAIL: &str = "user profile with this email already exists.";
pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_NAME_LEN: usize = 255;
const BAD_CREDENTIALS: &str = "Unable to log in with provided credentials.";

/// Creates and checks account credentials.
pub struct AccountManager<'a> {
    conn: &'a Connection,
    hash_cost: u32,
}

impl<'a> AccountManager<'a> {
    pub fn new(conn: &'a Connection, hash_cost: u32) -> Self {
        Self { conn, hash_cost }
    }

    /// Create a regular account. Without a password the account gets an
    /// unusable hash and cannot log in until one is set.
    pub fn create_account(
        &self,
        email: &str,
        name: &str,
        password: Option<&str>,
    ) -> AppResult<Account> {
        if email.trim().is_empty() {
            return Err(AppError::validation("User must have an email"));
        }
        let email = normalize_email(email);
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("User must have a name"));
        }
        if name.chars().count() > MAX_NAME_LEN || email.chars().count() > MAX_EMAIL_LEN {
            return Err(AppError::validation(
                "Ensure email and name have no more than 255 characters.",
            ));
        }
        if !is_valid_email(&email) {
            return Err(AppError::validation("Enter a valid email address."));
        }
        if Account::email_taken(self.conn, &email, None)? {
            return Err(AppError::validation(DUPLICATE_EMAIL));
        }

        let password_hash = match password {
            Some(password) => hash_password(password, self.hash_cost)?,
            None => unusable_password(),
        };

        let id = db::new_id();
        self.conn.execute(
            "INSERT INTO accounts (id, email, name, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, email, name, password_hash, db::now()],
        )?;

        tracing::info!("Created account {}", email);
        Account::get(self.conn, &id)
    }

    /// Create an account with staff and superuser flags set.
    pub fn create_privileged_account(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> AppResult<Account> {
        if password.is_empty() {
            return Err(AppError::validation("Superuser must have a password"));
        }
        if name.trim().is_empty() {
            return Err(AppError::validation("Superuser must have a name"));
        }
        if email.trim().is_empty() {
            return Err(AppError::validation("Superuser must have an email"));
        }

        let account = self.create_account(email, name, Some(password))?;
        self.conn.execute(
            "UPDATE accounts SET is_staff = 1, is_superuser = 1 WHERE id = ?1",
            params![account.id],
        )?;

        Account::get(self.conn, &account.id)
    }

    /// Check an email/password pair and stamp `last_login` on success.
    pub fn authenticate(&self, email: &str, password: &str) -> AppResult<Account> {
        let email = normalize_email(email);
        let account = Account::find_by_email(self.conn, &email)?
            .filter(|a| a.is_active && verify_password(password, &a.password_hash));

        let Some(account) = account else {
            tracing::debug!("Failed login for {}", email);
            return Err(AppError::AuthenticationFailed(BAD_CREDENTIALS.into()));
        };

        self.conn.execute(
            "UPDATE accounts SET last_login = ?1 WHERE id = ?2",
            params![db::now(), account.id],
        )?;
        Account::get(self.conn, &account.id)
    }

    pub fn set_password(&self, account_id: &str, password: &str) -> AppResult<()> {
        let hash = hash_password(password, self.hash_cost)?;
        let changed = self.conn.execute(
            "UPDATE accounts SET password_hash = ?1 WHERE id = ?2",
            params![hash, account_id],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
