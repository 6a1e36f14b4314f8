use axum::http::Method;
use rusqlite::{params, params_from_iter, Connection};
use serde::{Deserialize, Serialize};

use crate::api::{clean_text, required, ListQuery, QueryFields, Resource};
use crate::auth::manager::{DUPLICATE_EMAIL, MAX_EMAIL_LEN, MAX_NAME_LEN};
use crate::auth::password::{is_valid_email, normalize_email};
use crate::auth::{permissions, AccountManager};
use crate::config::Config;
use crate::db::{self, models::Account};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;

/// Public view of an account. The password is write-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl From<Account> for Profile {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            name: account.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProfileCreate {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

pub struct Profiles;

const SELECT: &str = "SELECT id, email, name FROM accounts";

fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
    })
}

impl Resource for Profiles {
    type Record = Profile;
    type Create = ProfileCreate;
    type Update = ProfileUpdate;

    const PATH: &'static str = "profiles";
    const FIELDS: QueryFields = QueryFields {
        search: &["email", "name"],
        filters: &[],
        ordering: &[("email", "email"), ("name", "name")],
        default_ordering: "created_at ASC, id ASC",
    };

    fn list(conn: &Connection, query: &ListQuery) -> AppResult<Vec<Profile>> {
        let built = Self::FIELDS.build(SELECT, query);
        let mut stmt = conn.prepare(&built.sql)?;
        let profiles = stmt
            .query_map(params_from_iter(built.params.iter()), from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(profiles)
    }

    fn retrieve(conn: &Connection, id: &str) -> AppResult<Profile> {
        conn.query_row(&format!("{} WHERE id = ?1", SELECT), params![id], from_row)
            .map_err(db::not_found)
    }

    /// Sign-up. Open to anonymous callers.
    fn check_create(_actor: Option<&CurrentUser>) -> AppResult<()> {
        Ok(())
    }

    fn create(
        conn: &Connection,
        config: &Config,
        _actor: Option<&CurrentUser>,
        input: ProfileCreate,
    ) -> AppResult<Profile> {
        let password = input
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::validation("password: This field is required."))?;

        let account = AccountManager::new(conn, config.auth.hash_cost).create_account(
            &input.email,
            &input.name,
            Some(&password),
        )?;
        Ok(account.into())
    }

    fn update(
        conn: &Connection,
        config: &Config,
        _actor: &CurrentUser,
        record: Profile,
        input: ProfileUpdate,
        partial: bool,
    ) -> AppResult<Profile> {
        let email = match required(input.email, partial, "email")? {
            Some(email) => {
                let email = normalize_email(&email);
                if email.is_empty() {
                    return Err(AppError::validation("email: This field may not be blank."));
                }
                if email.chars().count() > MAX_EMAIL_LEN {
                    return Err(AppError::validation(format!(
                        "email: Ensure this field has no more than {} characters.",
                        MAX_EMAIL_LEN
                    )));
                }
                if !is_valid_email(&email) {
                    return Err(AppError::validation("Enter a valid email address."));
                }
                if Account::email_taken(conn, &email, Some(&record.id))? {
                    return Err(AppError::validation(DUPLICATE_EMAIL));
                }
                email
            }
            None => record.email,
        };
        let name = match required(input.name, partial, "name")? {
            Some(name) => clean_text(&name, "name", MAX_NAME_LEN)?,
            None => record.name,
        };

        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE accounts SET email = ?1, name = ?2 WHERE id = ?3",
            params![email, name, record.id],
        )?;
        if let Some(password) = input.password.filter(|p| !p.is_empty()) {
            AccountManager::new(&tx, config.auth.hash_cost).set_password(&record.id, &password)?;
        }
        tx.commit()?;

        Self::retrieve(conn, &record.id)
    }

    fn destroy(conn: &Connection, record: Profile) -> AppResult<()> {
        // Feed posts, tokens, recipes and upvotes go with it
        conn.execute("DELETE FROM accounts WHERE id = ?1", params![record.id])?;
        tracing::info!("Deleted account {}", record.email);
        Ok(())
    }

    fn can_modify(method: &Method, actor: &CurrentUser, record: &Profile) -> bool {
        permissions::can_modify_profile(method, actor, record)
    }
}
