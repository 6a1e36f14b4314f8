use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub last_login: Option<String>,
    pub created_at: String,
}

impl Account {
    pub const COLUMNS: &'static str =
        "id, email, name, password_hash, is_active, is_staff, is_superuser, last_login, created_at";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            password_hash: row.get(3)?,
            is_active: row.get(4)?,
            is_staff: row.get(5)?,
            is_superuser: row.get(6)?,
            last_login: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    pub fn get(conn: &Connection, id: &str) -> AppResult<Self> {
        conn.query_row(
            &format!("SELECT {} FROM accounts WHERE id = ?1", Self::COLUMNS),
            params![id],
            Self::from_row,
        )
        .map_err(crate::db::not_found)
    }

    pub fn find_by_email(conn: &Connection, email: &str) -> AppResult<Option<Self>> {
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM accounts WHERE email = ?1", Self::COLUMNS),
                params![email],
                Self::from_row,
            )
            .optional()?)
    }

    pub fn email_taken(conn: &Connection, email: &str, except_id: Option<&str>) -> AppResult<bool> {
        Ok(conn.query_row(
            "SELECT COUNT(*) > 0 FROM accounts WHERE email = ?1 AND id IS NOT ?2",
            params![email, except_id],
            |row| row.get(0),
        )?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPost {
    pub id: String,
    pub user: String,
    pub text: String,
    pub created_on: String,
}

impl FeedPost {
    pub const COLUMNS: &'static str = "id, user_id, text, created_on";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user: row.get(1)?,
            text: row.get(2)?,
            created_on: row.get(3)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub calories: u32,
}

impl Ingredient {
    pub const COLUMNS: &'static str = "id, name, calories";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            calories: row.get(2)?,
        })
    }
}

/// Stored recipe row. The API record adds ingredients and aggregates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub id: String,
    pub author: String,
    pub title: String,
    pub image: Option<String>,
    pub time_mins: u32,
    pub diet: Diet,
    pub created: String,
    pub updated: String,
}

impl Recipe {
    pub const COLUMNS: &'static str = "id, author_id, title, image, time_mins, diet, created, updated";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            author: row.get(1)?,
            title: row.get(2)?,
            image: row.get(3)?,
            time_mins: row.get(4)?,
            diet: row.get(5)?,
            created: row.get(6)?,
            updated: row.get(7)?,
        })
    }

    pub fn get(conn: &Connection, id: &str) -> AppResult<Self> {
        conn.query_row(
            &format!("SELECT {} FROM recipes WHERE id = ?1", Self::COLUMNS),
            params![id],
            Self::from_row,
        )
        .map_err(crate::db::not_found)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Diet {
    #[default]
    Balanced,
    HighProtein,
    HighFiber,
    LowSodium,
    LowCarb,
    LowFat,
}

impl Diet {
    pub const ALL: [Diet; 6] = [
        Diet::Balanced,
        Diet::HighProtein,
        Diet::HighFiber,
        Diet::LowSodium,
        Diet::LowCarb,
        Diet::LowFat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Diet::Balanced => "balanced",
            Diet::HighProtein => "high-protein",
            Diet::HighFiber => "high-fiber",
            Diet::LowSodium => "low-sodium",
            Diet::LowCarb => "low-carb",
            Diet::LowFat => "low-fat",
        }
    }
}

impl fmt::Display for Diet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Diet {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Diet::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("\"{}\" is not a valid diet.", s)))
    }
}

impl ToSql for Diet {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Diet {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        s.parse().map_err(|e: AppError| FromSqlError::Other(Box::new(e)))
    }
}
