use axum::http::Method;
use rusqlite::{params, params_from_iter, Connection};
use serde::Deserialize;

use crate::api::{clean_text, required, ListQuery, QueryFields, Resource};
use crate::auth::permissions;
use crate::config::Config;
use crate::db::{self, models::Ingredient};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;

#[derive(Debug, Deserialize)]
pub struct IngredientCreate {
    #[serde(default)]
    pub name: String,
    pub calories: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IngredientUpdate {
    pub name: Option<String>,
    pub calories: Option<u32>,
}

pub struct Ingredients;

impl Resource for Ingredients {
    type Record = Ingredient;
    type Create = IngredientCreate;
    type Update = IngredientUpdate;

    const PATH: &'static str = "ingredients";
    const FIELDS: QueryFields = QueryFields {
        search: &["name"],
        filters: &[("name", "name")],
        ordering: &[("name", "name"), ("calories", "calories")],
        default_ordering: "name ASC, id ASC",
    };

    fn list(conn: &Connection, query: &ListQuery) -> AppResult<Vec<Ingredient>> {
        let select = format!("SELECT {} FROM ingredients", Ingredient::COLUMNS);
        let built = Self::FIELDS.build(&select, query);
        let mut stmt = conn.prepare(&built.sql)?;
        let ingredients = stmt
            .query_map(params_from_iter(built.params.iter()), Ingredient::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ingredients)
    }

    fn retrieve(conn: &Connection, id: &str) -> AppResult<Ingredient> {
        conn.query_row(
            &format!("SELECT {} FROM ingredients WHERE id = ?1", Ingredient::COLUMNS),
            params![id],
            Ingredient::from_row,
        )
        .map_err(db::not_found)
    }

    fn create(
        conn: &Connection,
        _config: &Config,
        _actor: Option<&CurrentUser>,
        input: IngredientCreate,
    ) -> AppResult<Ingredient> {
        let ingredient = Ingredient {
            id: db::new_id(),
            name: clean_text(&input.name, "name", 255)?,
            calories: input
                .calories
                .ok_or_else(|| AppError::validation("calories: This field is required."))?,
        };
        conn.execute(
            "INSERT INTO ingredients (id, name, calories) VALUES (?1, ?2, ?3)",
            params![ingredient.id, ingredient.name, ingredient.calories],
        )?;
        Ok(ingredient)
    }

    fn update(
        conn: &Connection,
        _config: &Config,
        _actor: &CurrentUser,
        record: Ingredient,
        input: IngredientUpdate,
        partial: bool,
    ) -> AppResult<Ingredient> {
        let name = match required(input.name, partial, "name")? {
            Some(name) => clean_text(&name, "name", 255)?,
            None => record.name,
        };
        let calories = required(input.calories, partial, "calories")?.unwrap_or(record.calories);

        conn.execute(
            "UPDATE ingredients SET name = ?1, calories = ?2 WHERE id = ?3",
            params![name, calories, record.id],
        )?;
        Ok(Ingredient {
            id: record.id,
            name,
            calories,
        })
    }

    fn destroy(conn: &Connection, record: Ingredient) -> AppResult<()> {
        conn.execute("DELETE FROM ingredients WHERE id = ?1", params![record.id])?;
        Ok(())
    }

    fn can_modify(method: &Method, actor: &CurrentUser, _record: &Ingredient) -> bool {
        permissions::can_manage_ingredient(method, actor)
    }
}
