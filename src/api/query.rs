//! Search, filter, ordering and paging for list endpoints.
//!
//! Query parameters follow the usual REST conventions:
//! `?search=rust web` (every term must match some search field),
//! `?ordering=-created_on,text`, `?user=<id>` for exact filters and
//! `?limit=20&offset=40`. Field names are mapped through a per-resource
//! whitelist so only known columns ever reach the SQL text.

use std::collections::HashMap;

use crate::error::{AppError, AppResult};

/// Which query parameters a resource understands, and the columns they map to.
#[derive(Debug, Clone, Copy)]
pub struct QueryFields {
    pub search: &'static [&'static str],
    pub filters: &'static [(&'static str, &'static str)],
    pub ordering: &'static [(&'static str, &'static str)],
    pub default_ordering: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub search: Vec<String>,
    /// (field name, descending)
    pub ordering: Vec<(String, bool)>,
    pub filters: Vec<(String, String)>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<String>,
}

impl ListQuery {
    pub fn from_params(params: &HashMap<String, String>) -> AppResult<Self> {
        let mut query = ListQuery::default();

        for (key, value) in params {
            match key.as_str() {
                "search" => {
                    query.search = value.split_whitespace().map(str::to_string).collect();
                }
                "ordering" => {
                    query.ordering = value
                        .split(',')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(|f| match f.strip_prefix('-') {
                            Some(name) => (name.to_string(), true),
                            None => (f.to_string(), false),
                        })
                        .collect();
                }
                "limit" => query.limit = Some(parse_count("limit", value)?),
                "offset" => query.offset = Some(parse_count("offset", value)?),
                _ => query.filters.push((key.clone(), value.clone())),
            }
        }

        // HashMap order is random; keep the generated SQL stable
        query.filters.sort();
        Ok(query)
    }
}

fn parse_count(name: &str, value: &str) -> AppResult<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::validation(format!("{}: A valid integer is required.", name)))
}

/// Escape LIKE wildcards so search terms match literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

impl QueryFields {
    /// Append WHERE / ORDER BY / LIMIT clauses to `select`.
    pub fn build(&self, select: &str, query: &ListQuery) -> SqlQuery {
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if !self.search.is_empty() {
            for term in &query.search {
                params.push(like_pattern(term));
                let n = params.len();
                let any_field = self
                    .search
                    .iter()
                    .map(|col| format!("{} LIKE ?{} ESCAPE '\\'", col, n))
                    .collect::<Vec<_>>()
                    .join(" OR ");
                clauses.push(format!("({})", any_field));
            }
        }

        for (name, value) in &query.filters {
            let Some((_, col)) = self.filters.iter().find(|(param, _)| param == name) else {
                continue;
            };
            params.push(value.clone());
            clauses.push(format!("{} = ?{}", col, params.len()));
        }

        let mut sql = select.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let mut order: Vec<String> = query
            .ordering
            .iter()
            .filter_map(|(name, desc)| {
                let col = self.ordering.iter().find(|(param, _)| param == name);
                if col.is_none() {
                    tracing::debug!("Ignoring unknown ordering field {}", name);
                }
                col.map(|(_, col)| format!("{} {}", col, if *desc { "DESC" } else { "ASC" }))
            })
            .collect();
        order.push(self.default_ordering.to_string());
        sql.push_str(" ORDER BY ");
        sql.push_str(&order.join(", "));

        match (query.limit, query.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        SqlQuery { sql, params }
    }
}
