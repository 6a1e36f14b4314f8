// App skeleton generator - renders askama templates into a new directory
use std::path::{Path, PathBuf};

use askama::Template;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error("Invalid app name {0:?}: use a lowercase Rust identifier that is not a keyword")]
    InvalidName(String),

    #[error("Target directory already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final", "gen",
    "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

#[derive(Template)]
#[template(path = "scaffold/mod.rs.txt", escape = "none")]
struct ModTemplate<'a> {
    app: &'a str,
}

#[derive(Template)]
#[template(path = "scaffold/models.rs.txt", escape = "none")]
struct ModelsTemplate<'a> {
    app: &'a str,
    type_name: &'a str,
}

#[derive(Template)]
#[template(path = "scaffold/routes.rs.txt", escape = "none")]
struct RoutesTemplate<'a> {
    app: &'a str,
    type_name: &'a str,
}

#[derive(Template)]
#[template(path = "scaffold/base.html.txt", escape = "none")]
struct BaseTemplate<'a> {
    type_name: &'a str,
}

#[derive(Template)]
#[template(path = "scaffold/index.html.txt", escape = "none")]
struct IndexTemplate<'a> {
    app: &'a str,
    type_name: &'a str,
}

/// Lowercase identifier, not starting with a digit, not a keyword.
pub fn validate_app_name(name: &str) -> Result<(), ScaffoldError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_lowercase() || first == '_')
                && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        }
        None => false,
    };
    if !valid || name == "_" || KEYWORDS.contains(&name) {
        return Err(ScaffoldError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// `meal_plans` -> `MealPlans`
pub fn type_name(app: &str) -> String {
    app.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Generate `<dir>/<app>/` and return the paths written, relative to `dir`.
pub fn scaffold(app: &str, dir: &Path) -> Result<Vec<PathBuf>, ScaffoldError> {
    validate_app_name(app)?;
    let root = dir.join(app);
    if root.exists() {
        return Err(ScaffoldError::AlreadyExists(root));
    }
    let type_name = type_name(app);
    let type_name = type_name.as_str();

    let files: Vec<(PathBuf, String)> = vec![
        (PathBuf::from("mod.rs"), ModTemplate { app }.render()?),
        (
            PathBuf::from("models.rs"),
            ModelsTemplate { app, type_name }.render()?,
        ),
        (
            PathBuf::from("routes.rs"),
            RoutesTemplate { app, type_name }.render()?,
        ),
        (
            Path::new("templates").join(app).join("base.html"),
            BaseTemplate { type_name }.render()?,
        ),
        (
            Path::new("templates").join(app).join("index.html"),
            IndexTemplate { app, type_name }.render()?,
        ),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (relative, contents) in files {
        let target = root.join(&relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, contents)?;
        written.push(Path::new(app).join(relative));
    }

    tracing::info!("Scaffolded app {} in {}", app, root.display());
    Ok(written)
}
