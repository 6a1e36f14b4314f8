pub mod home;
pub mod media;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::feeds::Feeds;
use crate::api::ingredients::Ingredients;
use crate::api::profiles::Profiles;
use crate::api::recipes::{self, Recipes};
use crate::api::resource_router;
use crate::auth;
use crate::state::AppState;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(home::index))
        .route("/media/{*path}", get(media::serve))
        .merge(auth::handlers::router())
        .merge(resource_router::<Profiles>())
        .merge(resource_router::<Feeds>())
        .merge(resource_router::<Recipes>())
        .merge(resource_router::<Ingredients>())
        .merge(recipes::actions_router(state.config.storage.max_upload_bytes));

    if let Some(cors) = cors_layer(&state.config.server.cors_origins) {
        router = router.layer(cors);
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    )
}
