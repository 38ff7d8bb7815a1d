//! REST API router and configuration.

use std::sync::Arc;

use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::handlers::{settings_handler, track_handler, ApiState};
use crate::monitor::{TrackRequest, VocabularyMonitor};

/// REST API configuration.
#[derive(Debug, Clone)]
pub struct RestApiConfig {
    /// Enable CORS.
    pub enable_cors: bool,
    /// Defaults for omitted request parameters.
    pub defaults: TrackRequest,
}

impl Default for RestApiConfig {
    fn default() -> Self {
        Self {
            enable_cors: true,
            defaults: TrackRequest::default(),
        }
    }
}

/// Create the REST API router.
///
/// Endpoints:
/// - GET /load-settings   - Available years and cleaning support
/// - GET /track/:terms    - Track comma separated terms
/// - GET /api             - Endpoint overview
pub fn create_rest_router(monitor: VocabularyMonitor, config: &RestApiConfig) -> Router {
    let state = Arc::new(ApiState::new(monitor, config.defaults.clone()));

    let router = Router::new()
        .route("/load-settings", get(settings_handler))
        .route("/track/:terms", get(track_handler))
        .with_state(state)
        .merge(Router::new().route("/api", get(api_info_handler)));

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
            .allow_origin(Any);

        router.layer(cors)
    } else {
        router
    }
}

/// API info handler.
async fn api_info_handler() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "concept-shift REST API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Track how the vocabulary around a concept shifts over time",
        "endpoints": {
            "load_settings": {
                "method": "GET",
                "path": "/load-settings",
                "description": "Available years and whether cleaning is offered"
            },
            "track": {
                "method": "GET",
                "path": "/track/:terms",
                "description": "Track comma separated seed terms",
                "params": {
                    "maxTerms": "Distinct terms per slice",
                    "maxRelatedTerms": "Neighbours per query term",
                    "startKey": "First slice",
                    "endKey": "Last slice",
                    "minSim": "Minimum similarity",
                    "wordBoost": "Cloud members carried to the next slice",
                    "forwards": "Walk slices forwards",
                    "boostMethod": "sum | max",
                    "algorithm": "adaptive | non-adaptive | continuous",
                    "aggWeighFunction": "uniform | linear | gaussian",
                    "aggWFParam": "Weighting parameter",
                    "aggYearsInInterval": "Slices per interval",
                    "aggWordsPerYear": "Terms per interval",
                    "doCleaning": "Apply the cleaning function"
                }
            }
        }
    }))
}
