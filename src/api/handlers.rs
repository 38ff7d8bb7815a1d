//! REST API request handlers.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::aggregation::WeighFunction;
use crate::error::{Result, ShiftError};
use crate::monitor::{parse_terms, TrackRequest, VocabularyMonitor, YearSettings};
use crate::tracking::{Algorithm, BoostMethod};

/// Application state shared across handlers.
pub struct ApiState {
    /// Pipeline over the loaded spaces.
    pub monitor: VocabularyMonitor,
    /// Values used for parameters a request omits.
    pub defaults: TrackRequest,
}

impl ApiState {
    /// Create new API state.
    pub fn new(monitor: VocabularyMonitor, defaults: TrackRequest) -> Self {
        Self { monitor, defaults }
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters of `/track/:terms`. Absent or empty values use defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub max_terms: Option<usize>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub max_related_terms: Option<usize>,
    pub start_key: Option<String>,
    pub end_key: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub min_sim: Option<f32>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub word_boost: Option<usize>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub forwards: Option<bool>,
    pub boost_method: Option<String>,
    pub algorithm: Option<String>,
    pub agg_weigh_function: Option<String>,
    #[serde(rename = "aggWFParam", default, deserialize_with = "blank_as_none")]
    pub agg_wf_param: Option<f32>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub agg_years_in_interval: Option<usize>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub agg_words_per_year: Option<usize>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub do_cleaning: Option<bool>,
}

impl TrackQuery {
    /// Overlay the given parameters on `defaults`.
    pub fn into_request(self, defaults: &TrackRequest) -> Result<TrackRequest> {
        let mut request = defaults.clone();
        let tracker = &mut request.tracker;
        let aggregation = &mut request.aggregation;

        if let Some(v) = self.max_terms {
            tracker.max_terms = v;
        }
        if let Some(v) = self.max_related_terms {
            tracker.max_related_terms = v;
        }
        if let Some(v) = non_empty(self.start_key) {
            tracker.start_key = Some(v);
        }
        if let Some(v) = non_empty(self.end_key) {
            tracker.end_key = Some(v);
        }
        if let Some(v) = self.min_sim {
            tracker.min_sim = v;
        }
        if let Some(v) = self.word_boost {
            tracker.word_boost = v;
        }
        if let Some(v) = self.forwards {
            tracker.forwards = v;
        }
        if let Some(v) = non_empty(self.boost_method) {
            tracker.boost_method = BoostMethod::from_name(&v)?;
        }
        if let Some(v) = non_empty(self.algorithm) {
            tracker.algorithm = Algorithm::from_name(&v)?;
        }
        if let Some(v) = non_empty(self.agg_weigh_function) {
            aggregation.weigh_function = WeighFunction::from_name(&v)?;
        }
        if let Some(v) = self.agg_wf_param {
            aggregation.wf_param = v;
        }
        if let Some(v) = self.agg_years_in_interval {
            aggregation.years_in_interval = v;
        }
        if let Some(v) = self.agg_words_per_year {
            aggregation.words_per_year = v;
        }
        if let Some(v) = self.do_cleaning {
            request.do_cleaning = v;
        }

        Ok(request)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse an optional query value, treating `key=` like an absent key.
fn blank_as_none<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Settings response.
#[derive(Debug, Clone, Serialize)]
pub struct SettingsResponse {
    pub years: YearSettings,
    pub cleaning: bool,
}

/// Error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

fn error_response(err: &ShiftError) -> axum::response::Response {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: err.kind().to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handler Functions
// ============================================================================

/// GET /load-settings - Available years and whether cleaning is offered.
pub async fn settings_handler(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(SettingsResponse {
            years: state.monitor.available_years(),
            cleaning: state.monitor.can_clean(),
        }),
    )
}

/// GET /track/:terms - Track a comma separated list of terms.
pub async fn track_handler(
    State(state): State<Arc<ApiState>>,
    Path(terms): Path<String>,
    query: std::result::Result<Query<TrackQuery>, QueryRejection>,
) -> impl IntoResponse {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: rejection.body_text(),
                    code: "invalid_query".to_string(),
                }),
            )
                .into_response();
        }
    };

    let request = match query.into_request(&state.defaults) {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };

    let terms = parse_terms(&terms);
    let monitor = state.monitor.clone();

    // Tracking is CPU bound
    let result = tokio::task::spawn_blocking(move || monitor.track(&terms, &request)).await;

    match result {
        Ok(Ok(response)) => (StatusCode::OK, Json(response)).into_response(),
        Ok(Err(e)) => {
            tracing::warn!("Track request failed: {}", e);
            error_response(&e)
        }
        Err(e) => {
            tracing::error!("Track task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                    code: "internal_error".to_string(),
                }),
            )
                .into_response()
        }
    }
}
