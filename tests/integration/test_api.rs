//! HTTP router tests.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use concept_shift::{cleaner_by_name, create_rest_router, RestApiConfig, VocabularyMonitor};
use serde_json::Value;
use tower::ServiceExt;

use crate::common::registry;

fn router() -> Router {
    let monitor = VocabularyMonitor::new(Arc::new(registry(false)))
        .with_cleaner(Some(cleaner_by_name("alphanumeric").unwrap()));
    create_rest_router(monitor, &RestApiConfig::default())
}

async fn get(router: Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_load_settings() {
    let (status, body) = get(router(), "/load-settings").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleaning"], true);
    assert_eq!(body["years"]["first"], 1950);
    assert_eq!(body["years"]["last"], 1952);
    assert_eq!(body["years"]["values"]["1951"], "1951");
}

#[tokio::test]
async fn test_track_terms() {
    let (status, body) = get(
        router(),
        "/track/Computer?maxRelatedTerms=2&minSim=0.5&aggYearsInInterval=3&doCleaning=true",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let stream = body["stream"].as_object().unwrap();
    assert_eq!(stream.len(), 1);
    assert!(body["stream"]["1951"]["machine"].as_f64().unwrap() > 0.0);
    assert!(body["networks"]["1951"]["nodes"].is_array());
    assert!(body["embedded"]["machine"].is_array());
    assert!(!body["vocabs"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_inverted_range_is_bad_request() {
    let (status, body) = get(router(), "/track/computer?startKey=1952&endKey=1950").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "range_error");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unknown_weigh_function_is_bad_request() {
    let (status, body) = get(router(), "/track/computer?aggWeighFunction=cubic").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "config_error");
}

#[tokio::test]
async fn test_zero_words_per_year_is_bad_request() {
    let (status, body) = get(router(), "/track/computer?aggWordsPerYear=0").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "config_error");
}

#[tokio::test]
async fn test_malformed_query_is_bad_request() {
    let (status, body) = get(router(), "/track/computer?maxTerms=many").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_query");
}

#[tokio::test]
async fn test_blank_parameters_use_defaults() {
    let (status, body) = get(
        router(),
        "/track/computer?maxTerms=&minSim=&forwards=&doCleaning=&aggWFParam=&startKey=",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["stream"].is_object());
    assert!(body["vocabs"].is_array());
}

#[tokio::test]
async fn test_blank_terms_are_bad_request() {
    let (status, body) = get(router(), "/track/%20,%20").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "empty_input_error");
}

#[tokio::test]
async fn test_api_info() {
    let (status, body) = get(router(), "/api").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["endpoints"]["track"].is_object());
}
