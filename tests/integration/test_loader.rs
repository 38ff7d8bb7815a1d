//! Model loading from disk.

use std::sync::Arc;

use concept_shift::{load_registry, EmbeddingSpace, ModelError, TrackRequest, VocabularyMonitor};
use tempfile::TempDir;

use crate::common::write_text_model;

#[test]
fn test_load_text_models_by_glob() {
    let dir = TempDir::new().unwrap();
    write_text_model(dir.path(), "1950_1959");
    write_text_model(dir.path(), "1960_1969");
    std::fs::write(dir.path().join("notes.txt"), "not a model").unwrap();

    let pattern = format!("{}/*.w2v", dir.path().display());
    let registry = load_registry(&pattern, false).unwrap();

    let keys: Vec<&str> = registry.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["1950_1959", "1960_1969"]);

    let space = registry.get("1950_1959").unwrap();
    assert_eq!(space.dimension(), 3);
    assert_eq!(space.len(), 5);
    assert!(space.contains("calculator"));
}

#[test]
fn test_no_matching_files() {
    let dir = TempDir::new().unwrap();
    let pattern = format!("{}/*.w2v", dir.path().display());
    assert!(matches!(
        load_registry(&pattern, false),
        Err(ModelError::NoModels(_))
    ));
}

#[test]
fn test_loaded_models_drive_the_monitor() {
    let dir = TempDir::new().unwrap();
    for key in ["1950", "1951", "1952", "1953"] {
        write_text_model(dir.path(), key);
    }
    let pattern = format!("{}/*.w2v", dir.path().display());
    let monitor = VocabularyMonitor::new(Arc::new(load_registry(&pattern, false).unwrap()));

    let years = monitor.available_years();
    assert_eq!(years.first, Some(1950));
    assert_eq!(years.last, Some(1953));

    let response = monitor
        .track(&["computer".to_string()], &TrackRequest::default())
        .unwrap();
    assert_eq!(response.stream.len(), 1);
    assert!(response.embedded.contains_key("machine"));
}
