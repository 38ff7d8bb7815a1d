//! End-to-end pipeline tests.

use std::sync::Arc;

use concept_shift::{
    AggregationParams, CloudAggregator, CloudTracker, NetworkBuilder, ProjectionParams,
    RangeError, ShiftError, SpaceAligner, TrackParams, TrackRequest, VocabularyMonitor,
    WeighFunction,
};

use crate::common::{five_slices, registry};

fn seeds(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|t| t.to_string()).collect()
}

fn params() -> TrackParams {
    TrackParams {
        max_related_terms: 2,
        min_sim: 0.5,
        forwards: true,
        ..TrackParams::default()
    }
}

#[test]
fn test_tracking_across_a_gap() {
    let reg = registry(true);
    let (result, links) = CloudTracker::new(&reg)
        .track_clouds(&seeds(&["computer"]), &params(), None)
        .unwrap();

    assert_eq!(result.slice_count(), 3);
    assert!(result.cloud("1951", "computer").unwrap().is_empty());
    let resumed = result.cloud("1952", "computer").unwrap();
    assert!(!resumed.is_empty());
    assert!(resumed.len() <= 2);

    // Every link crosses one transition; none lead into or out of the gap
    let order = ["1950", "1951", "1952"];
    for link in &links {
        let to = order.iter().position(|s| *s == link.to_slice.as_str()).unwrap();
        assert!(to > 0);
        assert_eq!(link.from_slice.as_str(), order[to - 1]);
        assert_ne!(link.to_slice.as_str(), "1951");
        assert_ne!(link.from_slice.as_str(), "1951");
    }
}

#[test]
fn test_links_bounded_per_transition() {
    let reg = registry(false);
    let (_, links) = CloudTracker::new(&reg)
        .track_clouds(&seeds(&["computer"]), &params(), None)
        .unwrap();

    assert!(!links.is_empty());
    for slice in ["1951", "1952"] {
        let count = links.iter().filter(|l| l.to_slice.as_str() == slice).count();
        assert!(count <= 2);
    }
}

#[test]
fn test_inverted_range_is_range_error() {
    let reg = registry(false);
    let p = TrackParams {
        start_key: Some("1952".to_string()),
        end_key: Some("1950".to_string()),
        ..params()
    };
    let err = CloudTracker::new(&reg)
        .track_clouds(&seeds(&["computer"]), &p, None)
        .unwrap_err();
    assert!(matches!(err, ShiftError::Range(RangeError::Inverted { .. })));
}

#[test]
fn test_unknown_key_is_range_error() {
    let reg = registry(false);
    let p = TrackParams {
        start_key: Some("1890".to_string()),
        ..params()
    };
    let err = CloudTracker::new(&reg)
        .track_clouds(&seeds(&["computer"]), &p, None)
        .unwrap_err();
    assert_eq!(err.kind(), "range_error");
}

#[test]
fn test_five_slices_in_intervals_of_two() {
    let reg = five_slices();
    let (result, links) = CloudTracker::new(&reg)
        .track_clouds(&seeds(&["computer"]), &params(), None)
        .unwrap();

    let aggregator = CloudAggregator::new(AggregationParams {
        years_in_interval: 2,
        ..AggregationParams::default()
    });
    let (clouds, metadata) = aggregator.aggregate(&result).unwrap();

    assert_eq!(clouds.len(), 3);
    let sizes: Vec<usize> = metadata.values().map(|m| m.interval.len()).collect();
    assert_eq!(sizes, vec![2, 2, 1]);

    let networks = NetworkBuilder::default().yearly_network(&metadata, &clouds, &result, &links);
    assert_eq!(networks.len(), 3);
    for (label, graph) in &networks {
        let cloud = &clouds[label];
        for node in graph.nodes.iter().filter(|n| !n.is_seed) {
            assert!(cloud.contains(&node.id));
        }
        for edge in &graph.edges {
            assert!(links
                .iter()
                .any(|l| l.from_term == edge.source && l.to_term == edge.target));
        }
    }

    let embedded = SpaceAligner::new(&reg, ProjectionParams::default())
        .do_space_embedding(&result, &metadata);
    for cloud in clouds.values() {
        for term in &cloud.terms {
            assert!(embedded.contains_key(&term.term));
        }
    }
}

#[test]
fn test_zero_words_per_year_is_config_error() {
    let reg = registry(false);
    let (result, _) = CloudTracker::new(&reg)
        .track_clouds(&seeds(&["computer"]), &params(), None)
        .unwrap();

    let err = CloudAggregator::new(AggregationParams {
        words_per_year: 0,
        ..AggregationParams::default()
    })
    .aggregate(&result)
    .unwrap_err();
    assert!(matches!(err, ShiftError::Config(_)));
}

#[test]
fn test_tracking_is_deterministic() {
    let monitor = VocabularyMonitor::new(Arc::new(registry(true)));
    let request = TrackRequest {
        tracker: params(),
        aggregation: AggregationParams {
            weigh_function: WeighFunction::Linear,
            wf_param: 0.5,
            years_in_interval: 3,
            words_per_year: 4,
        },
        do_cleaning: false,
    };

    let first = monitor.track(&seeds(&["computer", "engine"]), &request).unwrap();
    let second = monitor.track(&seeds(&["computer", "engine"]), &request).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_response_serializes_to_plain_json() {
    let monitor = VocabularyMonitor::new(Arc::new(registry(false)));
    let request = TrackRequest {
        tracker: params(),
        ..TrackRequest::default()
    };
    let response = monitor.track(&seeds(&["computer"]), &request).unwrap();

    let json = serde_json::to_value(&response).unwrap();
    for key in ["stream", "networks", "embedded", "vocabs"] {
        assert!(json.get(key).is_some(), "missing {}", key);
    }
    assert!(json["stream"]["1951"]["machine"].is_number());
    assert!(json["embedded"]["machine"].is_array());
    assert!(json["vocabs"][0]["weight"].is_number());
}
