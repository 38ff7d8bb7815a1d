//! Interval aggregation of tracked clouds.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    AggregatedCloud, AggregatedClouds, AggregatedTerm, AggregationInterval, AggregationMetadata,
    AggregationMetadataMap, Provenance, WeighFunction,
};
use crate::error::{ConfigError, Result};
use crate::space::SliceKey;
use crate::tracking::TrackResult;

/// Aggregation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationParams {
    /// Weighting policy.
    pub weigh_function: WeighFunction,
    /// Policy parameter (decay rate for `linear`, sigma for `gaussian`).
    pub wf_param: f32,
    /// Slices per interval.
    pub years_in_interval: usize,
    /// Cap on terms per aggregated cloud.
    pub words_per_year: usize,
}

impl Default for AggregationParams {
    fn default() -> Self {
        Self {
            weigh_function: WeighFunction::default(),
            wf_param: 1.0,
            years_in_interval: 5,
            words_per_year: 10,
        }
    }
}

impl AggregationParams {
    /// Check interval size, cap and weighting parameter.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.years_in_interval < 1 {
            return Err(ConfigError::Invalid(
                "years_in_interval must be >= 1".to_string(),
            ));
        }
        if self.words_per_year < 1 {
            return Err(ConfigError::Invalid("words_per_year must be >= 1".to_string()));
        }
        self.weigh_function.validate(self.wf_param)
    }
}

/// Split chronologically ordered slices into consecutive intervals.
///
/// The last interval is shorter when the slices do not divide evenly.
/// `years_in_interval` of zero yields no intervals.
pub fn partition_slices(slices: &[SliceKey], years_in_interval: usize) -> Vec<AggregationInterval> {
    if years_in_interval == 0 {
        return Vec::new();
    }
    slices
        .chunks(years_in_interval)
        .map(|chunk| AggregationInterval {
            label: chunk[(chunk.len() - 1) / 2].clone(),
            slices: chunk.to_vec(),
        })
        .collect()
}

/// Summarises tracked clouds per interval.
#[derive(Debug, Clone, Default)]
pub struct CloudAggregator {
    params: AggregationParams,
}

impl CloudAggregator {
    /// Create an aggregator. Parameters are checked by [`aggregate`](Self::aggregate).
    pub fn new(params: AggregationParams) -> Self {
        Self { params }
    }

    /// Aggregate every interval of `result`.
    ///
    /// Deterministic: identical input and parameters give identical output.
    pub fn aggregate(
        &self,
        result: &TrackResult,
    ) -> Result<(AggregatedClouds, AggregationMetadataMap)> {
        self.params.validate()?;

        let slices: Vec<SliceKey> = result.slices().cloned().collect();
        let intervals = partition_slices(&slices, self.params.years_in_interval);

        let mut clouds = BTreeMap::new();
        let mut metadata = BTreeMap::new();

        for interval in intervals {
            let (cloud, meta) = self.aggregate_interval(result, interval);
            debug!(
                interval = %cloud.label,
                terms = cloud.terms.len(),
                "Aggregated interval"
            );
            clouds.insert(cloud.label.clone(), cloud);
            metadata.insert(meta.interval.label.clone(), meta);
        }

        Ok((clouds, metadata))
    }

    fn aggregate_interval(
        &self,
        result: &TrackResult,
        interval: AggregationInterval,
    ) -> (AggregatedCloud, AggregationMetadata) {
        let len = interval.len();
        let mut scored: Vec<(String, f32, Vec<Provenance>)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut seeds: Vec<String> = Vec::new();

        for (position, slice) in interval.slices.iter().enumerate() {
            let weight = self
                .params
                .weigh_function
                .weight(position, len, self.params.wf_param);

            for cloud in result.clouds(slice.as_str()) {
                if cloud.seed_present && !seeds.contains(&cloud.seed) {
                    seeds.push(cloud.seed.clone());
                }
                for member in &cloud.terms {
                    let provenance = Provenance {
                        slice: slice.clone(),
                        seed: cloud.seed.clone(),
                        similarity: member.similarity,
                        weight,
                    };
                    let contribution = member.similarity * weight;
                    match positions.get(&member.term) {
                        Some(&i) => {
                            scored[i].1 += contribution;
                            scored[i].2.push(provenance);
                        }
                        None => {
                            positions.insert(member.term.clone(), scored.len());
                            scored.push((member.term.clone(), contribution, vec![provenance]));
                        }
                    }
                }
            }
        }

        // Terms seen only in zero-weight slices carry no evidence
        scored.retain(|(_, score, _)| *score > 0.0);
        // Stable: equal scores keep first-seen order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.params.words_per_year);

        let mut terms = Vec::with_capacity(scored.len());
        let mut provenance = BTreeMap::new();
        for (term, score, sources) in scored {
            terms.push(AggregatedTerm {
                term: term.clone(),
                score,
            });
            provenance.insert(term, sources);
        }

        let cloud = AggregatedCloud {
            label: interval.label.clone(),
            terms,
        };
        let meta = AggregationMetadata {
            interval,
            seeds,
            provenance,
        };
        (cloud, meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShiftError;
    use crate::tracking::{Cloud, CloudTerm};

    fn keys(n: usize) -> Vec<SliceKey> {
        (0..n).map(|i| SliceKey::new(format!("{}", 1950 + i))).collect()
    }

    fn cloud(seed: &str, terms: &[(&str, f32)]) -> Cloud {
        Cloud {
            seed: seed.to_string(),
            seed_present: true,
            terms: terms
                .iter()
                .map(|(t, s)| CloudTerm {
                    term: t.to_string(),
                    similarity: *s,
                })
                .collect(),
        }
    }

    fn track_result() -> TrackResult {
        let mut result = TrackResult::new(vec!["computer".to_string()]);
        result.insert(
            "1950".into(),
            vec![cloud("computer", &[("machine", 0.9), ("calculator", 0.8)])],
        );
        result.insert(
            "1951".into(),
            vec![cloud("computer", &[("machine", 0.7), ("hardware", 0.6)])],
        );
        result.insert(
            "1952".into(),
            vec![cloud("computer", &[("software", 0.95), ("hardware", 0.9)])],
        );
        result.insert("1953".into(), vec![Cloud::empty("computer", false)]);
        result.insert(
            "1954".into(),
            vec![cloud("computer", &[("software", 0.8)])],
        );
        result
    }

    fn params(years: usize, words: usize) -> AggregationParams {
        AggregationParams {
            weigh_function: WeighFunction::Uniform,
            wf_param: 1.0,
            years_in_interval: years,
            words_per_year: words,
        }
    }

    #[test]
    fn test_partition_keeps_short_tail() {
        let intervals = partition_slices(&keys(5), 2);
        assert_eq!(intervals.len(), 3);
        assert_eq!(intervals[2].len(), 1);
        assert_eq!(intervals[2].label.as_str(), "1954");
    }

    #[test]
    fn test_partition_covers_every_slice_once() {
        for size in 1..=6 {
            let slices = keys(5);
            let intervals = partition_slices(&slices, size);
            let covered: Vec<SliceKey> =
                intervals.iter().flat_map(|i| i.slices.clone()).collect();
            assert_eq!(covered, slices, "size {}", size);
            assert!(intervals.iter().all(|i| !i.is_empty()));
        }
    }

    #[test]
    fn test_interval_label_is_central_slice() {
        let intervals = partition_slices(&keys(5), 5);
        assert_eq!(intervals[0].label.as_str(), "1952");
        let intervals = partition_slices(&keys(4), 4);
        assert_eq!(intervals[0].label.as_str(), "1951");
    }

    #[test]
    fn test_aggregate_sums_and_sorts() {
        let aggregator = CloudAggregator::new(params(2, 10));
        let (clouds, meta) = aggregator.aggregate(&track_result()).unwrap();

        assert_eq!(clouds.len(), 3);
        let first = &clouds[&SliceKey::new("1950")];
        assert_eq!(first.terms[0].term, "machine");
        assert!((first.terms[0].score - 1.6).abs() < 1e-5);
        for cloud in clouds.values() {
            assert!(cloud
                .terms
                .windows(2)
                .all(|w| w[0].score >= w[1].score));
        }

        let provenance = &meta[&SliceKey::new("1950")].provenance["machine"];
        assert_eq!(provenance.len(), 2);
        assert_eq!(provenance[0].slice.as_str(), "1950");
        assert_eq!(provenance[1].slice.as_str(), "1951");
    }

    #[test]
    fn test_aggregate_caps_words() {
        let aggregator = CloudAggregator::new(params(5, 2));
        let (clouds, meta) = aggregator.aggregate(&track_result()).unwrap();

        let cloud = &clouds[&SliceKey::new("1952")];
        assert_eq!(cloud.terms.len(), 2);
        assert_eq!(meta[&SliceKey::new("1952")].provenance.len(), 2);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let mut result = TrackResult::new(vec!["a".to_string()]);
        result.insert("1950".into(), vec![cloud("a", &[("zeta", 0.5), ("alpha", 0.5)])]);
        let (clouds, _) = CloudAggregator::new(params(1, 10))
            .aggregate(&result)
            .unwrap();
        let terms: Vec<&str> = clouds[&SliceKey::new("1950")]
            .terms
            .iter()
            .map(|t| t.term.as_str())
            .collect();
        assert_eq!(terms, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_gaussian_prefers_central_slices() {
        let mut result = TrackResult::new(vec!["a".to_string()]);
        result.insert("1950".into(), vec![cloud("a", &[("edge", 0.9)])]);
        result.insert("1951".into(), vec![cloud("a", &[("center", 0.8)])]);
        result.insert("1952".into(), vec![Cloud::empty("a", true)]);
        let p = AggregationParams {
            weigh_function: WeighFunction::Gaussian,
            wf_param: 0.5,
            years_in_interval: 3,
            words_per_year: 10,
        };
        let (clouds, _) = CloudAggregator::new(p).aggregate(&result).unwrap();
        assert_eq!(clouds[&SliceKey::new("1951")].terms[0].term, "center");
    }

    #[test]
    fn test_zero_weight_terms_are_dropped() {
        let mut result = TrackResult::new(vec!["a".to_string()]);
        result.insert("1950".into(), vec![cloud("a", &[("edge", 0.9), ("shared", 0.4)])]);
        result.insert("1951".into(), vec![cloud("a", &[("center", 0.8), ("shared", 0.5)])]);
        result.insert("1952".into(), vec![cloud("a", &[("late", 0.7)])]);
        let p = AggregationParams {
            weigh_function: WeighFunction::Linear,
            wf_param: 1.0,
            years_in_interval: 3,
            words_per_year: 10,
        };
        let (clouds, meta) = CloudAggregator::new(p).aggregate(&result).unwrap();

        let label = SliceKey::new("1951");
        let terms: Vec<&str> = clouds[&label].terms.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(terms, vec!["center", "shared"]);
        assert!(clouds[&label].terms.iter().all(|t| t.score > 0.0));
        assert!(!meta[&label].provenance.contains_key("edge"));
        assert_eq!(meta[&label].provenance["shared"].len(), 2);
    }

    #[test]
    fn test_zero_words_is_config_error() {
        let err = CloudAggregator::new(params(2, 0))
            .aggregate(&track_result())
            .unwrap_err();
        assert!(matches!(err, ShiftError::Config(_)));
    }

    #[test]
    fn test_zero_interval_is_config_error() {
        let err = CloudAggregator::new(params(0, 5))
            .aggregate(&track_result())
            .unwrap_err();
        assert!(matches!(err, ShiftError::Config(_)));
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let aggregator = CloudAggregator::new(AggregationParams::default());
        let result = track_result();
        assert_eq!(
            aggregator.aggregate(&result).unwrap(),
            aggregator.aggregate(&result).unwrap()
        );
    }

    #[test]
    fn test_metadata_records_present_seeds() {
        let (_, meta) = CloudAggregator::new(params(5, 10))
            .aggregate(&track_result())
            .unwrap();
        assert_eq!(meta[&SliceKey::new("1952")].seeds, vec!["computer".to_string()]);
    }
}
