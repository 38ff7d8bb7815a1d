//! Aggregation of per-slice clouds over sliding year intervals.
//!
//! Consecutive slices are grouped into intervals of `years_in_interval`
//! slices. Within an interval every cloud member contributes its similarity,
//! scaled by a [`WeighFunction`] of the slice's distance from the interval
//! centre. The best `words_per_year` terms form the interval's
//! [`AggregatedCloud`]; [`AggregationMetadata`] keeps where each of them
//! came from.

mod aggregator;
mod weighting;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::space::SliceKey;

pub use aggregator::{partition_slices, AggregationParams, CloudAggregator};
pub use weighting::WeighFunction;

/// Contiguous run of slices aggregated together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationInterval {
    /// Central slice, used as the interval's key.
    pub label: SliceKey,
    /// Member slices in chronological order. Never empty.
    pub slices: Vec<SliceKey>,
}

impl AggregationInterval {
    /// Number of slices in the interval.
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    /// Whether the interval has no slices.
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Whether `slice` belongs to this interval.
    pub fn contains(&self, slice: &str) -> bool {
        self.slices.iter().any(|s| s.as_str() == slice)
    }
}

/// A term and its aggregate score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedTerm {
    pub term: String,
    pub score: f32,
}

/// Bounded, weighted summary of an interval's clouds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedCloud {
    /// Interval key.
    pub label: SliceKey,
    /// Terms by descending score.
    pub terms: Vec<AggregatedTerm>,
}

impl AggregatedCloud {
    /// Whether `term` was retained.
    pub fn contains(&self, term: &str) -> bool {
        self.terms.iter().any(|t| t.term == term)
    }
}

/// One cloud entry that contributed to an aggregated term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Slice of the contributing cloud.
    pub slice: SliceKey,
    /// Seed of the contributing cloud.
    pub seed: String,
    /// Raw similarity in that cloud.
    pub similarity: f32,
    /// Weight of the slice within the interval.
    pub weight: f32,
}

/// Provenance of an [`AggregatedCloud`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationMetadata {
    /// The aggregated interval.
    pub interval: AggregationInterval,
    /// Seeds present in at least one slice of the interval.
    pub seeds: Vec<String>,
    /// Contributions of every retained term, in discovery order.
    pub provenance: BTreeMap<String, Vec<Provenance>>,
}

impl AggregationMetadata {
    /// Contribution with the highest raw similarity (earliest on ties).
    pub fn strongest(&self, term: &str) -> Option<&Provenance> {
        self.provenance.get(term)?.iter().fold(None, |best, p| match best {
            Some(b) if b.similarity >= p.similarity => Some(b),
            _ => Some(p),
        })
    }
}

/// Aggregated clouds keyed by interval label.
pub type AggregatedClouds = BTreeMap<SliceKey, AggregatedCloud>;

/// Aggregation metadata keyed by interval label.
pub type AggregationMetadataMap = BTreeMap<SliceKey, AggregationMetadata>;
