//! Per-slice vocabulary clouds and the links tracking them through time.
//!
//! For every seed term and every time slice the tracker asks the slice's
//! embedding space for the seed's nearest neighbours. The resulting
//! [`Cloud`] decides which terms are queried in the next slice, so the
//! vocabulary can drift along with the seed's meaning. Every cloud member is
//! linked back to the query term that admitted it.
//!
//! ```text
//!  slice 1950            slice 1951            slice 1952
//! ┌──────────┐  link   ┌──────────┐  link   ┌──────────┐
//! │ computer ├────────▶│ machine  ├────────▶│ hardware │
//! │          ├────────▶│ computer │         │ ...      │
//! └──────────┘         └──────────┘         └──────────┘
//! ```
//!
//! Links are similarity-weighted edges. Two linked terms are not the same
//! term; nothing in this crate treats links as an equivalence relation.

mod strategy;
mod tracker;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::space::SliceKey;

pub(crate) use strategy::strategy_name;
pub use strategy::{
    AdaptiveExpansion, Algorithm, BoostMethod, ContinuousExpansion, ExpansionStrategy,
    NonAdaptiveExpansion,
};
pub use tracker::{CloudTracker, TrackParams};

/// One member of a cloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudTerm {
    /// Cleaned term.
    pub term: String,
    /// Combined similarity to the cloud's query terms.
    pub similarity: f32,
}

/// Terms related to one seed within one time slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cloud {
    /// Seed term this cloud belongs to.
    pub seed: String,
    /// Whether the seed itself is in the slice's vocabulary.
    pub seed_present: bool,
    /// Members ordered by descending similarity.
    pub terms: Vec<CloudTerm>,
}

impl Cloud {
    /// A cloud with no members.
    pub fn empty(seed: impl Into<String>, seed_present: bool) -> Self {
        Self {
            seed: seed.into(),
            seed_present,
            terms: Vec::new(),
        }
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether the cloud has no members (a gap in the seed's coverage).
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Whether `term` is a member.
    pub fn contains(&self, term: &str) -> bool {
        self.terms.iter().any(|t| t.term == term)
    }
}

/// Directed, weighted edge from a query term to a cloud member it admitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Seed whose tracking produced this link.
    pub seed: String,
    /// Slice processed just before `to_slice`, where the query term was admitted.
    pub from_slice: SliceKey,
    /// Query term.
    pub from_term: String,
    /// Slice of the admitted member.
    pub to_slice: SliceKey,
    /// Admitted member.
    pub to_term: String,
    /// Similarity of the admitting path.
    pub weight: f32,
}

/// Clouds for every processed slice and seed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackResult {
    seeds: Vec<String>,
    clouds: BTreeMap<SliceKey, Vec<Cloud>>,
}

impl TrackResult {
    /// Create an empty result for `seeds`.
    pub fn new(seeds: Vec<String>) -> Self {
        Self {
            seeds,
            clouds: BTreeMap::new(),
        }
    }

    /// Store the clouds of one slice, replacing earlier ones.
    pub fn insert(&mut self, slice: SliceKey, clouds: Vec<Cloud>) {
        self.clouds.insert(slice, clouds);
    }

    /// Tracked seeds in request order.
    pub fn seeds(&self) -> &[String] {
        &self.seeds
    }

    /// Processed slices in chronological order.
    pub fn slices(&self) -> impl Iterator<Item = &SliceKey> {
        self.clouds.keys()
    }

    /// Number of processed slices.
    pub fn slice_count(&self) -> usize {
        self.clouds.len()
    }

    /// Clouds of one slice, one per seed in seed order.
    pub fn clouds(&self, slice: &str) -> &[Cloud] {
        self.clouds.get(slice).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cloud of one seed in one slice.
    pub fn cloud(&self, slice: &str, seed: &str) -> Option<&Cloud> {
        self.clouds(slice).iter().find(|c| c.seed == seed)
    }

    /// Every `(slice, clouds)` pair in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = (&SliceKey, &[Cloud])> {
        self.clouds.iter().map(|(k, v)| (k, v.as_slice()))
    }
}
