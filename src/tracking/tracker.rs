//! Cloud tracking across time slices.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::strategy::{Algorithm, BoostMethod, ExpansionStrategy};
use super::{Cloud, CloudTerm, Link, TrackResult};
use crate::cleaning::CleaningFunction;
use crate::error::{ConfigError, Result, ShiftError};
use crate::space::{EmbeddingSpace, SliceKey, SpaceRegistry};

/// Parameters of one tracking run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackParams {
    /// Cap on distinct terms per slice over all seeds combined.
    pub max_terms: usize,
    /// Neighbours requested per query term; also the cap on each cloud.
    pub max_related_terms: usize,
    /// First slice (inclusive). `None` or empty starts at the earliest slice.
    pub start_key: Option<String>,
    /// Last slice (inclusive). `None` or empty ends at the latest slice.
    pub end_key: Option<String>,
    /// Minimum similarity a neighbour needs to join a cloud.
    pub min_sim: f32,
    /// Number of cloud members carried into the next slice's query set.
    pub word_boost: usize,
    /// Walk slices in increasing (`true`) or decreasing order.
    pub forwards: bool,
    /// How similarities of several paths to one term combine.
    pub boost_method: BoostMethod,
    /// Neighbour expansion algorithm.
    pub algorithm: Algorithm,
}

impl Default for TrackParams {
    fn default() -> Self {
        Self {
            max_terms: 10,
            max_related_terms: 10,
            start_key: None,
            end_key: None,
            min_sim: 0.0,
            word_boost: 1,
            forwards: true,
            boost_method: BoostMethod::default(),
            algorithm: Algorithm::default(),
        }
    }
}

impl TrackParams {
    /// Check numeric bounds.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.max_terms == 0 {
            return Err(ConfigError::Invalid("max_terms must be > 0".to_string()));
        }
        if self.max_related_terms == 0 {
            return Err(ConfigError::Invalid(
                "max_related_terms must be > 0".to_string(),
            ));
        }
        if !self.min_sim.is_finite() {
            return Err(ConfigError::Invalid("min_sim must be finite".to_string()));
        }
        Ok(())
    }
}

/// A term queried in the current slice.
#[derive(Debug, Clone)]
struct QueryTerm {
    /// Term as known to the embedding spaces.
    raw: String,
    /// Cleaned form used in clouds and links.
    label: String,
    /// Slice in which this term was admitted, if any.
    from: Option<SliceKey>,
}

/// A neighbour collected for a cloud before capping.
#[derive(Debug, Clone)]
struct Candidate {
    raw: String,
    label: String,
    similarity: f32,
    best: f32,
    origin: usize,
}

/// The tracked state of one seed.
struct SeedTrack {
    seed: QueryTerm,
    queries: Vec<QueryTerm>,
}

/// Cloud of one seed in one slice, before the `max_terms` cap.
struct SeedCloud {
    seed_present: bool,
    candidates: Vec<Candidate>,
    queries: Vec<QueryTerm>,
}

/// Expands seed terms into per-slice clouds and links them through time.
///
/// The tracker only reads the registry; each call owns its result.
pub struct CloudTracker<'a> {
    registry: &'a SpaceRegistry,
    strategy: Option<&'a dyn ExpansionStrategy>,
}

impl<'a> CloudTracker<'a> {
    /// Create a tracker over a registry.
    pub fn new(registry: &'a SpaceRegistry) -> Self {
        Self {
            registry,
            strategy: None,
        }
    }

    /// Use a custom expansion strategy instead of `TrackParams::algorithm`.
    pub fn with_strategy(mut self, strategy: &'a dyn ExpansionStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Track every seed through the selected slices.
    ///
    /// Returns the clouds and the links between consecutive slices. A seed
    /// missing from a slice yields an empty cloud there; it is not an error.
    pub fn track_clouds(
        &self,
        seeds: &[String],
        params: &TrackParams,
        cleaner: Option<&CleaningFunction>,
    ) -> Result<(TrackResult, Vec<Link>)> {
        params.validate()?;

        let clean = |term: &str| -> String {
            match cleaner {
                Some(f) => f(term),
                None => term.to_string(),
            }
        };

        let mut tracks = prepare_seeds(seeds, &clean)?;
        let strategy = self
            .strategy
            .unwrap_or_else(|| params.algorithm.strategy());

        let mut keys = self
            .registry
            .range(params.start_key.as_deref(), params.end_key.as_deref())?;
        if !params.forwards {
            keys.reverse();
        }

        debug!(
            seeds = tracks.len(),
            slices = keys.len(),
            strategy = strategy.name(),
            forwards = params.forwards,
            "Tracking clouds"
        );

        let mut result = TrackResult::new(tracks.iter().map(|t| t.seed.label.clone()).collect());
        let mut links = Vec::new();
        let mut previous: Option<&dyn EmbeddingSpace> = None;

        for key in keys {
            let space = match self.registry.get(key.as_str()) {
                Some(space) => space.as_ref(),
                None => continue,
            };

            let mut seed_clouds: Vec<SeedCloud> = tracks
                .iter()
                .map(|track| expand(space, previous, track, params, strategy, &clean))
                .collect();

            cap_distinct_terms(&mut seed_clouds, params.max_terms, &key);

            let mut clouds = Vec::with_capacity(tracks.len());
            for (track, seed_cloud) in tracks.iter_mut().zip(seed_clouds) {
                let label = &track.seed.label;
                if seed_cloud.candidates.is_empty() {
                    warn!(slice = %key, seed = %label, "No related terms in slice");
                }

                for candidate in &seed_cloud.candidates {
                    let origin = &seed_cloud.queries[candidate.origin];
                    // Only terms admitted in the previous slice start a link
                    let Some(from_slice) = origin.from.clone() else {
                        continue;
                    };
                    links.push(Link {
                        seed: label.clone(),
                        from_slice,
                        from_term: origin.label.clone(),
                        to_slice: key.clone(),
                        to_term: candidate.label.clone(),
                        weight: candidate.best,
                    });
                }

                track.queries = next_queries(
                    &track.seed,
                    &seed_cloud,
                    &key,
                    strategy.carried_members(params.word_boost),
                );

                clouds.push(Cloud {
                    seed: label.clone(),
                    seed_present: seed_cloud.seed_present,
                    terms: seed_cloud
                        .candidates
                        .into_iter()
                        .map(|c| CloudTerm {
                            term: c.label,
                            similarity: c.similarity,
                        })
                        .collect(),
                });
            }

            result.insert(key, clouds);
            previous = Some(space);
        }

        Ok((result, links))
    }
}

/// Normalise, clean and de-duplicate the seed terms.
fn prepare_seeds(seeds: &[String], clean: &dyn Fn(&str) -> String) -> Result<Vec<SeedTrack>> {
    let mut seen = HashSet::new();
    let mut tracks = Vec::new();

    for seed in seeds {
        let raw = seed.trim().to_lowercase();
        if raw.is_empty() {
            continue;
        }
        let label = clean(&raw);
        if label.is_empty() {
            debug!(seed = %raw, "Seed removed by cleaning");
            continue;
        }
        if !seen.insert(label.clone()) {
            continue;
        }
        let query = QueryTerm {
            raw,
            label,
            from: None,
        };
        tracks.push(SeedTrack {
            seed: query.clone(),
            queries: vec![query],
        });
    }

    if tracks.is_empty() {
        return Err(ShiftError::EmptyInput(if seeds.is_empty() {
            "no seed terms given".to_string()
        } else {
            "no seed terms left after cleaning".to_string()
        }));
    }
    Ok(tracks)
}

/// Build the uncapped cloud of one seed in one slice.
fn expand(
    space: &dyn EmbeddingSpace,
    previous: Option<&dyn EmbeddingSpace>,
    track: &SeedTrack,
    params: &TrackParams,
    strategy: &dyn ExpansionStrategy,
    clean: &dyn Fn(&str) -> String,
) -> SeedCloud {
    let seed_present = space.contains(&track.seed.raw);
    if !seed_present {
        return SeedCloud {
            seed_present,
            candidates: Vec::new(),
            queries: track.queries.clone(),
        };
    }

    let mut candidates: Vec<Candidate> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (origin, query) in track.queries.iter().enumerate() {
        for (raw, similarity) in space.top_k(&query.raw, params.max_related_terms) {
            if similarity < params.min_sim || !strategy.admits(&raw, previous) {
                continue;
            }
            let label = clean(&raw);
            if label.is_empty() || label == track.seed.label {
                continue;
            }

            match positions.get(&label) {
                Some(&i) => {
                    let candidate = &mut candidates[i];
                    candidate.similarity = params
                        .boost_method
                        .combine(candidate.similarity, similarity);
                    if similarity > candidate.best {
                        candidate.best = similarity;
                        candidate.origin = origin;
                    }
                }
                None => {
                    positions.insert(label.clone(), candidates.len());
                    candidates.push(Candidate {
                        raw,
                        label,
                        similarity,
                        best: similarity,
                        origin,
                    });
                }
            }
        }
    }

    // Stable: equal scores keep discovery order
    candidates.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(params.max_related_terms);

    SeedCloud {
        seed_present,
        candidates,
        queries: track.queries.clone(),
    }
}

/// Keep at most `max_terms` distinct terms over all seeds of one slice,
/// dropping the lowest-similarity terms first.
fn cap_distinct_terms(clouds: &mut [SeedCloud], max_terms: usize, key: &SliceKey) {
    let mut best: Vec<(String, f32)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for candidate in clouds.iter().flat_map(|c| c.candidates.iter()) {
        match positions.get(&candidate.label) {
            Some(&i) => best[i].1 = best[i].1.max(candidate.similarity),
            None => {
                positions.insert(candidate.label.clone(), best.len());
                best.push((candidate.label.clone(), candidate.similarity));
            }
        }
    }

    if best.len() <= max_terms {
        return;
    }

    best.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let kept: HashSet<String> = best.into_iter().take(max_terms).map(|(t, _)| t).collect();

    let mut dropped = 0;
    for cloud in clouds.iter_mut() {
        let before = cloud.candidates.len();
        cloud.candidates.retain(|c| kept.contains(&c.label));
        dropped += before - cloud.candidates.len();
    }
    debug!(slice = %key, dropped, max_terms, "Capped distinct terms");
}

/// Query set for the slice after `key`.
///
/// An empty cloud resets tracking to the seed alone. The seed only links
/// from `key` when it exists there.
fn next_queries(
    seed: &QueryTerm,
    cloud: &SeedCloud,
    key: &SliceKey,
    carried: usize,
) -> Vec<QueryTerm> {
    let mut queries = vec![QueryTerm {
        from: cloud.seed_present.then(|| key.clone()),
        ..seed.clone()
    }];
    if cloud.candidates.is_empty() {
        return queries;
    }

    queries.extend(cloud.candidates.iter().take(carried).map(|c| QueryTerm {
        raw: c.raw.clone(),
        label: c.label.clone(),
        from: Some(key.clone()),
    }));
    queries
}
