//! Shared 2D embedding of the tracked vocabulary.
//!
//! Every aggregated term gets one vector, taken from the slice where it was
//! most similar to its query. All vectors are projected by a single fit so
//! positions are comparable across years.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregation::AggregationMetadataMap;
use crate::error::ConfigError;
use crate::space::{EmbeddingSpace, SliceKey, SpaceRegistry};
use crate::tracking::{strategy_name, TrackResult};

/// 2D coordinate of a term.
pub type AlignedPosition = [f64; 2];

/// Dimensionality reduction used for the shared fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ProjectionMethod {
    /// First two principal components.
    #[default]
    Pca,
    /// PCA start refined by stress minimisation on pairwise distances.
    Stress,
}

impl ProjectionMethod {
    /// Resolve a case-insensitive projection name.
    pub fn from_name(name: &str) -> std::result::Result<Self, ConfigError> {
        match strategy_name(name).as_str() {
            "pca" => Ok(Self::Pca),
            "stress" | "mds" => Ok(Self::Stress),
            _ => Err(ConfigError::UnknownStrategy {
                kind: "projection",
                name: name.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for ProjectionMethod {
    type Error = ConfigError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Self::from_name(&s)
    }
}

/// Projection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionParams {
    pub method: ProjectionMethod,
    /// Power iteration steps per component; also stress refinement steps.
    pub iterations: usize,
    /// Seed of the power iteration start vector.
    pub seed: u64,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self {
            method: ProjectionMethod::Pca,
            iterations: 100,
            seed: 42,
        }
    }
}

/// Projects tracked terms into one shared coordinate system.
pub struct SpaceAligner<'a> {
    registry: &'a SpaceRegistry,
    params: ProjectionParams,
}

impl<'a> SpaceAligner<'a> {
    /// Create an aligner over a registry.
    pub fn new(registry: &'a SpaceRegistry, params: ProjectionParams) -> Self {
        Self { registry, params }
    }

    /// Positions for every aggregated term and every seed with a vector.
    ///
    /// Terms whose vector is missing from their source slice, or whose
    /// dimension differs from the most common one, are left out.
    pub fn do_space_embedding(
        &self,
        result: &TrackResult,
        metadata: &AggregationMetadataMap,
    ) -> BTreeMap<String, AlignedPosition> {
        let sources = vector_sources(result, metadata);

        let mut found: Vec<(String, SliceKey, Vec<f32>)> = Vec::with_capacity(sources.len());
        for (term, (slice, _)) in sources {
            let vector = self
                .registry
                .get(slice.as_str())
                .and_then(|space| space.vector(&term).map(<[f32]>::to_vec));
            match vector {
                Some(v) => found.push((term, slice, v)),
                None => debug!(term = %term, slice = %slice, "No vector, omitting term"),
            }
        }

        let reference = self.reference_dimension(&found);
        let mut terms = Vec::with_capacity(found.len());
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(found.len());
        for (term, slice, v) in found {
            if Some(v.len()) == reference {
                terms.push(term);
                vectors.push(v);
            } else {
                warn!(
                    term = %term,
                    slice = %slice,
                    dimension = v.len(),
                    "Vector dimension differs, omitting term"
                );
            }
        }

        let points = match self.params.method {
            ProjectionMethod::Pca => project_pca(&vectors, &self.params),
            ProjectionMethod::Stress => project_stress(&vectors, &self.params),
        };

        terms.into_iter().zip(points).collect()
    }

    /// Most common dimension among `found`; ties go to the earliest slice.
    fn reference_dimension(&self, found: &[(String, SliceKey, Vec<f32>)]) -> Option<usize> {
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for (_, _, v) in found {
            *counts.entry(v.len()).or_default() += 1;
        }
        self.registry
            .keys()
            .filter_map(|key| self.registry.get(key.as_str()))
            .filter_map(|space| counts.get(&space.dimension()).map(|&n| (space.dimension(), n)))
            .fold(None, |best: Option<(usize, usize)>, (dim, n)| match best {
                Some((_, most)) if most >= n => best,
                _ => Some((dim, n)),
            })
            .map(|(dim, _)| dim)
    }
}

/// Source slice for each term: the strongest provenance across intervals,
/// and for seeds the first slice where they are present.
fn vector_sources(
    result: &TrackResult,
    metadata: &AggregationMetadataMap,
) -> BTreeMap<String, (SliceKey, f32)> {
    let mut sources: BTreeMap<String, (SliceKey, f32)> = BTreeMap::new();

    for meta in metadata.values() {
        for term in meta.provenance.keys() {
            if let Some(p) = meta.strongest(term) {
                match sources.get(term) {
                    Some((_, best)) if *best >= p.similarity => {}
                    _ => {
                        sources.insert(term.clone(), (p.slice.clone(), p.similarity));
                    }
                }
            }
        }
    }

    for seed in result.seeds() {
        if sources.contains_key(seed) {
            continue;
        }
        let present = result
            .iter()
            .find(|(_, clouds)| clouds.iter().any(|c| &c.seed == seed && c.seed_present));
        if let Some((slice, _)) = present {
            sources.insert(seed.clone(), (slice.clone(), 1.0));
        }
    }

    sources
}

/// Unit-normalised, mean-centred data matrix.
fn centered_matrix(vectors: &[Vec<f32>]) -> Array2<f64> {
    let n = vectors.len();
    let dim = vectors.first().map_or(0, Vec::len);

    let mut data = Array2::<f64>::zeros((n, dim));
    for (i, v) in vectors.iter().enumerate() {
        let norm = v.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
        let scale = if norm > 0.0 { 1.0 / norm } else { 0.0 };
        for (j, &x) in v.iter().enumerate() {
            data[[i, j]] = x as f64 * scale;
        }
    }

    if let Some(mean) = data.mean_axis(Axis(0)) {
        data -= &mean;
    }
    data
}

/// Project onto the first two principal components.
fn project_pca(vectors: &[Vec<f32>], params: &ProjectionParams) -> Vec<AlignedPosition> {
    match vectors.len() {
        0 => return Vec::new(),
        1 => return vec![[0.0, 0.0]],
        _ => {}
    }

    let data = centered_matrix(vectors);
    let (pc1, pc2) = principal_components(&data, params);

    data.rows()
        .into_iter()
        .map(|row| [row.dot(&pc1), row.dot(&pc2)])
        .collect()
}

/// First two principal components by power iteration on the covariance.
fn principal_components(data: &Array2<f64>, params: &ProjectionParams) -> (Array1<f64>, Array1<f64>) {
    let (n, dim) = data.dim();
    let cov = data.t().dot(data) / (n as f64);

    let pc1 = power_iteration(&cov, params.iterations, params.seed);
    let deflated = deflate_matrix(&cov, &pc1);
    let pc2 = if dim >= 2 {
        power_iteration(&deflated, params.iterations, params.seed.wrapping_add(1))
    } else {
        Array1::zeros(dim)
    };

    (orient(pc1), orient(pc2))
}

/// Dominant eigenvector from a seeded start vector.
fn power_iteration(matrix: &Array2<f64>, iterations: usize, seed: u64) -> Array1<f64> {
    let n = matrix.dim().0;
    let mut state = seed;
    let mut v: Array1<f64> = (0..n)
        .map(|_| 0.5 + (splitmix64(&mut state) >> 11) as f64 / (1u64 << 53) as f64)
        .collect();
    let norm = v.dot(&v).sqrt();
    if norm > 0.0 {
        v /= norm;
    }

    for _ in 0..iterations.max(1) {
        let mut next = matrix.dot(&v);
        let norm = next.dot(&next).sqrt();
        if norm < 1e-12 {
            // Null matrix: no further variance
            return Array1::zeros(n);
        }
        next /= norm;
        v = next;
    }

    v
}

/// Remove the component along `v` from a symmetric matrix.
fn deflate_matrix(matrix: &Array2<f64>, v: &Array1<f64>) -> Array2<f64> {
    let lambda = v.dot(&matrix.dot(v));
    let outer = v
        .view()
        .insert_axis(Axis(1))
        .dot(&v.view().insert_axis(Axis(0)));
    matrix - &(outer * lambda)
}

/// Fix the eigenvector sign: the largest-magnitude entry is positive.
fn orient(v: Array1<f64>) -> Array1<f64> {
    let pivot = v
        .iter()
        .copied()
        .fold(0.0_f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
    if pivot < 0.0 {
        -v
    } else {
        v
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// PCA start refined by gradient descent on the distance stress.
fn project_stress(vectors: &[Vec<f32>], params: &ProjectionParams) -> Vec<AlignedPosition> {
    let mut y = project_pca(vectors, params);
    let n = y.len();
    if n < 3 {
        return y;
    }

    let data = centered_matrix(vectors);
    let high = pairwise_distances(&data);
    let learning_rate = 0.5;

    for iter in 0..params.iterations {
        let mut gradients = vec![[0.0_f64; 2]; n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let dx = y[i][0] - y[j][0];
                let dy = y[i][1] - y[j][1];
                let low = (dx * dx + dy * dy).sqrt().max(1e-10);
                let g = 2.0 * (low - high[[i, j]]) / low;
                gradients[i][0] += g * dx;
                gradients[i][1] += g * dy;
            }
        }

        let lr = learning_rate * (1.0 - iter as f64 / params.iterations as f64);
        for (point, grad) in y.iter_mut().zip(&gradients) {
            point[0] -= lr * grad[0] / n as f64;
            point[1] -= lr * grad[1] / n as f64;
        }
    }

    y
}

fn pairwise_distances(data: &Array2<f64>) -> Array2<f64> {
    let n = data.nrows();
    let mut distances = Array2::zeros((n, n));
    for i in 0..n {
        for j in i + 1..n {
            let diff = &data.row(i) - &data.row(j);
            let d = diff.dot(&diff).sqrt();
            distances[[i, j]] = d;
            distances[[j, i]] = d;
        }
    }
    distances
}
