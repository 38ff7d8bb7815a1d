//! Time-sliced embedding spaces.
//!
//! Every time slice (a year or a year range such as `1950_1959`) owns one
//! independently trained vector space. Spaces are loaded once at start-up and
//! shared read-only through a [`SpaceRegistry`].
//!
//! # Components
//!
//! - [`EmbeddingSpace`]: nearest-neighbour and vector lookup over one slice.
//! - [`MemorySpace`]: in-memory cosine implementation backed by `ndarray`.
//! - [`SpaceRegistry`]: ordered, immutable map from [`SliceKey`] to space.
//! - [`loader`]: word2vec file loading.

pub mod loader;

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, RangeError};

pub use loader::{load_registry, load_space};

/// Identifier of one time slice.
///
/// Keys order lexicographically, which is chronological for plain years and
/// for `YYYY_YYYY` ranges.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SliceKey(String);

impl SliceKey {
    /// Create a new slice key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Centre of the year range this key names.
    ///
    /// `1950` gives `1950.0`, `1950_1959` gives `1954.5`. Returns `None` for
    /// keys that do not start with a year.
    pub fn middle(&self) -> Option<f64> {
        let years: Vec<f64> = self
            .0
            .split(|c: char| c == '_' || c == '-')
            .filter_map(|part| part.trim().parse::<f64>().ok())
            .collect();
        match (years.first(), years.last()) {
            (Some(first), Some(last)) => Some((first + last) / 2.0),
            _ => None,
        }
    }
}

impl fmt::Display for SliceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SliceKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SliceKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for SliceKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Read-only view over one slice's vector space.
pub trait EmbeddingSpace: Send + Sync {
    /// Nearest neighbours of `vector` by cosine similarity, best first.
    ///
    /// `exclude` removes one term (usually the query term) from the result.
    fn nearest(&self, vector: &[f32], k: usize, exclude: Option<&str>) -> Vec<(String, f32)>;

    /// Raw vector of a term, if the term is in the vocabulary.
    fn vector(&self, term: &str) -> Option<&[f32]>;

    /// Vector dimension.
    fn dimension(&self) -> usize;

    /// Vocabulary size.
    fn len(&self) -> usize;

    /// Whether the vocabulary is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `term` is in the vocabulary.
    fn contains(&self, term: &str) -> bool {
        self.vector(term).is_some()
    }

    /// The `k` nearest neighbours of `term`, excluding the term itself.
    ///
    /// An absent term yields an empty list.
    fn top_k(&self, term: &str, k: usize) -> Vec<(String, f32)> {
        match self.vector(term) {
            Some(vector) => self.nearest(vector, k, Some(term)),
            None => Vec::new(),
        }
    }
}

/// In-memory embedding space with brute-force cosine search.
pub struct MemorySpace {
    terms: Vec<String>,
    index: HashMap<String, usize>,
    vectors: Array2<f32>,
    unit: Array2<f32>,
}

impl MemorySpace {
    /// Build a space from `(term, vector)` entries.
    ///
    /// Every vector must have `dimension` components. Repeated terms keep the
    /// first occurrence.
    pub fn from_entries(
        dimension: usize,
        entries: Vec<(String, Vec<f32>)>,
    ) -> std::result::Result<Self, ModelError> {
        let mut terms = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());
        let mut flat = Vec::with_capacity(entries.len() * dimension);

        for (term, vector) in entries {
            if vector.len() != dimension {
                return Err(ModelError::DimensionMismatch {
                    expected: dimension,
                    got: vector.len(),
                });
            }
            if index.contains_key(&term) {
                continue;
            }
            index.insert(term.clone(), terms.len());
            terms.push(term);
            flat.extend(vector);
        }

        let vectors = Array2::from_shape_vec((terms.len(), dimension), flat).map_err(|e| {
            ModelError::Malformed {
                path: "<memory>".to_string(),
                reason: e.to_string(),
            }
        })?;

        let mut unit = vectors.clone();
        for mut row in unit.rows_mut() {
            let norm = row.dot(&row).sqrt();
            if norm > 0.0 {
                row /= norm;
            }
        }

        Ok(Self {
            terms,
            index,
            vectors,
            unit,
        })
    }

    /// Vocabulary in insertion order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

impl fmt::Debug for MemorySpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySpace")
            .field("terms", &self.terms.len())
            .field("dimension", &self.vectors.ncols())
            .finish()
    }
}

impl EmbeddingSpace for MemorySpace {
    fn nearest(&self, vector: &[f32], k: usize, exclude: Option<&str>) -> Vec<(String, f32)> {
        if k == 0 || vector.len() != self.dimension() || self.terms.is_empty() {
            return Vec::new();
        }

        let query = Array1::from(vector.to_vec());
        let norm = query.dot(&query).sqrt();
        if norm == 0.0 {
            return Vec::new();
        }
        let scores = self.unit.dot(&(query / norm));

        let excluded = exclude.and_then(|term| self.index.get(term).copied());
        let mut ranked: Vec<(usize, f32)> = scores
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != excluded)
            .map(|(i, s)| (i, *s))
            .collect();

        // Stable sort keeps vocabulary order among equal scores
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
            .into_iter()
            .take(k)
            .map(|(i, s)| (self.terms[i].clone(), s))
            .collect()
    }

    fn vector(&self, term: &str) -> Option<&[f32]> {
        let row = *self.index.get(term)?;
        let dim = self.dimension();
        self.vectors
            .as_slice()
            .map(|data| &data[row * dim..(row + 1) * dim])
    }

    fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    fn len(&self) -> usize {
        self.terms.len()
    }
}

/// Ordered, immutable collection of embedding spaces, one per time slice.
///
/// Built once at start-up and then shared behind an `Arc`; reads need no
/// synchronisation.
#[derive(Clone, Default)]
pub struct SpaceRegistry {
    spaces: BTreeMap<SliceKey, Arc<dyn EmbeddingSpace>>,
}

impl SpaceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the space of a time slice.
    pub fn insert(
        &mut self,
        key: impl Into<SliceKey>,
        space: Arc<dyn EmbeddingSpace>,
    ) -> std::result::Result<(), ModelError> {
        let key = key.into();
        if self.spaces.contains_key(&key) {
            return Err(ModelError::DuplicateSlice(key.to_string()));
        }
        self.spaces.insert(key, space);
        Ok(())
    }

    /// Builder-style variant of [`SpaceRegistry::insert`].
    pub fn with_space(
        mut self,
        key: impl Into<SliceKey>,
        space: impl EmbeddingSpace + 'static,
    ) -> std::result::Result<Self, ModelError> {
        self.insert(key, Arc::new(space))?;
        Ok(self)
    }

    /// Space of one slice.
    pub fn get(&self, key: &str) -> Option<&Arc<dyn EmbeddingSpace>> {
        self.spaces.get(key)
    }

    /// All slice keys in chronological order.
    pub fn keys(&self) -> impl Iterator<Item = &SliceKey> {
        self.spaces.keys()
    }

    /// Number of slices.
    pub fn len(&self) -> usize {
        self.spaces.len()
    }

    /// Whether the registry holds no slices.
    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }

    /// Slices between `start` and `end`, both inclusive, in chronological order.
    ///
    /// A missing or empty bound defaults to the first/last available slice.
    pub fn range(
        &self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> std::result::Result<Vec<SliceKey>, RangeError> {
        if self.spaces.is_empty() {
            return Err(RangeError::NoSlices);
        }

        let start = start.map(str::trim).filter(|s| !s.is_empty());
        let end = end.map(str::trim).filter(|s| !s.is_empty());

        for key in [start, end].into_iter().flatten() {
            if !self.spaces.contains_key(key) {
                return Err(RangeError::UnknownKey(key.to_string()));
            }
        }

        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(RangeError::Inverted {
                    start: start.to_string(),
                    end: end.to_string(),
                });
            }
        }

        Ok(self
            .spaces
            .keys()
            .filter(|key| start.map_or(true, |s| key.as_str() >= s))
            .filter(|key| end.map_or(true, |e| key.as_str() <= e))
            .cloned()
            .collect())
    }
}

impl fmt::Debug for SpaceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpaceRegistry")
            .field("slices", &self.spaces.keys().collect::<Vec<_>>())
            .finish()
    }
}
