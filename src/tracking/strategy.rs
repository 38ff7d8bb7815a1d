//! Strategy registries for cloud tracking.
//!
//! Strategy names arrive as free text (query parameters, config files). Each
//! family is a closed enum with an explicit `from_name` registry; an unknown
//! name is a [`ConfigError::UnknownStrategy`], never a silent fallback.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::space::EmbeddingSpace;

/// Hook deciding how clouds grow from one slice to the next.
///
/// Implementations must not change scoring: the tracker alone enforces the
/// `min_sim` and `max_related_terms` bounds, whatever the strategy admits.
pub trait ExpansionStrategy: Send + Sync {
    /// Name of this strategy.
    fn name(&self) -> &str;

    /// Whether a neighbour may join the current cloud.
    ///
    /// `previous` is the space of the slice processed just before the current
    /// one (`None` for the first slice).
    fn admits(&self, _term: &str, _previous: Option<&dyn EmbeddingSpace>) -> bool {
        true
    }

    /// How many of the best cloud members join the seed in the next slice's
    /// query set.
    fn carried_members(&self, word_boost: usize) -> usize {
        word_boost
    }
}

/// Re-queries the seed plus the best `word_boost` members of each cloud.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptiveExpansion;

impl ExpansionStrategy for AdaptiveExpansion {
    fn name(&self) -> &str {
        "adaptive"
    }
}

/// Queries the original seed in every slice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonAdaptiveExpansion;

impl ExpansionStrategy for NonAdaptiveExpansion {
    fn name(&self) -> &str {
        "non-adaptive"
    }

    fn carried_members(&self, _word_boost: usize) -> usize {
        0
    }
}

/// Adaptive expansion restricted to terms the previous slice also knows.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinuousExpansion;

impl ExpansionStrategy for ContinuousExpansion {
    fn name(&self) -> &str {
        "continuous"
    }

    fn admits(&self, term: &str, previous: Option<&dyn EmbeddingSpace>) -> bool {
        previous.map_or(true, |space| space.contains(term))
    }
}

/// Built-in neighbour expansion algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum Algorithm {
    #[default]
    Adaptive,
    NonAdaptive,
    Continuous,
}

impl Algorithm {
    /// Resolve a case-insensitive algorithm name.
    pub fn from_name(name: &str) -> std::result::Result<Self, ConfigError> {
        match strategy_name(name).as_str() {
            "adaptive" | "inlinks" => Ok(Self::Adaptive),
            "non-adaptive" | "nonadaptive" | "direct" => Ok(Self::NonAdaptive),
            "continuous" | "restricted" => Ok(Self::Continuous),
            _ => Err(ConfigError::UnknownStrategy {
                kind: "algorithm",
                name: name.to_string(),
            }),
        }
    }

    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adaptive => "adaptive",
            Self::NonAdaptive => "non-adaptive",
            Self::Continuous => "continuous",
        }
    }

    /// Strategy implementing this algorithm.
    pub fn strategy(&self) -> &'static dyn ExpansionStrategy {
        match self {
            Self::Adaptive => &AdaptiveExpansion,
            Self::NonAdaptive => &NonAdaptiveExpansion,
            Self::Continuous => &ContinuousExpansion,
        }
    }
}

/// How similarities combine when several query terms reach the same neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum BoostMethod {
    /// Add the similarity of every path.
    #[default]
    SumSimilarity,
    /// Keep the best path's similarity.
    MaxSimilarity,
}

impl BoostMethod {
    /// Resolve a case-insensitive boost method name.
    pub fn from_name(name: &str) -> std::result::Result<Self, ConfigError> {
        match strategy_name(name).as_str() {
            "sum" | "sum-similarity" | "sumsimilarity" | "true" => Ok(Self::SumSimilarity),
            "max" | "max-similarity" | "maxsimilarity" | "false" => Ok(Self::MaxSimilarity),
            _ => Err(ConfigError::UnknownStrategy {
                kind: "boost method",
                name: name.to_string(),
            }),
        }
    }

    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SumSimilarity => "sum-similarity",
            Self::MaxSimilarity => "max-similarity",
        }
    }

    /// Combine an accumulated score with a newly found path's similarity.
    pub fn combine(&self, accumulated: f32, similarity: f32) -> f32 {
        match self {
            Self::SumSimilarity => accumulated + similarity,
            Self::MaxSimilarity => accumulated.max(similarity),
        }
    }
}

/// Lowercase, trim and unify separators so `Sum Similarity` and
/// `sum_similarity` resolve alike.
pub(crate) fn strategy_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

macro_rules! name_conversions {
    ($($ty:ty),*) => {$(
        impl FromStr for $ty {
            type Err = ConfigError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Self::from_name(s)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = ConfigError;

            fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
                Self::from_name(&s)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    )*};
}

name_conversions!(Algorithm, BoostMethod);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::test_support::space;

    #[test]
    fn test_algorithm_names_case_insensitive() {
        assert_eq!(Algorithm::from_name("Adaptive").unwrap(), Algorithm::Adaptive);
        assert_eq!(Algorithm::from_name("INLINKS").unwrap(), Algorithm::Adaptive);
        assert_eq!(Algorithm::from_name("Non Adaptive").unwrap(), Algorithm::NonAdaptive);
        assert_eq!(Algorithm::from_name("non_adaptive").unwrap(), Algorithm::NonAdaptive);
        assert_eq!(Algorithm::from_name("continuous").unwrap(), Algorithm::Continuous);
    }

    #[test]
    fn test_unknown_algorithm() {
        let err = Algorithm::from_name("telepathy").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownStrategy { kind: "algorithm", .. }));
    }

    #[test]
    fn test_boost_method_names() {
        assert_eq!(
            BoostMethod::from_name("Sum Similarity").unwrap(),
            BoostMethod::SumSimilarity
        );
        assert_eq!(BoostMethod::from_name("max").unwrap(), BoostMethod::MaxSimilarity);
        assert!(BoostMethod::from_name("counts").is_err());
    }

    #[test]
    fn test_boost_combine() {
        assert!((BoostMethod::SumSimilarity.combine(0.5, 0.25) - 0.75).abs() < 1e-6);
        assert!((BoostMethod::MaxSimilarity.combine(0.5, 0.25) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_strategy_carry() {
        assert_eq!(Algorithm::Adaptive.strategy().carried_members(3), 3);
        assert_eq!(Algorithm::NonAdaptive.strategy().carried_members(3), 0);
    }

    #[test]
    fn test_continuous_admits_only_known_terms() {
        let previous = space(&[("old", &[1.0, 0.0])]);
        let previous: &dyn EmbeddingSpace = &previous;
        let strategy = Algorithm::Continuous.strategy();
        assert!(strategy.admits("old", Some(previous)));
        assert!(!strategy.admits("new", Some(previous)));
        assert!(strategy.admits("new", None));
    }

    #[test]
    fn test_deserialize_from_config_string() {
        let algo: Algorithm = serde_json::from_str("\"Non-Adaptive\"").unwrap();
        assert_eq!(algo, Algorithm::NonAdaptive);
        assert!(serde_json::from_str::<BoostMethod>("\"median\"").is_err());
    }

    #[test]
    fn test_display_round_trips_through_registry() {
        for algo in [Algorithm::Adaptive, Algorithm::NonAdaptive, Algorithm::Continuous] {
            assert_eq!(Algorithm::from_name(&algo.to_string()).unwrap(), algo);
        }
    }
}
