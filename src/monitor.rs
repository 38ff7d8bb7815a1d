//! The request pipeline: track, aggregate, build networks, embed.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregation::{AggregatedClouds, AggregationParams, CloudAggregator};
use crate::alignment::{AlignedPosition, ProjectionParams, SpaceAligner};
use crate::cleaning::CleaningFunction;
use crate::error::Result;
use crate::network::{Granularity, Graph, NetworkBuilder};
use crate::space::{SliceKey, SpaceRegistry};
use crate::tracking::{CloudTracker, Link, TrackParams};

/// Everything a caller can tune for one tracking request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackRequest {
    pub tracker: TrackParams,
    pub aggregation: AggregationParams,
    /// Apply the monitor's cleaning function, if it has one.
    pub do_cleaning: bool,
}

/// Aggregated scores per interval label.
pub type Stream = BTreeMap<SliceKey, BTreeMap<String, f32>>;

/// Output of [`VocabularyMonitor::track`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackResponse {
    /// Term scores per aggregated interval.
    pub stream: Stream,
    /// Term network per interval (or slice).
    pub networks: BTreeMap<SliceKey, Graph>,
    /// Shared 2D positions.
    pub embedded: BTreeMap<String, AlignedPosition>,
    /// Tracking links.
    pub vocabs: Vec<Link>,
}

/// Available slices keyed by their middle year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSettings {
    pub values: BTreeMap<i64, SliceKey>,
    pub first: Option<i64>,
    pub last: Option<i64>,
}

/// Runs tracking requests against a fixed set of embedding spaces.
#[derive(Clone)]
pub struct VocabularyMonitor {
    registry: Arc<SpaceRegistry>,
    cleaner: Option<CleaningFunction>,
    projection: ProjectionParams,
    granularity: Granularity,
}

impl VocabularyMonitor {
    /// Create a monitor over loaded spaces.
    pub fn new(registry: Arc<SpaceRegistry>) -> Self {
        Self {
            registry,
            cleaner: None,
            projection: ProjectionParams::default(),
            granularity: Granularity::default(),
        }
    }

    /// Set the cleaning function offered to requests.
    pub fn with_cleaner(mut self, cleaner: Option<CleaningFunction>) -> Self {
        self.cleaner = cleaner;
        self
    }

    /// Set the projection used for `embedded`.
    pub fn with_projection(mut self, projection: ProjectionParams) -> Self {
        self.projection = projection;
        self
    }

    /// Set the network granularity.
    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// The loaded spaces.
    pub fn registry(&self) -> &SpaceRegistry {
        &self.registry
    }

    /// Whether a cleaning function is configured.
    pub fn can_clean(&self) -> bool {
        self.cleaner.is_some()
    }

    /// Middle year of every slice, plus the first and last of them.
    ///
    /// Slices whose key has no numeric year are left out.
    pub fn available_years(&self) -> YearSettings {
        let values: BTreeMap<i64, SliceKey> = self
            .registry
            .keys()
            .filter_map(|key| key.middle().map(|m| (m as i64, key.clone())))
            .collect();
        YearSettings {
            first: values.keys().next().copied(),
            last: values.keys().next_back().copied(),
            values,
        }
    }

    /// Run the full pipeline for `terms`.
    pub fn track(&self, terms: &[String], request: &TrackRequest) -> Result<TrackResponse> {
        let cleaner = if request.do_cleaning {
            self.cleaner.as_ref()
        } else {
            None
        };

        let (result, links) =
            CloudTracker::new(&self.registry).track_clouds(terms, &request.tracker, cleaner)?;

        let (clouds, metadata) = CloudAggregator::new(request.aggregation.clone()).aggregate(&result)?;

        let networks =
            NetworkBuilder::new(self.granularity).yearly_network(&metadata, &clouds, &result, &links);
        let embedded = SpaceAligner::new(&self.registry, self.projection.clone())
            .do_space_embedding(&result, &metadata);

        info!(
            seeds = result.seeds().len(),
            slices = result.slice_count(),
            intervals = clouds.len(),
            links = links.len(),
            "Tracked vocabulary"
        );

        Ok(TrackResponse {
            stream: stream(&clouds),
            networks,
            embedded,
            vocabs: links,
        })
    }
}

/// Split a comma separated term list, trimming and lowercasing each entry.
pub fn parse_terms(terms: &str) -> Vec<String> {
    terms
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn stream(clouds: &AggregatedClouds) -> Stream {
    clouds
        .iter()
        .map(|(label, cloud)| {
            let scores = cloud
                .terms
                .iter()
                .map(|t| (t.term.clone(), t.score))
                .collect();
            (label.clone(), scores)
        })
        .collect()
}
