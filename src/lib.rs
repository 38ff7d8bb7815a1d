//! concept-shift: temporal vocabulary tracking over word embeddings
//!
//! Given seed terms and one embedding space per time slice, concept-shift
//! follows the vocabulary related to the seeds through time, aggregates it
//! over year intervals, and prepares networks and a shared 2D embedding for
//! visualisation.

pub mod aggregation;
pub mod alignment;
pub mod api;
pub mod cleaning;
pub mod config;
pub mod error;
pub mod monitor;
pub mod network;
pub mod space;
pub mod tracking;

pub use aggregation::{
    partition_slices, AggregatedCloud, AggregatedClouds, AggregatedTerm, AggregationInterval,
    AggregationMetadata, AggregationMetadataMap, AggregationParams, CloudAggregator, Provenance,
    WeighFunction,
};
pub use alignment::{AlignedPosition, ProjectionMethod, ProjectionParams, SpaceAligner};
pub use api::{create_rest_router, ApiState, RestApiConfig, TrackQuery};
pub use cleaning::{cleaner_by_name, CleaningFunction};
pub use config::Config;
pub use error::{ConfigError, ModelError, RangeError, Result, ShiftError};
pub use monitor::{parse_terms, TrackRequest, TrackResponse, VocabularyMonitor, YearSettings};
pub use network::{Granularity, Graph, GraphEdge, GraphNode, NetworkBuilder};
pub use space::{load_registry, EmbeddingSpace, MemorySpace, SliceKey, SpaceRegistry};
pub use tracking::{
    Algorithm, BoostMethod, Cloud, CloudTerm, CloudTracker, ExpansionStrategy, Link, TrackParams,
    TrackResult,
};
