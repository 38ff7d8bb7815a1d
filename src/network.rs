//! Per-year term networks for visualisation.
//!
//! Projects already computed structures into graphs: nodes are aggregated
//! terms (plus the seeds active at that point), edges are tracking links
//! whose two ends are both nodes. Nothing is re-scored and no edge is
//! created that is not backed by a link.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::aggregation::{AggregatedCloud, AggregatedClouds, AggregationMetadataMap};
use crate::error::ConfigError;
use crate::space::SliceKey;
use crate::tracking::{strategy_name, Link, TrackResult};

/// Time resolution of the produced graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Granularity {
    /// One graph per aggregation interval.
    #[default]
    Interval,
    /// One graph per time slice.
    Slice,
}

impl Granularity {
    /// Resolve a case-insensitive granularity name.
    pub fn from_name(name: &str) -> std::result::Result<Self, ConfigError> {
        match strategy_name(name).as_str() {
            "interval" | "aggregated" => Ok(Self::Interval),
            "slice" | "year" | "yearly" => Ok(Self::Slice),
            _ => Err(ConfigError::UnknownStrategy {
                kind: "granularity",
                name: name.to_string(),
            }),
        }
    }
}

impl FromStr for Granularity {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl TryFrom<String> for Granularity {
    type Error = ConfigError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Self::from_name(&s)
    }
}

/// A term in a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// The term, unique within its graph.
    pub id: String,
    /// Aggregate score (0 for seeds that were not aggregated).
    pub score: f32,
    /// Whether the term is a tracked seed.
    pub is_seed: bool,
}

/// A weighted, directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub weight: f32,
}

/// Nodes and edges of one year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    /// Whether a node with this id exists.
    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }
}

/// Builds graphs from aggregation output and tracking links.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkBuilder {
    granularity: Granularity,
}

impl NetworkBuilder {
    /// Create a builder for the given granularity.
    pub fn new(granularity: Granularity) -> Self {
        Self { granularity }
    }

    /// One graph per interval or per slice, keyed by interval label or slice.
    pub fn yearly_network(
        &self,
        metadata: &AggregationMetadataMap,
        clouds: &AggregatedClouds,
        result: &TrackResult,
        links: &[Link],
    ) -> BTreeMap<SliceKey, Graph> {
        match self.granularity {
            Granularity::Interval => clouds
                .iter()
                .map(|(label, cloud)| {
                    let seeds = metadata
                        .get(label)
                        .map(|m| m.seeds.as_slice())
                        .unwrap_or(&[]);
                    let nodes = node_list(cloud, seeds, |_| true);
                    let interval = metadata.get(label).map(|m| &m.interval);
                    let graph = connect(nodes, links, |link| {
                        interval.map_or(false, |i| i.contains(link.to_slice.as_str()))
                    });
                    (label.clone(), graph)
                })
                .collect(),
            Granularity::Slice => result
                .slices()
                .filter_map(|slice| {
                    let meta = metadata
                        .values()
                        .find(|m| m.interval.contains(slice.as_str()))?;
                    let cloud = clouds.get(&meta.interval.label)?;
                    let slice_clouds = result.clouds(slice.as_str());
                    let seeds: Vec<String> = slice_clouds
                        .iter()
                        .filter(|c| c.seed_present)
                        .map(|c| c.seed.clone())
                        .collect();
                    let nodes = node_list(cloud, &seeds, |term| {
                        slice_clouds.iter().any(|c| c.contains(term))
                    });
                    let graph = connect(nodes, links, |link| link.to_slice == *slice);
                    Some((slice.clone(), graph))
                })
                .collect(),
        }
    }
}

/// Aggregated terms passing `active`, then seeds not already present.
fn node_list(
    cloud: &AggregatedCloud,
    seeds: &[String],
    active: impl Fn(&str) -> bool,
) -> Vec<GraphNode> {
    let mut nodes: Vec<GraphNode> = cloud
        .terms
        .iter()
        .filter(|t| active(&t.term))
        .map(|t| GraphNode {
            id: t.term.clone(),
            score: t.score,
            is_seed: seeds.contains(&t.term),
        })
        .collect();

    for seed in seeds {
        if !nodes.iter().any(|n| &n.id == seed) {
            nodes.push(GraphNode {
                id: seed.clone(),
                score: 0.0,
                is_seed: true,
            });
        }
    }
    nodes
}

/// Attach the links selected by `select` whose ends are both nodes.
///
/// Repeated links between the same pair keep the strongest weight.
fn connect(nodes: Vec<GraphNode>, links: &[Link], select: impl Fn(&Link) -> bool) -> Graph {
    let mut edges: Vec<GraphEdge> = Vec::new();
    let mut positions: HashMap<(&str, &str), usize> = HashMap::new();

    let has = |id: &str| nodes.iter().any(|n| n.id == id);

    for link in links.iter().filter(|l| select(l)) {
        if link.from_term == link.to_term || !has(&link.from_term) || !has(&link.to_term) {
            continue;
        }
        let key = (link.from_term.as_str(), link.to_term.as_str());
        match positions.get(&key) {
            Some(&i) => edges[i].weight = edges[i].weight.max(link.weight),
            None => {
                positions.insert(key, edges.len());
                edges.push(GraphEdge {
                    source: link.from_term.clone(),
                    target: link.to_term.clone(),
                    weight: link.weight,
                });
            }
        }
    }

    Graph { nodes, edges }
}
