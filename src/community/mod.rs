//! The node clustering result type and the community detection entry points
//! that produce it.

use crate::evaluation::{self, MatchingResult};
use crate::network::LabeledNetwork;
use crate::utils::NodeLabel;
use anyhow::bail;
use petgraph::visit::EdgeRef;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

mod algorithms;

pub use algorithms::{
    cpm, greedy_modularity, label_propagation, leiden, louvain, rb_pots, rber_pots,
    significance_communities, surprise_communities, GreedyModularityParams,
    LabelPropagationParams, LeidenParams, LouvainParams,
};

/// Communities found on a graph, with the graph and the method that found
/// them.
///
/// Members of every community are sorted and unique; empty communities are
/// dropped. The value is immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct NodeClustering<L> {
    communities: Vec<Vec<L>>,
    #[serde(skip)]
    graph: Option<Arc<LabeledNetwork<L>>>,
    #[serde(rename = "algorithm")]
    method_name: String,
    #[serde(rename = "params")]
    method_parameters: BTreeMap<String, Value>,
    overlap: bool,
    #[serde(rename = "coverage")]
    node_coverage: f64,
}

impl<L: NodeLabel> NodeClustering<L> {
    /// Fails when a community names a node the graph does not have.
    pub fn new(
        communities: Vec<Vec<L>>,
        graph: Option<Arc<LabeledNetwork<L>>>,
        method_name: impl Into<String>,
        method_parameters: BTreeMap<String, Value>,
    ) -> anyhow::Result<Self> {
        let communities: Vec<Vec<L>> = communities
            .into_iter()
            .map(|mut members| {
                members.sort();
                members.dedup();
                members
            })
            .filter(|members| !members.is_empty())
            .collect();

        if let Some(graph) = &graph {
            for members in &communities {
                if let Some(unknown) = members.iter().find(|node| !graph.contains(node)) {
                    bail!("node {:?} of a community is not part of the graph", unknown);
                }
            }
        }

        let mut seen = HashSet::new();
        let mut overlap = false;
        for node in communities.iter().flatten() {
            if !seen.insert(node) {
                overlap = true;
            }
        }
        let node_coverage = match &graph {
            Some(graph) if graph.node_count() > 0 => seen.len() as f64 / graph.node_count() as f64,
            _ => 1.0,
        };

        Ok(NodeClustering {
            communities,
            graph,
            method_name: method_name.into(),
            method_parameters,
            overlap,
            node_coverage,
        })
    }

    /// Clustering without a graph, e.g. a ground truth to compare against.
    pub fn from_communities(communities: Vec<Vec<L>>) -> Self {
        let mut clustering = NodeClustering {
            communities: Vec::new(),
            graph: None,
            method_name: "Custom".to_string(),
            method_parameters: BTreeMap::new(),
            overlap: false,
            node_coverage: 1.0,
        };
        let mut seen = HashSet::new();
        for mut members in communities {
            members.sort();
            members.dedup();
            if members.is_empty() {
                continue;
            }
            clustering.overlap |= members.iter().any(|node| !seen.insert(node.clone()));
            clustering.communities.push(members);
        }
        clustering
    }

    pub fn communities(&self) -> &[Vec<L>] {
        &self.communities
    }

    pub fn graph(&self) -> Option<&LabeledNetwork<L>> {
        self.graph.as_deref()
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn method_parameters(&self) -> &BTreeMap<String, Value> {
        &self.method_parameters
    }

    pub fn overlap(&self) -> bool {
        self.overlap
    }

    /// Fraction of graph nodes in at least one community.
    pub fn node_coverage(&self) -> f64 {
        self.node_coverage
    }

    pub fn len(&self) -> usize {
        self.communities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.communities.is_empty()
    }

    /// Community indices of every clustered node.
    pub fn to_node_community_map(&self) -> HashMap<L, Vec<usize>> {
        let mut map: HashMap<L, Vec<usize>> = HashMap::new();
        for (c, members) in self.communities.iter().enumerate() {
            for node in members {
                map.entry(node.clone()).or_default().push(c);
            }
        }
        map
    }

    /// `Σ_c (l_c / m - (d_c / 2m)²)` over the attached graph, with `l_c` the
    /// edge weight inside `c` and `d_c` its total strength. Nodes outside
    /// every community contribute nothing.
    pub fn newman_girvan_modularity(&self) -> anyhow::Result<f64> {
        let Some(graph) = self.graph() else {
            bail!("modularity needs the clustering's graph");
        };
        if self.overlap {
            bail!("modularity is defined for non-overlapping communities only");
        }
        let m = graph.total_edge_weight();
        if m <= 0.0 {
            bail!("modularity is undefined for a graph without edges");
        }

        let mut community_of = vec![None; graph.node_count()];
        for (c, members) in self.communities.iter().enumerate() {
            for node in members {
                if let Some(idx) = graph.index_of(node) {
                    community_of[idx] = Some(c);
                }
            }
        }

        let mut internal = vec![0.0; self.communities.len()];
        let mut degree = vec![0.0; self.communities.len()];
        for edge in graph.network().graph.edge_references() {
            let w = *edge.weight();
            let s = community_of[edge.source().index()];
            let t = community_of[edge.target().index()];
            if let Some(cs) = s {
                degree[cs] += w;
            }
            if let Some(ct) = t {
                degree[ct] += w;
            }
            match (s, t) {
                (Some(cs), Some(ct)) if cs == ct => internal[cs] += w,
                _ => {}
            }
        }

        Ok(internal
            .iter()
            .zip(&degree)
            .map(|(l, d)| l / m - (d / (2.0 * m)).powi(2))
            .sum())
    }

    pub fn normalized_mutual_information(&self, other: &Self) -> anyhow::Result<f64> {
        evaluation::normalized_mutual_information(self, other)
    }

    pub fn adjusted_mutual_information(&self, other: &Self) -> anyhow::Result<f64> {
        evaluation::adjusted_mutual_information(self, other)
    }

    pub fn adjusted_rand_index(&self, other: &Self) -> anyhow::Result<f64> {
        evaluation::adjusted_rand_index(self, other)
    }

    pub fn variation_of_information(&self, other: &Self) -> anyhow::Result<f64> {
        evaluation::variation_of_information(self, other)
    }

    pub fn overlapping_normalized_mutual_information_lfk(&self, other: &Self) -> anyhow::Result<f64> {
        evaluation::overlapping_normalized_mutual_information_lfk(self, other)
    }

    pub fn overlapping_normalized_mutual_information_mgh(&self, other: &Self) -> anyhow::Result<f64> {
        evaluation::overlapping_normalized_mutual_information_mgh(self, other)
    }

    pub fn omega(&self, other: &Self) -> anyhow::Result<f64> {
        evaluation::omega(self, other)
    }

    /// `self` is scored as the prediction, `other` as the ground truth.
    pub fn f1(&self, other: &Self) -> anyhow::Result<MatchingResult> {
        evaluation::f1(self, other)
    }

    pub fn nf1(&self, other: &Self) -> anyhow::Result<f64> {
        evaluation::nf1(self, other)
    }
}

impl<L: NodeLabel + Serialize> NodeClustering<L> {
    /// JSON with the communities, the method and its parameters. The graph
    /// is not included.
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
