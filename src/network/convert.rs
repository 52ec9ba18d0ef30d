//! Conversion of the supported graph representations into the weighted
//! network every community algorithm runs on.
//!
//! Node ids are mapped to dense indices in input order: petgraph index order
//! for petgraph graphs, first appearance for edge lists. Parallel edges are
//! merged into one undirected edge; direction is dropped for directed input.

use crate::network::Network;
use crate::utils::NodeLabel;
use anyhow::{anyhow, bail};
use nalgebra_sparse::CsrMatrix;
use num_traits::ToPrimitive;
use petgraph::graph::{DiGraph, NodeIndex, UnGraph};
use petgraph::graphmap::{NodeTrait, UnGraphMap};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// How edge payloads turn into edge weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeWeighting {
    /// The edge payload, converted to `f64`. Parallel edges are summed.
    #[default]
    Weighted,
    /// Every edge weighs 1.0. Parallel edges collapse into a single edge.
    Unweighted,
}

impl EdgeWeighting {
    pub fn from_flag(weighted: bool) -> Self {
        if weighted {
            EdgeWeighting::Weighted
        } else {
            EdgeWeighting::Unweighted
        }
    }

    pub fn is_weighted(&self) -> bool {
        matches!(self, EdgeWeighting::Weighted)
    }
}

/// Undirected weighted network together with the node ids it was built from.
#[derive(Debug, Clone)]
pub struct LabeledNetwork<L> {
    network: Network<f64, f64>,
    labels: Vec<L>,
    index: HashMap<L, usize>,
}

impl<L: NodeLabel> LabeledNetwork<L> {
    pub fn network(&self) -> &Network<f64, f64> {
        &self.network
    }

    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    pub fn label(&self, node: usize) -> &L {
        &self.labels[node]
    }

    pub fn index_of(&self, label: &L) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn contains(&self, label: &L) -> bool {
        self.index.contains_key(label)
    }

    pub fn node_count(&self) -> usize {
        self.network.nodes()
    }

    pub fn edge_count(&self) -> usize {
        self.network.edges()
    }

    pub fn total_edge_weight(&self) -> f64 {
        self.network.get_total_edge_weight()
    }

    /// Neighbors of a node with the connecting edge weight, `None` for an
    /// unknown id.
    pub fn neighbors(&self, label: &L) -> Option<Vec<(&L, f64)>> {
        let node = self.index_of(label)?;
        Some(
            self.network
                .neighbors(node)
                .map(|(neighbor, weight)| (&self.labels[neighbor], weight))
                .collect(),
        )
    }

    /// Maps dense node groups back to node ids. Members are sorted.
    pub fn groups_to_labels(&self, groups: Vec<Vec<usize>>) -> Vec<Vec<L>> {
        groups
            .into_iter()
            .map(|group| {
                let mut members: Vec<L> =
                    group.into_iter().map(|node| self.labels[node].clone()).collect();
                members.sort();
                members
            })
            .collect()
    }

    /// Copy of the network as a petgraph graph with node ids as node weights.
    pub fn to_petgraph(&self) -> UnGraph<L, f64> {
        self.network
            .graph
            .map(|idx, _| self.labels[idx.index()].clone(), |_, w| *w)
    }

    fn with_unit_weights(&self) -> Self {
        let mut builder = NetworkBuilder::new(EdgeWeighting::Unweighted);
        for label in &self.labels {
            builder.add_node(label.clone());
        }
        for edge in self.network.graph.edge_references() {
            // unit weights cannot fail validation
            let _ = builder.add_edge(
                self.labels[edge.source().index()].clone(),
                self.labels[edge.target().index()].clone(),
                1.0,
            );
        }
        builder.build()
    }
}

/// Anything a community algorithm accepts as its input graph.
pub trait IntoLabeledNetwork<L: NodeLabel> {
    fn into_labeled_network(self, weighting: EdgeWeighting)
        -> anyhow::Result<LabeledNetwork<L>>;
}

/// Collects nodes and edges, merging parallel edges.
pub(crate) struct NetworkBuilder<L> {
    weighting: EdgeWeighting,
    labels: Vec<L>,
    index: HashMap<L, usize>,
    edges: HashMap<(usize, usize), f64>,
    edge_order: Vec<(usize, usize)>,
}

impl<L: NodeLabel> NetworkBuilder<L> {
    pub(crate) fn new(weighting: EdgeWeighting) -> Self {
        NetworkBuilder {
            weighting,
            labels: Vec::new(),
            index: HashMap::new(),
            edges: HashMap::new(),
            edge_order: Vec::new(),
        }
    }

    pub(crate) fn add_node(&mut self, label: L) -> usize {
        if let Some(&idx) = self.index.get(&label) {
            return idx;
        }
        let idx = self.labels.len();
        self.index.insert(label.clone(), idx);
        self.labels.push(label);
        idx
    }

    pub(crate) fn add_edge(&mut self, source: L, target: L, weight: f64) -> anyhow::Result<()> {
        let weight = match self.weighting {
            EdgeWeighting::Weighted => weight,
            EdgeWeighting::Unweighted => 1.0,
        };
        if !weight.is_finite() || weight < 0.0 {
            bail!(
                "edge {:?} - {:?} has invalid weight {}; weights must be finite and non-negative",
                source,
                target,
                weight
            );
        }

        let s = self.add_node(source);
        let t = self.add_node(target);
        let key = if s <= t { (s, t) } else { (t, s) };

        match self.edges.get_mut(&key) {
            Some(existing) => {
                if self.weighting.is_weighted() {
                    *existing += weight;
                }
            }
            None => {
                self.edges.insert(key, weight);
                self.edge_order.push(key);
            }
        }
        Ok(())
    }

    pub(crate) fn build(self) -> LabeledNetwork<L> {
        let mut graph = UnGraph::with_capacity(self.labels.len(), self.edge_order.len());
        let mut strengths = vec![0.0; self.labels.len()];
        for key in &self.edge_order {
            let w = self.edges[key];
            strengths[key.0] += w;
            strengths[key.1] += w;
        }
        for strength in strengths {
            graph.add_node(strength);
        }
        for key in self.edge_order {
            let w = self.edges[&key];
            graph.add_edge(NodeIndex::new(key.0), NodeIndex::new(key.1), w);
        }

        LabeledNetwork {
            network: Network::new_from_graph(graph),
            labels: self.labels,
            index: self.index,
        }
    }
}

/// Edge payloads usable as weights. `()` edges weigh 1.0.
pub trait IntoEdgeWeight {
    fn to_edge_weight(&self) -> Option<f64>;
}

macro_rules! numeric_edge_weight {
    ($($t:ty),*) => {
        $(
            impl IntoEdgeWeight for $t {
                #[inline]
                fn to_edge_weight(&self) -> Option<f64> {
                    self.to_f64()
                }
            }
        )*
    };
}

numeric_edge_weight!(f32, f64, i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl IntoEdgeWeight for () {
    #[inline]
    fn to_edge_weight(&self) -> Option<f64> {
        Some(1.0)
    }
}

fn edge_weight<E: IntoEdgeWeight>(weight: &E) -> anyhow::Result<f64> {
    weight
        .to_edge_weight()
        .ok_or_else(|| anyhow!("edge weight cannot be represented as f64"))
}

impl<L: NodeLabel> IntoLabeledNetwork<L> for LabeledNetwork<L> {
    fn into_labeled_network(
        self,
        weighting: EdgeWeighting,
    ) -> anyhow::Result<LabeledNetwork<L>> {
        Ok(match weighting {
            EdgeWeighting::Weighted => self,
            EdgeWeighting::Unweighted => self.with_unit_weights(),
        })
    }
}

impl<L: NodeLabel> IntoLabeledNetwork<L> for &LabeledNetwork<L> {
    fn into_labeled_network(
        self,
        weighting: EdgeWeighting,
    ) -> anyhow::Result<LabeledNetwork<L>> {
        Ok(match weighting {
            EdgeWeighting::Weighted => self.clone(),
            EdgeWeighting::Unweighted => self.with_unit_weights(),
        })
    }
}

impl<L: NodeLabel, E: IntoEdgeWeight> IntoLabeledNetwork<L> for &UnGraph<L, E> {
    fn into_labeled_network(
        self,
        weighting: EdgeWeighting,
    ) -> anyhow::Result<LabeledNetwork<L>> {
        let mut builder = NetworkBuilder::new(weighting);
        for idx in self.node_indices() {
            builder.add_node(self[idx].clone());
        }
        if builder.labels.len() != self.node_count() {
            bail!("graph contains duplicate node ids");
        }
        for edge in self.edge_references() {
            builder.add_edge(
                self[edge.source()].clone(),
                self[edge.target()].clone(),
                edge_weight(edge.weight())?,
            )?;
        }
        Ok(builder.build())
    }
}

impl<L: NodeLabel, E: IntoEdgeWeight> IntoLabeledNetwork<L> for &DiGraph<L, E> {
    fn into_labeled_network(
        self,
        weighting: EdgeWeighting,
    ) -> anyhow::Result<LabeledNetwork<L>> {
        let mut builder = NetworkBuilder::new(weighting);
        for idx in self.node_indices() {
            builder.add_node(self[idx].clone());
        }
        if builder.labels.len() != self.node_count() {
            bail!("graph contains duplicate node ids");
        }
        for edge in self.edge_references() {
            builder.add_edge(
                self[edge.source()].clone(),
                self[edge.target()].clone(),
                edge_weight(edge.weight())?,
            )?;
        }
        Ok(builder.build())
    }
}

impl<L, E> IntoLabeledNetwork<L> for &UnGraphMap<L, E>
where
    L: NodeLabel + NodeTrait,
    E: IntoEdgeWeight,
{
    fn into_labeled_network(
        self,
        weighting: EdgeWeighting,
    ) -> anyhow::Result<LabeledNetwork<L>> {
        let mut builder = NetworkBuilder::new(weighting);
        for node in self.nodes() {
            builder.add_node(node);
        }
        for (a, b, w) in self.all_edges() {
            builder.add_edge(a, b, edge_weight(w)?)?;
        }
        Ok(builder.build())
    }
}

impl<L: NodeLabel> IntoLabeledNetwork<L> for &[(L, L)] {
    fn into_labeled_network(
        self,
        weighting: EdgeWeighting,
    ) -> anyhow::Result<LabeledNetwork<L>> {
        let mut builder = NetworkBuilder::new(weighting);
        for (a, b) in self {
            builder.add_edge(a.clone(), b.clone(), 1.0)?;
        }
        Ok(builder.build())
    }
}

impl<L: NodeLabel> IntoLabeledNetwork<L> for &[(L, L, f64)] {
    fn into_labeled_network(
        self,
        weighting: EdgeWeighting,
    ) -> anyhow::Result<LabeledNetwork<L>> {
        let mut builder = NetworkBuilder::new(weighting);
        for (a, b, w) in self {
            builder.add_edge(a.clone(), b.clone(), *w)?;
        }
        Ok(builder.build())
    }
}

impl<L: NodeLabel> IntoLabeledNetwork<L> for Vec<(L, L)> {
    fn into_labeled_network(
        self,
        weighting: EdgeWeighting,
    ) -> anyhow::Result<LabeledNetwork<L>> {
        self.as_slice().into_labeled_network(weighting)
    }
}

impl<L: NodeLabel> IntoLabeledNetwork<L> for Vec<(L, L, f64)> {
    fn into_labeled_network(
        self,
        weighting: EdgeWeighting,
    ) -> anyhow::Result<LabeledNetwork<L>> {
        self.as_slice().into_labeled_network(weighting)
    }
}

/// Symmetric adjacency matrix; node ids are the row indices. Only the upper
/// triangle (diagonal included) is read.
impl IntoLabeledNetwork<usize> for &CsrMatrix<f64> {
    fn into_labeled_network(
        self,
        weighting: EdgeWeighting,
    ) -> anyhow::Result<LabeledNetwork<usize>> {
        if self.nrows() != self.ncols() {
            bail!(
                "adjacency matrix must be square, got {}x{}",
                self.nrows(),
                self.ncols()
            );
        }

        let mut builder = NetworkBuilder::new(weighting);
        for node in 0..self.nrows() {
            builder.add_node(node);
        }
        for (row, col, &weight) in self.triplet_iter() {
            if row <= col && weight != 0.0 {
                builder.add_edge(row, col, weight)?;
            }
        }
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra_sparse::CooMatrix;

    #[test]
    fn test_edge_list_merges_parallel_edges() {
        let edges = vec![("a", "b", 1.0), ("b", "a", 2.0), ("b", "c", 1.5)];
        let net = edges.into_labeled_network(EdgeWeighting::Weighted).unwrap();

        assert_eq!(net.node_count(), 3);
        assert_eq!(net.edge_count(), 2);
        assert_relative_eq!(net.total_edge_weight(), 4.5);
        assert_eq!(net.labels(), &["a", "b", "c"]);
        // strength of "b" = 3.0 + 1.5
        assert_relative_eq!(net.network().weight(1), 4.5);
    }

    #[test]
    fn test_unweighted_collapses_parallel_edges() {
        let edges = vec![("a", "b", 3.0), ("a", "b", 2.0)];
        let net = edges
            .into_labeled_network(EdgeWeighting::Unweighted)
            .unwrap();
        assert_eq!(net.edge_count(), 1);
        assert_relative_eq!(net.total_edge_weight(), 1.0);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let edges = vec![(1u32, 2u32, -1.0)];
        assert!(edges.into_labeled_network(EdgeWeighting::Weighted).is_err());
    }

    #[test]
    fn test_petgraph_keeps_isolated_nodes() {
        let mut graph: UnGraph<String, u32> = UnGraph::new_undirected();
        let a = graph.add_node("a".to_string());
        let b = graph.add_node("b".to_string());
        graph.add_node("lonely".to_string());
        graph.add_edge(a, b, 4);

        let net = (&graph)
            .into_labeled_network(EdgeWeighting::Weighted)
            .unwrap();
        assert_eq!(net.node_count(), 3);
        assert_eq!(net.index_of(&"lonely".to_string()), Some(2));
        assert_relative_eq!(net.total_edge_weight(), 4.0);
        assert_eq!(net.neighbors(&"lonely".to_string()).unwrap().len(), 0);
    }

    #[test]
    fn test_digraph_drops_direction() {
        let mut graph: DiGraph<u32, f64> = DiGraph::new();
        let a = graph.add_node(10);
        let b = graph.add_node(20);
        graph.add_edge(a, b, 1.0);
        graph.add_edge(b, a, 1.0);

        let net = (&graph)
            .into_labeled_network(EdgeWeighting::Weighted)
            .unwrap();
        assert_eq!(net.edge_count(), 1);
        assert_relative_eq!(net.total_edge_weight(), 2.0);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut graph: UnGraph<u32, f64> = UnGraph::new_undirected();
        graph.add_node(1);
        graph.add_node(1);
        assert!((&graph)
            .into_labeled_network(EdgeWeighting::Weighted)
            .is_err());
    }

    #[test]
    fn test_unit_edge_payload() {
        let mut graph: UnGraph<&'static str, ()> = UnGraph::new_undirected();
        let a = graph.add_node("a");
        let b = graph.add_node("b");
        graph.add_edge(a, b, ());
        let net = (&graph)
            .into_labeled_network(EdgeWeighting::Weighted)
            .unwrap();
        assert_relative_eq!(net.total_edge_weight(), 1.0);
    }

    #[test]
    fn test_graphmap() {
        let mut graph: UnGraphMap<u32, f64> = UnGraphMap::new();
        graph.add_edge(1, 2, 0.5);
        graph.add_edge(2, 3, 0.5);
        let net = (&graph)
            .into_labeled_network(EdgeWeighting::Weighted)
            .unwrap();
        assert_eq!(net.node_count(), 3);
        assert_relative_eq!(net.total_edge_weight(), 1.0);
    }

    #[test]
    fn test_csr_matrix() {
        let mut coo = CooMatrix::new(3, 3);
        coo.push(0, 1, 1.0);
        coo.push(1, 0, 1.0);
        coo.push(1, 2, 2.0);
        coo.push(2, 1, 2.0);
        let csr = CsrMatrix::from(&coo);

        let net = (&csr).into_labeled_network(EdgeWeighting::Weighted).unwrap();
        assert_eq!(net.node_count(), 3);
        assert_eq!(net.edge_count(), 2);
        assert_relative_eq!(net.total_edge_weight(), 3.0);

        let rect = CsrMatrix::<f64>::zeros(2, 3);
        assert!((&rect).into_labeled_network(EdgeWeighting::Weighted).is_err());
    }

    #[test]
    fn test_to_petgraph_roundtrip_labels() {
        let net = vec![("x", "y")]
            .into_labeled_network(EdgeWeighting::Weighted)
            .unwrap();
        let graph = net.to_petgraph();
        assert_eq!(graph[NodeIndex::new(0)], "x");
        assert_eq!(graph.edge_count(), 1);
    }
}
