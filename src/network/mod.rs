// https://en.wikipedia.org/wiki/Louvain_method & https://github.com/graphext/louvain-rs/tree/master
// Copyright 2018 Juan Morales (crispamares@gmail.com)
// Repository: https://github.com/graphext/louvain-rs/tree/master
// Licensed under the MIT License.
use crate::network::clustering::NetworkGrouping;
use num_traits::{Float, FromPrimitive, ToPrimitive};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

pub mod clustering;
pub mod convert;

pub use convert::{EdgeWeighting, IntoEdgeWeight, IntoLabeledNetwork, LabeledNetwork};

// for now
pub type Graph<N, E> = UnGraph<N, E>;

/// Weighted undirected network. Node weights carry the node strength unless
/// a caller states otherwise, edge weights are the (merged) edge weights.
/// Self-loops are allowed and are how aggregated networks keep the weight
/// internal to a group.
#[derive(Debug, Clone)]
pub struct Network<N, E> {
    pub graph: Graph<N, E>,
}

pub struct NeighborAndWeightIterator<'a, N: 'a, E: 'a> {
    edge_iter: petgraph::graph::Edges<'a, E, petgraph::Undirected>,
    home_node: usize,
    _phantom: std::marker::PhantomData<&'a N>,
}

impl<'a, N, E> Iterator for NeighborAndWeightIterator<'a, N, E>
where
    E: Copy,
{
    type Item = (usize, E);

    fn next(&mut self) -> Option<Self::Item> {
        self.edge_iter.next().map(|edge_ref| {
            let neighbor = if edge_ref.source().index() == self.home_node {
                edge_ref.target().index()
            } else {
                edge_ref.source().index()
            };
            (neighbor, *edge_ref.weight())
        })
    }
}

impl<N, E> Network<N, E>
where
    N: Float + FromPrimitive + ToPrimitive + Send + Sync,
    E: Float + FromPrimitive + ToPrimitive + Send + Sync + std::iter::Sum,
{
    pub fn new_from_graph(graph: Graph<N, E>) -> Self {
        Network { graph }
    }

    pub fn nodes(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edges(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn weight(&self, node: usize) -> N {
        self.graph[NodeIndex::new(node)]
    }

    /// Neighbors of `node` with the connecting edge weight. Self-loops are
    /// reported with the node itself as neighbor.
    pub fn neighbors(&self, node: usize) -> NeighborAndWeightIterator<'_, N, E> {
        NeighborAndWeightIterator {
            edge_iter: self.graph.edges(NodeIndex::new(node)),
            home_node: node,
            _phantom: std::marker::PhantomData,
        }
    }

    pub fn get_total_edge_weight(&self) -> E {
        self.graph
            .edge_weights()
            .fold(E::zero(), |sum, edge| sum + *edge)
    }

    /// Strength of every node. A self-loop contributes twice its weight.
    pub fn get_total_edge_weight_per_node(&self, result: &mut Vec<E>) {
        result.clear();
        result.resize(self.nodes(), E::zero());
        for edge in self.graph.edge_references() {
            let w = *edge.weight();
            result[edge.source().index()] = result[edge.source().index()] + w;
            result[edge.target().index()] = result[edge.target().index()] + w;
        }
    }

    /// Summed weight of the self-loops at `node`.
    pub fn self_loop_weight(&self, node: usize) -> E {
        let idx = NodeIndex::new(node);
        self.graph
            .edges_connecting(idx, idx)
            .fold(E::zero(), |acc, edge| acc + *edge.weight())
    }

    /// Collapses every group into one node. Node weights are summed, edges
    /// between groups are merged and edges inside a group become a self-loop
    /// so that the total edge weight is preserved.
    pub fn create_reduced_network<T: NetworkGrouping>(&self, grouping: &T) -> Self {
        let mut cluster_g =
            Graph::with_capacity(grouping.group_count(), grouping.group_count() * 2);
        for _ in 0..grouping.group_count() {
            cluster_g.add_node(N::zero());
        }

        for node_idx in self.graph.node_indices() {
            let group_node = NodeIndex::new(grouping.get_group(node_idx.index()));
            cluster_g[group_node] = cluster_g[group_node] + self.graph[node_idx];
        }

        let mut edge_memo = HashMap::new();

        for edge in self.graph.edge_references() {
            let g1 = grouping.get_group(edge.source().index());
            let g2 = grouping.get_group(edge.target().index());

            let (min_g, max_g) = if g1 < g2 { (g1, g2) } else { (g2, g1) };
            let entry = edge_memo.entry((min_g, max_g)).or_insert(E::zero());
            *entry = *entry + *edge.weight();
        }

        let mut merged: Vec<_> = edge_memo.into_iter().collect();
        merged.sort_unstable_by_key(|&(key, _)| key);
        for ((g1, g2), weight) in merged {
            cluster_g.add_edge(NodeIndex::new(g1), NodeIndex::new(g2), weight);
        }
        Network { graph: cluster_g }
    }
}
