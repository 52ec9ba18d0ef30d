//! Partition quality functions and the community bookkeeping they share.
//!
//! Every function is evaluated on a [`WeightedGraph`] (adjacency without
//! self-loops, plus per-node self-loop weight, strength and size) and a
//! [`PartitionState`] holding per-community aggregates. Moves are scored
//! with [`QualityFunction::diff_move`] without touching the state.

use crate::network::clustering::{NetworkGrouping, VectorGrouping};
use crate::network::Network;
use anyhow::bail;
use petgraph::visit::EdgeRef;

mod functions;

pub use functions::{Cpm, Modularity, RbConfiguration, Rber, Significance, Surprise};

/// Aggregates of one community.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CommunityStats {
    /// Sum of node sizes
    pub size: f64,
    /// Sum of node strengths
    pub strength: f64,
    /// Weight of the edges with both ends inside, self-loops included
    pub internal_weight: f64,
}

impl CommunityStats {
    /// Number of node pairs the community could hold.
    pub fn possible_pairs(&self) -> f64 {
        pairs(self.size)
    }
}

#[inline]
pub(crate) fn pairs(size: f64) -> f64 {
    if size < 1.0 {
        0.0
    } else {
        size * (size - 1.0) / 2.0
    }
}

/// Graph view used by the quality functions and the Leiden optimizer.
#[derive(Debug, Clone)]
pub struct WeightedGraph {
    adjacency: Vec<Vec<(usize, f64)>>,
    self_loops: Vec<f64>,
    strengths: Vec<f64>,
    sizes: Vec<f64>,
    total_weight: f64,
    total_size: f64,
}

impl WeightedGraph {
    /// `sizes` defaults to 1.0 per node.
    pub fn from_network(network: &Network<f64, f64>, sizes: Option<&[f64]>) -> anyhow::Result<Self> {
        let n = network.nodes();
        let sizes = match sizes {
            Some(sizes) if sizes.len() != n => {
                bail!("got {} node sizes for a network with {} nodes", sizes.len(), n)
            }
            Some(sizes) => sizes.to_vec(),
            None => vec![1.0; n],
        };

        let mut adjacency = vec![Vec::new(); n];
        let mut self_loops = vec![0.0; n];
        for edge in network.graph.edge_references() {
            let (s, t, w) = (edge.source().index(), edge.target().index(), *edge.weight());
            if s == t {
                self_loops[s] += w;
            } else {
                adjacency[s].push((t, w));
                adjacency[t].push((s, w));
            }
        }

        let mut strengths = Vec::with_capacity(n);
        network.get_total_edge_weight_per_node(&mut strengths);
        let total_size = sizes.iter().sum();

        Ok(WeightedGraph {
            adjacency,
            self_loops,
            strengths,
            sizes,
            total_weight: network.get_total_edge_weight(),
            total_size,
        })
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn neighbors(&self, node: usize) -> &[(usize, f64)] {
        &self.adjacency[node]
    }

    pub fn self_loop(&self, node: usize) -> f64 {
        self.self_loops[node]
    }

    pub fn strength(&self, node: usize) -> f64 {
        self.strengths[node]
    }

    pub fn size(&self, node: usize) -> f64 {
        self.sizes[node]
    }

    pub fn sizes(&self) -> &[f64] {
        &self.sizes
    }

    /// Total edge weight `m`, every edge counted once.
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    pub fn total_size(&self) -> f64 {
        self.total_size
    }

    /// Density `m / (n (n - 1) / 2)` over the node sizes.
    pub fn density(&self) -> f64 {
        let possible = pairs(self.total_size);
        if possible > 0.0 {
            self.total_weight / possible
        } else {
            0.0
        }
    }
}

/// Community membership with the aggregates the quality functions need.
/// Community ids are bounded by the node count.
#[derive(Debug, Clone)]
pub struct PartitionState {
    membership: Vec<usize>,
    stats: Vec<CommunityStats>,
    node_counts: Vec<usize>,
    empty: Vec<usize>,
    total_internal_weight: f64,
    total_possible_pairs: f64,
}

impl PartitionState {
    pub fn singletons(graph: &WeightedGraph) -> Self {
        let membership: Vec<usize> = (0..graph.node_count()).collect();
        Self::build(graph, membership)
    }

    pub fn from_membership(graph: &WeightedGraph, membership: &[usize]) -> anyhow::Result<Self> {
        if membership.len() != graph.node_count() {
            bail!(
                "membership has {} entries for a graph with {} nodes",
                membership.len(),
                graph.node_count()
            );
        }
        let normalized = VectorGrouping::from_assignments(membership).into_assignments();
        Ok(Self::build(graph, normalized))
    }

    fn build(graph: &WeightedGraph, membership: Vec<usize>) -> Self {
        let n = graph.node_count();
        let mut stats = vec![CommunityStats::default(); n];
        let mut node_counts = vec![0; n];

        for node in 0..n {
            let c = membership[node];
            stats[c].size += graph.size(node);
            stats[c].strength += graph.strength(node);
            stats[c].internal_weight += graph.self_loop(node);
            node_counts[c] += 1;
            for &(neighbor, w) in graph.neighbors(node) {
                // each undirected edge is listed at both ends
                if neighbor > node && membership[neighbor] == c {
                    stats[c].internal_weight += w;
                }
            }
        }

        let empty = (0..n).rev().filter(|&c| node_counts[c] == 0).collect();
        let total_internal_weight = stats.iter().map(|s| s.internal_weight).sum();
        let total_possible_pairs = stats.iter().map(|s| s.possible_pairs()).sum();

        PartitionState {
            membership,
            stats,
            node_counts,
            empty,
            total_internal_weight,
            total_possible_pairs,
        }
    }

    pub fn membership(&self) -> &[usize] {
        &self.membership
    }

    pub fn community(&self, node: usize) -> usize {
        self.membership[node]
    }

    pub fn stats(&self, community: usize) -> &CommunityStats {
        &self.stats[community]
    }

    pub fn node_count_of(&self, community: usize) -> usize {
        self.node_counts[community]
    }

    /// Stats of all non-empty communities.
    pub fn communities(&self) -> impl Iterator<Item = &CommunityStats> + '_ {
        self.stats
            .iter()
            .zip(&self.node_counts)
            .filter(|(_, &count)| count > 0)
            .map(|(stats, _)| stats)
    }

    pub fn community_count(&self) -> usize {
        self.node_counts.iter().filter(|&&count| count > 0).count()
    }

    pub fn total_internal_weight(&self) -> f64 {
        self.total_internal_weight
    }

    pub fn total_possible_pairs(&self) -> f64 {
        self.total_possible_pairs
    }

    /// Some community without members, if any.
    pub fn empty_community(&mut self) -> Option<usize> {
        while let Some(&c) = self.empty.last() {
            if self.node_counts[c] == 0 {
                return Some(c);
            }
            self.empty.pop();
        }
        None
    }

    /// Stats of the source and target community before and after moving
    /// `node` to `to`. `weight_to_old` and `weight_to_new` are the edge
    /// weights from the node to the other members of the two communities.
    pub fn move_stats(
        &self,
        graph: &WeightedGraph,
        node: usize,
        to: usize,
        weight_to_old: f64,
        weight_to_new: f64,
    ) -> MoveStats {
        let from = self.membership[node];
        let old_before = self.stats[from];
        let new_before = self.stats[to];
        let (size, strength, self_loop) = (graph.size(node), graph.strength(node), graph.self_loop(node));

        MoveStats {
            old_before,
            old_after: CommunityStats {
                size: old_before.size - size,
                strength: old_before.strength - strength,
                internal_weight: old_before.internal_weight - weight_to_old - self_loop,
            },
            new_before,
            new_after: CommunityStats {
                size: new_before.size + size,
                strength: new_before.strength + strength,
                internal_weight: new_before.internal_weight + weight_to_new + self_loop,
            },
        }
    }

    pub fn move_node(
        &mut self,
        graph: &WeightedGraph,
        node: usize,
        to: usize,
        weight_to_old: f64,
        weight_to_new: f64,
    ) {
        let from = self.membership[node];
        if from == to {
            return;
        }
        let delta = self.move_stats(graph, node, to, weight_to_old, weight_to_new);

        self.total_internal_weight += delta.internal_weight_change();
        self.total_possible_pairs += delta.possible_pairs_change();

        self.stats[from] = delta.old_after;
        self.stats[to] = delta.new_after;
        self.node_counts[from] -= 1;
        self.node_counts[to] += 1;
        if self.node_counts[from] == 0 {
            self.empty.push(from);
        }
        self.membership[node] = to;
    }

    /// Membership with dense community ids.
    pub fn normalized_membership(&self) -> Vec<usize> {
        VectorGrouping::from_assignments(&self.membership).into_assignments()
    }
}

/// Community aggregates around a single node move.
#[derive(Debug, Clone, Copy)]
pub struct MoveStats {
    pub old_before: CommunityStats,
    pub old_after: CommunityStats,
    pub new_before: CommunityStats,
    pub new_after: CommunityStats,
}

impl MoveStats {
    pub fn internal_weight_change(&self) -> f64 {
        self.old_after.internal_weight + self.new_after.internal_weight
            - self.old_before.internal_weight
            - self.new_before.internal_weight
    }

    pub fn possible_pairs_change(&self) -> f64 {
        self.old_after.possible_pairs() + self.new_after.possible_pairs()
            - self.old_before.possible_pairs()
            - self.new_before.possible_pairs()
    }
}

/// A partition quality to maximise.
///
/// Functions that are a sum of per-community terms only implement
/// [`QualityFunction::community_term`]; the rest override both provided
/// methods.
pub trait QualityFunction: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn community_term(&self, _graph: &WeightedGraph, _stats: &CommunityStats) -> f64 {
        0.0
    }

    /// Divides the summed terms, e.g. `m` for modularity.
    fn scale(&self, _graph: &WeightedGraph) -> f64 {
        1.0
    }

    fn quality(&self, graph: &WeightedGraph, state: &PartitionState) -> f64 {
        let sum: f64 = state
            .communities()
            .map(|stats| self.community_term(graph, stats))
            .sum();
        sum / self.scale(graph)
    }

    /// Quality change of moving `node` into community `to`.
    fn diff_move(
        &self,
        graph: &WeightedGraph,
        state: &PartitionState,
        node: usize,
        to: usize,
        weight_to_old: f64,
        weight_to_new: f64,
    ) -> f64 {
        if state.community(node) == to {
            return 0.0;
        }
        let m = state.move_stats(graph, node, to, weight_to_old, weight_to_new);
        let diff = self.community_term(graph, &m.old_after) + self.community_term(graph, &m.new_after)
            - self.community_term(graph, &m.old_before)
            - self.community_term(graph, &m.new_before);
        diff / self.scale(graph)
    }
}

/// Newman-Girvan modularity (with resolution) of a grouping of `network`.
pub fn modularity<G: NetworkGrouping>(
    network: &Network<f64, f64>,
    grouping: &G,
    resolution: f64,
) -> anyhow::Result<f64> {
    if grouping.node_count() != network.nodes() {
        bail!(
            "grouping covers {} nodes, network has {}",
            grouping.node_count(),
            network.nodes()
        );
    }
    let graph = WeightedGraph::from_network(network, None)?;
    if graph.total_weight() <= 0.0 {
        bail!("modularity is undefined for a network without edge weight");
    }
    let membership: Vec<usize> = (0..grouping.node_count())
        .map(|node| grouping.get_group(node))
        .collect();
    let state = PartitionState::from_membership(&graph, &membership)?;
    Ok(Modularity::with_resolution(resolution).quality(&graph, &state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use petgraph::graph::UnGraph;

    pub(crate) fn two_triangles() -> Network<f64, f64> {
        let mut graph = UnGraph::new_undirected();
        let nodes: Vec<_> = (0..6).map(|_| graph.add_node(0.0)).collect();
        for &(a, b) in &[(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5), (2, 3)] {
            graph.add_edge(nodes[a], nodes[b], 1.0);
        }
        Network::new_from_graph(graph)
    }

    #[test]
    fn test_state_aggregates() {
        let graph = WeightedGraph::from_network(&two_triangles(), None).unwrap();
        let state = PartitionState::from_membership(&graph, &[0, 0, 0, 1, 1, 1]).unwrap();

        assert_eq!(state.community_count(), 2);
        let a = state.stats(0);
        assert_relative_eq!(a.size, 3.0);
        assert_relative_eq!(a.strength, 7.0);
        assert_relative_eq!(a.internal_weight, 3.0);
        assert_relative_eq!(state.total_internal_weight(), 6.0);
        assert_relative_eq!(state.total_possible_pairs(), 6.0);
    }

    #[test]
    fn test_move_node_keeps_aggregates_consistent() {
        let graph = WeightedGraph::from_network(&two_triangles(), None).unwrap();
        let mut state = PartitionState::from_membership(&graph, &[0, 0, 0, 1, 1, 1]).unwrap();

        // node 2 has weight 2 towards community 0 and 1 towards community 1
        state.move_node(&graph, 2, 1, 2.0, 1.0);
        let rebuilt = PartitionState::from_membership(&graph, state.membership()).unwrap();

        assert_relative_eq!(state.total_internal_weight(), rebuilt.total_internal_weight());
        assert_relative_eq!(state.total_possible_pairs(), rebuilt.total_possible_pairs());
        assert_relative_eq!(state.stats(1).internal_weight, 4.0);
        assert_relative_eq!(state.stats(0).internal_weight, 1.0);
    }

    #[test]
    fn test_empty_community_tracking() {
        let graph = WeightedGraph::from_network(&two_triangles(), None).unwrap();
        let mut state = PartitionState::from_membership(&graph, &[0, 0, 0, 0, 0, 0]).unwrap();
        let empty = state.empty_community().unwrap();
        assert_ne!(empty, 0);

        state.move_node(&graph, 5, empty, 2.0, 0.0);
        let next = state.empty_community().unwrap();
        assert_ne!(next, empty);
    }

    #[test]
    fn test_modularity_two_triangles() {
        let network = two_triangles();
        let grouping = VectorGrouping::from_assignments(&[0, 0, 0, 1, 1, 1]);
        // (3 - 49/28) / 7 per community
        let expected = 2.0 * (3.0 - 49.0 / 28.0) / 7.0;
        assert_relative_eq!(modularity(&network, &grouping, 1.0).unwrap(), expected, epsilon = 1e-12);

        let single = VectorGrouping::create_unified(6);
        assert_relative_eq!(modularity(&network, &single, 1.0).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_size_mismatch_rejected() {
        assert!(WeightedGraph::from_network(&two_triangles(), Some(&[1.0, 2.0])).is_err());
        let graph = WeightedGraph::from_network(&two_triangles(), None).unwrap();
        assert!(PartitionState::from_membership(&graph, &[0, 1]).is_err());
    }
}
