// Clauset, A., Newman, M. E. J., & Moore, C. (2004).
// Finding community structure in very large networks.
// Physical Review E, 70(6), 066111. 10.1103/PhysRevE.70.066111
use crate::network::Network;
use ahash::AHashMap;
use log::debug;
use petgraph::visit::EdgeRef;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Candidate merge of communities `a < b`. Entries go stale when either
/// community is merged away or the pair's gain changes; stale entries are
/// dropped when popped.
#[derive(Debug, Clone, Copy)]
struct MergeCandidate {
    gain: f64,
    a: usize,
    b: usize,
}

impl PartialEq for MergeCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeCandidate {}

impl PartialOrd for MergeCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeCandidate {
    // max-heap on gain, lower ids first on ties
    fn cmp(&self, other: &Self) -> Ordering {
        self.gain
            .total_cmp(&other.gain)
            .then_with(|| other.a.cmp(&self.a))
            .then_with(|| other.b.cmp(&self.b))
    }
}

/// Greedy modularity agglomeration (CNM).
///
/// Starts from singletons and keeps merging the pair of connected
/// communities with the largest modularity gain while that gain is positive.
#[derive(Debug, Clone)]
pub struct GreedyModularity {
    resolution: f64,
}

impl Default for GreedyModularity {
    fn default() -> Self {
        GreedyModularity { resolution: 1.0 }
    }
}

impl GreedyModularity {
    pub fn new(resolution: f64) -> Self {
        GreedyModularity { resolution }
    }

    /// Communities as sorted node lists, largest community first.
    pub fn run(&self, network: &Network<f64, f64>) -> Vec<Vec<usize>> {
        let n = network.nodes();
        let mut members: Vec<Vec<usize>> = (0..n).map(|node| vec![node]).collect();
        let m = network.get_total_edge_weight();
        if m <= 0.0 {
            return members;
        }

        let mut strengths = Vec::with_capacity(n);
        network.get_total_edge_weight_per_node(&mut strengths);
        let mut a: Vec<f64> = strengths.iter().map(|k| k / (2.0 * m)).collect();

        let mut edge_weights: AHashMap<(usize, usize), f64> = AHashMap::new();
        for edge in network.graph.edge_references() {
            let (s, t) = (edge.source().index(), edge.target().index());
            if s != t {
                *edge_weights.entry((s.min(t), s.max(t))).or_insert(0.0) += *edge.weight();
            }
        }

        let mut gains: Vec<AHashMap<usize, f64>> = vec![AHashMap::new(); n];
        let mut heap = BinaryHeap::with_capacity(edge_weights.len());
        for (&(i, j), &w) in &edge_weights {
            let gain = w / m - 2.0 * self.resolution * a[i] * a[j];
            gains[i].insert(j, gain);
            gains[j].insert(i, gain);
            heap.push(MergeCandidate { gain, a: i, b: j });
        }

        let mut merges = 0;
        let mut modularity_gain = 0.0;
        while let Some(candidate) = heap.pop() {
            let MergeCandidate { gain, a: i, b: j } = candidate;
            if gains[i].get(&j) != Some(&gain) {
                continue;
            }
            if gain <= 0.0 {
                break;
            }

            // fold the community with fewer neighbours into the other one
            let (from, into) = if gains[i].len() <= gains[j].len() {
                (i, j)
            } else {
                (j, i)
            };

            let from_gains = std::mem::take(&mut gains[from]);
            gains[into].remove(&from);

            let mut neighbors: Vec<usize> = from_gains
                .keys()
                .chain(gains[into].keys())
                .copied()
                .filter(|&k| k != from && k != into)
                .collect();
            neighbors.sort_unstable();
            neighbors.dedup();

            for k in neighbors {
                let updated = match (from_gains.get(&k), gains[into].get(&k)) {
                    (Some(&g_from), Some(&g_into)) => g_from + g_into,
                    (Some(&g_from), None) => g_from - 2.0 * self.resolution * a[into] * a[k],
                    (None, Some(&g_into)) => g_into - 2.0 * self.resolution * a[from] * a[k],
                    (None, None) => continue,
                };
                gains[k].remove(&from);
                gains[k].insert(into, updated);
                gains[into].insert(k, updated);
                heap.push(MergeCandidate {
                    gain: updated,
                    a: into.min(k),
                    b: into.max(k),
                });
            }

            a[into] += a[from];
            a[from] = 0.0;
            let moved = std::mem::take(&mut members[from]);
            members[into].extend(moved);

            merges += 1;
            modularity_gain += gain;
        }

        debug!(
            "Greedy modularity: {} merges on {} nodes, modularity gain {:.6}",
            merges, n, modularity_gain
        );

        let mut communities: Vec<Vec<usize>> = members
            .into_iter()
            .filter(|group| !group.is_empty())
            .map(|mut group| {
                group.sort_unstable();
                group
            })
            .collect();
        communities.sort_by(|x, y| y.len().cmp(&x.len()).then_with(|| x[0].cmp(&y[0])));
        communities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::clustering::{NetworkGrouping, VectorGrouping};
    use crate::network::{EdgeWeighting, IntoLabeledNetwork};
    use crate::quality::modularity;
    use crate::test_utils::{karate_club_edges, ring_of_cliques};

    fn to_grouping(communities: &[Vec<usize>], n: usize) -> VectorGrouping {
        let mut assignments = vec![0; n];
        for (c, members) in communities.iter().enumerate() {
            for &node in members {
                assignments[node] = c;
            }
        }
        VectorGrouping::from_assignments(&assignments)
    }

    #[test]
    fn test_ring_of_cliques() {
        let labeled = ring_of_cliques(5, 4)
            .into_labeled_network(EdgeWeighting::Weighted)
            .unwrap();
        let communities = GreedyModularity::default().run(labeled.network());

        assert_eq!(communities.len(), 5);
        for members in &communities {
            assert_eq!(members.len(), 4);
            assert_eq!(members[0] % 4, 0);
            assert_eq!(members[3], members[0] + 3);
        }
    }

    #[test]
    fn test_karate_modularity() {
        let labeled = karate_club_edges()
            .into_labeled_network(EdgeWeighting::Unweighted)
            .unwrap();
        let communities = GreedyModularity::default().run(labeled.network());
        let grouping = to_grouping(&communities, labeled.node_count());
        let q = modularity(labeled.network(), &grouping, 1.0).unwrap();

        // CNM reaches ~0.3807 on this graph
        assert!(q > 0.35, "modularity {} too low", q);
        assert!(communities.len() >= 2);
        for pair in communities.windows(2) {
            assert!(pair[0].len() >= pair[1].len());
        }
        let covered: usize = communities.iter().map(Vec::len).sum();
        assert_eq!(covered, 34);
    }

    #[test]
    fn test_high_resolution_keeps_singletons() {
        let labeled = ring_of_cliques(3, 3)
            .into_labeled_network(EdgeWeighting::Weighted)
            .unwrap();
        let communities = GreedyModularity::new(100.0).run(labeled.network());
        assert_eq!(communities.len(), 9);
    }

    #[test]
    fn test_edgeless_network() {
        let mut graph = petgraph::graph::UnGraph::new_undirected();
        for _ in 0..3 {
            graph.add_node(0.0);
        }
        let network = Network::new_from_graph(graph);
        assert_eq!(GreedyModularity::default().run(&network).len(), 3);
    }
}
