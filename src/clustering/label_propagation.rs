//! Asynchronous label propagation.
//!
//! Raghavan, U. N., Albert, R., & Kumara, S. (2007). Near linear time
//! algorithm to detect community structures in large-scale networks.
//! Physical Review E, 76(3), 036106.

use crate::network::clustering::{NetworkGrouping, VectorGrouping};
use crate::network::Network;
use ahash::AHashMap;
use log::debug;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Every node repeatedly adopts the label carrying the most edge weight
/// among its neighbours, visiting nodes in a fresh random order per sweep.
/// Ties are broken at random; a node already holding one of the best labels
/// keeps it, which makes the sweeps converge.
#[derive(Debug, Clone)]
pub struct LabelPropagation {
    max_iterations: usize,
    seed: u64,
}

impl Default for LabelPropagation {
    fn default() -> Self {
        LabelPropagation {
            max_iterations: 100,
            seed: 0,
        }
    }
}

impl LabelPropagation {
    pub fn new(seed: u64) -> Self {
        LabelPropagation {
            seed,
            ..Default::default()
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn run(&self, network: &Network<f64, f64>) -> VectorGrouping {
        let n = network.nodes();
        let mut labels: Vec<usize> = (0..n).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut order: Vec<usize> = (0..n).collect();
        let mut label_weights: AHashMap<usize, f64> = AHashMap::new();

        let mut sweeps = 0;
        while sweeps < self.max_iterations {
            sweeps += 1;
            let mut changed = false;
            order.shuffle(&mut rng);

            for &node in &order {
                label_weights.clear();
                for (neighbor, weight) in network.neighbors(node) {
                    if neighbor != node {
                        *label_weights.entry(labels[neighbor]).or_insert(0.0) += weight;
                    }
                }
                if label_weights.is_empty() {
                    continue;
                }

                let max_weight = label_weights.values().copied().fold(f64::MIN, f64::max);
                let mut best: Vec<usize> = label_weights
                    .iter()
                    .filter(|(_, &w)| w == max_weight)
                    .map(|(&label, _)| label)
                    .collect();

                if best.contains(&labels[node]) {
                    continue;
                }
                best.sort_unstable();
                if let Some(&label) = best.choose(&mut rng) {
                    labels[node] = label;
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }

        let grouping = VectorGrouping::from_assignments(&labels);
        debug!(
            "Label propagation: {} sweeps, {} communities on {} nodes",
            sweeps,
            grouping.group_count(),
            n
        );
        grouping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{EdgeWeighting, IntoLabeledNetwork};
    use crate::test_utils::{karate_club_edges, ring_of_cliques};

    #[test]
    fn test_disconnected_edges() {
        let labeled = vec![(0usize, 1usize), (2, 3)]
            .into_labeled_network(EdgeWeighting::Unweighted)
            .unwrap();
        let grouping = LabelPropagation::new(42).run(labeled.network());

        assert_eq!(grouping.get_group(0), grouping.get_group(1));
        assert_eq!(grouping.get_group(2), grouping.get_group(3));
        assert_ne!(grouping.get_group(0), grouping.get_group(2));
    }

    #[test]
    fn test_isolated_nodes_keep_their_label() {
        let mut graph = petgraph::graph::UnGraph::new_undirected();
        for _ in 0..3 {
            graph.add_node(0.0);
        }
        let network = Network::new_from_graph(graph);
        assert_eq!(LabelPropagation::default().run(&network).group_count(), 3);
    }

    #[test]
    fn test_same_seed_same_result() {
        let labeled = karate_club_edges()
            .into_labeled_network(EdgeWeighting::Unweighted)
            .unwrap();
        let a = LabelPropagation::new(5).run(labeled.network());
        let b = LabelPropagation::new(5).run(labeled.network());
        assert_eq!(a, b);
        assert!(a.group_count() < 34);
    }

    #[test]
    fn test_zero_iterations_is_identity() {
        let labeled = ring_of_cliques(2, 4)
            .into_labeled_network(EdgeWeighting::Unweighted)
            .unwrap();
        let grouping = LabelPropagation::default()
            .with_max_iterations(0)
            .run(labeled.network());
        assert_eq!(grouping.group_count(), 8);
    }
}
