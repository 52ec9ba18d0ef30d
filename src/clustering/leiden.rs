// Traag, V. A., Waltman, L., & van Eck, N. J. (2019).
// From Louvain to Leiden: guaranteeing well-connected communities.
// Scientific Reports, 9, 5233. 10.1038/s41598-019-41695-z
use crate::network::clustering::{NetworkGrouping, VectorGrouping};
use crate::network::Network;
use crate::quality::{PartitionState, QualityFunction, WeightedGraph};
use anyhow::bail;
use log::debug;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;

/// Moves must beat the current community by more than this.
const MIN_IMPROVEMENT: f64 = 1e-10;

/// Leiden optimizer for any [`QualityFunction`].
///
/// One iteration runs levels of fast local moving, refinement and
/// aggregation until the aggregated network cannot shrink any more.
/// Refined communities only ever grow by absorbing a neighbouring node, so
/// every community of the result is connected.
#[derive(Debug, Clone)]
pub struct Leiden<Q> {
    quality: Q,
    seed: u64,
    n_iterations: i64,
}

/// Outcome of a Leiden run.
#[derive(Debug, Clone)]
pub struct LeidenResult {
    pub grouping: VectorGrouping,
    pub quality: f64,
    pub iterations: usize,
}

/// Scratch space for collecting the weight from a node to each community.
struct NeighborWeights {
    weights: Vec<f64>,
    seen: Vec<bool>,
    touched: Vec<usize>,
}

impl NeighborWeights {
    fn new(capacity: usize) -> Self {
        NeighborWeights {
            weights: vec![0.0; capacity],
            seen: vec![false; capacity],
            touched: Vec::new(),
        }
    }

    fn add(&mut self, community: usize, weight: f64) {
        if !self.seen[community] {
            self.seen[community] = true;
            self.touched.push(community);
        }
        self.weights[community] += weight;
    }

    fn get(&self, community: usize) -> f64 {
        self.weights[community]
    }

    fn clear(&mut self) {
        for &c in &self.touched {
            self.weights[c] = 0.0;
            self.seen[c] = false;
        }
        self.touched.clear();
    }
}

impl<Q: QualityFunction> Leiden<Q> {
    pub fn new(quality: Q) -> Self {
        Leiden {
            quality,
            seed: 0,
            n_iterations: 2,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of iterations; a negative value iterates until an iteration
    /// no longer improves the quality, zero keeps the initial partition.
    pub fn with_iterations(mut self, n_iterations: i64) -> Self {
        self.n_iterations = n_iterations;
        self
    }

    pub fn quality_function(&self) -> &Q {
        &self.quality
    }

    /// Runs Leiden on `network`. `sizes` are the node sizes (1.0 each when
    /// absent) and `initial_membership` a starting community per node.
    pub fn run(
        &self,
        network: &Network<f64, f64>,
        sizes: Option<&[f64]>,
        initial_membership: Option<&[usize]>,
    ) -> anyhow::Result<LeidenResult> {
        let base = WeightedGraph::from_network(network, sizes)?;
        let mut membership = match initial_membership {
            Some(initial) if initial.len() != network.nodes() => bail!(
                "initial membership has {} entries for a network with {} nodes",
                initial.len(),
                network.nodes()
            ),
            Some(initial) => VectorGrouping::from_assignments(initial).into_assignments(),
            None => (0..network.nodes()).collect(),
        };

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut quality = self
            .quality
            .quality(&base, &PartitionState::from_membership(&base, &membership)?);
        let mut iterations = 0;

        while self.n_iterations < 0 || (iterations as i64) < self.n_iterations {
            membership = self.iterate(network, &base, &membership, &mut rng)?;
            iterations += 1;

            let new_quality = self
                .quality
                .quality(&base, &PartitionState::from_membership(&base, &membership)?);
            let improvement = new_quality - quality;
            quality = new_quality;
            debug!(
                "{} Leiden iteration {}: quality {:.6} (+{:.3e})",
                self.quality.name(),
                iterations,
                quality,
                improvement
            );

            if self.n_iterations < 0 && improvement <= MIN_IMPROVEMENT {
                break;
            }
        }

        Ok(LeidenResult {
            grouping: VectorGrouping::from_assignments(&membership),
            quality,
            iterations,
        })
    }

    /// One Leiden iteration starting from `membership` on the base network.
    fn iterate<R: RngCore>(
        &self,
        base_network: &Network<f64, f64>,
        base: &WeightedGraph,
        membership: &[usize],
        rng: &mut R,
    ) -> anyhow::Result<Vec<usize>> {
        let n = base.node_count();
        let mut to_current: Vec<usize> = (0..n).collect();
        let mut network = base_network.clone();
        let mut graph = base.clone();
        let mut level_membership = membership.to_vec();

        loop {
            let mut state = PartitionState::from_membership(&graph, &level_membership)?;
            self.move_nodes_fast(&graph, &mut state, rng);
            level_membership = state.normalized_membership();

            let community_count = state.community_count();
            if community_count >= graph.node_count() {
                break;
            }

            let state = PartitionState::from_membership(&graph, &level_membership)?;
            let refined = self.refine(&graph, &state, rng);
            let refined = VectorGrouping::from_assignments(&refined);

            // fall back to the unrefined partition when refinement merged nothing
            let aggregation = if refined.group_count() < graph.node_count() {
                refined
            } else {
                VectorGrouping::from_assignments(&level_membership)
            };

            let mut aggregated_membership = vec![0; aggregation.group_count()];
            let mut aggregated_sizes = vec![0.0; aggregation.group_count()];
            for node in 0..graph.node_count() {
                let target = aggregation.get_group(node);
                aggregated_membership[target] = level_membership[node];
                aggregated_sizes[target] += graph.size(node);
            }

            debug!(
                "Leiden level: {} nodes, {} communities, aggregating to {} nodes",
                graph.node_count(),
                community_count,
                aggregation.group_count()
            );

            network = network.create_reduced_network(&aggregation);
            graph = WeightedGraph::from_network(&network, Some(&aggregated_sizes))?;
            for current in to_current.iter_mut() {
                *current = aggregation.get_group(*current);
            }
            level_membership = aggregated_membership;
        }

        Ok(to_current
            .into_iter()
            .map(|current| level_membership[current])
            .collect())
    }

    /// Queue-based local moving: only neighbours of moved nodes are revisited.
    fn move_nodes_fast<R: RngCore>(
        &self,
        graph: &WeightedGraph,
        state: &mut PartitionState,
        rng: &mut R,
    ) -> bool {
        let n = graph.node_count();
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);
        let mut queue: VecDeque<usize> = order.into();
        let mut in_queue = vec![true; n];
        let mut neighbor_weights = NeighborWeights::new(n);
        let mut moved = false;

        while let Some(node) = queue.pop_front() {
            in_queue[node] = false;
            let current = state.community(node);

            for &(neighbor, w) in graph.neighbors(node) {
                neighbor_weights.add(state.community(neighbor), w);
            }
            let weight_to_old = neighbor_weights.get(current);

            let mut best = current;
            let mut best_diff = 0.0;
            let mut candidates = neighbor_weights.touched.clone();
            if state.node_count_of(current) > 1 {
                if let Some(empty) = state.empty_community() {
                    candidates.push(empty);
                }
            }
            for community in candidates {
                if community == current {
                    continue;
                }
                let diff = self.quality.diff_move(
                    graph,
                    state,
                    node,
                    community,
                    weight_to_old,
                    neighbor_weights.get(community),
                );
                if diff > best_diff + MIN_IMPROVEMENT {
                    best = community;
                    best_diff = diff;
                }
            }

            if best != current {
                let weight_to_new = neighbor_weights.get(best);
                state.move_node(graph, node, best, weight_to_old, weight_to_new);
                moved = true;

                for &(neighbor, _) in graph.neighbors(node) {
                    if !in_queue[neighbor] && state.community(neighbor) != best {
                        queue.push_back(neighbor);
                        in_queue[neighbor] = true;
                    }
                }
            }
            neighbor_weights.clear();
        }

        moved
    }

    /// Splits every community of `state` into refined subcommunities. Nodes
    /// still on their own are merged into the neighbouring subcommunity of
    /// the same community that gains the most quality.
    fn refine<R: RngCore>(
        &self,
        graph: &WeightedGraph,
        state: &PartitionState,
        rng: &mut R,
    ) -> Vec<usize> {
        let n = graph.node_count();
        let mut refined = PartitionState::singletons(graph);
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);
        let mut neighbor_weights = NeighborWeights::new(n);

        for node in order {
            let current = refined.community(node);
            if refined.node_count_of(current) > 1 {
                continue;
            }
            let community = state.community(node);

            for &(neighbor, w) in graph.neighbors(node) {
                if state.community(neighbor) == community {
                    neighbor_weights.add(refined.community(neighbor), w);
                }
            }
            let weight_to_old = neighbor_weights.get(current);

            let mut best = current;
            let mut best_diff = 0.0;
            for &candidate in &neighbor_weights.touched {
                if candidate == current {
                    continue;
                }
                let diff = self.quality.diff_move(
                    graph,
                    &refined,
                    node,
                    candidate,
                    weight_to_old,
                    neighbor_weights.get(candidate),
                );
                if diff > best_diff + MIN_IMPROVEMENT {
                    best = candidate;
                    best_diff = diff;
                }
            }

            if best != current {
                let weight_to_new = neighbor_weights.get(best);
                refined.move_node(graph, node, best, weight_to_old, weight_to_new);
            }
            neighbor_weights.clear();
        }

        refined.membership().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{EdgeWeighting, IntoLabeledNetwork};
    use crate::quality::{modularity, Cpm, Modularity, Surprise};
    use crate::test_utils::{karate_club_edges, ring_of_cliques};
    use std::collections::{HashSet, VecDeque};

    fn is_connected(network: &Network<f64, f64>, members: &[usize]) -> bool {
        let set: HashSet<usize> = members.iter().copied().collect();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([members[0]]);
        while let Some(node) = queue.pop_front() {
            if !seen.insert(node) {
                continue;
            }
            for (neighbor, _) in network.neighbors(node) {
                if set.contains(&neighbor) && !seen.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        seen.len() == set.len()
    }

    #[test]
    fn test_ring_of_cliques() {
        let labeled = ring_of_cliques(6, 4)
            .into_labeled_network(EdgeWeighting::Weighted)
            .unwrap();
        let result = Leiden::new(Modularity::default())
            .run(labeled.network(), None, None)
            .unwrap();

        assert_eq!(result.grouping.group_count(), 6);
        for clique in 0..6 {
            let group = result.grouping.get_group(clique * 4);
            for member in 1..4 {
                assert_eq!(result.grouping.get_group(clique * 4 + member), group);
            }
        }
    }

    #[test]
    fn test_karate_communities_are_connected() {
        let labeled = karate_club_edges()
            .into_labeled_network(EdgeWeighting::Unweighted)
            .unwrap();
        let result = Leiden::new(Modularity::default())
            .with_iterations(-1)
            .run(labeled.network(), None, None)
            .unwrap();

        let q = modularity(labeled.network(), &result.grouping, 1.0).unwrap();
        assert!((q - result.quality).abs() < 1e-9);
        assert!(q > 0.39, "modularity {} too low", q);

        for members in result.grouping.get_group_members() {
            assert!(is_connected(labeled.network(), &members));
        }
    }

    #[test]
    fn test_initial_membership_is_respected_when_optimal() {
        let labeled = ring_of_cliques(3, 5)
            .into_labeled_network(EdgeWeighting::Weighted)
            .unwrap();
        let initial: Vec<usize> = (0..15).map(|node| node / 5).collect();
        let result = Leiden::new(Modularity::default())
            .run(labeled.network(), None, Some(&initial))
            .unwrap();
        assert_eq!(result.grouping.assignments(), initial.as_slice());
    }

    #[test]
    fn test_initial_membership_length_checked() {
        let labeled = ring_of_cliques(3, 5)
            .into_labeled_network(EdgeWeighting::Weighted)
            .unwrap();
        assert!(Leiden::new(Modularity::default())
            .run(labeled.network(), None, Some(&[0, 1]))
            .is_err());
    }

    #[test]
    fn test_sparse_initial_membership_ids() {
        let labeled = vec![(0usize, 1usize), (1, 2)]
            .into_labeled_network(EdgeWeighting::Unweighted)
            .unwrap();
        let result = Leiden::new(Modularity::default())
            .with_iterations(0)
            .run(labeled.network(), None, Some(&[7, 7, 1_000_000]))
            .unwrap();
        assert_eq!(result.grouping.assignments(), &[0, 0, 1]);

        let result = Leiden::new(Modularity::default())
            .run(labeled.network(), None, Some(&[0, 5_000_000, usize::MAX]))
            .unwrap();
        assert_eq!(result.grouping.node_count(), 3);
    }

    #[test]
    fn test_zero_iterations_keeps_initial_partition() {
        let labeled = ring_of_cliques(3, 5)
            .into_labeled_network(EdgeWeighting::Weighted)
            .unwrap();
        let result = Leiden::new(Modularity::default())
            .with_iterations(0)
            .run(labeled.network(), None, None)
            .unwrap();
        assert_eq!(result.iterations, 0);
        assert_eq!(result.grouping.group_count(), 15);

        let singletons = VectorGrouping::create_isolated(15);
        let q = modularity(labeled.network(), &singletons, 1.0).unwrap();
        assert!((q - result.quality).abs() < 1e-12);
    }

    #[test]
    fn test_cpm_high_resolution_gives_singletons() {
        let labeled = ring_of_cliques(3, 4)
            .into_labeled_network(EdgeWeighting::Weighted)
            .unwrap();
        let result = Leiden::new(Cpm { resolution: 2.0 })
            .run(labeled.network(), None, None)
            .unwrap();
        assert_eq!(result.grouping.group_count(), 12);
    }

    #[test]
    fn test_cpm_low_resolution_finds_cliques() {
        let labeled = ring_of_cliques(3, 4)
            .into_labeled_network(EdgeWeighting::Weighted)
            .unwrap();
        let result = Leiden::new(Cpm { resolution: 0.5 })
            .run(labeled.network(), None, None)
            .unwrap();
        assert_eq!(result.grouping.group_count(), 3);
    }

    #[test]
    fn test_surprise_is_deterministic_for_seed() {
        let labeled = karate_club_edges()
            .into_labeled_network(EdgeWeighting::Unweighted)
            .unwrap();
        let a = Leiden::new(Surprise).with_seed(9).run(labeled.network(), None, None).unwrap();
        let b = Leiden::new(Surprise).with_seed(9).run(labeled.network(), None, None).unwrap();
        assert_eq!(a.grouping, b.grouping);
        assert!(a.quality > 0.0);
    }
}
