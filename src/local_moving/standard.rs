// See: https://en.wikipedia.org/wiki/Louvain_method & https://github.com/graphext/louvain-rs/tree/master
// Copyright 2018 Juan Morales (crispamares@gmail.com)
// Repository: https://github.com/graphext/louvain-rs/tree/master
// Licensed under the MIT License.
use crate::network::clustering::NetworkGrouping;
use crate::network::Network;
use crate::utils::ZeroVec;
use rand::seq::SliceRandom;
use rand::RngCore;

/// Modularity local moving on a network whose node weights are node
/// strengths. Each call visits nodes in a shuffled order until every node has
/// been visited once since the last move.
#[derive(Debug, Default)]
pub struct StandardLocalMoving {
    resolution: f64,
    cluster_weights: Vec<f64>,
    nodes_per_cluster: Vec<usize>,
    unused_clusters: Vec<usize>,
    node_order: Vec<usize>,
    edge_weight_per_cluster: Vec<f64>,
    neighboring_clusters: Vec<usize>,
}

impl StandardLocalMoving {
    pub fn new(resolution: f64) -> Self {
        StandardLocalMoving {
            resolution,
            ..Default::default()
        }
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Returns whether any node changed cluster. The clustering is normalized
    /// when it did.
    pub fn iterate<C, R>(
        &mut self,
        network: &Network<f64, f64>,
        clustering: &mut C,
        rng: &mut R,
    ) -> bool
    where
        C: NetworkGrouping,
        R: RngCore,
    {
        let node_count = network.nodes();
        let total_edge_weight = network.get_total_edge_weight();
        if node_count == 0 || total_edge_weight <= 0.0 {
            return false;
        }

        // cluster ids may go up to node_count - 1 after a move into an unused cluster
        let capacity = node_count.max(clustering.group_count());
        self.cluster_weights.zero_len(capacity);
        self.nodes_per_cluster.zero_len(capacity);
        self.edge_weight_per_cluster.zero_len(capacity);
        self.unused_clusters.zero_len(capacity);
        self.neighboring_clusters.zero_len(capacity + 1);

        for i in 0..node_count {
            let cluster = clustering.get_group(i);
            self.cluster_weights[cluster] += network.weight(i);
            self.nodes_per_cluster[cluster] += 1;
        }

        let mut num_unused_clusters = 0;
        for i in (0..capacity).rev() {
            if self.nodes_per_cluster[i] == 0 {
                self.unused_clusters[num_unused_clusters] = i;
                num_unused_clusters += 1;
            }
        }

        self.node_order.clear();
        self.node_order.extend(0..node_count);
        self.node_order.shuffle(rng);

        let two_m = 2.0 * total_edge_weight;
        let mut update = false;
        let mut num_stable_nodes = 0;
        let mut i = 0;

        while num_stable_nodes < node_count {
            let node = self.node_order[i];
            let current_cluster = clustering.get_group(node);
            let node_weight = network.weight(node);

            self.cluster_weights[current_cluster] -= node_weight;
            self.nodes_per_cluster[current_cluster] -= 1;
            if self.nodes_per_cluster[current_cluster] == 0 {
                self.unused_clusters[num_unused_clusters] = current_cluster;
                num_unused_clusters += 1;
            }

            // an empty cluster is always a candidate
            self.neighboring_clusters[0] = self.unused_clusters[num_unused_clusters - 1];
            let mut num_neighboring_clusters = 1;

            for (target, weight) in network.neighbors(node) {
                if target == node {
                    continue;
                }
                let neighbor_cluster = clustering.get_group(target);
                if self.edge_weight_per_cluster[neighbor_cluster] == 0.0 {
                    self.neighboring_clusters[num_neighboring_clusters] = neighbor_cluster;
                    num_neighboring_clusters += 1;
                }
                self.edge_weight_per_cluster[neighbor_cluster] += weight;
            }

            let mut best_cluster = current_cluster;
            let mut max_quality_increment = self.edge_weight_per_cluster[current_cluster]
                - node_weight * self.cluster_weights[current_cluster] * self.resolution / two_m;

            for &cluster in &self.neighboring_clusters[..num_neighboring_clusters] {
                let quality_increment = self.edge_weight_per_cluster[cluster]
                    - node_weight * self.cluster_weights[cluster] * self.resolution / two_m;
                if quality_increment > max_quality_increment + 1e-12 {
                    best_cluster = cluster;
                    max_quality_increment = quality_increment;
                }
                self.edge_weight_per_cluster[cluster] = 0.0;
            }
            self.edge_weight_per_cluster[current_cluster] = 0.0;

            self.cluster_weights[best_cluster] += node_weight;
            self.nodes_per_cluster[best_cluster] += 1;
            if best_cluster == self.unused_clusters[num_unused_clusters - 1] {
                num_unused_clusters -= 1;
            }

            if best_cluster == current_cluster {
                num_stable_nodes += 1;
            } else {
                clustering.set_group(node, best_cluster);
                num_stable_nodes = 1;
                update = true;
            }

            i = (i + 1) % node_count;
        }

        if update {
            clustering.normalize_groups();
        }

        update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::clustering::VectorGrouping;
    use petgraph::graph::UnGraph;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Node weights are set to the strengths, as the converter does.
    fn with_strengths(mut graph: UnGraph<f64, f64>) -> Network<f64, f64> {
        let mut network = Network::new_from_graph(graph.clone());
        let mut strengths = Vec::new();
        network.get_total_edge_weight_per_node(&mut strengths);
        for (idx, strength) in graph.node_indices().zip(strengths) {
            graph[idx] = strength;
        }
        network.graph = graph;
        network
    }

    fn two_communities() -> Network<f64, f64> {
        let mut graph = UnGraph::new_undirected();
        let nodes: Vec<_> = (0..6).map(|_| graph.add_node(0.0)).collect();
        graph.add_edge(nodes[0], nodes[1], 2.0);
        graph.add_edge(nodes[1], nodes[2], 2.0);
        graph.add_edge(nodes[0], nodes[2], 2.0);
        graph.add_edge(nodes[3], nodes[4], 2.0);
        graph.add_edge(nodes[4], nodes[5], 2.0);
        graph.add_edge(nodes[3], nodes[5], 2.0);
        graph.add_edge(nodes[2], nodes[3], 0.5);
        with_strengths(graph)
    }

    #[test]
    fn test_finds_two_communities() {
        let network = two_communities();
        let mut clustering = VectorGrouping::create_isolated(network.nodes());
        let mut local_moving = StandardLocalMoving::new(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        assert!(local_moving.iterate(&network, &mut clustering, &mut rng));
        assert_eq!(clustering.group_count(), 2);

        let group_0 = clustering.get_group(0);
        assert_eq!(clustering.get_group(1), group_0);
        assert_eq!(clustering.get_group(2), group_0);
        let group_3 = clustering.get_group(3);
        assert_eq!(clustering.get_group(4), group_3);
        assert_eq!(clustering.get_group(5), group_3);
        assert_ne!(group_0, group_3);
    }

    #[test]
    fn test_converged_clustering_is_stable() {
        let network = two_communities();
        let mut clustering = VectorGrouping::create_isolated(network.nodes());
        let mut local_moving = StandardLocalMoving::new(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        local_moving.iterate(&network, &mut clustering, &mut rng);
        let before = clustering.clone();
        assert!(!local_moving.iterate(&network, &mut clustering, &mut rng));
        assert_eq!(before, clustering);
    }

    #[test]
    fn test_resolution_parameter() {
        let network = two_communities();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let mut clustering_high = VectorGrouping::create_isolated(network.nodes());
        StandardLocalMoving::new(4.0).iterate(&network, &mut clustering_high, &mut rng);

        let mut clustering_low = VectorGrouping::create_isolated(network.nodes());
        StandardLocalMoving::new(0.01).iterate(&network, &mut clustering_low, &mut rng);

        assert!(clustering_high.group_count() >= clustering_low.group_count());
        assert_eq!(clustering_high.group_count(), network.nodes());
    }

    #[test]
    fn test_single_node_network() {
        let mut graph = UnGraph::new_undirected();
        graph.add_node(0.0);
        let network = with_strengths(graph);

        let mut clustering = VectorGrouping::create_isolated(network.nodes());
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert!(!StandardLocalMoving::new(1.0).iterate(&network, &mut clustering, &mut rng));
        assert_eq!(clustering.group_count(), 1);
    }

    #[test]
    fn test_disconnected_components() {
        let mut graph = UnGraph::new_undirected();
        for _ in 0..4 {
            graph.add_node(0.0);
        }
        graph.add_edge(0.into(), 1.into(), 1.0);
        graph.add_edge(2.into(), 3.into(), 1.0);
        let network = with_strengths(graph);

        let mut clustering = VectorGrouping::create_isolated(network.nodes());
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        StandardLocalMoving::new(1.0).iterate(&network, &mut clustering, &mut rng);

        assert_eq!(clustering.get_group(0), clustering.get_group(1));
        assert_eq!(clustering.get_group(2), clustering.get_group(3));
        assert_ne!(clustering.get_group(0), clustering.get_group(2));
    }
}
