// https://en.wikipedia.org/wiki/Louvain_method & https://github.com/graphext/louvain-rs/tree/master
// Copyright 2018 Juan Morales (crispamares@gmail.com)
// Repository: https://github.com/graphext/louvain-rs/tree/master
// Licensed under the MIT License.
use crate::local_moving::StandardLocalMoving;
use crate::network::clustering::{NetworkGrouping, VectorGrouping};
use crate::network::Network;
use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Multi-level Louvain modularity optimization.
///
/// Each level runs local moving on the current network and, if any node
/// moved, collapses the found groups into single nodes. The network passed
/// in must carry node strengths as node weights.
#[derive(Debug, Clone)]
pub struct Louvain {
    resolution: f64,
    seed: u64,
    max_levels: usize,
}

impl Default for Louvain {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            seed: 0,
            max_levels: usize::MAX,
        }
    }
}

impl Louvain {
    pub fn new(resolution: f64, seed: u64) -> Self {
        Louvain {
            resolution,
            seed,
            ..Default::default()
        }
    }

    pub fn with_max_levels(mut self, max_levels: usize) -> Self {
        self.max_levels = max_levels;
        self
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn run(&self, network: &Network<f64, f64>) -> VectorGrouping {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut local_moving = StandardLocalMoving::new(self.resolution);
        let mut clustering = VectorGrouping::create_isolated(network.nodes());

        let mut level = 0;
        let mut reduced: Option<Network<f64, f64>> = None;
        while level < self.max_levels {
            let current = reduced.as_ref().unwrap_or(network);
            let mut level_clustering = VectorGrouping::create_isolated(current.nodes());

            if !local_moving.iterate(current, &mut level_clustering, &mut rng) {
                break;
            }

            clustering.merge(&level_clustering);
            debug!(
                "Louvain level {}: {} nodes -> {} groups",
                level,
                current.nodes(),
                level_clustering.group_count()
            );

            reduced = Some(current.create_reduced_network(&level_clustering));
            level += 1;
        }

        clustering
    }
}
