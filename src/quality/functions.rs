// Quality functions as defined in:
// Reichardt & Bornholdt (2006), Statistical mechanics of community detection. 10.1103/PhysRevE.74.016110
// Traag, Van Dooren & Nesterov (2011), Narrow scope for resolution-limit-free community detection. 10.1103/PhysRevE.84.016114
// Traag, Krings & Van Dooren (2013), Significant scales in community structure. 10.1038/srep02930
// Traag, Aldecoa & Delvenne (2015), Detecting communities using asymptotical surprise. 10.1103/PhysRevE.92.022816
use super::{pairs, CommunityStats, PartitionState, QualityFunction, WeightedGraph};
use crate::utils::binary_kl;

/// Newman-Girvan modularity, `Σ_c (w_c - γ K_c² / 4m) / m`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modularity {
    pub resolution: f64,
}

impl Modularity {
    pub fn with_resolution(resolution: f64) -> Self {
        Modularity { resolution }
    }
}

impl Default for Modularity {
    fn default() -> Self {
        Modularity { resolution: 1.0 }
    }
}

fn configuration_term(graph: &WeightedGraph, stats: &CommunityStats, resolution: f64) -> f64 {
    let m = graph.total_weight();
    if m <= 0.0 {
        return 0.0;
    }
    stats.internal_weight - resolution * stats.strength * stats.strength / (4.0 * m)
}

impl QualityFunction for Modularity {
    fn name(&self) -> &'static str {
        "Modularity"
    }

    fn community_term(&self, graph: &WeightedGraph, stats: &CommunityStats) -> f64 {
        configuration_term(graph, stats, self.resolution)
    }

    fn scale(&self, graph: &WeightedGraph) -> f64 {
        let m = graph.total_weight();
        if m > 0.0 {
            m
        } else {
            1.0
        }
    }
}

/// Reichardt-Bornholdt Potts model with the configuration null model.
/// Unnormalized modularity with a resolution parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RbConfiguration {
    pub resolution: f64,
}

impl QualityFunction for RbConfiguration {
    fn name(&self) -> &'static str {
        "RBConfiguration"
    }

    fn community_term(&self, graph: &WeightedGraph, stats: &CommunityStats) -> f64 {
        configuration_term(graph, stats, self.resolution)
    }
}

/// Reichardt-Bornholdt Potts model with the Erdős-Rényi null model,
/// `Σ_c (w_c - γ p n_c (n_c - 1) / 2)` with `p` the graph density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rber {
    pub resolution: f64,
}

impl QualityFunction for Rber {
    fn name(&self) -> &'static str {
        "RBER"
    }

    fn community_term(&self, graph: &WeightedGraph, stats: &CommunityStats) -> f64 {
        stats.internal_weight - self.resolution * graph.density() * stats.possible_pairs()
    }
}

/// Constant Potts Model, `Σ_c (w_c - γ n_c (n_c - 1) / 2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cpm {
    pub resolution: f64,
}

impl QualityFunction for Cpm {
    fn name(&self) -> &'static str {
        "CPM"
    }

    fn community_term(&self, _graph: &WeightedGraph, stats: &CommunityStats) -> f64 {
        stats.internal_weight - self.resolution * stats.possible_pairs()
    }
}

/// Significance, `Σ_c N_c D(p_c || p)` where `N_c` is the number of pairs in
/// the community, `p_c` its density and `p` the graph density. Meant for
/// unweighted graphs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Significance;

impl QualityFunction for Significance {
    fn name(&self) -> &'static str {
        "Significance"
    }

    fn community_term(&self, graph: &WeightedGraph, stats: &CommunityStats) -> f64 {
        let possible = stats.possible_pairs();
        if possible <= 0.0 {
            return 0.0;
        }
        let p_c = (stats.internal_weight / possible).min(1.0);
        possible * binary_kl(p_c, graph.density())
    }
}

/// Asymptotical surprise, `m D(q || s)` with `q` the fraction of the edge
/// weight inside communities and `s` the fraction of node pairs inside
/// communities.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Surprise;

impl Surprise {
    fn evaluate(graph: &WeightedGraph, internal_weight: f64, internal_pairs: f64) -> f64 {
        let m = graph.total_weight();
        let possible = pairs(graph.total_size());
        if m <= 0.0 || possible <= 0.0 {
            return 0.0;
        }
        let q = (internal_weight / m).clamp(0.0, 1.0);
        let s = (internal_pairs / possible).clamp(0.0, 1.0);
        m * binary_kl(q, s)
    }
}

impl QualityFunction for Surprise {
    fn name(&self) -> &'static str {
        "Surprise"
    }

    fn quality(&self, graph: &WeightedGraph, state: &PartitionState) -> f64 {
        Self::evaluate(
            graph,
            state.total_internal_weight(),
            state.total_possible_pairs(),
        )
    }

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
        let delta = state.move_stats(graph, node, to, weight_to_old, weight_to_new);
        let before = self.quality(graph, state);
        let after = Self::evaluate(
            graph,
            state.total_internal_weight() + delta.internal_weight_change(),
            state.total_possible_pairs() + delta.possible_pairs_change(),
        );
        after - before
    }
}
