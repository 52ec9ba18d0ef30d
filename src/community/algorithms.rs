use super::NodeClustering;
use crate::clustering::{GreedyModularity, LabelPropagation, Leiden, Louvain};
use crate::network::clustering::NetworkGrouping;
use crate::network::{EdgeWeighting, IntoLabeledNetwork, LabeledNetwork};
use crate::quality::{Cpm, Modularity, QualityFunction, RbConfiguration, Rber, Significance, Surprise};
use crate::utils::NodeLabel;
use anyhow::{bail, Context};
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct LouvainParams {
    pub weighted: bool,
    pub resolution: f64,
    /// Shuffle the node order from a random seed instead of a fixed one.
    pub randomize: bool,
    pub seed: Option<u64>,
}

impl Default for LouvainParams {
    fn default() -> Self {
        LouvainParams {
            weighted: true,
            resolution: 1.0,
            randomize: false,
            seed: None,
        }
    }
}

impl LouvainParams {
    pub fn with_weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_randomize(mut self, randomize: bool) -> Self {
        self.randomize = randomize;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Parameters shared by the Leiden based methods.
#[derive(Debug, Clone, PartialEq)]
pub struct LeidenParams {
    /// Starting community of every node, in the graph's node order.
    pub initial_membership: Option<Vec<usize>>,
    pub weighted: bool,
    /// Node sizes in the graph's node order; only read by the methods whose
    /// quality depends on community sizes.
    pub node_sizes: Option<Vec<usize>>,
    pub seed: u64,
    /// Negative runs until an iteration stops improving.
    pub n_iterations: i64,
}

impl Default for LeidenParams {
    fn default() -> Self {
        LeidenParams {
            initial_membership: None,
            weighted: false,
            node_sizes: None,
            seed: 42,
            n_iterations: 2,
        }
    }
}

impl LeidenParams {
    pub fn with_initial_membership(mut self, membership: Vec<usize>) -> Self {
        self.initial_membership = Some(membership);
        self
    }

    pub fn with_weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    pub fn with_node_sizes(mut self, node_sizes: Vec<usize>) -> Self {
        self.node_sizes = Some(node_sizes);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_iterations(mut self, n_iterations: i64) -> Self {
        self.n_iterations = n_iterations;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GreedyModularityParams {
    pub weighted: bool,
    pub resolution: f64,
}

impl Default for GreedyModularityParams {
    fn default() -> Self {
        GreedyModularityParams {
            weighted: false,
            resolution: 1.0,
        }
    }
}

impl GreedyModularityParams {
    pub fn with_weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelPropagationParams {
    pub weighted: bool,
    pub seed: u64,
    pub max_iterations: usize,
}

impl Default for LabelPropagationParams {
    fn default() -> Self {
        LabelPropagationParams {
            weighted: false,
            seed: 0,
            max_iterations: 100,
        }
    }
}

impl LabelPropagationParams {
    pub fn with_weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

fn prepare<L, G>(graph: G, weighted: bool, method: &str) -> anyhow::Result<LabeledNetwork<L>>
where
    L: NodeLabel,
    G: IntoLabeledNetwork<L>,
{
    let labeled = graph
        .into_labeled_network(EdgeWeighting::from_flag(weighted))
        .with_context(|| format!("{}: could not convert the input graph", method))?;
    if labeled.node_count() == 0 {
        warn!("{}: input graph has no nodes", method);
    } else if labeled.edge_count() == 0 {
        warn!("{}: input graph has no edges, every node stays on its own", method);
    }
    Ok(labeled)
}

fn finish<L: NodeLabel>(
    labeled: LabeledNetwork<L>,
    groups: Vec<Vec<usize>>,
    method: &str,
    parameters: BTreeMap<String, Value>,
) -> anyhow::Result<NodeClustering<L>> {
    let communities = labeled.groups_to_labels(groups);
    finish_labeled(labeled, communities, method, parameters)
}

fn finish_labeled<L: NodeLabel>(
    labeled: LabeledNetwork<L>,
    communities: Vec<Vec<L>>,
    method: &str,
    parameters: BTreeMap<String, Value>,
) -> anyhow::Result<NodeClustering<L>> {
    info!(
        "{}: {} communities on {} nodes",
        method,
        communities.len(),
        labeled.node_count()
    );
    NodeClustering::new(communities, Some(Arc::new(labeled)), method, parameters)
}

/// Louvain modularity optimization.
pub fn louvain<L, G>(graph: G, params: &LouvainParams) -> anyhow::Result<NodeClustering<L>>
where
    L: NodeLabel,
    G: IntoLabeledNetwork<L>,
{
    let labeled = prepare(graph, params.weighted, "Louvain")?;
    let seed = if params.randomize {
        params.seed.unwrap_or_else(rand::random)
    } else {
        params.seed.unwrap_or(0)
    };

    let grouping = Louvain::new(params.resolution, seed).run(labeled.network());

    let mut parameters = BTreeMap::new();
    parameters.insert("weight".to_string(), json!(params.weighted));
    parameters.insert("resolution".to_string(), json!(params.resolution));
    parameters.insert("randomize".to_string(), json!(params.randomize));
    finish(labeled, grouping.get_group_members(), "Louvain", parameters)
}

fn run_leiden<L, G, Q>(
    graph: G,
    params: &LeidenParams,
    quality: Q,
    method: &str,
    uses_node_sizes: bool,
    mut parameters: BTreeMap<String, Value>,
) -> anyhow::Result<NodeClustering<L>>
where
    L: NodeLabel,
    G: IntoLabeledNetwork<L>,
    Q: QualityFunction,
{
    if params.node_sizes.is_some() && !uses_node_sizes {
        bail!("{} does not take node sizes", method);
    }
    let labeled = prepare(graph, params.weighted, method)?;
    let sizes: Option<Vec<f64>> = params
        .node_sizes
        .as_ref()
        .map(|sizes| sizes.iter().map(|&s| s as f64).collect());

    let result = Leiden::new(quality)
        .with_seed(params.seed)
        .with_iterations(params.n_iterations)
        .run(
            labeled.network(),
            sizes.as_deref(),
            params.initial_membership.as_deref(),
        )
        .with_context(|| format!("{} failed", method))?;

    debug!(
        "{}: quality {:.6} after {} iterations",
        method,
        result.quality,
        result.iterations
    );

    parameters.insert(
        "initial_membership".to_string(),
        json!(params.initial_membership),
    );
    parameters.insert("weights".to_string(), json!(params.weighted));
    if uses_node_sizes {
        parameters.insert("node_sizes".to_string(), json!(params.node_sizes));
    }
    finish(labeled, result.grouping.get_group_members(), method, parameters)
}

fn resolution_parameter(resolution: f64) -> BTreeMap<String, Value> {
    let mut parameters = BTreeMap::new();
    parameters.insert("resolution_parameter".to_string(), json!(resolution));
    parameters
}

/// Leiden optimizing modularity.
pub fn leiden<L, G>(graph: G, params: &LeidenParams) -> anyhow::Result<NodeClustering<L>>
where
    L: NodeLabel,
    G: IntoLabeledNetwork<L>,
{
    run_leiden(graph, params, Modularity::default(), "Leiden", false, BTreeMap::new())
}

/// Leiden optimizing the Reichardt-Bornholdt Potts model with a
/// configuration null model.
pub fn rb_pots<L, G>(
    graph: G,
    params: &LeidenParams,
    resolution_parameter: f64,
) -> anyhow::Result<NodeClustering<L>>
where
    L: NodeLabel,
    G: IntoLabeledNetwork<L>,
{
    run_leiden(
        graph,
        params,
        RbConfiguration {
            resolution: resolution_parameter,
        },
        "RB Pots",
        false,
        self::resolution_parameter(resolution_parameter),
    )
}

/// Leiden optimizing the Reichardt-Bornholdt Potts model with an
/// Erdős-Rényi null model.
pub fn rber_pots<L, G>(
    graph: G,
    params: &LeidenParams,
    resolution_parameter: f64,
) -> anyhow::Result<NodeClustering<L>>
where
    L: NodeLabel,
    G: IntoLabeledNetwork<L>,
{
    run_leiden(
        graph,
        params,
        Rber {
            resolution: resolution_parameter,
        },
        "RBER Pots",
        true,
        self::resolution_parameter(resolution_parameter),
    )
}

/// Leiden optimizing the Constant Potts Model.
pub fn cpm<L, G>(
    graph: G,
    params: &LeidenParams,
    resolution_parameter: f64,
) -> anyhow::Result<NodeClustering<L>>
where
    L: NodeLabel,
    G: IntoLabeledNetwork<L>,
{
    run_leiden(
        graph,
        params,
        Cpm {
            resolution: resolution_parameter,
        },
        "CPM",
        true,
        self::resolution_parameter(resolution_parameter),
    )
}

/// Leiden optimizing significance. Only defined for unweighted graphs.
pub fn significance_communities<L, G>(
    graph: G,
    params: &LeidenParams,
) -> anyhow::Result<NodeClustering<L>>
where
    L: NodeLabel,
    G: IntoLabeledNetwork<L>,
{
    if params.weighted {
        bail!("Significance is only defined for unweighted graphs");
    }
    run_leiden(graph, params, Significance, "Significance", true, BTreeMap::new())
}

/// Leiden optimizing asymptotical surprise.
pub fn surprise_communities<L, G>(
    graph: G,
    params: &LeidenParams,
) -> anyhow::Result<NodeClustering<L>>
where
    L: NodeLabel,
    G: IntoLabeledNetwork<L>,
{
    run_leiden(graph, params, Surprise, "Surprise", true, BTreeMap::new())
}

/// Clauset-Newman-Moore greedy modularity. Communities come largest first,
/// equal sizes ordered by their smallest node id.
pub fn greedy_modularity<L, G>(
    graph: G,
    params: &GreedyModularityParams,
) -> anyhow::Result<NodeClustering<L>>
where
    L: NodeLabel,
    G: IntoLabeledNetwork<L>,
{
    let labeled = prepare(graph, params.weighted, "Greedy Modularity")?;
    let groups = GreedyModularity::new(params.resolution).run(labeled.network());
    let mut communities = labeled.groups_to_labels(groups);
    communities.sort_by(|x, y| {
        y.len()
            .cmp(&x.len())
            .then_with(|| x.first().cmp(&y.first()))
    });

    let mut parameters = BTreeMap::new();
    parameters.insert("weight".to_string(), json!(params.weighted));
    parameters.insert("resolution".to_string(), json!(params.resolution));
    finish_labeled(labeled, communities, "Greedy Modularity", parameters)
}

/// Asynchronous label propagation.
pub fn label_propagation<L, G>(
    graph: G,
    params: &LabelPropagationParams,
) -> anyhow::Result<NodeClustering<L>>
where
    L: NodeLabel,
    G: IntoLabeledNetwork<L>,
{
    let labeled = prepare(graph, params.weighted, "Label Propagation")?;
    let grouping = LabelPropagation::new(params.seed)
        .with_max_iterations(params.max_iterations)
        .run(labeled.network());

    let mut parameters = BTreeMap::new();
    parameters.insert("weight".to_string(), json!(params.weighted));
    parameters.insert("seed".to_string(), json!(params.seed));
    parameters.insert("max_iterations".to_string(), json!(params.max_iterations));
    finish(labeled, grouping.get_group_members(), "Label Propagation", parameters)
}
