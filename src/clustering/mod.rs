pub(crate) mod greedy;
pub(crate) mod label_propagation;
pub(crate) mod leiden;
pub(crate) mod louvain;

pub use greedy::GreedyModularity;
pub use label_propagation::LabelPropagation;
pub use leiden::{Leiden, LeidenResult};
pub use louvain::Louvain;
