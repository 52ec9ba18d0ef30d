pub mod clustering;
pub mod community;
pub mod evaluation;
pub mod local_moving;
pub mod network;
pub mod quality;
mod utils;

#[cfg(test)]
mod test_utils;

pub use community::NodeClustering;
pub use evaluation::MatchingResult;
pub use network::{EdgeWeighting, IntoLabeledNetwork, LabeledNetwork};
pub use utils::NodeLabel;
