//! Comparison of two clusterings of the same nodes.
//!
//! | Function | Range | Input |
//! |---|---|---|
//! | [`normalized_mutual_information`] | [0, 1] | partitions |
//! | [`adjusted_mutual_information`] | ≤ 1 | partitions |
//! | [`adjusted_rand_index`] | [-1, 1] | partitions |
//! | [`variation_of_information`] | [0, ln n] | partitions |
//! | [`overlapping_normalized_mutual_information_lfk`] | [0, 1] | covers |
//! | [`overlapping_normalized_mutual_information_mgh`] | [0, 1] | covers |
//! | [`omega`] | [0, 1] | covers |
//! | [`f1`], [`nf1`] | [0, 1] | covers |
//!
//! Node ids of both clusterings are mapped onto one dense index; nodes that
//! appear in only one of them count as unassigned in the other.

use crate::community::NodeClustering;
use crate::utils::NodeLabel;
use ahash::AHashMap;
use anyhow::bail;
use serde::Serialize;

mod matching;
mod overlapping;
mod partition;

pub use matching::{f1, nf1};
pub use overlapping::{
    omega, overlapping_normalized_mutual_information_lfk,
    overlapping_normalized_mutual_information_mgh,
};
pub use partition::{
    adjusted_mutual_information, adjusted_rand_index, normalized_mutual_information,
    variation_of_information,
};

/// Above this many nodes pair counting runs on the rayon pool.
const PARALLEL_THRESHOLD: usize = 1000;

/// Mean and population standard deviation of per-community scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchingResult {
    pub score: f64,
    pub std: f64,
}

/// Both clusterings as lists of dense node indices.
#[derive(Debug)]
pub(crate) struct IndexedCovers {
    pub node_count: usize,
    pub first: Vec<Vec<usize>>,
    pub second: Vec<Vec<usize>>,
}

impl IndexedCovers {
    pub(crate) fn new<L: NodeLabel>(
        first: &NodeClustering<L>,
        second: &NodeClustering<L>,
    ) -> anyhow::Result<Self> {
        if first.is_empty() || second.is_empty() {
            bail!("cannot compare an empty clustering");
        }

        let mut index: AHashMap<&L, usize> = AHashMap::new();
        let first = to_indices(first, &mut index);
        let second = to_indices(second, &mut index);

        Ok(IndexedCovers {
            node_count: index.len(),
            first,
            second,
        })
    }

    /// One label per node for each side. Fails unless both sides are
    /// partitions of the same nodes.
    pub(crate) fn labels(&self, metric: &str) -> anyhow::Result<(Vec<usize>, Vec<usize>)> {
        let first = partition_labels(&self.first, self.node_count, metric)?;
        let second = partition_labels(&self.second, self.node_count, metric)?;
        Ok((first, second))
    }
}

fn to_indices<'a, L: NodeLabel>(
    clustering: &'a NodeClustering<L>,
    index: &mut AHashMap<&'a L, usize>,
) -> Vec<Vec<usize>> {
    clustering
        .communities()
        .iter()
        .map(|members| {
            members
                .iter()
                .map(|node| {
                    let next = index.len();
                    *index.entry(node).or_insert(next)
                })
                .collect()
        })
        .collect()
}

fn partition_labels(
    communities: &[Vec<usize>],
    node_count: usize,
    metric: &str,
) -> anyhow::Result<Vec<usize>> {
    let mut labels = vec![usize::MAX; node_count];
    for (c, members) in communities.iter().enumerate() {
        for &node in members {
            if labels[node] != usize::MAX {
                bail!("{} is only defined for non-overlapping communities", metric);
            }
            labels[node] = c;
        }
    }
    if labels.contains(&usize::MAX) {
        bail!("{} requires both clusterings to cover the same nodes", metric);
    }
    Ok(labels)
}
