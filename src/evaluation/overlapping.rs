//! Metrics that accept overlapping communities.
//!
//! - Collins & Dent (1988). Omega: a general formulation of the Rand index
//!   of cluster recovery suitable for non-disjoint solutions.
//! - Lancichinetti, Fortunato & Kertész (2009). Detecting the overlapping and
//!   hierarchical community structure in complex networks.
//! - McDaid, Greene & Hurley (2011). Normalized mutual information to evaluate
//!   overlapping community finding algorithms.

use super::{IndexedCovers, PARALLEL_THRESHOLD};
use crate::community::NodeClustering;
use crate::utils::{entropy_term, NodeLabel};
use ahash::AHashMap;
use rayon::prelude::*;

/// Distribution of the number of communities shared by node pairs.
#[derive(Debug, Default)]
struct PairCounts {
    first: AHashMap<usize, u64>,
    second: AHashMap<usize, u64>,
    agreements: u64,
}

impl PairCounts {
    fn add(&mut self, shared_first: usize, shared_second: usize) {
        *self.first.entry(shared_first).or_insert(0) += 1;
        *self.second.entry(shared_second).or_insert(0) += 1;
        if shared_first == shared_second {
            self.agreements += 1;
        }
    }

    fn merge(mut self, other: PairCounts) -> PairCounts {
        for (k, v) in other.first {
            *self.first.entry(k).or_insert(0) += v;
        }
        for (k, v) in other.second {
            *self.second.entry(k).or_insert(0) += v;
        }
        self.agreements += other.agreements;
        self
    }
}

/// Community ids of every node, ascending.
fn memberships(communities: &[Vec<usize>], node_count: usize) -> Vec<Vec<usize>> {
    let mut result = vec![Vec::new(); node_count];
    for (c, members) in communities.iter().enumerate() {
        for &node in members {
            result[node].push(c);
        }
    }
    result
}

/// Size of the intersection of two ascending lists.
fn shared(a: &[usize], b: &[usize]) -> usize {
    let (mut i, mut j, mut count) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                count += 1;
                i += 1;
                j += 1;
            }
        }
    }
    count
}

/// Omega index: agreement on how many communities each node pair shares,
/// corrected for chance. Negative values are reported as 0.
pub fn omega<L: NodeLabel>(
    first: &NodeClustering<L>,
    second: &NodeClustering<L>,
) -> anyhow::Result<f64> {
    let covers = IndexedCovers::new(first, second)?;
    let n = covers.node_count;
    if n < 2 {
        return Ok(1.0);
    }

    let first_of = memberships(&covers.first, n);
    let second_of = memberships(&covers.second, n);
    let count_row = |mut counts: PairCounts, u: usize| {
        for v in (u + 1)..n {
            counts.add(
                shared(&first_of[u], &first_of[v]),
                shared(&second_of[u], &second_of[v]),
            );
        }
        counts
    };

    let counts = if n > PARALLEL_THRESHOLD {
        (0..n)
            .into_par_iter()
            .fold(PairCounts::default, count_row)
            .reduce(PairCounts::default, PairCounts::merge)
    } else {
        (0..n).fold(PairCounts::default(), count_row)
    };

    let total_pairs = (n * (n - 1) / 2) as f64;
    let observed = counts.agreements as f64 / total_pairs;
    let expected: f64 = counts
        .first
        .iter()
        .map(|(shared, &count)| {
            let other = counts.second.get(shared).copied().unwrap_or(0);
            count as f64 * other as f64
        })
        .sum::<f64>()
        / (total_pairs * total_pairs);

    if (1.0 - expected).abs() < f64::EPSILON {
        return Ok(1.0);
    }
    Ok(((observed - expected) / (1.0 - expected)).max(0.0))
}

/// Entropy of the membership indicator of a community of `size` nodes.
fn community_entropy(size: f64, n: f64) -> f64 {
    let p = size / n;
    entropy_term(p) + entropy_term(1.0 - p)
}

/// Conditional entropies of every community of one cover given the other.
struct CoverEntropies {
    /// `H(X_k)`
    own: Vec<f64>,
    /// `H(X_k | Y)`, the best admissible `H(X_k | Y_l)`
    conditional: Vec<f64>,
}

fn cover_entropies(x: &[Vec<usize>], y: &[Vec<usize>], node_count: usize) -> CoverEntropies {
    let n = node_count as f64;
    let y_of = memberships(y, node_count);
    let y_entropy: Vec<f64> = y.iter().map(|c| community_entropy(c.len() as f64, n)).collect();

    let mut own = Vec::with_capacity(x.len());
    let mut conditional = Vec::with_capacity(x.len());
    let mut overlap = vec![0.0; y.len()];

    for community in x {
        overlap.iter_mut().for_each(|o| *o = 0.0);
        for &node in community {
            for &l in &y_of[node] {
                overlap[l] += 1.0;
            }
        }

        let size_x = community.len() as f64;
        let h_x = community_entropy(size_x, n);
        let mut best = h_x;
        for (l, other) in y.iter().enumerate() {
            let size_y = other.len() as f64;
            let both = overlap[l];
            let h_neither = entropy_term((n - size_x - size_y + both) / n);
            let h_only_y = entropy_term((size_y - both) / n);
            let h_only_x = entropy_term((size_x - both) / n);
            let h_both = entropy_term(both / n);

            // pairs that are more different than alike carry no information
            if h_neither + h_both < h_only_y + h_only_x {
                continue;
            }
            let h_conditional = h_neither + h_only_y + h_only_x + h_both - y_entropy[l];
            best = best.min(h_conditional);
        }

        own.push(h_x);
        conditional.push(best.max(0.0));
    }

    CoverEntropies { own, conditional }
}

/// Overlapping NMI in the Lancichinetti-Fortunato-Kertész formulation.
pub fn overlapping_normalized_mutual_information_lfk<L: NodeLabel>(
    first: &NodeClustering<L>,
    second: &NodeClustering<L>,
) -> anyhow::Result<f64> {
    let covers = IndexedCovers::new(first, second)?;
    let n = covers.node_count;

    let normalized = |entropies: CoverEntropies| -> f64 {
        let ratios: f64 = entropies
            .own
            .iter()
            .zip(&entropies.conditional)
            .map(|(&h, &h_cond)| if h > 0.0 { h_cond / h } else { 0.0 })
            .sum();
        ratios / entropies.own.len() as f64
    };

    let x_given_y = normalized(cover_entropies(&covers.first, &covers.second, n));
    let y_given_x = normalized(cover_entropies(&covers.second, &covers.first, n));
    Ok((1.0 - (x_given_y + y_given_x) / 2.0).clamp(0.0, 1.0))
}

/// Overlapping NMI in the McDaid-Greene-Hurley formulation, normalized by
/// the larger of the two cover entropies.
pub fn overlapping_normalized_mutual_information_mgh<L: NodeLabel>(
    first: &NodeClustering<L>,
    second: &NodeClustering<L>,
) -> anyhow::Result<f64> {
    let covers = IndexedCovers::new(first, second)?;
    let n = covers.node_count;

    let x = cover_entropies(&covers.first, &covers.second, n);
    let y = cover_entropies(&covers.second, &covers.first, n);
    let h_x: f64 = x.own.iter().sum();
    let h_y: f64 = y.own.iter().sum();
    let h_x_given_y: f64 = x.conditional.iter().sum();
    let h_y_given_x: f64 = y.conditional.iter().sum();

    let normalizer = h_x.max(h_y);
    if normalizer <= 0.0 {
        return Ok(1.0);
    }
    let mutual_information = 0.5 * (h_x - h_x_given_y + h_y - h_y_given_x);
    Ok((mutual_information / normalizer).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn clustering(communities: Vec<Vec<u32>>) -> NodeClustering<u32> {
        NodeClustering::from_communities(communities)
    }

    #[test]
    fn test_shared() {
        assert_eq!(shared(&[0, 2, 5], &[1, 2, 5, 7]), 2);
        assert_eq!(shared(&[], &[1]), 0);
    }

    #[test]
    fn test_omega_identical_covers() {
        let cover = clustering(vec![vec![0, 1, 2], vec![2, 3, 4], vec![5, 6]]);
        assert_relative_eq!(omega(&cover, &cover).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_omega_partial_agreement() {
        let a = clustering(vec![vec![0, 1, 2], vec![3, 4, 5]]);
        let b = clustering(vec![vec![0, 1], vec![2, 3], vec![4, 5]]);
        let score = omega(&a, &b).unwrap();
        assert!(score > 0.0 && score < 1.0, "omega {}", score);
    }

    #[test]
    fn test_omega_parallel_matches_expectation() {
        // 1200 nodes in blocks of 100 against blocks of 50
        let a = clustering((0..12).map(|b| (b * 100..(b + 1) * 100).collect()).collect());
        let b = clustering((0..24).map(|b| (b * 50..(b + 1) * 50).collect()).collect());
        let score = omega(&a, &b).unwrap();
        assert!(score > 0.5 && score < 1.0, "omega {}", score);
        assert_relative_eq!(score, omega(&b, &a).unwrap(), epsilon = 1e-12);
    }

    #[test]
    fn test_onmi_identical_covers() {
        let cover = clustering(vec![vec![0, 1, 2], vec![2, 3, 4], vec![5, 6, 7]]);
        assert_relative_eq!(
            overlapping_normalized_mutual_information_lfk(&cover, &cover).unwrap(),
            1.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            overlapping_normalized_mutual_information_mgh(&cover, &cover).unwrap(),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_onmi_is_symmetric_and_bounded() {
        let a = clustering(vec![vec![0, 1, 2, 3], vec![3, 4, 5], vec![6, 7]]);
        let b = clustering(vec![vec![0, 1], vec![2, 3, 4, 5], vec![5, 6, 7]]);

        let lfk = overlapping_normalized_mutual_information_lfk(&a, &b).unwrap();
        let mgh = overlapping_normalized_mutual_information_mgh(&a, &b).unwrap();
        assert!((0.0..1.0).contains(&lfk));
        assert!((0.0..1.0).contains(&mgh));
        assert_relative_eq!(
            lfk,
            overlapping_normalized_mutual_information_lfk(&b, &a).unwrap(),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            mgh,
            overlapping_normalized_mutual_information_mgh(&b, &a).unwrap(),
            epsilon = 1e-12
        );
    }
}
