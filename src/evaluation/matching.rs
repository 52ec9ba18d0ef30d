//! Best-match F1 between the communities of a prediction and a ground truth.
//!
//! Rossetti, Pappalardo & Rinzivillo (2016). A novel approach to evaluate
//! community detection algorithms on ground truth.

use super::{IndexedCovers, MatchingResult};
use crate::community::NodeClustering;
use crate::utils::NodeLabel;
use ahash::AHashMap;
use statrs::statistics::Statistics;

/// Best F1 of every predicted community and the ground truth community it
/// was reached with; `None` when the community shares no node with any.
fn best_matches(covers: &IndexedCovers) -> Vec<Option<(usize, f64)>> {
    let mut truth_of: Vec<Vec<usize>> = vec![Vec::new(); covers.node_count];
    for (g, members) in covers.second.iter().enumerate() {
        for &node in members {
            truth_of[node].push(g);
        }
    }

    covers
        .first
        .iter()
        .map(|predicted| {
            let mut overlap: AHashMap<usize, f64> = AHashMap::new();
            for &node in predicted {
                for &g in &truth_of[node] {
                    *overlap.entry(g).or_insert(0.0) += 1.0;
                }
            }
            let mut candidates: Vec<(usize, f64)> = overlap
                .into_iter()
                .map(|(g, shared)| {
                    let size = (predicted.len() + covers.second[g].len()) as f64;
                    (g, 2.0 * shared / size)
                })
                .collect();
            // lowest truth id wins ties
            candidates.sort_unstable_by_key(|&(g, _)| g);
            candidates
                .into_iter()
                .fold(None, |best: Option<(usize, f64)>, (g, f1)| match best {
                    Some((_, best_f1)) if best_f1 >= f1 => best,
                    _ => Some((g, f1)),
                })
        })
        .collect()
}

/// Mean and population standard deviation over the predicted communities
/// (`first`) of the best F1 against the ground truth (`second`).
pub fn f1<L: NodeLabel>(
    first: &NodeClustering<L>,
    second: &NodeClustering<L>,
) -> anyhow::Result<MatchingResult> {
    let covers = IndexedCovers::new(first, second)?;
    let scores: Vec<f64> = best_matches(&covers)
        .into_iter()
        .map(|best| best.map_or(0.0, |(_, f1)| f1))
        .collect();

    Ok(MatchingResult {
        score: scores.iter().mean(),
        std: scores.iter().population_std_dev(),
    })
}

/// Normalized F1: mean F1 of the matched predicted communities, scaled by
/// the share of ground truth communities matched and divided by how many
/// predicted communities share a match.
pub fn nf1<L: NodeLabel>(
    first: &NodeClustering<L>,
    second: &NodeClustering<L>,
) -> anyhow::Result<f64> {
    let covers = IndexedCovers::new(first, second)?;
    let matches: Vec<(usize, f64)> = best_matches(&covers).into_iter().flatten().collect();
    if matches.is_empty() {
        return Ok(0.0);
    }

    let mut matched_truth: Vec<usize> = matches.iter().map(|&(g, _)| g).collect();
    matched_truth.sort_unstable();
    matched_truth.dedup();

    let mean_f1 = matches.iter().map(|&(_, f1)| f1).mean();
    let coverage = matched_truth.len() as f64 / covers.second.len() as f64;
    let redundancy = matches.len() as f64 / matched_truth.len() as f64;
    Ok((mean_f1 * coverage / redundancy).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn clustering(communities: Vec<Vec<u32>>) -> NodeClustering<u32> {
        NodeClustering::from_communities(communities)
    }

    #[test]
    fn test_f1_split_community() {
        let truth = clustering(vec![vec![0, 1, 2, 3]]);
        let predicted = clustering(vec![vec![0, 1], vec![2, 3]]);
        // each half: 2 * 2 / (2 + 4)
        let result = f1(&predicted, &truth).unwrap();
        assert_relative_eq!(result.score, 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(result.std, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_f1_unmatched_community_scores_zero() {
        let truth = clustering(vec![vec![0, 1]]);
        let predicted = clustering(vec![vec![0, 1], vec![5, 6]]);
        let result = f1(&predicted, &truth).unwrap();
        assert_relative_eq!(result.score, 0.5, epsilon = 1e-12);
        assert_relative_eq!(result.std, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_nf1_penalizes_redundancy_and_coverage() {
        let truth = clustering(vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7]]);
        let predicted = clustering(vec![vec![0, 1], vec![2, 3]]);
        // mean F1 2/3, coverage 1/2, redundancy 2
        assert_relative_eq!(nf1(&predicted, &truth).unwrap(), 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_nf1_without_matches() {
        let truth = clustering(vec![vec![0, 1]]);
        let predicted = clustering(vec![vec![2, 3]]);
        assert_relative_eq!(nf1(&predicted, &truth).unwrap(), 0.0);
    }
}
