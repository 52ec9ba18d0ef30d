//! Metrics over two partitions of the same nodes, computed from their
//! contingency table.
//!
//! - Vinh, Epps & Bailey (2010). Information theoretic measures for
//!   clusterings comparison. JMLR 11.
//! - Hubert & Arabie (1985). Comparing partitions. Journal of Classification 2.
//! - Meilă (2007). Comparing clusterings: an information based distance.

use super::IndexedCovers;
use crate::community::NodeClustering;
use crate::utils::{entropy_from_counts, NodeLabel};
use ahash::AHashMap;
use statrs::function::gamma::ln_gamma;

/// Denominators of the adjusted scores are kept at least this far from 0.
const EPS: f64 = f64::EPSILON;

/// Joint counts of two labelings.
struct Contingency {
    n: f64,
    rows: Vec<f64>,
    cols: Vec<f64>,
    cells: AHashMap<(usize, usize), f64>,
}

impl Contingency {
    fn new(first: &[usize], second: &[usize]) -> Self {
        let n_rows = first.iter().max().map_or(0, |m| m + 1);
        let n_cols = second.iter().max().map_or(0, |m| m + 1);
        let mut rows = vec![0.0; n_rows];
        let mut cols = vec![0.0; n_cols];
        let mut cells = AHashMap::new();
        for (&a, &b) in first.iter().zip(second) {
            rows[a] += 1.0;
            cols[b] += 1.0;
            *cells.entry((a, b)).or_insert(0.0) += 1.0;
        }
        Contingency {
            n: first.len() as f64,
            rows,
            cols,
            cells,
        }
    }

    fn row_count(&self) -> usize {
        self.rows.iter().filter(|&&r| r > 0.0).count()
    }

    fn col_count(&self) -> usize {
        self.cols.iter().filter(|&&c| c > 0.0).count()
    }

    /// Both sides a single cluster, the case where every score is perfect.
    fn trivially_equal(&self) -> bool {
        self.row_count() == self.col_count() && self.row_count() <= 1
    }

    fn mutual_information(&self) -> f64 {
        let mi: f64 = self
            .cells
            .iter()
            .map(|(&(i, j), &nij)| {
                nij / self.n * (self.n * nij / (self.rows[i] * self.cols[j])).ln()
            })
            .sum();
        mi.max(0.0)
    }

    fn entropies(&self) -> (f64, f64) {
        (
            entropy_from_counts(self.rows.iter().copied(), self.n),
            entropy_from_counts(self.cols.iter().copied(), self.n),
        )
    }

    /// Expected mutual information of two random labelings with these
    /// marginals (hypergeometric model).
    fn expected_mutual_information(&self) -> f64 {
        let n = self.n;
        let ln_n_fact = ln_gamma(n + 1.0);
        let mut emi = 0.0;

        for &a in self.rows.iter().filter(|&&a| a > 0.0) {
            for &b in self.cols.iter().filter(|&&b| b > 0.0) {
                let start = (a + b - n).max(1.0);
                let end = a.min(b);
                let fixed = ln_gamma(a + 1.0) + ln_gamma(b + 1.0) + ln_gamma(n - a + 1.0)
                    + ln_gamma(n - b + 1.0)
                    - ln_n_fact;

                let mut nij = start;
                while nij <= end {
                    let term = nij / n * (n * nij / (a * b)).ln();
                    let log_prob = fixed
                        - ln_gamma(nij + 1.0)
                        - ln_gamma(a - nij + 1.0)
                        - ln_gamma(b - nij + 1.0)
                        - ln_gamma(n - a - b + nij + 1.0);
                    emi += term * log_prob.exp();
                    nij += 1.0;
                }
            }
        }
        emi
    }
}

fn pairs(count: f64) -> f64 {
    count * (count - 1.0) / 2.0
}

fn contingency<L: NodeLabel>(
    first: &NodeClustering<L>,
    second: &NodeClustering<L>,
    metric: &str,
) -> anyhow::Result<Contingency> {
    let covers = IndexedCovers::new(first, second)?;
    let (a, b) = covers.labels(metric)?;
    Ok(Contingency::new(&a, &b))
}

/// Mutual information normalized by the arithmetic mean of both entropies.
pub fn normalized_mutual_information<L: NodeLabel>(
    first: &NodeClustering<L>,
    second: &NodeClustering<L>,
) -> anyhow::Result<f64> {
    let table = contingency(first, second, "NMI")?;
    if table.trivially_equal() {
        return Ok(1.0);
    }
    let mi = table.mutual_information();
    if mi <= 0.0 {
        return Ok(0.0);
    }
    let (h_first, h_second) = table.entropies();
    let normalizer = (h_first + h_second) / 2.0;
    Ok((mi / normalizer).clamp(0.0, 1.0))
}

/// Mutual information adjusted for chance, arithmetic normalization.
pub fn adjusted_mutual_information<L: NodeLabel>(
    first: &NodeClustering<L>,
    second: &NodeClustering<L>,
) -> anyhow::Result<f64> {
    let table = contingency(first, second, "AMI")?;
    if table.trivially_equal() {
        return Ok(1.0);
    }
    let mi = table.mutual_information();
    let emi = table.expected_mutual_information();
    let (h_first, h_second) = table.entropies();
    let normalizer = (h_first + h_second) / 2.0;

    let denominator = normalizer - emi;
    let denominator = if denominator < 0.0 {
        denominator.min(-EPS)
    } else {
        denominator.max(EPS)
    };
    Ok((mi - emi) / denominator)
}

/// Hubert-Arabie adjusted Rand index.
pub fn adjusted_rand_index<L: NodeLabel>(
    first: &NodeClustering<L>,
    second: &NodeClustering<L>,
) -> anyhow::Result<f64> {
    let table = contingency(first, second, "ARI")?;
    let n = table.n as usize;
    if table.trivially_equal() || (table.row_count() == n && table.col_count() == n) {
        return Ok(1.0);
    }

    let sum_cells: f64 = table.cells.values().map(|&c| pairs(c)).sum();
    let sum_rows: f64 = table.rows.iter().map(|&r| pairs(r)).sum();
    let sum_cols: f64 = table.cols.iter().map(|&c| pairs(c)).sum();
    let total = pairs(table.n);

    let expected = sum_rows * sum_cols / total;
    let max_index = (sum_rows + sum_cols) / 2.0;
    if (max_index - expected).abs() < f64::EPSILON {
        return Ok(1.0);
    }
    Ok((sum_cells - expected) / (max_index - expected))
}

/// `H(X|Y) + H(Y|X)` in nats, computed from the community intersections.
/// Accepts any two clusterings; for partitions of `n` nodes the result lies
/// in `[0, ln n]`.
pub fn variation_of_information<L: NodeLabel>(
    first: &NodeClustering<L>,
    second: &NodeClustering<L>,
) -> anyhow::Result<f64> {
    let covers = IndexedCovers::new(first, second)?;
    let n: f64 = covers.first.iter().map(|c| c.len() as f64).sum();

    let mut membership: AHashMap<usize, Vec<usize>> = AHashMap::new();
    for (c, members) in covers.second.iter().enumerate() {
        for &node in members {
            membership.entry(node).or_default().push(c);
        }
    }

    let mut sigma = 0.0;
    for members in &covers.first {
        let p = members.len() as f64 / n;
        let mut intersections: AHashMap<usize, f64> = AHashMap::new();
        for node in members {
            for &c in membership.get(node).into_iter().flatten() {
                *intersections.entry(c).or_insert(0.0) += 1.0;
            }
        }
        for (c, count) in intersections {
            let q = covers.second[c].len() as f64 / n;
            let r = count / n;
            sigma += r * ((r / p).ln() + (r / q).ln());
        }
    }
    Ok(sigma.abs())
}
