use std::fmt::Debug;
use std::hash::Hash;

pub trait ZeroVec {
    fn zero_len(&mut self, len: usize);
}

impl<T: Default + Clone> ZeroVec for Vec<T> {
    fn zero_len(&mut self, len: usize) {
        self.clear();
        self.reserve(len);
        self.extend(std::iter::repeat_n(T::default(), len));
    }
}

/// Trait for types that can be used to identify nodes of a graph
pub trait NodeLabel: Clone + Eq + Hash + Ord + Debug + Send + Sync {}

// Implement NodeLabel for common types
impl NodeLabel for String {}
impl NodeLabel for &'static str {}
impl NodeLabel for i32 {}
impl NodeLabel for i64 {}
impl NodeLabel for u32 {}
impl NodeLabel for u64 {}
impl NodeLabel for usize {}

/// `-x * ln(x)` with the usual `0 * ln(0) = 0` convention.
#[inline]
pub(crate) fn entropy_term(p: f64) -> f64 {
    if p > 0.0 {
        -p * p.ln()
    } else {
        0.0
    }
}

/// Shannon entropy (natural log) of a distribution given by counts.
pub(crate) fn entropy_from_counts<I>(counts: I, total: f64) -> f64
where
    I: IntoIterator<Item = f64>,
{
    if total <= 0.0 {
        return 0.0;
    }
    counts.into_iter().map(|c| entropy_term(c / total)).sum()
}

/// Binary Kullback-Leibler divergence `D(q || p)`.
pub(crate) fn binary_kl(q: f64, p: f64) -> f64 {
    let mut kl = 0.0;
    if q > 0.0 && p > 0.0 {
        kl += q * (q / p).ln();
    }
    if q < 1.0 && p < 1.0 {
        kl += (1.0 - q) * ((1.0 - q) / (1.0 - p)).ln();
    }
    kl
}
