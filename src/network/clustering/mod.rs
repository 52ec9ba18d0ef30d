// https://github.com/graphext/louvain-rs/tree/master
// Copyright 2018 Juan Morales (crispamares@gmail.com)
// Repository: https://github.com/graphext/louvain-rs/tree/master
// Licensed under the MIT License.
use rayon::prelude::*;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Above this many nodes the bookkeeping passes run on the rayon pool.
const PARALLEL_THRESHOLD: usize = 1000;

/// Assignment of the nodes of a network to groups (communities).
///
/// Group ids are dense after [`NetworkGrouping::normalize_groups`]: every id in
/// `0..group_count()` has at least one member.
pub trait NetworkGrouping: Debug + Send + Sync {
    /// Every node in its own group
    fn create_isolated(node_count: usize) -> Self;

    /// All nodes in group 0
    fn create_unified(node_count: usize) -> Self;

    /// Grouping from explicit assignments, normalized
    fn from_assignments(assignments: &[usize]) -> Self;

    /// Members of every group, ascending node order within a group
    fn get_group_members(&self) -> Vec<Vec<usize>>;

    fn get_group(&self, node: usize) -> usize;

    fn set_group(&mut self, node: usize, group: usize);

    fn node_count(&self) -> usize;

    fn group_count(&self) -> usize;

    /// Renumbers groups so no id is left empty
    fn normalize_groups(&mut self);

    /// Composes this grouping with a grouping of its groups, e.g. the
    /// grouping found on an aggregated network.
    fn merge<G: NetworkGrouping>(&mut self, arrangement: &G) {
        if self.node_count() > PARALLEL_THRESHOLD {
            let assignments: Vec<_> = (0..self.node_count())
                .into_par_iter()
                .map(|node| arrangement.get_group(self.get_group(node)))
                .collect();

            for (node, group) in assignments.into_iter().enumerate() {
                self.set_group(node, group);
            }
        } else {
            for node in 0..self.node_count() {
                let new_group = arrangement.get_group(self.get_group(node));
                self.set_group(node, new_group);
            }
        }
        self.normalize_groups();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VectorGrouping {
    assignments: Vec<usize>,
    group_count: usize,
}

impl VectorGrouping {
    pub fn assignments(&self) -> &[usize] {
        &self.assignments
    }

    pub fn into_assignments(self) -> Vec<usize> {
        self.assignments
    }

    /// Number of members of every group
    pub fn group_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.group_count];
        for &group in &self.assignments {
            sizes[group] += 1;
        }
        sizes
    }

    fn count_sizes(&self) -> Vec<usize> {
        if self.assignments.len() > PARALLEL_THRESHOLD {
            let sizes: Vec<_> = (0..self.group_count).map(|_| AtomicUsize::new(0)).collect();
            self.assignments.par_iter().for_each(|&group| {
                sizes[group].fetch_add(1, Ordering::Relaxed);
            });
            sizes.into_iter().map(AtomicUsize::into_inner).collect()
        } else {
            self.group_sizes()
        }
    }
}

impl NetworkGrouping for VectorGrouping {
    fn create_isolated(node_count: usize) -> Self {
        Self {
            assignments: (0..node_count).collect(),
            group_count: node_count,
        }
    }

    fn create_unified(node_count: usize) -> Self {
        Self {
            assignments: vec![0; node_count],
            group_count: usize::from(node_count > 0),
        }
    }

    /// Group ids may be arbitrary; they are renumbered densely in ascending
    /// order of the original id.
    fn from_assignments(input: &[usize]) -> Self {
        let mut distinct = input.to_vec();
        if input.len() > PARALLEL_THRESHOLD {
            distinct.par_sort_unstable();
        } else {
            distinct.sort_unstable();
        }
        distinct.dedup();

        let dense = |group: &usize| distinct.binary_search(group).unwrap_or_default();
        let assignments = if input.len() > PARALLEL_THRESHOLD {
            input.par_iter().map(dense).collect()
        } else {
            input.iter().map(dense).collect()
        };

        Self {
            assignments,
            group_count: distinct.len(),
        }
    }

    fn get_group_members(&self) -> Vec<Vec<usize>> {
        let mut groups = vec![Vec::new(); self.group_count];
        for (node, &group) in self.assignments.iter().enumerate() {
            groups[group].push(node);
        }
        groups
    }

    #[inline]
    fn get_group(&self, node: usize) -> usize {
        self.assignments[node]
    }

    #[inline]
    fn set_group(&mut self, node: usize, group: usize) {
        self.assignments[node] = group;
        self.group_count = self.group_count.max(group + 1);
    }

    #[inline]
    fn node_count(&self) -> usize {
        self.assignments.len()
    }

    #[inline]
    fn group_count(&self) -> usize {
        self.group_count
    }

    fn normalize_groups(&mut self) {
        let sizes = self.count_sizes();

        let mut new_ids = Vec::with_capacity(sizes.len());
        let mut next_id = 0;
        for size in sizes {
            if size == 0 {
                new_ids.push(usize::MAX);
            } else {
                new_ids.push(next_id);
                next_id += 1;
            }
        }

        if self.assignments.len() > PARALLEL_THRESHOLD {
            self.assignments
                .par_iter_mut()
                .for_each(|group| *group = new_ids[*group]);
        } else {
            for group in self.assignments.iter_mut() {
                *group = new_ids[*group];
            }
        }

        self.group_count = next_id;
    }
}
