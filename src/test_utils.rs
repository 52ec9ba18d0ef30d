//! Graph fixtures shared by the unit tests.

/// Zachary's karate club, nodes 0..34, 78 edges.
pub(crate) fn karate_club_edges() -> Vec<(usize, usize)> {
    let adjacency: &[(usize, &[usize])] = &[
        (0, &[1, 2, 3, 4, 5, 6, 7, 8, 10, 11, 12, 13, 17, 19, 21, 31]),
        (1, &[2, 3, 7, 13, 17, 19, 21, 30]),
        (2, &[3, 7, 8, 9, 13, 27, 28, 32]),
        (3, &[7, 12, 13]),
        (4, &[6, 10]),
        (5, &[6, 10, 16]),
        (6, &[16]),
        (8, &[30, 32, 33]),
        (9, &[33]),
        (13, &[33]),
        (14, &[32, 33]),
        (15, &[32, 33]),
        (18, &[32, 33]),
        (19, &[33]),
        (20, &[32, 33]),
        (22, &[32, 33]),
        (23, &[25, 27, 29, 32, 33]),
        (24, &[25, 27, 31]),
        (25, &[31]),
        (26, &[29, 33]),
        (27, &[33]),
        (28, &[31, 33]),
        (29, &[32, 33]),
        (30, &[32, 33]),
        (31, &[32, 33]),
        (32, &[33]),
    ];
    adjacency
        .iter()
        .flat_map(|&(source, targets)| targets.iter().map(move |&target| (source, target)))
        .collect()
}

/// `n_cliques` complete graphs of `clique_size` nodes, consecutive cliques
/// joined by a single edge into a ring. Clique `k` holds nodes
/// `k * clique_size..(k + 1) * clique_size`.
pub(crate) fn ring_of_cliques(n_cliques: usize, clique_size: usize) -> Vec<(usize, usize)> {
    let mut edges = Vec::new();
    for clique in 0..n_cliques {
        let offset = clique * clique_size;
        for a in 0..clique_size {
            for b in (a + 1)..clique_size {
                edges.push((offset + a, offset + b));
            }
        }
    }
    if n_cliques > 1 {
        for clique in 0..n_cliques {
            let next = (clique + 1) % n_cliques;
            if n_cliques == 2 && clique == 1 {
                break;
            }
            edges.push((clique * clique_size + clique_size - 1, next * clique_size));
        }
    }
    edges
}

#[test]
fn test_fixture_sizes() {
    assert_eq!(karate_club_edges().len(), 78);
    assert_eq!(ring_of_cliques(4, 5).len(), 4 * 10 + 4);
}
