//! Maximal clique enumeration.
//!
//! [`TomitaAlgorithm`] is Bron-Kerbosch with Tomita pivoting, run without
//! recursion. Each level of the search tree is a frame on an explicit
//! stack, which bounds the depth by the maximum clique size and lets the
//! cancellation token be polled before every expansion step. The search is
//! lazy: cliques are produced one at a time as the caller pulls them.
//!
//! The engine knows nothing about items or rules. Vertices are small unsigned
//! integers, and the caller picks the narrowest [`Vertex`] width that can
//! index its graph.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use crate::cancel::CancelToken;
use crate::error::{BasketError, Result};
use crate::item::ItemHasher;

/// An unsigned integer usable as a dense vertex id.
pub trait Vertex: Copy + Eq + Hash + Ord + Debug + Send + Sync + 'static {
    /// Number of distinct vertices the type can index.
    const CAPACITY: usize;
    const BITS: u32;
    fn from_index(index: usize) -> Option<Self>;
    fn index(self) -> usize;
}

macro_rules! vertex_width {
    ($($t:ty),*) => {
        $(
            impl Vertex for $t {
                const CAPACITY: usize = (<$t>::MAX as usize).saturating_add(1);
                const BITS: u32 = <$t>::BITS;
                fn from_index(index: usize) -> Option<Self> {
                    <$t>::try_from(index).ok()
                }
                fn index(self) -> usize {
                    self as usize
                }
            }
        )*
    };
}
vertex_width!(u8, u16, u32);

pub type Neighbors<V> = HashSet<V, ItemHasher>;
/// Undirected graph as a symmetric adjacency list. Every vertex has a key,
/// possibly with an empty neighbor set.
pub type Adjacency<V> = HashMap<V, Neighbors<V>, ItemHasher>;

// ------------- MaximalClique -------------
/// A clique that no further vertex can extend. Vertices are kept sorted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MaximalClique<V: Vertex> {
    vertices: Vec<V>,
}

impl<V: Vertex> MaximalClique<V> {
    fn new(mut vertices: Vec<V>) -> Self {
        vertices.sort_unstable();
        Self { vertices }
    }
    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }
    pub fn size(&self) -> usize {
        self.vertices.len()
    }
    pub fn contains(&self, vertex: V) -> bool {
        self.vertices.binary_search(&vertex).is_ok()
    }
}

/// Enumerates the maximal cliques of a graph whose size lies in
/// `min_size..=max_size`.
pub trait MaximalCliqueAlgorithm: Send + Sync {
    type Search<'a, V: Vertex>: Iterator<Item = Result<MaximalClique<V>>> + 'a;

    fn find<'a, V: Vertex>(
        &self,
        adjacency: &'a Adjacency<V>,
        min_size: usize,
        max_size: usize,
        token: &'a CancelToken,
    ) -> Result<Self::Search<'a, V>>;
}

// ------------- TomitaAlgorithm -------------
#[derive(Debug, Default, Clone, Copy)]
pub struct TomitaAlgorithm;

impl MaximalCliqueAlgorithm for TomitaAlgorithm {
    type Search<'a, V: Vertex> = TomitaSearch<'a, V>;

    fn find<'a, V: Vertex>(
        &self,
        adjacency: &'a Adjacency<V>,
        min_size: usize,
        max_size: usize,
        token: &'a CancelToken,
    ) -> Result<TomitaSearch<'a, V>> {
        if min_size == 0 {
            return Err(BasketError::invalid_argument(
                "min_size",
                "minimum clique size must be greater than zero",
            ));
        }
        if max_size < min_size {
            return Err(BasketError::invalid_argument(
                "max_size",
                format!("maximum clique size {max_size} is less than the minimum {min_size}"),
            ));
        }
        token.check()?;
        Ok(TomitaSearch::new(adjacency, min_size, max_size, token))
    }
}

struct Frame<V: Vertex> {
    clique: Vec<V>,
    candidates: Neighbors<V>,
    excluded: Neighbors<V>,
    // candidates not adjacent to the pivot, in the order they are expanded
    expansion: Vec<V>,
    next: usize,
}

impl<V: Vertex> Frame<V> {
    fn new(adjacency: &Adjacency<V>, clique: Vec<V>, candidates: Neighbors<V>, excluded: Neighbors<V>) -> Self {
        let expansion = expansion_order(adjacency, &candidates, &excluded);
        Self {
            clique,
            candidates,
            excluded,
            expansion,
            next: 0,
        }
    }
}

/// Picks the pivot in `candidates ∪ excluded` with the most neighbors among the
/// candidates and returns the candidates outside its neighborhood.
fn expansion_order<V: Vertex>(adjacency: &Adjacency<V>, candidates: &Neighbors<V>, excluded: &Neighbors<V>) -> Vec<V> {
    let pivot = candidates
        .iter()
        .chain(excluded.iter())
        .filter_map(|&u| {
            let neighbors = adjacency.get(&u)?;
            let overlap = candidates.iter().filter(|c| neighbors.contains(c)).count();
            (overlap > 0).then_some((overlap, std::cmp::Reverse(u)))
        })
        .max()
        .map(|(_, std::cmp::Reverse(u))| u);

    let mut order: Vec<V> = match pivot.and_then(|u| adjacency.get(&u)) {
        Some(pivot_neighbors) => candidates.iter().copied().filter(|c| !pivot_neighbors.contains(c)).collect(),
        None => candidates.iter().copied().collect(),
    };
    order.sort_unstable();
    order
}

pub struct TomitaSearch<'a, V: Vertex> {
    adjacency: &'a Adjacency<V>,
    min_size: usize,
    max_size: usize,
    token: &'a CancelToken,
    stack: Vec<Frame<V>>,
    finished: bool,
}

impl<'a, V: Vertex> TomitaSearch<'a, V> {
    fn new(adjacency: &'a Adjacency<V>, min_size: usize, max_size: usize, token: &'a CancelToken) -> Self {
        let candidates: Neighbors<V> = adjacency.keys().copied().collect();
        let root = Frame::new(adjacency, Vec::new(), candidates, Neighbors::default());
        Self {
            adjacency,
            min_size,
            max_size,
            token,
            stack: vec![root],
            finished: false,
        }
    }
}

impl<V: Vertex> Iterator for TomitaSearch<'_, V> {
    type Item = Result<MaximalClique<V>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            if let Err(e) = self.token.check() {
                self.finished = true;
                self.stack.clear();
                return Some(Err(e));
            }
            let Some(frame) = self.stack.last_mut() else {
                self.finished = true;
                return None;
            };
            let Some(&vertex) = frame.expansion.get(frame.next) else {
                self.stack.pop();
                continue;
            };
            frame.next += 1;

            let empty = Neighbors::default();
            let neighbors = self.adjacency.get(&vertex).unwrap_or(&empty);
            let adjacent = |u: &&V| **u != vertex && neighbors.contains(*u);
            let candidates: Neighbors<V> = frame.candidates.iter().filter(adjacent).copied().collect();
            let excluded: Neighbors<V> = frame.excluded.iter().filter(adjacent).copied().collect();
            let mut clique = Vec::with_capacity(frame.clique.len() + 1);
            clique.extend_from_slice(&frame.clique);
            clique.push(vertex);

            // later siblings must not report cliques through this vertex again
            frame.candidates.remove(&vertex);
            frame.excluded.insert(vertex);

            if candidates.is_empty() {
                if excluded.is_empty() && clique.len() >= self.min_size {
                    return Some(Ok(MaximalClique::new(clique)));
                }
            } else if clique.len() < self.max_size {
                let child = Frame::new(self.adjacency, clique, candidates, excluded);
                self.stack.push(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(u8, u8)], isolated: &[u8]) -> Adjacency<u8> {
        let mut adjacency = Adjacency::default();
        for &v in isolated {
            adjacency.entry(v).or_default();
        }
        for &(a, b) in edges {
            adjacency.entry(a).or_default().insert(b);
            adjacency.entry(b).or_default().insert(a);
        }
        adjacency
    }

    fn cliques(adjacency: &Adjacency<u8>, min: usize, max: usize) -> Vec<Vec<u8>> {
        let token = CancelToken::new();
        let mut found: Vec<Vec<u8>> = TomitaAlgorithm
            .find(adjacency, min, max, &token)
            .expect("valid bounds")
            .map(|clique| clique.expect("not cancelled").vertices().to_vec())
            .collect();
        found.sort();
        found
    }

    #[test]
    fn complete_graph_is_one_clique() {
        let adjacency = graph(&[(1, 2), (1, 3), (1, 4), (2, 3), (2, 4), (3, 4)], &[]);
        assert_eq!(cliques(&adjacency, 1, 4), vec![vec![1, 2, 3, 4]]);
    }

    #[test]
    fn triangle_and_separate_edge() {
        let adjacency = graph(&[(1, 2), (2, 3), (1, 3), (4, 5)], &[]);
        assert_eq!(cliques(&adjacency, 2, 3), vec![vec![1, 2, 3], vec![4, 5]]);
        assert_eq!(cliques(&adjacency, 3, 3), vec![vec![1, 2, 3]]);
        assert_eq!(cliques(&adjacency, 2, 2), vec![vec![4, 5]]);
    }

    #[test]
    fn overlapping_triangles() {
        let adjacency = graph(&[(1, 2), (1, 3), (2, 3), (2, 4), (3, 4)], &[]);
        assert_eq!(cliques(&adjacency, 3, 3), vec![vec![1, 2, 3], vec![2, 3, 4]]);
    }

    #[test]
    fn square_has_four_edge_cliques() {
        let adjacency = graph(&[(1, 2), (2, 3), (3, 4), (4, 1)], &[]);
        assert_eq!(
            cliques(&adjacency, 2, 2),
            vec![vec![1, 2], vec![1, 4], vec![2, 3], vec![3, 4]]
        );
    }

    #[test]
    fn clique_larger_than_maximum_is_not_reported() {
        let adjacency = graph(&[(1, 2), (1, 3), (1, 4), (2, 3), (2, 4), (3, 4)], &[]);
        assert!(cliques(&adjacency, 2, 3).is_empty());
    }

    #[test]
    fn isolated_vertices_are_cliques_of_one() {
        let adjacency = graph(&[(1, 2)], &[7]);
        assert_eq!(cliques(&adjacency, 1, 2), vec![vec![1, 2], vec![7]]);
        assert_eq!(cliques(&adjacency, 2, 2), vec![vec![1, 2]]);
    }

    #[test]
    fn empty_graph_has_no_cliques() {
        assert!(cliques(&Adjacency::default(), 1, 5).is_empty());
    }

    #[test]
    fn bounds_are_validated() {
        let token = CancelToken::new();
        let adjacency: Adjacency<u8> = Adjacency::default();
        assert!(TomitaAlgorithm.find(&adjacency, 0, 3, &token).is_err());
        assert!(TomitaAlgorithm.find(&adjacency, 3, 2, &token).is_err());
    }

    #[test]
    fn cancelled_before_start() {
        let token = CancelToken::new();
        token.cancel();
        let adjacency = graph(&[(1, 2)], &[]);
        let outcome = TomitaAlgorithm.find(&adjacency, 1, 2, &token).map(|_| ());
        assert!(matches!(outcome, Err(BasketError::Cancelled)));
    }

    #[test]
    fn cancelled_while_iterating() {
        let token = CancelToken::new();
        let adjacency = graph(&[(1, 2), (3, 4), (5, 6)], &[]);
        let mut search = TomitaAlgorithm.find(&adjacency, 2, 2, &token).expect("valid bounds");
        assert!(matches!(search.next(), Some(Ok(_))));
        token.cancel();
        assert!(matches!(search.next(), Some(Err(BasketError::Cancelled))));
        assert!(search.next().is_none());
    }

    #[test]
    fn vertex_widths() {
        assert_eq!(<u8 as Vertex>::CAPACITY, 256);
        assert_eq!(<u16 as Vertex>::CAPACITY, 65_536);
        assert_eq!(u8::from_index(255), Some(255));
        assert_eq!(u8::from_index(256), None);
        assert_eq!(Vertex::index(40_000u16), 40_000);
    }
}
