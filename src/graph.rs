//! Directed graph over opaque keys, used for classical result propagation.
//!
//! An edge A→B records "if A's eventual measured result is true, flip B's
//! recorded result". The graph must stay acyclic; ordering the flips is a
//! plain topological sort with ties broken by the key order so simulation is
//! deterministic.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};

/// A directed graph over `Ord` keys with set-valued adjacency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectedGraph<K: Ord + Copy> {
    out_edges: BTreeMap<K, BTreeSet<K>>,
}

// Manual impl so keys without `Default` (coordinates, events) still work.
impl<K: Ord + Copy> Default for DirectedGraph<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Copy> DirectedGraph<K> {
    pub fn new() -> Self {
        DirectedGraph { out_edges: BTreeMap::new() }
    }

    /// Add the edge src→dst (idempotent).
    pub fn include_edge(&mut self, src: K, dst: K) {
        self.out_edges.entry(src).or_default().insert(dst);
        self.out_edges.entry(dst).or_default();
    }

    /// Remove the edge src→dst if present.
    pub fn delete_edge(&mut self, src: K, dst: K) {
        if let Some(dsts) = self.out_edges.get_mut(&src) {
            dsts.remove(&dst);
        }
    }

    /// Flip the presence of the edge src→dst.
    pub fn toggle_edge(&mut self, src: K, dst: K) {
        if self.has_edge(src, dst) {
            self.delete_edge(src, dst);
        } else {
            self.include_edge(src, dst);
        }
    }

    pub fn has_edge(&self, src: K, dst: K) -> bool {
        self.out_edges.get(&src).is_some_and(|dsts| dsts.contains(&dst))
    }

    /// All (src, dst) pairs in key order.
    pub fn edges(&self) -> impl Iterator<Item = (K, K)> + '_ {
        self.out_edges
            .iter()
            .flat_map(|(&src, dsts)| dsts.iter().map(move |&dst| (src, dst)))
    }

    /// Direct successors of `src`, in key order.
    pub fn successors(&self, src: K) -> impl Iterator<Item = K> + '_ {
        self.out_edges
            .get(&src)
            .into_iter()
            .flat_map(|dsts| dsts.iter().copied())
    }

    pub fn edge_count(&self) -> usize {
        self.out_edges.values().map(|dsts| dsts.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count() == 0
    }

    /// Kahn's algorithm. Nodes with no remaining in-edges are emitted in key
    /// order; fails with [`Error::CyclicPropagation`] if a cycle blocks
    /// progress.
    pub fn topological_order(&self) -> Result<Vec<K>> {
        let mut in_degree: BTreeMap<K, usize> = BTreeMap::new();
        for (&src, dsts) in &self.out_edges {
            in_degree.entry(src).or_insert(0);
            for &dst in dsts {
                *in_degree.entry(dst).or_insert(0) += 1;
            }
        }

        let mut ready: BTreeSet<K> = in_degree
            .iter()
            .filter(|(_, &d)| d == 0)
            .map(|(&k, _)| k)
            .collect();
        let mut order = Vec::with_capacity(in_degree.len());

        while let Some(&node) = ready.iter().next() {
            ready.remove(&node);
            order.push(node);
            if let Some(dsts) = self.out_edges.get(&node) {
                for &dst in dsts {
                    let d = in_degree.get_mut(&dst).unwrap();
                    *d -= 1;
                    if *d == 0 {
                        ready.insert(dst);
                    }
                }
            }
        }

        if order.len() != in_degree.len() {
            return Err(Error::CyclicPropagation);
        }
        Ok(order)
    }

    /// Structure-preserving relabel of every node through `f`.
    pub fn map_keys<L: Ord + Copy>(&self, f: impl Fn(K) -> L) -> DirectedGraph<L> {
        let mut result = DirectedGraph::new();
        for (&src, dsts) in &self.out_edges {
            result.out_edges.entry(f(src)).or_default();
            for &dst in dsts {
                result.include_edge(f(src), f(dst));
            }
        }
        result
    }

    /// Edge-set union in place.
    pub fn inline_union(&mut self, other: &DirectedGraph<K>) {
        for (&src, dsts) in &other.out_edges {
            self.out_edges.entry(src).or_default();
            for &dst in dsts {
                self.include_edge(src, dst);
            }
        }
    }

    /// Edge-set union, leaving both operands untouched.
    pub fn union(&self, other: &DirectedGraph<K>) -> DirectedGraph<K> {
        let mut result = self.clone();
        result.inline_union(other);
        result
    }
}
