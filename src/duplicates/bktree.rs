//! BK-tree for range queries in a discrete metric space.
//!
//! # Overview
//!
//! A BK-tree indexes items under an integer metric that satisfies the
//! triangle inequality. Each node owns one item (its pivot) and a map from
//! distance label to child; the child at label `k` holds an item at distance
//! exactly `k` from the pivot. Items equal to a pivot chain off it at label 0.
//!
//! Nodes live in an arena (`Vec`) and refer to their children by index, so
//! the tree has a single owner and no per-child allocations.
//!
//! A range query for radius `d` around a probe only descends into children
//! whose label `k` satisfies `|k - dist(probe, pivot)| <= d`; by the triangle
//! inequality no other subtree can contain a match.
//!
//! The `brute_force_*` functions compute the same answers by linear scan and
//! serve as the reference for tests and benchmarks.
//!
//! # Example
//!
//! ```
//! use dupfind::duplicates::bktree::{BkTree, HammingMetric};
//! use dupfind::scanner::FeatureVector;
//!
//! let mut tree = BkTree::new(HammingMetric);
//! tree.insert(FeatureVector::new(vec![0, 0, 0, 0]));
//! tree.insert(FeatureVector::new(vec![0, 0, 0, 1]));
//! tree.insert(FeatureVector::new(vec![1, 1, 1, 1]));
//!
//! let probe = FeatureVector::new(vec![0, 0, 0, 0]);
//! let matches = tree.find(&probe, 1);
//! assert_eq!(matches, vec![(0, 0), (1, 1)]);
//! ```

use std::collections::BTreeMap;

use crate::scanner::FeatureVector;

/// A symmetric, non-negative integer distance obeying the triangle inequality.
pub trait Metric<T> {
    /// Distance between two items.
    fn distance(&self, a: &T, b: &T) -> u32;
}

/// Hamming distance between feature vectors.
#[derive(Debug, Default, Clone, Copy)]
pub struct HammingMetric;

impl Metric<FeatureVector> for HammingMetric {
    fn distance(&self, a: &FeatureVector, b: &FeatureVector) -> u32 {
        a.distance(b)
    }
}

#[derive(Debug, Clone)]
struct Node<T> {
    item: T,
    children: BTreeMap<u32, usize>,
}

/// Arena-backed BK-tree.
///
/// Items are addressed by their insertion index, which is also their node
/// index: the first inserted item is the root (index 0).
#[derive(Debug, Clone)]
pub struct BkTree<T, M> {
    nodes: Vec<Node<T>>,
    metric: M,
}

impl<T, M: Metric<T>> BkTree<T, M> {
    /// Create an empty tree using `metric`.
    #[must_use]
    pub fn new(metric: M) -> Self {
        Self {
            nodes: Vec::new(),
            metric,
        }
    }

    /// Number of items in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Item stored at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.nodes.get(index).map(|n| &n.item)
    }

    /// All items in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &T> + '_ {
        self.nodes.iter().map(|n| &n.item)
    }

    /// Insert an item and return its index.
    ///
    /// Descends from the root following the child labelled with the distance
    /// to each pivot, and attaches a new node where no such child exists.
    pub fn insert(&mut self, item: T) -> usize {
        let index = self.nodes.len();
        if self.nodes.is_empty() {
            self.nodes.push(Node {
                item,
                children: BTreeMap::new(),
            });
            return index;
        }

        let mut current = 0;
        loop {
            let d = self.metric.distance(&self.nodes[current].item, &item);
            match self.nodes[current].children.get(&d) {
                Some(&child) => current = child,
                None => {
                    self.nodes[current].children.insert(d, index);
                    break;
                }
            }
        }
        self.nodes.push(Node {
            item,
            children: BTreeMap::new(),
        });
        index
    }

    /// All items within `max_distance` of `probe`.
    ///
    /// Returns `(distance, index)` pairs sorted by index.
    #[must_use]
    pub fn find(&self, probe: &T, max_distance: u32) -> Vec<(u32, usize)> {
        let mut found = Vec::new();
        if self.nodes.is_empty() {
            return found;
        }

        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            let d = self.metric.distance(probe, &node.item);
            if d <= max_distance {
                found.push((d, index));
            }
            let low = d.saturating_sub(max_distance);
            let high = d.saturating_add(max_distance);
            stack.extend(node.children.range(low..=high).map(|(_, &child)| child));
        }

        found.sort_unstable_by_key(|&(_, index)| index);
        found
    }

    /// Clusters of items pairwise at distance exactly `distance`.
    ///
    /// Items are visited in insertion order; every item not yet clustered
    /// seeds a cluster and pulls in later candidates (from a range query)
    /// that sit at exactly `distance` from every member gathered so far. Each
    /// item belongs to at most one cluster. Only clusters with two or more
    /// items are returned, as lists of indices in ascending order.
    #[must_use]
    pub fn find_by_distance(&self, distance: u32) -> Vec<Vec<usize>> {
        greedy_clusters(
            self.nodes.len(),
            distance,
            |seed| {
                self.find(&self.nodes[seed].item, distance)
                    .into_iter()
                    .filter(|&(d, _)| d == distance)
                    .map(|(_, index)| index)
                    .collect()
            },
            |a, b| self.metric.distance(&self.nodes[a].item, &self.nodes[b].item),
        )
    }

    /// Check the labelling invariant: every child sits at its label's distance
    /// from its parent's pivot.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.nodes.iter().all(|node| {
            node.children.iter().all(|(&label, &child)| {
                child < self.nodes.len()
                    && self.metric.distance(&node.item, &self.nodes[child].item) == label
            })
        })
    }
}

/// Range query by linear scan. Same contract as [`BkTree::find`].
#[must_use]
pub fn brute_force_find<T, M: Metric<T>>(
    items: &[T],
    metric: &M,
    probe: &T,
    max_distance: u32,
) -> Vec<(u32, usize)> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let d = metric.distance(probe, item);
            (d <= max_distance).then_some((d, index))
        })
        .collect()
}

/// Clustering by linear scan. Same contract as [`BkTree::find_by_distance`].
#[must_use]
pub fn find_by_distance_brute_force<T, M: Metric<T>>(
    items: &[T],
    metric: &M,
    distance: u32,
) -> Vec<Vec<usize>> {
    greedy_clusters(
        items.len(),
        distance,
        |seed| {
            (0..items.len())
                .filter(|&j| metric.distance(&items[seed], &items[j]) == distance)
                .collect()
        },
        |a, b| metric.distance(&items[a], &items[b]),
    )
}

/// Shared clustering pass.
///
/// `candidates(seed)` returns the ascending indices at exactly `distance`
/// from `seed`; `pair_distance` measures two indexed items.
fn greedy_clusters<C, D>(
    count: usize,
    distance: u32,
    mut candidates: C,
    pair_distance: D,
) -> Vec<Vec<usize>>
where
    C: FnMut(usize) -> Vec<usize>,
    D: Fn(usize, usize) -> u32,
{
    let mut assigned = vec![false; count];
    let mut clusters = Vec::new();

    for seed in 0..count {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;

        let mut members = vec![seed];
        for candidate in candidates(seed) {
            if assigned[candidate] {
                continue;
            }
            if members
                .iter()
                .all(|&m| pair_distance(m, candidate) == distance)
            {
                members.push(candidate);
            }
        }

        if members.len() > 1 {
            for &m in &members {
                assigned[m] = true;
            }
            clusters.push(members);
        }
    }

    clusters
}
