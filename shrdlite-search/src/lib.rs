//! A generic best-first graph search with a wall-clock budget.
//!
//! This is the "external collaborator" that the blocks-world reasoning core
//! treats as a standard interface: callers supply a [`Graph`] (successor
//! function), a goal predicate and an admissible heuristic, and get back the
//! lowest-cost path to a goal node, or a typed reason for failure.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// An implicit graph: nodes are produced on demand by [`Graph::successors`].
///
/// `Node` equality (and hashing) define the closed-set identity used to
/// avoid re-expanding the same state; callers that attach bookkeeping to a
/// node not relevant to its identity (e.g. "how did we get here") should
/// exclude that bookkeeping from `Eq`/`Hash`.
pub trait Graph {
    type Node: Clone + Eq + Hash;

    /// All successors of `node`, each paired with a non-negative edge cost.
    fn successors(&self, node: &Self::Node) -> Vec<(Self::Node, u32)>;
}

/// A solved search: the node path from start to goal (inclusive of both
/// endpoints) and its total cost.
#[derive(Clone, Debug)]
pub struct SearchResult<N> {
    pub path: Vec<N>,
    pub cost: u32,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("search exhausted the wall-clock budget before reaching a goal")]
    Timeout,
    #[error("no path from the start node reaches a goal node")]
    NoPath,
}

struct SearchNode<N> {
    state: N,
    parent: Option<Rc<SearchNode<N>>>,
}

struct HeapEntry<N> {
    f: u32,
    g: u32,
    node: Rc<SearchNode<N>>,
}

/// Ordered so that `BinaryHeap` (a max-heap) pops the lowest `f`, breaking
/// ties in favour of the larger `g` (the node closer to the goal along its
/// own path, per the usual A* tie-breaking rule).
impl<N> Ord for HeapEntry<N> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.f.cmp(&self.f).then_with(|| self.g.cmp(&other.g))
    }
}
impl<N> PartialOrd for HeapEntry<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<N> PartialEq for HeapEntry<N> {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.g == other.g
    }
}
impl<N> Eq for HeapEntry<N> {}

fn extract_path<N: Clone>(node: &Rc<SearchNode<N>>) -> Vec<N> {
    let mut path = Vec::new();
    let mut current = Some(Rc::clone(node));
    while let Some(n) = current {
        path.push(n.state.clone());
        current = n.parent.clone();
    }
    path.reverse();
    path
}

/// Runs A* (best-first search guided by `g + h`) from `start` until a node
/// satisfying `is_goal` is popped, the frontier is exhausted, or `timeout`
/// elapses.
///
/// `heuristic` must be admissible — never over-estimate the true remaining
/// cost — for the returned path to be guaranteed lowest-cost.
pub fn search<G: Graph>(
    graph: &G,
    start: G::Node,
    is_goal: impl Fn(&G::Node) -> bool,
    heuristic: impl Fn(&G::Node) -> u32,
    timeout: Duration,
) -> Result<SearchResult<G::Node>, SearchError> {
    let deadline = Instant::now() + timeout;

    let mut open: BinaryHeap<HeapEntry<G::Node>> = BinaryHeap::new();
    let mut best_g: HashMap<G::Node, u32> = HashMap::new();

    let start_h = heuristic(&start);
    best_g.insert(start.clone(), 0);
    open.push(HeapEntry {
        f: start_h,
        g: 0,
        node: Rc::new(SearchNode {
            state: start,
            parent: None,
        }),
    });

    while let Some(entry) = open.pop() {
        if Instant::now() >= deadline {
            return Err(SearchError::Timeout);
        }

        // A cheaper route to this node was found after it was enqueued.
        if entry.g > *best_g.get(&entry.node.state).unwrap_or(&u32::MAX) {
            continue;
        }

        #[cfg(debug_assertions)]
        eprintln!(
            "shrdlite-search: expanding node at g={} f={} (open={})",
            entry.g,
            entry.f,
            open.len()
        );

        if is_goal(&entry.node.state) {
            return Ok(SearchResult {
                path: extract_path(&entry.node),
                cost: entry.g,
            });
        }

        for (next, cost) in graph.successors(&entry.node.state) {
            let g = entry.g + cost;
            let improves = match best_g.get(&next) {
                Some(&known) => g < known,
                None => true,
            };
            if improves {
                best_g.insert(next.clone(), g);
                let h = heuristic(&next);
                open.push(HeapEntry {
                    f: g + h,
                    g,
                    node: Rc::new(SearchNode {
                        state: next,
                        parent: Some(Rc::clone(&entry.node)),
                    }),
                });
            }
        }
    }

    Err(SearchError::NoPath)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A line graph 0 - 1 - 2 - ... - N, edge cost 1 both ways.
    struct Line(i32);
    impl Graph for Line {
        type Node = i32;
        fn successors(&self, node: &i32) -> Vec<(i32, u32)> {
            let mut out = Vec::new();
            if *node > 0 {
                out.push((node - 1, 1));
            }
            if *node < self.0 {
                out.push((node + 1, 1));
            }
            out
        }
    }

    #[test]
    fn finds_shortest_path_on_a_line() {
        let g = Line(10);
        let result = search(&g, 0, |n| *n == 7, |n| (7 - n).unsigned_abs(), Duration::from_secs(5)).unwrap();
        assert_eq!(result.cost, 7);
        assert_eq!(result.path, (0..=7).collect::<Vec<_>>());
    }

    #[test]
    fn already_at_goal_returns_singleton_path() {
        let g = Line(10);
        let result = search(&g, 3, |n| *n == 3, |_| 0, Duration::from_secs(5)).unwrap();
        assert_eq!(result.cost, 0);
        assert_eq!(result.path, vec![3]);
    }

    #[test]
    fn unreachable_goal_is_no_path() {
        struct Island;
        impl Graph for Island {
            type Node = i32;
            fn successors(&self, _node: &i32) -> Vec<(i32, u32)> {
                Vec::new()
            }
        }
        let err = search(&Island, 0, |n| *n == 1, |_| 0, Duration::from_secs(5)).unwrap_err();
        assert_eq!(err, SearchError::NoPath);
    }

    #[test]
    fn budget_exhaustion_is_timeout() {
        // A graph with infinitely many successors and a heuristic of 0 never
        // terminates naturally; a near-zero budget must still report cleanly.
        struct Infinite;
        impl Graph for Infinite {
            type Node = i64;
            fn successors(&self, node: &i64) -> Vec<(i64, u32)> {
                vec![(node + 1, 1)]
            }
        }
        let err = search(&Infinite, 0, |_| false, |_| 0, Duration::from_nanos(1)).unwrap_err();
        assert_eq!(err, SearchError::Timeout);
    }
}
