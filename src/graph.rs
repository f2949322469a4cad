//! Conflict graph: one node per ship, an edge wherever two ships share a participant.

use itertools::Itertools;
use tracing::debug;

use crate::action::Index;
use crate::model::condition::Score;
use crate::model::entity::Ship;
use crate::model::store::EntityStore;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub ship: Ship,
    pub weight: Score,
}

/// Immutable after [`ConflictGraph::build`]; safe to share across trial threads.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictGraph {
    nodes: Vec<Node>,
    adjacency: Vec<Vec<Index>>,
}

impl ConflictGraph {
    /// Builds the graph with a pairwise scan over all ships.
    ///
    /// Nodes are ordered by ship, so the same store always yields the same node indices
    /// whatever order it iterates in.
    pub fn build(store: &EntityStore) -> ConflictGraph {
        let nodes: Vec<Node> = store
            .iter()
            .map(|(ship, weight)| Node { ship: ship.clone(), weight })
            .sorted_by(|a, b| a.ship.cmp(&b.ship))
            .collect();

        let mut adjacency = vec![Vec::new(); nodes.len()];
        for (a, b) in (0..nodes.len()).tuple_combinations() {
            if nodes[a].ship.shares_participant(&nodes[b].ship) {
                adjacency[a].push(b);
                adjacency[b].push(a);
            }
        }
        adjacency.iter_mut().for_each(|neighbors| neighbors.sort_unstable());

        for (index, node) in nodes.iter().enumerate() {
            debug!(index, ship = %node.ship, weight = node.weight, degree = adjacency[index].len(), "pairing");
        }
        let graph = ConflictGraph { nodes, adjacency };
        debug!(nodes = graph.len(), edges = graph.edge_count(), "conflict graph built");
        graph
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: Index) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn weight(&self, index: Index) -> Score {
        self.nodes[index].weight
    }

    /// Heaviest node weight, or zero for an empty graph.
    pub fn max_weight(&self) -> Score {
        self.nodes.iter().map(|node| node.weight).fold(0.0, Score::max)
    }

    /// Sorted neighbour list of `index`.
    pub fn neighbors(&self, index: Index) -> &[Index] {
        &self.adjacency[index]
    }

    pub fn degree(&self, index: Index) -> usize {
        self.adjacency[index].len()
    }

    pub fn are_adjacent(&self, a: Index, b: Index) -> bool {
        self.adjacency
            .get(a)
            .is_some_and(|neighbors| neighbors.binary_search(&b).is_ok())
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Every edge once, as `(low, high)`.
    pub fn edges(&self) -> impl Iterator<Item = (Index, Index)> + '_ {
        self.adjacency.iter().enumerate().flat_map(|(a, neighbors)| {
            neighbors.iter().filter(move |&&b| a < b).map(move |&b| (a, b))
        })
    }

    /// First pair of adjacent members in `selection`, if any.
    pub fn find_conflict(&self, selection: &[Index]) -> Option<(Index, Index)> {
        selection
            .iter()
            .tuple_combinations()
            .find(|&(&a, &b)| self.are_adjacent(a, b))
            .map(|(&a, &b)| (a, b))
    }

    pub fn is_independent(&self, selection: &[Index]) -> bool {
        self.find_conflict(selection).is_none()
    }

    pub fn total_weight(&self, selection: &[Index]) -> Score {
        selection.iter().map(|&index| self.nodes[index].weight).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_plus_one() -> EntityStore {
        [("A", "B", 10.0), ("B", "C", 7.0), ("A", "C", 5.0), ("D", "E", 20.0)]
            .into_iter()
            .map(|(a, b, w)| (Ship::new(a, b).unwrap(), w))
            .collect()
    }

    fn index_of(graph: &ConflictGraph, a: &str, b: &str) -> Index {
        let ship = Ship::new(a, b).unwrap();
        graph.nodes().iter().position(|node| node.ship == ship).unwrap()
    }

    #[test]
    fn builds_expected_edges() {
        let graph = ConflictGraph::build(&triangle_plus_one());
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.edge_count(), 3);

        let ab = index_of(&graph, "A", "B");
        let bc = index_of(&graph, "B", "C");
        let ac = index_of(&graph, "A", "C");
        let de = index_of(&graph, "D", "E");
        assert!(graph.are_adjacent(ab, bc));
        assert!(graph.are_adjacent(ab, ac));
        assert!(graph.are_adjacent(bc, ac));
        assert_eq!(graph.degree(de), 0);
        assert!(!graph.are_adjacent(ab, ab));
    }

    #[test]
    fn adjacency_is_symmetric() {
        let graph = ConflictGraph::build(&triangle_plus_one());
        for a in 0..graph.len() {
            for b in 0..graph.len() {
                assert_eq!(graph.are_adjacent(a, b), graph.are_adjacent(b, a));
            }
        }
        for (a, b) in graph.edges() {
            assert!(a < b);
            assert!(graph.nodes()[a].ship.shares_participant(&graph.nodes()[b].ship));
        }
    }

    #[test]
    fn construction_ignores_input_order() {
        let forward = triangle_plus_one();
        let reversed: EntityStore = {
            let mut items: Vec<_> = forward.iter().map(|(s, w)| (s.clone(), w)).collect();
            items.reverse();
            items.into_iter().collect()
        };
        assert_eq!(ConflictGraph::build(&forward), ConflictGraph::build(&reversed));
    }

    #[test]
    fn independence_checks() {
        let graph = ConflictGraph::build(&triangle_plus_one());
        let ab = index_of(&graph, "A", "B");
        let ac = index_of(&graph, "A", "C");
        let de = index_of(&graph, "D", "E");
        assert!(graph.is_independent(&[ab, de]));
        assert_eq!(graph.find_conflict(&[ab, de, ac]), Some((ab, ac)));
        assert_eq!(graph.total_weight(&[ab, de]), 30.0);
    }

    #[test]
    fn empty_store_gives_empty_graph() {
        let graph = ConflictGraph::build(&EntityStore::new());
        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.max_weight(), 0.0);
        assert!(graph.is_independent(&[]));
    }
}
