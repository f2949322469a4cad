use itertools::Itertools;

use crate::action::{Action, ActionError, ActionResult, Index};
use crate::graph::ConflictGraph;
use crate::model::condition::Score;

/// Incrementally maintained selection over a conflict graph.
///
/// Alongside membership it caches, for every node, how many selected neighbours it has, so
/// each move can be priced in O(1) and applied in O(degree).
pub struct SelectionCache<'g> {
    graph: &'g ConflictGraph,
    selected: Vec<bool>,
    conflicts: Vec<usize>,
    members: Vec<Index>,
    positions: Vec<Option<usize>>,
    weight: Score,
    violations: usize,
}

impl<'g> SelectionCache<'g> {
    pub fn empty(graph: &'g ConflictGraph) -> SelectionCache<'g> {
        let n = graph.len();
        SelectionCache {
            graph,
            selected: vec![false; n],
            conflicts: vec![0; n],
            members: Vec::new(),
            positions: vec![None; n],
            weight: 0.0,
            violations: 0,
        }
    }

    pub fn is_selected(&self, index: Index) -> bool {
        self.selected.get(index).copied().unwrap_or(false)
    }

    /// Number of selected neighbours of `index`.
    pub fn conflicts(&self, index: Index) -> usize {
        self.conflicts[index]
    }

    /// Total weight of the selection, conflicts ignored.
    pub fn weight(&self) -> Score {
        self.weight
    }

    /// Edges with both ends selected.
    pub fn violations(&self) -> usize {
        self.violations
    }

    pub fn is_feasible(&self) -> bool {
        self.violations == 0
    }

    pub fn energy(&self, penalty: Score) -> Score {
        self.weight - penalty * self.violations as Score
    }

    /// Selected nodes in ascending order.
    pub fn selection(&self) -> Vec<Index> {
        self.members.iter().copied().sorted_unstable().collect()
    }

    /// The only selected neighbour of `index`, if it has exactly one.
    pub fn sole_selected_neighbor(&self, index: Index) -> Option<Index> {
        if self.conflicts[index] != 1 {
            return None;
        }
        self.graph.neighbors(index).iter().copied().find(|&n| self.selected[n])
    }

    fn check_node(&self, index: Index) -> Result<(), ActionError> {
        if index < self.selected.len() {
            Ok(())
        } else {
            Err(ActionError::InvalidNode(index))
        }
    }

    fn classify(diff: Score, violations_after: usize) -> ActionResult {
        if violations_after == 0 {
            ActionResult::ScoreDiff(diff)
        } else {
            ActionResult::UnsatisfiedScoreDiff(diff)
        }
    }

    fn simulate_add(&self, index: Index, skip: Option<Index>, base_violations: usize, penalty: Score) -> ActionResult {
        if let Err(err) = self.check_node(index) {
            return ActionResult::Failed(vec![err]);
        }
        if self.selected[index] {
            return ActionResult::Failed(vec![ActionError::AlreadySelected(index)]);
        }
        let lost = skip.filter(|&s| self.is_selected(s) && self.graph.are_adjacent(s, index)).map_or(0, |_| 1);
        let added = self.conflicts[index] - lost;
        let diff = self.graph.weight(index) - penalty * added as Score;
        Self::classify(diff, base_violations + added)
    }

    fn simulate_remove(&self, index: Index, penalty: Score) -> ActionResult {
        if let Err(err) = self.check_node(index) {
            return ActionResult::Failed(vec![err]);
        }
        if !self.selected[index] {
            return ActionResult::Failed(vec![ActionError::NotSelected(index)]);
        }
        let removed = self.conflicts[index];
        let diff = penalty * removed as Score - self.graph.weight(index);
        Self::classify(diff, self.violations - removed)
    }

    /// Prices `action` against the penalised energy without applying it.
    pub fn simulate(&self, action: &Action, penalty: Score) -> ActionResult {
        match action {
            Action::Add(index) => self.simulate_add(*index, None, self.violations, penalty),
            Action::Remove(index) => self.simulate_remove(*index, penalty),
            Action::Swap { out, into } => {
                let removal = self.simulate_remove(*out, penalty);
                let remaining = match removal {
                    ActionResult::Failed(_) => self.violations,
                    _ => self.violations - self.conflicts[*out],
                };
                // Removing never creates conflicts; the addition decides feasibility.
                let removal = match removal {
                    ActionResult::UnsatisfiedScoreDiff(diff) => ActionResult::ScoreDiff(diff),
                    other => other,
                };
                removal + self.simulate_add(*into, Some(*out), remaining, penalty)
            }
        }
    }

    fn add(&mut self, index: Index) -> Result<(), ActionError> {
        self.check_node(index)?;
        if self.selected[index] {
            return Err(ActionError::AlreadySelected(index));
        }
        self.selected[index] = true;
        self.violations += self.conflicts[index];
        self.weight += self.graph.weight(index);
        for &n in self.graph.neighbors(index) {
            self.conflicts[n] += 1;
        }
        self.positions[index] = Some(self.members.len());
        self.members.push(index);
        Ok(())
    }

    fn remove(&mut self, index: Index) -> Result<(), ActionError> {
        self.check_node(index)?;
        let position = self.positions[index].ok_or(ActionError::NotSelected(index))?;
        self.selected[index] = false;
        self.violations -= self.conflicts[index];
        self.weight -= self.graph.weight(index);
        for &n in self.graph.neighbors(index) {
            self.conflicts[n] -= 1;
        }
        self.members.swap_remove(position);
        if let Some(&moved) = self.members.get(position) {
            self.positions[moved] = Some(position);
        }
        self.positions[index] = None;
        Ok(())
    }

    pub fn act(&mut self, action: Action) -> Result<(), ActionError> {
        match action {
            Action::Add(index) => self.add(index),
            Action::Remove(index) => self.remove(index),
            Action::Swap { out, into } => {
                self.check_node(into)?;
                if self.selected[into] {
                    return Err(ActionError::AlreadySelected(into));
                }
                self.remove(out)?;
                self.add(into)
            }
        }
    }

    /// Turns the selection into a maximal independent set.
    ///
    /// Conflicting members are dropped most-conflicted first (lightest on ties), non-positive
    /// members are dropped, and the heaviest free nodes are then added while they stay
    /// conflict-free.
    pub fn repair(&mut self) -> Result<(), ActionError> {
        while self.violations > 0 {
            let victim = self
                .members
                .iter()
                .copied()
                .filter(|&m| self.conflicts[m] > 0)
                .min_by(|&a, &b| {
                    self.conflicts[b]
                        .cmp(&self.conflicts[a])
                        .then(self.graph.weight(a).total_cmp(&self.graph.weight(b)))
                        .then(a.cmp(&b))
                });
            match victim {
                Some(index) => self.remove(index)?,
                None => break,
            }
        }

        let worthless: Vec<Index> = self
            .members
            .iter()
            .copied()
            .filter(|&m| self.graph.weight(m) <= 0.0)
            .collect();
        for index in worthless {
            self.remove(index)?;
        }

        let order: Vec<Index> = (0..self.graph.len())
            .sorted_by(|&a, &b| self.graph.weight(b).total_cmp(&self.graph.weight(a)).then(a.cmp(&b)))
            .collect();
        for index in order {
            if !self.selected[index] && self.conflicts[index] == 0 && self.graph.weight(index) > 0.0 {
                self.add(index)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entity::Ship;
    use crate::model::store::EntityStore;

    // Path A-B, B-C, C-D plus a separate E-F.
    fn path() -> ConflictGraph {
        let store: EntityStore = [("A", "B", 4.0), ("B", "C", 5.0), ("C", "D", 4.0), ("E", "F", 1.0)]
            .into_iter()
            .map(|(a, b, w)| (Ship::new(a, b).unwrap(), w))
            .collect();
        ConflictGraph::build(&store)
    }

    // Indices follow ship order: A/B=0, B/C=1, C/D=2, E/F=3.
    #[test]
    fn add_and_remove_track_conflicts() {
        let graph = path();
        let mut cache = SelectionCache::empty(&graph);
        cache.act(Action::Add(0)).unwrap();
        cache.act(Action::Add(1)).unwrap();
        assert_eq!(cache.violations(), 1);
        assert_eq!(cache.weight(), 9.0);
        assert_eq!(cache.conflicts(2), 1);
        assert_eq!(cache.energy(10.0), -1.0);

        cache.act(Action::Remove(0)).unwrap();
        assert!(cache.is_feasible());
        assert_eq!(cache.selection(), vec![1]);
        assert_eq!(cache.act(Action::Remove(0)), Err(ActionError::NotSelected(0)));
        assert_eq!(cache.act(Action::Add(1)), Err(ActionError::AlreadySelected(1)));
        assert_eq!(cache.act(Action::Add(9)), Err(ActionError::InvalidNode(9)));
    }

    #[test]
    fn simulate_matches_act() {
        let graph = path();
        let mut cache = SelectionCache::empty(&graph);
        cache.act(Action::Add(1)).unwrap();
        let penalty = 10.0;

        let actions = [
            Action::Add(0),
            Action::Add(3),
            Action::Swap { out: 1, into: 0 },
            Action::Remove(1),
        ];
        for action in actions {
            let before = cache.energy(penalty);
            let predicted = cache.simulate(&action, penalty);
            let mut probe = SelectionCache::empty(&graph);
            for m in cache.selection() {
                probe.act(Action::Add(m)).unwrap();
            }
            probe.act(action.clone()).unwrap();
            assert_eq!(predicted.score(), Some(probe.energy(penalty) - before), "{action:?}");
            assert_eq!(predicted.is_satisfied(), probe.is_feasible(), "{action:?}");
        }
    }

    #[test]
    fn swap_prices_out_the_shared_neighbor() {
        let graph = path();
        let mut cache = SelectionCache::empty(&graph);
        cache.act(Action::Add(1)).unwrap();
        assert_eq!(cache.sole_selected_neighbor(0), Some(1));
        assert_eq!(cache.simulate(&Action::Swap { out: 1, into: 0 }, 10.0), ActionResult::ScoreDiff(-1.0));
        cache.act(Action::Swap { out: 1, into: 0 }).unwrap();
        assert_eq!(cache.selection(), vec![0]);
    }

    #[test]
    fn failed_simulation_reports_errors() {
        let graph = path();
        let cache = SelectionCache::empty(&graph);
        assert_eq!(
            cache.simulate(&Action::Remove(2), 1.0),
            ActionResult::Failed(vec![ActionError::NotSelected(2)])
        );
    }

    #[test]
    fn repair_yields_maximal_independent_set() {
        let graph = path();
        let mut cache = SelectionCache::empty(&graph);
        for index in 0..graph.len() {
            cache.act(Action::Add(index)).unwrap();
        }
        cache.repair().unwrap();
        assert!(cache.is_feasible());
        assert!(graph.is_independent(&cache.selection()));
        assert_eq!(cache.selection(), vec![0, 2, 3]);
        assert_eq!(cache.weight(), 9.0);
    }
}
