//! Pluggable independent-set strategies and the candidate type they produce.
//!
//! Any [`Solver`] may be handed to the trial runner. The runner never trusts a solver's
//! output: it re-checks every candidate against the graph with [`Candidate::verify`].

use itertools::Itertools;
use thiserror::Error;

use crate::action::{ActionError, Index};
use crate::graph::ConflictGraph;
use crate::model::condition::Score;

/// A set of graph nodes and their summed weight.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Candidate {
    nodes: Vec<Index>,
    score: Score,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CandidateError {
    #[error("node {0} is not in the graph")]
    UnknownNode(Index),
    #[error("nodes {0} and {1} share a participant")]
    Conflict(Index, Index),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SolveError {
    #[error("local search move failed: {0}")]
    Action(#[from] ActionError),
    #[error("graph has {nodes} nodes, exact search handles at most {limit}")]
    TooLarge { nodes: usize, limit: usize },
}

impl Candidate {
    pub fn empty() -> Candidate {
        Candidate::default()
    }

    /// Sorts and deduplicates `nodes` and scores them against `graph`. Unknown indices are
    /// kept (and left unscored) so that [`Candidate::verify`] can reject them.
    pub fn from_nodes(graph: &ConflictGraph, nodes: impl IntoIterator<Item = Index>) -> Candidate {
        let nodes: Vec<Index> = nodes.into_iter().sorted_unstable().dedup().collect();
        let score = nodes.iter().filter_map(|&i| graph.node(i)).map(|node| node.weight).sum();
        Candidate { nodes, score }
    }

    pub fn nodes(&self) -> &[Index] {
        &self.nodes
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn verify(&self, graph: &ConflictGraph) -> Result<(), CandidateError> {
        if let Some(&unknown) = self.nodes.iter().find(|&&i| i >= graph.len()) {
            return Err(CandidateError::UnknownNode(unknown));
        }
        match graph.find_conflict(&self.nodes) {
            Some((a, b)) => Err(CandidateError::Conflict(a, b)),
            None => Ok(()),
        }
    }
}

pub trait Solver {
    fn name(&self) -> &'static str;

    /// Produces one candidate independent set. May be randomized; one call is one sample.
    fn solve(&mut self, graph: &ConflictGraph) -> Result<Candidate, SolveError>;
}

impl<S: Solver + ?Sized> Solver for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn solve(&mut self, graph: &ConflictGraph) -> Result<Candidate, SolveError> {
        (**self).solve(graph)
    }
}

/// Takes ships heaviest first whenever they do not conflict with what is already taken.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedySolver;

impl Solver for GreedySolver {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn solve(&mut self, graph: &ConflictGraph) -> Result<Candidate, SolveError> {
        let mut blocked = vec![false; graph.len()];
        let mut taken = Vec::new();
        let order = (0..graph.len())
            .filter(|&i| graph.weight(i) > 0.0)
            .sorted_by(|&a, &b| graph.weight(b).total_cmp(&graph.weight(a)).then(a.cmp(&b)));
        for index in order {
            if blocked[index] {
                continue;
            }
            taken.push(index);
            for &n in graph.neighbors(index) {
                blocked[n] = true;
            }
        }
        Ok(Candidate::from_nodes(graph, taken))
    }
}

pub const EXACT_NODE_LIMIT: usize = 64;

#[inline(always)]
const fn bit(v: usize) -> u64 {
    1u64 << v
}

/// Branch-and-bound maximum weight independent set over `u64` bitsets.
///
/// Nodes are relabelled heaviest first; each branch either takes the heaviest remaining
/// candidate (and drops its neighbours) or discards it. Pruning uses a clique-cover bound,
/// the weighted counterpart of the greedy colouring bound used in clique search.
#[derive(Debug, Clone, Default)]
pub struct ExactSolver {
    order: Vec<Index>,
    weights: Vec<Score>,
    adj: Vec<u64>,
    best: Score,
    best_set: u64,
}

impl ExactSolver {
    pub fn new() -> ExactSolver {
        ExactSolver::default()
    }

    fn prepare(&mut self, graph: &ConflictGraph) {
        self.order = (0..graph.len())
            .filter(|&i| graph.weight(i) > 0.0)
            .sorted_by(|&a, &b| graph.weight(b).total_cmp(&graph.weight(a)).then(a.cmp(&b)))
            .collect();
        let mut label = vec![None; graph.len()];
        for (v, &index) in self.order.iter().enumerate() {
            label[index] = Some(v);
        }
        self.weights = self.order.iter().map(|&i| graph.weight(i)).collect();
        self.adj = self
            .order
            .iter()
            .map(|&index| {
                graph
                    .neighbors(index)
                    .iter()
                    .filter_map(|&n| label[n])
                    .fold(0u64, |mask, v| mask | bit(v))
            })
            .collect();
        self.best = 0.0;
        self.best_set = 0;
    }

    /// Greedy clique cover of `candidates`: an independent set holds at most one node per
    /// clique, and the heaviest node seeds each clique.
    fn bound(&self, mut candidates: u64) -> Score {
        let mut total = 0.0;
        while candidates != 0 {
            let v = candidates.trailing_zeros() as usize;
            total += self.weights[v];
            candidates &= !bit(v);
            let mut extend = candidates & self.adj[v];
            while extend != 0 {
                let u = extend.trailing_zeros() as usize;
                candidates &= !bit(u);
                extend &= self.adj[u];
            }
        }
        total
    }

    fn search(&mut self, chosen: u64, weight: Score, candidates: u64) {
        if candidates == 0 {
            if weight > self.best {
                self.best = weight;
                self.best_set = chosen;
            }
            return;
        }
        if weight + self.bound(candidates) <= self.best {
            return;
        }
        let v = candidates.trailing_zeros() as usize;
        self.search(chosen | bit(v), weight + self.weights[v], candidates & !self.adj[v] & !bit(v));
        self.search(chosen, weight, candidates & !bit(v));
    }
}

impl Solver for ExactSolver {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn solve(&mut self, graph: &ConflictGraph) -> Result<Candidate, SolveError> {
        if graph.len() > EXACT_NODE_LIMIT {
            return Err(SolveError::TooLarge { nodes: graph.len(), limit: EXACT_NODE_LIMIT });
        }
        self.prepare(graph);
        let all = match self.order.len() {
            0 => 0,
            64 => u64::MAX,
            n => bit(n) - 1,
        };
        self.search(0, 0.0, all);

        let mut chosen = Vec::new();
        let mut set = self.best_set;
        while set != 0 {
            chosen.push(self.order[set.trailing_zeros() as usize]);
            set &= set - 1;
        }
        Ok(Candidate::from_nodes(graph, chosen))
    }
}
