//! # Fleet
//!
//! Picks the most popular set of ships (pairings of two characters) in which no character
//! appears twice. Ships become nodes of a conflict graph, joined whenever they share a
//! character, and the fleet is a heavy independent set of that graph found by repeated
//! randomized search.
//!
//! ```
//! use fleet::prelude::*;
//!
//! let store: EntityStore = [
//!     (Ship::new("A", "B").unwrap(), 10.0),
//!     (Ship::new("B", "C").unwrap(), 7.0),
//!     (Ship::new("D", "E").unwrap(), 20.0),
//! ]
//! .into_iter()
//! .collect();
//!
//! let mut config = FleetConfig::default();
//! config.search.trials = 20;
//! config.search.seed = Some(1);
//! let fleet = fleet::select_fleet(&store, &config);
//! assert_eq!(fleet.total(), 30.0);
//! ```

pub mod action;
pub mod anneal;
pub mod cache;
pub mod config;
pub mod graph;
pub mod model;
pub mod registry;
pub mod report;
pub mod solver;
pub mod trial;

use tracing::info;

use crate::anneal::Annealer;
use crate::config::{AnnealConfig, FleetConfig, SolverKind};
use crate::graph::ConflictGraph;
use crate::model::store::EntityStore;
use crate::report::Fleet;
use crate::solver::{ExactSolver, GreedySolver, Solver};
use crate::trial::{RunSummary, TrialRunner};

pub mod prelude {
    pub use crate::config::FleetConfig;
    pub use crate::graph::ConflictGraph;
    pub use crate::model::entity::Ship;
    pub use crate::model::store::EntityStore;
    pub use crate::report::Fleet;
    pub use crate::solver::{Candidate, Solver};
    pub use crate::trial::{RunSummary, TrialRunner};
}

pub fn build_solver(kind: SolverKind, anneal: &AnnealConfig, seed: u64) -> Box<dyn Solver + Send> {
    match kind {
        SolverKind::Anneal => Box::new(Annealer::seeded(anneal.clone(), seed)),
        SolverKind::Greedy => Box::new(GreedySolver),
        SolverKind::Exact => Box::new(ExactSolver::new()),
    }
}

/// Runs the configured search over an already built graph.
///
/// Without a configured seed a random base seed is drawn; it is logged and returned in
/// [`RunSummary::seed`] so the run can be repeated.
pub fn search(graph: &ConflictGraph, config: &FleetConfig) -> RunSummary {
    let base_seed = config.search.seed.unwrap_or_else(rand::random);
    info!(base_seed, drawn = config.search.seed.is_none(), "search seed");
    let runner = TrialRunner::new(config.search.trials).with_report_every(config.search.report_every);
    let mut summary = if config.search.parallel {
        runner.run_parallel(graph, |trial| {
            build_solver(config.search.solver, &config.anneal, base_seed.wrapping_add(trial as u64))
        })
    } else {
        let mut solver = build_solver(config.search.solver, &config.anneal, base_seed);
        runner.run(graph, &mut solver)
    };
    summary.seed = Some(base_seed);
    summary
}

/// Applies the configured weight cutoff and builds the conflict graph.
pub fn build_graph(mut store: EntityStore, config: &FleetConfig) -> ConflictGraph {
    if let Some(min_weight) = config.search.min_weight {
        let dropped = store.retain_above(min_weight);
        info!(min_weight, dropped, kept = store.len(), "ignoring low-scoring pairings");
    }
    let graph = ConflictGraph::build(&store);
    info!(pairings = graph.len(), conflicts = graph.edge_count(), "conflict graph ready");
    graph
}

/// Cutoff, graph, search and ranking in one go.
pub fn select_fleet(store: &EntityStore, config: &FleetConfig) -> Fleet {
    let graph = build_graph(store.clone(), config);
    let summary = search(&graph, config);
    Fleet::from_candidate(&graph, &summary.best)
}
