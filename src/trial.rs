//! Repeated solver trials with a running best.
//!
//! Each trial is one independent sample from a [`Solver`]. Results are verified against the
//! graph before they may replace the incumbent; a trial that errors or returns a conflicting
//! set is logged and skipped. Only a strictly better score replaces the incumbent, so ties
//! go to the earliest trial.

use std::sync::Mutex;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::graph::ConflictGraph;
use crate::model::condition::Score;
use crate::solver::{Candidate, Solver};

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub best: Candidate,
    /// Verified score of every trial, `None` where the trial was rejected.
    pub trial_scores: Vec<Option<Score>>,
    /// Incumbent score after each trial.
    pub incumbent_history: Vec<Score>,
    pub rejected: usize,
    /// Base seed the solvers were built from, when known.
    pub seed: Option<u64>,
}

impl RunSummary {
    fn empty() -> RunSummary {
        RunSummary {
            best: Candidate::empty(),
            trial_scores: Vec::new(),
            incumbent_history: Vec::new(),
            rejected: 0,
            seed: None,
        }
    }

    pub fn best_score(&self) -> Score {
        self.best.score()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialRunner {
    trials: usize,
    report_every: usize,
}

/// Incumbent plus the trial that produced it. `trial` is `None` until a candidate has
/// beaten the empty set.
struct Incumbent {
    candidate: Candidate,
    trial: Option<usize>,
}

impl Incumbent {
    fn empty() -> Incumbent {
        Incumbent { candidate: Candidate::empty(), trial: None }
    }

    fn offer(&mut self, trial: usize, candidate: &Candidate) -> bool {
        let better = candidate.score() > self.candidate.score()
            || (candidate.score() == self.candidate.score()
                && self.trial.is_some_and(|current| trial < current));
        if better {
            self.candidate = candidate.clone();
            self.trial = Some(trial);
        }
        better
    }
}

impl TrialRunner {
    pub fn new(trials: usize) -> TrialRunner {
        TrialRunner { trials, report_every: 0 }
    }

    /// Logs a progress line every `report_every` trials; zero disables it.
    pub fn with_report_every(mut self, report_every: usize) -> TrialRunner {
        self.report_every = report_every;
        self
    }

    fn attempt<S: Solver + ?Sized>(graph: &ConflictGraph, solver: &mut S, trial: usize) -> Option<Candidate> {
        let candidate = match solver.solve(graph) {
            Ok(candidate) => candidate,
            Err(err) => {
                warn!(trial, solver = solver.name(), %err, "trial failed, skipping");
                return None;
            }
        };
        if let Err(err) = candidate.verify(graph) {
            warn!(trial, solver = solver.name(), %err, "trial returned an invalid set, skipping");
            return None;
        }
        debug!(trial, score = candidate.score(), size = candidate.len(), "trial finished");
        Some(candidate)
    }

    fn report_progress(&self, done: usize, best: Score) {
        if self.report_every > 0 && done % self.report_every == 0 {
            info!(done, total = self.trials, best, "search progress");
        }
    }

    /// Runs the trials one after another on a single solver.
    pub fn run<S: Solver + ?Sized>(&self, graph: &ConflictGraph, solver: &mut S) -> RunSummary {
        if graph.is_empty() || self.trials == 0 {
            return RunSummary::empty();
        }
        info!(trials = self.trials, solver = solver.name(), nodes = graph.len(), "searching for solutions");

        let summary = (0..self.trials).fold(RunSummary::empty(), |mut summary, trial| {
            let accepted = Self::attempt(graph, solver, trial);
            if let Some(candidate) = &accepted {
                if candidate.score() > summary.best.score() {
                    info!(trial, score = candidate.score(), "new best fleet");
                    summary.best = candidate.clone();
                }
            } else {
                summary.rejected += 1;
            }
            summary.trial_scores.push(accepted.map(|c| c.score()));
            summary.incumbent_history.push(summary.best.score());
            self.report_progress(trial + 1, summary.best.score());
            summary
        });

        info!(score = summary.best_score(), ships = summary.best.len(), rejected = summary.rejected, "search finished");
        summary
    }

    /// Runs trials across the rayon pool, building one solver per trial.
    ///
    /// The incumbent lives behind a mutex. A candidate replaces it when strictly better, or
    /// equally good but from an earlier trial, so the winner matches what [`TrialRunner::run`]
    /// would pick from the same per-trial results.
    pub fn run_parallel<S, F>(&self, graph: &ConflictGraph, make_solver: F) -> RunSummary
    where
        S: Solver,
        F: Fn(usize) -> S + Sync,
    {
        if graph.is_empty() || self.trials == 0 {
            return RunSummary::empty();
        }
        info!(trials = self.trials, nodes = graph.len(), "searching for solutions in parallel");

        let incumbent = Mutex::new(Incumbent::empty());
        let trial_scores: Vec<Option<Score>> = (0..self.trials)
            .into_par_iter()
            .map(|trial| {
                let mut solver = make_solver(trial);
                let candidate = Self::attempt(graph, &mut solver, trial)?;
                let mut guard = incumbent.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                if guard.offer(trial, &candidate) {
                    info!(trial, score = candidate.score(), "new best fleet");
                }
                Some(candidate.score())
            })
            .collect();

        let best = incumbent
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .candidate;
        let incumbent_history = trial_scores
            .iter()
            .scan(0.0, |running: &mut Score, score| {
                *running = score.map_or(*running, |s| running.max(s));
                Some(*running)
            })
            .collect();
        let rejected = trial_scores.iter().filter(|score| score.is_none()).count();
        let summary = RunSummary { best, trial_scores, incumbent_history, rejected, seed: None };

        info!(score = summary.best_score(), ships = summary.best.len(), rejected = summary.rejected, "search finished");
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Index;
    use crate::model::entity::Ship;
    use crate::model::store::EntityStore;
    use crate::solver::{GreedySolver, SolveError};

    fn triangle_plus_one() -> ConflictGraph {
        let store: EntityStore = [("A", "B", 10.0), ("B", "C", 7.0), ("A", "C", 5.0), ("D", "E", 20.0)]
            .into_iter()
            .map(|(a, b, w)| (Ship::new(a, b).unwrap(), w))
            .collect();
        ConflictGraph::build(&store)
    }

    /// Replays a fixed list of node sets, one per call.
    struct Scripted {
        script: Vec<Vec<Index>>,
        calls: usize,
    }

    impl Solver for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn solve(&mut self, graph: &ConflictGraph) -> Result<Candidate, SolveError> {
            let nodes = self.script[self.calls % self.script.len()].clone();
            self.calls += 1;
            Ok(Candidate::from_nodes(graph, nodes))
        }
    }

    struct Failing;

    impl Solver for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn solve(&mut self, _graph: &ConflictGraph) -> Result<Candidate, SolveError> {
            Err(SolveError::TooLarge { nodes: 1, limit: 0 })
        }
    }

    // Node order by ship: A/B=0, A/C=1, B/C=2, D/E=3.
    #[test]
    fn keeps_first_strict_improvement() {
        let graph = triangle_plus_one();
        let mut solver = Scripted {
            script: vec![vec![2], vec![1, 3], vec![0, 3], vec![3, 0], vec![2, 3]],
            calls: 0,
        };
        let summary = TrialRunner::new(5).run(&graph, &mut solver);
        assert_eq!(summary.best.nodes(), &[0, 3]);
        assert_eq!(summary.best_score(), 30.0);
        assert_eq!(summary.trial_scores, vec![Some(7.0), Some(25.0), Some(30.0), Some(30.0), Some(27.0)]);
        assert_eq!(summary.incumbent_history, vec![7.0, 25.0, 30.0, 30.0, 30.0]);
    }

    #[test]
    fn invalid_sets_are_skipped() {
        let graph = triangle_plus_one();
        let mut solver = Scripted {
            script: vec![vec![0, 1, 2, 3], vec![7], vec![2, 3]],
            calls: 0,
        };
        let summary = TrialRunner::new(3).run(&graph, &mut solver);
        assert_eq!(summary.rejected, 2);
        assert_eq!(summary.trial_scores, vec![None, None, Some(27.0)]);
        assert_eq!(summary.best_score(), 27.0);
        assert!(graph.is_independent(summary.best.nodes()));
    }

    #[test]
    fn solver_errors_do_not_abort_the_run() {
        let graph = triangle_plus_one();
        let summary = TrialRunner::new(4).run(&graph, &mut Failing);
        assert_eq!(summary.rejected, 4);
        assert!(summary.best.is_empty());
        assert_eq!(summary.best_score(), 0.0);
    }

    #[test]
    fn zero_trials_or_empty_graph_give_empty_result() {
        let graph = triangle_plus_one();
        let summary = TrialRunner::new(0).run(&graph, &mut GreedySolver);
        assert!(summary.best.is_empty());
        assert!(summary.trial_scores.is_empty());

        let empty = ConflictGraph::build(&EntityStore::new());
        let summary = TrialRunner::new(10).run(&empty, &mut GreedySolver);
        assert!(summary.best.is_empty());
        assert_eq!(summary.best_score(), 0.0);
    }

    #[test]
    fn parallel_matches_sequential_tie_breaking() {
        let graph = triangle_plus_one();
        let script = vec![vec![2], vec![1, 3], vec![3, 0], vec![0, 3], vec![2, 3]];
        let sequential = TrialRunner::new(5).run(&graph, &mut Scripted { script: script.clone(), calls: 0 });
        let parallel = TrialRunner::new(5).run_parallel(&graph, |trial| Scripted {
            script: script.clone(),
            calls: trial,
        });
        assert_eq!(parallel.best, sequential.best);
        assert_eq!(parallel.trial_scores, sequential.trial_scores);
        assert_eq!(parallel.incumbent_history, sequential.incumbent_history);
    }

    #[test]
    fn incumbent_offer_prefers_earlier_ties() {
        let graph = triangle_plus_one();
        let mut incumbent = Incumbent::empty();
        assert!(incumbent.offer(4, &Candidate::from_nodes(&graph, [0, 3])));
        assert!(incumbent.offer(1, &Candidate::from_nodes(&graph, [0, 3])));
        assert!(!incumbent.offer(0, &Candidate::from_nodes(&graph, [2, 3])));
        assert!(!incumbent.offer(3, &Candidate::from_nodes(&graph, [0, 3])));
        assert_eq!(incumbent.trial, Some(1));
    }

    #[test]
    fn worthless_sets_never_replace_the_empty_fleet() {
        let store: EntityStore = [("A", "B", 0.0), ("C", "D", 0.0)]
            .into_iter()
            .map(|(a, b, w)| (Ship::new(a, b).unwrap(), w))
            .collect();
        let graph = ConflictGraph::build(&store);
        let script = vec![vec![0, 1], vec![0]];

        let sequential = TrialRunner::new(4).run(&graph, &mut Scripted { script: script.clone(), calls: 0 });
        let parallel = TrialRunner::new(4).run_parallel(&graph, |trial| Scripted {
            script: script.clone(),
            calls: trial,
        });
        assert!(sequential.best.is_empty());
        assert_eq!(parallel.best, sequential.best);
        assert_eq!(parallel.trial_scores, vec![Some(0.0); 4]);

        let mut incumbent = Incumbent::empty();
        assert!(!incumbent.offer(0, &Candidate::from_nodes(&graph, [0])));
        assert_eq!(incumbent.trial, None);
    }
}
