use rand::prelude::{Rng, SeedableRng, SliceRandom};
use rand::rngs::SmallRng;
use tracing::trace;

use crate::action::{Action, ActionResult, Index};
use crate::cache::SelectionCache;
use crate::config::AnnealConfig;
use crate::graph::ConflictGraph;
use crate::model::condition::Score;
use crate::solver::{Candidate, SolveError, Solver};


/// Schedule for one annealing run, scaled to the graph at hand.
struct Params {
    temperature: f64,
    cooling_rate: f64,
    max_iterations: usize,
    penalty: Score,
}

impl Params {
    fn for_graph(config: &AnnealConfig, graph: &ConflictGraph) -> Params {
        let scale = match graph.max_weight() {
            w if w > 0.0 => w,
            _ => 1.0,
        };
        let max_iterations = config.sweeps.saturating_mul(graph.len()).max(1);
        let start = config.initial_temperature * scale;
        let end = config.final_temperature * scale;
        let cooling_rate = (end / start).powf(1.0 / max_iterations as f64);
        Params {
            temperature: start,
            cooling_rate,
            max_iterations,
            penalty: config.penalty * scale,
        }
    }
}

struct State {
    n_iterations: usize,
    temperature: f64,
    accepted: usize,
    best: Option<(Score, Vec<Index>)>,
}

/// Visits nodes in shuffled rounds and proposes the natural move for each.
struct MoveGenerator {
    size: Index,
    candidates: Vec<Index>,
    swap_probability: f64,
}

impl MoveGenerator {
    fn init(&mut self, rng: &mut SmallRng) {
        self.candidates = (0..self.size).collect();
        self.candidates.shuffle(rng);
    }

    fn next(&mut self, cache: &SelectionCache<'_>, rng: &mut SmallRng) -> Action {
        let index = match self.candidates.pop() {
            Some(index) => index,
            None => {
                self.init(rng);
                return self.next(cache, rng)
            }
        };
        if cache.is_selected(index) {
            return Action::Remove(index)
        }
        match cache.sole_selected_neighbor(index) {
            Some(out) if rng.gen_bool(self.swap_probability) => Action::Swap { out, into: index },
            _ => Action::Add(index),
        }
    }
}

/// Simulated annealing over node selections with conflicts as a soft penalty.
///
/// The best conflict-free selection seen during the walk is kept, and the final state is
/// repaired into a maximal independent set; whichever weighs more is returned.
pub struct Annealer {
    config: AnnealConfig,
    rng: SmallRng,
}

impl Annealer {
    pub fn new(config: AnnealConfig, rng: SmallRng) -> Annealer {
        Annealer { config, rng }
    }

    pub fn seeded(config: AnnealConfig, seed: u64) -> Annealer {
        Annealer::new(config, SmallRng::seed_from_u64(seed))
    }

    fn accept(&mut self, diff: Score, temperature: f64) -> bool {
        diff >= 0.0 || self.rng.gen::<f64>() < (diff / temperature).exp()
    }

    fn record(state: &mut State, cache: &SelectionCache<'_>) {
        if !cache.is_feasible() {
            return;
        }
        let improved = match &state.best {
            Some((score, _)) => cache.weight() > *score,
            None => true,
        };
        if improved {
            state.best = Some((cache.weight(), cache.selection()));
        }
    }
}

impl Solver for Annealer {
    fn name(&self) -> &'static str {
        "anneal"
    }

    fn solve(&mut self, graph: &ConflictGraph) -> Result<Candidate, SolveError> {
        if graph.is_empty() {
            return Ok(Candidate::empty());
        }
        let params = Params::for_graph(&self.config, graph);
        let mut cache = SelectionCache::empty(graph);
        let mut generator = MoveGenerator {
            size: graph.len(),
            candidates: Vec::new(),
            swap_probability: self.config.swap_probability.clamp(0.0, 1.0),
        };
        let mut state = State {
            n_iterations: 0,
            temperature: params.temperature,
            accepted: 0,
            best: None,
        };

        while state.n_iterations < params.max_iterations {
            let action = generator.next(&cache, &mut self.rng);
            match cache.simulate(&action, params.penalty) {
                ActionResult::ScoreDiff(diff) | ActionResult::UnsatisfiedScoreDiff(diff) => {
                    if self.accept(diff, state.temperature) {
                        cache.act(action)?;
                        state.accepted += 1;
                        Self::record(&mut state, &cache);
                    }
                }
                ActionResult::Failed(errors) => {
                    trace!(?action, ?errors, "move rejected");
                }
            }
            state.temperature *= params.cooling_rate;
            state.n_iterations += 1;
        }

        cache.repair()?;
        Self::record(&mut state, &cache);
        trace!(
            iterations = state.n_iterations,
            accepted = state.accepted,
            temperature = state.temperature,
            "annealing finished"
        );
        let nodes = state.best.map(|(_, nodes)| nodes).unwrap_or_default();
        Ok(Candidate::from_nodes(
            graph,
            nodes.into_iter().filter(|&i| graph.weight(i) > 0.0),
        ))
    }
}
