use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fleet::config::{FleetConfig, SolverKind};
use fleet::registry::RegistryLoader;
use fleet::report::Fleet;

#[derive(Parser, Debug)]
#[command(author, version, about = "Find the most popular set of ships where nobody is shipped twice")]
struct Args {
    /// Ship registry CSV (Tag, Aliases, Character A, Character B, Score)
    #[arg(value_name = "REGISTRY_CSV")]
    registry: PathBuf,

    /// Path to config TOML
    #[arg(long, default_value = "fleet.toml")]
    config: PathBuf,

    /// Number of search trials (overrides config)
    #[arg(long)]
    trials: Option<usize>,

    /// Drop ships scoring this much or less (overrides config)
    #[arg(long)]
    min_weight: Option<f64>,

    /// Base random seed (overrides config)
    #[arg(long)]
    seed: Option<u64>,

    /// Run trials on all cores
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Search strategy (overrides config)
    #[arg(long, value_enum)]
    solver: Option<SolverKind>,

    /// Also write the fleet as CSV
    #[arg(long, value_name = "OUT")]
    csv: Option<PathBuf>,

    /// Print every distinct character name before searching
    #[arg(long, default_value_t = false)]
    list_names: bool,

    /// Debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn enable_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    enable_tracing(args.verbose);

    let mut config = FleetConfig::load_or_default(&args.config)?;
    if let Some(trials) = args.trials {
        config.search.trials = trials;
    }
    if args.min_weight.is_some() {
        config.search.min_weight = args.min_weight;
    }
    if args.seed.is_some() {
        config.search.seed = args.seed;
    }
    if args.parallel {
        config.search.parallel = true;
    }
    if let Some(solver) = args.solver {
        config.search.solver = solver;
    }
    config.validate()?;

    let registry = RegistryLoader::new(&config.filter)
        .load_path(&args.registry)
        .with_context(|| format!("loading {}", args.registry.display()))?;
    if args.list_names {
        println!("Distinct names:");
        for name in &registry.names {
            println!("{name}");
        }
        println!();
    }

    let graph = fleet::build_graph(registry.store, &config);

    let summary = fleet::search(&graph, &config);
    let best_fleet = Fleet::from_candidate(&graph, &summary.best);

    println!("```");
    println!("{best_fleet}");
    println!("```");

    if let Some(path) = &args.csv {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        best_fleet
            .write_csv(file)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "fleet written");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solver_flag_accepts_every_kind() {
        let args = Args::try_parse_from(["fleet", "ships.csv", "--solver", "greedy"]).unwrap();
        assert_eq!(args.solver, Some(SolverKind::Greedy));
        let args = Args::try_parse_from(["fleet", "ships.csv", "--solver", "exact", "--parallel"]).unwrap();
        assert_eq!(args.solver, Some(SolverKind::Exact));
        assert!(args.parallel);
        assert!(Args::try_parse_from(["fleet", "ships.csv", "--solver", "tabu"]).is_err());
    }

    #[test]
    fn args_are_well_formed() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
