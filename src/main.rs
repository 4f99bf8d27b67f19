//! Markov EA CLI - Run evolutionary experiments from JSON configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use markov_ea::{
    compute::evolution::{
        AllOnes, FitnessFunction, MultiAllOnes, TrialEvaluator, XorTask, latest_checkpoint,
    },
    schema::{CheckpointConfig, EaConfig, MetaPopulationConfig, RunSummary},
    EvolutionaryAlgorithm, MetaPopulation,
};

/// Built-in fitness tasks selectable from the command line.
#[derive(Debug, Clone, Copy)]
enum TaskChoice {
    AllOnes,
    MultiAllOnes,
    Xor,
}

impl TaskChoice {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "all-ones" => Some(Self::AllOnes),
            "multi-all-ones" => Some(Self::MultiAllOnes),
            "xor" => Some(Self::Xor),
            _ => None,
        }
    }

    fn fitness(self, config: &EaConfig) -> Arc<dyn FitnessFunction> {
        match self {
            Self::AllOnes => Arc::new(AllOnes),
            Self::MultiAllOnes => Arc::new(MultiAllOnes::default()),
            Self::Xor => Arc::new(TrialEvaluator::new(
                XorTask,
                config.markov.clone(),
                config.representation.topology,
                config.markov.trials,
            )),
        }
    }
}

struct Options {
    config_path: PathBuf,
    meta: bool,
    task: TaskChoice,
    overrides: Vec<(String, String)>,
    resume: Option<PathBuf>,
}

fn print_usage(program: &str) {
    eprintln!("Usage: {program} <config.json> [options]");
    eprintln!();
    eprintln!("Run a Markov EA experiment from JSON configuration.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --meta               Treat the file as a meta-population configuration");
    eprintln!("  --task <name>        all-ones | multi-all-ones | xor (default: xor)");
    eprintln!("  --set <key=value>    Override a configuration value, e.g. population.size=200");
    eprintln!("  --resume <path>      Continue from a checkpoint file, or the latest one in a directory");
    eprintln!();
    eprintln!("Example configurations are printed with --example [--meta].");
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {message}");
    std::process::exit(1);
}

fn parse_options(args: &[String]) -> Options {
    let mut config_path = None;
    let mut meta = false;
    let mut task = TaskChoice::Xor;
    let mut overrides = Vec::new();
    let mut resume = None;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--meta" => meta = true,
            "--task" => {
                let name = iter.next().unwrap_or_else(|| fail("--task needs a value"));
                task = TaskChoice::parse(name)
                    .unwrap_or_else(|| fail(format!("unknown task '{name}'")));
            }
            "--set" => {
                let pair = iter.next().unwrap_or_else(|| fail("--set needs key=value"));
                let (key, value) = pair
                    .split_once('=')
                    .unwrap_or_else(|| fail(format!("override '{pair}' is not key=value")));
                overrides.push((key.to_string(), value.to_string()));
            }
            "--resume" => {
                let path = iter.next().unwrap_or_else(|| fail("--resume needs a path"));
                resume = Some(PathBuf::from(path));
            }
            other if config_path.is_none() && !other.starts_with("--") => {
                config_path = Some(PathBuf::from(other));
            }
            other => fail(format!("unexpected argument '{other}'")),
        }
    }

    let Some(config_path) = config_path else {
        print_usage(&args[0]);
        std::process::exit(1);
    };
    Options {
        config_path,
        meta,
        task,
        overrides,
        resume,
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config(args.iter().any(|a| a == "--meta"));
        return;
    }

    let options = parse_options(&args);
    let config_str = fs::read_to_string(&options.config_path)
        .unwrap_or_else(|e| fail(format!("reading config file: {e}")));
    let overrides = options
        .overrides
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()));

    println!("Markov EA");
    println!("=========");

    let summary = if options.meta {
        let config: MetaPopulationConfig = serde_json::from_str(&config_str)
            .unwrap_or_else(|e| fail(format!("parsing config: {e}")));
        let config = config.with_overrides(overrides).unwrap_or_else(|e| fail(e));
        run_meta(config, &options)
    } else {
        let config: EaConfig = serde_json::from_str(&config_str)
            .unwrap_or_else(|e| fail(format!("parsing config: {e}")));
        let config = config.with_overrides(overrides).unwrap_or_else(|e| fail(e));
        run_single(config, &options)
    };

    println!();
    println!("Stopped: {:?}", summary.stop_reason);
    println!("Updates: {}", summary.updates);
    println!("Evaluations: {}", summary.evaluations);
    println!("Best fitness: {:.4}", summary.best_fitness);
    println!("Final mean fitness: {:.4}", summary.final_avg_fitness);
    println!(
        "Time: {:.2}s ({:.1} updates/s)",
        summary.elapsed_seconds,
        summary.updates as f64 / summary.elapsed_seconds.max(f64::EPSILON)
    );
}

/// A checkpoint file as given, or the newest checkpoint inside a directory.
fn resolve_checkpoint(path: &Path, checkpoint: &CheckpointConfig) -> PathBuf {
    if !path.is_dir() {
        return path.to_path_buf();
    }
    let config = CheckpointConfig {
        directory: Some(path.to_string_lossy().into_owned()),
        ..checkpoint.clone()
    };
    latest_checkpoint(&config)
        .unwrap_or_else(|e| fail(format!("scanning {}: {e}", path.display())))
        .unwrap_or_else(|| {
            fail(format!(
                "no '{}-<update>.json' checkpoint in {}",
                config.prefix,
                path.display()
            ))
        })
}

fn run_single(config: EaConfig, options: &Options) -> RunSummary {
    println!("Task: {:?}", options.task);
    println!("Population: {}", config.population.size);
    println!("Updates: {}", config.run.total_updates());
    println!();

    let fitness = options.task.fitness(&config);
    let mut ea = EvolutionaryAlgorithm::new(config, fitness).unwrap_or_else(|e| fail(e));
    if let Some(path) = &options.resume {
        let path = resolve_checkpoint(path, &ea.config().checkpoint);
        ea.load_checkpoint(&path).unwrap_or_else(|e| fail(e));
        println!("Resumed at update {} from {}", ea.update(), path.display());
    }

    let total = ea.config().run.total_updates();
    let progress = (total / 10).max(1);
    ea.run_with_callback(|event| {
        if event.update % progress == 0 {
            println!(
                "  Update {}/{}: best={:.4}, mean={:.4}, length={:.1}",
                event.update,
                event.total_updates,
                event.stats.best_fitness,
                event.stats.mean_fitness,
                event.stats.mean_genome_len
            );
        }
    })
    .unwrap_or_else(|e| fail(e))
}

fn run_meta(config: MetaPopulationConfig, options: &Options) -> RunSummary {
    println!("Task: {:?}", options.task);
    println!(
        "Islands: {} x {} individuals",
        config.size, config.island.population.size
    );
    println!("Updates: {}", config.island.run.total_updates());
    println!();

    let fitness = options.task.fitness(&config.island);
    let mut meta = MetaPopulation::new(config, fitness).unwrap_or_else(|e| fail(e));
    if let Some(path) = &options.resume {
        let path = resolve_checkpoint(path, &meta.config().island.checkpoint);
        meta.load_checkpoint(&path).unwrap_or_else(|e| fail(e));
        println!("Resumed at update {} from {}", meta.update(), path.display());
    }

    let total = meta.config().island.run.total_updates();
    let progress = (total / 10).max(1);
    meta.run_with_callback(|event| {
        if event.update % progress == 0 {
            let bests: Vec<String> = event
                .islands
                .iter()
                .map(|island| format!("{:.1}", island.stats().best_fitness))
                .collect();
            println!(
                "  Update {}/{}: best={:.4}, mean={:.4}, islands=[{}]",
                event.update,
                event.total_updates,
                event.stats.best_fitness,
                event.stats.mean_fitness,
                bests.join(", ")
            );
        }
    })
    .unwrap_or_else(|e| fail(e))
}

fn print_example_config(meta: bool) {
    let json = if meta {
        serde_json::to_string_pretty(&MetaPopulationConfig::default())
    } else {
        serde_json::to_string_pretty(&EaConfig::default())
    };
    match json {
        Ok(json) => println!("{json}"),
        Err(e) => fail(e),
    }
}
