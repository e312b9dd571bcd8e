use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::error;
use tracing_subscriber::EnvFilter;

use inception_nn::train::save_results;
use inception_nn::{
    Architecture, Error, EvolutionConfig, EvolutionaryTrainer, ExperimentRunner, OptimizerConfig,
    Presentation, Report, Result, RunResult, Task, TrainConfig, TrainingLoop,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OptimizerChoice {
    Static,
    Momentum,
    Adam,
}

#[derive(Parser, Debug)]
#[command(name = "inception", about = "Convergence experiments on tiny feed-forward networks")]
struct Cli {
    /// Seed for single runs.
    #[arg(long, default_value_t = 9)]
    seed: u64,

    /// Train xor once, plain against inception.
    #[arg(long)]
    xor: bool,

    /// Repeat the xor comparison over many seeds.
    #[arg(long)]
    xor_repeated: bool,

    /// Train iris once, plain against inception.
    #[arg(long)]
    iris: bool,

    /// Repeat the iris comparison over many seeds.
    #[arg(long)]
    iris_repeated: bool,

    /// Use the evolutionary trainer instead of gradient descent.
    #[arg(long, conflicts_with_all = ["optimizer", "contextual", "batch_size"])]
    evolve: bool,

    /// Update rule; defaults to the task's own.
    #[arg(long, value_enum)]
    optimizer: Option<OptimizerChoice>,

    /// Keep one optimizer state per training example.
    #[arg(long)]
    contextual: bool,

    /// Present examples in batches of this size.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Hidden units.
    #[arg(long, default_value_t = 3)]
    width: usize,

    /// Seeds per repeated experiment.
    #[arg(long, default_value_t = 256)]
    runs: usize,

    /// Worker threads; 0 lets rayon decide.
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Train once per seed with the configuration in this JSON file, task
    /// and architecture included. A repeated flag must name the same task.
    #[arg(
        long,
        conflicts_with_all = ["xor", "iris", "evolve", "optimizer", "contextual", "batch_size", "width"]
    )]
    config: Option<PathBuf>,

    /// Write every run result to this JSON file.
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn task(&self) -> Option<Task> {
        if self.xor || self.xor_repeated {
            Some(Task::Xor)
        } else if self.iris || self.iris_repeated {
            Some(Task::Iris)
        } else {
            None
        }
    }

    fn repeated(&self) -> bool {
        self.xor_repeated || self.iris_repeated
    }

    fn train_config(&self, task: Task) -> Result<TrainConfig> {
        let optimizer = match self.optimizer {
            None => task.default_optimizer(),
            Some(OptimizerChoice::Static) => OptimizerConfig::Static { learning_rate: task.learning_rate() },
            Some(OptimizerChoice::Momentum) => task.momentum(),
            Some(OptimizerChoice::Adam) => OptimizerConfig::adam(),
        };
        let presentation = match self.batch_size {
            Some(size) => Presentation::Batch { size },
            None => Presentation::Online,
        };
        let config = TrainConfig {
            width: self.width,
            optimizer,
            contextual: self.contextual,
            presentation,
            ..TrainConfig::new(task)
        };
        config.validate()?;
        Ok(config)
    }

    fn loaded_config(&self, path: &Path) -> Result<TrainConfig> {
        let config = TrainConfig::load_json(path)?;
        if let Some(task) = self.task() {
            if task != config.task {
                return Err(Error::InvalidConfig(format!(
                    "{} is a {} configuration, not {}",
                    path.display(),
                    config.task.name(),
                    task.name()
                )));
            }
        }
        config.validate()?;
        Ok(config)
    }

    fn runner(&self) -> ExperimentRunner {
        if self.repeated() {
            ExperimentRunner::new(self.runs, 1, self.threads)
        } else {
            ExperimentRunner::new(1, self.seed, self.threads)
        }
    }

    /// Repeated runs already saturate the pool, so each trainer then works
    /// on a single thread.
    fn evolution_config(&self, task: Task) -> EvolutionConfig {
        let threads = if self.repeated() { 1 } else { self.threads };
        EvolutionConfig { width: self.width, threads, ..EvolutionConfig::new(task) }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "experiment failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let reports = match (&cli.config, cli.task()) {
        (Some(path), _) => vec![run_loaded(cli, cli.loaded_config(path)?)?],
        (None, Some(task)) => compare(cli, task)?,
        (None, None) => {
            return Err(Error::InvalidConfig(
                "choose one of --xor, --xor-repeated, --iris, --iris-repeated or --config".into(),
            ))
        }
    };

    for report in &reports {
        print_report(report, cli.repeated());
    }

    if let Some(path) = &cli.output {
        let all: Vec<RunResult> = reports.iter().flat_map(|r| r.results.iter().cloned()).collect();
        save_results(path, &all)?;
    }
    Ok(())
}

/// The loaded configuration as written, as a single labelled experiment.
fn run_loaded(cli: &Cli, config: TrainConfig) -> Result<Report> {
    let dataset = config.task.dataset();
    let experiment = |seed: u64| -> Result<RunResult> { TrainingLoop::new(config.clone(), &dataset, seed)?.run() };
    cli.runner().run(label(config.architecture), experiment)
}

/// Plain layers against inception layers, once or over many seeds.
fn compare(cli: &Cli, task: Task) -> Result<Vec<Report>> {
    let dataset = task.dataset();
    let runner = cli.runner();
    let plain = Architecture::Plain;
    let inception = Architecture::inception();

    let (normal, deep) = if cli.evolve {
        let config = cli.evolution_config(task);
        let evolve = |architecture: Architecture| {
            let config = EvolutionConfig { architecture, ..config.clone() };
            let dataset = &dataset;
            move |seed: u64| -> Result<RunResult> { EvolutionaryTrainer::new(config.clone(), dataset, seed)?.run() }
        };
        runner.compare((label(plain), evolve(plain)), (label(inception), evolve(inception)))?
    } else {
        let config = cli.train_config(task)?;
        let train = |architecture: Architecture| {
            let config = TrainConfig { architecture, ..config.clone() };
            let dataset = &dataset;
            move |seed: u64| -> Result<RunResult> { TrainingLoop::new(config.clone(), dataset, seed)?.run() }
        };
        runner.compare((label(plain), train(plain)), (label(inception), train(inception)))?
    };
    Ok(vec![normal, deep])
}

fn label(architecture: Architecture) -> &'static str {
    match architecture {
        Architecture::Plain => "normal",
        Architecture::Inception { .. } => "inception",
        Architecture::Dct => "dct",
    }
}

fn print_report(report: &Report, repeated: bool) {
    if repeated {
        println!("{report}");
        return;
    }
    for result in &report.results {
        println!(
            "{}: converged={} epochs={} final_cost={:.6} misses={}",
            report.label,
            result.converged,
            result.epochs(),
            result.final_cost().unwrap_or(f32::NAN),
            result.misses
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("inception-cli-{name}-{}.json", std::process::id()))
    }

    #[test]
    fn evolve_rejects_gradient_flags() {
        for flag in ["--optimizer=adam", "--contextual", "--batch-size=4"] {
            assert!(Cli::try_parse_from(["inception", "--xor", "--evolve", flag]).is_err(), "{flag}");
        }
        assert!(Cli::try_parse_from(["inception", "--xor", "--evolve", "--width=4"]).is_ok());
    }

    #[test]
    fn config_rejects_overriding_flags() {
        for flag in ["--xor", "--iris", "--evolve", "--optimizer=adam", "--contextual", "--batch-size=4", "--width=5"] {
            assert!(Cli::try_parse_from(["inception", "--config=run.json", flag]).is_err(), "{flag}");
        }
        assert!(Cli::try_parse_from(["inception", "--config=run.json", "--iris-repeated"]).is_ok());
    }

    #[test]
    fn loaded_config_keeps_its_architecture() {
        let config = TrainConfig { architecture: Architecture::Dct, max_epochs: 2, ..TrainConfig::new(Task::Iris) };
        let path = config_path("dct");
        config.save_json(&path).unwrap();

        let cli = Cli::try_parse_from(["inception".to_string(), format!("--config={}", path.display())]).unwrap();
        let loaded = cli.loaded_config(&path).unwrap();
        assert_eq!(loaded, config);

        let report = run_loaded(&cli, loaded).unwrap();
        assert_eq!(report.label, "dct");
        assert_eq!(report.results.len(), 1);
        assert!(report.results[0].epochs() <= 2);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn loaded_config_must_match_the_repeated_task() {
        let path = config_path("xor");
        TrainConfig::new(Task::Xor).save_json(&path).unwrap();

        let cli = Cli::try_parse_from(["inception".to_string(), format!("--config={}", path.display()), "--iris-repeated".into()])
            .unwrap();
        assert!(matches!(cli.loaded_config(&path), Err(Error::InvalidConfig(_))));
        std::fs::remove_file(&path).unwrap();
    }
}
