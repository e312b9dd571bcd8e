use inception_nn::experiment::{ExperimentRunner, Statistics};
use inception_nn::train::{Phase, Presentation, RunResult, Task, TrainConfig, TrainingLoop};
use inception_nn::{Architecture, Dataset, EvolutionConfig, EvolutionaryTrainer, OptimizerConfig};

#[test]
fn xor_online_momentum_converges() {
    let data = Dataset::xor();
    let config = TrainConfig { optimizer: Task::Xor.momentum(), ..TrainConfig::new(Task::Xor) };

    let mut run = TrainingLoop::new(config.clone(), &data, 9).unwrap();
    let result = run.run().unwrap();
    assert!(result.converged);

    assert_eq!(run.phase(), Phase::Converged);
    assert!(result.costs.len() <= 10_000);
    assert!(*result.costs.last().unwrap() < 0.1);

    let network = run.network();
    assert!(network.forward(&[0.0, 0.0])[0] < 0.5);
    assert!(network.forward(&[1.0, 0.0])[0] >= 0.5);
    assert!(network.forward(&[0.0, 1.0])[0] >= 0.5);
    assert!(network.forward(&[1.0, 1.0])[0] < 0.5);

    // Running on after convergence keeps producing valid results.
    assert!(run.run().is_ok());

    let again = TrainingLoop::new(config, &data, 9).unwrap().run().unwrap();
    assert_eq!(again, result);
}

#[test]
fn contextual_adam_iris_is_reproducible() {
    let data = Dataset::iris();
    let config = TrainConfig {
        optimizer: OptimizerConfig::adam(),
        contextual: true,
        presentation: Presentation::Batch { size: 10 },
        max_epochs: 15,
        ..TrainConfig::new(Task::Iris)
    };
    let experiment = |seed: u64| -> inception_nn::Result<RunResult> {
        TrainingLoop::new(config.clone(), &data, seed)?.run()
    };

    let first = ExperimentRunner::new(6, 1, 3).run("iris", experiment).unwrap();
    let second = ExperimentRunner::new(6, 1, 1).run("iris", experiment).unwrap();

    assert_eq!(first.statistics, second.statistics);
    assert_eq!(
        first.statistics.convergence_probability().to_bits(),
        second.statistics.convergence_probability().to_bits()
    );
    for (a, b) in first.results.iter().zip(&second.results) {
        let bits = |costs: &[f32]| costs.iter().map(|c| c.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a.costs), bits(&b.costs));
    }
    // Different seeds give different trajectories.
    assert_ne!(first.results[0].costs, first.results[1].costs);
}

#[test]
fn every_architecture_trains() {
    let data = Dataset::iris();
    for architecture in [Architecture::Plain, Architecture::inception(), Architecture::Inception { depth: 2 }, Architecture::Dct] {
        let config = TrainConfig { architecture, max_epochs: 3, ..TrainConfig::new(Task::Iris) };
        let result = TrainingLoop::new(config, &data, 7).unwrap().run().unwrap();
        assert_eq!(result.costs.len(), 3, "{architecture:?}");
        assert!(result.costs.iter().all(|c| c.is_finite() && *c > 0.0), "{architecture:?}");
    }
}

#[test]
fn iris_momentum_lowers_the_epoch_cost() {
    let data = Dataset::iris();
    let config = TrainConfig { max_epochs: 30, ..TrainConfig::new(Task::Iris) };
    let result = TrainingLoop::new(config, &data, 1).unwrap().run().unwrap();
    let costs = &result.costs;
    assert!(costs[costs.len() - 1] < costs[0], "{costs:?}");
}

#[test]
fn evolution_runs_through_the_runner() {
    let data = Dataset::xor();
    let config = EvolutionConfig {
        population: 20,
        crossover_pairs: 5,
        max_generations: 5,
        threads: 1,
        ..EvolutionConfig::new(Task::Xor)
    };
    let report = ExperimentRunner::new(3, 1, 3)
        .run("evolve", |seed| EvolutionaryTrainer::new(config.clone(), &data, seed)?.run())
        .unwrap();

    assert_eq!(report.statistics.count, 3);
    for result in &report.results {
        assert!(!result.costs.is_empty() && result.costs.len() <= 5);
        assert!(result.costs.iter().all(|c| c.is_finite()));
    }
    let merged: Statistics = report.results.iter().collect();
    assert_eq!(merged, report.statistics);
}
