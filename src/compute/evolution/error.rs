//! Errors raised while running an optimization.

use crate::schema::ConfigError;

/// Errors from building or driving a genetic algorithm run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvolutionError {
    #[error("Fitness evaluation is not implemented: no evaluator was supplied")]
    NotImplemented,
    #[error("Gene {index} is not a finite number ({value})")]
    NonFiniteGene { index: usize, value: f64 },
    #[error("Evaluator returned fitness {0}, expected a value in (0, 1]")]
    InvalidFitness(f64),
    #[error("Seed variance must lie in [0, f64::MAX / 4], got {0}")]
    InvalidVariance(f64),
    #[error("Run has already terminated")]
    RunTerminated,
    #[error("Run has not evaluated any individuals")]
    NotEvaluated,
    #[error(transparent)]
    Config(#[from] ConfigError),
}
