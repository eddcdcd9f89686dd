//! Evolutionary inverse-kinematics search.
//!
//! # Overview
//!
//! - **Genome** (`genome`): 9-gene chromosomes, random generation, crossover, mutation
//! - **Population** (`population`): individuals with optional fitness
//! - **Fitness** (`fitness`): pluggable evaluators, including [`IkFitness`]
//! - **Search** (`search`): the [`GeneticAlgorithm`] engine, one generation per step
//! - **Driver** (`driver`): walks a target path, one warm-started run per segment
//!
//! # Example
//!
//! ```rust,no_run
//! use arm_ik::compute::KinematicChain;
//! use arm_ik::compute::evolution::{GeneticAlgorithm, IkFitness};
//! use arm_ik::schema::GeneticAlgorithmConfig;
//! use nalgebra::Point3;
//!
//! let chain = KinematicChain::default();
//! let mut engine = GeneticAlgorithm::new(Point3::new(0.0, 3.0, 0.0), GeneticAlgorithmConfig::default())?
//!     .with_evaluator(IkFitness::new(&chain));
//!
//! let result = engine.run_with_callback(|progress| {
//!     println!("Generation {}: best fitness = {:.3}",
//!         progress.generation, progress.best_fitness);
//! })?;
//! println!("Best fitness: {:.3}", result.best_fitness);
//! # Ok::<(), arm_ik::compute::evolution::EvolutionError>(())
//! ```

mod driver;
mod error;
mod fitness;
mod genome;
mod population;
mod search;

pub use driver::{BatchSummary, DriverError, SegmentDriver, SegmentReport};
pub use error::EvolutionError;
pub use fitness::{FitnessEvaluator, IkFitness, RunContext, fitness_from_error};
pub use genome::{Chromosome, GENE_COUNT, GeneRng, chromosome_distance};
pub use population::{Individual, Population};
pub use search::{
    GenerationProgress, Generations, GeneticAlgorithm, RunResult, RunState, StopReason,
    TOURNAMENT_SIZE,
};
