//! Genetic algorithm engine for a single optimization run.
//!
//! A run moves through three states:
//!
//! ```text
//! Idle --evaluate--> Evaluated --new generation--> Idle
//!                        |
//!                        +--target reached / cap hit / cancelled--> Terminated
//! ```
//!
//! Every call to [`GeneticAlgorithm::run_iteration`] evaluates exactly one
//! generation, so a host can drive the run one generation at a time (see
//! [`GeneticAlgorithm::generations`]) and interleave other work between them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::schema::{GeneBounds, GeneticAlgorithmConfig, OddParentPolicy};

use super::EvolutionError;
use super::fitness::{FitnessEvaluator, RunContext};
use super::genome::{Chromosome, GeneRng};
use super::population::{Individual, Population};

/// Candidates drawn per tournament.
pub const TOURNAMENT_SIZE: usize = 3;

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Current population has not been scored yet.
    Idle,
    /// Current population is scored and the run continues.
    Evaluated,
    /// No further iterations are allowed.
    Terminated,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    MaxGenerations,
    Cancelled,
}

/// Snapshot reported after each generation.
#[derive(Debug, Clone)]
pub struct GenerationProgress {
    /// Index of the generation just evaluated.
    pub generation: usize,
    /// Generations evaluated so far in this run.
    pub generations_executed: usize,
    pub max_generations: usize,
    /// Best fitness seen in any generation.
    pub best_fitness: f64,
    /// Best fitness in the generation just evaluated.
    pub generation_best: f64,
    pub mean_fitness: f64,
    /// Mean pairwise gene distance of the evaluated population.
    pub diversity: f64,
    /// `generations_executed / max_generations`, capped at 1.
    pub completion: f64,
    pub done: bool,
}

/// Statistics of the most recently evaluated generation.
#[derive(Debug, Clone, Copy, Default)]
struct GenerationStats {
    best: f64,
    mean: f64,
    diversity: f64,
}

/// Outcome of a finished run.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Best individual seen over the whole run.
    pub best: Individual,
    pub best_fitness: f64,
    /// Generations evaluated.
    pub generations: usize,
    pub stop_reason: StopReason,
}

/// Genetic algorithm over a [`Population`] of joint-angle chromosomes.
///
/// The target is opaque to the engine and only handed to the evaluator.
pub struct GeneticAlgorithm<T> {
    config: GeneticAlgorithmConfig,
    target: T,
    reference: Option<Chromosome>,
    evaluator: Option<Arc<dyn FitnessEvaluator<T>>>,
    rng: GeneRng,
    population: Population,
    generation: usize,
    generations_executed: usize,
    best: Option<Individual>,
    last_stats: GenerationStats,
    state: RunState,
    stop_reason: Option<StopReason>,
    cancelled: Arc<AtomicBool>,
}

impl<T: Sync> GeneticAlgorithm<T> {
    /// Create a run with a fresh random population.
    ///
    /// No evaluator is attached yet; scoring fails with
    /// [`EvolutionError::NotImplemented`] until one is supplied.
    pub fn new(target: T, config: GeneticAlgorithmConfig) -> Result<Self, EvolutionError> {
        config.validate()?;

        let seed = config.random_seed.unwrap_or_else(rand::random);
        let mut rng = GeneRng::new(seed);
        let population = Population::new(config.population_size, config.angle_range, &mut rng);

        Ok(Self {
            config,
            target,
            reference: None,
            evaluator: None,
            rng,
            population,
            generation: 0,
            generations_executed: 0,
            best: None,
            last_stats: GenerationStats::default(),
            state: RunState::Idle,
            stop_reason: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Attach the fitness strategy.
    pub fn with_evaluator<E>(mut self, evaluator: E) -> Self
    where
        E: FitnessEvaluator<T> + 'static,
    {
        self.evaluator = Some(Arc::new(evaluator));
        self
    }

    /// Attach a closure as the fitness strategy.
    pub fn with_evaluator_fn<F>(self, evaluator: F) -> Self
    where
        F: Fn(&Chromosome, &RunContext<'_, T>) -> Result<f64, EvolutionError>
            + Send
            + Sync
            + 'static,
    {
        self.with_evaluator(evaluator)
    }

    /// Attach a fitness strategy shared with other runs.
    pub fn with_shared_evaluator(mut self, evaluator: Arc<dyn FitnessEvaluator<T>>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Chromosome the evaluator may penalize deviation from.
    pub fn with_reference(mut self, reference: Chromosome) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Share a cancellation flag, checked between generations.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn config(&self) -> &GeneticAlgorithmConfig {
        &self.config
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Index of the current generation.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn generations_executed(&self) -> usize {
        self.generations_executed
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// Best individual seen so far.
    pub fn best(&self) -> Option<&Individual> {
        self.best.as_ref()
    }

    /// Warm-start: re-seed the population around a known-good chromosome.
    pub fn initialize_near(
        &mut self,
        seed: &Chromosome,
        variance: f64,
    ) -> Result<(), EvolutionError> {
        if self.state == RunState::Terminated {
            return Err(EvolutionError::RunTerminated);
        }
        self.population
            .initialize_near(seed, variance, &mut self.rng)?;
        self.state = RunState::Idle;
        Ok(())
    }

    /// Score every individual in the current population.
    pub fn evaluate_fitness(&mut self) -> Result<(), EvolutionError> {
        let evaluator = self
            .evaluator
            .as_deref()
            .ok_or(EvolutionError::NotImplemented)?;
        let ctx = RunContext {
            target: &self.target,
            reference: self.reference.as_ref(),
            generation: self.generation,
        };

        let scores = score_population(
            evaluator,
            &ctx,
            self.population.individuals(),
            self.config.parallel_evaluation,
        )?;

        for (individual, fitness) in self.population.individuals_mut().iter_mut().zip(scores) {
            individual.set_fitness(fitness);
        }
        self.state = RunState::Evaluated;
        Ok(())
    }

    /// Index of a tournament winner; ties keep the first drawn.
    fn tournament_index(&mut self) -> usize {
        let mut best_idx = self.population.random_index(&mut self.rng);
        for _ in 1..TOURNAMENT_SIZE {
            let idx = self.population.random_index(&mut self.rng);
            if self.population.individuals()[idx].rank_fitness()
                > self.population.individuals()[best_idx].rank_fitness()
            {
                best_idx = idx;
            }
        }
        best_idx
    }

    /// Tournament selection: `population_size` winners, drawn with replacement.
    pub fn select_parents(&mut self) -> Vec<Individual> {
        (0..self.config.population_size)
            .map(|_| {
                let idx = self.tournament_index();
                self.population.individuals()[idx].clone()
            })
            .collect()
    }

    /// Single-point crossover with probability `crossover_rate`, else clones.
    pub fn crossover(&mut self, parent1: &Individual, parent2: &Individual) -> [Individual; 2] {
        if !self.rng.chance(self.config.crossover_rate) {
            return [parent1.clone(), parent2.clone()];
        }

        let cut = self.rng.cut_point();
        let (first, second) = parent1.chromosome().crossover_at(parent2.chromosome(), cut);
        [Individual::new(first), Individual::new(second)]
    }

    /// Perturb each gene with probability `mutation_rate`, in place.
    pub fn mutate(&mut self, individual: &mut Individual) {
        let chromosome = individual.chromosome_mut();
        self.rng.mutate(
            chromosome,
            self.config.mutation_rate,
            self.config.mutation_step,
        );
        if self.config.gene_bounds == GeneBounds::ClampToRange {
            chromosome.clamp(self.config.angle_range);
        }
    }

    /// Breed the next generation and replace the population wholesale.
    ///
    /// Parents are paired consecutively. With an odd parent count the last
    /// parent is handled by [`OddParentPolicy`]; the child list is then
    /// truncated or padded to exactly `population_size`.
    pub fn create_new_generation(&mut self) {
        let size = self.config.population_size;
        let parents = self.select_parents();
        let mut children = Vec::with_capacity(size + 1);

        let mut pairs = parents.chunks_exact(2);
        for pair in &mut pairs {
            for mut child in self.crossover(&pair[0], &pair[1]) {
                self.mutate(&mut child);
                children.push(child);
            }
        }

        if let [odd] = pairs.remainder() {
            match self.config.odd_parent_policy {
                OddParentPolicy::CloneForward => children.push(odd.clone()),
                OddParentPolicy::PairWithSelf => {
                    for mut child in self.crossover(odd, odd) {
                        self.mutate(&mut child);
                        children.push(child);
                    }
                }
                OddParentPolicy::Drop => log::trace!("Dropping unpaired parent"),
            }
        }

        while children.len() < size {
            let idx = self.tournament_index();
            children.push(self.population.individuals()[idx].clone());
        }
        children.truncate(size);

        self.population.replace(children);
        self.generation += 1;
        self.state = RunState::Idle;
    }

    fn finish(&mut self, reason: StopReason) {
        self.stop_reason = Some(reason);
        self.state = RunState::Terminated;
    }

    /// Evaluate one generation and either finish or breed the next.
    ///
    /// Returns `Ok(true)` exactly once, when the best fitness reaches
    /// `target_fitness`, the generation cap is hit, or cancellation was
    /// requested. Calling again afterwards is an error.
    pub fn run_iteration(&mut self) -> Result<bool, EvolutionError> {
        if self.state == RunState::Terminated {
            return Err(EvolutionError::RunTerminated);
        }

        self.evaluate_fitness()?;
        self.generations_executed += 1;
        self.last_stats = GenerationStats {
            best: self.population.best().map_or(0.0, Individual::rank_fitness),
            mean: self.population.mean_fitness(),
            diversity: self.population.diversity(),
        };

        if let Some(current) = self.population.best()
            && self
                .best
                .as_ref()
                .is_none_or(|best| current.rank_fitness() > best.rank_fitness())
        {
            self.best = Some(current.clone());
        }

        let best_fitness = self.best.as_ref().map_or(0.0, Individual::rank_fitness);
        log::debug!(
            "Generation {}: best fitness = {:.6}",
            self.generation,
            best_fitness
        );

        if best_fitness >= self.config.target_fitness {
            self.finish(StopReason::TargetReached);
            return Ok(true);
        }
        if self.generations_executed >= self.config.max_generations {
            self.finish(StopReason::MaxGenerations);
            return Ok(true);
        }
        if self.cancelled.load(Ordering::Relaxed) {
            log::warn!("Run cancelled after generation {}", self.generation);
            self.finish(StopReason::Cancelled);
            return Ok(true);
        }

        self.create_new_generation();
        Ok(false)
    }

    /// Iterate the run one generation at a time.
    pub fn generations(&mut self) -> Generations<'_, T> {
        Generations {
            engine: self,
            failed: false,
        }
    }

    /// Get current progress.
    pub fn progress(&self) -> GenerationProgress {
        GenerationProgress {
            generation: self.generations_executed.saturating_sub(1),
            generations_executed: self.generations_executed,
            max_generations: self.config.max_generations,
            best_fitness: self.best.as_ref().map_or(0.0, Individual::rank_fitness),
            generation_best: self.last_stats.best,
            mean_fitness: self.last_stats.mean,
            diversity: self.last_stats.diversity,
            completion: (self.generations_executed as f64 / self.config.max_generations as f64)
                .min(1.0),
            done: self.state == RunState::Terminated,
        }
    }

    /// Result of a terminated run.
    pub fn result(&self) -> Option<RunResult> {
        let best = self.best.clone()?;
        let stop_reason = self.stop_reason?;
        Some(RunResult {
            best_fitness: best.rank_fitness(),
            best,
            generations: self.generations_executed,
            stop_reason,
        })
    }

    /// Run to completion with progress callback.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<RunResult, EvolutionError>
    where
        F: FnMut(&GenerationProgress),
    {
        for progress in self.generations() {
            callback(&progress?);
        }
        self.result().ok_or(EvolutionError::NotEvaluated)
    }

    /// Run to completion (blocking).
    pub fn run(&mut self) -> Result<RunResult, EvolutionError> {
        self.run_with_callback(|_| {})
    }
}

/// Iterator over the generations of a run; see [`GeneticAlgorithm::generations`].
///
/// Each item is yielded after a whole generation has been evaluated, and the
/// iterator ends once the run terminates or an error is returned.
pub struct Generations<'a, T> {
    engine: &'a mut GeneticAlgorithm<T>,
    failed: bool,
}

impl<T: Sync> Iterator for Generations<'_, T> {
    type Item = Result<GenerationProgress, EvolutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.engine.state == RunState::Terminated {
            return None;
        }
        match self.engine.run_iteration() {
            Ok(_) => Some(Ok(self.engine.progress())),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

fn score<T: Sync>(
    evaluator: &dyn FitnessEvaluator<T>,
    ctx: &RunContext<'_, T>,
    individual: &Individual,
) -> Result<f64, EvolutionError> {
    individual.chromosome().ensure_finite()?;
    let fitness = evaluator.evaluate(individual.chromosome(), ctx)?;
    if fitness.is_finite() && fitness > 0.0 && fitness <= 1.0 {
        Ok(fitness)
    } else {
        Err(EvolutionError::InvalidFitness(fitness))
    }
}

#[cfg(feature = "parallel")]
fn score_population<T: Sync>(
    evaluator: &dyn FitnessEvaluator<T>,
    ctx: &RunContext<'_, T>,
    individuals: &[Individual],
    parallel: bool,
) -> Result<Vec<f64>, EvolutionError> {
    if parallel {
        individuals
            .par_iter()
            .map(|individual| score(evaluator, ctx, individual))
            .collect()
    } else {
        individuals
            .iter()
            .map(|individual| score(evaluator, ctx, individual))
            .collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn score_population<T: Sync>(
    evaluator: &dyn FitnessEvaluator<T>,
    ctx: &RunContext<'_, T>,
    individuals: &[Individual],
    _parallel: bool,
) -> Result<Vec<f64>, EvolutionError> {
    individuals
        .iter()
        .map(|individual| score(evaluator, ctx, individual))
        .collect()
}
