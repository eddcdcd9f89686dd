//! Fitness evaluation strategies.
//!
//! The engine scores each chromosome through a [`FitnessEvaluator`] injected
//! at construction. [`IkFitness`] is the inverse-kinematics strategy: distance
//! from the arm's tip to the target, optionally plus a penalty for straying
//! from a reference chromosome, mapped to `1 / (1 + error)`.

use nalgebra::Point3;

use super::EvolutionError;
use super::genome::{Chromosome, chromosome_distance};
use crate::compute::{JOINT_COUNT, KinematicChain, forward_kinematics};
use crate::schema::{DEFAULT_DEVIATION_WEIGHT, Segment};

/// Read-only view of the run handed to the evaluator.
#[derive(Debug)]
pub struct RunContext<'a, T> {
    /// The run's target, opaque to the engine.
    pub target: &'a T,
    /// Chromosome to stay close to, if any.
    pub reference: Option<&'a Chromosome>,
    /// Generation being evaluated.
    pub generation: usize,
}

/// Scores a chromosome in `(0, 1]`; 1 is a perfect match.
pub trait FitnessEvaluator<T>: Send + Sync {
    fn evaluate(
        &self,
        chromosome: &Chromosome,
        ctx: &RunContext<'_, T>,
    ) -> Result<f64, EvolutionError>;
}

impl<T, F> FitnessEvaluator<T> for F
where
    F: Fn(&Chromosome, &RunContext<'_, T>) -> Result<f64, EvolutionError> + Send + Sync,
{
    fn evaluate(
        &self,
        chromosome: &Chromosome,
        ctx: &RunContext<'_, T>,
    ) -> Result<f64, EvolutionError> {
        self(chromosome, ctx)
    }
}

/// Map a non-negative error to a fitness in `(0, 1]`.
#[inline]
pub fn fitness_from_error(error: f64) -> f64 {
    1.0 / (1.0 + error)
}

/// Inverse-kinematics fitness for the 3-link arm.
///
/// Holds a copy of the arm geometry and evaluates forward kinematics as a
/// pure function, so scoring never touches a live chain.
#[derive(Debug, Clone)]
pub struct IkFitness {
    base: Point3<f64>,
    link_lengths: [f64; JOINT_COUNT],
    deviation_weight: f64,
}

impl IkFitness {
    /// Evaluator for the geometry of `chain`.
    pub fn new(chain: &KinematicChain) -> Self {
        Self {
            base: chain.base_position(),
            link_lengths: *chain.link_lengths(),
            deviation_weight: DEFAULT_DEVIATION_WEIGHT,
        }
    }

    /// Per-gene weight applied when the run has a reference chromosome.
    pub fn with_deviation_weight(mut self, weight: f64) -> Self {
        self.deviation_weight = weight;
        self
    }

    /// Tip position for `chromosome`.
    pub fn end_effector(&self, chromosome: &Chromosome) -> Point3<f64> {
        forward_kinematics(&self.base, &self.link_lengths, &chromosome.to_joint_angles())
    }

    /// Summed distance from the tip to every point, plus the deviation penalty.
    pub fn error(
        &self,
        chromosome: &Chromosome,
        points: &[Point3<f64>],
        reference: Option<&Chromosome>,
    ) -> Result<f64, EvolutionError> {
        chromosome.ensure_finite()?;

        let tip = self.end_effector(chromosome);
        let positional: f64 = points.iter().map(|p| (tip - p).norm()).sum();

        let deviation = match reference {
            Some(reference) => {
                reference.ensure_finite()?;
                chromosome_distance(chromosome, reference) * self.deviation_weight
            }
            None => 0.0,
        };

        Ok(positional + deviation)
    }
}

impl FitnessEvaluator<Segment> for IkFitness {
    fn evaluate(
        &self,
        chromosome: &Chromosome,
        ctx: &RunContext<'_, Segment>,
    ) -> Result<f64, EvolutionError> {
        let error = self.error(chromosome, &ctx.target.points, ctx.reference)?;
        Ok(fitness_from_error(error))
    }
}

impl FitnessEvaluator<Point3<f64>> for IkFitness {
    fn evaluate(
        &self,
        chromosome: &Chromosome,
        ctx: &RunContext<'_, Point3<f64>>,
    ) -> Result<f64, EvolutionError> {
        let error = self.error(chromosome, std::slice::from_ref(ctx.target), ctx.reference)?;
        Ok(fitness_from_error(error))
    }
}
