//! Chromosome representation and the random operators that act on it.
//!
//! Provides random generation, warm-start perturbation, single-point
//! crossover and uniform mutation.

use std::ops::Index;

use rand::prelude::*;
use rand_distr::Uniform;
use serde::{Deserialize, Serialize};

use super::EvolutionError;
use crate::compute::{JOINT_COUNT, JointAngles};

/// Genes per chromosome: an (x, y, z) rotation for every joint.
pub const GENE_COUNT: usize = JOINT_COUNT * 3;

/// Joint angles flattened joint by joint: `[x0, y0, z0, x1, .., z2]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chromosome([f64; GENE_COUNT]);

impl Chromosome {
    pub fn new(genes: [f64; GENE_COUNT]) -> Self {
        Self(genes)
    }

    /// The rest pose.
    pub fn zeros() -> Self {
        Self([0.0; GENE_COUNT])
    }

    pub fn genes(&self) -> &[f64; GENE_COUNT] {
        &self.0
    }

    pub fn genes_mut(&mut self) -> &mut [f64; GENE_COUNT] {
        &mut self.0
    }

    /// Reshape into one rotation triple per joint.
    pub fn to_joint_angles(&self) -> JointAngles {
        let mut angles = [[0.0; 3]; JOINT_COUNT];
        for (joint, genes) in angles.iter_mut().zip(self.0.chunks_exact(3)) {
            joint.copy_from_slice(genes);
        }
        angles
    }

    pub fn from_joint_angles(angles: &JointAngles) -> Self {
        let mut genes = [0.0; GENE_COUNT];
        for (chunk, joint) in genes.chunks_exact_mut(3).zip(angles) {
            chunk.copy_from_slice(joint);
        }
        Self(genes)
    }

    /// Fail on the first NaN or infinite gene.
    pub fn ensure_finite(&self) -> Result<(), EvolutionError> {
        match self.0.iter().position(|g| !g.is_finite()) {
            Some(index) => Err(EvolutionError::NonFiniteGene {
                index,
                value: self.0[index],
            }),
            None => Ok(()),
        }
    }

    /// Single-point crossover at `cut`: genes before the cut stay, tails swap.
    ///
    /// `cut` is clamped to [`GENE_COUNT`]; a cut of 0 swaps the parents
    /// entirely and a cut of `GENE_COUNT` returns them unchanged.
    pub fn crossover_at(&self, other: &Self, cut: usize) -> (Self, Self) {
        let cut = cut.min(GENE_COUNT);
        let mut first = *self;
        let mut second = *other;
        first.0[cut..].copy_from_slice(&other.0[cut..]);
        second.0[cut..].copy_from_slice(&self.0[cut..]);
        (first, second)
    }

    /// Clamp every gene to `[-range, range]`.
    pub fn clamp(&mut self, range: f64) {
        for gene in &mut self.0 {
            *gene = gene.clamp(-range, range);
        }
    }
}

impl Index<usize> for Chromosome {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

/// Sum of absolute per-gene differences.
pub fn chromosome_distance(a: &Chromosome, b: &Chromosome) -> f64 {
    a.0.iter().zip(&b.0).map(|(x, y)| (x - y).abs()).sum()
}

/// Random number generator wrapper for chromosome operations.
pub struct GeneRng {
    rng: StdRng,
}

impl GeneRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Chromosome with every gene uniform in `[-angle_range, angle_range]`.
    pub fn random_chromosome(&mut self, angle_range: f64) -> Chromosome {
        let dist = Uniform::new_inclusive(-angle_range, angle_range);
        let mut genes = [0.0; GENE_COUNT];
        for gene in &mut genes {
            *gene = self.rng.sample(dist);
        }
        Chromosome(genes)
    }

    /// `seed` with uniform noise in `[-variance, variance]` added to each gene.
    pub fn perturbed(&mut self, seed: &Chromosome, variance: f64) -> Chromosome {
        let dist = Uniform::new_inclusive(-variance, variance);
        let mut genes = seed.0;
        for gene in &mut genes {
            *gene += self.rng.sample(dist);
        }
        Chromosome(genes)
    }

    /// Add uniform noise in `[-step, step]` to each gene with probability `rate`.
    ///
    /// Returns the number of genes changed.
    pub fn mutate(&mut self, chromosome: &mut Chromosome, rate: f64, step: f64) -> usize {
        let dist = Uniform::new_inclusive(-step, step);
        let mut mutated = 0;
        for gene in &mut chromosome.0 {
            if self.chance(rate) {
                *gene += self.rng.sample(dist);
                mutated += 1;
            }
        }
        mutated
    }

    /// True with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.r#gen::<f64>() < p
    }

    /// Uniform index in `0..len`.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Crossover cut point in `0..GENE_COUNT`.
    pub fn cut_point(&mut self) -> usize {
        self.index(GENE_COUNT)
    }

    /// Generate next u64 for seeding child RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }
}
