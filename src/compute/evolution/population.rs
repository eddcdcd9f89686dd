//! Individuals and the population they live in.

use serde::{Deserialize, Serialize};

use super::EvolutionError;
use super::genome::{Chromosome, GeneRng, chromosome_distance};
use crate::schema::is_valid_half_width;

/// One candidate solution.
///
/// Fitness is `None` until the individual is evaluated, and is cleared
/// whenever the chromosome is replaced or handed out mutably.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    chromosome: Chromosome,
    fitness: Option<f64>,
}

impl Individual {
    /// Create an unevaluated individual.
    pub fn new(chromosome: Chromosome) -> Self {
        Self {
            chromosome,
            fitness: None,
        }
    }

    pub fn chromosome(&self) -> &Chromosome {
        &self.chromosome
    }

    /// Mutable access to the genes. Clears the fitness.
    pub fn chromosome_mut(&mut self) -> &mut Chromosome {
        self.fitness = None;
        &mut self.chromosome
    }

    /// Replace the genes. Clears the fitness.
    pub fn replace_chromosome(&mut self, chromosome: Chromosome) {
        self.chromosome = chromosome;
        self.fitness = None;
    }

    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = Some(fitness);
    }

    /// Fitness used for ranking; unevaluated individuals rank below all others.
    pub fn rank_fitness(&self) -> f64 {
        self.fitness.unwrap_or(f64::NEG_INFINITY)
    }
}

/// Fixed-size collection of individuals for one run.
#[derive(Debug, Clone)]
pub struct Population {
    individuals: Vec<Individual>,
    angle_range: f64,
}

impl Population {
    /// `size` individuals with genes uniform in `[-angle_range, angle_range]`.
    pub fn new(size: usize, angle_range: f64, rng: &mut GeneRng) -> Self {
        let individuals = (0..size)
            .map(|_| Individual::new(rng.random_chromosome(angle_range)))
            .collect();
        Self {
            individuals,
            angle_range,
        }
    }

    pub fn from_individuals(individuals: Vec<Individual>, angle_range: f64) -> Self {
        Self {
            individuals,
            angle_range,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn angle_range(&self) -> f64 {
        self.angle_range
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn individuals_mut(&mut self) -> &mut [Individual] {
        &mut self.individuals
    }

    pub fn iter(&self) -> impl Iterator<Item = &Individual> {
        self.individuals.iter()
    }

    /// Uniform draw with replacement. Panics on an empty population.
    pub fn random_individual(&self, rng: &mut GeneRng) -> &Individual {
        &self.individuals[self.random_index(rng)]
    }

    pub fn random_index(&self, rng: &mut GeneRng) -> usize {
        rng.index(self.individuals.len())
    }

    /// Re-seed every individual around `seed` with uniform noise of `variance`.
    ///
    /// Fitness values are cleared since they no longer describe the genes.
    pub fn initialize_near(
        &mut self,
        seed: &Chromosome,
        variance: f64,
        rng: &mut GeneRng,
    ) -> Result<(), EvolutionError> {
        seed.ensure_finite()?;
        if !is_valid_half_width(variance) {
            return Err(EvolutionError::InvalidVariance(variance));
        }
        for individual in &mut self.individuals {
            individual.replace_chromosome(rng.perturbed(seed, variance));
        }
        Ok(())
    }

    /// Replace all individuals at once.
    pub fn replace(&mut self, individuals: Vec<Individual>) {
        self.individuals = individuals;
    }

    /// Fittest evaluated individual; ties keep the earliest.
    pub fn best(&self) -> Option<&Individual> {
        self.individuals
            .iter()
            .filter(|i| i.is_evaluated())
            .fold(None, |best: Option<&Individual>, candidate| match best {
                Some(b) if b.rank_fitness() >= candidate.rank_fitness() => Some(b),
                _ => Some(candidate),
            })
    }

    /// Mean fitness over evaluated individuals.
    pub fn mean_fitness(&self) -> f64 {
        let (sum, count) = self
            .individuals
            .iter()
            .filter_map(Individual::fitness)
            .fold((0.0, 0usize), |(s, c), f| (s + f, c + 1));
        if count > 0 { sum / count as f64 } else { 0.0 }
    }

    /// Mean pairwise gene distance.
    pub fn diversity(&self) -> f64 {
        if self.individuals.len() < 2 {
            return 0.0;
        }

        let mut total_distance = 0.0;
        let mut count = 0;
        for i in 0..self.individuals.len() {
            for j in (i + 1)..self.individuals.len() {
                total_distance += chromosome_distance(
                    &self.individuals[i].chromosome,
                    &self.individuals[j].chromosome,
                );
                count += 1;
            }
        }
        total_distance / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::evolution::genome::GENE_COUNT;

    #[test]
    fn test_individual_starts_unevaluated() {
        let individual = Individual::new(Chromosome::zeros());
        assert_eq!(individual.fitness(), None);
        assert_eq!(individual.rank_fitness(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut original = Individual::new(Chromosome::new([0.5; GENE_COUNT]));
        original.set_fitness(0.25);

        let mut copy = original.clone();
        assert_eq!(copy.fitness(), Some(0.25));
        copy.chromosome_mut().genes_mut()[0] = 9.0;

        assert_eq!(original.chromosome()[0], 0.5);
        assert_eq!(original.fitness(), Some(0.25));
        assert_eq!(copy.chromosome()[0], 9.0);
        assert_eq!(copy.fitness(), None);
    }

    #[test]
    fn test_population_creation() {
        let mut rng = GeneRng::new(42);
        let population = Population::new(20, 1.5, &mut rng);
        assert_eq!(population.len(), 20);
        assert!(
            population
                .iter()
                .flat_map(|i| i.chromosome().genes())
                .all(|g| g.abs() <= 1.5)
        );
    }

    #[test]
    fn test_initialize_near_resets_fitness() {
        let mut rng = GeneRng::new(42);
        let mut population = Population::new(10, 3.0, &mut rng);
        for individual in population.individuals_mut() {
            individual.set_fitness(0.9);
        }

        let seed = Chromosome::new([1.0; GENE_COUNT]);
        population.initialize_near(&seed, 0.1, &mut rng).unwrap();

        for individual in population.iter() {
            assert_eq!(individual.fitness(), None);
            assert!(
                individual
                    .chromosome()
                    .genes()
                    .iter()
                    .all(|g| (g - 1.0).abs() <= 0.1)
            );
        }
    }

    #[test]
    fn test_initialize_near_rejects_bad_seed() {
        let mut rng = GeneRng::new(42);
        let mut population = Population::new(4, 3.0, &mut rng);
        let before: Vec<_> = population.iter().cloned().collect();

        let mut seed = Chromosome::zeros();
        seed.genes_mut()[2] = f64::INFINITY;
        assert!(matches!(
            population.initialize_near(&seed, 0.1, &mut rng),
            Err(EvolutionError::NonFiniteGene { index: 2, .. })
        ));
        for variance in [-1.0, f64::NAN, 1e308] {
            assert!(matches!(
                population.initialize_near(&Chromosome::zeros(), variance, &mut rng),
                Err(EvolutionError::InvalidVariance(_))
            ));
        }
        assert_eq!(population.individuals(), before.as_slice());
    }

    #[test]
    fn test_best_prefers_first_on_ties() {
        let mut a = Individual::new(Chromosome::new([1.0; GENE_COUNT]));
        let mut b = Individual::new(Chromosome::new([2.0; GENE_COUNT]));
        let c = Individual::new(Chromosome::new([3.0; GENE_COUNT]));
        a.set_fitness(0.5);
        b.set_fitness(0.5);
        let population = Population::from_individuals(vec![c, a.clone(), b], 1.0);

        assert_eq!(population.best(), Some(&a));
        assert!((population.mean_fitness() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_random_individual_draws_members() {
        let mut rng = GeneRng::new(1);
        let population = Population::new(5, 1.0, &mut rng);
        for _ in 0..50 {
            let drawn = population.random_individual(&mut rng);
            assert!(population.iter().any(|i| i == drawn));
        }
    }
}
