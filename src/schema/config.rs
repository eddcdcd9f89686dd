//! Configuration types for the arm, the genetic algorithm and the segment driver.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Link lengths of the arm, base link first.
pub const DEFAULT_LINK_LENGTHS: [f64; 3] = [3.0, 3.0, 1.0];

/// Weight of the per-gene deviation penalty against a reference chromosome.
pub const DEFAULT_DEVIATION_WEIGHT: f64 = 0.05;

/// Largest half-width accepted for a symmetric uniform range `[-x, x]`.
/// Wider ranges overflow when rand scales them and cannot be sampled.
pub const MAX_HALF_WIDTH: f64 = f64::MAX / 4.0;

/// True for a usable half-width in `[0, MAX_HALF_WIDTH]`.
#[inline]
pub fn is_valid_half_width(x: f64) -> bool {
    (0.0..=MAX_HALF_WIDTH).contains(&x)
}

/// Top-level configuration file: arm geometry plus solver settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Arm geometry.
    #[serde(default)]
    pub chain: ChainConfig,
    /// Path driver and GA settings.
    #[serde(default)]
    pub driver: DriverConfig,
}

impl SolverConfig {
    /// Validate every nested section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chain.validate()?;
        self.driver.validate()
    }
}

/// Geometry of the 3-link arm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Length of each rigid link, base link first.
    #[serde(default = "default_link_lengths")]
    pub link_lengths: [f64; 3],
    /// World position of the base joint.
    #[serde(default)]
    pub base_position: [f64; 3],
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            link_lengths: default_link_lengths(),
            base_position: [0.0; 3],
        }
    }
}

fn default_link_lengths() -> [f64; 3] {
    DEFAULT_LINK_LENGTHS
}

impl ChainConfig {
    /// Validate link lengths and base position.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, &value) in self.link_lengths.iter().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidLinkLength { index, value });
            }
        }
        if self.base_position.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::NonFiniteBasePosition);
        }
        Ok(())
    }
}

/// What to do with the last selected parent when the parent count is odd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OddParentPolicy {
    /// Carry the unpaired parent into the next generation unchanged.
    #[default]
    CloneForward,
    /// Cross the unpaired parent with itself; one child survives truncation.
    PairWithSelf,
    /// Drop the unpaired parent and pad with a tournament winner.
    Drop,
}

/// Policy for genes drifting outside the initial angle range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneBounds {
    /// Mutation noise accumulates without limit.
    #[default]
    Unbounded,
    /// Genes are clamped to `[-angle_range, angle_range]` after mutation.
    ClampToRange,
}

/// Genetic algorithm configuration for a single optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticAlgorithmConfig {
    /// Number of individuals per generation.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Mutation probability per gene (0.0-1.0).
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    /// Crossover probability per parent pair (0.0-1.0).
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    /// Upper bound on evaluated generations.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Initial genes are drawn from `[-angle_range, angle_range]` radians.
    #[serde(default = "default_angle_range")]
    pub angle_range: f64,
    /// Fitness at which a run stops early. 1.0 means an exact match.
    #[serde(default = "default_target_fitness")]
    pub target_fitness: f64,
    /// Half-width of the uniform mutation noise, in radians.
    #[serde(default = "default_mutation_step")]
    pub mutation_step: f64,
    #[serde(default)]
    pub odd_parent_policy: OddParentPolicy,
    #[serde(default)]
    pub gene_bounds: GeneBounds,
    /// Evaluate individuals on the rayon pool when the `parallel` feature is on.
    #[serde(default = "default_parallel_evaluation")]
    pub parallel_evaluation: bool,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for GeneticAlgorithmConfig {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            mutation_rate: default_mutation_rate(),
            crossover_rate: default_crossover_rate(),
            max_generations: default_max_generations(),
            angle_range: default_angle_range(),
            target_fitness: default_target_fitness(),
            mutation_step: default_mutation_step(),
            odd_parent_policy: OddParentPolicy::default(),
            gene_bounds: GeneBounds::default(),
            parallel_evaluation: default_parallel_evaluation(),
            random_seed: None,
        }
    }
}

fn default_population_size() -> usize {
    50
}
fn default_mutation_rate() -> f64 {
    0.01
}
fn default_crossover_rate() -> f64 {
    0.7
}
fn default_max_generations() -> usize {
    10
}
fn default_angle_range() -> f64 {
    PI
}
fn default_target_fitness() -> f64 {
    1.0
}
fn default_mutation_step() -> f64 {
    0.1
}
fn default_parallel_evaluation() -> bool {
    true
}

impl GeneticAlgorithmConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 2 {
            return Err(ConfigError::InvalidPopulationSize(self.population_size));
        }
        if self.max_generations < 1 {
            return Err(ConfigError::InvalidMaxGenerations);
        }
        if !is_valid_half_width(self.angle_range) || self.angle_range == 0.0 {
            return Err(ConfigError::InvalidAngleRange(self.angle_range));
        }
        check_rate("mutation_rate", self.mutation_rate)?;
        check_rate("crossover_rate", self.crossover_rate)?;
        if !(self.target_fitness > 0.0 && self.target_fitness <= 1.0) {
            return Err(ConfigError::InvalidTargetFitness(self.target_fitness));
        }
        if !is_valid_half_width(self.mutation_step) {
            return Err(ConfigError::InvalidMutationStep(self.mutation_step));
        }
        Ok(())
    }
}

fn check_rate(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidRate { name, value })
    }
}

/// Segment driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Settings used for every per-segment GA run.
    #[serde(default)]
    pub ga: GeneticAlgorithmConfig,
    /// Path points solved by one GA run.
    #[serde(default = "default_segment_size")]
    pub segment_size: usize,
    /// Spread of the warm-start population around the previous best.
    #[serde(default = "default_seed_variance")]
    pub seed_variance: f64,
    /// Penalize deviation from the previous segment's solution.
    #[serde(default)]
    pub penalize_deviation: bool,
    /// Per-gene weight of the deviation penalty.
    #[serde(default = "default_deviation_weight")]
    pub deviation_weight: f64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            ga: GeneticAlgorithmConfig::default(),
            segment_size: default_segment_size(),
            seed_variance: default_seed_variance(),
            penalize_deviation: false,
            deviation_weight: default_deviation_weight(),
        }
    }
}

fn default_segment_size() -> usize {
    1
}
fn default_seed_variance() -> f64 {
    0.1
}
fn default_deviation_weight() -> f64 {
    DEFAULT_DEVIATION_WEIGHT
}

impl DriverConfig {
    /// Validate driver parameters and the nested GA configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ga.validate()?;
        if self.segment_size == 0 {
            return Err(ConfigError::InvalidSegmentSize);
        }
        if !is_valid_half_width(self.seed_variance) {
            return Err(ConfigError::InvalidSeedVariance(self.seed_variance));
        }
        if !self.deviation_weight.is_finite() || self.deviation_weight < 0.0 {
            return Err(ConfigError::InvalidDeviationWeight(self.deviation_weight));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Population size must be at least 2, got {0}")]
    InvalidPopulationSize(usize),
    #[error("Maximum generations must be at least 1")]
    InvalidMaxGenerations,
    #[error("Angle range must be positive and at most f64::MAX / 4, got {0}")]
    InvalidAngleRange(f64),
    #[error("{name} must lie in [0, 1], got {value}")]
    InvalidRate { name: &'static str, value: f64 },
    #[error("Target fitness must lie in (0, 1], got {0}")]
    InvalidTargetFitness(f64),
    #[error("Mutation step must lie in [0, f64::MAX / 4], got {0}")]
    InvalidMutationStep(f64),
    #[error("Segment size must be non-zero")]
    InvalidSegmentSize,
    #[error("Seed variance must lie in [0, f64::MAX / 4], got {0}")]
    InvalidSeedVariance(f64),
    #[error("Deviation weight must be non-negative, got {0}")]
    InvalidDeviationWeight(f64),
    #[error("Link {index} has invalid length {value}")]
    InvalidLinkLength { index: usize, value: f64 },
    #[error("Base position must be finite")]
    NonFiniteBasePosition,
    #[error("Path point {index} has a non-finite coordinate")]
    NonFinitePathPoint { index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(SolverConfig::default().validate().is_ok());
        let ga = GeneticAlgorithmConfig::default();
        assert_eq!(ga.population_size, 50);
        assert_eq!(ga.mutation_rate, 0.01);
        assert_eq!(ga.crossover_rate, 0.7);
        assert_eq!(ga.max_generations, 10);
        assert_eq!(ga.angle_range, PI);
    }

    #[test]
    fn test_degenerate_ga_config_rejected() {
        let small = GeneticAlgorithmConfig {
            population_size: 1,
            ..Default::default()
        };
        assert_eq!(small.validate(), Err(ConfigError::InvalidPopulationSize(1)));

        let no_generations = GeneticAlgorithmConfig {
            max_generations: 0,
            ..Default::default()
        };
        assert_eq!(
            no_generations.validate(),
            Err(ConfigError::InvalidMaxGenerations)
        );

        for angle_range in [0.0, -1.0, f64::NAN, 1e308, f64::INFINITY] {
            let config = GeneticAlgorithmConfig {
                angle_range,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidAngleRange(_))
            ));
        }
    }

    #[test]
    fn test_rates_must_be_probabilities() {
        let config = GeneticAlgorithmConfig {
            mutation_rate: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRate {
                name: "mutation_rate",
                ..
            })
        ));

        let config = GeneticAlgorithmConfig {
            crossover_rate: -0.1,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRate {
                name: "crossover_rate",
                ..
            })
        ));
    }

    #[test]
    fn test_unsampleable_widths_rejected() {
        let config = GeneticAlgorithmConfig {
            mutation_step: 1e308,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidMutationStep(1e308)));

        let driver = DriverConfig {
            seed_variance: 1e308,
            ..Default::default()
        };
        assert_eq!(driver.validate(), Err(ConfigError::InvalidSeedVariance(1e308)));

        let widest = GeneticAlgorithmConfig {
            angle_range: MAX_HALF_WIDTH,
            mutation_step: MAX_HALF_WIDTH,
            ..Default::default()
        };
        assert!(widest.validate().is_ok());
        assert!(!is_valid_half_width(f64::NAN));
    }

    #[test]
    fn test_driver_and_chain_validation() {
        let driver = DriverConfig {
            segment_size: 0,
            ..Default::default()
        };
        assert_eq!(driver.validate(), Err(ConfigError::InvalidSegmentSize));

        let chain = ChainConfig {
            link_lengths: [3.0, 0.0, 1.0],
            ..Default::default()
        };
        assert_eq!(
            chain.validate(),
            Err(ConfigError::InvalidLinkLength {
                index: 1,
                value: 0.0
            })
        );
    }

    #[test]
    fn test_serialization_fills_defaults() {
        let json = r#"{ "driver": { "ga": { "population_size": 80, "odd_parent_policy": "pair_with_self" } } }"#;
        let config: SolverConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.driver.ga.population_size, 80);
        assert_eq!(config.driver.ga.max_generations, 10);
        assert_eq!(
            config.driver.ga.odd_parent_policy,
            OddParentPolicy::PairWithSelf
        );
        assert_eq!(config.chain.link_lengths, DEFAULT_LINK_LENGTHS);
        assert_eq!(config.driver.segment_size, 1);

        let roundtrip: SolverConfig =
            serde_json::from_str(&serde_json::to_string(&config).unwrap()).unwrap();
        assert_eq!(roundtrip.driver.ga.population_size, 80);
    }
}
