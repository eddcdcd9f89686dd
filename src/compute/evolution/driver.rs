//! Segment driver: traces a target path one GA run at a time.
//!
//! Each segment (one point, or `segment_size` consecutive points) gets a fresh
//! [`GeneticAlgorithm`] run. From the second segment on, the run's population
//! is warm-started around the previous segment's winner. The winning joint
//! angles are applied to the live chain and recorded in a [`Trajectory`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::animation::{Trajectory, TrajectoryFrame};
use crate::compute::{KinematicChain, KinematicsError};
use crate::schema::{ConfigError, DriverConfig, PathPoint, Segment, SolverConfig, TargetPath};

use super::EvolutionError;
use super::fitness::IkFitness;
use super::genome::{Chromosome, GeneRng};
use super::search::{GeneticAlgorithm, StopReason};

/// Errors from driving a path.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DriverError {
    #[error("Point count {requested} out of range: expected 1..={available}")]
    InvalidPointCount { requested: usize, available: usize },
    #[error("Segment starting at point {0} is empty")]
    EmptySegment(usize),
    #[error("Segment at point {found} is not the next path segment (expected point {expected})")]
    UnexpectedSegment { expected: usize, found: usize },
    #[error(transparent)]
    Evolution(#[from] EvolutionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Kinematics(#[from] KinematicsError),
}

/// Outcome of one solved segment.
#[derive(Debug, Clone)]
pub struct SegmentReport {
    /// Ordinal of the segment within the path.
    pub index: usize,
    pub segment: Segment,
    pub chromosome: Chromosome,
    pub fitness: f64,
    pub generations: usize,
    pub stop_reason: StopReason,
    /// Tip position after applying `chromosome`.
    pub reached: PathPoint,
}

impl SegmentReport {
    /// Distance from the reached position to the segment's last point.
    pub fn error(&self) -> f64 {
        self.segment
            .last_point()
            .map_or(0.0, |target| (self.reached - target).norm())
    }
}

/// Segments processed by one call to [`SegmentDriver::run_points`].
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub segments: Vec<SegmentReport>,
    /// Every point of the path has been processed.
    pub finished: bool,
    /// The batch stopped early on a cancellation request.
    pub cancelled: bool,
}

/// Walks a [`TargetPath`], solving each segment with a warm-started GA run.
pub struct SegmentDriver {
    config: DriverConfig,
    path: TargetPath,
    chain: KinematicChain,
    initial_chain: KinematicChain,
    seed: u64,
    rng: GeneRng,
    next_point: usize,
    segments_solved: usize,
    previous_best: Option<Chromosome>,
    trajectory: Trajectory,
    cancelled: Arc<AtomicBool>,
}

impl SegmentDriver {
    /// Create a driver for `path`, moving `chain`.
    pub fn new(
        config: DriverConfig,
        chain: KinematicChain,
        path: TargetPath,
    ) -> Result<Self, DriverError> {
        config.validate()?;
        path.validate()?;

        let seed = config.ga.random_seed.unwrap_or_else(rand::random);
        log::info!(
            "Driver ready: {} points, segment size {}, seed {}",
            path.len(),
            config.segment_size,
            seed
        );

        Ok(Self {
            trajectory: Trajectory::new(&chain),
            initial_chain: chain.clone(),
            chain,
            config,
            path,
            seed,
            rng: GeneRng::new(seed),
            next_point: 0,
            segments_solved: 0,
            previous_best: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Create a driver and its chain from a full solver configuration.
    pub fn from_config(config: &SolverConfig, path: TargetPath) -> Result<Self, DriverError> {
        config.validate()?;
        Self::new(
            config.driver.clone(),
            KinematicChain::from_config(&config.chain),
            path,
        )
    }

    /// Forget all progress: rewind to the first point, drop the warm-start
    /// seed and the recorded trajectory, and restore the chain's initial pose.
    pub fn reset(&mut self) {
        self.chain = self.initial_chain.clone();
        self.rng = GeneRng::new(self.seed);
        self.next_point = 0;
        self.segments_solved = 0;
        self.previous_best = None;
        self.trajectory = Trajectory::new(&self.chain);
        self.cancelled.store(false, Ordering::Relaxed);
        log::info!("Driver reset");
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn path(&self) -> &TargetPath {
        &self.path
    }

    /// The live chain, holding the latest applied solution.
    pub fn chain(&self) -> &KinematicChain {
        &self.chain
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Winner of the last solved segment, used as the next warm-start seed.
    pub fn previous_best(&self) -> Option<&Chromosome> {
        self.previous_best.as_ref()
    }

    /// Index of the next unprocessed point.
    pub fn next_point(&self) -> usize {
        self.next_point
    }

    pub fn remaining_points(&self) -> usize {
        self.path.len() - self.next_point
    }

    pub fn is_finished(&self) -> bool {
        self.next_point >= self.path.len()
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Check a requested point count against the path length.
    pub fn validate_point_count(&self, count: usize) -> Result<(), DriverError> {
        if count == 0 || count > self.path.len() {
            return Err(DriverError::InvalidPointCount {
                requested: count,
                available: self.path.len(),
            });
        }
        Ok(())
    }

    /// One-line description of the driver's progress.
    pub fn status_message(&self) -> String {
        if self.is_finished() {
            "All segments processed".to_string()
        } else if self.next_point == 0 {
            format!("Ready: {} points to optimize", self.path.len())
        } else {
            format!("Point {}/{} optimized", self.next_point, self.path.len())
        }
    }

    /// Solve up to `count` further points.
    pub fn run_points(&mut self, count: usize) -> Result<BatchSummary, DriverError> {
        self.run_points_with_callbacks(count, |_| {}, |_| {})
    }

    /// Solve up to `count` further points, reporting per-generation completion
    /// of the current run and each finished segment.
    ///
    /// An invalid `count` is rejected before any state changes. Stops early
    /// once the path is exhausted or cancellation is requested; a cancelled
    /// run's result is not applied.
    ///
    /// If a segment fails, the error is returned and the batch summary is
    /// dropped. Segments solved earlier in the batch stay applied: they were
    /// passed to `on_result`, remain in [`Self::trajectory`], and the next
    /// batch resumes after them.
    pub fn run_points_with_callbacks<P, R>(
        &mut self,
        count: usize,
        mut on_progress: P,
        mut on_result: R,
    ) -> Result<BatchSummary, DriverError>
    where
        P: FnMut(f64),
        R: FnMut(&SegmentReport),
    {
        self.validate_point_count(count)?;
        self.cancelled.store(false, Ordering::Relaxed);

        let mut summary = BatchSummary::default();
        let mut remaining = count;

        while remaining > 0 {
            if self.cancelled.load(Ordering::Relaxed) {
                log::warn!("Batch cancelled at point {}", self.next_point);
                summary.cancelled = true;
                break;
            }
            let len = self.config.segment_size.min(remaining);
            let Some(segment) = self.path.segment(self.next_point, len) else {
                break;
            };

            let solved = match self.solve_segment(&segment, &mut on_progress) {
                Ok(solved) => solved,
                Err(e) => {
                    log::error!(
                        "Segment at point {} failed after {} solved in this batch: {}",
                        segment.start_index,
                        summary.segments.len(),
                        e
                    );
                    return Err(e);
                }
            };
            match solved {
                Some(report) => {
                    remaining -= report.segment.points.len();
                    on_result(&report);
                    summary.segments.push(report);
                }
                None => {
                    summary.cancelled = true;
                    break;
                }
            }
        }

        summary.finished = self.is_finished();
        if summary.finished {
            log::info!("{}", self.status_message());
        }
        Ok(summary)
    }

    /// Run one GA for `segment` and apply the winner.
    ///
    /// `segment` must be the path's next segment, starting at
    /// [`Self::next_point`]; anything else is rejected without changing state.
    /// Returns `Ok(None)` when the run was cancelled; nothing is applied then.
    pub fn solve_segment<P>(
        &mut self,
        segment: &Segment,
        mut on_progress: P,
    ) -> Result<Option<SegmentReport>, DriverError>
    where
        P: FnMut(f64),
    {
        let target = *segment
            .last_point()
            .ok_or(DriverError::EmptySegment(segment.start_index))?;
        if self.path.segment(self.next_point, segment.points.len()).as_ref() != Some(segment) {
            return Err(DriverError::UnexpectedSegment {
                expected: self.next_point,
                found: segment.start_index,
            });
        }

        let mut ga_config = self.config.ga.clone();
        ga_config.random_seed = Some(self.rng.next_seed());

        let fitness =
            IkFitness::new(&self.chain).with_deviation_weight(self.config.deviation_weight);
        let mut engine = GeneticAlgorithm::new(segment.clone(), ga_config)?
            .with_evaluator(fitness)
            .with_cancel_flag(self.cancel_handle());

        if let Some(seed) = self.previous_best {
            if self.config.penalize_deviation {
                engine = engine.with_reference(seed);
            }
            engine.initialize_near(&seed, self.config.seed_variance)?;
        }

        let result = engine.run_with_callback(|progress| on_progress(progress.completion))?;
        if result.stop_reason == StopReason::Cancelled {
            log::warn!(
                "Run for point {} cancelled after {} generations; result discarded",
                segment.start_index,
                result.generations
            );
            return Ok(None);
        }

        let chromosome = *result.best.chromosome();
        self.chain.set_joint_angles(&chromosome.to_joint_angles())?;
        let reached = self.chain.end_effector_position();

        self.trajectory.push(TrajectoryFrame {
            point_index: segment.end_index() - 1,
            target,
            chromosome,
            fitness: result.best_fitness,
            generations: result.generations,
            reached,
        });
        self.previous_best = Some(chromosome);
        self.next_point = segment.end_index();

        let report = SegmentReport {
            index: self.segments_solved,
            segment: segment.clone(),
            chromosome,
            fitness: result.best_fitness,
            generations: result.generations,
            stop_reason: result.stop_reason,
            reached,
        };
        self.segments_solved += 1;

        log::info!(
            "{}: fitness {:.4} after {} generations ({:?})",
            self.status_message(),
            report.fitness,
            report.generations,
            report.stop_reason
        );
        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::GeneticAlgorithmConfig;

    fn path() -> TargetPath {
        TargetPath::from_coords(&[[0.0, 3.0, 0.0], [0.3, 3.1, 0.0], [0.5, 3.2, 0.1]]).unwrap()
    }

    fn config() -> DriverConfig {
        DriverConfig {
            ga: GeneticAlgorithmConfig {
                population_size: 30,
                max_generations: 20,
                mutation_rate: 0.05,
                random_seed: Some(7),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn driver() -> SegmentDriver {
        SegmentDriver::new(config(), KinematicChain::default(), path()).unwrap()
    }

    #[test]
    fn test_invalid_point_count_changes_nothing() {
        let mut driver = driver();
        for count in [0, 4] {
            assert_eq!(
                driver.run_points(count).unwrap_err(),
                DriverError::InvalidPointCount {
                    requested: count,
                    available: 3
                }
            );
        }
        assert_eq!(driver.next_point(), 0);
        assert!(driver.trajectory().is_empty());
        assert!(driver.previous_best().is_none());
        assert_eq!(driver.chain(), &KinematicChain::default());
    }

    #[test]
    fn test_runs_points_in_order() {
        let mut driver = driver();
        let mut progress = Vec::new();
        let mut reported = Vec::new();

        let summary = driver
            .run_points_with_callbacks(2, |p| progress.push(p), |r| reported.push(r.index))
            .unwrap();

        assert_eq!(summary.segments.len(), 2);
        assert!(!summary.finished);
        assert!(!summary.cancelled);
        assert_eq!(reported, vec![0, 1]);
        assert_eq!(driver.next_point(), 2);
        assert_eq!(driver.remaining_points(), 1);
        assert_eq!(driver.status_message(), "Point 2/3 optimized");

        let last = &summary.segments[1];
        assert_eq!(last.segment.start_index, 1);
        assert_eq!(driver.previous_best(), Some(&last.chromosome));
        assert_eq!(driver.chain().end_effector_position(), last.reached);
        assert_eq!(driver.trajectory().len(), 2);
        assert_eq!(driver.trajectory().frames()[1].point_index, 1);
        assert!(progress.iter().all(|p| *p > 0.0 && *p <= 1.0));
        assert!(summary.segments.iter().all(|s| s.fitness > 0.0));
    }

    #[test]
    fn test_stops_at_end_of_path() {
        let mut driver = driver();
        driver.run_points(2).unwrap();

        let summary = driver.run_points(3).unwrap();
        assert_eq!(summary.segments.len(), 1);
        assert!(summary.finished);
        assert_eq!(driver.status_message(), "All segments processed");

        let summary = driver.run_points(1).unwrap();
        assert!(summary.segments.is_empty());
        assert!(summary.finished);
        assert_eq!(driver.trajectory().len(), 3);
    }

    #[test]
    fn test_segments_batch_points() {
        let config = DriverConfig {
            segment_size: 2,
            ..config()
        };
        let mut driver = SegmentDriver::new(config, KinematicChain::default(), path()).unwrap();

        let summary = driver.run_points(3).unwrap();
        assert_eq!(summary.segments.len(), 2);
        assert_eq!(summary.segments[0].segment.points.len(), 2);
        assert_eq!(summary.segments[1].segment.start_index, 2);
        assert_eq!(summary.segments[1].segment.points.len(), 1);
        assert_eq!(driver.trajectory().frames()[0].point_index, 1);
        assert!(summary.finished);
    }

    #[test]
    fn test_warm_start_seeds_from_previous_best() {
        let mut config = config();
        config.seed_variance = 0.0;
        config.ga.max_generations = 1;
        let mut driver = SegmentDriver::new(config, KinematicChain::default(), path()).unwrap();

        let first = driver.run_points(1).unwrap().segments.remove(0);
        let second = driver.run_points(1).unwrap().segments.remove(0);
        // Zero variance clones the seed, so a single evaluated generation
        // can only return it.
        assert_eq!(second.chromosome, first.chromosome);
        assert_eq!(second.generations, 1);
    }

    #[test]
    fn test_cancel_between_segments() {
        let mut driver = driver();
        let handle = driver.cancel_handle();

        let summary = driver
            .run_points_with_callbacks(3, |_| {}, |_| handle.store(true, Ordering::Relaxed))
            .unwrap();
        assert_eq!(summary.segments.len(), 1);
        assert!(summary.cancelled);
        assert_eq!(driver.next_point(), 1);

        // The next batch starts with a cleared flag.
        let summary = driver.run_points(1).unwrap();
        assert_eq!(summary.segments.len(), 1);
        assert!(!summary.cancelled);
    }

    #[test]
    fn test_reset_is_reproducible() {
        let mut driver = driver();
        let before: Vec<_> = driver
            .run_points(3)
            .unwrap()
            .segments
            .iter()
            .map(|s| s.chromosome)
            .collect();

        driver.reset();
        assert_eq!(driver.next_point(), 0);
        assert!(driver.trajectory().is_empty());
        assert!(driver.previous_best().is_none());
        assert_eq!(driver.chain(), &KinematicChain::default());
        assert_eq!(driver.status_message(), "Ready: 3 points to optimize");

        let after: Vec<_> = driver
            .run_points(3)
            .unwrap()
            .segments
            .iter()
            .map(|s| s.chromosome)
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_failed_segment_keeps_earlier_solutions() {
        // The deviation penalty overflows to infinity once a reference exists.
        let config = DriverConfig {
            seed_variance: 1.0,
            penalize_deviation: true,
            deviation_weight: f64::MAX,
            ..config()
        };
        let mut driver = SegmentDriver::new(config, KinematicChain::default(), path()).unwrap();

        let mut reported = 0;
        let err = driver
            .run_points_with_callbacks(3, |_| {}, |_| reported += 1)
            .unwrap_err();
        assert!(matches!(
            err,
            DriverError::Evolution(EvolutionError::InvalidFitness(_))
        ));
        assert_eq!(reported, 1);
        assert_eq!(driver.next_point(), 1);
        assert_eq!(driver.trajectory().len(), 1);
        assert_eq!(
            driver.previous_best(),
            Some(&driver.trajectory().frames()[0].chromosome)
        );
    }

    #[test]
    fn test_solve_segment_only_accepts_next_segment() {
        let mut driver = driver();
        let ahead = driver.path().segment(1, 1).unwrap();
        assert_eq!(
            driver.solve_segment(&ahead, |_| {}).unwrap_err(),
            DriverError::UnexpectedSegment {
                expected: 0,
                found: 1
            }
        );

        let forged = Segment::single(0, PathPoint::new(9.0, 9.0, 9.0));
        assert!(matches!(
            driver.solve_segment(&forged, |_| {}),
            Err(DriverError::UnexpectedSegment { .. })
        ));
        assert_eq!(
            driver.solve_segment(&Segment { start_index: 0, points: Vec::new() }, |_| {}).unwrap_err(),
            DriverError::EmptySegment(0)
        );
        assert_eq!(driver.next_point(), 0);
        assert!(driver.trajectory().is_empty());

        let next = driver.path().segment(0, 1).unwrap();
        let report = driver.solve_segment(&next, |_| {}).unwrap().unwrap();
        assert_eq!(report.segment, next);
        assert_eq!(driver.next_point(), 1);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = DriverConfig {
            segment_size: 0,
            ..config()
        };
        assert!(matches!(
            SegmentDriver::new(config, KinematicChain::default(), path()),
            Err(DriverError::Config(ConfigError::InvalidSegmentSize))
        ));
    }
}
