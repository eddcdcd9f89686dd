//! Arm IK - evolutionary inverse kinematics for a 3-link arm.
//!
//! This crate traces a path of 3D points with the tip of a fixed
//! three-joint arm. Joint angles for each point are found by a genetic
//! algorithm whose fitness is the distance between the arm's forward
//! kinematics and the target; each point's search is warm-started from the
//! previous point's solution.
//!
//! # Architecture
//!
//! - `schema`: Configuration types and target paths
//! - `compute`: Forward kinematics and the evolutionary search
//! - `animation`: Recording and replay of solved trajectories
//!
//! # Example
//!
//! ```rust,no_run
//! use arm_ik::{
//!     compute::{KinematicChain, evolution::SegmentDriver},
//!     schema::{DriverConfig, TargetPath},
//! };
//!
//! let path = TargetPath::from_coords(&[[0.0, 3.0, 0.0], [0.3, 3.1, 0.0]])?;
//! let mut driver = SegmentDriver::new(DriverConfig::default(), KinematicChain::default(), path)?;
//!
//! let summary = driver.run_points(2)?;
//! for report in &summary.segments {
//!     println!("Point {}: fitness {:.4}", report.segment.start_index, report.fitness);
//! }
//! println!("Tip: {}", driver.chain().end_effector_position());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod animation;
pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use animation::{Trajectory, TrajectoryPlayer};
pub use compute::KinematicChain;
pub use compute::evolution::{GeneticAlgorithm, IkFitness, SegmentDriver};
pub use schema::{DriverConfig, GeneticAlgorithmConfig, SolverConfig, TargetPath};
