//! Recorded solutions for a traced path, with JSON export and import.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::compute::evolution::Chromosome;
use crate::compute::{JOINT_COUNT, JointAngles, KinematicChain};
use crate::schema::{ChainConfig, ConfigError, PathPoint};

/// Current trajectory file version.
pub const TRAJECTORY_VERSION: u32 = 1;

/// Errors reading or writing trajectory files.
#[derive(Debug, thiserror::Error)]
pub enum TrajectoryError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed trajectory: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported trajectory version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("Frame {frame} holds a non-finite value")]
    NonFinite { frame: usize },
    #[error("Invalid arm geometry: {0}")]
    InvalidGeometry(#[from] ConfigError),
}

/// One solved segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryFrame {
    /// Path index of the point the arm was left at.
    pub point_index: usize,
    /// Target the arm was asked to reach.
    pub target: PathPoint,
    /// Winning joint angles.
    pub chromosome: Chromosome,
    pub fitness: f64,
    /// Generations the run took.
    pub generations: usize,
    /// Where the tip actually ended up.
    pub reached: PathPoint,
}

impl TrajectoryFrame {
    /// Distance between the target and the reached position.
    pub fn error(&self) -> f64 {
        (self.reached - self.target).norm()
    }

    fn is_finite(&self) -> bool {
        self.chromosome.ensure_finite().is_ok()
            && self.fitness.is_finite()
            && self.target.iter().chain(self.reached.iter()).all(|c| c.is_finite())
    }
}

/// Ordered list of solved poses for one arm geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    version: u32,
    link_lengths: [f64; JOINT_COUNT],
    base_position: PathPoint,
    frames: Vec<TrajectoryFrame>,
}

impl Trajectory {
    /// Empty trajectory for the geometry of `chain`.
    pub fn new(chain: &KinematicChain) -> Self {
        Self {
            version: TRAJECTORY_VERSION,
            link_lengths: *chain.link_lengths(),
            base_position: chain.base_position(),
            frames: Vec::new(),
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn push(&mut self, frame: TrajectoryFrame) {
        self.frames.push(frame);
    }

    pub fn frames(&self) -> &[TrajectoryFrame] {
        &self.frames
    }

    pub fn last(&self) -> Option<&TrajectoryFrame> {
        self.frames.last()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Joint angles of every frame, in order.
    pub fn poses(&self) -> Vec<JointAngles> {
        self.frames
            .iter()
            .map(|f| f.chromosome.to_joint_angles())
            .collect()
    }

    /// A chain with the recorded geometry, at rest.
    pub fn chain(&self) -> KinematicChain {
        KinematicChain::new(self.link_lengths).with_base_position(self.base_position)
    }

    /// Largest distance between a target and the reached position.
    pub fn max_error(&self) -> f64 {
        self.frames
            .iter()
            .map(TrajectoryFrame::error)
            .fold(0.0, f64::max)
    }

    /// Write as pretty-printed JSON.
    pub fn write_to<W: Write>(&self, w: W) -> Result<(), TrajectoryError> {
        serde_json::to_writer_pretty(w, self)?;
        Ok(())
    }

    /// Read and validate JSON: version, arm geometry, then frame values.
    pub fn read_from<R: Read>(r: R) -> Result<Self, TrajectoryError> {
        let trajectory: Self = serde_json::from_reader(r)?;
        if trajectory.version != TRAJECTORY_VERSION {
            return Err(TrajectoryError::UnsupportedVersion {
                found: trajectory.version,
                expected: TRAJECTORY_VERSION,
            });
        }
        ChainConfig {
            link_lengths: trajectory.link_lengths,
            base_position: [
                trajectory.base_position.x,
                trajectory.base_position.y,
                trajectory.base_position.z,
            ],
        }
        .validate()?;
        if let Some(frame) = trajectory.frames.iter().position(|f| !f.is_finite()) {
            return Err(TrajectoryError::NonFinite { frame });
        }
        Ok(trajectory)
    }

    /// Save to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TrajectoryError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Load from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TrajectoryError> {
        Self::read_from(BufReader::new(File::open(path)?))
    }
}
