//! Target path types consumed by the segment driver.

use std::fs;
use std::io;
use std::path::Path;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// A single 3D target coordinate.
pub type PathPoint = Point3<f64>;

/// Ordered, finite sequence of target points.
///
/// Serialized as a JSON array of `[x, y, z]` triples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetPath {
    points: Vec<PathPoint>,
}

impl TargetPath {
    /// Create a path, rejecting non-finite coordinates.
    pub fn new(points: Vec<PathPoint>) -> Result<Self, ConfigError> {
        let path = Self { points };
        path.validate()?;
        Ok(path)
    }

    /// Build a path from raw coordinate triples.
    pub fn from_coords(coords: &[[f64; 3]]) -> Result<Self, ConfigError> {
        Self::new(coords.iter().map(|c| Point3::new(c[0], c[1], c[2])).collect())
    }

    /// Load a path from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        let parsed: Self = serde_json::from_str(&text)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        parsed
            .validate()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(parsed)
    }

    /// Check every coordinate is finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self
            .points
            .iter()
            .position(|p| p.iter().any(|c| !c.is_finite()))
        {
            Some(index) => Err(ConfigError::NonFinitePathPoint { index }),
            None => Ok(()),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PathPoint> {
        self.points.get(index)
    }

    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }

    /// The points `start..start + len`, clipped to the end of the path.
    pub fn segment(&self, start: usize, len: usize) -> Option<Segment> {
        if start >= self.points.len() || len == 0 {
            return None;
        }
        let end = (start + len).min(self.points.len());
        Some(Segment {
            start_index: start,
            points: self.points[start..end].to_vec(),
        })
    }
}

/// A contiguous run of path points solved by one GA run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Index of the first point in the source path.
    pub start_index: usize,
    /// Target points, in path order.
    pub points: Vec<PathPoint>,
}

impl Segment {
    /// A segment holding a single point.
    pub fn single(index: usize, point: PathPoint) -> Self {
        Self {
            start_index: index,
            points: vec![point],
        }
    }

    /// Index one past the last point.
    pub fn end_index(&self) -> usize {
        self.start_index + self.points.len()
    }

    /// The last point of the segment, which the arm is left at.
    pub fn last_point(&self) -> Option<&PathPoint> {
        self.points.last()
    }
}
