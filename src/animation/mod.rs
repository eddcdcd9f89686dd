//! Recording and replay of solved arm trajectories.
//!
//! The segment driver appends one [`TrajectoryFrame`] per solved segment.
//! A trajectory can be exported to JSON and replayed later, without rerunning
//! the search, through a [`TrajectoryPlayer`].
//!
//! # File Format
//!
//! ```text
//! {
//!   "version": 1,
//!   "link_lengths": [3.0, 3.0, 1.0],
//!   "base_position": [0.0, 0.0, 0.0],
//!   "frames": [
//!     { "point_index": 0, "target": [x, y, z], "chromosome": [9 genes],
//!       "fitness": f, "generations": n, "reached": [x, y, z] },
//!     ...
//!   ]
//! }
//! ```

mod player;
mod trajectory;

pub use player::{FrameIterator, PlaybackFrame, TrajectoryPlayer};
pub use trajectory::{TRAJECTORY_VERSION, Trajectory, TrajectoryError, TrajectoryFrame};
