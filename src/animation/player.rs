//! Replay of recorded poses on a kinematic chain.

use nalgebra::Point3;

use super::trajectory::Trajectory;
use crate::compute::{JointAngles, KinematicChain};

/// One replayed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackFrame {
    pub frame_index: usize,
    /// Recorded pose this frame starts from.
    pub pose_index: usize,
    /// Blend factor towards the next pose, in `[0, 1)`.
    pub t: f64,
    pub angles: JointAngles,
    pub end_effector: Point3<f64>,
}

/// Steps a chain through recorded poses.
///
/// With `interpolation_steps = n`, `n` linearly blended frames are inserted
/// between each pair of consecutive poses.
///
/// Usage:
/// ```ignore
/// let trajectory = Trajectory::load("trajectory.json")?;
/// let mut player = TrajectoryPlayer::new(&trajectory).with_interpolation(4);
/// for frame in player.frames() {
///     println!("{}: {}", frame.frame_index, frame.end_effector);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct TrajectoryPlayer {
    chain: KinematicChain,
    poses: Vec<JointAngles>,
    interpolation_steps: usize,
}

impl TrajectoryPlayer {
    /// Player over `trajectory`, driving a chain with the recorded geometry.
    pub fn new(trajectory: &Trajectory) -> Self {
        Self::from_poses(trajectory.chain(), trajectory.poses())
    }

    pub fn from_poses(chain: KinematicChain, poses: Vec<JointAngles>) -> Self {
        Self {
            chain,
            poses,
            interpolation_steps: 0,
        }
    }

    pub fn with_interpolation(mut self, steps: usize) -> Self {
        self.interpolation_steps = steps;
        self
    }

    pub fn chain(&self) -> &KinematicChain {
        &self.chain
    }

    pub fn pose_count(&self) -> usize {
        self.poses.len()
    }

    /// Total frames including interpolated ones.
    pub fn frame_count(&self) -> usize {
        match self.poses.len() {
            0 => 0,
            n => (n - 1) * (self.interpolation_steps + 1) + 1,
        }
    }

    /// Angles for `frame_index` without touching the chain.
    pub fn angles_at(&self, frame_index: usize) -> Option<(usize, f64, JointAngles)> {
        if frame_index >= self.frame_count() {
            return None;
        }
        let span = self.interpolation_steps + 1;
        let pose_index = frame_index / span;
        let offset = frame_index % span;

        let from = &self.poses[pose_index];
        if offset == 0 {
            return Some((pose_index, 0.0, *from));
        }
        let to = &self.poses[pose_index + 1];
        let t = offset as f64 / span as f64;
        Some((pose_index, t, lerp_angles(from, to, t)))
    }

    /// Apply `frame_index` to the chain and report the tip.
    pub fn apply_frame(&mut self, frame_index: usize) -> Option<PlaybackFrame> {
        let (pose_index, t, angles) = self.angles_at(frame_index)?;
        self.chain.set_joint_angles(&angles).ok()?;
        Some(PlaybackFrame {
            frame_index,
            pose_index,
            t,
            angles,
            end_effector: self.chain.end_effector_position(),
        })
    }

    /// Iterate every frame, applying each to the chain in turn.
    pub fn frames(&mut self) -> FrameIterator<'_> {
        FrameIterator {
            player: self,
            current: 0,
        }
    }
}

fn lerp_angles(from: &JointAngles, to: &JointAngles, t: f64) -> JointAngles {
    let mut out = *from;
    for (joint, target) in out.iter_mut().zip(to) {
        for (angle, end) in joint.iter_mut().zip(target) {
            *angle += (end - *angle) * t;
        }
    }
    out
}

/// Iterator over replayed frames.
pub struct FrameIterator<'a> {
    player: &'a mut TrajectoryPlayer,
    current: usize,
}

impl Iterator for FrameIterator<'_> {
    type Item = PlaybackFrame;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.player.apply_frame(self.current)?;
        self.current += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.player.frame_count().saturating_sub(self.current);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FrameIterator<'_> {}
