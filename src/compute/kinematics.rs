//! Forward kinematics for the fixed 3-joint, 3-link arm.
//!
//! Each joint sits at the proximal end of its link and each link's origin is
//! at its midpoint, so a link contributes two half-length translations along
//! its local +Y axis. Frames nest strictly:
//!
//! ```text
//! base -> joint0 -> link0 -> joint1 -> link1 -> joint2 -> link2 -> tip
//! ```
//!
//! Joint rotations are (x, y, z) triples applied as `Rx * Ry * Rz`.

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};

use crate::schema::{ChainConfig, DEFAULT_LINK_LENGTHS};

/// Number of joints (and links) in the chain.
pub const JOINT_COUNT: usize = 3;

/// Local rotation of one joint, (x, y, z) in radians.
pub type JointRotation = [f64; 3];

/// Rotations of every joint, base joint first.
pub type JointAngles = [JointRotation; JOINT_COUNT];

/// Errors from mutating the chain.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KinematicsError {
    #[error("Expected {expected} joint rotations, got {given}; unset joints keep their previous angles")]
    IncompleteAngles { expected: usize, given: usize },
}

/// World-space positions of every joint, link center and the tip.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmPose {
    pub joints: [Point3<f64>; JOINT_COUNT],
    pub link_centers: [Point3<f64>; JOINT_COUNT],
    pub tip: Point3<f64>,
}

fn joint_rotation(rotation: &JointRotation) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), rotation[0])
        * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), rotation[1])
        * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), rotation[2])
}

/// Compose the chain's frames and return every world-space landmark.
pub fn arm_pose(
    base: &Point3<f64>,
    link_lengths: &[f64; JOINT_COUNT],
    angles: &JointAngles,
) -> ArmPose {
    let mut frame = Isometry3::translation(base.x, base.y, base.z);
    let mut joints = [Point3::origin(); JOINT_COUNT];
    let mut link_centers = [Point3::origin(); JOINT_COUNT];

    for (i, (rotation, &length)) in angles.iter().zip(link_lengths).enumerate() {
        joints[i] = frame.transform_point(&Point3::origin());

        let half_link = Isometry3::from_parts(
            Translation3::new(0.0, length / 2.0, 0.0),
            UnitQuaternion::identity(),
        );
        frame = frame * Isometry3::from_parts(Translation3::identity(), joint_rotation(rotation));
        frame = frame * half_link;
        link_centers[i] = frame.transform_point(&Point3::origin());

        // Next joint (or the tip) is half a link further along.
        frame = frame * half_link;
    }

    ArmPose {
        joints,
        link_centers,
        tip: frame.transform_point(&Point3::origin()),
    }
}

/// End-effector position for the given angles. Pure function.
pub fn forward_kinematics(
    base: &Point3<f64>,
    link_lengths: &[f64; JOINT_COUNT],
    angles: &JointAngles,
) -> Point3<f64> {
    arm_pose(base, link_lengths, angles).tip
}

/// The arm: fixed geometry plus the current joint angles.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicChain {
    link_lengths: [f64; JOINT_COUNT],
    base: Point3<f64>,
    angles: JointAngles,
}

impl Default for KinematicChain {
    fn default() -> Self {
        Self::new(DEFAULT_LINK_LENGTHS)
    }
}

impl KinematicChain {
    /// Create a chain at rest (all angles zero) with its base at the origin.
    pub fn new(link_lengths: [f64; JOINT_COUNT]) -> Self {
        Self {
            link_lengths,
            base: Point3::origin(),
            angles: [[0.0; 3]; JOINT_COUNT],
        }
    }

    /// Create a chain from a validated [`ChainConfig`].
    pub fn from_config(config: &ChainConfig) -> Self {
        let [x, y, z] = config.base_position;
        Self::new(config.link_lengths).with_base_position(Point3::new(x, y, z))
    }

    pub fn with_base_position(mut self, base: Point3<f64>) -> Self {
        self.base = base;
        self
    }

    pub fn set_base_position(&mut self, base: Point3<f64>) {
        self.base = base;
    }

    pub fn base_position(&self) -> Point3<f64> {
        self.base
    }

    pub fn link_lengths(&self) -> &[f64; JOINT_COUNT] {
        &self.link_lengths
    }

    /// Maximum distance of the tip from the base.
    pub fn reach(&self) -> f64 {
        self.link_lengths.iter().sum()
    }

    pub fn joint_angles(&self) -> &JointAngles {
        &self.angles
    }

    /// Set each joint's local rotation, base joint first.
    ///
    /// Supplying fewer than [`JOINT_COUNT`] rotations sets the ones given and
    /// leaves the remaining joints at their previous angles, then reports
    /// [`KinematicsError::IncompleteAngles`]. Extra rotations are ignored.
    pub fn set_joint_angles(&mut self, angles: &[JointRotation]) -> Result<(), KinematicsError> {
        if angles.len() > JOINT_COUNT {
            log::warn!(
                "Ignoring {} extra joint rotations",
                angles.len() - JOINT_COUNT
            );
        }
        for (joint, rotation) in self.angles.iter_mut().zip(angles) {
            *joint = *rotation;
        }
        if angles.len() < JOINT_COUNT {
            return Err(KinematicsError::IncompleteAngles {
                expected: JOINT_COUNT,
                given: angles.len(),
            });
        }
        Ok(())
    }

    /// World position of the tip of the final link.
    pub fn end_effector_position(&self) -> Point3<f64> {
        forward_kinematics(&self.base, &self.link_lengths, &self.angles)
    }

    /// End-effector position for `angles` without touching this chain's state.
    pub fn end_effector_for(&self, angles: &JointAngles) -> Point3<f64> {
        forward_kinematics(&self.base, &self.link_lengths, angles)
    }

    /// Positions of every joint, link center and the tip.
    pub fn pose(&self) -> ArmPose {
        arm_pose(&self.base, &self.link_lengths, &self.angles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::FRAC_PI_2;

    fn assert_close(a: Point3<f64>, b: Point3<f64>) {
        assert!((a - b).norm() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_rest_pose_is_straight_up() {
        let chain = KinematicChain::default();
        assert_close(chain.end_effector_position(), Point3::new(0.0, 7.0, 0.0));

        let pose = chain.pose();
        assert_close(pose.joints[0], Point3::new(0.0, 0.0, 0.0));
        assert_close(pose.joints[1], Point3::new(0.0, 3.0, 0.0));
        assert_close(pose.joints[2], Point3::new(0.0, 6.0, 0.0));
        assert_close(pose.link_centers[0], Point3::new(0.0, 1.5, 0.0));
        assert_close(pose.link_centers[2], Point3::new(0.0, 6.5, 0.0));
    }

    #[test]
    fn test_base_joint_rotation_about_z() {
        let mut chain = KinematicChain::default();
        chain
            .set_joint_angles(&[[0.0, 0.0, FRAC_PI_2], [0.0; 3], [0.0; 3]])
            .unwrap();
        // +Y rotated a quarter turn about Z points along -X.
        assert_close(chain.end_effector_position(), Point3::new(-7.0, 0.0, 0.0));
    }

    #[test]
    fn test_rotations_nest_in_parent_frames() {
        let mut chain = KinematicChain::default();
        chain
            .set_joint_angles(&[[0.0; 3], [FRAC_PI_2, 0.0, 0.0], [0.0; 3]])
            .unwrap();
        // Second joint tips the last two links from +Y to +Z.
        assert_close(chain.end_effector_position(), Point3::new(0.0, 3.0, 4.0));

        chain
            .set_joint_angles(&[[FRAC_PI_2, 0.0, 0.0], [-FRAC_PI_2, 0.0, 0.0], [0.0; 3]])
            .unwrap();
        assert_close(chain.end_effector_position(), Point3::new(0.0, 4.0, 3.0));
    }

    #[test]
    fn test_euler_order_is_xyz() {
        let mut chain = KinematicChain::default();
        chain
            .set_joint_angles(&[[FRAC_PI_2, 0.0, FRAC_PI_2], [0.0; 3], [0.0; 3]])
            .unwrap();
        // Rz sends +Y to -X, which Rx then leaves in place.
        assert_close(chain.end_effector_position(), Point3::new(-7.0, 0.0, 0.0));
    }

    #[test]
    fn test_base_offset_translates_tip() {
        let chain = KinematicChain::default().with_base_position(Point3::new(1.0, -2.0, 0.5));
        assert_close(chain.end_effector_position(), Point3::new(1.0, 5.0, 0.5));
    }

    #[test]
    fn test_incomplete_angles_keep_previous_joints() {
        let mut chain = KinematicChain::default();
        chain
            .set_joint_angles(&[[0.1, 0.2, 0.3], [0.4, 0.5, 0.6], [0.7, 0.8, 0.9]])
            .unwrap();

        let err = chain.set_joint_angles(&[[1.0, 1.0, 1.0]]).unwrap_err();
        assert_eq!(
            err,
            KinematicsError::IncompleteAngles {
                expected: 3,
                given: 1
            }
        );
        assert_eq!(chain.joint_angles()[0], [1.0, 1.0, 1.0]);
        assert_eq!(chain.joint_angles()[1], [0.4, 0.5, 0.6]);
        assert_eq!(chain.joint_angles()[2], [0.7, 0.8, 0.9]);
    }

    fn angles_strategy() -> impl Strategy<Value = JointAngles> {
        let angle = -10.0f64..10.0;
        let triple = [angle.clone(), angle.clone(), angle];
        [triple.clone(), triple.clone(), triple]
    }

    proptest! {
        #[test]
        fn test_forward_kinematics_deterministic(angles in angles_strategy()) {
            let mut first = KinematicChain::default();
            let mut second = KinematicChain::default();
            first.set_joint_angles(&angles).unwrap();
            second.set_joint_angles(&[[0.3; 3]; 3]).unwrap();
            second.set_joint_angles(&angles).unwrap();

            let a = first.end_effector_position();
            prop_assert_eq!(a, first.end_effector_position());
            prop_assert_eq!(a, second.end_effector_position());
            prop_assert_eq!(a, forward_kinematics(&Point3::origin(), &DEFAULT_LINK_LENGTHS, &angles));
        }

        #[test]
        fn test_tip_within_reach(angles in angles_strategy()) {
            let chain = KinematicChain::default();
            let tip = chain.end_effector_for(&angles);
            prop_assert!(tip.coords.norm() <= chain.reach() + 1e-9);
        }
    }
}
