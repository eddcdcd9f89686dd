//! Compute module - Forward kinematics and the evolutionary solver.

pub mod evolution;
mod kinematics;

pub use kinematics::*;
