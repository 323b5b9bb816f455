//! Branching FABRIK (forward and backward reaching) inverse kinematics.
//!
//! A rig is a tree of rigid joints described by [`RigData`]. [`ChainTree::build`] splits it
//! into chains that meet at branching joints, targets are assigned to the leaf chains, and
//! [`FabrikSolver::solve`] moves the joints in place while keeping every segment length.
//!
//! The crate does no I/O and owns no scene; hosts read joint positions and orientations
//! back from [`ChainTree::skeleton`].

#![forbid(unsafe_code)]

mod error;
mod geometry;
mod model;
mod runtime;

pub use error::*;
pub use geometry::bend_angle_degrees;
pub use model::*;
pub use runtime::*;

#[cfg(test)]
mod geometry_tests;

#[cfg(test)]
mod model_tests;
