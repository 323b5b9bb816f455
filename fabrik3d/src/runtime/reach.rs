//! Per-chain reach steps shared by the single-chain solve and the tree sweeps.
//!
//! Every routine works on a slice of joint positions ordered base -> end, together with
//! the rest length of each segment (`lengths.len() == positions.len() - 1`) and the bend
//! limit of each joint in degrees (`limits.len() == positions.len()`).

use crate::geometry::{EPSILON, constrain_to_cone, place_at_distance};
use crate::{Error, SolverConfig};
use glam::Vec3;

/// Outcome of [`solve_chain`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ChainSolve {
    pub converged: bool,
    /// `false` when the target lay beyond the chain's total length and the closed-form
    /// stretch was used instead of iterating.
    pub reachable: bool,
    pub iterations: u32,
    /// Final distance between the end joint and the target.
    pub distance: f32,
}

pub(crate) fn is_out_of_reach(base: Vec3, target: Vec3, total_length: f32) -> bool {
    base.distance(target) > total_length
}

/// Lays the chain out on the straight line from its base toward `target`.
pub(crate) fn stretch_toward(positions: &mut [Vec3], lengths: &[f32], target: Vec3) {
    for i in 0..lengths.len() {
        let fallback = positions[i + 1] - positions[i];
        positions[i + 1] = place_at_distance(positions[i], target, lengths[i], fallback);
    }
}

/// Forward pass: pins the end joint on `target` and walks back to the base.
///
/// The base joint is moved too; callers that need it fixed restore it afterwards.
pub(crate) fn forward_reach(
    positions: &mut [Vec3],
    lengths: &[f32],
    limits: &[f32],
    target: Vec3,
    constrain: bool,
) {
    let n = positions.len();
    let mut previous = positions[n - 1];
    positions[n - 1] = target;

    for i in (0..n - 1).rev() {
        if constrain && i + 2 < n {
            let axis = positions[i + 1] - positions[i + 2];
            positions[i] = constrain_to_cone(positions[i + 1], axis, positions[i], limits[i + 1]);
        }
        let fallback = positions[i] - previous;
        previous = positions[i];
        positions[i] = place_at_distance(positions[i + 1], positions[i], lengths[i], fallback);
    }
}

/// Backward pass: pins the base joint on `base` and walks out to the end joint,
/// applying the bend limit at every interior joint.
///
/// `incoming` is the direction of the bone arriving at the base joint from outside the
/// chain (the parent chain's last bone). When given, the base joint is limited as well.
pub(crate) fn backward_reach(
    positions: &mut [Vec3],
    lengths: &[f32],
    limits: &[f32],
    base: Vec3,
    incoming: Option<Vec3>,
) {
    let mut previous = positions[0];
    positions[0] = base;

    for i in 0..lengths.len() {
        let axis = match i {
            0 => incoming,
            _ => Some(positions[i] - positions[i - 1]),
        };
        if let Some(axis) = axis {
            positions[i + 1] = constrain_to_cone(positions[i], axis, positions[i + 1], limits[i]);
        }
        let fallback = positions[i + 1] - previous;
        previous = positions[i + 1];
        positions[i + 1] = place_at_distance(positions[i], positions[i + 1], lengths[i], fallback);
    }
}

/// Kinks a perfectly straight chain lying on the line toward `target`.
///
/// Reach passes keep a straight chain on its own line, so a collinear target closer than
/// the chain's length could never be met. The middle interior joint is pushed sideways by
/// a quarter of its shorter neighbouring segment; the passes restore the lengths.
pub(crate) fn unfold_if_straight(positions: &mut [Vec3], lengths: &[f32], target: Vec3) -> bool {
    let n = positions.len();
    if n < 3 {
        return false;
    }
    // A straight chain already touching its target is solved.
    if positions[n - 1].distance(target) <= EPSILON * (1.0 + target.abs().max_element()) {
        return false;
    }
    let Some(line) = (target - positions[0]).try_normalize() else {
        return false;
    };
    let straight = positions.windows(2).all(|pair| {
        (pair[1] - pair[0])
            .try_normalize()
            .is_none_or(|bone| bone.dot(line).abs() >= 1.0 - EPSILON)
    });
    if !straight {
        return false;
    }

    let k = (n - 1) / 2;
    let offset = lengths[k - 1].min(lengths[k]) * 0.25;
    positions[k] += line.any_orthonormal_vector() * offset;
    true
}

/// Solves a single, non-branching chain whose base is fixed at `root`.
///
/// `positions` holds the current pose (base first) and is updated in place; `lengths`
/// are the rest lengths of its segments. The bend limit comes from
/// [`SolverConfig::rotation_limit_degrees`] and applies to every interior joint.
///
/// Running out of iterations is not an error: the best pose found is kept and
/// [`ChainSolve::converged`] is `false`.
pub fn solve_chain(
    positions: &mut [Vec3],
    lengths: &[f32],
    root: Vec3,
    target: Vec3,
    config: &SolverConfig,
) -> Result<ChainSolve, Error> {
    config.validate()?;
    if positions.len() < 2 {
        return Err(Error::ChainTooShort {
            base: "<chain>".to_string(),
            joints: positions.len(),
        });
    }
    if lengths.len() + 1 != positions.len() {
        return Err(Error::InvalidValue {
            message: format!(
                "expected {} segment lengths for {} joints, got {}",
                positions.len() - 1,
                positions.len(),
                lengths.len()
            ),
        });
    }
    if lengths.iter().any(|l| !l.is_finite() || *l < 0.0) || !target.is_finite() {
        return Err(Error::InvalidValue {
            message: "segment lengths must be finite and non-negative and the target finite"
                .to_string(),
        });
    }

    let delta = root - positions[0];
    for position in positions.iter_mut() {
        *position += delta;
    }

    let limits = vec![config.rotation_limit_degrees; positions.len()];
    let total_length: f32 = lengths.iter().sum();
    let end = positions.len() - 1;

    if is_out_of_reach(root, target, total_length) {
        stretch_toward(positions, lengths, target);
        let distance = positions[end].distance(target);
        return Ok(ChainSolve {
            converged: distance <= config.tolerance,
            reachable: false,
            iterations: 0,
            distance,
        });
    }

    let mut iterations = 0;
    while positions[end].distance(target) > config.tolerance && iterations < config.max_iterations
    {
        unfold_if_straight(positions, lengths, target);
        forward_reach(
            positions,
            lengths,
            &limits,
            target,
            config.constrain_forward_pass,
        );
        backward_reach(positions, lengths, &limits, root, None);
        iterations += 1;
    }

    let distance = positions[end].distance(target);
    Ok(ChainSolve {
        converged: distance <= config.tolerance,
        reachable: true,
        iterations,
        distance,
    })
}
