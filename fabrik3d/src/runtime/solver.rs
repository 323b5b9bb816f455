use crate::runtime::reach::{
    backward_reach, forward_reach, is_out_of_reach, stretch_toward, unfold_if_straight,
};
use crate::{ChainId, ChainTree, Error};
use glam::Vec3;
use std::collections::BTreeSet;

/// What a solve does with leaf chains that have no target.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum UnassignedLeaves {
    /// Fail with [`Error::MissingTarget`] before any joint moves.
    #[default]
    Reject,
    /// Leave those leaves unsolved; their joints are carried along with their base.
    Skip,
}

/// Whether a child chain that fell back to the straight-line stretch still contributes
/// its base position to its parent's centroid.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum FallbackAggregation {
    #[default]
    Include,
    /// Ignore stretched children unless every child of the parent stretched.
    Exclude,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct SolverConfig {
    /// Largest end-effector distance that counts as converged.
    pub tolerance: f32,
    /// Sweep budget per solve (at least 1).
    pub max_iterations: u32,
    /// Default bend limit for joints without their own [`crate::RotationLimit`].
    pub rotation_limit_degrees: f32,
    /// Also apply bend limits while walking from the end joint toward the base.
    pub constrain_forward_pass: bool,
    pub unassigned_leaves: UnassignedLeaves,
    pub fallback_aggregation: FallbackAggregation,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.05,
            max_iterations: 20,
            rotation_limit_degrees: 180.0,
            constrain_forward_pass: false,
            unassigned_leaves: UnassignedLeaves::Reject,
            fallback_aggregation: FallbackAggregation::Include,
        }
    }
}

impl SolverConfig {
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_rotation_limit(mut self, degrees: f32) -> Self {
        self.rotation_limit_degrees = degrees;
        self
    }

    pub fn with_forward_constraints(mut self, enabled: bool) -> Self {
        self.constrain_forward_pass = enabled;
        self
    }

    pub fn with_unassigned_leaves(mut self, policy: UnassignedLeaves) -> Self {
        self.unassigned_leaves = policy;
        self
    }

    pub fn with_fallback_aggregation(mut self, mode: FallbackAggregation) -> Self {
        self.fallback_aggregation = mode;
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::InvalidValue {
                message: format!("tolerance must be finite and >= 0, got {}", self.tolerance),
            });
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidValue {
                message: "max_iterations must be at least 1".to_string(),
            });
        }
        crate::RotationLimit::cone(self.rotation_limit_degrees).validate()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SolveResult {
    /// Solved leaf chains whose end joint ended within tolerance of the target.
    pub converged_leaves: BTreeSet<ChainId>,
    /// Solved leaf chains still reaching toward their target.
    pub unconverged_leaves: BTreeSet<ChainId>,
    /// Leaf chains skipped for lack of a target.
    pub unsolved_leaves: BTreeSet<ChainId>,
    /// Whole-tree sweeps performed.
    pub iterations: u32,
}

impl SolveResult {
    pub fn is_converged(&self, id: ChainId) -> bool {
        self.converged_leaves.contains(&id)
    }

    pub fn all_converged(&self) -> bool {
        self.unconverged_leaves.is_empty()
    }
}

#[derive(Copy, Clone, Debug, Default)]
struct Aggregate {
    sum: Vec3,
    count: u32,
    reached_sum: Vec3,
    reached_count: u32,
}

impl Aggregate {
    fn add(&mut self, position: Vec3, fell_back: bool) {
        self.sum += position;
        self.count += 1;
        if !fell_back {
            self.reached_sum += position;
            self.reached_count += 1;
        }
    }

    fn centroid(&self, mode: FallbackAggregation) -> Option<Vec3> {
        if mode == FallbackAggregation::Exclude && self.reached_count > 0 {
            return Some(self.reached_sum / self.reached_count as f32);
        }
        (self.count > 0).then(|| self.sum / self.count as f32)
    }
}

#[derive(Clone, Debug, Default)]
struct SweepScratch {
    positions: Vec<Vec3>,
    limits: Vec<f32>,
    aggregates: Vec<Aggregate>,
    anchors: Vec<Vec3>,
}

/// Forward-and-backward reaching solver for a whole [`ChainTree`].
#[derive(Clone, Debug)]
pub struct FabrikSolver {
    config: SolverConfig,
}

impl FabrikSolver {
    pub fn new(config: SolverConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: SolverConfig::default(),
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Moves the tree's joints toward the assigned targets.
    ///
    /// Sweeps until every solved leaf is within tolerance or the sweep budget is spent.
    /// Targets out of reach are not an error; those leaves are reported in
    /// [`SolveResult::unconverged_leaves`] and stretch toward their target.
    pub fn solve(&self, tree: &mut ChainTree) -> Result<SolveResult, Error> {
        tree.check_targets(self.config.unassigned_leaves)?;

        let active = tree.active_chains();
        let limits = tree
            .skeleton
            .joints()
            .iter()
            .map(|joint| {
                joint
                    .limit()
                    .map(|limit| limit.degrees())
                    .unwrap_or(self.config.rotation_limit_degrees)
            })
            .collect::<Vec<_>>();
        let longest = tree.chains.iter().map(|c| c.joints.len()).max().unwrap_or(0);
        let mut scratch = SweepScratch {
            positions: Vec::with_capacity(longest),
            limits: Vec::with_capacity(longest),
            aggregates: vec![Aggregate::default(); tree.chains.len()],
            anchors: vec![Vec3::ZERO; tree.chains.len()],
        };

        let mut iterations = 0;
        if self.leaves_out_of_reach(tree, &active) {
            // Every solved leaf lies beyond its chain: one stretching sweep is the answer.
            self.sweep(tree, &active, &limits, &mut scratch);
            log::trace!("all targets out of reach, stretched without iterating");
        } else {
            while iterations < self.config.max_iterations
                && !self.leaves_converged(tree, &active)
            {
                self.sweep(tree, &active, &limits, &mut scratch);
                iterations += 1;
                log::trace!("sweep {iterations} done");
                if self.leaves_out_of_reach(tree, &active) {
                    break;
                }
            }
        }

        tree.skeleton.update_orientations();
        for (index, chain) in tree.chains.iter().enumerate() {
            if !active[index] || !chain.is_leaf() {
                continue;
            }
            if let (Some(rotation), Some(offset)) = (
                chain.target.and_then(|t| t.rotation),
                chain.target_offset,
            ) {
                tree.skeleton
                    .set_rotation(chain.end_joint(), rotation.normalize() * offset);
            }
        }

        let mut result = SolveResult {
            iterations,
            ..SolveResult::default()
        };
        for id in tree.leaf_chains() {
            let chain = &tree.chains[id.index()];
            match chain.target {
                Some(target) if active[id.index()] => {
                    let end = tree.skeleton.position(chain.end_joint());
                    if end.distance(target.position) <= self.config.tolerance {
                        result.converged_leaves.insert(id);
                    } else {
                        result.unconverged_leaves.insert(id);
                    }
                }
                _ => {
                    result.unsolved_leaves.insert(id);
                }
            }
        }

        log::debug!(
            "solve finished after {} sweep(s): {} converged, {} reaching, {} unsolved",
            result.iterations,
            result.converged_leaves.len(),
            result.unconverged_leaves.len(),
            result.unsolved_leaves.len()
        );
        Ok(result)
    }

    fn leaves_converged(&self, tree: &ChainTree, active: &[bool]) -> bool {
        tree.chains.iter().enumerate().all(|(index, chain)| {
            if !active[index] || !chain.is_leaf() {
                return true;
            }
            chain.target.is_none_or(|target| {
                tree.skeleton
                    .position(chain.end_joint())
                    .distance(target.position)
                    <= self.config.tolerance
            })
        })
    }

    /// True when at least one leaf is solved and every solved leaf's target lies beyond
    /// its chain's length from the chain's base. Sweeps no longer change the pose then.
    fn leaves_out_of_reach(&self, tree: &ChainTree, active: &[bool]) -> bool {
        let mut any = false;
        for (index, chain) in tree.chains.iter().enumerate() {
            if !active[index] || !chain.is_leaf() {
                continue;
            }
            let Some(target) = chain.target else {
                continue;
            };
            let base = match chain.parent {
                None => tree.root_position,
                Some(_) => tree.skeleton.position(chain.base_joint()),
            };
            if !is_out_of_reach(base, target.position, chain.total_length) {
                return false;
            }
            any = true;
        }
        any
    }

    fn sweep(
        &self,
        tree: &mut ChainTree,
        active: &[bool],
        limits: &[f32],
        scratch: &mut SweepScratch,
    ) {
        scratch.aggregates.fill(Aggregate::default());
        for (index, chain) in tree.chains.iter().enumerate() {
            if !active[index] {
                scratch.anchors[index] = tree.skeleton.position(chain.base_joint());
            }
        }

        // Leaves toward the root: each chain reaches for its target, then tells its
        // parent where it would like its base to be.
        for order in 0..tree.forward_order.len() {
            let id = tree.forward_order[order].index();
            if !active[id] {
                continue;
            }
            let target = match tree.chains[id].target {
                Some(target) if tree.chains[id].is_leaf() => target.position,
                _ => match scratch.aggregates[id].centroid(self.config.fallback_aggregation) {
                    Some(centroid) => centroid,
                    None => continue,
                },
            };

            let chain = &mut tree.chains[id];
            chain.effective_target = Some(target);
            load_chain(&tree.skeleton, &chain.joints, limits, scratch);

            let base = scratch.positions[0];
            let fell_back = is_out_of_reach(base, target, chain.total_length);
            let reported = if fell_back {
                stretch_toward(&mut scratch.positions, &chain.lengths, target);
                base
            } else {
                unfold_if_straight(&mut scratch.positions, &chain.lengths, target);
                forward_reach(
                    &mut scratch.positions,
                    &chain.lengths,
                    &scratch.limits,
                    target,
                    self.config.constrain_forward_pass,
                );
                scratch.positions[0]
            };

            // The base stays put until the backward phase.
            for (slot, &joint) in chain.joints.iter().enumerate().skip(1) {
                tree.skeleton.set_position(joint, scratch.positions[slot]);
            }
            if let Some(parent) = chain.parent {
                scratch.aggregates[parent.index()].add(reported, fell_back);
            }
        }

        // Root toward the leaves: each chain re-anchors on the base its parent handed
        // down and reaches back out.
        for order in 0..tree.backward_order.len() {
            let id = tree.backward_order[order].index();
            let chain = &tree.chains[id];
            if !active[id] {
                let delta = tree.skeleton.position(chain.base_joint()) - scratch.anchors[id];
                tree.skeleton.translate(&chain.joints[1..], delta);
                continue;
            }
            let Some(target) = chain.effective_target else {
                continue;
            };

            let (base, incoming) = match chain.parent {
                None => (tree.root_position, None),
                Some(parent) => {
                    let parent = &tree.chains[parent.index()];
                    let before = parent.joints[parent.joints.len() - 2];
                    let base = tree.skeleton.position(chain.base_joint());
                    (base, Some(base - tree.skeleton.position(before)))
                }
            };
            load_chain(&tree.skeleton, &chain.joints, limits, scratch);
            if is_out_of_reach(base, target, chain.total_length) {
                scratch.positions[0] = base;
                stretch_toward(&mut scratch.positions, &chain.lengths, target);
            }
            // Also re-applies the bend limits a stretch ignores, the junction's included.
            backward_reach(
                &mut scratch.positions,
                &chain.lengths,
                &scratch.limits,
                base,
                incoming,
            );

            for (slot, &joint) in chain.joints.iter().enumerate() {
                tree.skeleton.set_position(joint, scratch.positions[slot]);
            }
        }
    }
}

fn load_chain(
    skeleton: &crate::Skeleton,
    joints: &[usize],
    limits: &[f32],
    scratch: &mut SweepScratch,
) {
    scratch.positions.clear();
    scratch.limits.clear();
    for &joint in joints {
        scratch.positions.push(skeleton.position(joint));
        scratch.limits.push(limits[joint]);
    }
}
