use crate::runtime::skeleton::Skeleton;
use crate::{Error, RigData, Target, UnassignedLeaves};
use glam::{Quat, Vec3};
use std::collections::VecDeque;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChainId(usize);

impl ChainId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// An ordered run of joints from a base joint to an end joint.
///
/// The base joint of a child chain is the end joint of its parent: both chains hold the
/// same joint index.
#[derive(Clone, Debug)]
pub struct Chain {
    pub(crate) name: String,
    pub(crate) joints: Vec<usize>,
    pub(crate) lengths: Vec<f32>,
    pub(crate) total_length: f32,
    pub(crate) level: usize,
    pub(crate) parent: Option<ChainId>,
    pub(crate) children: Vec<ChainId>,

    pub(crate) target: Option<Target>,
    // End joint orientation relative to the target orientation, captured on assignment.
    pub(crate) target_offset: Option<Quat>,
    pub(crate) effective_target: Option<Vec3>,
}

impl Chain {
    /// `"<base joint>-<end joint>"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn joints(&self) -> &[usize] {
        &self.joints
    }

    pub fn base_joint(&self) -> usize {
        self.joints[0]
    }

    pub fn end_joint(&self) -> usize {
        self.joints[self.joints.len() - 1]
    }

    /// Rest length of every segment; never changes after the tree is built.
    pub fn lengths(&self) -> &[f32] {
        &self.lengths
    }

    pub fn total_length(&self) -> f32 {
        self.total_length
    }

    /// Depth from the root chain (root = 0).
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn parent(&self) -> Option<ChainId> {
        self.parent
    }

    pub fn children(&self) -> &[ChainId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    /// Target used by this chain's most recent forward step. For a branching chain this
    /// is the centroid of the base positions its children asked for.
    pub fn effective_target(&self) -> Option<Vec3> {
        self.effective_target
    }
}

#[derive(Clone, Debug)]
pub struct ChainTree {
    pub(crate) skeleton: Skeleton,
    pub(crate) chains: Vec<Chain>,
    pub(crate) forward_order: Vec<ChainId>,
    pub(crate) backward_order: Vec<ChainId>,
    pub(crate) root_position: Vec3,
}

impl ChainTree {
    /// Splits a joint hierarchy into chains.
    ///
    /// A chain follows single-child links from its base and ends at a joint with no
    /// children (a leaf chain) or with several children, each of which starts a child
    /// chain based at that joint. Fails if any chain would hold fewer than two joints.
    pub fn build(data: &RigData) -> Result<Self, Error> {
        let root = data.validate()?;
        let skeleton = Skeleton::new(data, root);

        let mut chains: Vec<Chain> = Vec::new();
        let mut pending: VecDeque<(Vec<usize>, Option<ChainId>)> = VecDeque::new();
        pending.push_back((vec![root], None));

        while let Some((mut joints, parent)) = pending.pop_front() {
            let mut current = joints[joints.len() - 1];
            while let [only] = skeleton.children(current) {
                joints.push(*only);
                current = *only;
            }

            if joints.len() < 2 {
                return Err(Error::ChainTooShort {
                    base: skeleton.joints()[joints[0]].name().to_string(),
                    joints: joints.len(),
                });
            }

            let lengths = joints
                .windows(2)
                .map(|pair| {
                    skeleton.joints()[pair[0]]
                        .rest_position()
                        .distance(skeleton.joints()[pair[1]].rest_position())
                })
                .collect::<Vec<_>>();
            let total_length = lengths.iter().sum();
            let name = format!(
                "{}-{}",
                skeleton.joints()[joints[0]].name(),
                skeleton.joints()[current].name()
            );
            let level = parent.map(|p| chains[p.0].level + 1).unwrap_or(0);

            let id = ChainId(chains.len());
            if let Some(parent) = parent {
                chains[parent.0].children.push(id);
            }
            for &child in skeleton.children(current) {
                pending.push_back((vec![current, child], Some(id)));
            }

            log::debug!(
                "parsed chain '{name}' with {} joints at level {level}{}",
                joints.len(),
                if skeleton.children(current).is_empty() {
                    " (end chain)"
                } else {
                    ""
                }
            );

            chains.push(Chain {
                name,
                joints,
                lengths,
                total_length,
                level,
                parent,
                children: Vec::new(),
                target: None,
                target_offset: None,
                effective_target: None,
            });
        }

        let mut backward_order = (0..chains.len()).map(ChainId).collect::<Vec<_>>();
        backward_order.sort_by_key(|id| chains[id.0].level);
        let mut forward_order = backward_order.clone();
        forward_order.sort_by_key(|id| std::cmp::Reverse(chains[id.0].level));

        let root_position = skeleton.joints()[root].rest_position();
        Ok(Self {
            skeleton,
            chains,
            forward_order,
            backward_order,
            root_position,
        })
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains.get(id.0)
    }

    pub fn root_chain(&self) -> ChainId {
        ChainId(0)
    }

    pub fn chain_by_name(&self, name: &str) -> Option<ChainId> {
        self.chains.iter().position(|c| c.name == name).map(ChainId)
    }

    /// Leaf chains sorted by name.
    pub fn leaf_chains(&self) -> Vec<ChainId> {
        let mut leaves = (0..self.chains.len())
            .map(ChainId)
            .filter(|id| self.chains[id.0].is_leaf())
            .collect::<Vec<_>>();
        leaves.sort_by(|a, b| self.chains[a.0].name.cmp(&self.chains[b.0].name));
        leaves
    }

    pub fn joint_by_name(&self, name: &str) -> Option<(usize, &crate::Joint)> {
        self.skeleton.joint_by_name(name)
    }

    pub fn root_position(&self) -> Vec3 {
        self.root_position
    }

    /// Moves the whole rig so its root sits at `position`.
    pub fn set_root_position(&mut self, position: Vec3) -> Result<(), Error> {
        if !position.is_finite() {
            return Err(Error::InvalidValue {
                message: "root position must be finite".to_string(),
            });
        }
        self.skeleton.translate_all(position - self.root_position);
        self.root_position = position;
        Ok(())
    }

    /// Restores the rest pose at the current root position.
    pub fn reset_pose(&mut self) {
        let rest_root = self.skeleton.joints()[self.skeleton.root_index()].rest_position();
        self.skeleton.set_to_rest_pose();
        self.skeleton.translate_all(self.root_position - rest_root);
        for chain in &mut self.chains {
            chain.effective_target = None;
        }
    }

    pub fn assign_target(&mut self, id: ChainId, target: impl Into<Target>) -> Result<(), Error> {
        let target = target.into();
        if !target.position.is_finite() || target.rotation.is_some_and(|r| !r.is_finite()) {
            return Err(Error::InvalidValue {
                message: format!("target for chain #{} must be finite", id.0),
            });
        }
        let chain = self.chains.get(id.0).ok_or_else(|| Error::UnknownChain {
            chain: format!("#{}", id.0),
        })?;
        if !chain.is_leaf() {
            return Err(Error::NotALeafChain {
                chain: chain.name.clone(),
            });
        }

        let end_rest = self.skeleton.joints()[chain.end_joint()].rest_rotation();
        let chain = &mut self.chains[id.0];
        match target.rotation {
            Some(rotation) if chain.target_offset.is_none() => {
                chain.target_offset = Some(rotation.normalize().inverse() * end_rest);
            }
            Some(_) => {}
            None => chain.target_offset = None,
        }
        chain.target = Some(target);
        Ok(())
    }

    pub fn assign_target_by_name(
        &mut self,
        name: &str,
        target: impl Into<Target>,
    ) -> Result<(), Error> {
        let id = self.chain_by_name(name).ok_or_else(|| Error::UnknownChain {
            chain: name.to_string(),
        })?;
        self.assign_target(id, target)
    }

    pub fn clear_target(&mut self, id: ChainId) -> Result<(), Error> {
        let chain = self.chains.get_mut(id.0).ok_or_else(|| Error::UnknownChain {
            chain: format!("#{}", id.0),
        })?;
        chain.target = None;
        chain.target_offset = None;
        Ok(())
    }

    /// Fails with [`Error::MissingTarget`] for the first (by name) leaf chain without a
    /// target when unassigned leaves are rejected.
    pub fn check_targets(&self, policy: UnassignedLeaves) -> Result<(), Error> {
        if policy == UnassignedLeaves::Skip {
            return Ok(());
        }
        match self
            .leaf_chains()
            .into_iter()
            .find(|id| self.chains[id.0].target.is_none())
        {
            Some(id) => Err(Error::MissingTarget {
                chain: self.chains[id.0].name.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Chains that take part in a solve: leaves with a target and every chain with at
    /// least one such leaf below it.
    pub(crate) fn active_chains(&self) -> Vec<bool> {
        let mut active = vec![false; self.chains.len()];
        for id in &self.forward_order {
            let chain = &self.chains[id.0];
            active[id.0] = if chain.is_leaf() {
                chain.target.is_some()
            } else {
                chain.children.iter().any(|c| active[c.0])
            };
        }
        active
    }
}
