use crate::geometry::arc_rotation;
use crate::{RigData, RotationLimit};
use glam::{Quat, Vec3};

#[derive(Clone, Debug)]
pub struct Joint {
    name: String,
    parent: Option<usize>,

    position: Vec3,
    rotation: Quat,

    rest_position: Vec3,
    rest_rotation: Quat,
    limit: Option<RotationLimit>,
}

impl Joint {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent joint index. Lookup only; the skeleton owns every joint.
    pub fn parent_index(&self) -> Option<usize> {
        self.parent
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// World orientation. Only meaningful once a solve has finished.
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn rest_position(&self) -> Vec3 {
        self.rest_position
    }

    pub fn rest_rotation(&self) -> Quat {
        self.rest_rotation
    }

    pub fn limit(&self) -> Option<RotationLimit> {
        self.limit
    }
}

/// Joint arena for one rig. Chains refer to joints by index, so a joint shared by a
/// parent chain and its child chains exists exactly once.
#[derive(Clone, Debug)]
pub struct Skeleton {
    joints: Vec<Joint>,
    joint_children: Vec<Vec<usize>>,
    root: usize,
}

impl Skeleton {
    pub(crate) fn new(data: &RigData, root: usize) -> Self {
        let joints = data
            .joints
            .iter()
            .map(|joint| Joint {
                name: joint.name.clone(),
                parent: joint.parent,
                position: joint.position,
                rotation: joint.rotation,
                rest_position: joint.position,
                rest_rotation: joint.rotation,
                limit: joint.limit,
            })
            .collect::<Vec<_>>();

        Self {
            joint_children: data.children_indices(),
            joints,
            root,
        }
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn joint(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    pub fn joint_by_name(&self, name: &str) -> Option<(usize, &Joint)> {
        self.joints
            .iter()
            .enumerate()
            .find(|(_, joint)| joint.name == name)
    }

    pub fn root_index(&self) -> usize {
        self.root
    }

    pub fn children(&self, index: usize) -> &[usize] {
        self.joint_children
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn set_to_rest_pose(&mut self) {
        for joint in &mut self.joints {
            joint.position = joint.rest_position;
            joint.rotation = joint.rest_rotation;
        }
    }

    pub(crate) fn position(&self, index: usize) -> Vec3 {
        self.joints[index].position
    }

    pub(crate) fn set_position(&mut self, index: usize, position: Vec3) {
        self.joints[index].position = position;
    }

    pub(crate) fn set_rotation(&mut self, index: usize, rotation: Quat) {
        self.joints[index].rotation = rotation;
    }

    pub(crate) fn translate(&mut self, indices: &[usize], delta: Vec3) {
        for &index in indices {
            self.joints[index].position += delta;
        }
    }

    pub(crate) fn translate_all(&mut self, delta: Vec3) {
        for joint in &mut self.joints {
            joint.position += delta;
        }
    }

    /// Rebuilds every orientation from the current bone directions.
    ///
    /// A joint follows the bone toward its first child; a joint without children follows
    /// the bone from its parent. The shortest arc from the rest direction to the current
    /// direction is applied on top of the rest orientation.
    pub(crate) fn update_orientations(&mut self) {
        for index in 0..self.joints.len() {
            let (rest, current) = if let Some(&child) = self.children(index).first() {
                (
                    self.joints[child].rest_position - self.joints[index].rest_position,
                    self.joints[child].position - self.joints[index].position,
                )
            } else if let Some(parent) = self.joints[index].parent {
                (
                    self.joints[index].rest_position - self.joints[parent].rest_position,
                    self.joints[index].position - self.joints[parent].position,
                )
            } else {
                (Vec3::ZERO, Vec3::ZERO)
            };

            let joint = &mut self.joints[index];
            joint.rotation = arc_rotation(rest, current) * joint.rest_rotation;
        }
    }
}
