use glam::{Quat, Vec3};

/// Rest pose of one joint in a rig hierarchy.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointData {
    pub name: String,
    /// Index of the parent joint. Parents are listed before their children.
    #[cfg_attr(feature = "serde", serde(default))]
    pub parent: Option<usize>,
    pub position: Vec3,
    #[cfg_attr(feature = "serde", serde(default = "default_rotation"))]
    pub rotation: Quat,
    #[cfg_attr(feature = "serde", serde(default))]
    pub limit: Option<RotationLimit>,
}

impl JointData {
    pub fn new(name: impl Into<String>, parent: Option<usize>, position: Vec3) -> Self {
        Self {
            name: name.into(),
            parent,
            position,
            rotation: Quat::IDENTITY,
            limit: None,
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_limit(mut self, limit: RotationLimit) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(feature = "serde")]
fn default_rotation() -> Quat {
    Quat::IDENTITY
}

/// Maximum bend allowed at a joint, measured between its incoming and outgoing bones.
///
/// Only a circular cone is supported. The elliptical four-limit cone of the published
/// algorithm would become another variant.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "camelCase"))]
pub enum RotationLimit {
    Cone { degrees: f32 },
}

impl RotationLimit {
    pub fn cone(degrees: f32) -> Self {
        Self::Cone { degrees }
    }

    pub fn degrees(self) -> f32 {
        match self {
            Self::Cone { degrees } => degrees,
        }
    }

    pub(crate) fn validate(self) -> Result<(), crate::Error> {
        let degrees = self.degrees();
        if !degrees.is_finite() || !(0.0..=180.0).contains(&degrees) {
            return Err(crate::Error::InvalidValue {
                message: format!("rotation limit must be within [0, 180] degrees, got {degrees}"),
            });
        }
        Ok(())
    }
}

/// Point (and optionally orientation) an end-effector tries to reach.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Target {
    pub position: Vec3,
    #[cfg_attr(feature = "serde", serde(default))]
    pub rotation: Option<Quat>,
}

impl Target {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            rotation: None,
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = Some(rotation);
        self
    }
}

impl From<Vec3> for Target {
    fn from(position: Vec3) -> Self {
        Self::new(position)
    }
}

/// Flat joint hierarchy supplied by the host.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RigData {
    pub joints: Vec<JointData>,
}

impl RigData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a joint and returns its index.
    pub fn push(&mut self, joint: JointData) -> usize {
        self.joints.push(joint);
        self.joints.len() - 1
    }

    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    pub(crate) fn children_indices(&self) -> Vec<Vec<usize>> {
        let mut children = vec![Vec::<usize>::new(); self.joints.len()];
        for (index, joint) in self.joints.iter().enumerate() {
            if let Some(parent) = joint.parent {
                if parent < children.len() {
                    children[parent].push(index);
                }
            }
        }
        children
    }

    /// Checks names, parent links and limits; returns the root joint index.
    pub(crate) fn validate(&self) -> Result<usize, crate::Error> {
        if self.joints.is_empty() {
            return Err(crate::Error::EmptyRig);
        }

        let mut root: Option<usize> = None;
        let mut seen = std::collections::HashSet::<&str>::new();
        for (index, joint) in self.joints.iter().enumerate() {
            if !seen.insert(joint.name.as_str()) {
                return Err(crate::Error::DuplicateJointName {
                    name: joint.name.clone(),
                });
            }
            if !joint.position.is_finite() {
                return Err(crate::Error::InvalidValue {
                    message: format!("joint '{}' has a non-finite position", joint.name),
                });
            }
            if !joint.rotation.is_finite() || joint.rotation.length_squared() <= f32::EPSILON {
                return Err(crate::Error::InvalidValue {
                    message: format!("joint '{}' has a non-finite or zero rotation", joint.name),
                });
            }
            match joint.parent {
                Some(parent) if parent >= index => {
                    return Err(crate::Error::InvalidJointParent {
                        joint: joint.name.clone(),
                        parent,
                    });
                }
                Some(_) => {}
                None => {
                    if let Some(first) = root {
                        return Err(crate::Error::MultipleRoots {
                            first: self.joints[first].name.clone(),
                            second: joint.name.clone(),
                        });
                    }
                    root = Some(index);
                }
            }
            if let Some(limit) = joint.limit {
                limit.validate()?;
            }
        }

        // A non-empty list whose parents all point backwards always has joint 0 as root.
        root.ok_or(crate::Error::EmptyRig)
    }
}
