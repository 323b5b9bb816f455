use crate::{Error, JointData, RigData, RotationLimit, Target};
use glam::{Quat, Vec3};

fn arm() -> RigData {
    let mut rig = RigData::new();
    let shoulder = rig.push(JointData::new("shoulder", None, Vec3::ZERO));
    let elbow = rig.push(JointData::new("elbow", Some(shoulder), Vec3::X));
    rig.push(JointData::new("wrist", Some(elbow), Vec3::X * 2.0));
    rig
}

#[test]
fn validate_returns_root_index() {
    let rig = arm();
    assert_eq!(rig.validate(), Ok(0));
    assert_eq!(rig.joint_index("wrist"), Some(2));
    assert_eq!(rig.children_indices(), vec![vec![1usize], vec![2], vec![]]);
}

#[test]
fn validate_rejects_empty_rig() {
    assert_eq!(RigData::new().validate(), Err(Error::EmptyRig));
}

#[test]
fn validate_rejects_duplicate_names() {
    let mut rig = arm();
    rig.push(JointData::new("elbow", Some(0), Vec3::Y));
    assert_eq!(
        rig.validate(),
        Err(Error::DuplicateJointName {
            name: "elbow".to_string()
        })
    );
}

#[test]
fn validate_rejects_forward_parent_references() {
    let mut rig = RigData::new();
    rig.push(JointData::new("root", None, Vec3::ZERO));
    rig.push(JointData::new("a", Some(1), Vec3::X));
    assert_eq!(
        rig.validate(),
        Err(Error::InvalidJointParent {
            joint: "a".to_string(),
            parent: 1
        })
    );
}

#[test]
fn validate_rejects_second_root() {
    let mut rig = arm();
    rig.push(JointData::new("floating", None, Vec3::Y));
    assert_eq!(
        rig.validate(),
        Err(Error::MultipleRoots {
            first: "shoulder".to_string(),
            second: "floating".to_string()
        })
    );
}

#[test]
fn validate_rejects_out_of_range_limits() {
    let mut rig = arm();
    rig.joints[1] = rig.joints[1].clone().with_limit(RotationLimit::cone(190.0));
    assert!(matches!(rig.validate(), Err(Error::InvalidValue { .. })));

    rig.joints[1].limit = Some(RotationLimit::cone(-1.0));
    assert!(matches!(rig.validate(), Err(Error::InvalidValue { .. })));

    rig.joints[1].limit = Some(RotationLimit::cone(180.0));
    assert_eq!(rig.validate(), Ok(0));
}

#[test]
fn validate_rejects_non_finite_positions() {
    let mut rig = arm();
    rig.joints[2].position = Vec3::new(f32::NAN, 0.0, 0.0);
    assert!(matches!(rig.validate(), Err(Error::InvalidValue { .. })));
}

#[test]
fn validate_rejects_broken_rest_rotations() {
    let mut rig = arm();
    rig.joints[1].rotation = Quat::from_xyzw(f32::NAN, 0.0, 0.0, 1.0);
    assert!(matches!(rig.validate(), Err(Error::InvalidValue { .. })));

    rig.joints[1].rotation = Quat::from_xyzw(0.0, 0.0, 0.0, 0.0);
    assert!(matches!(rig.validate(), Err(Error::InvalidValue { .. })));

    rig.joints[1].rotation = Quat::from_rotation_y(0.4);
    assert_eq!(rig.validate(), Ok(0));
}

#[test]
fn target_from_point_has_no_rotation() {
    let target: Target = Vec3::new(1.0, 2.0, 3.0).into();
    assert_eq!(target.rotation, None);

    let rotated = target.with_rotation(Quat::from_rotation_z(1.0));
    assert_eq!(rotated.position, Vec3::new(1.0, 2.0, 3.0));
    assert!(rotated.rotation.is_some());
}

#[cfg(feature = "serde")]
#[test]
fn rig_and_config_deserialize_from_json() {
    use crate::{SolverConfig, UnassignedLeaves};

    let rig: RigData = serde_json::from_str(
        r#"{
          "joints": [
            { "name": "root", "position": [0, 0, 0] },
            { "name": "tip", "parent": 0, "position": [0, 1, 0],
              "limit": { "type": "cone", "degrees": 30 } }
          ]
        }"#,
    )
    .unwrap();
    assert_eq!(rig.joints.len(), 2);
    assert_eq!(rig.joints[0].rotation, Quat::IDENTITY);
    assert_eq!(rig.joints[1].parent, Some(0));
    assert_eq!(rig.joints[1].limit, Some(RotationLimit::cone(30.0)));

    let config: SolverConfig =
        serde_json::from_str(r#"{ "tolerance": 0.001, "unassignedLeaves": "skip" }"#).unwrap();
    assert_eq!(config.tolerance, 0.001);
    assert_eq!(config.max_iterations, SolverConfig::default().max_iterations);
    assert_eq!(config.unassigned_leaves, UnassignedLeaves::Skip);
}
