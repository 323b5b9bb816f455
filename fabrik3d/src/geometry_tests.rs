use crate::geometry::{arc_rotation, constrain_to_cone, direction_or, place_at_distance};
use crate::bend_angle_degrees;
use glam::{Quat, Vec3};

fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-4,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

fn assert_vec_approx(actual: Vec3, expected: Vec3) {
    assert!(
        actual.distance(expected) <= 1.0e-4,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn cone_keeps_child_inside_limit() {
    let child = Vec3::new(1.0, 0.2, 0.0);
    let constrained = constrain_to_cone(Vec3::ZERO, Vec3::X, child, 45.0);
    assert_eq!(constrained, child);
}

#[test]
fn cone_moves_child_onto_cone_surface() {
    let joint = Vec3::new(1.0, 0.0, 0.0);
    let child = joint + Vec3::new(1.0, 1.0, 0.0);
    let constrained = constrain_to_cone(joint, Vec3::X, child, 30.0);

    assert_approx(bend_angle_degrees(Vec3::X, constrained - joint), 30.0);
    // Stays in the plane of the original bend, on the same side of the axis.
    assert_approx(constrained.z, 0.0);
    assert!(constrained.y > 0.0);
    // P + d * |o| * tan(limit) with |o| = 1.
    assert_vec_approx(constrained, Vec3::new(2.0, 30f32.to_radians().tan(), 0.0));
}

#[test]
fn cone_with_zero_limit_puts_child_on_axis() {
    let joint = Vec3::ZERO;
    let constrained = constrain_to_cone(joint, Vec3::Y, Vec3::new(0.6, 0.8, 0.0), 0.0);
    assert_approx(constrained.x, 0.0);
    assert_approx(constrained.z, 0.0);
    assert!(constrained.y > 0.0);
}

#[test]
fn cone_mirrors_backward_bend_for_narrow_limits() {
    let constrained = constrain_to_cone(Vec3::ZERO, Vec3::X, Vec3::new(-1.0, 1.0, 0.0), 45.0);
    assert_approx(bend_angle_degrees(Vec3::X, constrained), 45.0);
    assert!(constrained.x > 0.0);
    assert!(constrained.y > 0.0);
}

#[test]
fn cone_handles_wide_limits_without_tan() {
    let child = Vec3::new(-1.0, 0.1, 0.0);
    let constrained = constrain_to_cone(Vec3::ZERO, Vec3::X, child, 120.0);
    assert_approx(bend_angle_degrees(Vec3::X, constrained), 120.0);
    assert_approx(constrained.length(), child.length());
}

#[test]
fn cone_handles_perpendicular_and_opposite_bones() {
    let perpendicular = constrain_to_cone(Vec3::ZERO, Vec3::X, Vec3::Y, 20.0);
    assert_approx(bend_angle_degrees(Vec3::X, perpendicular), 20.0);
    assert_approx(perpendicular.length(), 1.0);

    let opposite = constrain_to_cone(Vec3::ZERO, Vec3::X, Vec3::NEG_X * 2.0, 60.0);
    assert!(opposite.is_finite());
    assert_approx(bend_angle_degrees(Vec3::X, opposite), 60.0);
}

#[test]
fn cone_ignores_degenerate_input() {
    let child = Vec3::new(0.3, 0.4, 0.0);
    assert_eq!(constrain_to_cone(Vec3::ZERO, Vec3::ZERO, child, 10.0), child);
    assert_eq!(constrain_to_cone(child, Vec3::X, child, 10.0), child);
    assert_eq!(constrain_to_cone(Vec3::ZERO, Vec3::X, Vec3::NEG_X, 180.0), Vec3::NEG_X);
}

#[test]
fn place_at_distance_falls_back_for_coincident_points() {
    let anchor = Vec3::new(1.0, 1.0, 1.0);
    let placed = place_at_distance(anchor, anchor, 2.0, Vec3::Z);
    assert_vec_approx(placed, anchor + Vec3::Z * 2.0);

    let pinned = place_at_distance(anchor, Vec3::new(5.0, 1.0, 1.0), 0.0, Vec3::Z);
    assert_vec_approx(pinned, anchor);

    assert_vec_approx(direction_or(Vec3::ZERO, Vec3::ZERO), Vec3::Y);
}

#[test]
fn arc_rotation_maps_directions() {
    let rotation = arc_rotation(Vec3::X * 3.0, Vec3::Y * 0.5);
    assert_vec_approx(rotation * Vec3::X, Vec3::Y);
    assert_eq!(arc_rotation(Vec3::ZERO, Vec3::Y), Quat::IDENTITY);
}
