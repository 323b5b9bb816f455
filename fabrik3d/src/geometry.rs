use glam::{Quat, Vec3};

/// Lengths and distances at or below this are treated as zero.
pub(crate) const EPSILON: f32 = 1.0e-6;

/// Unit vector along `v`, or along `fallback` when `v` is degenerate.
pub(crate) fn direction_or(v: Vec3, fallback: Vec3) -> Vec3 {
    v.try_normalize()
        .or_else(|| fallback.try_normalize())
        .unwrap_or(Vec3::Y)
}

/// Point at `length` from `anchor` on the line toward `toward`.
///
/// Coincident points keep the previous bone direction (`fallback`), so a zero-length
/// segment never divides by zero and a zero rest length pins the point onto `anchor`.
pub(crate) fn place_at_distance(anchor: Vec3, toward: Vec3, length: f32, fallback: Vec3) -> Vec3 {
    anchor + direction_or(toward - anchor, fallback) * length
}

/// Reprojects `child` so the bone `joint -> child` stays within `limit_degrees` of `axis`.
///
/// `axis` is the incoming bone direction at `joint`. For narrow cones the child is moved
/// to `P + d * |o| * tan(limit)`, where `o` is the bone projected on the axis, `P` the
/// projected point and `d` the perpendicular direction toward the unconstrained child.
/// Cones of 90 degrees or more (and bones perpendicular to the axis) are built from
/// `cos/sin` directly since `tan` is unbounded there.
pub(crate) fn constrain_to_cone(joint: Vec3, axis: Vec3, child: Vec3, limit_degrees: f32) -> Vec3 {
    if limit_degrees >= 180.0 {
        return child;
    }
    let Some(axis) = axis.try_normalize() else {
        return child;
    };
    let bone = child - joint;
    let bone_length = bone.length();
    if bone_length <= EPSILON {
        return child;
    }

    let limit = limit_degrees.max(0.0).to_radians();
    if axis.angle_between(bone) <= limit {
        return child;
    }

    let projection = bone.project_onto_normalized(axis);
    let projection_length = projection.length();
    let perpendicular = (bone - projection)
        .try_normalize()
        .unwrap_or_else(|| axis.any_orthonormal_vector());

    if limit_degrees < 90.0 && projection_length > EPSILON {
        // Bones bent backwards are mirrored onto the forward cone.
        let center = joint + axis * projection_length;
        let radius = projection_length * limit.tan();
        return center + perpendicular * radius;
    }

    joint + (axis * limit.cos() + perpendicular * limit.sin()) * bone_length
}

/// Shortest rotation taking direction `from` onto direction `to`.
pub(crate) fn arc_rotation(from: Vec3, to: Vec3) -> Quat {
    match (from.try_normalize(), to.try_normalize()) {
        (Some(from), Some(to)) => Quat::from_rotation_arc(from, to),
        _ => Quat::IDENTITY,
    }
}

/// Bend angle in degrees between an incoming and an outgoing bone.
pub fn bend_angle_degrees(incoming: Vec3, outgoing: Vec3) -> f32 {
    if incoming.length() <= EPSILON || outgoing.length() <= EPSILON {
        return 0.0;
    }
    incoming.angle_between(outgoing).to_degrees()
}
