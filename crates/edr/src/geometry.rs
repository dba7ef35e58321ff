//! Ground-plane geometry for proximity checks and perception frames.
//!
//! Rotations are (roll, pitch, yaw) in degrees applied about x, y, z of a
//! right-handed frame (x forward, z up).

use contracts::{RotationData, Vector3};
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector2};

/// Separating-axis test for two convex polygons.
///
/// Vertices must be ordered around each polygon. Every edge normal of both
/// polygons is tried as a separating axis; the first axis on which the
/// projections do not overlap proves the polygons disjoint.
///
/// Degenerate input (repeated or collinear vertices) yields zero axes whose
/// projections always overlap. Callers filter such polygons first.
pub fn has_collided(poly1: &[Vector2<f64>], poly2: &[Vector2<f64>]) -> bool {
    edges(poly1)
        .chain(edges(poly2))
        .map(orthogonal)
        .all(|axis| overlap(project(poly1, &axis), project(poly2, &axis)))
}

fn edges(poly: &[Vector2<f64>]) -> impl Iterator<Item = Vector2<f64>> + '_ {
    let n = poly.len();
    (0..n).map(move |i| poly[(i + 1) % n] - poly[i])
}

fn orthogonal(v: Vector2<f64>) -> Vector2<f64> {
    Vector2::new(v.y, -v.x)
}

/// (min, max) of the polygon projected onto `axis`
fn project(poly: &[Vector2<f64>], axis: &Vector2<f64>) -> (f64, f64) {
    poly.iter()
        .map(|p| p.dot(axis))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), d| {
            (lo.min(d), hi.max(d))
        })
}

fn overlap(a: (f64, f64), b: (f64, f64)) -> bool {
    a.0 <= b.1 && b.0 <= a.1
}

/// Top-down silhouette of an oriented box, counter-clockwise.
///
/// Only yaw affects the footprint; pitch and roll are ignored.
pub fn footprint(location: Vector3, yaw_degrees: f64, extent: Vector3) -> [Vector2<f64>; 4] {
    let (sin, cos) = yaw_degrees.to_radians().sin_cos();
    let center = Vector2::new(location.x, location.y);
    [
        (extent.x, extent.y),
        (-extent.x, extent.y),
        (-extent.x, -extent.y),
        (extent.x, -extent.y),
    ]
    .map(|(x, y)| center + Vector2::new(x * cos - y * sin, x * sin + y * cos))
}

/// A box with no horizontal area cannot be tested
pub fn is_degenerate(extent: &Vector3) -> bool {
    !(extent.x > 0.0 && extent.y > 0.0)
}

fn orientation(rotation: &RotationData) -> UnitQuaternion<f64> {
    UnitQuaternion::from_euler_angles(
        rotation.roll.to_radians(),
        rotation.pitch.to_radians(),
        rotation.yaw.to_radians(),
    )
}

fn isometry(location: &Vector3, rotation: &RotationData) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::new(location.x, location.y, location.z),
        orientation(rotation),
    )
}

/// Pose of `target` expressed in the frame of `source`
pub fn relative_transform(
    source: (&Vector3, &RotationData),
    target: (&Vector3, &RotationData),
) -> (Vector3, RotationData) {
    let relative = isometry(source.0, source.1).inverse() * isometry(target.0, target.1);
    let t = relative.translation.vector;
    let (roll, pitch, yaw) = relative.rotation.euler_angles();
    (
        Vector3::new(t.x, t.y, t.z),
        RotationData {
            yaw: yaw.to_degrees(),
            pitch: pitch.to_degrees(),
            roll: roll.to_degrees(),
        },
    )
}

/// World-frame vector rotated into the local frame of `rotation`
pub fn local_vector(rotation: &RotationData, world: &Vector3) -> Vector3 {
    let v = orientation(rotation).inverse_transform_vector(&nalgebra::Vector3::new(
        world.x, world.y, world.z,
    ));
    Vector3::new(v.x, v.y, v.z)
}
