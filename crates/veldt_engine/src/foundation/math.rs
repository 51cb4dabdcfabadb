//! Math types and helpers for the renderer
//!
//! Thin aliases over `nalgebra` plus the few computations the standard
//! library and `nalgebra` do not provide directly.

pub use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Degrees to radians conversion factor
pub const DEG_TO_RAD: f32 = std::f32::consts::PI / 180.0;

/// Convert degrees to radians
pub fn deg_to_rad(degrees: f32) -> f32 {
    degrees * DEG_TO_RAD
}

/// Spherical interpolation between two directions.
///
/// Both inputs are normalized for the angle computation only; the returned
/// vector keeps the magnitude blend of the inputs.
pub fn slerp(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    let dot = a.normalize().dot(&b.normalize());
    let theta = dot.acos();

    (a * ((1.0 - t) * theta).sin() + b * (t * theta).sin()) / theta.sin()
}

/// Componentwise linear blend of two colours/directions
pub fn mix(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a + (b - a) * t
}

/// Hermite smoothstep, clamped to `[edge0, edge1]`
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Radius of the sphere outside which a point light's contribution
/// drops below 1/256 of its power.
///
/// Positive root of the quadratic attenuation model
/// `a*d^2 + b*d + c = 256 * power` with a = b = 0.01, c = 0.1.
pub fn compute_bounding_sphere_radius(light_power: f32) -> f32 {
    let (a, b, c) = (0.01_f32, 0.01_f32, 0.1_f32);
    let attenuation_coefficient = 256.0 * light_power;

    let discriminant = b * b - 4.0 * a * (c - attenuation_coefficient);
    -b + discriminant.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_slerp_endpoints() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);

        assert_relative_eq!(slerp(a, b, 0.0), a, epsilon = 1e-5);
        assert_relative_eq!(slerp(a, b, 1.0), b, epsilon = 1e-5);
    }

    #[test]
    fn test_slerp_midpoint_is_unit_for_unit_inputs() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 0.0, 1.0);

        let mid = slerp(a, b, 0.5);
        assert_relative_eq!(mid.magnitude(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_bounding_sphere_radius_monotonic_in_power() {
        let r1 = compute_bounding_sphere_radius(10.0);
        let r2 = compute_bounding_sphere_radius(50.0);
        let r3 = compute_bounding_sphere_radius(200.0);

        assert!(r1 > 0.0);
        assert!(r2 > r1);
        assert!(r3 > r2);
    }

    #[test]
    fn test_smoothstep_edges() {
        assert_relative_eq!(smoothstep(0.2, 0.8, 0.0), 0.0);
        assert_relative_eq!(smoothstep(0.2, 0.8, 1.0), 1.0);
        assert_relative_eq!(smoothstep(0.0, 1.0, 0.5), 0.5);
    }
}
