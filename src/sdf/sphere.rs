use glam::Vec3;

use super::SignedDistance;

/// Sphere at an arbitrary center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// World-space center.
    pub center: Vec3,
    /// Radius; the surface is where `distance == 0`.
    pub radius: f32,
}

impl Sphere {
    /// Sphere with the given center and radius.
    #[must_use]
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

impl SignedDistance for Sphere {
    #[inline]
    fn distance(&self, point: Vec3) -> f32 {
        (point - self.center).length() - self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_inside_outside_surface() {
        let s = Sphere::new(Vec3::new(1.0, 2.0, 3.0), 1.0);
        assert!((s.distance(s.center) + 1.0).abs() < 1e-6);
        assert!((s.distance(Vec3::new(3.0, 2.0, 3.0)) - 1.0).abs() < 1e-6);
        assert!(s.distance(Vec3::new(2.0, 2.0, 3.0)).abs() < 1e-6);
        assert!(s.distance(Vec3::new(1.0, 2.0, 2.0)).abs() < 1e-6);
    }

    #[test]
    fn test_opposite_sides_have_opposite_signs() {
        let s = Sphere::new(Vec3::new(-0.5, 0.25, 4.0), 2.5);
        for dir in [Vec3::X, Vec3::NEG_Y, Vec3::new(1.0, 1.0, -1.0).normalize()]
        {
            let inner = s.distance(s.center + dir * (s.radius * 0.9));
            let outer = s.distance(s.center + dir * (s.radius * 1.1));
            assert!(inner < 0.0);
            assert!(outer > 0.0);
            let on = s.distance(s.center + dir * s.radius);
            assert!(on.abs() < 1e-5, "surface point off by {on}");
        }
    }

    #[test]
    fn test_sphere_is_deterministic() {
        let s = Sphere::new(Vec3::new(0.1, 0.2, 0.3), 0.7);
        let p = Vec3::new(0.45, -0.3, 0.9);
        assert_eq!(s.distance(p).to_bits(), s.distance(p).to_bits());
    }
}
