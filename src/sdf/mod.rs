//! Signed distance fields evaluated on the host.
//!
//! [`SignedDistance`] is the capability the meshing and append code is
//! written against; the GPU counterpart is the `sdfgen::field` WGSL module.
//! Both sides must agree on sign for the same point, so implementations
//! are pure functions of the query point.

mod ops;
mod sphere;

use glam::Vec3;

pub use ops::{Intersection, Subtraction, Union};
pub use sphere::Sphere;

/// Gradients shorter than this fall back to +Y when normalized.
pub const DEGENERATE_GRADIENT: f32 = 1e-12;

/// A signed distance field: negative inside, positive outside, zero on the
/// surface.
pub trait SignedDistance {
    /// Signed distance from `point` to the surface.
    fn distance(&self, point: Vec3) -> f32;

    /// Central finite-difference gradient with half-width `step`.
    fn gradient(&self, point: Vec3, step: f32) -> Vec3 {
        let dx = Vec3::new(step, 0.0, 0.0);
        let dy = Vec3::new(0.0, step, 0.0);
        let dz = Vec3::new(0.0, 0.0, step);
        Vec3::new(
            self.distance(point + dx) - self.distance(point - dx),
            self.distance(point + dy) - self.distance(point - dy),
            self.distance(point + dz) - self.distance(point - dz),
        ) / (2.0 * step)
    }

    /// Unit surface normal estimated from [`SignedDistance::gradient`].
    ///
    /// Returns +Y where the gradient vanishes (e.g. a sphere's center).
    fn normal(&self, point: Vec3, step: f32) -> Vec3 {
        let g = self.gradient(point, step);
        let len = g.length();
        if len < DEGENERATE_GRADIENT {
            Vec3::Y
        } else {
            g / len
        }
    }
}

impl<T: SignedDistance + ?Sized> SignedDistance for &T {
    fn distance(&self, point: Vec3) -> f32 {
        (**self).distance(point)
    }
}

impl<T: SignedDistance + ?Sized> SignedDistance for Box<T> {
    fn distance(&self, point: Vec3) -> f32 {
        (**self).distance(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxed_and_borrowed_fields_agree() {
        let sphere = Sphere::new(Vec3::new(1.0, 2.0, 3.0), 1.5);
        let boxed: Box<dyn SignedDistance> = Box::new(sphere);
        let p = Vec3::new(0.3, -0.7, 2.0);
        assert_eq!(boxed.distance(p), sphere.distance(p));
        assert_eq!((&sphere).distance(p), sphere.distance(p));
    }

    #[test]
    fn finite_difference_normal_is_radial_for_sphere() {
        let sphere = Sphere::new(Vec3::ZERO, 2.0);
        let p = Vec3::new(1.0, 1.0, 1.0);
        let n = sphere.normal(p, 1e-3);
        assert!((n - p.normalize()).length() < 1e-3);
        assert!((n.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn normal_falls_back_at_degenerate_point() {
        let sphere = Sphere::new(Vec3::ZERO, 1.0);
        assert_eq!(sphere.normal(Vec3::ZERO, 1e-3), Vec3::Y);
    }
}
