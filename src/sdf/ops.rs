//! Boolean combinators over signed distance fields.
//!
//! These give a bound rather than an exact distance away from the surface,
//! which is all sign-based surface extraction needs.

use glam::Vec3;

use super::SignedDistance;

/// Points inside either field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Union<A, B>(pub A, pub B);

/// Points inside both fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection<A, B>(pub A, pub B);

/// Points inside the first field and outside the second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subtraction<A, B>(pub A, pub B);

impl<A: SignedDistance, B: SignedDistance> SignedDistance for Union<A, B> {
    fn distance(&self, point: Vec3) -> f32 {
        self.0.distance(point).min(self.1.distance(point))
    }
}

impl<A: SignedDistance, B: SignedDistance> SignedDistance
    for Intersection<A, B>
{
    fn distance(&self, point: Vec3) -> f32 {
        self.0.distance(point).max(self.1.distance(point))
    }
}

impl<A: SignedDistance, B: SignedDistance> SignedDistance
    for Subtraction<A, B>
{
    fn distance(&self, point: Vec3) -> f32 {
        self.0.distance(point).max(-self.1.distance(point))
    }
}
