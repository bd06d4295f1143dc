use crate::core::types::{Number, Point3, Vector3};

/// A ray, starting at [Ray::pos] and travelling along [Ray::dir]
///
/// Rays given to a scene root are expected to have a normalised direction, so that depths are world-space
/// distances. Rays that have been mapped into an object's local space keep the (possibly scaled) direction,
/// so that the depth `t` of a point is identical in both spaces.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Ray {
    pos: Point3,
    dir: Vector3,
    inv_dir: Vector3,
}

impl Ray {
    /// Creates a new ray, normalising the direction
    pub fn new(pos: impl Into<Point3>, dir: impl Into<Vector3>) -> Self {
        let dir = dir.into();
        Self::new_unnormalised(pos, dir.try_normalize().unwrap_or(dir))
    }

    /// Creates a new ray, without normalising the direction vector
    ///
    /// Used when mapping a ray into another space, where scaling the direction must not change the depths
    pub fn new_unnormalised(pos: impl Into<Point3>, dir: impl Into<Vector3>) -> Self {
        let (pos, dir) = (pos.into(), dir.into());
        Self {
            pos,
            dir,
            inv_dir: dir.recip(),
        }
    }

    /// World-space coordinate of the ray
    #[inline(always)]
    pub fn pos(&self) -> Point3 { self.pos }

    /// Direction vector of the ray
    #[inline(always)]
    pub fn dir(&self) -> Vector3 { self.dir }

    /// Component-wise reciprocal of [Self::dir], used for slab tests
    #[inline(always)]
    pub fn inv_dir(&self) -> Vector3 { self.inv_dir }

    /// Gets the position at a given distance along the ray
    ///
    /// `pos + (t * dir)`
    #[inline(always)]
    pub fn at(&self, t: Number) -> Point3 { self.pos + (self.dir * t) }
}
