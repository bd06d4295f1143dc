/// Numeric type used for most calculations in the engine
pub type Number = f64;
pub type Vector2 = glam::DVec2;
pub type Vector3 = glam::DVec3;
pub type Point2 = glam::DVec2;
pub type Point3 = glam::DVec3;
pub type Matrix3 = glam::DMat3;
/// An affine transform from one space to another (see [crate::object::transform])
pub type Transform3 = glam::DAffine3;
/// Numeric identifier used to uniquely mark entities, used in object/surface tokens
pub type IdToken = u64;
