pub(crate) mod math;
pub(crate) mod vec3d;

pub use math::{advance_past, interpolate, normalize_angle};
pub use vec3d::Vec3D;
