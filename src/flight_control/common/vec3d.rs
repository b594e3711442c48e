use num::traits::Float;
use std::fmt::{Display, Formatter};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// A frame-relative 3D vector generic over any floating point type.
///
/// Components follow the collaborator's frame conventions: in a body's
/// non-rotating frame the orbital plane is spanned by `x` and `z`, in a
/// maneuver node's frame `y` is the burn axis.
///
/// # Type Parameters
/// * `T` - The floating point scalar type.
#[derive(Debug, PartialEq, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct Vec3D<T> {
    /// The x-component of the vector.
    x: T,
    /// The y-component of the vector.
    y: T,
    /// The z-component of the vector.
    z: T,
}

impl<T: Copy> Vec3D<T> {
    /// Creates a new vector with the given components.
    pub const fn new(x: T, y: T, z: T) -> Self { Self { x, y, z } }

    /// Returns the x-component of the vector.
    pub const fn x(&self) -> T { self.x }

    /// Returns the y-component of the vector.
    pub const fn y(&self) -> T { self.y }

    /// Returns the z-component of the vector.
    pub const fn z(&self) -> T { self.z }
}

impl<T: Float> Vec3D<T> {
    /// Creates a zero vector.
    pub fn zero() -> Self { Self::new(T::zero(), T::zero(), T::zero()) }

    /// Computes the magnitude (absolute value) of the vector.
    pub fn abs(&self) -> T { self.dot(*self).sqrt() }

    /// Computes the dot product with another vector.
    ///
    /// ```text
    /// dot_product = (x1 * x2) + (y1 * y2) + (z1 * z2)
    /// ```
    pub fn dot(self, other: Self) -> T { self.x * other.x + self.y * other.y + self.z * other.z }

    /// Computes the right-handed cross product `self × other`.
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Normalizes the vector to have a magnitude of 1.
    /// If the magnitude is zero, the original vector is returned unmodified.
    pub fn normalize(self) -> Self {
        let magnitude = self.abs();
        if magnitude.is_zero() { self } else { self / magnitude }
    }

    /// Creates a vector pointing from `self` to `other`.
    pub fn to(&self, other: &Self) -> Self { *other - *self }

    /// Computes the Euclidean distance between `self` and `other`.
    pub fn euclid_distance(&self, other: &Self) -> T { self.to(other).abs() }

    /// Angle of the vector within the `x`/`z` plane, measured from the `x` axis.
    ///
    /// This is the angular position used for phase-angle targeting in a body's
    /// non-rotating reference frame.
    pub fn planar_angle(&self) -> T { self.z.atan2(self.x) }

    /// Checks that every component is a finite number.
    pub fn is_finite(&self) -> bool { self.x.is_finite() && self.y.is_finite() && self.z.is_finite() }
}

impl<T: Float> Add for Vec3D<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output { Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z) }
}

impl<T: Float> AddAssign for Vec3D<T> {
    fn add_assign(&mut self, rhs: Self) { *self = *self + rhs; }
}

impl<T: Float> Sub for Vec3D<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output { Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z) }
}

impl<T: Float> SubAssign for Vec3D<T> {
    fn sub_assign(&mut self, rhs: Self) { *self = *self - rhs; }
}

impl<T: Float> Mul<T> for Vec3D<T> {
    type Output = Self;

    /// Implements the `*` operator for a `Vec3D` and a scalar.
    fn mul(self, rhs: T) -> Self::Output { Self::new(self.x * rhs, self.y * rhs, self.z * rhs) }
}

impl<T: Float> Div<T> for Vec3D<T> {
    type Output = Self;

    /// Implements the `/` operator for a `Vec3D` and a scalar.
    fn div(self, rhs: T) -> Self::Output { Self::new(self.x / rhs, self.y / rhs, self.z / rhs) }
}

impl<T: Float> Neg for Vec3D<T> {
    type Output = Self;

    fn neg(self) -> Self::Output { Self::new(-self.x, -self.y, -self.z) }
}

impl<T> From<(T, T, T)> for Vec3D<T> {
    /// Creates a `Vec3D` from a tuple of (x, y, z) values.
    fn from(tuple: (T, T, T)) -> Self { Vec3D { x: tuple.0, y: tuple.1, z: tuple.2 } }
}

impl<T: Display> Display for Vec3D<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
    }
}
