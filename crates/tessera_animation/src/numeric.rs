//! Tagged numeric values driven by numeric animation tracks.

use glam::{Vec2, Vec3, Vec4};
use tessera_core::{Result, TesseraError};

/// Kind tag of an [`AnyNumeric`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    Int,
    Real,
    Vector2,
    Vector3,
    Vector4,
}

impl NumericKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Real => "real",
            Self::Vector2 => "vector2",
            Self::Vector3 => "vector3",
            Self::Vector4 => "vector4",
        }
    }
}

/// A numeric value of one of the animatable kinds.
///
/// Colours are carried as `Vector4`. Arithmetic between two values is only
/// defined for matching kinds; mixing kinds is a [`TesseraError::NumericTypeMismatch`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnyNumeric {
    Int(i32),
    Real(f32),
    Vector2(Vec2),
    Vector3(Vec3),
    Vector4(Vec4),
}

impl Default for AnyNumeric {
    fn default() -> Self {
        Self::Real(0.0)
    }
}

impl AnyNumeric {
    #[must_use]
    pub fn kind(&self) -> NumericKind {
        match self {
            Self::Int(_) => NumericKind::Int,
            Self::Real(_) => NumericKind::Real,
            Self::Vector2(_) => NumericKind::Vector2,
            Self::Vector3(_) => NumericKind::Vector3,
            Self::Vector4(_) => NumericKind::Vector4,
        }
    }

    /// Additive identity of `kind`.
    #[must_use]
    pub fn zero_of(kind: NumericKind) -> Self {
        match kind {
            NumericKind::Int => Self::Int(0),
            NumericKind::Real => Self::Real(0.0),
            NumericKind::Vector2 => Self::Vector2(Vec2::ZERO),
            NumericKind::Vector3 => Self::Vector3(Vec3::ZERO),
            NumericKind::Vector4 => Self::Vector4(Vec4::ZERO),
        }
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self> {
        Ok(match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => Self::Int(a.wrapping_add(b)),
            (Self::Real(a), Self::Real(b)) => Self::Real(a + b),
            (Self::Vector2(a), Self::Vector2(b)) => Self::Vector2(a + b),
            (Self::Vector3(a), Self::Vector3(b)) => Self::Vector3(a + b),
            (Self::Vector4(a), Self::Vector4(b)) => Self::Vector4(a + b),
            (a, b) => return Err(mismatch(a.kind(), b.kind())),
        })
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self> {
        Ok(match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => Self::Int(a.wrapping_sub(b)),
            (Self::Real(a), Self::Real(b)) => Self::Real(a - b),
            (Self::Vector2(a), Self::Vector2(b)) => Self::Vector2(a - b),
            (Self::Vector3(a), Self::Vector3(b)) => Self::Vector3(a - b),
            (Self::Vector4(a), Self::Vector4(b)) => Self::Vector4(a - b),
            (a, b) => return Err(mismatch(a.kind(), b.kind())),
        })
    }

    /// Multiplies by a real factor. Integers truncate toward zero.
    #[must_use]
    pub fn scaled(self, factor: f32) -> Self {
        match self {
            Self::Int(v) => Self::Int((v as f32 * factor) as i32),
            Self::Real(v) => Self::Real(v * factor),
            Self::Vector2(v) => Self::Vector2(v * factor),
            Self::Vector3(v) => Self::Vector3(v * factor),
            Self::Vector4(v) => Self::Vector4(v * factor),
        }
    }

    /// `self + (other - self) * t`
    pub fn lerp(self, other: Self, t: f32) -> Result<Self> {
        self.checked_add(other.checked_sub(self)?.scaled(t))
    }

    #[must_use]
    pub fn as_real(&self) -> Option<f32> {
        match *self {
            Self::Real(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        match *self {
            Self::Int(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_vec3(&self) -> Option<Vec3> {
        match *self {
            Self::Vector3(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_vec4(&self) -> Option<Vec4> {
        match *self {
            Self::Vector4(v) => Some(v),
            _ => None,
        }
    }
}

/// Builds the mismatch error for `expected` vs `found`.
pub(crate) fn mismatch(expected: NumericKind, found: NumericKind) -> TesseraError {
    TesseraError::NumericTypeMismatch {
        expected: expected.name(),
        found: found.name(),
    }
}

impl From<f32> for AnyNumeric {
    fn from(v: f32) -> Self {
        Self::Real(v)
    }
}

impl From<i32> for AnyNumeric {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<Vec2> for AnyNumeric {
    fn from(v: Vec2) -> Self {
        Self::Vector2(v)
    }
}

impl From<Vec3> for AnyNumeric {
    fn from(v: Vec3) -> Self {
        Self::Vector3(v)
    }
}

impl From<Vec4> for AnyNumeric {
    fn from(v: Vec4) -> Self {
        Self::Vector4(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_real() {
        let v = AnyNumeric::Real(2.0).lerp(AnyNumeric::Real(4.0), 0.25).unwrap();
        assert_eq!(v, AnyNumeric::Real(2.5));
    }

    #[test]
    fn mixed_kinds_fail() {
        let err = AnyNumeric::Real(1.0)
            .checked_add(AnyNumeric::Vector3(Vec3::ONE))
            .unwrap_err();
        assert_eq!(
            err,
            TesseraError::NumericTypeMismatch {
                expected: "real",
                found: "vector3"
            }
        );
    }

    #[test]
    fn int_scaling_truncates() {
        assert_eq!(AnyNumeric::Int(5).scaled(0.5), AnyNumeric::Int(2));
    }
}
