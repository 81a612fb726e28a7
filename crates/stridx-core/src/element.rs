//! Element types supported by the engine.
//!
//! Tensors hold one of two numeric element types, `f32` or `f64`. The set is
//! closed: [`Element`] is sealed, and each implementation carries the [`DType`]
//! tag used by the persisted container format.

use scirs2_core::numeric::{Float, NumAssign, NumCast};
use std::fmt;

/// Runtime tag for an element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit IEEE float
    F32,
    /// 64-bit IEEE float
    F64,
}

impl DType {
    /// Size of one element in bytes.
    pub fn size_of(self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F64 => 8,
        }
    }

    /// Short lowercase name, as printed in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            DType::F32 => "f32",
            DType::F64 => "f64",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

mod private {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// A numeric element that can live in a [`Storage`](crate::storage::Storage).
pub trait Element:
    Float + NumAssign + bytemuck::Pod + Default + fmt::Debug + fmt::Display + private::Sealed + 'static
{
    /// Tag identifying this type in persisted containers.
    const DTYPE: DType;

    /// Convert to another element type, saturating to infinity when the value
    /// is out of the target's finite range.
    fn cast<U: Element>(self) -> U {
        <U as NumCast>::from(self).unwrap_or_else(|| {
            if self.is_sign_negative() {
                U::neg_infinity()
            } else {
                U::infinity()
            }
        })
    }

    /// Convert an element count to this type (used for means).
    fn from_usize(n: usize) -> Self {
        <Self as NumCast>::from(n).unwrap_or_else(Self::infinity)
    }

    /// Convert an `f64` constant to this type.
    fn from_f64(v: f64) -> Self {
        v.cast()
    }
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;
}
