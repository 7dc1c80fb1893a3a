use num_traits::{Bounded, NumCast, One, Zero};
use std::ops::{Add, AddAssign, Div, Mul, Sub};

/// Trait for the element types the filtering engines operate on.
///
/// Besides the arithmetic bounds, a sample type declares the widened type
/// its products are accumulated in (so e.g. `u8` samples sum in `i32`
/// without overflow), whether it is a floating-point format, and its
/// suggested normalization constant used when kernels are rescaled between
/// fixed-point and floating-point representations.
pub trait Sample:
    Copy
    + Default
    + PartialOrd
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + AddAssign
    + Zero
    + One
    + Bounded
    + NumCast
{
    /// Widened type used to accumulate sums of products of samples.
    type Acc: Copy
        + Default
        + PartialOrd
        + Send
        + Sync
        + 'static
        + Add<Output = Self::Acc>
        + Sub<Output = Self::Acc>
        + Mul<Output = Self::Acc>
        + Div<Output = Self::Acc>
        + AddAssign
        + Zero
        + One
        + Bounded
        + NumCast;

    /// Whether this is a floating-point format.
    const IS_FLOAT: bool;

    /// Normalization constant suggested when converting a floating-point
    /// kernel into this sample type (e.g. 255 for `u8`).
    fn suggested_norm() -> Self;

    /// Widen a sample into the accumulation type.
    fn to_acc(self) -> Self::Acc;

    /// Narrow an accumulated value back into the sample range, saturating
    /// for fixed-point types.
    fn from_acc(acc: Self::Acc) -> Self;

    /// Round to the nearest representable integer value. Identity for
    /// fixed-point types.
    fn round(self) -> Self;

    /// Convert from `f64`, rounding and saturating for fixed-point types.
    fn from_f64(v: f64) -> Self;

    /// Convert into `f64`.
    fn to_f64(self) -> f64;
}

impl Sample for u8 {
    type Acc = i32;

    const IS_FLOAT: bool = false;

    fn suggested_norm() -> Self {
        255
    }

    fn to_acc(self) -> i32 {
        self as i32
    }

    fn from_acc(acc: i32) -> Self {
        acc.clamp(0, 255) as u8
    }

    fn round(self) -> Self {
        self
    }

    fn from_f64(v: f64) -> Self {
        v.round().clamp(0.0, 255.0) as u8
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Sample for i32 {
    type Acc = i64;

    const IS_FLOAT: bool = false;

    fn suggested_norm() -> Self {
        65536
    }

    fn to_acc(self) -> i64 {
        self as i64
    }

    fn from_acc(acc: i64) -> Self {
        acc.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    fn round(self) -> Self {
        self
    }

    fn from_f64(v: f64) -> Self {
        v.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Sample for f32 {
    type Acc = f32;

    const IS_FLOAT: bool = true;

    fn suggested_norm() -> Self {
        1.0
    }

    fn to_acc(self) -> f32 {
        self
    }

    fn from_acc(acc: f32) -> Self {
        acc
    }

    fn round(self) -> Self {
        f32::round(self)
    }

    fn from_f64(v: f64) -> Self {
        v as f32
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Sample for f64 {
    type Acc = f64;

    const IS_FLOAT: bool = true;

    fn suggested_norm() -> Self {
        1.0
    }

    fn to_acc(self) -> f64 {
        self
    }

    fn from_acc(acc: f64) -> Self {
        acc
    }

    fn round(self) -> Self {
        f64::round(self)
    }

    fn from_f64(v: f64) -> Self {
        v
    }

    fn to_f64(self) -> f64 {
        self
    }
}
