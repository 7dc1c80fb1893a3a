//! Type negotiation between kernel and sample element types.
//!
//! Kernels reach the engines type-erased, as [`AnyKernel1D`] /
//! [`AnyKernel2D`] values carrying an explicit element-type tag. Adaptation
//! borrows the kernel when its element type already matches the engine's
//! sample type, and otherwise produces an owned converted copy:
//!
//! - floating point -> fixed point: taps are scaled by the sample type's
//!   suggested norm before rounding (the norm scales along);
//! - fixed point -> floating point: taps are cast and then denormalized
//!   (divided by the norm);
//! - same category: taps are cast directly.

use std::borrow::Cow;

use crate::error::FilterError;
use crate::kernel::{Kernel1D, Kernel2D, KernelPair, SeparableKernel};
use spatio_grid::{Matrix, Sample};

/// A type-erased 1-D kernel.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyKernel1D {
    /// Byte kernel.
    U8(Kernel1D<u8>),
    /// Integer kernel.
    I32(Kernel1D<i32>),
    /// Single-precision kernel.
    F32(Kernel1D<f32>),
    /// Double-precision kernel.
    F64(Kernel1D<f64>),
}

/// A type-erased dense 2-D kernel.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyDense2D {
    /// Byte kernel.
    U8(Kernel2D<u8>),
    /// Integer kernel.
    I32(Kernel2D<i32>),
    /// Single-precision kernel.
    F32(Kernel2D<f32>),
    /// Double-precision kernel.
    F64(Kernel2D<f64>),
}

/// A type-erased separable 2-D kernel.
#[derive(Debug, Clone, PartialEq)]
pub enum AnySeparable2D {
    /// Byte kernel.
    U8(SeparableKernel<u8>),
    /// Integer kernel.
    I32(SeparableKernel<i32>),
    /// Single-precision kernel.
    F32(SeparableKernel<f32>),
    /// Double-precision kernel.
    F64(SeparableKernel<f64>),
}

/// A type-erased 2-D kernel, dense or separable.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyKernel2D {
    /// Full tap matrix.
    Dense(AnyDense2D),
    /// Sum of row/column outer products.
    Separable(AnySeparable2D),
}

/// Structural classification of a 2-D kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelClass {
    /// Full tap matrix; filtered with the 2-D sliding window.
    Dense,
    /// Separable terms; filtered with two 1-D passes per term.
    Separable,
}

impl AnyKernel2D {
    /// Classify the kernel for algorithm selection.
    pub fn classify(&self) -> KernelClass {
        match self {
            AnyKernel2D::Dense(_) => KernelClass::Dense,
            AnyKernel2D::Separable(_) => KernelClass::Separable,
        }
    }
}

/// Sample types the type-erased kernels can natively hold.
pub trait KernelElement: Sample {
    /// Borrow a 1-D kernel whose element type matches `Self`.
    fn as_native_1d(kernel: &AnyKernel1D) -> Option<&Kernel1D<Self>>;

    /// Borrow a dense 2-D kernel whose element type matches `Self`.
    fn as_native_dense(kernel: &AnyDense2D) -> Option<&Kernel2D<Self>>;

    /// Borrow a separable kernel whose element type matches `Self`.
    fn as_native_separable(kernel: &AnySeparable2D) -> Option<&SeparableKernel<Self>>;
}

macro_rules! impl_kernel_element {
    ($t:ty, $variant:ident) => {
        impl KernelElement for $t {
            fn as_native_1d(kernel: &AnyKernel1D) -> Option<&Kernel1D<Self>> {
                match kernel {
                    AnyKernel1D::$variant(k) => Some(k),
                    _ => None,
                }
            }

            fn as_native_dense(kernel: &AnyDense2D) -> Option<&Kernel2D<Self>> {
                match kernel {
                    AnyDense2D::$variant(k) => Some(k),
                    _ => None,
                }
            }

            fn as_native_separable(kernel: &AnySeparable2D) -> Option<&SeparableKernel<Self>> {
                match kernel {
                    AnySeparable2D::$variant(k) => Some(k),
                    _ => None,
                }
            }
        }

        impl From<Kernel1D<$t>> for AnyKernel1D {
            fn from(kernel: Kernel1D<$t>) -> Self {
                AnyKernel1D::$variant(kernel)
            }
        }

        impl From<Kernel2D<$t>> for AnyKernel2D {
            fn from(kernel: Kernel2D<$t>) -> Self {
                AnyKernel2D::Dense(AnyDense2D::$variant(kernel))
            }
        }

        impl From<SeparableKernel<$t>> for AnyKernel2D {
            fn from(kernel: SeparableKernel<$t>) -> Self {
                AnyKernel2D::Separable(AnySeparable2D::$variant(kernel))
            }
        }
    };
}

impl_kernel_element!(u8, U8);
impl_kernel_element!(i32, I32);
impl_kernel_element!(f32, F32);
impl_kernel_element!(f64, F64);

fn convert_values<U: Sample, T: Sample>(values: &[U]) -> Result<Vec<T>, FilterError> {
    if U::IS_FLOAT && !T::IS_FLOAT {
        // scale into the fixed-point range before rounding
        let scale: U = num_traits::cast(T::suggested_norm()).ok_or(FilterError::UnsupportedKernel)?;
        values
            .iter()
            .map(|&v| num_traits::cast::<U, T>((v * scale).round()))
            .collect::<Option<Vec<T>>>()
            .ok_or(FilterError::UnsupportedKernel)
    } else {
        values
            .iter()
            .map(|&v| num_traits::cast::<U, T>(v))
            .collect::<Option<Vec<T>>>()
            .ok_or(FilterError::UnsupportedKernel)
    }
}

fn convert_norm<U: Sample, T: Sample>(norm: U) -> Result<T, FilterError> {
    convert_values::<U, T>(&[norm]).map(|v| v[0])
}

fn convert_1d<U: Sample, T: Sample>(kernel: &Kernel1D<U>) -> Result<Kernel1D<T>, FilterError> {
    let taps = convert_values::<U, T>(kernel.taps())?;
    let norm = convert_norm::<U, T>(kernel.norm())?;
    let mut converted = Kernel1D::new(taps, kernel.offset(), norm);
    if !U::IS_FLOAT && T::IS_FLOAT {
        converted.denormalize();
    }
    Ok(converted)
}

fn convert_2d<U: Sample, T: Sample>(kernel: &Kernel2D<U>) -> Result<Kernel2D<T>, FilterError> {
    let taps = convert_values::<U, T>(kernel.data().as_slice())?;
    let norm = convert_norm::<U, T>(kernel.norm())?;
    let data = Matrix::new(kernel.rows(), kernel.cols(), taps)?;
    let mut converted = Kernel2D::new(data, kernel.row_offset(), kernel.col_offset(), norm);
    if !U::IS_FLOAT && T::IS_FLOAT {
        converted.denormalize();
    }
    Ok(converted)
}

fn convert_separable<U: Sample, T: Sample>(
    kernel: &SeparableKernel<U>,
) -> Result<SeparableKernel<T>, FilterError> {
    let pairs = kernel
        .pairs()
        .iter()
        .map(|pair| {
            Ok(KernelPair {
                row: convert_1d::<U, T>(&pair.row)?,
                col: convert_1d::<U, T>(&pair.col)?,
            })
        })
        .collect::<Result<Vec<_>, FilterError>>()?;
    Ok(SeparableKernel::new(pairs))
}

/// The result of adapting a type-erased 2-D kernel: engine-native taps,
/// borrowed when the element type matched, owned otherwise.
#[derive(Debug, Clone)]
pub enum Adapted2D<'a, T: Sample> {
    /// Dense kernel for the sliding-window loop.
    Dense(Cow<'a, Kernel2D<T>>),
    /// Separable kernel for the twin 1-D passes.
    Separable(Cow<'a, SeparableKernel<T>>),
}

/// Adapt a type-erased 1-D kernel to the engine sample type.
///
/// Matching element types are borrowed (cloned once when `mirrored`); other
/// types are converted per the module rules. `mirrored` reverses the taps
/// about the origin, turning a correlation kernel into its convolution
/// equivalent.
///
/// # Errors
///
/// [`FilterError::UnsupportedKernel`] when a tap or the norm is not
/// representable in the target type.
pub fn adapt_1d<T: KernelElement>(
    kernel: &AnyKernel1D,
    mirrored: bool,
) -> Result<Cow<'_, Kernel1D<T>>, FilterError> {
    if let Some(native) = T::as_native_1d(kernel) {
        if !mirrored {
            return Ok(Cow::Borrowed(native));
        }
        let mut owned = native.clone();
        owned.mirror();
        return Ok(Cow::Owned(owned));
    }

    log::debug!(
        "converting 1-D kernel taps to {}",
        std::any::type_name::<T>()
    );
    let mut owned = match kernel {
        AnyKernel1D::U8(k) => convert_1d::<u8, T>(k),
        AnyKernel1D::I32(k) => convert_1d::<i32, T>(k),
        AnyKernel1D::F32(k) => convert_1d::<f32, T>(k),
        AnyKernel1D::F64(k) => convert_1d::<f64, T>(k),
    }?;
    if mirrored {
        owned.mirror();
    }
    Ok(Cow::Owned(owned))
}

/// Adapt a type-erased 2-D kernel (dense or separable) to the engine
/// sample type. See [`adapt_1d`] for the conversion rules.
pub fn adapt_2d<T: KernelElement>(
    kernel: &AnyKernel2D,
    mirrored: bool,
) -> Result<Adapted2D<'_, T>, FilterError> {
    match kernel {
        AnyKernel2D::Dense(dense) => {
            if let Some(native) = T::as_native_dense(dense) {
                if !mirrored {
                    return Ok(Adapted2D::Dense(Cow::Borrowed(native)));
                }
                let mut owned = native.clone();
                owned.mirror();
                return Ok(Adapted2D::Dense(Cow::Owned(owned)));
            }
            log::debug!(
                "converting dense kernel taps to {}",
                std::any::type_name::<T>()
            );
            let mut owned = match dense {
                AnyDense2D::U8(k) => convert_2d::<u8, T>(k),
                AnyDense2D::I32(k) => convert_2d::<i32, T>(k),
                AnyDense2D::F32(k) => convert_2d::<f32, T>(k),
                AnyDense2D::F64(k) => convert_2d::<f64, T>(k),
            }?;
            if mirrored {
                owned.mirror();
            }
            Ok(Adapted2D::Dense(Cow::Owned(owned)))
        }
        AnyKernel2D::Separable(sep) => {
            if let Some(native) = T::as_native_separable(sep) {
                if !mirrored {
                    return Ok(Adapted2D::Separable(Cow::Borrowed(native)));
                }
                let mut owned = native.clone();
                owned.mirror();
                return Ok(Adapted2D::Separable(Cow::Owned(owned)));
            }
            log::debug!(
                "converting separable kernel taps to {}",
                std::any::type_name::<T>()
            );
            let mut owned = match sep {
                AnySeparable2D::U8(k) => convert_separable::<u8, T>(k),
                AnySeparable2D::I32(k) => convert_separable::<i32, T>(k),
                AnySeparable2D::F32(k) => convert_separable::<f32, T>(k),
                AnySeparable2D::F64(k) => convert_separable::<f64, T>(k),
            }?;
            if mirrored {
                owned.mirror();
            }
            Ok(Adapted2D::Separable(Cow::Owned(owned)))
        }
    }
}
