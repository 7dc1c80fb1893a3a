#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// accumulation strategies folded into the filter loops.
pub mod accumulator;

/// type negotiation between kernel and sample element types.
pub mod adapter;

/// boundary-extension rules.
pub mod border;

/// convolution operators.
pub mod convolution;

/// correlation and template-matching operators.
pub mod correlation;

/// error types for the filter module.
pub mod error;

/// 1-D filtering engine.
pub mod filter1d;

/// 2-D filtering engine.
pub mod filter2d;

/// kernel containers.
pub mod kernel;

/// ready-made kernel generators.
pub mod kernels;

/// morphological erosion and dilation.
pub mod morphology;

pub use crate::accumulator::{Accumulator, ClassicAccumulator};
pub use crate::adapter::{
    adapt_1d, adapt_2d, Adapted2D, AnyKernel1D, AnyKernel2D, KernelClass, KernelElement,
};
pub use crate::border::BorderType;
pub use crate::error::FilterError;
pub use crate::filter1d::FilterEngine1D;
pub use crate::filter2d::FilterEngine2D;
pub use crate::kernel::{Kernel1D, Kernel2D, KernelSymmetry, SeparableKernel};
