//! Convolution operators.
//!
//! Thin user-facing layer over the engines: picks the classic accumulator
//! and uses the kernel as stored (the engine loops already implement true
//! convolution; see [`crate::correlation`] for the mirrored variant).

use crate::accumulator::ClassicAccumulator;
use crate::adapter::{AnyKernel1D, AnyKernel2D, KernelElement};
use crate::border::BorderType;
use crate::error::FilterError;
use crate::filter1d::FilterEngine1D;
use crate::filter2d::FilterEngine2D;
use spatio_grid::{Matrix, Vector};

/// Convolution operator.
///
/// Holds the user-facing parameters; each apply call builds a fresh engine
/// around the supplied kernel.
#[derive(Debug, Clone, Copy)]
pub struct Convolution {
    /// Boundary-extension rule applied at the data edges.
    pub boundary: BorderType,
}

impl Default for Convolution {
    fn default() -> Self {
        Self {
            boundary: BorderType::Zero,
        }
    }
}

impl Convolution {
    /// Create a convolution operator with the given boundary rule.
    pub fn new(boundary: BorderType) -> Self {
        Self { boundary }
    }

    /// Convolve a vector with a 1-D kernel.
    ///
    /// # Errors
    ///
    /// [`FilterError::UnsupportedKernel`] when the kernel cannot be
    /// adapted to the sample type.
    pub fn apply_1d<T: KernelElement>(
        &self,
        kernel: &AnyKernel1D,
        src: &Vector<T>,
        dst: &mut Vector<T>,
    ) -> Result<(), FilterError> {
        let engine = FilterEngine1D::from_any(kernel, false, ClassicAccumulator::<T>::default())?;
        engine.apply(src, dst, self.boundary);
        Ok(())
    }

    /// Convolve a matrix with a dense or separable 2-D kernel.
    ///
    /// # Errors
    ///
    /// [`FilterError::UnsupportedKernel`] when the kernel cannot be
    /// adapted to the sample type.
    pub fn apply_2d<T: KernelElement>(
        &self,
        kernel: &AnyKernel2D,
        src: &Matrix<T>,
        dst: &mut Matrix<T>,
    ) -> Result<(), FilterError> {
        let engine = FilterEngine2D::from_any(kernel, false, ClassicAccumulator::<T>::default())?;
        engine.apply(src, dst, self.boundary);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{Kernel1D, Kernel2D};
    use approx::assert_relative_eq;
    use spatio_grid::Matrix;

    #[test]
    fn test_convolve_1d_with_foreign_kernel_type() -> Result<(), FilterError> {
        // u8 data, u8 kernel: straight engine-native path
        let kernel: AnyKernel1D = Kernel1D::centered(vec![1u8, 1, 1], 3).into();
        let conv = Convolution::new(BorderType::Zero);

        let src = Vector::new(vec![10u8, 20, 30, 40, 50]);
        let mut dst = Vector::default();
        conv.apply_1d(&kernel, &src, &mut dst)?;
        assert_eq!(dst.as_slice(), &[10, 20, 30, 40, 30]);

        // the same kernel against f32 data goes through adaptation
        let src = Vector::new(vec![10.0f32, 20.0, 30.0, 40.0, 50.0]);
        let mut dst = Vector::default();
        conv.apply_1d(&kernel, &src, &mut dst)?;
        let expected = [10.0, 20.0, 30.0, 40.0, 30.0];
        for (o, e) in dst.as_slice().iter().zip(expected.iter()) {
            assert_relative_eq!(o, e, epsilon = 1e-5);
        }
        Ok(())
    }

    #[test]
    fn test_convolve_2d_all_ones() -> Result<(), FilterError> {
        let kernel: AnyKernel2D =
            Kernel2D::centered(Matrix::from_size_val(3, 3, 1u8), 9).into();
        let conv = Convolution::new(BorderType::Constant);

        let src = Matrix::from_size_val(3, 3, 9u8);
        let mut dst = Matrix::default();
        conv.apply_2d(&kernel, &src, &mut dst)?;
        assert_eq!(dst.as_slice(), &[9u8; 9]);
        Ok(())
    }
}
