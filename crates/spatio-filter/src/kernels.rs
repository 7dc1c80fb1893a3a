//! Ready-made kernel generators.

use crate::kernel::{Kernel1D, Kernel2D, SeparableKernel};
use spatio_grid::Matrix;

/// Create a normalized 1-D box (moving average) kernel.
///
/// # Arguments
///
/// * `kernel_size` - The number of taps.
pub fn box_kernel_1d(kernel_size: usize) -> Kernel1D<f32> {
    Kernel1D::centered(vec![1.0 / kernel_size as f32; kernel_size], 1.0)
}

/// Create a normalized 1-D gaussian kernel.
///
/// # Arguments
///
/// * `kernel_size` - The number of taps.
/// * `sigma` - The standard deviation of the gaussian.
pub fn gaussian_kernel_1d(kernel_size: usize, sigma: f32) -> Kernel1D<f32> {
    let mut taps = Vec::with_capacity(kernel_size);

    let mean = (kernel_size - 1) as f32 / 2.0;
    let sigma_sq = sigma * sigma;

    for i in 0..kernel_size {
        let x = i as f32 - mean;
        taps.push((-(x * x) / (2.0 * sigma_sq)).exp());
    }

    let sum = taps.iter().sum::<f32>();
    taps.iter_mut().for_each(|t| *t /= sum);

    Kernel1D::centered(taps, 1.0)
}

/// Create a separable 2-D gaussian kernel.
///
/// # Arguments
///
/// * `kernel_size` - The number of taps per axis (rows, cols).
/// * `sigma` - The standard deviation per axis.
pub fn gaussian_kernel_2d(kernel_size: (usize, usize), sigma: (f32, f32)) -> SeparableKernel<f32> {
    SeparableKernel::from_pair(
        gaussian_kernel_1d(kernel_size.1, sigma.1),
        gaussian_kernel_1d(kernel_size.0, sigma.0),
    )
}

/// Create the 1-D smoothing and difference factors of a sobel kernel.
///
/// # Panics
///
/// Only sizes 3 and 5 are provided.
pub fn sobel_kernels_1d(kernel_size: usize) -> (Kernel1D<f32>, Kernel1D<f32>) {
    let (smooth, diff) = match kernel_size {
        3 => (vec![1.0, 2.0, 1.0], vec![-1.0, 0.0, 1.0]),
        5 => (
            vec![1.0, 4.0, 6.0, 4.0, 1.0],
            vec![-1.0, -2.0, 0.0, 2.0, 1.0],
        ),
        _ => panic!("invalid kernel size for sobel kernel"),
    };
    (
        Kernel1D::centered(smooth, 1.0),
        Kernel1D::centered(diff, 1.0),
    )
}

/// Create the horizontal-derivative sobel operator as a separable kernel.
pub fn sobel_kernel_2d(kernel_size: usize) -> SeparableKernel<f32> {
    let (smooth, diff) = sobel_kernels_1d(kernel_size);
    SeparableKernel::from_pair(diff, smooth)
}

/// Create the 3x3 laplacian kernel.
pub fn laplacian_kernel_2d() -> Kernel2D<f32> {
    #[rustfmt::skip]
    let taps = vec![
        0.0,  1.0, 0.0,
        1.0, -4.0, 1.0,
        0.0,  1.0, 0.0,
    ];
    Kernel2D::centered(Matrix::new(3, 3, taps).expect("3x3 shape"), 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::KernelSymmetry;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_kernel_is_normalized_and_symmetric() {
        let k = box_kernel_1d(5);
        assert_relative_eq!(k.taps().iter().sum::<f32>(), 1.0, epsilon = 1e-6);
        assert_eq!(k.symmetry(), KernelSymmetry::Symmetric);
    }

    #[test]
    fn test_gaussian_kernel_1d() {
        let k = gaussian_kernel_1d(5, 0.5);
        assert_relative_eq!(k.taps().iter().sum::<f32>(), 1.0, epsilon = 1e-6);
        assert_eq!(k.symmetry(), KernelSymmetry::Symmetric);
        // peak at the center
        assert!(k.taps()[2] > k.taps()[1]);
        assert!(k.taps()[1] > k.taps()[0]);
    }

    #[test]
    fn test_sobel_difference_factor_is_antisymmetric() {
        let (smooth, diff) = sobel_kernels_1d(3);
        assert_eq!(smooth.symmetry(), KernelSymmetry::Symmetric);
        assert_eq!(diff.symmetry(), KernelSymmetry::Antisymmetric);
    }

    #[test]
    fn test_laplacian_sums_to_zero() {
        let k = laplacian_kernel_2d();
        let sum: f32 = k.data().as_slice().iter().sum();
        assert_relative_eq!(sum, 0.0, epsilon = 1e-6);
    }
}
