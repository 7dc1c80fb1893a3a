//! 2-D filtering engine.
//!
//! Filters a matrix with a dense or separable 2-D kernel. Dense kernels
//! run a sliding-window loop over the interior rectangle where the whole
//! footprint fits, with edge and corner cells resolving the row and column
//! index independently through the boundary rule. Separable kernels run a
//! row pass and a column pass through the 1-D engine per term, summing the
//! partial results. A masked variant restricts the taps to an arbitrary
//! point set over the kernel rectangle.

use std::borrow::Cow;

use num_traits::Zero;

use crate::accumulator::Accumulator;
use crate::adapter::{adapt_2d, Adapted2D, AnyKernel2D, KernelElement};
use crate::border::{resolve, BorderType, Resolved};
use crate::error::FilterError;
use crate::filter1d::FilterEngine1D;
use crate::kernel::{Kernel2D, SeparableKernel};
use spatio_grid::{Matrix, Sample};

/// Monomorphized 2-D filtering engine over a sample type and an
/// accumulation strategy.
pub struct FilterEngine2D<'k, T: Sample, A: Accumulator<T>> {
    kernel: Adapted2D<'k, T>,
    mask: Option<Matrix<u8>>,
    acc: A,
}

impl<T: Sample, A: Accumulator<T>> FilterEngine2D<'_, T, A> {
    /// Create an engine from an already-native dense kernel.
    pub fn new_dense(kernel: Kernel2D<T>, acc: A) -> Self {
        Self {
            kernel: Adapted2D::Dense(Cow::Owned(kernel)),
            mask: None,
            acc,
        }
    }

    /// Create an engine from an already-native separable kernel.
    pub fn new_separable(kernel: SeparableKernel<T>, acc: A) -> Self {
        Self {
            kernel: Adapted2D::Separable(Cow::Owned(kernel)),
            mask: None,
            acc,
        }
    }

    /// Whether the engine filters with a separable kernel.
    pub fn is_separable(&self) -> bool {
        matches!(self.kernel, Adapted2D::Separable(_))
    }

    /// Set the structuring mask consumed by [`FilterEngine2D::apply_mask`].
    pub fn set_mask(&mut self, mask: Matrix<u8>) {
        self.mask = Some(mask);
    }

    /// The current structuring mask, if any.
    pub fn mask(&self) -> Option<&Matrix<u8>> {
        self.mask.as_ref()
    }

    /// Filter `src` into `dst`, which is reallocated to the source shape
    /// when it differs. Dispatches on the kernel classification.
    pub fn apply(&self, src: &Matrix<T>, dst: &mut Matrix<T>, border: BorderType) {
        match &self.kernel {
            Adapted2D::Dense(kernel) => self.apply_dense(kernel, src, dst, border),
            Adapted2D::Separable(kernel) => self.apply_separable(kernel, src, dst, border),
        }
    }

    fn apply_dense(
        &self,
        kernel: &Kernel2D<T>,
        src: &Matrix<T>,
        dst: &mut Matrix<T>,
        border: BorderType,
    ) {
        if dst.rows() != src.rows() || dst.cols() != src.cols() {
            *dst = Matrix::from_size_val(src.rows(), src.cols(), T::default());
        }

        let mut acc = self.acc.clone();
        acc.set_norm(kernel.norm());

        if kernel.rows() > src.rows() || kernel.cols() > src.cols() {
            self.apply_dense_huge(&mut acc, kernel, src, dst, border);
            return;
        }

        let (rows, cols) = (src.rows(), src.cols());
        let (rni, cni) = (rows as isize, cols as isize);
        let (krows, kcols) = (kernel.rows(), kernel.cols());
        let (last_row, first_row) = (kernel.last_row(), kernel.first_row());
        let (last_col, first_col) = (kernel.last_col(), kernel.first_col());

        let r_begin = last_row.clamp(0, rni);
        let r_end = (rni + first_row.min(0)).max(r_begin);
        let c_begin = last_col.clamp(0, cni);
        let c_end = (cni + first_col.min(0)).max(c_begin);

        // interior rectangle: the whole footprint fits
        for j in r_begin..r_end {
            let y = (j - last_row) as usize;
            for i in c_begin..c_end {
                let x = (i - last_col) as usize;
                acc.reset();
                for g in (0..krows).rev() {
                    let sy = y + (krows - 1 - g);
                    for f in (0..kcols).rev() {
                        acc.accumulate(kernel.raw(g, f), src[(sy, x + (kcols - 1 - f))]);
                    }
                }
                dst[(j as usize, i as usize)] = acc.result();
            }
        }

        if border == BorderType::NoBoundary {
            return;
        }

        // edge strips above and below the interior, full width
        for j in (0..r_begin).chain(r_end..rni) {
            for i in 0..cni {
                dst[(j as usize, i as usize)] =
                    self.dense_cell_resolved(&mut acc, kernel, src, j, i, border);
            }
        }
        // left and right strips beside the interior
        for j in r_begin..r_end {
            for i in (0..c_begin).chain(c_end..cni) {
                dst[(j as usize, i as usize)] =
                    self.dense_cell_resolved(&mut acc, kernel, src, j, i, border);
            }
        }
    }

    fn apply_dense_huge(
        &self,
        acc: &mut A,
        kernel: &Kernel2D<T>,
        src: &Matrix<T>,
        dst: &mut Matrix<T>,
        border: BorderType,
    ) {
        if border == BorderType::NoBoundary {
            return;
        }
        for j in 0..src.rows() as isize {
            for i in 0..src.cols() as isize {
                dst[(j as usize, i as usize)] =
                    self.dense_cell_resolved(acc, kernel, src, j, i, border);
            }
        }
    }

    /// One output cell with the row and column of every tap resolved
    /// independently; corners compose both axes.
    fn dense_cell_resolved(
        &self,
        acc: &mut A,
        kernel: &Kernel2D<T>,
        src: &Matrix<T>,
        j: isize,
        i: isize,
        border: BorderType,
    ) -> T {
        let (krows, kcols) = (kernel.rows(), kernel.cols());
        let (last_row, last_col) = (kernel.last_row(), kernel.last_col());
        acc.reset();
        for g in (0..krows).rev() {
            let py = j - last_row + (krows - 1 - g) as isize;
            let sy = match resolve(py, src.rows(), border) {
                Resolved::Inside(sy) => sy,
                Resolved::Skip => continue,
            };
            for f in (0..kcols).rev() {
                let px = i - last_col + (kcols - 1 - f) as isize;
                if let Resolved::Inside(sx) = resolve(px, src.cols(), border) {
                    acc.accumulate(kernel.raw(g, f), src[(sy, sx)]);
                }
            }
        }
        acc.result()
    }

    fn apply_separable(
        &self,
        kernel: &SeparableKernel<T>,
        src: &Matrix<T>,
        dst: &mut Matrix<T>,
        border: BorderType,
    ) {
        if dst.rows() != src.rows() || dst.cols() != src.cols() {
            *dst = Matrix::from_size_val(src.rows(), src.cols(), T::default());
        }

        let mut buffer = Matrix::default();
        let mut partial = Matrix::default();
        let mut first = true;

        for pair in kernel.pairs() {
            // horizontal pass; a 1-tap kernel anchored at its origin is a
            // plain scale factor
            if pair.row.len() == 1 && pair.row.offset() == 0 {
                scale_into(&mut buffer, src, pair.row.taps()[0]);
            } else {
                let engine = FilterEngine1D::new(pair.row.clone(), self.acc.clone());
                engine.apply_row(src, &mut buffer, border);
            }

            // vertical pass
            if pair.col.len() == 1 && pair.col.offset() == 0 {
                scale_into(&mut partial, &buffer, pair.col.taps()[0]);
            } else {
                let engine = FilterEngine1D::new(pair.col.clone(), self.acc.clone());
                engine.apply_col(&buffer, &mut partial, border);
            }

            if first {
                // move the first partial result straight into the
                // destination; no pre-zeroed memory required
                *dst = std::mem::take(&mut partial);
                first = false;
            } else {
                for (d, p) in dst.as_slice_mut().iter_mut().zip(partial.as_slice()) {
                    *d = *d + *p;
                }
            }
        }
    }

    /// Filter with the dense kernel restricted to the mask-active taps.
    ///
    /// # Errors
    ///
    /// [`FilterError::MissingMask`] without a mask,
    /// [`FilterError::MaskShapeMismatch`] when mask and kernel shapes
    /// disagree, and [`FilterError::MaskRequiresDenseKernel`] for
    /// separable kernels.
    pub fn apply_mask(
        &self,
        src: &Matrix<T>,
        dst: &mut Matrix<T>,
        border: BorderType,
    ) -> Result<(), FilterError> {
        let kernel = match &self.kernel {
            Adapted2D::Dense(kernel) => kernel,
            Adapted2D::Separable(_) => return Err(FilterError::MaskRequiresDenseKernel),
        };
        let mask = self.mask.as_ref().ok_or(FilterError::MissingMask)?;
        if mask.rows() != kernel.rows() || mask.cols() != kernel.cols() {
            return Err(FilterError::MaskShapeMismatch(
                mask.rows(),
                mask.cols(),
                kernel.rows(),
                kernel.cols(),
            ));
        }

        *dst = Matrix::from_size_val(src.rows(), src.cols(), T::zero());

        // active taps in storage coordinates, precomputed once
        let mut active = Vec::new();
        for g in 0..kernel.rows() {
            for f in 0..kernel.cols() {
                if mask[(g, f)] != 0 {
                    active.push((g, f));
                }
            }
        }

        let mut acc = self.acc.clone();
        acc.set_norm(kernel.norm());

        let (rows, cols) = (src.rows(), src.cols());
        let (rni, cni) = (rows as isize, cols as isize);
        let (krows, kcols) = (kernel.rows(), kernel.cols());
        let (last_row, last_col) = (kernel.last_row(), kernel.last_col());

        if krows > rows || kcols > cols {
            if border == BorderType::NoBoundary {
                return Ok(());
            }
            for j in 0..rni {
                for i in 0..cni {
                    dst[(j as usize, i as usize)] =
                        self.masked_cell_resolved(&mut acc, kernel, &active, src, j, i, border);
                }
            }
            return Ok(());
        }

        let r_begin = last_row.clamp(0, rni);
        let r_end = (rni + kernel.first_row().min(0)).max(r_begin);
        let c_begin = last_col.clamp(0, cni);
        let c_end = (cni + kernel.first_col().min(0)).max(c_begin);

        for j in r_begin..r_end {
            let y = (j - last_row) as usize;
            for i in c_begin..c_end {
                let x = (i - last_col) as usize;
                acc.reset();
                for &(g, f) in &active {
                    acc.accumulate(
                        kernel.raw(g, f),
                        src[(y + (krows - 1 - g), x + (kcols - 1 - f))],
                    );
                }
                dst[(j as usize, i as usize)] = acc.result();
            }
        }

        if border == BorderType::NoBoundary {
            return Ok(());
        }
        for j in (0..r_begin).chain(r_end..rni) {
            for i in 0..cni {
                dst[(j as usize, i as usize)] =
                    self.masked_cell_resolved(&mut acc, kernel, &active, src, j, i, border);
            }
        }
        for j in r_begin..r_end {
            for i in (0..c_begin).chain(c_end..cni) {
                dst[(j as usize, i as usize)] =
                    self.masked_cell_resolved(&mut acc, kernel, &active, src, j, i, border);
            }
        }
        Ok(())
    }

    fn masked_cell_resolved(
        &self,
        acc: &mut A,
        kernel: &Kernel2D<T>,
        active: &[(usize, usize)],
        src: &Matrix<T>,
        j: isize,
        i: isize,
        border: BorderType,
    ) -> T {
        let (krows, kcols) = (kernel.rows(), kernel.cols());
        let (last_row, last_col) = (kernel.last_row(), kernel.last_col());
        acc.reset();
        for &(g, f) in active {
            let py = j - last_row + (krows - 1 - g) as isize;
            let px = i - last_col + (kcols - 1 - f) as isize;
            if let (Resolved::Inside(sy), Resolved::Inside(sx)) = (
                resolve(py, src.rows(), border),
                resolve(px, src.cols(), border),
            ) {
                acc.accumulate(kernel.raw(g, f), src[(sy, sx)]);
            }
        }
        acc.result()
    }
}

impl<'k, T: KernelElement, A: Accumulator<T>> FilterEngine2D<'k, T, A> {
    /// Create an engine from a type-erased kernel, adapting (and possibly
    /// mirroring) it to the engine sample type.
    ///
    /// # Errors
    ///
    /// [`FilterError::UnsupportedKernel`] when the kernel cannot be
    /// represented in `T`.
    pub fn from_any(kernel: &'k AnyKernel2D, mirrored: bool, acc: A) -> Result<Self, FilterError> {
        let kernel = adapt_2d::<T>(kernel, mirrored)?;
        match &kernel {
            Adapted2D::Dense(k) => {
                log::debug!("2-D engine: dense {}x{} kernel", k.rows(), k.cols())
            }
            Adapted2D::Separable(k) => {
                log::debug!("2-D engine: separable kernel, {} pairs", k.pairs().len())
            }
        }
        Ok(Self {
            kernel,
            mask: None,
            acc,
        })
    }
}

fn scale_into<T: Sample>(dst: &mut Matrix<T>, src: &Matrix<T>, factor: T) {
    if dst.rows() != src.rows() || dst.cols() != src.cols() {
        *dst = Matrix::from_size_val(src.rows(), src.cols(), T::default());
    }
    for (d, s) in dst.as_slice_mut().iter_mut().zip(src.as_slice()) {
        *d = *s * factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::ClassicAccumulator;
    use crate::kernel::Kernel1D;
    use approx::assert_relative_eq;
    use rand::Rng;

    fn ninth_kernel() -> Kernel2D<f32> {
        Kernel2D::centered(Matrix::from_size_val(3, 3, 1.0f32 / 9.0), 1.0)
    }

    #[test]
    fn test_all_ones_constant_boundary() {
        let engine = FilterEngine2D::new_dense(ninth_kernel(), ClassicAccumulator::default());
        let src = Matrix::from_size_val(3, 3, 1.0f32);
        let mut dst = Matrix::default();
        engine.apply(&src, &mut dst, BorderType::Constant);
        for &v in dst.as_slice() {
            assert_relative_eq!(v, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_impulse_response_reproduces_kernel() {
        let taps = Matrix::new(3, 3, vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]).unwrap();
        let kernel = Kernel2D::centered(taps, 1.0);
        let engine = FilterEngine2D::new_dense(kernel, ClassicAccumulator::default());

        let mut src = Matrix::from_size_val(5, 5, 0.0f32);
        src[(2, 2)] = 1.0;
        let mut dst = Matrix::default();
        engine.apply(&src, &mut dst, BorderType::Zero);

        // convolution writes the kernel unmirrored around the impulse
        #[rustfmt::skip]
        let expected = [
            0.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 2.0, 3.0, 0.0,
            0.0, 4.0, 5.0, 6.0, 0.0,
            0.0, 7.0, 8.0, 9.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0,
        ];
        for (o, e) in dst.as_slice().iter().zip(expected.iter()) {
            assert_relative_eq!(o, e, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_separable_matches_dense() {
        let row = Kernel1D::centered(vec![0.25f32, 0.5, 0.25], 1.0);
        let col = Kernel1D::centered(vec![0.3f32, 0.4, 0.3], 1.0);
        let sep = SeparableKernel::from_pair(row, col);
        let dense = sep.to_dense();

        let mut rng = rand::rng();
        let mut src = Matrix::from_size_val(6, 7, 0.0f32);
        for v in src.as_slice_mut() {
            *v = rng.random_range(0.0..10.0);
        }

        let sep_engine = FilterEngine2D::new_separable(sep, ClassicAccumulator::default());
        let dense_engine = FilterEngine2D::new_dense(dense, ClassicAccumulator::default());

        for border in [
            BorderType::Zero,
            BorderType::Mirror,
            BorderType::Periodic,
            BorderType::Constant,
        ] {
            let mut a = Matrix::default();
            let mut b = Matrix::default();
            sep_engine.apply(&src, &mut a, border);
            dense_engine.apply(&src, &mut b, border);
            for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
                assert_relative_eq!(x, y, epsilon = 1e-4);
            }
        }

        // without boundary extension only the interior is defined
        let mut a = Matrix::from_size_val(6, 7, 0.0f32);
        let mut b = Matrix::from_size_val(6, 7, 0.0f32);
        sep_engine.apply(&src, &mut a, BorderType::NoBoundary);
        dense_engine.apply(&src, &mut b, BorderType::NoBoundary);
        for j in 1..5 {
            for i in 1..6 {
                assert_relative_eq!(a[(j, i)], b[(j, i)], epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_separable_multiple_pairs_accumulate() {
        // two pairs: identity-row x col and row x identity-col, summed
        let ident = Kernel1D::new(vec![1.0f32], 0, 1.0);
        let smooth = Kernel1D::centered(vec![0.5f32, 0.0, 0.5], 1.0);
        let sep = SeparableKernel::new(vec![
            crate::kernel::KernelPair {
                row: smooth.clone(),
                col: ident.clone(),
            },
            crate::kernel::KernelPair {
                row: ident,
                col: smooth,
            },
        ]);
        let dense = sep.to_dense();

        let mut src = Matrix::from_size_val(5, 5, 0.0f32);
        src[(2, 2)] = 4.0;

        let sep_engine = FilterEngine2D::new_separable(sep, ClassicAccumulator::default());
        let dense_engine = FilterEngine2D::new_dense(dense, ClassicAccumulator::default());

        let mut a = Matrix::default();
        let mut b = Matrix::default();
        sep_engine.apply(&src, &mut a, BorderType::Zero);
        dense_engine.apply(&src, &mut b, BorderType::Zero);
        for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
            assert_relative_eq!(x, y, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_huge_kernel_fallback() {
        // kernel larger than the data in both dimensions
        let kernel = Kernel2D::centered(Matrix::from_size_val(5, 5, 1.0f32 / 25.0), 1.0);
        let engine = FilterEngine2D::new_dense(kernel, ClassicAccumulator::default());
        let src = Matrix::from_size_val(3, 3, 2.0f32);
        let mut dst = Matrix::default();
        engine.apply(&src, &mut dst, BorderType::Constant);
        for &v in dst.as_slice() {
            assert_relative_eq!(v, 2.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_shape_preservation() {
        let engine = FilterEngine2D::new_dense(ninth_kernel(), ClassicAccumulator::default());
        let src = Matrix::from_size_val(4, 6, 1.0f32);
        let mut dst = Matrix::default();
        for border in [
            BorderType::Zero,
            BorderType::Mirror,
            BorderType::Periodic,
            BorderType::Constant,
        ] {
            engine.apply(&src, &mut dst, border);
            assert_eq!(dst.rows(), 4);
            assert_eq!(dst.cols(), 6);
        }
    }

    #[test]
    fn test_mask_all_active_matches_dense() {
        let taps = Matrix::new(3, 3, vec![1.0f32, 2.0, 1.0, 2.0, 4.0, 2.0, 1.0, 2.0, 1.0]).unwrap();
        let kernel = Kernel2D::centered(taps, 16.0);
        let mut engine = FilterEngine2D::new_dense(kernel.clone(), ClassicAccumulator::default());
        engine.set_mask(Matrix::from_size_val(3, 3, 1u8));

        let mut src = Matrix::from_size_val(5, 6, 0.0f32);
        for (i, v) in src.as_slice_mut().iter_mut().enumerate() {
            *v = ((i * 13 + 5) % 11) as f32;
        }

        let mut masked = Matrix::default();
        engine.apply_mask(&src, &mut masked, BorderType::Mirror).unwrap();

        let dense = FilterEngine2D::new_dense(kernel, ClassicAccumulator::default());
        let mut plain = Matrix::default();
        dense.apply(&src, &mut plain, BorderType::Mirror);

        for (x, y) in masked.as_slice().iter().zip(plain.as_slice()) {
            assert_relative_eq!(x, y, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_mask_restricts_taps() {
        // only the center column participates
        let kernel = Kernel2D::centered(Matrix::from_size_val(3, 3, 1.0f32), 1.0);
        let mut engine = FilterEngine2D::new_dense(kernel, ClassicAccumulator::default());
        #[rustfmt::skip]
        let mask = Matrix::new(3, 3, vec![
            0u8, 1, 0,
            0,   1, 0,
            0,   1, 0,
        ])
        .unwrap();
        engine.set_mask(mask);

        let mut src = Matrix::from_size_val(5, 5, 0.0f32);
        src[(2, 2)] = 1.0;
        let mut dst = Matrix::default();
        engine.apply_mask(&src, &mut dst, BorderType::Zero).unwrap();

        #[rustfmt::skip]
        let expected = [
            0.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0,
        ];
        for (o, e) in dst.as_slice().iter().zip(expected.iter()) {
            assert_relative_eq!(o, e, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_mask_errors() {
        let kernel = ninth_kernel();
        let src = Matrix::from_size_val(4, 4, 1.0f32);
        let mut dst = Matrix::default();

        let engine = FilterEngine2D::new_dense(kernel.clone(), ClassicAccumulator::default());
        assert!(matches!(
            engine.apply_mask(&src, &mut dst, BorderType::Zero),
            Err(FilterError::MissingMask)
        ));

        let mut engine = FilterEngine2D::new_dense(kernel, ClassicAccumulator::default());
        engine.set_mask(Matrix::from_size_val(2, 3, 1u8));
        assert!(matches!(
            engine.apply_mask(&src, &mut dst, BorderType::Zero),
            Err(FilterError::MaskShapeMismatch(2, 3, 3, 3))
        ));

        let sep = SeparableKernel::from_pair(
            Kernel1D::centered(vec![1.0f32], 1.0),
            Kernel1D::centered(vec![1.0f32], 1.0),
        );
        let mut engine = FilterEngine2D::new_separable(sep, ClassicAccumulator::default());
        engine.set_mask(Matrix::from_size_val(1, 1, 1u8));
        assert!(matches!(
            engine.apply_mask(&src, &mut dst, BorderType::Zero),
            Err(FilterError::MaskRequiresDenseKernel)
        ));
    }
}
