//! 1-D filtering engine.
//!
//! Filters a vector, or every row/column of a matrix, with a 1-D kernel.
//! The interior region — where the whole kernel footprint fits inside the
//! data — runs a tight tap loop, taking a half-kernel fast path for
//! symmetric and antisymmetric kernels. Outputs left and right of the
//! interior resolve every tap individually through the boundary rule.
//! Kernels longer than the data fall back to per-output full resolution.

use std::borrow::Cow;

use crate::accumulator::Accumulator;
use crate::adapter::{adapt_1d, AnyKernel1D, KernelElement};
use crate::border::{resolve, BorderType, Resolved};
use crate::error::FilterError;
use crate::kernel::{Kernel1D, KernelSymmetry};
use spatio_grid::{Matrix, Sample, Vector};

/// Monomorphized 1-D filtering engine over a sample type and an
/// accumulation strategy.
///
/// The engine owns (or borrows) the adapted kernel and an accumulator
/// prototype. Each apply call clones the prototype, so repeated calls and
/// concurrent engines never share running state.
pub struct FilterEngine1D<'k, T: Sample, A: Accumulator<T>> {
    kernel: Cow<'k, Kernel1D<T>>,
    symmetry: KernelSymmetry,
    acc: A,
}

impl<T: Sample, A: Accumulator<T>> FilterEngine1D<'_, T, A> {
    /// Create an engine from an already-native kernel.
    pub fn new(kernel: Kernel1D<T>, acc: A) -> Self {
        let symmetry = kernel.symmetry();
        Self {
            kernel: Cow::Owned(kernel),
            symmetry,
            acc,
        }
    }

    /// The kernel the engine filters with.
    pub fn kernel(&self) -> &Kernel1D<T> {
        &self.kernel
    }

    /// The detected kernel symmetry.
    pub fn symmetry(&self) -> KernelSymmetry {
        self.symmetry
    }

    /// Filter `src` into `dst`, which is reallocated to the source length
    /// when it differs.
    pub fn apply(&self, src: &Vector<T>, dst: &mut Vector<T>, border: BorderType) {
        if dst.len() != src.len() {
            *dst = Vector::from_size_val(src.len(), T::default());
        }
        let mut acc = self.acc.clone();
        acc.set_norm(self.kernel.norm());

        let n = src.len();
        let data = src.as_slice();
        let out = dst.as_slice_mut();
        self.filter_line(&mut acc, n, border, |i| data[i], |i, v| out[i] = v);
    }

    /// Filter every row of `src` into `dst`.
    pub fn apply_row(&self, src: &Matrix<T>, dst: &mut Matrix<T>, border: BorderType) {
        if dst.rows() != src.rows() || dst.cols() != src.cols() {
            *dst = Matrix::from_size_val(src.rows(), src.cols(), T::default());
        }
        let mut acc = self.acc.clone();
        acc.set_norm(self.kernel.norm());

        let cols = src.cols();
        let out = dst.as_slice_mut();
        for r in 0..src.rows() {
            let row = src.row(r);
            let start = r * cols;
            self.filter_line(&mut acc, cols, border, |i| row[i], |i, v| {
                out[start + i] = v
            });
        }
    }

    /// Filter every column of `src` into `dst`.
    pub fn apply_col(&self, src: &Matrix<T>, dst: &mut Matrix<T>, border: BorderType) {
        if dst.rows() != src.rows() || dst.cols() != src.cols() {
            *dst = Matrix::from_size_val(src.rows(), src.cols(), T::default());
        }
        let mut acc = self.acc.clone();
        acc.set_norm(self.kernel.norm());

        let rows = src.rows();
        let cols = src.cols();
        let data = src.as_slice();
        let out = dst.as_slice_mut();
        for c in 0..cols {
            self.filter_line(&mut acc, rows, border, |i| data[i * cols + c], |i, v| {
                out[i * cols + c] = v
            });
        }
    }

    /// Run the 1-D algorithm over one line of `n` samples, reading through
    /// `get` and writing through `put`.
    fn filter_line<G, P>(&self, acc: &mut A, n: usize, border: BorderType, get: G, mut put: P)
    where
        G: Fn(usize) -> T,
        P: FnMut(usize, T),
    {
        let klen = self.kernel.len();
        if klen > n {
            self.filter_line_huge(acc, n, border, &get, &mut put);
            return;
        }

        let taps = self.kernel.taps();
        let last = self.kernel.last_idx();
        let first = self.kernel.first_idx();
        let ni = n as isize;

        // interior range: the whole kernel footprint stays inside the data
        let i_begin = last.clamp(0, ni);
        let i_end = (ni + first.min(0)).max(i_begin);

        match self.symmetry {
            KernelSymmetry::Default => {
                for i in i_begin..i_end {
                    acc.reset();
                    let x = (i - last) as usize;
                    for f in (0..klen).rev() {
                        acc.accumulate(taps[f], get(x + (klen - 1 - f)));
                    }
                    put(i as usize, acc.result());
                }
            }
            KernelSymmetry::Symmetric => {
                let half = klen / 2;
                for i in i_begin..i_end {
                    acc.reset();
                    let x = (i - last) as usize;
                    let mut xl = x;
                    let mut xr = x + klen - 1;
                    for f in ((half + 1)..klen).rev() {
                        acc.accumulate_sym(taps[f], get(xl), get(xr));
                        xl += 1;
                        xr -= 1;
                    }
                    acc.accumulate(taps[half], get(xl));
                    put(i as usize, acc.result());
                }
            }
            KernelSymmetry::Antisymmetric => {
                let half = klen / 2;
                for i in i_begin..i_end {
                    acc.reset();
                    let x = (i - last) as usize;
                    let mut xl = x;
                    let mut xr = x + klen - 1;
                    for f in ((half + 1)..klen).rev() {
                        acc.accumulate_asym(taps[f], get(xl), get(xr));
                        xl += 1;
                        xr -= 1;
                    }
                    acc.accumulate_zero(get(xl));
                    put(i as usize, acc.result());
                }
            }
        }

        if border == BorderType::NoBoundary {
            // non-interior outputs are left untouched
            return;
        }
        for i in (0..i_begin).chain(i_end..ni) {
            put(i as usize, self.output_resolved(acc, i, n, border, &get));
        }
    }

    /// Fallback for kernels longer than the line: every tap of every
    /// output is resolved through the boundary rule.
    fn filter_line_huge<G, P>(
        &self,
        acc: &mut A,
        n: usize,
        border: BorderType,
        get: &G,
        put: &mut P,
    ) where
        G: Fn(usize) -> T,
        P: FnMut(usize, T),
    {
        if border == BorderType::NoBoundary {
            // no tap ever fits: nothing is written
            return;
        }
        for i in 0..n as isize {
            put(i as usize, self.output_resolved(acc, i, n, border, get));
        }
    }

    /// One output sample with every tap resolved through the boundary
    /// rule; symmetry fast paths do not apply here.
    fn output_resolved<G>(&self, acc: &mut A, i: isize, n: usize, border: BorderType, get: &G) -> T
    where
        G: Fn(usize) -> T,
    {
        let taps = self.kernel.taps();
        let klen = taps.len();
        let last = self.kernel.last_idx();
        acc.reset();
        for f in (0..klen).rev() {
            let pos = i - last + (klen - 1 - f) as isize;
            if let Resolved::Inside(idx) = resolve(pos, n, border) {
                acc.accumulate(taps[f], get(idx));
            }
        }
        acc.result()
    }
}

impl<'k, T: KernelElement, A: Accumulator<T>> FilterEngine1D<'k, T, A> {
    /// Create an engine from a type-erased kernel, adapting (and possibly
    /// mirroring) it to the engine sample type.
    ///
    /// # Errors
    ///
    /// [`FilterError::UnsupportedKernel`] when the kernel cannot be
    /// represented in `T`.
    pub fn from_any(kernel: &'k AnyKernel1D, mirrored: bool, acc: A) -> Result<Self, FilterError> {
        let kernel = adapt_1d::<T>(kernel, mirrored)?;
        let symmetry = kernel.symmetry();
        log::debug!(
            "1-D engine: {} taps, offset {}, {:?}",
            kernel.len(),
            kernel.offset(),
            symmetry
        );
        Ok(Self {
            kernel,
            symmetry,
            acc,
        })
    }
}
