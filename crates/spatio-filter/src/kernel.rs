//! Kernel containers.
//!
//! A kernel stores its taps together with an explicit offset: the storage
//! index of its logical origin. The offset may be negative or beyond the
//! last tap, which is what lets a kernel be off-center. Logical indices run
//! from `first_idx() = -offset` to `last_idx() = len - 1 - offset`.

use num_traits::{One, Zero};
use spatio_grid::{Matrix, Sample};

/// Symmetry classification of a 1-D kernel, selecting the accumulation
/// fast path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelSymmetry {
    /// Taps mirror-match about a centered origin.
    Symmetric,
    /// Taps mirror-negate about a centered origin with a zero center tap
    /// (e.g. derivative kernels).
    Antisymmetric,
    /// No exploitable symmetry.
    Default,
}

/// A 1-D filter kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel1D<T: Sample> {
    taps: Vec<T>,
    offset: isize,
    norm: T,
}

impl<T: Sample> Kernel1D<T> {
    /// Create a kernel from taps, the storage index of its origin and a
    /// normalization constant.
    ///
    /// # Panics
    ///
    /// If `taps` is empty. A zero-sized kernel is a programmer error, not
    /// input data.
    pub fn new(taps: Vec<T>, offset: isize, norm: T) -> Self {
        assert!(!taps.is_empty(), "kernel must contain at least one tap");
        Self { taps, offset, norm }
    }

    /// Create a kernel with its origin at the storage center.
    pub fn centered(taps: Vec<T>, norm: T) -> Self {
        let offset = (taps.len() / 2) as isize;
        Self::new(taps, offset, norm)
    }

    /// Number of taps.
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    /// A kernel is never empty; this exists for clippy's sake.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Storage index of the logical origin.
    pub fn offset(&self) -> isize {
        self.offset
    }

    /// Normalization constant consumed by the accumulators.
    pub fn norm(&self) -> T {
        self.norm
    }

    /// Taps in storage order.
    pub fn taps(&self) -> &[T] {
        &self.taps
    }

    /// First logical index (`-offset`).
    pub fn first_idx(&self) -> isize {
        -self.offset
    }

    /// Last logical index (`len - 1 - offset`).
    pub fn last_idx(&self) -> isize {
        self.taps.len() as isize - 1 - self.offset
    }

    /// Tap at logical index `k`.
    pub fn at(&self, k: isize) -> T {
        self.taps[(k + self.offset) as usize]
    }

    /// Sum of all taps, widened.
    pub fn sum(&self) -> T::Acc {
        let mut acc = T::Acc::zero();
        for &t in &self.taps {
            acc += t.to_acc();
        }
        acc
    }

    /// Reverse the taps about the origin, so that `at(k)` afterwards reads
    /// the former `at(-k)`. Mirroring twice restores the kernel.
    pub fn mirror(&mut self) {
        self.taps.reverse();
        self.offset = self.taps.len() as isize - 1 - self.offset;
    }

    /// Divide every tap by the norm and reset the norm to one.
    ///
    /// Meaningful for floating-point kernels freshly converted from a
    /// fixed-point representation.
    pub fn denormalize(&mut self) {
        let norm = self.norm;
        for t in &mut self.taps {
            *t = *t / norm;
        }
        self.norm = T::one();
    }

    /// Classify the kernel symmetry about its origin.
    ///
    /// Only centered, odd-length kernels qualify for the fast paths;
    /// everything else is `Default`.
    pub fn symmetry(&self) -> KernelSymmetry {
        let n = self.taps.len();
        if n % 2 != 1 || self.offset != (n / 2) as isize {
            return KernelSymmetry::Default;
        }
        let half = n / 2;
        if (0..half).all(|i| self.taps[i] == self.taps[n - 1 - i]) {
            return KernelSymmetry::Symmetric;
        }
        if self.taps[half].to_acc().is_zero()
            && (0..half).all(|i| (self.taps[i].to_acc() + self.taps[n - 1 - i].to_acc()).is_zero())
        {
            return KernelSymmetry::Antisymmetric;
        }
        KernelSymmetry::Default
    }
}

/// A dense 2-D filter kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel2D<T: Sample> {
    data: Matrix<T>,
    row_offset: isize,
    col_offset: isize,
    norm: T,
}

impl<T: Sample> Kernel2D<T> {
    /// Create a kernel from a tap matrix, the storage coordinates of its
    /// origin and a normalization constant.
    ///
    /// # Panics
    ///
    /// If the matrix has zero rows or zero columns.
    pub fn new(data: Matrix<T>, row_offset: isize, col_offset: isize, norm: T) -> Self {
        assert!(
            data.rows() > 0 && data.cols() > 0,
            "kernel must contain at least one tap"
        );
        Self {
            data,
            row_offset,
            col_offset,
            norm,
        }
    }

    /// Create a kernel with its origin at the storage center.
    pub fn centered(data: Matrix<T>, norm: T) -> Self {
        let row_offset = (data.rows() / 2) as isize;
        let col_offset = (data.cols() / 2) as isize;
        Self::new(data, row_offset, col_offset, norm)
    }

    /// Number of tap rows.
    pub fn rows(&self) -> usize {
        self.data.rows()
    }

    /// Number of tap columns.
    pub fn cols(&self) -> usize {
        self.data.cols()
    }

    /// Total number of taps.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// A kernel is never empty; this exists for clippy's sake.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Storage row of the logical origin.
    pub fn row_offset(&self) -> isize {
        self.row_offset
    }

    /// Storage column of the logical origin.
    pub fn col_offset(&self) -> isize {
        self.col_offset
    }

    /// Normalization constant consumed by the accumulators.
    pub fn norm(&self) -> T {
        self.norm
    }

    /// First logical row index.
    pub fn first_row(&self) -> isize {
        -self.row_offset
    }

    /// Last logical row index.
    pub fn last_row(&self) -> isize {
        self.data.rows() as isize - 1 - self.row_offset
    }

    /// First logical column index.
    pub fn first_col(&self) -> isize {
        -self.col_offset
    }

    /// Last logical column index.
    pub fn last_col(&self) -> isize {
        self.data.cols() as isize - 1 - self.col_offset
    }

    /// Tap at storage coordinates `(g, f)`.
    pub fn raw(&self, g: usize, f: usize) -> T {
        self.data[(g, f)]
    }

    /// Tap at logical coordinates `(kr, kc)`.
    pub fn at(&self, kr: isize, kc: isize) -> T {
        self.data[(
            (kr + self.row_offset) as usize,
            (kc + self.col_offset) as usize,
        )]
    }

    /// Tap matrix in storage order.
    pub fn data(&self) -> &Matrix<T> {
        &self.data
    }

    /// Sum of all taps, widened.
    pub fn sum(&self) -> T::Acc {
        let mut acc = T::Acc::zero();
        for &t in self.data.as_slice() {
            acc += t.to_acc();
        }
        acc
    }

    /// Reverse the taps about the origin along both axes.
    pub fn mirror(&mut self) {
        let (rows, cols) = (self.data.rows(), self.data.cols());
        let mut reversed = Vec::with_capacity(rows * cols);
        for g in (0..rows).rev() {
            for f in (0..cols).rev() {
                reversed.push(self.data[(g, f)]);
            }
        }
        self.data = Matrix::new(rows, cols, reversed).expect("shape is unchanged");
        self.row_offset = rows as isize - 1 - self.row_offset;
        self.col_offset = cols as isize - 1 - self.col_offset;
    }

    /// Divide every tap by the norm and reset the norm to one.
    pub fn denormalize(&mut self) {
        let norm = self.norm;
        let (rows, cols) = (self.data.rows(), self.data.cols());
        for g in 0..rows {
            for f in 0..cols {
                self.data[(g, f)] = self.data[(g, f)] / norm;
            }
        }
        self.norm = T::one();
    }
}

/// One separable term: a horizontal (row) and a vertical (column) 1-D
/// kernel whose outer product contributes to the represented 2-D kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelPair<T: Sample> {
    /// Kernel applied along each row.
    pub row: Kernel1D<T>,
    /// Kernel applied along each column.
    pub col: Kernel1D<T>,
}

/// A separable 2-D kernel: a sum of outer products of row and column
/// kernels. Filtering it costs one 1-D pass per axis per pair instead of
/// the full 2-D sliding window.
#[derive(Debug, Clone, PartialEq)]
pub struct SeparableKernel<T: Sample> {
    pairs: Vec<KernelPair<T>>,
}

impl<T: Sample> SeparableKernel<T> {
    /// Create a separable kernel from its term list.
    ///
    /// # Panics
    ///
    /// If `pairs` is empty.
    pub fn new(pairs: Vec<KernelPair<T>>) -> Self {
        assert!(!pairs.is_empty(), "separable kernel needs at least one pair");
        Self { pairs }
    }

    /// Create a single-term separable kernel.
    pub fn from_pair(row: Kernel1D<T>, col: Kernel1D<T>) -> Self {
        Self::new(vec![KernelPair { row, col }])
    }

    /// The separable terms.
    pub fn pairs(&self) -> &[KernelPair<T>] {
        &self.pairs
    }

    /// Mirror every sub-kernel about its origin.
    pub fn mirror(&mut self) {
        for pair in &mut self.pairs {
            pair.row.mirror();
            pair.col.mirror();
        }
    }

    /// Divide the taps of every sub-kernel by its norm.
    pub fn denormalize(&mut self) {
        for pair in &mut self.pairs {
            pair.row.denormalize();
            pair.col.denormalize();
        }
    }

    /// Reconstruct the dense kernel represented by the pair sum.
    ///
    /// The dense footprint is the union of the pair footprints; taps of a
    /// pair outside its own footprint contribute zero. All pairs are
    /// expected to share their norms; the dense norm is the product of the
    /// first pair's row and column norms.
    pub fn to_dense(&self) -> Kernel2D<T> {
        let first_row = self.pairs.iter().map(|p| p.col.first_idx()).min().unwrap();
        let last_row = self.pairs.iter().map(|p| p.col.last_idx()).max().unwrap();
        let first_col = self.pairs.iter().map(|p| p.row.first_idx()).min().unwrap();
        let last_col = self.pairs.iter().map(|p| p.row.last_idx()).max().unwrap();

        let rows = (last_row - first_row + 1) as usize;
        let cols = (last_col - first_col + 1) as usize;
        let mut data = Matrix::from_size_val(rows, cols, T::zero());

        for pair in &self.pairs {
            for kr in pair.col.first_idx()..=pair.col.last_idx() {
                for kc in pair.row.first_idx()..=pair.row.last_idx() {
                    let g = (kr - first_row) as usize;
                    let f = (kc - first_col) as usize;
                    data[(g, f)] = data[(g, f)] + pair.col.at(kr) * pair.row.at(kc);
                }
            }
        }

        let norm = self.pairs[0].row.norm() * self.pairs[0].col.norm();
        Kernel2D::new(data, -first_row, -first_col, norm)
    }
}
