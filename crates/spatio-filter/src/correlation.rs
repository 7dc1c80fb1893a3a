//! Correlation and template-matching operators.
//!
//! Correlation adapts the kernel mirrored, turning the engines'
//! convolution loops into true correlation. Besides the classic
//! sum-of-products it offers a normalized correlation coefficient and
//! three difference criteria used for template matching.

use num_traits::{One, Zero};

use crate::accumulator::{Accumulator, ClassicAccumulator};
use crate::adapter::{adapt_1d, adapt_2d, Adapted2D, AnyKernel1D, AnyKernel2D, KernelElement};
use crate::border::BorderType;
use crate::error::FilterError;
use crate::filter1d::FilterEngine1D;
use crate::filter2d::FilterEngine2D;
use spatio_grid::{Matrix, Sample, Vector};

/// The matching criterion evaluated per output sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationMode {
    /// Plain sum of tap-weighted samples.
    Classic,
    /// Normalized correlation coefficient (zero-mean template match).
    Coefficient,
    /// Largest absolute difference between tap and sample.
    MaxAbsDiff,
    /// Sum of absolute differences between tap and sample.
    SumAbsDiff,
    /// Sum of squared differences between tap and sample.
    SumSquareDiff,
}

/// Correlation operator.
#[derive(Debug, Clone, Copy)]
pub struct Correlation {
    /// Matching criterion.
    pub mode: CorrelationMode,
    /// Boundary-extension rule applied at the data edges.
    pub boundary: BorderType,
}

impl Default for Correlation {
    fn default() -> Self {
        Self {
            mode: CorrelationMode::Classic,
            boundary: BorderType::Zero,
        }
    }
}

impl Correlation {
    /// Create a correlation operator.
    pub fn new(mode: CorrelationMode, boundary: BorderType) -> Self {
        Self { mode, boundary }
    }

    /// Correlate a vector with a 1-D template kernel.
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
        if self.mode == CorrelationMode::Classic {
            let engine = FilterEngine1D::from_any(kernel, true, ClassicAccumulator::<T>::default())?;
            engine.apply(src, dst, self.boundary);
            return Ok(());
        }
        let adapted = adapt_1d::<T>(kernel, true)?;
        match self.mode {
            CorrelationMode::Classic => unreachable!(),
            CorrelationMode::Coefficient => {
                let acc = CoefficientAccumulator::from_stats(
                    adapted.sum(),
                    num_traits::cast(adapted.len()).ok_or(FilterError::UnsupportedKernel)?,
                );
                let engine = FilterEngine1D::new(adapted.into_owned(), acc);
                engine.apply(src, dst, self.boundary);
            }
            CorrelationMode::MaxAbsDiff => {
                let engine =
                    FilterEngine1D::new(adapted.into_owned(), MaxAbsDiffAccumulator::<T>::default());
                engine.apply(src, dst, self.boundary);
            }
            CorrelationMode::SumAbsDiff => {
                let engine =
                    FilterEngine1D::new(adapted.into_owned(), SumAbsDiffAccumulator::<T>::default());
                engine.apply(src, dst, self.boundary);
            }
            CorrelationMode::SumSquareDiff => {
                let engine = FilterEngine1D::new(
                    adapted.into_owned(),
                    SumSquareDiffAccumulator::<T>::default(),
                );
                engine.apply(src, dst, self.boundary);
            }
        }
        Ok(())
    }

    /// Correlate a matrix with a 2-D template kernel.
    ///
    /// The matching criteria are meant for dense template kernels; a
    /// separable kernel still runs through the twin 1-D passes, as with
    /// the classic mode.
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
        match self.mode {
            CorrelationMode::Classic => {
                let engine =
                    FilterEngine2D::from_any(kernel, true, ClassicAccumulator::<T>::default())?;
                engine.apply(src, dst, self.boundary);
            }
            CorrelationMode::Coefficient => {
                let adapted = adapt_2d::<T>(kernel, true)?;
                let (sum, len) = kernel_stats(&adapted);
                let acc = CoefficientAccumulator::from_stats(
                    sum,
                    num_traits::cast(len).ok_or(FilterError::UnsupportedKernel)?,
                );
                self.run_2d(adapted, acc, src, dst);
            }
            CorrelationMode::MaxAbsDiff => {
                let adapted = adapt_2d::<T>(kernel, true)?;
                self.run_2d(adapted, MaxAbsDiffAccumulator::<T>::default(), src, dst);
            }
            CorrelationMode::SumAbsDiff => {
                let adapted = adapt_2d::<T>(kernel, true)?;
                self.run_2d(adapted, SumAbsDiffAccumulator::<T>::default(), src, dst);
            }
            CorrelationMode::SumSquareDiff => {
                let adapted = adapt_2d::<T>(kernel, true)?;
                self.run_2d(adapted, SumSquareDiffAccumulator::<T>::default(), src, dst);
            }
        }
        Ok(())
    }

    fn run_2d<T: Sample, A: Accumulator<T>>(
        &self,
        adapted: Adapted2D<'_, T>,
        acc: A,
        src: &Matrix<T>,
        dst: &mut Matrix<T>,
    ) {
        let engine = match adapted {
            Adapted2D::Dense(k) => FilterEngine2D::new_dense(k.into_owned(), acc),
            Adapted2D::Separable(k) => FilterEngine2D::new_separable(k.into_owned(), acc),
        };
        engine.apply(src, dst, self.boundary);
    }
}

fn kernel_stats<T: Sample>(adapted: &Adapted2D<'_, T>) -> (T::Acc, usize) {
    match adapted {
        Adapted2D::Dense(k) => (k.sum(), k.len()),
        Adapted2D::Separable(k) => {
            let dense = k.to_dense();
            (dense.sum(), dense.len())
        }
    }
}

/// Accumulator for the normalized correlation coefficient.
///
/// Tracks the running sums needed to evaluate
/// `sum(f - mean(f))(w - mean(w)) / sqrt(sum(f - mean(f))^2 sum(w - mean(w))^2)`
/// per window, with the kernel mean primed once from kernel statistics.
#[derive(Debug, Clone)]
pub struct CoefficientAccumulator<T: Sample> {
    sum_w: T::Acc,
    sum_ww: T::Acc,
    sum_fw: T::Acc,
    sum_ff: T::Acc,
    sum_f: T::Acc,
    kern_avg: T::Acc,
    kern_size: T::Acc,
    norm: T,
}

impl<T: Sample> CoefficientAccumulator<T> {
    /// Prime the accumulator from the kernel tap sum and tap count.
    pub fn from_stats(kernel_sum: T::Acc, kernel_size: T::Acc) -> Self {
        Self {
            sum_w: T::Acc::zero(),
            sum_ww: T::Acc::zero(),
            sum_fw: T::Acc::zero(),
            sum_ff: T::Acc::zero(),
            sum_f: T::Acc::zero(),
            kern_avg: kernel_sum / kernel_size,
            kern_size: kernel_size,
            norm: T::one(),
        }
    }

    fn fold(&mut self, w: T::Acc, sample: T) {
        let f = sample.to_acc();
        self.sum_w += w;
        self.sum_ww += w * w;
        self.sum_fw += f * w;
        self.sum_ff += f * f;
        self.sum_f += f;
    }
}

impl<T: Sample> Accumulator<T> for CoefficientAccumulator<T> {
    fn reset(&mut self) {
        self.sum_w = T::Acc::zero();
        self.sum_ww = T::Acc::zero();
        self.sum_fw = T::Acc::zero();
        self.sum_ff = T::Acc::zero();
        self.sum_f = T::Acc::zero();
    }

    fn set_norm(&mut self, norm: T) {
        self.norm = norm;
    }

    fn accumulate(&mut self, tap: T, sample: T) {
        self.fold(tap.to_acc() - self.kern_avg, sample);
    }

    fn accumulate_asym(&mut self, tap: T, left: T, right: T) {
        self.fold(tap.to_acc() - self.kern_avg, left);
        self.fold(T::Acc::zero() - tap.to_acc() - self.kern_avg, right);
    }

    fn result(&self) -> T {
        let variance = (self.sum_ff - self.sum_f * self.sum_f / self.kern_size) * self.sum_ww;
        let variance: f64 = num_traits::cast(variance).unwrap_or(0.0);
        if variance <= 0.0 {
            return T::zero();
        }
        let covariance = self.sum_fw - self.sum_f * self.sum_w / self.kern_size;
        let covariance: f64 = num_traits::cast(covariance).unwrap_or(0.0);
        let gamma = covariance / variance.sqrt();
        if T::IS_FLOAT {
            T::from_f64(gamma)
        } else {
            T::from_f64(gamma * self.norm.to_f64())
        }
    }
}

macro_rules! diff_accumulator {
    ($(#[$doc:meta])* $name:ident, $fold:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name<T: Sample> {
            state: T::Acc,
            norm: T,
        }

        impl<T: Sample> Default for $name<T> {
            fn default() -> Self {
                Self {
                    state: T::Acc::zero(),
                    norm: T::one(),
                }
            }
        }

        impl<T: Sample> Accumulator<T> for $name<T> {
            fn reset(&mut self) {
                self.state = T::Acc::zero();
            }

            fn set_norm(&mut self, norm: T) {
                self.norm = norm;
            }

            fn accumulate(&mut self, tap: T, sample: T) {
                let fold: fn(T::Acc, T::Acc) -> T::Acc = $fold;
                self.state = fold(self.state, tap.to_acc() - sample.to_acc());
            }

            fn accumulate_asym(&mut self, tap: T, left: T, right: T) {
                let fold: fn(T::Acc, T::Acc) -> T::Acc = $fold;
                self.state = fold(self.state, tap.to_acc() - left.to_acc());
                // the mirror partner carries the negated tap
                self.state = fold(
                    self.state,
                    T::Acc::zero() - tap.to_acc() - right.to_acc(),
                );
            }

            fn result(&self) -> T {
                T::from_acc(self.norm.to_acc() / (self.state + T::Acc::one()))
            }
        }
    };
}

fn abs_acc<A>(d: A) -> A
where
    A: Zero + PartialOrd + std::ops::Sub<Output = A> + Copy,
{
    if d < A::zero() {
        A::zero() - d
    } else {
        d
    }
}

diff_accumulator!(
    /// Template-matching accumulator: largest absolute tap/sample
    /// difference, mapped to `norm / (state + 1)` so that a perfect match
    /// scores highest.
    MaxAbsDiffAccumulator,
    |state, d| {
        let d = abs_acc(d);
        if d > state {
            d
        } else {
            state
        }
    }
);

diff_accumulator!(
    /// Template-matching accumulator: sum of absolute tap/sample
    /// differences, mapped to `norm / (state + 1)`.
    SumAbsDiffAccumulator,
    |state, d| state + abs_acc(d)
);

diff_accumulator!(
    /// Template-matching accumulator: sum of squared tap/sample
    /// differences, mapped to `norm / (state + 1)`.
    SumSquareDiffAccumulator,
    |state, d| state + d * d
);
