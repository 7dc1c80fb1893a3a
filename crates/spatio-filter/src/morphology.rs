//! Morphological erosion and dilation.
//!
//! Both operators ride the filtering engines with min/max-style
//! accumulators instead of sums. Taps equal to zero are inactive; the
//! nonzero taps form the structuring element over the kernel rectangle.
//! Dilation reuses the erosion scaffolding with the structuring element
//! pre-mirrored and the dual accumulators.
//!
//! Three modes per operator:
//! - binary: hit-or-miss test against zero samples, scoring `norm`;
//! - gray flat: running min/max of the samples under the active taps;
//! - gray non-flat: running min/max of sample -/+ tap.

use num_traits::{Bounded, One, Zero};

use crate::accumulator::Accumulator;
use crate::adapter::{AnyKernel1D, AnyKernel2D, KernelElement};
use crate::border::BorderType;
use crate::error::FilterError;
use crate::filter1d::FilterEngine1D;
use crate::filter2d::FilterEngine2D;
use crate::kernel::{Kernel1D, Kernel2D};
use spatio_grid::{Matrix, Sample, Vector};

/// How samples combine under the structuring element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphMode {
    /// Hit-or-miss test for binary images.
    Binary,
    /// Flat structuring element over gray values.
    GrayFlat,
    /// Non-flat structuring element: the tap value offsets the sample.
    GrayNonFlat,
}

/// Shapes for generated structuring masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskShape {
    /// Every position active.
    Rect,
    /// Center row and center column active.
    Cross,
    /// Elliptic footprint inscribed in the rectangle.
    Ellipse,
}

/// Generate a structuring mask for use with
/// [`FilterEngine2D::apply_mask`].
pub fn mask_shape(shape: MaskShape, rows: usize, cols: usize) -> Matrix<u8> {
    let cy = rows / 2;
    let cx = cols / 2;
    let mut mask = Matrix::from_size_val(rows, cols, 0u8);
    for r in 0..rows {
        for c in 0..cols {
            let active = match shape {
                MaskShape::Rect => true,
                MaskShape::Cross => r == cy || c == cx,
                MaskShape::Ellipse => {
                    let dy = (r as f64 - cy as f64) / (rows as f64 / 2.0);
                    let dx = (c as f64 - cx as f64) / (cols as f64 / 2.0);
                    dx * dx + dy * dy <= 1.0
                }
            };
            if active {
                mask[(r, c)] = 1;
            }
        }
    }
    mask
}

/// A flat rectangular structuring element: all taps one, centered origin,
/// norm primed with the sample type's suggested norm so that binary
/// results score full scale.
pub fn structuring_element<T: Sample>(rows: usize, cols: usize) -> Kernel2D<T> {
    Kernel2D::centered(
        Matrix::from_size_val(rows, cols, T::one()),
        T::suggested_norm(),
    )
}

/// 1-D flat structuring element with a centered origin.
pub fn structuring_element_1d<T: Sample>(len: usize) -> Kernel1D<T> {
    Kernel1D::centered(vec![T::one(); len], T::suggested_norm())
}

/// Erosion operator.
#[derive(Debug, Clone, Copy)]
pub struct Erosion {
    /// Sample-combination mode.
    pub mode: MorphMode,
    /// Boundary-extension rule applied at the data edges.
    pub boundary: BorderType,
}

impl Erosion {
    /// Create an erosion operator.
    pub fn new(mode: MorphMode, boundary: BorderType) -> Self {
        Self { mode, boundary }
    }

    /// Erode a vector with a 1-D structuring element.
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
        match self.mode {
            MorphMode::Binary => {
                let engine =
                    FilterEngine1D::from_any(kernel, false, ErodeBinaryAccumulator::<T>::default())?;
                engine.apply(src, dst, self.boundary);
            }
            MorphMode::GrayFlat => {
                let engine =
                    FilterEngine1D::from_any(kernel, false, ErodeFlatAccumulator::<T>::default())?;
                engine.apply(src, dst, self.boundary);
            }
            MorphMode::GrayNonFlat => {
                let engine =
                    FilterEngine1D::from_any(kernel, false, ErodeGrayAccumulator::<T>::default())?;
                engine.apply(src, dst, self.boundary);
            }
        }
        Ok(())
    }

    /// Erode a matrix with a 2-D structuring element.
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
            MorphMode::Binary => {
                let engine =
                    FilterEngine2D::from_any(kernel, false, ErodeBinaryAccumulator::<T>::default())?;
                engine.apply(src, dst, self.boundary);
            }
            MorphMode::GrayFlat => {
                let engine =
                    FilterEngine2D::from_any(kernel, false, ErodeFlatAccumulator::<T>::default())?;
                engine.apply(src, dst, self.boundary);
            }
            MorphMode::GrayNonFlat => {
                let engine =
                    FilterEngine2D::from_any(kernel, false, ErodeGrayAccumulator::<T>::default())?;
                engine.apply(src, dst, self.boundary);
            }
        }
        Ok(())
    }
}

/// Dilation operator.
#[derive(Debug, Clone, Copy)]
pub struct Dilation {
    /// Sample-combination mode.
    pub mode: MorphMode,
    /// Boundary-extension rule applied at the data edges.
    pub boundary: BorderType,
}

impl Dilation {
    /// Create a dilation operator.
    pub fn new(mode: MorphMode, boundary: BorderType) -> Self {
        Self { mode, boundary }
    }

    /// Dilate a vector with a 1-D structuring element.
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
        // the structuring element is mirrored for dilation
        match self.mode {
            MorphMode::Binary => {
                let engine =
                    FilterEngine1D::from_any(kernel, true, DilateBinaryAccumulator::<T>::default())?;
                engine.apply(src, dst, self.boundary);
            }
            MorphMode::GrayFlat => {
                let engine =
                    FilterEngine1D::from_any(kernel, true, DilateFlatAccumulator::<T>::default())?;
                engine.apply(src, dst, self.boundary);
            }
            MorphMode::GrayNonFlat => {
                let engine =
                    FilterEngine1D::from_any(kernel, true, DilateGrayAccumulator::<T>::default())?;
                engine.apply(src, dst, self.boundary);
            }
        }
        Ok(())
    }

    /// Dilate a matrix with a 2-D structuring element.
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
            MorphMode::Binary => {
                let engine =
                    FilterEngine2D::from_any(kernel, true, DilateBinaryAccumulator::<T>::default())?;
                engine.apply(src, dst, self.boundary);
            }
            MorphMode::GrayFlat => {
                let engine =
                    FilterEngine2D::from_any(kernel, true, DilateFlatAccumulator::<T>::default())?;
                engine.apply(src, dst, self.boundary);
            }
            MorphMode::GrayNonFlat => {
                let engine =
                    FilterEngine2D::from_any(kernel, true, DilateGrayAccumulator::<T>::default())?;
                engine.apply(src, dst, self.boundary);
            }
        }
        Ok(())
    }
}

/// Binary erosion accumulator: scores `norm` while every sample under an
/// active tap is nonzero, zero from the first active miss.
#[derive(Debug, Clone)]
pub struct ErodeBinaryAccumulator<T: Sample> {
    state: T,
    norm: T,
}

impl<T: Sample> Default for ErodeBinaryAccumulator<T> {
    fn default() -> Self {
        Self {
            state: T::one(),
            norm: T::one(),
        }
    }
}

impl<T: Sample> Accumulator<T> for ErodeBinaryAccumulator<T> {
    fn reset(&mut self) {
        self.state = self.norm;
    }

    fn set_norm(&mut self, norm: T) {
        self.norm = norm;
    }

    fn accumulate(&mut self, tap: T, sample: T) {
        if !tap.to_acc().is_zero() && sample.to_acc().is_zero() {
            self.state = T::zero();
        }
    }

    fn accumulate_asym(&mut self, tap: T, left: T, right: T) {
        self.accumulate(tap, left);
        self.accumulate(tap, right);
    }

    fn result(&self) -> T {
        self.state
    }
}

/// Binary dilation accumulator: scores `norm` as soon as any sample under
/// an active tap is nonzero.
#[derive(Debug, Clone)]
pub struct DilateBinaryAccumulator<T: Sample> {
    state: T,
    norm: T,
}

impl<T: Sample> Default for DilateBinaryAccumulator<T> {
    fn default() -> Self {
        Self {
            state: T::zero(),
            norm: T::one(),
        }
    }
}

impl<T: Sample> Accumulator<T> for DilateBinaryAccumulator<T> {
    fn reset(&mut self) {
        self.state = T::zero();
    }

    fn set_norm(&mut self, norm: T) {
        self.norm = norm;
    }

    fn accumulate(&mut self, tap: T, sample: T) {
        if !tap.to_acc().is_zero() && !sample.to_acc().is_zero() {
            self.state = self.norm;
        }
    }

    fn accumulate_asym(&mut self, tap: T, left: T, right: T) {
        self.accumulate(tap, left);
        self.accumulate(tap, right);
    }

    fn result(&self) -> T {
        self.state
    }
}

/// Gray erosion accumulator for flat structuring elements: running
/// minimum of the samples under the active taps.
#[derive(Debug, Clone)]
pub struct ErodeFlatAccumulator<T: Sample> {
    state: T,
}

impl<T: Sample> Default for ErodeFlatAccumulator<T> {
    fn default() -> Self {
        Self {
            state: T::max_value(),
        }
    }
}

impl<T: Sample> Accumulator<T> for ErodeFlatAccumulator<T> {
    fn reset(&mut self) {
        self.state = T::max_value();
    }

    fn set_norm(&mut self, _norm: T) {}

    fn accumulate(&mut self, tap: T, sample: T) {
        if !tap.to_acc().is_zero() && sample < self.state {
            self.state = sample;
        }
    }

    fn accumulate_asym(&mut self, tap: T, left: T, right: T) {
        self.accumulate(tap, left);
        self.accumulate(tap, right);
    }

    fn result(&self) -> T {
        self.state
    }
}

/// Gray dilation accumulator for flat structuring elements: running
/// maximum of the samples under the active taps.
#[derive(Debug, Clone)]
pub struct DilateFlatAccumulator<T: Sample> {
    state: T,
}

impl<T: Sample> Default for DilateFlatAccumulator<T> {
    fn default() -> Self {
        Self {
            state: T::min_value(),
        }
    }
}

impl<T: Sample> Accumulator<T> for DilateFlatAccumulator<T> {
    fn reset(&mut self) {
        self.state = T::min_value();
    }

    fn set_norm(&mut self, _norm: T) {}

    fn accumulate(&mut self, tap: T, sample: T) {
        if !tap.to_acc().is_zero() && sample > self.state {
            self.state = sample;
        }
    }

    fn accumulate_asym(&mut self, tap: T, left: T, right: T) {
        self.accumulate(tap, left);
        self.accumulate(tap, right);
    }

    fn result(&self) -> T {
        self.state
    }
}

/// Gray erosion accumulator for non-flat structuring elements: running
/// minimum of sample minus tap, widened and saturated back into the
/// sample range.
#[derive(Debug, Clone)]
pub struct ErodeGrayAccumulator<T: Sample> {
    state: T::Acc,
}

impl<T: Sample> Default for ErodeGrayAccumulator<T> {
    fn default() -> Self {
        Self {
            state: T::Acc::max_value(),
        }
    }
}

impl<T: Sample> Accumulator<T> for ErodeGrayAccumulator<T> {
    fn reset(&mut self) {
        self.state = T::Acc::max_value();
    }

    fn set_norm(&mut self, _norm: T) {}

    fn accumulate(&mut self, tap: T, sample: T) {
        if !tap.to_acc().is_zero() {
            let v = sample.to_acc() - tap.to_acc();
            if v < self.state {
                self.state = v;
            }
        }
    }

    fn accumulate_asym(&mut self, tap: T, left: T, right: T) {
        if !tap.to_acc().is_zero() {
            // the mirror partner carries the negated tap
            let l = left.to_acc() - tap.to_acc();
            if l < self.state {
                self.state = l;
            }
            let r = right.to_acc() + tap.to_acc();
            if r < self.state {
                self.state = r;
            }
        }
    }

    fn result(&self) -> T {
        T::from_acc(self.state)
    }
}

/// Gray dilation accumulator for non-flat structuring elements: running
/// maximum of sample plus tap, widened and saturated back into the
/// sample range.
#[derive(Debug, Clone)]
pub struct DilateGrayAccumulator<T: Sample> {
    state: T::Acc,
}

impl<T: Sample> Default for DilateGrayAccumulator<T> {
    fn default() -> Self {
        Self {
            state: T::Acc::min_value(),
        }
    }
}

impl<T: Sample> Accumulator<T> for DilateGrayAccumulator<T> {
    fn reset(&mut self) {
        self.state = T::Acc::min_value();
    }

    fn set_norm(&mut self, _norm: T) {}

    fn accumulate(&mut self, tap: T, sample: T) {
        if !tap.to_acc().is_zero() {
            let v = sample.to_acc() + tap.to_acc();
            if v > self.state {
                self.state = v;
            }
        }
    }

    fn accumulate_asym(&mut self, tap: T, left: T, right: T) {
        if !tap.to_acc().is_zero() {
            let l = left.to_acc() + tap.to_acc();
            if l > self.state {
                self.state = l;
            }
            let r = right.to_acc() - tap.to_acc();
            if r > self.state {
                self.state = r;
            }
        }
    }

    fn result(&self) -> T {
        T::from_acc(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cross_image() -> Matrix<u8> {
        #[rustfmt::skip]
        let data = vec![
            0u8, 0,   0,   0,   0,
            0,   0,   255, 0,   0,
            0,   255, 255, 255, 0,
            0,   0,   255, 0,   0,
            0,   0,   0,   0,   0,
        ];
        Matrix::new(5, 5, data).unwrap()
    }

    #[test]
    fn test_binary_erosion_keeps_only_full_neighborhoods() -> Result<(), FilterError> {
        let se: AnyKernel2D = structuring_element::<u8>(3, 3).into();
        let erosion = Erosion::new(MorphMode::Binary, BorderType::Zero);

        let src = Matrix::from_size_val(5, 5, 255u8);
        let mut dst = Matrix::default();
        erosion.apply_2d(&se, &src, &mut dst)?;
        // interior windows are fully set; edge windows fall outside the
        // image and their missing samples are skipped, not counted as zero
        assert_eq!(dst.as_slice(), &[255u8; 25]);

        let src = cross_image();
        let mut dst = Matrix::default();
        erosion.apply_2d(&se, &src, &mut dst)?;
        // no 3x3 neighborhood of the cross is fully set
        assert_eq!(dst.as_slice(), &[0u8; 25]);
        Ok(())
    }

    #[test]
    fn test_binary_dilation_grows_the_cross() -> Result<(), FilterError> {
        let se: AnyKernel2D = structuring_element::<u8>(3, 3).into();
        let dilation = Dilation::new(MorphMode::Binary, BorderType::Zero);

        let src = cross_image();
        let mut dst = Matrix::default();
        dilation.apply_2d(&se, &src, &mut dst)?;

        #[rustfmt::skip]
        let expected = [
            0u8, 255, 255, 255, 0,
            255, 255, 255, 255, 255,
            255, 255, 255, 255, 255,
            255, 255, 255, 255, 255,
            0,   255, 255, 255, 0,
        ];
        assert_eq!(dst.as_slice(), &expected);
        Ok(())
    }

    #[test]
    fn test_gray_flat_erosion_is_local_min() -> Result<(), FilterError> {
        let se: AnyKernel1D = structuring_element_1d::<u8>(3).into();
        let erosion = Erosion::new(MorphMode::GrayFlat, BorderType::Constant);

        let src = Vector::new(vec![5u8, 9, 3, 7, 8]);
        let mut dst = Vector::default();
        erosion.apply_1d(&se, &src, &mut dst)?;
        assert_eq!(dst.as_slice(), &[5, 3, 3, 3, 7]);
        Ok(())
    }

    #[test]
    fn test_gray_flat_dilation_is_local_max() -> Result<(), FilterError> {
        let se: AnyKernel1D = structuring_element_1d::<u8>(3).into();
        let dilation = Dilation::new(MorphMode::GrayFlat, BorderType::Constant);

        let src = Vector::new(vec![5u8, 9, 3, 7, 8]);
        let mut dst = Vector::default();
        dilation.apply_1d(&se, &src, &mut dst)?;
        assert_eq!(dst.as_slice(), &[9, 9, 9, 8, 8]);
        Ok(())
    }

    #[test]
    fn test_gray_non_flat_offsets_by_tap() -> Result<(), FilterError> {
        // taps [2, 2, 2]: erosion subtracts the tap from each candidate
        let se: AnyKernel1D = Kernel1D::centered(vec![2u8, 2, 2], 1).into();
        let erosion = Erosion::new(MorphMode::GrayNonFlat, BorderType::Constant);

        let src = Vector::new(vec![5u8, 9, 3, 7, 8]);
        let mut dst = Vector::default();
        erosion.apply_1d(&se, &src, &mut dst)?;
        assert_eq!(dst.as_slice(), &[3, 1, 1, 1, 5]);
        Ok(())
    }

    #[test]
    fn test_erosion_zero_boundary_skips_missing_samples() -> Result<(), FilterError> {
        // under the skip interpretation, Zero behaves like NoBoundary at
        // the edges for morphological accumulators: the out-of-range
        // samples do not inject zeros into the minimum
        let se: AnyKernel1D = structuring_element_1d::<u8>(3).into();
        let erosion = Erosion::new(MorphMode::GrayFlat, BorderType::Zero);

        let src = Vector::new(vec![200u8, 200, 200]);
        let mut dst = Vector::default();
        erosion.apply_1d(&se, &src, &mut dst)?;
        assert_eq!(dst.as_slice(), &[200, 200, 200]);
        Ok(())
    }

    #[test]
    fn test_erosion_dilation_duality_on_complement() -> Result<(), FilterError> {
        // dilate(x) == 255 - erode(255 - x) for a symmetric flat SE
        let se: AnyKernel2D = structuring_element::<u8>(3, 3).into();
        let src = cross_image();

        let mut dilated = Matrix::default();
        Dilation::new(MorphMode::GrayFlat, BorderType::Constant)
            .apply_2d(&se, &src, &mut dilated)?;

        let complement =
            Matrix::new(5, 5, src.as_slice().iter().map(|&v| 255 - v).collect()).unwrap();
        let mut eroded = Matrix::default();
        Erosion::new(MorphMode::GrayFlat, BorderType::Constant)
            .apply_2d(&se, &complement, &mut eroded)?;

        for (d, e) in dilated.as_slice().iter().zip(eroded.as_slice()) {
            assert_eq!(*d, 255 - *e);
        }
        Ok(())
    }

    #[test]
    fn test_mask_shapes() {
        let rect = mask_shape(MaskShape::Rect, 3, 3);
        assert!(rect.as_slice().iter().all(|&v| v == 1));

        let cross = mask_shape(MaskShape::Cross, 3, 3);
        #[rustfmt::skip]
        assert_eq!(cross.as_slice(), &[
            0, 1, 0,
            1, 1, 1,
            0, 1, 0,
        ]);

        let ellipse = mask_shape(MaskShape::Ellipse, 5, 5);
        assert_eq!(ellipse[(2, 2)], 1);
        assert_eq!(ellipse[(0, 0)], 0);
    }
}
