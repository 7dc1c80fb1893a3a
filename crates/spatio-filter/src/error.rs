use spatio_grid::GridError;

/// An error type for the filtering operations.
#[derive(thiserror::Error, Debug)]
pub enum FilterError {
    /// The kernel taps could not be represented in the engine sample type.
    #[error("Kernel cannot be adapted to the requested sample type")]
    UnsupportedKernel,

    /// A masked filter call was issued without a structuring mask.
    #[error("Masked filtering requires a structuring mask")]
    MissingMask,

    /// The structuring mask shape disagrees with the kernel shape.
    #[error("Mask shape ({0}x{1}) does not match the kernel shape ({2}x{3})")]
    MaskShapeMismatch(usize, usize, usize, usize),

    /// Masked filtering is only defined for dense 2-D kernels.
    #[error("Masked filtering requires a dense kernel")]
    MaskRequiresDenseKernel,

    /// Error bubbled up from the grid containers.
    #[error(transparent)]
    Grid(#[from] GridError),
}
