/// An error type for the grid containers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    /// Error when the data length does not match the requested shape.
    #[error("Data length ({0}) does not match the grid size ({1})")]
    InvalidLength(usize, usize),
}
