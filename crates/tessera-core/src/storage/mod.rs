mod accelerator;
mod dynamic;
mod host;

pub use accelerator::*;
pub use dynamic::*;
pub use host::*;

use crate::{Backend, DeviceError, Shape, TensorDType};

#[derive(thiserror::Error, Debug)]
pub enum TensorError {
    #[error("Invalid shape {0:?}: volume must be non-zero")]
    InvalidShape(Shape),
    #[error("Element count mismatch: lhs has {lhs} elements, rhs has {rhs}")]
    ShapeMismatch { lhs: usize, rhs: usize },
    #[error("Shape has {shape} dimensions but strides has {strides}")]
    ShapeStrideLengthMismatch { shape: usize, strides: usize },
    #[error("Expected {expected} indices, got {actual}")]
    IndicesLengthMismatch { expected: usize, actual: usize },
    #[error("Index {index} out of range for bound {bound}")]
    OutOfRange { index: usize, bound: usize },
    /// `max_offset` saturates at `usize::MAX` when the reachable offset overflows.
    #[error("View reaches offset {max_offset} but storage holds {numel} elements")]
    ViewOutOfBounds { max_offset: usize, numel: usize },
    #[error("Division by zero at element {index}")]
    DivisionByZero { index: usize },
    #[error("{op} overflows the element type at element {index}")]
    ArithmeticOverflow { op: String, index: usize },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Failed to initialize accelerator storage: {0}")]
    StorageInitialization(#[source] DeviceError),
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Behaviour shared by every backend a storage can live on.
///
/// Element access is by value because accelerator memory is not addressable from the
/// host; host storage additionally hands out references through its inherent API.
pub trait DeviceStorage<T: TensorDType>: std::fmt::Debug + Sized {
    fn backend(&self) -> Backend;

    fn shape(&self) -> &Shape;

    /// Number of elements currently held, always `shape().numel()`.
    fn size(&self) -> usize;

    fn element_at(&self, index: usize) -> Result<T, TensorError>;

    fn set_element(&mut self, index: usize, value: T) -> Result<(), TensorError>;

    /// Reallocates for `shape` and resets every element to zero.
    fn resize(&mut self, shape: Shape) -> Result<(), TensorError>;

    /// Copies every element to host memory in flat storage order.
    fn to_vec(&self) -> Result<Vec<T>, TensorError>;

    /// Creates a new storage on the same backend holding `data` laid out as `shape`.
    fn alike(&self, data: &[T], shape: Shape) -> Result<Self, TensorError>;
}

#[inline]
pub(crate) fn check_index(index: usize, bound: usize) -> Result<(), TensorError> {
    if index >= bound {
        return Err(TensorError::OutOfRange { index, bound });
    }
    Ok(())
}
