use crate::{HostStorage, TensorDType, TensorError, TensorView};
use ndarray::{ArrayD, IxDyn};

impl<T: TensorDType> HostStorage<T> {
    /// Copies the storage into an owned `ndarray` array of the same shape.
    pub fn to_ndarray(&self) -> Result<ArrayD<T>, TensorError> {
        ArrayD::from_shape_vec(IxDyn(&self.shape().to_vec()), self.as_slice().to_vec())
            .map_err(|e| TensorError::InvalidArgument(e.to_string()))
    }

    pub fn from_ndarray(array: &ArrayD<T>) -> Result<Self, TensorError> {
        let data = array.iter().copied().collect::<Vec<_>>();
        HostStorage::from_slice(&data, array.shape())
    }
}

impl<T: TensorDType> TensorView<'_, T> {
    /// Gathers the view, in logical order, into an owned array of the view's shape.
    pub fn to_ndarray(&self) -> Result<ArrayD<T>, TensorError> {
        ArrayD::from_shape_vec(
            IxDyn(&self.shape().to_vec()),
            self.iter().copied().collect(),
        )
        .map_err(|e| TensorError::InvalidArgument(e.to_string()))
    }
}
