use crate::{
    storage::{check_index, DeviceStorage, TensorError},
    Backend, DeviceError, Shape, TensorDType,
};

#[cfg(feature = "rand")]
use {rand::prelude::*, rand_distr::StandardNormal};

/// Contiguous, resizable element buffer in host memory.
#[derive(Debug, Clone, PartialEq)]
pub struct HostStorage<T: TensorDType> {
    shape: Shape,
    data: Vec<T>,
}

impl<T: TensorDType> HostStorage<T> {
    /// Allocates `shape.numel()` zeroed elements.
    pub fn new(shape: impl Into<Shape>) -> Result<Self, TensorError> {
        let shape = shape.into();
        let numel = shape.validate()?;
        log::debug!(
            "Allocating host storage {:?}: {} bytes",
            shape,
            numel * T::dt().size_of()
        );
        Ok(Self {
            shape,
            data: Self::zeroed(numel)?,
        })
    }

    fn zeroed(numel: usize) -> Result<Vec<T>, TensorError> {
        let mut data = Vec::new();
        data.try_reserve_exact(numel)
            .map_err(|e| DeviceError::AllocationFailed {
                size: (numel as u64).saturating_mul(T::dt().size_of() as u64),
                reason: e.to_string(),
            })?;
        data.resize(numel, T::default());
        Ok(data)
    }

    pub fn from_slice(data: &[T], shape: impl Into<Shape>) -> Result<Self, TensorError> {
        let shape = shape.into();
        let numel = shape.validate()?;
        if data.len() != numel {
            return Err(TensorError::ShapeMismatch {
                lhs: data.len(),
                rhs: numel,
            });
        }
        Ok(Self {
            shape,
            data: data.to_vec(),
        })
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn element_at(&self, index: usize) -> Result<&T, TensorError> {
        check_index(index, self.data.len())?;
        Ok(&self.data[index])
    }

    pub fn element_at_mut(&mut self, index: usize) -> Result<&mut T, TensorError> {
        check_index(index, self.data.len())?;
        Ok(&mut self.data[index])
    }

    /// # Safety
    ///
    /// `index` must be less than [`HostStorage::size`].
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        self.data.get_unchecked(index)
    }

    /// # Safety
    ///
    /// `index` must be less than [`HostStorage::size`].
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        self.data.get_unchecked_mut(index)
    }

    pub fn set_element(&mut self, index: usize, value: T) -> Result<(), TensorError> {
        *self.element_at_mut(index)? = value;
        Ok(())
    }

    /// Reallocates for `shape`, resetting every element to its default.
    ///
    /// The shape is validated first; on error the storage is left untouched.
    pub fn resize(&mut self, shape: impl Into<Shape>) -> Result<(), TensorError> {
        let shape = shape.into();
        let numel = shape.validate()?;
        log::debug!("Resizing host storage {:?} -> {:?}", self.shape, shape);
        self.data = Self::zeroed(numel)?;
        self.shape = shape;
        Ok(())
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.data.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

#[cfg(feature = "rand")]
impl<T: TensorDType + num_traits::Float> HostStorage<T> {
    /// Samples every element from the standard normal distribution.
    pub fn randn(shape: impl Into<Shape>) -> Result<Self, TensorError> {
        let mut storage = Self::new(shape)?;
        let mut rng = rand::thread_rng();
        storage.data.iter_mut().for_each(|x| {
            let sample: f32 = StandardNormal.sample(&mut rng);
            *x = <T as num_traits::NumCast>::from(sample).unwrap_or_else(T::zero);
        });
        Ok(storage)
    }

    /// Samples every element uniformly from `[low, high)`.
    pub fn rand_uniform(shape: impl Into<Shape>, low: T, high: T) -> Result<Self, TensorError> {
        if !(low < high) {
            return Err(TensorError::InvalidArgument(format!(
                "uniform range [{:?}, {:?}) is empty",
                low, high
            )));
        }
        let mut storage = Self::new(shape)?;
        let mut rng = rand::thread_rng();
        storage.data.iter_mut().for_each(|x| {
            let unit = <T as num_traits::NumCast>::from(rng.gen::<f32>()).unwrap_or_else(T::zero);
            *x = low + (high - low) * unit;
        });
        Ok(storage)
    }
}

impl<T: TensorDType> std::ops::Index<usize> for HostStorage<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.data[index]
    }
}

impl<T: TensorDType> std::ops::IndexMut<usize> for HostStorage<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl<'a, T: TensorDType> IntoIterator for &'a HostStorage<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T: TensorDType> IntoIterator for &'a mut HostStorage<T> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T: TensorDType> DeviceStorage<T> for HostStorage<T> {
    fn backend(&self) -> Backend {
        Backend::Host
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn element_at(&self, index: usize) -> Result<T, TensorError> {
        HostStorage::element_at(self, index).copied()
    }

    fn set_element(&mut self, index: usize, value: T) -> Result<(), TensorError> {
        HostStorage::set_element(self, index, value)
    }

    fn resize(&mut self, shape: Shape) -> Result<(), TensorError> {
        HostStorage::resize(self, shape)
    }

    fn to_vec(&self) -> Result<Vec<T>, TensorError> {
        Ok(self.data.clone())
    }

    fn alike(&self, data: &[T], shape: Shape) -> Result<Self, TensorError> {
        Self::from_slice(data, shape)
    }
}
