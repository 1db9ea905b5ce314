use crate::{
    rvec,
    storage::{HostStorage, TensorError},
    RVec, Shape, Strides, TensorDType,
};

/// Shape and strides of a view, validated against the storage it was built over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewLayout {
    shape: Shape,
    strides: Strides,
}

impl ViewLayout {
    /// Checks that `shape` and `strides` pair up, that no dimension is empty and that
    /// the furthest reachable offset stays inside a storage of `numel` elements.
    pub fn new(shape: Shape, strides: Strides, numel: usize) -> Result<Self, TensorError> {
        if shape.len() != strides.len() {
            return Err(TensorError::ShapeStrideLengthMismatch {
                shape: shape.len(),
                strides: strides.len(),
            });
        }
        shape.validate()?;
        match strides.max_offset(&shape) {
            Some(max_offset) if max_offset < numel => {}
            max_offset => {
                return Err(TensorError::ViewOutOfBounds {
                    max_offset: max_offset.unwrap_or(usize::MAX),
                    numel,
                })
            }
        }
        Ok(Self { shape, strides })
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn strides(&self) -> &Strides {
        &self.strides
    }

    /// `Σ indices[i] * strides[i]`, after checking every index against its dimension.
    pub fn offset(&self, indices: &[usize]) -> Result<usize, TensorError> {
        if indices.len() != self.shape.len() {
            return Err(TensorError::IndicesLengthMismatch {
                expected: self.shape.len(),
                actual: indices.len(),
            });
        }
        let mut offset = 0;
        for ((&index, &dim), &stride) in indices
            .iter()
            .zip(self.shape.iter())
            .zip(self.strides.iter())
        {
            if index >= dim {
                return Err(TensorError::OutOfRange { index, bound: dim });
            }
            offset += index * stride;
        }
        Ok(offset)
    }

    /// Swaps two axes; no data moves.
    pub fn transpose(mut self, a: usize, b: usize) -> Result<Self, TensorError> {
        let rank = self.shape.rank();
        for axis in [a, b] {
            if axis >= rank {
                return Err(TensorError::OutOfRange {
                    index: axis,
                    bound: rank,
                });
            }
        }
        self.shape.swap(a, b);
        self.strides.swap(a, b);
        Ok(self)
    }

    /// Flat offsets in logical row-major order.
    pub fn offsets(&self) -> Offsets<'_> {
        Offsets {
            layout: self,
            index: rvec![0; self.shape.rank()],
            remaining: self.shape.numel(),
        }
    }
}

/// Iterator over the flat storage offsets a layout visits, last axis fastest.
pub struct Offsets<'a> {
    layout: &'a ViewLayout,
    index: RVec<usize>,
    remaining: usize,
}

impl Iterator for Offsets<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let offset = self
            .index
            .iter()
            .zip(self.layout.strides.iter())
            .map(|(i, s)| i * s)
            .sum();
        for axis in (0..self.index.len()).rev() {
            self.index[axis] += 1;
            if self.index[axis] < self.layout.shape[axis] {
                break;
            }
            self.index[axis] = 0;
        }
        Some(offset)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Offsets<'_> {}

/// Read-only strided window over a [`HostStorage`].
///
/// The view borrows the storage, so it cannot outlive it, and the storage cannot be
/// resized while the view exists.
#[derive(Debug, Clone)]
pub struct TensorView<'a, T: TensorDType> {
    storage: &'a HostStorage<T>,
    layout: ViewLayout,
}

impl<'a, T: TensorDType> TensorView<'a, T> {
    pub fn new(
        storage: &'a HostStorage<T>,
        shape: impl Into<Shape>,
        strides: impl Into<Strides>,
    ) -> Result<Self, TensorError> {
        let layout = ViewLayout::new(shape.into(), strides.into(), storage.size())?;
        Ok(Self { storage, layout })
    }

    /// Row-major view matching the storage's own shape.
    pub fn contiguous(storage: &'a HostStorage<T>) -> Result<Self, TensorError> {
        let shape = storage.shape().clone();
        let strides = Strides::from(&shape);
        Self::new(storage, shape, strides)
    }

    pub fn get(&self, indices: &[usize]) -> Result<&T, TensorError> {
        let offset = self.layout.offset(indices)?;
        self.storage.element_at(offset)
    }

    pub fn shape(&self) -> &Shape {
        self.layout.shape()
    }

    pub fn strides(&self) -> &Strides {
        self.layout.strides()
    }

    pub fn layout(&self) -> &ViewLayout {
        &self.layout
    }

    pub fn storage(&self) -> &HostStorage<T> {
        self.storage
    }

    pub fn transpose(self, a: usize, b: usize) -> Result<Self, TensorError> {
        Ok(Self {
            storage: self.storage,
            layout: self.layout.transpose(a, b)?,
        })
    }

    /// Elements in logical row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let data = self.storage.as_slice();
        self.layout.offsets().map(move |offset| &data[offset])
    }

    /// Gathers the view into a new contiguous storage of the view's shape.
    pub fn to_storage(&self) -> Result<HostStorage<T>, TensorError> {
        let data = self.iter().copied().collect::<Vec<_>>();
        HostStorage::from_slice(&data, self.shape().clone())
    }
}

impl<T: TensorDType, const N: usize> std::ops::Index<[usize; N]> for TensorView<'_, T> {
    type Output = T;

    fn index(&self, indices: [usize; N]) -> &Self::Output {
        match self.get(&indices) {
            Ok(value) => value,
            Err(e) => panic!("{}", e),
        }
    }
}

/// Read-write strided window over a [`HostStorage`]. Writes land in the storage.
#[derive(Debug)]
pub struct TensorViewMut<'a, T: TensorDType> {
    storage: &'a mut HostStorage<T>,
    layout: ViewLayout,
}

impl<'a, T: TensorDType> TensorViewMut<'a, T> {
    pub fn new(
        storage: &'a mut HostStorage<T>,
        shape: impl Into<Shape>,
        strides: impl Into<Strides>,
    ) -> Result<Self, TensorError> {
        let layout = ViewLayout::new(shape.into(), strides.into(), storage.size())?;
        Ok(Self { storage, layout })
    }

    pub fn contiguous(storage: &'a mut HostStorage<T>) -> Result<Self, TensorError> {
        let shape = storage.shape().clone();
        let strides = Strides::from(&shape);
        Self::new(storage, shape, strides)
    }

    pub fn get(&self, indices: &[usize]) -> Result<&T, TensorError> {
        let offset = self.layout.offset(indices)?;
        self.storage.element_at(offset)
    }

    pub fn get_mut(&mut self, indices: &[usize]) -> Result<&mut T, TensorError> {
        let offset = self.layout.offset(indices)?;
        self.storage.element_at_mut(offset)
    }

    pub fn set(&mut self, indices: &[usize], value: T) -> Result<(), TensorError> {
        *self.get_mut(indices)? = value;
        Ok(())
    }

    pub fn shape(&self) -> &Shape {
        self.layout.shape()
    }

    pub fn strides(&self) -> &Strides {
        self.layout.strides()
    }

    pub fn transpose(self, a: usize, b: usize) -> Result<Self, TensorError> {
        Ok(Self {
            storage: self.storage,
            layout: self.layout.transpose(a, b)?,
        })
    }

    /// Reborrows as a read-only view with the same layout.
    pub fn as_view(&self) -> TensorView<'_, T> {
        TensorView {
            storage: &*self.storage,
            layout: self.layout.clone(),
        }
    }

    /// Applies `f` to every element the view reaches, in logical order.
    ///
    /// Layouts that reach the same offset more than once apply `f` that many times.
    pub fn map_inplace(&mut self, f: impl Fn(T) -> T) {
        let data = self.storage.as_mut_slice();
        for offset in self.layout.offsets() {
            data[offset] = f(data[offset]);
        }
    }
}

impl<T: TensorDType, const N: usize> std::ops::Index<[usize; N]> for TensorViewMut<'_, T> {
    type Output = T;

    fn index(&self, indices: [usize; N]) -> &Self::Output {
        match self.get(&indices) {
            Ok(value) => value,
            Err(e) => panic!("{}", e),
        }
    }
}

impl<T: TensorDType, const N: usize> std::ops::IndexMut<[usize; N]> for TensorViewMut<'_, T> {
    fn index_mut(&mut self, indices: [usize; N]) -> &mut Self::Output {
        match self.get_mut(&indices) {
            Ok(value) => value,
            Err(e) => panic!("{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{shape, strides};

    fn one_to_six() -> HostStorage<f64> {
        HostStorage::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], shape![2, 3]).unwrap()
    }

    #[test]
    fn access_and_write_through() {
        let mut storage = one_to_six();
        {
            let mut view = TensorViewMut::new(&mut storage, shape![2, 3], strides![3, 1]).unwrap();
            assert_eq!(view[[0, 0]], 1.0);
            assert_eq!(view[[0, 1]], 2.0);
            assert_eq!(view[[0, 2]], 3.0);
            assert_eq!(view[[1, 0]], 4.0);
            assert_eq!(view[[1, 1]], 5.0);
            assert_eq!(view[[1, 2]], 6.0);
            view[[1, 1]] = 99.0;
        }
        assert_eq!(storage[4], 99.0);
    }

    #[test]
    fn repeated_reads_agree() {
        let storage = one_to_six();
        let view = TensorView::contiguous(&storage).unwrap();
        assert_eq!(view.get(&[1, 2]).unwrap(), view.get(&[1, 2]).unwrap());
    }

    #[test]
    fn invalid_indices() {
        let storage = one_to_six();
        let view = TensorView::new(&storage, shape![2, 3], strides![3, 1]).unwrap();
        assert!(matches!(
            view.get(&[2, 0]),
            Err(TensorError::OutOfRange { index: 2, bound: 2 })
        ));
        assert!(matches!(
            view.get(&[0]),
            Err(TensorError::IndicesLengthMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn bounds_checked_at_construction() {
        let storage = one_to_six();
        assert!(TensorView::new(&storage, shape![2, 3], strides![3, 1]).is_ok());
        assert!(matches!(
            TensorView::new(&storage, shape![3, 3], strides![3, 1]),
            Err(TensorError::ViewOutOfBounds {
                max_offset: 8,
                numel: 6
            })
        ));

        let short = HostStorage::<f64>::new(shape![5]).unwrap();
        assert!(matches!(
            TensorView::new(&short, shape![2, 3], strides![3, 1]),
            Err(TensorError::ViewOutOfBounds { .. })
        ));
    }

    #[test]
    fn overflowing_strides_are_out_of_bounds() {
        let storage = HostStorage::<f32>::new(shape![1]).unwrap();
        assert!(matches!(
            TensorView::new(&storage, shape![3], strides![usize::MAX / 2 + 1]),
            Err(TensorError::ViewOutOfBounds {
                max_offset: usize::MAX,
                numel: 1
            })
        ));

        let mut storage = HostStorage::<f32>::new(shape![4]).unwrap();
        assert!(matches!(
            TensorViewMut::new(&mut storage, shape![2, 2], strides![usize::MAX / 2, 1]),
            Err(TensorError::ViewOutOfBounds { .. })
        ));
    }

    #[test]
    fn shape_and_strides_must_pair_up() {
        let storage = one_to_six();
        assert!(matches!(
            TensorView::new(&storage, shape![2, 3], strides![1]),
            Err(TensorError::ShapeStrideLengthMismatch {
                shape: 2,
                strides: 1
            })
        ));
        assert!(matches!(
            TensorView::new(&storage, shape![0, 3], strides![3, 1]),
            Err(TensorError::InvalidShape(_))
        ));
    }

    #[test]
    fn transpose_swaps_layout_without_copying() {
        let storage = one_to_six();
        let view = TensorView::contiguous(&storage).unwrap().transpose(0, 1).unwrap();
        assert_eq!(view.shape(), &shape![3, 2]);
        assert_eq!(view.strides(), &strides![1, 3]);
        assert_eq!(view[[2, 1]], 6.0);
        let gathered = view.iter().copied().collect::<Vec<_>>();
        assert_eq!(gathered, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert!(TensorView::contiguous(&storage)
            .unwrap()
            .transpose(0, 2)
            .is_err());
    }

    #[test]
    fn broadcast_row_with_zero_stride() {
        let storage = HostStorage::from_slice(&[1, 2, 3], shape![3]).unwrap();
        let view = TensorView::new(&storage, shape![2, 3], strides![0, 1]).unwrap();
        let copy = view.to_storage().unwrap();
        assert_eq!(copy.as_slice(), &[1, 2, 3, 1, 2, 3]);
        assert_eq!(copy.shape(), &shape![2, 3]);
    }

    #[test]
    fn column_slice_map_inplace() {
        let mut storage = one_to_six();
        let mut column = TensorViewMut::new(&mut storage, shape![2], strides![3]).unwrap();
        column.map_inplace(|x| x * 10.0);
        assert_eq!(column.as_view().iter().copied().collect::<Vec<_>>(), vec![10.0, 40.0]);
        assert_eq!(storage.as_slice(), &[10.0, 2.0, 3.0, 40.0, 5.0, 6.0]);
    }
}
