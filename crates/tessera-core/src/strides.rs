use crate::{rvec, RVec, Shape};

/// Per-dimension step, in elements, used to turn a multi-dimensional index into a
/// flat offset.
#[derive(Clone, PartialEq, Eq, Default, Hash)]
pub struct Strides(RVec<usize>);

impl Strides {
    pub fn new(strides: RVec<usize>) -> Self {
        Self(strides)
    }

    pub fn inner(&self) -> &RVec<usize> {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.0.to_vec()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &usize> {
        self.0.iter()
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        self.0.swap(a, b);
    }

    /// Largest flat offset any in-range index can reach: `Σ (shape[i]-1) * strides[i]`.
    ///
    /// `None` when the offset does not fit in a `usize`. Dimensions of size zero
    /// contribute nothing; callers reject them separately.
    pub fn max_offset(&self, shape: &Shape) -> Option<usize> {
        shape
            .iter()
            .zip(self.0.iter())
            .try_fold(0usize, |acc, (&dim, &stride)| {
                acc.checked_add(dim.saturating_sub(1).checked_mul(stride)?)
            })
    }
}

impl std::fmt::Debug for Strides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut shape = format!("[{}", self.0.first().unwrap_or(&0));
        for dim in self.0.iter().skip(1) {
            shape.push_str(&format!("x{}", dim));
        }
        write!(f, "{}]", shape)
    }
}

impl std::ops::Index<usize> for Strides {
    type Output = usize;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

/// Row-major (C order) strides for a contiguous buffer of `shape`.
impl From<&Shape> for Strides {
    fn from(shape: &Shape) -> Self {
        let mut strides = rvec![];
        let mut stride = 1;
        for size in shape.inner().iter().rev() {
            strides.push(stride);
            stride *= *size;
        }
        strides.reverse();
        Self(strides)
    }
}

impl From<Vec<usize>> for Strides {
    fn from(strides: Vec<usize>) -> Self {
        Self(strides.into())
    }
}

impl From<&[usize]> for Strides {
    fn from(slice: &[usize]) -> Self {
        Self(slice.into())
    }
}

impl<const N: usize> From<[usize; N]> for Strides {
    fn from(arr: [usize; N]) -> Self {
        Self(arr.iter().copied().collect())
    }
}
