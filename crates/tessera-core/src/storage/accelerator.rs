use crate::{
    gpu::WgpuDevice,
    storage::{check_index, DeviceStorage, TensorError},
    Backend, Device, DeviceError, DeviceRequest, Shape, TensorDType,
};

use std::marker::PhantomData;

/// Element buffer resident in accelerator memory.
///
/// Elements are only reachable through blocking transfers, so reads return values
/// rather than references. The device buffer is owned exclusively and released when
/// the storage is dropped or replaced by a resize.
pub struct AcceleratorStorage<T: TensorDType> {
    shape: Shape,
    buffer: wgpu::Buffer,
    device: WgpuDevice,
    _dtype: PhantomData<T>,
}

impl<T: TensorDType> std::fmt::Debug for AcceleratorStorage<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceleratorStorage")
            .field("shape", &self.shape)
            .field("dtype", &T::dt())
            .field("device", &self.device)
            .field("bytes", &self.buffer.size())
            .finish()
    }
}

impl<T: TensorDType> AcceleratorStorage<T> {
    /// Acquires a fresh device context and allocates `shape.numel()` zeroed elements.
    pub fn new(shape: impl Into<Shape>) -> Result<Self, TensorError> {
        Self::request(shape, DeviceRequest::Accelerator)
    }

    /// Like [`AcceleratorStorage::new`], acquiring the device described by `request`.
    pub fn request(shape: impl Into<Shape>, request: DeviceRequest) -> Result<Self, TensorError> {
        let shape = shape.into();
        shape.validate()?;
        let device = Device::request_device(request).map_err(TensorError::StorageInitialization)?;
        let device = device
            .try_accelerator()
            .map_err(TensorError::StorageInitialization)?;
        Self::on_device(shape, device)
    }

    /// Allocates on an already acquired device, sharing its context and queue.
    pub fn on_device(shape: impl Into<Shape>, device: &WgpuDevice) -> Result<Self, TensorError> {
        let shape = shape.into();
        let numel = shape.validate()?;
        log::debug!(
            "Allocating accelerator storage {:?} on {}",
            shape,
            device.info().device_identifier()
        );
        let buffer = Self::byte_len(numel)
            .and_then(|n_bytes| device.allocate_buffer(n_bytes))
            .map_err(TensorError::StorageInitialization)?;
        Ok(Self {
            shape,
            buffer,
            device: device.clone(),
            _dtype: PhantomData,
        })
    }

    pub fn from_slice(
        data: &[T],
        shape: impl Into<Shape>,
        device: &WgpuDevice,
    ) -> Result<Self, TensorError> {
        let storage = Self::on_device(shape, device)?;
        if data.len() != storage.size() {
            return Err(TensorError::ShapeMismatch {
                lhs: data.len(),
                rhs: storage.size(),
            });
        }
        storage
            .device
            .write_buffer(&storage.buffer, 0, bytemuck::cast_slice(data))?;
        Ok(storage)
    }

    fn byte_len(numel: usize) -> Result<usize, DeviceError> {
        numel
            .checked_mul(T::dt().size_of())
            .ok_or_else(|| DeviceError::AllocationFailed {
                size: u64::MAX,
                reason: format!("{} elements overflow the address space", numel),
            })
    }

    pub fn device(&self) -> &WgpuDevice {
        &self.device
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn size(&self) -> usize {
        self.shape.numel()
    }

    /// Blocking device-to-host transfer of a single element.
    pub fn element_at(&self, index: usize) -> Result<T, TensorError> {
        check_index(index, self.size())?;
        let width = T::dt().size_of();
        let bytes = self.device.read_buffer(&self.buffer, index * width, width)?;
        Ok(bytemuck::pod_read_unaligned(&bytes))
    }

    /// Blocking host-to-device transfer of a single element.
    pub fn set_element(&mut self, index: usize, value: T) -> Result<(), TensorError> {
        check_index(index, self.size())?;
        let width = T::dt().size_of();
        self.device
            .write_buffer(&self.buffer, index * width, bytemuck::bytes_of(&value))?;
        Ok(())
    }

    /// Replaces the device allocation with a zeroed one sized for `shape`.
    ///
    /// The new buffer is allocated before the old one is released, so a failed
    /// allocation leaves the storage as it was.
    pub fn resize(&mut self, shape: impl Into<Shape>) -> Result<(), TensorError> {
        let shape = shape.into();
        let numel = shape.validate()?;
        log::debug!("Resizing accelerator storage {:?} -> {:?}", self.shape, shape);
        self.buffer = self.device.allocate_buffer(Self::byte_len(numel)?)?;
        self.shape = shape;
        Ok(())
    }

    pub fn fill(&mut self, value: T) -> Result<(), TensorError> {
        let data = vec![value; self.size()];
        self.device
            .write_buffer(&self.buffer, 0, bytemuck::cast_slice(&data))?;
        Ok(())
    }

    /// Reads the whole buffer back in one transfer.
    pub fn to_vec(&self) -> Result<Vec<T>, TensorError> {
        let bytes = self
            .device
            .read_buffer(&self.buffer, 0, self.size() * T::dt().size_of())?;
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }
}

impl<T: TensorDType> DeviceStorage<T> for AcceleratorStorage<T> {
    fn backend(&self) -> Backend {
        Backend::Accelerator
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn size(&self) -> usize {
        self.shape.numel()
    }

    fn element_at(&self, index: usize) -> Result<T, TensorError> {
        AcceleratorStorage::element_at(self, index)
    }

    fn set_element(&mut self, index: usize, value: T) -> Result<(), TensorError> {
        AcceleratorStorage::set_element(self, index, value)
    }

    fn resize(&mut self, shape: Shape) -> Result<(), TensorError> {
        AcceleratorStorage::resize(self, shape)
    }

    fn to_vec(&self) -> Result<Vec<T>, TensorError> {
        AcceleratorStorage::to_vec(self)
    }

    fn alike(&self, data: &[T], shape: Shape) -> Result<Self, TensorError> {
        Self::from_slice(data, shape, &self.device)
    }
}
