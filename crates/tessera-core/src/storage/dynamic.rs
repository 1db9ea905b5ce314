use crate::{
    storage::{AcceleratorStorage, DeviceStorage, HostStorage, TensorError},
    Backend, Device, DeviceRequest, Shape, TensorDType,
};

/// Skips accelerator detection in [`DynamicStorage::new`] when set.
pub const FORCE_HOST_ENV: &str = "TESSERA_FORCE_HOST";

/// Storage whose backend is picked once, at construction, by probing for an
/// accelerator. Every operation forwards to whichever backend won; there is no
/// migration between them afterwards.
#[derive(Debug)]
pub enum DynamicStorage<T: TensorDType> {
    Host(HostStorage<T>),
    Accelerator(AcceleratorStorage<T>),
}

impl<T: TensorDType> DynamicStorage<T> {
    /// Uses an accelerator if one can be acquired, silently falling back to host
    /// memory otherwise.
    pub fn new(shape: impl Into<Shape>) -> Result<Self, TensorError> {
        Self::requesting(shape, DeviceRequest::Accelerator)
    }

    /// Like [`DynamicStorage::new`], trying the device described by `request`.
    pub fn requesting(shape: impl Into<Shape>, request: DeviceRequest) -> Result<Self, TensorError> {
        let shape = shape.into();
        shape.validate()?;
        Self::on(shape, &Self::select_device(request))
    }

    /// Allocates on an explicitly chosen device.
    pub fn on(shape: impl Into<Shape>, device: &Device) -> Result<Self, TensorError> {
        match device {
            Device::Host => Ok(DynamicStorage::Host(HostStorage::new(shape)?)),
            Device::Accelerator(g) => Ok(DynamicStorage::Accelerator(
                AcceleratorStorage::on_device(shape, g)?,
            )),
        }
    }

    pub fn from_slice(
        data: &[T],
        shape: impl Into<Shape>,
        device: &Device,
    ) -> Result<Self, TensorError> {
        match device {
            Device::Host => Ok(DynamicStorage::Host(HostStorage::from_slice(data, shape)?)),
            Device::Accelerator(g) => Ok(DynamicStorage::Accelerator(
                AcceleratorStorage::from_slice(data, shape, g)?,
            )),
        }
    }

    fn select_device(request: DeviceRequest) -> Device {
        if std::env::var(FORCE_HOST_ENV).is_ok() {
            log::warn!("{} set, using host storage", FORCE_HOST_ENV);
            return Device::Host;
        }
        match Device::request_device(request) {
            Ok(device) => device,
            Err(e) => {
                log::warn!("No accelerator available, falling back to host: {}", e);
                Device::Host
            }
        }
    }

    pub fn try_host(&self) -> Result<&HostStorage<T>, TensorError> {
        match self {
            DynamicStorage::Host(h) => Ok(h),
            DynamicStorage::Accelerator(_) => Err(crate::DeviceError::DeviceMismatch(
                "Host".to_string(),
                "Accelerator".to_string(),
            )
            .into()),
        }
    }

    pub fn try_host_mut(&mut self) -> Result<&mut HostStorage<T>, TensorError> {
        match self {
            DynamicStorage::Host(h) => Ok(h),
            DynamicStorage::Accelerator(_) => Err(crate::DeviceError::DeviceMismatch(
                "Host".to_string(),
                "Accelerator".to_string(),
            )
            .into()),
        }
    }

    pub fn try_accelerator(&self) -> Result<&AcceleratorStorage<T>, TensorError> {
        match self {
            DynamicStorage::Accelerator(a) => Ok(a),
            DynamicStorage::Host(_) => Err(crate::DeviceError::DeviceMismatch(
                "Accelerator".to_string(),
                "Host".to_string(),
            )
            .into()),
        }
    }
}

#[cfg(feature = "rand")]
impl<T: TensorDType + num_traits::Float> DynamicStorage<T> {
    /// Uniformly initialised storage on an accelerator when one is available, the usual way weights and
    /// biases are seeded.
    pub fn rand_uniform(shape: impl Into<Shape>, low: T, high: T) -> Result<Self, TensorError> {
        let host = HostStorage::rand_uniform(shape, low, high)?;
        Self::upload(host, &Self::select_device(DeviceRequest::Accelerator))
    }

    pub fn rand_uniform_on(
        shape: impl Into<Shape>,
        low: T,
        high: T,
        device: &Device,
    ) -> Result<Self, TensorError> {
        Self::upload(HostStorage::rand_uniform(shape, low, high)?, device)
    }

    /// Standard normal samples on an explicitly chosen device.
    pub fn randn_on(shape: impl Into<Shape>, device: &Device) -> Result<Self, TensorError> {
        Self::upload(HostStorage::randn(shape)?, device)
    }

    fn upload(host: HostStorage<T>, device: &Device) -> Result<Self, TensorError> {
        match device {
            Device::Host => Ok(DynamicStorage::Host(host)),
            Device::Accelerator(g) => Ok(DynamicStorage::Accelerator(
                AcceleratorStorage::from_slice(host.as_slice(), host.shape().clone(), g)?,
            )),
        }
    }
}

impl<T: TensorDType> DeviceStorage<T> for DynamicStorage<T> {
    fn backend(&self) -> Backend {
        match self {
            DynamicStorage::Host(h) => h.backend(),
            DynamicStorage::Accelerator(a) => a.backend(),
        }
    }

    fn shape(&self) -> &Shape {
        match self {
            DynamicStorage::Host(h) => h.shape(),
            DynamicStorage::Accelerator(a) => a.shape(),
        }
    }

    fn size(&self) -> usize {
        match self {
            DynamicStorage::Host(h) => h.size(),
            DynamicStorage::Accelerator(a) => a.size(),
        }
    }

    fn element_at(&self, index: usize) -> Result<T, TensorError> {
        match self {
            DynamicStorage::Host(h) => h.element_at(index).copied(),
            DynamicStorage::Accelerator(a) => a.element_at(index),
        }
    }

    fn set_element(&mut self, index: usize, value: T) -> Result<(), TensorError> {
        match self {
            DynamicStorage::Host(h) => h.set_element(index, value),
            DynamicStorage::Accelerator(a) => a.set_element(index, value),
        }
    }

    fn resize(&mut self, shape: Shape) -> Result<(), TensorError> {
        match self {
            DynamicStorage::Host(h) => h.resize(shape),
            DynamicStorage::Accelerator(a) => a.resize(shape),
        }
    }

    fn to_vec(&self) -> Result<Vec<T>, TensorError> {
        match self {
            DynamicStorage::Host(h) => Ok(h.as_slice().to_vec()),
            DynamicStorage::Accelerator(a) => a.to_vec(),
        }
    }

    fn alike(&self, data: &[T], shape: Shape) -> Result<Self, TensorError> {
        match self {
            DynamicStorage::Host(h) => Ok(DynamicStorage::Host(h.alike(data, shape)?)),
            DynamicStorage::Accelerator(a) => {
                Ok(DynamicStorage::Accelerator(a.alike(data, shape)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape;

    #[test]
    fn host_device_forwards_every_operation() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut storage = DynamicStorage::<f32>::on(shape![2, 2], &Device::Host)?;
        assert_eq!(storage.backend(), Backend::Host);
        assert_eq!(storage.size(), 4);

        storage.set_element(3, 2.5)?;
        assert_eq!(storage.element_at(3)?, 2.5);
        assert!(matches!(
            storage.element_at(4),
            Err(TensorError::OutOfRange { .. })
        ));

        storage.resize(shape![3])?;
        assert_eq!(storage.shape(), &shape![3]);
        assert_eq!(storage.to_vec()?, vec![0.0; 3]);
        assert!(storage.try_host().is_ok());
        assert!(storage.try_accelerator().is_err());
        Ok(())
    }

    #[test]
    fn zero_volume_is_rejected_before_probing() {
        assert!(matches!(
            DynamicStorage::<f32>::new(shape![0, 4]),
            Err(TensorError::InvalidShape(_))
        ));
    }

    #[test]
    fn unavailable_accelerator_falls_back_to_host() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let request = DeviceRequest::AcceleratorOn(wgpu::Backends::empty());
        let mut storage = DynamicStorage::<f32>::requesting(shape![2, 2], request)?;
        assert_eq!(storage.backend(), Backend::Host);
        storage.set_element(0, 1.0)?;
        assert_eq!(storage.to_vec()?, vec![1.0, 0.0, 0.0, 0.0]);
        Ok(())
    }

    #[cfg(feature = "rand")]
    #[test]
    fn random_storage_on_host() -> anyhow::Result<()> {
        let uniform = DynamicStorage::<f32>::rand_uniform_on([8], 0.0, 1.0, &Device::Host)?;
        assert_eq!(uniform.backend(), Backend::Host);
        assert!(uniform.to_vec()?.iter().all(|&x| (0.0..1.0).contains(&x)));

        let normal = DynamicStorage::<f64>::randn_on([2, 3], &Device::Host)?;
        assert_eq!(normal.shape(), &shape![2, 3]);
        assert!(normal.to_vec()?.iter().all(|x| x.is_finite()));
        Ok(())
    }

    #[test]
    fn default_storage_holds_requested_volume() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut storage = DynamicStorage::<f32>::new(shape![3, 2])?;
        assert_eq!(storage.size(), 6);
        storage.set_element(5, 1.5)?;
        assert_eq!(storage.element_at(5)?, 1.5);
        Ok(())
    }
}
