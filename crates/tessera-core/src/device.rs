use crate::gpu::WgpuDevice;

#[derive(Clone, Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Failed to acquire device with error: {0:?}")]
    DeviceAcquisitionFailed(#[from] wgpu::RequestDeviceError),
    #[error("Failed to find a compatible accelerator adapter")]
    AdapterRequestFailed,
    #[error("Device mismatch, requested device: {0:?}, actual device: {1:?}")]
    DeviceMismatch(String, String),
    #[error("Failed to allocate {size} byte buffer: {reason}")]
    AllocationFailed { size: u64, reason: String },
    #[error("Failed to transfer buffer with error: {0:?}")]
    TransferFailed(#[from] wgpu::BufferAsyncError),
    #[error("Device transfer was interrupted before completion")]
    TransferInterrupted,
}

/// Memory space a storage's elements live in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumIter)]
pub enum Backend {
    Host,
    Accelerator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRequest {
    Host,
    /// Any adapter on the backends selected by `WGPU_BACKEND`.
    Accelerator,
    /// Any adapter on the given backends only.
    AcceleratorOn(wgpu::Backends),
}

#[derive(Clone, Default, PartialEq)]
pub enum Device {
    #[default]
    Host,
    Accelerator(WgpuDevice),
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Host => write!(f, "Host"),
            Device::Accelerator(gpu) => write!(f, "Accelerator:{}", gpu.info().device_identifier()),
        }
    }
}

impl Device {
    pub fn is_host(&self) -> bool {
        matches!(self, Device::Host)
    }

    pub fn is_accelerator(&self) -> bool {
        matches!(self, Device::Accelerator(_))
    }

    pub fn backend(&self) -> Backend {
        match self {
            Device::Host => Backend::Host,
            Device::Accelerator(_) => Backend::Accelerator,
        }
    }

    /// Blocks until the requested device is ready.
    ///
    /// Every accelerator request acquires a fresh adapter, device and queue.
    pub fn request_device(request: DeviceRequest) -> Result<Self, DeviceError> {
        match request {
            DeviceRequest::Host => Ok(Device::Host),
            DeviceRequest::Accelerator => Ok(Device::Accelerator(pollster::block_on(async {
                WgpuDevice::new().await
            })?)),
            DeviceRequest::AcceleratorOn(backends) => Ok(Device::Accelerator(pollster::block_on(
                async { WgpuDevice::with_backends(backends).await },
            )?)),
        }
    }

    /// Human readable name, including the adapter for accelerators.
    pub fn label(&self) -> String {
        match self {
            Device::Host => "host".to_string(),
            Device::Accelerator(gpu) => gpu.info().device_identifier(),
        }
    }

    pub fn try_accelerator(&self) -> Result<&WgpuDevice, DeviceError> {
        match self {
            Device::Accelerator(gpu) => Ok(gpu),
            Device::Host => Err(DeviceError::DeviceMismatch(
                "Accelerator".to_string(),
                "Host".to_string(),
            )),
        }
    }
}
