use crate::gpu::{Align, BufferUsagesExt, MIN_STORAGE_BUFFER_SIZE};
use std::sync::Arc;
use wgpu::{Adapter, Limits};

use crate::DeviceError;

pub const MAX_BUFFER_SIZE: u64 = (2 << 29) - 1;

/// # Device
///
/// A device is a handle to a physical accelerator together with its command queue.
/// It is used to allocate buffers and to move bytes in and out of them.
///
/// Cloning is cheap and shares the same context; the underlying device and queue are
/// released when the last clone is dropped.
#[derive(Clone)]
pub struct WgpuDevice {
    device_info: DeviceInfo,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl std::fmt::Debug for WgpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "wgpu:{}", self.device_info.device_identifier())
    }
}

impl PartialEq for WgpuDevice {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.device, &other.device)
    }
}

impl WgpuDevice {
    /// Acquires the most capable adapter among the backends named by `WGPU_BACKEND`,
    /// or the primary backends when it is unset.
    pub async fn new() -> Result<Self, DeviceError> {
        let backends = wgpu::util::backend_bits_from_env().unwrap_or(wgpu::Backends::PRIMARY);
        Self::with_backends(backends).await
    }

    /// Acquires the most capable adapter among `backends` only.
    pub async fn with_backends(backends: wgpu::Backends) -> Result<Self, DeviceError> {
        let adapter = Self::select_adapter(backends)?;
        log::info!("Adapter: {:?}", adapter.get_info());
        log::info!("Active accelerator: {}", adapter.get_info().name);

        let mut device_descriptor = wgpu::DeviceDescriptor {
            label: Some("tessera"),
            required_features: wgpu::Features::empty(),
            required_limits: Limits {
                max_buffer_size: MAX_BUFFER_SIZE,
                ..Limits::downlevel_defaults()
            },
            memory_hints: wgpu::MemoryHints::default(),
        };
        let device_request = adapter.request_device(&device_descriptor, None).await;
        let (device, queue) = if let Err(e) = device_request {
            log::error!("Failed to acq. device, trying with reduced limits: {:?}", e);
            device_descriptor.required_limits = adapter.limits();
            adapter.request_device(&device_descriptor, None).await
        } else {
            device_request
        }?;
        log::debug!("Device limits: {:?}", device.limits());

        Ok(Self {
            device_info: adapter.get_info().into(),
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.device_info
    }

    /// Walks every adapter `backends` expose and keeps the most capable one.
    fn select_adapter(backends: wgpu::Backends) -> Result<Adapter, DeviceError> {
        use wgpu::DeviceType;
        if backends.is_empty() {
            return Err(DeviceError::AdapterRequestFailed);
        }
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            dx12_shader_compiler: wgpu::util::dx12_shader_compiler_from_env().unwrap_or_default(),
            ..Default::default()
        });
        let adapter = instance
            .enumerate_adapters(backends)
            .into_iter()
            .max_by_key(|adapter| match adapter.get_info().device_type {
                DeviceType::DiscreteGpu => 5,
                DeviceType::Other => 4,
                DeviceType::IntegratedGpu => 3,
                DeviceType::VirtualGpu => 2,
                DeviceType::Cpu => 1,
            })
            .ok_or(DeviceError::AdapterRequestFailed)?;
        Ok(adapter)
    }
}

impl WgpuDevice {
    /// Allocates a zero-filled buffer able to hold `n_bytes`.
    ///
    /// The allocation is padded up to the copy alignment so any element can later be
    /// read back through an aligned window.
    pub(crate) fn allocate_buffer(&self, n_bytes: usize) -> Result<wgpu::Buffer, DeviceError> {
        let limit = self.device.limits().max_buffer_size;
        if n_bytes as u64 > limit {
            return Err(DeviceError::AllocationFailed {
                size: n_bytes as u64,
                reason: format!("exceeds device limit of {} bytes", limit),
            });
        }
        let size = n_bytes.align_for_copy().max(MIN_STORAGE_BUFFER_SIZE) as u64;
        if size > limit {
            return Err(DeviceError::AllocationFailed {
                size,
                reason: format!("exceeds device limit of {} bytes", limit),
            });
        }

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tessera-storage"),
            size,
            usage: wgpu::BufferUsages::standard(),
            mapped_at_creation: false,
        });
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());
        if let Some(error) = validation.or(oom) {
            return Err(DeviceError::AllocationFailed {
                size,
                reason: error.to_string(),
            });
        }
        log::debug!("Allocated {} byte device buffer", size);
        Ok(buffer)
    }

    /// Blocking copy of `len` bytes starting at `offset` from `buffer` into host memory.
    pub(crate) fn read_buffer(
        &self,
        buffer: &wgpu::Buffer,
        offset: usize,
        len: usize,
    ) -> Result<Vec<u8>, DeviceError> {
        let start = offset.align_down_for_copy();
        let end = (offset + len).align_for_copy();
        let window = (end - start) as u64;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tessera-staging"),
            size: window,
            usage: wgpu::BufferUsages::staging(),
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        encoder.copy_buffer_to_buffer(buffer, start as u64, &staging, 0, window);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv().map_err(|_| DeviceError::TransferInterrupted)??;

        let skip = offset - start;
        let bytes = slice.get_mapped_range()[skip..skip + len].to_vec();
        staging.unmap();
        log::trace!("Read {} bytes at offset {}", len, offset);
        Ok(bytes)
    }

    /// Blocking copy of `bytes` into `buffer` at `offset`.
    ///
    /// Unaligned writes read back the surrounding aligned window, patch it and write
    /// the whole window, leaving neighbouring elements untouched.
    pub(crate) fn write_buffer(
        &self,
        buffer: &wgpu::Buffer,
        offset: usize,
        bytes: &[u8],
    ) -> Result<(), DeviceError> {
        if offset.is_copy_aligned() && bytes.len().is_copy_aligned() {
            self.queue.write_buffer(buffer, offset as u64, bytes);
        } else {
            let start = offset.align_down_for_copy();
            let end = (offset + bytes.len()).align_for_copy();
            let mut window = self.read_buffer(buffer, start, end - start)?;
            let skip = offset - start;
            window[skip..skip + bytes.len()].copy_from_slice(bytes);
            self.queue.write_buffer(buffer, start as u64, &window);
        }
        self.queue.submit(None);
        self.device.poll(wgpu::Maintain::Wait);
        log::trace!("Wrote {} bytes at offset {}", bytes.len(), offset);
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct DeviceInfo {
    pub name: String,
    pub vendor: u32,
    pub device: u32,
    pub device_type: wgpu::DeviceType,
    pub driver: String,
    pub driver_info: String,
    pub backend: wgpu::Backend,
}

impl DeviceInfo {
    pub fn device_identifier(&self) -> String {
        format!("{}-{}", self.name.replace(' ', "-"), self.backend.to_str())
    }
}

impl From<wgpu::AdapterInfo> for DeviceInfo {
    fn from(info: wgpu::AdapterInfo) -> Self {
        DeviceInfo {
            name: info.name,
            vendor: info.vendor,
            device: info.device,
            device_type: info.device_type,
            driver: info.driver,
            driver_info: info.driver_info,
            backend: info.backend,
        }
    }
}
