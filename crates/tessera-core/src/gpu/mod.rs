mod align;
mod device;

pub use align::*;
pub use device::*;

pub const MIN_STORAGE_BUFFER_SIZE: usize = 16;

/// Usages we use everywhere
pub trait BufferUsagesExt {
    fn standard() -> Self;
    fn staging() -> Self;
}

impl BufferUsagesExt for wgpu::BufferUsages {
    fn standard() -> Self {
        Self::COPY_DST | Self::COPY_SRC | Self::STORAGE
    }

    fn staging() -> Self {
        Self::MAP_READ | Self::COPY_DST
    }
}
