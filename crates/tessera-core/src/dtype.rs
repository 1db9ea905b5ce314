use half::{bf16, f16};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Hash, strum_macros::Display)]
pub enum DType {
    F16,
    BF16,
    #[default]
    F32,
    F64,
    I32,
    U32,
    I64,
}

impl DType {
    /// Returns the size of the type in bytes.
    pub fn size_of(self) -> usize {
        match self {
            DType::F16 => 2,
            DType::BF16 => 2,
            DType::F32 => 4,
            DType::F64 => 8,
            DType::I32 => 4,
            DType::U32 => 4,
            DType::I64 => 8,
        }
    }
}

/// Element type of a storage.
///
/// `Pod` is what lets an element leave host memory: it carries no ownership and
/// can be copied byte for byte into an accelerator buffer.
pub trait TensorDType:
    Copy
    + std::fmt::Debug
    + Default
    + PartialEq
    + 'static
    + num_traits::Zero
    + num_traits::One
    + Send
    + Sync
    + bytemuck::Pod
{
    fn dt() -> DType;
}

macro_rules! map_type {
    ($t:ty, $v:ident) => {
        impl TensorDType for $t {
            fn dt() -> DType {
                DType::$v
            }
        }
    };
}

map_type!(f32, F32);
map_type!(f64, F64);
map_type!(i32, I32);
map_type!(u32, U32);
map_type!(i64, I64);
map_type!(f16, F16);
map_type!(bf16, BF16);
