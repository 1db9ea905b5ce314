///WebGPU is very specific about buffer alignment.
///Every buffer copy, queue write and mapped read must start and end on a multiple of
///COPY_BUFFER_ALIGNMENT (4 bytes). Element types narrower than that (f16, bf16) are
///therefore transferred through the smallest aligned window that contains them.
pub trait Align {
    const COPY_BUFFER_ALIGNMENT: usize = 4;

    fn calculate_alignment(&self, alignment: usize) -> usize;
    fn align_for_copy(&self) -> usize;
    fn align_down_for_copy(&self) -> usize;
    fn is_copy_aligned(&self) -> bool;
}

impl Align for usize {
    fn calculate_alignment(&self, alignment: usize) -> usize {
        let remainder = self % alignment;
        if remainder == 0 {
            0
        } else {
            alignment - remainder
        }
    }

    fn align_for_copy(&self) -> usize {
        self + &self.calculate_alignment(Self::COPY_BUFFER_ALIGNMENT)
    }

    fn align_down_for_copy(&self) -> usize {
        self - self % Self::COPY_BUFFER_ALIGNMENT
    }

    fn is_copy_aligned(&self) -> bool {
        self % Self::COPY_BUFFER_ALIGNMENT == 0
    }
}
