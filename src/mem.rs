use crate::Index;

pub const NONE_BYTE: u8 = 0xFF;
pub const NONE: usize = usize::from_ne_bytes([NONE_BYTE; core::mem::size_of::<usize>()]);

/// Sets every element of `slice` to the "none" sentinel, `-1`.
#[inline]
pub fn fill_none<I: Index>(slice: &mut [I]) {
    bytemuck::cast_slice_mut::<I, u8>(slice).fill(NONE_BYTE);
}

#[inline]
pub fn fill_zero<I: bytemuck::Pod>(slice: &mut [I]) {
    bytemuck::cast_slice_mut::<I, u8>(slice).fill(0u8);
}
