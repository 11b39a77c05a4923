use core::mem;

use crate::allocator::Layout;
use crate::error::{RecordArrayError, Result};
use crate::raw::Control;

pub(crate) const fn is_zst<T>() -> bool {
    mem::size_of::<T>() == 0
}

const fn max(a: usize, b: usize) -> usize {
    if a > b {
        a
    } else {
        b
    }
}

/// Byte offset of the first element from the start of the block.
pub(crate) const fn storage_offset<H, T>() -> usize {
    let s = mem::size_of::<Control<H>>();
    let a = mem::align_of::<T>();

    if s % a != 0 {
        s + a - (s % a)
    } else {
        s
    }
}

pub(crate) const fn block_align<H, T>() -> usize {
    max(mem::align_of::<Control<H>>(), mem::align_of::<T>())
}

/// Layout of a block holding the control fields and `cap` elements.
pub(crate) fn record_layout<H, T>(cap: usize) -> Result<Layout> {
    let size = mem::size_of::<T>()
        .checked_mul(cap)
        .and_then(|items| items.checked_add(storage_offset::<H, T>()))
        .ok_or(RecordArrayError::CapacityOverflow)?;

    Layout::from_size_align(size, block_align::<H, T>())
        .map_err(|_| RecordArrayError::CapacityOverflow)
}

/// Number of elements that fit in `size` bytes once the control fields are placed.
pub(crate) fn capacity_for_size<H, T>(size: usize) -> Option<usize> {
    let items_size = size.checked_sub(storage_offset::<H, T>())?;
    if is_zst::<T>() {
        return Some(isize::MAX as usize);
    }

    Some(items_size / mem::size_of::<T>())
}

// Waiting for `non_null_convenience` to be stabilized.
pub mod nnptr {
    use std::ptr::{self, NonNull};

    #[inline(always)]
    pub unsafe fn read<T>(src: NonNull<T>) -> T {
        ptr::read(src.as_ptr())
    }

    #[inline(always)]
    pub unsafe fn copy<T>(src: NonNull<T>, dst: NonNull<T>, count: usize) {
        ptr::copy(src.as_ptr(), dst.as_ptr(), count)
    }

    #[inline(always)]
    pub unsafe fn add<T>(p: NonNull<T>, count: usize) -> NonNull<T> {
        NonNull::new_unchecked(p.as_ptr().add(count))
    }

    #[inline(always)]
    pub unsafe fn byte_add<T>(p: NonNull<T>, count: usize) -> NonNull<T> {
        let u8_ptr = p.as_ptr() as *mut u8;
        let offset_u8_ptr = u8_ptr.add(count) as *mut T;
        NonNull::new_unchecked(offset_u8_ptr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_follows_control_fields() {
        // Two usize counters and no extra fields.
        let control = 2 * mem::size_of::<usize>();
        assert_eq!(storage_offset::<(), u8>(), control);
        assert_eq!(storage_offset::<(), u64>(), control);
        assert_eq!(storage_offset::<u8, u8>(), control + mem::size_of::<usize>());
    }

    #[test]
    fn storage_offset_respects_element_alignment() {
        #[repr(align(32))]
        #[derive(Copy, Clone)]
        struct Wide([u8; 32]);

        assert_eq!(storage_offset::<(), Wide>() % 32, 0);
        assert_eq!(block_align::<(), Wide>(), 32);
    }

    #[test]
    fn layout_grows_by_element_size() {
        let a = record_layout::<u32, u64>(2).unwrap();
        let b = record_layout::<u32, u64>(5).unwrap();
        assert_eq!(b.size() - a.size(), 3 * 8);
        assert_eq!(a.align(), block_align::<u32, u64>());
    }

    #[test]
    fn layout_overflow() {
        assert_eq!(record_layout::<(), u64>(usize::MAX), Err(RecordArrayError::CapacityOverflow));
    }

    #[test]
    fn capacity_from_buffer_size() {
        let offset = storage_offset::<(), u32>();
        assert_eq!(capacity_for_size::<(), u32>(offset - 1), None);
        assert_eq!(capacity_for_size::<(), u32>(offset), Some(0));
        assert_eq!(capacity_for_size::<(), u32>(offset + 11), Some(2));
        assert_eq!(capacity_for_size::<(), ()>(offset), Some(isize::MAX as usize));
    }
}
