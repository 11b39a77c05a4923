use core::marker::PhantomData;
use core::mem::{self, MaybeUninit};
use core::ops::Range;
use core::ptr::{self, addr_of_mut, NonNull};
use core::slice;

use crate::util::{self, nnptr};

/// The fields stored at the start of every record block, right before the elements.
#[repr(C)]
pub(crate) struct Control<H> {
    pub(crate) extra: H,
    pub(crate) allocated: usize,
    pub(crate) count: usize,
}

/// A pointer to a record block: `Control<H>` followed by `allocated` slots of `T`.
///
/// Does not know where the block came from. The owning wrappers decide whether
/// and how it may be resized and released.
pub(crate) struct RawRecord<H, T> {
    block: NonNull<Control<H>>,
    _marker: PhantomData<(Control<H>, T)>,
}

#[cold]
#[inline(never)]
#[track_caller]
pub(crate) fn index_out_of_range(op: &str, pos: usize, len: usize) -> ! {
    panic!("{op}: position {pos} should be < len {len}");
}

impl<H, T: Copy> RawRecord<H, T> {
    /// Writes the control fields at the start of `block`.
    ///
    /// Every byte before the first element is zeroed first so that padding in the
    /// control area is initialized memory.
    ///
    /// # Safety
    ///
    /// `block` must be aligned to `block_align::<H, T>()` and valid for writes of
    /// `record_layout::<H, T>(allocated)` bytes.
    pub(crate) unsafe fn init(block: NonNull<u8>, extra: H, allocated: usize) -> Self {
        ptr::write_bytes(block.as_ptr(), 0, util::storage_offset::<H, T>());

        let control = block.cast::<Control<H>>().as_ptr();
        addr_of_mut!((*control).extra).write(extra);
        addr_of_mut!((*control).allocated).write(allocated);
        addr_of_mut!((*control).count).write(0);

        RawRecord {
            block: block.cast(),
            _marker: PhantomData,
        }
    }

    /// Points this record at the block it was moved to.
    ///
    /// # Safety
    ///
    /// `block` must hold a bitwise copy of the previous block's contents.
    #[inline]
    pub(crate) unsafe fn relocate(&mut self, block: NonNull<u8>) {
        self.block = block.cast();
    }

    /// Drops the extra fields in place. The block itself is left alone.
    ///
    /// # Safety
    ///
    /// Must be called at most once, and the extra fields must not be accessed afterwards.
    pub(crate) unsafe fn drop_extra(&mut self) {
        ptr::drop_in_place(addr_of_mut!((*self.block.as_ptr()).extra));
    }

    #[inline(always)]
    pub(crate) fn block_ptr(&self) -> NonNull<u8> {
        self.block.cast()
    }

    #[inline(always)]
    pub(crate) fn items_ptr(&self) -> NonNull<T> {
        unsafe { nnptr::byte_add(self.block, util::storage_offset::<H, T>()).cast() }
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        unsafe { (*self.block.as_ptr()).count }
    }

    #[inline(always)]
    pub(crate) fn capacity(&self) -> usize {
        unsafe { (*self.block.as_ptr()).allocated }
    }

    #[inline]
    pub(crate) fn remaining_capacity(&self) -> usize {
        self.capacity() - self.len()
    }

    #[inline]
    pub(crate) unsafe fn set_len(&mut self, len: usize) {
        debug_assert!(len <= self.capacity());
        (*self.block.as_ptr()).count = len;
    }

    #[inline]
    pub(crate) unsafe fn set_capacity(&mut self, cap: usize) {
        debug_assert!(self.len() <= cap);
        (*self.block.as_ptr()).allocated = cap;
    }

    #[inline(always)]
    pub(crate) fn extra(&self) -> &H {
        unsafe { &(*self.block.as_ptr()).extra }
    }

    #[inline(always)]
    pub(crate) fn extra_mut(&mut self) -> &mut H {
        unsafe { &mut (*self.block.as_ptr()).extra }
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.items_ptr().as_ptr(), self.len()) }
    }

    #[inline]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.items_ptr().as_ptr(), self.len()) }
    }

    #[inline]
    #[track_caller]
    pub(crate) fn at(&self, pos: usize) -> &T {
        let len = self.len();
        if pos >= len {
            index_out_of_range("at", pos, len);
        }

        unsafe { nnptr::add(self.items_ptr(), pos).as_ref() }
    }

    #[inline]
    #[track_caller]
    pub(crate) fn at_mut(&mut self, pos: usize) -> &mut T {
        let len = self.len();
        if pos >= len {
            index_out_of_range("at", pos, len);
        }

        unsafe { nnptr::add(self.items_ptr(), pos).as_mut() }
    }

    /// Address of the first byte of the record, extra fields included.
    #[inline]
    pub(crate) fn lower_bound(&self) -> *const u8 {
        self.block.as_ptr() as *const u8
    }

    /// Address one past the last live element.
    #[inline]
    pub(crate) fn upper_bound(&self) -> *const u8 {
        unsafe { self.items_ptr().as_ptr().add(self.len()) as *const u8 }
    }

    #[inline]
    pub(crate) fn byte_range(&self) -> Range<*const u8> {
        self.lower_bound()..self.upper_bound()
    }

    /// The live part of the block as bytes.
    ///
    /// # Safety
    ///
    /// `H` and `T` must not contain uninitialized bytes.
    pub(crate) unsafe fn as_bytes(&self) -> &[u8] {
        let size = util::storage_offset::<H, T>() + self.len() * mem::size_of::<T>();
        slice::from_raw_parts(self.lower_bound(), size)
    }

    /// Bumps the length by `n` and returns the new, uninitialized slots.
    ///
    /// # Safety
    ///
    /// `n` must not exceed the remaining capacity.
    pub(crate) unsafe fn extend_uninit(&mut self, n: usize) -> &mut [MaybeUninit<T>] {
        debug_assert!(n <= self.remaining_capacity());
        let len = self.len();
        self.set_len(len + n);

        let first = nnptr::add(self.items_ptr(), len).cast::<MaybeUninit<T>>();
        slice::from_raw_parts_mut(first.as_ptr(), n)
    }

    /// # Safety
    ///
    /// `n` must not exceed the remaining capacity.
    pub(crate) unsafe fn extend_filled(&mut self, n: usize, fill: T) -> &mut [T] {
        let slots = self.extend_uninit(n);
        for slot in slots.iter_mut() {
            slot.write(fill);
        }

        &mut *(slots as *mut [MaybeUninit<T>] as *mut [T])
    }

    /// # Safety
    ///
    /// There must be room for at least one more element.
    pub(crate) unsafe fn push_within_capacity(&mut self, value: T) -> &mut T {
        debug_assert!(self.remaining_capacity() >= 1);
        let len = self.len();
        let slot = nnptr::add(self.items_ptr(), len);
        slot.as_ptr().write(value);
        self.set_len(len + 1);

        &mut *slot.as_ptr()
    }

    /// # Safety
    ///
    /// `items.len()` must not exceed the remaining capacity.
    pub(crate) unsafe fn extend_from_slice_within_capacity(&mut self, items: &[T]) {
        debug_assert!(items.len() <= self.remaining_capacity());
        let len = self.len();
        let dst = nnptr::add(self.items_ptr(), len);
        ptr::copy_nonoverlapping(items.as_ptr(), dst.as_ptr(), items.len());
        self.set_len(len + items.len());
    }

    /// Shifts `[pos, len)` one slot to the right and returns the vacated slot.
    ///
    /// # Safety
    ///
    /// `pos` must be `< len` and there must be room for one more element.
    pub(crate) unsafe fn insert_uninit(&mut self, pos: usize) -> &mut MaybeUninit<T> {
        let len = self.len();
        debug_assert!(pos < len);
        debug_assert!(self.remaining_capacity() >= 1);

        let p = nnptr::add(self.items_ptr(), pos);
        nnptr::copy(p, nnptr::add(p, 1), len - pos);
        self.set_len(len + 1);

        &mut *p.as_ptr().cast::<MaybeUninit<T>>()
    }

    /// Removes the element at `pos`, shifting the ones after it to the left.
    #[track_caller]
    pub(crate) fn erase(&mut self, pos: usize) -> T {
        let len = self.len();
        if pos >= len {
            index_out_of_range("erase", pos, len);
        }

        unsafe {
            let p = nnptr::add(self.items_ptr(), pos);
            let item = nnptr::read(p);
            // Erasing the last element needs no move.
            if pos + 1 < len {
                nnptr::copy(nnptr::add(p, 1), p, len - pos - 1);
            }
            self.set_len(len - 1);

            item
        }
    }

    /// Forgets the last `n` elements, or all of them if there are fewer.
    #[inline]
    pub(crate) fn shorten(&mut self, n: usize) {
        let len = self.len().saturating_sub(n);
        unsafe { self.set_len(len) }
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Option<T> {
        let len = self.len();
        if len == 0 {
            return None;
        }

        unsafe {
            self.set_len(len - 1);
            Some(nnptr::read(nnptr::add(self.items_ptr(), len - 1)))
        }
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        unsafe { self.set_len(0) }
    }
}
