//! Record arrays that own their block.
//!
//! A [`RecordArray`] allocates its block from an [`Allocator`] and may move the
//! whole record (extra fields, counters and elements) to a new address whenever
//! it needs more room. Operations that can grow take `&mut self`, so any element
//! reference handed out earlier is rejected by the borrow checker instead of
//! dangling.

use core::fmt;
use core::mem::MaybeUninit;
use core::ops::Range;
use std::alloc::handle_alloc_error;

use bytemuck::NoUninit;

use crate::allocator::{Allocator, Global};
use crate::config::GrowthPolicy;
use crate::error::{RecordArrayError, Result};
use crate::raw::{index_out_of_range, RawRecord};
use crate::util;

/// A heap-allocated record: extra fields of type `H` followed by a growable
/// run of `T` elements, all in one block.
pub struct RecordArray<H, T: Copy, A: Allocator = Global> {
    raw: RawRecord<H, T>,
    policy: GrowthPolicy,
    allocator: A,
}

unsafe impl<H: Send, T: Copy + Send, A: Allocator + Send> Send for RecordArray<H, T, A> {}
unsafe impl<H: Sync, T: Copy + Sync, A: Allocator + Sync> Sync for RecordArray<H, T, A> {}

#[cold]
#[inline(never)]
#[track_caller]
fn handle_error(err: RecordArrayError) -> ! {
    match err {
        RecordArrayError::AllocFailed { layout } => handle_alloc_error(layout),
        err => panic!("{err}"),
    }
}

impl<H, T: Copy> RecordArray<H, T, Global> {
    /// Allocates a record with room for `cap` elements.
    ///
    /// # Panics
    ///
    /// Panics if the block size overflows, and aborts if the allocation fails.
    pub fn with_capacity(extra: H, cap: usize) -> Self {
        Self::with_capacity_in(extra, cap, Global)
    }

    pub fn try_with_capacity(extra: H, cap: usize) -> Result<Self> {
        Self::try_with_capacity_in(extra, cap, Global)
    }

    /// Allocates a record holding a copy of `items`, with no spare capacity.
    pub fn from_slice(extra: H, items: &[T]) -> Self {
        let mut v = Self::with_capacity(extra, items.len());
        v.extend_from_slice(items);
        v
    }
}

impl<H, T: Copy, A: Allocator> RecordArray<H, T, A> {
    /// Allocates a record with room for exactly `cap` elements in the given allocator.
    pub fn try_with_capacity_in(extra: H, cap: usize, allocator: A) -> Result<Self> {
        let layout = util::record_layout::<H, T>(cap)?;
        let block = allocator
            .allocate(layout)
            .map_err(|_| RecordArrayError::AllocFailed { layout })?;

        let raw = unsafe { RawRecord::init(block.cast::<u8>(), extra, cap) };
        tracing::trace!(capacity = cap, bytes = layout.size(), "allocated record array");

        Ok(RecordArray {
            raw,
            policy: GrowthPolicy::default(),
            allocator,
        })
    }

    pub fn with_capacity_in(extra: H, cap: usize, allocator: A) -> Self {
        Self::try_with_capacity_in(extra, cap, allocator).unwrap_or_else(|err| handle_error(err))
    }

    /// Sets how capacity grows when the array runs out of room.
    pub fn with_growth_policy(mut self, policy: GrowthPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn set_growth_policy(&mut self, policy: GrowthPolicy) {
        self.policy = policy;
    }

    pub fn growth_policy(&self) -> GrowthPolicy {
        self.policy
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    #[inline]
    pub fn extra(&self) -> &H {
        self.raw.extra()
    }

    #[inline]
    pub fn extra_mut(&mut self) -> &mut H {
        self.raw.extra_mut()
    }

    /// Returns the number of live elements.
    #[inline]
    pub fn size(&self) -> usize {
        self.raw.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.len() == 0
    }

    /// Returns the number of element slots in the block, live or not.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Returns the number of elements that can be added without relocating.
    #[inline]
    pub fn remaining_capacity(&self) -> usize {
        self.raw.remaining_capacity()
    }

    /// Returns a reference to the element at `pos`.
    ///
    /// # Panics
    ///
    /// Panics if `pos >= len`.
    #[inline]
    #[track_caller]
    pub fn at(&self, pos: usize) -> &T {
        self.raw.at(pos)
    }

    #[inline]
    #[track_caller]
    pub fn at_mut(&mut self, pos: usize) -> &mut T {
        self.raw.at_mut(pos)
    }

    #[inline]
    pub fn get(&self, pos: usize) -> Option<&T> {
        self.as_slice().get(pos)
    }

    #[inline]
    pub fn get_mut(&mut self, pos: usize) -> Option<&mut T> {
        self.as_mut_slice().get_mut(pos)
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.raw.as_slice()
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.raw.as_mut_slice()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Address of the first byte of the record, extra fields included.
    ///
    /// Only meaningful until the next call that takes `&mut self`.
    #[inline]
    pub fn lower_bound(&self) -> *const u8 {
        self.raw.lower_bound()
    }

    /// Address one past the last live element.
    #[inline]
    pub fn upper_bound(&self) -> *const u8 {
        self.raw.upper_bound()
    }

    /// `lower_bound()..upper_bound()`: every byte of the record that is in use.
    #[inline]
    pub fn byte_range(&self) -> Range<*const u8> {
        self.raw.byte_range()
    }

    /// Makes sure `additional` more elements can be appended without relocating.
    ///
    /// On failure nothing changes.
    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        if additional <= self.raw.remaining_capacity() {
            return Ok(());
        }

        let new_cap = self.policy.grow(self.len(), self.capacity(), additional)?;
        self.try_realloc(new_cap)
    }

    /// Makes sure `additional` more elements can be appended without relocating.
    ///
    /// With the default [`GrowthPolicy::ExactFit`] the capacity afterwards is
    /// exactly `len + additional` if it had to grow.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity overflows, and aborts if the allocation fails.
    pub fn reserve(&mut self, additional: usize) {
        if let Err(err) = self.try_reserve(additional) {
            handle_error(err);
        }
    }

    #[cold]
    fn try_realloc(&mut self, new_cap: usize) -> Result<()> {
        let old_cap = self.capacity();
        let old_layout = util::record_layout::<H, T>(old_cap)?;
        let new_layout = util::record_layout::<H, T>(new_cap)?;

        // Zero-sized elements never need more bytes.
        if new_layout.size() != old_layout.size() {
            let old_block = self.raw.block_ptr();
            let result = unsafe {
                if new_layout.size() > old_layout.size() {
                    self.allocator.grow(old_block, old_layout, new_layout)
                } else {
                    self.allocator.shrink(old_block, old_layout, new_layout)
                }
            };
            let block = result
                .map_err(|_| RecordArrayError::AllocFailed { layout: new_layout })?
                .cast::<u8>();

            tracing::debug!(
                old_capacity = old_cap,
                new_capacity = new_cap,
                bytes = new_layout.size(),
                moved = block != old_block,
                "resized record array"
            );

            unsafe { self.raw.relocate(block) };
        }

        unsafe { self.raw.set_capacity(new_cap) };

        Ok(())
    }

    /// Appends `n` copies of `fill` and returns the new elements.
    pub fn extend(&mut self, n: usize, fill: T) -> &mut [T] {
        self.reserve(n);
        unsafe { self.raw.extend_filled(n, fill) }
    }

    /// Appends `n` slots without initializing them.
    ///
    /// # Safety
    ///
    /// The returned slots count as live elements: every one of them must be
    /// written before any element of the array is read.
    pub unsafe fn extend_uninit(&mut self, n: usize) -> &mut [MaybeUninit<T>] {
        self.reserve(n);
        self.raw.extend_uninit(n)
    }

    /// Appends one element and returns a reference to it.
    pub fn extend_one(&mut self, value: T) -> &mut T {
        self.reserve(1);
        unsafe { self.raw.push_within_capacity(value) }
    }

    /// Appends `value` if there is spare capacity, otherwise hands it back.
    pub fn push_within_capacity(&mut self, value: T) -> core::result::Result<&mut T, T> {
        if self.remaining_capacity() == 0 {
            return Err(value);
        }

        Ok(unsafe { self.raw.push_within_capacity(value) })
    }

    pub fn try_extend_from_slice(&mut self, items: &[T]) -> Result<()> {
        self.try_reserve(items.len())?;
        unsafe { self.raw.extend_from_slice_within_capacity(items) };

        Ok(())
    }

    pub fn extend_from_slice(&mut self, items: &[T]) {
        if let Err(err) = self.try_extend_from_slice(items) {
            handle_error(err);
        }
    }

    /// Removes the last `n` elements, or all of them if there are fewer.
    ///
    /// The block keeps its capacity.
    #[inline]
    pub fn shorten(&mut self, n: usize) {
        self.raw.shorten(n)
    }

    #[inline]
    pub fn shorten_one(&mut self) {
        self.raw.shorten(1)
    }

    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.raw.pop()
    }

    /// Forgets all elements. The capacity is kept for later appends.
    #[inline]
    pub fn clear(&mut self) {
        self.raw.clear()
    }

    /// Inserts `value` at `pos`, shifting the elements from `pos` on to the right.
    ///
    /// Appending is done with [`extend_one`](Self::extend_one).
    ///
    /// # Panics
    ///
    /// Panics if `pos >= len`.
    #[track_caller]
    pub fn insert(&mut self, pos: usize, value: T) -> &mut T {
        unsafe { self.insert_uninit(pos).write(value) }
    }

    /// Opens an uninitialized slot at `pos`.
    ///
    /// # Safety
    ///
    /// The slot must be written before any element of the array is read.
    ///
    /// # Panics
    ///
    /// Panics if `pos >= len`.
    #[track_caller]
    pub unsafe fn insert_uninit(&mut self, pos: usize) -> &mut MaybeUninit<T> {
        let len = self.len();
        if pos >= len {
            index_out_of_range("insert", pos, len);
        }

        self.reserve(1);
        self.raw.insert_uninit(pos)
    }

    /// Removes and returns the element at `pos`, shifting the following ones to
    /// the left. Never reallocates.
    ///
    /// # Panics
    ///
    /// Panics if `pos >= len`.
    #[track_caller]
    pub fn erase(&mut self, pos: usize) -> T {
        self.raw.erase(pos)
    }

    /// Reallocates the block so that capacity equals length.
    pub fn shrink_to_fit(&mut self) {
        if self.capacity() > self.len() {
            if let Err(err) = self.try_realloc(self.len()) {
                handle_error(err);
            }
        }
    }

    /// Releases the block. Same as dropping the array.
    pub fn free(self) {
        drop(self)
    }
}

impl<H: NoUninit, T: Copy + NoUninit, A: Allocator> RecordArray<H, T, A> {
    /// The bytes in `lower_bound()..upper_bound()`, for copying the whole record out verbatim.
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { self.raw.as_bytes() }
    }
}

impl<H, T: Copy, A: Allocator> Drop for RecordArray<H, T, A> {
    fn drop(&mut self) {
        let cap = self.capacity();
        unsafe {
            self.raw.drop_extra();
            // The layout was computed successfully when the block was allocated.
            if let Ok(layout) = util::record_layout::<H, T>(cap) {
                self.allocator.deallocate(self.raw.block_ptr(), layout);
            }
        }

        tracing::trace!(capacity = cap, "released record array");
    }
}

impl<H: Clone, T: Copy, A: Allocator + Clone> Clone for RecordArray<H, T, A> {
    fn clone(&self) -> Self {
        let mut v =
            Self::with_capacity_in(self.extra().clone(), self.len(), self.allocator.clone());
        v.extend_from_slice(self.as_slice());
        v.policy = self.policy;
        v
    }
}

impl<H: PartialEq, T: Copy + PartialEq, A: Allocator> PartialEq for RecordArray<H, T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.extra() == other.extra() && self.as_slice() == other.as_slice()
    }
}

impl<H: fmt::Debug, T: Copy + fmt::Debug, A: Allocator> fmt::Debug for RecordArray<H, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordArray")
            .field("extra", self.extra())
            .field("capacity", &self.capacity())
            .field("items", &self.as_slice())
            .finish()
    }
}

impl<H, T: Copy, A: Allocator> AsRef<[T]> for RecordArray<H, T, A> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<H, T: Copy, A: Allocator> AsMut<[T]> for RecordArray<H, T, A> {
    fn as_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<'a, H, T: Copy, A: Allocator> IntoIterator for &'a RecordArray<H, T, A> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
