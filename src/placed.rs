//! Record arrays living in a caller-supplied buffer.
//!
//! The capacity of a [`PlacedRecordArray`] is whatever the buffer affords and
//! never changes. Requests for more room fail with
//! [`RecordArrayError::CapacityExceeded`] and leave the array as it was. The
//! buffer stays borrowed for as long as the array exists; dropping the array
//! drops the extra fields and gives the buffer back, it never frees anything.

use core::fmt;
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ops::Range;
use core::ptr::NonNull;

use bytemuck::NoUninit;

use crate::error::{RecordArrayError, Result};
use crate::raw::{index_out_of_range, RawRecord};
use crate::util;

pub struct PlacedRecordArray<'buf, H, T: Copy> {
    raw: RawRecord<H, T>,
    _buffer: PhantomData<&'buf mut [u8]>,
}

unsafe impl<'buf, H: Send, T: Copy + Send> Send for PlacedRecordArray<'buf, H, T> {}
unsafe impl<'buf, H: Sync, T: Copy + Sync> Sync for PlacedRecordArray<'buf, H, T> {}

impl<'buf, H, T: Copy> PlacedRecordArray<'buf, H, T> {
    /// Sets up an empty record at the start of `buffer`.
    ///
    /// If the buffer is not suitably aligned, the record starts at the first
    /// aligned byte and the skipped bytes are not used. The capacity is the
    /// number of whole elements that fit after the control fields.
    ///
    /// Fails with [`RecordArrayError::BufferTooSmall`] if the control fields do not fit.
    pub fn new_in(extra: H, buffer: &'buf mut [u8]) -> Result<Self> {
        let size = buffer.len();
        let offset = buffer.as_mut_ptr().align_offset(util::block_align::<H, T>());
        let required = offset.saturating_add(util::storage_offset::<H, T>());

        let cap = size
            .checked_sub(offset)
            .and_then(util::capacity_for_size::<H, T>)
            .ok_or(RecordArrayError::BufferTooSmall { size, required })?;

        let raw = unsafe {
            let block = NonNull::new_unchecked(buffer.as_mut_ptr().add(offset));
            RawRecord::init(block, extra, cap)
        };
        tracing::trace!(capacity = cap, bytes = size, "placed record array");

        Ok(PlacedRecordArray {
            raw,
            _buffer: PhantomData,
        })
    }

    #[inline]
    pub fn extra(&self) -> &H {
        self.raw.extra()
    }

    #[inline]
    pub fn extra_mut(&mut self) -> &mut H {
        self.raw.extra_mut()
    }

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

    /// Returns the fixed number of element slots the buffer affords.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    #[inline]
    pub fn remaining_capacity(&self) -> usize {
        self.raw.remaining_capacity()
    }

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

    #[inline]
    pub fn lower_bound(&self) -> *const u8 {
        self.raw.lower_bound()
    }

    #[inline]
    pub fn upper_bound(&self) -> *const u8 {
        self.raw.upper_bound()
    }

    #[inline]
    pub fn byte_range(&self) -> Range<*const u8> {
        self.raw.byte_range()
    }

    /// Checks that `additional` more elements fit in the buffer.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let capacity = self.capacity();
        if additional <= self.raw.remaining_capacity() {
            return Ok(());
        }

        let requested = self.len().saturating_add(additional);
        tracing::debug!(requested, capacity, "placed record array cannot grow");

        Err(RecordArrayError::CapacityExceeded {
            requested,
            capacity,
        })
    }

    /// Appends `n` copies of `fill` and returns the new elements.
    pub fn extend(&mut self, n: usize, fill: T) -> Result<&mut [T]> {
        self.reserve(n)?;
        Ok(unsafe { self.raw.extend_filled(n, fill) })
    }

    /// Appends `n` slots without initializing them.
    ///
    /// # Safety
    ///
    /// Every returned slot must be written before any element of the array is read.
    pub unsafe fn extend_uninit(&mut self, n: usize) -> Result<&mut [MaybeUninit<T>]> {
        self.reserve(n)?;
        Ok(self.raw.extend_uninit(n))
    }

    pub fn extend_one(&mut self, value: T) -> Result<&mut T> {
        self.reserve(1)?;
        Ok(unsafe { self.raw.push_within_capacity(value) })
    }

    /// Appends all of `items`, or none of them if they do not fit.
    pub fn extend_from_slice(&mut self, items: &[T]) -> Result<()> {
        self.reserve(items.len())?;
        unsafe { self.raw.extend_from_slice_within_capacity(items) };

        Ok(())
    }

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

    #[inline]
    pub fn clear(&mut self) {
        self.raw.clear()
    }

    /// Inserts `value` at `pos`, shifting the elements from `pos` on to the right.
    ///
    /// # Panics
    ///
    /// Panics if `pos >= len`.
    #[track_caller]
    pub fn insert(&mut self, pos: usize, value: T) -> Result<&mut T> {
        let slot = unsafe { self.insert_uninit(pos)? };
        Ok(slot.write(value))
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
    pub unsafe fn insert_uninit(&mut self, pos: usize) -> Result<&mut MaybeUninit<T>> {
        let len = self.len();
        if pos >= len {
            index_out_of_range("insert", pos, len);
        }

        self.reserve(1)?;
        Ok(self.raw.insert_uninit(pos))
    }

    /// # Panics
    ///
    /// Panics if `pos >= len`.
    #[track_caller]
    pub fn erase(&mut self, pos: usize) -> T {
        self.raw.erase(pos)
    }
}

impl<'buf, H: NoUninit, T: Copy + NoUninit> PlacedRecordArray<'buf, H, T> {
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { self.raw.as_bytes() }
    }
}

impl<'buf, H, T: Copy> Drop for PlacedRecordArray<'buf, H, T> {
    fn drop(&mut self) {
        unsafe { self.raw.drop_extra() }
    }
}

impl<'buf, H: PartialEq, T: Copy + PartialEq> PartialEq for PlacedRecordArray<'buf, H, T> {
    fn eq(&self, other: &Self) -> bool {
        self.extra() == other.extra() && self.as_slice() == other.as_slice()
    }
}

impl<'buf, H: fmt::Debug, T: Copy + fmt::Debug> fmt::Debug for PlacedRecordArray<'buf, H, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlacedRecordArray")
            .field("extra", self.extra())
            .field("capacity", &self.capacity())
            .field("items", &self.as_slice())
            .finish()
    }
}

impl<'buf, H, T: Copy> AsRef<[T]> for PlacedRecordArray<'buf, H, T> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<'buf, H, T: Copy> AsMut<[T]> for PlacedRecordArray<'buf, H, T> {
    fn as_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<'a, 'buf, H, T: Copy> IntoIterator for &'a PlacedRecordArray<'buf, H, T> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C, align(16))]
    struct Buffer<const N: usize>([u8; N]);

    #[test]
    fn capacity_derived_from_buffer_size() {
        let mut buffer = Buffer([0u8; 256]);
        let start = buffer.0.as_ptr();
        let v: PlacedRecordArray<(), u64> = PlacedRecordArray::new_in((), &mut buffer.0).unwrap();
        let offset = util::storage_offset::<(), u64>();
        assert_eq!(v.capacity(), (256 - offset) / 8);
        assert_eq!(v.len(), 0);
        assert_eq!(v.lower_bound(), start);
    }

    #[test]
    fn partial_element_is_not_counted() {
        let mut buffer = Buffer([0u8; 64]);
        let offset = util::storage_offset::<(), u32>();
        let v: PlacedRecordArray<(), u32> =
            PlacedRecordArray::new_in((), &mut buffer.0[..offset + 7]).unwrap();
        assert_eq!(v.capacity(), 1);
    }

    #[test]
    fn buffer_too_small() {
        let mut buffer = Buffer([0u8; 8]);
        let err = PlacedRecordArray::<(), u32>::new_in((), &mut buffer.0).unwrap_err();
        assert_eq!(
            err,
            RecordArrayError::BufferTooSmall {
                size: 8,
                required: util::storage_offset::<(), u32>(),
            }
        );
    }

    #[test]
    fn header_only_buffer_has_no_capacity() {
        let mut buffer = Buffer([0u8; 64]);
        let offset = util::storage_offset::<(), u32>();
        let mut v: PlacedRecordArray<(), u32> =
            PlacedRecordArray::new_in((), &mut buffer.0[..offset]).unwrap();
        assert_eq!(v.capacity(), 0);
        assert!(v.extend_one(1).is_err());
    }

    #[test]
    fn misaligned_buffer_skips_leading_bytes() {
        let mut buffer = Buffer([0u8; 128]);
        let v: PlacedRecordArray<(), u64> =
            PlacedRecordArray::new_in((), &mut buffer.0[1..]).unwrap();
        let align = util::block_align::<(), u64>();
        assert_eq!(v.lower_bound() as usize % align, 0);

        let offset = util::storage_offset::<(), u64>();
        assert_eq!(v.capacity(), (128 - align - offset) / 8);
    }

    #[test]
    fn growth_past_capacity_is_rejected() {
        let mut buffer = Buffer([0u8; 64]);
        let offset = util::storage_offset::<(), u32>();
        let mut v: PlacedRecordArray<(), u32> =
            PlacedRecordArray::new_in((), &mut buffer.0[..offset + 16]).unwrap();
        assert_eq!(v.capacity(), 4);

        v.extend_from_slice(&[1, 2, 3]).unwrap();
        assert_eq!(
            v.extend(2, 0).unwrap_err(),
            RecordArrayError::CapacityExceeded { requested: 5, capacity: 4 }
        );
        assert_eq!(
            v.extend_from_slice(&[4, 5]).unwrap_err(),
            RecordArrayError::CapacityExceeded { requested: 5, capacity: 4 }
        );
        assert_eq!(v.as_slice(), &[1, 2, 3]);

        v.insert(0, 0).unwrap();
        assert_eq!(v.as_slice(), &[0, 1, 2, 3]);
        assert!(v.insert(0, 9).is_err());
        assert!(v.extend_one(9).is_err());
        assert!(v.reserve(1).is_err());
        assert_eq!(v.as_slice(), &[0, 1, 2, 3]);
        assert_eq!(v.capacity(), 4);

        v.erase(3);
        assert_eq!(*v.extend_one(7).unwrap(), 7);
        assert_eq!(v.as_slice(), &[0, 1, 2, 7]);
    }

    #[test]
    #[should_panic(expected = "insert: position 0 should be < len 0")]
    fn insert_into_empty_panics() {
        let mut buffer = Buffer([0u8; 64]);
        let mut v: PlacedRecordArray<(), u32> =
            PlacedRecordArray::new_in((), &mut buffer.0).unwrap();
        let _ = v.insert(0, 1);
    }

    #[test]
    fn extra_fields_written_in_buffer() {
        let mut buffer = Buffer([0xFFu8; 128]);
        {
            let mut v: PlacedRecordArray<u32, u16> =
                PlacedRecordArray::new_in(0x0102_0304, &mut buffer.0).unwrap();
            v.extend_from_slice(&[5, 6]).unwrap();
            assert_eq!(v.as_bytes().len(), util::storage_offset::<u32, u16>() + 4);
            *v.extra_mut() = 9;
        }

        assert_eq!(&buffer.0[..4], &9u32.to_ne_bytes());
        let offset = util::storage_offset::<u32, u16>();
        assert_eq!(&buffer.0[offset..offset + 2], &5u16.to_ne_bytes());
    }

    #[test]
    fn zero_sized_items() {
        let mut buffer = Buffer([0u8; 64]);
        let mut v: PlacedRecordArray<(), ()> =
            PlacedRecordArray::new_in((), &mut buffer.0).unwrap();
        assert_eq!(v.capacity(), isize::MAX as usize);
        v.extend(100, ()).unwrap();
        assert_eq!(v.len(), 100);
    }
}
