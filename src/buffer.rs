use std::ptr::NonNull;

use libc::{c_void, calloc, free};

use crate::error::{HeapError, Resource};

/// The memory region a heap hands out, obtained from the C allocator.
///
/// The region is zero-filled on creation and released exactly once, on drop.
pub(crate) struct RawBuffer {
  ptr: NonNull<u8>,
  len: usize,
}

impl RawBuffer {
  pub fn reserve(len: usize) -> Result<Self, HeapError> {
    // SAFETY: calloc has no preconditions; a null return is handled below.
    let raw = unsafe { calloc(1, len) } as *mut u8;

    NonNull::new(raw)
      .map(|ptr| Self { ptr, len })
      .ok_or(HeapError::OutOfMemory {
        resource: Resource::Buffer,
        bytes: len,
      })
  }

  pub fn len(&self) -> usize {
    self.len
  }

  /// Pointer to byte `offset` of the region.
  ///
  /// Returns `None` when `offset` is past the end of the region.
  pub fn ptr_at(
    &self,
    offset: usize,
  ) -> Option<NonNull<u8>> {
    if offset > self.len {
      return None;
    }
    // SAFETY: `offset` is at most one past the end of the allocation.
    Some(unsafe { self.ptr.add(offset) })
  }

  /// Views `len` bytes starting at `offset`.
  pub fn slice(
    &self,
    offset: usize,
    len: usize,
  ) -> Option<&[u8]> {
    if offset.checked_add(len)? > self.len {
      return None;
    }
    let ptr = self.ptr_at(offset)?;
    // SAFETY: the range lies inside the region, which calloc initialised.
    Some(unsafe { std::slice::from_raw_parts(ptr.as_ptr(), len) })
  }

  /// Mutable view of `len` bytes starting at `offset`.
  pub fn slice_mut(
    &mut self,
    offset: usize,
    len: usize,
  ) -> Option<&mut [u8]> {
    if offset.checked_add(len)? > self.len {
      return None;
    }
    let ptr = self.ptr_at(offset)?;
    // SAFETY: as in `slice`; `&mut self` makes the view exclusive.
    Some(unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), len) })
  }
}

impl Drop for RawBuffer {
  fn drop(&mut self) {
    // SAFETY: `ptr` came from calloc and is freed only here.
    unsafe { free(self.ptr.as_ptr() as *mut c_void) };
  }
}

// The buffer is uniquely owned, so moving it to another thread is fine.
unsafe impl Send for RawBuffer {}
