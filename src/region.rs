use std::{mem, ptr, ptr::NonNull};

use tracing::{debug, warn};

use crate::{align, os};

/// Header of a single contiguous block of memory with a bump cursor.
///
/// Regions created by [`Region::acquire`] live at the first bytes of their own
/// mapping; the allocatable bytes start right after the header:
///
/// ```text
///   ┌──────────────────┬──────────────────────────────────────────┐
///   │  Region header   │  used  │         remaining                │
///   └──────────────────┴────────┴──────────────────────────────────┘
///   ▲                  ▲        ▲                                  ▲
///   mapping            base     free                        base + capacity
/// ```
#[repr(C)]
#[derive(Debug)]
pub struct Region {
  pub(crate) next: *mut Region,
  capacity: usize,
  free: usize,
  base: usize,
}

impl Region {
  /// Bytes taken from every mapping by the header itself.
  pub const HEADER_SIZE: usize = mem::size_of::<Region>();

  /// Sets up bookkeeping over `capacity` bytes starting at `base`.
  ///
  /// No memory is touched; the caller keeps `[base, base + capacity)` alive
  /// and unaliased for as long as allocations from this region are used.
  pub fn new(
    capacity: usize,
    base: usize,
  ) -> Self {
    Self {
      next: ptr::null_mut(),
      capacity,
      free: base,
      base,
    }
  }

  /// Maps `size` bytes from the OS and writes a region header at the start.
  ///
  /// Aborts the process if the mapping fails. `size` must exceed
  /// [`Region::HEADER_SIZE`].
  pub(crate) fn acquire(size: usize) -> NonNull<Region> {
    debug_assert!(size > Self::HEADER_SIZE);

    let page = os::map_or_abort(size);
    let region = page.cast::<Region>();
    let base = page.as_ptr() as usize + Self::HEADER_SIZE;

    // mmap hands out page aligned memory, which satisfies the header's alignment.
    unsafe { region.as_ptr().write(Region::new(size - Self::HEADER_SIZE, base)) };

    debug!(
      mapping = ?page,
      base = ?(base as *const u8),
      capacity = size - Self::HEADER_SIZE,
      "acquired region"
    );

    region
  }

  /// Unmaps a region created by [`Region::acquire`], header included.
  ///
  /// # Safety
  ///
  /// `region` must come from [`Region::acquire`] with the same `size`, and no
  /// address derived from it may be used after this call.
  pub(crate) unsafe fn release(
    region: NonNull<Region>,
    size: usize,
  ) {
    if let Err(err) = unsafe { os::unmap(region.cast::<u8>(), size) } {
      warn!(%err, "failed to release region");
    }
  }

  #[inline]
  fn aligned_start(
    &self,
    size: usize,
    align: usize,
  ) -> Option<NonNull<u8>> {
    debug_assert!(align::is_valid(align), "alignment must be a power of two");

    let start = align::align_up(self.free, align)?;
    let end = start.checked_add(size)?;

    if end > self.end() {
      return None;
    }

    // Address zero is never handed out.
    NonNull::new(start as *mut u8)
  }

  /// Whether an `align`-aligned block of `size` bytes fits in the remaining space.
  #[inline]
  pub fn has_space(
    &self,
    size: usize,
    align: usize,
  ) -> bool {
    self.aligned_start(size, align).is_some()
  }

  /// Bumps the cursor past an `align`-aligned block of `size` bytes.
  ///
  /// Returns `None` when the block does not fit; the region is left unchanged.
  #[inline]
  pub fn allocate(
    &mut self,
    size: usize,
    align: usize,
  ) -> Option<NonNull<u8>> {
    let block = self.aligned_start(size, align)?;
    self.free = block.as_ptr() as usize + size;

    Some(block)
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn base_address(&self) -> usize {
    self.base
  }

  pub fn free_cursor(&self) -> usize {
    self.free
  }

  /// Bytes consumed so far, alignment padding included.
  pub fn used(&self) -> usize {
    self.free - self.base
  }

  pub fn remaining(&self) -> usize {
    self.end() - self.free
  }

  /// Whether `[addr, addr + size)` lies inside this region's payload.
  pub fn contains(
    &self,
    addr: usize,
    size: usize,
  ) -> bool {
    addr >= self.base && addr.checked_add(size).is_some_and(|end| end <= self.end())
  }

  #[inline]
  fn end(&self) -> usize {
    self.base + self.capacity
  }
}
