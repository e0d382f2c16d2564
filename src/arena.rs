use std::{alloc::Layout, marker::PhantomData, ptr, ptr::NonNull};

use tracing::{debug, trace};

use crate::{
  align,
  config::ArenaConfig,
  error::{ArenaError, Result},
  os,
  region::Region,
};

/// Bump allocator over a chain of OS-mapped regions of equal size.
///
/// Memory handed out by [`Arena::allocate`] stays valid until [`Arena::release`]
/// is called or the arena is dropped, whichever comes first. There is no way
/// to free a single allocation.
///
/// The arena is neither `Send` nor `Sync`.
#[derive(Debug)]
pub struct Arena {
  head: *mut Region,
  current: *mut Region,
  region_size: usize,
  region_count: usize,
  page_size: usize,
}

impl Arena {
  /// Creates an arena whose regions each map `region_size` bytes.
  ///
  /// The first region is mapped immediately. Fails if `region_size` leaves no
  /// room after the region header; aborts the process if the OS refuses the
  /// mapping.
  pub fn new(region_size: usize) -> Result<Self> {
    Self::with_config(&ArenaConfig::new(region_size))
  }

  pub fn with_config(config: &ArenaConfig) -> Result<Self> {
    config.validate()?;

    let region = Region::acquire(config.region_size).as_ptr();

    debug!(region_size = config.region_size, "arena created");

    Ok(Self {
      head: region,
      current: region,
      region_size: config.region_size,
      region_count: 1,
      page_size: os::page_size(),
    })
  }

  /// Returns an `align`-aligned block of `size` bytes.
  ///
  /// When the current region is exhausted a new one is mapped and the request
  /// is served from it. Requests that no region could ever hold fail with
  /// [`ArenaError::RequestTooLarge`] without mapping anything.
  pub fn allocate(
    &mut self,
    size: usize,
    align: usize,
  ) -> Result<NonNull<u8>> {
    if self.current.is_null() {
      return Err(ArenaError::ArenaClosed);
    }

    if !align::is_valid(align) {
      return Err(ArenaError::InvalidAlignment(align));
    }

    if size > self.max_request() {
      return Err(self.too_large(size, align));
    }

    // `current` is non-null and points at a live region owned by this arena.
    let block = match unsafe { (*self.current).allocate(size, align) } {
      Some(block) => block,
      None => {
        if !self.fits_fresh_region(size, align) {
          return Err(self.too_large(size, align));
        }

        self.grow();
        unsafe { (*self.current).allocate(size, align) }.ok_or_else(|| self.too_large(size, align))?
      }
    };

    trace!(addr = ?block, size, align, region_count = self.region_count, "allocated");

    Ok(block)
  }

  /// Allocates a block matching `layout`.
  pub fn allocate_layout(
    &mut self,
    layout: Layout,
  ) -> Result<NonNull<u8>> {
    self.allocate(layout.size(), layout.align())
  }

  /// Unmaps every region. Later allocations fail with [`ArenaError::ArenaClosed`].
  ///
  /// Calling this on a released arena does nothing.
  pub fn release(&mut self) {
    if self.head.is_null() {
      return;
    }

    let released = self.region_count;
    let mut region = self.head;

    while let Some(current) = NonNull::new(region) {
      unsafe {
        region = current.as_ref().next;
        Region::release(current, self.region_size);
      }
    }

    self.head = ptr::null_mut();
    self.current = ptr::null_mut();
    self.region_count = 0;

    debug!(regions = released, "arena released");
  }

  pub fn region_count(&self) -> usize {
    self.region_count
  }

  pub fn region_size(&self) -> usize {
    self.region_size
  }

  /// Largest `size` accepted by [`Arena::allocate`] at alignment 1.
  pub fn max_request(&self) -> usize {
    self.region_size - Region::HEADER_SIZE
  }

  pub fn is_closed(&self) -> bool {
    self.current.is_null()
  }

  /// Bytes consumed across all regions, alignment padding included.
  pub fn bytes_used(&self) -> usize {
    self.regions().map(Region::used).sum()
  }

  /// Regions in creation order, the current one last.
  pub fn regions(&self) -> Regions<'_> {
    Regions {
      next: self.head,
      _arena: PhantomData,
    }
  }

  /// Whether a request is guaranteed to succeed in a freshly mapped, empty region.
  ///
  /// Mappings are page aligned, so a fresh region's payload starts at
  /// `HEADER_SIZE` past a page boundary. Beyond page alignment the mapping
  /// address says nothing, and the worst-case padding of `align - 1` applies.
  fn fits_fresh_region(
    &self,
    size: usize,
    align: usize,
  ) -> bool {
    let start = if align <= self.page_size {
      align::align_up(Region::HEADER_SIZE, align)
    } else {
      Region::HEADER_SIZE.checked_add(align - 1)
    };

    start
      .and_then(|start| start.checked_add(size))
      .is_some_and(|end| end <= self.region_size)
  }

  fn too_large(
    &self,
    size: usize,
    align: usize,
  ) -> ArenaError {
    ArenaError::RequestTooLarge {
      size,
      align,
      max: self.max_request(),
    }
  }

  fn grow(&mut self) {
    let region = Region::acquire(self.region_size).as_ptr();

    unsafe { (*self.current).next = region };
    self.current = region;
    self.region_count += 1;

    debug!(region_count = self.region_count, "arena grew by one region");
  }
}

impl Drop for Arena {
  fn drop(&mut self) {
    self.release();
  }
}

/// Iterator over the regions of an [`Arena`], see [`Arena::regions`].
pub struct Regions<'a> {
  next: *mut Region,
  _arena: PhantomData<&'a Arena>,
}

impl<'a> Iterator for Regions<'a> {
  type Item = &'a Region;

  fn next(&mut self) -> Option<Self::Item> {
    let region = unsafe { self.next.as_ref()? };
    self.next = region.next;

    Some(region)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn addr(block: NonNull<u8>) -> usize {
    block.as_ptr() as usize
  }

  fn owning_region(
    arena: &Arena,
    addr: usize,
    size: usize,
  ) -> Option<usize> {
    arena.regions().position(|region| region.contains(addr, size))
  }

  #[test]
  fn test_arena_lifecycle() {
    let mut arena = Arena::new(Region::HEADER_SIZE + 8).unwrap();
    assert_eq!(arena.region_count(), 1);

    let first = arena.allocate(5, 8).unwrap();
    assert_eq!(arena.region_count(), 1);
    assert_eq!(owning_region(&arena, addr(first), 5), Some(0));

    let second = arena.allocate(5, 8).unwrap();
    assert_eq!(arena.region_count(), 2);
    assert_eq!(owning_region(&arena, addr(second), 5), Some(1));

    assert!(matches!(
      arena.allocate(9, 16),
      Err(ArenaError::RequestTooLarge { size: 9, max: 8, .. })
    ));
    assert_eq!(arena.region_count(), 2);

    arena.release();
    assert_eq!(arena.region_count(), 0);
    assert!(arena.is_closed());
    assert!(matches!(arena.allocate(2, 2), Err(ArenaError::ArenaClosed)));
  }

  #[test]
  fn test_release_is_idempotent() {
    let mut arena = Arena::new(os::page_size()).unwrap();
    arena.allocate(64, 8).unwrap();

    arena.release();
    arena.release();

    assert_eq!(arena.region_count(), 0);
    assert_eq!(arena.regions().count(), 0);
    assert!(matches!(arena.allocate(1, 1), Err(ArenaError::ArenaClosed)));
  }

  #[test]
  fn test_region_too_small() {
    assert!(matches!(
      Arena::new(Region::HEADER_SIZE),
      Err(ArenaError::RegionTooSmall { .. })
    ));
    assert!(Arena::new(0).is_err());
  }

  #[test]
  fn test_invalid_alignment() {
    let mut arena = Arena::new(os::page_size()).unwrap();

    assert!(matches!(arena.allocate(8, 0), Err(ArenaError::InvalidAlignment(0))));
    assert!(matches!(arena.allocate(8, 12), Err(ArenaError::InvalidAlignment(12))));
    assert_eq!(arena.bytes_used(), 0);
  }

  #[test]
  fn test_oversized_request_does_not_grow() {
    let mut arena = Arena::new(os::page_size()).unwrap();
    let max = arena.max_request();

    assert!(matches!(arena.allocate(max + 1, 1), Err(ArenaError::RequestTooLarge { .. })));
    assert!(matches!(arena.allocate(usize::MAX, 1), Err(ArenaError::RequestTooLarge { .. })));
    assert_eq!(arena.region_count(), 1);

    let whole = arena.allocate(max, 1).unwrap();
    assert_eq!(owning_region(&arena, addr(whole), max), Some(0));
    assert_eq!(arena.region_count(), 1);
  }

  #[test]
  fn test_over_aligned_request_is_too_large_for_fresh_region() {
    let mut arena = Arena::new(Region::HEADER_SIZE + 8).unwrap();

    // The payload starts HEADER_SIZE past a page boundary, so a page-aligned
    // block can never start inside it.
    let page = os::page_size();
    assert!(matches!(arena.allocate(1, page), Err(ArenaError::RequestTooLarge { .. })));
    assert!(matches!(arena.allocate(1, page * 2), Err(ArenaError::RequestTooLarge { .. })));
    assert_eq!(arena.region_count(), 1);
  }

  #[test]
  fn test_over_page_alignment_in_multi_page_regions() {
    let page = os::page_size();
    let mut arena = Arena::new(page * 16).unwrap();

    let first = arena.allocate(8, page * 2).unwrap();
    assert_eq!(addr(first) % (page * 2), 0);
    assert_eq!(owning_region(&arena, addr(first), 8), Some(0));
    assert_eq!(arena.region_count(), 1);

    let rest = arena.regions().last().unwrap().remaining();
    arena.allocate(rest, 1).unwrap();
    assert_eq!(arena.region_count(), 1);

    let spilled = arena.allocate(8, page * 2).unwrap();
    assert_eq!(addr(spilled) % (page * 2), 0);
    assert_eq!(arena.region_count(), 2);
    assert_eq!(owning_region(&arena, addr(spilled), 8), Some(1));
  }

  #[test]
  fn test_exhaustion_adds_exactly_one_region() {
    let mut arena = Arena::new(os::page_size()).unwrap();
    let chunk = arena.max_request() / 4;

    for _ in 0..4 {
      arena.allocate(chunk, 1).unwrap();
    }
    assert_eq!(arena.region_count(), 1);

    let before = arena.region_count();
    let spilled = arena.allocate(chunk, 8).unwrap();

    assert_eq!(arena.region_count(), before + 1);
    assert_eq!(owning_region(&arena, addr(spilled), chunk), Some(before));
  }

  #[test]
  fn test_allocations_are_aligned_contained_and_disjoint() {
    let mut arena = Arena::new(os::page_size()).unwrap();
    let sizes = [1usize, 24, 3, 100, 7, 512, 64, 9, 1000];
    let aligns = [1usize, 8, 2, 64, 4, 16, 256, 1, 32];

    let mut blocks: Vec<(usize, usize, usize)> = Vec::new();

    for round in 0..200 {
      let size = sizes[round % sizes.len()];
      let align = aligns[round % aligns.len()];
      let block = addr(arena.allocate(size, align).unwrap());

      assert_eq!(block % align, 0);
      let region = owning_region(&arena, block, size).unwrap();

      if let Some(&(prev_region, prev_addr, prev_size)) = blocks.last() {
        if prev_region == region {
          assert!(block >= prev_addr + prev_size);
        } else {
          assert_eq!(region, prev_region + 1);
        }
      }

      blocks.push((region, block, size));
    }

    assert!(arena.region_count() > 1);
    assert_eq!(arena.regions().count(), arena.region_count());
  }

  #[test]
  fn test_only_last_region_has_no_successor() {
    let mut arena = Arena::new(Region::HEADER_SIZE + 16).unwrap();

    for _ in 0..5 {
      arena.allocate(16, 1).unwrap();
    }

    let regions: Vec<_> = arena.regions().collect();
    assert_eq!(regions.len(), 5);

    for region in &regions[..4] {
      assert!(!region.next.is_null());
    }
    assert!(regions[4].next.is_null());
    assert_eq!(regions[4] as *const Region, arena.current as *const Region);
  }

  #[test]
  fn test_allocated_memory_is_usable() {
    let mut arena = Arena::new(os::page_size()).unwrap();

    unsafe {
      let first = arena.allocate_layout(Layout::new::<u64>()).unwrap().cast::<u64>();
      first.as_ptr().write(3);

      let count = 6;
      let second = arena
        .allocate_layout(Layout::array::<u16>(count).unwrap())
        .unwrap()
        .cast::<u16>();

      for i in 0..count {
        second.as_ptr().add(i).write((i + 1) as u16);
      }

      assert_eq!(first.as_ptr().read(), 3);
      for i in 0..count {
        assert_eq!((i + 1) as u16, second.as_ptr().add(i).read());
      }

      let third = arena.allocate_layout(Layout::new::<u128>()).unwrap().cast::<u128>();
      third.as_ptr().write(25);

      assert!(third.as_ptr() as usize > second.as_ptr() as usize);
      assert_eq!(first.as_ptr().read(), 3);
      assert_eq!(third.as_ptr().read(), 25);
    }
  }

  #[test]
  fn test_bytes_used_counts_padding() {
    let mut arena = Arena::with_config(&ArenaConfig::default()).unwrap();

    arena.allocate(1, 1).unwrap();
    arena.allocate(8, 8).unwrap();

    let base = arena.regions().next().unwrap().base_address();
    let expected = align::align_up(base + 1, 8).unwrap() + 8 - base;
    assert_eq!(arena.bytes_used(), expected);
  }
}
