use std::{
  alloc::{GlobalAlloc, Layout},
  ptr,
};

use spin::{Mutex, MutexGuard};

use crate::{
  block::WORD,
  config::AllocatorConfig,
  error::Result,
  first_fit::FirstFitAllocator,
  heap::Heap,
};

/// A [`FirstFitAllocator`] behind one spin lock, usable as the global
/// allocator.
///
/// The directory and the heap boundary are a single resource, so every call
/// takes the lock for its whole duration. Payloads are word aligned; layouts
/// asking for more than that get a null pointer.
///
/// ```rust,ignore
/// use brkalloc::{LockedAllocator, SbrkHeap};
///
/// #[global_allocator]
/// static ALLOCATOR: LockedAllocator<SbrkHeap> = LockedAllocator::new(SbrkHeap::new());
/// ```
///
/// The lock is not reentrant: a logger that allocates must not be installed
/// while this is the global allocator and `log` output at trace level is
/// enabled.
pub struct LockedAllocator<H: Heap>(Mutex<FirstFitAllocator<H>>);

impl<H: Heap> LockedAllocator<H> {
  pub const fn new(heap: H) -> Self {
    let config = AllocatorConfig::DEFAULT.round_to_word(true);
    Self(Mutex::new(FirstFitAllocator::with_config(heap, config)))
  }

  pub fn lock(&self) -> MutexGuard<'_, FirstFitAllocator<H>> {
    self.0.lock()
  }

  pub fn allocate(
    &self,
    size: usize,
  ) -> Result<usize> {
    self.0.lock().allocate(size)
  }

  pub fn release(
    &self,
    payload: usize,
  ) -> Result<()> {
    self.0.lock().release(payload)
  }

  /// Current heap boundary.
  pub fn boundary(&self) -> usize {
    self.0.lock().boundary()
  }
}

unsafe impl<H: Heap + Send> GlobalAlloc for LockedAllocator<H> {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > WORD {
      return ptr::null_mut();
    }

    let mut allocator = self.0.lock();
    let Ok(payload) = allocator.allocate(layout.size().max(1)) else {
      return ptr::null_mut();
    };

    let address = allocator.address_of(payload);
    if address as usize % layout.align() != 0 {
      // Only possible when the heap itself starts misaligned.
      let _ = allocator.release(payload);
      return ptr::null_mut();
    }

    address
  }

  unsafe fn dealloc(
    &self,
    address: *mut u8,
    _layout: Layout,
  ) {
    let result = {
      let mut allocator = self.0.lock();
      let payload = allocator.offset_of(address);
      allocator.release(payload)
    };

    // Reported after the lock is dropped so an allocating logger cannot
    // deadlock on it.
    if let Err(err) = result {
      log::warn!("dealloc({address:?}): {err}");
      if cfg!(debug_assertions) {
        panic!("dealloc({address:?}): {err}");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::heap::ArenaHeap;

  #[test]
  fn test_global_alloc_round_trip() {
    let allocator = LockedAllocator::new(ArenaHeap::with_capacity(1024));

    unsafe {
      let layout = Layout::new::<u64>();
      let first = allocator.alloc(layout) as *mut u64;
      assert!(!first.is_null());
      first.write(0x1122334455667788);

      let layout_array = Layout::array::<u16>(6).unwrap();
      let second = allocator.alloc(layout_array) as *mut u16;
      for i in 0..6 {
        second.add(i).write((i + 1) as u16);
      }

      assert_eq!(first.read(), 0x1122334455667788);
      for i in 0..6 {
        assert_eq!(second.add(i).read(), (i + 1) as u16);
      }

      allocator.dealloc(first as *mut u8, layout);

      let third = allocator.alloc(Layout::new::<u32>()) as *mut u32;
      assert_eq!(third as *mut u64, first);

      allocator.dealloc(third as *mut u8, Layout::new::<u32>());
      allocator.dealloc(second as *mut u8, layout_array);
    }

    assert_eq!(allocator.boundary(), 0);
  }

  #[test]
  #[cfg_attr(debug_assertions, should_panic(expected = "is not the payload of a live allocation"))]
  fn test_double_dealloc_surfaces() {
    let allocator = LockedAllocator::new(ArenaHeap::with_capacity(1024));
    let layout = Layout::new::<u64>();

    unsafe {
      let first = allocator.alloc(layout);
      let _second = allocator.alloc(layout);
      allocator.dealloc(first, layout);
      allocator.dealloc(first, layout);
    }

    // Release builds skip the assertion and leave the heap untouched.
    assert_eq!(allocator.lock().blocks().filter(|block| block.is_free).count(), 1);
  }

  #[test]
  fn test_rejects_large_alignment() {
    let allocator = LockedAllocator::new(ArenaHeap::with_capacity(1024));
    let layout = Layout::from_size_align(16, WORD * 4).unwrap();

    assert!(unsafe { allocator.alloc(layout) }.is_null());
    assert_eq!(allocator.boundary(), 0);
  }

  #[test]
  fn test_null_when_exhausted() {
    let allocator = LockedAllocator::new(ArenaHeap::with_capacity(64));

    assert!(unsafe { allocator.alloc(Layout::array::<u8>(128).unwrap()) }.is_null());
  }

  #[test]
  fn test_offset_api_rounds_to_word() {
    let allocator = LockedAllocator::new(ArenaHeap::with_capacity(1024));

    let a = allocator.allocate(3).unwrap();
    let b = allocator.allocate(3).unwrap();

    assert_eq!(b - a, WORD + crate::block::HEADER_SIZE);
    assert!(allocator.lock().config().round_to_word);

    allocator.release(b).unwrap();
    allocator.release(a).unwrap();
    assert_eq!(allocator.boundary(), 0);
  }
}
