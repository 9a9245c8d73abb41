use std::{ptr, slice};

use libc::{c_void, intptr_t, sbrk};

use crate::{
  align,
  error::{AllocError, Result},
  heap::Heap,
};

/// The process heap, grown and shrunk with `sbrk(2)`.
///
/// The heap starts at the program break seen by the first [`grow`](Heap::grow),
/// padded up to the machine word. From then on the break must only move
/// through this value: anybody else calling `brk`/`sbrk` (including a libc
/// `malloc` that uses the main arena) breaks the layout, which `grow` reports
/// as [`AllocError::ForeignBreak`].
///
/// Once the heap shrinks back to zero bytes the padding is returned too, so
/// the program break ends where it was before the first `grow`, and the next
/// `grow` claims a fresh start.
pub struct SbrkHeap {
  start: *mut u8,
  len: usize,
  padding: usize,
}

// The heap is only reachable through the value that owns it.
unsafe impl Send for SbrkHeap {}

impl SbrkHeap {
  pub const fn new() -> Self {
    Self {
      start: ptr::null_mut(),
      len: 0,
      padding: 0,
    }
  }

  /// Current program break, `sbrk(0)`.
  pub fn program_break() -> *mut u8 {
    unsafe { sbrk(0) as *mut u8 }
  }

  /// Address of offset zero, null until the heap first grows.
  pub fn start(&self) -> *mut u8 {
    self.start
  }

  fn claim_start(&mut self) -> Result<()> {
    let current = Self::program_break() as usize;
    let padding = align!(current) - current;

    if padding > 0 && is_failure(unsafe { sbrk(padding as intptr_t) }) {
      return Err(AllocError::OutOfMemory { requested: padding });
    }

    self.start = Self::program_break();
    self.padding = padding;
    log::debug!("SbrkHeap starts at {:?} after {padding} bytes of padding", self.start);

    Ok(())
  }

  // Hands the alignment padding back once the heap is empty.
  fn release_start(&mut self) {
    if self.padding > 0 {
      unsafe { sbrk(-(self.padding as intptr_t)) };
    }

    self.start = ptr::null_mut();
    self.padding = 0;
  }
}

impl Default for SbrkHeap {
  fn default() -> Self {
    Self::new()
  }
}

fn is_failure(address: *mut c_void) -> bool {
  address == usize::MAX as *mut c_void
}

impl Heap for SbrkHeap {
  fn grow(
    &mut self,
    n: usize,
  ) -> Result<usize> {
    let increment = intptr_t::try_from(n).map_err(|_| AllocError::OutOfMemory { requested: n })?;

    if self.start.is_null() {
      self.claim_start()?;
    }

    let expected = self.start.wrapping_add(self.len);
    let address = unsafe { sbrk(increment) };

    if is_failure(address) {
      return Err(AllocError::OutOfMemory { requested: n });
    }

    if address as *mut u8 != expected {
      unsafe { sbrk(-increment) };
      return Err(AllocError::ForeignBreak);
    }

    let offset = self.len;
    self.len += n;
    log::debug!("SbrkHeap::grow({n}) -> {offset:#x}, program break = {:?}", Self::program_break());

    Ok(offset)
  }

  fn shrink(
    &mut self,
    n: usize,
  ) {
    debug_assert!(n <= self.len, "shrinking below the heap start");

    // `n` fits in `intptr_t` because it was claimed through `grow`.
    unsafe { sbrk(-(n as intptr_t)) };
    self.len -= n;

    if self.len == 0 {
      self.release_start();
    }

    log::debug!("SbrkHeap::shrink({n}), program break = {:?}", Self::program_break());
  }

  fn boundary(&self) -> usize {
    self.len
  }

  fn bytes(
    &self,
    offset: usize,
    len: usize,
  ) -> &[u8] {
    assert!(offset + len <= self.len, "read past the program break");
    unsafe { slice::from_raw_parts(self.start.add(offset), len) }
  }

  fn bytes_mut(
    &mut self,
    offset: usize,
    len: usize,
  ) -> &mut [u8] {
    assert!(offset + len <= self.len, "write past the program break");
    unsafe { slice::from_raw_parts_mut(self.start.add(offset), len) }
  }

  fn base_ptr(&mut self) -> *mut u8 {
    self.start
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  // These move the real program break, which the test harness and libc's
  // malloc share. Run them alone: `cargo test -- --ignored --test-threads=1`.

  #[test]
  #[ignore]
  fn test_grow_moves_program_break() {
    let mut heap = SbrkHeap::new();
    let before = SbrkHeap::program_break();

    let offset = heap.grow(64).unwrap();
    let after_grow = SbrkHeap::program_break();

    assert_eq!(offset, 0);
    assert_eq!(heap.start() as usize % std::mem::size_of::<usize>(), 0);
    assert_eq!(after_grow, heap.start().wrapping_add(64));

    heap.bytes_mut(0, 4).copy_from_slice(&[1, 2, 3, 4]);
    assert_eq!(heap.bytes(0, 4), &[1, 2, 3, 4]);

    heap.shrink(64);
    assert_eq!(SbrkHeap::program_break(), before);
    assert_eq!(heap.boundary(), 0);
    assert!(heap.start().is_null());
  }

  #[test]
  #[ignore]
  fn test_padding_is_returned_when_empty() {
    let word = std::mem::size_of::<usize>();
    let misalign = if SbrkHeap::program_break() as usize % word == 0 { 1 } else { 0 };
    unsafe { sbrk(misalign) };
    let before = SbrkHeap::program_break();
    let mut heap = SbrkHeap::new();

    heap.grow(64).unwrap();
    assert_eq!(heap.start() as usize % word, 0);
    assert!(heap.start() > before);

    heap.shrink(64);
    assert_eq!(SbrkHeap::program_break(), before);

    unsafe { sbrk(-misalign) };
  }

  #[test]
  #[ignore]
  fn test_foreign_break_move_is_reported() {
    let mut heap = SbrkHeap::new();
    heap.grow(64).unwrap();
    let claimed = SbrkHeap::program_break();

    unsafe { sbrk(16) };

    assert_eq!(heap.grow(32), Err(AllocError::ForeignBreak));
    assert_eq!(heap.boundary(), 64);
    assert_eq!(SbrkHeap::program_break(), claimed.wrapping_add(16));

    unsafe { sbrk(-16) };
    heap.shrink(64);
  }
}
