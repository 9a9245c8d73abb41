use crate::error::{AllocError, Result};

/// The contiguous region a [`FirstFitAllocator`](crate::FirstFitAllocator)
/// carves blocks out of.
///
/// A heap is addressed by byte offsets from its start. It only ever moves its
/// upper boundary: [`grow`](Heap::grow) claims bytes at the boundary and
/// [`shrink`](Heap::shrink) hands trailing bytes back.
pub trait Heap {
  /// Extends the heap by exactly `n` bytes and returns the offset where the
  /// new region starts (the old boundary).
  fn grow(
    &mut self,
    n: usize,
  ) -> Result<usize>;

  /// Retracts the boundary by `n` bytes. `n` never exceeds the claimed space.
  fn shrink(
    &mut self,
    n: usize,
  );

  /// Offset one past the last claimed byte.
  fn boundary(&self) -> usize;

  /// `len` claimed bytes starting at `offset`.
  fn bytes(
    &self,
    offset: usize,
    len: usize,
  ) -> &[u8];

  fn bytes_mut(
    &mut self,
    offset: usize,
    len: usize,
  ) -> &mut [u8];

  /// Address of offset zero, used to hand out raw pointers.
  fn base_ptr(&mut self) -> *mut u8;
}

/// A heap backed by a fixed-capacity byte arena.
///
/// The whole capacity is reserved up front so the arena never moves; growth
/// past it fails with [`AllocError::OutOfMemory`], the same way an exhausted
/// address space makes `sbrk` fail.
///
/// ```text
///   0                    boundary               capacity
///   ├────────────────────┼──────────────────────┤
///   │  claimed (blocks)  │  reserved, unclaimed │
///   └────────────────────┴──────────────────────┘
/// ```
pub struct ArenaHeap {
  memory: Box<[u8]>,
  boundary: usize,
}

impl ArenaHeap {
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      memory: vec![0; capacity].into_boxed_slice(),
      boundary: 0,
    }
  }

  pub fn capacity(&self) -> usize {
    self.memory.len()
  }
}

impl Heap for ArenaHeap {
  fn grow(
    &mut self,
    n: usize,
  ) -> Result<usize> {
    let start = self.boundary;
    let end = start
      .checked_add(n)
      .filter(|&end| end <= self.capacity())
      .ok_or(AllocError::OutOfMemory { requested: n })?;

    self.boundary = end;
    log::debug!("ArenaHeap::grow({n}) -> {start:#x}, boundary = {end:#x}");

    Ok(start)
  }

  fn shrink(
    &mut self,
    n: usize,
  ) {
    debug_assert!(n <= self.boundary, "shrinking below the heap start");
    self.boundary -= n;
    log::debug!("ArenaHeap::shrink({n}), boundary = {:#x}", self.boundary);
  }

  fn boundary(&self) -> usize {
    self.boundary
  }

  fn bytes(
    &self,
    offset: usize,
    len: usize,
  ) -> &[u8] {
    &self.memory[..self.boundary][offset..offset + len]
  }

  fn bytes_mut(
    &mut self,
    offset: usize,
    len: usize,
  ) -> &mut [u8] {
    &mut self.memory[..self.boundary][offset..offset + len]
  }

  fn base_ptr(&mut self) -> *mut u8 {
    self.memory.as_mut_ptr()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_grow_and_shrink() {
    let mut heap = ArenaHeap::with_capacity(64);

    assert_eq!(heap.grow(16), Ok(0));
    assert_eq!(heap.grow(8), Ok(16));
    assert_eq!(heap.boundary(), 24);

    heap.shrink(8);
    assert_eq!(heap.boundary(), 16);
    assert_eq!(heap.grow(4), Ok(16));
  }

  #[test]
  fn test_grow_past_capacity() {
    let mut heap = ArenaHeap::with_capacity(32);
    heap.grow(30).unwrap();

    assert_eq!(heap.grow(3), Err(AllocError::OutOfMemory { requested: 3 }));
    assert_eq!(heap.grow(usize::MAX), Err(AllocError::OutOfMemory { requested: usize::MAX }));
    assert_eq!(heap.boundary(), 30);
  }

  #[test]
  fn test_bytes_are_bounded_by_boundary() {
    let mut heap = ArenaHeap::with_capacity(32);
    heap.grow(8).unwrap();
    heap.bytes_mut(0, 8).copy_from_slice(b"brkalloc");

    assert_eq!(heap.bytes(0, 8), b"brkalloc");
    assert!(std::panic::catch_unwind(|| heap.bytes(4, 8).len()).is_err());
  }
}
