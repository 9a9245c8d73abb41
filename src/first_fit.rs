use std::fmt;

use crate::{
  align,
  block::{Block, HEADER_SIZE, WORD},
  config::AllocatorConfig,
  directory::BlockDirectory,
  error::{AllocError, InvariantViolation, Result},
  heap::Heap,
};

/// A block as seen from outside the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Heap offset of the header.
  pub offset: usize,
  /// Payload bytes, excluding the header.
  pub size: usize,
  pub is_free: bool,
}

impl BlockInfo {
  /// Heap offset of the first payload byte.
  pub fn payload(&self) -> usize {
    self.offset + HEADER_SIZE
  }
}

/// First-fit allocator with block splitting, coalescing and heap shrinking.
///
/// Every byte between the heap start and its boundary belongs to exactly one
/// block, and the [`BlockDirectory`] links those blocks in address order.
/// Allocation takes the first free block that is big enough, splitting off
/// the tail when another header fits in it, and grows the heap otherwise.
/// Release merges the block with free neighbours and gives any free tail
/// back to the heap.
///
/// Allocations are identified by the heap offset of their payload; use
/// [`address_of`](Self::address_of) to turn one into a pointer.
pub struct FirstFitAllocator<H: Heap> {
  heap: H,
  directory: BlockDirectory,
  config: AllocatorConfig,
}

impl<H: Heap> FirstFitAllocator<H> {
  pub const fn new(heap: H) -> Self {
    Self::with_config(heap, AllocatorConfig::DEFAULT)
  }

  pub const fn with_config(
    heap: H,
    config: AllocatorConfig,
  ) -> Self {
    Self {
      heap,
      directory: BlockDirectory::new(),
      config,
    }
  }

  pub fn heap(&self) -> &H {
    &self.heap
  }

  pub fn config(&self) -> AllocatorConfig {
    self.config
  }

  /// Current heap boundary.
  pub fn boundary(&self) -> usize {
    self.heap.boundary()
  }

  pub fn is_empty(&self) -> bool {
    self.directory.is_empty()
  }

  /// Every block in address order.
  pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    self
      .directory
      .iter(&self.heap)
      .map(|(offset, block)| BlockInfo {
        offset,
        size: block.size,
        is_free: block.is_free,
      })
  }

  /// Allocates `size` bytes and returns the heap offset of the payload.
  ///
  /// The payload is not zeroed.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<usize> {
    if size == 0 {
      return Err(AllocError::ZeroSize);
    }

    let size = if self.config.round_to_word {
      if size > usize::MAX - WORD {
        return Err(AllocError::OutOfMemory { requested: size });
      }
      align!(size)
    } else {
      size
    };

    let offset = match self.find_free_block(size) {
      Some(offset) => {
        self.allocate_at_block(offset, size);
        offset
      }
      None => self.allocate_at_break(size)?,
    };

    log::trace!("FirstFitAllocator::allocate({size}) -> {:#x}", offset + HEADER_SIZE);
    self.verify();

    Ok(offset + HEADER_SIZE)
  }

  /// Releases the allocation whose payload starts at `payload`.
  ///
  /// With `validate_release` off in [`AllocatorConfig`], releasing anything but
  /// a live allocation corrupts the heap.
  pub fn release(
    &mut self,
    payload: usize,
  ) -> Result<()> {
    let offset = if self.config.validate_release {
      self
        .find_block(payload)
        .ok_or(AllocError::InvalidRelease { offset: payload })?
    } else {
      payload.wrapping_sub(HEADER_SIZE)
    };

    Block::update(&mut self.heap, offset, |block| block.is_free = true);
    log::trace!("FirstFitAllocator::release({payload:#x})");

    self.coalesce(offset);
    self.shrink_trailing_free();
    self.verify();

    Ok(())
  }

  /// Payload bytes of a live allocation.
  pub fn payload(
    &self,
    payload: usize,
  ) -> Result<&[u8]> {
    let offset = self
      .find_block(payload)
      .ok_or(AllocError::UnknownAllocation { offset: payload })?;
    let size = Block::read(&self.heap, offset).size;
    Ok(self.heap.bytes(payload, size))
  }

  pub fn payload_mut(
    &mut self,
    payload: usize,
  ) -> Result<&mut [u8]> {
    let offset = self
      .find_block(payload)
      .ok_or(AllocError::UnknownAllocation { offset: payload })?;
    let size = Block::read(&self.heap, offset).size;
    Ok(self.heap.bytes_mut(payload, size))
  }

  /// Raw address of a heap offset.
  pub fn address_of(
    &mut self,
    offset: usize,
  ) -> *mut u8 {
    self.heap.base_ptr().wrapping_add(offset)
  }

  /// Heap offset of a raw address previously built by
  /// [`address_of`](Self::address_of).
  pub fn offset_of(
    &mut self,
    address: *mut u8,
  ) -> usize {
    (address as usize).wrapping_sub(self.heap.base_ptr() as usize)
  }

  fn find_free_block(
    &self,
    size: usize,
  ) -> Option<usize> {
    self
      .directory
      .iter(&self.heap)
      .find(|(_, block)| block.is_free && block.size >= size)
      .map(|(offset, _)| offset)
  }

  // Takes a free block that fits. When the remainder can hold another header
  // plus at least one byte, it becomes a new free block right after ours.
  fn allocate_at_block(
    &mut self,
    offset: usize,
    size: usize,
  ) {
    let mut block = Block::read(&self.heap, offset);
    debug_assert!(block.is_free && block.size >= size);

    let leftover = block
      .size
      .checked_sub(size + HEADER_SIZE)
      .filter(|&leftover| leftover > 0);

    block.is_free = false;

    if let Some(leftover) = leftover {
      block.size = size;
      block.write(&mut self.heap, offset);

      let remainder = block.end(offset);
      self
        .directory
        .insert_after(&mut self.heap, offset, remainder, Block::new(leftover, true));
      log::trace!("split {offset:#x}: {size} + {leftover} free at {remainder:#x}");
    } else {
      block.write(&mut self.heap, offset);
    }
  }

  // Grows the heap by one block and appends it to the directory.
  fn allocate_at_break(
    &mut self,
    size: usize,
  ) -> Result<usize> {
    let footprint = size
      .checked_add(HEADER_SIZE)
      .ok_or(AllocError::OutOfMemory { requested: size })?;
    let offset = self.heap.grow(footprint)?;
    let block = Block::new(size, false);

    match self.directory.tail() {
      Some(tail) => self.directory.insert_after(&mut self.heap, tail, offset, block),
      None => self.directory.push_first(&mut self.heap, offset, block),
    }

    Ok(offset)
  }

  /// Merges the block at `offset` with a free predecessor and/or successor.
  /// Returns the offset of the surviving block, the leftmost of the merge.
  fn coalesce(
    &mut self,
    offset: usize,
  ) -> usize {
    let mut current = offset;
    let block = Block::read(&self.heap, offset);

    if let Some(prev) = block.prev {
      if Block::read(&self.heap, prev).is_free {
        self.directory.remove(&mut self.heap, offset);
        Block::update(&mut self.heap, prev, |prev| prev.size += block.footprint());
        log::trace!("merged {offset:#x} into {prev:#x}");
        current = prev;
      }
    }

    if let Some(next) = Block::read(&self.heap, current).next {
      let absorbed = Block::read(&self.heap, next);
      if absorbed.is_free {
        self.directory.remove(&mut self.heap, next);
        Block::update(&mut self.heap, current, |block| block.size += absorbed.footprint());
        log::trace!("merged {next:#x} into {current:#x}");
      }
    }

    current
  }

  /// Gives free blocks at the end of the heap back to it.
  fn shrink_trailing_free(&mut self) {
    while let Some(tail) = self.directory.tail() {
      let block = Block::read(&self.heap, tail);
      if !block.is_free {
        break;
      }

      self.directory.remove(&mut self.heap, tail);
      self.heap.shrink(block.footprint());
    }
  }

  // Maps a payload offset to its header, accepting only live allocations.
  fn find_block(
    &self,
    payload: usize,
  ) -> Option<usize> {
    let offset = payload.checked_sub(HEADER_SIZE)?;
    let block = Block::probe(&self.heap, offset)?;

    if block.is_free {
      return None;
    }

    let end = payload
      .checked_add(block.size)
      .filter(|&end| end <= self.heap.boundary())?;

    let linked_from_prev = match block.prev {
      Some(prev) => {
        prev < offset && Block::probe(&self.heap, prev).is_some_and(|prev| prev.next == Some(offset))
      }
      None => self.directory.head() == Some(offset),
    };

    let linked_from_next = match block.next {
      Some(next) => {
        next == end && Block::probe(&self.heap, next).is_some_and(|next| next.prev == Some(offset))
      }
      None => self.directory.tail() == Some(offset) && end == self.heap.boundary(),
    };

    (linked_from_prev && linked_from_next).then_some(offset)
  }

  /// Walks the directory and checks that blocks tile the heap exactly, links
  /// follow address order and no two neighbours are both free.
  pub fn check_invariants(&self) -> std::result::Result<(), InvariantViolation> {
    let boundary = self.heap.boundary();
    let mut expected = 0;
    let mut previous: Option<(usize, Block)> = None;

    let mut cursor = self.directory.head();
    while let Some(offset) = cursor {
      if offset != expected {
        return Err(InvariantViolation::Gap { expected, found: offset });
      }

      let block = Block::probe(&self.heap, offset).ok_or(InvariantViolation::Boundary {
        end: offset + HEADER_SIZE,
        boundary,
      })?;

      if block.prev != previous.map(|(offset, _)| offset) {
        return Err(InvariantViolation::BrokenLink { offset });
      }

      if block.is_free && previous.is_some_and(|(_, prev)| prev.is_free) {
        return Err(InvariantViolation::AdjacentFree { offset });
      }

      let end = block.end(offset);
      if end > boundary {
        return Err(InvariantViolation::Boundary { end, boundary });
      }

      expected = end;
      previous = Some((offset, block));
      cursor = block.next;
    }

    let last = previous.map(|(offset, _)| offset);
    if self.directory.tail() != last {
      return Err(InvariantViolation::TailMismatch {
        tail: self.directory.tail(),
        last,
      });
    }

    if expected != boundary {
      return Err(InvariantViolation::Boundary { end: expected, boundary });
    }

    Ok(())
  }

  fn verify(&self) {
    if self.config.check_invariants {
      if let Err(violation) = self.check_invariants() {
        panic!("heap invariant violated: {violation}");
      }
    }
  }
}

impl<H: Heap> fmt::Debug for FirstFitAllocator<H> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter,
  ) -> fmt::Result {
    f.debug_struct("FirstFitAllocator")
      .field("boundary", &self.heap.boundary())
      .field("blocks", &self.blocks().collect::<Vec<_>>())
      .finish()
  }
}
