use crate::{block::Block, heap::Heap};

/// The address-ordered, doubly linked chain of every block in the heap.
///
/// The links live inside the block headers; the directory itself only holds
/// the two ends. Splicing is O(1) and never checks contiguity: a block
/// inserted after `existing` must start where `existing`'s payload ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BlockDirectory {
  head: Option<usize>,
  tail: Option<usize>,
}

impl BlockDirectory {
  pub const fn new() -> Self {
    Self {
      head: None,
      tail: None,
    }
  }

  pub fn head(&self) -> Option<usize> {
    self.head
  }

  pub fn tail(&self) -> Option<usize> {
    self.tail
  }

  pub fn is_empty(&self) -> bool {
    self.head.is_none()
  }

  /// Makes `block` at `offset` the only member of an empty directory.
  pub fn push_first<H: Heap + ?Sized>(
    &mut self,
    heap: &mut H,
    offset: usize,
    mut block: Block,
  ) {
    debug_assert!(self.is_empty());

    block.prev = None;
    block.next = None;
    block.write(heap, offset);

    self.head = Some(offset);
    self.tail = Some(offset);
  }

  /// Writes `block` at `new` and splices it in right after `existing`.
  pub fn insert_after<H: Heap + ?Sized>(
    &mut self,
    heap: &mut H,
    existing: usize,
    new: usize,
    mut block: Block,
  ) {
    let mut anchor = Block::read(heap, existing);
    debug_assert_eq!(anchor.end(existing), new, "inserted block is not contiguous");

    block.prev = Some(existing);
    block.next = anchor.next;
    block.write(heap, new);

    anchor.next = Some(new);
    anchor.write(heap, existing);

    match block.next {
      Some(next) => {
        Block::update(heap, next, |next| next.prev = Some(new));
      }
      None => self.tail = Some(new),
    }
  }

  /// Unlinks the block at `offset` and returns its last header.
  pub fn remove<H: Heap + ?Sized>(
    &mut self,
    heap: &mut H,
    offset: usize,
  ) -> Block {
    let block = Block::read(heap, offset);

    match block.prev {
      Some(prev) => {
        Block::update(heap, prev, |prev| prev.next = block.next);
      }
      None => self.head = block.next,
    }

    match block.next {
      Some(next) => {
        Block::update(heap, next, |next| next.prev = block.prev);
      }
      None => self.tail = block.prev,
    }

    block
  }

  /// Walks the chain from head to tail, yielding `(offset, header)`.
  pub fn iter<'a, H: Heap + ?Sized>(
    &self,
    heap: &'a H,
  ) -> Blocks<'a, H> {
    Blocks {
      heap,
      cursor: self.head,
    }
  }
}

pub struct Blocks<'a, H: Heap + ?Sized> {
  heap: &'a H,
  cursor: Option<usize>,
}

impl<H: Heap + ?Sized> Iterator for Blocks<'_, H> {
  type Item = (usize, Block);

  fn next(&mut self) -> Option<Self::Item> {
    let offset = self.cursor?;
    let block = Block::read(self.heap, offset);
    self.cursor = block.next;
    Some((offset, block))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{block::HEADER_SIZE, heap::ArenaHeap};

  // Lays out three contiguous blocks of 8 payload bytes each.
  fn three_blocks() -> (ArenaHeap, BlockDirectory, [usize; 3]) {
    let mut heap = ArenaHeap::with_capacity(512);
    let mut directory = BlockDirectory::new();

    let a = heap.grow(HEADER_SIZE + 8).unwrap();
    directory.push_first(&mut heap, a, Block::new(8, false));
    let b = heap.grow(HEADER_SIZE + 8).unwrap();
    directory.insert_after(&mut heap, a, b, Block::new(8, false));
    let c = heap.grow(HEADER_SIZE + 8).unwrap();
    directory.insert_after(&mut heap, b, c, Block::new(8, false));

    (heap, directory, [a, b, c])
  }

  fn offsets(
    directory: &BlockDirectory,
    heap: &ArenaHeap,
  ) -> Vec<usize> {
    directory.iter(heap).map(|(offset, _)| offset).collect()
  }

  #[test]
  fn test_insert_after_tail() {
    let (heap, directory, [a, b, c]) = three_blocks();

    assert_eq!(directory.head(), Some(a));
    assert_eq!(directory.tail(), Some(c));
    assert_eq!(offsets(&directory, &heap), vec![a, b, c]);
    assert_eq!(Block::read(&heap, c).prev, Some(b));
    assert_eq!(Block::read(&heap, c).next, None);
  }

  #[test]
  fn test_insert_after_middle() {
    let mut heap = ArenaHeap::with_capacity(512);
    let mut directory = BlockDirectory::new();

    let a = heap.grow(HEADER_SIZE * 2 + 24).unwrap();
    directory.push_first(&mut heap, a, Block::new(HEADER_SIZE + 24, false));
    let c = heap.grow(HEADER_SIZE + 8).unwrap();
    directory.insert_after(&mut heap, a, c, Block::new(8, false));

    // Split `a` the way the allocator does: shrink first, then insert.
    Block::update(&mut heap, a, |block| block.size = 8);
    let b = a + HEADER_SIZE + 8;
    directory.insert_after(&mut heap, a, b, Block::new(16, true));

    assert_eq!(offsets(&directory, &heap), vec![a, b, c]);
    assert_eq!(Block::read(&heap, c).prev, Some(b));
    assert_eq!(directory.tail(), Some(c));
  }

  #[test]
  fn test_remove_middle_and_ends() {
    let (mut heap, mut directory, [a, b, c]) = three_blocks();

    directory.remove(&mut heap, b);
    assert_eq!(offsets(&directory, &heap), vec![a, c]);
    assert_eq!(Block::read(&heap, c).prev, Some(a));

    directory.remove(&mut heap, c);
    assert_eq!(directory.tail(), Some(a));
    assert_eq!(Block::read(&heap, a).next, None);

    directory.remove(&mut heap, a);
    assert!(directory.is_empty());
    assert_eq!(directory.tail(), None);
  }

  #[test]
  fn test_remove_head() {
    let (mut heap, mut directory, [a, b, c]) = three_blocks();

    let removed = directory.remove(&mut heap, a);

    assert_eq!(removed.next, Some(b));
    assert_eq!(directory.head(), Some(b));
    assert_eq!(Block::read(&heap, b).prev, None);
    assert_eq!(offsets(&directory, &heap), vec![b, c]);
  }
}
