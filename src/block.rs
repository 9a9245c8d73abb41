use std::mem;

use crate::heap::Heap;

/// Width of one header field.
pub const WORD: usize = mem::size_of::<usize>();

/// Bytes taken by a block header: `size`, tag, `prev`, `next`.
pub const HEADER_SIZE: usize = 4 * WORD;

// Encodes an absent link.
const NIL: usize = usize::MAX;

// Upper bits of the tag word mark a header written by this crate; the lowest
// bit is the free flag.
const TAG_MAGIC: usize = 0xB10C_0000;
const FREE_BIT: usize = 1;

/// One block header as stored in front of its payload.
///
/// ```text
///   offset          offset + HEADER_SIZE         offset + HEADER_SIZE + size
///   │                │                           │
///   ▼                ▼                           ▼
///   ┌──────┬─────┬──────┬──────┬─────────────────┬───────────────
///   │ size │ tag │ prev │ next │  size bytes     │ next header …
///   └──────┴─────┴──────┴──────┴─────────────────┴───────────────
/// ```
///
/// Links are heap offsets of the address-order neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
  pub size: usize,
  pub is_free: bool,
  pub prev: Option<usize>,
  pub next: Option<usize>,
}

impl Block {
  pub fn new(
    size: usize,
    is_free: bool,
  ) -> Self {
    Self {
      size,
      is_free,
      prev: None,
      next: None,
    }
  }

  /// Header plus payload.
  pub fn footprint(&self) -> usize {
    HEADER_SIZE + self.size
  }

  /// Offset one past the payload of a block whose header sits at `offset`.
  pub fn end(
    &self,
    offset: usize,
  ) -> usize {
    offset + self.footprint()
  }

  /// Decodes the header at `offset`, trusting that one lives there.
  pub fn read<H: Heap + ?Sized>(
    heap: &H,
    offset: usize,
  ) -> Self {
    let (block, _) = Self::decode(heap.bytes(offset, HEADER_SIZE));
    block
  }

  /// Decodes the header at `offset` if it is inside the heap and carries the
  /// crate's tag.
  pub fn probe<H: Heap + ?Sized>(
    heap: &H,
    offset: usize,
  ) -> Option<Self> {
    let header_end = offset.checked_add(HEADER_SIZE)?;
    if header_end > heap.boundary() {
      return None;
    }

    let (block, tagged) = Self::decode(heap.bytes(offset, HEADER_SIZE));
    tagged.then_some(block)
  }

  pub fn write<H: Heap + ?Sized>(
    &self,
    heap: &mut H,
    offset: usize,
  ) {
    let tag = TAG_MAGIC | if self.is_free { FREE_BIT } else { 0 };
    let words = [
      self.size,
      tag,
      self.prev.unwrap_or(NIL),
      self.next.unwrap_or(NIL),
    ];

    let bytes = heap.bytes_mut(offset, HEADER_SIZE);
    for (chunk, word) in bytes.chunks_exact_mut(WORD).zip(words) {
      chunk.copy_from_slice(&word.to_ne_bytes());
    }
  }

  /// Reads the header at `offset`, applies `f` and writes it back.
  pub fn update<H: Heap + ?Sized>(
    heap: &mut H,
    offset: usize,
    f: impl FnOnce(&mut Self),
  ) -> Self {
    let mut block = Self::read(heap, offset);
    f(&mut block);
    block.write(heap, offset);
    block
  }

  fn decode(bytes: &[u8]) -> (Self, bool) {
    let mut words = [0usize; 4];
    for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(WORD)) {
      let mut buf = [0u8; WORD];
      buf.copy_from_slice(chunk);
      *word = usize::from_ne_bytes(buf);
    }

    let [size, tag, prev, next] = words;
    let link = |value: usize| (value != NIL).then_some(value);
    let block = Self {
      size,
      is_free: tag & FREE_BIT != 0,
      prev: link(prev),
      next: link(next),
    };

    (block, tag & !FREE_BIT == TAG_MAGIC)
  }
}
