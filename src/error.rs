use std::fmt;

/// Errors reported by [`FirstFitAllocator`](crate::FirstFitAllocator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
  /// A zero-byte allocation was requested.
  ZeroSize,
  /// The heap could not be extended by `requested` bytes.
  OutOfMemory { requested: usize },
  /// The offset does not name the payload of a live allocation.
  InvalidRelease { offset: usize },
  /// The offset does not name the payload of a live allocation, looked up
  /// for reading or writing.
  UnknownAllocation { offset: usize },
  /// The program break moved without going through the heap.
  ForeignBreak,
}

impl std::error::Error for AllocError {}

pub type Result<T> = std::result::Result<T, AllocError>;

impl fmt::Display for AllocError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter,
  ) -> fmt::Result {
    match self {
      AllocError::ZeroSize => write!(f, "cannot allocate zero bytes"),
      AllocError::OutOfMemory { requested } => {
        write!(f, "the heap cannot grow by {requested} bytes")
      }
      AllocError::InvalidRelease { offset } => {
        write!(f, "{offset:#x} is not the payload of a live allocation")
      }
      AllocError::UnknownAllocation { offset } => {
        write!(f, "no live allocation has its payload at {offset:#x}")
      }
      AllocError::ForeignBreak => write!(f, "the program break was moved by someone else"),
    }
  }
}

/// A broken heap invariant, found by
/// [`FirstFitAllocator::check_invariants`](crate::FirstFitAllocator::check_invariants).
///
/// These are allocator defects, never usage errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
  /// A block does not start where its predecessor's payload ends.
  Gap { expected: usize, found: usize },
  /// A block's `prev` link does not name the block before it.
  BrokenLink { offset: usize },
  /// Two address-adjacent blocks are both free.
  AdjacentFree { offset: usize },
  /// The chain does not end exactly at the heap boundary.
  Boundary { end: usize, boundary: usize },
  /// The directory's tail is not the last block of the chain.
  TailMismatch { tail: Option<usize>, last: Option<usize> },
}

impl std::error::Error for InvariantViolation {}

impl fmt::Display for InvariantViolation {
  fn fmt(
    &self,
    f: &mut fmt::Formatter,
  ) -> fmt::Result {
    match self {
      InvariantViolation::Gap { expected, found } => {
        write!(f, "expected a block at {expected:#x}, found one at {found:#x}")
      }
      InvariantViolation::BrokenLink { offset } => {
        write!(f, "block at {offset:#x} has a stale prev link")
      }
      InvariantViolation::AdjacentFree { offset } => {
        write!(f, "block at {offset:#x} and its predecessor are both free")
      }
      InvariantViolation::Boundary { end, boundary } => {
        write!(f, "blocks end at {end:#x} but the heap boundary is {boundary:#x}")
      }
      InvariantViolation::TailMismatch { tail, last } => {
        write!(f, "tail is {tail:?} but the last block is {last:?}")
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_display() {
    assert_eq!(
      AllocError::InvalidRelease { offset: 0x40 }.to_string(),
      "0x40 is not the payload of a live allocation"
    );
    assert_eq!(
      AllocError::UnknownAllocation { offset: 0x40 }.to_string(),
      "no live allocation has its payload at 0x40"
    );
    assert_eq!(
      InvariantViolation::Boundary { end: 0x20, boundary: 0x30 }.to_string(),
      "blocks end at 0x20 but the heap boundary is 0x30"
    );
  }
}
