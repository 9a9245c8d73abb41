/// Rounds a byte count up to the machine word.
///
/// The allocator uses it to keep payloads word aligned when
/// [`AllocatorConfig::round_to_word`](crate::AllocatorConfig) is set, and the
/// sbrk heap uses it to pad the initial program break. The caller must make
/// sure `$value + size_of::<usize>() - 1` does not overflow.
///
/// # Examples
///
/// ```rust
/// use brkalloc::align;
///
/// match std::mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// assert_eq!(align!(0), 0);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + ::core::mem::size_of::<usize>() - 1) & !(::core::mem::size_of::<usize>() - 1)
  };
}

#[cfg(test)]
mod tests {
  use std::mem;

  #[test]
  fn test_align() {
    let word = mem::size_of::<usize>();

    for i in 0..10 {
      for size in (word * i + 1)..=(word * (i + 1)) {
        assert_eq!(word * (i + 1), align!(size));
      }
    }
  }

  #[test]
  fn test_align_keeps_multiples() {
    let word = mem::size_of::<usize>();

    assert_eq!(align!(0usize), 0);
    assert_eq!(align!(word * 7), word * 7);
  }
}
