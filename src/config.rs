/// Knobs for [`FirstFitAllocator`](crate::FirstFitAllocator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorConfig {
  /// Check that every released offset names a live allocation and report
  /// [`AllocError::InvalidRelease`](crate::AllocError::InvalidRelease)
  /// otherwise. Turning this off makes a bad release undefined behaviour.
  pub validate_release: bool,
  /// Walk the whole directory after every operation and panic if an
  /// invariant is broken. On by default in debug builds only.
  pub check_invariants: bool,
  /// Round every request up to the machine word so payloads stay word
  /// aligned.
  pub round_to_word: bool,
}

impl AllocatorConfig {
  pub const DEFAULT: Self = Self {
    validate_release: true,
    check_invariants: cfg!(debug_assertions),
    round_to_word: false,
  };

  pub const fn validate_release(
    mut self,
    enabled: bool,
  ) -> Self {
    self.validate_release = enabled;
    self
  }

  pub const fn check_invariants(
    mut self,
    enabled: bool,
  ) -> Self {
    self.check_invariants = enabled;
    self
  }

  pub const fn round_to_word(
    mut self,
    enabled: bool,
  ) -> Self {
    self.round_to_word = enabled;
    self
  }
}

impl Default for AllocatorConfig {
  fn default() -> Self {
    Self::DEFAULT
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_builders() {
    let config = AllocatorConfig::default()
      .validate_release(false)
      .check_invariants(true)
      .round_to_word(true);

    assert!(!config.validate_release);
    assert!(config.check_invariants);
    assert!(config.round_to_word);
    assert!(AllocatorConfig::DEFAULT.validate_release);
  }
}
