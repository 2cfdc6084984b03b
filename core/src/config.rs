//! Decode-side resource ceilings applied by every backend.

/// Configuration shared by the data and object codecs of one factory.
///
/// The ceilings exist to keep a hostile length prefix from driving an
/// allocation before any payload byte has been read.
#[derive(Debug, Clone)]
pub struct CodecConfig {
  max_length_prefix: u32,
  max_container_len: u32,
}

impl Default for CodecConfig {
  fn default() -> Self {
    Self {
      max_length_prefix: 1 << 28,
      max_container_len: 1 << 24,
    }
  }
}

impl CodecConfig {
  /// Builds a configuration from the provided options, defaults applying for
  /// everything left unset.
  #[must_use]
  pub fn from(options: impl IntoIterator<Item = ConfigOption>) -> CodecConfig {
    let mut config = CodecConfig::default();
    for option in options {
      option.apply(&mut config);
    }
    config
  }

  /// Largest accepted string/byte length prefix, in bytes.
  #[must_use]
  pub fn max_length_prefix(&self) -> u32 {
    self.max_length_prefix
  }

  pub fn set_max_length_prefix(&mut self, max_length_prefix: u32) {
    self.max_length_prefix = max_length_prefix;
  }

  /// Largest accepted decoded container element count.
  #[must_use]
  pub fn max_container_len(&self) -> u32 {
    self.max_container_len
  }

  pub fn set_max_container_len(&mut self, max_container_len: u32) {
    self.max_container_len = max_container_len;
  }
}

/// Single configuration mutation, applied in order by [`CodecConfig::from`].
#[derive(Debug, Clone)]
pub enum ConfigOption {
  SetMaxLengthPrefix(u32),
  SetMaxContainerLen(u32),
}

impl ConfigOption {
  pub fn apply(&self, config: &mut CodecConfig) {
    match self {
      ConfigOption::SetMaxLengthPrefix(max) => {
        config.set_max_length_prefix(*max);
      }
      ConfigOption::SetMaxContainerLen(max) => {
        config.set_max_container_len(*max);
      }
    }
  }

  pub fn with_max_length_prefix(max: u32) -> ConfigOption {
    ConfigOption::SetMaxLengthPrefix(max)
  }

  pub fn with_max_container_len(max: u32) -> ConfigOption {
    ConfigOption::SetMaxContainerLen(max)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn applies_options_in_order() {
    let config = CodecConfig::from([
      ConfigOption::with_max_length_prefix(64),
      ConfigOption::with_max_container_len(8),
      ConfigOption::with_max_length_prefix(128),
    ]);
    assert_eq!(config.max_length_prefix(), 128);
    assert_eq!(config.max_container_len(), 8);
  }
}
