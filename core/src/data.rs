//! Primitive data codec contract shared by every wire format backend.

use crate::error::CodecError;

/// The single direction a codec instance is bound to for its entire lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
  Read,
  Write,
}

impl core::fmt::Display for Direction {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      Direction::Read => f.write_str("reading"),
      Direction::Write => f.write_str("writing"),
    }
  }
}

/// Builds the error returned when a method of the wrong direction is called.
pub(crate) fn mode_violation(direction: Direction, attempted: &'static str) -> CodecError {
  CodecError::ModeViolation { direction, attempted }
}

/// Directional transcoding of fixed-width primitives, length-prefixed strings
/// and raw byte runs against one underlying sink or source.
///
/// An instance is bound to exactly one handle and one [`Direction`] at
/// construction; calling a `read_*` method on a write-bound instance (or vice
/// versa) fails with [`CodecError::ModeViolation`]. The byte layout behind
/// each method is a backend decision; backends are mutually incompatible at
/// the byte level and each documents its own framing.
pub trait DataCodec {
  /// The direction this instance was bound to.
  fn direction(&self) -> Direction;

  fn read_bool(&mut self) -> Result<bool, CodecError>;
  fn read_i8(&mut self) -> Result<i8, CodecError>;
  fn read_u8(&mut self) -> Result<u8, CodecError>;
  fn read_i16(&mut self) -> Result<i16, CodecError>;
  fn read_u16(&mut self) -> Result<u16, CodecError>;
  fn read_i32(&mut self) -> Result<i32, CodecError>;
  fn read_u32(&mut self) -> Result<u32, CodecError>;
  fn read_i64(&mut self) -> Result<i64, CodecError>;
  fn read_u64(&mut self) -> Result<u64, CodecError>;
  fn read_f32(&mut self) -> Result<f32, CodecError>;
  fn read_f64(&mut self) -> Result<f64, CodecError>;
  /// Reads a single code point.
  fn read_char(&mut self) -> Result<char, CodecError>;
  /// Reads a length-prefixed UTF-8 string.
  fn read_string(&mut self) -> Result<String, CodecError>;
  /// Reads exactly `len` raw bytes; the length is the caller's contract.
  fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, CodecError>;

  fn write_bool(&mut self, value: bool) -> Result<(), CodecError>;
  fn write_i8(&mut self, value: i8) -> Result<(), CodecError>;
  fn write_u8(&mut self, value: u8) -> Result<(), CodecError>;
  fn write_i16(&mut self, value: i16) -> Result<(), CodecError>;
  fn write_u16(&mut self, value: u16) -> Result<(), CodecError>;
  fn write_i32(&mut self, value: i32) -> Result<(), CodecError>;
  fn write_u32(&mut self, value: u32) -> Result<(), CodecError>;
  fn write_i64(&mut self, value: i64) -> Result<(), CodecError>;
  fn write_u64(&mut self, value: u64) -> Result<(), CodecError>;
  fn write_f32(&mut self, value: f32) -> Result<(), CodecError>;
  fn write_f64(&mut self, value: f64) -> Result<(), CodecError>;
  /// Writes a single code point.
  fn write_char(&mut self, value: char) -> Result<(), CodecError>;
  /// Writes a length-prefixed UTF-8 string.
  fn write_string(&mut self, value: &str) -> Result<(), CodecError>;
  /// Writes the bytes as-is; the caller is responsible for carrying the length.
  fn write_bytes(&mut self, value: &[u8]) -> Result<(), CodecError>;

  /// Pushes buffered bytes to the sink. Idempotent; a no-op in read mode.
  fn flush(&mut self) -> Result<(), CodecError>;

  /// Backend-native structured-value escape hatch used by the open-typed
  /// object codec; `serde_json::Value` is the interchange shape. Binary
  /// backends do not override the default failure.
  fn write_structured(&mut self, value: serde_json::Value) -> Result<(), CodecError> {
    let _ = value;
    Err(CodecError::UnsupportedOperation("write_structured"))
  }

  /// Read-side counterpart of [`DataCodec::write_structured`].
  fn read_structured(&mut self) -> Result<serde_json::Value, CodecError> {
    Err(CodecError::UnsupportedOperation("read_structured"))
  }
}

/// Validates a decoded length prefix against the configured ceiling before
/// any allocation happens.
pub(crate) fn check_length(len: u64, max: u32) -> Result<usize, CodecError> {
  if len > u64::from(max) {
    return Err(CodecError::LengthOverflow {
      len,
      max: u64::from(max),
    });
  }
  usize::try_from(len).map_err(|_| CodecError::LengthOverflow {
    len,
    max: u64::from(max),
  })
}
