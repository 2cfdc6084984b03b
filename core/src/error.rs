//! Error types used across the serialization engine.

use thiserror::Error;

use crate::data::Direction;
use crate::id::{FormatId, WireId};

/// Errors raised while populating a type registry. All of them abort the
/// registration; the registry never degrades silently.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
  #[error("wire id {0} is already registered")]
  DuplicateId(WireId),
  #[error("type {0} is already registered")]
  DuplicateType(&'static str),
  #[error("wire id {id} falls inside the reserved system range 1..={reserved_max}")]
  ReservedId { id: WireId, reserved_max: u32 },
  #[error("wire id 0 is the reserved empty-container sentinel")]
  NoneId,
  #[error("value {0} does not fit the u32 wire id width")]
  IdOutOfRange(i128),
}

/// Errors raised while encoding or decoding. Every variant aborts the current
/// operation; retry is a caller concern at a higher layer.
#[derive(Error, Debug)]
pub enum CodecError {
  #[error("type {type_name} is not registered")]
  UnregisteredType { type_name: &'static str },
  #[error("wire id {0} is not registered")]
  UnregisteredId(WireId),
  #[error("expected a value of type {expected}, found {actual}")]
  TypeMismatch {
    expected: &'static str,
    actual: &'static str,
  },
  #[error("container elements must share one concrete type: element 0 is {first}, element {index} is {found}")]
  HeterogeneousContainer {
    first: &'static str,
    index: usize,
    found: &'static str,
  },
  #[error("{attempted} is not available on a codec bound for {direction}")]
  ModeViolation {
    direction: Direction,
    attempted: &'static str,
  },
  #[error("factory for format {0} has not been initialized")]
  NotInitialized(FormatId),
  #[error("operation {0} is not supported by this format")]
  UnsupportedOperation(&'static str),
  #[error("format {format} cannot deserialize from an unbuffered stream")]
  UnsupportedSource { format: FormatId },
  #[error("corrupt frame: {0}")]
  CorruptFrame(String),
  #[error("length prefix {len} exceeds the configured ceiling of {max} bytes")]
  LengthOverflow { len: u64, max: u64 },
  #[error("registry failure during initialization")]
  Registry(#[from] RegistryError),
  #[error("I/O failure")]
  Io(#[from] std::io::Error),
}

impl CodecError {
  /// Builds a corrupt-frame error from any displayable cause.
  #[must_use]
  pub fn corrupt(cause: impl core::fmt::Display) -> Self {
    CodecError::CorruptFrame(cause.to_string())
  }
}
