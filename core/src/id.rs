//! Definition of wire type identifiers, format discriminators and reserved ranges.

use crate::error::RegistryError;

/// Compact numeric tag identifying a registered type on the wire.
///
/// Encoded payloads carry this id instead of a type name, which keeps headers
/// small and avoids embedding language-specific type metadata in the byte
/// stream. The numeric subtype is fixed at `u32` per registry; values supplied
/// in other integer widths are coerced through [`IntoWireId`] and a lossy
/// coercion is a fatal registration error.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WireId(u32);

impl WireId {
  /// Sentinel id used as the element tag of an empty container. Never registrable.
  pub const NONE: WireId = WireId(0);

  /// Creates a new identifier from the provided integer value.
  #[inline]
  #[must_use]
  pub const fn new(raw: u32) -> Self {
    Self(raw)
  }

  /// Returns the underlying integer value.
  #[inline]
  #[must_use]
  pub const fn value(self) -> u32 {
    self.0
  }

  /// Returns true for the empty-container sentinel.
  #[inline]
  #[must_use]
  pub const fn is_none(self) -> bool {
    self.0 == 0
  }

  /// Returns true if the id falls inside the system-reserved range.
  #[inline]
  #[must_use]
  pub const fn is_reserved(self) -> bool {
    self.0 != 0 && self.0 < USER_DEFINED_START
  }
}

impl From<WireId> for u32 {
  fn from(value: WireId) -> Self {
    value.value()
  }
}

impl core::fmt::Display for WireId {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Wire ids below this value are reserved for system-registered primitive and
/// container types; marker-driven user registrations must start here.
pub const USER_DEFINED_START: u32 = 101;

/// Reserved wire ids of the built-in primitive types and container kinds.
pub mod builtin {
  use super::WireId;

  pub const BOOL: WireId = WireId::new(1);
  pub const I8: WireId = WireId::new(2);
  pub const U8: WireId = WireId::new(3);
  pub const I16: WireId = WireId::new(4);
  pub const U16: WireId = WireId::new(5);
  pub const I32: WireId = WireId::new(6);
  pub const U32: WireId = WireId::new(7);
  pub const I64: WireId = WireId::new(8);
  pub const U64: WireId = WireId::new(9);
  pub const F32: WireId = WireId::new(10);
  pub const F64: WireId = WireId::new(11);
  pub const CHAR: WireId = WireId::new(12);
  pub const STRING: WireId = WireId::new(13);
  pub const BYTES: WireId = WireId::new(14);

  pub const LIST: WireId = WireId::new(31);
  pub const SET: WireId = WireId::new(32);
  pub const COLLECTION: WireId = WireId::new(33);
  pub const MAP: WireId = WireId::new(34);
}

/// Conversion of caller-supplied integer values into the registry's fixed
/// `u32` id width. Narrower widths widen losslessly; wider or signed widths
/// are checked and fail with [`RegistryError::IdOutOfRange`].
pub trait IntoWireId {
  /// Performs the conversion.
  fn into_wire_id(self) -> Result<WireId, RegistryError>;
}

impl IntoWireId for WireId {
  fn into_wire_id(self) -> Result<WireId, RegistryError> {
    Ok(self)
  }
}

impl IntoWireId for u16 {
  fn into_wire_id(self) -> Result<WireId, RegistryError> {
    Ok(WireId::new(u32::from(self)))
  }
}

impl IntoWireId for u32 {
  fn into_wire_id(self) -> Result<WireId, RegistryError> {
    Ok(WireId::new(self))
  }
}

impl IntoWireId for u64 {
  fn into_wire_id(self) -> Result<WireId, RegistryError> {
    u32::try_from(self)
      .map(WireId::new)
      .map_err(|_| RegistryError::IdOutOfRange(i128::from(self)))
  }
}

impl IntoWireId for i32 {
  fn into_wire_id(self) -> Result<WireId, RegistryError> {
    u32::try_from(self)
      .map(WireId::new)
      .map_err(|_| RegistryError::IdOutOfRange(i128::from(self)))
  }
}

impl IntoWireId for i64 {
  fn into_wire_id(self) -> Result<WireId, RegistryError> {
    u32::try_from(self)
      .map(WireId::new)
      .map_err(|_| RegistryError::IdOutOfRange(i128::from(self)))
  }
}

impl IntoWireId for usize {
  fn into_wire_id(self) -> Result<WireId, RegistryError> {
    u32::try_from(self)
      .map(WireId::new)
      .map_err(|_| RegistryError::IdOutOfRange(self as i128))
  }
}

/// Discriminator distinguishing the wire formats at the transport layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FormatId(u32);

impl FormatId {
  /// Fixed-width big-endian primitive encoding with registry-tagged objects.
  pub const NATIVE: FormatId = FormatId(1);
  /// Schema-less binary format with a one-byte opcode per primitive.
  pub const TAGGED: FormatId = FormatId(2);
  /// Protocol-Buffers-style tag/length framing.
  pub const FRAMED: FormatId = FormatId(3);
  /// Open-typed JSON fallback.
  pub const JSON: FormatId = FormatId(4);

  /// Creates a new discriminator from the provided integer value.
  #[inline]
  #[must_use]
  pub const fn new(raw: u32) -> Self {
    Self(raw)
  }

  /// Returns the underlying integer value.
  #[inline]
  #[must_use]
  pub const fn value(self) -> u32 {
    self.0
  }
}

impl core::fmt::Display for FormatId {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match *self {
      FormatId::NATIVE => write!(f, "native:1"),
      FormatId::TAGGED => write!(f, "tagged:2"),
      FormatId::FRAMED => write!(f, "framed:3"),
      FormatId::JSON => write!(f, "json:4"),
      other => write!(f, "custom:{}", other.0),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn widens_narrow_ids() {
    assert_eq!(42u16.into_wire_id(), Ok(WireId::new(42)));
    assert_eq!(7u32.into_wire_id(), Ok(WireId::new(7)));
  }

  #[test]
  fn rejects_lossy_coercions() {
    assert_eq!(u64::MAX.into_wire_id(), Err(RegistryError::IdOutOfRange(i128::from(u64::MAX))));
    assert_eq!((-1i64).into_wire_id(), Err(RegistryError::IdOutOfRange(-1)));
    assert_eq!((-5i32).into_wire_id(), Err(RegistryError::IdOutOfRange(-5)));
  }

  #[test]
  fn reserved_range_boundaries() {
    assert!(!WireId::NONE.is_reserved());
    assert!(WireId::new(1).is_reserved());
    assert!(WireId::new(100).is_reserved());
    assert!(!WireId::new(USER_DEFINED_START).is_reserved());
  }
}
