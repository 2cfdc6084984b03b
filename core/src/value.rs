//! Type-erased value transport and the closed container kinds.

use std::any::{Any, TypeId};
use std::fmt;

/// A value crossing the object codec boundary, type-erased but carrying its
/// Rust [`TypeId`] and type name for registry resolution and diagnostics.
pub struct AnyValue {
  boxed: Box<dyn Any + Send + Sync>,
  rust_type: TypeId,
  type_name: &'static str,
}

impl AnyValue {
  /// Wraps a concrete value.
  #[must_use]
  pub fn new<T: Any + Send + Sync>(value: T) -> Self {
    Self {
      boxed: Box::new(value),
      rust_type: TypeId::of::<T>(),
      type_name: std::any::type_name::<T>(),
    }
  }

  /// Returns the `TypeId` of the wrapped value.
  #[inline]
  #[must_use]
  pub fn rust_type(&self) -> TypeId {
    self.rust_type
  }

  /// Returns the full Rust path of the wrapped value's type.
  #[inline]
  #[must_use]
  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  /// Returns true if the wrapped value is a `T`.
  #[must_use]
  pub fn is<T: Any>(&self) -> bool {
    self.rust_type == TypeId::of::<T>()
  }

  /// Borrows the wrapped value as a `T`, if it is one.
  #[must_use]
  pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
    self.boxed.downcast_ref::<T>()
  }

  /// Unwraps into a `T`, handing the value back on mismatch.
  pub fn downcast<T: Any>(self) -> Result<T, AnyValue> {
    let AnyValue {
      boxed,
      rust_type,
      type_name,
    } = self;
    match boxed.downcast::<T>() {
      Ok(concrete) => Ok(*concrete),
      Err(boxed) => Err(AnyValue {
        boxed,
        rust_type,
        type_name,
      }),
    }
  }
}

impl fmt::Debug for AnyValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "AnyValue({})", self.type_name)
  }
}

/// Ordered sequence container, tagged as the List abstract kind on the wire.
#[derive(Debug, Default)]
pub struct AnyList(pub Vec<AnyValue>);

/// Distinct-element container, tagged as the Set abstract kind on the wire.
/// Element order follows insertion order; distinctness is the caller's
/// contract, not enforced here.
#[derive(Debug, Default)]
pub struct AnySet(pub Vec<AnyValue>);

/// Generic collection without list or set semantics.
#[derive(Debug, Default)]
pub struct AnyBag(pub Vec<AnyValue>);

/// Key/value container, tagged as the Map abstract kind on the wire.
/// Entry order follows insertion order.
#[derive(Debug, Default)]
pub struct AnyMap(pub Vec<(AnyValue, AnyValue)>);

/// The closed enumeration of abstract container kinds carried on the wire in
/// place of concrete implementation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
  List,
  Set,
  Collection,
  Map,
}

impl ContainerKind {
  /// Stable label used in registration diagnostics.
  #[must_use]
  pub const fn label(self) -> &'static str {
    match self {
      ContainerKind::List => "list kind",
      ContainerKind::Set => "set kind",
      ContainerKind::Collection => "collection kind",
      ContainerKind::Map => "map kind",
    }
  }
}

impl fmt::Display for ContainerKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trips_concrete_values() {
    let value = AnyValue::new(42i32);
    assert!(value.is::<i32>());
    assert_eq!(value.downcast_ref::<i32>(), Some(&42));
    assert_eq!(value.type_name(), "i32");
    assert_eq!(value.downcast::<i32>().ok(), Some(42));
  }

  #[test]
  fn downcast_mismatch_returns_value() {
    let value = AnyValue::new(String::from("a"));
    let back = value.downcast::<i32>().expect_err("wrong type");
    assert_eq!(back.downcast_ref::<String>().map(String::as_str), Some("a"));
  }
}
