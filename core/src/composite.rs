//! Combinator exposing the primitive and object contracts over one stream.

use std::any::Any;
use std::sync::Arc;

use crate::data::{DataCodec, Direction};
use crate::error::CodecError;
use crate::id::FormatId;
use crate::object::ObjectCodec;
use crate::portable::downcast_value;
use crate::registry::TypeRegistry;
use crate::scope::{self, CodecScope};
use crate::value::AnyValue;

/// One bound codec: a data codec owning the underlying handle plus the object
/// codec layered over it.
///
/// Owning the single [`DataCodec`] makes the shared-stream/shared-direction
/// invariant hold by construction: primitive and object traffic cannot
/// desynchronize because they move through the same handle. The combinator
/// performs no independent I/O.
///
/// A composite codec serves exactly one logical operation and must not be
/// shared across concurrent callers; factories hand out a fresh instance per
/// `serialize`/`deserialize` call.
pub struct CompositeCodec<'a> {
  format: FormatId,
  data: Box<dyn DataCodec + 'a>,
  objects: Box<dyn ObjectCodec>,
  registry: Option<Arc<TypeRegistry>>,
}

impl<'a> CompositeCodec<'a> {
  pub(crate) fn new(
    format: FormatId,
    data: Box<dyn DataCodec + 'a>,
    objects: Box<dyn ObjectCodec>,
    registry: Option<Arc<TypeRegistry>>,
  ) -> Self {
    Self {
      format,
      data,
      objects,
      registry,
    }
  }

  /// Format this codec encodes for.
  #[must_use]
  pub fn format(&self) -> FormatId {
    self.format
  }

  /// Direction this codec was bound to.
  #[must_use]
  pub fn direction(&self) -> Direction {
    self.data.direction()
  }

  pub fn read_bool(&mut self) -> Result<bool, CodecError> {
    self.data.read_bool()
  }

  pub fn read_i8(&mut self) -> Result<i8, CodecError> {
    self.data.read_i8()
  }

  pub fn read_u8(&mut self) -> Result<u8, CodecError> {
    self.data.read_u8()
  }

  pub fn read_i16(&mut self) -> Result<i16, CodecError> {
    self.data.read_i16()
  }

  pub fn read_u16(&mut self) -> Result<u16, CodecError> {
    self.data.read_u16()
  }

  pub fn read_i32(&mut self) -> Result<i32, CodecError> {
    self.data.read_i32()
  }

  pub fn read_u32(&mut self) -> Result<u32, CodecError> {
    self.data.read_u32()
  }

  pub fn read_i64(&mut self) -> Result<i64, CodecError> {
    self.data.read_i64()
  }

  pub fn read_u64(&mut self) -> Result<u64, CodecError> {
    self.data.read_u64()
  }

  pub fn read_f32(&mut self) -> Result<f32, CodecError> {
    self.data.read_f32()
  }

  pub fn read_f64(&mut self) -> Result<f64, CodecError> {
    self.data.read_f64()
  }

  pub fn read_char(&mut self) -> Result<char, CodecError> {
    self.data.read_char()
  }

  pub fn read_string(&mut self) -> Result<String, CodecError> {
    self.data.read_string()
  }

  pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, CodecError> {
    self.data.read_bytes(len)
  }

  pub fn write_bool(&mut self, value: bool) -> Result<(), CodecError> {
    self.data.write_bool(value)
  }

  pub fn write_i8(&mut self, value: i8) -> Result<(), CodecError> {
    self.data.write_i8(value)
  }

  pub fn write_u8(&mut self, value: u8) -> Result<(), CodecError> {
    self.data.write_u8(value)
  }

  pub fn write_i16(&mut self, value: i16) -> Result<(), CodecError> {
    self.data.write_i16(value)
  }

  pub fn write_u16(&mut self, value: u16) -> Result<(), CodecError> {
    self.data.write_u16(value)
  }

  pub fn write_i32(&mut self, value: i32) -> Result<(), CodecError> {
    self.data.write_i32(value)
  }

  pub fn write_u32(&mut self, value: u32) -> Result<(), CodecError> {
    self.data.write_u32(value)
  }

  pub fn write_i64(&mut self, value: i64) -> Result<(), CodecError> {
    self.data.write_i64(value)
  }

  pub fn write_u64(&mut self, value: u64) -> Result<(), CodecError> {
    self.data.write_u64(value)
  }

  pub fn write_f32(&mut self, value: f32) -> Result<(), CodecError> {
    self.data.write_f32(value)
  }

  pub fn write_f64(&mut self, value: f64) -> Result<(), CodecError> {
    self.data.write_f64(value)
  }

  pub fn write_char(&mut self, value: char) -> Result<(), CodecError> {
    self.data.write_char(value)
  }

  pub fn write_string(&mut self, value: &str) -> Result<(), CodecError> {
    self.data.write_string(value)
  }

  pub fn write_bytes(&mut self, value: &[u8]) -> Result<(), CodecError> {
    self.data.write_bytes(value)
  }

  /// Writes one object, id header included, with the ambient scope installed
  /// for the duration of the call.
  pub fn write_object(&mut self, value: &AnyValue) -> Result<(), CodecError> {
    let _scope = scope::enter(self.make_scope());
    self.objects.write_object(self.data.as_mut(), value)
  }

  /// Reads one object, id header included, with the ambient scope installed
  /// for the duration of the call.
  pub fn read_object(&mut self) -> Result<AnyValue, CodecError> {
    let _scope = scope::enter(self.make_scope());
    self.objects.read_object(self.data.as_mut())
  }

  /// Reads one object and downcasts it, failing with
  /// [`CodecError::TypeMismatch`] if the decoded value is not a `T`.
  pub fn read_object_as<T: Any>(&mut self) -> Result<T, CodecError> {
    downcast_value(self.read_object()?)
  }

  /// Flushes buffered bytes to the sink. Idempotent; a no-op in read mode.
  pub fn flush(&mut self) -> Result<(), CodecError> {
    self.data.flush()
  }

  fn make_scope(&self) -> CodecScope {
    CodecScope::new(self.format, self.data.direction(), self.registry.clone())
  }
}
