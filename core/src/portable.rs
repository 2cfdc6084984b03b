//! Wire type traits and the encode/decode contexts handed to them.

use std::any::Any;

use crate::data::DataCodec;
use crate::error::CodecError;
use crate::id::WireId;
use crate::object::ObjectCodec;
use crate::value::AnyValue;

/// Byte-level shape of one concrete type, expressed against the
/// format-agnostic context. Carries no identity; pairing a shape with a wire
/// id happens at registration time.
pub trait WireValue: Send + Sync + 'static {
  /// Writes this value through the context.
  fn encode(&self, ctx: &mut EncodeContext<'_>) -> Result<(), CodecError>;

  /// Reads one value from the context.
  fn decode(ctx: &mut DecodeContext<'_>) -> Result<Self, CodecError>
  where
    Self: Sized;
}

/// Declarative registration marker: a wire type carrying its numeric id as an
/// associated const. Normally produced by `#[derive(Portable)]` with a
/// `#[portable(id = <u32>)]` attribute; a type without the marker simply does
/// not satisfy the bound, so an unregistrable type is a compile error rather
/// than a runtime one.
pub trait Portable: WireValue {
  /// The id this type registers under. Must be outside the reserved range.
  const WIRE_ID: WireId;
}

/// Write-side context: primitive access plus recursive object writes, bound
/// to the single data codec of the current operation.
pub struct EncodeContext<'a> {
  data: &'a mut dyn DataCodec,
  objects: &'a dyn ObjectCodec,
}

impl<'a> EncodeContext<'a> {
  pub(crate) fn new(data: &'a mut dyn DataCodec, objects: &'a dyn ObjectCodec) -> Self {
    Self { data, objects }
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

  /// Recursively writes a nested object through the in-flight object codec,
  /// id header included.
  pub fn write_object(&mut self, value: &AnyValue) -> Result<(), CodecError> {
    self.objects.write_object(&mut *self.data, value)
  }
}

/// Read-side context, the mirror of [`EncodeContext`].
pub struct DecodeContext<'a> {
  data: &'a mut dyn DataCodec,
  objects: &'a dyn ObjectCodec,
}

impl<'a> DecodeContext<'a> {
  pub(crate) fn new(data: &'a mut dyn DataCodec, objects: &'a dyn ObjectCodec) -> Self {
    Self { data, objects }
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

  /// Recursively reads a nested object, id header included.
  pub fn read_object(&mut self) -> Result<AnyValue, CodecError> {
    self.objects.read_object(&mut *self.data)
  }

  /// Reads a nested object and downcasts it, failing with
  /// [`CodecError::TypeMismatch`] if the decoded value is not a `T`.
  pub fn read_object_as<T: Any>(&mut self) -> Result<T, CodecError> {
    downcast_value(self.read_object()?)
  }
}

/// Downcasts a decoded value into a concrete type with a diagnostic error.
/// Assignability in this engine is exact type equality; Rust has no runtime
/// subtype relation to honor.
pub(crate) fn downcast_value<T: Any>(value: AnyValue) -> Result<T, CodecError> {
  let actual = value.type_name();
  value.downcast::<T>().map_err(|_| CodecError::TypeMismatch {
    expected: std::any::type_name::<T>(),
    actual,
  })
}

impl WireValue for bool {
  fn encode(&self, ctx: &mut EncodeContext<'_>) -> Result<(), CodecError> {
    ctx.write_bool(*self)
  }

  fn decode(ctx: &mut DecodeContext<'_>) -> Result<Self, CodecError> {
    ctx.read_bool()
  }
}

impl WireValue for i8 {
  fn encode(&self, ctx: &mut EncodeContext<'_>) -> Result<(), CodecError> {
    ctx.write_i8(*self)
  }

  fn decode(ctx: &mut DecodeContext<'_>) -> Result<Self, CodecError> {
    ctx.read_i8()
  }
}

impl WireValue for u8 {
  fn encode(&self, ctx: &mut EncodeContext<'_>) -> Result<(), CodecError> {
    ctx.write_u8(*self)
  }

  fn decode(ctx: &mut DecodeContext<'_>) -> Result<Self, CodecError> {
    ctx.read_u8()
  }
}

impl WireValue for i16 {
  fn encode(&self, ctx: &mut EncodeContext<'_>) -> Result<(), CodecError> {
    ctx.write_i16(*self)
  }

  fn decode(ctx: &mut DecodeContext<'_>) -> Result<Self, CodecError> {
    ctx.read_i16()
  }
}

impl WireValue for u16 {
  fn encode(&self, ctx: &mut EncodeContext<'_>) -> Result<(), CodecError> {
    ctx.write_u16(*self)
  }

  fn decode(ctx: &mut DecodeContext<'_>) -> Result<Self, CodecError> {
    ctx.read_u16()
  }
}

impl WireValue for i32 {
  fn encode(&self, ctx: &mut EncodeContext<'_>) -> Result<(), CodecError> {
    ctx.write_i32(*self)
  }

  fn decode(ctx: &mut DecodeContext<'_>) -> Result<Self, CodecError> {
    ctx.read_i32()
  }
}

impl WireValue for u32 {
  fn encode(&self, ctx: &mut EncodeContext<'_>) -> Result<(), CodecError> {
    ctx.write_u32(*self)
  }

  fn decode(ctx: &mut DecodeContext<'_>) -> Result<Self, CodecError> {
    ctx.read_u32()
  }
}

impl WireValue for i64 {
  fn encode(&self, ctx: &mut EncodeContext<'_>) -> Result<(), CodecError> {
    ctx.write_i64(*self)
  }

  fn decode(ctx: &mut DecodeContext<'_>) -> Result<Self, CodecError> {
    ctx.read_i64()
  }
}

impl WireValue for u64 {
  fn encode(&self, ctx: &mut EncodeContext<'_>) -> Result<(), CodecError> {
    ctx.write_u64(*self)
  }

  fn decode(ctx: &mut DecodeContext<'_>) -> Result<Self, CodecError> {
    ctx.read_u64()
  }
}

impl WireValue for f32 {
  fn encode(&self, ctx: &mut EncodeContext<'_>) -> Result<(), CodecError> {
    ctx.write_f32(*self)
  }

  fn decode(ctx: &mut DecodeContext<'_>) -> Result<Self, CodecError> {
    ctx.read_f32()
  }
}

impl WireValue for f64 {
  fn encode(&self, ctx: &mut EncodeContext<'_>) -> Result<(), CodecError> {
    ctx.write_f64(*self)
  }

  fn decode(ctx: &mut DecodeContext<'_>) -> Result<Self, CodecError> {
    ctx.read_f64()
  }
}

impl WireValue for char {
  fn encode(&self, ctx: &mut EncodeContext<'_>) -> Result<(), CodecError> {
    ctx.write_char(*self)
  }

  fn decode(ctx: &mut DecodeContext<'_>) -> Result<Self, CodecError> {
    ctx.read_char()
  }
}

impl WireValue for String {
  fn encode(&self, ctx: &mut EncodeContext<'_>) -> Result<(), CodecError> {
    ctx.write_string(self)
  }

  fn decode(ctx: &mut DecodeContext<'_>) -> Result<Self, CodecError> {
    ctx.read_string()
  }
}

// Raw byte runs carry an explicit u32 length so every backend can replay them.
impl WireValue for Vec<u8> {
  fn encode(&self, ctx: &mut EncodeContext<'_>) -> Result<(), CodecError> {
    let len = u32::try_from(self.len()).map_err(|_| CodecError::LengthOverflow {
      len: self.len() as u64,
      max: u64::from(u32::MAX),
    })?;
    ctx.write_u32(len)?;
    ctx.write_bytes(self)
  }

  fn decode(ctx: &mut DecodeContext<'_>) -> Result<Self, CodecError> {
    let len = ctx.read_u32()?;
    ctx.read_bytes(len as usize)
  }
}
