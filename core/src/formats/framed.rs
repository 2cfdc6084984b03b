//! Framed wire format: Protocol-Buffers-style tag/length framing built on
//! `prost::encoding`.
//!
//! Every primitive write consumes one field number from an internal
//! auto-incrementing index: integers, booleans and code points ride as
//! varints, floats as fixed32/fixed64, strings and byte runs as
//! length-delimited fields. Reads advance the same index and verify both the
//! decoded field number and wire type, so a read sequence that diverges from
//! the write sequence fails with a corrupt-frame error instead of silently
//! desynchronizing.
//!
//! Decoding needs the whole payload buffered up front; the factory reports
//! stream sources as unsupported.

use std::io::{self, Write};
use std::sync::Arc;

use bytes::{Buf, BufMut, BytesMut};
use prost::encoding::{decode_key, decode_varint, encode_key, encode_varint, WireType};

use crate::composite::CompositeCodec;
use crate::config::CodecConfig;
use crate::data::{check_length, mode_violation, DataCodec, Direction};
use crate::error::CodecError;
use crate::factory::{IoKind, SerializerFactory, Sink, Source};
use crate::id::FormatId;
use crate::object::RegistryObjectCodec;
use crate::registry::TypeRegistry;

/// Highest encodable protobuf field number.
const MAX_FIELD: u32 = (1 << 29) - 1;

enum FramedIo<'a> {
  Writer {
    sink: &'a mut dyn io::Write,
    staging: BytesMut,
  },
  Reader {
    input: &'a [u8],
  },
}

/// Primitive data codec of the framed format.
pub struct FramedDataCodec<'a> {
  io: FramedIo<'a>,
  next_field: u32,
  config: CodecConfig,
}

impl<'a> FramedDataCodec<'a> {
  /// Binds a write-mode codec to the sink.
  #[must_use]
  pub fn writer(sink: Sink<'a>, config: CodecConfig) -> Self {
    Self {
      io: FramedIo::Writer {
        sink: sink.into_writer(),
        staging: BytesMut::with_capacity(64),
      },
      next_field: 1,
      config,
    }
  }

  /// Binds a read-mode codec to a fully buffered payload.
  #[must_use]
  pub fn reader(input: &'a [u8], config: CodecConfig) -> Self {
    Self {
      io: FramedIo::Reader { input },
      next_field: 1,
      config,
    }
  }

  fn claim_field(&mut self) -> Result<u32, CodecError> {
    if self.next_field > MAX_FIELD {
      return Err(CodecError::corrupt("protobuf field numbers exhausted"));
    }
    let field = self.next_field;
    self.next_field += 1;
    Ok(field)
  }

  fn write_field(
    &mut self,
    attempted: &'static str,
    wire_type: WireType,
    emit: impl FnOnce(&mut BytesMut),
  ) -> Result<(), CodecError> {
    if matches!(self.io, FramedIo::Reader { .. }) {
      return Err(mode_violation(Direction::Read, attempted));
    }
    let field = self.claim_field()?;
    match &mut self.io {
      FramedIo::Writer { sink, staging } => {
        staging.clear();
        encode_key(field, wire_type, staging);
        emit(staging);
        sink.write_all(staging)?;
        Ok(())
      }
      FramedIo::Reader { .. } => Err(mode_violation(Direction::Read, attempted)),
    }
  }

  fn input(&mut self, attempted: &'static str) -> Result<&mut &'a [u8], CodecError> {
    match &mut self.io {
      FramedIo::Reader { input } => Ok(input),
      FramedIo::Writer { .. } => Err(mode_violation(Direction::Write, attempted)),
    }
  }

  /// Reads and verifies the next key against the reader's own field index.
  fn read_key(&mut self, attempted: &'static str, expected_type: WireType) -> Result<(), CodecError> {
    if matches!(self.io, FramedIo::Writer { .. }) {
      return Err(mode_violation(Direction::Write, attempted));
    }
    let expected_field = self.claim_field()?;
    let input = self.input(attempted)?;
    let (field, wire_type) = decode_key(input).map_err(CodecError::corrupt)?;
    if field != expected_field {
      return Err(CodecError::corrupt(format!(
        "field {field} out of order, expected field {expected_field}"
      )));
    }
    if wire_type != expected_type {
      return Err(CodecError::corrupt(format!(
        "field {field} carries wire type {wire_type:?}, expected {expected_type:?}"
      )));
    }
    Ok(())
  }

  fn read_varint_field(&mut self, attempted: &'static str) -> Result<u64, CodecError> {
    self.read_key(attempted, WireType::Varint)?;
    let input = self.input(attempted)?;
    decode_varint(input).map_err(CodecError::corrupt)
  }

  fn read_signed_field(&mut self, attempted: &'static str) -> Result<i64, CodecError> {
    Ok(self.read_varint_field(attempted)? as i64)
  }

  fn read_delimited_field(&mut self, attempted: &'static str) -> Result<Vec<u8>, CodecError> {
    self.read_key(attempted, WireType::LengthDelimited)?;
    let max = self.config.max_length_prefix();
    let input = self.input(attempted)?;
    let len = decode_varint(input).map_err(CodecError::corrupt)?;
    let len = check_length(len, max)?;
    if input.remaining() < len {
      return Err(CodecError::corrupt("length-delimited field is truncated"));
    }
    let mut payload = vec![0u8; len];
    input.copy_to_slice(&mut payload);
    Ok(payload)
  }
}

impl DataCodec for FramedDataCodec<'_> {
  fn direction(&self) -> Direction {
    match self.io {
      FramedIo::Writer { .. } => Direction::Write,
      FramedIo::Reader { .. } => Direction::Read,
    }
  }

  fn read_bool(&mut self) -> Result<bool, CodecError> {
    Ok(self.read_varint_field("read_bool")? != 0)
  }

  fn read_i8(&mut self) -> Result<i8, CodecError> {
    let value = self.read_signed_field("read_i8")?;
    i8::try_from(value).map_err(CodecError::corrupt)
  }

  fn read_u8(&mut self) -> Result<u8, CodecError> {
    let value = self.read_varint_field("read_u8")?;
    u8::try_from(value).map_err(CodecError::corrupt)
  }

  fn read_i16(&mut self) -> Result<i16, CodecError> {
    let value = self.read_signed_field("read_i16")?;
    i16::try_from(value).map_err(CodecError::corrupt)
  }

  fn read_u16(&mut self) -> Result<u16, CodecError> {
    let value = self.read_varint_field("read_u16")?;
    u16::try_from(value).map_err(CodecError::corrupt)
  }

  fn read_i32(&mut self) -> Result<i32, CodecError> {
    let value = self.read_signed_field("read_i32")?;
    i32::try_from(value).map_err(CodecError::corrupt)
  }

  fn read_u32(&mut self) -> Result<u32, CodecError> {
    let value = self.read_varint_field("read_u32")?;
    u32::try_from(value).map_err(CodecError::corrupt)
  }

  fn read_i64(&mut self) -> Result<i64, CodecError> {
    self.read_signed_field("read_i64")
  }

  fn read_u64(&mut self) -> Result<u64, CodecError> {
    self.read_varint_field("read_u64")
  }

  fn read_f32(&mut self) -> Result<f32, CodecError> {
    self.read_key("read_f32", WireType::ThirtyTwoBit)?;
    let input = self.input("read_f32")?;
    if input.remaining() < 4 {
      return Err(CodecError::corrupt("fixed32 field is truncated"));
    }
    Ok(input.get_f32_le())
  }

  fn read_f64(&mut self) -> Result<f64, CodecError> {
    self.read_key("read_f64", WireType::SixtyFourBit)?;
    let input = self.input("read_f64")?;
    if input.remaining() < 8 {
      return Err(CodecError::corrupt("fixed64 field is truncated"));
    }
    Ok(input.get_f64_le())
  }

  fn read_char(&mut self) -> Result<char, CodecError> {
    let scalar = self.read_varint_field("read_char")?;
    let scalar = u32::try_from(scalar).map_err(CodecError::corrupt)?;
    char::from_u32(scalar).ok_or_else(|| CodecError::corrupt(format!("invalid code point {scalar:#x}")))
  }

  fn read_string(&mut self) -> Result<String, CodecError> {
    let payload = self.read_delimited_field("read_string")?;
    String::from_utf8(payload).map_err(CodecError::corrupt)
  }

  fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, CodecError> {
    let payload = self.read_delimited_field("read_bytes")?;
    if payload.len() != len {
      return Err(CodecError::corrupt(format!(
        "byte run carries {} bytes, caller expected {len}",
        payload.len()
      )));
    }
    Ok(payload)
  }

  fn write_bool(&mut self, value: bool) -> Result<(), CodecError> {
    self.write_field("write_bool", WireType::Varint, |buf| {
      encode_varint(u64::from(value), buf);
    })
  }

  fn write_i8(&mut self, value: i8) -> Result<(), CodecError> {
    self.write_field("write_i8", WireType::Varint, |buf| {
      encode_varint(i64::from(value) as u64, buf);
    })
  }

  fn write_u8(&mut self, value: u8) -> Result<(), CodecError> {
    self.write_field("write_u8", WireType::Varint, |buf| {
      encode_varint(u64::from(value), buf);
    })
  }

  fn write_i16(&mut self, value: i16) -> Result<(), CodecError> {
    self.write_field("write_i16", WireType::Varint, |buf| {
      encode_varint(i64::from(value) as u64, buf);
    })
  }

  fn write_u16(&mut self, value: u16) -> Result<(), CodecError> {
    self.write_field("write_u16", WireType::Varint, |buf| {
      encode_varint(u64::from(value), buf);
    })
  }

  fn write_i32(&mut self, value: i32) -> Result<(), CodecError> {
    self.write_field("write_i32", WireType::Varint, |buf| {
      encode_varint(i64::from(value) as u64, buf);
    })
  }

  fn write_u32(&mut self, value: u32) -> Result<(), CodecError> {
    self.write_field("write_u32", WireType::Varint, |buf| {
      encode_varint(u64::from(value), buf);
    })
  }

  fn write_i64(&mut self, value: i64) -> Result<(), CodecError> {
    self.write_field("write_i64", WireType::Varint, |buf| {
      encode_varint(value as u64, buf);
    })
  }

  fn write_u64(&mut self, value: u64) -> Result<(), CodecError> {
    self.write_field("write_u64", WireType::Varint, |buf| {
      encode_varint(value, buf);
    })
  }

  fn write_f32(&mut self, value: f32) -> Result<(), CodecError> {
    self.write_field("write_f32", WireType::ThirtyTwoBit, |buf| {
      buf.put_f32_le(value);
    })
  }

  fn write_f64(&mut self, value: f64) -> Result<(), CodecError> {
    self.write_field("write_f64", WireType::SixtyFourBit, |buf| {
      buf.put_f64_le(value);
    })
  }

  fn write_char(&mut self, value: char) -> Result<(), CodecError> {
    self.write_field("write_char", WireType::Varint, |buf| {
      encode_varint(u64::from(u32::from(value)), buf);
    })
  }

  fn write_string(&mut self, value: &str) -> Result<(), CodecError> {
    self.write_field("write_string", WireType::LengthDelimited, |buf| {
      encode_varint(value.len() as u64, buf);
      buf.put_slice(value.as_bytes());
    })
  }

  fn write_bytes(&mut self, value: &[u8]) -> Result<(), CodecError> {
    self.write_field("write_bytes", WireType::LengthDelimited, |buf| {
      encode_varint(value.len() as u64, buf);
      buf.put_slice(value);
    })
  }

  fn flush(&mut self) -> Result<(), CodecError> {
    match &mut self.io {
      FramedIo::Writer { sink, .. } => {
        sink.flush()?;
        Ok(())
      }
      FramedIo::Reader { .. } => Ok(()),
    }
  }
}

/// Factory of the framed format, constructed over a caller-supplied frozen
/// registry. Deserialization requires a fully buffered source.
pub struct FramedSerializerFactory {
  registry: Arc<TypeRegistry>,
  config: CodecConfig,
}

impl FramedSerializerFactory {
  /// Creates a factory over an externally built registry.
  #[must_use]
  pub fn new(registry: Arc<TypeRegistry>) -> Self {
    Self::with_config(registry, CodecConfig::default())
  }

  /// Creates a factory with the given configuration.
  #[must_use]
  pub fn with_config(registry: Arc<TypeRegistry>, config: CodecConfig) -> Self {
    Self { registry, config }
  }
}

impl SerializerFactory for FramedSerializerFactory {
  fn format_id(&self) -> FormatId {
    FormatId::FRAMED
  }

  fn serialize<'a>(&self, sink: Sink<'a>) -> Result<CompositeCodec<'a>, CodecError> {
    let data = FramedDataCodec::writer(sink, self.config.clone());
    Ok(CompositeCodec::new(
      FormatId::FRAMED,
      Box::new(data),
      Box::new(RegistryObjectCodec::new(self.registry.clone(), self.config.clone())),
      Some(self.registry.clone()),
    ))
  }

  fn deserialize<'a>(&self, source: Source<'a>) -> Result<CompositeCodec<'a>, CodecError> {
    let buffer = match source {
      Source::Buffer(buffer) => buffer,
      Source::Stream(_) => {
        return Err(CodecError::UnsupportedSource {
          format: FormatId::FRAMED,
        })
      }
    };
    let data = FramedDataCodec::reader(buffer, self.config.clone());
    Ok(CompositeCodec::new(
      FormatId::FRAMED,
      Box::new(data),
      Box::new(RegistryObjectCodec::new(self.registry.clone(), self.config.clone())),
      Some(self.registry.clone()),
    ))
  }

  fn support_serialize(&self, _kind: IoKind) -> bool {
    true
  }

  fn support_deserialize(&self, kind: IoKind) -> bool {
    kind == IoKind::Buffer
  }

  fn registered_types(&self) -> Result<Vec<&'static str>, CodecError> {
    Ok(self.registry.type_names())
  }

  fn requires_external_registry(&self) -> bool {
    true
  }
}
