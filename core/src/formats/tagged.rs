//! Tagged wire format: schema-less binary with a one-byte opcode in front of
//! every primitive value.
//!
//! Layout per value: the opcode byte, then the same big-endian payload shape
//! as the native format. The opcode makes each value self-describing at the
//! primitive level; a read that meets a different opcode than expected fails
//! with a corrupt-frame error instead of silently reinterpreting bytes.

use std::io::{self, Read, Write};
use std::sync::Arc;

use crate::composite::CompositeCodec;
use crate::config::CodecConfig;
use crate::data::{check_length, mode_violation, DataCodec, Direction};
use crate::error::CodecError;
use crate::factory::{ByteSource, IoKind, SerializerFactory, Sink, Source};
use crate::id::FormatId;
use crate::object::RegistryObjectCodec;
use crate::registry::TypeRegistry;

const OP_BOOL: u8 = 0x01;
const OP_I8: u8 = 0x02;
const OP_U8: u8 = 0x03;
const OP_I16: u8 = 0x04;
const OP_U16: u8 = 0x05;
const OP_I32: u8 = 0x06;
const OP_U32: u8 = 0x07;
const OP_I64: u8 = 0x08;
const OP_U64: u8 = 0x09;
const OP_F32: u8 = 0x0a;
const OP_F64: u8 = 0x0b;
const OP_CHAR: u8 = 0x0c;
const OP_STRING: u8 = 0x0d;
const OP_BYTES: u8 = 0x0e;

fn opcode_name(opcode: u8) -> &'static str {
  match opcode {
    OP_BOOL => "bool",
    OP_I8 => "i8",
    OP_U8 => "u8",
    OP_I16 => "i16",
    OP_U16 => "u16",
    OP_I32 => "i32",
    OP_U32 => "u32",
    OP_I64 => "i64",
    OP_U64 => "u64",
    OP_F32 => "f32",
    OP_F64 => "f64",
    OP_CHAR => "char",
    OP_STRING => "string",
    OP_BYTES => "bytes",
    _ => "unknown",
  }
}

enum TaggedIo<'a> {
  Writer(&'a mut dyn io::Write),
  Reader(ByteSource<'a>),
}

/// Primitive data codec of the tagged format.
pub struct TaggedDataCodec<'a> {
  io: TaggedIo<'a>,
  config: CodecConfig,
}

impl<'a> TaggedDataCodec<'a> {
  /// Binds a write-mode codec to the sink.
  #[must_use]
  pub fn writer(sink: Sink<'a>, config: CodecConfig) -> Self {
    Self {
      io: TaggedIo::Writer(sink.into_writer()),
      config,
    }
  }

  /// Binds a read-mode codec to the source.
  #[must_use]
  pub fn reader(source: Source<'a>, config: CodecConfig) -> Self {
    Self {
      io: TaggedIo::Reader(source.into_reader()),
      config,
    }
  }

  fn put(&mut self, attempted: &'static str, opcode: u8, payload: &[u8]) -> Result<(), CodecError> {
    match &mut self.io {
      TaggedIo::Writer(writer) => {
        writer.write_all(&[opcode])?;
        writer.write_all(payload)?;
        Ok(())
      }
      TaggedIo::Reader(_) => Err(mode_violation(Direction::Read, attempted)),
    }
  }

  fn expect_opcode(&mut self, attempted: &'static str, expected: u8) -> Result<(), CodecError> {
    let reader = match &mut self.io {
      TaggedIo::Reader(reader) => reader,
      TaggedIo::Writer(_) => return Err(mode_violation(Direction::Write, attempted)),
    };
    let mut opcode = [0u8; 1];
    reader.read_exact(&mut opcode)?;
    if opcode[0] != expected {
      return Err(CodecError::corrupt(format!(
        "expected {} opcode {expected:#04x}, found {} opcode {:#04x}",
        opcode_name(expected),
        opcode_name(opcode[0]),
        opcode[0]
      )));
    }
    Ok(())
  }

  fn take<const N: usize>(&mut self, attempted: &'static str, opcode: u8) -> Result<[u8; N], CodecError> {
    self.expect_opcode(attempted, opcode)?;
    match &mut self.io {
      TaggedIo::Reader(reader) => {
        let mut buf = [0u8; N];
        reader.read_exact(&mut buf)?;
        Ok(buf)
      }
      TaggedIo::Writer(_) => Err(mode_violation(Direction::Write, attempted)),
    }
  }

  fn take_payload(&mut self, attempted: &'static str, len: usize) -> Result<Vec<u8>, CodecError> {
    let len = check_length(len as u64, self.config.max_length_prefix())?;
    match &mut self.io {
      TaggedIo::Reader(reader) => {
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf)?;
        Ok(buf)
      }
      TaggedIo::Writer(_) => Err(mode_violation(Direction::Write, attempted)),
    }
  }
}

impl DataCodec for TaggedDataCodec<'_> {
  fn direction(&self) -> Direction {
    match self.io {
      TaggedIo::Writer(_) => Direction::Write,
      TaggedIo::Reader(_) => Direction::Read,
    }
  }

  fn read_bool(&mut self) -> Result<bool, CodecError> {
    match self.take::<1>("read_bool", OP_BOOL)?[0] {
      0 => Ok(false),
      1 => Ok(true),
      other => Err(CodecError::corrupt(format!("invalid boolean byte {other:#04x}"))),
    }
  }

  fn read_i8(&mut self) -> Result<i8, CodecError> {
    Ok(i8::from_be_bytes(self.take::<1>("read_i8", OP_I8)?))
  }

  fn read_u8(&mut self) -> Result<u8, CodecError> {
    Ok(u8::from_be_bytes(self.take::<1>("read_u8", OP_U8)?))
  }

  fn read_i16(&mut self) -> Result<i16, CodecError> {
    Ok(i16::from_be_bytes(self.take::<2>("read_i16", OP_I16)?))
  }

  fn read_u16(&mut self) -> Result<u16, CodecError> {
    Ok(u16::from_be_bytes(self.take::<2>("read_u16", OP_U16)?))
  }

  fn read_i32(&mut self) -> Result<i32, CodecError> {
    Ok(i32::from_be_bytes(self.take::<4>("read_i32", OP_I32)?))
  }

  fn read_u32(&mut self) -> Result<u32, CodecError> {
    Ok(u32::from_be_bytes(self.take::<4>("read_u32", OP_U32)?))
  }

  fn read_i64(&mut self) -> Result<i64, CodecError> {
    Ok(i64::from_be_bytes(self.take::<8>("read_i64", OP_I64)?))
  }

  fn read_u64(&mut self) -> Result<u64, CodecError> {
    Ok(u64::from_be_bytes(self.take::<8>("read_u64", OP_U64)?))
  }

  fn read_f32(&mut self) -> Result<f32, CodecError> {
    Ok(f32::from_be_bytes(self.take::<4>("read_f32", OP_F32)?))
  }

  fn read_f64(&mut self) -> Result<f64, CodecError> {
    Ok(f64::from_be_bytes(self.take::<8>("read_f64", OP_F64)?))
  }

  fn read_char(&mut self) -> Result<char, CodecError> {
    let scalar = u32::from_be_bytes(self.take::<4>("read_char", OP_CHAR)?);
    char::from_u32(scalar).ok_or_else(|| CodecError::corrupt(format!("invalid code point {scalar:#x}")))
  }

  fn read_string(&mut self) -> Result<String, CodecError> {
    let len = u32::from_be_bytes(self.take::<4>("read_string", OP_STRING)?);
    let bytes = self.take_payload("read_string", len as usize)?;
    String::from_utf8(bytes).map_err(CodecError::corrupt)
  }

  fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, CodecError> {
    self.expect_opcode("read_bytes", OP_BYTES)?;
    self.take_payload("read_bytes", len)
  }

  fn write_bool(&mut self, value: bool) -> Result<(), CodecError> {
    self.put("write_bool", OP_BOOL, &[u8::from(value)])
  }

  fn write_i8(&mut self, value: i8) -> Result<(), CodecError> {
    self.put("write_i8", OP_I8, &value.to_be_bytes())
  }

  fn write_u8(&mut self, value: u8) -> Result<(), CodecError> {
    self.put("write_u8", OP_U8, &value.to_be_bytes())
  }

  fn write_i16(&mut self, value: i16) -> Result<(), CodecError> {
    self.put("write_i16", OP_I16, &value.to_be_bytes())
  }

  fn write_u16(&mut self, value: u16) -> Result<(), CodecError> {
    self.put("write_u16", OP_U16, &value.to_be_bytes())
  }

  fn write_i32(&mut self, value: i32) -> Result<(), CodecError> {
    self.put("write_i32", OP_I32, &value.to_be_bytes())
  }

  fn write_u32(&mut self, value: u32) -> Result<(), CodecError> {
    self.put("write_u32", OP_U32, &value.to_be_bytes())
  }

  fn write_i64(&mut self, value: i64) -> Result<(), CodecError> {
    self.put("write_i64", OP_I64, &value.to_be_bytes())
  }

  fn write_u64(&mut self, value: u64) -> Result<(), CodecError> {
    self.put("write_u64", OP_U64, &value.to_be_bytes())
  }

  fn write_f32(&mut self, value: f32) -> Result<(), CodecError> {
    self.put("write_f32", OP_F32, &value.to_be_bytes())
  }

  fn write_f64(&mut self, value: f64) -> Result<(), CodecError> {
    self.put("write_f64", OP_F64, &value.to_be_bytes())
  }

  fn write_char(&mut self, value: char) -> Result<(), CodecError> {
    self.put("write_char", OP_CHAR, &u32::from(value).to_be_bytes())
  }

  fn write_string(&mut self, value: &str) -> Result<(), CodecError> {
    let len = u32::try_from(value.len()).map_err(|_| CodecError::LengthOverflow {
      len: value.len() as u64,
      max: u64::from(u32::MAX),
    })?;
    self.put("write_string", OP_STRING, &len.to_be_bytes())?;
    match &mut self.io {
      TaggedIo::Writer(writer) => {
        writer.write_all(value.as_bytes())?;
        Ok(())
      }
      TaggedIo::Reader(_) => Err(mode_violation(Direction::Read, "write_string")),
    }
  }

  fn write_bytes(&mut self, value: &[u8]) -> Result<(), CodecError> {
    self.put("write_bytes", OP_BYTES, value)
  }

  fn flush(&mut self) -> Result<(), CodecError> {
    match &mut self.io {
      TaggedIo::Writer(writer) => {
        writer.flush()?;
        Ok(())
      }
      TaggedIo::Reader(_) => Ok(()),
    }
  }
}

/// Factory of the tagged format, constructed over a caller-supplied frozen
/// registry.
pub struct TaggedSerializerFactory {
  registry: Arc<TypeRegistry>,
  config: CodecConfig,
}

impl TaggedSerializerFactory {
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

impl SerializerFactory for TaggedSerializerFactory {
  fn format_id(&self) -> FormatId {
    FormatId::TAGGED
  }

  fn serialize<'a>(&self, sink: Sink<'a>) -> Result<CompositeCodec<'a>, CodecError> {
    let data = TaggedDataCodec::writer(sink, self.config.clone());
    Ok(CompositeCodec::new(
      FormatId::TAGGED,
      Box::new(data),
      Box::new(RegistryObjectCodec::new(self.registry.clone(), self.config.clone())),
      Some(self.registry.clone()),
    ))
  }

  fn deserialize<'a>(&self, source: Source<'a>) -> Result<CompositeCodec<'a>, CodecError> {
    let data = TaggedDataCodec::reader(source, self.config.clone());
    Ok(CompositeCodec::new(
      FormatId::TAGGED,
      Box::new(data),
      Box::new(RegistryObjectCodec::new(self.registry.clone(), self.config.clone())),
      Some(self.registry.clone()),
    ))
  }

  fn support_serialize(&self, _kind: IoKind) -> bool {
    true
  }

  fn support_deserialize(&self, _kind: IoKind) -> bool {
    true
  }

  fn registered_types(&self) -> Result<Vec<&'static str>, CodecError> {
    Ok(self.registry.type_names())
  }

  fn requires_external_registry(&self) -> bool {
    true
  }
}

#[cfg(test)]
mod tests;
