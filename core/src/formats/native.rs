//! Native wire format: fixed-width big-endian primitives with registry-tagged
//! object graphs.
//!
//! Layout per value: booleans are one byte (`0`/`1`), integers and floats are
//! their width in big-endian byte order, code points are the `u32` scalar
//! value, strings are a `u32` byte length followed by UTF-8, raw byte runs
//! are written as-is. There is no per-value framing; reads must mirror writes
//! exactly.

use std::io::{self, Read, Write};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::composite::CompositeCodec;
use crate::config::CodecConfig;
use crate::data::{check_length, mode_violation, DataCodec, Direction};
use crate::error::{CodecError, RegistryError};
use crate::factory::{ByteSource, IoKind, SerializerFactory, Sink, Source};
use crate::id::FormatId;
use crate::object::RegistryObjectCodec;
use crate::registry::{TypeRegistry, TypeRegistryBuilder};

enum NativeIo<'a> {
  Writer(&'a mut dyn io::Write),
  Reader(ByteSource<'a>),
}

/// Primitive data codec of the native format, bound to one handle and one
/// direction for its entire lifetime.
pub struct NativeDataCodec<'a> {
  io: NativeIo<'a>,
  config: CodecConfig,
}

impl<'a> NativeDataCodec<'a> {
  /// Binds a write-mode codec to the sink.
  #[must_use]
  pub fn writer(sink: Sink<'a>, config: CodecConfig) -> Self {
    Self {
      io: NativeIo::Writer(sink.into_writer()),
      config,
    }
  }

  /// Binds a read-mode codec to the source.
  #[must_use]
  pub fn reader(source: Source<'a>, config: CodecConfig) -> Self {
    Self {
      io: NativeIo::Reader(source.into_reader()),
      config,
    }
  }

  fn put(&mut self, attempted: &'static str, bytes: &[u8]) -> Result<(), CodecError> {
    match &mut self.io {
      NativeIo::Writer(writer) => {
        writer.write_all(bytes)?;
        Ok(())
      }
      NativeIo::Reader(_) => Err(mode_violation(Direction::Read, attempted)),
    }
  }

  fn take<const N: usize>(&mut self, attempted: &'static str) -> Result<[u8; N], CodecError> {
    match &mut self.io {
      NativeIo::Reader(reader) => {
        let mut buf = [0u8; N];
        reader.read_exact(&mut buf)?;
        Ok(buf)
      }
      NativeIo::Writer(_) => Err(mode_violation(Direction::Write, attempted)),
    }
  }

  fn take_vec(&mut self, attempted: &'static str, len: usize) -> Result<Vec<u8>, CodecError> {
    let len = check_length(len as u64, self.config.max_length_prefix())?;
    match &mut self.io {
      NativeIo::Reader(reader) => {
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf)?;
        Ok(buf)
      }
      NativeIo::Writer(_) => Err(mode_violation(Direction::Write, attempted)),
    }
  }
}

impl DataCodec for NativeDataCodec<'_> {
  fn direction(&self) -> Direction {
    match self.io {
      NativeIo::Writer(_) => Direction::Write,
      NativeIo::Reader(_) => Direction::Read,
    }
  }

  fn read_bool(&mut self) -> Result<bool, CodecError> {
    match self.take::<1>("read_bool")?[0] {
      0 => Ok(false),
      1 => Ok(true),
      other => Err(CodecError::corrupt(format!("invalid boolean byte {other:#04x}"))),
    }
  }

  fn read_i8(&mut self) -> Result<i8, CodecError> {
    Ok(i8::from_be_bytes(self.take::<1>("read_i8")?))
  }

  fn read_u8(&mut self) -> Result<u8, CodecError> {
    Ok(u8::from_be_bytes(self.take::<1>("read_u8")?))
  }

  fn read_i16(&mut self) -> Result<i16, CodecError> {
    Ok(i16::from_be_bytes(self.take::<2>("read_i16")?))
  }

  fn read_u16(&mut self) -> Result<u16, CodecError> {
    Ok(u16::from_be_bytes(self.take::<2>("read_u16")?))
  }

  fn read_i32(&mut self) -> Result<i32, CodecError> {
    Ok(i32::from_be_bytes(self.take::<4>("read_i32")?))
  }

  fn read_u32(&mut self) -> Result<u32, CodecError> {
    Ok(u32::from_be_bytes(self.take::<4>("read_u32")?))
  }

  fn read_i64(&mut self) -> Result<i64, CodecError> {
    Ok(i64::from_be_bytes(self.take::<8>("read_i64")?))
  }

  fn read_u64(&mut self) -> Result<u64, CodecError> {
    Ok(u64::from_be_bytes(self.take::<8>("read_u64")?))
  }

  fn read_f32(&mut self) -> Result<f32, CodecError> {
    Ok(f32::from_be_bytes(self.take::<4>("read_f32")?))
  }

  fn read_f64(&mut self) -> Result<f64, CodecError> {
    Ok(f64::from_be_bytes(self.take::<8>("read_f64")?))
  }

  fn read_char(&mut self) -> Result<char, CodecError> {
    let scalar = u32::from_be_bytes(self.take::<4>("read_char")?);
    char::from_u32(scalar).ok_or_else(|| CodecError::corrupt(format!("invalid code point {scalar:#x}")))
  }

  fn read_string(&mut self) -> Result<String, CodecError> {
    let len = u32::from_be_bytes(self.take::<4>("read_string")?);
    let bytes = self.take_vec("read_string", len as usize)?;
    String::from_utf8(bytes).map_err(CodecError::corrupt)
  }

  fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, CodecError> {
    self.take_vec("read_bytes", len)
  }

  fn write_bool(&mut self, value: bool) -> Result<(), CodecError> {
    self.put("write_bool", &[u8::from(value)])
  }

  fn write_i8(&mut self, value: i8) -> Result<(), CodecError> {
    self.put("write_i8", &value.to_be_bytes())
  }

  fn write_u8(&mut self, value: u8) -> Result<(), CodecError> {
    self.put("write_u8", &value.to_be_bytes())
  }

  fn write_i16(&mut self, value: i16) -> Result<(), CodecError> {
    self.put("write_i16", &value.to_be_bytes())
  }

  fn write_u16(&mut self, value: u16) -> Result<(), CodecError> {
    self.put("write_u16", &value.to_be_bytes())
  }

  fn write_i32(&mut self, value: i32) -> Result<(), CodecError> {
    self.put("write_i32", &value.to_be_bytes())
  }

  fn write_u32(&mut self, value: u32) -> Result<(), CodecError> {
    self.put("write_u32", &value.to_be_bytes())
  }

  fn write_i64(&mut self, value: i64) -> Result<(), CodecError> {
    self.put("write_i64", &value.to_be_bytes())
  }

  fn write_u64(&mut self, value: u64) -> Result<(), CodecError> {
    self.put("write_u64", &value.to_be_bytes())
  }

  fn write_f32(&mut self, value: f32) -> Result<(), CodecError> {
    self.put("write_f32", &value.to_be_bytes())
  }

  fn write_f64(&mut self, value: f64) -> Result<(), CodecError> {
    self.put("write_f64", &value.to_be_bytes())
  }

  fn write_char(&mut self, value: char) -> Result<(), CodecError> {
    self.put("write_char", &u32::from(value).to_be_bytes())
  }

  fn write_string(&mut self, value: &str) -> Result<(), CodecError> {
    let len = u32::try_from(value.len()).map_err(|_| CodecError::LengthOverflow {
      len: value.len() as u64,
      max: u64::from(u32::MAX),
    })?;
    self.put("write_string", &len.to_be_bytes())?;
    self.put("write_string", value.as_bytes())
  }

  fn write_bytes(&mut self, value: &[u8]) -> Result<(), CodecError> {
    self.put("write_bytes", value)
  }

  fn flush(&mut self) -> Result<(), CodecError> {
    match &mut self.io {
      NativeIo::Writer(writer) => {
        writer.flush()?;
        Ok(())
      }
      NativeIo::Reader(_) => Ok(()),
    }
  }
}

/// Factory of the native format.
///
/// Owns its registry and requires a one-time [`initialize`] call that seeds
/// the standard registrations, applies the caller's and publishes the frozen
/// registry through a compare-and-set guard. Initialization is idempotent:
/// only the first call performs registration work.
///
/// [`initialize`]: NativeSerializerFactory::initialize
pub struct NativeSerializerFactory {
  registry: OnceCell<Arc<TypeRegistry>>,
  config: CodecConfig,
}

impl NativeSerializerFactory {
  /// Creates an uninitialized factory with default configuration.
  #[must_use]
  pub fn new() -> Self {
    Self::with_config(CodecConfig::default())
  }

  /// Creates an uninitialized factory with the given configuration.
  #[must_use]
  pub fn with_config(config: CodecConfig) -> Self {
    Self {
      registry: OnceCell::new(),
      config,
    }
  }

  /// Populates and publishes the registry. The first call runs `register`
  /// over a builder pre-seeded with the standard types; later calls are
  /// no-ops regardless of the closure passed.
  pub fn initialize<F>(&self, register: F) -> Result<(), RegistryError>
  where
    F: FnOnce(&mut TypeRegistryBuilder) -> Result<(), RegistryError>, {
    if self.registry.get().is_some() {
      tracing::debug!("native serializer factory already initialized");
      return Ok(());
    }
    let mut builder = TypeRegistryBuilder::standard();
    register(&mut builder)?;
    let registry = Arc::new(builder.build());
    tracing::debug!(registrations = registry.len(), "publishing native registry");
    if self.registry.set(registry).is_err() {
      tracing::debug!("lost the initialization race, keeping the first registry");
    }
    Ok(())
  }

  fn registry(&self) -> Result<&Arc<TypeRegistry>, CodecError> {
    self.registry.get().ok_or(CodecError::NotInitialized(FormatId::NATIVE))
  }
}

impl Default for NativeSerializerFactory {
  fn default() -> Self {
    Self::new()
  }
}

impl SerializerFactory for NativeSerializerFactory {
  fn format_id(&self) -> FormatId {
    FormatId::NATIVE
  }

  fn serialize<'a>(&self, sink: Sink<'a>) -> Result<CompositeCodec<'a>, CodecError> {
    let registry = self.registry()?.clone();
    let data = NativeDataCodec::writer(sink, self.config.clone());
    Ok(CompositeCodec::new(
      FormatId::NATIVE,
      Box::new(data),
      Box::new(RegistryObjectCodec::new(registry.clone(), self.config.clone())),
      Some(registry),
    ))
  }

  fn deserialize<'a>(&self, source: Source<'a>) -> Result<CompositeCodec<'a>, CodecError> {
    let registry = self.registry()?.clone();
    let data = NativeDataCodec::reader(source, self.config.clone());
    Ok(CompositeCodec::new(
      FormatId::NATIVE,
      Box::new(data),
      Box::new(RegistryObjectCodec::new(registry.clone(), self.config.clone())),
      Some(registry),
    ))
  }

  fn support_serialize(&self, _kind: IoKind) -> bool {
    true
  }

  fn support_deserialize(&self, _kind: IoKind) -> bool {
    true
  }

  fn registered_types(&self) -> Result<Vec<&'static str>, CodecError> {
    Ok(self.registry()?.type_names())
  }

  fn requires_external_registry(&self) -> bool {
    false
  }
}

#[cfg(test)]
mod tests;
