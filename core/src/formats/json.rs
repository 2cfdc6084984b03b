//! Open-typed JSON fallback format.
//!
//! Primitives accumulate into one top-level JSON array staged in memory until
//! `flush` writes it out; reads parse the whole array up front and replay it
//! value by value. Objects convert structurally without a registry, which
//! makes the typing open and lossy: integers normalize to `i64` (`u64` when
//! they do not fit), floats to `f64`, every sequence kind decodes as a list,
//! byte runs ride as number arrays and map keys must be strings. `NaN` and
//! infinities are not representable.

use std::io::{self, Write};

use serde_json::{Map, Value};

use crate::composite::CompositeCodec;
use crate::data::{mode_violation, DataCodec, Direction};
use crate::error::CodecError;
use crate::factory::{IoKind, SerializerFactory, Sink, Source};
use crate::id::FormatId;
use crate::object::ObjectCodec;
use crate::value::{AnyBag, AnyList, AnyMap, AnySet, AnyValue};

enum JsonIo<'a> {
  Writer {
    sink: &'a mut dyn io::Write,
    staged: Vec<Value>,
    flushed: bool,
  },
  Reader {
    values: std::vec::IntoIter<Value>,
  },
}

/// Primitive data codec of the JSON format.
///
/// Write-bound instances emit nothing until [`DataCodec::flush`]; the flush
/// is one-shot and later flushes are no-ops.
pub struct JsonDataCodec<'a> {
  io: JsonIo<'a>,
}

impl<'a> JsonDataCodec<'a> {
  /// Binds a write-mode codec to the sink.
  #[must_use]
  pub fn writer(sink: Sink<'a>) -> Self {
    Self {
      io: JsonIo::Writer {
        sink: sink.into_writer(),
        staged: Vec::new(),
        flushed: false,
      },
    }
  }

  /// Binds a read-mode codec to the source, parsing the payload eagerly.
  pub fn reader(source: Source<'a>) -> Result<Self, CodecError> {
    let parsed: Value = match source {
      Source::Buffer(buffer) => serde_json::from_slice(buffer).map_err(CodecError::corrupt)?,
      Source::Stream(reader) => serde_json::from_reader(reader).map_err(CodecError::corrupt)?,
    };
    let Value::Array(values) = parsed else {
      return Err(CodecError::corrupt("top-level json payload must be an array"));
    };
    Ok(Self {
      io: JsonIo::Reader {
        values: values.into_iter(),
      },
    })
  }

  fn push(&mut self, attempted: &'static str, value: Value) -> Result<(), CodecError> {
    match &mut self.io {
      JsonIo::Writer { staged, .. } => {
        staged.push(value);
        Ok(())
      }
      JsonIo::Reader { .. } => Err(mode_violation(Direction::Read, attempted)),
    }
  }

  fn next(&mut self, attempted: &'static str) -> Result<Value, CodecError> {
    match &mut self.io {
      JsonIo::Reader { values } => values
        .next()
        .ok_or_else(|| CodecError::corrupt("json value stream exhausted")),
      JsonIo::Writer { .. } => Err(mode_violation(Direction::Write, attempted)),
    }
  }

  fn next_i64(&mut self, attempted: &'static str) -> Result<i64, CodecError> {
    match self.next(attempted)? {
      Value::Number(number) => number
        .as_i64()
        .ok_or_else(|| CodecError::corrupt(format!("number {number} is not a signed integer"))),
      other => Err(CodecError::corrupt(format!("expected integer, found {other}"))),
    }
  }

  fn next_u64(&mut self, attempted: &'static str) -> Result<u64, CodecError> {
    match self.next(attempted)? {
      Value::Number(number) => number
        .as_u64()
        .ok_or_else(|| CodecError::corrupt(format!("number {number} is not an unsigned integer"))),
      other => Err(CodecError::corrupt(format!("expected integer, found {other}"))),
    }
  }
}

impl DataCodec for JsonDataCodec<'_> {
  fn direction(&self) -> Direction {
    match self.io {
      JsonIo::Writer { .. } => Direction::Write,
      JsonIo::Reader { .. } => Direction::Read,
    }
  }

  fn read_bool(&mut self) -> Result<bool, CodecError> {
    match self.next("read_bool")? {
      Value::Bool(value) => Ok(value),
      other => Err(CodecError::corrupt(format!("expected boolean, found {other}"))),
    }
  }

  fn read_i8(&mut self) -> Result<i8, CodecError> {
    i8::try_from(self.next_i64("read_i8")?).map_err(CodecError::corrupt)
  }

  fn read_u8(&mut self) -> Result<u8, CodecError> {
    u8::try_from(self.next_u64("read_u8")?).map_err(CodecError::corrupt)
  }

  fn read_i16(&mut self) -> Result<i16, CodecError> {
    i16::try_from(self.next_i64("read_i16")?).map_err(CodecError::corrupt)
  }

  fn read_u16(&mut self) -> Result<u16, CodecError> {
    u16::try_from(self.next_u64("read_u16")?).map_err(CodecError::corrupt)
  }

  fn read_i32(&mut self) -> Result<i32, CodecError> {
    i32::try_from(self.next_i64("read_i32")?).map_err(CodecError::corrupt)
  }

  fn read_u32(&mut self) -> Result<u32, CodecError> {
    u32::try_from(self.next_u64("read_u32")?).map_err(CodecError::corrupt)
  }

  fn read_i64(&mut self) -> Result<i64, CodecError> {
    self.next_i64("read_i64")
  }

  fn read_u64(&mut self) -> Result<u64, CodecError> {
    self.next_u64("read_u64")
  }

  fn read_f32(&mut self) -> Result<f32, CodecError> {
    Ok(self.read_f64()? as f32)
  }

  fn read_f64(&mut self) -> Result<f64, CodecError> {
    match self.next("read_f64")? {
      Value::Number(number) => number
        .as_f64()
        .ok_or_else(|| CodecError::corrupt(format!("number {number} is not representable as f64"))),
      other => Err(CodecError::corrupt(format!("expected number, found {other}"))),
    }
  }

  fn read_char(&mut self) -> Result<char, CodecError> {
    match self.next("read_char")? {
      Value::String(text) => {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
          (Some(value), None) => Ok(value),
          _ => Err(CodecError::corrupt(format!("expected single code point, found {text:?}"))),
        }
      }
      other => Err(CodecError::corrupt(format!("expected string, found {other}"))),
    }
  }

  fn read_string(&mut self) -> Result<String, CodecError> {
    match self.next("read_string")? {
      Value::String(text) => Ok(text),
      other => Err(CodecError::corrupt(format!("expected string, found {other}"))),
    }
  }

  fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, CodecError> {
    let values = match self.next("read_bytes")? {
      Value::Array(values) => values,
      other => return Err(CodecError::corrupt(format!("expected byte array, found {other}"))),
    };
    if values.len() != len {
      return Err(CodecError::corrupt(format!(
        "byte array carries {} bytes, caller expected {len}",
        values.len()
      )));
    }
    values
      .into_iter()
      .map(|value| match value {
        Value::Number(number) => number
          .as_u64()
          .and_then(|wide| u8::try_from(wide).ok())
          .ok_or_else(|| CodecError::corrupt(format!("byte array entry {number} is not a byte"))),
        other => Err(CodecError::corrupt(format!("expected byte, found {other}"))),
      })
      .collect()
  }

  fn write_bool(&mut self, value: bool) -> Result<(), CodecError> {
    self.push("write_bool", Value::from(value))
  }

  fn write_i8(&mut self, value: i8) -> Result<(), CodecError> {
    self.push("write_i8", Value::from(value))
  }

  fn write_u8(&mut self, value: u8) -> Result<(), CodecError> {
    self.push("write_u8", Value::from(value))
  }

  fn write_i16(&mut self, value: i16) -> Result<(), CodecError> {
    self.push("write_i16", Value::from(value))
  }

  fn write_u16(&mut self, value: u16) -> Result<(), CodecError> {
    self.push("write_u16", Value::from(value))
  }

  fn write_i32(&mut self, value: i32) -> Result<(), CodecError> {
    self.push("write_i32", Value::from(value))
  }

  fn write_u32(&mut self, value: u32) -> Result<(), CodecError> {
    self.push("write_u32", Value::from(value))
  }

  fn write_i64(&mut self, value: i64) -> Result<(), CodecError> {
    self.push("write_i64", Value::from(value))
  }

  fn write_u64(&mut self, value: u64) -> Result<(), CodecError> {
    self.push("write_u64", Value::from(value))
  }

  fn write_f32(&mut self, value: f32) -> Result<(), CodecError> {
    self.write_f64(f64::from(value))
  }

  fn write_f64(&mut self, value: f64) -> Result<(), CodecError> {
    if !value.is_finite() {
      return Err(CodecError::corrupt(format!("{value} is not representable in json")));
    }
    self.push("write_f64", Value::from(value))
  }

  fn write_char(&mut self, value: char) -> Result<(), CodecError> {
    self.push("write_char", Value::String(value.to_string()))
  }

  fn write_string(&mut self, value: &str) -> Result<(), CodecError> {
    self.push("write_string", Value::String(value.to_owned()))
  }

  fn write_bytes(&mut self, value: &[u8]) -> Result<(), CodecError> {
    let bytes = value.iter().map(|byte| Value::from(*byte)).collect();
    self.push("write_bytes", Value::Array(bytes))
  }

  fn flush(&mut self) -> Result<(), CodecError> {
    match &mut self.io {
      JsonIo::Writer { sink, staged, flushed } => {
        if *flushed {
          return Ok(());
        }
        let payload = Value::Array(std::mem::take(staged));
        serde_json::to_writer(&mut *sink, &payload).map_err(CodecError::corrupt)?;
        *flushed = true;
        sink.flush()?;
        Ok(())
      }
      JsonIo::Reader { .. } => Ok(()),
    }
  }

  fn write_structured(&mut self, value: Value) -> Result<(), CodecError> {
    self.push("write_structured", value)
  }

  fn read_structured(&mut self) -> Result<Value, CodecError> {
    self.next("read_structured")
  }
}

/// Registry-less object codec of the open-typed JSON format: values convert
/// structurally between [`AnyValue`] and `serde_json::Value`.
pub struct OpenObjectCodec;

fn to_json(value: &AnyValue) -> Result<Value, CodecError> {
  if let Some(concrete) = value.downcast_ref::<bool>() {
    return Ok(Value::from(*concrete));
  }
  if let Some(concrete) = value.downcast_ref::<i8>() {
    return Ok(Value::from(*concrete));
  }
  if let Some(concrete) = value.downcast_ref::<u8>() {
    return Ok(Value::from(*concrete));
  }
  if let Some(concrete) = value.downcast_ref::<i16>() {
    return Ok(Value::from(*concrete));
  }
  if let Some(concrete) = value.downcast_ref::<u16>() {
    return Ok(Value::from(*concrete));
  }
  if let Some(concrete) = value.downcast_ref::<i32>() {
    return Ok(Value::from(*concrete));
  }
  if let Some(concrete) = value.downcast_ref::<u32>() {
    return Ok(Value::from(*concrete));
  }
  if let Some(concrete) = value.downcast_ref::<i64>() {
    return Ok(Value::from(*concrete));
  }
  if let Some(concrete) = value.downcast_ref::<u64>() {
    return Ok(Value::from(*concrete));
  }
  if let Some(concrete) = value.downcast_ref::<f32>() {
    return float_to_json(f64::from(*concrete));
  }
  if let Some(concrete) = value.downcast_ref::<f64>() {
    return float_to_json(*concrete);
  }
  if let Some(concrete) = value.downcast_ref::<char>() {
    return Ok(Value::String(concrete.to_string()));
  }
  if let Some(concrete) = value.downcast_ref::<String>() {
    return Ok(Value::String(concrete.clone()));
  }
  if let Some(concrete) = value.downcast_ref::<Vec<u8>>() {
    return Ok(Value::Array(concrete.iter().map(|byte| Value::from(*byte)).collect()));
  }
  if let Some(list) = value.downcast_ref::<AnyList>() {
    return sequence_to_json(&list.0);
  }
  if let Some(set) = value.downcast_ref::<AnySet>() {
    return sequence_to_json(&set.0);
  }
  if let Some(bag) = value.downcast_ref::<AnyBag>() {
    return sequence_to_json(&bag.0);
  }
  if let Some(map) = value.downcast_ref::<AnyMap>() {
    let mut object = Map::with_capacity(map.0.len());
    for (key, entry) in &map.0 {
      let key = key.downcast_ref::<String>().ok_or(CodecError::TypeMismatch {
        expected: std::any::type_name::<String>(),
        actual: key.type_name(),
      })?;
      object.insert(key.clone(), to_json(entry)?);
    }
    return Ok(Value::Object(object));
  }
  Err(CodecError::UnregisteredType {
    type_name: value.type_name(),
  })
}

fn float_to_json(value: f64) -> Result<Value, CodecError> {
  if !value.is_finite() {
    return Err(CodecError::corrupt(format!("{value} is not representable in json")));
  }
  Ok(Value::from(value))
}

fn sequence_to_json(elements: &[AnyValue]) -> Result<Value, CodecError> {
  let converted = elements.iter().map(to_json).collect::<Result<Vec<_>, _>>()?;
  Ok(Value::Array(converted))
}

fn from_json(value: Value) -> Result<AnyValue, CodecError> {
  match value {
    Value::Null => Err(CodecError::corrupt("null has no decodable type")),
    Value::Bool(value) => Ok(AnyValue::new(value)),
    Value::Number(number) => {
      if let Some(value) = number.as_i64() {
        Ok(AnyValue::new(value))
      } else if let Some(value) = number.as_u64() {
        Ok(AnyValue::new(value))
      } else {
        number
          .as_f64()
          .map(AnyValue::new)
          .ok_or_else(|| CodecError::corrupt(format!("number {number} is not representable")))
      }
    }
    Value::String(text) => Ok(AnyValue::new(text)),
    Value::Array(values) => {
      let elements = values.into_iter().map(from_json).collect::<Result<Vec<_>, _>>()?;
      Ok(AnyValue::new(AnyList(elements)))
    }
    Value::Object(map) => {
      let entries = map
        .into_iter()
        .map(|(key, entry)| Ok((AnyValue::new(key), from_json(entry)?)))
        .collect::<Result<Vec<_>, CodecError>>()?;
      Ok(AnyValue::new(AnyMap(entries)))
    }
  }
}

impl ObjectCodec for OpenObjectCodec {
  fn write_object(&self, data: &mut dyn DataCodec, value: &AnyValue) -> Result<(), CodecError> {
    data.write_structured(to_json(value)?)
  }

  fn read_object(&self, data: &mut dyn DataCodec) -> Result<AnyValue, CodecError> {
    from_json(data.read_structured()?)
  }
}

/// Factory of the JSON fallback. Uses no registry: every structurally
/// convertible value is fair game and [`SerializerFactory::registered_types`]
/// is unsupported.
pub struct JsonSerializerFactory;

impl JsonSerializerFactory {
  /// Creates the factory.
  #[must_use]
  pub fn new() -> Self {
    Self
  }
}

impl Default for JsonSerializerFactory {
  fn default() -> Self {
    Self::new()
  }
}

impl SerializerFactory for JsonSerializerFactory {
  fn format_id(&self) -> FormatId {
    FormatId::JSON
  }

  fn serialize<'a>(&self, sink: Sink<'a>) -> Result<CompositeCodec<'a>, CodecError> {
    Ok(CompositeCodec::new(
      FormatId::JSON,
      Box::new(JsonDataCodec::writer(sink)),
      Box::new(OpenObjectCodec),
      None,
    ))
  }

  fn deserialize<'a>(&self, source: Source<'a>) -> Result<CompositeCodec<'a>, CodecError> {
    Ok(CompositeCodec::new(
      FormatId::JSON,
      Box::new(JsonDataCodec::reader(source)?),
      Box::new(OpenObjectCodec),
      None,
    ))
  }

  fn support_serialize(&self, _kind: IoKind) -> bool {
    true
  }

  fn support_deserialize(&self, _kind: IoKind) -> bool {
    true
  }

  fn registered_types(&self) -> Result<Vec<&'static str>, CodecError> {
    Err(CodecError::UnsupportedOperation("registered_types"))
  }

  fn requires_external_registry(&self) -> bool {
    false
  }
}
