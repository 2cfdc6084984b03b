use rstest::rstest;

use super::*;
use crate::error::RegistryError;
use crate::id::WireId;
use crate::portable::{DecodeContext, EncodeContext, Portable, WireValue};
use crate::value::{AnyList, AnyValue};

fn writer_into(buf: &mut Vec<u8>) -> NativeDataCodec<'_> {
  NativeDataCodec::writer(Sink::Buffer(buf), CodecConfig::default())
}

fn reader_over(buf: &[u8]) -> NativeDataCodec<'_> {
  NativeDataCodec::reader(Source::Buffer(buf), CodecConfig::default())
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(-1)]
#[case(i32::MIN)]
#[case(i32::MAX)]
fn round_trips_i32(#[case] value: i32) {
  let mut buf = Vec::new();
  writer_into(&mut buf).write_i32(value).expect("write");
  assert_eq!(reader_over(&buf).read_i32().expect("read"), value);
}

#[rstest]
#[case(0)]
#[case(i64::MIN)]
#[case(i64::MAX)]
fn round_trips_i64(#[case] value: i64) {
  let mut buf = Vec::new();
  writer_into(&mut buf).write_i64(value).expect("write");
  assert_eq!(reader_over(&buf).read_i64().expect("read"), value);
}

#[rstest]
#[case(0)]
#[case(u64::MAX)]
fn round_trips_u64(#[case] value: u64) {
  let mut buf = Vec::new();
  writer_into(&mut buf).write_u64(value).expect("write");
  assert_eq!(reader_over(&buf).read_u64().expect("read"), value);
}

#[rstest]
#[case("")]
#[case("ascii")]
#[case("データ交換")]
fn round_trips_strings(#[case] value: &str) {
  let mut buf = Vec::new();
  writer_into(&mut buf).write_string(value).expect("write");
  assert_eq!(reader_over(&buf).read_string().expect("read"), value);
}

#[test]
fn round_trips_remaining_primitives() {
  let mut buf = Vec::new();
  {
    let mut writer = writer_into(&mut buf);
    writer.write_bool(true).expect("bool");
    writer.write_i8(i8::MIN).expect("i8");
    writer.write_u8(u8::MAX).expect("u8");
    writer.write_i16(i16::MIN).expect("i16");
    writer.write_u16(u16::MAX).expect("u16");
    writer.write_u32(u32::MAX).expect("u32");
    writer.write_f32(std::f32::consts::PI).expect("f32");
    writer.write_f64(-std::f64::consts::E).expect("f64");
    writer.write_char('界').expect("char");
    writer.write_bytes(&[1, 2, 3]).expect("bytes");
    writer.flush().expect("flush");
  }
  let mut reader = reader_over(&buf);
  assert!(reader.read_bool().expect("bool"));
  assert_eq!(reader.read_i8().expect("i8"), i8::MIN);
  assert_eq!(reader.read_u8().expect("u8"), u8::MAX);
  assert_eq!(reader.read_i16().expect("i16"), i16::MIN);
  assert_eq!(reader.read_u16().expect("u16"), u16::MAX);
  assert_eq!(reader.read_u32().expect("u32"), u32::MAX);
  assert_eq!(reader.read_f32().expect("f32"), std::f32::consts::PI);
  assert_eq!(reader.read_f64().expect("f64"), -std::f64::consts::E);
  assert_eq!(reader.read_char().expect("char"), '界');
  assert_eq!(reader.read_bytes(3).expect("bytes"), vec![1, 2, 3]);
}

#[test]
fn round_trips_empty_byte_run() {
  let mut buf = Vec::new();
  writer_into(&mut buf).write_bytes(&[]).expect("write");
  assert_eq!(reader_over(&buf).read_bytes(0).expect("read"), Vec::<u8>::new());
}

#[test]
fn rejects_reads_on_a_write_bound_codec() {
  let mut buf = Vec::new();
  let mut writer = writer_into(&mut buf);
  let err = writer.read_i32().expect_err("mode");
  assert!(matches!(
    err,
    CodecError::ModeViolation {
      direction: Direction::Write,
      attempted: "read_i32",
    }
  ));
}

#[test]
fn rejects_writes_on_a_read_bound_codec() {
  let buf = [0u8; 4];
  let mut reader = reader_over(&buf);
  let err = reader.write_i32(7).expect_err("mode");
  assert!(matches!(
    err,
    CodecError::ModeViolation {
      direction: Direction::Read,
      attempted: "write_i32",
    }
  ));
}

#[test]
fn flush_is_idempotent_and_a_noop_in_read_mode() {
  let mut buf = Vec::new();
  let mut writer = writer_into(&mut buf);
  writer.write_bool(true).expect("write");
  writer.flush().expect("first flush");
  writer.flush().expect("second flush");
  drop(writer);

  let mut reader = reader_over(&buf);
  reader.flush().expect("read-mode flush");
}

#[test]
fn rejects_invalid_boolean_bytes() {
  let err = reader_over(&[2]).read_bool().expect_err("corrupt");
  assert!(matches!(err, CodecError::CorruptFrame(_)));
}

#[test]
fn rejects_hostile_string_length_prefixes() {
  let buf = u32::MAX.to_be_bytes();
  let err = reader_over(&buf).read_string().expect_err("ceiling");
  assert!(matches!(err, CodecError::LengthOverflow { .. }));
}

#[test]
fn truncated_input_surfaces_as_io_error() {
  let buf = [0u8; 2];
  let err = reader_over(&buf).read_i32().expect_err("truncated");
  assert!(matches!(err, CodecError::Io(_)));
}

#[derive(Debug, PartialEq)]
struct Sample {
  value: i32,
}

impl WireValue for Sample {
  fn encode(&self, ctx: &mut EncodeContext<'_>) -> Result<(), CodecError> {
    ctx.write_i32(self.value)
  }

  fn decode(ctx: &mut DecodeContext<'_>) -> Result<Self, CodecError> {
    Ok(Self {
      value: ctx.read_i32()?,
    })
  }
}

impl Portable for Sample {
  const WIRE_ID: WireId = WireId::new(2301);
}

#[test]
fn serialize_fails_before_initialization() {
  let factory = NativeSerializerFactory::new();
  let mut out = Vec::new();
  let err = factory.serialize(Sink::Buffer(&mut out)).err().expect("uninitialized");
  assert!(matches!(err, CodecError::NotInitialized(id) if id == FormatId::NATIVE));
  let err = factory.registered_types().expect_err("uninitialized");
  assert!(matches!(err, CodecError::NotInitialized(_)));
}

#[test]
fn initialization_is_idempotent() {
  let factory = NativeSerializerFactory::new();
  let mut registration_runs = 0u32;
  factory
    .initialize(|builder| {
      registration_runs += 1;
      builder.register::<Sample>()
    })
    .expect("first initialize");
  factory
    .initialize(|builder| {
      registration_runs += 1;
      builder.register::<Sample>()
    })
    .expect("second initialize");
  assert_eq!(registration_runs, 1, "registration work must run exactly once");
  assert!(factory
    .registered_types()
    .expect("types")
    .contains(&std::any::type_name::<Sample>()));
}

#[test]
fn initialization_failures_propagate() {
  let factory = NativeSerializerFactory::new();
  let err = factory
    .initialize(|builder| builder.register_with_id::<Sample>(0u32))
    .expect_err("sentinel id");
  assert_eq!(err, RegistryError::NoneId);
  // A failed attempt publishes nothing; a later initialize may still succeed.
  factory.initialize(|builder| builder.register::<Sample>()).expect("retry");
}

#[test]
fn factory_round_trips_objects() {
  let factory = NativeSerializerFactory::new();
  factory.initialize(|builder| builder.register::<Sample>()).expect("initialize");

  let mut out = Vec::new();
  let mut writer = factory.serialize(Sink::Buffer(&mut out)).expect("serialize");
  writer.write_object(&AnyValue::new(Sample { value: -3 })).expect("object");
  writer
    .write_object(&AnyValue::new(AnyList(vec![AnyValue::new(1i64), AnyValue::new(2i64)])))
    .expect("list");
  writer.flush().expect("flush");
  drop(writer);

  let mut reader = factory.deserialize(Source::Buffer(&out)).expect("deserialize");
  assert_eq!(reader.read_object_as::<Sample>().expect("object"), Sample { value: -3 });
  let list = reader.read_object_as::<AnyList>().expect("list");
  let elements: Vec<i64> = list.0.iter().map(|value| *value.downcast_ref::<i64>().expect("i64")).collect();
  assert_eq!(elements, vec![1, 2]);
}

#[test]
fn capability_metadata() {
  let factory = NativeSerializerFactory::new();
  assert_eq!(factory.format_id(), FormatId::NATIVE);
  assert!(!factory.requires_external_registry());
  assert!(factory.support_serialize(IoKind::Buffer));
  assert!(factory.support_serialize(IoKind::Stream));
  assert!(factory.support_deserialize(IoKind::Buffer));
  assert!(factory.support_deserialize(IoKind::Stream));
}

#[test]
fn streams_are_first_class_handles() {
  let factory = NativeSerializerFactory::new();
  factory.initialize(|_| Ok(())).expect("initialize");

  let mut out = Vec::new();
  {
    let mut sink: &mut dyn std::io::Write = &mut out;
    let mut writer = factory.serialize(Sink::Stream(&mut *sink)).expect("serialize");
    writer.write_string("over a stream").expect("write");
    writer.flush().expect("flush");
  }
  let mut cursor = std::io::Cursor::new(out);
  let mut reader = factory
    .deserialize(Source::Stream(&mut cursor))
    .expect("deserialize");
  assert_eq!(reader.read_string().expect("read"), "over a stream");
}
