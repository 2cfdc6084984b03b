use std::sync::Arc;

use rstest::rstest;

use super::*;
use crate::registry::TypeRegistryBuilder;
use crate::value::AnyValue;

fn writer_into(buf: &mut Vec<u8>) -> TaggedDataCodec<'_> {
  TaggedDataCodec::writer(Sink::Buffer(buf), CodecConfig::default())
}

fn reader_over(buf: &[u8]) -> TaggedDataCodec<'_> {
  TaggedDataCodec::reader(Source::Buffer(buf), CodecConfig::default())
}

#[rstest]
#[case(0)]
#[case(-1)]
#[case(i64::MIN)]
#[case(i64::MAX)]
fn round_trips_i64(#[case] value: i64) {
  let mut buf = Vec::new();
  writer_into(&mut buf).write_i64(value).expect("write");
  assert_eq!(reader_over(&buf).read_i64().expect("read"), value);
}

#[test]
fn round_trips_every_primitive() {
  let mut buf = Vec::new();
  {
    let mut writer = writer_into(&mut buf);
    writer.write_bool(false).expect("bool");
    writer.write_i8(-8).expect("i8");
    writer.write_u8(8).expect("u8");
    writer.write_i16(-16).expect("i16");
    writer.write_u16(16).expect("u16");
    writer.write_i32(-32).expect("i32");
    writer.write_u32(32).expect("u32");
    writer.write_u64(u64::MAX).expect("u64");
    writer.write_f32(1.5).expect("f32");
    writer.write_f64(-2.25).expect("f64");
    writer.write_char('λ').expect("char");
    writer.write_string("").expect("empty string");
    writer.write_string("tagged").expect("string");
    writer.write_bytes(&[9, 9, 9]).expect("bytes");
    writer.flush().expect("flush");
  }
  let mut reader = reader_over(&buf);
  assert!(!reader.read_bool().expect("bool"));
  assert_eq!(reader.read_i8().expect("i8"), -8);
  assert_eq!(reader.read_u8().expect("u8"), 8);
  assert_eq!(reader.read_i16().expect("i16"), -16);
  assert_eq!(reader.read_u16().expect("u16"), 16);
  assert_eq!(reader.read_i32().expect("i32"), -32);
  assert_eq!(reader.read_u32().expect("u32"), 32);
  assert_eq!(reader.read_u64().expect("u64"), u64::MAX);
  assert_eq!(reader.read_f32().expect("f32"), 1.5);
  assert_eq!(reader.read_f64().expect("f64"), -2.25);
  assert_eq!(reader.read_char().expect("char"), 'λ');
  assert_eq!(reader.read_string().expect("empty string"), "");
  assert_eq!(reader.read_string().expect("string"), "tagged");
  assert_eq!(reader.read_bytes(3).expect("bytes"), vec![9, 9, 9]);
}

#[test]
fn opcode_mismatch_is_detected() {
  let mut buf = Vec::new();
  writer_into(&mut buf).write_i32(7).expect("write");
  let err = reader_over(&buf).read_i64().expect_err("mismatch");
  match err {
    CodecError::CorruptFrame(message) => {
      assert!(message.contains("expected i64 opcode"), "unexpected message: {message}");
    }
    other => panic!("expected corrupt frame, got {other:?}"),
  }
}

#[test]
fn mode_violations_in_both_directions() {
  let mut buf = Vec::new();
  let err = writer_into(&mut buf).read_bool().expect_err("read on writer");
  assert!(matches!(
    err,
    CodecError::ModeViolation {
      direction: Direction::Write,
      ..
    }
  ));

  let err = reader_over(&[OP_BOOL, 1]).write_bool(true).expect_err("write on reader");
  assert!(matches!(
    err,
    CodecError::ModeViolation {
      direction: Direction::Read,
      ..
    }
  ));
}

#[test]
fn factory_metadata_reflects_the_external_registry() {
  let registry = Arc::new(TypeRegistryBuilder::standard().build());
  let factory = TaggedSerializerFactory::new(registry);
  assert_eq!(factory.format_id(), FormatId::TAGGED);
  assert!(factory.requires_external_registry());
  assert!(factory.support_serialize(IoKind::Stream));
  assert!(factory.support_deserialize(IoKind::Stream));
  let names = factory.registered_types().expect("registry-backed");
  assert!(names.contains(&"i32"));
  assert!(names.contains(&"alloc::string::String"));
}

#[test]
fn factory_round_trips_primitives_and_objects() {
  let registry = Arc::new(TypeRegistryBuilder::standard().build());
  let factory = TaggedSerializerFactory::new(registry);

  let mut out = Vec::new();
  let mut writer = factory.serialize(Sink::Buffer(&mut out)).expect("serialize");
  writer.write_u16(512).expect("primitive");
  writer.write_object(&AnyValue::new(String::from("payload"))).expect("object");
  writer.flush().expect("flush");
  drop(writer);

  let mut reader = factory.deserialize(Source::Buffer(&out)).expect("deserialize");
  assert_eq!(reader.read_u16().expect("primitive"), 512);
  assert_eq!(reader.read_object_as::<String>().expect("object"), "payload");
}
