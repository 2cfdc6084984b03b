use std::sync::Arc;

use super::*;
use crate::error::RegistryError;
use crate::factory::{SerializerFactory, Sink, Source};
use crate::formats::tagged::TaggedSerializerFactory;
use crate::portable::{DecodeContext, EncodeContext, Portable, WireValue};
use crate::registry::TypeRegistryBuilder;

#[derive(Debug, PartialEq)]
struct Envelope {
  label: String,
  body: i32,
}

// Writes its body polymorphically to exercise recursive object encoding.
impl WireValue for Envelope {
  fn encode(&self, ctx: &mut EncodeContext<'_>) -> Result<(), CodecError> {
    ctx.write_string(&self.label)?;
    ctx.write_object(&AnyValue::new(self.body))
  }

  fn decode(ctx: &mut DecodeContext<'_>) -> Result<Self, CodecError> {
    let label = ctx.read_string()?;
    let body = ctx.read_object_as::<i32>()?;
    Ok(Self { label, body })
  }
}

impl Portable for Envelope {
  const WIRE_ID: WireId = WireId::new(2101);
}

#[derive(Debug, PartialEq)]
struct Unregistered;

fn test_registry() -> Arc<TypeRegistry> {
  let mut builder = TypeRegistryBuilder::standard();
  builder.register::<Envelope>().expect("register envelope");
  Arc::new(builder.build())
}

fn factory() -> TaggedSerializerFactory {
  TaggedSerializerFactory::new(test_registry())
}

fn encode(factory: &TaggedSerializerFactory, value: &AnyValue) -> Vec<u8> {
  let mut out = Vec::new();
  let mut codec = factory.serialize(Sink::Buffer(&mut out)).expect("serialize");
  codec.write_object(value).expect("write");
  codec.flush().expect("flush");
  drop(codec);
  out
}

fn round_trip(value: &AnyValue) -> AnyValue {
  let factory = factory();
  let bytes = encode(&factory, value);
  let mut codec = factory.deserialize(Source::Buffer(&bytes)).expect("deserialize");
  codec.read_object().expect("read")
}

fn ints(values: &[i32]) -> Vec<AnyValue> {
  values.iter().map(|value| AnyValue::new(*value)).collect()
}

#[test]
fn list_round_trip_preserves_kind_and_elements() {
  let decoded = round_trip(&AnyValue::new(AnyList(ints(&[1, 2, 3]))));
  let list = decoded.downcast_ref::<AnyList>().expect("list kind");
  let elements: Vec<i32> = list.0.iter().map(|value| *value.downcast_ref::<i32>().expect("i32")).collect();
  assert_eq!(elements, vec![1, 2, 3]);
}

#[test]
fn set_round_trip_preserves_kind() {
  let decoded = round_trip(&AnyValue::new(AnySet(ints(&[7, 11]))));
  assert!(decoded.is::<AnySet>());
  assert!(!decoded.is::<AnyList>());
}

#[test]
fn generic_collection_round_trip_preserves_kind() {
  let decoded = round_trip(&AnyValue::new(AnyBag(ints(&[5]))));
  assert!(decoded.is::<AnyBag>());
}

#[test]
fn map_round_trip_preserves_entries() {
  let entries = vec![
    (AnyValue::new(String::from("a")), AnyValue::new(1i32)),
    (AnyValue::new(String::from("b")), AnyValue::new(2i32)),
  ];
  let decoded = round_trip(&AnyValue::new(AnyMap(entries)));
  let map = decoded.downcast_ref::<AnyMap>().expect("map kind");
  let entries: Vec<(&str, i32)> = map
    .0
    .iter()
    .map(|(key, value)| {
      (
        key.downcast_ref::<String>().expect("string key").as_str(),
        *value.downcast_ref::<i32>().expect("i32 value"),
      )
    })
    .collect();
  assert_eq!(entries, vec![("a", 1), ("b", 2)]);
}

#[test]
fn empty_containers_round_trip() {
  let decoded = round_trip(&AnyValue::new(AnyList(Vec::new())));
  assert!(decoded.downcast_ref::<AnyList>().expect("list").0.is_empty());

  let decoded = round_trip(&AnyValue::new(AnyMap(Vec::new())));
  assert!(decoded.downcast_ref::<AnyMap>().expect("map").0.is_empty());
}

#[test]
fn heterogeneous_container_is_rejected_before_any_byte() {
  let factory = factory();
  let mut out = Vec::new();
  let mut codec = factory.serialize(Sink::Buffer(&mut out)).expect("serialize");
  let mixed = AnyValue::new(AnyList(vec![AnyValue::new(1i32), AnyValue::new(String::from("a"))]));
  let err = codec.write_object(&mixed).expect_err("heterogeneous");
  assert!(matches!(
    err,
    CodecError::HeterogeneousContainer {
      first: "i32",
      index: 1,
      found: "alloc::string::String",
    }
  ));
  codec.flush().expect("flush");
  drop(codec);
  assert!(out.is_empty(), "failed encode must not leave a dangling header");
}

#[test]
fn heterogeneous_map_values_are_rejected() {
  let factory = factory();
  let mut out = Vec::new();
  let mut codec = factory.serialize(Sink::Buffer(&mut out)).expect("serialize");
  let entries = vec![
    (AnyValue::new(String::from("a")), AnyValue::new(1i32)),
    (AnyValue::new(String::from("b")), AnyValue::new(true)),
  ];
  let err = codec.write_object(&AnyValue::new(AnyMap(entries))).expect_err("mixed values");
  assert!(matches!(err, CodecError::HeterogeneousContainer { index: 1, .. }));
}

#[test]
fn unregistered_type_fails_encode() {
  let factory = factory();
  let mut out = Vec::new();
  let mut codec = factory.serialize(Sink::Buffer(&mut out)).expect("serialize");
  let err = codec.write_object(&AnyValue::new(Unregistered)).expect_err("unregistered");
  assert!(matches!(err, CodecError::UnregisteredType { .. }));
  drop(codec);
  assert!(out.is_empty());
}

#[test]
fn unregistered_element_type_fails_encode() {
  let factory = factory();
  let mut out = Vec::new();
  let mut codec = factory.serialize(Sink::Buffer(&mut out)).expect("serialize");
  let list = AnyValue::new(AnyList(vec![AnyValue::new(Unregistered)]));
  let err = codec.write_object(&list).expect_err("unregistered element");
  assert!(matches!(err, CodecError::UnregisteredType { .. }));
  drop(codec);
  assert!(out.is_empty());
}

#[test]
fn unregistered_id_fails_decode() {
  let factory = factory();
  let bytes = encode(&factory, &AnyValue::new(Envelope {
    label: String::from("greeting"),
    body: 42,
  }));

  let narrow = TaggedSerializerFactory::new(Arc::new(TypeRegistryBuilder::standard().build()));
  let mut codec = narrow.deserialize(Source::Buffer(&bytes)).expect("deserialize");
  let err = codec.read_object().expect_err("unknown id");
  assert!(matches!(err, CodecError::UnregisteredId(id) if id == Envelope::WIRE_ID));
}

#[test]
fn nested_objects_round_trip() {
  let envelope = Envelope {
    label: String::from("greeting"),
    body: 42,
  };
  let decoded = round_trip(&AnyValue::new(envelope));
  assert_eq!(
    decoded.downcast_ref::<Envelope>(),
    Some(&Envelope {
      label: String::from("greeting"),
      body: 42,
    })
  );
}

#[test]
fn read_object_as_rejects_wrong_type() {
  let factory = factory();
  let bytes = encode(&factory, &AnyValue::new(7i32));
  let mut codec = factory.deserialize(Source::Buffer(&bytes)).expect("deserialize");
  let err = codec.read_object_as::<String>().expect_err("mismatch");
  assert!(matches!(
    err,
    CodecError::TypeMismatch {
      expected: "alloc::string::String",
      actual: "i32",
    }
  ));
}

#[test]
fn container_ceiling_applies_on_decode() {
  let config = crate::config::CodecConfig::from([crate::config::ConfigOption::with_max_container_len(2)]);
  let registry = test_registry();
  let loose = TaggedSerializerFactory::new(registry.clone());
  let strict = TaggedSerializerFactory::with_config(registry, config);

  let bytes = encode(&loose, &AnyValue::new(AnyList(ints(&[1, 2, 3]))));
  let mut codec = strict.deserialize(Source::Buffer(&bytes)).expect("deserialize");
  let err = codec.read_object().expect_err("over ceiling");
  assert!(matches!(err, CodecError::LengthOverflow { len: 3, max: 2 }));
}

#[test]
fn registry_error_converts_for_factory_initialization() {
  let err = CodecError::from(RegistryError::NoneId);
  assert!(matches!(err, CodecError::Registry(RegistryError::NoneId)));
}
