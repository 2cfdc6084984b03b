use std::sync::Arc;

use crate::{
  AnyList, AnyMap, AnyValue, CodecError, ContainerKind, DecodeContext, Direction, EncodeContext, FormatId,
  FramedSerializerFactory, NativeSerializerFactory, Portable, SerializerFactory, Sink, Source,
  TaggedSerializerFactory, TypeRegistry, TypeRegistryBuilder, WireId, WireValue,
};
use crate::scope;

fn init_tracing() {
  let _ = tracing_subscriber::fmt().with_env_filter("tagwire_core_rs=debug").try_init();
}

/// The canonical explicit-registration scenario: a fresh registry carrying
/// nothing but Integer=101, String=102, List=103 and Map=104.
fn explicit_registry() -> Arc<TypeRegistry> {
  let mut builder = TypeRegistryBuilder::new();
  builder.register_with_id::<i32>(101u32).expect("integer");
  builder.register_with_id::<String>(102u32).expect("string");
  builder.register_kind(ContainerKind::List, 103u32).expect("list kind");
  builder.register_kind(ContainerKind::Map, 104u32).expect("map kind");
  Arc::new(builder.build())
}

fn binary_factories(registry: &Arc<TypeRegistry>) -> Vec<Box<dyn SerializerFactory>> {
  vec![
    Box::new(TaggedSerializerFactory::new(registry.clone())),
    Box::new(FramedSerializerFactory::new(registry.clone())),
  ]
}

#[test]
fn end_to_end_list_round_trip_per_backend() {
  init_tracing();
  let registry = explicit_registry();
  for factory in binary_factories(&registry) {
    let mut out = Vec::new();
    let mut writer = factory.serialize(Sink::Buffer(&mut out)).expect("serialize");
    writer
      .write_object(&AnyValue::new(AnyList(vec![
        AnyValue::new(1i32),
        AnyValue::new(2i32),
        AnyValue::new(3i32),
      ])))
      .expect("write list");
    writer.flush().expect("flush");
    drop(writer);

    let mut reader = factory.deserialize(Source::Buffer(&out)).expect("deserialize");
    let list = reader.read_object_as::<AnyList>().expect("read list");
    let elements: Vec<i32> = list.0.iter().map(|value| *value.downcast_ref::<i32>().expect("i32")).collect();
    assert_eq!(elements, vec![1, 2, 3], "format {}", factory.format_id());
  }
}

#[test]
fn end_to_end_map_round_trip_per_backend() {
  init_tracing();
  let registry = explicit_registry();
  for factory in binary_factories(&registry) {
    let mut out = Vec::new();
    let mut writer = factory.serialize(Sink::Buffer(&mut out)).expect("serialize");
    writer
      .write_object(&AnyValue::new(AnyMap(vec![
        (AnyValue::new(String::from("a")), AnyValue::new(1i32)),
        (AnyValue::new(String::from("b")), AnyValue::new(2i32)),
      ])))
      .expect("write map");
    writer.flush().expect("flush");
    drop(writer);

    let mut reader = factory.deserialize(Source::Buffer(&out)).expect("deserialize");
    let map = reader.read_object_as::<AnyMap>().expect("read map");
    let entries: Vec<(String, i32)> = map
      .0
      .iter()
      .map(|(key, value)| {
        (
          key.downcast_ref::<String>().expect("key").clone(),
          *value.downcast_ref::<i32>().expect("value"),
        )
      })
      .collect();
    assert_eq!(
      entries,
      vec![(String::from("a"), 1), (String::from("b"), 2)],
      "format {}",
      factory.format_id()
    );
  }
}

#[test]
fn user_ids_begin_at_101() {
  let mut builder = TypeRegistryBuilder::new();
  builder.register_with_id::<i32>(101u32).expect("101 is user range");
}

#[derive(Debug, PartialEq, Portable)]
#[portable(id = 2001)]
struct Point {
  x: i32,
  y: i32,
}

#[derive(Debug, PartialEq, Portable)]
#[portable(id = 2002)]
struct Tag(u16);

#[derive(Debug, PartialEq, Portable)]
#[portable(id = 2003)]
struct Ping;

#[test]
fn derived_types_round_trip_through_the_native_factory() {
  init_tracing();
  let factory = NativeSerializerFactory::new();
  factory
    .initialize(|builder| {
      builder.register::<Point>()?;
      builder.register::<Tag>()?;
      builder.register::<Ping>()
    })
    .expect("initialize");

  let mut out = Vec::new();
  let mut writer = factory.serialize(Sink::Buffer(&mut out)).expect("serialize");
  writer.write_object(&AnyValue::new(Point { x: -3, y: 9 })).expect("point");
  writer.write_object(&AnyValue::new(Tag(777))).expect("tag");
  writer.write_object(&AnyValue::new(Ping)).expect("ping");
  writer.flush().expect("flush");
  drop(writer);

  let mut reader = factory.deserialize(Source::Buffer(&out)).expect("deserialize");
  assert_eq!(reader.read_object_as::<Point>().expect("point"), Point { x: -3, y: 9 });
  assert_eq!(reader.read_object_as::<Tag>().expect("tag"), Tag(777));
  assert_eq!(reader.read_object_as::<Ping>().expect("ping"), Ping);
}

#[test]
fn derived_wire_ids_come_from_the_attribute() {
  assert_eq!(Point::WIRE_ID, WireId::new(2001));
  assert_eq!(Tag::WIRE_ID, WireId::new(2002));
}

#[derive(Debug, PartialEq)]
struct ScopeProbe;

// Consults the ambient scope mid-encode the way nested custom codecs do.
impl WireValue for ScopeProbe {
  fn encode(&self, ctx: &mut EncodeContext<'_>) -> Result<(), CodecError> {
    let current = scope::current().expect("scope installed during encode");
    assert_eq!(current.direction(), Direction::Write);
    assert!(current.registry().is_some());
    ctx.write_bool(true)
  }

  fn decode(ctx: &mut DecodeContext<'_>) -> Result<Self, CodecError> {
    let current = scope::current().expect("scope installed during decode");
    assert_eq!(current.direction(), Direction::Read);
    ctx.read_bool()?;
    Ok(ScopeProbe)
  }
}

impl Portable for ScopeProbe {
  const WIRE_ID: WireId = WireId::new(2100);
}

#[test]
fn ambient_scope_is_visible_during_object_calls_and_cleared_after() {
  init_tracing();
  let mut builder = TypeRegistryBuilder::standard();
  builder.register::<ScopeProbe>().expect("register");
  let registry = Arc::new(builder.build());
  let factory = TaggedSerializerFactory::new(registry);

  assert!(scope::current().is_none());
  let mut out = Vec::new();
  let mut writer = factory.serialize(Sink::Buffer(&mut out)).expect("serialize");
  writer.write_object(&AnyValue::new(ScopeProbe)).expect("write");
  writer.flush().expect("flush");
  assert!(scope::current().is_none(), "scope must clear on exit");
  drop(writer);

  let mut reader = factory.deserialize(Source::Buffer(&out)).expect("deserialize");
  assert_eq!(reader.read_object_as::<ScopeProbe>().expect("read"), ScopeProbe);
  assert!(scope::current().is_none());
  assert_eq!(scope::depth(), 0);
}

#[test]
fn format_ids_are_distinct() {
  init_tracing();
  let registry = Arc::new(TypeRegistryBuilder::standard().build());
  let ids = [
    NativeSerializerFactory::new().format_id(),
    TaggedSerializerFactory::new(registry.clone()).format_id(),
    FramedSerializerFactory::new(registry).format_id(),
    crate::JsonSerializerFactory::new().format_id(),
  ];
  for (index, id) in ids.iter().enumerate() {
    for other in &ids[index + 1..] {
      assert_ne!(id, other);
    }
  }
  assert_eq!(ids[0], FormatId::NATIVE);
  assert_eq!(ids[3], FormatId::JSON);
}
