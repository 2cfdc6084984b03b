//! Registry-driven, format-agnostic object serialization engine.
//!
//! The same application code serializes arbitrary values to several wire
//! encodings through one uniform contract: a [`SerializerFactory`] binds a
//! [`CompositeCodec`] to a sink or source, the object layer resolves types
//! to compact numeric tags through a frozen [`TypeRegistry`], and the
//! per-format data codec does the byte-level transcoding.
//!
//! ```ignore
//! let mut registry = TypeRegistryBuilder::standard();
//! registry.register::<Point>()?; // #[derive(Portable)] #[portable(id = 2001)]
//! let factory = TaggedSerializerFactory::new(Arc::new(registry.build()));
//!
//! let mut out = Vec::new();
//! let mut codec = factory.serialize(Sink::Buffer(&mut out))?;
//! codec.write_object(&AnyValue::new(Point { x: 3, y: 4 }))?;
//! codec.flush()?;
//! ```

pub mod composite;
pub mod config;
pub mod data;
pub mod error;
pub mod factory;
pub mod formats;
pub mod id;
pub mod object;
pub mod portable;
pub mod registry;
pub mod scope;
pub mod value;

pub use composite::CompositeCodec;
pub use config::{CodecConfig, ConfigOption};
pub use data::{DataCodec, Direction};
pub use error::{CodecError, RegistryError};
pub use factory::{IoKind, SerializerFactory, Sink, Source};
pub use formats::framed::{FramedDataCodec, FramedSerializerFactory};
pub use formats::json::{JsonDataCodec, JsonSerializerFactory, OpenObjectCodec};
pub use formats::native::{NativeDataCodec, NativeSerializerFactory};
pub use formats::tagged::{TaggedDataCodec, TaggedSerializerFactory};
pub use id::{FormatId, IntoWireId, WireId, USER_DEFINED_START};
pub use object::{ObjectCodec, RegistryObjectCodec};
pub use portable::{DecodeContext, EncodeContext, Portable, WireValue};
pub use registry::{TypeRegistry, TypeRegistryBuilder, TypeTemplate};
pub use scope::{CodecScope, ScopeGuard};
pub use tagwire_derive_rs::Portable;
pub use value::{AnyBag, AnyList, AnyMap, AnySet, AnyValue, ContainerKind};

#[cfg(test)]
mod tests;
