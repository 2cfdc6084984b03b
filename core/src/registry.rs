//! Bidirectional type↔id registry, built once and frozen.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{CodecError, RegistryError};
use crate::id::{builtin, IntoWireId, WireId, USER_DEFINED_START};
use crate::portable::{DecodeContext, EncodeContext, Portable, WireValue};
use crate::value::{AnyValue, ContainerKind};

/// Type-erased encode/decode vtable for one registered type, monomorphized
/// from its `WireValue` impl at registration time.
pub struct TypeTemplate {
  id: WireId,
  rust_type: TypeId,
  type_name: &'static str,
  encode: fn(&AnyValue, &mut EncodeContext<'_>) -> Result<(), CodecError>,
  decode: fn(&mut DecodeContext<'_>) -> Result<AnyValue, CodecError>,
}

fn encode_erased<T: WireValue>(value: &AnyValue, ctx: &mut EncodeContext<'_>) -> Result<(), CodecError> {
  let concrete = value.downcast_ref::<T>().ok_or(CodecError::TypeMismatch {
    expected: std::any::type_name::<T>(),
    actual: value.type_name(),
  })?;
  concrete.encode(ctx)
}

fn decode_erased<T: WireValue>(ctx: &mut DecodeContext<'_>) -> Result<AnyValue, CodecError> {
  Ok(AnyValue::new(T::decode(ctx)?))
}

impl TypeTemplate {
  /// Builds the template for a concrete wire type under the given id.
  #[must_use]
  pub fn of<T: WireValue>(id: WireId) -> Self {
    Self {
      id,
      rust_type: TypeId::of::<T>(),
      type_name: std::any::type_name::<T>(),
      encode: encode_erased::<T>,
      decode: decode_erased::<T>,
    }
  }

  /// The id this template registered under.
  #[must_use]
  pub fn id(&self) -> WireId {
    self.id
  }

  /// The Rust `TypeId` of the templated type.
  #[must_use]
  pub fn rust_type(&self) -> TypeId {
    self.rust_type
  }

  /// The full Rust path of the templated type.
  #[must_use]
  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  /// Encodes a type-erased value through this template.
  pub fn encode_value(&self, value: &AnyValue, ctx: &mut EncodeContext<'_>) -> Result<(), CodecError> {
    (self.encode)(value, ctx)
  }

  /// Decodes one instance of the templated type.
  pub fn decode_value(&self, ctx: &mut DecodeContext<'_>) -> Result<AnyValue, CodecError> {
    (self.decode)(ctx)
  }
}

impl core::fmt::Debug for TypeTemplate {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("TypeTemplate")
      .field("id", &self.id)
      .field("type_name", &self.type_name)
      .finish()
  }
}

enum Registration {
  Template(Arc<TypeTemplate>),
  Kind(ContainerKind),
}

/// Mutable registration phase of a [`TypeRegistry`].
///
/// All registrations happen here, single-threaded, before [`build`]
/// freezes the maps; the quiescence invariant of the published registry is
/// enforced by construction rather than documented.
///
/// [`build`]: TypeRegistryBuilder::build
pub struct TypeRegistryBuilder {
  by_id: HashMap<WireId, Registration>,
  templates_by_type: HashMap<TypeId, Arc<TypeTemplate>>,
  kind_ids: HashMap<ContainerKind, WireId>,
}

impl TypeRegistryBuilder {
  /// Creates an empty builder with no system registrations.
  #[must_use]
  pub fn new() -> Self {
    Self {
      by_id: HashMap::new(),
      templates_by_type: HashMap::new(),
      kind_ids: HashMap::new(),
    }
  }

  /// Creates a builder pre-seeded with the built-in primitives and container
  /// kinds at their reserved ids.
  #[must_use]
  pub fn standard() -> Self {
    let mut builder = Self::new();
    builder.seed_standard();
    builder
  }

  fn seed_standard(&mut self) {
    self
      .try_seed_standard()
      .expect("standard registrations use distinct reserved ids");
  }

  fn try_seed_standard(&mut self) -> Result<(), RegistryError> {
    self.register_with_id::<bool>(builtin::BOOL)?;
    self.register_with_id::<i8>(builtin::I8)?;
    self.register_with_id::<u8>(builtin::U8)?;
    self.register_with_id::<i16>(builtin::I16)?;
    self.register_with_id::<u16>(builtin::U16)?;
    self.register_with_id::<i32>(builtin::I32)?;
    self.register_with_id::<u32>(builtin::U32)?;
    self.register_with_id::<i64>(builtin::I64)?;
    self.register_with_id::<u64>(builtin::U64)?;
    self.register_with_id::<f32>(builtin::F32)?;
    self.register_with_id::<f64>(builtin::F64)?;
    self.register_with_id::<char>(builtin::CHAR)?;
    self.register_with_id::<String>(builtin::STRING)?;
    self.register_with_id::<Vec<u8>>(builtin::BYTES)?;
    self.register_kind(ContainerKind::List, builtin::LIST)?;
    self.register_kind(ContainerKind::Set, builtin::SET)?;
    self.register_kind(ContainerKind::Collection, builtin::COLLECTION)?;
    self.register_kind(ContainerKind::Map, builtin::MAP)?;
    Ok(())
  }

  /// Registers a marker-carrying user type under its declared id.
  ///
  /// Fails with [`RegistryError::ReservedId`] for ids inside the system
  /// range, [`RegistryError::DuplicateId`] / [`RegistryError::DuplicateType`]
  /// when either side of the bijection is already taken.
  pub fn register<T: Portable>(&mut self) -> Result<(), RegistryError> {
    let id = T::WIRE_ID;
    if id.is_none() {
      return Err(RegistryError::NoneId);
    }
    if id.is_reserved() {
      return Err(RegistryError::ReservedId {
        id,
        reserved_max: USER_DEFINED_START - 1,
      });
    }
    self.insert(TypeTemplate::of::<T>(id))
  }

  /// Explicit-id variant used for built-in types that carry no marker.
  ///
  /// Reserved ids are permitted here; this is the system registration path.
  /// The id is coerced to the registry's `u32` width and a lossy coercion is
  /// fatal.
  pub fn register_with_id<T: WireValue>(&mut self, id: impl IntoWireId) -> Result<(), RegistryError> {
    let id = id.into_wire_id().inspect_err(|err| {
      tracing::warn!(type_name = std::any::type_name::<T>(), %err, "rejecting wire id coercion");
    })?;
    if id.is_none() {
      return Err(RegistryError::NoneId);
    }
    self.insert(TypeTemplate::of::<T>(id))
  }

  /// Registers an abstract container kind. Kinds share the id space with
  /// concrete types and follow the same uniqueness rules.
  pub fn register_kind(&mut self, kind: ContainerKind, id: impl IntoWireId) -> Result<(), RegistryError> {
    let id = id.into_wire_id().inspect_err(|err| {
      tracing::warn!(kind = kind.label(), %err, "rejecting wire id coercion");
    })?;
    if id.is_none() {
      return Err(RegistryError::NoneId);
    }
    if self.by_id.contains_key(&id) {
      return Err(RegistryError::DuplicateId(id));
    }
    if self.kind_ids.contains_key(&kind) {
      return Err(RegistryError::DuplicateType(kind.label()));
    }
    tracing::debug!(%id, kind = kind.label(), "registering container kind");
    self.by_id.insert(id, Registration::Kind(kind));
    self.kind_ids.insert(kind, id);
    Ok(())
  }

  fn insert(&mut self, template: TypeTemplate) -> Result<(), RegistryError> {
    if self.by_id.contains_key(&template.id()) {
      return Err(RegistryError::DuplicateId(template.id()));
    }
    if self.templates_by_type.contains_key(&template.rust_type()) {
      return Err(RegistryError::DuplicateType(template.type_name()));
    }
    tracing::debug!(id = %template.id(), type_name = template.type_name(), "registering wire type");
    let template = Arc::new(template);
    self.by_id.insert(template.id(), Registration::Template(template.clone()));
    self.templates_by_type.insert(template.rust_type(), template);
    Ok(())
  }

  /// Freezes the registrations into an immutable registry.
  #[must_use]
  pub fn build(self) -> TypeRegistry {
    TypeRegistry {
      by_id: self.by_id,
      templates_by_type: self.templates_by_type,
      kind_ids: self.kind_ids,
    }
  }
}

impl Default for TypeRegistryBuilder {
  fn default() -> Self {
    Self::new()
  }
}

/// Immutable, thread-safe-by-construction type↔id lookup structure.
///
/// Resolution never fails: absence is `None`, and callers convert absence
/// into the contextual encode/decode error.
pub struct TypeRegistry {
  by_id: HashMap<WireId, Registration>,
  templates_by_type: HashMap<TypeId, Arc<TypeTemplate>>,
  kind_ids: HashMap<ContainerKind, WireId>,
}

impl TypeRegistry {
  /// The id a concrete type registered under.
  #[must_use]
  pub fn id_of(&self, rust_type: TypeId) -> Option<WireId> {
    self.templates_by_type.get(&rust_type).map(|template| template.id())
  }

  /// The template of a concrete type.
  #[must_use]
  pub fn template_for(&self, rust_type: TypeId) -> Option<&TypeTemplate> {
    self.templates_by_type.get(&rust_type).map(Arc::as_ref)
  }

  /// The template registered under an id.
  #[must_use]
  pub fn template_by_id(&self, id: WireId) -> Option<&TypeTemplate> {
    match self.by_id.get(&id) {
      Some(Registration::Template(template)) => Some(template),
      _ => None,
    }
  }

  /// The id an abstract container kind registered under.
  #[must_use]
  pub fn kind_id(&self, kind: ContainerKind) -> Option<WireId> {
    self.kind_ids.get(&kind).copied()
  }

  /// The abstract container kind registered under an id.
  #[must_use]
  pub fn kind_by_id(&self, id: WireId) -> Option<ContainerKind> {
    match self.by_id.get(&id) {
      Some(Registration::Kind(kind)) => Some(*kind),
      _ => None,
    }
  }

  /// Names of every registered concrete type, ordered by id. Used to
  /// advertise serialization capability upstream.
  #[must_use]
  pub fn type_names(&self) -> Vec<&'static str> {
    let mut templates: Vec<&Arc<TypeTemplate>> = self.templates_by_type.values().collect();
    templates.sort_by_key(|template| template.id());
    templates.into_iter().map(|template| template.type_name()).collect()
  }

  /// Number of registrations, container kinds included.
  #[must_use]
  pub fn len(&self) -> usize {
    self.by_id.len()
  }

  /// True when nothing is registered.
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.by_id.is_empty()
  }
}

impl core::fmt::Debug for TypeRegistry {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("TypeRegistry")
      .field("types", &self.templates_by_type.len())
      .field("kinds", &self.kind_ids.len())
      .finish()
  }
}
