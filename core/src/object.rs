//! Object codecs: the id-header protocol and the polymorphic container
//! tagging protocol, expressed over any [`DataCodec`].

use std::sync::Arc;

use crate::config::CodecConfig;
use crate::data::DataCodec;
use crate::error::CodecError;
use crate::id::WireId;
use crate::portable::{DecodeContext, EncodeContext};
use crate::registry::{TypeRegistry, TypeTemplate};
use crate::value::{AnyBag, AnyList, AnyMap, AnySet, AnyValue, ContainerKind};

/// Reads and writes arbitrary object graphs against a data codec. The object
/// codec performs no I/O of its own; every byte moves through the data codec
/// it is handed per call.
pub trait ObjectCodec: Send + Sync {
  /// Writes one value, id header included.
  fn write_object(&self, data: &mut dyn DataCodec, value: &AnyValue) -> Result<(), CodecError>;

  /// Reads one value, id header included.
  fn read_object(&self, data: &mut dyn DataCodec) -> Result<AnyValue, CodecError>;
}

/// Registry-driven object codec used by every binary format.
///
/// Encoding resolves the value's runtime type to its registered id and writes
/// `[id, payload]`; containers are tagged with their abstract kind and common
/// element type(s) per the tagging protocol. All resolution happens before
/// the first header byte is written, so a failed encode leaves no dangling
/// header on the stream.
pub struct RegistryObjectCodec {
  registry: Arc<TypeRegistry>,
  config: CodecConfig,
}

impl RegistryObjectCodec {
  /// Creates a codec over a frozen registry.
  #[must_use]
  pub fn new(registry: Arc<TypeRegistry>, config: CodecConfig) -> Self {
    Self { registry, config }
  }

  /// The registry backing this codec.
  #[must_use]
  pub fn registry(&self) -> &Arc<TypeRegistry> {
    &self.registry
  }

  /// Computes the template shared by every element, or `None` for an empty
  /// iterator. Differing concrete types are a hard error; so is a common type
  /// absent from the registry.
  fn common_template<'v>(
    &self,
    elements: impl Iterator<Item = &'v AnyValue>,
  ) -> Result<Option<&TypeTemplate>, CodecError> {
    let mut first: Option<&AnyValue> = None;
    for (index, element) in elements.enumerate() {
      match first {
        None => first = Some(element),
        Some(head) => {
          if element.rust_type() != head.rust_type() {
            return Err(CodecError::HeterogeneousContainer {
              first: head.type_name(),
              index,
              found: element.type_name(),
            });
          }
        }
      }
    }
    let Some(head) = first else {
      return Ok(None);
    };
    let template = self
      .registry
      .template_for(head.rust_type())
      .ok_or(CodecError::UnregisteredType {
        type_name: head.type_name(),
      })?;
    Ok(Some(template))
  }

  fn container_len(&self, len: usize) -> Result<u32, CodecError> {
    let len = u32::try_from(len).map_err(|_| CodecError::LengthOverflow {
      len: len as u64,
      max: u64::from(self.config.max_container_len()),
    })?;
    if len > self.config.max_container_len() {
      return Err(CodecError::LengthOverflow {
        len: u64::from(len),
        max: u64::from(self.config.max_container_len()),
      });
    }
    Ok(len)
  }

  fn write_sequence(
    &self,
    data: &mut dyn DataCodec,
    kind: ContainerKind,
    elements: &[AnyValue],
  ) -> Result<(), CodecError> {
    let kind_id = self.registry.kind_id(kind).ok_or(CodecError::UnregisteredType {
      type_name: kind.label(),
    })?;
    let template = self.common_template(elements.iter())?;
    let len = self.container_len(elements.len())?;
    tracing::trace!(%kind_id, kind = kind.label(), len, "encoding container");
    data.write_u32(kind_id.value())?;
    match template {
      None => {
        data.write_u32(WireId::NONE.value())?;
        data.write_u32(0)?;
      }
      Some(template) => {
        data.write_u32(template.id().value())?;
        data.write_u32(len)?;
        let mut ctx = EncodeContext::new(data, self);
        for element in elements {
          template.encode_value(element, &mut ctx)?;
        }
      }
    }
    Ok(())
  }

  fn write_map(&self, data: &mut dyn DataCodec, map: &AnyMap) -> Result<(), CodecError> {
    let kind_id = self
      .registry
      .kind_id(ContainerKind::Map)
      .ok_or(CodecError::UnregisteredType {
        type_name: ContainerKind::Map.label(),
      })?;
    let key_template = self.common_template(map.0.iter().map(|(key, _)| key))?;
    let value_template = self.common_template(map.0.iter().map(|(_, value)| value))?;
    let len = self.container_len(map.0.len())?;
    tracing::trace!(%kind_id, len, "encoding map");
    data.write_u32(kind_id.value())?;
    match (key_template, value_template) {
      (Some(key_template), Some(value_template)) => {
        data.write_u32(key_template.id().value())?;
        data.write_u32(value_template.id().value())?;
        data.write_u32(len)?;
        let mut ctx = EncodeContext::new(data, self);
        for (key, value) in &map.0 {
          key_template.encode_value(key, &mut ctx)?;
          value_template.encode_value(value, &mut ctx)?;
        }
      }
      _ => {
        data.write_u32(WireId::NONE.value())?;
        data.write_u32(WireId::NONE.value())?;
        data.write_u32(0)?;
      }
    }
    Ok(())
  }

  fn read_sequence(&self, data: &mut dyn DataCodec) -> Result<Vec<AnyValue>, CodecError> {
    let element_id = WireId::new(data.read_u32()?);
    let len = data.read_u32()?;
    if len > self.config.max_container_len() {
      return Err(CodecError::LengthOverflow {
        len: u64::from(len),
        max: u64::from(self.config.max_container_len()),
      });
    }
    if element_id.is_none() {
      if len != 0 {
        return Err(CodecError::corrupt(format!(
          "container claims {len} elements under the empty-element tag"
        )));
      }
      return Ok(Vec::new());
    }
    let template = self
      .registry
      .template_by_id(element_id)
      .ok_or(CodecError::UnregisteredId(element_id))?;
    let mut elements = Vec::with_capacity(len as usize);
    let mut ctx = DecodeContext::new(data, self);
    for _ in 0..len {
      elements.push(template.decode_value(&mut ctx)?);
    }
    Ok(elements)
  }

  fn read_map(&self, data: &mut dyn DataCodec) -> Result<AnyValue, CodecError> {
    let key_id = WireId::new(data.read_u32()?);
    let value_id = WireId::new(data.read_u32()?);
    let len = data.read_u32()?;
    if len > self.config.max_container_len() {
      return Err(CodecError::LengthOverflow {
        len: u64::from(len),
        max: u64::from(self.config.max_container_len()),
      });
    }
    if key_id.is_none() || value_id.is_none() {
      if len != 0 || key_id != value_id {
        return Err(CodecError::corrupt("map header mixes empty and concrete entry tags"));
      }
      return Ok(AnyValue::new(AnyMap(Vec::new())));
    }
    let key_template = self
      .registry
      .template_by_id(key_id)
      .ok_or(CodecError::UnregisteredId(key_id))?;
    let value_template = self
      .registry
      .template_by_id(value_id)
      .ok_or(CodecError::UnregisteredId(value_id))?;
    let mut entries = Vec::with_capacity(len as usize);
    let mut ctx = DecodeContext::new(data, self);
    for _ in 0..len {
      let key = key_template.decode_value(&mut ctx)?;
      let value = value_template.decode_value(&mut ctx)?;
      entries.push((key, value));
    }
    Ok(AnyValue::new(AnyMap(entries)))
  }
}

impl ObjectCodec for RegistryObjectCodec {
  fn write_object(&self, data: &mut dyn DataCodec, value: &AnyValue) -> Result<(), CodecError> {
    if let Some(list) = value.downcast_ref::<AnyList>() {
      return self.write_sequence(data, ContainerKind::List, &list.0);
    }
    if let Some(set) = value.downcast_ref::<AnySet>() {
      return self.write_sequence(data, ContainerKind::Set, &set.0);
    }
    if let Some(bag) = value.downcast_ref::<AnyBag>() {
      return self.write_sequence(data, ContainerKind::Collection, &bag.0);
    }
    if let Some(map) = value.downcast_ref::<AnyMap>() {
      return self.write_map(data, map);
    }
    let template = self
      .registry
      .template_for(value.rust_type())
      .ok_or(CodecError::UnregisteredType {
        type_name: value.type_name(),
      })?;
    tracing::trace!(id = %template.id(), type_name = template.type_name(), "encoding object");
    data.write_u32(template.id().value())?;
    let mut ctx = EncodeContext::new(data, self);
    template.encode_value(value, &mut ctx)
  }

  fn read_object(&self, data: &mut dyn DataCodec) -> Result<AnyValue, CodecError> {
    let id = WireId::new(data.read_u32()?);
    if let Some(kind) = self.registry.kind_by_id(id) {
      tracing::trace!(%id, kind = kind.label(), "decoding container");
      return match kind {
        ContainerKind::List => self.read_sequence(data).map(|elements| AnyValue::new(AnyList(elements))),
        ContainerKind::Set => self.read_sequence(data).map(|elements| AnyValue::new(AnySet(elements))),
        ContainerKind::Collection => self.read_sequence(data).map(|elements| AnyValue::new(AnyBag(elements))),
        ContainerKind::Map => self.read_map(data),
      };
    }
    let template = self.registry.template_by_id(id).ok_or(CodecError::UnregisteredId(id))?;
    let mut ctx = DecodeContext::new(data, self);
    template.decode_value(&mut ctx)
  }
}

#[cfg(test)]
mod tests;
