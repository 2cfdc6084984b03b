//! Serializer factory contract and the sink/source handles it binds to.

use std::io::{self, Read};

use crate::composite::CompositeCodec;
use crate::error::CodecError;
use crate::id::FormatId;

/// Shape of an I/O handle, used by the capability probes so callers can pick
/// a compatible factory without attempting I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoKind {
  /// An in-memory byte buffer, fully available up front.
  Buffer,
  /// An incremental stream.
  Stream,
}

/// Destination handle a write-bound codec is constructed over.
pub enum Sink<'a> {
  Buffer(&'a mut Vec<u8>),
  Stream(&'a mut dyn io::Write),
}

impl<'a> Sink<'a> {
  /// The capability-probe kind of this handle.
  #[must_use]
  pub fn kind(&self) -> IoKind {
    match self {
      Sink::Buffer(_) => IoKind::Buffer,
      Sink::Stream(_) => IoKind::Stream,
    }
  }

  pub(crate) fn into_writer(self) -> &'a mut dyn io::Write {
    match self {
      Sink::Buffer(buffer) => buffer,
      Sink::Stream(writer) => writer,
    }
  }
}

/// Origin handle a read-bound codec is constructed over.
pub enum Source<'a> {
  Buffer(&'a [u8]),
  Stream(&'a mut dyn io::Read),
}

impl<'a> Source<'a> {
  /// The capability-probe kind of this handle.
  #[must_use]
  pub fn kind(&self) -> IoKind {
    match self {
      Source::Buffer(_) => IoKind::Buffer,
      Source::Stream(_) => IoKind::Stream,
    }
  }

  pub(crate) fn into_reader(self) -> ByteSource<'a> {
    match self {
      Source::Buffer(buffer) => ByteSource::Buffer(io::Cursor::new(buffer)),
      Source::Stream(reader) => ByteSource::Stream(reader),
    }
  }
}

/// Unified incremental reader over either source shape.
pub(crate) enum ByteSource<'a> {
  Buffer(io::Cursor<&'a [u8]>),
  Stream(&'a mut dyn io::Read),
}

impl io::Read for ByteSource<'_> {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    match self {
      ByteSource::Buffer(cursor) => cursor.read(buf),
      ByteSource::Stream(reader) => reader.read(buf),
    }
  }
}

/// One factory per wire format: binds composite codecs to handles and
/// publishes the format's capability metadata.
///
/// Every `serialize`/`deserialize` call produces a fresh codec bound to that
/// handle and direction for its whole lifetime.
pub trait SerializerFactory: Send + Sync {
  /// Format discriminator, distinct per backend, used by transport-level
  /// content negotiation.
  fn format_id(&self) -> FormatId;

  /// Binds a write-mode composite codec to the sink.
  fn serialize<'a>(&self, sink: Sink<'a>) -> Result<CompositeCodec<'a>, CodecError>;

  /// Binds a read-mode composite codec to the source.
  fn deserialize<'a>(&self, source: Source<'a>) -> Result<CompositeCodec<'a>, CodecError>;

  /// True if [`SerializerFactory::serialize`] accepts sinks of this kind.
  fn support_serialize(&self, kind: IoKind) -> bool;

  /// True if [`SerializerFactory::deserialize`] accepts sources of this kind.
  fn support_deserialize(&self, kind: IoKind) -> bool;

  /// Names of the types this factory can carry, ordered by wire id, or
  /// [`CodecError::UnsupportedOperation`] for open-typed formats that use no
  /// registry.
  fn registered_types(&self) -> Result<Vec<&'static str>, CodecError>;

  /// True if the factory is constructed over a caller-supplied registry
  /// rather than owning registration itself.
  fn requires_external_registry(&self) -> bool;
}
