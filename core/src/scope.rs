//! Call-scoped ambient access to the in-flight codec.
//!
//! Deeply nested encode/decode logic (a custom type's own `WireValue` impl,
//! diagnostics in a field codec) can consult the innermost active scope
//! instead of threading codec metadata through every call. The scope carries
//! the registry handle and format metadata, not the reader/writer itself;
//! code that needs to transcode receives an explicit context.
//!
//! Storage is a thread-local stack: scopes nest, never leak across threads,
//! and the guard returned by [`enter`] pops on every exit path including
//! panics, which discharges the clear-on-exit obligation mechanically.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::data::Direction;
use crate::id::FormatId;
use crate::registry::TypeRegistry;

/// Snapshot of the in-flight codec visible to nested code.
#[derive(Clone)]
pub struct CodecScope {
  format: FormatId,
  direction: Direction,
  registry: Option<Arc<TypeRegistry>>,
}

impl CodecScope {
  /// Creates a scope record. The registry is absent for open-typed formats.
  #[must_use]
  pub fn new(format: FormatId, direction: Direction, registry: Option<Arc<TypeRegistry>>) -> Self {
    Self {
      format,
      direction,
      registry,
    }
  }

  /// Format of the codec this scope belongs to.
  #[must_use]
  pub fn format(&self) -> FormatId {
    self.format
  }

  /// Direction of the codec this scope belongs to.
  #[must_use]
  pub fn direction(&self) -> Direction {
    self.direction
  }

  /// Registry of the codec this scope belongs to, if it uses one.
  #[must_use]
  pub fn registry(&self) -> Option<&Arc<TypeRegistry>> {
    self.registry.as_ref()
  }
}

impl core::fmt::Debug for CodecScope {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("CodecScope")
      .field("format", &self.format)
      .field("direction", &self.direction)
      .field("has_registry", &self.registry.is_some())
      .finish()
  }
}

thread_local! {
  static ACTIVE: RefCell<Vec<CodecScope>> = const { RefCell::new(Vec::new()) };
}

/// Pushes a scope onto the current thread's stack. The returned guard pops it
/// when dropped; hold it for the duration of the nested work.
#[must_use]
pub fn enter(scope: CodecScope) -> ScopeGuard {
  ACTIVE.with(|stack| stack.borrow_mut().push(scope));
  ScopeGuard {
    _not_send: PhantomData,
  }
}

/// Returns the innermost active scope on this thread, if any.
#[must_use]
pub fn current() -> Option<CodecScope> {
  ACTIVE.with(|stack| stack.borrow().last().cloned())
}

/// Current nesting depth on this thread.
#[must_use]
pub fn depth() -> usize {
  ACTIVE.with(|stack| stack.borrow().len())
}

/// Pops the scope pushed by the matching [`enter`] call on drop.
pub struct ScopeGuard {
  // Thread-local bookkeeping must be released on the thread that entered it.
  _not_send: PhantomData<*const ()>,
}

impl Drop for ScopeGuard {
  fn drop(&mut self) {
    ACTIVE.with(|stack| {
      stack.borrow_mut().pop();
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn scopes_nest_and_clear() {
    assert!(current().is_none());
    {
      let _outer = enter(CodecScope::new(FormatId::NATIVE, Direction::Write, None));
      assert_eq!(depth(), 1);
      {
        let _inner = enter(CodecScope::new(FormatId::TAGGED, Direction::Write, None));
        assert_eq!(depth(), 2);
        assert_eq!(current().map(|scope| scope.format()), Some(FormatId::TAGGED));
      }
      assert_eq!(depth(), 1);
      assert_eq!(current().map(|scope| scope.format()), Some(FormatId::NATIVE));
    }
    assert!(current().is_none());
  }

  #[test]
  fn clears_on_panic() {
    let unwound = std::panic::catch_unwind(|| {
      let _guard = enter(CodecScope::new(FormatId::FRAMED, Direction::Read, None));
      panic!("boom");
    });
    assert!(unwound.is_err());
    assert!(current().is_none());
  }
}
