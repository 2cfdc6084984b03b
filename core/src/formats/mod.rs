//! Concrete wire format backends. Each backend is a distinct,
//! independently-versioned byte layout; payloads are not interchangeable
//! across backends.

pub mod framed;
pub mod json;
pub mod native;
pub mod tagged;
