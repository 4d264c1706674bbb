//! V8 backend
//!
//! All realms on a thread share one isolate. Each run gets its own `v8::Context`, kept alive as a
//! `v8::Global` inside the realm's [`bastian_core::js::RunContext`].

mod v8;

pub use self::v8::*;
