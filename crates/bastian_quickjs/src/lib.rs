//! QuickJS backend
//!
//! Every realm gets its own QuickJS runtime and context. Script functions handed to the host
//! are kept alive as `rquickjs::Persistent` handles together with their realm.

mod quickjs;

pub use quickjs::*;
