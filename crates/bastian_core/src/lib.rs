//! Javascript engine embedding core
//!
//! This crate holds everything that does not depend on a concrete javascript engine: the
//! [`js::Value`] model, the shared [`js::Handle`], the [`js::RunContext`] stack used by native
//! trampolines, the export builder and the generic [`js::Engine`] façade. Backends (V8,
//! QuickJS) implement [`js::Backend`] in their own crates.
//!

use thiserror::Error;

pub mod config;
pub mod js;
pub mod types;

#[derive(Debug, Error)]
pub enum Error {
    #[error("js: {0}")]
    JS(#[from] js::JSError),

    #[error("config error: {0}")]
    Config(String),
}
