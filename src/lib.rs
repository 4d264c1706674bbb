//! Bastian embeds a javascript engine behind a small host API.
//!
//! The host describes what a script may see with an [`ExportBuilder`] generator, runs source
//! with [`Engine::run`] and gets a [`Value`] back. Every run happens in a fresh realm, so globals
//! a script declares are gone by the next run.
//!
//! ```no_run
//! use bastian::{Engine, Value};
//!
//! let engine = Engine::new(|obj| {
//!     obj.export("answer", Value::number(42.0));
//!     obj.export_fn("double", |cb| {
//!         let n = cb.argument(0).number_value();
//!         cb.ret(Value::number(n * 2.0));
//!     });
//! });
//!
//! let value = engine.run("double(answer)")?;
//! assert_eq!(value.number_value(), 84.0);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! The backend is picked at compile time: the `quickjs` feature (default) or the `v8` feature.
//! If both are enabled, V8 wins.

#[cfg(not(any(feature = "v8", feature = "quickjs")))]
compile_error!("enable the `quickjs` or the `v8` feature to select a javascript backend");

pub use bastian_core::js::{
    Backend, Export, ExportBuilder, FunctionContext, Generator, Handle, JSError, Namespace, NativeFunction,
    RunContext, ScriptFunction, Value, ValueType,
};
pub use bastian_core::{config, types, Error};

#[cfg(feature = "v8")]
pub type SelectedBackend = bastian_v8::V8Backend;

#[cfg(all(feature = "quickjs", not(feature = "v8")))]
pub type SelectedBackend = bastian_quickjs::QuickJsBackend;

/// The engine façade over the backend selected at compile time.
pub type Engine = bastian_core::js::Engine<SelectedBackend>;

/// Name of the backend scripts run on, `"v8"` or `"quickjs"`.
pub const BACKEND: &str = <SelectedBackend as Backend>::NAME;
