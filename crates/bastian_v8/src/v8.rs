use std::cell::RefCell;
use std::sync::Once;

use log::{debug, warn};
use v8::{CreateParams, Global, HandleScope, OwnedIsolate};

use bastian_core::config::{EngineConfig, V8Config};
use bastian_core::js::{Backend, Handle, JSError, Namespace, RunContext, Value};
use bastian_core::types::Result;
use bastian_core::Error;

pub use compile::*;
pub use context::*;
pub use function::*;
pub use value::*;

mod compile;
mod context;
mod function;
mod value;

// status of the V8 platform
static V8_INITIALIZED: Once = Once::new();

thread_local! {
    // All realms on this thread live in this isolate.
    static ISOLATE: RefCell<Option<OwnedIsolate>> = const { RefCell::new(None) };

    // Scopes of native callbacks running right now, innermost last. While a script runs the
    // isolate is borrowed, so host code called back from the script must go through these.
    static SCOPES: RefCell<Vec<*mut HandleScope<'static>>> = const { RefCell::new(Vec::new()) };
}

/// Backend state stored in every V8 [`RunContext`].
pub struct V8Realm {
    pub context: Global<v8::Context>,
}

/// V8 keeps its state in the per-thread isolate, the backend itself is only the entry point.
pub struct V8Backend;

impl V8Backend {
    pub fn initialize() {
        V8_INITIALIZED.call_once(|| {
            //https://github.com/denoland/rusty_v8/issues/1381
            let platform = v8::new_unprotected_default_platform(0, false).make_shared();
            v8::V8::initialize_platform(platform);
            v8::V8::initialize();
        });
    }
}

impl Backend for V8Backend {
    const NAME: &'static str = "v8";

    fn new(config: &EngineConfig) -> Self {
        Self::initialize();

        ISOLATE.with(|isolate| match isolate.try_borrow_mut() {
            Ok(mut isolate) if isolate.is_none() => {
                debug!("v8: creating isolate for this thread");
                *isolate = Some(v8::Isolate::new(create_params(&config.v8)));
            }
            _ => debug!("v8: reusing the isolate of this thread, heap limits are unchanged"),
        });

        Self
    }

    fn create_realm(&self, namespace: &Namespace) -> Result<Handle<RunContext>> {
        let realm = new_realm(namespace)?;
        debug!("v8: realm {} created with {} exports", realm.id(), namespace.len());
        Ok(realm)
    }

    fn execute(&self, realm: &Handle<RunContext>, source: &str) -> Result<Handle<Value>> {
        run_script(realm, source)
    }
}

fn create_params(config: &V8Config) -> CreateParams {
    match config.max_heap_bytes {
        Some(max) => CreateParams::default().heap_limits(config.initial_heap_bytes, max),
        None => {
            if config.initial_heap_bytes > 0 {
                warn!("v8: initial_heap_bytes is ignored without max_heap_bytes");
            }
            CreateParams::default()
        }
    }
}

/// Runs `f` in a fresh handle scope. Inside a native callback the scope is opened on top of the
/// callback's scope, otherwise on the thread's isolate.
pub fn with_scope<R>(f: impl for<'s> FnOnce(&mut HandleScope<'s, ()>) -> Result<R>) -> Result<R> {
    if let Some(parent) = SCOPES.with(|scopes| scopes.borrow().last().copied()) {
        // SAFETY: the pointer was pushed by `LiveScope::enter` from a callback scope that is still
        // on the stack below us; it is popped before that callback touches its scope again.
        let parent = unsafe { &mut *parent };
        let scope = &mut HandleScope::new(parent);
        return f(scope);
    }

    ISOLATE.with(|isolate| {
        let mut isolate = isolate
            .try_borrow_mut()
            .map_err(|_| Error::JS(JSError::ContextBusy))?;

        let isolate = isolate.get_or_insert_with(|| {
            V8Backend::initialize();
            v8::Isolate::new(CreateParams::default())
        });

        let scope = &mut HandleScope::new(isolate);
        f(scope)
    })
}

/// Publishes a callback scope to [`with_scope`] until dropped.
pub(crate) struct LiveScope;

impl LiveScope {
    pub(crate) fn enter(scope: &mut HandleScope<'_>) -> Self {
        let scope: *mut HandleScope<'_> = scope;
        SCOPES.with(|scopes| scopes.borrow_mut().push(scope.cast()));
        Self
    }
}

impl Drop for LiveScope {
    fn drop(&mut self) {
        let popped = SCOPES.try_with(|scopes| scopes.borrow_mut().pop());
        drop(popped);
    }
}

pub(crate) fn realm_state(realm: &Handle<RunContext>) -> Result<&V8Realm> {
    realm.state::<V8Realm>().ok_or_else(|| {
        Error::JS(JSError::Execution(format!(
            "realm {} belongs to the {} backend",
            realm.id(),
            realm.backend()
        )))
        .into()
    })
}
