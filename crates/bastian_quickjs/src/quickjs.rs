use std::cell::RefCell;

use log::debug;
use rquickjs::{CatchResultExt, CaughtError, Context, Ctx, Runtime};

use bastian_core::config::{EngineConfig, QuickJsConfig};
use bastian_core::js::{Backend, Handle, JSError, Namespace, RunContext, Value};
use bastian_core::types::Result;
use bastian_core::Error;

pub use context::*;
pub use function::*;
pub use value::*;

mod context;
mod function;
mod value;

thread_local! {
    // Contexts of realms that are executing right now, innermost last. A realm's lock is held
    // while it runs, so reentrant calls must reuse the context recorded here.
    static LIVE: RefCell<Vec<(u32, Ctx<'static>)>> = const { RefCell::new(Vec::new()) };
}

/// Backend state stored in every QuickJS [`RunContext`]. The context keeps its runtime alive.
pub struct QuickJsRealm {
    context: Context,
}

pub struct QuickJsBackend {
    config: QuickJsConfig,
}

impl Backend for QuickJsBackend {
    const NAME: &'static str = "quickjs";

    fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.quickjs.clone(),
        }
    }

    fn create_realm(&self, namespace: &Namespace) -> Result<Handle<RunContext>> {
        let runtime = Runtime::new().map_err(|e| Error::JS(JSError::Initialize(e.to_string())))?;

        if let Some(limit) = self.config.memory_limit {
            runtime.set_memory_limit(limit);
        }
        if let Some(size) = self.config.max_stack_size {
            runtime.set_max_stack_size(size);
        }
        if let Some(threshold) = self.config.gc_threshold {
            runtime.set_gc_threshold(threshold);
        }

        let context = Context::full(&runtime).map_err(|e| Error::JS(JSError::Initialize(e.to_string())))?;
        let realm = RunContext::new(Self::NAME, QuickJsRealm { context });

        with_ctx(&realm, |ctx| {
            let globals = ctx.globals();
            install(&ctx, &realm, &globals, namespace)
        })?;

        debug!("quickjs: realm {} created with {} exports", realm.id(), namespace.len());

        Ok(realm)
    }

    fn execute(&self, realm: &Handle<RunContext>, source: &str) -> Result<Handle<Value>> {
        with_ctx(realm, |ctx| {
            let result = ctx.eval::<rquickjs::Value, _>(source).catch(&ctx);

            match result {
                Ok(value) => to_value(&ctx, realm, value),
                Err(caught) => Err(report_exception(caught).into()),
            }
        })
    }
}

/// Runs `f` with the QuickJS context of `realm`. If the realm is already executing further up
/// the stack its live context is reused, otherwise the realm's context is entered.
pub fn with_ctx<R>(realm: &Handle<RunContext>, f: impl for<'js> FnOnce(Ctx<'js>) -> Result<R>) -> Result<R> {
    if let Some(ctx) = live_ctx(realm.id()) {
        return f(ctx);
    }

    let Some(state) = realm.state::<QuickJsRealm>() else {
        return Err(Error::JS(JSError::Execution(format!(
            "realm {} belongs to the {} backend",
            realm.id(),
            realm.backend()
        )))
        .into());
    };

    state.context.with(|ctx| {
        let _live = LiveCtx::enter(realm.id(), &ctx);
        f(ctx)
    })
}

fn live_ctx(realm: u32) -> Option<Ctx<'static>> {
    LIVE.with(|live| {
        live.borrow()
            .iter()
            .rev()
            .find(|(id, _)| *id == realm)
            .map(|(_, ctx)| ctx.clone())
    })
}

struct LiveCtx;

impl LiveCtx {
    fn enter<'js>(realm: u32, ctx: &Ctx<'js>) -> Self {
        // SAFETY: the entry is popped when the guard drops, which happens inside the
        // `Context::with` call that handed out `ctx`. The erased lifetime never outlives it.
        let ctx = unsafe { std::mem::transmute::<Ctx<'js>, Ctx<'static>>(ctx.clone()) };
        LIVE.with(|live| live.borrow_mut().push((realm, ctx)));
        Self
    }
}

impl Drop for LiveCtx {
    fn drop(&mut self) {
        let popped = LIVE.try_with(|live| live.borrow_mut().pop());
        drop(popped);
    }
}

/// Turns a caught QuickJS exception into a [`JSError`]. Syntax errors count as compile errors.
pub fn report_exception(caught: CaughtError<'_>) -> Error {
    let CaughtError::Exception(exception) = &caught else {
        return Error::JS(JSError::Exception(caught.to_string()));
    };

    let name = exception
        .as_object()
        .get::<_, String>("name")
        .unwrap_or_else(|_| "Error".to_owned());
    let mut err = format!("{name}: {}", exception.message().unwrap_or_default());

    match exception.stack() {
        Some(stack) if !stack.is_empty() => {
            err.push_str("\nStacktrace:\n");
            err.push_str(&stack);
        }
        _ => err.push_str("\nStacktrace: <missing information>"),
    }

    if name == "SyntaxError" {
        Error::JS(JSError::Compile(err))
    } else {
        Error::JS(JSError::Exception(err))
    }
}

/// Maps an `rquickjs` error that is not a script exception.
pub(crate) fn conversion(e: rquickjs::Error) -> anyhow::Error {
    Error::JS(JSError::Conversion(e.to_string())).into()
}
