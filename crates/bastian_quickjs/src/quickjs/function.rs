use std::any::Any;

use log::{debug, error};
use rquickjs::function::{Args, Rest};
use rquickjs::{CatchResultExt, Ctx, Exception, Function, Persistent};

use bastian_core::js::{
    invoke_native, Backend, Completion, Handle, JSError, NativeKey, RunContext, ScriptFunction, Value,
};
use bastian_core::types::Result;

use crate::quickjs::{conversion, from_value, report_exception, to_value, with_ctx, QuickJsBackend};

/// A script function held by the host.
pub struct QuickJsFunction {
    // Declared first: the persistent handle must be released while the realm's runtime lives.
    function: Persistent<Function<'static>>,
    realm: Handle<RunContext>,
}

impl QuickJsFunction {
    pub fn new<'js>(ctx: &Ctx<'js>, realm: &Handle<RunContext>, function: Function<'js>) -> Self {
        Self {
            function: Persistent::save(ctx, function),
            realm: Handle::clone(realm),
        }
    }

    pub fn realm(&self) -> &Handle<RunContext> {
        &self.realm
    }

    pub(crate) fn restore<'js>(&self, ctx: &Ctx<'js>) -> Result<Function<'js>> {
        self.function.clone().restore(ctx).map_err(conversion)
    }
}

impl ScriptFunction for QuickJsFunction {
    fn backend(&self) -> &'static str {
        QuickJsBackend::NAME
    }

    fn call(&self, arguments: &[Handle<Value>]) -> Result<Handle<Value>> {
        debug!("quickjs: calling function of realm {} with {} arguments", self.realm.id(), arguments.len());

        let _current = RunContext::set_current(Handle::clone(&self.realm));

        with_ctx(&self.realm, |ctx| {
            let function = self.restore(&ctx)?;

            let mut args = Args::new(ctx.clone(), arguments.len());
            args.this(ctx.globals()).map_err(conversion)?;
            for argument in arguments {
                args.push_arg(from_value(&ctx, &self.realm, argument)?)
                    .map_err(conversion)?;
            }

            match function.call_arg::<rquickjs::Value>(args).catch(&ctx) {
                Ok(value) => to_value(&ctx, &self.realm, value),
                Err(caught) => Err(report_exception(caught).into()),
            }
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Creates the script side of a native function. The key is captured by the closure and leads
/// back to the host callback through the active realm stack.
pub fn new_native<'js>(ctx: &Ctx<'js>, name: &str, key: NativeKey) -> Result<Function<'js>> {
    let function = Function::new(ctx.clone(), move |ctx: Ctx<'js>, args: Rest<rquickjs::Value<'js>>| {
        trampoline(ctx, key, args.0)
    })
    .and_then(|function| function.with_name(name))
    .map_err(conversion)?;

    Ok(function)
}

fn trampoline<'js>(ctx: Ctx<'js>, key: NativeKey, args: Vec<rquickjs::Value<'js>>) -> rquickjs::Result<rquickjs::Value<'js>> {
    let Some(realm) = RunContext::find(key.realm) else {
        let err = JSError::UnknownNativeFunction {
            realm: key.realm,
            slot: key.slot,
        };
        error!("quickjs: {err}");
        return Err(Exception::throw_message(&ctx, &err.to_string()));
    };

    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        match to_value(&ctx, &realm, arg) {
            Ok(value) => values.push(value),
            Err(e) => return Err(Exception::throw_message(&ctx, &e.to_string())),
        }
    }

    match invoke_native(&realm, key.slot, values) {
        Completion::Return(value) => {
            from_value(&ctx, &realm, &value).map_err(|e| Exception::throw_message(&ctx, &e.to_string()))
        }
        Completion::Throw(message) => Err(Exception::throw_message(&ctx, &message)),
    }
}
