use std::any::Any;

use log::{debug, error};
use v8::{ContextScope, FunctionCallbackArguments, Global, HandleScope, Local, ReturnValue, TryCatch};

use bastian_core::js::{
    invoke_native, Backend, Completion, Handle, JSError, NativeKey, RunContext, ScriptFunction, Value,
};
use bastian_core::types::Result;
use bastian_core::Error;

use crate::v8::{from_value, realm_state, report_exception, to_value, with_scope, LiveScope, V8Backend};

/// A script function held by the host.
pub struct V8Function {
    function: Global<v8::Function>,
    realm: Handle<RunContext>,
}

impl V8Function {
    pub fn new(scope: &mut HandleScope, realm: &Handle<RunContext>, function: Local<v8::Function>) -> Self {
        Self {
            function: Global::new(scope, function),
            realm: Handle::clone(realm),
        }
    }

    pub fn realm(&self) -> &Handle<RunContext> {
        &self.realm
    }

    pub(crate) fn open<'s>(&self, scope: &mut HandleScope<'s, ()>) -> Local<'s, v8::Function> {
        Local::new(scope, &self.function)
    }
}

impl ScriptFunction for V8Function {
    fn backend(&self) -> &'static str {
        V8Backend::NAME
    }

    fn call(&self, arguments: &[Handle<Value>]) -> Result<Handle<Value>> {
        debug!("v8: calling function of realm {} with {} arguments", self.realm.id(), arguments.len());

        let state = realm_state(&self.realm)?;
        let _current = RunContext::set_current(Handle::clone(&self.realm));

        with_scope(|scope| {
            let context = Local::new(scope, &state.context);
            let scope = &mut ContextScope::new(scope, context);
            let try_catch = &mut TryCatch::new(scope);

            let recv = context.global(try_catch).into();
            let function = self.open(try_catch);

            let mut args = Vec::with_capacity(arguments.len());
            for argument in arguments {
                args.push(from_value(try_catch, &self.realm, argument)?);
            }

            let Some(value) = function.call(try_catch, recv, &args) else {
                return Err(report_exception(try_catch).into());
            };

            to_value(try_catch, &self.realm, value)
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Creates the script side of a native function. The key travels in the function's data slot
/// and leads the trampoline back to the host callback.
pub fn new_native<'s>(
    scope: &mut HandleScope<'s>,
    name: Local<v8::String>,
    key: NativeKey,
) -> Result<Local<'s, v8::Function>> {
    let data = v8::BigInt::new_from_u64(scope, key.to_bits());

    let Some(function) = v8::Function::builder(trampoline).data(data.into()).build(scope) else {
        return Err(Error::JS(JSError::Initialize("failed to create function".to_owned())).into());
    };

    function.set_name(name);
    Ok(function)
}

fn trampoline(scope: &mut HandleScope, args: FunctionCallbackArguments, mut ret: ReturnValue) {
    let key = match Local::<v8::BigInt>::try_from(args.data()) {
        Ok(bits) => NativeKey::from_bits(bits.u64_value().0),
        Err(e) => {
            error!("v8: native function without key: {e}");
            throw_error(scope, &e.to_string());
            return;
        }
    };

    let Some(realm) = RunContext::find(key.realm) else {
        let err = JSError::UnknownNativeFunction {
            realm: key.realm,
            slot: key.slot,
        };
        error!("v8: {err}");
        throw_error(scope, &err.to_string());
        return;
    };

    let mut values = Vec::with_capacity(args.length() as usize);
    for i in 0..args.length() {
        match to_value(scope, &realm, args.get(i)) {
            Ok(value) => values.push(value),
            Err(e) => {
                throw_error(scope, &e.to_string());
                return;
            }
        }
    }

    let completion = {
        let _live = LiveScope::enter(scope);
        invoke_native(&realm, key.slot, values)
    };

    match completion {
        Completion::Return(value) => match from_value(scope, &realm, &value) {
            Ok(value) => ret.set(value),
            Err(e) => throw_error(scope, &e.to_string()),
        },
        Completion::Throw(message) => throw_error(scope, &message),
    }
}

fn throw_error(scope: &mut HandleScope, message: &str) {
    let Some(message) = v8::String::new(scope, message) else {
        error!("v8: failed to create exception string\nexception was: {message}");
        return;
    };

    let exception = v8::Exception::error(scope, message);
    scope.throw_exception(exception);
}
