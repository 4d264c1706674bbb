use core::fmt::Display;
use std::rc::Rc;

use crate::js::{Handle, RunContext, Value};

/// Host callback exported to script.
pub type NativeFunction = Rc<dyn Fn(&mut FunctionContext)>;

/// What a native callback sees while it runs: the marshaled script arguments, the realm it was
/// called from, and a slot for its result or error.
pub struct FunctionContext {
    realm: Handle<RunContext>,
    args: Vec<Handle<Value>>,
    ret: Option<Handle<Value>>,
    error: Option<String>,
}

/// Result of a native call, handed back to the backend trampoline.
pub enum Completion {
    Return(Handle<Value>),
    Throw(String),
}

impl FunctionContext {
    pub fn new(realm: Handle<RunContext>, args: Vec<Handle<Value>>) -> Self {
        Self {
            realm,
            args,
            ret: None,
            error: None,
        }
    }

    /// Argument `index`, or undefined when the script passed fewer arguments.
    pub fn argument(&self, index: usize) -> Handle<Value> {
        self.args.get(index).cloned().unwrap_or_else(Value::undefined)
    }

    pub fn arguments(&self) -> &[Handle<Value>] {
        &self.args
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn realm(&self) -> &Handle<RunContext> {
        &self.realm
    }

    pub fn ret(&mut self, value: Handle<Value>) {
        self.ret = Some(value);
    }

    /// Throws an `Error` with this message into the calling script once the callback returns.
    pub fn error(&mut self, error: impl Display) {
        self.error = Some(error.to_string());
    }

    pub fn completion(self) -> Completion {
        match self.error {
            Some(message) => Completion::Throw(message),
            None => Completion::Return(self.ret.unwrap_or_else(Value::undefined)),
        }
    }
}

/// Runs the native registered under `slot` in `realm` with already marshaled arguments.
pub fn invoke_native(realm: &Handle<RunContext>, slot: u32, args: Vec<Handle<Value>>) -> Completion {
    let Some(function) = realm.native(slot) else {
        log::error!("realm {} has no native function in slot {slot}", realm.id());
        return Completion::Throw(format!("native function {slot} is not registered"));
    };

    let mut cb = FunctionContext::new(Handle::clone(realm), args);
    function(&mut cb);
    cb.completion()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn realm() -> Handle<RunContext> {
        RunContext::new("test", ())
    }

    #[test]
    fn missing_arguments_are_undefined() {
        let cb = FunctionContext::new(realm(), vec![Value::number(1.0)]);
        assert_eq!(cb.len(), 1);
        assert_eq!(cb.argument(0).number_value(), 1.0);
        assert!(cb.argument(1).is_undefined());
    }

    #[test]
    fn completion_defaults_to_undefined() {
        let cb = FunctionContext::new(realm(), Vec::new());
        assert!(cb.is_empty());
        assert!(matches!(cb.completion(), Completion::Return(v) if v.is_undefined()));
    }

    #[test]
    fn error_wins_over_return() {
        let mut cb = FunctionContext::new(realm(), Vec::new());
        cb.ret(Value::number(3.0));
        cb.error("boom");
        assert!(matches!(cb.completion(), Completion::Throw(msg) if msg == "boom"));
    }

    #[test]
    fn invoke_registered_native() {
        let realm = realm();
        let key = realm.register(Rc::new(|cb: &mut FunctionContext| {
            let doubled = cb.argument(0).number_value() * 2.0;
            cb.ret(Value::number(doubled));
        }));

        let completion = invoke_native(&realm, key.slot, vec![Value::number(21.0)]);
        assert!(matches!(completion, Completion::Return(v) if v.number_value() == 42.0));

        let missing = invoke_native(&realm, key.slot + 1, Vec::new());
        assert!(matches!(missing, Completion::Throw(_)));
    }
}
