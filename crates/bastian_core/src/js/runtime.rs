use std::rc::Rc;

use log::debug;

use crate::config::EngineConfig;
use crate::js::{ExportBuilder, Generator, Handle, Namespace, RunContext, Value};
use crate::types::Result;

// trait around the main JS engine (e.g V8, QuickJS, JSC, etc.)
pub trait Backend: Sized + 'static {
    const NAME: &'static str;

    fn new(config: &EngineConfig) -> Self;

    /// Creates a new realm whose global object carries everything in `namespace`.
    fn create_realm(&self, namespace: &Namespace) -> Result<Handle<RunContext>>;

    /// Compiles and runs `source` inside `realm`. The realm is current while this runs.
    fn execute(&self, realm: &Handle<RunContext>, source: &str) -> Result<Handle<Value>>;
}

/// Runs scripts against a namespace rebuilt for every run.
pub struct Engine<B: Backend> {
    backend: B,
    config: EngineConfig,
    generator: Generator,
}

impl<B: Backend> Engine<B> {
    pub fn new(generator: impl Fn(&mut ExportBuilder) + 'static) -> Handle<Self> {
        Self::with_config(EngineConfig::default(), generator)
    }

    pub fn with_config(config: EngineConfig, generator: impl Fn(&mut ExportBuilder) + 'static) -> Handle<Self> {
        Handle::new(Self {
            backend: B::new(&config),
            config,
            generator: Rc::new(generator),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Runs `source` in a fresh realm and returns its completion value. Globals declared by the
    /// script do not survive into the next run.
    pub fn run(&self, source: &str) -> Result<Handle<Value>> {
        let namespace = Namespace::from_generator(&*self.generator);
        let realm = self.backend.create_realm(&namespace)?;

        debug!(
            "{}: running {} bytes in realm {} (depth {})",
            B::NAME,
            source.len(),
            realm.id(),
            RunContext::depth()
        );

        let _current = RunContext::set_current(Handle::clone(&realm));
        self.backend.execute(&realm, source)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;
    use crate::js::{invoke_native, Completion, Export, FunctionContext, JSError, NativeKey};
    use crate::Error;

    /// A tiny stand-in engine: `name` reads a global, `name(arg)` calls a native, and
    /// `var name = 1` declares a global.
    struct MockBackend;

    enum Global {
        Value(Handle<Value>),
        Native(NativeKey),
    }

    struct MockRealm {
        globals: RefCell<HashMap<String, Global>>,
    }

    impl Backend for MockBackend {
        const NAME: &'static str = "mock";

        fn new(_config: &EngineConfig) -> Self {
            Self
        }

        fn create_realm(&self, namespace: &Namespace) -> Result<Handle<RunContext>> {
            let realm = RunContext::new(
                Self::NAME,
                MockRealm {
                    globals: RefCell::new(HashMap::new()),
                },
            );

            let mut globals = HashMap::new();
            for (name, export) in namespace.iter() {
                let global = match export {
                    Export::Value(value) => Global::Value(Handle::clone(value)),
                    Export::Function(function) => Global::Native(realm.register(Rc::clone(function))),
                    Export::Namespace(ns) => Global::Value(Value::from_namespace(ns.clone())),
                };
                globals.insert(name.to_owned(), global);
            }

            if let Some(state) = realm.state::<MockRealm>() {
                *state.globals.borrow_mut() = globals;
            }

            Ok(realm)
        }

        fn execute(&self, realm: &Handle<RunContext>, source: &str) -> Result<Handle<Value>> {
            let state = realm
                .state::<MockRealm>()
                .ok_or_else(|| Error::JS(JSError::Execution("foreign realm".to_owned())))?;

            if let Some(decl) = source.strip_prefix("var ") {
                let (name, value) = decl
                    .split_once(" = ")
                    .ok_or_else(|| Error::JS(JSError::Compile(source.to_owned())))?;
                let value = Value::number(value.parse()?);
                state.globals.borrow_mut().insert(name.to_owned(), Global::Value(value));
                return Ok(Value::undefined());
            }

            if let Some((name, rest)) = source.split_once('(') {
                let arg = rest.trim_end_matches(')');
                let arg = match arg.parse::<f64>() {
                    Ok(number) => Value::number(number),
                    Err(_) => self.execute(realm, arg)?,
                };

                let key = match state.globals.borrow().get(name) {
                    Some(Global::Native(key)) => *key,
                    _ => return Err(Error::JS(JSError::Exception(format!("{name} is not a function"))).into()),
                };

                let owner = RunContext::find(key.realm).ok_or(Error::JS(JSError::UnknownNativeFunction {
                    realm: key.realm,
                    slot: key.slot,
                }))?;

                return match invoke_native(&owner, key.slot, vec![arg]) {
                    Completion::Return(value) => Ok(value),
                    Completion::Throw(message) => Err(Error::JS(JSError::Exception(message)).into()),
                };
            }

            match state.globals.borrow().get(source) {
                Some(Global::Value(value)) => Ok(Handle::clone(value)),
                Some(Global::Native(_)) => Ok(Value::null()),
                None => Ok(Value::undefined()),
            }
        }
    }

    type MockEngine = Engine<MockBackend>;

    fn global(obj: &mut ExportBuilder) {
        obj.export("foobar", Value::number(42.0));
        obj.export_fn("double", |cb| {
            let value = cb.argument(0).number_value();
            cb.ret(Value::number(value * 2.0));
        });
    }

    #[test]
    fn run_returns_exported_value() {
        let engine = MockEngine::new(global);
        let result = engine.run("foobar").unwrap();
        assert!(result.is_number());
        assert_eq!(result.number_value(), 42.0);
    }

    #[test]
    fn native_call_through_realm() {
        let engine = MockEngine::new(global);
        assert_eq!(engine.run("double(21)").unwrap().number_value(), 42.0);
        assert_eq!(engine.run("double(foobar)").unwrap().number_value(), 84.0);
    }

    #[test]
    fn runs_do_not_share_globals() {
        let engine = MockEngine::new(global);
        assert!(engine.run("var leaked = 1").unwrap().is_undefined());
        assert!(engine.run("leaked").unwrap().is_undefined());
    }

    #[test]
    fn realm_is_current_only_while_running() {
        let seen = Rc::new(RefCell::new(Vec::new()));

        let engine = MockEngine::new({
            let seen = Rc::clone(&seen);
            move |obj| {
                let seen = Rc::clone(&seen);
                obj.export_fn("probe", move |cb: &mut FunctionContext| {
                    let current = RunContext::current().map(|ctx| ctx.id());
                    seen.borrow_mut().push((current, cb.realm().id()));
                });
            }
        });

        engine.run("probe(0)").unwrap();
        engine.run("probe(0)").unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        for (current, realm) in seen.iter() {
            assert_eq!(*current, Some(*realm));
        }
        assert_ne!(seen[0].1, seen[1].1);
        assert!(RunContext::current().is_none());
    }

    #[test]
    fn nested_run_restores_outer_context() {
        let inner = MockEngine::new(global);
        let after_nested = Rc::new(RefCell::new(None));

        let outer = MockEngine::new({
            let after_nested = Rc::clone(&after_nested);
            move |obj| {
                let inner = Handle::clone(&inner);
                let after_nested = Rc::clone(&after_nested);
                obj.export_fn("nested", move |cb: &mut FunctionContext| {
                    let value = inner.run("double(5)").unwrap();
                    *after_nested.borrow_mut() = RunContext::current().map(|ctx| ctx.id() == cb.realm().id());
                    cb.ret(value);
                });
            }
        });

        let result = outer.run("nested(0)").unwrap();
        assert_eq!(result.number_value(), 10.0);
        assert_eq!(*after_nested.borrow(), Some(true));
    }

    #[test]
    fn native_errors_surface() {
        let engine = MockEngine::new(|obj| {
            obj.export_fn("fail", |cb| cb.error("nope"));
        });

        let err = engine.run("fail(1)").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::JS(JSError::Exception(message))) if message == "nope"
        ));
    }
}
