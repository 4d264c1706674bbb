use std::rc::Rc;

use v8::{ContextScope, Global, HandleScope, Local, Object, StackFrame, StackTrace, TryCatch};

use bastian_core::js::{Backend, Export, Handle, JSError, Namespace, RunContext};
use bastian_core::types::Result;
use bastian_core::Error;

use crate::v8::{from_value, new_native, v8_string, with_scope, V8Backend, V8Realm};

/// Creates a new context whose global object carries `namespace`.
pub fn new_realm(namespace: &Namespace) -> Result<Handle<RunContext>> {
    with_scope(|scope| {
        let context = v8::Context::new(scope);
        let realm = RunContext::new(
            V8Backend::NAME,
            V8Realm {
                context: Global::new(scope, context),
            },
        );

        let scope = &mut ContextScope::new(scope, context);
        let global = context.global(scope);
        install(scope, &realm, global, namespace)?;

        Ok(realm)
    })
}

/// Copies every export of `namespace` onto `target`. Native functions are registered in `realm`.
pub fn install<'s>(
    scope: &mut HandleScope<'s>,
    realm: &Handle<RunContext>,
    target: Local<'s, Object>,
    namespace: &Namespace,
) -> Result<()> {
    for (name, export) in namespace.iter() {
        let key = v8_string(scope, name)?;

        let value = match export {
            Export::Value(value) => from_value(scope, realm, value)?,
            Export::Function(function) => {
                let native = realm.register(Rc::clone(function));
                new_native(scope, key, native)?.into()
            }
            Export::Namespace(namespace) => new_object(scope, realm, namespace)?.into(),
        };

        if target.set(scope, key.into(), value).is_none() {
            return Err(Error::JS(JSError::Conversion(format!("failed to export {name}"))).into());
        }
    }

    Ok(())
}

/// Realises `namespace` as a new plain object.
pub fn new_object<'s>(
    scope: &mut HandleScope<'s>,
    realm: &Handle<RunContext>,
    namespace: &Namespace,
) -> Result<Local<'s, Object>> {
    let object = Object::new(scope);
    install(scope, realm, object, namespace)?;
    Ok(object)
}

/// Turns the caught exception into an error carrying its message and stack trace. A
/// `SyntaxError` is reported as a compile error, anything else as an exception.
pub fn report_exception(try_catch: &mut TryCatch<HandleScope>) -> Error {
    let Some(exception) = try_catch.exception() else {
        return Error::JS(JSError::Exception("execution was terminated".to_owned()));
    };

    let name = exception_name(try_catch, exception);
    let mut err = exception.to_rust_string_lossy(try_catch);

    if let Some(message) = try_catch.message() {
        let text = message.get(try_catch).to_rust_string_lossy(try_catch);
        err.push_str(&format!("\nMessage: {text}"));

        match message.get_stack_trace(try_catch) {
            Some(trace) if trace.get_frame_count() > 0 => {
                err.push_str("\nStacktrace:\n");
                err.push_str(&stack_trace(try_catch, trace));
            }
            _ => err.push_str("\nStacktrace: <missing information>"),
        }
    }

    if name.as_deref() == Some("SyntaxError") {
        Error::JS(JSError::Compile(err))
    } else {
        Error::JS(JSError::Exception(err))
    }
}

fn exception_name(scope: &mut HandleScope, exception: Local<v8::Value>) -> Option<String> {
    let object = exception.to_object(scope)?;
    let key = v8::String::new(scope, "name")?;
    let name = object.get(scope, key.into())?;
    Some(name.to_rust_string_lossy(scope))
}

fn stack_trace(scope: &mut HandleScope, trace: Local<StackTrace>) -> String {
    (0..trace.get_frame_count())
        .map(|index| match trace.get_frame(scope, index) {
            Some(frame) => stack_frame(scope, frame),
            None => "    at <missing information>".to_owned(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn stack_frame(scope: &mut HandleScope, frame: Local<StackFrame>) -> String {
    let function = frame
        .get_function_name(scope)
        .map(|name| name.to_rust_string_lossy(scope))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "<anonymous>".to_owned());
    let script = frame
        .get_script_name_or_source_url(scope)
        .map(|name| name.to_rust_string_lossy(scope))
        .unwrap_or_else(|| "<script>".to_owned());

    format!("    at {function} ({script}:{}:{})", frame.get_line_number(), frame.get_column())
}

#[cfg(test)]
mod tests {
    use bastian_core::config::EngineConfig;
    use bastian_core::js::{Engine, ExportBuilder, Value};

    use super::*;

    type V8Engine = Engine<V8Backend>;

    #[test]
    fn nested_namespaces() {
        let engine = V8Engine::new(|obj| {
            obj.export_object("util", |util| {
                util.export("name", Value::string("util"));
                util.export_object("math", |math| {
                    math.export_fn("square", |cb| {
                        let n = cb.argument(0).number_value();
                        cb.ret(Value::number(n * n));
                    });
                });
            });
        });

        assert_eq!(engine.run("util.name").unwrap().string_value(), "util");
        assert_eq!(engine.run("util.math.square(7)").unwrap().number_value(), 49.0);
    }

    #[test]
    fn natives_are_registered_per_realm() {
        let namespace = Namespace::from_generator(&|obj: &mut ExportBuilder| {
            obj.export_fn("one", |_| {});
            obj.export_object("ns", |ns| {
                ns.export_fn("two", |_| {});
            });
        });

        let backend = V8Backend::new(&EngineConfig::default());
        let first = backend.create_realm(&namespace).unwrap();
        let second = backend.create_realm(&namespace).unwrap();

        assert_eq!(first.native_count(), 2);
        assert_eq!(second.native_count(), 2);
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn natives_have_names() {
        let engine = V8Engine::new(|obj| {
            obj.export_fn("collect", |_| {});
        });

        assert_eq!(engine.run("collect.name").unwrap().string_value(), "collect");
    }

    #[test]
    fn exception_report_has_stacktrace() {
        let engine = V8Engine::new(|_| {});
        let err = engine
            .run("function inner() { throw new Error('deep'); }\nfunction outer() { inner(); }\nouter();")
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("Error: deep"), "{message}");
        assert!(message.contains("Message: Uncaught Error: deep"), "{message}");
    }

    #[test]
    fn syntax_errors_are_compile_errors() {
        let engine = V8Engine::new(|_| {});

        let err = engine.run("let = ;").unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::JS(JSError::Compile(_)))));

        let err = engine.run("eval('(')").unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::JS(JSError::Compile(_)))));

        let err = engine.run("null.field").unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::JS(JSError::Exception(_)))));
    }
}
