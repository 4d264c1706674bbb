use core::fmt;
use std::any::Any;
use std::rc::Rc;

use crate::js::{ExportBuilder, Handle, Namespace, ValueType};
use crate::types::Result;

/// A javascript function that lives inside a backend realm. Implemented by the backends, the
/// core only stores it behind [`Value`] and forwards calls.
pub trait ScriptFunction {
    /// Name of the backend that owns the function, e.g. `"v8"`.
    fn backend(&self) -> &'static str;

    /// Calls the function with the realm's global object as receiver.
    fn call(&self, arguments: &[Handle<Value>]) -> Result<Handle<Value>>;

    fn as_any(&self) -> &dyn Any;
}

enum Kind {
    Null,
    Undefined,
    Number(f64),
    String(String),
    Function(Rc<dyn ScriptFunction>),
    Object(Namespace),
}

/// Host side representation of a javascript value.
///
/// Values are only created through the factory functions and are immutable afterwards.
/// Accessors that do not match the tag return a default instead of failing: `number_value()`
/// on a string is `-1`, `string_value()` on a number is empty.
pub struct Value {
    kind: Kind,
}

thread_local! {
    static NULL: Handle<Value> = Handle::new(Value { kind: Kind::Null });
    static UNDEFINED: Handle<Value> = Handle::new(Value { kind: Kind::Undefined });
}

impl Value {
    fn with_kind(kind: Kind) -> Handle<Self> {
        Handle::new(Self { kind })
    }

    /// The null sentinel. Every null value on a thread is this same instance.
    pub fn null() -> Handle<Self> {
        NULL.with(|null| Handle::clone(null))
    }

    /// The undefined sentinel.
    pub fn undefined() -> Handle<Self> {
        UNDEFINED.with(|undefined| Handle::clone(undefined))
    }

    pub fn number(value: f64) -> Handle<Self> {
        Self::with_kind(Kind::Number(value))
    }

    pub fn string(value: impl Into<String>) -> Handle<Self> {
        Self::with_kind(Kind::String(value.into()))
    }

    /// Builds a namespace object by running `generator` against a fresh builder. The object is
    /// realised on the backend each time it is handed to a script.
    pub fn object(generator: impl Fn(&mut ExportBuilder)) -> Handle<Self> {
        Self::with_kind(Kind::Object(Namespace::from_generator(&generator)))
    }

    pub fn from_namespace(namespace: Namespace) -> Handle<Self> {
        Self::with_kind(Kind::Object(namespace))
    }

    /// Wraps a backend function. Only backends create these.
    pub fn function(function: Rc<dyn ScriptFunction>) -> Handle<Self> {
        Self::with_kind(Kind::Function(function))
    }

    pub fn value_type(&self) -> ValueType {
        match self.kind {
            Kind::Null => ValueType::Null,
            Kind::Undefined => ValueType::Undefined,
            Kind::Number(_) => ValueType::Number,
            Kind::String(_) => ValueType::String,
            Kind::Function(_) => ValueType::Function,
            Kind::Object(_) => ValueType::Object,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, Kind::Function(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self.kind, Kind::Number(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, Kind::Null)
    }

    pub fn is_string(&self) -> bool {
        matches!(self.kind, Kind::String(_))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self.kind, Kind::Undefined)
    }

    pub fn is_object(&self) -> bool {
        matches!(self.kind, Kind::Object(_))
    }

    pub fn number_value(&self) -> f64 {
        match self.kind {
            Kind::Number(value) => value,
            _ => -1.0,
        }
    }

    pub fn string_value(&self) -> String {
        match &self.kind {
            Kind::String(value) => value.clone(),
            _ => String::new(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            Kind::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_script_function(&self) -> Option<&Rc<dyn ScriptFunction>> {
        match &self.kind {
            Kind::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_namespace(&self) -> Option<&Namespace> {
        match &self.kind {
            Kind::Object(namespace) => Some(namespace),
            _ => None,
        }
    }

    /// Calls a function value. Anything that is not callable is a no-op returning undefined.
    pub fn call_with(&self, arguments: &[Handle<Value>]) -> Result<Handle<Value>> {
        match &self.kind {
            Kind::Function(function) => function.call(arguments),
            _ => Ok(Self::undefined()),
        }
    }

    pub fn call(&self) -> Result<Handle<Value>> {
        self.call_with(&[])
    }
}

/// Formats a number the way `String(n)` does in script for the common cases.
fn fmt_number(value: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if value.is_nan() {
        f.write_str("NaN")
    } else if value.is_infinite() {
        f.write_str(if value > 0.0 { "Infinity" } else { "-Infinity" })
    } else if value == 0.0 {
        f.write_str("0")
    } else if value.fract() == 0.0 && value.abs() < 1e21 {
        write!(f, "{value:.0}")
    } else {
        write!(f, "{value}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Null => f.write_str("null"),
            Kind::Undefined => f.write_str("undefined"),
            Kind::Number(value) => fmt_number(*value, f),
            Kind::String(value) => f.write_str(value),
            Kind::Function(_) => f.write_str("[function]"),
            Kind::Object(_) => f.write_str("[object]"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Null => f.write_str("Null"),
            Kind::Undefined => f.write_str("Undefined"),
            Kind::Number(value) => f.debug_tuple("Number").field(value).finish(),
            Kind::String(value) => f.debug_tuple("String").field(value).finish(),
            Kind::Function(function) => f.debug_tuple("Function").field(&function.backend()).finish(),
            Kind::Object(namespace) => f.debug_tuple("Object").field(namespace).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn predicates(value: &Value) -> [bool; 6] {
        [
            value.is_function(),
            value.is_number(),
            value.is_null(),
            value.is_string(),
            value.is_undefined(),
            value.is_object(),
        ]
    }

    #[test_case(Value::null(), ValueType::Null; "null")]
    #[test_case(Value::undefined(), ValueType::Undefined; "undefined")]
    #[test_case(Value::number(42.0), ValueType::Number; "number")]
    #[test_case(Value::string("hello"), ValueType::String; "string")]
    #[test_case(Value::object(|obj| { obj.export("a", Value::number(1.0)); }), ValueType::Object; "object")]
    fn exactly_one_predicate_holds(value: Handle<Value>, expected: ValueType) {
        let hits = predicates(&value).iter().filter(|hit| **hit).count();
        assert_eq!(hits, 1);
        assert_eq!(value.value_type(), expected);
    }

    #[test]
    fn mismatched_accessors_degrade() {
        assert_eq!(Value::string("42").number_value(), -1.0);
        assert_eq!(Value::null().number_value(), -1.0);
        assert_eq!(Value::number(42.0).string_value(), "");
        assert_eq!(Value::number(42.0).as_str(), None);
    }

    #[test]
    fn payload_accessors() {
        assert_eq!(Value::number(42.5).number_value(), 42.5);
        assert_eq!(Value::string("héllo").string_value(), "héllo");
        assert_eq!(Value::string("héllo").as_str(), Some("héllo"));
    }

    #[test]
    fn null_and_undefined_are_sentinels() {
        assert!(Handle::ptr_eq(&Value::null(), &Value::null()));
        assert!(Handle::ptr_eq(&Value::undefined(), &Value::undefined()));
        assert!(!Handle::ptr_eq(&Value::null(), &Value::undefined()));
    }

    #[test]
    fn call_on_non_function_is_noop() {
        let result = Value::number(1.0).call().unwrap();
        assert!(result.is_undefined());

        let result = Value::string("f").call_with(&[Value::number(1.0)]).unwrap();
        assert!(result.is_undefined());
    }

    #[test_case(42.0, "42")]
    #[test_case(-0.0, "0")]
    #[test_case(1.5, "1.5")]
    #[test_case(f64::NAN, "NaN")]
    #[test_case(f64::NEG_INFINITY, "-Infinity")]
    fn numbers_display_like_script(value: f64, expected: &str) {
        assert_eq!(Value::number(value).to_string(), expected);
    }

    #[test]
    fn display_other_kinds() {
        assert_eq!(Value::null().to_string(), "null");
        assert_eq!(Value::undefined().to_string(), "undefined");
        assert_eq!(Value::string("text").to_string(), "text");
        assert_eq!(Value::object(|_| {}).to_string(), "[object]");
    }
}
