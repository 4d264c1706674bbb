use std::rc::Rc;

use log::warn;
use v8::{HandleScope, Local};

use bastian_core::js::{Handle, JSError, RunContext, Value, ValueType};
use bastian_core::types::Result;
use bastian_core::Error;

use crate::v8::{new_object, V8Function};

/// Classifies a V8 value. Booleans, plain objects and symbols have no host counterpart and
/// become null.
pub fn to_value(scope: &mut HandleScope, realm: &Handle<RunContext>, value: Local<v8::Value>) -> Result<Handle<Value>> {
    if let Ok(number) = Local::<v8::Number>::try_from(value) {
        return Ok(Value::number(number.value()));
    }

    if value.is_string() {
        return Ok(Value::string(value.to_rust_string_lossy(scope)));
    }

    if let Ok(function) = Local::<v8::Function>::try_from(value) {
        let function = V8Function::new(scope, realm, function);
        return Ok(Value::function(Rc::new(function)));
    }

    if value.is_undefined() {
        return Ok(Value::undefined());
    }

    Ok(Value::null())
}

/// Extracts a host value into `realm`. Functions only cross back into the realm they came from.
pub fn from_value<'s>(
    scope: &mut HandleScope<'s>,
    realm: &Handle<RunContext>,
    value: &Value,
) -> Result<Local<'s, v8::Value>> {
    let value = match value.value_type() {
        ValueType::Null => v8::null(scope).into(),
        ValueType::Undefined => v8::undefined(scope).into(),
        ValueType::Number => v8::Number::new(scope, value.number_value()).into(),
        ValueType::String => v8_string(scope, value.as_str().unwrap_or_default())?.into(),
        ValueType::Function => {
            let function = value
                .as_script_function()
                .and_then(|function| function.as_any().downcast_ref::<V8Function>());

            match function {
                Some(function) if function.realm().id() == realm.id() => function.open(scope).into(),
                Some(function) => {
                    warn!(
                        "v8: function of realm {} cannot be used in realm {}",
                        function.realm().id(),
                        realm.id()
                    );
                    v8::undefined(scope).into()
                }
                None => {
                    warn!("v8: cannot extract a function from another backend");
                    v8::undefined(scope).into()
                }
            }
        }
        ValueType::Object => match value.as_namespace() {
            Some(namespace) => new_object(scope, realm, namespace)?.into(),
            None => v8::null(scope).into(),
        },
    };

    Ok(value)
}

pub fn v8_string<'s>(scope: &mut HandleScope<'s, ()>, value: &str) -> Result<Local<'s, v8::String>> {
    v8::String::new(scope, value).ok_or_else(|| {
        Error::JS(JSError::Conversion(format!(
            "failed to create a v8 string of {} bytes",
            value.len()
        )))
        .into()
    })
}
