use log::warn;
use rquickjs::Ctx;

use bastian_core::js::{Handle, RunContext, Value, ValueType};
use bastian_core::types::Result;

use crate::quickjs::{conversion, new_object, QuickJsFunction};

/// Classifies a QuickJS value. Booleans, plain objects and symbols have no host counterpart and
/// become null.
pub fn to_value<'js>(ctx: &Ctx<'js>, realm: &Handle<RunContext>, value: rquickjs::Value<'js>) -> Result<Handle<Value>> {
    if let Some(number) = value.as_number() {
        return Ok(Value::number(number));
    }

    if let Some(string) = value.as_string() {
        return Ok(Value::string(rust_string(ctx, string)?));
    }

    if let Some(function) = value.as_function() {
        let function = QuickJsFunction::new(ctx, realm, function.clone());
        return Ok(Value::function(std::rc::Rc::new(function)));
    }

    if value.is_undefined() {
        return Ok(Value::undefined());
    }

    Ok(Value::null())
}

// Replaces unpaired surrogates with U+FFFD, one per code unit.
const WELL_FORMED: &str = r"(function (s) {
    return s.replace(/[\uD800-\uDBFF](?![\uDC00-\uDFFF])|(?<![\uD800-\uDBFF])[\uDC00-\uDFFF]/g, '\uFFFD');
})";

/// Copies a script string. Strings holding unpaired surrogates are not valid UTF-8 and are
/// copied with replacement characters instead.
fn rust_string<'js>(ctx: &Ctx<'js>, string: &rquickjs::String<'js>) -> Result<String> {
    if let Ok(string) = string.to_string() {
        return Ok(string);
    }

    let well_formed: rquickjs::Function = ctx.eval(WELL_FORMED).map_err(conversion)?;
    let string: rquickjs::String = well_formed.call((string.clone(),)).map_err(conversion)?;
    string.to_string().map_err(conversion)
}

/// Extracts a host value into `realm`. Functions only cross back into the realm they came from.
pub fn from_value<'js>(ctx: &Ctx<'js>, realm: &Handle<RunContext>, value: &Value) -> Result<rquickjs::Value<'js>> {
    let value = match value.value_type() {
        ValueType::Null => rquickjs::Value::new_null(ctx.clone()),
        ValueType::Undefined => rquickjs::Value::new_undefined(ctx.clone()),
        ValueType::Number => match value.number_value() {
            // new_number would store -0 as the integer 0
            zero if zero == 0.0 && zero.is_sign_negative() => rquickjs::Value::new_float(ctx.clone(), zero),
            number => rquickjs::Value::new_number(ctx.clone(), number),
        },
        ValueType::String => {
            let string = rquickjs::String::from_str(ctx.clone(), value.as_str().unwrap_or_default())
                .map_err(conversion)?;
            string.into_value()
        }
        ValueType::Function => {
            let function = value
                .as_script_function()
                .and_then(|function| function.as_any().downcast_ref::<QuickJsFunction>());

            match function {
                Some(function) if function.realm().id() == realm.id() => function.restore(ctx)?.into_value(),
                Some(function) => {
                    warn!(
                        "quickjs: function of realm {} cannot be used in realm {}",
                        function.realm().id(),
                        realm.id()
                    );
                    rquickjs::Value::new_undefined(ctx.clone())
                }
                None => {
                    warn!("quickjs: cannot extract a function from another backend");
                    rquickjs::Value::new_undefined(ctx.clone())
                }
            }
        }
        ValueType::Object => match value.as_namespace() {
            Some(namespace) => new_object(ctx, realm, namespace)?.into_value(),
            None => rquickjs::Value::new_null(ctx.clone()),
        },
    };

    Ok(value)
}
