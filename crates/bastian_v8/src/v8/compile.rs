use v8::{ContextScope, Local, Script, TryCatch};

use bastian_core::js::{Handle, RunContext, Value};
use bastian_core::types::Result;

use crate::v8::{realm_state, report_exception, to_value, v8_string, with_scope};

/// Compiles `source` in the context of `realm` and runs it.
pub fn run_script(realm: &Handle<RunContext>, source: &str) -> Result<Handle<Value>> {
    let state = realm_state(realm)?;

    with_scope(|scope| {
        let context = Local::new(scope, &state.context);
        let scope = &mut ContextScope::new(scope, context);
        let try_catch = &mut TryCatch::new(scope);

        let code = v8_string(try_catch, source)?;

        let Some(script) = Script::compile(try_catch, code, None) else {
            return Err(report_exception(try_catch).into());
        };

        let Some(value) = script.run(try_catch) else {
            return Err(report_exception(try_catch).into());
        };

        to_value(try_catch, realm, value)
    })
}
