use std::rc::Rc;

use rquickjs::{Ctx, Object};

use bastian_core::js::{Export, Handle, Namespace, RunContext};
use bastian_core::types::Result;

use crate::quickjs::{conversion, from_value, new_native};

/// Copies every export of `namespace` onto `target`. Native functions are registered in `realm`.
pub fn install<'js>(ctx: &Ctx<'js>, realm: &Handle<RunContext>, target: &Object<'js>, namespace: &Namespace) -> Result<()> {
    for (name, export) in namespace.iter() {
        let value = match export {
            Export::Value(value) => from_value(ctx, realm, value)?,
            Export::Function(function) => {
                let key = realm.register(Rc::clone(function));
                new_native(ctx, name, key)?.into_value()
            }
            Export::Namespace(namespace) => new_object(ctx, realm, namespace)?.into_value(),
        };

        target.set(name, value).map_err(conversion)?;
    }

    Ok(())
}

/// Realises `namespace` as a new plain object.
pub fn new_object<'js>(ctx: &Ctx<'js>, realm: &Handle<RunContext>, namespace: &Namespace) -> Result<Object<'js>> {
    let object = Object::new(ctx.clone()).map_err(conversion)?;
    install(ctx, realm, &object, namespace)?;
    Ok(object)
}
