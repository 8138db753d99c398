// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [23.1 Array Objects](https://tc39.es/ecma262/#sec-array-objects)

use super::Builtin;
use crate::ecmascript::{
    execution::{Agent, ExceptionType, JsResult, realm::RealmBuilder},
    types::{Behaviour, Object, ObjectKind, Value},
};

pub(crate) struct ArrayPrototype;

struct ArrayPrototypePush;
impl Builtin for ArrayPrototypePush {
    const NAME: &'static str = "push";
    const LENGTH: u32 = 1;
    const BEHAVIOUR: Behaviour = Behaviour::Regular(ArrayPrototype::push);
}

impl ArrayPrototype {
    /// ### [23.1.3.23 Array.prototype.push ( ...items )](https://tc39.es/ecma262/#sec-array.prototype.push)
    fn push(agent: &mut Agent, this_value: Value, items: &[Value]) -> JsResult<Value> {
        if let Some(object) = this_value.as_object()
            && let ObjectKind::Array(elements) = &mut agent[object].kind
        {
            elements.extend_from_slice(items);
            return Ok(Value::Number(elements.len() as f64));
        }
        Err(agent.throw_exception(
            ExceptionType::TypeError,
            "Array.prototype.push called on a non-array",
        ))
    }

    pub(crate) fn create_intrinsic(builder: &mut RealmBuilder) -> Object {
        let prototype = builder.ordinary_object(Some(builder.object_prototype));
        builder.method::<ArrayPrototypePush>(prototype);
        prototype
    }
}
