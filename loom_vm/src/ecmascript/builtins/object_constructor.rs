// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [20.1.2 Properties of the Object Constructor](https://tc39.es/ecma262/#sec-properties-of-the-object-constructor)

use super::{Builtin, argument};
use crate::ecmascript::{
    execution::{Agent, ExceptionType, JsResult, realm::RealmBuilder},
    types::{Behaviour, Object, Value},
};

pub(crate) struct ObjectConstructor;

impl Builtin for ObjectConstructor {
    const NAME: &'static str = "Object";
    const LENGTH: u32 = 1;
    const BEHAVIOUR: Behaviour = Behaviour::Constructor(ObjectConstructor::constructor);
}

struct ObjectKeys;
impl Builtin for ObjectKeys {
    const NAME: &'static str = "keys";
    const LENGTH: u32 = 1;
    const BEHAVIOUR: Behaviour = Behaviour::Regular(ObjectConstructor::keys);
}

impl ObjectConstructor {
    /// ### [20.1.1.1 Object ( \[ value \] )](https://tc39.es/ecma262/#sec-object-value)
    fn constructor(
        agent: &mut Agent,
        _this_value: Value,
        arguments: &[Value],
        _new_target: Option<Object>,
    ) -> JsResult<Value> {
        match argument(arguments, 0) {
            Value::Object(object) => Ok(Value::Object(object)),
            Value::Undefined | Value::Null => Ok(Value::Object(Object::create_ordinary(agent))),
            _ => Err(agent.throw_exception(
                ExceptionType::TypeError,
                "Primitive wrapper objects are not supported",
            )),
        }
    }

    /// ### [20.1.2.18 Object.keys ( O )](https://tc39.es/ecma262/#sec-object.keys)
    fn keys(agent: &mut Agent, _this_value: Value, arguments: &[Value]) -> JsResult<Value> {
        // 1. Let obj be ? ToObject(O).
        let object = match argument(arguments, 0) {
            Value::Object(object) => object,
            Value::Undefined | Value::Null => {
                return Err(agent.throw_exception(
                    ExceptionType::TypeError,
                    "Cannot convert undefined or null to object",
                ));
            }
            _ => return Ok(Value::Object(Object::create_array(agent, Vec::new()))),
        };
        // 2. Let keyList be ? EnumerableOwnProperties(obj, key).
        let keys = object
            .own_property_keys(agent)
            .into_iter()
            .map(Value::String)
            .collect();
        // 3. Return CreateArrayFromList(keyList).
        Ok(Value::Object(Object::create_array(agent, keys)))
    }

    pub(crate) fn create_intrinsic(builder: &mut RealmBuilder) -> Object {
        let constructor = builder.function::<ObjectConstructor>();
        builder.method::<ObjectKeys>(constructor);
        builder.link_constructor(constructor, builder.object_prototype);
        constructor
    }
}
