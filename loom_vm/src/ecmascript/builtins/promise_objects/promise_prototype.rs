// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [27.2.5 Properties of the Promise Prototype Object](https://tc39.es/ecma262/#sec-properties-of-the-promise-prototype-object)

use super::{Promise, PromiseCapability, promise_abstract_operations::perform_promise_then};
use crate::{
    ecmascript::{
        builtins::{Builtin, argument},
        execution::{Agent, ExceptionType, JsResult, realm::RealmBuilder},
        types::{Behaviour, Object, Value},
    },
    engine::vm::call_function,
};

pub(crate) struct PromisePrototype;

struct PromisePrototypeCatch;
impl Builtin for PromisePrototypeCatch {
    const NAME: &'static str = "catch";
    const LENGTH: u32 = 1;
    const BEHAVIOUR: Behaviour = Behaviour::Regular(PromisePrototype::catch);
}

struct PromisePrototypeThen;
impl Builtin for PromisePrototypeThen {
    const NAME: &'static str = "then";
    const LENGTH: u32 = 2;
    const BEHAVIOUR: Behaviour = Behaviour::Regular(PromisePrototype::then);
}

impl PromisePrototype {
    /// ### [27.2.5.1 Promise.prototype.catch ( onRejected )](https://tc39.es/ecma262/#sec-promise.prototype.catch)
    fn catch(agent: &mut Agent, this_value: Value, arguments: &[Value]) -> JsResult<Value> {
        // 1. Let promise be the this value.
        // 2. Return ? Invoke(promise, "then", « undefined, onRejected »).
        let Some(object) = this_value.as_object() else {
            return Err(agent.throw_exception(
                ExceptionType::TypeError,
                "Promise.prototype.catch called on a non-object",
            ));
        };
        let then = object.get(agent, "then")?;
        call_function(
            agent,
            &then,
            this_value,
            &[Value::Undefined, argument(arguments, 0)],
        )
    }

    /// ### [27.2.5.4 Promise.prototype.then ( onFulfilled, onRejected )](https://tc39.es/ecma262/#sec-promise.prototype.then)
    fn then(agent: &mut Agent, this_value: Value, arguments: &[Value]) -> JsResult<Value> {
        // 1. Let promise be the this value.
        // 2. If IsPromise(promise) is false, throw a TypeError exception.
        let Some(promise) = Promise::from_value(agent, &this_value) else {
            return Err(agent.throw_exception(
                ExceptionType::TypeError,
                "Promise.prototype.then called on a non-promise",
            ));
        };
        // 3. Let C be ? SpeciesConstructor(promise, %Promise%).
        // 4. Let resultCapability be ? NewPromiseCapability(C).
        let result_capability = PromiseCapability::new(agent);
        // 5. Return PerformPromiseThen(promise, onFulfilled, onRejected, resultCapability).
        perform_promise_then(
            agent,
            promise,
            argument(arguments, 0),
            argument(arguments, 1),
            Some(result_capability),
        );
        Ok(result_capability.promise().into())
    }

    pub(crate) fn create_intrinsic(builder: &mut RealmBuilder) -> Object {
        let prototype = builder.ordinary_object(Some(builder.object_prototype));
        builder.method::<PromisePrototypeCatch>(prototype);
        builder.method::<PromisePrototypeThen>(prototype);
        prototype
    }
}
