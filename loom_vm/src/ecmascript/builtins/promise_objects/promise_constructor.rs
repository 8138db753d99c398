// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [27.2.3 The Promise Constructor](https://tc39.es/ecma262/#sec-promise-constructor)

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use super::{
    PromiseCapability,
    promise_abstract_operations::{PromiseReactionHandler, inner_promise_then, promise_resolve},
};
use crate::{
    ecmascript::{
        builtins::{Builtin, argument},
        execution::{Agent, ExceptionType, JsResult, realm::RealmBuilder},
        types::{Behaviour, BuiltinFunction, Object, ObjectKind, Value},
    },
    engine::vm::call_function,
};

pub(crate) struct PromiseConstructor;

impl Builtin for PromiseConstructor {
    const NAME: &'static str = "Promise";
    const LENGTH: u32 = 1;
    const BEHAVIOUR: Behaviour = Behaviour::Constructor(PromiseConstructor::constructor);
}

struct PromiseAll;
impl Builtin for PromiseAll {
    const NAME: &'static str = "all";
    const LENGTH: u32 = 1;
    const BEHAVIOUR: Behaviour = Behaviour::Regular(PromiseConstructor::all);
}

struct PromiseReject;
impl Builtin for PromiseReject {
    const NAME: &'static str = "reject";
    const LENGTH: u32 = 1;
    const BEHAVIOUR: Behaviour = Behaviour::Regular(PromiseConstructor::reject);
}

struct PromiseResolve;
impl Builtin for PromiseResolve {
    const NAME: &'static str = "resolve";
    const LENGTH: u32 = 1;
    const BEHAVIOUR: Behaviour = Behaviour::Regular(PromiseConstructor::resolve);
}

/// ### [27.2.4.1.3 PerformPromiseAll ( iteratorRecord, constructor, resultCapability, promiseResolve )](https://tc39.es/ecma262/#sec-performpromiseall)
///
/// The values list and remaining elements counter shared by the element
/// functions of one `Promise.all` call.
#[derive(Debug)]
pub(crate) struct PromiseAllRecord {
    pub(crate) capability: PromiseCapability,
    values: RefCell<Vec<Value>>,
    remaining_elements: Cell<usize>,
}

impl PromiseAllRecord {
    /// ### [27.2.4.1.3 Promise.all Resolve Element Functions](https://tc39.es/ecma262/#sec-promise.all-resolve-element-functions)
    pub(crate) fn on_fulfilled(&self, agent: &mut Agent, index: usize, value: Value) {
        // 8. Set values[index] to x.
        self.values.borrow_mut()[index] = value;
        // 9. Set remainingElementsCount.[[Value]] to remainingElementsCount.[[Value]] - 1.
        self.decrement(agent);
    }

    fn decrement(&self, agent: &mut Agent) {
        let remaining = self.remaining_elements.get() - 1;
        self.remaining_elements.set(remaining);
        // 10. If remainingElementsCount.[[Value]] = 0, then
        if remaining == 0 {
            // a. Let valuesArray be CreateArrayFromList(values).
            let values = self.values.take();
            let values_array = Object::create_array(agent, values);
            // b. Return ? Call(promiseCapability.[[Resolve]], undefined, « valuesArray »).
            self.capability.resolve(agent, Value::Object(values_array));
        }
    }
}

impl PromiseConstructor {
    /// ### [27.2.3.1 Promise ( executor )](https://tc39.es/ecma262/#sec-promise-executor)
    fn constructor(
        agent: &mut Agent,
        _this_value: Value,
        arguments: &[Value],
        new_target: Option<Object>,
    ) -> JsResult<Value> {
        // 1. If NewTarget is undefined, throw a TypeError exception.
        if new_target.is_none() {
            return Err(agent.throw_exception(
                ExceptionType::TypeError,
                "Promise constructor cannot be invoked without 'new'",
            ));
        }
        // 2. If IsCallable(executor) is false, throw a TypeError exception.
        let executor = argument(arguments, 0);
        if !executor.is_callable(agent) {
            return Err(agent.throw_exception(
                ExceptionType::TypeError,
                "Promise resolver is not a function",
            ));
        }
        // 3. Let promise be ? OrdinaryCreateFromConstructor(NewTarget, "%Promise.prototype%", « [[PromiseState]], [[PromiseResult]], [[PromiseFulfillReactions]], [[PromiseRejectReactions]], [[PromiseIsHandled]] »).
        // 4-7. Set the promise internal slots.
        let capability = PromiseCapability::new(agent);
        // 8. Let resolvingFunctions be CreateResolvingFunctions(promise).
        let resolve_function = Object::create_promise_resolving_function(
            agent,
            BuiltinFunction::PromiseResolve(capability),
        );
        let reject_function = Object::create_promise_resolving_function(
            agent,
            BuiltinFunction::PromiseReject(capability),
        );
        // 9. Let completion be Completion(Call(executor, undefined, « resolvingFunctions.[[Resolve]], resolvingFunctions.[[Reject]] »)).
        let completion = call_function(
            agent,
            &executor,
            Value::Undefined,
            &[Value::Object(resolve_function), Value::Object(reject_function)],
        );
        // 10. If completion is an abrupt completion, then
        if let Err(error) = completion {
            if error.is_interrupt() {
                return Err(error);
            }
            // a. Perform ? Call(resolvingFunctions.[[Reject]], undefined, « completion.[[Value]] »).
            capability.reject(agent, error.into_value());
        }
        // 11. Return promise.
        Ok(capability.promise().into())
    }

    /// ### [27.2.4.1 Promise.all ( iterable )](https://tc39.es/ecma262/#sec-promise.all)
    ///
    /// Only arrays are accepted as the iterable.
    fn all(agent: &mut Agent, _this_value: Value, arguments: &[Value]) -> JsResult<Value> {
        let elements = argument(arguments, 0)
            .as_object()
            .and_then(|object| match &agent[object].kind {
                ObjectKind::Array(elements) => Some(elements.clone()),
                _ => None,
            });
        let Some(elements) = elements else {
            return Err(agent.throw_exception(
                ExceptionType::TypeError,
                "Promise.all requires an array",
            ));
        };
        // 2. Let promiseCapability be ? NewPromiseCapability(C).
        let capability = PromiseCapability::new(agent);
        let record = Rc::new(PromiseAllRecord {
            capability,
            values: RefCell::new(vec![Value::Undefined; elements.len()]),
            remaining_elements: Cell::new(1),
        });
        for (index, element) in elements.into_iter().enumerate() {
            // h. Let nextPromise be ? Call(promiseResolve, constructor, « next »).
            let next_promise = promise_resolve(agent, element);
            record
                .remaining_elements
                .set(record.remaining_elements.get() + 1);
            // r. Perform ? Invoke(nextPromise, "then", « onFulfilled, resultCapability.[[Reject]] »).
            inner_promise_then(
                agent,
                next_promise,
                PromiseReactionHandler::PromiseAll {
                    index,
                    record: record.clone(),
                },
                PromiseReactionHandler::PromiseAll {
                    index,
                    record: record.clone(),
                },
                None,
            );
        }
        // iii. Set remainingElementsCount.[[Value]] to remainingElementsCount.[[Value]] - 1.
        record.decrement(agent);
        Ok(capability.promise().into())
    }

    /// ### [27.2.4.6 Promise.reject ( r )](https://tc39.es/ecma262/#sec-promise.reject)
    fn reject(agent: &mut Agent, _this_value: Value, arguments: &[Value]) -> JsResult<Value> {
        // 2. Let promiseCapability be ? NewPromiseCapability(C).
        let capability = PromiseCapability::new(agent);
        // 3. Perform ? Call(promiseCapability.[[Reject]], undefined, « r »).
        capability.reject(agent, argument(arguments, 0));
        // 4. Return promiseCapability.[[Promise]].
        Ok(capability.promise().into())
    }

    /// ### [27.2.4.7 Promise.resolve ( x )](https://tc39.es/ecma262/#sec-promise.resolve)
    fn resolve(agent: &mut Agent, _this_value: Value, arguments: &[Value]) -> JsResult<Value> {
        Ok(promise_resolve(agent, argument(arguments, 0)).into())
    }

    pub(crate) fn create_intrinsic(builder: &mut RealmBuilder, prototype: Object) -> Object {
        let constructor = builder.function::<PromiseConstructor>();
        builder.method::<PromiseAll>(constructor);
        builder.method::<PromiseReject>(constructor);
        builder.method::<PromiseResolve>(constructor);
        builder.link_constructor(constructor, prototype);
        constructor
    }
}
