// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [27.2.2 Promise Jobs](https://tc39.es/ecma262/#sec-promise-jobs)

use super::{
    Promise, PromiseCapability,
    promise_abstract_operations::{PromiseReaction, PromiseReactionHandler, PromiseReactionType},
};
use crate::{
    ecmascript::{
        execution::{Agent, JsError, JsResult},
        scripts_and_modules::module::{
            continue_dynamic_import,
            module_semantics::cyclic_module_records::{
                async_module_execution_fulfilled, async_module_execution_rejected,
            },
        },
        types::{BuiltinFunction, Object, Value},
    },
    engine::vm::call_function,
};

/// ### [27.2.2.2 NewPromiseResolveThenableJob ( promiseToResolve, thenable, then )](https://tc39.es/ecma262/#sec-newpromiseresolvethenablejob)
#[derive(Debug)]
pub(crate) struct PromiseResolveThenableJob {
    pub(crate) promise_to_resolve: Promise,
    pub(crate) thenable: Object,
    pub(crate) then: Value,
}

impl PromiseResolveThenableJob {
    pub(crate) fn run(self, agent: &mut Agent) -> JsResult<()> {
        let Self {
            promise_to_resolve,
            thenable,
            then,
        } = self;
        // a. Let resolvingFunctions be CreateResolvingFunctions(promiseToResolve).
        let capability = PromiseCapability::from_promise(promise_to_resolve, false);
        let resolve_function = Object::create_promise_resolving_function(
            agent,
            BuiltinFunction::PromiseResolve(capability),
        );
        let reject_function = Object::create_promise_resolving_function(
            agent,
            BuiltinFunction::PromiseReject(capability),
        );
        // b. Let thenCallResult be Completion(HostCallJobCallback(then, thenable, « resolvingFunctions.[[Resolve]], resolvingFunctions.[[Reject]] »)).
        let then_call_result = call_function(
            agent,
            &then,
            Value::Object(thenable),
            &[Value::Object(resolve_function), Value::Object(reject_function)],
        );
        // c. If thenCallResult is an abrupt completion, then
        match then_call_result {
            Err(error) if error.is_interrupt() => Err(error),
            Err(error) => {
                // i. Return ? Call(resolvingFunctions.[[Reject]], undefined, « thenCallResult.[[Value]] »).
                capability.reject(agent, error.into_value());
                Ok(())
            }
            // d. Return ? thenCallResult.
            Ok(_) => Ok(()),
        }
    }
}

/// ### [27.2.2.1 NewPromiseReactionJob ( reaction, argument )](https://tc39.es/ecma262/#sec-newpromisereactionjob)
#[derive(Debug)]
pub(crate) struct PromiseReactionJob {
    pub(crate) reaction: PromiseReaction,
    pub(crate) argument: Value,
}

impl PromiseReactionJob {
    pub(crate) fn run(self, agent: &mut Agent) -> JsResult<()> {
        let Self { reaction, argument } = self;
        let PromiseReaction {
            capability,
            reaction_type,
            handler,
        } = reaction;
        let handler_result = match handler {
            PromiseReactionHandler::Empty => match reaction_type {
                // d.i.1. Let handlerResult be NormalCompletion(argument).
                PromiseReactionType::Fulfill => Ok(argument),
                // d.ii.1. Let handlerResult be ThrowCompletion(argument).
                PromiseReactionType::Reject => Err(JsError::new(argument)),
            },
            // e.1. Let handlerResult be Completion(HostCallJobCallback(handler, undefined, « argument »)).
            PromiseReactionHandler::JobCallback(callback) => call_function(
                agent,
                &Value::Object(callback),
                Value::Undefined,
                &[argument],
            ),
            PromiseReactionHandler::AsyncModule(module) => {
                match reaction_type {
                    PromiseReactionType::Fulfill => async_module_execution_fulfilled(agent, &module)?,
                    PromiseReactionType::Reject => {
                        async_module_execution_rejected(agent, &module, JsError::new(argument))
                    }
                }
                Ok(Value::Undefined)
            }
            PromiseReactionHandler::ModuleAwait(await_reaction) => {
                await_reaction.resume(agent, reaction_type, argument)?;
                Ok(Value::Undefined)
            }
            PromiseReactionHandler::DynamicImport { module, capability } => {
                continue_dynamic_import(agent, reaction_type, module, capability, argument);
                Ok(Value::Undefined)
            }
            PromiseReactionHandler::PromiseAll { index, record } => {
                match reaction_type {
                    PromiseReactionType::Fulfill => record.on_fulfilled(agent, index, argument),
                    PromiseReactionType::Reject => record.capability.reject(agent, argument),
                }
                Ok(Value::Undefined)
            }
        };

        // f. If promiseCapability is undefined, then
        let Some(capability) = capability else {
            // i. Assert: handlerResult is not an abrupt completion.
            // ii. Return empty.
            return match handler_result {
                Err(error) if error.is_interrupt() => Err(error),
                _ => Ok(()),
            };
        };
        match handler_result {
            Err(error) if error.is_interrupt() => return Err(error),
            // h. If handlerResult is an abrupt completion, then
            //    i. Return ? Call(promiseCapability.[[Reject]], undefined, « handlerResult.[[Value]] »).
            Err(error) => capability.reject(agent, error.into_value()),
            // i. Else,
            //    i. Return ? Call(promiseCapability.[[Resolve]], undefined, « handlerResult.[[Value]] »).
            Ok(value) => capability.resolve(agent, value),
        }
        Ok(())
    }
}
