// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [27.2.1 Promise Abstract Operations](https://tc39.es/ecma262/#sec-promise-abstract-operations)

use std::rc::Rc;

use super::{
    InnerPromiseState, Promise, PromiseRejectionTrackerOperation,
    promise_constructor::PromiseAllRecord,
    promise_jobs::{PromiseReactionJob, PromiseResolveThenableJob},
};
use crate::ecmascript::{
    execution::{Agent, ExceptionType, agent::Job},
    scripts_and_modules::module::module_semantics::{
        abstract_module_records::Module, source_text_module_records::ModuleAwaitReaction,
    },
    types::{Object, Value},
};

/// A promise capability encapsulates a promise, adding methods that are
/// capable of resolving or rejecting that promise.
///
/// Only builtin promises are supported, so the resolve and reject functions
/// are created on demand instead of being stored.
///
/// `must_be_unresolved` maps the \[\[AlreadyResolved]] state of a pair of
/// resolving functions onto the promise: if false, the promise only counts
/// as resolved once it has settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromiseCapability {
    pub(crate) promise: Promise,
    pub(crate) must_be_unresolved: bool,
}

impl PromiseCapability {
    /// ### [27.2.1.5 NewPromiseCapability ( C )](https://tc39.es/ecma262/#sec-newpromisecapability)
    pub fn new(agent: &mut Agent) -> Self {
        Self::from_promise(Promise::new_pending(agent), true)
    }

    pub(crate) fn from_promise(promise: Promise, must_be_unresolved: bool) -> Self {
        Self {
            promise,
            must_be_unresolved,
        }
    }

    pub fn promise(&self) -> Promise {
        self.promise
    }

    fn is_already_resolved(&self, agent: &Agent) -> bool {
        match self.promise.data(agent).promise_state {
            InnerPromiseState::Pending { is_resolved, .. } => {
                self.must_be_unresolved && is_resolved
            }
            _ => true,
        }
    }

    /// ### [27.2.1.4 FulfillPromise ( promise, value )](https://tc39.es/ecma262/#sec-fulfillpromise)
    fn internal_fulfill(&self, agent: &mut Agent, value: Value) {
        // 1. Assert: The value of promise.[[PromiseState]] is pending.
        // 2. Let reactions be promise.[[PromiseFulfillReactions]].
        let promise_state = &mut self.promise.data_mut(agent).promise_state;
        let reactions = match promise_state {
            InnerPromiseState::Pending {
                fulfill_reactions, ..
            } => std::mem::take(fulfill_reactions),
            _ => unreachable!(),
        };
        // 3. Set promise.[[PromiseResult]] to value.
        // 4. Set promise.[[PromiseFulfillReactions]] to undefined.
        // 5. Set promise.[[PromiseRejectReactions]] to undefined.
        // 6. Set promise.[[PromiseState]] to FULFILLED.
        *promise_state = InnerPromiseState::Fulfilled {
            promise_result: value.clone(),
        };
        // 7. Perform TriggerPromiseReactions(reactions, value).
        trigger_promise_reactions(agent, reactions, value);
    }

    /// ### [27.2.1.7 RejectPromise ( promise, reason )](https://tc39.es/ecma262/#sec-rejectpromise)
    fn internal_reject(&self, agent: &mut Agent, reason: Value) {
        // 1. Assert: The value of promise.[[PromiseState]] is pending.
        // 2. Let reactions be promise.[[PromiseRejectReactions]].
        let data = self.promise.data_mut(agent);
        let reactions = match &mut data.promise_state {
            InnerPromiseState::Pending {
                reject_reactions, ..
            } => std::mem::take(reject_reactions),
            _ => unreachable!(),
        };
        // 3. Set promise.[[PromiseResult]] to reason.
        // 4. Set promise.[[PromiseFulfillReactions]] to undefined.
        // 5. Set promise.[[PromiseRejectReactions]] to undefined.
        // 6. Set promise.[[PromiseState]] to REJECTED.
        data.promise_state = InnerPromiseState::Rejected {
            promise_result: reason.clone(),
        };
        // 7. If promise.[[PromiseIsHandled]] is false, perform HostPromiseRejectionTracker(promise, "reject").
        if !data.is_handled {
            agent
                .host_hooks
                .promise_rejection_tracker(self.promise, PromiseRejectionTrackerOperation::Reject);
        }
        // 8. Perform TriggerPromiseReactions(reactions, reason).
        trigger_promise_reactions(agent, reactions, reason);
    }

    /// ### [27.2.1.3.2 Promise Resolve Functions](https://tc39.es/ecma262/#sec-promise-resolve-functions)
    pub fn resolve(self, agent: &mut Agent, resolution: Value) {
        // 5. If alreadyResolved.[[Value]] is true, return undefined.
        if self.is_already_resolved(agent) {
            return;
        }
        // 6. Set alreadyResolved.[[Value]] to true.
        if let InnerPromiseState::Pending { is_resolved, .. } =
            &mut self.promise.data_mut(agent).promise_state
        {
            *is_resolved = true;
        }
        // 7. If SameValue(resolution, promise) is true, then
        if resolution.as_object() == Some(self.promise.0) {
            // a. Let selfResolutionError be a newly created TypeError object.
            let error = agent
                .throw_exception(
                    ExceptionType::TypeError,
                    "Tried to resolve a promise with itself.",
                )
                .into_value();
            // b. Perform RejectPromise(promise, selfResolutionError).
            self.internal_reject(agent, error);
            // c. Return undefined.
            return;
        }
        // 8. If resolution is not an Object, then
        let Some(thenable) = resolution.as_object() else {
            // a. Perform FulfillPromise(promise, resolution).
            self.internal_fulfill(agent, resolution);
            return;
        };
        // 9. Let then be Completion(Get(resolution, "then")).
        let then_action = match thenable.get(agent, "then") {
            // 11. Let thenAction be then.[[Value]].
            Ok(then_action) => then_action,
            // 10. If then is an abrupt completion, then
            Err(error) => {
                // a. Perform RejectPromise(promise, then.[[Value]]).
                self.internal_reject(agent, error.into_value());
                return;
            }
        };
        // 12. If IsCallable(thenAction) is false, then
        if !then_action.is_callable(agent) {
            // a. Perform FulfillPromise(promise, resolution).
            self.internal_fulfill(agent, resolution);
            return;
        }
        // 13. Let thenJobCallback be HostMakeJobCallback(thenAction).
        // 14. Let job be NewPromiseResolveThenableJob(promise, resolution, thenJobCallback).
        // 15. Perform HostEnqueuePromiseJob(job.[[Job]], job.[[Realm]]).
        agent.enqueue_job(Job::promise_resolve_thenable(PromiseResolveThenableJob {
            promise_to_resolve: self.promise,
            thenable,
            then: then_action,
        }));
    }

    /// ### [27.2.1.3.1 Promise Reject Functions](https://tc39.es/ecma262/#sec-promise-reject-functions)
    pub fn reject(self, agent: &mut Agent, reason: Value) {
        // 5. If alreadyResolved.[[Value]] is true, return undefined.
        if self.is_already_resolved(agent) {
            return;
        }
        // 6. Set alreadyResolved.[[Value]] to true.
        // 7. Perform RejectPromise(promise, reason).
        self.internal_reject(agent, reason);
    }
}

/// \[\[Type]]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PromiseReactionType {
    Fulfill,
    Reject,
}

/// \[\[Handler]]
///
/// Besides JavaScript callbacks, the engine installs its own handlers for
/// module evaluation and `Promise.all`.
#[derive(Debug, Clone)]
pub(crate) enum PromiseReactionHandler {
    JobCallback(Object),
    Empty,
    /// Settles the asynchronous execution of a module with top-level await.
    AsyncModule(Module),
    /// Resumes a module body suspended at a top-level `await`.
    ModuleAwait(ModuleAwaitReaction),
    /// ContinueDynamicImport's onFulfilled and onRejected closures.
    DynamicImport {
        module: Module,
        capability: PromiseCapability,
    },
    /// `Promise.all` element resolve functions and the shared reject.
    PromiseAll {
        index: usize,
        record: Rc<PromiseAllRecord>,
    },
}

/// ### [27.2.1.2 PromiseReaction Records](https://tc39.es/ecma262/#sec-promisereaction-records)
#[derive(Debug, Clone)]
pub(crate) struct PromiseReaction {
    /// \[\[Capability]]
    pub(crate) capability: Option<PromiseCapability>,
    /// \[\[Type]]
    pub(crate) reaction_type: PromiseReactionType,
    /// \[\[Handler]]
    pub(crate) handler: PromiseReactionHandler,
}

/// ### [27.2.1.8 TriggerPromiseReactions ( reactions, argument )](https://tc39.es/ecma262/#sec-triggerpromisereactions)
fn trigger_promise_reactions(agent: &mut Agent, reactions: Vec<PromiseReaction>, argument: Value) {
    // 1. For each element reaction of reactions, do
    for reaction in reactions {
        // a. Let job be NewPromiseReactionJob(reaction, argument).
        // b. Perform HostEnqueuePromiseJob(job.[[Job]], job.[[Realm]]).
        agent.enqueue_job(Job::promise_reaction(PromiseReactionJob {
            reaction,
            argument: argument.clone(),
        }));
    }
}

/// ### [27.2.4.7.1 PromiseResolve ( C, x )](https://tc39.es/ecma262/#sec-promise-resolve)
pub(crate) fn promise_resolve(agent: &mut Agent, value: Value) -> Promise {
    // 1. If IsPromise(x) is true, then
    if let Some(promise) = Promise::from_value(agent, &value) {
        // a. Let xConstructor be ? Get(x, "constructor").
        // b. If SameValue(xConstructor, C) is true, return x.
        return promise;
    }
    // 2. Let promiseCapability be ? NewPromiseCapability(C).
    let capability = PromiseCapability::new(agent);
    // 3. Perform ? Call(promiseCapability.[[Resolve]], undefined, « x »).
    capability.resolve(agent, value);
    // 4. Return promiseCapability.[[Promise]].
    capability.promise()
}

/// ### [27.2.5.4.1 PerformPromiseThen ( promise, onFulfilled, onRejected \[ , resultCapability \] )](https://tc39.es/ecma262/#sec-performpromisethen)
pub(crate) fn perform_promise_then(
    agent: &mut Agent,
    promise: Promise,
    on_fulfilled: Value,
    on_rejected: Value,
    result_capability: Option<PromiseCapability>,
) {
    // 3. If IsCallable(onFulfilled) is false, then
    //    a. Let onFulfilledJobCallback be empty.
    // 4. Else,
    //    a. Let onFulfilledJobCallback be HostMakeJobCallback(onFulfilled).
    let on_fulfilled = match on_fulfilled.as_object() {
        Some(callback) if callback.is_callable(agent) => {
            PromiseReactionHandler::JobCallback(callback)
        }
        _ => PromiseReactionHandler::Empty,
    };
    // 5. If IsCallable(onRejected) is false, then
    //    a. Let onRejectedJobCallback be empty.
    // 6. Else,
    //    a. Let onRejectedJobCallback be HostMakeJobCallback(onRejected).
    let on_rejected = match on_rejected.as_object() {
        Some(callback) if callback.is_callable(agent) => {
            PromiseReactionHandler::JobCallback(callback)
        }
        _ => PromiseReactionHandler::Empty,
    };
    inner_promise_then(agent, promise, on_fulfilled, on_rejected, result_capability);
}

/// PerformPromiseThen from step 7, for engine-internal reaction handlers.
pub(crate) fn inner_promise_then(
    agent: &mut Agent,
    promise: Promise,
    on_fulfilled: PromiseReactionHandler,
    on_rejected: PromiseReactionHandler,
    result_capability: Option<PromiseCapability>,
) {
    // 7. Let fulfillReaction be the PromiseReaction Record { [[Capability]]: resultCapability, [[Type]]: fulfill, [[Handler]]: onFulfilledJobCallback }.
    let fulfill_reaction = PromiseReaction {
        capability: result_capability,
        reaction_type: PromiseReactionType::Fulfill,
        handler: on_fulfilled,
    };
    // 8. Let rejectReaction be the PromiseReaction Record { [[Capability]]: resultCapability, [[Type]]: reject, [[Handler]]: onRejectedJobCallback }.
    let reject_reaction = PromiseReaction {
        capability: result_capability,
        reaction_type: PromiseReactionType::Reject,
        handler: on_rejected,
    };

    let data = promise.data_mut(agent);
    let was_handled = std::mem::replace(&mut data.is_handled, true);
    match &mut data.promise_state {
        // 9. If promise.[[PromiseState]] is pending, then
        InnerPromiseState::Pending {
            fulfill_reactions,
            reject_reactions,
            ..
        } => {
            // a. Append fulfillReaction to promise.[[PromiseFulfillReactions]].
            fulfill_reactions.push(fulfill_reaction);
            // b. Append rejectReaction to promise.[[PromiseRejectReactions]].
            reject_reactions.push(reject_reaction);
        }
        // 10. Else if promise.[[PromiseState]] is fulfilled, then
        InnerPromiseState::Fulfilled { promise_result } => {
            // a. Let value be promise.[[PromiseResult]].
            let argument = promise_result.clone();
            // b. Let fulfillJob be NewPromiseReactionJob(fulfillReaction, value).
            // c. Perform HostEnqueuePromiseJob(fulfillJob.[[Job]], fulfillJob.[[Realm]]).
            agent.enqueue_job(Job::promise_reaction(PromiseReactionJob {
                reaction: fulfill_reaction,
                argument,
            }));
        }
        // 11. Else,
        InnerPromiseState::Rejected { promise_result } => {
            // a. Assert: The value of promise.[[PromiseState]] is rejected.
            // b. Let reason be promise.[[PromiseResult]].
            let argument = promise_result.clone();
            // c. If promise.[[PromiseIsHandled]] is false, perform HostPromiseRejectionTracker(promise, "handle").
            if !was_handled {
                agent
                    .host_hooks
                    .promise_rejection_tracker(promise, PromiseRejectionTrackerOperation::Handle);
            }
            // d. Let rejectJob be NewPromiseReactionJob(rejectReaction, reason).
            // e. Perform HostEnqueuePromiseJob(rejectJob.[[Job]], rejectJob.[[Realm]]).
            agent.enqueue_job(Job::promise_reaction(PromiseReactionJob {
                reaction: reject_reaction,
                argument,
            }));
        }
    }
    // 12. Set promise.[[PromiseIsHandled]] to true.
}
