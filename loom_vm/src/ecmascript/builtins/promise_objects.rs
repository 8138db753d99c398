// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [27.2 Promise Objects](https://tc39.es/ecma262/#sec-promise-objects)

pub(crate) mod promise_abstract_operations;
pub(crate) mod promise_constructor;
pub(crate) mod promise_jobs;
pub(crate) mod promise_prototype;

pub use promise_abstract_operations::PromiseCapability;
pub(crate) use promise_abstract_operations::{
    PromiseReaction, PromiseReactionHandler, PromiseReactionType, inner_promise_then,
    promise_resolve,
};

use crate::ecmascript::{
    execution::Agent,
    types::{Object, ObjectKind, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Promise(pub(crate) Object);

/// The observable state of a promise.
#[derive(Debug, Clone)]
pub enum PromiseState {
    Pending,
    Fulfilled(Value),
    Rejected(Value),
}

#[derive(Debug)]
pub(crate) enum InnerPromiseState {
    Pending {
        fulfill_reactions: Vec<PromiseReaction>,
        reject_reactions: Vec<PromiseReaction>,
        /// True once a resolve function has been called with a thenable that
        /// has not yet settled this promise.
        is_resolved: bool,
    },
    Fulfilled {
        promise_result: Value,
    },
    Rejected {
        promise_result: Value,
    },
}

#[derive(Debug)]
pub(crate) struct PromiseHeapData {
    /// ### \[\[PromiseState]], \[\[PromiseResult]] and the reaction lists
    pub(crate) promise_state: InnerPromiseState,
    /// ### \[\[PromiseIsHandled]]
    pub(crate) is_handled: bool,
}

impl Default for PromiseHeapData {
    fn default() -> Self {
        Self {
            promise_state: InnerPromiseState::Pending {
                fulfill_reactions: Vec::new(),
                reject_reactions: Vec::new(),
                is_resolved: false,
            },
            is_handled: false,
        }
    }
}

/// ### [27.2.1.9 HostPromiseRejectionTracker ( promise, operation )](https://tc39.es/ecma262/#sec-host-promise-rejection-tracker)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseRejectionTrackerOperation {
    Reject,
    Handle,
}

impl Promise {
    /// Creates a new pending promise.
    pub(crate) fn new_pending(agent: &mut Agent) -> Self {
        let prototype = agent.realm.intrinsics.promise_prototype;
        Promise(Object::create(
            agent,
            Some(prototype),
            ObjectKind::Promise(PromiseHeapData::default()),
        ))
    }

    /// Returns the promise if `value` is a promise object.
    pub fn from_value(agent: &Agent, value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        matches!(agent[object].kind, ObjectKind::Promise(_)).then_some(Promise(object))
    }

    pub fn object(self) -> Object {
        self.0
    }

    pub fn state(self, agent: &Agent) -> PromiseState {
        match &self.data(agent).promise_state {
            InnerPromiseState::Pending { .. } => PromiseState::Pending,
            InnerPromiseState::Fulfilled { promise_result } => {
                PromiseState::Fulfilled(promise_result.clone())
            }
            InnerPromiseState::Rejected { promise_result } => {
                PromiseState::Rejected(promise_result.clone())
            }
        }
    }

    pub fn is_handled(self, agent: &Agent) -> bool {
        self.data(agent).is_handled
    }

    pub(crate) fn data(self, agent: &Agent) -> &PromiseHeapData {
        match &agent[self.0].kind {
            ObjectKind::Promise(data) => data,
            _ => unreachable!("Promise handle to a non-promise object"),
        }
    }

    pub(crate) fn data_mut(self, agent: &mut Agent) -> &mut PromiseHeapData {
        match &mut agent[self.0].kind {
            ObjectKind::Promise(data) => data,
            _ => unreachable!("Promise handle to a non-promise object"),
        }
    }
}

impl From<Promise> for Value {
    fn from(value: Promise) -> Self {
        Value::Object(value.0)
    }
}
