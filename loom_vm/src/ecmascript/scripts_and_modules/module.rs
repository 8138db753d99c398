// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [16.2 Modules](https://tc39.es/ecma262/#sec-modules)

pub mod module_semantics;

use module_semantics::abstract_module_records::Module;

use crate::ecmascript::{
    builtins::{
        PromiseCapability,
        promise_objects::{PromiseReactionHandler, PromiseReactionType, inner_promise_then},
    },
    execution::{Agent, JsResult},
    types::{JsString, Object, ObjectKind, Value},
};

/// A pending `import()` call, resolved when the agent runs its jobs.
#[derive(Debug)]
pub(crate) struct DynamicImportJob {
    pub(crate) referrer: Option<Module>,
    pub(crate) specifier: JsString,
    pub(crate) capability: PromiseCapability,
}

impl DynamicImportJob {
    pub(crate) fn run(self, agent: &mut Agent) -> JsResult<()> {
        let Self {
            referrer,
            specifier,
            capability,
        } = self;
        log::trace!("Importing {specifier} dynamically");
        let host_hooks = agent.host_hooks;
        let result = host_hooks.resolve_imported_module(agent, referrer.as_ref(), &specifier);
        finish_dynamic_import(agent, capability, result)
    }
}

/// ### [16.2.1.9 FinishLoadingImportedModule ( referrer, moduleRequest, payload, result )](https://tc39.es/ecma262/#sec-FinishLoadingImportedModule)
///
/// Completes an `import()` call once the host has resolved its specifier:
/// the module is linked and evaluated, and `capability` is fulfilled with
/// its namespace object or rejected with the error. Only interrupts are
/// returned as errors.
pub fn finish_dynamic_import(
    agent: &mut Agent,
    capability: PromiseCapability,
    result: JsResult<Module>,
) -> JsResult<()> {
    // ### [16.2.1.10 ContinueDynamicImport ( promiseCapability, moduleCompletion )](https://tc39.es/ecma262/#sec-ContinueDynamicImport)
    // 1. If moduleCompletion is an abrupt completion, then
    //    a. Perform ! Call(promiseCapability.[[Reject]], undefined, « moduleCompletion.[[Value]] »).
    //    b. Return unused.
    // 2. Let module be moduleCompletion.[[Value]].
    // 6. Let linkAndEvaluateClosure be a new Abstract Closure with no
    //    parameters that captures module, promiseCapability, and onRejected
    //    and performs the following steps when called:
    //    a. Let link be Completion(module.Link()).
    //    b. If link is an abrupt completion, then
    //       i. Perform ! Call(promiseCapability.[[Reject]], undefined, « link.[[Value]] »).
    //       ii. Return NormalCompletion(undefined).
    //    c. Let evaluatePromise be module.Evaluate().
    let linked_and_evaluated = result.and_then(|module| {
        module.link(agent)?;
        let promise = module.evaluate_module_promise(agent)?;
        Ok((module, promise))
    });
    let (module, evaluate_promise) = match linked_and_evaluated {
        Ok(result) => result,
        Err(error) if error.is_interrupt() => return Err(error),
        Err(error) => {
            capability.reject(agent, error.into_value());
            return Ok(());
        }
    };
    //    f. Perform PerformPromiseThen(evaluatePromise, onFulfilled, onRejected).
    inner_promise_then(
        agent,
        evaluate_promise,
        PromiseReactionHandler::DynamicImport {
            module: module.clone(),
            capability,
        },
        PromiseReactionHandler::DynamicImport { module, capability },
        None,
    );
    Ok(())
}

/// The fulfilled and rejected closures of ContinueDynamicImport.
pub(crate) fn continue_dynamic_import(
    agent: &mut Agent,
    reaction_type: PromiseReactionType,
    module: Module,
    capability: PromiseCapability,
    argument: Value,
) {
    match reaction_type {
        // d. Let fulfilledClosure be a new Abstract Closure with no
        //    parameters that captures module and promiseCapability and
        //    performs the following steps when called:
        PromiseReactionType::Fulfill => {
            // i. Let namespace be GetModuleNamespace(module).
            match agent.get_module_namespace(&module) {
                // ii. Perform ! Call(promiseCapability.[[Resolve]], undefined, « namespace »).
                Ok(namespace) => capability.resolve(agent, namespace.into()),
                Err(error) => capability.reject(agent, error.into_value()),
            }
        }
        // 4. Let rejectedClosure be a new Abstract Closure with parameters
        //    (reason) that captures promiseCapability and performs the
        //    following steps when called:
        //    a. Perform ! Call(promiseCapability.[[Reject]], undefined, « reason »).
        PromiseReactionType::Reject => capability.reject(agent, argument),
    }
}

/// ### [13.3.12.1 Runtime Semantics: Evaluation](https://tc39.es/ecma262/#sec-meta-properties-runtime-semantics-evaluation)
///
/// `ImportMeta : import . meta`
pub(crate) fn get_import_meta(agent: &mut Agent, module: &Module) -> Object {
    // 3. Let importMeta be module.[[ImportMeta]].
    if let Some(import_meta) = agent.import_meta_objects.get(module) {
        return *import_meta;
    }
    // 4. If importMeta is empty, then
    //    a. Set importMeta to OrdinaryObjectCreate(null).
    let import_meta = Object::create(agent, None, ObjectKind::Ordinary);
    //    b. Let importMetaValues be HostGetImportMetaProperties(module).
    let host_hooks = agent.host_hooks;
    let import_meta_values = host_hooks.get_import_meta_properties(agent, module);
    //    c. For each Record { [[Key]], [[Value]] } p of importMetaValues, do
    for (key, value) in import_meta_values {
        //   i. Perform ! CreateDataPropertyOrThrow(importMeta, p.[[Key]], p.[[Value]]).
        import_meta.define_own(&mut agent.heap, &key, value);
    }
    //    e. Set module.[[ImportMeta]] to importMeta.
    agent.import_meta_objects.insert(module.clone(), import_meta);
    //    f. Return importMeta.
    import_meta
}
