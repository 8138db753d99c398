// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [16.2.1.6 Cyclic Module Records](https://tc39.es/ecma262/#sec-cyclic-module-records)
//!
//! The link state of a record is kept per agent in `Agent::module_status`,
//! and the evaluation state per instance in the agent's instance cache. The
//! DFS bookkeeping of a single Link() or Evaluate() call lives in a
//! [`GraphWalk`] and is dropped when the call returns.

use std::rc::Rc;

use ahash::AHashMap;

use super::{
    abstract_module_records::{Module, ModuleAbstractMethods},
    module_instances::{CyclicModuleInstance, ModuleInstance},
};
use crate::ecmascript::{
    builtins::promise_objects::{
        Promise, PromiseCapability, PromiseReactionHandler, inner_promise_then,
    },
    execution::{Agent, ExceptionType, JsError, JsResult},
    types::{JsString, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclicModuleRecordStatus {
    Unlinked,
    Linking,
    Linked,
    Evaluating,
    EvaluatingAsync,
    Evaluated,
}

/// ### [Additional Abstract Methods of Cyclic Module Records](https://tc39.es/ecma262/#table-cyclic-module-methods)
pub trait CyclicModuleRecord: ModuleAbstractMethods {
    /// ### \[\[RequestedModules]]
    ///
    /// The specifiers of the modules this module imports or re-exports from,
    /// in source text occurrence order. May contain duplicates.
    fn requested_modules(&self) -> &[JsString];

    /// ### \[\[HasTLA]]
    ///
    /// Whether this module is individually asynchronous. Having an
    /// asynchronous dependency does not make this true.
    fn has_tla(&self) -> bool {
        false
    }

    /// ### InitializeEnvironment()
    ///
    /// Initialize the Environment Record of the module, including resolving
    /// all imported bindings.
    fn initialize_environment(self: Rc<Self>, agent: &mut Agent) -> JsResult<()>;

    /// Create the agent's instance of this module, taking over the
    /// environment created by InitializeEnvironment.
    fn instantiate(self: Rc<Self>, agent: &mut Agent) -> JsResult<Rc<dyn CyclicModuleInstance>>;
}

/// ### \[\[AsyncEvaluationOrder]]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AsyncEvaluationOrder {
    /// The module is fully synchronous.
    Unset,
    /// Order in which pending asynchronous modules are executed.
    Order(u32),
    /// The asynchronous execution has finished.
    Done,
}

/// Evaluation fields of a Cyclic Module Record, held per instance.
#[derive(Debug)]
pub(crate) struct CyclicModuleEvaluation {
    /// ### \[\[Status]]
    pub(crate) status: CyclicModuleRecordStatus,
    /// ### \[\[EvaluationError]]
    ///
    /// The exception that occurred during evaluation. Replayed to every later
    /// evaluation that reaches this module.
    pub(crate) evaluation_error: Option<JsError>,
    /// ### \[\[CycleRoot]]
    ///
    /// The first visited module of the strongly connected component. Set
    /// when the component is flushed.
    pub(crate) cycle_root: Option<Module>,
    /// ### \[\[HasTLA]]
    pub(crate) has_tla: bool,
    /// ### \[\[AsyncEvaluationOrder]]
    pub(crate) async_evaluation_order: AsyncEvaluationOrder,
    /// ### \[\[TopLevelCapability]]
    ///
    /// Set on the cycle root of an Evaluate() call; settled when the whole
    /// evaluation finishes.
    pub(crate) top_level_capability: Option<PromiseCapability>,
    /// ### \[\[AsyncParentModules]]
    pub(crate) async_parent_modules: Vec<Module>,
    /// ### \[\[PendingAsyncDependencies]]
    pub(crate) pending_async_dependencies: u32,
}

impl CyclicModuleEvaluation {
    fn new(has_tla: bool) -> Self {
        Self {
            status: CyclicModuleRecordStatus::Evaluating,
            evaluation_error: None,
            cycle_root: None,
            has_tla,
            async_evaluation_order: AsyncEvaluationOrder::Unset,
            top_level_capability: None,
            async_parent_modules: Vec::new(),
            pending_async_dependencies: 0,
        }
    }

    /// Set \[\[EvaluationError]] to error and \[\[Status]] to evaluated.
    fn set_evaluation_error(&mut self, error: JsError) {
        debug_assert!(self.evaluation_error.is_none());
        self.evaluation_error = Some(error);
        self.status = CyclicModuleRecordStatus::Evaluated;
    }
}

/// DFS state of one Link() or Evaluate() call.
#[derive(Debug, Default)]
struct GraphWalk {
    stack: Vec<Module>,
    /// ### \[\[DFSIndex]]
    dfs_index: AHashMap<Module, u32>,
    /// ### \[\[DFSAncestorIndex]]
    dfs_ancestor_index: AHashMap<Module, u32>,
    /// Every module moved out of its initial state by this walk.
    touched: Vec<Module>,
}

impl GraphWalk {
    /// Set \[\[DFSIndex]] and \[\[DFSAncestorIndex]] to index.
    fn set_dfs_index(&mut self, module: &Module, index: u32) {
        self.dfs_index.insert(module.clone(), index);
        self.dfs_ancestor_index.insert(module.clone(), index);
    }

    fn dfs_index(&self, module: &Module) -> u32 {
        self.dfs_index[module]
    }

    fn dfs_ancestor_index(&self, module: &Module) -> u32 {
        self.dfs_ancestor_index[module]
    }

    /// Set module.\[\[DFSAncestorIndex]] to min(module.\[\[DFSAncestorIndex]],
    /// requiredModule.\[\[DFSAncestorIndex]]).
    ///
    /// A required module on the stack of another, enclosing walk has no
    /// index in this one and leaves module's index unchanged.
    fn update_ancestor_index(&mut self, module: &Module, required_module: &Module) {
        let Some(&required_index) = self.dfs_ancestor_index.get(required_module) else {
            log::trace!("Module {required_module} belongs to an enclosing walk");
            return;
        };
        let index = self.dfs_ancestor_index(module).min(required_index);
        self.dfs_ancestor_index.insert(module.clone(), index);
    }

    /// Whether module is the root of its strongly connected component.
    fn is_component_root(&self, module: &Module) -> bool {
        let ancestor_index = self.dfs_ancestor_index(module);
        let index = self.dfs_index(module);
        debug_assert!(ancestor_index <= index);
        ancestor_index == index
    }

    /// Pops the stack down to and including `module`.
    fn pop_component(&mut self, module: &Module) -> Vec<Module> {
        let position = self
            .stack
            .iter()
            .rposition(|m| m == module)
            .expect("Module missing from its own DFS stack");
        self.stack.split_off(position)
    }
}

fn evaluation<'a>(agent: &'a Agent, module: &Module) -> &'a CyclicModuleEvaluation {
    agent
        .module_instances
        .evaluation(module)
        .expect("Module has not been instantiated")
}

fn evaluation_mut<'a>(agent: &'a mut Agent, module: &Module) -> &'a mut CyclicModuleEvaluation {
    agent
        .module_instances
        .evaluation_mut(module)
        .expect("Module has not been instantiated")
}

/// \[\[Status]] of a cyclic module in this agent.
fn cyclic_status(agent: &Agent, module: &Module) -> CyclicModuleRecordStatus {
    if let Some(evaluation) = agent.module_instances.evaluation(module) {
        return evaluation.status;
    }
    agent
        .module_status
        .get(module)
        .copied()
        .unwrap_or(CyclicModuleRecordStatus::Unlinked)
}

fn check_depth(agent: &mut Agent, depth: u32) -> JsResult<()> {
    if depth > agent.options.max_module_graph_depth {
        return Err(agent.throw_exception(
            ExceptionType::RangeError,
            "Maximum module graph depth exceeded",
        ));
    }
    Ok(())
}

impl Module {
    /// \[\[Status]] of this module in `agent`, or None for foreign modules.
    pub fn status(&self, agent: &Agent) -> Option<CyclicModuleRecordStatus> {
        self.as_cyclic()?;
        Some(cyclic_status(agent, self))
    }

    /// ### [16.2.1.6.1.1 Link ( )](https://tc39.es/ecma262/#sec-moduledeclarationlinking)
    ///
    /// On success, transitions this module and every cyclic module it
    /// depends on from unlinked to linked. On failure, every module touched
    /// by this call is reset to unlinked.
    pub fn link(&self, agent: &mut Agent) -> JsResult<()> {
        if let Module::Foreign(record) = self {
            return record.clone().link(agent);
        }
        // 1. Assert: module.[[Status]] is one of unlinked, linked,
        //    evaluating-async, or evaluated.
        let status = cyclic_status(agent, self);
        if matches!(
            status,
            CyclicModuleRecordStatus::Linking | CyclicModuleRecordStatus::Evaluating
        ) {
            return Err(agent.throw_exception(
                ExceptionType::TypeError,
                format!("Module '{self}' is already being linked or evaluated"),
            ));
        }
        log::debug!("Linking module {self}");
        // 2. Let stack be a new empty List.
        let mut walk = GraphWalk::default();
        // 3. Let result be Completion(InnerModuleLinking(module, stack, 0)).
        let result = inner_module_linking(agent, self, &mut walk, 0, 0);
        // 4. If result is an abrupt completion, then
        if let Err(error) = result {
            // a. For each Cyclic Module Record m of stack, do
            //    i. Assert: m.[[Status]] is linking.
            //    ii. Set m.[[Status]] to unlinked.
            // Modules whose component was already flushed to linked by this
            // call are reset as well.
            for module in walk.touched {
                agent.module_status.remove(&module);
                agent.module_environments.remove(&module);
            }
            // b. Assert: module.[[Status]] is unlinked.
            // c. Return ? result.
            log::debug!("Linking module {self} failed");
            return Err(error);
        }
        // 5. Assert: module.[[Status]] is one of linked, evaluating-async, or evaluated.
        // 6. Assert: stack is empty.
        debug_assert!(walk.stack.is_empty());
        // 7. Return unused.
        Ok(())
    }

    /// ### [16.2.1.6.1.3 Evaluate ( )](https://tc39.es/ecma262/#sec-moduleevaluation)
    ///
    /// Evaluates this module and its dependencies, each at most once per
    /// agent, and returns the promise settled when the evaluation finishes.
    /// Throws only for misuse: evaluating a module that is not linked or
    /// that is currently being linked or evaluated.
    pub(crate) fn evaluate_module_promise(&self, agent: &mut Agent) -> JsResult<Promise> {
        if let Module::Foreign(_) = self {
            let capability = PromiseCapability::new(agent);
            match evaluate_foreign_module(agent, self) {
                Ok(_) => capability.resolve(agent, Value::Undefined),
                Err(error) if error.is_interrupt() => return Err(error),
                Err(error) => capability.reject(agent, error.into_value()),
            }
            return Ok(capability.promise());
        }
        // 1. Assert: This call to Evaluate is not happening at the same time
        //    as another call to Evaluate within the surrounding agent.
        // 2. Assert: module.[[Status]] is one of linked, evaluating-async, or evaluated.
        let mut module = self.clone();
        match cyclic_status(agent, &module) {
            CyclicModuleRecordStatus::Linked => {}
            // 3. If module.[[Status]] is either evaluating-async or
            //    evaluated, set module to module.[[CycleRoot]].
            CyclicModuleRecordStatus::EvaluatingAsync | CyclicModuleRecordStatus::Evaluated => {
                if let Some(cycle_root) = evaluation(agent, &module).cycle_root.clone() {
                    module = cycle_root;
                }
            }
            CyclicModuleRecordStatus::Unlinked => {
                return Err(agent.throw_exception(
                    ExceptionType::TypeError,
                    format!("Module '{self}' must be linked before it is evaluated"),
                ));
            }
            CyclicModuleRecordStatus::Linking | CyclicModuleRecordStatus::Evaluating => {
                return Err(agent.throw_exception(
                    ExceptionType::TypeError,
                    format!("Module '{self}' is already being linked or evaluated"),
                ));
            }
        }
        // 4. If module.[[TopLevelCapability]] is not empty, then
        if let Some(capability) = agent
            .module_instances
            .evaluation(&module)
            .and_then(|evaluation| evaluation.top_level_capability)
        {
            // a. Return module.[[TopLevelCapability]].[[Promise]].
            return Ok(capability.promise());
        }
        log::debug!("Evaluating module {module}");
        // 5. Let stack be a new empty List.
        let mut walk = GraphWalk::default();
        // 6. Let capability be ! NewPromiseCapability(%Promise%).
        let capability = PromiseCapability::new(agent);
        // 8. Let result be Completion(InnerModuleEvaluation(module, stack, 0)).
        let result = inner_module_evaluation(agent, &module, &mut walk, 0, 0);
        // 7. Set module.[[TopLevelCapability]] to capability.
        if let Some(evaluation) = agent.module_instances.evaluation_mut(&module) {
            evaluation.top_level_capability = Some(capability);
        }
        match result {
            // 9. If result is an abrupt completion, then
            Err(error) => {
                // a. For each Cyclic Module Record m of stack, do
                for m in walk.stack.drain(..) {
                    // i. Assert: m.[[Status]] is evaluating.
                    // ii. Set m.[[Status]] to evaluated.
                    // iii. Set m.[[EvaluationError]] to result.
                    let m_evaluation = evaluation_mut(agent, &m);
                    m_evaluation.set_evaluation_error(error.clone());
                    // Async dependencies still pending may reach m as a parent.
                    m_evaluation.cycle_root.get_or_insert_with(|| module.clone());
                }
                // b. Assert: module.[[Status]] is evaluated.
                // c. Assert: module.[[EvaluationError]] and result are the same Completion Record.
                log::debug!("Evaluating module {module} threw");
                // d. Perform ! Call(capability.[[Reject]], undefined, « result.[[Value]] »).
                let is_interrupt = error.is_interrupt();
                capability.reject(agent, error.clone().into_value());
                if is_interrupt {
                    return Err(error);
                }
            }
            // 10. Else,
            Ok(_) => {
                // a. Assert: module.[[Status]] is either evaluating-async or evaluated.
                // b. Assert: module.[[EvaluationError]] is empty.
                let evaluation = evaluation(agent, &module);
                // c. If module.[[AsyncEvaluationOrder]] is unset, then
                //    i. Assert: module.[[Status]] is evaluated.
                //    ii. Perform ! Call(capability.[[Resolve]], undefined, « undefined »).
                // A component that finished asynchronously before this call
                // is resolved as well.
                if evaluation.status == CyclicModuleRecordStatus::Evaluated {
                    if let Some(error) = evaluation.evaluation_error.clone() {
                        capability.reject(agent, error.into_value());
                    } else {
                        capability.resolve(agent, Value::Undefined);
                    }
                }
                // d. Assert: stack is empty.
                debug_assert!(walk.stack.is_empty());
            }
        }
        // 11. Return capability.[[Promise]].
        Ok(capability.promise())
    }

    /// Evaluates this module and returns its instance.
    ///
    /// A module graph that throws synchronously returns the thrown error,
    /// which is cached: evaluating the module again throws the same error
    /// without running any module body. A graph with top-level await returns
    /// the instance immediately; its outcome is observed through
    /// [`Module::evaluation_promise`] after running the agent's jobs.
    pub fn evaluate(&self, agent: &mut Agent) -> JsResult<ModuleInstance> {
        if let Module::Foreign(_) = self {
            return evaluate_foreign_module(agent, self);
        }
        let promise = self.evaluate_module_promise(agent)?;
        if let Some(error) = agent
            .module_instances
            .evaluation(self)
            .and_then(|evaluation| evaluation.evaluation_error.clone())
        {
            return Err(error);
        }
        if let crate::ecmascript::builtins::PromiseState::Rejected(reason) = promise.state(agent) {
            return Err(JsError::new(reason));
        }
        Ok(agent
            .get_module_instance(self)
            .expect("Evaluated module has no instance"))
    }

    /// The promise of the Evaluate() call that covers this module, if any.
    pub fn evaluation_promise(&self, agent: &Agent) -> Option<Promise> {
        let evaluation = agent.module_instances.evaluation(self)?;
        let root = evaluation.cycle_root.as_ref().unwrap_or(self);
        agent
            .module_instances
            .evaluation(root)?
            .top_level_capability
            .map(|capability| capability.promise())
    }
}

/// ### [16.2.1.6.1.2.1 InnerModuleLinking ( module, stack, index )](https://tc39.es/ecma262/#sec-InnerModuleLinking)
///
/// The stack and index parameters, as well as a module's \[\[DFSIndex]]
/// and \[\[DFSAncestorIndex]], keep track of the depth-first search
/// traversal. \[\[DFSAncestorIndex]] is used to discover strongly connected
/// components, such that all modules in a component transition to linked
/// together.
fn inner_module_linking(
    agent: &mut Agent,
    module: &Module,
    walk: &mut GraphWalk,
    index: u32,
    depth: u32,
) -> JsResult<u32> {
    // 1. If module is not a Cyclic Module Record, then
    let Module::Cyclic(record) = module else {
        // a. Perform ? module.Link().
        module.link(agent)?;
        // b. Return index.
        return Ok(index);
    };
    // 2. If module.[[Status]] is one of linking, linked, evaluating-async,
    //    or evaluated, then
    match cyclic_status(agent, module) {
        // a. Return index.
        CyclicModuleRecordStatus::Linking
        | CyclicModuleRecordStatus::Linked
        | CyclicModuleRecordStatus::EvaluatingAsync
        | CyclicModuleRecordStatus::Evaluated => return Ok(index),
        // 3. Assert: module.[[Status]] is unlinked.
        CyclicModuleRecordStatus::Unlinked => {}
        CyclicModuleRecordStatus::Evaluating => {
            unreachable!("InnerModuleLinking reached a module that is being evaluated")
        }
    }
    check_depth(agent, depth)?;
    log::trace!("Linking module {module} at index {index}");
    // 4. Set module.[[Status]] to linking.
    agent
        .module_status
        .insert(module.clone(), CyclicModuleRecordStatus::Linking);
    walk.touched.push(module.clone());
    // 5. Set module.[[DFSIndex]] to index.
    // 6. Set module.[[DFSAncestorIndex]] to index.
    walk.set_dfs_index(module, index);
    // 7. Set index to index + 1.
    let mut index = index + 1;
    // 8. Append module to stack.
    walk.stack.push(module.clone());
    let record = record.clone();
    let host_hooks = agent.host_hooks;
    // 9. For each ModuleRequest Record request of module.[[RequestedModules]], do
    for specifier in record.requested_modules() {
        // a. Let requiredModule be GetImportedModule(module, request).
        let required_module = host_hooks.resolve_imported_module(agent, Some(module), specifier)?;
        // b. Set index to ? InnerModuleLinking(requiredModule, stack, index).
        index = inner_module_linking(agent, &required_module, walk, index, depth + 1)?;
        // c. If requiredModule is a Cyclic Module Record, then
        if required_module.as_cyclic().is_some() {
            // i. Assert: requiredModule.[[Status]] is one of linking, linked,
            //    evaluating-async, or evaluated.
            // ii. Assert: requiredModule.[[Status]] is linking if and only if
            //     stack contains requiredModule.
            // iii. If requiredModule.[[Status]] is linking, then
            if cyclic_status(agent, &required_module) == CyclicModuleRecordStatus::Linking {
                // 1. Set module.[[DFSAncestorIndex]] to
                //    min(module.[[DFSAncestorIndex]], requiredModule.[[DFSAncestorIndex]]).
                walk.update_ancestor_index(module, &required_module);
            }
        }
    }
    // 10. Perform ? module.InitializeEnvironment().
    record.initialize_environment(agent)?;
    // 11. Assert: module occurs exactly once in stack.
    // 12. Assert: module.[[DFSAncestorIndex]] ≤ module.[[DFSIndex]].
    // 13. If module.[[DFSAncestorIndex]] = module.[[DFSIndex]], then
    if walk.is_component_root(module) {
        // a. Let done be false.
        // b. Repeat, while done is false,
        //    i. Let requiredModule be the last element of stack.
        //    ii. Remove the last element of stack.
        //    iii. Assert: requiredModule is a Cyclic Module Record.
        //    iv. Set requiredModule.[[Status]] to linked.
        //    v. If requiredModule and module are the same Module Record, set done to true.
        for required_module in walk.pop_component(module) {
            agent
                .module_status
                .insert(required_module, CyclicModuleRecordStatus::Linked);
        }
    }
    // 14. Return index.
    Ok(index)
}

/// ### [16.2.1.6.1.3.1 InnerModuleEvaluation ( module, stack, index )](https://tc39.es/ecma262/#sec-innermoduleevaluation)
///
/// The stack and index parameters, as well as the module's \[\[DFSIndex]]
/// and \[\[DFSAncestorIndex]], are used the same way as in
/// InnerModuleLinking.
///
/// A module is instantiated and its instance cached before any of its
/// dependencies are visited, so that modules of the same cycle can already
/// see each other's instances.
fn inner_module_evaluation(
    agent: &mut Agent,
    module: &Module,
    walk: &mut GraphWalk,
    index: u32,
    depth: u32,
) -> JsResult<u32> {
    agent.check_interrupt()?;
    // 1. If module is not a Cyclic Module Record, then
    let Module::Cyclic(record) = module else {
        // a. Perform ? EvaluateModuleSync(module).
        evaluate_foreign_module(agent, module)?;
        // b. Return index.
        return Ok(index);
    };
    if let Some(evaluation) = agent.module_instances.evaluation(module) {
        match evaluation.status {
            // 2. If module.[[Status]] is either evaluating-async or evaluated, then
            CyclicModuleRecordStatus::EvaluatingAsync | CyclicModuleRecordStatus::Evaluated => {
                // a. If module.[[EvaluationError]] is empty, return index.
                // b. Otherwise, return ? module.[[EvaluationError]].
                return match &evaluation.evaluation_error {
                    None => Ok(index),
                    Some(error) => Err(error.clone()),
                };
            }
            // 3. If module.[[Status]] is evaluating, return index.
            CyclicModuleRecordStatus::Evaluating => return Ok(index),
            _ => unreachable!("Module instance in a link status"),
        }
    }
    // 4. Assert: module.[[Status]] is linked.
    if cyclic_status(agent, module) != CyclicModuleRecordStatus::Linked {
        return Err(agent.throw_exception(
            ExceptionType::TypeError,
            format!("Module '{module}' must be linked before it is evaluated"),
        ));
    }
    check_depth(agent, depth)?;
    log::trace!("Evaluating module {module} at index {index}");
    let record = record.clone();
    let instance = record.clone().instantiate(agent)?;
    // 5. Set module.[[Status]] to evaluating.
    // 8. Set module.[[PendingAsyncDependencies]] to 0.
    agent.module_instances.insert_cyclic(
        module.clone(),
        instance.clone(),
        CyclicModuleEvaluation::new(record.has_tla()),
    );
    // 6. Set module.[[DFSIndex]] to index.
    // 7. Set module.[[DFSAncestorIndex]] to index.
    walk.set_dfs_index(module, index);
    // 9. Set index to index + 1.
    let mut index = index + 1;
    // 10. Append module to stack.
    walk.stack.push(module.clone());
    let host_hooks = agent.host_hooks;
    // 11. For each ModuleRequest Record request of module.[[RequestedModules]], do
    for specifier in record.requested_modules() {
        // a. Let requiredModule be GetImportedModule(module, request).
        let mut required_module =
            host_hooks.resolve_imported_module(agent, Some(module), specifier)?;
        // b. Set index to ? InnerModuleEvaluation(requiredModule, stack, index).
        index = inner_module_evaluation(agent, &required_module, walk, index, depth + 1)?;
        // c. If requiredModule is a Cyclic Module Record, then
        if required_module.as_cyclic().is_none() {
            continue;
        }
        // i. Assert: requiredModule.[[Status]] is one of evaluating,
        //    evaluating-async, or evaluated.
        // ii. Assert: requiredModule.[[Status]] is evaluating if and only if
        //     stack contains requiredModule.
        // iii. If requiredModule.[[Status]] is evaluating, then
        if evaluation(agent, &required_module).status == CyclicModuleRecordStatus::Evaluating {
            // 1. Set module.[[DFSAncestorIndex]] to
            //    min(module.[[DFSAncestorIndex]], requiredModule.[[DFSAncestorIndex]]).
            walk.update_ancestor_index(module, &required_module);
        } else {
            // iv. Else,
            // 1. Set requiredModule to requiredModule.[[CycleRoot]].
            required_module = evaluation(agent, &required_module)
                .cycle_root
                .clone()
                .expect("Evaluated module has no cycle root");
            // 2. Assert: requiredModule.[[Status]] is either evaluating-async or evaluated.
            // 3. If requiredModule.[[EvaluationError]] is not empty, return
            //    ? requiredModule.[[EvaluationError]].
            if let Some(error) = &evaluation(agent, &required_module).evaluation_error {
                return Err(error.clone());
            }
        }
        // v. If requiredModule.[[AsyncEvaluationOrder]] is an integer, then
        if let AsyncEvaluationOrder::Order(_) =
            evaluation(agent, &required_module).async_evaluation_order
        {
            // 1. Set module.[[PendingAsyncDependencies]] to
            //    module.[[PendingAsyncDependencies]] + 1.
            evaluation_mut(agent, module).pending_async_dependencies += 1;
            // 2. Append module to requiredModule.[[AsyncParentModules]].
            evaluation_mut(agent, &required_module)
                .async_parent_modules
                .push(module.clone());
        }
    }
    let module_evaluation = evaluation(agent, module);
    let pending_async_dependencies = module_evaluation.pending_async_dependencies;
    // 12. If module.[[PendingAsyncDependencies]] > 0 or module.[[HasTLA]] is true, then
    if pending_async_dependencies > 0 || module_evaluation.has_tla {
        // a. Assert: module.[[AsyncEvaluationOrder]] is unset.
        debug_assert_eq!(
            module_evaluation.async_evaluation_order,
            AsyncEvaluationOrder::Unset
        );
        // b. Set module.[[AsyncEvaluationOrder]] to IncrementModuleAsyncEvaluationCount().
        let order = agent.increment_module_async_evaluation_count();
        evaluation_mut(agent, module).async_evaluation_order = AsyncEvaluationOrder::Order(order);
        // c. If module.[[PendingAsyncDependencies]] = 0, perform ExecuteAsyncModule(module).
        if pending_async_dependencies == 0 {
            execute_async_module(agent, module)?;
        }
    } else {
        // 13. Else,
        // a. Perform ? module.ExecuteModule().
        instance.execute_module(agent, None)?;
    }
    // 14. Assert: module occurs exactly once in stack.
    // 15. Assert: module.[[DFSAncestorIndex]] ≤ module.[[DFSIndex]].
    // 16. If module.[[DFSAncestorIndex]] = module.[[DFSIndex]], then
    if walk.is_component_root(module) {
        // a. Let done be false.
        // b. Repeat, while done is false,
        for required_module in walk.pop_component(module) {
            // i. Let requiredModule be the last element of stack.
            // ii. Remove the last element of stack.
            // iii. Assert: requiredModule is a Cyclic Module Record.
            let evaluation = evaluation_mut(agent, &required_module);
            // iv. Assert: requiredModule.[[AsyncEvaluationOrder]] is either an integer or unset.
            // v. If requiredModule.[[AsyncEvaluationOrder]] is unset, set
            //    requiredModule.[[Status]] to evaluated.
            // vi. Otherwise, set requiredModule.[[Status]] to evaluating-async.
            evaluation.status = match evaluation.async_evaluation_order {
                AsyncEvaluationOrder::Unset => CyclicModuleRecordStatus::Evaluated,
                _ => CyclicModuleRecordStatus::EvaluatingAsync,
            };
            // vii. If requiredModule and module are the same Module Record, set done to true.
            // viii. Set requiredModule.[[CycleRoot]] to module.
            evaluation.cycle_root = Some(module.clone());
        }
    }
    // 17. Return index.
    Ok(index)
}

/// ### [16.2.1.6.1.3.2 EvaluateModuleSync ( module )](https://tc39.es/ecma262/#sec-EvaluateModuleSync)
///
/// Foreign modules are evaluated at most once per agent. Failures are not
/// cached.
fn evaluate_foreign_module(agent: &mut Agent, module: &Module) -> JsResult<ModuleInstance> {
    if let Some(instance) = agent.get_module_instance(module) {
        return Ok(instance);
    }
    let Module::Foreign(record) = module else {
        unreachable!("EvaluateModuleSync of a cyclic module")
    };
    log::trace!("Evaluating foreign module {module}");
    let instance = record.clone().evaluate(agent)?;
    agent
        .module_instances
        .insert_foreign(module.clone(), instance.clone());
    Ok(ModuleInstance::Foreign(instance))
}

fn cyclic_instance(agent: &Agent, module: &Module) -> Rc<dyn CyclicModuleInstance> {
    agent
        .module_instances
        .cyclic_instance(module)
        .expect("Module has not been instantiated")
}

/// ### [16.2.1.6.1.3.3 ExecuteAsyncModule ( module )](https://tc39.es/ecma262/#sec-execute-async-module)
fn execute_async_module(agent: &mut Agent, module: &Module) -> JsResult<()> {
    // 1. Assert: module.[[Status]] is either evaluating or evaluating-async.
    // 2. Assert: module.[[HasTLA]] is true.
    debug_assert!(evaluation(agent, module).has_tla);
    // 3. Let capability be ! NewPromiseCapability(%Promise%).
    let capability = PromiseCapability::new(agent);
    // 4. Let fulfilledClosure be a new Abstract Closure with no parameters
    //    that captures module and performs the following steps when called:
    //    a. Perform AsyncModuleExecutionFulfilled(module).
    //    b. Return undefined.
    // 5. Let onFulfilled be CreateBuiltinFunction(fulfilledClosure, 0, "", « »).
    // 6. Let rejectedClosure be a new Abstract Closure with parameters
    //    (error) that captures module and performs the following steps when called:
    //    a. Perform AsyncModuleExecutionRejected(module, error).
    //    b. Return undefined.
    // 7. Let onRejected be CreateBuiltinFunction(rejectedClosure, 0, "", « »).
    // 8. Perform PerformPromiseThen(capability.[[Promise]], onFulfilled, onRejected).
    inner_promise_then(
        agent,
        capability.promise(),
        PromiseReactionHandler::AsyncModule(module.clone()),
        PromiseReactionHandler::AsyncModule(module.clone()),
        None,
    );
    // 9. Perform ! module.ExecuteModule(capability).
    cyclic_instance(agent, module).execute_module(agent, Some(capability))
    // 10. Return unused.
}

/// ### [16.2.1.6.1.3.4 GatherAvailableAncestors ( module, execList )](https://tc39.es/ecma262/#sec-gather-available-ancestors)
fn gather_available_ancestors(agent: &mut Agent, module: &Module, exec_list: &mut Vec<Module>) {
    // 1. For each Cyclic Module Record m of module.[[AsyncParentModules]], do
    let parents = evaluation(agent, module).async_parent_modules.clone();
    for m in parents {
        // a. If execList does not contain m and
        //    m.[[CycleRoot]].[[EvaluationError]] is empty, then
        if exec_list.contains(&m) {
            continue;
        }
        let m_evaluation = evaluation(agent, &m);
        if m_evaluation.evaluation_error.is_some() {
            continue;
        }
        let cycle_root = m_evaluation.cycle_root.as_ref().unwrap_or(&m);
        if evaluation(agent, cycle_root).evaluation_error.is_some() {
            continue;
        }
        let m_evaluation = evaluation_mut(agent, &m);
        // i. Assert: m.[[Status]] is evaluating-async.
        debug_assert_eq!(m_evaluation.status, CyclicModuleRecordStatus::EvaluatingAsync);
        // ii. Assert: m.[[EvaluationError]] is empty.
        // iii. Assert: m.[[AsyncEvaluationOrder]] is an integer.
        // iv. Assert: m.[[PendingAsyncDependencies]] > 0.
        debug_assert!(m_evaluation.pending_async_dependencies > 0);
        // v. Set m.[[PendingAsyncDependencies]] to m.[[PendingAsyncDependencies]] - 1.
        m_evaluation.pending_async_dependencies -= 1;
        // vi. If m.[[PendingAsyncDependencies]] = 0, then
        if m_evaluation.pending_async_dependencies == 0 {
            let has_tla = m_evaluation.has_tla;
            // 1. Append m to execList.
            exec_list.push(m.clone());
            // 2. If m.[[HasTLA]] is false, perform GatherAvailableAncestors(m, execList).
            if !has_tla {
                gather_available_ancestors(agent, &m, exec_list);
            }
        }
    }
    // 2. Return unused.
}

/// ### [16.2.1.6.1.3.5 AsyncModuleExecutionFulfilled ( module )](https://tc39.es/ecma262/#sec-async-module-execution-fulfilled)
///
/// Only returns an error if the agent was interrupted.
pub(crate) fn async_module_execution_fulfilled(agent: &mut Agent, module: &Module) -> JsResult<()> {
    let module_evaluation = evaluation_mut(agent, module);
    // 1. If module.[[Status]] is evaluated, then
    if module_evaluation.status == CyclicModuleRecordStatus::Evaluated {
        // a. Assert: module.[[EvaluationError]] is not empty.
        debug_assert!(module_evaluation.evaluation_error.is_some());
        // b. Return unused.
        return Ok(());
    }
    // 2. Assert: module.[[Status]] is evaluating-async.
    // 3. Assert: module.[[AsyncEvaluationOrder]] is an integer.
    // 4. Assert: module.[[EvaluationError]] is empty.
    // 5. Set module.[[AsyncEvaluationOrder]] to done.
    module_evaluation.async_evaluation_order = AsyncEvaluationOrder::Done;
    // 6. Set module.[[Status]] to evaluated.
    module_evaluation.status = CyclicModuleRecordStatus::Evaluated;
    log::trace!("Module {module} finished evaluating asynchronously");
    // 7. If module.[[TopLevelCapability]] is not empty, then
    if let Some(capability) = module_evaluation.top_level_capability {
        // a. Assert: module.[[CycleRoot]] and module are the same Module Record.
        // b. Perform ! Call(module.[[TopLevelCapability]].[[Resolve]], undefined, « undefined »).
        capability.resolve(agent, Value::Undefined);
    }
    // 8. Let execList be a new empty List.
    let mut exec_list = Vec::new();
    // 9. Perform GatherAvailableAncestors(module, execList).
    gather_available_ancestors(agent, module, &mut exec_list);
    // 10. Let sortedExecList be a List whose elements are the elements of
    //     execList, sorted by their [[AsyncEvaluationOrder]] field in ascending order.
    exec_list.sort_by_key(|m| match evaluation(agent, m).async_evaluation_order {
        AsyncEvaluationOrder::Order(order) => order,
        _ => unreachable!("Gathered module has no async evaluation order"),
    });
    // 11. Assert: All elements of sortedExecList have their
    //     [[AsyncEvaluationOrder]] field set to an integer,
    //     [[PendingAsyncDependencies]] field set to 0, and
    //     [[EvaluationError]] field set to empty.
    // 12. For each Cyclic Module Record m of sortedExecList, do
    for m in exec_list {
        let m_evaluation = evaluation(agent, &m);
        // a. If m.[[Status]] is evaluated, then
        if m_evaluation.status == CyclicModuleRecordStatus::Evaluated {
            // i. Assert: m.[[EvaluationError]] is not empty.
            debug_assert!(m_evaluation.evaluation_error.is_some());
        } else if m_evaluation.has_tla {
            // b. Else if m.[[HasTLA]] is true, then
            // i. Perform ExecuteAsyncModule(m).
            execute_async_module(agent, &m)?;
        } else {
            // c. Else,
            // i. Let result be m.ExecuteModule().
            let result = cyclic_instance(agent, &m).execute_module(agent, None);
            match result {
                // ii. If result is an abrupt completion, then
                Err(error) => {
                    let is_interrupt = error.is_interrupt();
                    // 1. Perform AsyncModuleExecutionRejected(m, result.[[Value]]).
                    async_module_execution_rejected(agent, &m, error.clone());
                    if is_interrupt {
                        return Err(error);
                    }
                }
                // iii. Else,
                Ok(()) => {
                    let m_evaluation = evaluation_mut(agent, &m);
                    // 1. Set m.[[AsyncEvaluationOrder]] to done.
                    m_evaluation.async_evaluation_order = AsyncEvaluationOrder::Done;
                    // 2. Set m.[[Status]] to evaluated.
                    m_evaluation.status = CyclicModuleRecordStatus::Evaluated;
                    // 3. If m.[[TopLevelCapability]] is not empty, then
                    if let Some(capability) = m_evaluation.top_level_capability {
                        // a. Assert: m.[[CycleRoot]] and m are the same Module Record.
                        // b. Perform ! Call(m.[[TopLevelCapability]].[[Resolve]], undefined, « undefined »).
                        capability.resolve(agent, Value::Undefined);
                    }
                }
            }
        }
    }
    // 13. Return unused.
    Ok(())
}

/// ### [16.2.1.6.1.3.6 AsyncModuleExecutionRejected ( module, error )](https://tc39.es/ecma262/#sec-async-module-execution-rejected)
pub(crate) fn async_module_execution_rejected(agent: &mut Agent, module: &Module, error: JsError) {
    let module_evaluation = evaluation_mut(agent, module);
    // 1. If module.[[Status]] is evaluated, then
    if module_evaluation.status == CyclicModuleRecordStatus::Evaluated {
        // a. Assert: module.[[EvaluationError]] is not empty.
        // b. Return unused.
        return;
    }
    // 2. Assert: module.[[Status]] is evaluating-async.
    // 3. Assert: module.[[AsyncEvaluationOrder]] is an integer.
    // 4. Assert: module.[[EvaluationError]] is empty.
    // 5. Set module.[[EvaluationError]] to ThrowCompletion(error).
    // 6. Set module.[[Status]] to evaluated.
    module_evaluation.set_evaluation_error(error.clone());
    // 7. Set module.[[AsyncEvaluationOrder]] to done.
    module_evaluation.async_evaluation_order = AsyncEvaluationOrder::Done;
    let parents = module_evaluation.async_parent_modules.clone();
    let top_level_capability = module_evaluation.top_level_capability;
    log::trace!("Module {module} rejected asynchronously");
    // 8. NOTE: module.[[AsyncEvaluationOrder]] is set to done for symmetry
    //    with AsyncModuleExecutionFulfilled.
    // 9. For each Cyclic Module Record m of module.[[AsyncParentModules]], do
    for m in parents {
        // a. Perform AsyncModuleExecutionRejected(m, error).
        async_module_execution_rejected(agent, &m, error.clone());
    }
    // 10. If module.[[TopLevelCapability]] is not empty, then
    if let Some(capability) = top_level_capability {
        // a. Assert: module.[[CycleRoot]] and module are the same Module Record.
        // b. Perform ! Call(module.[[TopLevelCapability]].[[Reject]], undefined, « error »).
        capability.reject(agent, error.into_value());
    }
    // 11. Return unused.
}
