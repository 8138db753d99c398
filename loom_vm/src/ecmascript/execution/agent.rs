// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [9.7 Agents](https://tc39.es/ecma262/#sec-agents)

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use ahash::AHashMap;

use super::{Environment, EnvironmentHeapData, Realm};
use crate::ecmascript::{
    builtins::{
        error::create_error_object,
        module_namespace::get_module_namespace,
        promise_objects::{
            Promise, PromiseCapability, PromiseRejectionTrackerOperation,
            promise_jobs::{PromiseReactionJob, PromiseResolveThenableJob},
        },
    },
    scripts_and_modules::module::{
        DynamicImportJob,
        module_semantics::{
            abstract_module_records::Module,
            cyclic_module_records::CyclicModuleRecordStatus,
            module_instances::{ModuleInstance, ModuleInstanceCache},
        },
    },
    types::{JsString, Object, ObjectHeapData, Value},
};

#[derive(Debug, Clone)]
pub struct AgentOptions {
    /// Print the lowered body of each module before it is executed.
    pub print_internals: bool,
    /// Longest chain of nested module requests a single Link() or Evaluate()
    /// walk may follow before throwing a RangeError.
    pub max_module_graph_depth: u32,
    /// Deepest JavaScript call stack before throwing a RangeError.
    pub max_call_depth: u32,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            print_internals: false,
            max_module_graph_depth: 1000,
            max_call_depth: 256,
        }
    }
}

pub type JsResult<T> = std::result::Result<T, JsError>;

/// A thrown JavaScript value.
#[derive(Debug, Clone)]
pub struct JsError {
    value: Value,
    interrupt: bool,
}

impl JsError {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            interrupt: false,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Interrupt errors cannot be caught by `try` statements.
    pub fn is_interrupt(&self) -> bool {
        self.interrupt
    }

    pub fn to_string(&self, agent: &mut Agent) -> JsString {
        self.value.string_repr(agent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionType {
    Error,
    RangeError,
    ReferenceError,
    SyntaxError,
    TypeError,
}

impl ExceptionType {
    pub fn name(self) -> &'static str {
        match self {
            ExceptionType::Error => "Error",
            ExceptionType::RangeError => "RangeError",
            ExceptionType::ReferenceError => "ReferenceError",
            ExceptionType::SyntaxError => "SyntaxError",
            ExceptionType::TypeError => "TypeError",
        }
    }
}

/// Requests that the agent stop executing JavaScript. Can be sent to other
/// threads.
#[derive(Debug, Clone)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

pub trait HostHooks: std::fmt::Debug {
    /// ### [16.2.1.10 HostLoadImportedModule ( referrer, moduleRequest, hostDefined, payload )](https://tc39.es/ecma262/#sec-HostLoadImportedModule)
    ///
    /// Resolves the module `specifier` requested by `referrer`. `referrer` is
    /// None for requests that do not originate from a module.
    ///
    /// This is called once for each edge of the module graph on each Link()
    /// and Evaluate() traversal. The engine does not cache the results, so
    /// the host must return the same Module for the same
    /// `(referrer, specifier)` pair if module identity is to be preserved.
    fn resolve_imported_module(
        &self,
        agent: &mut Agent,
        referrer: Option<&Module>,
        specifier: &str,
    ) -> JsResult<Module>;

    /// ### [13.3.10.1.1 EvaluateImportCall ( specifierExpression \[ , optionsExpression \] )](https://tc39.es/ecma262/#sec-evaluate-import-call)
    ///
    /// Called for each `import()` expression. The host must eventually call
    /// [`finish_dynamic_import`] with the resolved module or an error, which
    /// links and evaluates it and settles `capability`.
    ///
    /// The default implementation enqueues a job that resolves the specifier
    /// with [`HostHooks::resolve_imported_module`] once the current
    /// evaluation has finished.
    ///
    /// [`finish_dynamic_import`]: crate::ecmascript::scripts_and_modules::module::finish_dynamic_import
    fn import_module_dynamically(
        &self,
        agent: &mut Agent,
        referrer: Option<Module>,
        specifier: JsString,
        capability: PromiseCapability,
    ) {
        agent.enqueue_job(Job::dynamic_import(referrer, specifier, capability));
    }

    /// ### [16.2.1.12 HostGetImportMetaProperties ( moduleRecord )](https://tc39.es/ecma262/#sec-hostgetimportmetaproperties)
    ///
    /// Called once per module and agent on the first `import.meta` access.
    fn get_import_meta_properties(
        &self,
        _agent: &mut Agent,
        _module: &Module,
    ) -> Vec<(JsString, Value)> {
        Vec::new()
    }

    /// ### [27.2.1.9 HostPromiseRejectionTracker ( promise, operation )](https://tc39.es/ecma262/#sec-host-promise-rejection-tracker)
    fn promise_rejection_tracker(
        &self,
        _promise: Promise,
        _operation: PromiseRejectionTrackerOperation,
    ) {
    }
}

/// ### [9.5 Jobs and Host Operations to Enqueue Jobs](https://tc39.es/ecma262/#sec-jobs)
#[derive(Debug)]
pub struct Job {
    inner: InnerJob,
}

#[derive(Debug)]
enum InnerJob {
    PromiseReaction(PromiseReactionJob),
    PromiseResolveThenable(PromiseResolveThenableJob),
    DynamicImport(DynamicImportJob),
}

impl Job {
    pub(crate) fn promise_reaction(job: PromiseReactionJob) -> Self {
        Self {
            inner: InnerJob::PromiseReaction(job),
        }
    }

    pub(crate) fn promise_resolve_thenable(job: PromiseResolveThenableJob) -> Self {
        Self {
            inner: InnerJob::PromiseResolveThenable(job),
        }
    }

    pub(crate) fn dynamic_import(
        referrer: Option<Module>,
        specifier: JsString,
        capability: PromiseCapability,
    ) -> Self {
        Self {
            inner: InnerJob::DynamicImport(DynamicImportJob {
                referrer,
                specifier,
                capability,
            }),
        }
    }

    pub fn run(self, agent: &mut Agent) -> JsResult<()> {
        agent.check_interrupt()?;
        match self.inner {
            InnerJob::PromiseReaction(job) => job.run(agent),
            InnerJob::PromiseResolveThenable(job) => job.run(agent),
            InnerJob::DynamicImport(job) => job.run(agent),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Heap {
    pub(crate) objects: Vec<ObjectHeapData>,
    pub(crate) environments: Vec<EnvironmentHeapData>,
}

/// ### [9.7 Agents](https://tc39.es/ecma262/#sec-agents)
///
/// An agent owns everything that is per-runtime: the heap, the realm, the
/// job queue and the link and evaluation state of every module it has seen.
/// Module records themselves carry no runtime state, so the same records can
/// be linked and evaluated by several agents independently.
pub struct Agent {
    pub(crate) heap: Heap,
    pub(crate) options: AgentOptions,
    pub(crate) host_hooks: &'static dyn HostHooks,
    pub(crate) realm: Realm,
    /// Link status of every cyclic module this agent has started linking.
    /// Absent modules are unlinked.
    pub(crate) module_status: AHashMap<Module, CyclicModuleRecordStatus>,
    /// Module environments created by InitializeEnvironment, waiting to be
    /// taken up by Instantiate.
    pub(crate) module_environments: AHashMap<Module, Environment>,
    pub(crate) module_instances: ModuleInstanceCache,
    pub(crate) module_namespaces: AHashMap<Module, Object>,
    pub(crate) import_meta_objects: AHashMap<Module, Object>,
    /// ### [\[\[ModuleAsyncEvaluationCount]]](https://tc39.es/ecma262/#sec-agents)
    pub(crate) module_async_evaluation_count: u32,
    pub(crate) call_depth: u32,
    job_queue: VecDeque<Job>,
    interrupt: Arc<AtomicBool>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("options", &self.options)
            .field("objects", &self.heap.objects.len())
            .field("environments", &self.heap.environments.len())
            .field("module_instances", &self.module_instances.len())
            .field("job_queue", &self.job_queue.len())
            .finish()
    }
}

impl Agent {
    pub fn new(options: AgentOptions, host_hooks: &'static dyn HostHooks) -> Self {
        let mut heap = Heap::default();
        let realm = Realm::create(&mut heap);
        Self {
            heap,
            options,
            host_hooks,
            realm,
            module_status: AHashMap::default(),
            module_environments: AHashMap::default(),
            module_instances: ModuleInstanceCache::default(),
            module_namespaces: AHashMap::default(),
            import_meta_objects: AHashMap::default(),
            module_async_evaluation_count: 0,
            call_depth: 0,
            job_queue: VecDeque::new(),
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    pub fn host_hooks(&self) -> &'static dyn HostHooks {
        self.host_hooks
    }

    pub fn global_object(&self) -> Object {
        self.realm.global_object
    }

    pub(crate) fn global_env(&self) -> Environment {
        self.realm.global_env
    }

    /// Creates an error object of the given type and returns it as a thrown
    /// value.
    pub fn throw_exception(&mut self, kind: ExceptionType, message: impl AsRef<str>) -> JsError {
        let error = create_error_object(self, kind, message.as_ref());
        JsError::new(Value::Object(error))
    }

    pub fn enqueue_job(&mut self, job: Job) {
        self.job_queue.push_back(job);
    }

    pub fn has_pending_jobs(&self) -> bool {
        !self.job_queue.is_empty()
    }

    /// Runs queued jobs until the queue is empty. Only an interrupt stops the
    /// queue early; errors thrown by reaction handlers settle their derived
    /// promises instead.
    pub fn run_jobs(&mut self) -> JsResult<()> {
        while let Some(job) = self.job_queue.pop_front() {
            job.run(self)?;
        }
        Ok(())
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle(self.interrupt.clone())
    }

    /// Throws an uncatchable error if an interrupt was requested since the
    /// last check.
    pub(crate) fn check_interrupt(&mut self) -> JsResult<()> {
        if !self.interrupt.swap(false, Ordering::Relaxed) {
            return Ok(());
        }
        log::debug!("agent interrupted");
        let error = create_error_object(self, ExceptionType::Error, "Execution interrupted");
        error.define_own(&mut self.heap, "name", Value::from("InterruptError"));
        Err(JsError {
            value: Value::Object(error),
            interrupt: true,
        })
    }

    /// ### [16.2.1.11 GetModuleNamespace ( module )](https://tc39.es/ecma262/#sec-getmodulenamespace)
    pub fn get_module_namespace(&mut self, module: &Module) -> JsResult<Object> {
        get_module_namespace(self, module)
    }

    /// Returns the instance this agent created for `module`, if the module
    /// has been instantiated.
    pub fn get_module_instance(&self, module: &Module) -> Option<ModuleInstance> {
        self.module_instances.get_instance(module)
    }

    /// ### [IncrementModuleAsyncEvaluationCount ( )](https://tc39.es/ecma262/#sec-IncrementModuleAsyncEvaluationCount)
    pub(crate) fn increment_module_async_evaluation_count(&mut self) -> u32 {
        let count = self.module_async_evaluation_count;
        self.module_async_evaluation_count += 1;
        count
    }
}
