// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Module instances are the per-agent runtime side of module records: the
//! environment a module body runs in and the bindings other modules read.
//! Each agent instantiates a module record at most once.

use std::{fmt::Debug, rc::Rc};

use ahash::AHashMap;

use super::{abstract_module_records::Module, cyclic_module_records::CyclicModuleEvaluation};
use crate::ecmascript::{
    builtins::PromiseCapability,
    execution::{Agent, JsResult},
    types::Value,
};

pub trait ModuleInstanceMethods: Debug {
    /// ### GetBindingValue(N, S)
    ///
    /// Reads the binding `name` in this instance's environment. Returns None
    /// if there is no such binding, and throws a ReferenceError if the
    /// binding is still uninitialized.
    fn get_binding_value(&self, agent: &mut Agent, name: &str) -> JsResult<Option<Value>>;
}

/// The instance of a cyclic module record.
pub trait CyclicModuleInstance: ModuleInstanceMethods {
    /// ### ExecuteModule(\[promiseCapability])
    ///
    /// Evaluate the module's code within its execution context. If the
    /// module has top-level await, a PromiseCapability is passed and the
    /// method must settle it instead of throwing. Only interrupts may be
    /// returned as errors in that case.
    fn execute_module(
        self: Rc<Self>,
        agent: &mut Agent,
        capability: Option<PromiseCapability>,
    ) -> JsResult<()>;
}

#[derive(Debug, Clone)]
pub enum ModuleInstance {
    Cyclic(Rc<dyn CyclicModuleInstance>),
    Foreign(Rc<dyn ModuleInstanceMethods>),
}

impl ModuleInstance {
    pub fn get_binding_value(&self, agent: &mut Agent, name: &str) -> JsResult<Option<Value>> {
        match self {
            ModuleInstance::Cyclic(instance) => instance.get_binding_value(agent, name),
            ModuleInstance::Foreign(instance) => instance.get_binding_value(agent, name),
        }
    }
}

#[derive(Debug)]
struct CachedModule {
    instance: ModuleInstance,
    /// Evaluation state of cyclic modules.
    evaluation: Option<CyclicModuleEvaluation>,
}

/// Map from module record to this agent's instance of it. Entries are never
/// replaced or removed.
#[derive(Debug, Default)]
pub(crate) struct ModuleInstanceCache {
    modules: AHashMap<Module, CachedModule>,
}

impl ModuleInstanceCache {
    pub(crate) fn len(&self) -> usize {
        self.modules.len()
    }

    pub(crate) fn get_instance(&self, module: &Module) -> Option<ModuleInstance> {
        self.modules.get(module).map(|cached| cached.instance.clone())
    }

    pub(crate) fn insert_foreign(&mut self, module: Module, instance: Rc<dyn ModuleInstanceMethods>) {
        let previous = self.modules.insert(
            module,
            CachedModule {
                instance: ModuleInstance::Foreign(instance),
                evaluation: None,
            },
        );
        debug_assert!(previous.is_none(), "Module instantiated twice");
    }

    pub(crate) fn insert_cyclic(
        &mut self,
        module: Module,
        instance: Rc<dyn CyclicModuleInstance>,
        evaluation: CyclicModuleEvaluation,
    ) {
        let previous = self.modules.insert(
            module,
            CachedModule {
                instance: ModuleInstance::Cyclic(instance),
                evaluation: Some(evaluation),
            },
        );
        debug_assert!(previous.is_none(), "Module instantiated twice");
    }

    pub(crate) fn cyclic_instance(&self, module: &Module) -> Option<Rc<dyn CyclicModuleInstance>> {
        match &self.modules.get(module)?.instance {
            ModuleInstance::Cyclic(instance) => Some(instance.clone()),
            ModuleInstance::Foreign(_) => None,
        }
    }

    pub(crate) fn evaluation(&self, module: &Module) -> Option<&CyclicModuleEvaluation> {
        self.modules.get(module)?.evaluation.as_ref()
    }

    pub(crate) fn evaluation_mut(&mut self, module: &Module) -> Option<&mut CyclicModuleEvaluation> {
        self.modules.get_mut(module)?.evaluation.as_mut()
    }
}
