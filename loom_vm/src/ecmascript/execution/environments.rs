// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [9.1 Environment Records](https://tc39.es/ecma262/#sec-environment-records)
//!
//! Declarative, function and module environments share one representation.
//! The global environment additionally falls back to the global object.

use std::ops::{Index, IndexMut};

use ahash::AHashMap;

use super::{Agent, ExceptionType, JsResult, agent::Heap};
use crate::ecmascript::{
    scripts_and_modules::module::module_semantics::abstract_module_records::Module,
    types::{JsString, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Environment(u32);

#[derive(Debug, Clone)]
pub(crate) enum Binding {
    /// A `var`, `let`, parameter or function binding. None while in TDZ.
    Mutable(Option<Value>),
    /// A `const` binding. None while in TDZ.
    Immutable(Option<Value>),
    /// ### [9.1.1.5.5 CreateImportBinding ( N, M, N2 )](https://tc39.es/ecma262/#sec-createimportbinding)
    ///
    /// An immutable indirect binding to `binding_name` in `module`'s
    /// instance, read through the agent's instance cache on every access.
    Indirect {
        module: Module,
        binding_name: JsString,
    },
    /// An immutable binding to `module`'s namespace object, created on first
    /// access.
    Namespace(Module),
}

#[derive(Debug)]
pub(crate) struct EnvironmentHeapData {
    pub(crate) outer: Option<Environment>,
    pub(crate) bindings: AHashMap<JsString, Binding>,
    pub(crate) is_global: bool,
}

impl Index<Environment> for Agent {
    type Output = EnvironmentHeapData;

    fn index(&self, index: Environment) -> &Self::Output {
        &self.heap[index]
    }
}

impl IndexMut<Environment> for Agent {
    fn index_mut(&mut self, index: Environment) -> &mut Self::Output {
        &mut self.heap[index]
    }
}

impl Index<Environment> for Heap {
    type Output = EnvironmentHeapData;

    fn index(&self, index: Environment) -> &Self::Output {
        self.environments
            .get(index.0 as usize)
            .expect("Environment out of bounds")
    }
}

impl IndexMut<Environment> for Heap {
    fn index_mut(&mut self, index: Environment) -> &mut Self::Output {
        self.environments
            .get_mut(index.0 as usize)
            .expect("Environment out of bounds")
    }
}

impl Heap {
    pub(crate) fn create_environment(&mut self, outer: Option<Environment>, is_global: bool) -> Environment {
        let index = u32::try_from(self.environments.len()).expect("Environment heap overflow");
        self.environments.push(EnvironmentHeapData {
            outer,
            bindings: AHashMap::default(),
            is_global,
        });
        Environment(index)
    }
}

fn uninitialized_binding_error(agent: &mut Agent, name: &str) -> super::JsError {
    agent.throw_exception(
        ExceptionType::ReferenceError,
        format!("Cannot access '{name}' before initialization"),
    )
}

fn constant_assignment_error(agent: &mut Agent) -> super::JsError {
    agent.throw_exception(ExceptionType::TypeError, "Assignment to constant variable.")
}

impl Environment {
    /// ### [9.1.2.2 NewDeclarativeEnvironment ( E )](https://tc39.es/ecma262/#sec-newdeclarativeenvironment)
    pub(crate) fn new_declarative(agent: &mut Agent, outer: Option<Environment>) -> Self {
        agent.heap.create_environment(outer, false)
    }

    /// ### [9.1.2.6 NewModuleEnvironment ( E )](https://tc39.es/ecma262/#sec-newmoduleenvironment)
    pub(crate) fn new_module(agent: &mut Agent) -> Self {
        let global_env = agent.global_env();
        agent.heap.create_environment(Some(global_env), false)
    }

    pub(crate) fn outer(self, agent: &Agent) -> Option<Environment> {
        agent[self].outer
    }

    pub(crate) fn has_own_binding(self, agent: &Agent, name: &str) -> bool {
        agent[self].bindings.contains_key(name)
    }

    /// ### [9.1.1.1.1 HasBinding ( N )](https://tc39.es/ecma262/#sec-declarative-environment-records-hasbinding-n)
    pub(crate) fn has_binding(self, agent: &Agent, name: &str) -> bool {
        let data = &agent[self];
        data.bindings.contains_key(name)
            || (data.is_global && agent.global_object().has_property(agent, name))
    }

    /// Creates or replaces a binding in this environment.
    pub(crate) fn create_binding(self, agent: &mut Agent, name: JsString, binding: Binding) {
        agent[self].bindings.insert(name, binding);
    }

    /// ### [9.1.1.1.4 InitializeBinding ( N, V )](https://tc39.es/ecma262/#sec-declarative-environment-records-initializebinding-n-v)
    pub(crate) fn initialize_binding(self, agent: &mut Agent, name: &str, value: Value) {
        match agent[self].bindings.get_mut(name) {
            Some(Binding::Mutable(slot)) | Some(Binding::Immutable(slot)) => {
                *slot = Some(value);
            }
            _ => unreachable!("InitializeBinding of an indirect binding"),
        }
    }

    /// ### [9.1.1.1.6 GetBindingValue ( N, S )](https://tc39.es/ecma262/#sec-declarative-environment-records-getbindingvalue-n-s)
    ///
    /// Only looks at this environment. Returns None when the binding does
    /// not exist here.
    pub(crate) fn get_binding_value(self, agent: &mut Agent, name: &str) -> JsResult<Option<Value>> {
        let Some(binding) = agent[self].bindings.get(name).cloned() else {
            return Ok(None);
        };
        read_binding(agent, binding, name).map(Some)
    }

    /// ### [9.1.1.1.5 SetMutableBinding ( N, V, S )](https://tc39.es/ecma262/#sec-declarative-environment-records-setmutablebinding-n-v-s)
    pub(crate) fn set_mutable_binding(self, agent: &mut Agent, name: &str, value: Value) -> JsResult<()> {
        match agent[self].bindings.get_mut(name) {
            Some(Binding::Mutable(Some(slot))) => {
                *slot = value;
                Ok(())
            }
            Some(Binding::Mutable(None)) | Some(Binding::Immutable(None)) => {
                Err(uninitialized_binding_error(agent, name))
            }
            Some(Binding::Immutable(Some(_)))
            | Some(Binding::Indirect { .. })
            | Some(Binding::Namespace(_)) => Err(constant_assignment_error(agent)),
            None => {
                debug_assert!(agent[self].is_global);
                agent.global_object().set(agent, name, value)
            }
        }
    }
}

fn read_binding(agent: &mut Agent, binding: Binding, name: &str) -> JsResult<Value> {
    match binding {
        Binding::Mutable(Some(value)) | Binding::Immutable(Some(value)) => Ok(value),
        Binding::Mutable(None) | Binding::Immutable(None) => {
            Err(uninitialized_binding_error(agent, name))
        }
        Binding::Indirect {
            module,
            binding_name,
        } => {
            // The exporting module's instance only exists once the evaluator
            // has reached it.
            let Some(instance) = agent.get_module_instance(&module) else {
                return Err(uninitialized_binding_error(agent, name));
            };
            match instance.get_binding_value(agent, &binding_name)? {
                Some(value) => Ok(value),
                None => Err(uninitialized_binding_error(agent, name)),
            }
        }
        Binding::Namespace(module) => agent.get_module_namespace(&module).map(Value::Object),
    }
}

/// ### [9.4.2 ResolveBinding ( name \[ , env \] )](https://tc39.es/ecma262/#sec-resolvebinding)
///
/// Returns the innermost environment holding `name`.
pub(crate) fn resolve_binding(agent: &Agent, env: Environment, name: &str) -> Option<Environment> {
    let mut current = Some(env);
    while let Some(env) = current {
        if env.has_binding(agent, name) {
            return Some(env);
        }
        current = env.outer(agent);
    }
    None
}

/// ### [6.2.5.5 GetValue ( V )](https://tc39.es/ecma262/#sec-getvalue)
///
/// For identifier references.
pub(crate) fn get_identifier_value(agent: &mut Agent, env: Environment, name: &str) -> JsResult<Value> {
    let Some(env) = resolve_binding(agent, env, name) else {
        return Err(agent.throw_exception(
            ExceptionType::ReferenceError,
            format!("{name} is not defined"),
        ));
    };
    if let Some(value) = env.get_binding_value(agent, name)? {
        return Ok(value);
    }
    // Global object property.
    let global = agent.global_object();
    global.get(agent, name)
}

/// ### [6.2.5.6 PutValue ( V, W )](https://tc39.es/ecma262/#sec-putvalue)
///
/// For identifier references. Module code is strict, so assigning to an
/// unresolvable reference throws.
pub(crate) fn put_identifier_value(
    agent: &mut Agent,
    env: Environment,
    name: &str,
    value: Value,
) -> JsResult<()> {
    let Some(env) = resolve_binding(agent, env, name) else {
        return Err(agent.throw_exception(
            ExceptionType::ReferenceError,
            format!("{name} is not defined"),
        ));
    };
    env.set_mutable_binding(agent, name, value)
}
