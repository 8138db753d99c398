// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![allow(dead_code)]

use std::{cell::RefCell, path::PathBuf};

use ahash::AHashMap;
use loom_vm::ecmascript::{
    execution::{Agent, AgentOptions, ExceptionType, HostHooks, JsError, JsResult},
    scripts_and_modules::module::module_semantics::{
        abstract_module_records::Module, source_text_module_records::parse_module,
    },
    types::{JsString, Value},
};

/// Host hooks that resolve specifiers to explicitly registered modules or
/// to files under `tests/sources`. Every specifier resolves to the same
/// module for the lifetime of the host.
#[derive(Debug, Default)]
pub struct TestHost {
    modules: RefCell<AHashMap<String, Module>>,
}

impl TestHost {
    pub fn leak() -> &'static TestHost {
        Box::leak(Box::default())
    }

    pub fn register(&self, specifier: &str, module: Module) {
        self.modules
            .borrow_mut()
            .insert(specifier.to_string(), module);
    }

    /// Loads a fixture module through the same path the agent uses.
    pub fn load(&self, agent: &mut Agent, specifier: &str) -> Module {
        self.resolve_imported_module(agent, None, specifier)
            .unwrap_or_else(|error| {
                panic!("Failed to load {specifier}: {}", error.to_string(agent))
            })
    }
}

impl HostHooks for TestHost {
    fn resolve_imported_module(
        &self,
        agent: &mut Agent,
        _referrer: Option<&Module>,
        specifier: &str,
    ) -> JsResult<Module> {
        if let Some(module) = self.modules.borrow().get(specifier) {
            return Ok(module.clone());
        }
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("sources")
            .join(specifier);
        let Ok(source) = std::fs::read_to_string(&path) else {
            return Err(agent.throw_exception(
                ExceptionType::TypeError,
                format!("Cannot find module '{specifier}'"),
            ));
        };
        let record = parse_module(&source, Some(specifier), None).map_err(|errors| {
            agent.throw_exception(ExceptionType::SyntaxError, errors[0].to_string())
        })?;
        let module = Module::from(record);
        self.register(specifier, module.clone());
        Ok(module)
    }

    fn get_import_meta_properties(
        &self,
        _agent: &mut Agent,
        module: &Module,
    ) -> Vec<(JsString, Value)> {
        let url = format!("test:///{}", module.name().unwrap_or_default());
        vec![("url".into(), Value::from(url))]
    }
}

pub fn create_agent(host: &'static TestHost) -> Agent {
    create_agent_with_options(host, AgentOptions::default())
}

pub fn create_agent_with_options(host: &'static TestHost, options: AgentOptions) -> Agent {
    Agent::new(options, host)
}

/// Links and evaluates `module`, then runs all pending jobs.
pub fn run_module(agent: &mut Agent, module: &Module) -> JsResult<()> {
    module.link(agent)?;
    module.evaluate(agent)?;
    agent.run_jobs()
}

pub fn global(agent: &mut Agent, name: &str) -> Value {
    let global = agent.global_object();
    global
        .get(agent, name)
        .expect("Global property read threw")
}

pub fn global_string(agent: &mut Agent, name: &str) -> String {
    let value = global(agent, name);
    value
        .to_string(agent)
        .expect("Global property is not convertible to a string")
        .to_string()
}

pub fn error_message(agent: &mut Agent, error: &JsError) -> String {
    error.to_string(agent).to_string()
}
