// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Utilities for the loom cli program.
//!
//! > [!IMPORTANT]
//! > This library is currently mainly aimed at internal use and might not
//! > adhere to semver versioning.

mod fmt;
mod globals;
mod host_hooks;

pub use fmt::{
    exit_with_parse_errors, print_exports, print_module_entries, print_parse_errors, print_result,
};
pub use host_hooks::{CliHostHooks, LoaderError};

use globals::initialize_global_object;
use loom_vm::ecmascript::{
    builtins::PromiseState,
    execution::{Agent, AgentOptions, InterruptHandle, JsError, JsResult},
    scripts_and_modules::module::module_semantics::abstract_module_records::Module,
};

pub struct InstanceConfig {
    /// Whether to enable verbose logging and print module bodies. Default `false`.
    pub verbose: bool,
    /// Longest chain of nested imports. Default `1000`.
    pub max_module_graph_depth: u32,
    /// Deepest JavaScript call stack. Default `256`.
    pub max_call_depth: u32,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        let options = AgentOptions::default();
        Self {
            verbose: false,
            max_module_graph_depth: options.max_module_graph_depth,
            max_call_depth: options.max_call_depth,
        }
    }
}

impl From<&InstanceConfig> for AgentOptions {
    fn from(config: &InstanceConfig) -> Self {
        AgentOptions {
            print_internals: config.verbose,
            max_module_graph_depth: config.max_module_graph_depth,
            max_call_depth: config.max_call_depth,
        }
    }
}

/// An agent with filesystem host hooks and the CLI globals installed.
pub struct Instance {
    config: InstanceConfig,
    host_hooks: &'static CliHostHooks,
    agent: Agent,
}

impl Instance {
    pub fn new(config: InstanceConfig) -> JsResult<Self> {
        // The agent requires host hooks that outlive it.
        let host_hooks: &'static CliHostHooks = Box::leak(Box::new(CliHostHooks::new()));
        let mut agent = Agent::new(AgentOptions::from(&config), host_hooks);
        initialize_global_object(&mut agent)?;
        Ok(Self {
            config,
            host_hooks,
            agent,
        })
    }

    pub fn config(&self) -> &InstanceConfig {
        &self.config
    }

    pub fn agent(&mut self) -> &mut Agent {
        &mut self.agent
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.agent.interrupt_handle()
    }

    /// Loads an entry module relative to the working directory.
    pub fn load_module(&self, path: &str) -> Result<Module, LoaderError> {
        self.host_hooks.load(None, path)
    }

    /// Links and evaluates `module`, then drains the job queue. A graph with
    /// top-level await fails if its evaluation promise was rejected.
    pub fn run_module(&mut self, module: &Module) -> JsResult<()> {
        let agent = &mut self.agent;
        module.link(agent)?;
        module.evaluate(agent)?;
        agent.run_jobs()?;
        match module.evaluation_promise(agent).map(|promise| promise.state(agent)) {
            Some(PromiseState::Rejected(reason)) => Err(JsError::new(reason)),
            Some(PromiseState::Pending) => {
                log::warn!("Module {module} did not finish evaluating");
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
