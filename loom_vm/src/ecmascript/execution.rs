// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod agent;
mod default_host_hooks;
pub(crate) mod environments;
pub(crate) mod realm;

pub use agent::{Agent, AgentOptions, ExceptionType, HostHooks, InterruptHandle, JsError, JsResult};
pub use default_host_hooks::DefaultHostHooks;
pub(crate) use environments::{Binding, Environment, EnvironmentHeapData};
pub(crate) use realm::Realm;
