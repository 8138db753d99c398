// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::{Agent, ExceptionType, HostHooks, JsResult};
use crate::ecmascript::scripts_and_modules::module::module_semantics::abstract_module_records::Module;

/// Host hooks for embeddings without a module loader: every module request
/// fails.
#[derive(Debug)]
pub struct DefaultHostHooks;

impl HostHooks for DefaultHostHooks {
    fn resolve_imported_module(
        &self,
        agent: &mut Agent,
        _referrer: Option<&Module>,
        specifier: &str,
    ) -> JsResult<Module> {
        Err(agent.throw_exception(
            ExceptionType::TypeError,
            format!("Cannot find module '{specifier}'"),
        ))
    }
}
