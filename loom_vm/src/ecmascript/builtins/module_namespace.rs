// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [10.4.6 Module Namespace Exotic Objects](https://tc39.es/ecma262/#sec-module-namespace-exotic-objects)

use std::rc::Rc;

use crate::ecmascript::{
    execution::{Agent, ExceptionType, JsResult},
    scripts_and_modules::module::module_semantics::abstract_module_records::{
        BindingName, Module, ResolveExportResult,
    },
    types::{JsString, Object, ObjectKind, Value},
};

#[derive(Debug, Clone)]
pub(crate) struct ModuleNamespaceData {
    /// ### \[\[Module]]
    pub(crate) module: Module,
    /// ### \[\[Exports]]
    ///
    /// Sorted by code unit order.
    pub(crate) exports: Rc<[JsString]>,
}

/// ### [16.2.1.11 GetModuleNamespace ( module )](https://tc39.es/ecma262/#sec-getmodulenamespace)
///
/// Namespaces are created once per module and agent.
pub(crate) fn get_module_namespace(agent: &mut Agent, module: &Module) -> JsResult<Object> {
    // 2. Let namespace be module.[[Namespace]].
    if let Some(namespace) = agent.module_namespaces.get(module) {
        return Ok(*namespace);
    }
    // 3. If namespace is empty, then
    // a. Let exportedNames be module.GetExportedNames().
    let exported_names = module.get_exported_names(agent, &mut Vec::new())?;
    // b. Let unambiguousNames be a new empty List.
    let mut unambiguous_names = Vec::with_capacity(exported_names.len());
    // c. For each element name of exportedNames, do
    for name in exported_names {
        // i. Let resolution be module.ResolveExport(name).
        let resolution = module.resolve_export(agent, &name, &mut Vec::new())?;
        // ii. If resolution is a ResolvedBinding Record, append name to unambiguousNames.
        if let Some(ResolveExportResult::Resolved(_)) = resolution {
            unambiguous_names.push(name);
        }
    }
    // d. Set namespace to ModuleNamespaceCreate(module, unambiguousNames).
    let namespace = module_namespace_create(agent, module, unambiguous_names);
    // 4. Return namespace.
    Ok(namespace)
}

/// ### [10.4.6.12 ModuleNamespaceCreate ( module, exports )](https://tc39.es/ecma262/#sec-modulenamespacecreate)
fn module_namespace_create(agent: &mut Agent, module: &Module, mut exports: Vec<JsString>) -> Object {
    // 1. Assert: module.[[Namespace]] is empty.
    debug_assert!(!agent.module_namespaces.contains_key(module));
    // 6. Let sortedExports be a List whose elements are the elements of
    //    exports, sorted according to lexicographic code unit order.
    exports.sort_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));
    // 2. Let internalSlotsList be the internal slots listed in Table 32.
    // 3. Let M be MakeBasicObject(internalSlotsList).
    // 4. Set M's essential internal methods to the definitions specified in 10.4.6.
    // 5. Set M.[[Module]] to module.
    // 7. Set M.[[Exports]] to sortedExports.
    let namespace = Object::create(
        agent,
        None,
        ObjectKind::ModuleNamespace(ModuleNamespaceData {
            module: module.clone(),
            exports: exports.into(),
        }),
    );
    // [[PreventExtensions]] always succeeds.
    agent[namespace].extensible = false;
    // 9. Set module.[[Namespace]] to M.
    agent.module_namespaces.insert(module.clone(), namespace);
    // 10. Return M.
    namespace
}

/// ### [10.4.6.8 \[\[Get\]\] ( P, Receiver )](https://tc39.es/ecma262/#sec-module-namespace-exotic-objects-get-p-receiver)
///
/// Reads go through the live binding of the exporting module.
pub(crate) fn namespace_get(
    agent: &mut Agent,
    data: &ModuleNamespaceData,
    key: &str,
) -> JsResult<Value> {
    // 2. Let exports be O.[[Exports]].
    // 3. If exports does not contain P, return undefined.
    if !data.exports.iter().any(|export| &**export == key) {
        return Ok(Value::Undefined);
    }
    // 4. Let m be O.[[Module]].
    // 5. Let binding be m.ResolveExport(P).
    let binding = data.module.resolve_export(agent, key, &mut Vec::new())?;
    // 6. Assert: binding is a ResolvedBinding Record.
    let Some(ResolveExportResult::Resolved(binding)) = binding else {
        unreachable!("Namespace export '{key}' no longer resolves");
    };
    // 7. Let targetModule be binding.[[Module]].
    let target_module = binding.module;
    let binding_name = match binding.binding_name {
        // 9. If binding.[[BindingName]] is namespace, then
        //    a. Return GetModuleNamespace(targetModule).
        BindingName::Namespace => {
            return get_module_namespace(agent, &target_module).map(Value::Object);
        }
        BindingName::Name(binding_name) => binding_name,
    };
    // 10. Let targetEnv be targetModule.[[Environment]].
    // 11. If targetEnv is empty, throw a ReferenceError exception.
    // 12. Return ? targetEnv.GetBindingValue(binding.[[BindingName]], true).
    let value = match agent.get_module_instance(&target_module) {
        Some(instance) => instance.get_binding_value(agent, &binding_name)?,
        None => None,
    };
    value.ok_or_else(|| {
        agent.throw_exception(
            ExceptionType::ReferenceError,
            format!("Cannot access '{key}' before initialization"),
        )
    })
}
