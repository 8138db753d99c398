// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [16.2.1.5 Abstract Module Records](https://tc39.es/ecma262/#sec-abstract-module-records)

use std::{
    fmt::{Debug, Display},
    hash::{Hash, Hasher},
    rc::Rc,
};

use super::{cyclic_module_records::CyclicModuleRecord, module_instances::ModuleInstanceMethods};
use crate::ecmascript::{
    execution::{Agent, JsResult},
    types::JsString,
};

/// ### \[\[BindingName]]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingName {
    /// A binding in the resolved module's environment.
    Name(JsString),
    /// The resolved module's namespace object.
    Namespace,
}

/// ### [ResolvedBinding Record](https://tc39.es/ecma262/#resolvedbinding-record)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinding {
    /// ### \[\[Module]]
    pub module: Module,
    /// ### \[\[BindingName]]
    pub binding_name: BindingName,
}

/// Result of a successful ResolveExport. A name that cannot be resolved is
/// returned as None.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveExportResult {
    /// The name is provided by more than one `export *` with different
    /// bindings.
    Ambiguous,
    Resolved(ResolvedBinding),
}

/// An element of the ResolveExport resolveSet, guarding against revisiting
/// the same `(module, exportName)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveSetElement {
    /// ### \[\[Module]]
    pub module: Module,
    /// ### \[\[ExportName]]
    pub export_name: JsString,
}

pub type ResolveSet = Vec<ResolveSetElement>;

/// ### [Abstract Methods of Module Records](https://tc39.es/ecma262/#table-abstract-methods-of-module-records)
///
/// Link() and Evaluate() are driven by the engine for cyclic modules and so
/// only appear on [`ForeignModuleRecord`].
pub trait ModuleAbstractMethods: Debug {
    /// ### GetExportedNames(\[exportStarSet])
    ///
    /// Return a list of all names that are either directly or indirectly
    /// exported from this module.
    fn get_exported_names(
        self: Rc<Self>,
        agent: &mut Agent,
        export_star_set: &mut Vec<Module>,
    ) -> JsResult<Vec<JsString>>;

    /// ### ResolveExport(exportName \[, resolveSet])
    ///
    /// Return the binding of a name exported by this module. If the export is
    /// a Module Namespace Object without a direct binding in any module, the
    /// binding name is [`BindingName::Namespace`]. Returns None if the name
    /// cannot be resolved and [`ResolveExportResult::Ambiguous`] if multiple
    /// bindings were found.
    fn resolve_export(
        self: Rc<Self>,
        agent: &mut Agent,
        export_name: &str,
        resolve_set: &mut ResolveSet,
    ) -> JsResult<Option<ResolveExportResult>>;

    /// A name for diagnostics and logging.
    fn name(&self) -> Option<&str> {
        None
    }
}

/// A module whose linking and evaluation are opaque to the engine. Foreign
/// modules are leaves of the module graph.
pub trait ForeignModuleRecord: ModuleAbstractMethods {
    /// ### Link()
    fn link(self: Rc<Self>, agent: &mut Agent) -> JsResult<()>;

    /// ### Evaluate()
    ///
    /// Called at most once per agent; the engine caches the returned
    /// instance.
    fn evaluate(self: Rc<Self>, agent: &mut Agent) -> JsResult<Rc<dyn ModuleInstanceMethods>>;
}

/// A handle to a module record. Handles compare and hash by record identity.
#[derive(Debug, Clone)]
pub enum Module {
    Cyclic(Rc<dyn CyclicModuleRecord>),
    Foreign(Rc<dyn ForeignModuleRecord>),
}

impl Module {
    pub fn cyclic(record: Rc<dyn CyclicModuleRecord>) -> Self {
        Self::Cyclic(record)
    }

    pub fn foreign(record: Rc<dyn ForeignModuleRecord>) -> Self {
        Self::Foreign(record)
    }

    pub fn as_cyclic(&self) -> Option<&Rc<dyn CyclicModuleRecord>> {
        match self {
            Module::Cyclic(record) => Some(record),
            Module::Foreign(_) => None,
        }
    }

    fn address(&self) -> *const () {
        match self {
            Module::Cyclic(record) => Rc::as_ptr(record) as *const (),
            Module::Foreign(record) => Rc::as_ptr(record) as *const (),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Module::Cyclic(record) => record.name(),
            Module::Foreign(record) => record.name(),
        }
    }

    /// ### GetExportedNames(\[exportStarSet])
    pub fn get_exported_names(
        &self,
        agent: &mut Agent,
        export_star_set: &mut Vec<Module>,
    ) -> JsResult<Vec<JsString>> {
        match self {
            Module::Cyclic(record) => record.clone().get_exported_names(agent, export_star_set),
            Module::Foreign(record) => record.clone().get_exported_names(agent, export_star_set),
        }
    }

    /// ### ResolveExport(exportName \[, resolveSet])
    ///
    /// The same `resolve_set` must be passed through a whole resolution; it
    /// is only ever appended to.
    pub fn resolve_export(
        &self,
        agent: &mut Agent,
        export_name: &str,
        resolve_set: &mut ResolveSet,
    ) -> JsResult<Option<ResolveExportResult>> {
        assert!(!export_name.is_empty(), "ResolveExport of an empty name");
        match self {
            Module::Cyclic(record) => record.clone().resolve_export(agent, export_name, resolve_set),
            Module::Foreign(record) => {
                record.clone().resolve_export(agent, export_name, resolve_set)
            }
        }
    }
}

impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.address(), other.address())
    }
}

impl Eq for Module {}

impl Hash for Module {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "<module {:p}>", self.address()),
        }
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use super::*;
    use crate::ecmascript::types::Value;

    #[derive(Debug)]
    struct Constant;

    impl ModuleAbstractMethods for Constant {
        fn get_exported_names(
            self: Rc<Self>,
            _agent: &mut Agent,
            _export_star_set: &mut Vec<Module>,
        ) -> JsResult<Vec<JsString>> {
            Ok(vec!["value".into()])
        }

        fn resolve_export(
            self: Rc<Self>,
            _agent: &mut Agent,
            _export_name: &str,
            _resolve_set: &mut ResolveSet,
        ) -> JsResult<Option<ResolveExportResult>> {
            Ok(None)
        }
    }

    impl ModuleInstanceMethods for Constant {
        fn get_binding_value(&self, _agent: &mut Agent, _name: &str) -> JsResult<Option<Value>> {
            Ok(Some(Value::Number(1.0)))
        }
    }

    impl ForeignModuleRecord for Constant {
        fn link(self: Rc<Self>, _agent: &mut Agent) -> JsResult<()> {
            Ok(())
        }

        fn evaluate(
            self: Rc<Self>,
            _agent: &mut Agent,
        ) -> JsResult<Rc<dyn ModuleInstanceMethods>> {
            Ok(self)
        }
    }

    #[test]
    fn module_identity() {
        let record = Rc::new(Constant);
        let a = Module::foreign(record.clone());
        let b = Module::foreign(record);
        let c = Module::foreign(Rc::new(Constant));
        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut set = ahash::AHashSet::new();
        set.insert(a.clone());
        assert!(set.contains(&b));
        assert!(!set.contains(&c));
    }
}
