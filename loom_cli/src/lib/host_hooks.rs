// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Filesystem module loading.

use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    rc::Rc,
};

use ahash::AHashMap;
use loom_vm::ecmascript::{
    builtins::promise_objects::{Promise, PromiseRejectionTrackerOperation},
    execution::{Agent, ExceptionType, HostHooks, JsResult},
    scripts_and_modules::module::module_semantics::{
        abstract_module_records::Module,
        source_text_module_records::{SourceTextModuleRecord, parse_module},
    },
    types::{JsString, Value},
};
use oxc_diagnostics::OxcDiagnostic;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Cannot find module '{}': {source}", .path.display())]
    NotFound {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot read module '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Module '{}' contains syntax errors", .path.display())]
    Parse {
        path: PathBuf,
        source_text: String,
        errors: Vec<OxcDiagnostic>,
    },
}

impl LoaderError {
    fn exception_type(&self) -> ExceptionType {
        match self {
            LoaderError::Parse { .. } => ExceptionType::SyntaxError,
            LoaderError::NotFound { .. } | LoaderError::Read { .. } => ExceptionType::TypeError,
        }
    }

    /// The message of the JavaScript error thrown for this failure.
    fn js_message(&self) -> String {
        match self {
            LoaderError::Parse { path, errors, .. } => match errors.first() {
                Some(error) => format!("{error} (in '{}')", path.display()),
                None => self.to_string(),
            },
            _ => self.to_string(),
        }
    }
}

/// Host hooks that load modules from the filesystem.
///
/// Specifiers are resolved relative to the directory of the importing
/// module, or to the working directory for entry modules, and cached by
/// canonical path. A file is therefore parsed at most once and always
/// resolves to the same module.
#[derive(Debug, Default)]
pub struct CliHostHooks {
    modules: RefCell<AHashMap<PathBuf, Module>>,
    records: RefCell<AHashMap<Module, Rc<SourceTextModuleRecord>>>,
}

impl CliHostHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical path a module was loaded from.
    pub fn module_path(&self, module: &Module) -> Option<PathBuf> {
        let records = self.records.borrow();
        let path = records
            .get(module)?
            .host_defined()?
            .downcast_ref::<PathBuf>()?;
        Some(path.clone())
    }

    fn resolve_path(&self, referrer: Option<&Module>, specifier: &str) -> Result<PathBuf, LoaderError> {
        let base = match referrer
            .and_then(|referrer| self.module_path(referrer))
            .and_then(|path| path.parent().map(Path::to_path_buf))
        {
            Some(base) => base,
            None => std::env::current_dir().map_err(|source| LoaderError::Read {
                path: PathBuf::from("."),
                source,
            })?,
        };
        let path = base.join(specifier);
        path.canonicalize()
            .map_err(|source| LoaderError::NotFound { path, source })
    }

    /// Loads the module `specifier` as requested by `referrer`.
    pub fn load(&self, referrer: Option<&Module>, specifier: &str) -> Result<Module, LoaderError> {
        let path = self.resolve_path(referrer, specifier)?;
        if let Some(module) = self.modules.borrow().get(&path) {
            return Ok(module.clone());
        }
        let source_text = std::fs::read_to_string(&path).map_err(|source| LoaderError::Read {
            path: path.clone(),
            source,
        })?;
        let name = path.display().to_string();
        let record = match parse_module(&source_text, Some(&name), Some(Rc::new(path.clone()))) {
            Ok(record) => record,
            Err(errors) => {
                return Err(LoaderError::Parse {
                    path,
                    source_text,
                    errors,
                });
            }
        };
        log::debug!("Loaded module {name}");
        let module = Module::from(record.clone());
        self.records.borrow_mut().insert(module.clone(), record);
        self.modules.borrow_mut().insert(path, module.clone());
        Ok(module)
    }
}

impl HostHooks for CliHostHooks {
    fn resolve_imported_module(
        &self,
        agent: &mut Agent,
        referrer: Option<&Module>,
        specifier: &str,
    ) -> JsResult<Module> {
        self.load(referrer, specifier).map_err(|error| {
            log::debug!("Failed to load '{specifier}': {error}");
            agent.throw_exception(error.exception_type(), error.js_message())
        })
    }

    fn get_import_meta_properties(&self, _agent: &mut Agent, module: &Module) -> Vec<(JsString, Value)> {
        let Some(path) = self.module_path(module) else {
            return Vec::new();
        };
        let url = format!("file://{}", path.display());
        vec![("url".into(), Value::from(url))]
    }

    fn promise_rejection_tracker(&self, _promise: Promise, operation: PromiseRejectionTrackerOperation) {
        match operation {
            PromiseRejectionTrackerOperation::Reject => log::debug!("Promise rejected without a handler"),
            PromiseRejectionTrackerOperation::Handle => log::debug!("Rejected promise handled"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fixture_dir(test: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("loom_cli_{test}_{}", std::process::id()));
        std::fs::create_dir_all(dir.join("lib")).unwrap();
        std::fs::write(dir.join("main.js"), "import { value } from './lib/value.js';\n").unwrap();
        std::fs::write(dir.join("lib").join("value.js"), "export const value = 1;\n").unwrap();
        std::fs::write(dir.join("broken.js"), "export const = 1;\n").unwrap();
        dir
    }

    #[test]
    fn resolves_relative_to_referrer() {
        let dir = fixture_dir("resolve");
        let host = CliHostHooks::new();
        let main = host.load(None, dir.join("main.js").to_str().unwrap()).unwrap();

        let value = host.load(Some(&main), "./lib/value.js").unwrap();
        let again = host.load(Some(&main), "lib/../lib/value.js").unwrap();
        assert_eq!(value, again);
        assert_eq!(
            host.module_path(&value).unwrap(),
            dir.join("lib").join("value.js").canonicalize().unwrap()
        );
    }

    #[test]
    fn loader_errors() {
        let dir = fixture_dir("errors");
        let host = CliHostHooks::new();
        let main = host.load(None, dir.join("main.js").to_str().unwrap()).unwrap();

        let missing = host.load(Some(&main), "./missing.js").unwrap_err();
        assert!(matches!(missing, LoaderError::NotFound { .. }));
        assert_eq!(missing.exception_type(), ExceptionType::TypeError);

        let broken = host.load(Some(&main), "./broken.js").unwrap_err();
        let LoaderError::Parse { errors, .. } = &broken else {
            panic!("expected a parse error");
        };
        assert!(!errors.is_empty());
        assert_eq!(broken.exception_type(), ExceptionType::SyntaxError);
    }
}
