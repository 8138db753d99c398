// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [16.2.1.7 Source Text Module Records](https://tc39.es/ecma262/#sec-source-text-module-records)

use std::{any::Any, rc::Rc};

use ahash::AHashSet;
use oxc_allocator::Allocator;
use oxc_ast::ast;
use oxc_diagnostics::OxcDiagnostic;
use oxc_ecmascript::BoundNames;
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};

use super::{
    abstract_module_records::{
        BindingName, Module, ModuleAbstractMethods, ResolveExportResult, ResolveSet,
        ResolveSetElement, ResolvedBinding,
    },
    cyclic_module_records::CyclicModuleRecord,
    module_instances::{CyclicModuleInstance, ModuleInstanceMethods},
};
use crate::{
    ecmascript::{
        builtins::{
            PromiseCapability,
            promise_objects::{
                PromiseReactionHandler, PromiseReactionType, inner_promise_then, promise_resolve,
            },
        },
        execution::{
            Agent, Binding, Environment, ExceptionType, JsError, JsResult,
            environments::put_identifier_value,
        },
        types::{JsString, Value},
    },
    engine::{
        compiler::{DEFAULT_BINDING_NAME, compile_module},
        executable::{AwaitTarget, DeclarationKind, ModuleBody, Statement},
        vm::{
            ExecutionContext, create_lexical_bindings, evaluate_expression, evaluate_statement,
            evaluate_statements, initialize_lexical_binding, instantiate_hoisted_functions,
        },
    },
};

/// ### \[\[ImportName]]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportName {
    Name(JsString),
    /// `import * as ns from "m"`
    NamespaceObject,
}

/// ### [ImportEntry Record](https://tc39.es/ecma262/#importentry-record)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntryRecord {
    /// ### \[\[ModuleRequest]]
    pub module_request: JsString,
    /// ### \[\[ImportName]]
    pub import_name: ImportName,
    /// ### \[\[LocalName]]
    pub local_name: JsString,
    /// Byte offset of the import specifier in the source text.
    pub source_offset: u32,
}

/// An ExportEntry Record whose binding lives in this module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalExportEntryRecord {
    /// ### \[\[ExportName]]
    pub export_name: JsString,
    /// ### \[\[LocalName]]
    pub local_name: JsString,
}

/// ### \[\[ImportName]] of an indirect export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportImportName {
    Name(JsString),
    /// `export * as ns from "m"`
    All,
}

/// An ExportEntry Record re-exporting a binding of another module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectExportEntryRecord {
    /// ### \[\[ExportName]]
    pub export_name: JsString,
    /// ### \[\[ModuleRequest]]
    pub module_request: JsString,
    /// ### \[\[ImportName]]
    pub import_name: ExportImportName,
}

/// An `export * from "m"` ExportEntry Record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarExportEntryRecord {
    /// ### \[\[ModuleRequest]]
    pub module_request: JsString,
}

/// ### [16.2.1.7 Source Text Module Records](https://tc39.es/ecma262/#sec-source-text-module-records)
///
/// Source text module records are immutable once parsed and may be shared
/// by any number of agents. Link and evaluation state lives in the agent.
#[derive(Debug)]
pub struct SourceTextModuleRecord {
    name: Option<JsString>,
    /// ### \[\[HostDefined]]
    host_defined: Option<Rc<dyn Any>>,
    /// ### \[\[RequestedModules]]
    requested_modules: Box<[JsString]>,
    /// ### \[\[ImportEntries]]
    import_entries: Box<[ImportEntryRecord]>,
    /// ### \[\[LocalExportEntries]]
    local_export_entries: Box<[LocalExportEntryRecord]>,
    /// ### \[\[IndirectExportEntries]]
    ///
    /// Re-exported imports and `export * as ns` declarations.
    indirect_export_entries: Box<[IndirectExportEntryRecord]>,
    /// ### \[\[StarExportEntries]]
    star_export_entries: Box<[StarExportEntryRecord]>,
    /// ### \[\[ECMAScriptCode]]
    body: Rc<ModuleBody>,
    /// ### \[\[HasTLA]]
    has_tla: bool,
}

impl From<Rc<SourceTextModuleRecord>> for Module {
    fn from(record: Rc<SourceTextModuleRecord>) -> Self {
        Module::Cyclic(record)
    }
}

impl SourceTextModuleRecord {
    pub fn host_defined(&self) -> Option<&Rc<dyn Any>> {
        self.host_defined.as_ref()
    }

    pub fn import_entries(&self) -> &[ImportEntryRecord] {
        &self.import_entries
    }

    pub fn local_export_entries(&self) -> &[LocalExportEntryRecord] {
        &self.local_export_entries
    }

    pub fn indirect_export_entries(&self) -> &[IndirectExportEntryRecord] {
        &self.indirect_export_entries
    }

    pub fn star_export_entries(&self) -> &[StarExportEntryRecord] {
        &self.star_export_entries
    }
}

/// An ExportEntry Record as collected from the source text, before local
/// exports of imported bindings are turned into indirect exports.
struct ExportEntry {
    export_name: JsString,
    module_request: Option<JsString>,
    import_name: Option<ExportImportName>,
    local_name: Option<JsString>,
    span: Span,
}

fn module_request(source: &ast::StringLiteral) -> JsString {
    source.value.as_str().into()
}

/// ### [16.2.1.7.1 ParseModule ( sourceText, realm, hostDefined )](https://tc39.es/ecma262/#sec-parsemodule)
///
/// Parses and lowers the module body. Early errors, including syntax the
/// engine cannot execute, are returned as diagnostics.
pub fn parse_module(
    source_text: &str,
    name: Option<&str>,
    host_defined: Option<Rc<dyn Any>>,
) -> Result<Rc<SourceTextModuleRecord>, Vec<OxcDiagnostic>> {
    let allocator = Allocator::default();
    // 1. Let body be ParseText(sourceText, Module).
    let parse_result =
        Parser::new(&allocator, source_text, SourceType::default().with_module(true)).parse();
    // 2. If body is a List of errors, return body.
    if !parse_result.errors.is_empty() {
        return Err(parse_result.errors);
    }
    let program = parse_result.program;
    let mut errors = Vec::new();

    // 3. Let requestedModules be the ModuleRequests of body.
    let mut requested_modules: Vec<JsString> = Vec::new();
    // 4. Let importEntries be the ImportEntries of body.
    let mut import_entries: Vec<ImportEntryRecord> = Vec::new();
    // 5. Let importedBoundNames be ImportedLocalNames(importEntries).
    let mut imported_bound_names: AHashSet<JsString> = AHashSet::new();
    // 9. Let exportEntries be the ExportEntries of body.
    let mut export_entries: Vec<ExportEntry> = Vec::new();

    for statement in program.body.iter() {
        let Some(declaration) = statement.as_module_declaration() else {
            continue;
        };
        match declaration {
            ast::ModuleDeclaration::ImportDeclaration(import) => {
                let request = module_request(&import.source);
                requested_modules.push(request.clone());
                let Some(specifiers) = &import.specifiers else {
                    continue;
                };
                for specifier in specifiers {
                    let (import_name, local) = match specifier {
                        ast::ImportDeclarationSpecifier::ImportSpecifier(specifier) => (
                            ImportName::Name(specifier.imported.name().as_str().into()),
                            &specifier.local,
                        ),
                        ast::ImportDeclarationSpecifier::ImportDefaultSpecifier(specifier) => {
                            (ImportName::Name("default".into()), &specifier.local)
                        }
                        ast::ImportDeclarationSpecifier::ImportNamespaceSpecifier(specifier) => {
                            (ImportName::NamespaceObject, &specifier.local)
                        }
                    };
                    let local_name: JsString = local.name.as_str().into();
                    if !imported_bound_names.insert(local_name.clone()) {
                        errors.push(
                            OxcDiagnostic::error(format!(
                                "Identifier '{local_name}' has already been declared"
                            ))
                            .with_label(local.span),
                        );
                    }
                    import_entries.push(ImportEntryRecord {
                        module_request: request.clone(),
                        import_name,
                        local_name,
                        source_offset: specifier.span().start,
                    });
                }
            }
            ast::ModuleDeclaration::ExportAllDeclaration(export) => {
                let request = module_request(&export.source);
                requested_modules.push(request.clone());
                export_entries.push(ExportEntry {
                    // `export * from "m"` has no export name.
                    export_name: export
                        .exported
                        .as_ref()
                        .map_or_else(|| "".into(), |exported| exported.name().as_str().into()),
                    module_request: Some(request),
                    import_name: Some(ExportImportName::All),
                    local_name: None,
                    span: export.span,
                });
            }
            ast::ModuleDeclaration::ExportNamedDeclaration(export) => {
                if let Some(source) = &export.source {
                    // ExportDeclaration : export ExportFromClause FromClause ;
                    let request = module_request(source);
                    requested_modules.push(request.clone());
                    for specifier in &export.specifiers {
                        export_entries.push(ExportEntry {
                            export_name: specifier.exported.name().as_str().into(),
                            module_request: Some(request.clone()),
                            import_name: Some(ExportImportName::Name(
                                specifier.local.name().as_str().into(),
                            )),
                            local_name: None,
                            span: specifier.span,
                        });
                    }
                } else if let Some(declaration) = &export.declaration {
                    // ExportDeclaration : export VariableStatement / Declaration
                    declaration.bound_names(&mut |identifier| {
                        let name: JsString = identifier.name.as_str().into();
                        export_entries.push(ExportEntry {
                            export_name: name.clone(),
                            module_request: None,
                            import_name: None,
                            local_name: Some(name),
                            span: identifier.span,
                        });
                    });
                } else {
                    // ExportDeclaration : export NamedExports ;
                    for specifier in &export.specifiers {
                        export_entries.push(ExportEntry {
                            export_name: specifier.exported.name().as_str().into(),
                            module_request: None,
                            import_name: None,
                            local_name: Some(specifier.local.name().as_str().into()),
                            span: specifier.span,
                        });
                    }
                }
            }
            ast::ModuleDeclaration::ExportDefaultDeclaration(export) => {
                let local_name = match &export.declaration {
                    ast::ExportDefaultDeclarationKind::FunctionDeclaration(function) => function
                        .id
                        .as_ref()
                        .map_or_else(|| DEFAULT_BINDING_NAME.into(), |id| id.name.as_str().into()),
                    ast::ExportDefaultDeclarationKind::ClassDeclaration(class) => class
                        .id
                        .as_ref()
                        .map_or_else(|| DEFAULT_BINDING_NAME.into(), |id| id.name.as_str().into()),
                    ast::ExportDefaultDeclarationKind::TSInterfaceDeclaration(_) => continue,
                    _ => DEFAULT_BINDING_NAME.into(),
                };
                export_entries.push(ExportEntry {
                    export_name: "default".into(),
                    module_request: None,
                    import_name: None,
                    local_name: Some(local_name),
                    span: export.span,
                });
            }
            declaration => errors.push(
                OxcDiagnostic::error("Unsupported syntax: TypeScript module declaration")
                    .with_label(declaration.span()),
            ),
        }
    }

    let body = match compile_module(&program) {
        Ok(body) => Some(body),
        Err(compile_errors) => {
            errors.extend(compile_errors);
            None
        }
    };
    if let Some(body) = &body {
        let declared_names: AHashSet<&JsString> = body.declared_names().collect();
        for entry in &import_entries {
            if declared_names.contains(&entry.local_name) {
                errors.push(
                    OxcDiagnostic::error(format!(
                        "Identifier '{}' has already been declared",
                        entry.local_name
                    ))
                    .with_label(Span::empty(entry.source_offset)),
                );
            }
        }
        for entry in &export_entries {
            if let Some(local_name) = &entry.local_name {
                if !declared_names.contains(local_name) && !imported_bound_names.contains(local_name)
                {
                    errors.push(
                        OxcDiagnostic::error(format!("Export '{local_name}' is not defined"))
                            .with_label(entry.span),
                    );
                }
            }
        }
    }

    // 6. Let indirectExportEntries be a new empty List.
    let mut indirect_export_entries = Vec::new();
    // 7. Let localExportEntries be a new empty List.
    let mut local_export_entries = Vec::new();
    // 8. Let starExportEntries be a new empty List.
    let mut star_export_entries = Vec::new();
    // 10. For each ExportEntry Record ee of exportEntries, do
    for ee in export_entries {
        match (ee.module_request, ee.import_name, ee.local_name) {
            // a. If ee.[[ModuleRequest]] is null, then
            (None, _, Some(local_name)) => {
                // i. If importedBoundNames does not contain ee.[[LocalName]], then
                let Some(ie) = import_entries
                    .iter()
                    .find(|ie| ie.local_name == local_name)
                else {
                    // 1. Append ee to localExportEntries.
                    local_export_entries.push(LocalExportEntryRecord {
                        export_name: ee.export_name,
                        local_name,
                    });
                    continue;
                };
                // ii. Else,
                // 1. Let ie be the element of importEntries whose
                //    [[LocalName]] is ee.[[LocalName]].
                match &ie.import_name {
                    // 2. If ie.[[ImportName]] is namespace-object, then
                    ImportName::NamespaceObject => {
                        // a. NOTE: This is a re-export of an imported module
                        //    namespace object.
                        // b. Append ee to localExportEntries.
                        local_export_entries.push(LocalExportEntryRecord {
                            export_name: ee.export_name,
                            local_name,
                        });
                    }
                    // 3. Else,
                    ImportName::Name(import_name) => {
                        // a. NOTE: This is a re-export of a single name.
                        // b. Append the ExportEntry Record {
                        //      [[ModuleRequest]]: ie.[[ModuleRequest]],
                        //      [[ImportName]]: ie.[[ImportName]],
                        //      [[LocalName]]: null,
                        //      [[ExportName]]: ee.[[ExportName]]
                        //    } to indirectExportEntries.
                        indirect_export_entries.push(IndirectExportEntryRecord {
                            export_name: ee.export_name,
                            module_request: ie.module_request.clone(),
                            import_name: ExportImportName::Name(import_name.clone()),
                        });
                    }
                }
            }
            // b. Else if ee.[[ImportName]] is all-but-default, then
            (Some(module_request), Some(ExportImportName::All), _) if ee.export_name.is_empty() => {
                // i. Assert: ee.[[ExportName]] is null.
                // ii. Append ee to starExportEntries.
                star_export_entries.push(StarExportEntryRecord { module_request });
            }
            // c. Else,
            (Some(module_request), Some(import_name), _) => {
                // i. Append ee to indirectExportEntries.
                indirect_export_entries.push(IndirectExportEntryRecord {
                    export_name: ee.export_name,
                    module_request,
                    import_name,
                });
            }
            _ => unreachable!("Malformed export entry"),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    let body = body.expect("Module body without errors was not lowered");
    // 11. Let async be body Contains await.
    let has_tla = body.has_tla();
    // 12. Return Source Text Module Record { ... }.
    Ok(Rc::new(SourceTextModuleRecord {
        name: name.map(Into::into),
        host_defined,
        requested_modules: requested_modules.into_boxed_slice(),
        import_entries: import_entries.into_boxed_slice(),
        local_export_entries: local_export_entries.into_boxed_slice(),
        indirect_export_entries: indirect_export_entries.into_boxed_slice(),
        star_export_entries: star_export_entries.into_boxed_slice(),
        body: Rc::new(body),
        has_tla,
    }))
}

/// ### [16.2.1.9 GetImportedModule ( referrer, request )](https://tc39.es/ecma262/#sec-GetImportedModule)
///
/// Resolution is not memoized here: the host is expected to return the same
/// record for the same referrer and specifier.
fn get_imported_module(agent: &mut Agent, referrer: &Module, specifier: &str) -> JsResult<Module> {
    let host_hooks = agent.host_hooks;
    host_hooks.resolve_imported_module(agent, Some(referrer), specifier)
}

impl ModuleAbstractMethods for SourceTextModuleRecord {
    /// ### [16.2.1.7.2.1 GetExportedNames ( \[ exportStarSet \] )](https://tc39.es/ecma262/#sec-getexportednames)
    fn get_exported_names(
        self: Rc<Self>,
        agent: &mut Agent,
        export_star_set: &mut Vec<Module>,
    ) -> JsResult<Vec<JsString>> {
        let module = Module::from(self.clone());
        // 3. If exportStarSet contains module, then
        if export_star_set.contains(&module) {
            // a. Assert: We've reached the starting point of an export *
            //    circularity.
            // b. Return a new empty List.
            return Ok(vec![]);
        }
        // 4. Append module to exportStarSet.
        export_star_set.push(module.clone());
        // 5. Let exportedNames be a new empty List.
        let mut exported_names: Vec<JsString> = Vec::new();
        // 6. For each ExportEntry Record e of module.[[LocalExportEntries]], do
        for e in self.local_export_entries.iter() {
            // c. Append e.[[ExportName]] to exportedNames.
            exported_names.push(e.export_name.clone());
        }
        // 7. For each ExportEntry Record e of module.[[IndirectExportEntries]], do
        for e in self.indirect_export_entries.iter() {
            // c. Append e.[[ExportName]] to exportedNames.
            exported_names.push(e.export_name.clone());
        }
        // 8. For each ExportEntry Record e of module.[[StarExportEntries]], do
        for e in self.star_export_entries.iter() {
            // b. Let requestedModule be GetImportedModule(module, e.[[ModuleRequest]]).
            let requested_module = get_imported_module(agent, &module, &e.module_request)?;
            // c. Let starNames be requestedModule.GetExportedNames(exportStarSet).
            let star_names = requested_module.get_exported_names(agent, export_star_set)?;
            // d. For each element n of starNames, do
            for n in star_names {
                // i. If n is not "default", then
                //    1. If exportedNames does not contain n, then
                if &*n != "default" && !exported_names.contains(&n) {
                    // a. Append n to exportedNames.
                    exported_names.push(n);
                }
            }
        }
        // 9. Return exportedNames.
        Ok(exported_names)
    }

    /// ### [16.2.1.7.2.2 ResolveExport ( exportName \[ , resolveSet \] )](https://tc39.es/ecma262/#sec-resolveexport)
    ///
    /// A `(module, exportName)` pair that is reached a second time is an
    /// import circularity and resolves to None.
    fn resolve_export(
        self: Rc<Self>,
        agent: &mut Agent,
        export_name: &str,
        resolve_set: &mut ResolveSet,
    ) -> JsResult<Option<ResolveExportResult>> {
        let module = Module::from(self.clone());
        // 3. For each Record { [[Module]], [[ExportName]] } r of resolveSet, do
        if resolve_set
            .iter()
            .any(|r| r.module == module && &*r.export_name == export_name)
        {
            // a. If module and r.[[Module]] are the same Module Record and
            //    exportName is r.[[ExportName]], then
            //    i. Assert: This is a circular import request.
            //    ii. Return null.
            return Ok(None);
        }
        // 4. Append the Record { [[Module]]: module, [[ExportName]]: exportName } to resolveSet.
        resolve_set.push(ResolveSetElement {
            module: module.clone(),
            export_name: export_name.into(),
        });
        // 5. For each ExportEntry Record e of module.[[LocalExportEntries]], do
        if let Some(e) = self
            .local_export_entries
            .iter()
            .find(|e| &*e.export_name == export_name)
        {
            // a. If e.[[ExportName]] is exportName, then
            //    i. Assert: module provides the direct binding for this export.
            //    ii. Return ResolvedBinding Record { [[Module]]: module, [[BindingName]]: e.[[LocalName]] }.
            return Ok(Some(ResolveExportResult::Resolved(ResolvedBinding {
                module,
                binding_name: BindingName::Name(e.local_name.clone()),
            })));
        }
        // 6. For each ExportEntry Record e of module.[[IndirectExportEntries]], do
        if let Some(e) = self
            .indirect_export_entries
            .iter()
            .find(|e| &*e.export_name == export_name)
        {
            // ii. Let importedModule be GetImportedModule(module, e.[[ModuleRequest]]).
            let imported_module = get_imported_module(agent, &module, &e.module_request)?;
            return match &e.import_name {
                // iii. If e.[[ImportName]] is all, then
                ExportImportName::All => {
                    // 1. Assert: module does not provide the direct binding for this export.
                    // 2. Return ResolvedBinding Record { [[Module]]: importedModule, [[BindingName]]: namespace }.
                    Ok(Some(ResolveExportResult::Resolved(ResolvedBinding {
                        module: imported_module,
                        binding_name: BindingName::Namespace,
                    })))
                }
                // iv. Else,
                ExportImportName::Name(import_name) => {
                    // 1. Assert: module imports a specific binding for this export.
                    // 2. Assert: e.[[ImportName]] is a String.
                    // 3. Return importedModule.ResolveExport(e.[[ImportName]], resolveSet).
                    imported_module.resolve_export(agent, import_name, resolve_set)
                }
            };
        }
        // 7. If exportName is "default", then
        if export_name == "default" {
            // a. Assert: A default export was not explicitly defined by this
            //    module.
            // b. Return null.
            // c. NOTE: A default export cannot be provided by an export * from
            //    "mod" declaration.
            return Ok(None);
        }
        // 8. Let starResolution be null.
        let mut star_resolution: Option<ResolvedBinding> = None;
        // 9. For each ExportEntry Record e of module.[[StarExportEntries]], do
        for e in self.star_export_entries.iter() {
            // b. Let importedModule be GetImportedModule(module, e.[[ModuleRequest]]).
            let imported_module = get_imported_module(agent, &module, &e.module_request)?;
            // c. Let resolution be importedModule.ResolveExport(exportName, resolveSet).
            let resolution = imported_module.resolve_export(agent, export_name, resolve_set)?;
            match resolution {
                // d. If resolution is ambiguous, return ambiguous.
                Some(ResolveExportResult::Ambiguous) => {
                    return Ok(Some(ResolveExportResult::Ambiguous));
                }
                // e. If resolution is not null, then
                Some(ResolveExportResult::Resolved(resolution)) => {
                    let Some(star_resolution) = &star_resolution else {
                        // ii. If starResolution is null, then
                        //     1. Set starResolution to resolution.
                        star_resolution = Some(resolution);
                        continue;
                    };
                    // iii. Else,
                    // 1. Assert: There is more than one * import that includes
                    //    the requested name.
                    // 2. If resolution.[[Module]] and starResolution.[[Module]]
                    //    are not the same Module Record, return ambiguous.
                    if resolution.module != star_resolution.module {
                        return Ok(Some(ResolveExportResult::Ambiguous));
                    }
                    match (&resolution.binding_name, &star_resolution.binding_name) {
                        // 3. If resolution.[[BindingName]] is not
                        //    starResolution.[[BindingName]] and either
                        //    resolution.[[BindingName]] or
                        //    starResolution.[[BindingName]] is namespace,
                        //    return ambiguous.
                        (BindingName::Namespace, BindingName::Name(_))
                        | (BindingName::Name(_), BindingName::Namespace) => {
                            return Ok(Some(ResolveExportResult::Ambiguous));
                        }
                        // 4. If resolution.[[BindingName]] is a String,
                        //    starResolution.[[BindingName]] is a String, and
                        //    resolution.[[BindingName]] is not
                        //    starResolution.[[BindingName]], return ambiguous.
                        (BindingName::Name(a), BindingName::Name(b)) if a != b => {
                            return Ok(Some(ResolveExportResult::Ambiguous));
                        }
                        _ => {}
                    }
                }
                None => {}
            }
        }
        // 10. Return starResolution.
        Ok(star_resolution.map(ResolveExportResult::Resolved))
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

fn unresolvable_import_error(
    agent: &mut Agent,
    resolution: Option<ResolveExportResult>,
    module_request: &str,
    import_name: &str,
) -> JsError {
    let message = match resolution {
        Some(ResolveExportResult::Ambiguous) => format!(
            "The requested module '{module_request}' contains conflicting star exports for name '{import_name}'"
        ),
        _ => format!(
            "The requested module '{module_request}' does not provide an export named '{import_name}'"
        ),
    };
    agent.throw_exception(ExceptionType::SyntaxError, message)
}

impl CyclicModuleRecord for SourceTextModuleRecord {
    fn requested_modules(&self) -> &[JsString] {
        &self.requested_modules
    }

    fn has_tla(&self) -> bool {
        self.has_tla
    }

    /// ### [16.2.1.7.3.1 InitializeEnvironment ( )](https://tc39.es/ecma262/#sec-source-text-module-record-initialize-environment)
    fn initialize_environment(self: Rc<Self>, agent: &mut Agent) -> JsResult<()> {
        let module = Module::from(self.clone());
        // 1. For each ExportEntry Record e of module.[[IndirectExportEntries]], do
        for e in self.indirect_export_entries.iter() {
            // b. Let resolution be module.ResolveExport(e.[[ExportName]]).
            let resolution = module.resolve_export(agent, &e.export_name, &mut Vec::new())?;
            // c. If resolution is either null or ambiguous, throw a SyntaxError exception.
            if !matches!(resolution, Some(ResolveExportResult::Resolved(_))) {
                let import_name = match &e.import_name {
                    ExportImportName::Name(import_name) => import_name,
                    ExportImportName::All => &e.export_name,
                };
                return Err(unresolvable_import_error(
                    agent,
                    resolution,
                    &e.module_request,
                    import_name,
                ));
            }
            // d. Assert: resolution is a ResolvedBinding Record.
        }
        // 2. Assert: All named exports from module are resolvable.
        // 5. Let env be NewModuleEnvironment(realm.[[GlobalEnv]]).
        let env = Environment::new_module(agent);
        // 7. For each ImportEntry Record in of module.[[ImportEntries]], do
        for r#in in self.import_entries.iter() {
            // a. Let importedModule be GetImportedModule(module, in.[[ModuleRequest]]).
            let imported_module = get_imported_module(agent, &module, &r#in.module_request)?;
            let import_name = match &r#in.import_name {
                // b. If in.[[ImportName]] is namespace-object, then
                ImportName::NamespaceObject => {
                    // i. Let namespace be GetModuleNamespace(importedModule).
                    // ii. Perform ! env.CreateImmutableBinding(in.[[LocalName]], true).
                    // iii. Perform ! env.InitializeBinding(in.[[LocalName]], namespace).
                    env.create_binding(
                        agent,
                        r#in.local_name.clone(),
                        Binding::Namespace(imported_module),
                    );
                    continue;
                }
                ImportName::Name(import_name) => import_name,
            };
            // c. Else,
            // i. Let resolution be importedModule.ResolveExport(in.[[ImportName]]).
            let resolution = imported_module.resolve_export(agent, import_name, &mut Vec::new())?;
            // ii. If resolution is either null or ambiguous, throw a SyntaxError exception.
            let Some(ResolveExportResult::Resolved(resolution)) = resolution else {
                return Err(unresolvable_import_error(
                    agent,
                    resolution,
                    &r#in.module_request,
                    import_name,
                ));
            };
            let binding = match resolution.binding_name {
                // iii. If resolution.[[BindingName]] is namespace, then
                //      1. Let namespace be GetModuleNamespace(resolution.[[Module]]).
                //      2. Perform ! env.CreateImmutableBinding(in.[[LocalName]], true).
                //      3. Perform ! env.InitializeBinding(in.[[LocalName]], namespace).
                BindingName::Namespace => Binding::Namespace(resolution.module),
                // iv. Else,
                //     1. Perform CreateImportBinding(env, in.[[LocalName]],
                //        resolution.[[Module]], resolution.[[BindingName]]).
                BindingName::Name(binding_name) => Binding::Indirect {
                    module: resolution.module,
                    binding_name,
                },
            };
            env.create_binding(agent, r#in.local_name.clone(), binding);
        }
        // 19. Let varDeclarations be the VarScopedDeclarations of code.
        // 21. For each element d of varDeclarations, do
        for name in self.body.var_names.iter() {
            // i. If declaredVarNames does not contain dn, then
            if !env.has_own_binding(agent, name) {
                // 1. Perform ! env.CreateMutableBinding(dn, false).
                // 2. Perform ! env.InitializeBinding(dn, undefined).
                env.create_binding(agent, name.clone(), Binding::Mutable(Some(Value::Undefined)));
            }
        }
        // 22. Let lexDeclarations be the LexicallyScopedDeclarations of code.
        // 24. For each element d of lexDeclarations, do
        create_lexical_bindings(agent, env, &self.body.lexical_declarations);
        // iv. If d is either a FunctionDeclaration, a GeneratorDeclaration,
        //     an AsyncFunctionDeclaration, or an AsyncGeneratorDeclaration,
        //     then
        //     1. Let fo be InstantiateFunctionObject(d, env, privateEnv).
        //     2. Perform ! env.InitializeBinding(dn, fo).
        instantiate_hoisted_functions(agent, env, Some(&module), &self.body.functions);
        // 6. Set module.[[Environment]] to env.
        agent.module_environments.insert(module, env);
        // 26. Return unused.
        Ok(())
    }

    fn instantiate(self: Rc<Self>, agent: &mut Agent) -> JsResult<Rc<dyn CyclicModuleInstance>> {
        let module = Module::from(self.clone());
        let Some(environment) = agent.module_environments.get(&module).copied() else {
            return Err(agent.throw_exception(
                ExceptionType::TypeError,
                format!("Module '{module}' must be linked before it is evaluated"),
            ));
        };
        Ok(Rc::new(SourceTextModuleInstance {
            record: self,
            module,
            environment,
        }))
    }
}

/// The per-agent instance of a [`SourceTextModuleRecord`].
#[derive(Debug)]
pub struct SourceTextModuleInstance {
    record: Rc<SourceTextModuleRecord>,
    module: Module,
    /// ### \[\[Environment]]
    environment: Environment,
}

impl SourceTextModuleInstance {
    /// ### \[\[Context]]
    fn context(&self) -> ExecutionContext {
        ExecutionContext {
            environment: self.environment,
            this_value: Value::Undefined,
            script_or_module: Some(self.module.clone()),
        }
    }

    /// Runs the body of an async module from `start` until it completes or
    /// reaches an awaiting statement. The capability is settled with the
    /// outcome of the body.
    fn execute_from(
        self: Rc<Self>,
        agent: &mut Agent,
        capability: PromiseCapability,
        start: usize,
    ) -> JsResult<()> {
        let ctx = self.context();
        let statements = &self.record.body.statements;
        for (index, statement) in statements.iter().enumerate().skip(start) {
            let result = match statement {
                Statement::Await { target, argument } => {
                    match evaluate_expression(agent, &ctx, argument) {
                        Ok(value) => {
                            self.clone().await_value(agent, capability, index, target, value);
                            return Ok(());
                        }
                        Err(error) => Err(error),
                    }
                }
                statement => evaluate_statement(agent, &ctx, statement).map(drop),
            };
            if let Err(error) = result {
                if error.is_interrupt() {
                    return Err(error);
                }
                capability.reject(agent, error.into_value());
                return Ok(());
            }
        }
        capability.resolve(agent, Value::Undefined);
        Ok(())
    }

    /// ### [27.7.5.3 Await ( value )](https://tc39.es/ecma262/#await)
    fn await_value(
        self: Rc<Self>,
        agent: &mut Agent,
        capability: PromiseCapability,
        index: usize,
        target: &AwaitTarget,
        value: Value,
    ) {
        // 2. Let promise be ? PromiseResolve(%Promise%, value).
        let promise = promise_resolve(agent, value);
        let reaction = ModuleAwaitReaction {
            instance: self,
            capability,
            index,
            target: target.clone(),
        };
        // 7. Perform PerformPromiseThen(promise, onFulfilled, onRejected).
        inner_promise_then(
            agent,
            promise,
            PromiseReactionHandler::ModuleAwait(reaction.clone()),
            PromiseReactionHandler::ModuleAwait(reaction),
            None,
        );
    }
}

impl ModuleInstanceMethods for SourceTextModuleInstance {
    fn get_binding_value(&self, agent: &mut Agent, name: &str) -> JsResult<Option<Value>> {
        self.environment.get_binding_value(agent, name)
    }
}

impl CyclicModuleInstance for SourceTextModuleInstance {
    /// ### [16.2.1.7.3.2 ExecuteModule ( \[ capability \] )](https://tc39.es/ecma262/#sec-source-text-module-record-execute-module)
    fn execute_module(
        self: Rc<Self>,
        agent: &mut Agent,
        capability: Option<PromiseCapability>,
    ) -> JsResult<()> {
        if agent.options.print_internals {
            eprintln!("=== Executing module {} ===", self.module);
            eprintln!("{:#?}", self.record.body.statements);
        }
        match capability {
            // 9. If module.[[HasTLA]] is false, then
            None => {
                // a. Assert: capability is not present.
                debug_assert!(!self.record.has_tla);
                // d. Let result be Completion(Evaluation of module.[[ECMAScriptCode]]).
                let ctx = self.context();
                evaluate_statements(agent, &ctx, &self.record.body.statements)?;
                // g. If result is an abrupt completion, then
                //    i. Return ? result.
                Ok(())
            }
            // 10. Else,
            //     a. Assert: capability is a PromiseCapability Record.
            //     b. Perform AsyncBlockStart(capability, module.[[ECMAScriptCode]], moduleContext).
            Some(capability) => self.execute_from(agent, capability, 0),
        }
    }
}

/// The continuation of an async module body suspended at a top-level
/// `await`.
#[derive(Debug, Clone)]
pub(crate) struct ModuleAwaitReaction {
    instance: Rc<SourceTextModuleInstance>,
    capability: PromiseCapability,
    /// Index of the awaiting top-level statement.
    index: usize,
    target: AwaitTarget,
}

impl ModuleAwaitReaction {
    pub(crate) fn resume(
        self,
        agent: &mut Agent,
        reaction_type: PromiseReactionType,
        value: Value,
    ) -> JsResult<()> {
        let Self {
            instance,
            capability,
            index,
            target,
        } = self;
        if let PromiseReactionType::Reject = reaction_type {
            // The awaiting statement throws.
            capability.reject(agent, value);
            return Ok(());
        }
        let ctx = instance.context();
        let result = match &target {
            AwaitTarget::Discard => Ok(()),
            AwaitTarget::Declaration {
                kind: DeclarationKind::Var,
                name,
            }
            | AwaitTarget::Assignment(name) => {
                put_identifier_value(agent, ctx.environment, name, value)
            }
            AwaitTarget::Declaration { name, .. } => {
                initialize_lexical_binding(agent, &ctx, name, value);
                Ok(())
            }
        };
        match result {
            Ok(()) => instance.execute_from(agent, capability, index + 1),
            Err(error) if error.is_interrupt() => Err(error),
            Err(error) => {
                capability.reject(agent, error.into_value());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(source: &str) -> Rc<SourceTextModuleRecord> {
        parse_module(source, Some("test.js"), None).expect("module should parse")
    }

    fn error_messages(source: &str) -> Vec<String> {
        parse_module(source, Some("test.js"), None)
            .expect_err("module should not parse")
            .iter()
            .map(|error| error.to_string())
            .collect()
    }

    #[test]
    fn requested_modules_in_source_order() {
        let record = parse(
            r#"
            import { a } from "./a.js";
            export { b } from "./b.js";
            import "./a.js";
            export * from "./c.js";
            "#,
        );
        let requested: Vec<&str> = record.requested_modules().iter().map(|m| &**m).collect();
        assert_eq!(requested, ["./a.js", "./b.js", "./a.js", "./c.js"]);
    }

    #[test]
    fn import_entries() {
        let record = parse(
            r#"
            import def, { a, b as c } from "./m.js";
            import * as ns from "./n.js";
            "#,
        );
        let entries = record.import_entries();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].import_name, ImportName::Name("default".into()));
        assert_eq!(&*entries[0].local_name, "def");
        assert_eq!(entries[2].import_name, ImportName::Name("b".into()));
        assert_eq!(&*entries[2].local_name, "c");
        assert_eq!(entries[3].import_name, ImportName::NamespaceObject);
        assert_eq!(&*entries[3].module_request, "./n.js");
        assert!(entries[0].source_offset < entries[1].source_offset);
    }

    #[test]
    fn export_entries() {
        let record = parse(
            r#"
            import { x } from "./x.js";
            import * as ns from "./ns.js";
            export let a = 1;
            export function f() {}
            export { a as b, x, ns };
            export { y as z } from "./y.js";
            export * as all from "./all.js";
            export * from "./star.js";
            export default 42;
            "#,
        );
        let local: Vec<(&str, &str)> = record
            .local_export_entries()
            .iter()
            .map(|e| (&*e.export_name, &*e.local_name))
            .collect();
        assert_eq!(
            local,
            [
                ("a", "a"),
                ("f", "f"),
                ("b", "a"),
                ("ns", "ns"),
                ("default", "*default*")
            ]
        );
        assert_eq!(
            record.indirect_export_entries(),
            [
                IndirectExportEntryRecord {
                    export_name: "x".into(),
                    module_request: "./x.js".into(),
                    import_name: ExportImportName::Name("x".into()),
                },
                IndirectExportEntryRecord {
                    export_name: "z".into(),
                    module_request: "./y.js".into(),
                    import_name: ExportImportName::Name("y".into()),
                },
                IndirectExportEntryRecord {
                    export_name: "all".into(),
                    module_request: "./all.js".into(),
                    import_name: ExportImportName::All,
                },
            ]
        );
        assert_eq!(
            record.star_export_entries(),
            [StarExportEntryRecord {
                module_request: "./star.js".into()
            }]
        );
    }

    #[test]
    fn named_default_function_export() {
        let record = parse("export default function main() {}");
        assert_eq!(&*record.local_export_entries()[0].local_name, "main");
        assert!(!record.has_tla());
    }

    #[test]
    fn duplicate_export_name() {
        let messages = error_messages("let a, b; export { a }; export { b as a };");
        assert_eq!(messages, ["Duplicated export 'a'"]);
    }

    #[test]
    fn duplicate_export_across_declaration_kinds() {
        let messages = error_messages("export let a = 1; export { a as default }; export default 2;");
        assert_eq!(messages, ["Duplicated default export"]);
    }

    #[test]
    fn duplicate_import_binding() {
        let messages = error_messages(r#"import { a } from "./a.js"; import { b as a } from "./b.js";"#);
        assert_eq!(messages, ["Identifier 'a' has already been declared"]);
    }

    #[test]
    fn import_conflicting_with_declaration() {
        let messages = error_messages(r#"import { a } from "./a.js"; let a = 1;"#);
        assert_eq!(messages, ["Identifier 'a' has already been declared"]);
    }

    #[test]
    fn undefined_local_export() {
        let messages = error_messages("export { missing };");
        assert_eq!(messages, ["Export 'missing' is not defined"]);
    }

    #[test]
    fn syntax_errors_are_returned() {
        assert!(parse_module("export let = ;", None, None).is_err());
    }

    #[test]
    fn top_level_await_sets_has_tla() {
        let record = parse("const value = await Promise.resolve(1);");
        assert!(record.has_tla());
    }
}
