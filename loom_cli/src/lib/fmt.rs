// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Formatting values, module entries and errors.

use loom_vm::ecmascript::{
    execution::{Agent, JsResult},
    scripts_and_modules::module::module_semantics::{
        abstract_module_records::Module,
        cyclic_module_records::CyclicModuleRecord,
        source_text_module_records::{ExportImportName, ImportName, SourceTextModuleRecord},
    },
    types::Value,
};
use oxc_diagnostics::OxcDiagnostic;

pub fn print_result(agent: &mut Agent, result: JsResult<Value>, verbose: bool) {
    match result {
        Ok(result) => {
            if verbose {
                println!("{}", result.string_repr(agent));
            }
        }
        Err(error) => {
            eprintln!("Uncaught exception: {}", error.to_string(agent));
            std::process::exit(1);
        }
    }
}

/// Prints the module requests and entry lists of a parsed module.
pub fn print_module_entries(record: &SourceTextModuleRecord) {
    println!("Requested modules:");
    for specifier in record.requested_modules() {
        println!("  {specifier:?}");
    }
    println!("Import entries:");
    for entry in record.import_entries() {
        let import_name = match &entry.import_name {
            ImportName::Name(name) => name.to_string(),
            ImportName::NamespaceObject => "*".to_string(),
        };
        println!(
            "  {} from {:?} as {}",
            import_name, entry.module_request, entry.local_name
        );
    }
    println!("Local export entries:");
    for entry in record.local_export_entries() {
        println!("  {} as {}", entry.local_name, entry.export_name);
    }
    println!("Indirect export entries:");
    for entry in record.indirect_export_entries() {
        let import_name = match &entry.import_name {
            ExportImportName::Name(name) => name.to_string(),
            ExportImportName::All => "*".to_string(),
        };
        println!(
            "  {} from {:?} as {}",
            import_name, entry.module_request, entry.export_name
        );
    }
    println!("Star export entries:");
    for entry in record.star_export_entries() {
        println!("  * from {:?}", entry.module_request);
    }
}

/// Prints the exported bindings of an evaluated module through its
/// namespace object.
pub fn print_exports(agent: &mut Agent, module: &Module) -> JsResult<()> {
    let namespace = agent.get_module_namespace(module)?;
    for name in namespace.own_property_keys(agent) {
        let value = namespace.get(agent, &name)?;
        println!("{name}: {}", value.string_repr(agent));
    }
    Ok(())
}

/// Print parse errors as graphical reports.
pub fn print_parse_errors(errors: Vec<OxcDiagnostic>, source_path: &str, source: &str) {
    // Needed for color and Unicode output. Fails if already installed.
    let _ = miette::set_hook(Box::new(|_| {
        Box::new(oxc_diagnostics::GraphicalReportHandler::new())
    }));

    let named_source = miette::NamedSource::new(source_path, source.to_string());

    eprintln!("SyntaxError:");

    for error in errors {
        let report = error.with_source_code(named_source.clone());
        eprintln!("{report:?}");
    }
}

/// Exit the program with parse errors.
pub fn exit_with_parse_errors(errors: Vec<OxcDiagnostic>, source_path: &str, source: &str) -> ! {
    assert!(!errors.is_empty());
    print_parse_errors(errors, source_path, source);
    std::process::exit(1);
}
