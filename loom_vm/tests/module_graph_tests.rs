// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use std::{cell::RefCell, rc::Rc, time::Duration};

use common::{
    TestHost, create_agent, create_agent_with_options, error_message, global, global_string,
    run_module,
};
use loom_vm::ecmascript::{
    execution::{Agent, AgentOptions, HostHooks, JsResult},
    scripts_and_modules::module::module_semantics::{
        abstract_module_records::{
            BindingName, ForeignModuleRecord, Module, ModuleAbstractMethods, ResolveExportResult,
            ResolveSet, ResolvedBinding,
        },
        cyclic_module_records::{CyclicModuleRecord, CyclicModuleRecordStatus},
        module_instances::{CyclicModuleInstance, ModuleInstanceMethods},
        source_text_module_records::parse_module,
    },
    types::{JsString, Value},
};

/// A cyclic module without a body that logs each InitializeEnvironment and
/// ExecuteModule call.
#[derive(Debug)]
struct LoggingModule {
    name: JsString,
    requested_modules: Vec<JsString>,
    log: Rc<RefCell<Vec<String>>>,
}

impl LoggingModule {
    fn create(name: &str, requested_modules: &[&str], log: &Rc<RefCell<Vec<String>>>) -> Module {
        Module::cyclic(Rc::new(Self {
            name: name.into(),
            requested_modules: requested_modules.iter().map(|&s| s.into()).collect(),
            log: log.clone(),
        }))
    }
}

impl ModuleAbstractMethods for LoggingModule {
    fn get_exported_names(
        self: Rc<Self>,
        _agent: &mut Agent,
        _export_star_set: &mut Vec<Module>,
    ) -> JsResult<Vec<JsString>> {
        Ok(Vec::new())
    }

    fn resolve_export(
        self: Rc<Self>,
        _agent: &mut Agent,
        _export_name: &str,
        _resolve_set: &mut ResolveSet,
    ) -> JsResult<Option<ResolveExportResult>> {
        Ok(None)
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

impl CyclicModuleRecord for LoggingModule {
    fn requested_modules(&self) -> &[JsString] {
        &self.requested_modules
    }

    fn initialize_environment(self: Rc<Self>, _agent: &mut Agent) -> JsResult<()> {
        self.log.borrow_mut().push(format!("initialize {}", self.name));
        Ok(())
    }

    fn instantiate(self: Rc<Self>, _agent: &mut Agent) -> JsResult<Rc<dyn CyclicModuleInstance>> {
        Ok(Rc::new(LoggingInstance { record: self }))
    }
}

#[derive(Debug)]
struct LoggingInstance {
    record: Rc<LoggingModule>,
}

impl ModuleInstanceMethods for LoggingInstance {
    fn get_binding_value(&self, _agent: &mut Agent, _name: &str) -> JsResult<Option<Value>> {
        Ok(None)
    }
}

impl CyclicModuleInstance for LoggingInstance {
    fn execute_module(
        self: Rc<Self>,
        _agent: &mut Agent,
        _capability: Option<loom_vm::ecmascript::builtins::PromiseCapability>,
    ) -> JsResult<()> {
        let record = &self.record;
        record.log.borrow_mut().push(format!("execute {}", record.name));
        Ok(())
    }
}

/// A foreign module exporting the constant `answer`.
#[derive(Debug, Default)]
struct NativeModule {
    evaluations: RefCell<u32>,
}

impl ModuleAbstractMethods for NativeModule {
    fn get_exported_names(
        self: Rc<Self>,
        _agent: &mut Agent,
        _export_star_set: &mut Vec<Module>,
    ) -> JsResult<Vec<JsString>> {
        Ok(vec!["answer".into()])
    }

    fn resolve_export(
        self: Rc<Self>,
        _agent: &mut Agent,
        export_name: &str,
        _resolve_set: &mut ResolveSet,
    ) -> JsResult<Option<ResolveExportResult>> {
        if export_name != "answer" {
            return Ok(None);
        }
        Ok(Some(ResolveExportResult::Resolved(ResolvedBinding {
            module: Module::foreign(self),
            binding_name: BindingName::Name("answer".into()),
        })))
    }
}

#[derive(Debug)]
struct NativeInstance;

impl ModuleInstanceMethods for NativeInstance {
    fn get_binding_value(&self, _agent: &mut Agent, name: &str) -> JsResult<Option<Value>> {
        Ok((name == "answer").then_some(Value::Number(42.0)))
    }
}

impl ForeignModuleRecord for NativeModule {
    fn link(self: Rc<Self>, _agent: &mut Agent) -> JsResult<()> {
        Ok(())
    }

    fn evaluate(self: Rc<Self>, _agent: &mut Agent) -> JsResult<Rc<dyn ModuleInstanceMethods>> {
        *self.evaluations.borrow_mut() += 1;
        Ok(Rc::new(NativeInstance))
    }
}

#[test]
fn end_to_end_function_import() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let main = host.load(&mut agent, "main.js");

    main.link(&mut agent).unwrap();
    assert_eq!(main.status(&agent), Some(CyclicModuleRecordStatus::Linked));
    main.evaluate(&mut agent).unwrap();
    assert_eq!(main.status(&agent), Some(CyclicModuleRecordStatus::Evaluated));

    assert_eq!(global(&mut agent, "s").as_number(), Some(5.0));
}

#[test]
fn diamond_dependencies_run_once() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let host = TestHost::leak();
    let a = LoggingModule::create("A", &["B", "C"], &log);
    host.register("B", LoggingModule::create("B", &["D"], &log));
    host.register("C", LoggingModule::create("C", &["D"], &log));
    host.register("D", LoggingModule::create("D", &[], &log));
    let mut agent = create_agent(host);

    a.link(&mut agent).unwrap();
    assert_eq!(
        *log.borrow(),
        ["initialize D", "initialize B", "initialize C", "initialize A"]
    );
    log.borrow_mut().clear();

    a.evaluate(&mut agent).unwrap();
    a.evaluate(&mut agent).unwrap();
    assert_eq!(
        *log.borrow(),
        ["execute D", "execute B", "execute C", "execute A"]
    );
}

#[test]
fn linking_twice_does_not_reinitialize() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let host = TestHost::leak();
    let a = LoggingModule::create("A", &["B"], &log);
    host.register("B", LoggingModule::create("B", &["A"], &log));
    host.register("A", a.clone());
    let mut agent = create_agent(host);

    a.link(&mut agent).unwrap();
    a.link(&mut agent).unwrap();
    assert_eq!(*log.borrow(), ["initialize B", "initialize A"]);

    let b = host.load(&mut agent, "B");
    assert_eq!(b.status(&agent), Some(CyclicModuleRecordStatus::Linked));
}

#[test]
fn cycle_members_finish_together() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let host = TestHost::leak();
    let a = LoggingModule::create("A", &["B"], &log);
    host.register("A", a.clone());
    host.register("B", LoggingModule::create("B", &["A"], &log));
    let mut agent = create_agent(host);

    a.link(&mut agent).unwrap();
    a.evaluate(&mut agent).unwrap();
    let b = host.load(&mut agent, "B");
    assert_eq!(b.status(&agent), Some(CyclicModuleRecordStatus::Evaluated));
    assert_eq!(a.status(&agent), Some(CyclicModuleRecordStatus::Evaluated));
    assert_eq!(
        log.borrow()[2..],
        ["execute B".to_string(), "execute A".to_string()]
    );
}

#[test]
fn resolver_failure_rolls_back_link() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let host = TestHost::leak();
    let main = LoggingModule::create("main", &["a", "b", "missing", "c"], &log);
    host.register("a", LoggingModule::create("a", &[], &log));
    host.register("b", LoggingModule::create("b", &[], &log));
    host.register("c", LoggingModule::create("c", &[], &log));
    let mut agent = create_agent(host);

    let error = main.link(&mut agent).unwrap_err();
    assert_eq!(
        error_message(&mut agent, &error),
        "TypeError: Cannot find module 'missing'"
    );
    for specifier in ["a", "b", "c"] {
        let module = host.load(&mut agent, specifier);
        assert_eq!(module.status(&agent), Some(CyclicModuleRecordStatus::Unlinked));
    }
    assert_eq!(main.status(&agent), Some(CyclicModuleRecordStatus::Unlinked));

    // The graph links once the missing module becomes available.
    host.register("missing", LoggingModule::create("missing", &[], &log));
    main.link(&mut agent).unwrap();
    assert_eq!(main.status(&agent), Some(CyclicModuleRecordStatus::Linked));
}

/// Host that links `side` from inside the first resolution of `trigger`.
#[derive(Debug)]
struct NestedLinkHost {
    modules: &'static TestHost,
    trigger: &'static str,
    side: RefCell<Option<Module>>,
}

impl HostHooks for NestedLinkHost {
    fn resolve_imported_module(
        &self,
        agent: &mut Agent,
        referrer: Option<&Module>,
        specifier: &str,
    ) -> JsResult<Module> {
        if specifier == self.trigger {
            let side = self.side.borrow_mut().take();
            if let Some(side) = side {
                side.link(agent)?;
            }
        }
        self.modules.resolve_imported_module(agent, referrer, specifier)
    }
}

#[test]
fn resolver_may_link_a_module_that_imports_a_linking_one() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let modules = TestHost::leak();
    let a = LoggingModule::create("A", &["B"], &log);
    modules.register("A", a.clone());
    modules.register("B", LoggingModule::create("B", &[], &log));
    let side = LoggingModule::create("side", &["A"], &log);
    let host: &'static NestedLinkHost = Box::leak(Box::new(NestedLinkHost {
        modules,
        trigger: "B",
        side: RefCell::new(Some(side.clone())),
    }));
    let mut agent = Agent::new(AgentOptions::default(), host);

    a.link(&mut agent).unwrap();
    assert_eq!(side.status(&agent), Some(CyclicModuleRecordStatus::Linked));
    assert_eq!(a.status(&agent), Some(CyclicModuleRecordStatus::Linked));
    assert_eq!(
        *log.borrow(),
        ["initialize side", "initialize B", "initialize A"]
    );
}

#[test]
fn evaluate_requires_link() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let main = host.load(&mut agent, "main.js");

    let error = main.evaluate(&mut agent).unwrap_err();
    assert_eq!(
        error_message(&mut agent, &error),
        "TypeError: Module 'main.js' must be linked before it is evaluated"
    );
    assert_eq!(main.status(&agent), Some(CyclicModuleRecordStatus::Unlinked));
}

#[test]
fn mutual_re_export_does_not_resolve() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let p = host.load(&mut agent, "cycle_p.js");

    let resolution = p.resolve_export(&mut agent, "x", &mut Vec::new()).unwrap();
    assert_eq!(resolution, None);
}

#[test]
fn star_export_ambiguity() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let r = host.load(&mut agent, "star_r.js");
    let s = host.load(&mut agent, "star_s.js");

    let y = r.resolve_export(&mut agent, "y", &mut Vec::new()).unwrap();
    assert_eq!(y, Some(ResolveExportResult::Ambiguous));

    let only_s = r.resolve_export(&mut agent, "onlyS", &mut Vec::new()).unwrap();
    assert_eq!(
        only_s,
        Some(ResolveExportResult::Resolved(ResolvedBinding {
            module: s.clone(),
            binding_name: BindingName::Name("onlyS".into()),
        }))
    );

    let default = r.resolve_export(&mut agent, "default", &mut Vec::new()).unwrap();
    assert_eq!(default, None);

    let mut names = r.get_exported_names(&mut agent, &mut Vec::new()).unwrap();
    names.sort();
    let expected: [JsString; 3] = ["onlyS".into(), "onlyT".into(), "y".into()];
    assert_eq!(names, expected);
}

#[test]
fn star_exports_of_the_same_binding_are_not_ambiguous() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let same = host.load(&mut agent, "star_same.js");
    let s = host.load(&mut agent, "star_s.js");

    let y = same.resolve_export(&mut agent, "y", &mut Vec::new()).unwrap();
    assert_eq!(
        y,
        Some(ResolveExportResult::Resolved(ResolvedBinding {
            module: s,
            binding_name: BindingName::Name("y".into()),
        }))
    );
}

#[test]
fn importing_an_ambiguous_name_fails_to_link() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let importer = host.load(&mut agent, "star_importer.js");

    let error = importer.link(&mut agent).unwrap_err();
    assert_eq!(
        error_message(&mut agent, &error),
        "SyntaxError: The requested module 'star_r.js' contains conflicting star exports for name 'y'"
    );
    assert_eq!(
        importer.status(&agent),
        Some(CyclicModuleRecordStatus::Unlinked)
    );
}

#[test]
fn importing_a_missing_name_fails_to_link() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let importer = host.load(&mut agent, "import_missing.js");

    let error = importer.link(&mut agent).unwrap_err();
    assert_eq!(
        error_message(&mut agent, &error),
        "SyntaxError: The requested module 'dep.js' does not provide an export named 'nothing'"
    );
    let dep = host.load(&mut agent, "dep.js");
    assert_eq!(dep.status(&agent), Some(CyclicModuleRecordStatus::Unlinked));
}

#[test]
fn duplicate_export_is_an_early_error() {
    let errors = parse_module(
        "let a = 1, b = 2; export { a }; export { b as a };",
        Some("duplicate.js"),
        None,
    )
    .unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].to_string(), "Duplicated export 'a'");
}

#[test]
fn cyclic_function_imports() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let a = host.load(&mut agent, "cycle_a.js");

    run_module(&mut agent, &a).unwrap();
    assert_eq!(global_string(&mut agent, "cycleResult"), "baa");
}

#[test]
fn module_graph_depth_guard() {
    let host = TestHost::leak();
    let mut agent = create_agent_with_options(
        host,
        AgentOptions {
            max_module_graph_depth: 2,
            ..Default::default()
        },
    );
    let chain = host.load(&mut agent, "chain_0.js");

    let error = chain.link(&mut agent).unwrap_err();
    assert_eq!(
        error_message(&mut agent, &error),
        "RangeError: Maximum module graph depth exceeded"
    );
    assert_eq!(chain.status(&agent), Some(CyclicModuleRecordStatus::Unlinked));
}

#[test]
fn evaluation_errors_are_cached() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let throws = host.load(&mut agent, "throws.js");
    let dependent = host.load(&mut agent, "throws_dependent.js");

    dependent.link(&mut agent).unwrap();
    let first = dependent.evaluate(&mut agent).unwrap_err();
    assert_eq!(error_message(&mut agent, &first), "Error: failed");

    let second = throws.evaluate(&mut agent).unwrap_err();
    let third = dependent.evaluate(&mut agent).unwrap_err();
    assert_eq!(first.value().as_object(), second.value().as_object());
    assert_eq!(first.value().as_object(), third.value().as_object());

    assert_eq!(global(&mut agent, "throwCount").as_number(), Some(1.0));
    assert!(global(&mut agent, "dependentRan").is_undefined());
    assert_eq!(throws.status(&agent), Some(CyclicModuleRecordStatus::Evaluated));
}

#[test]
fn call_depth_guard() {
    let host = TestHost::leak();
    let mut agent = create_agent_with_options(
        host,
        AgentOptions {
            max_call_depth: 32,
            ..Default::default()
        },
    );
    let recursion = host.load(&mut agent, "recursion.js");

    let error = run_module(&mut agent, &recursion).unwrap_err();
    assert_eq!(
        error_message(&mut agent, &error),
        "RangeError: Maximum call stack size exceeded"
    );
}

#[test]
fn interrupt_stops_evaluation() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let spin = host.load(&mut agent, "spin.js");
    spin.link(&mut agent).unwrap();

    let handle = agent.interrupt_handle();
    let interrupter = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        handle.interrupt();
    });
    let error = spin.evaluate(&mut agent).unwrap_err();
    interrupter.join().unwrap();

    assert!(error.is_interrupt());
    assert_eq!(
        error_message(&mut agent, &error),
        "InterruptError: Execution interrupted"
    );
}

#[test]
fn foreign_modules_are_evaluated_once() {
    let host = TestHost::leak();
    let native = Rc::new(NativeModule::default());
    host.register("native", Module::foreign(native.clone()));
    let mut agent = create_agent(host);

    let first = host.load(&mut agent, "uses_native.js");
    let second = host.load(&mut agent, "uses_native_again.js");
    run_module(&mut agent, &first).unwrap();
    run_module(&mut agent, &second).unwrap();

    assert_eq!(*native.evaluations.borrow(), 1);
    assert_eq!(global(&mut agent, "first").as_number(), Some(42.0));
    assert_eq!(global(&mut agent, "second").as_number(), Some(43.0));
    assert!(agent.get_module_instance(&Module::foreign(native)).is_some());
}

#[test]
fn agents_do_not_share_module_state() {
    let host = TestHost::leak();
    let mut first = create_agent(host);
    let mut second = create_agent(host);
    let main = host.load(&mut first, "main.js");

    run_module(&mut first, &main).unwrap();
    assert_eq!(main.status(&first), Some(CyclicModuleRecordStatus::Evaluated));
    assert_eq!(main.status(&second), Some(CyclicModuleRecordStatus::Unlinked));
    assert!(second.get_module_instance(&main).is_none());

    run_module(&mut second, &main).unwrap();
    assert_eq!(global(&mut second, "s").as_number(), Some(5.0));
}
