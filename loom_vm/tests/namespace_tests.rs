// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use common::{TestHost, create_agent, error_message, global, global_string, run_module};
use loom_vm::ecmascript::types::JsString;

#[test]
fn namespace_exports_are_sorted() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let exports = host.load(&mut agent, "ns_exports.js");
    exports.link(&mut agent).unwrap();

    let namespace = agent.get_module_namespace(&exports).unwrap();
    let keys: Vec<JsString> = namespace.own_property_keys(&agent);
    let expected: [JsString; 6] = [
        "a".into(),
        "b".into(),
        "counter".into(),
        "default".into(),
        "increment".into(),
        "nested".into(),
    ];
    assert_eq!(keys, expected);
    assert_eq!(namespace.prototype(&agent), None);
    assert_eq!(agent.get_module_namespace(&exports).unwrap(), namespace);
}

#[test]
fn namespace_excludes_ambiguous_names() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let r = host.load(&mut agent, "star_r.js");
    r.link(&mut agent).unwrap();

    let namespace = agent.get_module_namespace(&r).unwrap();
    let expected: [JsString; 2] = ["onlyS".into(), "onlyT".into()];
    assert_eq!(namespace.own_property_keys(&agent), expected);
}

#[test]
fn namespace_bindings_are_live_and_read_only() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let user = host.load(&mut agent, "ns_user.js");

    run_module(&mut agent, &user).unwrap();
    assert_eq!(global(&mut agent, "liveCounter").as_number(), Some(2.0));
    assert_eq!(global_string(&mut agent, "writeError"), "TypeError");
    assert_eq!(global_string(&mut agent, "nestedType"), "function");
    assert_eq!(global_string(&mut agent, "missingKey"), "undefined");

    let exports = host.load(&mut agent, "ns_exports.js");
    let namespace = agent.get_module_namespace(&exports).unwrap();
    let counter = namespace.get(&mut agent, "counter").unwrap();
    assert_eq!(counter.as_number(), Some(2.0));
    let default = namespace.get(&mut agent, "default").unwrap();
    assert_eq!(default.as_str(), Some("fallback"));
    assert!(namespace.set(&mut agent, "counter", 3.0.into()).is_err());
}

#[test]
fn namespace_reads_before_evaluation_throw() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let dep = host.load(&mut agent, "dep.js");
    dep.link(&mut agent).unwrap();

    let namespace = agent.get_module_namespace(&dep).unwrap();
    let error = namespace.get(&mut agent, "b").unwrap_err();
    assert_eq!(
        error_message(&mut agent, &error),
        "ReferenceError: Cannot access 'b' before initialization"
    );

    run_module(&mut agent, &dep).unwrap();
    let b = namespace.get(&mut agent, "b").unwrap();
    assert!(b.is_callable(&agent));
}

#[test]
fn namespace_reads_in_temporal_dead_zone() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let module = host.load(&mut agent, "tdz_self.js");

    run_module(&mut agent, &module).unwrap();
    let instance = agent.get_module_instance(&module).unwrap();
    let observed = instance
        .get_binding_value(&mut agent, "observed")
        .unwrap()
        .unwrap();
    assert_eq!(observed.as_str(), Some("ReferenceError"));
}

#[test]
fn import_meta() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let module = host.load(&mut agent, "meta.js");

    run_module(&mut agent, &module).unwrap();
    let instance = agent.get_module_instance(&module).unwrap();
    let url = instance.get_binding_value(&mut agent, "url").unwrap().unwrap();
    assert_eq!(url.as_str(), Some("test:///meta.js"));
    let same = instance.get_binding_value(&mut agent, "same").unwrap().unwrap();
    assert!(same.to_boolean());
    let meta = instance
        .get_binding_value(&mut agent, "meta")
        .unwrap()
        .unwrap()
        .as_object()
        .unwrap();
    assert_eq!(meta.prototype(&agent), None);
}
