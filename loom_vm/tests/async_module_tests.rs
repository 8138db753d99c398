// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use common::{TestHost, create_agent, error_message, global, global_string, run_module};
use loom_vm::ecmascript::{
    builtins::PromiseState,
    scripts_and_modules::module::module_semantics::cyclic_module_records::CyclicModuleRecordStatus,
};

#[test]
fn top_level_await_settles_after_jobs() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let main = host.load(&mut agent, "tla_main.js");
    let dep = host.load(&mut agent, "tla_dep.js");

    main.link(&mut agent).unwrap();
    main.evaluate(&mut agent).unwrap();
    assert!(global(&mut agent, "tlaResult").is_undefined());
    assert_eq!(
        main.status(&agent),
        Some(CyclicModuleRecordStatus::EvaluatingAsync)
    );
    let promise = main.evaluation_promise(&agent).unwrap();
    assert!(matches!(promise.state(&agent), PromiseState::Pending));

    agent.run_jobs().unwrap();
    assert_eq!(global(&mut agent, "tlaResult").as_number(), Some(42.0));
    assert_eq!(main.status(&agent), Some(CyclicModuleRecordStatus::Evaluated));
    assert_eq!(dep.status(&agent), Some(CyclicModuleRecordStatus::Evaluated));
    assert!(matches!(promise.state(&agent), PromiseState::Fulfilled(_)));
}

#[test]
fn async_dependencies_finish_before_dependents() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let main = host.load(&mut agent, "order_main.js");

    main.link(&mut agent).unwrap();
    main.evaluate(&mut agent).unwrap();
    assert_eq!(global_string(&mut agent, "order"), "slow:start,sync");

    agent.run_jobs().unwrap();
    assert_eq!(
        global_string(&mut agent, "order"),
        "slow:start,sync,slow:end,main"
    );
}

#[test]
fn top_level_await_rejection_propagates() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let main = host.load(&mut agent, "tla_reject_main.js");

    run_module(&mut agent, &main).unwrap();
    let promise = main.evaluation_promise(&agent).unwrap();
    let PromiseState::Rejected(reason) = promise.state(&agent) else {
        panic!("Evaluation promise did not reject");
    };
    assert_eq!(reason.string_repr(&mut agent).as_ref(), "Error: boom");
    assert!(global(&mut agent, "afterReject").is_undefined());
    assert!(global(&mut agent, "rejectMainRan").is_undefined());

    // The rejection is cached on the dependent.
    let error = main.evaluate(&mut agent).unwrap_err();
    assert_eq!(error_message(&mut agent, &error), "Error: boom");
}

#[test]
fn sync_sibling_error_wins_over_pending_async_dependency() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let main = host.load(&mut agent, "tla_then_throws.js");
    let dep = host.load(&mut agent, "tla_dep.js");

    main.link(&mut agent).unwrap();
    let error = main.evaluate(&mut agent).unwrap_err();
    assert_eq!(error_message(&mut agent, &error), "Error: failed");
    assert_eq!(main.status(&agent), Some(CyclicModuleRecordStatus::Evaluated));
    assert_eq!(
        dep.status(&agent),
        Some(CyclicModuleRecordStatus::EvaluatingAsync)
    );

    // The dependency still settles, without running the failed dependent.
    agent.run_jobs().unwrap();
    assert_eq!(dep.status(&agent), Some(CyclicModuleRecordStatus::Evaluated));
    assert!(global(&mut agent, "tlaThenThrowsRan").is_undefined());
    assert_eq!(global(&mut agent, "throwCount").as_number(), Some(1.0));

    let error = main.evaluate(&mut agent).unwrap_err();
    assert_eq!(error_message(&mut agent, &error), "Error: failed");
}

#[test]
fn late_async_rejection_keeps_sync_error() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let main = host.load(&mut agent, "tla_reject_then_throws.js");
    let dep = host.load(&mut agent, "tla_reject.js");

    main.link(&mut agent).unwrap();
    let error = main.evaluate(&mut agent).unwrap_err();
    assert_eq!(error_message(&mut agent, &error), "Error: failed");

    agent.run_jobs().unwrap();
    let error = dep.evaluate(&mut agent).unwrap_err();
    assert_eq!(error_message(&mut agent, &error), "Error: boom");
    assert!(global(&mut agent, "afterReject").is_undefined());

    // The dependent keeps the error it was stamped with first.
    let error = main.evaluate(&mut agent).unwrap_err();
    assert_eq!(error_message(&mut agent, &error), "Error: failed");
    let promise = main.evaluation_promise(&agent).unwrap();
    let PromiseState::Rejected(reason) = promise.state(&agent) else {
        panic!("Evaluation promise did not reject");
    };
    assert_eq!(reason.string_repr(&mut agent).as_ref(), "Error: failed");
    assert!(global(&mut agent, "tlaRejectThenThrowsRan").is_undefined());
    assert_eq!(global(&mut agent, "throwCount").as_number(), Some(1.0));
}

#[test]
fn dynamic_import() {
    let host = TestHost::leak();
    let mut agent = create_agent(host);
    let main = host.load(&mut agent, "dynamic_main.js");

    main.link(&mut agent).unwrap();
    main.evaluate(&mut agent).unwrap();
    assert_eq!(global_string(&mut agent, "dynamicValue"), "pending");

    agent.run_jobs().unwrap();
    assert_eq!(global_string(&mut agent, "dynamicValue"), "loaded");
    assert_eq!(global(&mut agent, "dynamicTla").as_number(), Some(42.0));
    assert_eq!(
        global_string(&mut agent, "dynamicError"),
        "Cannot find module 'missing.js'"
    );
    let dep = host.load(&mut agent, "dynamic_dep.js");
    assert_eq!(dep.status(&agent), Some(CyclicModuleRecordStatus::Evaluated));
}
