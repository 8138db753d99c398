// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use crate::{
    ecmascript::{
        builtins::promise_objects::PromiseCapability,
        execution::{Agent, Environment, JsResult, agent::Heap},
        scripts_and_modules::module::module_semantics::abstract_module_records::Module,
    },
    engine::executable::FunctionDefinition,
};

use super::{Object, ObjectKind, Value};

/// A builtin function called without `new`.
pub type RegularFn = fn(&mut Agent, Value, &[Value]) -> JsResult<Value>;
/// A builtin function that may also be called with `new`; the last
/// parameter is the NewTarget.
pub type ConstructorFn = fn(&mut Agent, Value, &[Value], Option<Object>) -> JsResult<Value>;

#[derive(Debug, Clone, Copy)]
pub enum Behaviour {
    Regular(RegularFn),
    Constructor(ConstructorFn),
}

#[derive(Debug)]
pub(crate) enum FunctionKind {
    ECMAScript(ECMAScriptFunction),
    Builtin(BuiltinFunction),
}

/// ### [10.2 ECMAScript Function Objects](https://tc39.es/ecma262/#sec-ecmascript-function-objects)
#[derive(Debug)]
pub(crate) struct ECMAScriptFunction {
    pub(crate) definition: Rc<FunctionDefinition>,
    /// ### \[\[Environment]]
    pub(crate) environment: Environment,
    /// The lexically captured `this` of an arrow function.
    pub(crate) this_value: Option<Value>,
    /// ### \[\[ScriptOrModule]]
    pub(crate) script_or_module: Option<Module>,
}

/// ### [10.3 Built-in Function Objects](https://tc39.es/ecma262/#sec-built-in-function-objects)
#[derive(Debug)]
pub(crate) enum BuiltinFunction {
    Behaviour(Behaviour),
    /// ### [27.2.1.3.2 Promise Resolve Functions](https://tc39.es/ecma262/#sec-promise-resolve-functions)
    PromiseResolve(PromiseCapability),
    /// ### [27.2.1.3.1 Promise Reject Functions](https://tc39.es/ecma262/#sec-promise-reject-functions)
    PromiseReject(PromiseCapability),
}

impl Object {
    /// ### [10.3.4 CreateBuiltinFunction ( behaviour, length, name, additionalInternalSlotsList \[ , realm \[ , prototype \[ , prefix \] \] \] )](https://tc39.es/ecma262/#sec-createbuiltinfunction)
    pub fn create_builtin_function(
        agent: &mut Agent,
        behaviour: Behaviour,
        name: &str,
        length: u32,
    ) -> Self {
        let prototype = agent.realm.intrinsics.function_prototype;
        agent.heap.create_builtin_function(
            prototype,
            BuiltinFunction::Behaviour(behaviour),
            name,
            length,
        )
    }

    pub(crate) fn create_promise_resolving_function(
        agent: &mut Agent,
        function: BuiltinFunction,
    ) -> Self {
        let prototype = agent.realm.intrinsics.function_prototype;
        agent.heap.create_builtin_function(prototype, function, "", 1)
    }

    /// ### [10.2.3 OrdinaryFunctionCreate ( functionPrototype, sourceText, ParameterList, Body, thisMode, env, privateEnv )](https://tc39.es/ecma262/#sec-ordinaryfunctioncreate)
    pub(crate) fn create_ecmascript_function(
        agent: &mut Agent,
        function: ECMAScriptFunction,
        name: &str,
    ) -> Self {
        let function_prototype = agent.realm.intrinsics.function_prototype;
        let is_arrow = function.definition.is_arrow;
        let length = function.definition.parameters.len();
        let object = Self::create(
            agent,
            Some(function_prototype),
            ObjectKind::Function(FunctionKind::ECMAScript(function)),
        );
        object.define_own(&mut agent.heap, "length", Value::Number(length as f64));
        object.define_own(&mut agent.heap, "name", Value::from(name));
        if !is_arrow {
            // ### [10.2.5 MakeConstructor ( F \[ , writablePrototype \[ , prototype \] \] )](https://tc39.es/ecma262/#sec-makeconstructor)
            let prototype = Object::create_ordinary(agent);
            prototype.define_own(&mut agent.heap, "constructor", Value::Object(object));
            object.define_own(&mut agent.heap, "prototype", Value::Object(prototype));
        }
        object
    }
}

impl Heap {
    pub(crate) fn create_builtin_function(
        &mut self,
        prototype: Object,
        function: BuiltinFunction,
        name: &str,
        length: u32,
    ) -> Object {
        let object = self.create_object(
            Some(prototype),
            ObjectKind::Function(FunctionKind::Builtin(function)),
        );
        object.define_own(self, "length", Value::Number(f64::from(length)));
        object.define_own(self, "name", Value::from(name));
        object
    }
}
