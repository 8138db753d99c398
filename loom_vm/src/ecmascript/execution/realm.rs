// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [9.3 Realms](https://tc39.es/ecma262/#sec-code-realms)

use super::{Environment, ExceptionType, agent::Heap};
use crate::ecmascript::{
    builtins::{
        Builtin,
        array::ArrayPrototype,
        error::ErrorConstructors,
        object_constructor::ObjectConstructor,
        promise_objects::{
            promise_constructor::PromiseConstructor, promise_prototype::PromisePrototype,
        },
    },
    types::{BuiltinFunction, Object, ObjectKind, Value},
};

/// ### [6.1.7.4 Well-Known Intrinsic Objects](https://tc39.es/ecma262/#sec-well-known-intrinsic-objects)
#[derive(Debug, Clone)]
pub(crate) struct Intrinsics {
    /// %Object.prototype%
    pub(crate) object_prototype: Object,
    /// %Function.prototype%
    pub(crate) function_prototype: Object,
    /// %Array.prototype%
    pub(crate) array_prototype: Object,
    /// %Promise.prototype%
    pub(crate) promise_prototype: Object,
    /// %Error.prototype%
    pub(crate) error_prototype: Object,
    /// %RangeError.prototype%
    pub(crate) range_error_prototype: Object,
    /// %ReferenceError.prototype%
    pub(crate) reference_error_prototype: Object,
    /// %SyntaxError.prototype%
    pub(crate) syntax_error_prototype: Object,
    /// %TypeError.prototype%
    pub(crate) type_error_prototype: Object,
}

impl Intrinsics {
    pub(crate) fn error_prototype(&self, kind: ExceptionType) -> Object {
        match kind {
            ExceptionType::Error => self.error_prototype,
            ExceptionType::RangeError => self.range_error_prototype,
            ExceptionType::ReferenceError => self.reference_error_prototype,
            ExceptionType::SyntaxError => self.syntax_error_prototype,
            ExceptionType::TypeError => self.type_error_prototype,
        }
    }
}

/// ### [9.3 Realms](https://tc39.es/ecma262/#sec-code-realms)
#[derive(Debug, Clone)]
pub(crate) struct Realm {
    /// ### \[\[GlobalObject]]
    pub(crate) global_object: Object,
    /// ### \[\[GlobalEnv]]
    pub(crate) global_env: Environment,
    /// ### \[\[Intrinsics]]
    pub(crate) intrinsics: Intrinsics,
}

/// Creates builtin functions and installs them as properties during realm
/// setup, before an Agent exists.
pub(crate) struct RealmBuilder<'a> {
    pub(crate) heap: &'a mut Heap,
    pub(crate) object_prototype: Object,
    pub(crate) function_prototype: Object,
}

impl RealmBuilder<'_> {
    pub(crate) fn ordinary_object(&mut self, prototype: Option<Object>) -> Object {
        self.heap.create_object(prototype, ObjectKind::Ordinary)
    }

    pub(crate) fn function<B: Builtin>(&mut self) -> Object {
        self.heap.create_builtin_function(
            self.function_prototype,
            BuiltinFunction::Behaviour(B::BEHAVIOUR),
            B::NAME,
            B::LENGTH,
        )
    }

    /// Defines `B` as a method property on `target`.
    pub(crate) fn method<B: Builtin>(&mut self, target: Object) {
        let function = self.function::<B>();
        target.define_own(self.heap, B::NAME, Value::Object(function));
    }

    /// Links a constructor and its prototype object both ways.
    pub(crate) fn link_constructor(&mut self, constructor: Object, prototype: Object) {
        constructor.define_own(self.heap, "prototype", Value::Object(prototype));
        prototype.define_own(self.heap, "constructor", Value::Object(constructor));
    }
}

impl Realm {
    /// ### [9.3.1 InitializeHostDefinedRealm ( )](https://tc39.es/ecma262/#sec-initializehostdefinedrealm)
    pub(crate) fn create(heap: &mut Heap) -> Self {
        let object_prototype = heap.create_object(None, ObjectKind::Ordinary);
        let function_prototype = heap.create_object(Some(object_prototype), ObjectKind::Ordinary);
        let mut builder = RealmBuilder {
            heap,
            object_prototype,
            function_prototype,
        };

        let object_constructor = ObjectConstructor::create_intrinsic(&mut builder);
        let array_prototype = ArrayPrototype::create_intrinsic(&mut builder);
        let errors = ErrorConstructors::create_intrinsics(&mut builder);
        let promise_prototype = PromisePrototype::create_intrinsic(&mut builder);
        let promise_constructor =
            PromiseConstructor::create_intrinsic(&mut builder, promise_prototype);

        // ### [19 The Global Object](https://tc39.es/ecma262/#sec-global-object)
        let global_object = builder.ordinary_object(Some(object_prototype));
        let heap = builder.heap;
        global_object.define_own(heap, "globalThis", Value::Object(global_object));
        global_object.define_own(heap, "undefined", Value::Undefined);
        global_object.define_own(heap, "NaN", Value::Number(f64::NAN));
        global_object.define_own(heap, "Infinity", Value::Number(f64::INFINITY));
        global_object.define_own(heap, "Object", Value::Object(object_constructor));
        global_object.define_own(heap, "Promise", Value::Object(promise_constructor));
        for (name, constructor) in errors.constructors {
            global_object.define_own(heap, name, Value::Object(constructor));
        }

        let global_env = heap.create_environment(None, true);

        Self {
            global_object,
            global_env,
            intrinsics: Intrinsics {
                object_prototype,
                function_prototype,
                array_prototype,
                promise_prototype,
                error_prototype: errors.error_prototype,
                range_error_prototype: errors.range_error_prototype,
                reference_error_prototype: errors.reference_error_prototype,
                syntax_error_prototype: errors.syntax_error_prototype,
                type_error_prototype: errors.type_error_prototype,
            },
        }
    }
}
