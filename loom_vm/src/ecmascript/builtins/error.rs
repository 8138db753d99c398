// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [20.5 Error Objects](https://tc39.es/ecma262/#sec-error-objects)

use super::{Builtin, argument};
use crate::ecmascript::{
    execution::{Agent, ExceptionType, JsResult, realm::RealmBuilder},
    types::{Behaviour, Object, ObjectKind, Value},
};

/// Creates an error object of the given type with an own `message`.
pub(crate) fn create_error_object(agent: &mut Agent, kind: ExceptionType, message: &str) -> Object {
    let prototype = agent.realm.intrinsics.error_prototype(kind);
    let object = Object::create(agent, Some(prototype), ObjectKind::Error);
    object.define_own(&mut agent.heap, "message", Value::from(message));
    object
}

/// ### [20.5.1.1 Error ( message \[ , options \] )](https://tc39.es/ecma262/#sec-error-message)
fn construct_error(agent: &mut Agent, kind: ExceptionType, arguments: &[Value]) -> JsResult<Value> {
    // 1. If NewTarget is undefined, let newTarget be the active function
    //    object; else let newTarget be NewTarget.
    // 2. Let O be ? OrdinaryCreateFromConstructor(newTarget, "%Error.prototype%", « [[ErrorData]] »).
    let prototype = agent.realm.intrinsics.error_prototype(kind);
    let object = Object::create(agent, Some(prototype), ObjectKind::Error);
    // 3. If message is not undefined, then
    let message = argument(arguments, 0);
    if !message.is_undefined() {
        // a. Let msg be ? ToString(message).
        let message = message.to_string(agent)?;
        // b. Perform CreateNonEnumerableDataPropertyOrThrow(O, "message", msg).
        object.define_own(&mut agent.heap, "message", Value::String(message));
    }
    // 4. Perform ? InstallErrorCause(O, options).
    if let Some(options) = argument(arguments, 1).as_object() {
        if options.has_property(agent, "cause") {
            let cause = options.get(agent, "cause")?;
            object.define_own(&mut agent.heap, "cause", cause);
        }
    }
    // 5. Return O.
    Ok(Value::Object(object))
}

macro_rules! error_constructor {
    ($builtin: ident, $kind: expr, $name: literal) => {
        struct $builtin;
        impl Builtin for $builtin {
            const NAME: &'static str = $name;
            const LENGTH: u32 = 1;
            const BEHAVIOUR: Behaviour = Behaviour::Constructor(|agent, _this, arguments, _new_target| {
                construct_error(agent, $kind, arguments)
            });
        }
    };
}

error_constructor!(ErrorConstructor, ExceptionType::Error, "Error");
error_constructor!(RangeErrorConstructor, ExceptionType::RangeError, "RangeError");
error_constructor!(ReferenceErrorConstructor, ExceptionType::ReferenceError, "ReferenceError");
error_constructor!(SyntaxErrorConstructor, ExceptionType::SyntaxError, "SyntaxError");
error_constructor!(TypeErrorConstructor, ExceptionType::TypeError, "TypeError");

pub(crate) struct ErrorConstructors {
    pub(crate) constructors: Vec<(&'static str, Object)>,
    pub(crate) error_prototype: Object,
    pub(crate) range_error_prototype: Object,
    pub(crate) reference_error_prototype: Object,
    pub(crate) syntax_error_prototype: Object,
    pub(crate) type_error_prototype: Object,
}

impl ErrorConstructors {
    pub(crate) fn create_intrinsics(builder: &mut RealmBuilder) -> Self {
        let mut constructors = Vec::with_capacity(5);

        // ### [20.5.3 Properties of the Error Prototype Object](https://tc39.es/ecma262/#sec-properties-of-the-error-prototype-object)
        let error_prototype = builder.ordinary_object(Some(builder.object_prototype));
        error_prototype.define_own(builder.heap, "name", Value::from("Error"));
        error_prototype.define_own(builder.heap, "message", Value::from(""));
        let error_constructor = builder.function::<ErrorConstructor>();
        builder.link_constructor(error_constructor, error_prototype);
        constructors.push((ErrorConstructor::NAME, error_constructor));

        // ### [20.5.6 NativeError Object Structure](https://tc39.es/ecma262/#sec-nativeerror-object-structure)
        let mut native_error = |builder: &mut RealmBuilder, name: &'static str, constructor: Object| {
            let prototype = builder.ordinary_object(Some(error_prototype));
            prototype.define_own(builder.heap, "name", Value::from(name));
            prototype.define_own(builder.heap, "message", Value::from(""));
            builder.link_constructor(constructor, prototype);
            constructors.push((name, constructor));
            prototype
        };
        let constructor = builder.function::<RangeErrorConstructor>();
        let range_error_prototype = native_error(builder, RangeErrorConstructor::NAME, constructor);
        let constructor = builder.function::<ReferenceErrorConstructor>();
        let reference_error_prototype =
            native_error(builder, ReferenceErrorConstructor::NAME, constructor);
        let constructor = builder.function::<SyntaxErrorConstructor>();
        let syntax_error_prototype = native_error(builder, SyntaxErrorConstructor::NAME, constructor);
        let constructor = builder.function::<TypeErrorConstructor>();
        let type_error_prototype = native_error(builder, TypeErrorConstructor::NAME, constructor);

        Self {
            constructors,
            error_prototype,
            range_error_prototype,
            reference_error_prototype,
            syntax_error_prototype,
            type_error_prototype,
        }
    }
}
