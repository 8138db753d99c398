// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod language;

pub use language::{Behaviour, ConstructorFn, JsString, Object, RegularFn, Value};
pub(crate) use language::{
    BuiltinFunction, ECMAScriptFunction, FunctionKind, ObjectHeapData, ObjectKind, array_index,
    number_to_string, string_to_number, to_property_key,
};
