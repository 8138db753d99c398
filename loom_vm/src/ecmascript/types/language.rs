// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [6.1 ECMAScript Language Types](https://tc39.es/ecma262/#sec-ecmascript-language-types)

mod function;
mod object;
mod value;

pub use function::{Behaviour, ConstructorFn, RegularFn};
pub(crate) use function::{BuiltinFunction, ECMAScriptFunction, FunctionKind};
pub use object::Object;
pub(crate) use object::{ObjectHeapData, ObjectKind, array_index};
pub use value::{JsString, Value};
pub(crate) use value::{number_to_string, string_to_number, to_property_key};
