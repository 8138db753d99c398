// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub(crate) mod array;
pub(crate) mod error;
pub(crate) mod module_namespace;
pub(crate) mod object_constructor;
pub mod promise_objects;

pub use promise_objects::{Promise, PromiseCapability, PromiseState};

use super::types::{Behaviour, Value};

/// A builtin function installed on an intrinsic object during realm setup.
pub(crate) trait Builtin {
    const NAME: &'static str;
    const LENGTH: u32;
    const BEHAVIOUR: Behaviour;
}

/// Returns the argument at `index`, or undefined.
pub(crate) fn argument(arguments: &[Value], index: usize) -> Value {
    arguments.get(index).cloned().unwrap_or_default()
}
