// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [16.2.1 Module Semantics](https://tc39.es/ecma262/#sec-module-semantics)
pub mod abstract_module_records;
pub mod cyclic_module_records;
pub mod module_instances;
pub mod source_text_module_records;
