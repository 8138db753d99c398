// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Loom: an embeddable ECMAScript module graph engine.
//!
//! Module records are parsed with [`parse_module`] or implemented by the
//! embedder, linked with [`Module::link`] and evaluated with
//! [`Module::evaluate`] against an [`Agent`].
//!
//! [`parse_module`]: ecmascript::scripts_and_modules::module::module_semantics::source_text_module_records::parse_module
//! [`Module::link`]: ecmascript::scripts_and_modules::module::module_semantics::abstract_module_records::Module::link
//! [`Module::evaluate`]: ecmascript::scripts_and_modules::module::module_semantics::abstract_module_records::Module::evaluate
//! [`Agent`]: ecmascript::execution::Agent

pub mod ecmascript;
pub mod engine;
