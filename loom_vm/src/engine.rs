// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lowering of parsed module bodies and their tree-walking evaluation.

pub(crate) mod compiler;
pub(crate) mod executable;
pub(crate) mod vm;
