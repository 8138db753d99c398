// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use loom_vm::ecmascript::{
    execution::{Agent, JsResult},
    types::{Behaviour, Object, Value},
};

/// Initialize the global object with the CLI's built-in functions.
pub fn initialize_global_object(agent: &mut Agent) -> JsResult<()> {
    // `print` function
    fn print(agent: &mut Agent, _this: Value, args: &[Value]) -> JsResult<Value> {
        match args.first() {
            None => println!(),
            Some(value) => println!("{}", value.to_string(agent)?),
        }
        Ok(Value::Undefined)
    }
    let function = Object::create_builtin_function(agent, Behaviour::Regular(print), "print", 1);
    let global = agent.global_object();
    global.set(agent, "print", function.into())
}
