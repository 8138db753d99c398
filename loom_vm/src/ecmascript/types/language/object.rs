// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [6.1.7 The Object Type](https://tc39.es/ecma262/#sec-object-type)
//!
//! Objects live in the agent's heap and are referred to by index. Every
//! property is a writable, enumerable data property; accessors and property
//! attributes are not modelled.

use std::ops::{Index, IndexMut};

use crate::ecmascript::{
    builtins::{
        module_namespace::{ModuleNamespaceData, namespace_get},
        promise_objects::PromiseHeapData,
    },
    execution::{Agent, ExceptionType, JsResult, agent::Heap},
};

use super::{FunctionKind, JsString, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Object(pub(crate) u32);

#[derive(Debug)]
pub struct ObjectHeapData {
    pub(crate) prototype: Option<Object>,
    pub(crate) extensible: bool,
    /// Own properties in insertion order.
    pub(crate) properties: Vec<(JsString, Value)>,
    pub(crate) kind: ObjectKind,
}

#[derive(Debug)]
pub(crate) enum ObjectKind {
    Ordinary,
    Array(Vec<Value>),
    Error,
    Function(FunctionKind),
    Promise(PromiseHeapData),
    ModuleNamespace(ModuleNamespaceData),
}

impl Index<Object> for Agent {
    type Output = ObjectHeapData;

    fn index(&self, index: Object) -> &Self::Output {
        &self.heap[index]
    }
}

impl IndexMut<Object> for Agent {
    fn index_mut(&mut self, index: Object) -> &mut Self::Output {
        &mut self.heap[index]
    }
}

impl Index<Object> for Heap {
    type Output = ObjectHeapData;

    fn index(&self, index: Object) -> &Self::Output {
        self.objects
            .get(index.0 as usize)
            .expect("Object out of bounds")
    }
}

impl IndexMut<Object> for Heap {
    fn index_mut(&mut self, index: Object) -> &mut Self::Output {
        self.objects
            .get_mut(index.0 as usize)
            .expect("Object out of bounds")
    }
}

impl Heap {
    pub(crate) fn create_object(&mut self, prototype: Option<Object>, kind: ObjectKind) -> Object {
        let index = u32::try_from(self.objects.len()).expect("Object heap overflow");
        self.objects.push(ObjectHeapData {
            prototype,
            extensible: true,
            properties: Vec::new(),
            kind,
        });
        Object(index)
    }
}

/// Parses a canonical array index ("0", "1", ... but not "01").
pub(crate) fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse::<u32>().ok().map(|index| index as usize)
}

impl Object {
    pub(crate) fn create(agent: &mut Agent, prototype: Option<Object>, kind: ObjectKind) -> Self {
        agent.heap.create_object(prototype, kind)
    }

    /// ### [10.1.12 OrdinaryObjectCreate ( proto )](https://tc39.es/ecma262/#sec-ordinaryobjectcreate)
    pub fn create_ordinary(agent: &mut Agent) -> Self {
        let prototype = agent.realm.intrinsics.object_prototype;
        Self::create(agent, Some(prototype), ObjectKind::Ordinary)
    }

    /// ### [10.4.2.2 ArrayCreate ( length \[ , proto \] )](https://tc39.es/ecma262/#sec-arraycreate)
    pub fn create_array(agent: &mut Agent, elements: Vec<Value>) -> Self {
        let prototype = agent.realm.intrinsics.array_prototype;
        Self::create(agent, Some(prototype), ObjectKind::Array(elements))
    }

    pub fn prototype(self, agent: &Agent) -> Option<Object> {
        agent[self].prototype
    }

    pub fn is_callable(self, agent: &Agent) -> bool {
        matches!(agent[self].kind, ObjectKind::Function(_))
    }

    pub(crate) fn get_own(self, agent: &Agent, key: &str) -> Option<Value> {
        agent[self]
            .properties
            .iter()
            .find(|(k, _)| &**k == key)
            .map(|(_, value)| value.clone())
    }

    /// Defines or overwrites an own data property without any checks.
    pub(crate) fn define_own(self, heap: &mut Heap, key: &str, value: Value) {
        let data = &mut heap[self];
        if let Some(entry) = data.properties.iter_mut().find(|(k, _)| &**k == key) {
            entry.1 = value;
        } else {
            data.properties.push((key.into(), value));
        }
    }

    /// ### [7.3.2 Get ( O, P )](https://tc39.es/ecma262/#sec-get-o-p)
    pub fn get(self, agent: &mut Agent, key: &str) -> JsResult<Value> {
        let mut current = Some(self);
        while let Some(object) = current {
            match &agent[object].kind {
                ObjectKind::ModuleNamespace(data) => {
                    let data = data.clone();
                    return namespace_get(agent, &data, key);
                }
                ObjectKind::Array(elements) => {
                    if key == "length" {
                        return Ok(Value::Number(elements.len() as f64));
                    }
                    if let Some(index) = array_index(key) {
                        if let Some(element) = elements.get(index) {
                            return Ok(element.clone());
                        }
                    }
                }
                _ => {}
            }
            if let Some(value) = object.get_own(agent, key) {
                return Ok(value);
            }
            current = agent[object].prototype;
        }
        Ok(Value::Undefined)
    }

    /// ### [7.3.4 Set ( O, P, V, Throw )](https://tc39.es/ecma262/#sec-set-o-p-v-throw)
    ///
    /// Module code is always strict, so failed assignments throw.
    pub fn set(self, agent: &mut Agent, key: &str, value: Value) -> JsResult<()> {
        match &agent[self].kind {
            ObjectKind::ModuleNamespace(_) => {
                return Err(agent.throw_exception(
                    ExceptionType::TypeError,
                    format!("Cannot assign to read only property '{key}' of object '[object Module]'"),
                ));
            }
            ObjectKind::Array(_) if key == "length" => {
                let length = value.to_number(agent)?;
                if length < 0.0 || length.fract() != 0.0 || length > f64::from(u32::MAX) {
                    return Err(agent.throw_exception(ExceptionType::RangeError, "Invalid array length"));
                }
                if let ObjectKind::Array(elements) = &mut agent[self].kind {
                    elements.resize(length as usize, Value::Undefined);
                }
                return Ok(());
            }
            ObjectKind::Array(_) => {
                if let Some(index) = array_index(key) {
                    if let ObjectKind::Array(elements) = &mut agent[self].kind {
                        if index >= elements.len() {
                            elements.resize(index + 1, Value::Undefined);
                        }
                        elements[index] = value;
                    }
                    return Ok(());
                }
            }
            _ => {}
        }
        let data = &agent[self];
        if !data.extensible && !data.properties.iter().any(|(k, _)| &**k == key) {
            return Err(agent.throw_exception(
                ExceptionType::TypeError,
                format!("Cannot add property {key}, object is not extensible"),
            ));
        }
        self.define_own(&mut agent.heap, key, value);
        Ok(())
    }

    /// ### [7.3.12 HasProperty ( O, P )](https://tc39.es/ecma262/#sec-hasproperty)
    pub fn has_property(self, agent: &Agent, key: &str) -> bool {
        let mut current = Some(self);
        while let Some(object) = current {
            match &agent[object].kind {
                ObjectKind::ModuleNamespace(data) => {
                    return data.exports.iter().any(|name| &**name == key);
                }
                ObjectKind::Array(elements) => {
                    if key == "length" || array_index(key).is_some_and(|i| i < elements.len()) {
                        return true;
                    }
                }
                _ => {}
            }
            if agent[object].properties.iter().any(|(k, _)| &**k == key) {
                return true;
            }
            current = agent[object].prototype;
        }
        false
    }

    /// ### [7.3.23 EnumerableOwnProperties ( O, kind )](https://tc39.es/ecma262/#sec-enumerableownproperties)
    ///
    /// With kind key.
    pub fn own_property_keys(self, agent: &Agent) -> Vec<JsString> {
        let data = &agent[self];
        let mut keys = match &data.kind {
            ObjectKind::ModuleNamespace(namespace) => return namespace.exports.to_vec(),
            ObjectKind::Array(elements) => (0..elements.len())
                .map(|index| JsString::from(index.to_string()))
                .collect(),
            _ => Vec::new(),
        };
        keys.extend(data.properties.iter().map(|(key, _)| key.clone()));
        keys
    }

    /// ### [7.3.20 OrdinaryHasInstance ( C, O )](https://tc39.es/ecma262/#sec-ordinaryhasinstance)
    pub(crate) fn ordinary_has_instance(self, agent: &mut Agent, value: &Value) -> JsResult<bool> {
        let Some(object) = value.as_object() else {
            return Ok(false);
        };
        let Value::Object(prototype) = self.get(agent, "prototype")? else {
            return Err(agent.throw_exception(
                ExceptionType::TypeError,
                "Function has non-object prototype in instanceof check",
            ));
        };
        let mut current = agent[object].prototype;
        while let Some(candidate) = current {
            if candidate == prototype {
                return Ok(true);
            }
            current = agent[candidate].prototype;
        }
        Ok(false)
    }
}
