// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use crate::ecmascript::execution::{Agent, JsResult};

use super::{Object, ObjectKind, object::array_index};

/// Immutable, reference counted string data.
pub type JsString = Rc<str>;

/// ### [6.1 ECMAScript Language Types](https://tc39.es/ecma262/#sec-ecmascript-language-types)
///
/// Symbols and BigInts are not part of the supported language subset.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// ### [6.1.1 The Undefined Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-undefined-type)
    #[default]
    Undefined,
    /// ### [6.1.2 The Null Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-null-type)
    Null,
    /// ### [6.1.3 The Boolean Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-boolean-type)
    Boolean(bool),
    /// ### [6.1.6.1 The Number Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-number-type)
    Number(f64),
    /// ### [6.1.4 The String Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-string-type)
    String(JsString),
    /// ### [6.1.7 The Object Type](https://tc39.es/ecma262/#sec-object-type)
    Object(Object),
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_object(&self) -> Option<Object> {
        match self {
            Value::Object(object) => Some(*object),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(string) => Some(string),
            _ => None,
        }
    }

    pub fn is_callable(&self, agent: &Agent) -> bool {
        self.as_object().is_some_and(|object| object.is_callable(agent))
    }

    /// ### [7.1.2 ToBoolean ( argument )](https://tc39.es/ecma262/#sec-toboolean)
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(value) => *value,
            Value::Number(value) => !(*value == 0.0 || value.is_nan()),
            Value::String(value) => !value.is_empty(),
            Value::Object(_) => true,
        }
    }

    /// ### [7.1.4 ToNumber ( argument )](https://tc39.es/ecma262/#sec-tonumber)
    pub fn to_number(&self, agent: &mut Agent) -> JsResult<f64> {
        Ok(match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(value) => f64::from(u8::from(*value)),
            Value::Number(value) => *value,
            Value::String(value) => string_to_number(value),
            Value::Object(_) => {
                let primitive = self.to_string(agent)?;
                string_to_number(&primitive)
            }
        })
    }

    /// ### [7.1.17 ToString ( argument )](https://tc39.es/ecma262/#sec-tostring)
    pub fn to_string(&self, agent: &mut Agent) -> JsResult<JsString> {
        Ok(match self {
            Value::Undefined => "undefined".into(),
            Value::Null => "null".into(),
            Value::Boolean(true) => "true".into(),
            Value::Boolean(false) => "false".into(),
            Value::Number(value) => number_to_string(*value),
            Value::String(value) => value.clone(),
            Value::Object(object) => object_to_string(agent, *object)?,
        })
    }

    /// Converts the value into a string for host-side reporting. Exceptions
    /// thrown during the conversion are swallowed.
    pub fn string_repr(&self, agent: &mut Agent) -> JsString {
        match self {
            Value::String(value) => format!("{value:?}").into(),
            _ => self
                .to_string(agent)
                .unwrap_or_else(|_| "<exception during conversion>".into()),
        }
    }

    /// ### [13.5.3 The typeof Operator](https://tc39.es/ecma262/#sec-typeof-operator)
    pub fn type_of(&self, agent: &Agent) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(object) if object.is_callable(agent) => "function",
            Value::Object(_) => "object",
        }
    }

    /// ### [7.2.15 IsStrictlyEqual ( x, y )](https://tc39.es/ecma262/#sec-isstrictlyequal)
    pub fn is_strictly_equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }

    /// ### [7.2.14 IsLooselyEqual ( x, y )](https://tc39.es/ecma262/#sec-islooselyequal)
    pub fn is_loosely_equal(&self, agent: &mut Agent, other: &Value) -> JsResult<bool> {
        Ok(match (self, other) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
            (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
                *n == string_to_number(s)
            }
            (Value::Boolean(b), other) | (other, Value::Boolean(b)) => {
                return Value::Number(f64::from(u8::from(*b))).is_loosely_equal(agent, other);
            }
            (Value::Object(_), Value::Number(_) | Value::String(_)) => {
                let primitive = Value::String(self.to_string(agent)?);
                return primitive.is_loosely_equal(agent, other);
            }
            (Value::Number(_) | Value::String(_), Value::Object(_)) => {
                let primitive = Value::String(other.to_string(agent)?);
                return self.is_loosely_equal(agent, &primitive);
            }
            _ => self.is_strictly_equal(other),
        })
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value.into())
    }
}

impl From<JsString> for Value {
    fn from(value: JsString) -> Self {
        Value::String(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}

/// ### [6.1.6.1.20 Number::toString ( x, radix )](https://tc39.es/ecma262/#sec-numeric-types-number-tostring)
pub(crate) fn number_to_string(value: f64) -> JsString {
    let mut buffer = ryu_js::Buffer::new();
    buffer.format(value).into()
}

/// ### [7.1.4.1.1 StringToNumber ( str )](https://tc39.es/ecma262/#sec-stringtonumber)
pub(crate) fn string_to_number(value: &str) -> f64 {
    let trimmed = value.trim();
    match trimmed {
        "" => return 0.0,
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |value| value as f64);
    }
    // Rust accepts "inf" and "nan" spellings that StringNumericLiteral does not.
    if trimmed
        .chars()
        .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

fn object_to_string(agent: &mut Agent, object: Object) -> JsResult<JsString> {
    match &agent[object].kind {
        ObjectKind::Array(elements) => {
            let elements = elements.clone();
            let mut result = String::new();
            for (index, element) in elements.iter().enumerate() {
                if index > 0 {
                    result.push(',');
                }
                if !element.is_nullish() {
                    result.push_str(&element.to_string(agent)?);
                }
            }
            Ok(result.into())
        }
        ObjectKind::Error => {
            let name = object.get(agent, "name")?;
            let name = if name.is_undefined() {
                "Error".into()
            } else {
                name.to_string(agent)?
            };
            let message = object.get(agent, "message")?;
            let message = if message.is_undefined() {
                "".into()
            } else {
                message.to_string(agent)?
            };
            Ok(match (name.is_empty(), message.is_empty()) {
                (_, true) => name,
                (true, false) => message,
                (false, false) => format!("{name}: {message}").into(),
            })
        }
        ObjectKind::Function(_) => {
            let name = object.get(agent, "name")?.to_string(agent)?;
            Ok(format!("function {name}() {{ [native code] }}").into())
        }
        ObjectKind::ModuleNamespace(_) => Ok("[object Module]".into()),
        ObjectKind::Promise(_) => Ok("[object Promise]".into()),
        ObjectKind::Ordinary => Ok("[object Object]".into()),
    }
}

/// ### [7.1.19 ToPropertyKey ( argument )](https://tc39.es/ecma262/#sec-topropertykey)
pub(crate) fn to_property_key(agent: &mut Agent, value: &Value) -> JsResult<JsString> {
    value.to_string(agent)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn number_formatting() {
        assert_eq!(&*number_to_string(5.0), "5");
        assert_eq!(&*number_to_string(0.5), "0.5");
        assert_eq!(&*number_to_string(-0.0), "0");
        assert_eq!(&*number_to_string(f64::NAN), "NaN");
        assert_eq!(&*number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn string_to_number_rejects_rust_spellings() {
        assert_eq!(string_to_number("  42 "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x10"), 16.0);
        assert_eq!(string_to_number("1e3"), 1000.0);
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("NaN").is_nan());
        assert!(string_to_number("12px").is_nan());
    }

    #[test]
    fn array_index_is_canonical() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("17"), Some(17));
        assert_eq!(array_index("017"), None);
        assert_eq!(array_index("-1"), None);
        assert_eq!(array_index("length"), None);
    }

    #[test]
    fn to_boolean() {
        assert!(!Value::from(0.0).to_boolean());
        assert!(!Value::from(f64::NAN).to_boolean());
        assert!(!Value::from("").to_boolean());
        assert!(Value::from("0").to_boolean());
        assert!(!Value::Null.to_boolean());
    }
}
