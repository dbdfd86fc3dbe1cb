//! Values the template language works with.
//!
//! Literals in the template, variables in the context and the results of
//! expressions are all values. Operators work across types where it makes sense,
//! e.g. `"ab" * 2` or `[1, 2] + 3`, and produce `null` where it doesn't.
use super::Error;
use crate::escape_html;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A constant value, e.g. `5` or `"hello world"`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    List(Vec<Value>),
    /// Ordered by key, so iteration is stable.
    Hash(BTreeMap<String, Value>),
    Null,
    /// Global scope, functions like `default(a, b)` are called on it.
    Interpreter,
}

/// Largest string or list a template can build by repetition.
pub const MAX_REPEAT: usize = 16 * 1024 * 1024;

// How many times `len` items can be repeated, for `n` requested.
fn repeat(len: usize, n: i64) -> Result<usize, Error> {
    let times = usize::try_from(n.max(0)).unwrap_or(usize::MAX);

    if len == 0 {
        return Ok(0);
    }

    match len.checked_mul(times) {
        Some(total) if total <= MAX_REPEAT => Ok(times),
        _ => Err(Error::Runtime(format!(
            "repeating {} items {} times is more than the limit of {}",
            len, n, MAX_REPEAT
        ))),
    }
}

// Both sides as floats, if both are numbers.
fn floats(left: &Value, right: &Value) -> Option<(f64, f64)> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Some((*a as f64, *b as f64)),
        (Value::Integer(a), Value::Float(b)) => Some((*a as f64, *b)),
        (Value::Float(a), Value::Integer(b)) => Some((*a, *b as f64)),
        (Value::Float(a), Value::Float(b)) => Some((*a, *b)),
        _ => None,
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.partial_cmp(b),
            (left, right) => floats(left, right).and_then(|(a, b)| a.partial_cmp(&b)),
        }
    }
}

fn write_joined<T>(
    f: &mut Formatter,
    items: impl Iterator<Item = T>,
    item: impl Fn(&mut Formatter, T) -> FmtResult,
) -> FmtResult {
    for (i, value) in items.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        item(f, value)?;
    }

    Ok(())
}

/// What gets printed into the template. `null` prints nothing.
impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::List(list) => {
                write!(f, "[")?;
                write_joined(f, list.iter(), |f, v| write!(f, "{}", v))?;
                write!(f, "]")
            }
            Value::Hash(hash) => {
                write!(f, "{{")?;
                write_joined(f, hash.iter(), |f, (k, v)| write!(f, "{}: {}", k, v))?;
                write!(f, "}}")
            }
            Value::Null => Ok(()),
            Value::Interpreter => write!(f, "global"),
        }
    }
}

impl Value {
    /// Would an `<% if %>` on this value render its body.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(list) => !list.is_empty(),
            Value::Hash(hash) => !hash.is_empty(),
            Value::Null => false,
            Value::Interpreter => true,
        }
    }

    /// Name of the value type, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::List(_) => "list",
            Value::Hash(_) => "hash",
            Value::Null => "null",
            Value::Interpreter => "global",
        }
    }

    // Integers stay integers, anything mixed with a float becomes a float.
    fn arithmetic(
        &self,
        other: &Self,
        integer: impl Fn(i64, i64) -> i64,
        float: impl Fn(f64, f64) -> f64,
    ) -> Option<Self> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(Value::Integer(integer(*a, *b))),
            (left, right) => floats(left, right).map(|(a, b)| Value::Float(float(a, b))),
        }
    }

    /// `+`: sums numbers, concatenates strings, pushes onto lists.
    pub fn add(&self, other: &Self) -> Self {
        if let Some(sum) = self.arithmetic(other, i64::wrapping_add, |a, b| a + b) {
            return sum;
        }

        match (self, other) {
            (Value::List(list), value) => {
                let mut list = list.clone();
                list.push(value.clone());
                Value::List(list)
            }
            (value, Value::List(list)) => {
                Value::List(std::iter::once(value.clone()).chain(list.iter().cloned()).collect())
            }
            (
                left @ (Value::String(_) | Value::Integer(_) | Value::Float(_)),
                right @ (Value::String(_) | Value::Integer(_) | Value::Float(_)),
            ) => Value::String(format!("{}{}", left, right)),
            _ => Value::Null,
        }
    }

    /// `-`: subtracts numbers, removes substrings and list elements.
    pub fn sub(&self, other: &Self) -> Self {
        if let Some(difference) = self.arithmetic(other, i64::wrapping_sub, |a, b| a - b) {
            return difference;
        }

        match (self, other) {
            (Value::String(s), Value::String(remove)) => Value::String(s.replace(remove.as_str(), "")),
            (Value::List(list), value) => {
                Value::List(list.iter().filter(|v| *v != value).cloned().collect())
            }
            _ => Value::Null,
        }
    }

    /// `*`: multiplies numbers, repeats strings and lists.
    pub fn mul(&self, other: &Self) -> Result<Self, Error> {
        if let Some(product) = self.arithmetic(other, i64::wrapping_mul, |a, b| a * b) {
            return Ok(product);
        }

        Ok(match (self, other) {
            (Value::String(s), Value::Integer(n)) | (Value::Integer(n), Value::String(s)) => {
                Value::String(s.repeat(repeat(s.len(), *n)?))
            }
            (Value::List(list), Value::Integer(n)) => {
                let times = repeat(list.len(), *n)?;
                Value::List(
                    std::iter::repeat(list)
                        .take(times)
                        .flat_map(|list| list.iter().cloned())
                        .collect(),
                )
            }
            _ => Value::Null,
        })
    }

    pub fn div(&self, other: &Self) -> Result<Self, Error> {
        Self::nonzero(other)?;
        Ok(self
            .arithmetic(other, i64::wrapping_div, |a, b| a / b)
            .unwrap_or(Value::Null))
    }

    pub fn rem(&self, other: &Self) -> Result<Self, Error> {
        Self::nonzero(other)?;
        Ok(self
            .arithmetic(other, i64::wrapping_rem, |a, b| a % b)
            .unwrap_or(Value::Null))
    }

    // Integer division by zero has no result. Floats follow IEEE.
    fn nonzero(divisor: &Self) -> Result<(), Error> {
        match divisor {
            Value::Integer(0) => Err(Error::Runtime("division by zero".into())),
            _ => Ok(()),
        }
    }

    /// Call a method on the value, e.g. `"hello".upcase`, or a global
    /// function, e.g. `default(name, "guest")`.
    ///
    /// Attribute access goes through here too: `user.name` calls `name` on the hash
    /// and `list.0` calls `0` on the list.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Self, Error> {
        let result = match self {
            Value::Integer(value) => integer_method(*value, method)?,
            Value::Float(value) => float_method(*value, method),
            Value::String(value) => string_method(value, method, args)?,
            Value::List(list) => list_method(list, method, args),
            Value::Hash(hash) => Some(hash_method(hash, method)),
            Value::Interpreter => global_function(method, args)?,
            Value::Null => match method {
                "empty" | "empty?" => Some(Value::Boolean(true)),
                _ => None,
            },
            Value::Boolean(_) => None,
        };

        result.ok_or_else(|| Error::UnknownMethod(method.into(), self.kind()))
    }

    /// Recursively flatten nested lists into one list.
    pub fn flatten(self) -> Vec<Value> {
        match self {
            Value::List(list) => list.into_iter().flat_map(|v| v.flatten()).collect(),
            value => vec![value],
        }
    }
}

fn integer_method(value: i64, method: &str) -> Result<Option<Value>, Error> {
    Ok(Some(match method {
        "abs" => Value::Integer(value.wrapping_abs()),
        "to_string" | "to_s" => Value::String(value.to_string()),
        "to_f" | "to_float" => Value::Float(value as f64),
        "times" => {
            repeat(1, value)?;
            Value::List((0..value).map(Value::Integer).collect())
        }
        "even?" => Value::Boolean(value % 2 == 0),
        "odd?" => Value::Boolean(value % 2 != 0),
        _ => return Ok(None),
    }))
}

fn float_method(value: f64, method: &str) -> Option<Value> {
    Some(match method {
        "abs" => Value::Float(value.abs()),
        "ceil" => Value::Float(value.ceil()),
        "floor" => Value::Float(value.floor()),
        "round" => Value::Float(value.round()),
        "to_string" | "to_s" => Value::String(value.to_string()),
        "to_i" | "to_integer" => Value::Integer(value as i64),
        _ => return None,
    })
}

fn strings<'a>(parts: impl Iterator<Item = &'a str>) -> Value {
    Value::List(parts.map(|part| Value::String(part.to_string())).collect())
}

fn string_method(value: &str, method: &str, args: &[Value]) -> Result<Option<Value>, Error> {
    Ok(Some(match method {
        "to_uppercase" | "upcase" => Value::String(value.to_uppercase()),
        "to_lowercase" | "downcase" => Value::String(value.to_lowercase()),
        "trim" => Value::String(value.trim().to_string()),
        "capitalize" => Value::String(crate::capitalize(value)),
        "camelize" | "to_PascalCase" => Value::String(crate::pascal_case(value)),
        "underscore" | "to_snake_case" => Value::String(crate::snake_case(value)),
        "escape" => Value::String(escape_html(value)),
        "len" | "length" => Value::Integer(value.chars().count() as i64),
        "empty?" | "empty" => Value::Boolean(value.is_empty()),
        "sub" | "replace" => match args {
            [from, to] => Value::String(value.replace(&from.to_string(), &to.to_string())),
            _ => return Err(Error::Runtime(format!("{} expects 2 arguments", method))),
        },
        "split" => match args {
            [separator] => strings(value.split(separator.to_string().as_str())),
            _ => strings(value.split_whitespace()),
        },
        _ => return Ok(None),
    }))
}

fn list_method(list: &[Value], method: &str, args: &[Value]) -> Option<Value> {
    if let Ok(index) = method.parse::<usize>() {
        return Some(list.get(index).cloned().unwrap_or(Value::Null));
    }

    Some(match method {
        "enumerate" => Value::List(
            list.iter()
                .enumerate()
                .map(|(i, v)| Value::List(vec![Value::Integer(i as i64), v.clone()]))
                .collect(),
        ),
        "flatten" => Value::List(Value::List(list.to_vec()).flatten()),
        "reverse" | "rev" => Value::List(list.iter().rev().cloned().collect()),
        "contains" | "include?" => Value::Boolean(match args {
            [needle] => list.contains(needle),
            _ => false,
        }),
        "join" => {
            let separator = args.first().map(|s| s.to_string()).unwrap_or_default();
            Value::String(
                list.iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(&separator),
            )
        }
        "first" => list.first().cloned().unwrap_or(Value::Null),
        "last" => list.last().cloned().unwrap_or(Value::Null),
        "empty" | "empty?" => Value::Boolean(list.is_empty()),
        "len" | "length" => Value::Integer(list.len() as i64),
        _ => return None,
    })
}

// Any other name is a key lookup, missing keys are null.
fn hash_method(hash: &BTreeMap<String, Value>, method: &str) -> Value {
    match method {
        "keys" => Value::List(hash.keys().cloned().map(Value::String).collect()),
        "values" => Value::List(hash.values().cloned().collect()),
        "iter" => Value::List(
            hash.iter()
                .map(|(k, v)| Value::List(vec![Value::String(k.clone()), v.clone()]))
                .collect(),
        ),
        key => hash.get(key).cloned().unwrap_or(Value::Null),
    }
}

fn global_function(name: &str, args: &[Value]) -> Result<Option<Value>, Error> {
    let arity = |expected: usize| {
        Error::Runtime(format!(
            "{} expects {} argument{}, got {}",
            name,
            expected,
            if expected == 1 { "" } else { "s" },
            args.len()
        ))
    };

    Ok(Some(match name {
        "default" => match args {
            [Value::Null, fallback] => fallback.clone(),
            [value, _] => value.clone(),
            _ => return Err(arity(2)),
        },
        "escape" => match args {
            [value] => Value::String(escape_html(&value.to_string())),
            _ => return Err(arity(1)),
        },
        "json" => match args {
            [value] => {
                let json: serde_json::Value = value.clone().try_into()?;
                Value::String(json.to_string())
            }
            _ => return Err(arity(1)),
        },
        _ => return Ok(None),
    }))
}

/// Convert a Rust value into a template value, so it can be set in a `Context`.
pub trait ToTemplateValue {
    fn to_template_value(&self) -> Result<Value, Error>;
}

macro_rules! impl_template_value {
    ($variant:ident, $as:ty, $($ty:ty),+) => {
        $(
            impl ToTemplateValue for $ty {
                fn to_template_value(&self) -> Result<Value, Error> {
                    Ok(Value::$variant(*self as $as))
                }
            }
        )+
    };
}

// u64 and usize wrap above i64::MAX.
impl_template_value!(Integer, i64, i64, i32, i16, i8, u64, u32, u16, u8, usize);
impl_template_value!(Float, f64, f64, f32);
impl_template_value!(Boolean, bool, bool);

impl ToTemplateValue for String {
    fn to_template_value(&self) -> Result<Value, Error> {
        Ok(Value::String(self.clone()))
    }
}

impl ToTemplateValue for &str {
    fn to_template_value(&self) -> Result<Value, Error> {
        Ok(Value::String(self.to_string()))
    }
}

impl ToTemplateValue for Value {
    fn to_template_value(&self) -> Result<Value, Error> {
        Ok(self.clone())
    }
}

/// Timestamps are printed in RFC 2822 format.
impl ToTemplateValue for time::OffsetDateTime {
    fn to_template_value(&self) -> Result<Value, Error> {
        let fmt = time::format_description::well_known::Rfc2822;
        Ok(Value::String(self.format(&fmt)?))
    }
}

impl<T: ToTemplateValue> ToTemplateValue for Option<T> {
    fn to_template_value(&self) -> Result<Value, Error> {
        match self {
            Some(value) => value.to_template_value(),
            None => Ok(Value::Null),
        }
    }
}

impl<T: ToTemplateValue> ToTemplateValue for [T] {
    fn to_template_value(&self) -> Result<Value, Error> {
        self.iter()
            .map(|value| value.to_template_value())
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List)
    }
}

impl<T: ToTemplateValue> ToTemplateValue for &[T] {
    fn to_template_value(&self) -> Result<Value, Error> {
        (**self).to_template_value()
    }
}

impl<T: ToTemplateValue> ToTemplateValue for Vec<T> {
    fn to_template_value(&self) -> Result<Value, Error> {
        self.as_slice().to_template_value()
    }
}

fn hash<'a, T: ToTemplateValue + 'a>(
    entries: impl Iterator<Item = (&'a String, &'a T)>,
) -> Result<Value, Error> {
    entries
        .map(|(key, value)| Ok((key.clone(), value.to_template_value()?)))
        .collect::<Result<BTreeMap<_, _>, Error>>()
        .map(Value::Hash)
}

impl<T: ToTemplateValue> ToTemplateValue for HashMap<String, T> {
    fn to_template_value(&self) -> Result<Value, Error> {
        hash(self.iter())
    }
}

impl<T: ToTemplateValue> ToTemplateValue for BTreeMap<String, T> {
    fn to_template_value(&self) -> Result<Value, Error> {
        hash(self.iter())
    }
}

impl ToTemplateValue for serde_json::Value {
    fn to_template_value(&self) -> Result<Value, Error> {
        use serde_json::Value as Json;

        Ok(match self {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Boolean(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::String(s.clone()),
            Json::Array(list) => list.to_template_value()?,
            Json::Object(map) => {
                let mut hash = BTreeMap::new();
                for (key, value) in map {
                    hash.insert(key.clone(), value.to_template_value()?);
                }
                Value::Hash(hash)
            }
        })
    }
}

/// Used by the `json` function. NaN and infinite floats have no JSON form.
impl TryInto<serde_json::Value> for Value {
    type Error = Error;

    fn try_into(self) -> Result<serde_json::Value, Self::Error> {
        use serde_json::{Map, Number, Value as Json};

        Ok(match self {
            Value::Integer(i) => Json::Number(i.into()),
            Value::Float(f) => Json::Number(Number::from_f64(f).ok_or(Error::SerializationError)?),
            Value::String(s) => Json::String(s),
            Value::Boolean(b) => Json::Bool(b),
            Value::List(list) => Json::Array(
                list.into_iter()
                    .map(|v| v.try_into())
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Value::Hash(hash) => {
                let mut map = Map::new();
                for (key, value) in hash {
                    map.insert(key, value.try_into()?);
                }
                Json::Object(map)
            }
            Value::Null | Value::Interpreter => Json::Null,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(
            Value::List(vec![Value::Integer(1), Value::String("two".into())]).to_string(),
            "[1, two]"
        );
        assert_eq!(
            Value::Hash(BTreeMap::from([
                ("b".to_string(), Value::Boolean(true)),
                ("a".to_string(), Value::Float(0.5)),
            ]))
            .to_string(),
            "{a: 0.5, b: true}"
        );
    }

    #[test]
    fn test_arithmetic() -> Result<(), Error> {
        assert_eq!(Value::Integer(2).add(&Value::Float(0.5)), Value::Float(2.5));
        assert_eq!(
            Value::String("v".into()).add(&Value::Integer(2)),
            Value::String("v2".into())
        );
        assert_eq!(
            Value::Integer(0).add(&Value::List(vec![Value::Integer(1)])),
            Value::List(vec![Value::Integer(0), Value::Integer(1)])
        );
        assert_eq!(
            Value::List(vec![Value::Integer(1), Value::Integer(2), Value::Integer(1)])
                .sub(&Value::Integer(1)),
            Value::List(vec![Value::Integer(2)])
        );
        assert_eq!(Value::String("ab".into()).mul(&Value::Integer(-1))?, Value::String("".into()));
        assert_eq!(
            Value::List(vec![Value::Integer(1)]).mul(&Value::Integer(3))?,
            Value::List(vec![Value::Integer(1); 3])
        );
        assert_eq!(Value::Boolean(true).add(&Value::Integer(1)), Value::Null);
        assert_eq!(Value::Integer(7).div(&Value::Integer(2))?, Value::Integer(3));
        assert_eq!(Value::Float(1.0).div(&Value::Integer(4))?, Value::Float(0.25));

        Ok(())
    }

    #[test]
    fn test_repeat_limit() -> Result<(), Error> {
        let huge = Value::Integer(i64::MAX);

        assert!(matches!(Value::String("ab".into()).mul(&huge), Err(Error::Runtime(_))));
        assert!(matches!(huge.mul(&Value::String("ab".into())), Err(Error::Runtime(_))));
        assert!(matches!(
            Value::List(vec![Value::Null]).mul(&huge),
            Err(Error::Runtime(_))
        ));
        assert!(matches!(huge.call("times", &[]), Err(Error::Runtime(_))));

        assert_eq!(Value::String("".into()).mul(&huge)?, Value::String("".into()));
        assert_eq!(Value::List(vec![]).mul(&huge)?, Value::List(vec![]));
        assert_eq!(
            Value::Integer(3).call("times", &[])?,
            Value::List(vec![Value::Integer(0), Value::Integer(1), Value::Integer(2)])
        );

        Ok(())
    }

    #[test]
    fn test_division_by_zero() -> Result<(), Error> {
        assert!(Value::Integer(1).div(&Value::Integer(0)).is_err());
        assert!(Value::Float(1.0).rem(&Value::Integer(0)).is_err());
        assert_eq!(Value::Integer(7).rem(&Value::Integer(4))?, Value::Integer(3));

        Ok(())
    }

    #[test]
    fn test_unknown_method() {
        assert!(matches!(
            Value::Boolean(true).call("upcase", &[]),
            Err(Error::UnknownMethod(method, "boolean")) if method == "upcase"
        ));
        assert!(matches!(
            Value::Interpreter.call("missing", &[]),
            Err(Error::UnknownMethod(_, "global"))
        ));
        assert!(matches!(
            Value::Interpreter.call("default", &[Value::Null]),
            Err(Error::Runtime(_))
        ));
    }

    #[test]
    fn test_json_conversion() -> Result<(), Error> {
        let json = serde_json::json!({"name": "Al", "tags": [1, 2.5, null], "admin": false});
        let value = json.to_template_value()?;

        assert_eq!(value.call("name", &[])?, Value::String("Al".into()));
        assert_eq!(
            value.call("tags", &[])?,
            Value::List(vec![Value::Integer(1), Value::Float(2.5), Value::Null])
        );

        let back: serde_json::Value = value.try_into()?;
        assert_eq!(back, json);

        let nan: Result<serde_json::Value, _> = Value::Float(f64::NAN).try_into();
        assert!(matches!(nan, Err(Error::SerializationError)));

        Ok(())
    }

    #[test]
    fn test_flatten() {
        let nested = Value::List(vec![
            Value::List(vec![Value::Integer(1), Value::Integer(2)]),
            Value::List(vec![Value::Integer(3), Value::List(vec![Value::Integer(4)])]),
        ]);

        assert_eq!(
            nested.flatten(),
            vec![
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(3),
                Value::Integer(4)
            ]
        );
    }
}
