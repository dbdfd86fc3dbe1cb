//! Variables available to a template while it's rendering.
use crate::view::template::{Error, ToTemplateValue, Value};
use std::collections::{BTreeMap, HashMap};
use std::ops::{Index, IndexMut};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Context {
    values: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    pub fn set(&mut self, key: &str, value: impl ToTemplateValue) -> Result<&mut Self, Error> {
        self.values.insert(key.to_string(), value.to_template_value()?);
        Ok(self)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<HashMap<String, Value>> for Context {
    fn from(values: HashMap<String, Value>) -> Context {
        Context { values }
    }
}

impl From<BTreeMap<String, Value>> for Context {
    fn from(values: BTreeMap<String, Value>) -> Context {
        Context {
            values: values.into_iter().collect(),
        }
    }
}

/// Build a context from a JSON object, e.g. one passed on the command line.
impl TryFrom<serde_json::Value> for Context {
    type Error = Error;

    fn try_from(json: serde_json::Value) -> Result<Context, Self::Error> {
        match json.to_template_value()? {
            Value::Hash(values) => Ok(Context::from(values)),
            Value::Null => Ok(Context::default()),
            value => Err(Error::Runtime(format!(
                "context must be an object, got {} instead",
                value.kind()
            ))),
        }
    }
}

macro_rules! impl_pairs {
    ($ty:ty) => {
        impl TryFrom<$ty> for Context {
            type Error = Error;

            fn try_from(values: $ty) -> Result<Context, Self::Error> {
                let mut context = Context::new();
                for (key, value) in values {
                    context.set(&key.to_string(), value)?;
                }

                Ok(context)
            }
        }
    };
}

impl_pairs!(HashMap<String, String>);
impl_pairs!(HashMap<&str, &str>);
impl_pairs!(Vec<(&str, &str)>);
impl_pairs!(Vec<(&str, String)>);
impl_pairs!(Vec<(&str, i64)>);
impl_pairs!(Vec<(&str, Value)>);
impl_pairs!([(&str, &str); 1]);
impl_pairs!([(&str, &str); 2]);
impl_pairs!([(&str, &str); 3]);
impl_pairs!([(&str, String); 1]);
impl_pairs!([(&str, String); 2]);
impl_pairs!([(&str, Value); 1]);
impl_pairs!([(&str, Value); 2]);
impl_pairs!([(&str, Value); 3]);

impl Index<&str> for Context {
    type Output = Value;

    fn index(&self, key: &str) -> &Self::Output {
        self.values.get(key).unwrap_or(&Value::Null)
    }
}

impl IndexMut<&str> for Context {
    fn index_mut(&mut self, key: &str) -> &mut Self::Output {
        self.values.entry(key.to_string()).or_insert(Value::Null)
    }
}
