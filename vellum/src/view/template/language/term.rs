//! Leaf of an expression: a literal or a variable.
use super::super::{lexer::Value, Context, Error};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Term {
    Constant(Value),
    Variable(String),
}

impl Term {
    pub fn constant(value: Value) -> Self {
        Term::Constant(value)
    }

    pub fn variable(name: String) -> Self {
        Term::Variable(name)
    }

    /// Variables are looked up in the context, undefined ones are an error.
    pub fn evaluate(&self, context: &Context) -> Result<Value, Error> {
        match self {
            Term::Constant(value) => Ok(value.clone()),
            Term::Variable(name) => context
                .get(name)
                .ok_or_else(|| Error::UndefinedVariable(name.clone())),
        }
    }
}
