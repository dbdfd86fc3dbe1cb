//! Unary and binary operators.
use super::super::lexer::{Token, Value};
use super::super::Error;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub enum Op {
    Not,
    And,
    Or,
    Add,
    Sub,
    Mult,
    Div,
    Mod,
    Equals,
    NotEquals,
    GreaterThan,
    GreaterEqualThan,
    LessThan,
    LessEqualThan,
}

impl Op {
    /// The operator the token stands for, if any.
    pub fn from_token(token: Token) -> Option<Self> {
        Some(match token {
            Token::Not => Op::Not,
            Token::And => Op::And,
            Token::Or => Op::Or,
            Token::Equals => Op::Equals,
            Token::NotEquals => Op::NotEquals,
            Token::GreaterThan => Op::GreaterThan,
            Token::GreaterEqualThan => Op::GreaterEqualThan,
            Token::LessThan => Op::LessThan,
            Token::LessEqualThan => Op::LessEqualThan,
            Token::Plus => Op::Add,
            Token::Minus => Op::Sub,
            Token::Mult => Op::Mult,
            Token::Div => Op::Div,
            Token::Mod => Op::Mod,
            _ => return None,
        })
    }

    pub fn binary(&self) -> bool {
        *self != Op::Not
    }

    pub fn evaluate_unary(&self, value: &Value) -> Result<Value, Error> {
        match (self, value) {
            (Op::Not, value) => Ok(Value::Boolean(!value.truthy())),
            (Op::Add, value) => Ok(value.clone()),
            (Op::Sub, Value::Integer(integer)) => Ok(Value::Integer(integer.wrapping_neg())),
            (Op::Sub, Value::Float(float)) => Ok(Value::Float(-float)),
            (Op::Sub, value) => Err(Error::Runtime(format!("cannot negate {}", value.kind()))),
            (op, _) => Err(Error::Runtime(format!("{:?} is not a unary operator", op))),
        }
    }

    pub fn evaluate_binary(&self, left: &Value, right: &Value) -> Result<Value, Error> {
        // Values that can't be ordered are never less or greater than each other.
        let ordered = |accept: fn(Ordering) -> bool| {
            Value::Boolean(left.partial_cmp(right).map(accept).unwrap_or(false))
        };

        Ok(match self {
            Op::Equals => Value::Boolean(left == right),
            Op::NotEquals => Value::Boolean(left != right),
            Op::LessThan => ordered(Ordering::is_lt),
            Op::LessEqualThan => ordered(Ordering::is_le),
            Op::GreaterThan => ordered(Ordering::is_gt),
            Op::GreaterEqualThan => ordered(Ordering::is_ge),
            Op::And => Value::Boolean(left.truthy() && right.truthy()),
            Op::Or => Value::Boolean(left.truthy() || right.truthy()),
            Op::Add => left.add(right),
            Op::Sub => left.sub(right),
            Op::Mult => left.mul(right)?,
            Op::Div => left.div(right)?,
            Op::Mod => left.rem(right)?,
            Op::Not => return Err(Error::Runtime("! is not a binary operator".into())),
        })
    }

    /// Operator precedence, as in C. Lower binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            Op::Not => 2,
            Op::Mult | Op::Div | Op::Mod => 3,
            Op::Add | Op::Sub => 4,
            Op::GreaterThan | Op::GreaterEqualThan | Op::LessThan | Op::LessEqualThan => 6,
            Op::Equals | Op::NotEquals => 7,
            Op::And => 11,
            Op::Or => 12,
        }
    }
}
