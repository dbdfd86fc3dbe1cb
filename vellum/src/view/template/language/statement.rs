use super::{
    super::{Context, Error, Partials, Token, TokenWithContext, Value},
    Expression,
};
use crate::escape_html;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::iter::{Iterator, Peekable};

macro_rules! expect {
    ($got:expr, $expected:expr) => {
        if $got.token() != $expected {
            return Err(Error::WrongToken($got, $expected));
        }
    };
}

macro_rules! block_end {
    ($iter:expr) => {
        let next = $iter.next().ok_or(Error::Eof("code block"))?;
        expect!(next, Token::BlockEnd);
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    // e.g. `{{ variable }}` (escaped) or `{!! variable !!}` (raw)
    Print { expression: Expression, escape: bool },
    // e.g. `<html><body></body></html>`
    PrintText(String),
    // e.g. `<% if a %>a<% elsif b %>b<% else %>neither<% end %>`,
    // one branch per `if` and `elsif`, kept flat so long chains don't nest.
    If {
        branches: Vec<Branch>,
        else_body: Vec<Statement>,
    },
    // `<% for var in [1, 2, 3] %> {{ var }} <% else %>empty<% end %>`
    For {
        variable: String,
        list: Expression,
        body: Vec<Statement>,
        empty: Vec<Statement>,
    },
    // `<% include "partials.header" %>`
    Include(Expression),
}

/// A condition and the statements it guards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub condition: Expression,
    pub body: Vec<Statement>,
}

// Directives that close the block they're in.
enum Closing {
    ElseIf(TokenWithContext, Expression),
    Else(TokenWithContext),
    End(TokenWithContext),
}

impl Closing {
    fn token(self) -> TokenWithContext {
        match self {
            Closing::ElseIf(token, _) => token,
            Closing::Else(token) => token,
            Closing::End(token) => token,
        }
    }
}

enum Parsed {
    Statement(Statement),
    Closing(Closing),
}

impl Statement {
    pub fn evaluate(&self, context: &Context, partials: &dyn Partials) -> Result<String, Error> {
        match self {
            Statement::PrintText(text) => Ok(text.clone()),

            Statement::Print { expression, escape } => {
                let value = expression.evaluate(context)?.to_string();
                if *escape {
                    Ok(escape_html(&value))
                } else {
                    Ok(value)
                }
            }

            Statement::If {
                branches,
                else_body,
            } => {
                for branch in branches {
                    if branch.condition.evaluate(context)?.truthy() {
                        return Self::evaluate_all(&branch.body, context, partials);
                    }
                }

                Self::evaluate_all(else_body, context, partials)
            }

            Statement::For {
                variable,
                list,
                body,
                empty,
            } => {
                let values = match list.evaluate(context)? {
                    Value::List(values) => values,
                    Value::Hash(hash) => hash
                        .into_iter()
                        .map(|(key, value)| Value::List(vec![Value::String(key), value]))
                        .collect(),
                    value => {
                        return Err(Error::Runtime(format!(
                            "cannot iterate over {} \"{}\"",
                            value.kind(),
                            value
                        )))
                    }
                };

                if values.is_empty() {
                    return Self::evaluate_all(empty, context, partials);
                }

                let mut result = String::new();
                let mut for_context = context.clone();
                let count = values.len();

                for (index, value) in values.into_iter().enumerate() {
                    for_context.set(variable, value)?;
                    for_context.set("loop", Self::loop_info(index, count))?;

                    result.push_str(&Self::evaluate_all(body, &for_context, partials)?);
                }

                Ok(result)
            }

            Statement::Include(name) => match name.evaluate(context)? {
                Value::String(name) => partials.render_partial(&name, context),
                value => Err(Error::Runtime(format!(
                    "include expects a template name, got {} instead",
                    value.kind()
                ))),
            },
        }
    }

    fn evaluate_all(
        statements: &[Statement],
        context: &Context,
        partials: &dyn Partials,
    ) -> Result<String, Error> {
        let mut result = String::new();
        for statement in statements {
            result.push_str(&statement.evaluate(context, partials)?);
        }
        Ok(result)
    }

    // The `loop` variable available inside for loops.
    fn loop_info(index: usize, count: usize) -> Value {
        Value::Hash(BTreeMap::from([
            ("index".to_string(), Value::Integer(index as i64)),
            ("iteration".to_string(), Value::Integer(index as i64 + 1)),
            ("first".to_string(), Value::Boolean(index == 0)),
            ("last".to_string(), Value::Boolean(index + 1 == count)),
            ("count".to_string(), Value::Integer(count as i64)),
        ]))
    }

    /// Parse one statement. Directives that close a block, e.g. `<% end %>`,
    /// are only valid inside that block.
    pub fn parse(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
    ) -> Result<Statement, Error> {
        match Self::next(iter)? {
            Some(Parsed::Statement(statement)) => Ok(statement),
            Some(Parsed::Closing(closing)) => Err(Error::Unexpected(closing.token())),
            None => Err(Error::Eof("statement")),
        }
    }

    fn next(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
    ) -> Result<Option<Parsed>, Error> {
        let next = match iter.next() {
            Some(next) => next,
            None => return Ok(None),
        };

        let parsed = match next.token() {
            Token::Text(text) => Parsed::Statement(Statement::PrintText(text)),

            Token::BlockStartPrint | Token::BlockStartPrintRaw => {
                let escape = next.token() == Token::BlockStartPrint;
                let expression = Expression::parse(iter)?;
                block_end!(iter);
                Parsed::Statement(Statement::Print { expression, escape })
            }

            Token::BlockStart => {
                let directive = iter.next().ok_or(Error::Eof("code block"))?;

                match directive.token() {
                    Token::If => {
                        let expression = Expression::parse(iter)?;
                        block_end!(iter);
                        Parsed::Statement(Self::conditional(expression, &next, iter)?)
                    }

                    Token::ElseIf => {
                        let expression = Expression::parse(iter)?;
                        block_end!(iter);
                        Parsed::Closing(Closing::ElseIf(next, expression))
                    }

                    Token::Else => {
                        block_end!(iter);
                        Parsed::Closing(Closing::Else(next))
                    }

                    Token::End => {
                        block_end!(iter);
                        Parsed::Closing(Closing::End(next))
                    }

                    Token::For => Parsed::Statement(Self::for_loop(&next, iter)?),

                    Token::Include => {
                        let name = Expression::parse(iter)?;
                        block_end!(iter);
                        Parsed::Statement(Statement::Include(name))
                    }

                    _ => return Err(Error::Syntax(directive)),
                }
            }

            _ => return Err(Error::Syntax(next)),
        };

        Ok(Some(parsed))
    }

    // Statements until the directive closing the block opened by `opener`.
    fn body(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
        opener: &TokenWithContext,
        directive: &'static str,
    ) -> Result<(Vec<Statement>, Closing), Error> {
        let mut body = vec![];

        loop {
            match Self::next(iter)? {
                Some(Parsed::Statement(statement)) => body.push(statement),
                Some(Parsed::Closing(closing)) => return Ok((body, closing)),
                None => {
                    return Err(Error::Unclosed {
                        directive,
                        line: opener.line(),
                        column: opener.column(),
                    })
                }
            }
        }
    }

    // `if`, any number of `elsif`, an optional `else`, then `end`.
    fn conditional(
        condition: Expression,
        opener: &TokenWithContext,
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
    ) -> Result<Statement, Error> {
        let mut branches = vec![];
        let (mut condition, mut opener, mut directive) = (condition, opener.clone(), "if");

        let else_body = loop {
            let (body, closing) = Self::body(iter, &opener, directive)?;
            branches.push(Branch { condition, body });

            match closing {
                Closing::End(_) => break vec![],
                Closing::ElseIf(token, expression) => {
                    condition = expression;
                    opener = token;
                    directive = "elsif";
                }
                Closing::Else(token) => match Self::body(iter, &token, "else")? {
                    (else_body, Closing::End(_)) => break else_body,
                    (_, closing) => return Err(Error::Unexpected(closing.token())),
                },
            }
        };

        Ok(Statement::If {
            branches,
            else_body,
        })
    }

    fn for_loop(
        opener: &TokenWithContext,
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
    ) -> Result<Statement, Error> {
        let variable = iter.next().ok_or(Error::Eof("for"))?;
        let variable = match variable.token() {
            Token::Variable(name) => name,
            _ => return Err(Error::Syntax(variable)),
        };

        let in_ = iter.next().ok_or(Error::Eof("for"))?;
        expect!(in_, Token::In);

        let list = Expression::parse(iter)?;
        block_end!(iter);

        let (body, closing) = Self::body(iter, opener, "for")?;

        let empty = match closing {
            Closing::End(_) => vec![],
            Closing::Else(token) => match Self::body(iter, &token, "else")? {
                (empty, Closing::End(_)) => empty,
                (_, closing) => return Err(Error::Unexpected(closing.token())),
            },
            closing => return Err(Error::Unexpected(closing.token())),
        };

        Ok(Statement::For {
            variable,
            list,
            body,
            empty,
        })
    }
}
