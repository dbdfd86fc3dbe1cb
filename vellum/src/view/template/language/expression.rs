use super::{
    super::lexer::{Token, TokenWithContext, Tokenize, Value},
    super::Context,
    super::Error,
    Op, Term,
};

use serde::{Deserialize, Serialize};
use std::iter::{Iterator, Peekable};

/// An expression, like `5 == 6` or `logged_in == false`,
/// which when evaluated produces a single value, e.g. `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    // Operators applied left to right, e.g. `1 + 2 * 3 - 4` is
    // `1`, then `+ (2 * 3)`, then `- 4`. Operands bind tighter than the
    // operators after them, so folding from the left keeps the precedence.
    Binary {
        left: Box<Expression>,
        rest: Vec<(Op, Expression)>,
    },

    Unary {
        op: Op,
        operand: Box<Expression>,
    },

    // Base case for recursive expression parsing, which evaluates to the value
    // of the term, e.g. `5` evalutes to `5` or `variable_name` evalutes to whatever
    // the variable is set to in the context.
    Term {
        term: Term,
    },

    // A list of expressions, e.g.
    // `[1, 2, variable, "hello world"]`
    //
    // The list is dynamically evaluated at runtime, so it can contain variables
    // and constants, as long as the variable is in scope.
    List {
        terms: Vec<Expression>,
    },

    // Call a function on a value/expression.
    Function {
        term: Box<Expression>,
        name: Box<Expression>,
        args: Vec<Expression>,
    },

    // The global scope. Functions like `default(a, b)` are called on it.
    Interpreter,
}

impl Expression {
    /// Create new constant expression (term).
    pub fn constant(value: Value) -> Self {
        Self::Term {
            term: Term::constant(value),
        }
    }

    /// Create new variable expression (term).
    pub fn variable(variable: String) -> Self {
        Self::Term {
            term: Term::variable(variable),
        }
    }

    /// Evaluate the expression to a value given the context.
    pub fn evaluate(&self, context: &Context) -> Result<Value, Error> {
        match self {
            Expression::Term { term } => term.evaluate(context),

            Expression::Binary { left, rest } => {
                let mut value = left.evaluate(context)?;
                for (op, right) in rest {
                    value = op.evaluate_binary(&value, &right.evaluate(context)?)?;
                }
                Ok(value)
            }

            Expression::Unary { op, operand } => {
                let operand = operand.evaluate(context)?;
                op.evaluate_unary(&operand)
            }

            Expression::List { terms } => {
                let mut list = vec![];
                for term in terms {
                    list.push(term.evaluate(context)?);
                }
                Ok(Value::List(list))
            }

            Expression::Function { term, name, args } => {
                let value = term.evaluate(context)?;
                let name = match name.evaluate(context)? {
                    Value::String(name) => name,
                    Value::Integer(index) => index.to_string(),
                    name => {
                        return Err(Error::Runtime(format!(
                            "function name should be a string, got {} instead",
                            name.kind()
                        )))
                    }
                };

                // Allow to pass undefined variables to a function.
                // Typically that's not great, but the purpose of this function
                // is to catch such cases and replace with a default value (presumably defined).
                let allow_undefined = name == "default" && value == Value::Interpreter;

                let args = args
                    .iter()
                    .map(|arg| match arg.evaluate(context) {
                        Ok(value) => Ok(value),
                        Err(Error::UndefinedVariable(_)) if allow_undefined => Ok(Value::Null),
                        Err(e) => Err(e),
                    })
                    .collect::<Result<Vec<Value>, Error>>()?;

                value.call(&name, &args)
            }

            Expression::Interpreter => Ok(Value::Interpreter),
        }
    }

    fn term(iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>) -> Result<Self, Error> {
        let next = iter.next().ok_or(Error::Eof("expression"))?;

        let term = match next.token() {
            Token::Not => Expression::Unary {
                op: Op::Not,
                operand: Box::new(Self::term(iter)?),
            },

            Token::Minus => Expression::Unary {
                op: Op::Sub,
                operand: Box::new(Self::term(iter)?),
            },

            Token::Plus => Expression::Unary {
                op: Op::Add,
                operand: Box::new(Self::term(iter)?),
            },

            Token::RoundBracketStart => {
                let expr = Self::parse(iter)?;
                Self::expect(iter, Token::RoundBracketEnd)?;
                Self::accessor(expr, iter)?
            }

            Token::Variable(name) => {
                let expr = match iter.peek().map(|t| t.token()) {
                    // Global function, e.g. `default(name, "guest")`.
                    Some(Token::RoundBracketStart) => Expression::Function {
                        term: Box::new(Expression::Interpreter),
                        name: Box::new(Self::constant(Value::String(name))),
                        args: Self::arguments(iter)?,
                    },
                    _ => Self::variable(name),
                };

                Self::accessor(expr, iter)?
            }

            Token::Value(value) => Self::accessor(Self::constant(value), iter)?,

            Token::SquareBracketStart => {
                let mut terms = vec![];

                if let Some(Token::SquareBracketEnd) = iter.peek().map(|t| t.token()) {
                    let _ = iter.next();
                } else {
                    loop {
                        terms.push(Self::parse(iter)?);
                        let next = iter.next().ok_or(Error::Eof("list"))?;
                        match next.token() {
                            Token::SquareBracketEnd => break,
                            Token::Comma => continue,
                            _ => return Err(Error::ExpressionSyntax(next)),
                        }
                    }
                }

                Self::accessor(Expression::List { terms }, iter)?
            }

            _ => return Err(Error::ExpressionSyntax(next)),
        };

        Ok(term)
    }

    // Function arguments between parenthesis, e.g. `("hello", 1 + 2)`.
    fn arguments(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
    ) -> Result<Vec<Self>, Error> {
        Self::expect(iter, Token::RoundBracketStart)?;
        let mut args = vec![];

        if let Some(Token::RoundBracketEnd) = iter.peek().map(|t| t.token()) {
            let _ = iter.next();
            return Ok(args);
        }

        loop {
            args.push(Self::parse(iter)?);
            let next = iter.next().ok_or(Error::Eof("function arguments"))?;
            match next.token() {
                Token::RoundBracketEnd => break,
                Token::Comma => continue,
                _ => return Err(Error::ExpressionSyntax(next)),
            }
        }

        Ok(args)
    }

    // Method calls and attribute access, e.g. `user.name`, `list.0` or `hash[key]`.
    fn accessor(
        mut expr: Self,
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
    ) -> Result<Self, Error> {
        loop {
            let accessor = iter.peek().map(|t| t.token());

            expr = match accessor {
                Some(Token::Dot) => {
                    let _ = iter.next();
                    let name = iter.next().ok_or(Error::Eof("accessor"))?;
                    match name.token() {
                        Token::Variable(name) => {
                            let args = match iter.peek().map(|t| t.token()) {
                                Some(Token::RoundBracketStart) => Self::arguments(iter)?,
                                _ => vec![],
                            };

                            Expression::Function {
                                term: Box::new(expr),
                                name: Box::new(Self::constant(Value::String(name))),
                                args,
                            }
                        }
                        Token::Value(Value::Integer(n)) => Expression::Function {
                            term: Box::new(expr),
                            name: Box::new(Self::constant(Value::String(n.to_string()))),
                            args: vec![],
                        },
                        _ => return Err(Error::ExpressionSyntax(name)),
                    }
                }

                Some(Token::SquareBracketStart) => {
                    let _ = iter.next();
                    let name = Self::parse(iter)?;
                    Self::expect(iter, Token::SquareBracketEnd)?;

                    Expression::Function {
                        term: Box::new(expr),
                        name: Box::new(name),
                        args: vec![],
                    }
                }

                Some(_) | None => return Ok(expr),
            };
        }
    }

    fn expect(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
        expected: Token,
    ) -> Result<(), Error> {
        let next = iter.next().ok_or(Error::Eof("expression"))?;
        if next.token() != expected {
            return Err(Error::WrongToken(next, expected));
        }
        Ok(())
    }

    // Precedence climbing: collect operators that bind tighter than `limit`,
    // each with everything to its right that binds tighter still.
    fn binary(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
        limit: u8,
    ) -> Result<Self, Error> {
        let left = Self::term(iter)?;
        let mut rest = vec![];

        loop {
            let op = match iter.peek().and_then(|next| Op::from_token(next.token())) {
                Some(op) if op.binary() && op.precedence() < limit => op,
                _ => break,
            };

            // Consume the operator.
            let _ = iter.next();

            rest.push((op, Self::binary(iter, op.precedence())?));
        }

        Ok(if rest.is_empty() {
            left
        } else {
            Expression::Binary {
                left: Box::new(left),
                rest,
            }
        })
    }

    /// Recursively parse the expression.
    ///
    /// Consumes language tokens automatically and stops at the first token
    /// that can't continue the expression, e.g. the end of the code block.
    pub fn parse(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
    ) -> Result<Self, Error> {
        Self::binary(iter, u8::MAX)
    }
}

pub trait Evaluate {
    fn evaluate(&self, context: &Context) -> Result<Value, Error>;
    fn evaluate_default(&self) -> Result<Value, Error> {
        self.evaluate(&Context::default())
    }
}

impl Evaluate for &str {
    fn evaluate(&self, context: &Context) -> Result<Value, Error> {
        let tokens = self.tokenize()?;
        let tokens = tokens.into_iter().skip(1); // Skip code block start.
        let expr = Expression::parse(&mut tokens.peekable())?;
        expr.evaluate(context)
    }
}

impl Evaluate for String {
    fn evaluate(&self, context: &Context) -> Result<Value, Error> {
        self.as_str().evaluate(context)
    }
}
