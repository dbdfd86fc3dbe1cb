//! Executable template.
//!
//! A program is a list of statements.
use super::super::{Context, Error, Partials, TokenWithContext, Tokenize};
use super::Statement;

use serde::{Deserialize, Serialize};

/// Executable program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    statements: Vec<Statement>,
}

impl Program {
    /// Evaluate the program given the context. The context contains variable definitions,
    /// partials render `include` directives.
    pub fn evaluate(&self, context: &Context, partials: &dyn Partials) -> Result<String, Error> {
        let mut result = String::new();
        for statement in &self.statements {
            result.push_str(&statement.evaluate(context, partials)?);
        }

        Ok(result)
    }

    /// Parse the program from a list of tokens.
    pub fn parse(tokens: Vec<TokenWithContext>) -> Result<Self, Error> {
        let mut iter = tokens.into_iter().peekable();
        let mut statements = vec![];

        while iter.peek().is_some() {
            let statement = Statement::parse(&mut iter)?;
            statements.push(statement);
        }

        Ok(Program { statements })
    }

    /// Compile the program from source.
    pub fn from_str(source: &str) -> Result<Self, Error> {
        let tokens = source.tokenize()?;
        Program::parse(tokens)
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::view::template::{NoPartials, Tokenize, Value};
    use std::collections::BTreeMap;

    #[test]
    fn test_basic_program() -> Result<(), Error> {
        let program =
            "<html><body><% if 1 == 4 %>world is great<% else %>not so much<% end %></body></html>"
                .tokenize()?;
        let program = Program::parse(program)?;
        let output = program.evaluate(&Context::default(), &NoPartials)?;
        assert_eq!("<html><body>not so much</body></html>", output);
        Ok(())
    }

    #[test]
    fn test_program_print() -> Result<(), Error> {
        let program = r#"
            <html>
                <head>
                    <title><%= 5 %></title>
                </head>
            </html>
        "#;
        let ast = Program::from_str(program)?;
        assert_eq!(ast.statements().len(), 3);

        let output = ast.evaluate(&Context::default(), &NoPartials)?;
        assert!(output.contains("<title>5</title>"));

        Ok(())
    }

    #[test]
    fn test_user_profile() -> Result<(), Error> {
        let program = Program::from_str(
            r#"<a href="/users/<%= user.id %>">{{ user.email }}</a>{{-- links --}}"#,
        )?;
        let user = BTreeMap::from([
            (String::from("id"), Value::Integer(25)),
            (String::from("email"), Value::String("test&co@test.com".into())),
        ]);

        let mut context = Context::new();
        context.set("user", Value::Hash(user))?;

        let result = program.evaluate(&context, &NoPartials)?;
        assert_eq!(result, r#"<a href="/users/25">test&amp;co@test.com</a>"#);

        Ok(())
    }

    #[test]
    fn test_empty_program() -> Result<(), Error> {
        let program = Program::from_str("")?;
        assert!(program.statements().is_empty());
        assert_eq!(program.evaluate(&Context::default(), &NoPartials)?, "");
        Ok(())
    }

    #[test]
    fn test_serialized_program() -> Result<(), Error> {
        let program = Program::from_str("<% for n in [1, 2] %>{{ n * 2 }}<% end %>")?;
        let json = serde_json::to_string(&program)?;
        let restored: Program = serde_json::from_str(&json)?;

        assert_eq!(program, restored);
        assert_eq!(restored.evaluate(&Context::default(), &NoPartials)?, "24");
        Ok(())
    }
}
