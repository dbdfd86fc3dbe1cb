use super::{Token, TokenWithContext};
use thiserror::Error;

/// Template language error, raised while compiling or executing a template.
#[derive(Error, Debug)]
pub enum Error {
    #[error("syntax error near {0}")]
    Syntax(TokenWithContext),

    #[error("expression syntax error near {0}")]
    ExpressionSyntax(TokenWithContext),

    #[error("expected token \"{1}\", but have {0} instead")]
    WrongToken(TokenWithContext, Token),

    #[error("unexpected {0}, there is no matching opening directive")]
    Unexpected(TokenWithContext),

    #[error("\"{directive}\" opened on line {line}, column {column} is never closed")]
    Unclosed {
        directive: &'static str,
        line: usize,
        column: usize,
    },

    #[error("unexpected character '{0}' (line: {1}, column: {2})")]
    UnexpectedCharacter(char, usize, usize),

    #[error("reached end of template while parsing {0}")]
    Eof(&'static str),

    #[error("variable \"{0}\" is not defined or in scope")]
    UndefinedVariable(String),

    #[error("method \"{0}\" is not defined on {1}")]
    UnknownMethod(String, &'static str),

    #[error("{0}")]
    Runtime(String),

    #[error("{0}")]
    Include(Box<crate::Error>),

    #[error("compiled template is malformed: {0}")]
    Artifact(#[from] serde_json::Error),

    #[error("template is nested too deeply to be compiled: {0}")]
    TooDeep(serde_json::Error),

    #[error("compiled template format version {0} is not supported")]
    ArtifactVersion(u32),

    #[error("serialization error")]
    SerializationError,

    #[error("failed to format a timestamp correctly, error: \"{0}\"")]
    TimeFormatError(#[from] time::error::Format),
}

impl Error {
    /// Line and column in the template source where the error happened,
    /// if it's known.
    pub fn location(&self) -> Option<(usize, usize)> {
        match self {
            Error::Syntax(token)
            | Error::ExpressionSyntax(token)
            | Error::WrongToken(token, _)
            | Error::Unexpected(token) => Some((token.line(), token.column())),
            Error::Unclosed { line, column, .. } => Some((*line, *column)),
            Error::UnexpectedCharacter(_, line, column) => Some((*line, *column)),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Error::Syntax(_) => "syntax error",
            Error::ExpressionSyntax(_) => "expression syntax error",
            Error::WrongToken(_, _) => "unexpected token",
            Error::Unexpected(_) => "no matching opening directive",
            Error::Unclosed { .. } => "never closed",
            Error::UnexpectedCharacter(_, _, _) => "unexpected character",
            _ => "",
        }
    }

    /// Show the offending line of the template source with the error
    /// location underlined, e.g.:
    ///
    /// ```text
    ///   |
    /// 1 | <% if apples %>
    ///   |         ^ syntax error
    /// ```
    pub fn pretty(&self, source: &str) -> Option<String> {
        let (line, column) = self.location()?;
        let context = source.lines().nth(std::cmp::max(1, line) - 1)?; // lines start at 1
        let leading_spaces = context.chars().take_while(|c| c.is_whitespace()).count();

        let underline = " ".repeat(column.saturating_sub(1 + leading_spaces))
            + &format!("^ {}", self.label());

        let gutter = " ".repeat(line.to_string().len());

        Some(format!(
            "{} | \n{} | {}\n{} | {}",
            gutter,
            line,
            context.trim(),
            gutter,
            underline
        ))
    }
}
