use super::Value;

/// A template language token, e.g. `if` or `for`.
#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    // e.g. `<html><body></body></html>`
    Text(String),
    // e.g. `<% logged_in %>`
    Variable(String),
    // e.g. `<% 5 %>` or `<% "hello world" %>`
    Value(Value),
    // `<% if %>`
    If,
    // `<% elsif %>`
    ElseIf,
    // `<% else %>`
    Else,
    End,
    For,
    In,
    Include,
    // `<%`
    BlockStart,
    // `<%=` or `{{`
    BlockStartPrint,
    // `<%-` or `{!!`
    BlockStartPrintRaw,
    // `%>`, `}}` or `!!}`
    BlockEnd,
    Dot,
    And,
    Or,
    Not,
    Plus,
    Minus,
    Mod,
    Div,
    Mult,
    Equals,
    NotEquals,
    GreaterThan,
    GreaterEqualThan,
    LessThan,
    LessEqualThan,
    SquareBracketStart,
    SquareBracketEnd,
    Comma,
    RoundBracketStart,
    RoundBracketEnd,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let symbol = match self {
            Token::Text(_) => "text",
            Token::Variable(name) => return write!(f, "{}", name),
            Token::Value(Value::String(string)) => return write!(f, "\"{}\"", string),
            Token::Value(value) => return write!(f, "{}", value),
            Token::If => "if",
            Token::ElseIf => "elsif",
            Token::Else => "else",
            Token::End => "end",
            Token::For => "for",
            Token::In => "in",
            Token::Include => "include",
            Token::BlockStart => "<%",
            Token::BlockStartPrint => "{{",
            Token::BlockStartPrintRaw => "{!!",
            Token::BlockEnd => "end of block",
            Token::Dot => ".",
            Token::And => "&&",
            Token::Or => "||",
            Token::Not => "!",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Mod => "%",
            Token::Div => "/",
            Token::Mult => "*",
            Token::Equals => "==",
            Token::NotEquals => "!=",
            Token::GreaterThan => ">",
            Token::GreaterEqualThan => ">=",
            Token::LessThan => "<",
            Token::LessEqualThan => "<=",
            Token::SquareBracketStart => "[",
            Token::SquareBracketEnd => "]",
            Token::Comma => ",",
            Token::RoundBracketStart => "(",
            Token::RoundBracketEnd => ")",
        };

        write!(f, "{}", symbol)
    }
}
