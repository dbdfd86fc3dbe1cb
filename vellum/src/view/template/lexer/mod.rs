//! Template lexer.
//!
//! Converts template source into a flat list of tokens. Anything outside
//! a code block is text and is passed through untouched.
pub mod token;
pub mod value;

pub use token::Token;
pub use value::{ToTemplateValue, Value};

use super::Error;

/// Token with its position in the template source.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenWithContext {
    token: Token,
    line: usize,
    column: usize,
}

impl std::fmt::Display for TokenWithContext {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "\"{}\" (line: {}, column: {})",
            self.token, self.line, self.column
        )
    }
}

impl TokenWithContext {
    pub fn new(token: Token, line: usize, column: usize) -> Self {
        Self {
            token,
            line,
            column,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn token(&self) -> Token {
        self.token.clone()
    }
}

/// The kind of code block the lexer is currently inside of.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Block {
    // `<% %>`, `<%= %>`, `<%- %>`
    Code,
    // `{{ }}`
    Curly,
    // `{!! !!}`
    CurlyRaw,
}

impl Block {
    fn closing(&self) -> &'static str {
        match self {
            Block::Code => "%>",
            Block::Curly => "}}",
            Block::CurlyRaw => "!!}",
        }
    }

    fn opening(&self) -> &'static str {
        match self {
            Block::Code => "<%",
            Block::Curly => "{{",
            Block::CurlyRaw => "{!!",
        }
    }
}

/// The lexer converts a template text
/// into a list of tokens that may mean something
/// in our template language.
///
/// Since we're parsing templates, anything that's
/// not inside a code block, e.g. `<% %>` or `{{ }}`, is considered
/// to be just text that needs to be printed as-is.
///
/// This text is represented by the special `Token::Text`.
pub struct Lexer {
    // Template source.
    chars: Vec<char>,
    // Current position in the source.
    position: usize,
    // Resulting tokens.
    tokens: Vec<TokenWithContext>,
    // Buffer for text outside of code blocks.
    buffer: String,
    // Where the text in the buffer started.
    buffer_start: (usize, usize),
    // Code block we're inside of, with the position of its opening tag.
    block: Option<(Block, usize, usize)>,
    // Which line we're on.
    line: usize,
    // Which column we're on.
    column: usize,
}

impl Lexer {
    /// Create new lexer from text input.
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            position: 0,
            tokens: vec![],
            buffer: String::new(),
            buffer_start: (1, 1),
            block: None,
            line: 1,
            column: 1,
        }
    }

    /// Parse an input string into tokens supported by our template language.
    pub fn tokens(mut self) -> Result<Vec<TokenWithContext>, Error> {
        while self.position < self.chars.len() {
            match self.block {
                None => self.text()?,
                Some((block, _, _)) => self.code(block)?,
            }
        }

        if let Some((block, line, column)) = self.block {
            return Err(Error::Unclosed {
                directive: block.opening(),
                line,
                column,
            });
        }

        self.drain_buffer();

        Ok(self.tokens)
    }

    // Text outside of code blocks.
    fn text(&mut self) -> Result<(), Error> {
        if self.starts_with("@{{") {
            // Escaped curly braces, printed as-is.
            self.advance();
            self.push_text('{');
            self.advance();
            self.push_text('{');
            self.advance();
        } else if self.starts_with("{{--") {
            self.comment("{{--", "--}}")?;
        } else if self.starts_with("<%#") {
            self.comment("<%#", "%>")?;
        } else if self.starts_with("{{") {
            self.open(Token::BlockStartPrint, Block::Curly, 2);
        } else if self.starts_with("{!!") {
            self.open(Token::BlockStartPrintRaw, Block::CurlyRaw, 3);
        } else if self.starts_with("<%=") {
            self.open(Token::BlockStartPrint, Block::Code, 3);
        } else if self.starts_with("<%-") {
            self.open(Token::BlockStartPrintRaw, Block::Code, 3);
        } else if self.starts_with("<%") {
            self.open(Token::BlockStart, Block::Code, 2);
        } else if let Some(c) = self.advance() {
            self.push_text(c);
        }

        Ok(())
    }

    // Inside a code block, e.g. `<% if logged_in %>`.
    fn code(&mut self, block: Block) -> Result<(), Error> {
        let closing = block.closing();

        if self.starts_with(closing) {
            self.add_token(Token::BlockEnd);
            self.skip(closing.len());
            self.block = None;
            return Ok(());
        }

        let c = self.chars[self.position];

        match c {
            c if c.is_whitespace() => {
                self.advance();
            }
            '"' | '\'' => self.string(c)?,
            c if c.is_ascii_digit() => self.number()?,
            c if c.is_alphabetic() || c == '_' => self.word(),
            _ => self.operator(c)?,
        }

        Ok(())
    }

    fn open(&mut self, token: Token, block: Block, width: usize) {
        self.drain_buffer();
        self.add_token(token);
        self.block = Some((block, self.line, self.column));
        self.skip(width);
    }

    // Comments are dropped entirely. Text around them is joined.
    fn comment(&mut self, opening: &'static str, closing: &str) -> Result<(), Error> {
        let (line, column) = (self.line, self.column);
        self.skip(opening.len());

        while !self.starts_with(closing) {
            if self.advance().is_none() {
                return Err(Error::Unclosed {
                    directive: opening,
                    line,
                    column,
                });
            }
        }

        self.skip(closing.len());

        Ok(())
    }

    // String literal, e.g. `"hello world"` or `'hello world'`.
    fn string(&mut self, quote: char) -> Result<(), Error> {
        let (line, column) = (self.line, self.column);
        let unclosed = Error::Unclosed {
            directive: "string",
            line,
            column,
        };
        self.advance();

        let mut string = String::new();

        loop {
            match self.advance() {
                None => return Err(unclosed),
                Some('\\') => match self.advance() {
                    Some('n') => string.push('\n'),
                    Some('t') => string.push('\t'),
                    Some(c) => string.push(c),
                    None => return Err(unclosed),
                },
                Some(c) if c == quote => break,
                Some(c) => string.push(c),
            }
        }

        self.tokens.push(TokenWithContext::new(
            Token::Value(Value::String(string)),
            line,
            column,
        ));

        Ok(())
    }

    // Integer or float. A number right after a dot is an index, e.g. `list.0`,
    // so the dot that follows isn't a decimal point.
    fn number(&mut self) -> Result<(), Error> {
        let (line, column) = (self.line, self.column);
        let index = matches!(self.tokens.last().map(|t| &t.token), Some(Token::Dot));
        let mut number = self.digits();

        let float = !index
            && self.peek(0) == Some('.')
            && self.peek(1).map(|c| c.is_ascii_digit()).unwrap_or(false);

        let value = if float {
            self.advance();
            number.push('.');
            number.push_str(&self.digits());
            number.parse::<f64>().ok().map(Value::Float)
        } else {
            number.parse::<i64>().ok().map(Value::Integer)
        };

        match value {
            Some(value) => {
                self.tokens
                    .push(TokenWithContext::new(Token::Value(value), line, column));
                Ok(())
            }
            None => Err(Error::ExpressionSyntax(TokenWithContext::new(
                Token::Variable(number),
                line,
                column,
            ))),
        }
    }

    fn digits(&mut self) -> String {
        let mut digits = String::new();
        while let Some(c) = self.peek(0) {
            if c.is_ascii_digit() {
                digits.push(c);
                self.advance();
            } else {
                break;
            }
        }
        digits
    }

    // Keywords and variable names.
    fn word(&mut self) {
        let (line, column) = (self.line, self.column);
        let mut word = String::new();

        while let Some(c) = self.peek(0) {
            if c.is_alphanumeric() || c == '_' || c == '?' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let token = match word.as_str() {
            "if" => Token::If,
            "elsif" | "elseif" => Token::ElseIf,
            "else" => Token::Else,
            "end" => Token::End,
            "for" => Token::For,
            "in" => Token::In,
            "include" => Token::Include,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "true" => Token::Value(Value::Boolean(true)),
            "false" => Token::Value(Value::Boolean(false)),
            "null" | "nil" => Token::Value(Value::Null),
            _ => Token::Variable(word),
        };

        self.tokens
            .push(TokenWithContext::new(token, line, column));
    }

    fn operator(&mut self, c: char) -> Result<(), Error> {
        let (line, column) = (self.line, self.column);

        let (token, width) = match (c, self.peek(1)) {
            ('=', Some('=')) => (Token::Equals, 2),
            ('!', Some('=')) => (Token::NotEquals, 2),
            ('>', Some('=')) => (Token::GreaterEqualThan, 2),
            ('<', Some('=')) => (Token::LessEqualThan, 2),
            ('&', Some('&')) => (Token::And, 2),
            ('|', Some('|')) => (Token::Or, 2),
            ('>', _) => (Token::GreaterThan, 1),
            ('<', _) => (Token::LessThan, 1),
            ('!', _) => (Token::Not, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Mult, 1),
            ('/', _) => (Token::Div, 1),
            ('%', _) => (Token::Mod, 1),
            ('.', _) => (Token::Dot, 1),
            (',', _) => (Token::Comma, 1),
            ('(', _) => (Token::RoundBracketStart, 1),
            (')', _) => (Token::RoundBracketEnd, 1),
            ('[', _) => (Token::SquareBracketStart, 1),
            (']', _) => (Token::SquareBracketEnd, 1),
            (c, _) => return Err(Error::UnexpectedCharacter(c, line, column)),
        };

        self.tokens
            .push(TokenWithContext::new(token, line, column));
        self.skip(width);

        Ok(())
    }

    fn push_text(&mut self, c: char) {
        if self.buffer.is_empty() {
            self.buffer_start = (self.line, self.column);
        }
        self.buffer.push(c);
    }

    // Emit buffered text.
    fn drain_buffer(&mut self) {
        if !self.buffer.is_empty() {
            let text = std::mem::take(&mut self.buffer);
            let (line, column) = self.buffer_start;
            self.tokens
                .push(TokenWithContext::new(Token::Text(text), line, column));
        }
    }

    // Add token to output with lexer context (e.g. line number).
    fn add_token(&mut self, token: Token) {
        self.tokens
            .push(TokenWithContext::new(token, self.line, self.column));
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).copied()
    }

    fn starts_with(&self, pattern: &str) -> bool {
        pattern
            .chars()
            .enumerate()
            .all(|(i, c)| self.peek(i) == Some(c))
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.position += 1;

        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(c)
    }

    fn skip(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }
}

// Easily tokenize strings.
pub trait Tokenize {
    // Parse a string and convert it to a list of tokens.
    fn tokenize(&self) -> Result<Vec<TokenWithContext>, Error>;
}

impl Tokenize for &str {
    fn tokenize(&self) -> Result<Vec<TokenWithContext>, Error> {
        Lexer::new(self).tokens()
    }
}

impl Tokenize for String {
    fn tokenize(&self) -> Result<Vec<TokenWithContext>, Error> {
        Lexer::new(self).tokens()
    }
}
