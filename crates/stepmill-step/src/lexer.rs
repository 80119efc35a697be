//! Part 21 (STEP physical file) tokenizer.
//!
//! Streaming: the parser pulls one token at a time, nothing is buffered.
//! Handles keywords, `#n` entity references, quoted strings with `''`
//! escapes, reals and integers (with exponents), `.ENUM.` values, the `*`
//! derived and `$` null markers, punctuation, and `/* ... */` comments.

use crate::error::StepError;

/// A token in a STEP file.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Keyword or section name, uppercased (e.g. `CARTESIAN_POINT`, `DATA`).
    Keyword(String),
    /// Entity reference: `#123` becomes `EntityRef(123)`.
    EntityRef(u64),
    /// String literal without quotes.
    Str(String),
    /// Real number.
    Real(f64),
    /// Integer number.
    Integer(i64),
    /// Enumeration: `.TRUE.` becomes `Enum("TRUE")`.
    Enum(String),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `=`
    Equals,
    /// `*` (derived value)
    Asterisk,
    /// `$` (null value)
    Dollar,
}

/// Streaming lexer over raw file bytes.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over the given input.
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Current source position as `(line, col)`, for error reporting.
    pub fn position(&self) -> (usize, usize) {
        (self.line, self.col)
    }

    /// Produce the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, StepError> {
        self.skip_trivia();

        let Some(ch) = self.peek() else {
            return Ok(None);
        };

        let token = match ch {
            b'(' => self.single(Token::LParen),
            b')' => self.single(Token::RParen),
            b',' => self.single(Token::Comma),
            b';' => self.single(Token::Semicolon),
            b'=' => self.single(Token::Equals),
            b'*' => self.single(Token::Asterisk),
            b'$' => self.single(Token::Dollar),
            b'#' => self.entity_ref()?,
            b'\'' => self.string()?,
            b'.' => self.enumeration()?,
            b'-' | b'+' => {
                if self.input.get(self.pos + 1).is_some_and(u8::is_ascii_digit) {
                    self.number()?
                } else {
                    return Err(StepError::lexer(
                        self.line,
                        self.col,
                        format!("unexpected character '{}'", ch as char),
                    ));
                }
            }
            b'0'..=b'9' => self.number()?,
            b'A'..=b'Z' | b'a'..=b'z' | b'_' => self.keyword(),
            _ => {
                return Err(StepError::lexer(
                    self.line,
                    self.col,
                    format!("unexpected character '{}'", ch as char),
                ));
            }
        };

        Ok(Some(token))
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let ch = self.input.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn single(&mut self, token: Token) -> Token {
        self.bump();
        token
    }

    fn skip_trivia(&mut self) {
        loop {
            while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
                self.bump();
            }
            // Block comment /* ... */
            if self.peek() == Some(b'/') && self.input.get(self.pos + 1) == Some(&b'*') {
                self.bump();
                self.bump();
                while self.pos < self.input.len() {
                    if self.peek() == Some(b'*') && self.input.get(self.pos + 1) == Some(&b'/') {
                        self.bump();
                        self.bump();
                        break;
                    }
                    self.bump();
                }
                continue;
            }
            break;
        }
    }

    fn entity_ref(&mut self) -> Result<Token, StepError> {
        let (line, col) = (self.line, self.col);
        self.bump(); // '#'

        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.pos == start {
            return Err(StepError::lexer(line, col, "expected digits after '#'"));
        }

        let s = String::from_utf8_lossy(&self.input[start..self.pos]);
        let id = s
            .parse()
            .map_err(|_| StepError::lexer(line, col, format!("invalid entity id: {s}")))?;
        Ok(Token::EntityRef(id))
    }

    fn string(&mut self) -> Result<Token, StepError> {
        let (line, col) = (self.line, self.col);
        self.bump(); // opening quote

        let mut content = Vec::new();
        loop {
            match self.bump() {
                None => return Err(StepError::lexer(line, col, "unterminated string")),
                Some(b'\'') => {
                    // '' is an escaped quote
                    if self.peek() == Some(b'\'') {
                        content.push(b'\'');
                        self.bump();
                    } else {
                        break;
                    }
                }
                Some(ch) => content.push(ch),
            }
        }
        Ok(Token::Str(String::from_utf8_lossy(&content).into_owned()))
    }

    fn enumeration(&mut self) -> Result<Token, StepError> {
        let (line, col) = (self.line, self.col);
        self.bump(); // opening '.'

        let mut name = Vec::new();
        loop {
            match self.peek() {
                Some(b'.') => {
                    self.bump();
                    break;
                }
                Some(ch) if ch.is_ascii_alphanumeric() || ch == b'_' => {
                    name.push(ch);
                    self.bump();
                }
                _ => {
                    return Err(StepError::lexer(line, col, "malformed enumeration"));
                }
            }
        }
        if name.is_empty() {
            return Err(StepError::lexer(line, col, "empty enumeration"));
        }
        Ok(Token::Enum(String::from_utf8_lossy(&name).into_owned()))
    }

    fn number(&mut self) -> Result<Token, StepError> {
        let (line, col) = (self.line, self.col);
        let start = self.pos;
        let mut is_real = false;

        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.bump();
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        // A dot directly after digits always belongs to the number; STEP
        // writes reals as `1.`, `1.E-15`, etc. Enums are comma-separated
        // from numbers so `.T.` can never directly follow digits.
        if self.peek() == Some(b'.') {
            is_real = true;
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some(b'E' | b'e')) {
            is_real = true;
            self.bump();
            if matches!(self.peek(), Some(b'-' | b'+')) {
                self.bump();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }

        let s = String::from_utf8_lossy(&self.input[start..self.pos]);
        if is_real {
            s.parse()
                .map(Token::Real)
                .map_err(|_| StepError::lexer(line, col, format!("invalid real: {s}")))
        } else {
            s.parse()
                .map(Token::Integer)
                .map_err(|_| StepError::lexer(line, col, format!("invalid integer: {s}")))
        }
    }

    fn keyword(&mut self) -> Token {
        let start = self.pos;
        // Hyphens appear in section delimiters like END-ISO-10303-21.
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'-')
        {
            self.bump();
        }
        let s = String::from_utf8_lossy(&self.input[start..self.pos]).to_uppercase();
        Token::Keyword(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input.as_bytes());
        let mut out = Vec::new();
        while let Some(tok) = lexer.next_token().unwrap() {
            out.push(tok);
        }
        out
    }

    #[test]
    fn entity_refs() {
        assert_eq!(tokens("#123 #1"), vec![Token::EntityRef(123), Token::EntityRef(1)]);
    }

    #[test]
    fn strings_with_escapes() {
        assert_eq!(tokens("'hello'"), vec![Token::Str("hello".into())]);
        assert_eq!(tokens("'it''s'"), vec![Token::Str("it's".into())]);
        assert_eq!(tokens("''"), vec![Token::Str(String::new())]);
    }

    #[test]
    fn enums() {
        assert_eq!(tokens(".TRUE."), vec![Token::Enum("TRUE".into())]);
        assert_eq!(tokens(".T..F."), vec![Token::Enum("T".into()), Token::Enum("F".into())]);
    }

    #[test]
    fn numbers() {
        assert_eq!(tokens("42"), vec![Token::Integer(42)]);
        assert_eq!(tokens("-7"), vec![Token::Integer(-7)]);
        assert_eq!(tokens("3.14"), vec![Token::Real(3.14)]);
        assert_eq!(tokens("-1.5E-10"), vec![Token::Real(-1.5e-10)]);
        assert_eq!(tokens("10."), vec![Token::Real(10.0)]);
        assert_eq!(tokens("1.E2"), vec![Token::Real(100.0)]);
    }

    #[test]
    fn keywords_uppercase() {
        assert_eq!(tokens("data"), vec![Token::Keyword("DATA".into())]);
        assert_eq!(
            tokens("END-ISO-10303-21"),
            vec![Token::Keyword("END-ISO-10303-21".into())]
        );
    }

    #[test]
    fn punctuation() {
        assert_eq!(
            tokens("()=,;*$"),
            vec![
                Token::LParen,
                Token::RParen,
                Token::Equals,
                Token::Comma,
                Token::Semicolon,
                Token::Asterisk,
                Token::Dollar,
            ]
        );
    }

    #[test]
    fn comments_skipped() {
        assert_eq!(
            tokens("#1 /* a comment */ #2"),
            vec![Token::EntityRef(1), Token::EntityRef(2)]
        );
    }

    #[test]
    fn full_entity_line() {
        let toks = tokens("#1 = CARTESIAN_POINT('', (0.0, 1.5E-2, -3.0));");
        assert_eq!(
            toks,
            vec![
                Token::EntityRef(1),
                Token::Equals,
                Token::Keyword("CARTESIAN_POINT".into()),
                Token::LParen,
                Token::Str(String::new()),
                Token::Comma,
                Token::LParen,
                Token::Real(0.0),
                Token::Comma,
                Token::Real(0.015),
                Token::Comma,
                Token::Real(-3.0),
                Token::RParen,
                Token::RParen,
                Token::Semicolon,
            ]
        );
    }
}
