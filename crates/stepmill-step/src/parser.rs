//! Part 21 parser: builds the raw entity graph from the token stream.
//!
//! No semantics here; each data-section entity is stored as an id, a type
//! name, and an argument tree. The header section is consumed but its
//! contents are not interpreted.

use std::collections::HashMap;

use crate::error::StepError;
use crate::lexer::{Lexer, Token};

/// A single argument value of a STEP entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Entity reference (`#123`).
    Ref(u64),
    /// String literal.
    Str(String),
    /// Real number.
    Real(f64),
    /// Integer number.
    Integer(i64),
    /// Enumeration (`.TRUE.` → `"TRUE"`).
    Enum(String),
    /// Nested list.
    List(Vec<Value>),
    /// Derived value (`*`).
    Derived,
    /// Null value (`$`).
    Null,
    /// Inline typed value: `TYPE_NAME(args)`.
    Typed {
        /// Type name.
        name: String,
        /// Arguments.
        args: Vec<Value>,
    },
}

impl Value {
    /// As an entity reference.
    pub fn as_ref_id(&self) -> Option<u64> {
        match self {
            Value::Ref(id) => Some(*id),
            _ => None,
        }
    }

    /// As a real (integers are accepted too; STEP writers are sloppy here).
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// As an enumeration name.
    pub fn as_enum(&self) -> Option<&str> {
        match self {
            Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// As a list slice.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    /// Whether this is the `$` null marker.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// A parsed data-section entity.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Entity id (`#123`).
    pub id: u64,
    /// Type name, e.g. `CARTESIAN_POINT`.
    pub type_name: String,
    /// Argument tree.
    pub args: Vec<Value>,
}

/// The parsed content of a STEP file's data section.
#[derive(Debug, Clone)]
pub struct StepFile {
    /// Entities indexed by id.
    pub entities: HashMap<u64, Entity>,
}

impl StepFile {
    /// Look up an entity by id.
    pub fn get(&self, id: u64) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Look up an entity by id, erroring if absent.
    pub fn require(&self, id: u64) -> Result<&Entity, StepError> {
        self.entities.get(&id).ok_or(StepError::MissingEntity(id))
    }

    /// All entity ids of a given type, sorted for deterministic iteration.
    pub fn ids_of_type(&self, type_name: &str) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .entities
            .values()
            .filter(|e| e.type_name == type_name)
            .map(|e| e.id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Parser pulling tokens straight off the lexer.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    lookahead: Option<Token>,
}

impl<'a> Parser<'a> {
    /// Parse a STEP file from raw bytes.
    pub fn parse(input: &'a [u8]) -> Result<StepFile, StepError> {
        let mut parser = Parser {
            lexer: Lexer::new(input),
            lookahead: None,
        };
        parser.file()
    }

    fn file(&mut self) -> Result<StepFile, StepError> {
        let mut entities = HashMap::new();

        self.expect_keyword("ISO-10303-21")?;
        self.expect(&Token::Semicolon)?;

        loop {
            match self.peek()? {
                Some(Token::Keyword(k)) if k == "HEADER" => {
                    self.advance()?;
                    self.expect(&Token::Semicolon)?;
                    self.skip_header()?;
                }
                Some(Token::Keyword(k)) if k == "DATA" => {
                    self.advance()?;
                    self.expect(&Token::Semicolon)?;
                    self.data_section(&mut entities)?;
                }
                Some(Token::Keyword(k)) if k == "END-ISO-10303-21" => {
                    self.advance()?;
                    self.expect(&Token::Semicolon)?;
                    break;
                }
                other => {
                    return Err(StepError::parse(None, format!("unexpected token: {other:?}")));
                }
            }
        }

        Ok(StepFile { entities })
    }

    /// Header entities carry no ids; scan them without keeping anything.
    fn skip_header(&mut self) -> Result<(), StepError> {
        loop {
            match self.peek()? {
                Some(Token::Keyword(k)) if k == "ENDSEC" => {
                    self.advance()?;
                    self.expect(&Token::Semicolon)?;
                    return Ok(());
                }
                Some(Token::Keyword(_)) => {
                    self.advance()?;
                    self.args()?;
                    self.expect(&Token::Semicolon)?;
                }
                other => {
                    return Err(StepError::parse(
                        None,
                        format!("unexpected token in header: {other:?}"),
                    ));
                }
            }
        }
    }

    fn data_section(&mut self, entities: &mut HashMap<u64, Entity>) -> Result<(), StepError> {
        loop {
            match self.peek()? {
                Some(Token::Keyword(k)) if k == "ENDSEC" => {
                    self.advance()?;
                    self.expect(&Token::Semicolon)?;
                    return Ok(());
                }
                Some(Token::EntityRef(id)) => {
                    let id = *id;
                    self.advance()?;
                    self.expect(&Token::Equals)?;
                    let type_name = match self.advance()? {
                        Some(Token::Keyword(name)) => name,
                        other => {
                            return Err(StepError::parse(
                                Some(id),
                                format!("expected type name, got {other:?}"),
                            ));
                        }
                    };
                    let args = self.args()?;
                    self.expect(&Token::Semicolon)?;
                    entities.insert(
                        id,
                        Entity {
                            id,
                            type_name,
                            args,
                        },
                    );
                }
                other => {
                    return Err(StepError::parse(
                        None,
                        format!("unexpected token in data section: {other:?}"),
                    ));
                }
            }
        }
    }

    fn args(&mut self) -> Result<Vec<Value>, StepError> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if self.peek()? != Some(&Token::RParen) {
            args.push(self.value()?);
            while self.peek()? == Some(&Token::Comma) {
                self.advance()?;
                args.push(self.value()?);
            }
        }
        self.expect(&Token::RParen)?;
        Ok(args)
    }

    fn value(&mut self) -> Result<Value, StepError> {
        match self.advance()? {
            Some(Token::EntityRef(id)) => Ok(Value::Ref(id)),
            Some(Token::Str(s)) => Ok(Value::Str(s)),
            Some(Token::Real(v)) => Ok(Value::Real(v)),
            Some(Token::Integer(v)) => Ok(Value::Integer(v)),
            Some(Token::Enum(s)) => Ok(Value::Enum(s)),
            Some(Token::Asterisk) => Ok(Value::Derived),
            Some(Token::Dollar) => Ok(Value::Null),
            Some(Token::LParen) => {
                let mut list = Vec::new();
                if self.peek()? != Some(&Token::RParen) {
                    list.push(self.value()?);
                    while self.peek()? == Some(&Token::Comma) {
                        self.advance()?;
                        list.push(self.value()?);
                    }
                }
                self.expect(&Token::RParen)?;
                Ok(Value::List(list))
            }
            Some(Token::Keyword(name)) => {
                // Inline typed value, as in complex instances.
                let args = self.args()?;
                Ok(Value::Typed { name, args })
            }
            other => Err(StepError::parse(None, format!("unexpected value: {other:?}"))),
        }
    }

    fn peek(&mut self) -> Result<Option<&Token>, StepError> {
        if self.lookahead.is_none() {
            self.lookahead = self.lexer.next_token()?;
        }
        Ok(self.lookahead.as_ref())
    }

    fn advance(&mut self) -> Result<Option<Token>, StepError> {
        if self.lookahead.is_none() {
            self.lookahead = self.lexer.next_token()?;
        }
        Ok(self.lookahead.take())
    }

    fn expect(&mut self, expected: &Token) -> Result<(), StepError> {
        match self.advance()? {
            Some(ref tok) if tok == expected => Ok(()),
            other => {
                let (line, col) = self.lexer.position();
                Err(StepError::parse(
                    None,
                    format!("expected {expected:?}, got {other:?} near line {line}, col {col}"),
                ))
            }
        }
    }

    fn expect_keyword(&mut self, name: &str) -> Result<(), StepError> {
        match self.advance()? {
            Some(Token::Keyword(ref k)) if k == name => Ok(()),
            other => Err(StepError::parse(
                None,
                format!("expected keyword '{name}', got {other:?}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_file() {
        let input = r#"
ISO-10303-21;
HEADER;
FILE_DESCRIPTION((''), '2;1');
ENDSEC;
DATA;
#1 = CARTESIAN_POINT('origin', (0.0, 0.0, 0.0));
#2 = DIRECTION('x', (1.0, 0.0, 0.0));
ENDSEC;
END-ISO-10303-21;
"#;
        let file = Parser::parse(input.as_bytes()).unwrap();
        assert_eq!(file.entities.len(), 2);

        let p1 = file.get(1).unwrap();
        assert_eq!(p1.type_name, "CARTESIAN_POINT");
        let coords = p1.args[1].as_list().unwrap();
        assert_eq!(coords.len(), 3);
        assert_eq!(coords[0].as_real(), Some(0.0));
    }

    #[test]
    fn nested_lists_and_enums() {
        let input = r#"
ISO-10303-21;
HEADER;
ENDSEC;
DATA;
#1 = B_SPLINE_CURVE_WITH_KNOTS('', 3, (#2, #3, #4), .UNSPECIFIED., .F., .F., (4, 4), (0.0, 1.0), .UNSPECIFIED.);
ENDSEC;
END-ISO-10303-21;
"#;
        let file = Parser::parse(input.as_bytes()).unwrap();
        let e = file.get(1).unwrap();
        assert_eq!(e.args.len(), 9);
        let cp = e.args[2].as_list().unwrap();
        assert_eq!(cp[0].as_ref_id(), Some(2));
        assert_eq!(e.args[3].as_enum(), Some("UNSPECIFIED"));
    }

    #[test]
    fn null_and_derived() {
        let input = r#"
ISO-10303-21;
HEADER;
ENDSEC;
DATA;
#1 = ORIENTED_EDGE('', *, *, #7, .T.);
#2 = SOME_ENTITY($, 'v');
ENDSEC;
END-ISO-10303-21;
"#;
        let file = Parser::parse(input.as_bytes()).unwrap();
        assert_eq!(file.get(1).unwrap().args[1], Value::Derived);
        assert!(file.get(2).unwrap().args[0].is_null());
    }

    #[test]
    fn ids_of_type_sorted() {
        let input = r#"
ISO-10303-21;
HEADER;
ENDSEC;
DATA;
#5 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));
#2 = CARTESIAN_POINT('', (1.0, 0.0, 0.0));
#3 = DIRECTION('', (1.0, 0.0, 0.0));
ENDSEC;
END-ISO-10303-21;
"#;
        let file = Parser::parse(input.as_bytes()).unwrap();
        assert_eq!(file.ids_of_type("CARTESIAN_POINT"), vec![2, 5]);
    }

    #[test]
    fn truncated_file_errors() {
        let input = "ISO-10303-21;\nDATA;\n#1 = FOO(";
        assert!(Parser::parse(input.as_bytes()).is_err());
    }
}
