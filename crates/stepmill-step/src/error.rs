//! Error type for STEP import.

use thiserror::Error;

/// Errors that can occur while reading a STEP file.
#[derive(Error, Debug)]
pub enum StepError {
    /// I/O error reading the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected character or malformed token.
    #[error("lexer error at line {line}, column {col}: {message}")]
    Lexer {
        /// Line number (1-indexed).
        line: usize,
        /// Column number (1-indexed).
        col: usize,
        /// What went wrong.
        message: String,
    },

    /// Unexpected token or malformed entity structure.
    #[error("parse error{}: {message}", entity.map(|id| format!(" at #{id}")).unwrap_or_default())]
    Parse {
        /// Entity where the error occurred, if known.
        entity: Option<u64>,
        /// What went wrong.
        message: String,
    },

    /// A referenced entity is absent from the data section.
    #[error("missing entity reference: #{0}")]
    MissingEntity(u64),

    /// Entity type the reader does not handle.
    #[error("unsupported entity type: {0}")]
    Unsupported(String),

    /// Expected one entity type, found another.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type name.
        expected: String,
        /// Actual type name.
        actual: String,
    },

    /// An entity resolved cleanly but describes something the mesh pipeline
    /// cannot use: a zero-length direction, a non-positive radius, a face
    /// without boundary loops.
    #[error("invalid definition at #{entity}: {message}")]
    Invalid {
        /// The offending entity.
        entity: u64,
        /// What is wrong with it.
        message: String,
    },

    /// The file contains no solids to convert.
    #[error("no solids found in STEP file")]
    NoSolids,
}

impl StepError {
    /// Build a lexer error.
    pub fn lexer(line: usize, col: usize, message: impl Into<String>) -> Self {
        Self::Lexer {
            line,
            col,
            message: message.into(),
        }
    }

    /// Build a parse error, optionally attached to an entity id.
    pub fn parse(entity: Option<u64>, message: impl Into<String>) -> Self {
        Self::Parse {
            entity,
            message: message.into(),
        }
    }

    /// Build an invalid-definition error for an entity.
    pub fn invalid(entity: u64, message: impl Into<String>) -> Self {
        Self::Invalid {
            entity,
            message: message.into(),
        }
    }

    /// Build a type-mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
