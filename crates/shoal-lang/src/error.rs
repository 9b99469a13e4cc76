use thiserror::Error;

/// Error codes prefixed by phase: L = lexer, P = parser, R = resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Lexer
    L001, // unexpected character
    L002, // unterminated string literal
    L003, // malformed number literal
    L004, // unterminated command substitution

    // Parser
    P001, // unexpected token
    P002, // missing expected token
    P003, // declaration without initializer

    // Resolver
    R001, // variable read in its own initializer
    R002, // break outside of a loop
    R003, // return outside of a function
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L001 => "L001",
            Self::L002 => "L002",
            Self::L003 => "L003",
            Self::L004 => "L004",
            Self::P001 => "P001",
            Self::P002 => "P002",
            Self::P003 => "P003",
            Self::R001 => "R001",
            Self::R002 => "R002",
            Self::R003 => "R003",
        }
    }
}

/// A compile-stage diagnostic (scan, parse, or resolve).
#[derive(Debug, Clone, Error)]
#[error("[{}] {line}:{column} — {message}", .code.as_str())]
pub struct Error {
    pub code: ErrorCode,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl Error {
    pub fn new(code: ErrorCode, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self { code, line, column, message: message.into() }
    }
}

// ─────────────────────────────────────────────────────────────────────────────

/// An evaluation failure. Fatal to the current top-level run; a REPL keeps the
/// environment accumulated by prior successful statements.
#[derive(Debug, Clone, Error)]
#[error("[runtime] line {line}: {message}")]
pub struct RuntimeError {
    pub line: usize,
    pub message: String,
}

impl RuntimeError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}
