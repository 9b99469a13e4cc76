pub mod analysis;
pub mod error;
pub mod runtime;
pub mod syntax;

pub use error::{Error, ErrorCode, RuntimeError};
pub use runtime::interpreter::Interpreter;
pub use runtime::shell::{CommandRunner, SystemRunner};
pub use runtime::value::Value;
pub use syntax::token::{Token, TokenKind};

use analysis::{Locals, resolve};
use syntax::ast::Stmt;

/// A compiled program: statements plus the resolver's hop table.
/// Produced by `compile`, consumed by `Interpreter::run`.
pub struct Program {
    pub(crate) stmts: Vec<Stmt>,
    pub(crate) locals: Locals,
}

/// Scan, parse, and resolve source text. A scan error is fatal to the whole
/// scan; parse errors are collected across statements; a resolver error
/// aborts resolution. In every case nothing partially-compiled escapes.
pub fn compile(source: &str) -> Result<Program, Vec<Error>> {
    let tokens = syntax::lexer::Lexer::new(source)
        .tokenize()
        .map_err(|e| vec![e])?;
    let stmts = syntax::parser::Parser::new(tokens).parse()?;
    let locals = resolve(&stmts).map_err(|e| vec![e])?;
    Ok(Program { stmts, locals })
}
