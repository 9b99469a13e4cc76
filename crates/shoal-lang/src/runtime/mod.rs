pub mod builtins;
pub mod callable;
pub mod env;
pub mod interpreter;
pub mod shell;
pub mod value;
