// Parser module for extracting declarations from PHP source files

pub mod ast;
pub mod lexer;
pub mod literal;
mod php;

pub use ast::*;
pub use php::{parse_header, parse_imports, parse_namespace, parse_parameters, PhpParser};
