mod arena;
mod ast;
mod expr;
mod parser;

pub use arena::*;
pub use ast::*;
pub use expr::*;
pub use parser::*;
