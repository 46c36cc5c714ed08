mod codegen;
mod instruction;
mod literal_pool;

pub use codegen::*;
pub use instruction::*;
pub use literal_pool::*;
