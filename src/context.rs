use crate::{analyzer::SymbolTable, codegen::LiteralPool, parser::Ast};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CompileOptions {
    /// Compare counted loop conditions against their immediate directly.
    pub peephole: bool,
}

/// Everything one compilation owns. Parser, checker and generator borrow it in
/// turn; dropping it (or calling `reset`) releases the whole unit at once.
#[derive(Debug, Default)]
pub struct CompilationContext {
    pub ast: Ast,
    pub symbol_table: SymbolTable,
    pub literal_pool: LiteralPool,
    pub options: CompileOptions,
}

impl CompilationContext {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn reset(&mut self) {
        self.ast.release_all();
        self.symbol_table.reset();
        self.literal_pool.reset();
    }
}
