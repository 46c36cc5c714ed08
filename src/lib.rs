pub mod analyzer;
pub mod codegen;
pub mod context;
pub mod error;
pub mod lexer;
pub mod parser;

use log::info;

use analyzer::SemanticVisitor;
use codegen::{Assembly, Codegen};
use context::{CompilationContext, CompileOptions};
use error::CompileResult;
use lexer::Lexer;
use parser::Parser;

/// Compiles cx source into an instruction stream for x86-64 Linux.
pub fn compile(source: &str, options: CompileOptions) -> CompileResult<Assembly> {
    let mut ctx = CompilationContext::new(options);
    compile_in(&mut ctx, source)
}

/// Like [`compile`], but leaves the AST, symbols and literal pool in `ctx`
/// for inspection. `ctx` should be fresh or [`CompilationContext::reset`].
pub fn compile_in(ctx: &mut CompilationContext, source: &str) -> CompileResult<Assembly> {
    let tokens = Lexer::tokenize(source)?;
    info!("lexed {} token(s)", tokens.len());

    let program = Parser::new(tokens, ctx).parse()?;
    SemanticVisitor::new(ctx).visit_program(program)?;

    Ok(Codegen::new(ctx).generate(program))
}
