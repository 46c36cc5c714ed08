use log::debug;

use crate::{
    analyzer::{infer_type, Type},
    context::CompilationContext,
    error::{CompileError, CompileResult},
    lexer::{Token, TokenKind},
};

use super::{fold_constant, NodeId, NodeKind, Param, StatementList};

/// Deepest statement or expression nesting accepted. Later passes recurse
/// over the tree, so this bounds their stack use as well.
pub const MAX_NESTING: usize = 256;

/// Parsed compilation unit: the head of the top-level statement list.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Program {
    pub head: Option<NodeId>,
}

#[derive(Debug)]
pub struct Parser<'a> {
    tokens: Vec<Token>,
    pub(super) index: usize,
    pub(super) ctx: &'a mut CompilationContext,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, ctx: &'a mut CompilationContext) -> Self {
        Self {
            tokens,
            index: 0,
            ctx,
            depth: 0,
        }
    }

    pub fn parse(&mut self) -> CompileResult<Program> {
        self.parse_program()
    }

    pub(super) fn peek(&self) -> &TokenKind {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.index + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    pub(super) fn is_eof(&self) -> bool {
        *self.peek() == TokenKind::Eof
    }

    pub(super) fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.peek() != kind {
            return false;
        }
        self.index += 1;
        true
    }

    pub(super) fn unexpected(&self, expected: impl Into<String>) -> CompileError {
        let expected = expected.into();
        match self.tokens.get(self.index) {
            None
            | Some(Token {
                kind: TokenKind::Eof,
                ..
            }) => CompileError::UnexpectedEof(expected),
            Some(t) => CompileError::UnexpectedToken {
                expected,
                found: t.kind.to_string(),
                line: t.line,
            },
        }
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.index)
            .or(self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(0)
    }

    pub(super) fn too_deep(&self) -> CompileError {
        CompileError::NestingTooDeep {
            limit: MAX_NESTING,
            line: self.line(),
        }
    }

    /// Runs `f` one nesting level down.
    pub(super) fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> CompileResult<T>,
    ) -> CompileResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.too_deep());
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    pub(super) fn expect(&mut self, kind: &TokenKind) -> CompileResult<()> {
        if self.consume(kind) {
            Ok(())
        } else {
            Err(self.unexpected(kind.to_string()))
        }
    }

    fn expect_ident(&mut self) -> CompileResult<String> {
        if let TokenKind::Ident(name) = self.peek() {
            let name = name.clone();
            self.index += 1;
            return Ok(name);
        }
        Err(self.unexpected("identifier"))
    }

    fn consume_type(&mut self) -> Option<Type> {
        let ty = Type::from_keyword(self.peek())?;
        self.index += 1;
        Some(ty)
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        self.ctx.ast.allocate_node(kind)
    }

    /// program = stmt*
    fn parse_program(&mut self) -> CompileResult<Program> {
        let mut list = StatementList::default();

        while !self.is_eof() {
            let stmt = self.parse_stmt()?;
            list.push(&mut self.ctx.ast, stmt);
        }

        debug!(
            "parsed {} nodes, {} symbols",
            self.ctx.ast.len(),
            self.ctx.symbol_table.len()
        );
        Ok(Program { head: list.head() })
    }

    /// stmt = "var" type? ident "=" expr ";"
    ///      | ident "=" expr ";"
    ///      | ident "(" args ")" ";"
    ///      | "if" "(" expr ")" block ("else" (if | block))?
    ///      | "while" "(" expr ")" block
    ///      | "do" block "while" "(" expr ")" ";"?
    ///      | "for" "(" simple ";" expr ";" assign ")" block
    ///      | "func" ident "(" params ")" (":" type)? block
    ///      | "print" expr ";"
    ///      | "return" expr? ";"
    fn parse_stmt(&mut self) -> CompileResult<NodeId> {
        match self.peek() {
            TokenKind::Var => {
                let decl = self.parse_var_decl()?;
                self.expect(&TokenKind::SemiColon)?;
                Ok(decl)
            }
            TokenKind::Ident(_) if *self.peek_nth(1) == TokenKind::OpenParen => {
                let name = self.expect_ident()?;
                let call = self.parse_call(name)?;
                self.expect(&TokenKind::SemiColon)?;
                Ok(call)
            }
            TokenKind::Ident(_) => {
                let assign = self.parse_assign()?;
                self.expect(&TokenKind::SemiColon)?;
                Ok(assign)
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Func if self.depth == 0 => self.parse_func_def(),
            TokenKind::Func => Err(self.unexpected("statement (functions are top-level only)")),
            TokenKind::Print => self.parse_print(),
            TokenKind::Return => self.parse_return(),
            _ => Err(self.unexpected("statement")),
        }
    }

    /// block = "{" stmt* "}"
    fn parse_block(&mut self) -> CompileResult<Option<NodeId>> {
        self.expect(&TokenKind::OpenCurlyBrace)?;

        self.nested(|parser| {
            let mut list = StatementList::default();
            while !parser.consume(&TokenKind::CloseCurlyBrace) {
                if parser.is_eof() {
                    return Err(parser.unexpected(TokenKind::CloseCurlyBrace.to_string()));
                }
                let stmt = parser.parse_stmt()?;
                list.push(&mut parser.ctx.ast, stmt);
            }
            Ok(list.head())
        })
    }

    /// var_decl = "var" ("num" | "str" | "log")? ident "=" expr
    fn parse_var_decl(&mut self) -> CompileResult<NodeId> {
        self.expect(&TokenKind::Var)?;
        let declared = self.consume_type();
        if let (Some(keyword), TokenKind::Equal) = (declared, self.peek()) {
            return Err(CompileError::ReservedName(keyword.to_string()));
        }
        let name = self.expect_ident()?;
        self.expect(&TokenKind::Equal)?;
        let init = self.parse_expr()?;

        let ty = declared.unwrap_or_else(|| infer_type(&self.ctx.ast, &self.ctx.symbol_table, init));
        self.ctx.symbol_table.declare(&name, ty)?;
        if let Some(value) = fold_constant(&self.ctx.ast, init)? {
            self.ctx.symbol_table.set_value(&name, value);
        }
        debug!("declared {} as {}", name, ty);

        Ok(self.alloc(NodeKind::VarDecl { name, ty, init }))
    }

    /// assign = ident "=" expr
    fn parse_assign(&mut self) -> CompileResult<NodeId> {
        let name = self.expect_ident()?;
        if self.ctx.symbol_table.lookup(&name).is_none() {
            return Err(CompileError::UndeclaredIdentifier(name));
        }
        self.expect(&TokenKind::Equal)?;
        let expr = self.parse_expr()?;

        if let Some(value) = fold_constant(&self.ctx.ast, expr)? {
            self.ctx.symbol_table.set_value(&name, value);
        }

        Ok(self.alloc(NodeKind::Assign { name, expr }))
    }

    /// simple = var_decl | assign
    fn parse_simple_stmt(&mut self) -> CompileResult<NodeId> {
        if *self.peek() == TokenKind::Var {
            self.parse_var_decl()
        } else {
            self.parse_assign()
        }
    }

    fn parse_condition(&mut self) -> CompileResult<NodeId> {
        self.expect(&TokenKind::OpenParen)?;
        let condition = self.parse_expr()?;
        self.expect(&TokenKind::CloseParen)?;
        Ok(condition)
    }

    fn parse_if(&mut self) -> CompileResult<NodeId> {
        self.expect(&TokenKind::If)?;
        let condition = self.parse_condition()?;
        let then_branch = self.parse_block()?;

        let else_branch = if self.consume(&TokenKind::Else) {
            if *self.peek() == TokenKind::If {
                Some(self.nested(|parser| parser.parse_if())?)
            } else {
                self.parse_block()?
            }
        } else {
            None
        };

        Ok(self.alloc(NodeKind::If {
            condition,
            then_branch,
            else_branch,
        }))
    }

    fn parse_while(&mut self) -> CompileResult<NodeId> {
        self.expect(&TokenKind::While)?;
        let condition = self.parse_condition()?;
        let body = self.parse_block()?;
        Ok(self.alloc(NodeKind::While { condition, body }))
    }

    fn parse_do_while(&mut self) -> CompileResult<NodeId> {
        self.expect(&TokenKind::Do)?;
        let body = self.parse_block()?;
        self.expect(&TokenKind::While)?;
        let condition = self.parse_condition()?;
        self.consume(&TokenKind::SemiColon);
        Ok(self.alloc(NodeKind::DoWhile { body, condition }))
    }

    fn parse_for(&mut self) -> CompileResult<NodeId> {
        self.expect(&TokenKind::For)?;
        self.expect(&TokenKind::OpenParen)?;
        let init = self.parse_simple_stmt()?;
        self.expect(&TokenKind::SemiColon)?;
        let condition = self.parse_expr()?;
        self.expect(&TokenKind::SemiColon)?;
        let increment = self.parse_assign()?;
        self.expect(&TokenKind::CloseParen)?;
        let body = self.parse_block()?;

        Ok(self.alloc(NodeKind::For {
            init,
            condition,
            increment,
            body,
        }))
    }

    /// params = (type? ident ("," type? ident)*)?
    fn parse_params(&mut self) -> CompileResult<Vec<Param>> {
        let mut params = vec![];
        self.expect(&TokenKind::OpenParen)?;

        if !self.consume(&TokenKind::CloseParen) {
            loop {
                let ty = self.consume_type().unwrap_or(Type::Unknown);
                let name = self.expect_ident()?;
                params.push(Param { name, ty });
                if !self.consume(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::CloseParen)?;
        }

        Ok(params)
    }

    fn parse_func_def(&mut self) -> CompileResult<NodeId> {
        self.expect(&TokenKind::Func)?;
        let name = self.expect_ident()?;
        let params = self.parse_params()?;
        let return_type = if self.consume(&TokenKind::Colon) {
            self.consume_type()
                .ok_or_else(|| self.unexpected("type ('num', 'str' or 'log')"))?
        } else {
            Type::Unknown
        };

        self.ctx
            .symbol_table
            .declare_function(&name, params.clone(), return_type)?;
        for param in params.iter() {
            self.ctx.symbol_table.declare(&param.name, param.ty)?;
        }
        debug!("function {} with {} parameter(s)", name, params.len());

        let body = self.parse_block()?;
        Ok(self.alloc(NodeKind::FuncDef {
            name,
            params,
            body,
            return_type,
        }))
    }

    fn parse_print(&mut self) -> CompileResult<NodeId> {
        self.expect(&TokenKind::Print)?;
        let expr = self.parse_expr()?;
        self.expect(&TokenKind::SemiColon)?;
        Ok(self.alloc(NodeKind::Print(expr)))
    }

    fn parse_return(&mut self) -> CompileResult<NodeId> {
        self.expect(&TokenKind::Return)?;
        let expr = if self.consume(&TokenKind::SemiColon) {
            None
        } else {
            let expr = self.parse_expr()?;
            self.expect(&TokenKind::SemiColon)?;
            Some(expr)
        };
        Ok(self.alloc(NodeKind::Return(expr)))
    }
}
