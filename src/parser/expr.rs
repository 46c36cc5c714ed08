use log::trace;

use crate::{
    error::{CompileError, CompileResult},
    lexer::TokenKind,
};

use super::{Ast, BinOpKind, LogicalOpKind, NodeId, NodeKind, Parser, RelOpKind, MAX_NESTING};

#[derive(Clone, Copy, Debug, PartialEq)]
enum Operator {
    Binary(BinOpKind),
    Relational(RelOpKind),
    Logical(LogicalOpKind),
}

impl Operator {
    fn from_token(kind: &TokenKind) -> Option<Operator> {
        Some(match kind {
            TokenKind::Plus => Operator::Binary(BinOpKind::Add),
            TokenKind::Minus => Operator::Binary(BinOpKind::Sub),
            TokenKind::Star => Operator::Binary(BinOpKind::Mul),
            TokenKind::Slash => Operator::Binary(BinOpKind::Div),
            TokenKind::Caret => Operator::Binary(BinOpKind::Pow),
            TokenKind::DoubleEqual => Operator::Relational(RelOpKind::Equal),
            TokenKind::NotEqual => Operator::Relational(RelOpKind::NotEqual),
            TokenKind::LessThan => Operator::Relational(RelOpKind::LessThan),
            TokenKind::LessEqual => Operator::Relational(RelOpKind::LessEqual),
            TokenKind::GreaterThan => Operator::Relational(RelOpKind::GreaterThan),
            TokenKind::GreaterEqual => Operator::Relational(RelOpKind::GreaterEqual),
            TokenKind::AndAnd => Operator::Logical(LogicalOpKind::And),
            TokenKind::OrOr => Operator::Logical(LogicalOpKind::Or),
            _ => return None,
        })
    }

    fn precedence(&self) -> u8 {
        match self {
            Operator::Binary(op) => op.precedence(),
            Operator::Relational(_) => RelOpKind::PRECEDENCE,
            Operator::Logical(_) => LogicalOpKind::PRECEDENCE,
        }
    }

    fn is_right_associative(&self) -> bool {
        matches!(self, Operator::Binary(op) if op.is_right_associative())
    }

    fn into_node(self, left: NodeId, right: NodeId) -> NodeKind {
        match self {
            Operator::Binary(op) => NodeKind::BinaryOp { op, left, right },
            Operator::Relational(op) => NodeKind::RelationalOp { op, left, right },
            Operator::Logical(op) => NodeKind::LogicalOp { op, left, right },
        }
    }
}

impl Parser<'_> {
    pub fn parse_expr(&mut self) -> CompileResult<NodeId> {
        self.parse_expression(0)
    }

    /// expression = primary (op expression)*
    ///
    /// Precedence climbing: an operator is folded into `left` only while it
    /// binds at least as tightly as `min_precedence`. The right operand of a
    /// left-associative operator is parsed one level tighter; a
    /// right-associative one recurses at its own level.
    pub fn parse_expression(&mut self, min_precedence: u8) -> CompileResult<NodeId> {
        self.nested(|parser| parser.climb(min_precedence))
    }

    fn climb(&mut self, min_precedence: u8) -> CompileResult<NodeId> {
        let mut left = self.parse_primary()?;

        while let Some(op) = Operator::from_token(self.peek()) {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.index += 1;

            let next_min = if op.is_right_associative() {
                precedence
            } else {
                precedence + 1
            };
            let right = self.parse_expression(next_min)?;
            trace!("operator {:?} at precedence {}", op, precedence);
            left = self.alloc_expr(op.into_node(left, right))?;
        }

        Ok(left)
    }

    /// primary = num | string | "true" | "false"
    ///         | "-" primary
    ///         | ident ("(" (expr ("," expr)*)? ")")?
    ///         | "(" expr ")"
    fn parse_primary(&mut self) -> CompileResult<NodeId> {
        let kind = match self.peek().clone() {
            TokenKind::Num(num) => NodeKind::NumberLiteral(num),
            TokenKind::Str(s) => NodeKind::StringLiteral(s),
            TokenKind::True => NodeKind::BooleanLiteral(true),
            TokenKind::False => NodeKind::BooleanLiteral(false),
            TokenKind::Minus => {
                self.index += 1;
                let zero = self.ctx.ast.allocate_node(NodeKind::NumberLiteral(0));
                let operand = self.parse_expression(BinOpKind::Pow.precedence())?;
                return self.alloc_expr(NodeKind::BinaryOp {
                    op: BinOpKind::Sub,
                    left: zero,
                    right: operand,
                });
            }
            TokenKind::OpenParen => {
                self.index += 1;
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::CloseParen)?;
                return Ok(expr);
            }
            TokenKind::Ident(name) => {
                self.index += 1;
                return self.parse_ident(name);
            }
            _ => return Err(self.unexpected("expression")),
        };
        self.index += 1;
        Ok(self.ctx.ast.allocate_node(kind))
    }

    /// Operator chains grow the tree without recursing here, so their height
    /// is checked against the same limit as nesting.
    fn alloc_expr(&mut self, kind: NodeKind) -> CompileResult<NodeId> {
        let id = self.ctx.ast.allocate_node(kind);
        if self.ctx.ast.height(id) > MAX_NESTING {
            return Err(self.too_deep());
        }
        Ok(id)
    }

    fn parse_ident(&mut self, name: String) -> CompileResult<NodeId> {
        if *self.peek() == TokenKind::OpenParen {
            return self.parse_call(name);
        }
        if self.ctx.symbol_table.lookup(&name).is_none() {
            return Err(CompileError::UndeclaredIdentifier(name));
        }
        Ok(self.ctx.ast.allocate_node(NodeKind::VarRef(name)))
    }

    /// call = ident "(" (expr ("," expr)*)? ")"
    pub(super) fn parse_call(&mut self, name: String) -> CompileResult<NodeId> {
        self.expect(&TokenKind::OpenParen)?;
        let mut args = vec![];

        if !self.consume(&TokenKind::CloseParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.consume(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::CloseParen)?;
        }

        Ok(self.ctx.ast.allocate_node(NodeKind::FuncCall { name, args }))
    }
}

/// Evaluates an expression made only of literals. `Ok(None)` means the value
/// depends on something unknown at compile time.
pub fn fold_constant(ast: &Ast, id: NodeId) -> CompileResult<Option<i64>> {
    match ast.kind(id) {
        NodeKind::NumberLiteral(n) => Ok(Some(*n)),
        NodeKind::BooleanLiteral(b) => Ok(Some(*b as i64)),
        NodeKind::BinaryOp { op, left, right } => {
            let l = fold_constant(ast, *left)?;
            let r = fold_constant(ast, *right)?;
            match (l, r) {
                (_, Some(0)) if *op == BinOpKind::Div => Err(CompileError::DivisionByZero),
                (Some(l), Some(r)) => Ok(op.apply(l, r)),
                _ => Ok(None),
            }
        }
        NodeKind::RelationalOp { op, left, right } => {
            let l = fold_constant(ast, *left)?;
            let r = fold_constant(ast, *right)?;
            Ok(l.zip(r).map(|(l, r)| op.evaluate(l, r) as i64))
        }
        NodeKind::LogicalOp { op, left, right } => {
            let l = fold_constant(ast, *left)?;
            let r = fold_constant(ast, *right)?;
            Ok(l.zip(r).map(|(l, r)| op.evaluate(l, r) as i64))
        }
        _ => Ok(None),
    }
}
