use std::fmt;

use crate::{
    lexer::TokenKind,
    parser::{Ast, NodeId, NodeKind},
};

use super::SymbolTable;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Number,
    String,
    Boolean,
    Unknown,
}

impl Type {
    pub fn from_keyword(kind: &TokenKind) -> Option<Type> {
        match kind {
            TokenKind::NumType => Some(Type::Number),
            TokenKind::StrType => Some(Type::String),
            TokenKind::LogType => Some(Type::Boolean),
            _ => None,
        }
    }

    /// `Unknown` is compatible with everything.
    pub fn is_compatible(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Unknown, _) | (_, Type::Unknown) => true,
            (t1, t2) => t1 == t2,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Type::Number => "num",
            Type::String => "str",
            Type::Boolean => "log",
            Type::Unknown => "unknown",
        })
    }
}

/// Structural type of an expression node.
pub fn infer_type(ast: &Ast, symbol_table: &SymbolTable, id: NodeId) -> Type {
    match ast.kind(id) {
        NodeKind::NumberLiteral(_) => Type::Number,
        NodeKind::StringLiteral(_) => Type::String,
        NodeKind::BooleanLiteral(_) => Type::Boolean,
        NodeKind::VarRef(name) => symbol_table.type_of(name).unwrap_or(Type::Unknown),
        NodeKind::BinaryOp { .. } => Type::Number,
        NodeKind::RelationalOp { .. } | NodeKind::LogicalOp { .. } => Type::Boolean,
        NodeKind::FuncCall { name, .. } => symbol_table.type_of(name).unwrap_or(Type::Unknown),
        _ => Type::Unknown,
    }
}
