use std::fmt;

use crate::analyzer::Type;

use super::NodeId;

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Following statement in the enclosing list. Expression nodes leave it unset.
    pub next: Option<NodeId>,
    /// Longest path down through `children`, counting this node.
    pub height: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

/// Statement bodies are the head of a `next`-linked list; `None` is an empty body.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    NumberLiteral(i64),
    StringLiteral(String),
    BooleanLiteral(bool),
    VarRef(String),
    BinaryOp {
        op: BinOpKind,
        left: NodeId,
        right: NodeId,
    },
    LogicalOp {
        op: LogicalOpKind,
        left: NodeId,
        right: NodeId,
    },
    RelationalOp {
        op: RelOpKind,
        left: NodeId,
        right: NodeId,
    },

    Assign {
        name: String,
        expr: NodeId,
    },
    VarDecl {
        name: String,
        ty: Type,
        init: NodeId,
    },
    Print(NodeId),
    If {
        condition: NodeId,
        then_branch: Option<NodeId>,
        else_branch: Option<NodeId>,
    },
    While {
        condition: NodeId,
        body: Option<NodeId>,
    },
    DoWhile {
        body: Option<NodeId>,
        condition: NodeId,
    },
    For {
        init: NodeId,
        condition: NodeId,
        increment: NodeId,
        body: Option<NodeId>,
    },
    FuncDef {
        name: String,
        params: Vec<Param>,
        body: Option<NodeId>,
        return_type: Type,
    },
    FuncCall {
        name: String,
        args: Vec<NodeId>,
    },
    Return(Option<NodeId>),
}

impl NodeKind {
    /// Substructure edges, in evaluation order. `next` is not included.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::NumberLiteral(_)
            | NodeKind::StringLiteral(_)
            | NodeKind::BooleanLiteral(_)
            | NodeKind::VarRef(_) => vec![],
            NodeKind::BinaryOp { left, right, .. }
            | NodeKind::LogicalOp { left, right, .. }
            | NodeKind::RelationalOp { left, right, .. } => vec![*left, *right],
            NodeKind::Assign { expr, .. } => vec![*expr],
            NodeKind::VarDecl { init, .. } => vec![*init],
            NodeKind::Print(expr) => vec![*expr],
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => std::iter::once(*condition)
                .chain(*then_branch)
                .chain(*else_branch)
                .collect(),
            NodeKind::While { condition, body } => std::iter::once(*condition).chain(*body).collect(),
            NodeKind::DoWhile { body, condition } => {
                body.iter().copied().chain(std::iter::once(*condition)).collect()
            }
            NodeKind::For {
                init,
                condition,
                increment,
                body,
            } => vec![*init, *condition, *increment]
                .into_iter()
                .chain(*body)
                .collect(),
            NodeKind::FuncDef { body, .. } => body.iter().copied().collect(),
            NodeKind::FuncCall { args, .. } => args.clone(),
            NodeKind::Return(expr) => expr.iter().copied().collect(),
        }
    }

    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            NodeKind::Assign { .. }
                | NodeKind::VarDecl { .. }
                | NodeKind::Print(_)
                | NodeKind::If { .. }
                | NodeKind::While { .. }
                | NodeKind::DoWhile { .. }
                | NodeKind::For { .. }
                | NodeKind::FuncDef { .. }
                | NodeKind::FuncCall { .. }
                | NodeKind::Return(_)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinOpKind {
    pub fn precedence(&self) -> u8 {
        match self {
            BinOpKind::Add | BinOpKind::Sub => 5,
            BinOpKind::Mul | BinOpKind::Div => 6,
            BinOpKind::Pow => 7,
        }
    }

    pub fn is_right_associative(&self) -> bool {
        *self == BinOpKind::Pow
    }

    /// `None` on division by zero. Arithmetic wraps on overflow and a negative
    /// exponent yields 0.
    pub fn apply(&self, left: i64, right: i64) -> Option<i64> {
        Some(match self {
            BinOpKind::Add => left.wrapping_add(right),
            BinOpKind::Sub => left.wrapping_sub(right),
            BinOpKind::Mul => left.wrapping_mul(right),
            BinOpKind::Div if right == 0 => return None,
            BinOpKind::Div => left.wrapping_div(right),
            BinOpKind::Pow => power(left, right),
        })
    }
}

fn power(mut base: i64, mut exp: i64) -> i64 {
    if exp < 0 {
        return 0;
    }
    let mut acc: i64 = 1;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc.wrapping_mul(base);
        }
        base = base.wrapping_mul(base);
        exp >>= 1;
    }
    acc
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelOpKind {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl RelOpKind {
    pub const PRECEDENCE: u8 = 4;

    pub fn evaluate(&self, left: i64, right: i64) -> bool {
        match self {
            RelOpKind::Equal => left == right,
            RelOpKind::NotEqual => left != right,
            RelOpKind::LessThan => left < right,
            RelOpKind::LessEqual => left <= right,
            RelOpKind::GreaterThan => left > right,
            RelOpKind::GreaterEqual => left >= right,
        }
    }

    /// The comparison that holds exactly when `self` does not.
    pub fn inverse(&self) -> RelOpKind {
        match self {
            RelOpKind::Equal => RelOpKind::NotEqual,
            RelOpKind::NotEqual => RelOpKind::Equal,
            RelOpKind::LessThan => RelOpKind::GreaterEqual,
            RelOpKind::LessEqual => RelOpKind::GreaterThan,
            RelOpKind::GreaterThan => RelOpKind::LessEqual,
            RelOpKind::GreaterEqual => RelOpKind::LessThan,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogicalOpKind {
    And,
    Or,
}

impl LogicalOpKind {
    pub const PRECEDENCE: u8 = 3;

    pub fn evaluate(&self, left: i64, right: i64) -> bool {
        match self {
            LogicalOpKind::And => left != 0 && right != 0,
            LogicalOpKind::Or => left != 0 || right != 0,
        }
    }
}

impl fmt::Display for BinOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mul => "*",
            BinOpKind::Div => "/",
            BinOpKind::Pow => "^",
        })
    }
}

impl fmt::Display for RelOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RelOpKind::Equal => "==",
            RelOpKind::NotEqual => "!=",
            RelOpKind::LessThan => "<",
            RelOpKind::LessEqual => "<=",
            RelOpKind::GreaterThan => ">",
            RelOpKind::GreaterEqual => ">=",
        })
    }
}

impl fmt::Display for LogicalOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogicalOpKind::And => "&&",
            LogicalOpKind::Or => "||",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic() {
        assert_eq!(BinOpKind::Add.apply(2, 3), Some(5));
        assert_eq!(BinOpKind::Sub.apply(2, 3), Some(-1));
        assert_eq!(BinOpKind::Div.apply(7, 2), Some(3));
        assert_eq!(BinOpKind::Div.apply(-7, 2), Some(-3));
        assert_eq!(BinOpKind::Div.apply(1, 0), None);
        assert_eq!(BinOpKind::Pow.apply(2, 10), Some(1024));
        assert_eq!(BinOpKind::Pow.apply(5, 0), Some(1));
        assert_eq!(BinOpKind::Pow.apply(2, -1), Some(0));
        assert_eq!(BinOpKind::Add.apply(i64::MAX, 1), Some(i64::MIN));
    }

    #[test]
    fn inverse_is_the_negation() {
        let ops = [
            RelOpKind::Equal,
            RelOpKind::NotEqual,
            RelOpKind::LessThan,
            RelOpKind::LessEqual,
            RelOpKind::GreaterThan,
            RelOpKind::GreaterEqual,
        ];
        for op in ops {
            for (a, b) in [(1, 2), (2, 2), (3, 2)] {
                assert_eq!(op.inverse().evaluate(a, b), !op.evaluate(a, b), "{op} {a} {b}");
            }
        }
    }
}
