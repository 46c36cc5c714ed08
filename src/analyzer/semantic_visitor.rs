use log::debug;

use crate::{
    context::CompilationContext,
    error::{CompileError, CompileResult},
    parser::{NodeId, NodeKind, Program},
};

use super::{infer_type, Symbol, SymbolKind, Type};

/// Walks the finished AST against the symbol table. Every problem is
/// recorded and the walk goes on, so one run reports all of them.
pub struct SemanticVisitor<'a> {
    ctx: &'a CompilationContext,
    errors: Vec<CompileError>,
    /// Name and return type of the function whose body is being visited.
    current_function: Option<(String, Type)>,
}

impl<'a> SemanticVisitor<'a> {
    pub fn new(ctx: &'a CompilationContext) -> Self {
        Self {
            ctx,
            errors: vec![],
            current_function: None,
        }
    }

    pub fn visit_program(mut self, program: Program) -> CompileResult<()> {
        self.visit_stmts(program.head);
        debug!("semantic check found {} error(s)", self.errors.len());
        CompileError::from_batch(self.errors)
    }

    fn type_of(&self, id: NodeId) -> Type {
        infer_type(&self.ctx.ast, &self.ctx.symbol_table, id)
    }

    fn lookup(&self, name: &str) -> Option<&'a Symbol> {
        let ctx = self.ctx;
        ctx.symbol_table.lookup(name)
    }

    fn expect_type(&mut self, context: impl FnOnce() -> String, expected: Type, found: Type) {
        if !expected.is_compatible(&found) {
            self.errors.push(CompileError::TypeMismatch {
                context: context(),
                expected,
                found,
            });
        }
    }

    fn visit_stmts(&mut self, head: Option<NodeId>) {
        let ctx = self.ctx;
        for stmt in ctx.ast.statements(head) {
            self.visit_stmt(stmt);
        }
    }

    fn visit_stmt(&mut self, id: NodeId) {
        let ctx = self.ctx;
        match ctx.ast.kind(id) {
            NodeKind::VarDecl { name, ty, init } => {
                self.visit_expr(*init);
                if self.lookup(name).is_none() {
                    self.errors
                        .push(CompileError::UndeclaredIdentifier(name.clone()));
                }
                let found = self.type_of(*init);
                self.expect_type(|| format!("declaration of '{}'", name), *ty, found);
            }
            NodeKind::Assign { name, expr } => {
                self.visit_expr(*expr);
                match self.lookup(name) {
                    None => self
                        .errors
                        .push(CompileError::UndeclaredIdentifier(name.clone())),
                    Some(symbol) if symbol.is_function() => {
                        self.errors.push(CompileError::NotAVariable(name.clone()))
                    }
                    Some(symbol) => {
                        let found = self.type_of(*expr);
                        self.expect_type(
                            || format!("assignment to '{}'", name),
                            symbol.ty,
                            found,
                        );
                    }
                }
            }
            NodeKind::Print(expr) => self.visit_expr(*expr),
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.visit_condition(*condition, "if");
                self.visit_stmts(*then_branch);
                self.visit_stmts(*else_branch);
            }
            NodeKind::While { condition, body } => {
                self.visit_condition(*condition, "while");
                self.visit_stmts(*body);
            }
            NodeKind::DoWhile { body, condition } => {
                self.visit_stmts(*body);
                self.visit_condition(*condition, "do-while");
            }
            NodeKind::For {
                init,
                condition,
                increment,
                body,
            } => {
                self.visit_stmt(*init);
                self.visit_condition(*condition, "for");
                self.visit_stmt(*increment);
                self.visit_stmts(*body);
            }
            NodeKind::FuncDef {
                name,
                body,
                return_type,
                ..
            } => {
                let outer = self
                    .current_function
                    .replace((name.clone(), *return_type));
                self.visit_stmts(*body);
                self.current_function = outer;
            }
            NodeKind::FuncCall { name, args } => self.visit_call(name, args),
            NodeKind::Return(expr) => {
                let Some(expr) = expr else {
                    return;
                };
                self.visit_expr(*expr);
                if let Some((name, return_type)) = self.current_function.clone() {
                    let found = self.type_of(*expr);
                    self.expect_type(|| format!("return from '{}'", name), return_type, found);
                }
            }
            kind => unreachable!("{:?} is not a statement", kind),
        }
    }

    fn visit_condition(&mut self, condition: NodeId, context: &str) {
        self.visit_expr(condition);
        let found = self.type_of(condition);
        if found == Type::String {
            self.errors.push(CompileError::TypeMismatch {
                context: format!("{} condition", context),
                expected: Type::Boolean,
                found,
            });
        }
    }

    fn visit_expr(&mut self, id: NodeId) {
        let ctx = self.ctx;
        match ctx.ast.kind(id) {
            NodeKind::NumberLiteral(_)
            | NodeKind::StringLiteral(_)
            | NodeKind::BooleanLiteral(_) => {}
            NodeKind::VarRef(name) => match self.lookup(name) {
                None => self
                    .errors
                    .push(CompileError::UndeclaredIdentifier(name.clone())),
                Some(symbol) if symbol.is_function() => {
                    self.errors.push(CompileError::NotAVariable(name.clone()))
                }
                Some(_) => {}
            },
            NodeKind::BinaryOp { op, left, right } => {
                for operand in [*left, *right] {
                    self.visit_expr(operand);
                    let found = self.type_of(operand);
                    self.expect_type(|| format!("operand of '{}'", op), Type::Number, found);
                }
            }
            NodeKind::RelationalOp { op, left, right } => {
                self.visit_expr(*left);
                self.visit_expr(*right);
                let (l, r) = (self.type_of(*left), self.type_of(*right));
                for found in [l, r] {
                    if found == Type::String {
                        self.errors.push(CompileError::TypeMismatch {
                            context: format!("operand of '{}'", op),
                            expected: Type::Number,
                            found,
                        });
                    }
                }
                if l != Type::String && r != Type::String {
                    self.expect_type(|| format!("comparison '{}'", op), l, r);
                }
            }
            NodeKind::LogicalOp { op, left, right } => {
                for operand in [*left, *right] {
                    self.visit_expr(operand);
                    let found = self.type_of(operand);
                    if found == Type::String {
                        self.errors.push(CompileError::TypeMismatch {
                            context: format!("operand of '{}'", op),
                            expected: Type::Boolean,
                            found,
                        });
                    }
                }
            }
            NodeKind::FuncCall { name, args } => self.visit_call(name, args),
            kind => unreachable!("{:?} is not an expression", kind),
        }
    }

    fn visit_call(&mut self, name: &str, args: &[NodeId]) {
        for &arg in args {
            self.visit_expr(arg);
        }

        let params = match self.lookup(name).map(|s| &s.kind) {
            None => {
                self.errors
                    .push(CompileError::UndefinedFunction(name.to_string()));
                return;
            }
            Some(SymbolKind::Variable) => {
                self.errors.push(CompileError::NotAFunction(name.to_string()));
                return;
            }
            Some(SymbolKind::Function { params }) => params,
        };

        if params.len() != args.len() {
            self.errors.push(CompileError::ArityMismatch {
                name: name.to_string(),
                expected: params.len(),
                found: args.len(),
            });
            return;
        }
        for (param, &arg) in params.iter().zip(args) {
            let found = self.type_of(arg);
            self.expect_type(
                || format!("argument '{}' of '{}'", param.name, name),
                param.ty,
                found,
            );
        }
    }
}
