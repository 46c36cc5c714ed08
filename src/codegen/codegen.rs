use std::collections::HashMap;

use log::{debug, trace};

use crate::{
    analyzer::{infer_type, Type},
    context::CompilationContext,
    parser::{node_index, Ast, NodeId, NodeKind, Program},
};

use super::{Assembly, Instruction, Label, Runtime};

pub struct Codegen<'a> {
    ctx: &'a mut CompilationContext,
    /// False during the collection pass: the walk only fills the literal pool.
    emitting: bool,
    in_function: bool,
    /// Slots each function writes: parameters first, then its locals.
    frames: HashMap<String, Frame>,
    text: Vec<Instruction>,
}

#[derive(Clone, Debug, Default)]
struct Frame {
    params: Vec<String>,
    locals: Vec<String>,
}

impl Frame {
    fn slots(&self) -> impl DoubleEndedIterator<Item = &String> {
        self.params.iter().chain(self.locals.iter())
    }
}

/// Names declared anywhere inside a statement list.
fn collect_locals(ast: &Ast, head: Option<NodeId>, locals: &mut Vec<String>) {
    for stmt in ast.statements(head) {
        match ast.kind(stmt) {
            NodeKind::VarDecl { name, .. } => locals.push(name.clone()),
            NodeKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                collect_locals(ast, *then_branch, locals);
                collect_locals(ast, *else_branch, locals);
            }
            NodeKind::While { body, .. } | NodeKind::DoWhile { body, .. } => {
                collect_locals(ast, *body, locals)
            }
            NodeKind::For { init, body, .. } => {
                collect_locals(ast, Some(*init), locals);
                collect_locals(ast, *body, locals);
            }
            _ => {}
        }
    }
}

impl<'a> Codegen<'a> {
    pub fn new(ctx: &'a mut CompilationContext) -> Self {
        Self {
            ctx,
            emitting: false,
            in_function: false,
            frames: HashMap::new(),
            text: vec![],
        }
    }

    pub fn generate(mut self, program: Program) -> Assembly {
        self.collect_frames(program);

        self.emitting = false;
        self.gen_program(program);
        debug!(
            "collection pass pooled {} string(s)",
            self.ctx.literal_pool.len()
        );

        self.emitting = true;
        self.gen_program(program);
        debug!("emission pass produced {} instruction(s)", self.text.len());

        Assembly {
            variables: self
                .ctx
                .symbol_table
                .variables()
                .map(|s| s.name.clone())
                .collect(),
            strings: self.ctx.literal_pool.strings().to_vec(),
            text: self.text,
        }
    }

    fn collect_frames(&mut self, program: Program) {
        let ast = &self.ctx.ast;
        for stmt in ast.statements(program.head) {
            if let NodeKind::FuncDef {
                name, params, body, ..
            } = ast.kind(stmt)
            {
                let mut frame = Frame {
                    params: params.iter().map(|p| p.name.clone()).collect(),
                    locals: vec![],
                };
                collect_locals(ast, *body, &mut frame.locals);
                self.frames.insert(name.clone(), frame);
            }
        }
    }

    fn emit(&mut self, instruction: Instruction) {
        if self.emitting {
            trace!("{:?}", instruction);
            self.text.push(instruction);
        }
    }

    fn kind(&self, id: NodeId) -> NodeKind {
        self.ctx.ast.kind(id).clone()
    }

    fn gen_program(&mut self, program: Program) {
        let stmts: Vec<_> = self.ctx.ast.statements(program.head).collect();

        for &stmt in stmts.iter() {
            if let NodeKind::FuncDef { name, body, .. } = self.kind(stmt) {
                self.gen_func_def(name, body);
            }
        }

        self.emit(Instruction::Label(Label::Entry));
        for &stmt in stmts.iter() {
            self.gen_stmt(stmt);
        }
        self.emit(Instruction::LoadImm(0));
        self.emit(Instruction::Exit);
    }

    fn gen_block(&mut self, head: Option<NodeId>) {
        let stmts: Vec<_> = self.ctx.ast.statements(head).collect();
        for stmt in stmts {
            self.gen_stmt(stmt);
        }
    }

    fn gen_stmt(&mut self, id: NodeId) {
        match self.kind(id) {
            NodeKind::VarDecl { name, init: expr, .. } | NodeKind::Assign { name, expr } => {
                self.gen_expr(expr);
                self.emit(Instruction::StoreVar(name));
            }
            NodeKind::Print(expr) => self.gen_print(expr),
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => self.gen_if(id, condition, then_branch, else_branch),
            NodeKind::While { condition, body } => {
                let (start, end) = loop_labels(id);
                self.emit(Instruction::Label(start.clone()));
                self.gen_loop_condition(condition, end.clone());
                self.gen_block(body);
                self.emit(Instruction::Jump(start));
                self.emit(Instruction::Label(end));
            }
            NodeKind::DoWhile { body, condition } => {
                let (start, end) = loop_labels(id);
                self.emit(Instruction::Label(start.clone()));
                self.gen_block(body);
                self.gen_expr(condition);
                self.emit(Instruction::JumpIfZero(end.clone()));
                self.emit(Instruction::Jump(start));
                self.emit(Instruction::Label(end));
            }
            NodeKind::For {
                init,
                condition,
                increment,
                body,
            } => {
                let (start, end) = loop_labels(id);
                self.gen_stmt(init);
                self.emit(Instruction::Label(start.clone()));
                self.gen_loop_condition(condition, end.clone());
                self.gen_block(body);
                self.gen_stmt(increment);
                self.emit(Instruction::Jump(start));
                self.emit(Instruction::Label(end));
            }
            // emitted ahead of the entry point
            NodeKind::FuncDef { .. } => {}
            NodeKind::FuncCall { name, args } => self.gen_call(name, args),
            NodeKind::Return(expr) => {
                match expr {
                    Some(expr) => self.gen_expr(expr),
                    None => self.emit(Instruction::LoadImm(0)),
                }
                if self.in_function {
                    self.emit(Instruction::Return);
                } else {
                    self.emit(Instruction::Exit);
                }
            }
            kind => unreachable!("{:?} is not a statement", kind),
        }
    }

    fn gen_expr(&mut self, id: NodeId) {
        match self.kind(id) {
            NodeKind::NumberLiteral(n) => self.emit(Instruction::LoadImm(n)),
            NodeKind::BooleanLiteral(b) => self.emit(Instruction::LoadImm(b as i64)),
            NodeKind::StringLiteral(s) => {
                let index = self.ctx.literal_pool.intern(&s);
                self.emit(Instruction::LoadStr(index));
            }
            NodeKind::VarRef(name) => self.emit(Instruction::LoadVar(name)),
            NodeKind::BinaryOp { op, left, right } => {
                self.gen_operands(left, right);
                self.emit(Instruction::Arith(op));
            }
            NodeKind::RelationalOp { op, left, right } => {
                self.gen_operands(left, right);
                self.emit(Instruction::Compare(op));
            }
            NodeKind::LogicalOp { op, left, right } => {
                self.gen_operands(left, right);
                self.emit(Instruction::Logic(op));
            }
            NodeKind::FuncCall { name, args } => self.gen_call(name, args),
            kind => unreachable!("{:?} is not an expression", kind),
        }
    }

    /// Leaves `left` in rax and `right` in rbx.
    fn gen_operands(&mut self, left: NodeId, right: NodeId) {
        self.gen_expr(right);
        self.emit(Instruction::Push);
        self.gen_expr(left);
        self.emit(Instruction::PopScratch);
    }

    fn gen_print(&mut self, expr: NodeId) {
        self.gen_expr(expr);
        let helper = match infer_type(&self.ctx.ast, &self.ctx.symbol_table, expr) {
            Type::String => Runtime::PrintStr,
            Type::Boolean => Runtime::PrintLog,
            Type::Number | Type::Unknown => Runtime::PrintNum,
        };
        self.emit(Instruction::CallRuntime(helper));
        self.emit(Instruction::CallRuntime(Runtime::PrintNewline));
    }

    fn gen_if(
        &mut self,
        id: NodeId,
        condition: NodeId,
        then_branch: Option<NodeId>,
        else_branch: Option<NodeId>,
    ) {
        let index = node_index(id);
        let else_label = Label::Else(index);
        let end_label = Label::EndIf(index);

        self.gen_expr(condition);
        if else_branch.is_some() {
            self.emit(Instruction::JumpIfZero(else_label.clone()));
        } else {
            self.emit(Instruction::JumpIfZero(end_label.clone()));
        }
        self.gen_block(then_branch);

        if else_branch.is_some() {
            self.emit(Instruction::Jump(end_label.clone()));
            self.emit(Instruction::Label(else_label));
            self.gen_block(else_branch);
        }
        self.emit(Instruction::Label(end_label));
    }

    /// Branches to `end` when the condition is false. With peephole enabled, a
    /// comparison against a number literal is tested against the immediate.
    fn gen_loop_condition(&mut self, condition: NodeId, end: Label) {
        if self.ctx.options.peephole {
            if let NodeKind::RelationalOp { op, left, right } = self.kind(condition) {
                if let NodeKind::NumberLiteral(n) = self.kind(right) {
                    if let Ok(imm) = i32::try_from(n) {
                        self.gen_expr(left);
                        self.emit(Instruction::JumpUnless {
                            op,
                            imm,
                            target: end,
                        });
                        return;
                    }
                }
            }
        }
        self.gen_expr(condition);
        self.emit(Instruction::JumpIfZero(end));
    }

    fn gen_func_def(&mut self, name: String, body: Option<NodeId>) {
        self.in_function = true;
        self.emit(Instruction::Label(Label::Function(name)));
        self.emit(Instruction::Prologue);
        self.gen_block(body);
        self.emit(Instruction::LoadImm(0));
        self.emit(Instruction::Return);
        self.in_function = false;
    }

    /// The callee's slots are saved on the stack before the arguments are
    /// evaluated and restored through the scratch register afterwards, so an
    /// active call of the same function keeps its values and the result stays
    /// in rax. Arguments are pushed left to right, then popped into the
    /// parameter slots in reverse.
    fn gen_call(&mut self, name: String, args: Vec<NodeId>) {
        let frame = self.frames.get(&name).cloned().unwrap_or_default();

        for slot in frame.slots() {
            self.emit(Instruction::LoadVar(slot.clone()));
            self.emit(Instruction::Push);
        }

        for &arg in args.iter() {
            self.gen_expr(arg);
            self.emit(Instruction::Push);
        }
        for i in (0..args.len()).rev() {
            self.emit(Instruction::Pop);
            if let Some(param) = frame.params.get(i) {
                self.emit(Instruction::StoreVar(param.clone()));
            }
        }
        self.emit(Instruction::Call(Label::Function(name.clone())));

        for slot in frame.slots().rev() {
            self.emit(Instruction::PopScratch);
            self.emit(Instruction::StoreScratch(slot.clone()));
        }
    }
}

fn loop_labels(id: NodeId) -> (Label, Label) {
    let index = node_index(id);
    (Label::LoopStart(index), Label::LoopEnd(index))
}
