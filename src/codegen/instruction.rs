use std::fmt;

use crate::parser::{BinOpKind, LogicalOpKind, RelOpKind};

/// Jump targets. Block labels carry the id of the node that owns them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Label {
    Else(u32),
    EndIf(u32),
    LoopStart(u32),
    LoopEnd(u32),
    Function(String),
    Entry,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Else(id) => write!(f, ".else_{}", id),
            Label::EndIf(id) => write!(f, ".endif_{}", id),
            Label::LoopStart(id) => write!(f, ".loop_start_{}", id),
            Label::LoopEnd(id) => write!(f, ".loop_end_{}", id),
            Label::Function(name) => write!(f, "fn_{}", name),
            Label::Entry => write!(f, "_start"),
        }
    }
}

/// Helpers bundled into every output file. Each takes its argument in `rdi`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Runtime {
    PrintNum,
    PrintStr,
    PrintLog,
    PrintNewline,
}

impl Runtime {
    pub fn symbol(&self) -> &'static str {
        match self {
            Runtime::PrintNum => "print_num",
            Runtime::PrintStr => "print_str",
            Runtime::PrintLog => "print_log",
            Runtime::PrintNewline => "print_newline",
        }
    }
}

/// One step of the accumulator machine: `rax` holds the current value, `rbx`
/// is the scratch operand and the hardware stack stages pending operands.
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    Label(Label),
    LoadImm(i64),
    LoadVar(String),
    /// Address of the pooled string with this index.
    LoadStr(usize),
    StoreVar(String),
    /// Stores rbx, leaving rax untouched.
    StoreScratch(String),
    Push,
    /// pop rax
    Pop,
    /// pop rbx
    PopScratch,
    /// rax = rax <op> rbx
    Arith(BinOpKind),
    /// rax = (rax <op> rbx) as 0/1
    Compare(RelOpKind),
    Logic(LogicalOpKind),
    JumpIfZero(Label),
    /// Branches to `target` unless `rax <op> imm` holds.
    JumpUnless {
        op: RelOpKind,
        imm: i32,
        target: Label,
    },
    Jump(Label),
    Call(Label),
    CallRuntime(Runtime),
    Prologue,
    Return,
    /// Ends the process with `rax` as status.
    Exit,
}

fn condition_code(op: RelOpKind) -> &'static str {
    match op {
        RelOpKind::Equal => "e",
        RelOpKind::NotEqual => "ne",
        RelOpKind::LessThan => "l",
        RelOpKind::LessEqual => "le",
        RelOpKind::GreaterThan => "g",
        RelOpKind::GreaterEqual => "ge",
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Label(label) => write!(f, "{}:", label),
            Instruction::LoadImm(n) => write!(f, "  mov rax, {}", n),
            Instruction::LoadVar(name) => write!(f, "  mov rax, [rel var_{}]", name),
            Instruction::LoadStr(i) => write!(f, "  lea rax, [rel str_{}]", i),
            Instruction::StoreVar(name) => write!(f, "  mov [rel var_{}], rax", name),
            Instruction::StoreScratch(name) => write!(f, "  mov [rel var_{}], rbx", name),
            Instruction::Push => write!(f, "  push rax"),
            Instruction::Pop => write!(f, "  pop rax"),
            Instruction::PopScratch => write!(f, "  pop rbx"),
            Instruction::Arith(op) => match op {
                BinOpKind::Add => write!(f, "  add rax, rbx"),
                BinOpKind::Sub => write!(f, "  sub rax, rbx"),
                BinOpKind::Mul => write!(f, "  imul rax, rbx"),
                BinOpKind::Div => {
                    writeln!(f, "  cqo")?;
                    write!(f, "  idiv rbx")
                }
                BinOpKind::Pow => {
                    writeln!(f, "  mov rdi, rax")?;
                    writeln!(f, "  mov rsi, rbx")?;
                    write!(f, "  call rt_pow")
                }
            },
            Instruction::Compare(op) => {
                writeln!(f, "  cmp rax, rbx")?;
                writeln!(f, "  set{} al", condition_code(*op))?;
                write!(f, "  movzx rax, al")
            }
            Instruction::Logic(op) => {
                let op = match op {
                    LogicalOpKind::And => "and",
                    LogicalOpKind::Or => "or",
                };
                writeln!(f, "  cmp rax, 0")?;
                writeln!(f, "  setne al")?;
                writeln!(f, "  cmp rbx, 0")?;
                writeln!(f, "  setne bl")?;
                writeln!(f, "  {} al, bl", op)?;
                write!(f, "  movzx rax, al")
            }
            Instruction::JumpIfZero(target) => {
                writeln!(f, "  cmp rax, 0")?;
                write!(f, "  je {}", target)
            }
            Instruction::JumpUnless { op, imm, target } => {
                writeln!(f, "  cmp rax, {}", imm)?;
                write!(f, "  j{} {}", condition_code(op.inverse()), target)
            }
            Instruction::Jump(target) => write!(f, "  jmp {}", target),
            Instruction::Call(target) => write!(f, "  call {}", target),
            Instruction::CallRuntime(Runtime::PrintNewline) => write!(f, "  call print_newline"),
            Instruction::CallRuntime(helper) => {
                writeln!(f, "  mov rdi, rax")?;
                write!(f, "  call {}", helper.symbol())
            }
            Instruction::Prologue => {
                writeln!(f, "  push rbp")?;
                write!(f, "  mov rbp, rsp")
            }
            Instruction::Return => {
                writeln!(f, "  mov rsp, rbp")?;
                writeln!(f, "  pop rbp")?;
                write!(f, "  ret")
            }
            Instruction::Exit => {
                writeln!(f, "  mov rdi, rax")?;
                writeln!(f, "  mov rax, 60")?;
                write!(f, "  syscall")
            }
        }
    }
}

/// Renders a string as the operands of a `db` directive, NUL-terminated.
fn db_operands(s: &str) -> String {
    let mut parts = vec![];
    let mut run = String::new();

    for b in s.bytes() {
        if (0x20..0x7f).contains(&b) && b != b'\'' {
            run.push(b as char);
            continue;
        }
        if !run.is_empty() {
            parts.push(format!("'{}'", run));
            run.clear();
        }
        parts.push(b.to_string());
    }
    if !run.is_empty() {
        parts.push(format!("'{}'", run));
    }
    parts.push("0".to_string());

    parts.join(", ")
}

const RUNTIME: &str = "\
print_str:
  push rbp
  mov rbp, rsp
  mov rsi, rdi
  xor rdx, rdx
.length:
  cmp byte [rsi + rdx], 0
  je .write
  inc rdx
  jmp .length
.write:
  mov rax, 1
  mov rdi, 1
  syscall
  mov rsp, rbp
  pop rbp
  ret

print_num:
  push rbp
  mov rbp, rsp
  sub rsp, 32
  mov rax, rdi
  mov r8, rdi
  lea rsi, [rbp - 1]
  mov byte [rsi], 0
  mov rcx, 10
  test rax, rax
  jns .digits
  neg rax
.digits:
  xor rdx, rdx
  div rcx
  add dl, '0'
  dec rsi
  mov [rsi], dl
  test rax, rax
  jnz .digits
  test r8, r8
  jns .emit
  dec rsi
  mov byte [rsi], '-'
.emit:
  mov rdi, rsi
  call print_str
  mov rsp, rbp
  pop rbp
  ret

print_log:
  test rdi, rdi
  jz .false
  lea rdi, [rel true_str]
  jmp print_str
.false:
  lea rdi, [rel false_str]
  jmp print_str

print_newline:
  mov rax, 1
  mov rdi, 1
  lea rsi, [rel newline]
  mov rdx, 1
  syscall
  ret

rt_pow:
  mov rax, 1
  test rsi, rsi
  js .negative
.loop:
  test rsi, rsi
  jz .done
  test rsi, 1
  jz .square
  imul rax, rdi
.square:
  imul rdi, rdi
  shr rsi, 1
  jmp .loop
.negative:
  xor rax, rax
.done:
  ret
";

/// A generated program: data slots plus the text instruction stream.
/// `Display` renders it as a NASM source file for x86-64 Linux.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Assembly {
    pub variables: Vec<String>,
    pub strings: Vec<String>,
    pub text: Vec<Instruction>,
}

impl Assembly {
    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.text.iter().filter_map(|i| match i {
            Instruction::Label(label) => Some(label),
            _ => None,
        })
    }
}

impl fmt::Display for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "section .data")?;
        for name in self.variables.iter() {
            writeln!(f, "var_{}: dq 0", name)?;
        }
        for (i, s) in self.strings.iter().enumerate() {
            writeln!(f, "str_{}: db {}", i, db_operands(s))?;
        }
        writeln!(f, "true_str: db 'true', 0")?;
        writeln!(f, "false_str: db 'false', 0")?;
        writeln!(f, "newline: db 10")?;
        writeln!(f)?;

        writeln!(f, "section .text")?;
        writeln!(f, "global _start")?;
        writeln!(f)?;
        writeln!(f, "{}", RUNTIME)?;

        for instruction in self.text.iter() {
            writeln!(f, "{}", instruction)?;
        }
        Ok(())
    }
}
