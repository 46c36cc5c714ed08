use std::collections::HashMap;

use cxc::codegen::{Assembly, Instruction, Label, Runtime};
use cxc::parser::BinOpKind;

/// Pooled string addresses live far above any number the tests compute.
const STRING_BASE: i64 = 1 << 40;
const STEP_LIMIT: usize = 1_000_000;

#[derive(Debug, PartialEq)]
pub struct Outcome {
    pub output: Vec<String>,
    pub status: i64,
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn label_positions(asm: &Assembly) -> HashMap<&Label, usize> {
    let mut positions = HashMap::new();
    for (pc, instruction) in asm.text.iter().enumerate() {
        if let Instruction::Label(label) = instruction {
            let previous = positions.insert(label, pc);
            assert!(previous.is_none(), "label {} defined twice", label);
        }
    }
    positions
}

/// Executes the instruction stream the way the rendered assembly would run.
pub fn run(asm: &Assembly) -> Outcome {
    let labels = label_positions(asm);
    let target = |label: &Label| -> usize {
        *labels
            .get(label)
            .unwrap_or_else(|| panic!("jump to undefined label {}", label))
    };

    let mut pc = target(&Label::Entry);
    let (mut rax, mut rbx) = (0i64, 0i64);
    let mut stack: Vec<i64> = vec![];
    let mut frames: Vec<usize> = vec![];
    let mut returns: Vec<usize> = vec![];
    let mut vars: HashMap<&str, i64> = HashMap::new();
    let mut output = vec![];
    let mut line = String::new();

    for _ in 0..STEP_LIMIT {
        match &asm.text[pc] {
            Instruction::Label(_) => {}
            Instruction::LoadImm(n) => rax = *n,
            Instruction::LoadVar(name) => {
                assert!(asm.variables.contains(name), "no slot for {}", name);
                rax = vars.get(name.as_str()).copied().unwrap_or(0);
            }
            Instruction::LoadStr(i) => {
                assert!(*i < asm.strings.len(), "string {} not pooled", i);
                rax = STRING_BASE + *i as i64;
            }
            Instruction::StoreVar(name) => {
                assert!(asm.variables.contains(name), "no slot for {}", name);
                vars.insert(name.as_str(), rax);
            }
            Instruction::StoreScratch(name) => {
                assert!(asm.variables.contains(name), "no slot for {}", name);
                vars.insert(name.as_str(), rbx);
            }
            Instruction::Push => stack.push(rax),
            Instruction::Pop => rax = stack.pop().expect("stack underflow"),
            Instruction::PopScratch => rbx = stack.pop().expect("stack underflow"),
            Instruction::Arith(BinOpKind::Div) if rbx == 0 => panic!("division by zero at runtime"),
            Instruction::Arith(op) => rax = op.apply(rax, rbx).expect("arithmetic fault"),
            Instruction::Compare(op) => rax = op.evaluate(rax, rbx) as i64,
            Instruction::Logic(op) => rax = op.evaluate(rax, rbx) as i64,
            Instruction::JumpIfZero(label) => {
                if rax == 0 {
                    pc = target(label);
                    continue;
                }
            }
            Instruction::JumpUnless { op, imm, target: label } => {
                if !op.evaluate(rax, *imm as i64) {
                    pc = target(label);
                    continue;
                }
            }
            Instruction::Jump(label) => {
                pc = target(label);
                continue;
            }
            Instruction::Call(label) => {
                returns.push(pc + 1);
                pc = target(label);
                continue;
            }
            Instruction::CallRuntime(helper) => match helper {
                Runtime::PrintNum => line.push_str(&rax.to_string()),
                Runtime::PrintStr => line.push_str(&asm.strings[(rax - STRING_BASE) as usize]),
                Runtime::PrintLog => line.push_str(if rax != 0 { "true" } else { "false" }),
                Runtime::PrintNewline => output.push(std::mem::take(&mut line)),
            },
            Instruction::Prologue => frames.push(stack.len()),
            Instruction::Return => {
                stack.truncate(frames.pop().expect("return outside a function"));
                pc = returns.pop().expect("return without a call");
                continue;
            }
            Instruction::Exit => {
                assert!(stack.is_empty(), "operand stack not balanced: {:?}", stack);
                return Outcome {
                    output,
                    status: rax,
                };
            }
        }
        pc += 1;
    }
    panic!("program did not terminate within {} steps", STEP_LIMIT);
}
