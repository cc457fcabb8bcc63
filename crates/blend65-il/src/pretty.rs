//! Human-readable IL dumps, for tests and the driver's debug output.

use crate::function::IlFunction;
use crate::instr::{InstrKind, Terminator};
use crate::module::IlModule;
use std::fmt;
use std::fmt::Write as _;

/// Render one function.
pub fn function_to_string(func: &IlFunction) -> String {
    let mut out = String::new();
    let params: Vec<String> = func
        .params
        .iter()
        .map(|(name, reg)| format!("{}: {}", name, reg))
        .collect();
    let _ = writeln!(
        out,
        "fn {}({}) -> {} {{",
        func.name,
        params.join(", "),
        func.return_type
    );

    for block in func.blocks() {
        let label = block
            .label
            .as_ref()
            .map(|l| format!(" ({})", l))
            .unwrap_or_default();
        let _ = writeln!(out, "{}{}:", block.id, label);
        for instr in &block.instructions {
            let body = instr_to_string(&instr.kind);
            match &instr.result {
                Some(result) => {
                    let _ = writeln!(out, "  {} = {}", result, body);
                }
                None => {
                    let _ = writeln!(out, "  {}", body);
                }
            }
        }
        if let Some(terminator) = &block.terminator {
            let _ = writeln!(out, "  {}", terminator_to_string(terminator));
        }
    }
    let _ = writeln!(out, "}}");
    out
}

fn instr_to_string(kind: &InstrKind) -> String {
    match kind {
        InstrKind::Const { value } => format!("const {}", value),
        InstrKind::ConstBool { value } => format!("const {}", value),
        InstrKind::LoadGlobal { name } => format!("load.global {}", name),
        InstrKind::StoreGlobal { name, value } => format!("store.global {} <- {}", name, value),
        InstrKind::LoadVar { name } => format!("load.var {}", name),
        InstrKind::StoreVar { name, value } => format!("store.var {} <- {}", name, value),
        InstrKind::AddressOfGlobal { name } => format!("addr.global {}", name),
        InstrKind::Binary { op, lhs, rhs } => format!("{} {}, {}", op, lhs, rhs),
        InstrKind::Compare { op, lhs, rhs } => format!("cmp.{} {}, {}", op, lhs, rhs),
        InstrKind::Not { value } => format!("not {}", value),
        InstrKind::Neg { value } => format!("neg {}", value),
        InstrKind::ZeroExtend { value } => format!("zext {}", value),
        InstrKind::Truncate { value } => format!("trunc {}", value),
        InstrKind::Call { callee, args } => {
            let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            format!("call {}({})", callee, args.join(", "))
        }
        InstrKind::Peek { addr } => format!("peek {}", addr),
        InstrKind::Poke { addr, value } => format!("poke {}, {}", addr, value),
        InstrKind::PeekW { addr } => format!("peekw {}", addr),
        InstrKind::PokeW { addr, value } => format!("pokew {}, {}", addr, value),
        InstrKind::HardwareRead { addr } => format!("hw.read 0x{:04X}", addr),
        InstrKind::HardwareWrite { addr, value } => {
            format!("hw.write 0x{:04X}, {}", addr, value)
        }
        InstrKind::Phi { sources } => {
            let sources: Vec<String> = sources
                .iter()
                .map(|(block, reg)| format!("[{}, {}]", block, reg))
                .collect();
            format!("phi {}", sources.join(", "))
        }
    }
}

fn terminator_to_string(terminator: &Terminator) -> String {
    match terminator {
        Terminator::Branch { target } => format!("br {}", target),
        Terminator::CondBranch {
            cond,
            then_block,
            else_block,
        } => format!("br {} ? {} : {}", cond, then_block, else_block),
        Terminator::Return { value: Some(v) } => format!("ret {}", v),
        Terminator::Return { value: None } => "ret".to_string(),
        Terminator::Unreachable => "unreachable".to_string(),
    }
}

/// Render a whole module.
pub fn module_to_string(module: &IlModule) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "module {}", module.name);
    for global in &module.globals {
        let addr = global
            .address
            .map(|a| format!(" @ 0x{:04X}", a))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "global {} : {} [{:?}]{}",
            global.name, global.ty, global.storage, addr
        );
    }
    for func in module.functions() {
        out.push('\n');
        out.push_str(&function_to_string(func));
    }
    out
}

impl fmt::Display for IlModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", module_to_string(self))
    }
}

impl fmt::Display for IlFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", function_to_string(self))
    }
}
