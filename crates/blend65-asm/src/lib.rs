//! Typed 6502 assembly IL.
//!
//! A fluent, typed representation of assembly output: labels,
//! instructions with mnemonic/addressing-mode/operand, origin and
//! comment items, with running byte and cycle accounting per target
//! cpu. This is the hand-off surface for the assembler backend; emitting
//! concrete assembler syntax is out of scope.

mod builder;
mod item;
mod mnemonic;

pub use builder::{AsmBuilder, AsmError};
pub use item::{AsmItem, LabelKind, Operand};
pub use mnemonic::{cycle_cost, AddressingMode, Cpu, Mnemonic};
