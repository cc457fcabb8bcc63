//! Assembly IL items.

use crate::mnemonic::{AddressingMode, Mnemonic};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label classification, for the backend's symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelKind {
    Function,
    Data,
    Branch,
}

/// Instruction operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    None,
    /// `#$42`
    Immediate(u8),
    /// `$D020` (or zero-page `$20`)
    Address(u16),
    /// A label reference resolved by the assembler
    Label(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Immediate(v) => write!(f, "#${:02X}", v),
            Operand::Address(a) => {
                if *a <= 0xFF {
                    write!(f, "${:02X}", a)
                } else {
                    write!(f, "${:04X}", a)
                }
            }
            Operand::Label(name) => write!(f, "{}", name),
        }
    }
}

/// One item of the assembly IL stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AsmItem {
    Label {
        name: String,
        kind: LabelKind,
        exported: bool,
        /// Address the builder had reached when the label was placed
        estimated_address: u16,
    },
    Instruction {
        mnemonic: Mnemonic,
        mode: AddressingMode,
        operand: Operand,
        cycles: u8,
        bytes: u8,
    },
    Origin(u16),
    Comment(String),
    Blank,
    /// Escape hatch for backend-specific directives
    Raw(String),
}

impl fmt::Display for AsmItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmItem::Label { name, .. } => write!(f, "{}:", name),
            AsmItem::Instruction {
                mnemonic,
                mode,
                operand,
                ..
            } => {
                use AddressingMode as M;
                match (mode, operand) {
                    (M::Implied, _) => write!(f, "    {}", mnemonic),
                    (M::Accumulator, _) => write!(f, "    {} A", mnemonic),
                    (M::IndexedIndirect, op) => write!(f, "    {} ({},X)", mnemonic, op),
                    (M::IndirectIndexed, op) => write!(f, "    {} ({}),Y", mnemonic, op),
                    (M::ZeroPageIndirect, op) => write!(f, "    {} ({})", mnemonic, op),
                    (M::Indirect, op) => write!(f, "    {} ({})", mnemonic, op),
                    (M::ZeroPageX | M::AbsoluteX, op) => write!(f, "    {} {},X", mnemonic, op),
                    (M::ZeroPageY | M::AbsoluteY, op) => write!(f, "    {} {},Y", mnemonic, op),
                    (_, op) => write!(f, "    {} {}", mnemonic, op),
                }
            }
            AsmItem::Origin(address) => write!(f, "    * = ${:04X}", address),
            AsmItem::Comment(text) => write!(f, "; {}", text),
            AsmItem::Blank => Ok(()),
            AsmItem::Raw(text) => write!(f, "{}", text),
        }
    }
}
