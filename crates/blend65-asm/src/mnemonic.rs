//! 6502-family mnemonics, addressing modes, and cost tables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Target processor variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cpu {
    /// NMOS 6502 (C128's 8502 behaves identically for timing)
    Mos6502,
    /// C64's 6510: a 6502 with an I/O port, identical instruction timing
    Mos6510,
    /// WDC 65C02 (Commander X16): extra instructions and modes
    Wdc65C02,
}

impl Cpu {
    pub fn supports_cmos_extensions(&self) -> bool {
        matches!(self, Cpu::Wdc65C02)
    }
}

/// Instruction mnemonics. The CMOS block at the end is 65C02-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum Mnemonic {
    // Load/store
    LDA, LDX, LDY, STA, STX, STY,
    // Transfers
    TAX, TAY, TXA, TYA, TSX, TXS,
    // Stack
    PHA, PHP, PLA, PLP,
    // Arithmetic and logic
    ADC, SBC, AND, ORA, EOR, CMP, CPX, CPY, BIT,
    // Increment/decrement
    INC, INX, INY, DEC, DEX, DEY,
    // Shifts
    ASL, LSR, ROL, ROR,
    // Jumps and branches
    JMP, JSR, RTS, RTI,
    BCC, BCS, BEQ, BNE, BMI, BPL, BVC, BVS,
    // Flags
    CLC, SEC, CLI, SEI, CLD, SED, CLV,
    // Misc
    BRK, NOP,
    // 65C02 extensions
    BRA, PHX, PHY, PLX, PLY, STZ, TRB, TSB,
}

impl Mnemonic {
    /// Is this mnemonic available on the given cpu?
    pub fn available_on(&self, cpu: Cpu) -> bool {
        match self {
            Mnemonic::BRA
            | Mnemonic::PHX
            | Mnemonic::PHY
            | Mnemonic::PLX
            | Mnemonic::PLY
            | Mnemonic::STZ
            | Mnemonic::TRB
            | Mnemonic::TSB => cpu.supports_cmos_extensions(),
            _ => true,
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(
            self,
            Mnemonic::BCC
                | Mnemonic::BCS
                | Mnemonic::BEQ
                | Mnemonic::BNE
                | Mnemonic::BMI
                | Mnemonic::BPL
                | Mnemonic::BVC
                | Mnemonic::BVS
                | Mnemonic::BRA
        )
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    /// `(zp,X)`
    IndexedIndirect,
    /// `(zp),Y`
    IndirectIndexed,
    Relative,
    /// `(zp)` — 65C02 only
    ZeroPageIndirect,
}

impl AddressingMode {
    /// Encoded instruction size in bytes.
    pub fn byte_size(&self) -> u8 {
        match self {
            AddressingMode::Implied | AddressingMode::Accumulator => 1,
            AddressingMode::Immediate
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageX
            | AddressingMode::ZeroPageY
            | AddressingMode::IndexedIndirect
            | AddressingMode::IndirectIndexed
            | AddressingMode::Relative
            | AddressingMode::ZeroPageIndirect => 2,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 3,
        }
    }
}

/// Base cycle count of a mnemonic/mode pair, `None` when the pair does
/// not exist on the cpu. Page-cross and branch-taken penalties are not
/// modeled; counts are the documented minimums.
pub fn cycle_cost(mnemonic: Mnemonic, mode: AddressingMode, cpu: Cpu) -> Option<u8> {
    use AddressingMode as M;
    use Mnemonic as Op;

    if !mnemonic.available_on(cpu) {
        return None;
    }

    let cycles = match (mnemonic, mode) {
        // Loads
        (Op::LDA | Op::LDX | Op::LDY, M::Immediate) => 2,
        (Op::LDA | Op::LDX | Op::LDY, M::ZeroPage) => 3,
        (Op::LDA | Op::LDY, M::ZeroPageX) => 4,
        (Op::LDX, M::ZeroPageY) => 4,
        (Op::LDA | Op::LDX | Op::LDY, M::Absolute) => 4,
        (Op::LDA | Op::LDY, M::AbsoluteX) => 4,
        (Op::LDA | Op::LDX, M::AbsoluteY) => 4,
        (Op::LDA, M::IndexedIndirect) => 6,
        (Op::LDA, M::IndirectIndexed) => 5,
        (Op::LDA, M::ZeroPageIndirect) => 5,

        // Stores
        (Op::STA | Op::STX | Op::STY | Op::STZ, M::ZeroPage) => 3,
        (Op::STA | Op::STY | Op::STZ, M::ZeroPageX) => 4,
        (Op::STX, M::ZeroPageY) => 4,
        (Op::STA | Op::STX | Op::STY | Op::STZ, M::Absolute) => 4,
        (Op::STA | Op::STZ, M::AbsoluteX) => 5,
        (Op::STA, M::AbsoluteY) => 5,
        (Op::STA, M::IndexedIndirect) => 6,
        (Op::STA, M::IndirectIndexed) => 6,
        (Op::STA, M::ZeroPageIndirect) => 5,

        // Transfers
        (
            Op::TAX | Op::TAY | Op::TXA | Op::TYA | Op::TSX | Op::TXS,
            M::Implied,
        ) => 2,

        // Stack
        (Op::PHA | Op::PHP | Op::PHX | Op::PHY, M::Implied) => 3,
        (Op::PLA | Op::PLP | Op::PLX | Op::PLY, M::Implied) => 4,

        // Arithmetic / logic
        (Op::ADC | Op::SBC | Op::AND | Op::ORA | Op::EOR | Op::CMP, M::Immediate) => 2,
        (Op::ADC | Op::SBC | Op::AND | Op::ORA | Op::EOR | Op::CMP, M::ZeroPage) => 3,
        (Op::ADC | Op::SBC | Op::AND | Op::ORA | Op::EOR | Op::CMP, M::ZeroPageX) => 4,
        (Op::ADC | Op::SBC | Op::AND | Op::ORA | Op::EOR | Op::CMP, M::Absolute) => 4,
        (
            Op::ADC | Op::SBC | Op::AND | Op::ORA | Op::EOR | Op::CMP,
            M::AbsoluteX | M::AbsoluteY,
        ) => 4,
        (Op::ADC | Op::SBC | Op::AND | Op::ORA | Op::EOR | Op::CMP, M::IndexedIndirect) => 6,
        (Op::ADC | Op::SBC | Op::AND | Op::ORA | Op::EOR | Op::CMP, M::IndirectIndexed) => 5,
        (Op::ADC | Op::SBC | Op::AND | Op::ORA | Op::EOR | Op::CMP, M::ZeroPageIndirect) => 5,
        (Op::CPX | Op::CPY, M::Immediate) => 2,
        (Op::CPX | Op::CPY, M::ZeroPage) => 3,
        (Op::CPX | Op::CPY, M::Absolute) => 4,
        (Op::BIT, M::ZeroPage) => 3,
        (Op::BIT, M::Absolute) => 4,
        (Op::BIT, M::Immediate) if cpu.supports_cmos_extensions() => 2,

        // Increment / decrement
        (Op::INC | Op::DEC, M::ZeroPage) => 5,
        (Op::INC | Op::DEC, M::ZeroPageX) => 6,
        (Op::INC | Op::DEC, M::Absolute) => 6,
        (Op::INC | Op::DEC, M::AbsoluteX) => 7,
        (Op::INX | Op::INY | Op::DEX | Op::DEY, M::Implied) => 2,
        (Op::INC | Op::DEC, M::Accumulator) if cpu.supports_cmos_extensions() => 2,

        // Shifts
        (Op::ASL | Op::LSR | Op::ROL | Op::ROR, M::Accumulator) => 2,
        (Op::ASL | Op::LSR | Op::ROL | Op::ROR, M::ZeroPage) => 5,
        (Op::ASL | Op::LSR | Op::ROL | Op::ROR, M::ZeroPageX) => 6,
        (Op::ASL | Op::LSR | Op::ROL | Op::ROR, M::Absolute) => 6,
        (Op::ASL | Op::LSR | Op::ROL | Op::ROR, M::AbsoluteX) => 7,

        // Jumps
        (Op::JMP, M::Absolute) => 3,
        (Op::JMP, M::Indirect) => if cpu.supports_cmos_extensions() { 6 } else { 5 },
        (Op::JSR, M::Absolute) => 6,
        (Op::RTS | Op::RTI, M::Implied) => 6,

        // Branches (not-taken minimum)
        (
            Op::BCC | Op::BCS | Op::BEQ | Op::BNE | Op::BMI | Op::BPL | Op::BVC | Op::BVS,
            M::Relative,
        ) => 2,
        (Op::BRA, M::Relative) => 3,

        // Flags
        (Op::CLC | Op::SEC | Op::CLI | Op::SEI | Op::CLD | Op::SED | Op::CLV, M::Implied) => 2,

        // Misc
        (Op::BRK, M::Implied) => 7,
        (Op::NOP, M::Implied) => 2,

        // 65C02 bit ops
        (Op::TRB | Op::TSB, M::ZeroPage) => 5,
        (Op::TRB | Op::TSB, M::Absolute) => 6,

        _ => return None,
    };
    Some(cycles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_sizes() {
        assert_eq!(AddressingMode::Implied.byte_size(), 1);
        assert_eq!(AddressingMode::Immediate.byte_size(), 2);
        assert_eq!(AddressingMode::Absolute.byte_size(), 3);
    }

    #[test]
    fn test_common_costs() {
        assert_eq!(
            cycle_cost(Mnemonic::LDA, AddressingMode::Immediate, Cpu::Mos6510),
            Some(2)
        );
        assert_eq!(
            cycle_cost(Mnemonic::STA, AddressingMode::Absolute, Cpu::Mos6502),
            Some(4)
        );
        assert_eq!(
            cycle_cost(Mnemonic::JSR, AddressingMode::Absolute, Cpu::Mos6502),
            Some(6)
        );
    }

    #[test]
    fn test_invalid_pairs_rejected() {
        assert_eq!(
            cycle_cost(Mnemonic::LDA, AddressingMode::Implied, Cpu::Mos6502),
            None
        );
        assert_eq!(
            cycle_cost(Mnemonic::STX, AddressingMode::Immediate, Cpu::Mos6502),
            None
        );
    }

    #[test]
    fn test_cmos_extensions_gated() {
        assert_eq!(
            cycle_cost(Mnemonic::STZ, AddressingMode::ZeroPage, Cpu::Mos6502),
            None
        );
        assert_eq!(
            cycle_cost(Mnemonic::STZ, AddressingMode::ZeroPage, Cpu::Wdc65C02),
            Some(3)
        );
        assert_eq!(
            cycle_cost(Mnemonic::BRA, AddressingMode::Relative, Cpu::Wdc65C02),
            Some(3)
        );
        // JMP (indirect) differs between NMOS and CMOS
        assert_eq!(
            cycle_cost(Mnemonic::JMP, AddressingMode::Indirect, Cpu::Mos6502),
            Some(5)
        );
        assert_eq!(
            cycle_cost(Mnemonic::JMP, AddressingMode::Indirect, Cpu::Wdc65C02),
            Some(6)
        );
    }
}
