//! Fluent assembly IL builder.
//!
//! One flat builder whose public API covers every mnemonic family; the
//! hand-off surface for the assembler backend. Appending an instruction
//! advances the current address by its encoded size and accumulates the
//! cycle estimate.

use crate::item::{AsmItem, LabelKind, Operand};
use crate::mnemonic::{cycle_cost, AddressingMode, Cpu, Mnemonic};
use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    #[error("{mnemonic:?} does not support {mode:?} on {cpu:?}")]
    InvalidCombination {
        mnemonic: Mnemonic,
        mode: AddressingMode,
        cpu: Cpu,
    },

    #[error("duplicate label '{0}'")]
    DuplicateLabel(String),
}

/// The assembly IL stream under construction.
#[derive(Debug)]
pub struct AsmBuilder {
    cpu: Cpu,
    items: Vec<AsmItem>,
    current_address: u16,
    total_bytes: u32,
    total_cycles: u64,
    labels: FxHashMap<String, u16>,
}

impl AsmBuilder {
    pub fn new(cpu: Cpu) -> Self {
        Self {
            cpu,
            items: Vec::new(),
            current_address: 0,
            total_bytes: 0,
            total_cycles: 0,
            labels: FxHashMap::default(),
        }
    }

    pub fn cpu(&self) -> Cpu {
        self.cpu
    }

    pub fn items(&self) -> &[AsmItem] {
        &self.items
    }

    pub fn current_address(&self) -> u16 {
        self.current_address
    }

    pub fn total_bytes(&self) -> u32 {
        self.total_bytes
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    pub fn label_address(&self, name: &str) -> Option<u16> {
        self.labels.get(name).copied()
    }

    /// Render the whole stream as text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            out.push_str(&item.to_string());
            out.push('\n');
        }
        out
    }

    // ----- stream items -----

    /// Set the assembly origin.
    pub fn org(&mut self, address: u16) -> &mut Self {
        self.current_address = address;
        self.items.push(AsmItem::Origin(address));
        self
    }

    /// Place a label at the current address.
    pub fn label(
        &mut self,
        name: impl Into<String>,
        kind: LabelKind,
        exported: bool,
    ) -> Result<&mut Self, AsmError> {
        let name = name.into();
        if self.labels.contains_key(&name) {
            return Err(AsmError::DuplicateLabel(name));
        }
        self.labels.insert(name.clone(), self.current_address);
        self.items.push(AsmItem::Label {
            name,
            kind,
            exported,
            estimated_address: self.current_address,
        });
        Ok(self)
    }

    pub fn comment(&mut self, text: impl Into<String>) -> &mut Self {
        self.items.push(AsmItem::Comment(text.into()));
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.items.push(AsmItem::Blank);
        self
    }

    pub fn raw(&mut self, text: impl Into<String>) -> &mut Self {
        self.items.push(AsmItem::Raw(text.into()));
        self
    }

    /// Append an instruction, validating the mnemonic/mode pair and
    /// advancing the byte and cycle counters.
    pub fn instr(
        &mut self,
        mnemonic: Mnemonic,
        mode: AddressingMode,
        operand: Operand,
    ) -> Result<&mut Self, AsmError> {
        let Some(cycles) = cycle_cost(mnemonic, mode, self.cpu) else {
            return Err(AsmError::InvalidCombination {
                mnemonic,
                mode,
                cpu: self.cpu,
            });
        };
        let bytes = mode.byte_size();
        self.items.push(AsmItem::Instruction {
            mnemonic,
            mode,
            operand,
            cycles,
            bytes,
        });
        self.current_address = self.current_address.wrapping_add(bytes as u16);
        self.total_bytes += bytes as u32;
        self.total_cycles += cycles as u64;
        Ok(self)
    }

    // ----- load/store family -----

    pub fn lda_imm(&mut self, value: u8) -> Result<&mut Self, AsmError> {
        self.instr(Mnemonic::LDA, AddressingMode::Immediate, Operand::Immediate(value))
    }

    pub fn lda_abs(&mut self, address: u16) -> Result<&mut Self, AsmError> {
        let mode = absolute_or_zp(address);
        self.instr(Mnemonic::LDA, mode, Operand::Address(address))
    }

    pub fn ldx_imm(&mut self, value: u8) -> Result<&mut Self, AsmError> {
        self.instr(Mnemonic::LDX, AddressingMode::Immediate, Operand::Immediate(value))
    }

    pub fn ldy_imm(&mut self, value: u8) -> Result<&mut Self, AsmError> {
        self.instr(Mnemonic::LDY, AddressingMode::Immediate, Operand::Immediate(value))
    }

    pub fn sta_abs(&mut self, address: u16) -> Result<&mut Self, AsmError> {
        let mode = absolute_or_zp(address);
        self.instr(Mnemonic::STA, mode, Operand::Address(address))
    }

    pub fn stx_abs(&mut self, address: u16) -> Result<&mut Self, AsmError> {
        let mode = absolute_or_zp(address);
        self.instr(Mnemonic::STX, mode, Operand::Address(address))
    }

    pub fn sty_abs(&mut self, address: u16) -> Result<&mut Self, AsmError> {
        let mode = absolute_or_zp(address);
        self.instr(Mnemonic::STY, mode, Operand::Address(address))
    }

    // ----- transfer/stack family -----

    pub fn tax(&mut self) -> Result<&mut Self, AsmError> {
        self.instr(Mnemonic::TAX, AddressingMode::Implied, Operand::None)
    }

    pub fn txa(&mut self) -> Result<&mut Self, AsmError> {
        self.instr(Mnemonic::TXA, AddressingMode::Implied, Operand::None)
    }

    pub fn pha(&mut self) -> Result<&mut Self, AsmError> {
        self.instr(Mnemonic::PHA, AddressingMode::Implied, Operand::None)
    }

    pub fn pla(&mut self) -> Result<&mut Self, AsmError> {
        self.instr(Mnemonic::PLA, AddressingMode::Implied, Operand::None)
    }

    // ----- arithmetic family -----

    pub fn clc(&mut self) -> Result<&mut Self, AsmError> {
        self.instr(Mnemonic::CLC, AddressingMode::Implied, Operand::None)
    }

    pub fn sec(&mut self) -> Result<&mut Self, AsmError> {
        self.instr(Mnemonic::SEC, AddressingMode::Implied, Operand::None)
    }

    pub fn adc_imm(&mut self, value: u8) -> Result<&mut Self, AsmError> {
        self.instr(Mnemonic::ADC, AddressingMode::Immediate, Operand::Immediate(value))
    }

    pub fn adc_abs(&mut self, address: u16) -> Result<&mut Self, AsmError> {
        let mode = absolute_or_zp(address);
        self.instr(Mnemonic::ADC, mode, Operand::Address(address))
    }

    pub fn sbc_imm(&mut self, value: u8) -> Result<&mut Self, AsmError> {
        self.instr(Mnemonic::SBC, AddressingMode::Immediate, Operand::Immediate(value))
    }

    pub fn cmp_imm(&mut self, value: u8) -> Result<&mut Self, AsmError> {
        self.instr(Mnemonic::CMP, AddressingMode::Immediate, Operand::Immediate(value))
    }

    // ----- flow family -----

    pub fn jmp(&mut self, label: impl Into<String>) -> Result<&mut Self, AsmError> {
        self.instr(
            Mnemonic::JMP,
            AddressingMode::Absolute,
            Operand::Label(label.into()),
        )
    }

    pub fn jsr(&mut self, label: impl Into<String>) -> Result<&mut Self, AsmError> {
        self.instr(
            Mnemonic::JSR,
            AddressingMode::Absolute,
            Operand::Label(label.into()),
        )
    }

    pub fn rts(&mut self) -> Result<&mut Self, AsmError> {
        self.instr(Mnemonic::RTS, AddressingMode::Implied, Operand::None)
    }

    pub fn rti(&mut self) -> Result<&mut Self, AsmError> {
        self.instr(Mnemonic::RTI, AddressingMode::Implied, Operand::None)
    }

    pub fn beq(&mut self, label: impl Into<String>) -> Result<&mut Self, AsmError> {
        self.instr(
            Mnemonic::BEQ,
            AddressingMode::Relative,
            Operand::Label(label.into()),
        )
    }

    pub fn bne(&mut self, label: impl Into<String>) -> Result<&mut Self, AsmError> {
        self.instr(
            Mnemonic::BNE,
            AddressingMode::Relative,
            Operand::Label(label.into()),
        )
    }

    pub fn nop(&mut self) -> Result<&mut Self, AsmError> {
        self.instr(Mnemonic::NOP, AddressingMode::Implied, Operand::None)
    }
}

/// Addresses below 0x100 use the shorter zero-page encoding.
fn absolute_or_zp(address: u16) -> AddressingMode {
    if address <= 0xFF {
        AddressingMode::ZeroPage
    } else {
        AddressingMode::Absolute
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_advances_by_byte_size() {
        let mut asm = AsmBuilder::new(Cpu::Mos6510);
        asm.org(0x0801);
        asm.lda_imm(0x05).unwrap(); // 2 bytes
        asm.sta_abs(0xD020).unwrap(); // 3 bytes
        assert_eq!(asm.current_address(), 0x0801 + 2 + 3);
        assert_eq!(asm.total_bytes(), 5);
    }

    #[test]
    fn test_cycles_accumulate() {
        let mut asm = AsmBuilder::new(Cpu::Mos6510);
        asm.lda_imm(1).unwrap(); // 2 cycles
        asm.sta_abs(0xD020).unwrap(); // 4 cycles
        asm.rts().unwrap(); // 6 cycles
        assert_eq!(asm.total_cycles(), 12);
    }

    #[test]
    fn test_zero_page_encoding_chosen() {
        let mut asm = AsmBuilder::new(Cpu::Mos6510);
        asm.lda_abs(0x20).unwrap();
        assert_eq!(asm.total_bytes(), 2);
        match &asm.items()[0] {
            AsmItem::Instruction { mode, .. } => {
                assert_eq!(*mode, AddressingMode::ZeroPage);
            }
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[test]
    fn test_labels_record_addresses() {
        let mut asm = AsmBuilder::new(Cpu::Mos6510);
        asm.org(0xC000);
        asm.label("start", LabelKind::Function, true).unwrap();
        asm.lda_imm(0).unwrap();
        asm.label("loop", LabelKind::Branch, false).unwrap();
        assert_eq!(asm.label_address("start"), Some(0xC000));
        assert_eq!(asm.label_address("loop"), Some(0xC002));
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let mut asm = AsmBuilder::new(Cpu::Mos6510);
        asm.label("x", LabelKind::Data, false).unwrap();
        assert!(matches!(
            asm.label("x", LabelKind::Data, false),
            Err(AsmError::DuplicateLabel(_))
        ));
    }

    #[test]
    fn test_invalid_combination_rejected() {
        let mut asm = AsmBuilder::new(Cpu::Mos6510);
        let result = asm.instr(Mnemonic::STA, AddressingMode::Immediate, Operand::Immediate(1));
        assert!(matches!(result, Err(AsmError::InvalidCombination { .. })));
        // 65C02-only mnemonics fail on the 6510
        let result = asm.instr(Mnemonic::STZ, AddressingMode::ZeroPage, Operand::Address(0x20));
        assert!(matches!(result, Err(AsmError::InvalidCombination { .. })));
    }

    #[test]
    fn test_fluent_chaining() {
        let mut asm = AsmBuilder::new(Cpu::Wdc65C02);
        asm.org(0x0810);
        asm.label("main", LabelKind::Function, true).unwrap();
        asm.lda_imm(0x00)
            .unwrap()
            .sta_abs(0xD020)
            .unwrap()
            .rts()
            .unwrap();
        let text = asm.to_text();
        assert!(text.contains("main:"));
        assert!(text.contains("LDA #$00"));
        assert!(text.contains("STA $D020"));
        assert!(text.contains("RTS"));
    }
}
