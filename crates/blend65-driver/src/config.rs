//! Compilation targets and options.

use blend65_asm::Cpu;
use blend65_compiler::OptLevel;
use std::fmt;

/// Supported machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    /// Commodore 64 (6510)
    #[default]
    C64,
    /// Commodore 128 (8502, timing-identical to the 6502)
    C128,
    /// Commander X16 (65C02)
    X16,
}

impl Target {
    pub fn cpu(&self) -> Cpu {
        match self {
            Target::C64 => Cpu::Mos6510,
            Target::C128 => Cpu::Mos6502,
            Target::X16 => Cpu::Wdc65C02,
        }
    }

    /// Default load address of a program on this machine.
    pub fn program_start(&self) -> u16 {
        match self {
            Target::C64 => 0x0801,
            Target::C128 => 0x1C01,
            Target::X16 => 0x0801,
        }
    }

    /// Library identifier used in `@stdlib/<target>` source keys.
    pub fn library_key(&self) -> &'static str {
        match self {
            Target::C64 => "c64",
            Target::C128 => "c128",
            Target::X16 => "x16",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.library_key())
    }
}

/// Options recognized by the core pipeline.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub target: Target,
    pub optimization_level: OptLevel,
    /// Run the tier-3 analyses
    pub run_advanced_analysis: bool,
    /// Build SSA after IL generation
    pub enable_ssa: bool,
    /// Run the SSA verifier after construction and after the optimizer
    pub verify_ssa: bool,
    /// Count phis inserted, registers renamed, dominance checks
    pub collect_ssa_stats: bool,
    /// Override the root module name (default `main`)
    pub module_name: Option<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            target: Target::C64,
            optimization_level: OptLevel::O0,
            run_advanced_analysis: true,
            enable_ssa: true,
            verify_ssa: true,
            collect_ssa_stats: false,
            module_name: None,
        }
    }
}

impl CompileOptions {
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn with_optimization_level(mut self, level: OptLevel) -> Self {
        self.optimization_level = level;
        self
    }

    pub fn with_advanced_analysis(mut self, enabled: bool) -> Self {
        self.run_advanced_analysis = enabled;
        self
    }

    pub fn with_ssa(mut self, enabled: bool) -> Self {
        self.enable_ssa = enabled;
        self
    }

    pub fn with_ssa_verification(mut self, enabled: bool) -> Self {
        self.verify_ssa = enabled;
        self
    }

    pub fn with_ssa_stats(mut self, enabled: bool) -> Self {
        self.collect_ssa_stats = enabled;
        self
    }

    pub fn with_module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_cpus() {
        assert_eq!(Target::C64.cpu(), Cpu::Mos6510);
        assert_eq!(Target::C128.cpu(), Cpu::Mos6502);
        assert_eq!(Target::X16.cpu(), Cpu::Wdc65C02);
    }

    #[test]
    fn test_default_options() {
        let options = CompileOptions::default();
        assert_eq!(options.target, Target::C64);
        assert_eq!(options.optimization_level, OptLevel::O0);
        assert!(options.enable_ssa);
    }
}
