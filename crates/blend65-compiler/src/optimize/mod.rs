//! The optimizer.
//!
//! `O0` is pass-through except for intrinsic lowering: `peek`/`poke`
//! against compile-time constant addresses become hardware accesses, and
//! constants orphaned by that rewrite are swept. All other levels are
//! reserved and currently run the same pipeline.

mod dce;
mod intrinsics;

pub use dce::DeadConstElimination;
pub use intrinsics::IntrinsicLowering;

use blend65_il::IlModule;
use std::fmt;

/// Optimization level. Only `O0` is active; the rest are accepted and
/// currently equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptLevel {
    #[default]
    O0,
    O1,
    O2,
    O3,
    Os,
    Oz,
}

impl fmt::Display for OptLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OptLevel::O0 => "O0",
            OptLevel::O1 => "O1",
            OptLevel::O2 => "O2",
            OptLevel::O3 => "O3",
            OptLevel::Os => "Os",
            OptLevel::Oz => "Oz",
        };
        write!(f, "{}", s)
    }
}

/// One IL-to-IL transformation.
pub trait Pass {
    fn name(&self) -> &'static str;
    fn run(&self, module: &mut IlModule);
}

/// Drives the pass list for a level.
pub struct Optimizer {
    level: OptLevel,
}

impl Optimizer {
    pub fn new(level: OptLevel) -> Self {
        Self { level }
    }

    pub fn level(&self) -> OptLevel {
        self.level
    }

    /// Run the pipeline over a module.
    pub fn run(&self, module: &mut IlModule) {
        let passes: Vec<Box<dyn Pass>> = vec![
            Box::new(IntrinsicLowering::new()),
            Box::new(DeadConstElimination::new()),
        ];
        for pass in passes {
            pass.run(module);
        }
    }
}
