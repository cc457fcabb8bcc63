//! Blend65 compilation driver.
//!
//! Wires the front end, analyses, IL generation, SSA, optimizer, and
//! assembly IL into one programmatic entry point:
//!
//! ```
//! use blend65_driver::{compile, CompileOptions};
//!
//! let output = compile(
//!     &[("main", "function start(): void { poke(0xD020, 0); }")],
//!     &CompileOptions::default(),
//! );
//! assert!(output.success);
//! ```

pub mod config;
pub mod emit;
pub mod library;
pub mod pipeline;

pub use config::{CompileOptions, Target};
pub use library::{InMemoryLibrary, LibraryProvider, NoLibraries};
pub use pipeline::{compile, CompileOutput, PhaseTiming, SsaStatistics};
