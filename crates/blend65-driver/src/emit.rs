//! IL → assembly IL scaffold.
//!
//! Lays out the output image: origin, one labeled section per function
//! (with a return appropriate to its kind), and labeled storage for
//! globals. Instruction selection for function bodies belongs to the
//! assembler backend consuming this stream.

use crate::config::Target;
use blend65_asm::{AsmBuilder, LabelKind};
use blend65_il::{IlModule, StorageClass};

/// Build the assembly IL stream for the compiled modules.
pub fn build_asm(modules: &[IlModule], target: Target) -> Result<AsmBuilder, blend65_asm::AsmError> {
    let mut asm = AsmBuilder::new(target.cpu());
    asm.org(target.program_start());

    for module in modules {
        asm.blank();
        asm.comment(format!("module {}", module.name));

        for func in module.functions() {
            let exported = module
                .exports
                .iter()
                .any(|e| e.local_name == func.name);
            let label = section_label(&module.name, &func.name);
            asm.blank();
            asm.label(label, LabelKind::Function, exported)?;
            asm.comment(format!(
                "{} blocks, {} registers",
                func.block_count(),
                func.register_count()
            ));
            if func.is_interrupt() {
                asm.rti()?;
            } else {
                asm.rts()?;
            }
        }

        for global in &module.globals {
            match global.storage {
                // Fixed-address and immediate globals need no storage
                StorageClass::Map | StorageClass::ImmediateConstant => continue,
                StorageClass::Ram | StorageClass::ZeroPage => {}
            }
            asm.label(
                section_label(&module.name, &global.name),
                LabelKind::Data,
                false,
            )?;
            asm.raw(format!("    .res {}", global.size));
        }
    }

    Ok(asm)
}

/// Unique label per module member; the root module keeps bare names.
fn section_label(module: &str, name: &str) -> String {
    if module == "main" {
        name.to_string()
    } else {
        format!("{}_{}", module.replace('.', "_"), name)
    }
}
