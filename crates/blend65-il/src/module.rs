//! IL modules: functions, globals, exports, imports, metadata.

use crate::function::IlFunction;
use crate::value::IlType;
use rustc_hash::FxHashMap;

/// Where a global lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    /// Ordinary RAM, placed by the backend
    Ram,
    /// Zero page, for fast addressing modes
    ZeroPage,
    /// Memory-mapped hardware at a fixed absolute address
    Map,
    /// Compile-time constant folded into immediates
    ImmediateConstant,
}

/// A module-level global.
#[derive(Debug, Clone)]
pub struct IlGlobal {
    pub name: String,
    pub ty: IlType,
    pub storage: StorageClass,
    /// Fixed address: required for `Map`, optional hint for `ZeroPage`
    pub address: Option<u16>,
    /// Allocation size in bytes (arrays are larger than their IL type)
    pub size: u32,
    /// Initial numeric value, when known at compile time
    pub initial: Option<i64>,
    /// Raw initial bytes (string literals and data tables)
    pub data: Option<Vec<u8>>,
}

/// Export table entry.
#[derive(Debug, Clone, PartialEq)]
pub struct IlExport {
    pub local_name: String,
    pub external_name: String,
    pub kind: ExportKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Function,
    Variable,
    Constant,
}

/// Import table entry.
#[derive(Debug, Clone, PartialEq)]
pub struct IlImport {
    pub local_name: String,
    pub original_name: String,
    pub source_module: String,
}

/// An IL module.
#[derive(Debug, Clone)]
pub struct IlModule {
    pub name: String,
    functions: Vec<IlFunction>,
    pub globals: Vec<IlGlobal>,
    pub exports: Vec<IlExport>,
    pub imports: Vec<IlImport>,
    /// Free-form target hints (VIC/SID usage, timing budgets). Opaque to
    /// the optimizer.
    pub metadata: FxHashMap<String, String>,
}

impl IlModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
            globals: Vec::new(),
            exports: Vec::new(),
            imports: Vec::new(),
            metadata: FxHashMap::default(),
        }
    }

    pub fn add_function(&mut self, function: IlFunction) {
        self.functions.push(function);
    }

    pub fn functions(&self) -> &[IlFunction] {
        &self.functions
    }

    pub fn functions_mut(&mut self) -> &mut [IlFunction] {
        &mut self.functions
    }

    pub fn function(&self, name: &str) -> Option<&IlFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn add_global(&mut self, global: IlGlobal) {
        self.globals.push(global);
    }

    pub fn global(&self, name: &str) -> Option<&IlGlobal> {
        self.globals.iter().find(|g| g.name == name)
    }

    pub fn add_export(&mut self, export: IlExport) {
        self.exports.push(export);
    }

    pub fn add_import(&mut self, import: IlImport) {
        self.imports.push(import);
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::IlType;

    #[test]
    fn test_module_lookup() {
        let mut module = IlModule::new("main");
        module.add_function(IlFunction::new("f", IlType::Void));
        module.add_global(IlGlobal {
            name: "border".to_string(),
            ty: IlType::Byte,
            storage: StorageClass::Map,
            address: Some(0xD020),
            size: 1,
            initial: None,
            data: None,
        });

        assert!(module.function("f").is_some());
        assert!(module.function("g").is_none());
        let border = module.global("border").unwrap();
        assert_eq!(border.storage, StorageClass::Map);
        assert_eq!(border.address, Some(0xD020));
    }
}
