//! AST to IL lowering.
//!
//! Lowers one type-checked program into an [`IlModule`]. Mutable locals
//! go through named `LoadVar`/`StoreVar` slots; SSA construction (when
//! enabled) renames them away afterwards. Statement lowering keeps a
//! current-block cursor; a terminated block is followed by a fresh
//! block so trailing statements still lower (they are simply
//! unreachable).

mod expr;
mod stmt;

use crate::error::CompileError;
use blend65_checker::consteval::eval_const_expr;
use blend65_checker::{Bindings, CheckResult, SymbolId, SymbolPayload};
use blend65_parser::ast::{Declaration, FunctionDecl, NodeId, Program, StorageKind};
use blend65_types::Type;
use blend65_il::{
    BlockId, ExportKind, IlExport, IlFunction, IlGlobal, IlImport, IlModule, IlType, InstrKind,
    Register, StorageClass, Terminator,
};
use rustc_hash::FxHashMap;

/// The AST→IL lowerer.
pub struct IlGenerator<'a> {
    program: &'a Program,
    bindings: &'a Bindings,
    types: &'a CheckResult,
    errors: Vec<CompileError>,

    // Per-function state
    func: Option<IlFunction>,
    current_block: BlockId,
    /// Unique slot name per local symbol (shadowing-safe)
    slot_names: FxHashMap<SymbolId, String>,
    /// (continue target, break target) stack
    loop_stack: Vec<(BlockId, BlockId)>,
    /// Synthesized temp slot counter (ternaries, short-circuiting)
    next_temp: u32,
    /// Synthesized string-data globals
    string_globals: Vec<IlGlobal>,
    next_string: u32,
}

impl<'a> IlGenerator<'a> {
    pub fn new(program: &'a Program, bindings: &'a Bindings, types: &'a CheckResult) -> Self {
        Self {
            program,
            bindings,
            types,
            errors: Vec::new(),
            func: None,
            current_block: BlockId::new(0),
            slot_names: FxHashMap::default(),
            loop_stack: Vec::new(),
            next_temp: 0,
            string_globals: Vec::new(),
            next_string: 0,
        }
    }

    /// Lower the whole program.
    pub fn generate(mut self) -> (IlModule, Vec<CompileError>) {
        let program = self.program;
        let mut module = IlModule::new(program.module_name());

        // Globals, exports, imports first
        for decl in &program.declarations {
            self.lower_global_decl(decl, &mut module);
        }

        // Then function bodies
        for decl in &program.declarations {
            if let Declaration::Function(func) = decl {
                let il_func = self.lower_function(func);
                module.add_function(il_func);
            }
        }

        for global in std::mem::take(&mut self.string_globals) {
            module.add_global(global);
        }

        (module, self.errors)
    }

    fn lower_global_decl(&mut self, decl: &Declaration, module: &mut IlModule) {
        match decl {
            Declaration::Variable(var) => {
                let Some(symbol_id) = self.bindings.symbol_of(var.id) else {
                    return;
                };
                let ty = self.symbol_type(symbol_id);
                let initial = var.init.as_ref().and_then(|init| {
                    eval_const_expr(init, &self.bindings.table, self.bindings.table.module_scope())
                });
                module.add_global(IlGlobal {
                    name: var.name.name.clone(),
                    ty: IlType::from_language(&ty),
                    storage: StorageClass::Ram,
                    address: None,
                    size: ty.size_in_bytes().max(1),
                    initial,
                    data: None,
                });
                if var.exported {
                    module.add_export(IlExport {
                        local_name: var.name.name.clone(),
                        external_name: var.name.name.clone(),
                        kind: ExportKind::Variable,
                    });
                }
            }

            Declaration::Constant(konst) => {
                let Some(symbol_id) = self.bindings.symbol_of(konst.id) else {
                    return;
                };
                let ty = self.symbol_type(symbol_id);
                let value = match &self.bindings.table.symbol(symbol_id).payload {
                    SymbolPayload::Constant { value } => *value,
                    _ => None,
                };
                module.add_global(IlGlobal {
                    name: konst.name.name.clone(),
                    ty: IlType::from_language(&ty),
                    storage: StorageClass::ImmediateConstant,
                    address: None,
                    size: ty.size_in_bytes().max(1),
                    initial: value,
                    data: None,
                });
                if konst.exported {
                    module.add_export(IlExport {
                        local_name: konst.name.name.clone(),
                        external_name: konst.name.name.clone(),
                        kind: ExportKind::Constant,
                    });
                }
            }

            Declaration::MemoryMap(map) => {
                let Some(symbol_id) = self.bindings.symbol_of(map.id) else {
                    return;
                };
                let ty = self.symbol_type(symbol_id);
                let storage = match map.storage {
                    StorageKind::Absolute => StorageClass::Map,
                    StorageKind::ZeroPage => StorageClass::ZeroPage,
                };
                module.add_global(IlGlobal {
                    name: map.name.name.clone(),
                    ty: IlType::from_language(&ty),
                    storage,
                    address: Some(map.address),
                    size: ty.size_in_bytes().max(1),
                    initial: None,
                    data: None,
                });
            }

            Declaration::Enum(e) => {
                // Members become immediate constants
                for member in &e.members {
                    let Some(symbol_id) = self.bindings.symbol_of(member.id) else {
                        continue;
                    };
                    let symbol = self.bindings.table.symbol(symbol_id);
                    let SymbolPayload::EnumMember { value } = symbol.payload else {
                        continue;
                    };
                    let ty = symbol.ty.clone().unwrap_or(Type::Byte);
                    module.add_global(IlGlobal {
                        name: member.name.name.clone(),
                        ty: IlType::from_language(&ty),
                        storage: StorageClass::ImmediateConstant,
                        address: None,
                        size: ty.size_in_bytes().max(1),
                        initial: Some(value),
                        data: None,
                    });
                }
            }

            Declaration::Import(import) => {
                for name in &import.names {
                    module.add_import(IlImport {
                        local_name: name.name.clone(),
                        original_name: name.name.clone(),
                        source_module: import.module_name(),
                    });
                }
            }

            Declaration::Function(func) => {
                if func.exported {
                    module.add_export(IlExport {
                        local_name: func.name.name.clone(),
                        external_name: func.name.name.clone(),
                        kind: ExportKind::Function,
                    });
                }
            }
        }
    }

    fn lower_function(&mut self, func: &FunctionDecl) -> IlFunction {
        // Reset per-function state
        self.slot_names.clear();
        self.loop_stack.clear();
        self.next_temp = 0;

        let signature = self
            .bindings
            .symbol_of(func.id)
            .and_then(|id| self.bindings.table.symbol(id).ty.clone());
        let return_type = match &signature {
            Some(Type::Function(f)) => IlType::from_language(&f.return_type),
            _ => IlType::Void,
        };

        let mut il_func = IlFunction::new(&func.name.name, return_type);

        // Parameters: register at entry, then spilled to a slot so
        // reassignment in the body works uniformly
        let mut param_stores: Vec<(String, Register)> = Vec::new();
        for param in &func.params {
            let Some(symbol_id) = self.bindings.symbol_of(param.id) else {
                continue;
            };
            let ty = self.symbol_type(symbol_id);
            let reg = il_func.add_param(&param.name.name, IlType::from_language(&ty));
            let slot = self.slot_name(symbol_id);
            param_stores.push((slot, reg));
        }

        let entry = il_func.create_block(Some("entry"));
        self.current_block = entry;
        self.func = Some(il_func);

        for (slot, reg) in param_stores {
            self.emit(InstrKind::StoreVar { name: slot, value: reg }, None);
        }

        for stmt in &func.body.statements {
            self.lower_stmt(stmt);
        }

        // Implicit return for void functions; anything else falling off
        // the end is unreachable (checked upstream)
        if !self.current_block_terminated() {
            let terminator = if return_type == IlType::Void {
                Terminator::Return { value: None }
            } else {
                Terminator::Unreachable
            };
            self.set_terminator(terminator);
        }

        let mut il_func = self.func.take().expect("function in progress");

        // Blocks created after a terminator may never have been closed
        let unterminated: Vec<BlockId> = il_func
            .blocks()
            .filter(|b| !b.is_terminated())
            .map(|b| b.id)
            .collect();
        for block in unterminated {
            il_func.set_terminator(block, Terminator::Unreachable);
        }

        il_func
    }

    // ----- shared helpers -----

    pub(crate) fn func_mut(&mut self) -> &mut IlFunction {
        self.func.as_mut().expect("no function in progress")
    }

    /// Append an instruction to the current block.
    pub(crate) fn emit(&mut self, kind: InstrKind, result_ty: Option<IlType>) -> Option<Register> {
        let block = self.current_block;
        self.func_mut().emit(block, kind, result_ty)
    }

    pub(crate) fn set_terminator(&mut self, terminator: Terminator) {
        let block = self.current_block;
        self.func_mut().set_terminator(block, terminator);
    }

    pub(crate) fn current_block_terminated(&self) -> bool {
        let func = self.func.as_ref().expect("no function in progress");
        func.block(self.current_block).is_terminated()
    }

    pub(crate) fn create_block(&mut self, label: Option<&str>) -> BlockId {
        self.func_mut().create_block(label)
    }

    /// Switch the cursor to `block`.
    pub(crate) fn seal_and_switch(&mut self, block: BlockId) {
        self.current_block = block;
    }

    /// Unique slot name for a local symbol; shadowed names get a suffix.
    pub(crate) fn slot_name(&mut self, symbol: SymbolId) -> String {
        if let Some(name) = self.slot_names.get(&symbol) {
            return name.clone();
        }
        let base = self.bindings.table.symbol(symbol).name.clone();
        let name = if self.slot_names.values().any(|n| *n == base) {
            format!("{}.{}", base, symbol.0)
        } else {
            base
        };
        self.slot_names.insert(symbol, name.clone());
        name
    }

    /// Fresh synthesized temp slot.
    pub(crate) fn temp_slot(&mut self) -> String {
        let name = format!(".t{}", self.next_temp);
        self.next_temp += 1;
        name
    }

    pub(crate) fn symbol_type(&self, symbol: SymbolId) -> Type {
        self.bindings
            .table
            .symbol(symbol)
            .ty
            .clone()
            .unwrap_or(Type::Unknown)
    }

    /// Language type the checker recorded for an expression node.
    pub(crate) fn expr_type(&self, node: NodeId) -> Type {
        self.types.type_of(node).cloned().unwrap_or(Type::Unknown)
    }

    pub(crate) fn error(&mut self, error: CompileError) {
        self.errors.push(error);
    }

    /// Widen or pass through so `reg` carries `target`.
    pub(crate) fn coerce(&mut self, reg: Register, target: IlType) -> Register {
        if reg.ty == target {
            return reg;
        }
        match (reg.ty, target) {
            (IlType::Byte, IlType::Word) | (IlType::Byte, IlType::Ptr) => self
                .emit(InstrKind::ZeroExtend { value: reg }, Some(target))
                .expect("zext produces a register"),
            (IlType::Word, IlType::Byte) => self
                .emit(InstrKind::Truncate { value: reg }, Some(IlType::Byte))
                .expect("trunc produces a register"),
            (IlType::Word, IlType::Ptr) | (IlType::Ptr, IlType::Word) => {
                // Same representation; re-type through a move-free cast
                Register {
                    id: reg.id,
                    ty: target,
                    name: reg.name,
                }
            }
            _ => reg,
        }
    }

    /// Intern a string literal as a data global; returns its name.
    pub(crate) fn intern_string(&mut self, text: &str) -> String {
        let name = format!(".str{}", self.next_string);
        self.next_string += 1;
        let mut data: Vec<u8> = text.bytes().collect();
        data.push(0);
        self.string_globals.push(IlGlobal {
            name: name.clone(),
            ty: IlType::Ptr,
            storage: StorageClass::Ram,
            address: None,
            size: data.len() as u32,
            initial: None,
            data: Some(data),
        });
        name
    }

    /// Storage facts for a module-scope symbol, if it is memory-mapped.
    pub(crate) fn mapped_address(&self, symbol: SymbolId) -> Option<u16> {
        match self.bindings.table.symbol(symbol).payload {
            SymbolPayload::MemoryMapped { address, .. } => Some(address),
            _ => None,
        }
    }

    pub(crate) fn is_module_scope_symbol(&self, symbol: SymbolId) -> bool {
        self.bindings.table.symbol(symbol).scope == self.bindings.table.module_scope()
    }
}
