//! The lowering engine. A [`Generator`] owns all mutable traversal state —
//! the scope cursor, the per-function register counter and value table, the
//! constant tables, and the backfill stack — and is threaded through every
//! lowering call, so independent compilations never share state.
//!
//! By contract every source-level error was rejected upstream; any failed
//! lookup or unresolvable jump in here is an engine bug and panics.

mod cond;
mod expr;
mod fold;
mod global;
mod stmt;

use hashbrown::HashMap;
use itertools::Itertools;

use crate::{
    backend::{
        chunk::{BackfillStack, ChunkArena, ChunkId},
        ty::IrType,
    },
    frontend::{
        ast::{BinaryOp, CompUnit, FunctionDefinition, Param, ReturnKind},
        intern::InternedSymbol,
    },
    middle::scope::{ScopeCursor, ScopeTree, SymbolId, SymbolKind},
};

const TAB: &str = "    ";

pub struct Generator<'ast> {
    unit: &'ast CompUnit,
    scopes: ScopeTree,
    cursor: ScopeCursor,
    arena: ChunkArena,
    backfill: BackfillStack,

    /// One flag per enclosing if-arm/else-arm/for-body: set once the body
    /// lowered a direct terminator, so no synthetic trailing jump is added
    terminated: Vec<bool>,

    /// Function-local register counter; −1 so the first allocation is 0
    next_register: i32,
    /// Types of every register and label allocated in the current function
    locals: HashMap<String, IrType>,

    /// Evaluated `const` scalars (plus global variable initial values,
    /// which are read by constant folding but never substituted at use
    /// sites)
    const_values: HashMap<SymbolId, i32>,
    /// Flattened `const` array contents, row-major
    const_arrays: HashMap<SymbolId, Vec<i32>>,

    output: Vec<String>,
}

impl<'ast> Generator<'ast> {
    pub fn new(unit: &'ast CompUnit, scopes: ScopeTree) -> Self {
        let root = scopes.root();

        Self {
            unit,
            scopes,
            cursor: ScopeCursor::new(root),
            arena: ChunkArena::new(),
            backfill: BackfillStack::new(),
            terminated: Vec::new(),
            next_register: -1,
            locals: HashMap::new(),
            const_values: HashMap::new(),
            const_arrays: HashMap::new(),
            output: Vec::new(),
        }
    }

    /// Lowers the whole unit: intrinsic declarations, then globals, then
    /// function bodies, then the entry function
    pub fn generate(mut self) -> String {
        self.declare_intrinsics();

        let unit = self.unit;

        for decl in &unit.decls {
            self.lower_global_decl(decl);
        }

        for function in &unit.functions {
            self.lower_function(function);
        }

        self.lower_function(&unit.entry);

        self.output.join("\n") + "\n"
    }

    /// Emits the fixed library function declarations and assigns their IR
    /// identities
    fn declare_intrinsics(&mut self) {
        for (name, return_kind) in [
            ("getint", ReturnKind::Int),
            ("putint", ReturnKind::Void),
            ("putch", ReturnKind::Void),
        ] {
            let id = self
                .scopes
                .lookup(self.scopes.root(), InternedSymbol::new(name))
                .expect("intrinsics are seeded by the scope builder");

            let return_ty = match return_kind {
                ReturnKind::Int => IrType::I32,
                ReturnKind::Void => IrType::Void,
            };
            self.scopes.assign_identity(id, format!("@{name}"), return_ty);

            let SymbolKind::Function { params, .. } = &self.scopes.symbol(id).kind else {
                unreachable!("intrinsics are functions")
            };
            let params = params.clone();

            for param in &params {
                self.scopes.symbol_mut(*param).ir_ty = Some(IrType::I32);
            }

            let params_text = params.iter().map(|_| "i32").join(", ");
            let return_text = match return_kind {
                ReturnKind::Int => "i32",
                ReturnKind::Void => "void",
            };

            self.output
                .push(format!("declare {return_text} @{name}({params_text})"));
        }
    }

    fn lower_function(&mut self, function: &'ast FunctionDefinition) {
        // Fresh register numbering and value table per function body
        self.next_register = -1;
        self.locals.clear();

        let name = function.name.symbol;
        let function_id = self
            .scopes
            .lookup_assigned(self.scopes.root(), name, Some(name))
            .expect("function symbol exists before its body is lowered");

        let return_text = match function.return_kind {
            ReturnKind::Int => "i32",
            ReturnKind::Void => "void",
        };

        self.cursor.enter_child(&self.scopes);

        // Parameters take the first register numbers, in order
        let param_types: Vec<IrType> = function
            .params
            .iter()
            .map(|param| self.realize_param_type(param))
            .collect();

        let param_registers: Vec<String> = param_types
            .iter()
            .map(|ty| self.alloc_register(ty.clone()))
            .collect();

        // One number is reserved for the function itself
        self.next_register += 1;

        let header_params = param_types
            .iter()
            .zip(&param_registers)
            .map(|(ty, register)| format!("{ty} {register}"))
            .join(", ");

        let return_ty = match function.return_kind {
            ReturnKind::Int => IrType::I32,
            ReturnKind::Void => IrType::Void,
        };
        self.scopes
            .assign_identity(function_id, format!("@{name}"), return_ty);

        let chunk = self.arena.new_chunk();
        self.arena.emit(
            chunk,
            format!("define dso_local {return_text} @{name}({header_params}) {{"),
        );

        // Incoming parameter registers are spilled to stack slots before the
        // body runs; the slot becomes the parameter symbol's identity
        let SymbolKind::Function { params, .. } = &self.scopes.symbol(function_id).kind else {
            unreachable!("function symbols carry their parameter list")
        };
        let param_symbols = params.clone();

        for ((param_id, ty), register) in
            param_symbols.iter().zip(param_types).zip(param_registers)
        {
            let slot = self.emit_alloca(chunk, ty.clone());
            self.arena
                .emit(chunk, store_line(&ty, &register, &slot));
            self.scopes.assign_identity(*param_id, slot, ty);
        }

        // The body shares the parameter frame; items lower one by one and
        // are flattened at the end, once every nested jump is patched
        for item in &function.body.items {
            let child = self.lower_block_item(item);
            self.arena.adopt(chunk, child);
        }

        let mut lines: Vec<String> = self
            .arena
            .render(chunk)
            .lines()
            .map(str::to_owned)
            .collect();

        // A void function may fall off the end of its body (an int function
        // always ends in an explicit return, which upstream validated)
        if function.return_kind == ReturnKind::Void
            && !lines
                .last()
                .is_some_and(|line| line.trim_start().starts_with("ret"))
        {
            lines.push(format!("{TAB}ret void"));
        }

        lines.push("}".to_owned());

        self.output.push(lines.join("\n"));
        self.cursor.exit();
    }

    /// The realized IR type of a parameter: array ranks decay one pointer
    /// level
    fn realize_param_type(&mut self, param: &Param) -> IrType {
        match param.rank {
            0 => IrType::I32,
            1 => IrType::I32.ptr(),
            2 => {
                let inner = self.fold(
                    param
                        .inner_len
                        .as_ref()
                        .expect("rank-two parameters carry an inner extent"),
                );
                IrType::array(inner, IrType::I32).ptr()
            }
            _ => unreachable!("parser rejects ranks above two"),
        }
    }

    /* Register and label allocation */

    fn alloc_register(&mut self, ty: IrType) -> String {
        self.next_register += 1;
        let name = format!("%{}", self.next_register);
        self.locals.insert(name.clone(), ty);
        name
    }

    fn alloc_label(&mut self) -> String {
        self.alloc_register(IrType::Label)
    }

    fn local_type(&self, name: &str) -> Option<&IrType> {
        self.locals.get(name)
    }

    /* Shared instruction emitters */

    fn emit_alloca(&mut self, chunk: ChunkId, ty: IrType) -> String {
        let name = self.alloc_register(ty.clone());
        self.arena.emit(chunk, format!("{TAB}{name} = alloca {ty}"));
        name
    }

    fn emit_load(&mut self, chunk: ChunkId, ty: IrType, source: &str) -> String {
        let name = self.alloc_register(ty.clone());
        self.arena
            .emit(chunk, format!("{TAB}{name} = load {ty}, {ty}* {source}"));
        name
    }

    fn emit_icmp(&mut self, chunk: ChunkId, op: BinaryOp, lhs: &str, rhs: &str) -> String {
        let mnemonic = match op {
            BinaryOp::Lt => "slt",
            BinaryOp::Le => "sle",
            BinaryOp::Gt => "sgt",
            BinaryOp::Ge => "sge",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            _ => unreachable!("not a comparison operator"),
        };

        let name = self.alloc_register(IrType::I1);
        self.arena.emit(
            chunk,
            format!("{TAB}{name} = icmp {mnemonic} i32 {lhs}, {rhs}"),
        );
        name
    }

    fn emit_zext(&mut self, chunk: ChunkId, value: &str) -> String {
        let name = self.alloc_register(IrType::I32);
        self.arena
            .emit(chunk, format!("{TAB}{name} = zext i1 {value} to i32"));
        name
    }

    /// Just-in-time boolean widening: a value of recorded type `i1` is
    /// `zext`ed before any integer use. Literals are not in the table and
    /// pass through.
    fn coerce_to_i32(&mut self, chunk: ChunkId, value: String) -> String {
        if self.local_type(&value).is_some_and(IrType::is_bool) {
            self.emit_zext(chunk, &value)
        } else {
            value
        }
    }

    /// Arithmetic with constant folding: two literal operands reduce to a
    /// literal (except division by a literal zero, which stays a runtime
    /// instruction), everything else allocates a register
    fn emit_arith(&mut self, chunk: ChunkId, op: BinaryOp, lhs: String, rhs: String) -> String {
        let lhs = self.coerce_to_i32(chunk, lhs);
        let rhs = self.coerce_to_i32(chunk, rhs);

        if let (Ok(a), Ok(b)) = (lhs.parse::<i32>(), rhs.parse::<i32>()) {
            let divides = matches!(op, BinaryOp::Div | BinaryOp::Rem);

            if !divides || b != 0 {
                return fold::eval_binary(op, a, b).to_string();
            }
        }

        let mnemonic = match op {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "sdiv",
            BinaryOp::Rem => "srem",
            _ => unreachable!("not an arithmetic operator"),
        };

        let name = self.alloc_register(IrType::I32);
        self.arena.emit(
            chunk,
            format!("{TAB}{name} = {mnemonic} i32 {lhs}, {rhs}"),
        );
        name
    }

    /// `getelementptr` into an aggregate or through a pointer; `element_ty`
    /// is what the resulting pointer points at
    fn emit_gep(
        &mut self,
        chunk: ChunkId,
        base_ty: &IrType,
        base: &str,
        indices: &[String],
        element_ty: IrType,
    ) -> String {
        let name = self.alloc_register(element_ty);
        let indices = indices.iter().map(|i| format!("i32 {i}")).join(", ");

        self.arena.emit(
            chunk,
            format!("{TAB}{name} = getelementptr {base_ty}, {base_ty}* {base}, {indices}"),
        );
        name
    }

    /// Lowers a call's arguments and emits the call; returns the result
    /// register for value-returning callees
    fn emit_call(
        &mut self,
        chunk: ChunkId,
        callee: InternedSymbol,
        args: &[crate::frontend::ast::Expr],
    ) -> Option<String> {
        let values: Vec<String> = args
            .iter()
            .map(|arg| {
                let value = self.lower_value_into(chunk, arg);
                self.coerce_to_i32(chunk, value)
            })
            .collect();

        self.emit_call_with_values(chunk, callee, values)
    }

    /// Emits a call whose argument values are already materialized (the
    /// `printf` decomposition synthesizes its own arguments)
    fn emit_call_with_values(
        &mut self,
        chunk: ChunkId,
        callee: InternedSymbol,
        values: Vec<String>,
    ) -> Option<String> {
        let id = self
            .scopes
            .lookup_assigned(self.cursor.current(), callee, None)
            .expect("callee was validated upstream");

        let SymbolKind::Function {
            return_kind,
            params,
        } = &self.scopes.symbol(id).kind
        else {
            unreachable!("call target is a function")
        };
        let return_kind = *return_kind;
        let callee_name = self.scopes.symbol(id).ir_name().to_owned();
        let param_types: Vec<IrType> = params
            .iter()
            .map(|param| self.scopes.symbol(*param).ir_ty().clone())
            .collect();

        debug_assert_eq!(param_types.len(), values.len());

        let args_text = param_types
            .iter()
            .zip(&values)
            .map(|(ty, value)| format!("{ty} {value}"))
            .join(", ");

        match return_kind {
            ReturnKind::Int => {
                let name = self.alloc_register(IrType::I32);
                self.arena.emit(
                    chunk,
                    format!("{TAB}{name} = call i32 {callee_name}({args_text})"),
                );
                Some(name)
            }
            ReturnKind::Void => {
                self.arena
                    .emit(chunk, format!("{TAB}call void {callee_name}({args_text})"));
                None
            }
        }
    }

    /// Places a label line; the blank line keeps basic blocks visually
    /// separated
    fn emit_label(&mut self, chunk: ChunkId, label: &str) {
        self.arena.emit(chunk, format!("\n{}:", &label[1..]));
    }

    fn mark_terminated(&mut self) {
        if let Some(flag) = self.terminated.last_mut() {
            *flag = true;
        }
    }

    fn lookup_value(&self, name: InternedSymbol) -> SymbolId {
        self.scopes
            .lookup_assigned(self.cursor.current(), name, None)
            .expect("name was validated upstream and declared before use")
    }
}

fn store_line(value_ty: &IrType, value: &str, slot: &str) -> String {
    format!("{TAB}store {value_ty} {value}, {value_ty}* {slot}")
}
