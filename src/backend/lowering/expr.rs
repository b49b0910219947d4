//! Value lowering: each expression contributes the instructions needed to
//! materialize its value into the current chunk and hands back the register
//! or literal holding it. Constant-foldable pieces flow as literal text and
//! never touch the allocator.

use super::Generator;
use crate::{
    backend::{chunk::ChunkId, ty::IrType},
    frontend::ast::{BinaryOp, Expr, ExprKind, LValue, UnaryOp},
    middle::scope::{SymbolId, SymbolKind},
};

impl Generator<'_> {
    /// Lowers an expression for its value. The returned string is either a
    /// register name or a literal.
    pub(super) fn lower_value_into(&mut self, chunk: ChunkId, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Literal(value) => value.to_string(),
            ExprKind::LValue(lvalue) => self.lower_lvalue_read(chunk, lvalue),
            ExprKind::Call { callee, args } => self
                .emit_call(chunk, callee.symbol, args)
                .expect("a void function call cannot be used as a value"),
            ExprKind::Unary { op, operand } => {
                let value = self.lower_value_into(chunk, operand);

                match op {
                    UnaryOp::Plus => value,
                    UnaryOp::Neg => {
                        self.emit_arith(chunk, BinaryOp::Sub, "0".to_owned(), value)
                    }
                    UnaryOp::Not => self.lower_not(chunk, value),
                }
            }
            ExprKind::Binary { op, lhs, rhs } if op.is_comparison() => {
                let lhs = self.lower_value_into(chunk, lhs);
                let rhs = self.lower_value_into(chunk, rhs);
                let lhs = self.coerce_to_i32(chunk, lhs);
                let rhs = self.coerce_to_i32(chunk, rhs);

                self.emit_icmp(chunk, *op, &lhs, &rhs)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                if op.is_logical() {
                    unreachable!("`&&`/`||` only occur in condition position")
                }

                let lhs = self.lower_value_into(chunk, lhs);
                let rhs = self.lower_value_into(chunk, rhs);

                self.emit_arith(chunk, *op, lhs, rhs)
            }
        }
    }

    /// Logical negation. Literals fold; booleans flip with `xor`; integers
    /// are compared against zero first.
    pub(super) fn lower_not(&mut self, chunk: ChunkId, value: String) -> String {
        if let Ok(literal) = value.parse::<i32>() {
            return if literal != 0 { "0" } else { "1" }.to_owned();
        }

        let flipped = if self.local_type(&value).is_some_and(IrType::is_bool) {
            value
        } else {
            self.emit_icmp(chunk, BinaryOp::Ne, &value, "0")
        };

        let name = self.alloc_register(IrType::I1);
        self.arena
            .emit(chunk, format!("    {name} = xor i1 {flipped}, true"));
        name
    }

    fn lower_lvalue_read(&mut self, chunk: ChunkId, lvalue: &LValue) -> String {
        let id = self.lookup_value(lvalue.name.symbol);
        let symbol = self.scopes.symbol(id);
        let rank = symbol.rank();
        let is_const = symbol.is_const();

        if rank == 0 {
            if is_const {
                return self.const_values[&id].to_string();
            }

            let slot = symbol.ir_name().to_owned();
            return self.emit_load(chunk, IrType::I32, &slot);
        }

        // A fully indexed const array element folds when every index is
        // statically known; a single dynamic index forces the load path
        if is_const && lvalue.indices.len() == rank {
            if let Some(value) = self.fold_const_element(id, lvalue) {
                return value.to_string();
            }
        }

        if lvalue.indices.len() == rank {
            let address = self.lower_element_address(chunk, id, &lvalue.indices);
            self.emit_load(chunk, IrType::I32, &address)
        } else {
            // Partially indexed arrays decay to a pointer to their first
            // remaining element, for passing as a call argument
            self.lower_decayed_address(chunk, id, &lvalue.indices)
        }
    }

    fn fold_const_element(&self, id: SymbolId, lvalue: &LValue) -> Option<i32> {
        let indices: Vec<i32> = lvalue
            .indices
            .iter()
            .map(|index| self.try_fold(index))
            .collect::<Option<_>>()?;

        let flat = match &self.scopes.symbol(id).kind {
            SymbolKind::Value {
                inner_extent: Some(inner),
                ..
            } if indices.len() == 2 => indices[0] * inner + indices[1],
            _ => indices[0],
        };

        self.const_arrays.get(&id)?.get(flat as usize).copied()
    }

    /// Address of a fully indexed array element (an `i32*`)
    pub(super) fn lower_element_address(
        &mut self,
        chunk: ChunkId,
        id: SymbolId,
        indices: &[Expr],
    ) -> String {
        let index_values = self.lower_indices(chunk, indices);
        let ty = self.scopes.symbol(id).ir_ty().clone();
        let base = self.scopes.symbol(id).ir_name().to_owned();

        match ty {
            // A pointer-typed parameter: its slot holds a pointer to the
            // first element, so it is loaded and indexed without the
            // leading zero index a named aggregate needs
            IrType::Ptr(pointee) => {
                let pointer = self.emit_load(chunk, IrType::Ptr(pointee.clone()), &base);
                self.emit_gep(chunk, &pointee, &pointer, &index_values, IrType::I32)
            }
            aggregate @ IrType::Array(..) => {
                let mut gep_indices = vec!["0".to_owned()];
                gep_indices.extend(index_values);
                self.emit_gep(chunk, &aggregate, &base, &gep_indices, IrType::I32)
            }
            _ => unreachable!("indexed a scalar; upstream validated ranks"),
        }
    }

    /// Address of a partially indexed array, decayed one aggregate level to
    /// a pointer to its first remaining element
    pub(super) fn lower_decayed_address(
        &mut self,
        chunk: ChunkId,
        id: SymbolId,
        indices: &[Expr],
    ) -> String {
        let index_values = self.lower_indices(chunk, indices);
        let ty = self.scopes.symbol(id).ir_ty().clone();
        let base = self.scopes.symbol(id).ir_name().to_owned();

        match ty {
            IrType::Ptr(pointee) => {
                let pointer = self.emit_load(chunk, IrType::Ptr(pointee.clone()), &base);

                if index_values.is_empty() {
                    return pointer;
                }

                let mut gep_indices = index_values;
                gep_indices.push("0".to_owned());

                let element = descend(&pointee, gep_indices.len() - 1);
                self.emit_gep(chunk, &pointee, &pointer, &gep_indices, element)
            }
            aggregate @ IrType::Array(..) => {
                let mut gep_indices = vec!["0".to_owned()];
                gep_indices.extend(index_values);
                gep_indices.push("0".to_owned());

                let element = descend(&aggregate, gep_indices.len() - 1);
                self.emit_gep(chunk, &aggregate, &base, &gep_indices, element)
            }
            _ => unreachable!("decayed a scalar; upstream validated ranks"),
        }
    }

    fn lower_indices(&mut self, chunk: ChunkId, indices: &[Expr]) -> Vec<String> {
        indices
            .iter()
            .map(|index| {
                let value = self.lower_value_into(chunk, index);
                self.coerce_to_i32(chunk, value)
            })
            .collect()
    }
}

/// The type reached after descending `levels` aggregate levels (the first
/// `getelementptr` index steps over the base pointer and descends nothing)
fn descend(ty: &IrType, levels: usize) -> IrType {
    let mut current = ty;

    for _ in 0..levels {
        current = current.element();
    }

    current.clone()
}
