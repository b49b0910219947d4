//! Compile-time evaluation of constant expressions: array extents, `const`
//! initializers, and `const` element reads. Guaranteed total on valid input
//! because upstream already rejected non-constant uses in constant-required
//! positions; evaluation is independent of register allocation and emits
//! nothing.

use super::Generator;
use crate::frontend::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::middle::scope::SymbolKind;

/// Two's-complement integer semantics: truncating division, sign-following
/// remainder, wraparound on overflow
pub(super) fn eval_binary(op: BinaryOp, a: i32, b: i32) -> i32 {
    match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => a.checked_div(b).unwrap_or(0),
        BinaryOp::Rem => a.checked_rem(b).unwrap_or(0),
        _ => unreachable!("constant expressions only contain arithmetic operators"),
    }
}

impl Generator<'_> {
    pub(super) fn fold(&self, expr: &Expr) -> i32 {
        self.try_fold(expr)
            .expect("expression in a constant-required position folds by upstream contract")
    }

    /// `Some` when the expression's value is statically known; used both for
    /// required constants and to decide whether a `const` array access folds
    pub(super) fn try_fold(&self, expr: &Expr) -> Option<i32> {
        match &expr.kind {
            ExprKind::Literal(value) => Some(*value),
            ExprKind::Unary { op, operand } => {
                let value = self.try_fold(operand)?;

                match op {
                    UnaryOp::Plus => Some(value),
                    UnaryOp::Neg => Some(value.wrapping_neg()),
                    // `!` cannot occur in a constant expression
                    UnaryOp::Not => None,
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                if op.is_comparison() || op.is_logical() {
                    return None;
                }

                let lhs = self.try_fold(lhs)?;
                let rhs = self.try_fold(rhs)?;
                Some(eval_binary(*op, lhs, rhs))
            }
            ExprKind::LValue(lvalue) => {
                let id = self
                    .scopes
                    .lookup_assigned(self.cursor.current(), lvalue.name.symbol, None)?;

                // Only `const` symbols fold; a variable's recorded initial
                // value says nothing about its value here
                if !self.scopes.symbol(id).is_const() {
                    return None;
                }

                if lvalue.indices.is_empty() {
                    return self.const_values.get(&id).copied();
                }

                // A fully indexed const array element with statically known
                // indices
                let values = self.const_arrays.get(&id)?;
                let symbol = self.scopes.symbol(id);

                if lvalue.indices.len() != symbol.rank() {
                    return None;
                }

                let flat = match &symbol.kind {
                    SymbolKind::Value {
                        inner_extent: Some(inner),
                        ..
                    } if lvalue.indices.len() == 2 => {
                        self.try_fold(&lvalue.indices[0])? * inner
                            + self.try_fold(&lvalue.indices[1])?
                    }
                    _ => self.try_fold(&lvalue.indices[0])?,
                };

                values.get(flat as usize).copied()
            }
            ExprKind::Call { .. } => None,
        }
    }
}
