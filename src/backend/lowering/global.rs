//! Global value lowering. Every global initializer is constant-folded
//! eagerly, so the emitted line always carries literal values; an all-zero
//! array collapses to the zero-fill marker instead of an element list.

use itertools::Itertools;

use super::{Generator, stmt::collect_array_init};
use crate::{
    backend::ty::IrType,
    frontend::ast::{Decl, Initializer},
};

impl<'ast> Generator<'ast> {
    pub(super) fn lower_global_decl(&mut self, decl: &'ast Decl) {
        let storage = if decl.is_const { "constant" } else { "global" };
        let name = decl.name.symbol;

        if decl.dims.is_empty() {
            // A missing initializer means zero
            let value = match &decl.init {
                Some(Initializer::Scalar(expr)) => self.fold(expr),
                Some(Initializer::List(_)) => {
                    unreachable!("scalar declarations take scalar initializers")
                }
                None => 0,
            };

            let id = self.define_global(decl);
            self.const_values.insert(id, value);
            self.scopes
                .assign_identity(id, format!("@{name}"), IrType::I32);

            self.output
                .push(format!("@{name} = dso_local {storage} i32 {value}"));
            return;
        }

        let dims: Vec<i32> = decl.dims.iter().map(|dim| self.fold(dim)).collect();
        let total = dims.iter().product::<i32>().max(0) as usize;

        let ty = if dims.len() == 1 {
            IrType::array(dims[0], IrType::I32)
        } else {
            IrType::array(dims[0], IrType::array(dims[1], IrType::I32))
        };

        // Globals zero-fill: unwritten positions become explicit zeros (or
        // fold the whole initializer into the zero-fill marker)
        let values: Vec<i32> = match &decl.init {
            None => vec![0; total],
            Some(init) => collect_array_init(init, &dims, total)
                .iter()
                .map(|element| element.map(|expr| self.fold(expr)).unwrap_or(0))
                .collect(),
        };

        let initializer = render_array_initializer(&values, &dims);

        let id = self.define_global(decl);

        if decl.is_const {
            self.const_arrays.insert(id, values);
        }
        self.set_inner_extent(id, &dims);
        self.scopes.assign_identity(id, format!("@{name}"), ty.clone());

        self.output
            .push(format!("@{name} = dso_local {storage} {ty} {initializer}"));
    }

    /// Finds the declared symbol; the initializer was folded before this,
    /// so self-shadowing reads resolved outward
    fn define_global(&mut self, decl: &'ast Decl) -> crate::middle::scope::SymbolId {
        self.scopes
            .lookup_assigned(
                self.cursor.current(),
                decl.name.symbol,
                Some(decl.name.symbol),
            )
            .expect("declared symbol exists in the root frame")
    }
}

fn render_array_initializer(values: &[i32], dims: &[i32]) -> String {
    if values.iter().all(|value| *value == 0) {
        return "zeroinitializer".to_owned();
    }

    if dims.len() == 1 {
        return elements_text(values);
    }

    // Rank two: one typed entry per row, zero rows collapsed individually
    let inner = dims[1];
    let row_ty = IrType::array(inner, IrType::I32);

    let rows = values
        .chunks(inner as usize)
        .map(|row| {
            if row.iter().all(|value| *value == 0) {
                format!("{row_ty} zeroinitializer")
            } else {
                format!("{row_ty} {}", elements_text(row))
            }
        })
        .join(", ");

    format!("[{rows}]")
}

fn elements_text(values: &[i32]) -> String {
    format!(
        "[{}]",
        values.iter().map(|value| format!("i32 {value}")).join(", ")
    )
}
