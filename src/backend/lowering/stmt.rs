//! Statement lowering. Control-flow statements allocate their labels only
//! after their sub-statements have consumed registers, so conditions and
//! `break`/`continue` jumps are created pending and patched here once the
//! surrounding shape is known. Compound statements stay unflattened while
//! any nested jump is still pending.

use super::Generator;
use crate::{
    backend::{
        chunk::{ChunkId, unconditional_jump_line},
        ty::IrType,
    },
    frontend::{
        ast::{
            Assign, Block, BlockItem, Decl, Expr, ExprKind, Initializer, Statement, StatementKind,
        },
        intern::InternedSymbol,
    },
};

const TAB: &str = "    ";

impl<'ast> Generator<'ast> {
    pub(super) fn lower_block_item(&mut self, item: &'ast BlockItem) -> ChunkId {
        match item {
            BlockItem::Decl(decl) => self.lower_local_decl(decl),
            BlockItem::Stmt(stmt) => self.lower_statement(stmt),
        }
    }

    pub(super) fn lower_statement(&mut self, stmt: &'ast Statement) -> ChunkId {
        match &stmt.kind {
            StatementKind::Assign(assign) => self.lower_assign(assign),
            StatementKind::Expr(None) => self.arena.new_chunk(),
            StatementKind::Expr(Some(expr)) => {
                let chunk = self.arena.new_chunk();

                // A call for effect may be void; anything else is lowered
                // for its (discarded) side effects
                if let ExprKind::Call { callee, args } = &expr.kind {
                    self.emit_call(chunk, callee.symbol, args);
                } else {
                    self.lower_value_into(chunk, expr);
                }

                chunk
            }
            StatementKind::Block(block) => self.lower_block(block),
            StatementKind::If {
                condition,
                then_branch,
                else_branch,
            } => self.lower_if(condition, then_branch, else_branch.as_deref()),
            StatementKind::For {
                init,
                condition,
                step,
                body,
            } => self.lower_for(init.as_ref(), condition.as_ref(), step.as_ref(), body),
            StatementKind::Break => {
                let chunk = self.arena.new_chunk();
                self.arena.set_pending_goto(chunk);
                self.backfill.record_break(chunk);
                self.mark_terminated();
                chunk
            }
            StatementKind::Continue => {
                let chunk = self.arena.new_chunk();
                self.arena.set_pending_goto(chunk);
                self.backfill.record_continue(chunk);
                self.mark_terminated();
                chunk
            }
            StatementKind::Return(value) => {
                let chunk = self.arena.new_chunk();

                match value {
                    Some(value) => {
                        let value = self.lower_value_into(chunk, value);
                        let value = self.coerce_to_i32(chunk, value);
                        self.arena.emit(chunk, format!("{TAB}ret i32 {value}"));
                    }
                    None => self.arena.emit(chunk, format!("{TAB}ret void")),
                }

                self.mark_terminated();
                chunk
            }
            StatementKind::Printf { format, args, .. } => self.lower_printf(format.value(), args),
        }
    }

    /// A compound statement aggregates its children and defers flattening;
    /// anything after a `break`/`continue` in the same block is dead and is
    /// never lowered
    fn lower_block(&mut self, block: &'ast Block) -> ChunkId {
        self.cursor.enter_child(&self.scopes);

        let chunk = self.arena.new_chunk();

        for item in &block.items {
            let child = self.lower_block_item(item);
            self.arena.adopt(chunk, child);

            if let BlockItem::Stmt(stmt) = item {
                if matches!(stmt.kind, StatementKind::Break | StatementKind::Continue) {
                    break;
                }
            }
        }

        self.cursor.exit();
        chunk
    }

    fn lower_if(
        &mut self,
        condition: &'ast Expr,
        then_branch: &'ast Statement,
        else_branch: Option<&'ast Statement>,
    ) -> ChunkId {
        let leaves = self.lower_condition(condition);

        // Labels are allocated right before each branch is lowered; the
        // join label can only be allocated after both branches have
        // consumed their registers
        self.terminated.push(false);
        let body_label = self.alloc_label();
        let body_chunk = self.lower_statement(then_branch);
        let body_terminated = self.terminated.pop().unwrap();

        let else_part = else_branch.map(|else_stmt| {
            self.terminated.push(false);
            let else_label = self.alloc_label();
            let else_chunk = self.lower_statement(else_stmt);
            let else_terminated = self.terminated.pop().unwrap();
            (else_label, else_chunk, else_terminated)
        });

        let next_label = self.alloc_label();

        let false_label = else_part
            .as_ref()
            .map(|(label, ..)| label.as_str())
            .unwrap_or(&next_label);
        self.patch_condition(&leaves, &body_label, false_label);

        // Branches that did not end in their own terminator fall through to
        // the join label; the append lands after everything nested inside
        // the branch, patched or pending
        if !body_terminated {
            self.arena
                .emit(body_chunk, unconditional_jump_line(&next_label));
        }

        if let Some((_, else_chunk, else_terminated)) = &else_part {
            if !else_terminated {
                self.arena
                    .emit(*else_chunk, unconditional_jump_line(&next_label));
            }
        }

        let chunk = self.arena.new_chunk();
        self.adopt_condition(chunk, &leaves);

        self.emit_label(chunk, &body_label);
        self.arena.adopt(chunk, body_chunk);

        if let Some((else_label, else_chunk, _)) = else_part {
            self.emit_label(chunk, &else_label);
            self.arena.adopt(chunk, else_chunk);
        }

        self.emit_label(chunk, &next_label);
        chunk
    }

    fn lower_for(
        &mut self,
        init: Option<&'ast Assign>,
        condition: Option<&'ast Expr>,
        step: Option<&'ast Assign>,
        body: &'ast Statement,
    ) -> ChunkId {
        // The backfill frame opens before the body so nested loops keep
        // their own break/continue queues
        self.backfill.enter_loop();

        let chunk = self.arena.new_chunk();

        if let Some(init) = init {
            let init_chunk = self.lower_assign(init);
            self.arena.adopt(chunk, init_chunk);
        }

        let cond_part = condition.map(|condition| {
            let cond_label = self.alloc_label();
            let leaves = self.lower_condition(condition);
            (cond_label, leaves)
        });

        self.terminated.push(false);
        let body_label = self.alloc_label();
        let body_chunk = self.lower_statement(body);
        let body_terminated = self.terminated.pop().unwrap();

        let step_part = step.map(|step| {
            let step_label = self.alloc_label();
            let step_chunk = self.lower_assign(step);
            (step_label, step_chunk)
        });

        let next_label = self.alloc_label();

        if let Some((_, leaves)) = &cond_part {
            self.patch_condition(leaves, &body_label, &next_label);
        }

        let cond_label = cond_part.as_ref().map(|(label, _)| label.as_str());
        let step_label = step_part.as_ref().map(|(label, _)| label.as_str());

        // Loop-back priority: the step block if present, else the condition
        // block, else the body itself
        let back_target = step_label
            .or(cond_label)
            .unwrap_or(&body_label)
            .to_owned();
        // The step itself always continues at the condition (or body)
        let after_step = cond_label.unwrap_or(&body_label).to_owned();

        if let Some((_, step_chunk)) = &step_part {
            self.arena
                .emit(*step_chunk, unconditional_jump_line(&after_step));
        }

        // Backfill: every queued jump is patched exactly once, breaks to
        // the label after the loop, continues with the same priority as the
        // back edge
        let frame = self.backfill.exit_loop();

        for pending in frame.continues {
            self.arena.patch_goto(pending, &back_target);
        }

        for pending in frame.breaks {
            self.arena.patch_goto(pending, &next_label);
        }

        if !body_terminated {
            self.arena
                .emit(body_chunk, unconditional_jump_line(&back_target));
        }

        // Assembly: entry jump, condition block, body, step, exit label
        self.arena
            .emit(chunk, unconditional_jump_line(&after_step));

        if let Some((cond_label, leaves)) = &cond_part {
            let cond_label = cond_label.clone();
            self.emit_label(chunk, &cond_label);
            self.adopt_condition(chunk, leaves);
        }

        self.emit_label(chunk, &body_label);
        self.arena.adopt(chunk, body_chunk);

        if let Some((step_label, step_chunk)) = step_part {
            self.emit_label(chunk, &step_label);
            self.arena.adopt(chunk, step_chunk);
        }

        self.emit_label(chunk, &next_label);
        chunk
    }

    fn lower_assign(&mut self, assign: &'ast Assign) -> ChunkId {
        let chunk = self.arena.new_chunk();

        let value = self.lower_value_into(chunk, &assign.value);
        let value = self.coerce_to_i32(chunk, value);

        let id = self.lookup_value(assign.target.name.symbol);

        let slot = if assign.target.indices.is_empty() {
            self.scopes.symbol(id).ir_name().to_owned()
        } else {
            self.lower_element_address(chunk, id, &assign.target.indices)
        };

        self.arena
            .emit(chunk, format!("{TAB}store i32 {value}, i32* {slot}"));
        chunk
    }

    /// `printf` decomposes into the two output intrinsics: `%d` prints the
    /// next argument, everything else prints character codes
    fn lower_printf(&mut self, format: &str, args: &'ast [Expr]) -> ChunkId {
        let chunk = self.arena.new_chunk();
        let bytes = format.as_bytes();

        let mut arg_index = 0;
        let mut i = 0;

        let putint = InternedSymbol::new("putint");
        let putch = InternedSymbol::new("putch");

        while i < bytes.len() {
            match bytes[i] {
                b'%' => {
                    let value = self.lower_value_into(chunk, &args[arg_index]);
                    let value = self.coerce_to_i32(chunk, value);
                    arg_index += 1;

                    self.emit_call_with_values(chunk, putint, vec![value]);
                    i += 2;
                }
                b'\\' => {
                    self.emit_call_with_values(chunk, putch, vec!["10".to_owned()]);
                    i += 2;
                }
                c => {
                    self.emit_call_with_values(chunk, putch, vec![c.to_string()]);
                    i += 1;
                }
            }
        }

        chunk
    }

    /* Local declarations */

    fn lower_local_decl(&mut self, decl: &'ast Decl) -> ChunkId {
        if decl.dims.is_empty() {
            self.lower_local_scalar(decl)
        } else {
            self.lower_local_array(decl)
        }
    }

    fn lower_local_scalar(&mut self, decl: &'ast Decl) -> ChunkId {
        let chunk = self.arena.new_chunk();

        let slot = self.emit_alloca(chunk, IrType::I32);

        if let Some(Initializer::Scalar(expr)) = &decl.init {
            let value = self.lower_value_into(chunk, expr);
            let value = self.coerce_to_i32(chunk, value);
            self.arena
                .emit(chunk, format!("{TAB}store i32 {value}, i32* {slot}"));
        }

        // The symbol only gains its identity now, so the initializer above
        // still resolved names against the enclosing scope
        let id = self
            .scopes
            .lookup_assigned(
                self.cursor.current(),
                decl.name.symbol,
                Some(decl.name.symbol),
            )
            .expect("declared symbol exists in the current frame");

        if decl.is_const {
            let Some(Initializer::Scalar(expr)) = &decl.init else {
                unreachable!("const declarations carry an initializer")
            };
            let value = self.fold(expr);
            self.const_values.insert(id, value);
        }

        self.scopes.assign_identity(id, slot, IrType::I32);
        chunk
    }

    fn lower_local_array(&mut self, decl: &'ast Decl) -> ChunkId {
        let chunk = self.arena.new_chunk();

        let dims: Vec<i32> = decl.dims.iter().map(|dim| self.fold(dim)).collect();
        let total = dims.iter().product::<i32>().max(0) as usize;

        let ty = if dims.len() == 1 {
            IrType::array(dims[0], IrType::I32)
        } else {
            IrType::array(dims[0], IrType::array(dims[1], IrType::I32))
        };

        let elements = decl
            .init
            .as_ref()
            .map(|init| collect_array_init(init, &dims, total))
            .unwrap_or_else(|| vec![None; total]);

        if decl.is_const {
            // Const arrays zero-fill so the constant table and the stored
            // image agree; every element is a folded literal
            let values: Vec<i32> = elements
                .iter()
                .map(|element| element.map(|expr| self.fold(expr)).unwrap_or(0))
                .collect();

            let slot = self.emit_alloca(chunk, ty.clone());

            for (flat, value) in values.iter().enumerate() {
                let address = self.local_element_ptr(chunk, &ty, &slot, flat, &dims);
                self.arena
                    .emit(chunk, format!("{TAB}store i32 {value}, i32* {address}"));
            }

            let id = self
                .scopes
                .lookup_assigned(
                    self.cursor.current(),
                    decl.name.symbol,
                    Some(decl.name.symbol),
                )
                .expect("declared symbol exists in the current frame");

            self.const_arrays.insert(id, values);
            self.set_inner_extent(id, &dims);
            self.scopes.assign_identity(id, slot, ty);
        } else {
            // Variable arrays store exactly the elements the program wrote;
            // a partial initializer does not zero the tail
            let slot = self.emit_alloca(chunk, ty.clone());

            for (flat, element) in elements.iter().enumerate() {
                let Some(expr) = element else { continue };

                let value = self.lower_value_into(chunk, expr);
                let value = self.coerce_to_i32(chunk, value);
                let address = self.local_element_ptr(chunk, &ty, &slot, flat, &dims);
                self.arena
                    .emit(chunk, format!("{TAB}store i32 {value}, i32* {address}"));
            }

            let id = self
                .scopes
                .lookup_assigned(
                    self.cursor.current(),
                    decl.name.symbol,
                    Some(decl.name.symbol),
                )
                .expect("declared symbol exists in the current frame");

            self.set_inner_extent(id, &dims);
            self.scopes.assign_identity(id, slot, ty);
        }

        chunk
    }

    fn local_element_ptr(
        &mut self,
        chunk: ChunkId,
        ty: &IrType,
        slot: &str,
        flat: usize,
        dims: &[i32],
    ) -> String {
        let mut indices = vec!["0".to_owned()];

        if dims.len() == 1 {
            indices.push(flat.to_string());
        } else {
            let inner = dims[1] as usize;
            indices.push((flat / inner).to_string());
            indices.push((flat % inner).to_string());
        }

        self.emit_gep(chunk, ty, slot, &indices, IrType::I32)
    }

    pub(super) fn set_inner_extent(&mut self, id: crate::middle::scope::SymbolId, dims: &[i32]) {
        if dims.len() == 2 {
            if let crate::middle::scope::SymbolKind::Value { inner_extent, .. } =
                &mut self.scopes.symbol_mut(id).kind
            {
                *inner_extent = Some(dims[1]);
            }
        }
    }
}

/// Row-major flattening of a braced initializer against the declared
/// extents; unwritten positions stay `None`
pub(super) fn collect_array_init<'ast>(
    init: &'ast Initializer,
    dims: &[i32],
    total: usize,
) -> Vec<Option<&'ast Expr>> {
    let mut out = vec![None; total];

    let Initializer::List(items) = init else {
        unreachable!("array initializers are braced lists")
    };

    if dims.len() == 1 {
        for (i, item) in items.iter().enumerate().take(total) {
            let Initializer::Scalar(expr) = item else {
                unreachable!("rank-one initializers hold scalars")
            };
            out[i] = Some(expr);
        }
    } else {
        let inner = dims[1] as usize;

        for (row, item) in items.iter().enumerate() {
            let Initializer::List(row_items) = item else {
                unreachable!("rank-two initializers hold one list per row")
            };

            for (column, row_item) in row_items.iter().enumerate().take(inner) {
                let Initializer::Scalar(expr) = row_item else {
                    unreachable!("row initializers hold scalars")
                };

                let flat = row * inner + column;
                if flat < total {
                    out[flat] = Some(expr);
                }
            }
        }
    }

    out
}
