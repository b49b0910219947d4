//! Short-circuit lowering of `&&`/`||` condition trees. A condition is a
//! disjunction of conjunctions of relational leaves; the chain is walked
//! left to right and every leaf ends in a two-way branch whose targets are
//! recorded as roles, not labels:
//!
//! - true side: the next conjunct's label if one follows, else whatever the
//!   consuming statement calls "true" (its body label);
//! - false side: the next disjunct group's label if one follows, else the
//!   consumer's "false" successor (join, else, or loop exit label).
//!
//! Chain labels are allocated as the walk advances, but the consumer's own
//! labels only exist after its body has been laid out, so each branch stays
//! pending until the consumer runs one patch pass over all leaves.

use super::Generator;
use crate::{
    backend::chunk::{ChunkId, JumpTarget},
    frontend::ast::{BinaryOp, Expr, ExprKind},
};

/// One lowered relational leaf. `follow_label` is the chain label whose
/// block starts right after this leaf's branch, if any.
pub(super) struct CondLeaf {
    pub chunk: ChunkId,
    pub follow_label: Option<String>,
}

impl Generator<'_> {
    /// Lowers a condition into its ordered leaf chunks, each carrying a
    /// role-tagged pending branch
    pub(super) fn lower_condition(&mut self, condition: &Expr) -> Vec<CondLeaf> {
        let mut groups = Vec::new();
        flatten_or(condition, &mut groups);

        let mut leaves: Vec<CondLeaf> = Vec::new();

        for (group_index, group) in groups.iter().enumerate() {
            let has_next_group = group_index + 1 < groups.len();

            let mut terms = Vec::new();
            flatten_and(group, &mut terms);

            let group_start = leaves.len();

            for (term_index, term) in terms.iter().enumerate() {
                let chunk = self.lower_cond_leaf(term);
                let has_next_term = term_index + 1 < terms.len();

                // The next conjunct's label exists as soon as we advance to
                // it, so it is allocated here and doubles as this leaf's
                // follow label
                let (on_true, follow_label) = if has_next_term {
                    let label = self.alloc_label();
                    (JumpTarget::Label(label.clone()), Some(label))
                } else {
                    (JumpTarget::ConsumerTrue, None)
                };

                let condition_value = self.arena.value(chunk).to_owned();
                self.arena.set_pending_branch(
                    chunk,
                    condition_value,
                    on_true,
                    // Placeholder until the group's false side is known below
                    JumpTarget::ConsumerFalse,
                );

                leaves.push(CondLeaf {
                    chunk,
                    follow_label,
                });
            }

            // With another group following, its entry label becomes every
            // leaf-in-this-group's false target, and the block it opens
            // starts after the group's last leaf
            if has_next_group {
                let group_label = self.alloc_label();

                for leaf in &mut leaves[group_start..] {
                    self.arena
                        .retarget_false(leaf.chunk, JumpTarget::Label(group_label.clone()));
                }

                let last = leaves.last_mut().expect("groups are never empty");
                debug_assert!(last.follow_label.is_none());
                last.follow_label = Some(group_label);
            }
        }

        leaves
    }

    /// Runs the single patch pass once the consumer's true and false
    /// successors exist
    pub(super) fn patch_condition(&mut self, leaves: &[CondLeaf], on_true: &str, on_false: &str) {
        for leaf in leaves {
            self.arena.patch_branch(leaf.chunk, on_true, on_false);
        }
    }

    /// Appends the leaf chunks and their chain labels to the consumer's
    /// chunk in program order
    pub(super) fn adopt_condition(&mut self, parent: ChunkId, leaves: &[CondLeaf]) {
        for leaf in leaves {
            self.arena.adopt(parent, leaf.chunk);

            if let Some(label) = &leaf.follow_label {
                let label = label.clone();
                self.emit_label(parent, &label);
            }
        }
    }

    /// Lowers one relational/equality leaf to an `i1` register. A bare
    /// integer value is compared against zero; a value that already is a
    /// comparison result passes through.
    fn lower_cond_leaf(&mut self, expr: &Expr) -> ChunkId {
        let chunk = self.arena.new_chunk();

        let value = match &expr.kind {
            ExprKind::Binary { op, lhs, rhs } if op.is_comparison() => {
                let lhs = self.lower_value_into(chunk, lhs);
                let rhs = self.lower_value_into(chunk, rhs);
                let lhs = self.coerce_to_i32(chunk, lhs);
                let rhs = self.coerce_to_i32(chunk, rhs);

                self.emit_icmp(chunk, *op, &lhs, &rhs)
            }
            _ => {
                let value = self.lower_value_into(chunk, expr);

                if self
                    .local_type(&value)
                    .is_some_and(crate::backend::ty::IrType::is_bool)
                {
                    value
                } else {
                    self.emit_icmp(chunk, BinaryOp::Ne, &value, "0")
                }
            }
        };

        self.arena.set_value(chunk, value);
        chunk
    }
}

fn flatten_or<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
    if let ExprKind::Binary {
        op: BinaryOp::Or,
        lhs,
        rhs,
    } = &expr.kind
    {
        flatten_or(lhs, out);
        flatten_or(rhs, out);
    } else {
        out.push(expr);
    }
}

fn flatten_and<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
    if let ExprKind::Binary {
        op: BinaryOp::And,
        lhs,
        rhs,
    } = &expr.kind
    {
        flatten_and(lhs, out);
        flatten_and(rhs, out);
    } else {
        out.push(expr);
    }
}
