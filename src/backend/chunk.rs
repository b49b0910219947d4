//! Text chunks produced by lowering. A chunk accumulates IR lines, may name
//! the register holding its value, and may carry one pending jump whose
//! target labels are not known yet. Compound statements aggregate child
//! chunks instead of flattening early, so a pending jump buried in a nested
//! block can still be patched in place; rendering happens exactly once,
//! after every pending jump at every nesting level has been completed.

use crate::index::{IndexVec, simple_index};

const TAB: &str = "    ";

simple_index! {
    /// Owning handle to a chunk in the arena. Each pending jump is reachable
    /// through exactly one handle at patch time.
    pub struct ChunkId;
}

#[derive(Debug)]
pub enum ChunkItem {
    Line(String),
    Child(ChunkId),
}

/// A jump emitted before its targets exist. Conditional branches carry the
/// two destination roles of short-circuit lowering; `Goto` is a
/// `break`/`continue` jump that receives its label when the enclosing loop
/// finishes.
#[derive(Debug)]
pub enum PendingJump {
    Branch {
        condition: String,
        on_true: JumpTarget,
        on_false: JumpTarget,
    },
    Goto,
}

/// A destination role: either a label that was already allocated while the
/// condition chain was walked, or one of the two successors only the
/// consuming statement can provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JumpTarget {
    Label(String),
    ConsumerTrue,
    ConsumerFalse,
}

impl JumpTarget {
    fn resolve(&self, true_label: &str, false_label: &str) -> String {
        match self {
            JumpTarget::Label(label) => label.clone(),
            JumpTarget::ConsumerTrue => true_label.to_owned(),
            JumpTarget::ConsumerFalse => false_label.to_owned(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Chunk {
    items: Vec<ChunkItem>,
    value: Option<String>,
    pending: Option<PendingJump>,
}

#[derive(Debug, Default)]
pub struct ChunkArena {
    chunks: IndexVec<ChunkId, Chunk>,
}

pub fn unconditional_jump_line(dest: &str) -> String {
    format!("{TAB}br label {dest}")
}

pub fn conditional_jump_line(condition: &str, if_true: &str, if_false: &str) -> String {
    format!("{TAB}br i1 {condition}, label {if_true}, label {if_false}")
}

impl ChunkArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_chunk(&mut self) -> ChunkId {
        self.chunks.push(Chunk::default())
    }

    pub fn emit(&mut self, id: ChunkId, line: impl Into<String>) {
        let line = line.into();

        if !line.is_empty() {
            self.chunks[id].items.push(ChunkItem::Line(line));
        }
    }

    pub fn adopt(&mut self, parent: ChunkId, child: ChunkId) {
        self.chunks[parent].items.push(ChunkItem::Child(child));
    }

    pub fn set_value(&mut self, id: ChunkId, value: impl Into<String>) {
        self.chunks[id].value = Some(value.into());
    }

    pub fn value(&self, id: ChunkId) -> &str {
        self.chunks[id]
            .value
            .as_deref()
            .expect("chunk has no result value")
    }

    pub fn try_value(&self, id: ChunkId) -> Option<&str> {
        self.chunks[id].value.as_deref()
    }

    pub fn set_pending_branch(
        &mut self,
        id: ChunkId,
        condition: String,
        on_true: JumpTarget,
        on_false: JumpTarget,
    ) {
        let chunk = &mut self.chunks[id];
        debug_assert!(chunk.pending.is_none());

        chunk.pending = Some(PendingJump::Branch {
            condition,
            on_true,
            on_false,
        });
    }

    pub fn set_pending_goto(&mut self, id: ChunkId) {
        let chunk = &mut self.chunks[id];
        debug_assert!(chunk.pending.is_none());

        chunk.pending = Some(PendingJump::Goto);
    }

    /// Rewrites the false role of a still-pending branch. Used while the
    /// condition chain is walked: once a further `||` group exists, its
    /// entry label becomes the false target of every leaf lowered so far in
    /// the current group.
    pub fn retarget_false(&mut self, id: ChunkId, target: JumpTarget) {
        let Some(PendingJump::Branch { on_false, .. }) = &mut self.chunks[id].pending else {
            unreachable!("retarget_false on a chunk without a pending branch")
        };

        *on_false = target;
    }

    /// Completes a role-tagged conditional branch with the consumer's
    /// concrete successor labels. Each pending branch is written exactly
    /// once.
    pub fn patch_branch(&mut self, id: ChunkId, true_label: &str, false_label: &str) {
        let Some(PendingJump::Branch {
            condition,
            on_true,
            on_false,
        }) = self.chunks[id].pending.take()
        else {
            unreachable!("patch_branch on a chunk without a pending branch")
        };

        let line = conditional_jump_line(
            &condition,
            &on_true.resolve(true_label, false_label),
            &on_false.resolve(true_label, false_label),
        );
        self.emit(id, line);
    }

    /// Completes a `break`/`continue` jump with the label chosen by the
    /// enclosing loop
    pub fn patch_goto(&mut self, id: ChunkId, label: &str) {
        let Some(PendingJump::Goto) = self.chunks[id].pending.take() else {
            unreachable!("patch_goto on a chunk without a pending goto")
        };

        self.emit(id, unconditional_jump_line(label));
    }

    /// A chunk stays open while it or any nested child still carries an
    /// unpatched jump; open chunks must not be rendered yet
    pub fn is_open(&self, id: ChunkId) -> bool {
        if self.chunks[id].pending.is_some() {
            return true;
        }

        self.chunks[id].items.iter().any(|item| match item {
            ChunkItem::Line(_) => false,
            ChunkItem::Child(child) => self.is_open(*child),
        })
    }

    /// Flattens child text in program order. Panics on a surviving pending
    /// jump: that is a lowering bug, not a recoverable state.
    pub fn render(&self, id: ChunkId) -> String {
        let mut lines = Vec::new();
        self.render_into(id, &mut lines);
        lines.join("\n")
    }

    fn render_into(&self, id: ChunkId, lines: &mut Vec<String>) {
        let chunk = &self.chunks[id];

        assert!(
            chunk.pending.is_none(),
            "rendered a chunk with an unpatched jump"
        );

        for item in &chunk.items {
            match item {
                ChunkItem::Line(line) => lines.push(line.clone()),
                ChunkItem::Child(child) => self.render_into(*child, lines),
            }
        }
    }
}

/// One frame per loop nesting level, holding the `break` and `continue`
/// jumps that are still waiting for the loop's exit and continuation labels
#[derive(Debug, Default)]
pub struct BackfillFrame {
    pub breaks: Vec<ChunkId>,
    pub continues: Vec<ChunkId>,
}

#[derive(Debug, Default)]
pub struct BackfillStack {
    frames: Vec<BackfillFrame>,
}

impl BackfillStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_loop(&mut self) {
        self.frames.push(BackfillFrame::default());
    }

    pub fn exit_loop(&mut self) -> BackfillFrame {
        self.frames
            .pop()
            .expect("exit_loop without a matching enter_loop")
    }

    pub fn record_break(&mut self, chunk: ChunkId) {
        self.frames
            .last_mut()
            .expect("`break` outside of a loop survived scope building")
            .breaks
            .push(chunk);
    }

    pub fn record_continue(&mut self, chunk: ChunkId) {
        self.frames
            .last_mut()
            .expect("`continue` outside of a loop survived scope building")
            .continues
            .push(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_concatenates_nested_children_in_program_order() {
        let mut arena = ChunkArena::new();

        let parent = arena.new_chunk();
        let child = arena.new_chunk();

        arena.emit(parent, "a");
        arena.emit(child, "b");
        arena.adopt(parent, child);
        arena.emit(parent, "c");

        assert_eq!(arena.render(parent), "a\nb\nc");
    }

    #[test]
    fn openness_propagates_through_nesting_until_patched() {
        let mut arena = ChunkArena::new();

        let outer = arena.new_chunk();
        let inner = arena.new_chunk();
        let jump = arena.new_chunk();

        arena.set_pending_goto(jump);
        arena.adopt(inner, jump);
        arena.adopt(outer, inner);

        assert!(arena.is_open(outer));

        arena.patch_goto(jump, "%9");

        assert!(!arena.is_open(outer));
        assert_eq!(arena.render(outer), "    br label %9");
    }

    #[test]
    fn branch_roles_resolve_against_consumer_labels() {
        let mut arena = ChunkArena::new();
        let chunk = arena.new_chunk();

        arena.set_pending_branch(
            chunk,
            "%1".to_owned(),
            JumpTarget::Label("%2".to_owned()),
            JumpTarget::ConsumerFalse,
        );
        arena.patch_branch(chunk, "%7", "%8");

        assert_eq!(arena.render(chunk), "    br i1 %1, label %2, label %8");
    }

    #[test]
    #[should_panic(expected = "unpatched jump")]
    fn rendering_an_open_chunk_is_fatal() {
        let mut arena = ChunkArena::new();
        let chunk = arena.new_chunk();

        arena.set_pending_goto(chunk);
        arena.render(chunk);
    }

    #[test]
    fn backfill_frames_nest_independently() {
        let mut arena = ChunkArena::new();
        let mut stack = BackfillStack::new();

        stack.enter_loop();
        let outer_break = arena.new_chunk();
        stack.record_break(outer_break);

        stack.enter_loop();
        let inner_continue = arena.new_chunk();
        stack.record_continue(inner_continue);

        let inner = stack.exit_loop();
        assert_eq!(inner.continues, vec![inner_continue]);
        assert!(inner.breaks.is_empty());

        let outer = stack.exit_loop();
        assert_eq!(outer.breaks, vec![outer_break]);
    }
}
