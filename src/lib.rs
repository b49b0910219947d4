//! The Silt bootstrap compiler: a small C-like language (`int`/`void`
//! functions, `const`, one- and two-dimensional arrays) lowered to a
//! textual, register-based IR in the style of a reduced LLVM dialect.
//!
//! The pipeline is `frontend` (lex + parse), `middle` (scope building and
//! structural diagnostics), `backend` (the lowering engine). Lowering only
//! runs on programs the earlier stages accepted.

pub mod backend;
pub mod frontend;
pub mod index;
pub mod middle;
