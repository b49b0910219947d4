//! Names are resolved here: the AST is walked once to build the scope tree
//! the lowering engine re-walks later, and the cheap structural diagnostics
//! (undeclared names, misplaced jumps) are collected so the driver can
//! refuse to lower an invalid program.

pub mod resolve;
pub mod scope;
