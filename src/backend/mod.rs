//! The backend lowers a validated program to textual IR. In this form, loops
//! and conditionals are simplified to labels and jumps, expression trees are
//! flattened into ordered three-address operations, and every name becomes a
//! global (`@name`) or a numbered virtual register (`%n`).
//!
//! Because jump targets inside `if`/`for`/`&&`/`||` shapes are only known
//! after their sub-statements have been lowered, jump instructions are
//! created incomplete and completed ("backpatched") once the surrounding
//! statement has laid out its labels; see [`chunk`] for the machinery.

pub mod chunk;
pub mod lowering;
pub mod ty;

use crate::{frontend::ast::CompUnit, middle::scope::ScopeTree};

/// Lowers one compilation unit to IR text. Callable once per unit: the
/// scope tree is consumed, since lowering assigns each symbol's IR identity
/// in place.
pub fn lower(unit: &CompUnit, scopes: ScopeTree) -> String {
    lowering::Generator::new(unit, scopes).generate()
}
