//! §C4 — the type-specific row instantiators. Each submodule builds exactly
//! the rows [`crate::precount`] already counted for its constraint family,
//! using the same activation predicates so the two never drift apart.

pub mod contact;
pub mod equality;
pub mod friction;
pub mod limit;
