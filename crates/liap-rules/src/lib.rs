//! Legality checking, play comparison, and scoring rules.
mod compare;
mod legality;
mod scoring;

pub use compare::*;
pub use legality::*;
pub use scoring::*;
