//! Round-scoped turn, trick, declaration, and scoring state.
mod round;
mod seat;

pub use round::*;
pub use seat::*;
