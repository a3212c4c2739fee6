//! Seams between the engine and its environment.

mod clock;
mod random;
mod store;

pub use clock::*;
pub use random::*;
pub use store::*;
