//! nmos6502 ties the cpu and memory crates together and provides a run loop
//! which steps a CPU until a stop condition is met.

pub mod runner;

#[cfg(test)]
mod tests;

/// prelude exports common items for the 6502.
pub mod prelude {
    pub use crate::runner::*;
    pub use cpu::*;
    pub use memory::*;
}
