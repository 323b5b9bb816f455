mod chain;
mod reach;
mod skeleton;
mod solver;

pub use chain::*;
pub use reach::{ChainSolve, solve_chain};
pub use skeleton::*;
pub use solver::*;
