//! World geometry: transform, subdivision and leaf draws

mod draw;
mod gte;
mod scratch;
mod subdiv;

pub use draw::*;
pub use gte::*;
pub use scratch::*;
