pub mod commission;
pub mod common;
pub mod deal;

pub use commission::*;
pub use common::*;
pub use deal::*;
