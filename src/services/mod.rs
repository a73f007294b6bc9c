pub mod commission_service;
pub mod deal_service;

pub use commission_service::*;
pub use deal_service::*;
