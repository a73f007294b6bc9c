pub mod commission;
pub mod deal;

pub use commission::commission_config;
pub use deal::deal_config;
