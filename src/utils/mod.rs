pub mod pagination;

pub use pagination::{PaginatedResponse, PaginationInfo, PaginationParams};
