pub mod auth;
pub mod response;

pub use auth::route_guard;
pub use response::{ApiResponse, ApiResult};
