pub mod auth;
pub mod response;

pub use auth::{capability_for, require_admin, AdminUser};
pub use response::{ApiResponse, ApiResult};
