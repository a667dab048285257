// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (bearer must match the live admin session)
pub mod protected; // Mutations and the admin dashboard
pub mod public; // Reads, sign-in and session status

use crate::error::ApiError;
use crate::models::Category;

/// Resolve the `:category` path segment
pub(crate) fn parse_category(slug: &str) -> Result<Category, ApiError> {
    slug.parse::<Category>().map_err(ApiError::not_found)
}
