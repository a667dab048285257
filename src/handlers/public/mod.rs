// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Visitors read everything here. A request carrying the live admin bearer gets
// the same views with edit affordances switched on.
pub mod content;
pub mod home;
pub mod records;
pub mod session;
