// handlers/protected/mod.rs - Protected handlers
//
// Every route except the dashboard sits behind `require_admin`; the dashboard
// runs its own guard so it can answer "pending" and "redirect" as well.
pub mod content;
pub mod dashboard;
pub mod records;
pub mod session;
