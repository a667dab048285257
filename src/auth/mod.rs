pub mod store;
pub mod token;

pub use store::{Access, AuthSnapshot, AuthState, Capability, SessionStore};
