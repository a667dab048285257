pub mod app;
pub mod auth;
pub mod cli;
pub mod collections;
pub mod config;
pub mod content;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;
pub mod views;

pub use app::{app, serve};
pub use state::AppState;
