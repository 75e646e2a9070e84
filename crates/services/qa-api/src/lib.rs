pub mod app;
pub mod config;
pub mod content;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod reputation;
pub mod store;
pub mod votes;

pub use app::{create_app, AppState};
