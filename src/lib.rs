pub mod chat;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod poll;
pub mod session;

pub use client::BackendClient;
pub use config::AppConfig;
pub use error::ApiError;
