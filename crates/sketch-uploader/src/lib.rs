pub mod board;
pub mod cache;
pub mod config;
pub mod core_service;
pub mod dialog;
pub mod error;
pub mod events;
pub mod failure;
pub mod gate;
pub mod log_sanitize;
pub mod logging;
pub mod messages;
pub mod provider;
pub mod session;
pub mod tracker;
pub mod upload;

pub use error::{Error, Result};
