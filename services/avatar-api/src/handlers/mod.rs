//! HTTP request handlers for the avatar API.

pub mod avatar;
pub mod health;

pub use avatar::avatar_handler;
pub use health::{health_handler, metrics_handler};
