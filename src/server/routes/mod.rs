//! HTTP route handlers.

pub mod agent;
pub mod files;
