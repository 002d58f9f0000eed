//! Mindly - Classroom-aware tutoring agent
//!
//! This library provides a Gemini reasoning-acting loop over a student's
//! Google Classroom and Drive, exposed through an HTTP/SSE API.

pub mod agent;
pub mod auth;
pub mod classroom;
pub mod config;
pub mod error;
pub mod google;
pub mod server;
pub mod tools;
pub mod ui;

pub use error::{Error, Result};
