//! Google account credentials
//!
//! This module provides:
//! - Per-user credential storage (file-backed or in-memory)
//! - GoogleAuthProvider for resolving and refreshing access tokens

mod credentials;
mod provider;
mod store;

pub use credentials::Credentials;
pub use provider::GoogleAuthProvider;
pub use store::{CredentialStore, FileCredentialStore, InMemoryCredentialStore};
