//! Authentication module: Google sign-in and role-carrying session JWTs.
//!
//! This module provides:
//! - Google ID token verification against Google's published keys
//! - Session JWT creation and validation
//! - `require_auth` middleware and the `require_role` guard
//! - The login and health handlers

pub mod google;
mod handlers;
pub mod jwt;
mod middleware;
pub mod types;

pub use google::{GoogleIdTokenVerifier, IdTokenVerifier, VerifyError};
pub use handlers::{google_login, health};
pub use middleware::{require_auth, require_role};
