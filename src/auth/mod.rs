//! # Auth Module
//!
//! This module handles all authentication-related functionality including:
//! - Google OAuth2 authorization code flow with PKCE and CSRF state
//! - Server-side browser sessions holding the pending login attempt
//! - Session token (JWT) issuance and verification
//! - Account resolution on first login
//! - AuthedAccount extractor and `require_auth` middleware for protected routes

pub mod extractors;
pub mod handlers;
pub mod login;
pub mod models;
pub mod pkce;
pub mod resolver;
pub mod routes;
pub mod session;
pub mod token;


pub use extractors::{require_auth, AuthedAccount};
pub use models::Account;
pub use routes::auth_routes;
