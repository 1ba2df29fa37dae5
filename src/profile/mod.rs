// src/profile/mod.rs

pub mod handlers;
pub mod routes;

pub use routes::profile_routes;
