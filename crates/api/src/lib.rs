//! HTTP surface for the agency CMS versioning and preview engine.

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
