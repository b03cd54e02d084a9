//! Core modules: configuration, the provider registry, the authz file
//! model, and the shared error type.

pub mod authz;
pub mod config;
pub mod engine;
pub mod error;
