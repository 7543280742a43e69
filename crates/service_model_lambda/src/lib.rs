//! AWS-oriented adapters and handlers for service model pipelines.
//!
//! This crate owns runtime integration details (the API Gateway proxy
//! transport, SDK-backed storage clients and environment configuration) and
//! builds on the transport-free contracts of `service_model_core`.

pub mod adapters;
pub mod auth;
pub mod config;
pub mod handlers;
