//! Agency directory sync and listing-feed aggregation for estate agency sites.
//!
//! The library owns the domain (agencies, users, field mappings), the outbound
//! feed clients, and the axum routers for each area. `services/api` wires them
//! into a running server.

pub mod agencies;
pub mod config;
pub mod error;
pub mod feeds;
pub mod field_mappings;
pub mod jobs;
pub mod store;
pub mod telemetry;
pub mod users;
