//! AgentLink Gateway Library
//!
//! Link resolution and conversion engine plus the HTTP, GraphQL and MCP
//! surfaces around it. Exposed as a library for the binaries, benchmarks
//! and integration tests.

pub mod api;
pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod mcp;
