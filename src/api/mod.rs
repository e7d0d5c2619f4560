//! API module
//!
//! This module provides the API functionality for the taskrank tool,
//! including the server and the clients that talk to it.

pub mod client;
pub mod server;

// Re-export commonly used types
pub use client::{Client, ClientConfig, ClientError, CoreClient, HttpClientImpl};
pub use server::{router, serve, ServerConfig};
