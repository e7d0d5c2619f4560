//! Client module
//!
//! This module provides clients for the analyze and suggest operations,
//! either over HTTP or directly against an in-process [`Core`](crate::Core).

mod core;
mod http;
mod trait_def;

// Re-export the trait and types
pub use self::core::CoreClient;
pub use self::http::{ClientConfig, ClientError, HttpClientImpl};
pub use trait_def::Client;
