//! Command-line interface module.
//!
//! This module provides the CLI functionality for:
//! - Running the gateway server
//! - Registering services against a running gateway
//! - Logging setup shared by both

pub mod commands;
pub mod handlers;

pub use handlers::{handle_register, handle_server, init_logging};
