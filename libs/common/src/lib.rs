//! Shared helpers for the Solarman tools
//!
//! - logging bootstrap (`tracing-subscriber`)
//! - layered configuration loading (`figment`)
//! - hex formatting of protocol frames

pub mod config_loader;
pub mod error;
pub mod hex;
pub mod logging;

pub use error::{Error, Result};
